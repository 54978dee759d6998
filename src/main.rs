use std::io::Read;

use clap::Parser;
use rand::RngCore;

use yescrypt_kdf::{
    Flags, Params, derive, derive_encoded,
    self_test::{Case, CastN16R1P1, CastN16384R8P1, CastN1024R8P16, CastN1048576R8P1},
    verify_encoded,
};

#[derive(clap::Subcommand)]
enum Command {
    /// Run the known-answer self test
    Cast {
        #[arg(short, long, help = "skip the 128 MiB case")]
        fast: bool,
    },
    /// Derive a key or an encoded hash
    Compute {
        #[arg(short, long, help = "password; read from stdin when absent")]
        key: Option<String>,
        #[arg(short, long, help = "salt; randomly generated when absent")]
        salt: Option<String>,
        #[arg(short, long, default_value = "4096")]
        n: u64,
        #[arg(short, long, default_value = "8")]
        r: u32,
        #[arg(short, long, default_value = "1")]
        p: u32,
        #[arg(short, long, default_value = "0")]
        t: u32,
        #[arg(short, long, default_value = "0")]
        g: u32,
        #[arg(long, help = "scrypt-compatible baseline mode (no pwxform, no output fold)")]
        scrypt_compat: bool,
        #[arg(short, long, default_value = "32")]
        output_len: usize,
        #[arg(long, help = "print raw hex instead of an encoded descriptor")]
        output_raw: bool,
    },
    /// Verify a password against an encoded descriptor
    Verify {
        descriptor: String,
        #[arg(short, long, help = "password; read from stdin when absent")]
        key: Option<String>,
    },
}

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

fn slurp_stdin() -> Vec<u8> {
    let mut stdin = std::io::stdin().lock();
    let mut buffer = Vec::new();
    if let Err(e) = stdin.read_to_end(&mut buffer) {
        eprintln!("failed to read password from stdin: {e}");
        std::process::exit(2);
    }
    buffer
}

fn password_of(key: Option<String>) -> Vec<u8> {
    match key {
        Some(key) => key.into_bytes(),
        None => slurp_stdin(),
    }
}

fn main() {
    let args = Args::parse();

    match args.command {
        Command::Cast { fast } => {
            CastN16R1P1::algorithm_self_test();
            CastN1024R8P16::algorithm_self_test();
            CastN16384R8P1::algorithm_self_test();
            if !fast {
                CastN1048576R8P1::algorithm_self_test();
            }
            println!("self test passed");
        }
        Command::Compute {
            key,
            salt,
            n,
            r,
            p,
            t,
            g,
            scrypt_compat,
            output_len,
            output_raw,
        } => {
            let password = password_of(key);
            let salt = match salt {
                Some(salt) => salt.into_bytes(),
                None => {
                    let mut salt = vec![0u8; 16];
                    rand::rng().fill_bytes(&mut salt);
                    salt
                }
            };

            let flags = if scrypt_compat {
                Flags::SCRYPT_COMPAT
            } else {
                Flags::default()
            };
            let params = match Params::new(n, r, p, t, g, flags) {
                Ok(params) => params,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(2);
                }
            };

            let result = if output_raw {
                let mut output = vec![0u8; output_len];
                derive(&password, &salt, &params, &mut output).map(|_| hex::encode(output))
            } else {
                derive_encoded(&password, &salt, &params)
            };

            match result {
                Ok(printable) => println!("{printable}"),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(2);
                }
            }
        }
        Command::Verify { descriptor, key } => {
            let password = password_of(key);
            match verify_encoded(&descriptor, &password) {
                Ok(true) => println!("match"),
                Ok(false) => {
                    println!("mismatch");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(2);
                }
            }
        }
    }
}
