//! The top-level key derivation pipeline.
//!
//! password + salt → outer stretch → `p` SMix lanes → ordered join →
//! gating pass → outer stretch → derived key. A call owns all of its
//! scratch memory: every arena is reserved up front (all-or-nothing) and
//! wiped on each exit path, and nothing global is touched, so concurrent
//! calls are independent.

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::encoding;
use crate::memory::{ScratchArena, words_from_le_bytes, words_to_le_bytes};
use crate::params::{Error, Flags, MAX_DKLEN, Params};
use crate::pbkdf2_1::Pbkdf2HmacSha256State;
use crate::pwx::PwxState;
use crate::romix::{LaneMixer, smix};
use crate::salsa20::{self, WORDS};

/// Digest length stored in encoded descriptors.
pub const ENCODED_DKLEN: usize = 32;

fn lane_smix(arena: &mut ScratchArena, block: &mut [u32], params: &Params) {
    let mut mixer = if params.flags().contains(Flags::PWXFORM) {
        LaneMixer::Pwx(PwxState::new(block))
    } else {
        LaneMixer::Salsa8
    };
    smix(
        arena.as_mut_slice(),
        block,
        params.n() as usize,
        params.r() as usize,
        params.t(),
        &mut mixer,
    );
}

/// Run every lane over its own arena and block slice. Lane outputs land at
/// fixed offsets of `blocks`, so the join order is positional and identical
/// whether lanes run serially or on threads.
fn run_lanes(arenas: &mut [ScratchArena], blocks: &mut [u32], params: &Params) {
    let bl = params.block_words();

    cfg_if::cfg_if! {
        if #[cfg(feature = "parallel")] {
            if arenas.len() > 1 {
                std::thread::scope(|scope| {
                    for (arena, block) in arenas.iter_mut().zip(blocks.chunks_mut(bl)) {
                        scope.spawn(move || lane_smix(arena, block, params));
                    }
                });
                return;
            }
        }
    }

    for (arena, block) in arenas.iter_mut().zip(blocks.chunks_mut(bl)) {
        lane_smix(arena, block, params);
    }
}

/// `g` strictly sequential Salsa20/8 chaining rounds over the whole joined
/// lane output; adds cost that more per-lane hardware cannot amortize.
fn gating_pass(blocks: &mut [u32], g: u32) {
    let mut x = [0u32; WORDS];
    x.copy_from_slice(&blocks[blocks.len() - WORDS..]);

    for _ in 0..g {
        for chunk in blocks.chunks_exact_mut(WORDS) {
            for (xw, cw) in x.iter_mut().zip(chunk.iter()) {
                *xw ^= *cw;
            }
            salsa20::salsa20_8(&mut x);
            chunk.copy_from_slice(&x);
        }
    }
    x.zeroize();
}

/// Derive `output.len()` bytes of key material.
///
/// Deterministic for fixed inputs and parameters. With
/// [`Flags::SCRYPT_COMPAT`] and `t = 0, g = 0` the output is byte-for-byte
/// RFC 7914 scrypt.
pub fn derive(
    password: &[u8],
    salt: &[u8],
    params: &Params,
    output: &mut [u8],
) -> Result<(), Error> {
    if output.is_empty() {
        return Err(Error::InvalidParameter {
            name: "dklen",
            reason: "must be at least 1",
        });
    }
    if output.len() > MAX_DKLEN {
        return Err(Error::InvalidParameter {
            name: "dklen",
            reason: "exceeds the PBKDF2-HMAC-SHA256 output bound",
        });
    }

    let r = params.r() as usize;
    let p = params.p() as usize;

    // every lane arena is reserved before any work happens
    let mut arenas = Vec::with_capacity(p);
    for _ in 0..p {
        arenas.push(ScratchArena::new(params.lane_words())?);
    }

    let state = Pbkdf2HmacSha256State::new(password);

    let mut blocks = Zeroizing::new(vec![0u32; p * params.block_words()]);
    {
        let mut seed = Zeroizing::new(vec![0u8; p * 128 * r]);
        state.emit(salt, &mut seed);
        words_from_le_bytes(&seed, &mut blocks);
    }

    run_lanes(&mut arenas, &mut blocks, params);
    drop(arenas);

    if params.g() > 0 {
        gating_pass(&mut blocks, params.g());
    }

    let mut joined = Zeroizing::new(vec![0u8; p * 128 * r]);
    words_to_le_bytes(&blocks, &mut joined);
    state.emit(&joined, output);

    if params.flags().contains(Flags::CLIENT_KEY) {
        let fold = Pbkdf2HmacSha256State::new(output);
        let mut client_key = fold.hmac(b"Client Key");
        let out_state = Pbkdf2HmacSha256State::new(&client_key);
        out_state.emit(b"yescrypt-kdf output", output);
        client_key.zeroize();
    }

    Ok(())
}

/// Derive and serialize into a self-describing descriptor with a 32-byte
/// digest.
pub fn derive_encoded(password: &[u8], salt: &[u8], params: &Params) -> Result<String, Error> {
    let mut digest = [0u8; ENCODED_DKLEN];
    derive(password, salt, params, &mut digest)?;
    Ok(encoding::encode(params, salt, &digest))
}

/// Re-derive from a descriptor and compare in constant time.
///
/// `Ok(false)` on mismatch; `Err` only for a malformed descriptor or
/// unsatisfiable parameters.
pub fn verify_encoded(descriptor: &str, password: &[u8]) -> Result<bool, Error> {
    let (params, salt, digest) = encoding::parse(descriptor)?;

    let mut derived = Zeroizing::new(vec![0u8; digest.len()]);
    derive(password, &salt, &params, &mut derived)?;
    Ok(bool::from(derived.ct_eq(&digest)))
}
