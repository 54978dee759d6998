//! Self-describing encoded hash descriptors.
//!
//! Shape: `$yescrypt-kdf$<flags>,<N>,<r>,<p>,<t>,<g>$<salt>$<digest>` with
//! salt and digest in unpadded base64 over the crypt(3) `itoa64` alphabet.
//! Parsing is strict: nothing is ever defaulted, and any unknown version,
//! field mismatch or stray byte is a [`DecodeError`].

use base64::{
    Engine as _, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use thiserror::Error;

use crate::params::{Error as ParamsError, Flags, Params};

/// Algorithm identifier; versions the whole descriptor format including the
/// pwxform protocol constants.
pub const ALGORITHM_ID: &str = "yescrypt-kdf";

const CONFIG: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_encode_padding(false)
    .with_decode_padding_mode(DecodePaddingMode::RequireNone);

const ITOA64: GeneralPurpose = GeneralPurpose::new(&alphabet::CRYPT, CONFIG);

/// Why a descriptor failed to parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The algorithm identifier is not one this crate produces.
    #[error("unrecognized algorithm identifier")]
    UnknownAlgorithm,
    /// Missing, extra or empty fields.
    #[error("descriptor structure is malformed")]
    Structure,
    /// A numeric parameter field is not a plain decimal number or violates
    /// a parameter invariant.
    #[error("parameter field `{0}` is malformed or out of range")]
    Parameter(&'static str),
    /// Salt or digest is not valid unpadded itoa64 base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Serialize parameters, salt and digest into a descriptor string.
pub fn encode(params: &Params, salt: &[u8], digest: &[u8]) -> String {
    format!(
        "${}${},{},{},{},{},{}${}${}",
        ALGORITHM_ID,
        params.flags().bits(),
        params.n(),
        params.r(),
        params.p(),
        params.t(),
        params.g(),
        ITOA64.encode(salt),
        ITOA64.encode(digest),
    )
}

fn parse_num<T: core::str::FromStr>(field: &str, name: &'static str) -> Result<T, DecodeError> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::Parameter(name));
    }
    field.parse().map_err(|_| DecodeError::Parameter(name))
}

/// Parse a descriptor back into `(params, salt, digest)`.
///
/// Inverse of [`encode`]: `parse(&encode(p, s, d))` yields exactly
/// `(p, s, d)`.
pub fn parse(descriptor: &str) -> Result<(Params, Vec<u8>, Vec<u8>), DecodeError> {
    let rest = descriptor.strip_prefix('$').ok_or(DecodeError::Structure)?;
    let mut fields = rest.split('$');
    let algo = fields.next().ok_or(DecodeError::Structure)?;
    let cost_field = fields.next().ok_or(DecodeError::Structure)?;
    let salt_field = fields.next().ok_or(DecodeError::Structure)?;
    let digest_field = fields.next().ok_or(DecodeError::Structure)?;
    if fields.next().is_some() {
        return Err(DecodeError::Structure);
    }

    if algo != ALGORITHM_ID {
        return Err(DecodeError::UnknownAlgorithm);
    }

    let mut cost = cost_field.split(',');
    let mut next_field = || cost.next().ok_or(DecodeError::Structure);
    let flag_bits: u32 = parse_num(next_field()?, "flags")?;
    let n: u64 = parse_num(next_field()?, "N")?;
    let r: u32 = parse_num(next_field()?, "r")?;
    let p: u32 = parse_num(next_field()?, "p")?;
    let t: u32 = parse_num(next_field()?, "t")?;
    let g: u32 = parse_num(next_field()?, "g")?;
    if cost.next().is_some() {
        return Err(DecodeError::Structure);
    }

    let flags = Flags::from_bits(flag_bits).ok_or(DecodeError::Parameter("flags"))?;
    let params = Params::new(n, r, p, t, g, flags).map_err(|e| match e {
        ParamsError::InvalidParameter { name, .. } => DecodeError::Parameter(name),
        _ => DecodeError::Structure,
    })?;

    let salt = ITOA64.decode(salt_field)?;
    let digest = ITOA64.decode(digest_field)?;
    if digest.is_empty() {
        return Err(DecodeError::Structure);
    }

    Ok((params, salt, digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_params() -> Params {
        Params::new(4096, 8, 2, 1, 3, Flags::default()).unwrap()
    }

    #[test]
    fn round_trip_exact() {
        let cases: [(&[u8], &[u8]); 3] = [
            (b"somesalt", b"0123456789abcdef0123456789abcdef"),
            (b"", b"x"),
            (&[0u8, 255, 1, 254], &[7u8; 64]),
        ];
        for (salt, digest) in cases {
            let encoded = encode(&sample_params(), salt, digest);
            let (params, parsed_salt, parsed_digest) = parse(&encoded).unwrap();
            assert_eq!(params, sample_params());
            assert_eq!(parsed_salt, salt);
            assert_eq!(parsed_digest, digest);
        }
    }

    #[test]
    fn descriptor_shape() {
        let params = Params::scrypt(1024, 8, 16).unwrap();
        let encoded = encode(&params, b"NaCl", b"\x01\x02\x03");
        assert!(encoded.starts_with("$yescrypt-kdf$0,1024,8,16,0,0$"));
        assert_eq!(encoded.matches('$').count(), 4);
    }

    #[test]
    fn rejects_unknown_algorithm() {
        let encoded = encode(&sample_params(), b"salt", b"digest00");
        let tampered = encoded.replace("yescrypt-kdf", "yescrypt-kdg");
        assert_eq!(parse(&tampered), Err(DecodeError::UnknownAlgorithm));
    }

    #[test]
    fn rejects_structural_damage() {
        let encoded = encode(&sample_params(), b"salt", b"digest00");

        // no leading separator
        assert_eq!(parse(&encoded[1..]), Err(DecodeError::Structure));
        // trailing field
        assert_eq!(parse(&format!("{encoded}$x")), Err(DecodeError::Structure));
        // missing digest field
        let truncated = encoded.rsplit_once('$').unwrap().0;
        assert_eq!(parse(truncated), Err(DecodeError::Structure));
        // dropped cost field
        let fewer = encoded.replacen(",8,", ",", 1);
        assert_eq!(parse(&fewer), Err(DecodeError::Structure));
    }

    #[test]
    fn rejects_malformed_numbers() {
        for bad in [
            "$yescrypt-kdf$3,+1024,8,1,0,0$c2FsdA$ZGlnZXN0",
            "$yescrypt-kdf$3,1024,8x,1,0,0$c2FsdA$ZGlnZXN0",
            "$yescrypt-kdf$3,,8,1,0,0$c2FsdA$ZGlnZXN0",
            "$yescrypt-kdf$3,99999999999999999999,8,1,0,0$c2FsdA$ZGlnZXN0",
        ] {
            assert!(matches!(parse(bad), Err(DecodeError::Parameter(_))), "{bad}");
        }
    }

    #[test]
    fn rejects_invalid_parameter_combinations() {
        // N not a power of two
        assert_eq!(
            parse("$yescrypt-kdf$0,1000,8,1,0,0$c2FsdA$ZGlnZXN0"),
            Err(DecodeError::Parameter("N"))
        );
        // undefined flag bits
        assert_eq!(
            parse("$yescrypt-kdf$4,1024,8,1,0,0$c2FsdA$ZGlnZXN0"),
            Err(DecodeError::Parameter("flags"))
        );
        // r = 0
        assert_eq!(
            parse("$yescrypt-kdf$0,1024,0,1,0,0$c2FsdA$ZGlnZXN0"),
            Err(DecodeError::Parameter("r"))
        );
    }

    #[test]
    fn rejects_padded_or_invalid_base64() {
        assert!(matches!(
            parse("$yescrypt-kdf$0,1024,8,1,0,0$c2FsdA==$ZGlnZXN0"),
            Err(DecodeError::Base64(_))
        ));
        assert!(matches!(
            parse("$yescrypt-kdf$0,1024,8,1,0,0$c2FsdA$ZGlnZXN*"),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn rejects_empty_digest() {
        assert_eq!(
            parse("$yescrypt-kdf$0,1024,8,1,0,0$c2FsdA$"),
            Err(DecodeError::Structure)
        );
    }
}
