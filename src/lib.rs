#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Re-export sha2
pub use sha2;

/// Salsa20 permutation kernel
pub mod salsa20;

/// pwxform S-box transform
pub mod pwx;

/// Block mixing and the SMix engine
pub(crate) mod romix;

/// PBKDF2-HMAC-SHA256 implementation (1 iteration special case)
pub mod pbkdf2_1;

/// Scratch memory management
pub mod memory;

/// Cost parameters, flags and errors
pub mod params;

/// Encoded hash descriptors
pub mod encoding;

/// The top-level derivation pipeline
pub mod kdf;


pub use encoding::DecodeError;
pub use kdf::{ENCODED_DKLEN, derive, derive_encoded, verify_encoded};
pub use params::{Error, Flags, MAX_DKLEN, MAX_N, MAX_RP, Params};
