//! Cost parameters, mode flags and the error taxonomy.
//!
//! Every invariant is enforced by [`Params::new`] before any scratch memory
//! is reserved; a constructed [`Params`] is immutable and always internally
//! consistent.

use thiserror::Error;

/// Exclusive upper bound on the memory cost `N`.
pub const MAX_N: u64 = 1 << 31;

/// Exclusive upper bound on `r * p`.
pub const MAX_RP: u64 = 1 << 30;

/// Upper bound on the derived key length (PBKDF2-HMAC-SHA256 block count
/// must fit a 32-bit counter).
pub const MAX_DKLEN: usize = 32 * (u32::MAX as usize);

/// Errors surfaced by the KDF. All of them are synchronous and none leave
/// partial output behind.
#[derive(Debug, Error)]
pub enum Error {
    /// A parameter combination violates an invariant. Deterministic; raised
    /// before any allocation.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// The offending parameter.
        name: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// Scratch memory could not be obtained. May succeed on retry with a
    /// smaller `N` or `p`.
    #[error("failed to allocate {bytes} bytes of scratch memory")]
    Allocation {
        /// Size of the failed reservation.
        bytes: usize,
    },
    /// An encoded descriptor could not be parsed.
    #[error("malformed descriptor: {0}")]
    Decode(#[from] crate::encoding::DecodeError),
}

/// Mode selection bitset.
///
/// The empty set is the scrypt-compatible baseline; unknown bits are
/// rejected rather than ignored so that descriptors stay unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags(u32);

impl Flags {
    /// Plain Salsa20/8 block mixing and no output folding. Together with
    /// `t = 0, g = 0` this is byte-compatible with RFC 7914 scrypt.
    pub const SCRYPT_COMPAT: Flags = Flags(0);

    /// Use the pwxform S-box transform for block mixing.
    pub const PWXFORM: Flags = Flags(1 << 0);

    /// Fold the derived key through HMAC-SHA256 with the "Client Key"
    /// context string before output.
    pub const CLIENT_KEY: Flags = Flags(1 << 1);

    const ALL: u32 = Self::PWXFORM.0 | Self::CLIENT_KEY.0;

    /// Reconstruct from raw bits, rejecting undefined ones.
    pub const fn from_bits(bits: u32) -> Option<Flags> {
        if bits & !Self::ALL != 0 {
            return None;
        }
        Some(Flags(bits))
    }

    /// The raw bit representation (stable; part of the descriptor format).
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set in `self`.
    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for Flags {
    fn default() -> Self {
        Flags(Self::PWXFORM.0 | Self::CLIENT_KEY.0)
    }
}

impl core::ops::BitOr for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

/// Validated cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    n: u64,
    r: u32,
    p: u32,
    t: u32,
    g: u32,
    flags: Flags,
}

impl Params {
    /// Validate and construct a parameter set.
    ///
    /// `n` is the per-lane block count (power of two, `2 <= n < 2^31`),
    /// `r` the block size multiplier, `p` the lane count, `t` the extra
    /// time cost, `g` the gating round count.
    pub fn new(n: u64, r: u32, p: u32, t: u32, g: u32, flags: Flags) -> Result<Self, Error> {
        if n < 2 {
            return Err(Error::InvalidParameter {
                name: "N",
                reason: "must be at least 2",
            });
        }
        if n >= MAX_N {
            return Err(Error::InvalidParameter {
                name: "N",
                reason: "must be below 2^31",
            });
        }
        if !n.is_power_of_two() {
            return Err(Error::InvalidParameter {
                name: "N",
                reason: "must be a power of two",
            });
        }
        if r == 0 {
            return Err(Error::InvalidParameter {
                name: "r",
                reason: "must be at least 1",
            });
        }
        if p == 0 {
            return Err(Error::InvalidParameter {
                name: "p",
                reason: "must be at least 1",
            });
        }
        if (r as u64) * (p as u64) >= MAX_RP {
            return Err(Error::InvalidParameter {
                name: "r*p",
                reason: "must be below 2^30",
            });
        }

        let params = Self { n, r, p, t, g, flags };
        // the whole scratch requirement has to be addressable
        if params.total_memory_bytes().is_none() {
            return Err(Error::InvalidParameter {
                name: "N*r*p",
                reason: "scratch requirement overflows the address space",
            });
        }

        Ok(params)
    }

    /// Scrypt-compatible parameters: empty flags, `t = 0`, `g = 0`.
    pub fn scrypt(n: u64, r: u32, p: u32) -> Result<Self, Error> {
        Self::new(n, r, p, 0, 0, Flags::SCRYPT_COMPAT)
    }

    /// Memory cost: blocks per lane.
    pub const fn n(&self) -> u64 {
        self.n
    }

    /// Block size multiplier.
    pub const fn r(&self) -> u32 {
        self.r
    }

    /// Lane (parallelism) count.
    pub const fn p(&self) -> u32 {
        self.p
    }

    /// Extra time cost: the mix phase runs `t + 1` passes.
    pub const fn t(&self) -> u32 {
        self.t
    }

    /// Gating rounds over the joined lane outputs.
    pub const fn g(&self) -> u32 {
        self.g
    }

    /// Mode flags.
    pub const fn flags(&self) -> Flags {
        self.flags
    }

    /// Words (`u32`) per block: `32 * r`.
    pub(crate) const fn block_words(&self) -> usize {
        32 * self.r as usize
    }

    /// Words per lane arena: `n * 32 * r`. Guaranteed not to overflow by
    /// [`Params::new`].
    pub(crate) const fn lane_words(&self) -> usize {
        self.n as usize * self.block_words()
    }

    /// Total scratch requirement in bytes across all lanes, or `None` if it
    /// does not fit the address space.
    pub fn total_memory_bytes(&self) -> Option<usize> {
        let lane_bytes = (self.n as u128) * 128 * (self.r as u128);
        let total = lane_bytes * (self.p as u128);
        if total > usize::MAX as u128 {
            return None;
        }
        Some(total as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reference_parameters() {
        let params = Params::new(1024, 8, 16, 0, 0, Flags::SCRYPT_COMPAT).unwrap();
        assert_eq!(params.n(), 1024);
        assert_eq!(params.block_words(), 256);
        assert_eq!(params.lane_words(), 1024 * 256);
        assert_eq!(params.total_memory_bytes(), Some(1024 * 128 * 8 * 16));
    }

    #[test]
    fn rejects_non_power_of_two_n() {
        for n in [3u64, 6, 1000, 1025] {
            assert!(matches!(
                Params::new(n, 1, 1, 0, 0, Flags::SCRYPT_COMPAT),
                Err(Error::InvalidParameter { name: "N", .. })
            ));
        }
    }

    #[test]
    fn rejects_small_and_large_n() {
        assert!(matches!(
            Params::new(0, 1, 1, 0, 0, Flags::SCRYPT_COMPAT),
            Err(Error::InvalidParameter { name: "N", .. })
        ));
        assert!(matches!(
            Params::new(1, 1, 1, 0, 0, Flags::SCRYPT_COMPAT),
            Err(Error::InvalidParameter { name: "N", .. })
        ));
        assert!(matches!(
            Params::new(MAX_N, 1, 1, 0, 0, Flags::SCRYPT_COMPAT),
            Err(Error::InvalidParameter { name: "N", .. })
        ));
    }

    #[test]
    fn rejects_zero_r_and_p() {
        assert!(matches!(
            Params::new(16, 0, 1, 0, 0, Flags::SCRYPT_COMPAT),
            Err(Error::InvalidParameter { name: "r", .. })
        ));
        assert!(matches!(
            Params::new(16, 1, 0, 0, 0, Flags::SCRYPT_COMPAT),
            Err(Error::InvalidParameter { name: "p", .. })
        ));
    }

    #[test]
    fn rejects_rp_product_at_threshold() {
        assert!(matches!(
            Params::new(16, 1 << 15, 1 << 15, 0, 0, Flags::SCRYPT_COMPAT),
            Err(Error::InvalidParameter { name: "r*p", .. })
        ));
        // just below the threshold passes the r*p check itself
        assert!(Params::new(2, (1 << 15) - 1, 1 << 15, 0, 0, Flags::SCRYPT_COMPAT).is_ok());
    }

    #[test]
    fn flags_round_trip_and_reject_unknown_bits() {
        for flags in [
            Flags::SCRYPT_COMPAT,
            Flags::PWXFORM,
            Flags::CLIENT_KEY,
            Flags::PWXFORM | Flags::CLIENT_KEY,
        ] {
            assert_eq!(Flags::from_bits(flags.bits()), Some(flags));
        }
        assert_eq!(Flags::from_bits(1 << 2), None);
        assert_eq!(Flags::from_bits(u32::MAX), None);
        assert_eq!(Flags::default(), Flags::PWXFORM | Flags::CLIENT_KEY);
    }
}
