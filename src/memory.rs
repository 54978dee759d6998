//! Scratch memory management.
//!
//! Each SMix lane owns one [`ScratchArena`]: a contiguous word buffer
//! addressed by block index. Reservation is fallible (an out-of-memory
//! condition is an [`Error::Allocation`] value, not an abort) and the
//! contents are wiped when the arena is dropped, on success and error
//! paths alike.

use zeroize::Zeroize;

use crate::params::Error;

/// A contiguous, call-scoped scratch area of `u32` words.
pub struct ScratchArena {
    words: Vec<u32>,
}

impl ScratchArena {
    /// Reserve an arena of `words` zeroed words.
    pub fn new(words: usize) -> Result<Self, Error> {
        let mut v: Vec<u32> = Vec::new();
        v.try_reserve_exact(words).map_err(|_| Error::Allocation {
            bytes: words.saturating_mul(4),
        })?;
        v.resize(words, 0);
        Ok(Self { words: v })
    }

    /// The arena as a word slice.
    pub fn as_slice(&self) -> &[u32] {
        &self.words
    }

    /// The arena as a mutable word slice.
    pub fn as_mut_slice(&mut self) -> &mut [u32] {
        &mut self.words
    }
}

impl Drop for ScratchArena {
    fn drop(&mut self) {
        self.words.zeroize();
    }
}

/// Reinterpret little-endian bytes as words.
pub(crate) fn words_from_le_bytes(bytes: &[u8], words: &mut [u32]) {
    debug_assert_eq!(bytes.len(), words.len() * 4);
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}

/// Serialize words back to little-endian bytes.
pub(crate) fn words_to_le_bytes(words: &[u32], bytes: &mut [u8]) {
    debug_assert_eq!(bytes.len(), words.len() * 4);
    for (word, chunk) in words.iter().zip(bytes.chunks_exact_mut(4)) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}
