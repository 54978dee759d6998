//! PBKDF2-HMAC-SHA256 implementation (1 iteration special case).
//!
//! The outer stretch only ever runs a single PBKDF2 iteration, so the whole
//! construction reduces to one HMAC per 32-byte output block. The password
//! is folded into precomputed inner/outer compression states once; deriving
//! any amount of key material afterwards never touches the password again.

use sha2::{Digest, digest::crypto_common};
use zeroize::Zeroize;

use crate::params::MAX_DKLEN;

const IV: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

const OPAD: u8 = 0x5c;
const IPAD: u8 = 0x36;

#[inline(always)]
fn compress(words: &mut [u32; 8], bytes: &[u8; 64]) {
    let mut block = crypto_common::Block::<sha2::Sha256>::default();
    block.copy_from_slice(bytes);
    sha2::compress256(words, core::slice::from_ref(&block));
}

/// A streaming SHA-256 over an already-compressed prefix.
///
/// `prev_blocks` counts the 64-byte blocks folded into `words` before this
/// stream took over (always 1 here: the HMAC key pad).
#[derive(Clone)]
struct Sha256Stream {
    words: [u32; 8],
    buf: [u8; 64],
    len: usize,
    prev_blocks: u64,
}

impl Sha256Stream {
    fn with_state(words: [u32; 8]) -> Self {
        Self {
            words,
            buf: [0u8; 64],
            len: 0,
            prev_blocks: 1,
        }
    }

    fn update(&mut self, mut data: &[u8]) {
        if self.len > 0 {
            let take = (64 - self.len).min(data.len());
            self.buf[self.len..self.len + take].copy_from_slice(&data[..take]);
            self.len += take;
            data = &data[take..];
            if self.len == 64 {
                let buf = self.buf;
                compress(&mut self.words, &buf);
                self.prev_blocks += 1;
                self.len = 0;
            }
        }

        let mut chunks = data.chunks_exact(64);
        for chunk in &mut chunks {
            let mut block = [0u8; 64];
            block.copy_from_slice(chunk);
            compress(&mut self.words, &block);
            self.prev_blocks += 1;
        }

        let remainder = chunks.remainder();
        self.buf[self.len..self.len + remainder.len()].copy_from_slice(remainder);
        self.len += remainder.len();
    }

    fn finalize(mut self) -> [u32; 8] {
        let total_bits = (self.prev_blocks * 64 + self.len as u64) * 8;

        let mut block = [0u8; 64];
        block[..self.len].copy_from_slice(&self.buf[..self.len]);
        block[self.len] = 0x80;
        if self.len >= 56 {
            compress(&mut self.words, &block);
            block = [0u8; 64];
        }
        block[56..].copy_from_slice(&total_bits.to_be_bytes());
        compress(&mut self.words, &block);

        self.words
    }
}

impl Drop for Sha256Stream {
    fn drop(&mut self) {
        self.words.zeroize();
        self.buf.zeroize();
    }
}

#[inline(always)]
fn digest_bytes(words: [u32; 8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    out
}

/// Precomputed HMAC-SHA256 state for the one-iteration PBKDF2 stretch.
#[derive(Clone)]
pub struct Pbkdf2HmacSha256State {
    inner_digest_words: [u32; 8],
    outer_digest_words: [u32; 8],
}

impl Pbkdf2HmacSha256State {
    /// Create a new PBKDF2-HMAC-SHA256 state from a password.
    pub fn new(password: &[u8]) -> Self {
        let mut key_pad = [0u8; 64];
        if password.len() <= key_pad.len() {
            key_pad[..password.len()].copy_from_slice(password);
        } else {
            let key_hash = sha2::Sha256::digest(password);
            key_pad[..32].copy_from_slice(&key_hash);
        }

        let mut inner_words = IV;
        let mut outer_words = IV;
        key_pad.iter_mut().for_each(|b| *b ^= IPAD);
        compress(&mut inner_words, &key_pad);
        key_pad.iter_mut().for_each(|b| *b ^= IPAD ^ OPAD);
        compress(&mut outer_words, &key_pad);
        key_pad.zeroize();

        Self {
            inner_digest_words: inner_words,
            outer_digest_words: outer_words,
        }
    }

    fn finish_outer(&self, inner_digest: &[u8; 32]) -> [u8; 32] {
        let mut outer = Sha256Stream::with_state(self.outer_digest_words);
        outer.update(inner_digest);
        digest_bytes(outer.finalize())
    }

    /// Compute a single HMAC-SHA256 value over `message`.
    pub fn hmac(&self, message: &[u8]) -> [u8; 32] {
        let mut inner = Sha256Stream::with_state(self.inner_digest_words);
        inner.update(message);
        let mut digest = digest_bytes(inner.finalize());
        let out = self.finish_outer(&digest);
        digest.zeroize();
        out
    }

    /// Derive `output.len()` bytes of key material from `salt` with one
    /// PBKDF2 iteration.
    pub fn emit(&self, salt: &[u8], output: &mut [u8]) {
        debug_assert!(output.len() <= MAX_DKLEN, "output exceeds PBKDF2 bound");

        let mut base = Sha256Stream::with_state(self.inner_digest_words);
        base.update(salt);

        for (i, chunk) in output.chunks_mut(32).enumerate() {
            let mut inner = base.clone();
            inner.update(&(i as u32 + 1).to_be_bytes());
            let mut digest = digest_bytes(inner.finalize());
            let mut block = self.finish_outer(&digest);
            chunk.copy_from_slice(&block[..chunk.len()]);
            digest.zeroize();
            block.zeroize();
        }
    }
}

impl Drop for Pbkdf2HmacSha256State {
    fn drop(&mut self) {
        self.inner_digest_words.zeroize();
        self.outer_digest_words.zeroize();
    }
}
