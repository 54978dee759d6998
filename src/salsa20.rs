//! Scalar Salsa20 permutation kernel.
//!
//! The block mixing functions only ever need the raw permutation over a
//! 64-byte state, never the full stream cipher: Salsa20/8 for the classic
//! mixing mode and the gating pass, Salsa20/2 as the diffusion finisher of
//! the pwxform mode.

/// Number of 32-bit words in one Salsa20 state.
pub const WORDS: usize = 16;

macro_rules! quarter_words {
    ($w:expr, $a:literal, $b:literal, $c:literal, $d:literal) => {
        $w[$b] ^= $w[$a].wrapping_add($w[$d]).rotate_left(7);
        $w[$c] ^= $w[$b].wrapping_add($w[$a]).rotate_left(9);
        $w[$d] ^= $w[$c].wrapping_add($w[$b]).rotate_left(13);
        $w[$a] ^= $w[$d].wrapping_add($w[$c]).rotate_left(18);
    };
}

#[inline(always)]
fn permute<const ROUND_PAIRS: usize>(block: &mut [u32; WORDS]) {
    let mut w = *block;

    for _ in 0..ROUND_PAIRS {
        quarter_words!(w, 0, 4, 8, 12);
        quarter_words!(w, 5, 9, 13, 1);
        quarter_words!(w, 10, 14, 2, 6);
        quarter_words!(w, 15, 3, 7, 11);

        quarter_words!(w, 0, 1, 2, 3);
        quarter_words!(w, 5, 6, 7, 4);
        quarter_words!(w, 10, 11, 8, 9);
        quarter_words!(w, 15, 12, 13, 14);
    }

    for i in 0..WORDS {
        block[i] = block[i].wrapping_add(w[i]);
    }
}

/// Apply the Salsa20/8 core in place.
#[inline(always)]
pub fn salsa20_8(block: &mut [u32; WORDS]) {
    permute::<4>(block);
}

/// Apply the Salsa20/2 core in place.
#[inline(always)]
pub fn salsa20_2(block: &mut [u32; WORDS]) {
    permute::<1>(block);
}
