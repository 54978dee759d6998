//! Block mixing and the memory-hard SMix engine.
//!
//! The scratch area is a flat word arena addressed by block index; every
//! data-dependent access is explicit index arithmetic over it. One block is
//! `2r` 64-byte sub-blocks (128·r bytes).

use zeroize::Zeroizing;

use crate::pwx::PwxState;
use crate::salsa20::{self, WORDS};

/// Pseudo-random block index source: the first word of a block's last
/// 64-byte sub-block, as in RFC 7914.
#[inline(always)]
pub(crate) fn integerify(block: &[u32]) -> usize {
    block[block.len() - WORDS] as usize
}

/// Classic scrypt BlockMix: chain the sub-blocks through Salsa20/8 and
/// de-interleave so adjacent outputs come from temporally distant inputs.
fn block_mix_salsa8(input: &[u32], output: &mut [u32], r: usize) {
    let mut x = [0u32; WORDS];
    x.copy_from_slice(&input[input.len() - WORDS..]);

    for i in 0..2 * r {
        for (xw, iw) in x.iter_mut().zip(&input[i * WORDS..(i + 1) * WORDS]) {
            *xw ^= *iw;
        }
        salsa20::salsa20_8(&mut x);

        let dst = if i % 2 == 0 { i / 2 } else { r + i / 2 };
        output[dst * WORDS..(dst + 1) * WORDS].copy_from_slice(&x);
    }
}

/// pwxform BlockMix: chain the sub-blocks through the S-box transform
/// (sequentially, no de-interleave), then run a Salsa20/2 finisher over the
/// last sub-block and rotate the table roles.
fn block_mix_pwx(input: &[u32], output: &mut [u32], r: usize, state: &mut PwxState) {
    let mut x = [0u32; WORDS];
    x.copy_from_slice(&input[input.len() - WORDS..]);

    for i in 0..2 * r {
        for (xw, iw) in x.iter_mut().zip(&input[i * WORDS..(i + 1) * WORDS]) {
            *xw ^= *iw;
        }
        state.transform(&mut x);
        output[i * WORDS..(i + 1) * WORDS].copy_from_slice(&x);
    }

    let last = output.len() - WORDS;
    x.copy_from_slice(&output[last..]);
    salsa20::salsa20_2(&mut x);
    output[last..].copy_from_slice(&x);

    state.rotate();
}

/// The flag-selected block mixing function, carrying any lane-local S-box
/// state.
pub(crate) enum LaneMixer {
    Salsa8,
    Pwx(PwxState),
}

impl LaneMixer {
    #[inline(always)]
    fn mix(&mut self, input: &[u32], output: &mut [u32], r: usize) {
        match self {
            LaneMixer::Salsa8 => block_mix_salsa8(input, output, r),
            LaneMixer::Pwx(state) => block_mix_pwx(input, output, r, state),
        }
    }
}

/// Run SMix for one lane.
///
/// `v` is the lane's scratch arena of `n` blocks, `block` the lane's
/// 128·r-byte input block which is replaced by the lane output. The fill
/// phase materializes the arena write-once; the mix phase then performs
/// `(t + 1) * n` data-dependent read-modify-write steps, each sequentially
/// dependent on the previous one.
pub(crate) fn smix(v: &mut [u32], block: &mut [u32], n: usize, r: usize, t: u32, mixer: &mut LaneMixer) {
    let bl = 32 * r;
    debug_assert_eq!(v.len(), n * bl);
    debug_assert_eq!(block.len(), bl);
    debug_assert!(n.is_power_of_two());

    let mut x = Zeroizing::new(block.to_vec());
    let mut y = Zeroizing::new(vec![0u32; bl]);

    for i in 0..n {
        let vi = &mut v[i * bl..(i + 1) * bl];
        vi.copy_from_slice(&x);
        mixer.mix(vi, &mut y, r);
        core::mem::swap(&mut x, &mut y);
    }

    let steps = (t as u64 + 1) * n as u64;
    for _ in 0..steps {
        let j = integerify(&x) & (n - 1);
        let vj = &v[j * bl..(j + 1) * bl];
        for (xw, vw) in x.iter_mut().zip(vj) {
            *xw ^= *vw;
        }
        mixer.mix(&x, &mut y, r);
        core::mem::swap(&mut x, &mut y);
    }

    block.copy_from_slice(&x);
}
