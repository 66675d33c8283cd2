//! Gadgets on Boolean (XOR) sharings of 32-bit words.
//!
//! A sharing is a slice of `n` words whose XOR is the shared word. Linear operations (XOR,
//! shifts, masking with a public constant) are applied share by share; AND and OR use the
//! Ishai-Sahai-Wagner multiplication, which needs `n(n-1)/2` fresh random words.

use alloc::vec::Vec;
use rand_core::CryptoRng;
use zeroize::Zeroize;

use crate::error::Result;
use crate::random::ShareSource;
use crate::shares::zeroed;

/// Re-randomize a sharing without changing the shared value.
pub fn refresh<R: CryptoRng>(x: &mut [u32], source: &mut ShareSource<R>) {
    let (first, rest) = x.split_at_mut(1);
    for share in rest {
        let r = source.next_word();
        first[0] ^= r;
        *share ^= r;
    }
}

/// `x ^= y`, share by share
pub fn xor_into(x: &mut [u32], y: &[u32]) {
    for (a, b) in x.iter_mut().zip(y) {
        *a ^= b;
    }
}

// ISW multiplication of the sharings `a ^ flip` and `b ^ flip`, where the public `flip` is
// applied to share 0 only. With `flip` all-ones this computes the complement of `!a & !b`
// below, i.e. OR by De Morgan.
fn isw<R: CryptoRng>(
    a: &[u32],
    b: &[u32],
    out: &mut [u32],
    flip: u32,
    source: &mut ShareSource<R>,
) {
    let n = out.len();
    debug_assert!(a.len() == n && b.len() == n);

    let share = |x: &[u32], i: usize| if i == 0 { x[0] ^ flip } else { x[i] };

    for i in 0..n {
        out[i] = share(a, i) & share(b, i);
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let r = source.next_word();
            out[i] ^= r;
            out[j] ^= (r ^ (share(a, i) & share(b, j))) ^ (share(a, j) & share(b, i));
        }
    }

    out[0] ^= flip;
}

/// `out = a & b` on sharings
pub fn sec_and<R: CryptoRng>(a: &[u32], b: &[u32], out: &mut [u32], source: &mut ShareSource<R>) {
    isw(a, b, out, 0, source);
}

/// `out = a | b` on sharings
pub fn sec_or<R: CryptoRng>(a: &[u32], b: &[u32], out: &mut [u32], source: &mut ShareSource<R>) {
    isw(a, b, out, u32::MAX, source);
}

/// XOR of all shares. Reveals the shared word.
pub fn unmask(x: &[u32]) -> u32 {
    x.iter().fold(0, |acc, s| acc ^ s)
}

/// Scratch space for [`sec_add`], sized for one sharing.
#[derive(Clone, Debug)]
pub struct AdderScratch {
    carry: Vec<u32>,
    propagate: Vec<u32>,
    generate: Vec<u32>,
    chained: Vec<u32>,
}

impl AdderScratch {
    /// Scratch for sharings of `nshares` words
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Allocation`] if the buffers cannot be allocated.
    pub fn new(nshares: usize) -> Result<Self> {
        Ok(Self {
            carry: zeroed(nshares)?,
            propagate: zeroed(nshares)?,
            generate: zeroed(nshares)?,
            chained: zeroed(nshares)?,
        })
    }
}

impl Zeroize for AdderScratch {
    fn zeroize(&mut self) {
        self.carry.as_mut_slice().zeroize();
        self.propagate.as_mut_slice().zeroize();
        self.generate.as_mut_slice().zeroize();
        self.chained.as_mut_slice().zeroize();
    }
}

/// Add two bitsliced, Boolean-shared `bits`-bit values modulo `2^bits`: `x += y`.
///
/// Both operands are laid out plane-major: plane `b` (bit `b` of all 32 lanes) occupies words
/// `b * n .. (b + 1) * n`. This is a ripple-carry adder, one plane per step.
pub fn sec_add<R: CryptoRng>(
    x: &mut [u32],
    y: &[u32],
    bits: usize,
    scratch: &mut AdderScratch,
    source: &mut ShareSource<R>,
) {
    let n = scratch.carry.len();
    debug_assert!(x.len() >= bits * n && y.len() >= bits * n);

    let AdderScratch {
        carry,
        propagate,
        generate,
        chained,
    } = scratch;
    carry.fill(0);

    for bit in 0..bits {
        let xb = &mut x[bit * n..(bit + 1) * n];
        let yb = &y[bit * n..(bit + 1) * n];

        propagate.copy_from_slice(xb);
        xor_into(propagate, yb);

        // the carry out of the top plane is dropped
        if bit + 1 < bits {
            sec_and(xb, yb, generate, source);
            sec_and(carry, propagate, chained, source);
        }

        xb.copy_from_slice(propagate);
        xor_into(xb, carry);

        if bit + 1 < bits {
            carry.copy_from_slice(generate);
            xor_into(carry, chained);
        }
    }
}
