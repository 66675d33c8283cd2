use alloc::vec::Vec;
use rand_core::CryptoRng;
use zeroize::Zeroize;

use crate::arith::Modulus;
use crate::error::{Error, Result};
use crate::random::ShareSource;

/// Whether the masking invariants are re-checked after every coefficient.
///
/// Checking reconstructs secrets in the clear, so it is off by default and meant for tests and
/// bring-up runs, never for trace capture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verification {
    /// Invariants are not checked
    #[default]
    Disabled,
    /// Invariants are checked; a violation panics
    Enabled,
}

impl Verification {
    pub(crate) fn enabled(self) -> bool {
        self == Self::Enabled
    }
}

/// Allocate a zeroed buffer, reporting failure instead of aborting.
pub(crate) fn zeroed(len: usize) -> Result<Vec<u32>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| Error::Allocation(len))?;
    buf.resize(len, 0);
    Ok(buf)
}

/// A coefficient vector split into arithmetic shares.
///
/// Stored coefficient-major: the `nshares` shares of coefficient `i` are contiguous.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedVector {
    nshares: usize,
    data: Vec<u32>,
}

impl SharedVector {
    /// An all-zero vector of `ncoeffs` coefficients with `nshares` shares each
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if the buffer cannot be allocated.
    pub fn zeroed(ncoeffs: usize, nshares: usize) -> Result<Self> {
        let len = ncoeffs
            .checked_mul(nshares)
            .ok_or(Error::Allocation(usize::MAX))?;
        Ok(Self {
            nshares,
            data: zeroed(len)?,
        })
    }

    /// Number of coefficients
    pub fn ncoeffs(&self) -> usize {
        self.data.len().checked_div(self.nshares).unwrap_or(0)
    }

    /// Number of shares per coefficient
    pub fn nshares(&self) -> usize {
        self.nshares
    }

    /// The shares of coefficient `i`
    pub fn shares(&self, i: usize) -> &[u32] {
        &self.data[i * self.nshares..(i + 1) * self.nshares]
    }

    /// The shares of coefficient `i`, mutably
    pub fn shares_mut(&mut self, i: usize) -> &mut [u32] {
        &mut self.data[i * self.nshares..(i + 1) * self.nshares]
    }

    /// Iterate over the shares of each coefficient
    pub fn iter(&self) -> impl Iterator<Item = &[u32]> {
        self.data.chunks_exact(self.nshares)
    }

    /// Iterate mutably over the shares of each coefficient
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut [u32]> {
        self.data.chunks_exact_mut(self.nshares)
    }

    /// All shares, coefficient-major
    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    /// Copy the shares of `other`, which must have the same shape.
    pub fn copy_from(&mut self, other: &Self) {
        self.data.copy_from_slice(&other.data);
    }

    /// Sum the shares of coefficient `i` modulo `q`.
    ///
    /// This recombines the secret in a single register and exists for verification and
    /// diagnostics only.
    pub fn reconstruct(&self, i: usize, q: &Modulus) -> u32 {
        q.reduce(self.shares(i).iter().map(|&s| u64::from(s)).sum())
    }
}

impl Zeroize for SharedVector {
    fn zeroize(&mut self) {
        self.data.as_mut_slice().zeroize();
    }
}

/// Split each coefficient of `x` into `out.nshares()` shares modulo `q`.
///
/// Shares `1..n` are fresh uniform values and share 0 absorbs their negation, so the shares of
/// every coefficient sum to the coefficient modulo `q`. With a single share this is a copy.
/// Coefficients must already be reduced modulo `q`. Returns the number of coefficients masked.
///
/// # Panics
///
/// Panics if `out` does not hold exactly `x.len()` coefficients. With
/// [`Verification::Enabled`], also panics if a coefficient fails to reconstruct.
pub fn mask<R: CryptoRng>(
    source: &mut ShareSource<R>,
    q: &Modulus,
    x: &[u32],
    out: &mut SharedVector,
    verification: Verification,
) -> usize {
    assert_eq!(x.len(), out.ncoeffs(), "masked vector has the wrong length");

    let mut masked = 0;
    for (i, (&coeff, shares)) in x.iter().zip(out.iter_mut()).enumerate() {
        let (first, rest) = shares.split_at_mut(1);
        first[0] = coeff;

        for share in rest {
            let r = source.next_mod(q);
            first[0] = q.sub(first[0], r);
            *share = r;
        }

        if verification.enabled() {
            let sum: u64 = shares.iter().map(|&s| u64::from(s)).sum();
            assert_eq!(q.reduce(sum), coeff, "masking invariant violated at coefficient {i}");
        }

        masked += 1;
    }

    masked
}
