//! Equality of a masked ciphertext with a public one.

use alloc::vec::Vec;
use core::mem;
use rand_core::CryptoRng;
use zeroize::Zeroize;

use crate::a2b::{A2bConverter, BitslicedA2b, BitslicedShares, LANES, bitslice};
use crate::arith::Modulus;
use crate::compress::{Compress, Compressor};
use crate::error::{Error, Result};
use crate::gadgets::{sec_or, unmask};
use crate::param::{Component, Params};
use crate::random::ShareSource;
use crate::shares::{SharedVector, Verification, zeroed};

/// Outcome of a masked comparison
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    /// Every compressed coefficient matched
    Equal,
    /// At least one compressed coefficient differed
    NotEqual,
}

impl Comparison {
    /// Status code reported to the host: 0 for equal, 1 for not equal
    #[must_use]
    pub const fn status(self) -> u8 {
        match self {
            Self::Equal => 0,
            Self::NotEqual => 1,
        }
    }
}

/// Compares a masked re-encryption against a received, compressed ciphertext.
pub trait MaskedComparator {
    /// Compare the arithmetic sharings `b` and `c` (modulo `q`, uncompressed) with the compressed
    /// public vectors `public_b` and `public_c`.
    ///
    /// Only the one-bit result is ever unmasked.
    ///
    /// # Panics
    ///
    /// Implementations panic if the inputs do not match the shape they were built for.
    fn compare<R: CryptoRng>(
        &mut self,
        b: &SharedVector,
        c: &SharedVector,
        public_b: &[u32],
        public_c: &[u32],
        source: &mut ShareSource<R>,
    ) -> Comparison;
}

/// Comparison over bitsliced Boolean shares.
///
/// The inputs are compressed share-wise and converted with an [`A2bConverter`]. XORing the
/// bitsliced public vectors into share 0 leaves a sharing of the bitwise difference, which is
/// reduced to one bit with masked OR gates: first across every plane, then across the 32 lanes.
#[derive(Clone, Debug)]
pub struct BitslicedComparator<A = BitslicedA2b> {
    params: Params,
    q: Modulus,
    compressor: Compressor,
    verification: Verification,
    b: SharedVector,
    c: SharedVector,
    combined: BitslicedShares,
    acc: Vec<u32>,
    tmp: Vec<u32>,
    shifted: Vec<u32>,
    a2b: A,
}

impl BitslicedComparator {
    /// A comparator for `params` using [`BitslicedA2b`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] if `params` does not validate, and
    /// [`Error::Allocation`] if a buffer cannot be allocated.
    pub fn new(params: &Params, verification: Verification) -> Result<Self> {
        params.validate()?;
        let q = Modulus::new(params.q).ok_or(Error::InvalidParams("q must be at least 2"))?;
        let compressor = Compressor::for_params(params, q);
        let max_bits = compressor
            .shared_domain(&params.b)
            .bits
            .max(compressor.shared_domain(&params.c).bits);
        let a2b = BitslicedA2b::new(params, max_bits)?;
        Self::with_converter(params, verification, a2b)
    }
}

impl<A: A2bConverter> BitslicedComparator<A> {
    /// A comparator for `params` using the given conversion
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] if `params` does not validate, and
    /// [`Error::Allocation`] if a buffer cannot be allocated.
    pub fn with_converter(params: &Params, verification: Verification, a2b: A) -> Result<Self> {
        params.validate()?;
        let q = Modulus::new(params.q).ok_or(Error::InvalidParams("q must be at least 2"))?;
        let n = params.nshares;

        Ok(Self {
            params: *params,
            q,
            compressor: Compressor::for_params(params, q),
            verification,
            b: SharedVector::zeroed(params.b.ncoeffs, n)?,
            c: SharedVector::zeroed(params.c.ncoeffs, n)?,
            combined: BitslicedShares::zeroed(params.combined_planes(), n)?,
            acc: zeroed(n)?,
            tmp: zeroed(n)?,
            shifted: zeroed(n)?,
            a2b,
        })
    }

    /// The Boolean sharing of the difference left by the last comparison
    pub fn combined(&self) -> &BitslicedShares {
        &self.combined
    }

    // XOR the compressed public coefficients into share 0 of their planes, starting at `first`.
    // Returns the plane after the last one written.
    fn xor_public(&mut self, public: &[u32], component: &Component, mut first: usize) -> usize {
        for group in public.chunks(LANES) {
            for bit in 0..component.compress_to {
                self.combined.plane_mut(first)[0] ^= bitslice(group.iter().copied(), bit);
                first += 1;
            }
        }
        first
    }

    // `acc |= other` on sharings
    fn or_into<R: CryptoRng>(
        acc: &mut Vec<u32>,
        tmp: &mut Vec<u32>,
        other: &[u32],
        source: &mut ShareSource<R>,
    ) {
        sec_or(acc, other, tmp, source);
        mem::swap(acc, tmp);
    }
}

impl<A: A2bConverter> MaskedComparator for BitslicedComparator<A> {
    fn compare<R: CryptoRng>(
        &mut self,
        b: &SharedVector,
        c: &SharedVector,
        public_b: &[u32],
        public_c: &[u32],
        source: &mut ShareSource<R>,
    ) -> Comparison {
        assert_eq!(public_b.len(), self.params.b.ncoeffs, "public B has the wrong length");
        assert_eq!(public_c.len(), self.params.c.ncoeffs, "public C has the wrong length");

        self.b.copy_from(b);
        self.c.copy_from(c);
        self.compressor
            .shared_compress_vector(&mut self.b, &self.params.b, &self.q, self.verification);
        self.compressor
            .shared_compress_vector(&mut self.c, &self.params.c, &self.q, self.verification);

        let b_domain = self.compressor.shared_domain(&self.params.b);
        let c_domain = self.compressor.shared_domain(&self.params.c);
        self.a2b.keep_bitsliced(
            &self.b,
            b_domain,
            &self.c,
            c_domain,
            &mut self.combined,
            source,
        );

        let (params_b, params_c) = (self.params.b, self.params.c);
        let next = self.xor_public(public_b, &params_b, 0);
        self.xor_public(public_c, &params_c, next);

        self.acc.copy_from_slice(self.combined.plane(0));
        for k in 1..self.combined.planes() {
            Self::or_into(&mut self.acc, &mut self.tmp, self.combined.plane(k), source);
        }

        // shifts are linear, so they apply share by share
        for shift in [16, 8, 4, 2, 1] {
            for (s, a) in self.shifted.iter_mut().zip(&self.acc) {
                *s = a >> shift;
            }
            Self::or_into(&mut self.acc, &mut self.tmp, &self.shifted, source);
        }

        if unmask(&self.acc) & 1 == 0 {
            Comparison::Equal
        } else {
            Comparison::NotEqual
        }
    }
}

impl<A: Zeroize> Zeroize for BitslicedComparator<A> {
    fn zeroize(&mut self) {
        self.b.zeroize();
        self.c.zeroize();
        self.combined.zeroize();
        self.acc.as_mut_slice().zeroize();
        self.tmp.as_mut_slice().zeroize();
        self.shifted.as_mut_slice().zeroize();
        self.a2b.zeroize();
    }
}
