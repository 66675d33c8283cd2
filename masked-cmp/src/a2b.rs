use alloc::vec::Vec;
use rand_core::CryptoRng;
use zeroize::Zeroize;

use crate::compress::SharedDomain;
use crate::error::Result;
use crate::gadgets::{AdderScratch, refresh, sec_add};
use crate::param::Params;
use crate::random::ShareSource;
use crate::shares::{SharedVector, zeroed};

/// Number of coefficients packed into one bitsliced word
pub const LANES: usize = 32;

/// A Boolean-shared, bitsliced vector.
///
/// Plane `k` holds one bit of up to 32 coefficients (one per lane) and is shared over
/// `nshares` words stored at `k * nshares .. (k + 1) * nshares`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitslicedShares {
    nshares: usize,
    words: Vec<u32>,
}

impl BitslicedShares {
    /// An all-zero vector of `planes` planes
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Allocation`] if the buffer cannot be allocated.
    pub fn zeroed(planes: usize, nshares: usize) -> Result<Self> {
        Ok(Self {
            nshares,
            words: zeroed(planes * nshares)?,
        })
    }

    /// Number of planes
    pub fn planes(&self) -> usize {
        self.words.len().checked_div(self.nshares).unwrap_or(0)
    }

    /// Number of shares per plane
    pub fn nshares(&self) -> usize {
        self.nshares
    }

    /// The shares of plane `k`
    pub fn plane(&self, k: usize) -> &[u32] {
        &self.words[k * self.nshares..(k + 1) * self.nshares]
    }

    /// The shares of plane `k`, mutably
    pub fn plane_mut(&mut self, k: usize) -> &mut [u32] {
        &mut self.words[k * self.nshares..(k + 1) * self.nshares]
    }

    /// All words, plane-major. This is the block written to trace dumps.
    pub fn as_slice(&self) -> &[u32] {
        &self.words
    }
}

impl Zeroize for BitslicedShares {
    fn zeroize(&mut self) {
        self.words.as_mut_slice().zeroize();
    }
}

/// Bit `bit` of each value, lane `l` taken from `values[l]`
pub fn bitslice(values: impl Iterator<Item = u32>, bit: u32) -> u32 {
    values
        .enumerate()
        .fold(0, |acc, (lane, v)| acc | (((v >> bit) & 1) << lane))
}

/// Arithmetic-to-Boolean conversion of compressed `B` and `C` shares.
pub trait A2bConverter {
    /// Convert the arithmetic shares of `b` and `c`, which live in `b_domain` and `c_domain`,
    /// into one bitsliced Boolean sharing of the compressed coefficients.
    ///
    /// `out` receives, for `B` and then `C`, for each group of 32 coefficients, one plane per
    /// compressed bit, least significant first.
    fn keep_bitsliced<R: CryptoRng>(
        &mut self,
        b: &SharedVector,
        b_domain: SharedDomain,
        c: &SharedVector,
        c_domain: SharedDomain,
        out: &mut BitslicedShares,
        source: &mut ShareSource<R>,
    );
}

/// Bitsliced A2B conversion by masked addition.
///
/// Within a group of 32 coefficients, arithmetic share `j` is bitsliced on its own. That is
/// already a Boolean sharing of share `j` in which only slot `j` is non-zero; after a refresh the
/// sharings are summed with [`sec_add`]. The carry chain runs over all `bits` planes of the shared
/// domain and the fractional planes are dropped at the end.
#[derive(Clone, Debug)]
pub struct BitslicedA2b {
    acc: Vec<u32>,
    addend: Vec<u32>,
    scratch: AdderScratch,
}

impl BitslicedA2b {
    /// A converter with scratch space for `params`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Allocation`] if the scratch buffers cannot be allocated.
    pub fn new(params: &Params, max_bits: u32) -> Result<Self> {
        let words = max_bits as usize * params.nshares;
        Ok(Self {
            acc: zeroed(words)?,
            addend: zeroed(words)?,
            scratch: AdderScratch::new(params.nshares)?,
        })
    }

    /// Convert coefficients `lo..hi` (at most 32) of `v` and write the output planes starting at
    /// plane `first` of `out`.
    #[allow(clippy::too_many_arguments, clippy::cast_possible_truncation)]
    fn convert_group<R: CryptoRng>(
        &mut self,
        v: &SharedVector,
        lo: usize,
        hi: usize,
        domain: SharedDomain,
        out: &mut BitslicedShares,
        first: usize,
        source: &mut ShareSource<R>,
    ) {
        let n = v.nshares();
        let bits = domain.bits as usize;
        let acc = &mut self.acc[..bits * n];
        let addend = &mut self.addend[..bits * n];

        for j in 0..n {
            let target = if j == 0 { &mut *acc } else { &mut *addend };
            target.fill(0);

            for (bit, plane) in target.chunks_exact_mut(n).enumerate() {
                plane[j] = bitslice((lo..hi).map(|i| v.shares(i)[j]), bit as u32);
                refresh(plane, source);
            }

            if j > 0 {
                sec_add(acc, addend, bits, &mut self.scratch, source);
            }
        }

        let frac = domain.frac_bits as usize;
        for k in 0..domain.output_bits() as usize {
            out.plane_mut(first + k)
                .copy_from_slice(&acc[(frac + k) * n..(frac + k + 1) * n]);
        }
    }

    fn convert_vector<R: CryptoRng>(
        &mut self,
        v: &SharedVector,
        domain: SharedDomain,
        out: &mut BitslicedShares,
        mut first: usize,
        source: &mut ShareSource<R>,
    ) -> usize {
        for lo in (0..v.ncoeffs()).step_by(LANES) {
            let hi = (lo + LANES).min(v.ncoeffs());
            self.convert_group(v, lo, hi, domain, out, first, source);
            first += domain.output_bits() as usize;
        }
        first
    }
}

impl Zeroize for BitslicedA2b {
    fn zeroize(&mut self) {
        self.acc.as_mut_slice().zeroize();
        self.addend.as_mut_slice().zeroize();
        self.scratch.zeroize();
    }
}

impl A2bConverter for BitslicedA2b {
    fn keep_bitsliced<R: CryptoRng>(
        &mut self,
        b: &SharedVector,
        b_domain: SharedDomain,
        c: &SharedVector,
        c_domain: SharedDomain,
        out: &mut BitslicedShares,
        source: &mut ShareSource<R>,
    ) {
        let next = self.convert_vector(b, b_domain, out, 0, source);
        let end = self.convert_vector(c, c_domain, out, next, source);
        debug_assert_eq!(end, out.planes());
    }
}
