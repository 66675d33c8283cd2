//! The scenario orchestrator.
//!
//! A [`Context`] owns every buffer a trial touches. Buffers are sized once from the [`Params`]
//! and overwritten in place by each trial, so both scenarios run over the same memory.

use alloc::vec::Vec;
use rand_core::CryptoRng;
use subtle::{Choice, ConditionallySelectable};
use zeroize::Zeroize;

use crate::arith::Modulus;
use crate::compare::{BitslicedComparator, Comparison, MaskedComparator};
use crate::compress::{Compress, Compressor};
use crate::error::{Error, Result};
use crate::param::Params;
use crate::random::ShareSource;
use crate::shares::{SharedVector, Verification, mask, zeroed};

/// Which re-encryption the masked ciphertext stands for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Decryption succeeded: the masked ciphertext is a sharing of the received one, which was
    /// tampered with after compression.
    NoDecryptionFailure,
    /// Decryption failed: the masked ciphertext is a sharing of an unrelated random one.
    DecryptionFailure,
}

impl Scenario {
    fn failure(self) -> Choice {
        Choice::from(u8::from(self == Self::DecryptionFailure))
    }
}

/// Work done by the last [`Context::prepare`] and [`Context::compare`].
///
/// Both scenarios must produce identical counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct OpCounts {
    /// Random values drawn while preparing
    pub prepare_draws: u64,
    /// Random values drawn while comparing
    pub compare_draws: u64,
    /// Coefficients passed through the scenario selector
    pub selected: usize,
    /// Coefficients split into shares
    pub masked: usize,
    /// Public coefficients compressed
    pub compressed: usize,
}

/// Scenario state: the shared re-encryption `B`/`C`, the public ciphertext, and the comparator.
pub struct Context<R: CryptoRng, M: MaskedComparator + Zeroize = BitslicedComparator> {
    params: Params,
    q: Modulus,
    p: Modulus,
    compressor: Compressor,
    verification: Verification,
    source: ShareSource<R>,
    b: SharedVector,
    c: SharedVector,
    public_b: Vec<u32>,
    public_c: Vec<u32>,
    fresh_b: Vec<u32>,
    fresh_c: Vec<u32>,
    comparator: M,
    counts: OpCounts,
}

impl<R: CryptoRng> Context<R> {
    /// A context for `params` drawing its randomness from `rng`, comparing with a
    /// [`BitslicedComparator`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] if `params` does not validate, and
    /// [`Error::Allocation`] if a buffer cannot be allocated.
    pub fn new(params: Params, rng: R, verification: Verification) -> Result<Self> {
        let comparator = BitslicedComparator::new(&params, verification)?;
        Self::with_comparator(params, rng, verification, comparator)
    }
}

impl<R: CryptoRng, M: MaskedComparator + Zeroize> Context<R, M> {
    /// A context using the given comparator
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] if `params` does not validate, and
    /// [`Error::Allocation`] if a buffer cannot be allocated.
    pub fn with_comparator(
        params: Params,
        rng: R,
        verification: Verification,
        comparator: M,
    ) -> Result<Self> {
        params.validate()?;
        let q = Modulus::new(params.q).ok_or(Error::InvalidParams("q must be at least 2"))?;
        let p = Modulus::new(params.p).ok_or(Error::InvalidParams("p must be at least 2"))?;
        let (nb, nc) = (params.b.ncoeffs, params.c.ncoeffs);

        Ok(Self {
            params,
            q,
            p,
            compressor: Compressor::for_params(&params, q),
            verification,
            source: ShareSource::new(rng),
            b: SharedVector::zeroed(nb, params.nshares)?,
            c: SharedVector::zeroed(nc, params.nshares)?,
            public_b: zeroed(nb)?,
            public_c: zeroed(nc)?,
            fresh_b: zeroed(nb)?,
            fresh_c: zeroed(nc)?,
            comparator,
            counts: OpCounts::default(),
        })
    }

    /// Zero every owned buffer.
    pub fn reset(&mut self) {
        self.b.zeroize();
        self.c.zeroize();
        self.public_b.as_mut_slice().zeroize();
        self.public_c.as_mut_slice().zeroize();
        self.fresh_b.as_mut_slice().zeroize();
        self.fresh_c.as_mut_slice().zeroize();
        self.comparator.zeroize();
        self.counts = OpCounts::default();
    }

    /// Prepare a trial.
    ///
    /// A fresh public ciphertext and a fresh unrelated one are drawn in either scenario. The
    /// scenario only decides, coefficient by coefficient and without branching, which of the two
    /// is masked into `B`/`C`. The public ciphertext is then compressed and its first `C`
    /// coefficient incremented, so the comparison must report a difference.
    pub fn prepare(&mut self, scenario: Scenario) {
        let failure = scenario.failure();
        let start = self.source.drawn();

        self.source.draw(&self.q, &mut self.public_b);
        self.source.draw(&self.p, &mut self.public_c);
        self.source.draw(&self.q, &mut self.fresh_b);
        self.source.draw(&self.p, &mut self.fresh_c);

        let selected = select(&mut self.fresh_b, &self.public_b, failure)
            + select(&mut self.fresh_c, &self.public_c, failure);

        let masked = mask(&mut self.source, &self.q, &self.fresh_b, &mut self.b, self.verification)
            + mask(&mut self.source, &self.q, &self.fresh_c, &mut self.c, self.verification);
        self.fresh_b.as_mut_slice().zeroize();
        self.fresh_c.as_mut_slice().zeroize();

        let compressed = self.compressor.compress_vector(&mut self.public_b, &self.params.b)
            + self.compressor.compress_vector(&mut self.public_c, &self.params.c);

        // tamper with the received ciphertext after compression
        self.public_c[0] = self.public_c[0].wrapping_add(1);

        self.counts = OpCounts {
            prepare_draws: self.source.drawn() - start,
            compare_draws: 0,
            selected,
            masked,
            compressed,
        };
    }

    /// Prepare a trial in which decryption succeeded.
    pub fn prepare_no_decryption_failure(&mut self) {
        self.prepare(Scenario::NoDecryptionFailure);
    }

    /// Prepare a trial in which decryption failed.
    pub fn prepare_decryption_failure(&mut self) {
        self.prepare(Scenario::DecryptionFailure);
    }

    /// Run the masked comparison on the prepared buffers.
    pub fn compare(&mut self) -> Comparison {
        let start = self.source.drawn();
        let result = self.comparator.compare(
            &self.b,
            &self.c,
            &self.public_b,
            &self.public_c,
            &mut self.source,
        );
        self.counts.compare_draws = self.source.drawn() - start;
        result
    }

    /// Run the masked comparison and require it to report a difference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedEqual`] if the masked and public ciphertexts compare equal,
    /// which both scenarios rule out.
    pub fn run_comparison(&mut self) -> Result<()> {
        match self.compare() {
            Comparison::NotEqual => Ok(()),
            Comparison::Equal => Err(Error::UnexpectedEqual),
        }
    }

    /// Per coefficient of `B` then `C`, the distance between the compressed reconstruction of the
    /// masked ciphertext and the public one.
    ///
    /// This recombines the shares in the clear and is meant for diagnostics only.
    pub fn unmasked_difference(&self) -> Vec<u32> {
        let b = self.public_b.iter().enumerate().map(|(i, &public)| {
            let x = self.b.reconstruct(i, &self.q);
            self.compressor.compress(x, &self.params.b).abs_diff(public)
        });
        let c = self.public_c.iter().enumerate().map(|(i, &public)| {
            let x = self.c.reconstruct(i, &self.q);
            self.compressor.compress(x, &self.params.c).abs_diff(public)
        });
        b.chain(c).collect()
    }

    /// The parameter set
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The verification mode
    pub fn verification(&self) -> Verification {
        self.verification
    }

    /// The shared `B` component
    pub fn b(&self) -> &SharedVector {
        &self.b
    }

    /// The shared `C` component
    pub fn c(&self) -> &SharedVector {
        &self.c
    }

    /// The compressed public `B` component
    pub fn public_b(&self) -> &[u32] {
        &self.public_b
    }

    /// The compressed, tampered public `C` component
    pub fn public_c(&self) -> &[u32] {
        &self.public_c
    }

    /// The comparator
    pub fn comparator(&self) -> &M {
        &self.comparator
    }

    /// Work done by the last trial
    pub fn op_counts(&self) -> OpCounts {
        self.counts
    }

    /// Random values drawn since the context was created
    pub fn random_draws(&self) -> u64 {
        self.source.drawn()
    }
}

impl<R: CryptoRng, M: MaskedComparator + Zeroize> Drop for Context<R, M> {
    fn drop(&mut self) {
        self.reset();
    }
}

// `fresh[i] = if failure { fresh[i] } else { public[i] }`, in constant time. Returns the number
// of coefficients selected.
fn select(fresh: &mut [u32], public: &[u32], failure: Choice) -> usize {
    let mut selected = 0;
    for (f, p) in fresh.iter_mut().zip(public) {
        *f = u32::conditional_select(p, f, failure);
        selected += 1;
    }
    selected
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::param::{KYBER_768, SABER};
    use rand::{SeedableRng, rngs::StdRng};

    fn toy(params: Params) -> Params {
        let mut params = params.with_shares(2);
        params.b.ncoeffs = 64;
        params.c.ncoeffs = 32;
        params
    }

    fn context(params: Params, seed: u64) -> Context<StdRng> {
        Context::new(params, StdRng::seed_from_u64(seed), Verification::Enabled).unwrap()
    }

    #[test]
    fn no_failure_masks_the_public_ciphertext() {
        let mut ctx = context(toy(KYBER_768), 60);
        ctx.prepare_no_decryption_failure();

        let diff = ctx.unmasked_difference();
        assert_eq!(diff.len(), 96);
        // only the tampered coefficient differs
        assert!(diff[64] != 0);
        assert!(diff.iter().enumerate().all(|(i, &d)| i == 64 || d == 0));
    }

    #[test]
    fn failure_masks_an_unrelated_ciphertext() {
        let mut ctx = context(toy(SABER), 61);
        ctx.prepare_decryption_failure();

        let differing = ctx.unmasked_difference().iter().filter(|&&d| d != 0).count();
        assert!(differing > 48, "{differing}");
    }

    #[test]
    fn both_scenarios_report_a_difference() {
        for params in [toy(KYBER_768), toy(SABER)] {
            let mut ctx = context(params, 62);
            for _ in 0..10 {
                ctx.prepare(Scenario::NoDecryptionFailure);
                ctx.run_comparison().unwrap();
                ctx.prepare(Scenario::DecryptionFailure);
                ctx.run_comparison().unwrap();
            }
        }
    }

    #[test]
    fn scenarios_do_the_same_work() {
        let mut ctx = context(toy(KYBER_768), 63);
        ctx.prepare_no_decryption_failure();
        ctx.compare();
        let no_failure = ctx.op_counts();

        ctx.prepare_decryption_failure();
        ctx.compare();
        assert_eq!(ctx.op_counts(), no_failure);
        assert_eq!(no_failure.selected, 96);
        assert_eq!(no_failure.masked, 96);
        assert_eq!(no_failure.compressed, 96);
        // two public and two fresh vectors, one share per masked coefficient
        assert_eq!(no_failure.prepare_draws, 2 * 96 + 96);
    }

    #[test]
    fn reset_zeroes_everything() {
        let mut ctx = context(toy(SABER), 64);
        ctx.prepare_no_decryption_failure();
        ctx.compare();
        ctx.reset();

        assert!(ctx.b().as_slice().iter().all(|&x| x == 0));
        assert!(ctx.c().as_slice().iter().all(|&x| x == 0));
        assert!(ctx.public_b().iter().all(|&x| x == 0));
        assert!(ctx.public_c().iter().all(|&x| x == 0));
        assert!(ctx.comparator().combined().as_slice().iter().all(|&x| x == 0));
        assert_eq!(ctx.op_counts(), OpCounts::default());
    }

    #[test]
    fn rejects_invalid_params() {
        let params = KYBER_768.with_shares(0);
        assert!(matches!(
            Context::new(params, StdRng::seed_from_u64(0), Verification::Disabled),
            Err(Error::InvalidParams(_))
        ));
    }

    #[test]
    fn selector() {
        let public = [1, 2, 3];
        let mut fresh = [7, 8, 9];
        assert_eq!(select(&mut fresh, &public, Choice::from(0)), 3);
        assert_eq!(fresh, public);

        let mut fresh = [7, 8, 9];
        select(&mut fresh, &public, Choice::from(1));
        assert_eq!(fresh, [7, 8, 9]);
    }
}
