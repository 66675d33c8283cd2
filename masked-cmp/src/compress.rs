use crate::arith::{Modulus, bit_mask};
use crate::param::{Component, Family, Params};
use crate::shares::{SharedVector, Verification};
use crate::truncate::Truncate;

/// The domain of shares leaving the masked compression.
///
/// The shares of a coefficient sum, modulo `2^bits`, to a fixed-point value whose top
/// `bits - frac_bits` bits are the compressed coefficient.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SharedDomain {
    /// Width of the arithmetic shares
    pub bits: u32,
    /// Low-order bits dropped after conversion to Boolean shares
    pub frac_bits: u32,
}

impl SharedDomain {
    /// Width of the compressed coefficient
    #[must_use]
    pub const fn output_bits(&self) -> u32 {
        self.bits - self.frac_bits
    }

    /// Recombine shares and truncate the fractional bits. Verification only.
    #[must_use]
    pub fn reconstruct(&self, shares: &[u32]) -> u32 {
        let sum = shares.iter().fold(0u32, |acc, &s| acc.wrapping_add(s));
        (sum & bit_mask(self.bits)) >> self.frac_bits
    }
}

/// Modulus compression, in the clear and share-wise
pub trait Compress {
    /// Compress one unmasked coefficient of `component`.
    fn compress(&self, x: u32, component: &Component) -> u32;

    /// The domain of the shares produced by [`Compress::shared_compress`].
    fn shared_domain(&self, component: &Component) -> SharedDomain;

    /// Compress the arithmetic shares (modulo `q`) of one coefficient in place, without
    /// recombining them.
    fn shared_compress(&self, shares: &mut [u32], component: &Component);

    /// Compress every coefficient of an unmasked vector in place. Returns the number of
    /// coefficients compressed.
    fn compress_vector(&self, xs: &mut [u32], component: &Component) -> usize {
        let mut compressed = 0;
        for x in xs {
            *x = self.compress(*x, component);
            compressed += 1;
        }
        compressed
    }

    /// Compress every coefficient of a shared vector in place.
    ///
    /// # Panics
    ///
    /// With [`Verification::Enabled`], panics if compressing the shares and recombining them
    /// disagrees with recombining first and compressing in the clear.
    fn shared_compress_vector(
        &self,
        v: &mut SharedVector,
        component: &Component,
        q: &Modulus,
        verification: Verification,
    ) {
        let domain = self.shared_domain(component);

        for i in 0..v.ncoeffs() {
            let expected = verification
                .enabled()
                .then(|| self.compress(v.reconstruct(i, q), component));

            let shares = v.shares_mut(i);
            self.shared_compress(shares, component);

            if let Some(expected) = expected {
                assert_eq!(
                    domain.reconstruct(shares),
                    expected,
                    "compression does not commute with masking at coefficient {i}"
                );
            }
        }
    }
}

/// Compression of power-of-two moduli: drop the low `from - to` bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShiftCompressor;

impl Compress for ShiftCompressor {
    fn compress(&self, x: u32, component: &Component) -> u32 {
        x >> (component.compress_from - component.compress_to)
    }

    fn shared_domain(&self, component: &Component) -> SharedDomain {
        SharedDomain {
            bits: component.compress_from,
            frac_bits: component.compress_from - component.compress_to,
        }
    }

    // `2^from` divides `q`, so reducing each share keeps the sum correct modulo `2^from`. The
    // shift itself happens after conversion, where it is linear.
    fn shared_compress(&self, shares: &mut [u32], component: &Component) {
        let mask = bit_mask(component.compress_from);
        for share in shares {
            *share &= mask;
        }
    }
}

/// Compression of prime moduli: `round(x * 2^d / q) mod 2^d`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundingCompressor {
    q: Modulus,
    frac_bits: u32,
}

impl RoundingCompressor {
    /// Round modulo `q`, carrying `frac_bits` fractional bits through the masked variant
    #[must_use]
    pub const fn new(q: Modulus, frac_bits: u32) -> Self {
        Self { q, frac_bits }
    }
}

impl Compress for RoundingCompressor {
    // round(a / b) = floor((a + b/2) / b). With q odd, floor(q/2) gives the same result as
    // exact halving, since x * 2^d / q is never a half-integer.
    fn compress(&self, x: u32, component: &Component) -> u32 {
        let d = component.compress_to;
        let q_half = u64::from(self.q.get() >> 1);
        let y = self.q.div_floor((u64::from(x) << d) + q_half);
        u32::truncate(y) & bit_mask(d)
    }

    fn shared_domain(&self, component: &Component) -> SharedDomain {
        SharedDomain {
            bits: component.compress_to + self.frac_bits,
            frac_bits: self.frac_bits,
        }
    }

    // Each share is scaled by 2^(d+f) / q and floored on its own. The rounding constant is
    // added to share 0 only, otherwise it would be counted `nshares` times. The `q` multiples
    // hidden in the share sum turn into multiples of 2^(d+f) and vanish under the final mask.
    fn shared_compress(&self, shares: &mut [u32], component: &Component) {
        let bits = component.compress_to + self.frac_bits;
        let rounding = u64::from(self.q.get()) << (self.frac_bits - 1);

        let mut offset = rounding;
        for share in shares {
            let scaled = (u64::from(*share) << bits) + offset;
            *share = u32::truncate(self.q.div_floor(scaled)) & bit_mask(bits);
            offset = 0;
        }
    }
}

/// The compression strategy of a parameter set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compressor {
    /// Saber-style shift
    Shift(ShiftCompressor),
    /// Kyber-style rounded division
    Rounding(RoundingCompressor),
}

impl Compressor {
    /// The compressor matching `params.family`. `params` must have been validated.
    #[must_use]
    pub fn for_params(params: &Params, q: Modulus) -> Self {
        match params.family {
            Family::Saber => Self::Shift(ShiftCompressor),
            Family::Kyber => Self::Rounding(RoundingCompressor::new(q, params.frac_bits())),
        }
    }
}

impl Compress for Compressor {
    fn compress(&self, x: u32, component: &Component) -> u32 {
        match self {
            Self::Shift(c) => c.compress(x, component),
            Self::Rounding(c) => c.compress(x, component),
        }
    }

    fn shared_domain(&self, component: &Component) -> SharedDomain {
        match self {
            Self::Shift(c) => c.shared_domain(component),
            Self::Rounding(c) => c.shared_domain(component),
        }
    }

    fn shared_compress(&self, shares: &mut [u32], component: &Component) {
        match self {
            Self::Shift(c) => c.shared_compress(shares, component),
            Self::Rounding(c) => c.shared_compress(shares, component),
        }
    }
}

#[cfg(test)]
#[allow(clippy::integer_division_remainder_used)]
mod test {
    use super::*;
    use crate::param::{KYBER_512, KYBER_768, KYBER_1024, SABER};
    use crate::random::ShareSource;
    use crate::shares::mask;
    use num_rational::Ratio;
    use rand::{SeedableRng, rngs::StdRng};

    const Q: u32 = 3329;

    fn rounding(nshares: usize) -> RoundingCompressor {
        let params = KYBER_768.with_shares(nshares);
        RoundingCompressor::new(Modulus::new(Q).unwrap(), params.frac_bits())
    }

    fn component(d: u32) -> Component {
        Component {
            ncoeffs: Q as usize,
            compress_from: 12,
            compress_to: d,
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn rational_compress(x: u32, d: u32) -> u32 {
        let fraction = Ratio::new(u64::from(x) << d, u64::from(Q));
        (fraction.round().to_integer() as u32) & bit_mask(d)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn float_compress(x: u32, d: u32) -> u32 {
        let y = f64::from(x) * f64::from(1u32 << d) / f64::from(Q);
        (y.round() as u32) & bit_mask(d)
    }

    #[test]
    fn compress_kat() {
        let c = rounding(4);
        for d in 1..=11 {
            for x in 0..Q {
                let actual = c.compress(x, &component(d));
                assert_eq!(actual, rational_compress(x, d), "x: {x}, d: {d}");
                assert_eq!(actual, float_compress(x, d), "x: {x}, d: {d}");
            }
        }
    }

    #[test]
    fn compress_matches_reference_formula() {
        // ((x << d) + q/2) / q mod 2^d, with the hardware divider
        fn reference(x: u32, d: u32) -> u32 {
            (((x << d) + Q / 2) / Q) % (1 << d)
        }

        let c = rounding(2);
        for d in [1, 4, 5, 10, 11] {
            for x in 0..Q {
                assert_eq!(c.compress(x, &component(d)), reference(x, d));
            }
        }
    }

    #[test]
    fn shift_compress() {
        let c = ShiftCompressor;
        let b = SABER.b;
        assert_eq!(c.compress(0x1fff, &b), 0x3ff);
        assert_eq!(c.compress(0x0007, &b), 0);
        assert_eq!(c.compress(0x0008, &b), 1);

        let domain = c.shared_domain(&SABER.c);
        assert_eq!(domain.bits, 10);
        assert_eq!(domain.output_bits(), 4);
    }

    #[test]
    fn vector_compression_reports_coefficients() {
        let c = rounding(2);
        let mut xs = [0, 1664, 3328, 832, 2496];
        assert_eq!(c.compress_vector(&mut xs, &KYBER_768.c), 5);
        assert_eq!(xs, [0, 8, 0, 4, 12]);
        assert_eq!(c.compress_vector(&mut [], &KYBER_768.c), 0);
    }

    // Every coefficient, masked with fresh shares, must compress the same way share-wise as in
    // the clear.
    fn commutes<C: Compress>(c: &C, q: Modulus, component: &Component, nshares: usize) {
        let mut source = ShareSource::new(StdRng::seed_from_u64(u64::from(component.compress_to)));
        let x: alloc::vec::Vec<u32> = (0..q.get()).collect();
        let domain = c.shared_domain(component);

        for _ in 0..4 {
            let mut v = SharedVector::zeroed(x.len(), nshares).unwrap();
            mask(&mut source, &q, &x, &mut v, Verification::Disabled);
            c.shared_compress_vector(&mut v, component, &q, Verification::Enabled);

            for (i, &coeff) in x.iter().enumerate() {
                assert_eq!(domain.reconstruct(v.shares(i)), c.compress(coeff, component));
            }
        }
    }

    #[test]
    fn rounding_commutes_with_masking() {
        let q = Modulus::new(Q).unwrap();
        for params in [KYBER_512, KYBER_768, KYBER_1024] {
            for nshares in 1..=5 {
                let params = params.with_shares(nshares);
                let c = Compressor::for_params(&params, q);
                commutes(&c, q, &params.b, nshares);
                commutes(&c, q, &params.c, nshares);
            }
        }
    }

    #[test]
    fn shift_commutes_with_masking() {
        let q = Modulus::new(SABER.q).unwrap();
        for nshares in 1..=5 {
            let c = Compressor::for_params(&SABER, q);
            commutes(&c, q, &SABER.b, nshares);
        }

        // `C` coefficients live modulo p but are shared modulo q
        let p = Modulus::new(SABER.p).unwrap();
        let mut source = ShareSource::new(StdRng::seed_from_u64(99));
        let x: alloc::vec::Vec<u32> = (0..p.get()).collect();
        let mut v = SharedVector::zeroed(x.len(), 3).unwrap();
        mask(&mut source, &q, &x, &mut v, Verification::Disabled);
        ShiftCompressor.shared_compress_vector(&mut v, &SABER.c, &q, Verification::Enabled);
    }

    #[test]
    fn worst_case_fraction() {
        // x = 2 maps to 2 * 2^10 / 3329 + 1/2 = 1.1151..., the share-wise floors must not pull
        // it below 1 however the shares fall.
        let c = rounding(4);
        let comp = component(10);
        let q = Modulus::new(Q).unwrap();
        for r in [0, 1, 2, 1664, 3327, 3328] {
            let mut shares = [q.sub(2, 3 * r % Q), r, r, r];
            let expected = c.compress(2, &comp);
            c.shared_compress(&mut shares, &comp);
            assert_eq!(c.shared_domain(&comp).reconstruct(&shares), expected, "r = {r}");
        }
    }
}
