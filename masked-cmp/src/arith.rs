use crate::truncate::Truncate;

/// A public modulus together with a precomputed 64-bit reciprocal.
///
/// Secret-dependent values are never divided with the hardware `/` or `%`, whose latency depends
/// on the operands on most embedded cores. The quotient is estimated as
/// `(a * floor(2^64 / q)) >> 64`, which is never above `floor(a / q)` and at most one below it,
/// and the estimate is fixed up with a single branch-free correction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Modulus {
    q: u32,
    reciprocal: u64,
}

impl Modulus {
    /// Prepare `q` for constant-time division. Returns `None` if `q < 2`.
    #[must_use]
    pub const fn new(q: u32) -> Option<Self> {
        if q < 2 {
            return None;
        }

        // `q` is public, so the hardware divider is fine here.
        #[allow(clippy::integer_division_remainder_used, clippy::cast_possible_truncation)]
        let reciprocal = ((1u128 << 64) / q as u128) as u64;
        Some(Self { q, reciprocal })
    }

    /// The modulus itself
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.q
    }

    /// `log2(q)` if `q` is a power of two
    #[must_use]
    pub const fn log2(&self) -> Option<u32> {
        if self.q.is_power_of_two() {
            Some(self.q.trailing_zeros())
        } else {
            None
        }
    }

    // Returns the quotient estimate and the matching remainder in [0, 2q).
    #[inline]
    fn estimate(&self, a: u64) -> (u64, u64) {
        let quot = u64::truncate((u128::from(a) * u128::from(self.reciprocal)) >> 64);
        (quot, a - quot * u64::from(self.q))
    }

    /// `floor(a / q)` in time independent of `a`.
    #[inline]
    #[must_use]
    pub fn div_floor(&self, a: u64) -> u64 {
        let (quot, rem) = self.estimate(a);
        // high bit set iff rem < q, i.e. the estimate was already exact
        let exact = rem.wrapping_sub(u64::from(self.q)) >> 63;
        quot + (exact ^ 1)
    }

    /// `a mod q` in time independent of `a`.
    #[inline]
    #[must_use]
    pub fn reduce(&self, a: u64) -> u32 {
        let (_, rem) = self.estimate(a);
        self.reduce_once(rem)
    }

    /// Reduce a value known to lie in `[0, 2q)`.
    #[inline]
    #[must_use]
    pub fn reduce_once(&self, a: u64) -> u32 {
        let t = a.wrapping_sub(u64::from(self.q));
        let keep = 0u64.wrapping_sub(t >> 63);
        u32::truncate((a & keep) | (t & !keep))
    }

    /// `(a - b) mod q` for `a, b < q`.
    #[inline]
    #[must_use]
    pub fn sub(&self, a: u32, b: u32) -> u32 {
        self.reduce_once(u64::from(a) + u64::from(self.q) - u64::from(b))
    }
}

/// All-ones in the low `bits` bits. `bits` must be at most 32.
#[inline]
#[must_use]
pub const fn bit_mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1 << bits) - 1
    }
}

/// `ceil(log2(x))`, with `ceil_log2(0) == ceil_log2(1) == 0`.
#[must_use]
pub const fn ceil_log2(x: u64) -> u32 {
    if x <= 1 { 0 } else { 64 - (x - 1).leading_zeros() }
}
