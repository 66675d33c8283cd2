//! Parameter sets. A `Params` value replaces the compile-time constants of a device build: the
//! compression family, the two moduli, the share count, and the shape of the two ciphertext
//! components `B` (the vector part) and `C` (the polynomial part).
//!
//! Dimensions are runtime values so that one binary can drive every parameter set, but they are
//! fixed for the lifetime of a [`crate::Context`]: buffers are sized once from them.

use crate::arith::{Modulus, ceil_log2};
use crate::error::{Error, Result};

/// The share count used by the presets
pub const DEFAULT_SHARES: usize = 4;

/// Largest shared domain (in bits) the arithmetic shares may occupy. Shares live in `u32` words
/// and the masked rounding needs one bit of headroom.
pub const MAX_SHARED_BITS: u32 = 31;

/// Which compression rule the ciphertext components follow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    /// `round(x * 2^d / q) mod 2^d`, for a prime `q`
    Kyber,
    /// `x >> (from - to)`, for a power-of-two `q`
    Saber,
}

/// Shape of one ciphertext component
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Component {
    /// Number of coefficients
    pub ncoeffs: usize,
    /// Bit width of an uncompressed coefficient
    pub compress_from: u32,
    /// Bit width of a compressed coefficient
    pub compress_to: u32,
}

impl Component {
    /// Number of groups of 32 coefficients (one coefficient per bit lane) needed to bitslice
    /// this component.
    #[must_use]
    pub const fn lane_groups(&self) -> usize {
        self.ncoeffs.div_ceil(32)
    }

    /// Number of bitsliced planes this component contributes to the combined vector
    #[must_use]
    pub const fn planes(&self) -> usize {
        self.lane_groups() * self.compress_to as usize
    }
}

/// A complete configuration of the masked comparison
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Params {
    /// Compression rule
    pub family: Family,
    /// Modulus of the `B` coefficients and of every arithmetic share
    pub q: u32,
    /// Modulus of the public `C` coefficients
    pub p: u32,
    /// Number of arithmetic shares per coefficient
    pub nshares: usize,
    /// The vector part of the ciphertext
    pub b: Component,
    /// The polynomial part of the ciphertext
    pub c: Component,
}

impl Params {
    /// The same parameter set with a different share count
    #[must_use]
    pub const fn with_shares(mut self, nshares: usize) -> Self {
        self.nshares = nshares;
        self
    }

    /// Number of fractional bits carried through the masked rounding.
    ///
    /// Each share is rounded down on its own, so the re-summed value can fall short of the true
    /// fixed-point value by up to `nshares - 1` units of `2^-f`. The fractional part of
    /// `x * 2^d / q + 1/2` is never smaller than `1 / 2q` for odd `q`, so `2^f >= 2q(nshares - 1)`
    /// keeps the deficit from crossing an integer. At least one bit is kept so that the rounding
    /// constant `q * 2^(f-1)` is an integer.
    #[must_use]
    pub fn frac_bits(&self) -> u32 {
        let bound = 2 * u64::from(self.q) * (self.nshares.saturating_sub(1) as u64);
        ceil_log2(bound).max(1)
    }

    /// Number of bitsliced planes in the combined `B || C` vector handed to the comparator
    #[must_use]
    pub const fn combined_planes(&self) -> usize {
        self.b.planes() + self.c.planes()
    }

    /// Check every constraint the masking and compression code relies on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] naming the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        let q = Modulus::new(self.q).ok_or(Error::InvalidParams("q must be at least 2"))?;
        let p = Modulus::new(self.p).ok_or(Error::InvalidParams("p must be at least 2"))?;

        if self.p > self.q {
            return Err(Error::InvalidParams("p must not exceed q"));
        }
        if self.nshares == 0 {
            return Err(Error::InvalidParams("at least one share is required"));
        }
        if self.b.ncoeffs == 0 || self.c.ncoeffs == 0 {
            return Err(Error::InvalidParams("components must not be empty"));
        }

        for component in [&self.b, &self.c] {
            if component.compress_to == 0 {
                return Err(Error::InvalidParams("compressed width must be positive"));
            }
            if component.compress_to > component.compress_from {
                return Err(Error::InvalidParams("compression must not widen"));
            }
        }

        match self.family {
            Family::Kyber => {
                // the fractional-bit bound needs x * 2^d / q + 1/2 to never be an integer
                if self.q & 1 == 0 {
                    return Err(Error::InvalidParams("rounding compression needs an odd q"));
                }
                let widest = self.b.compress_to.max(self.c.compress_to);
                if widest + self.frac_bits() > MAX_SHARED_BITS {
                    return Err(Error::InvalidParams("shared rounding domain exceeds 31 bits"));
                }
            }
            Family::Saber => {
                let (Some(q_bits), Some(p_bits)) = (q.log2(), p.log2()) else {
                    return Err(Error::InvalidParams("shift compression needs power-of-two moduli"));
                };
                if self.b.compress_from != q_bits || self.c.compress_from != p_bits {
                    return Err(Error::InvalidParams("compress_from must match the modulus width"));
                }
                if q_bits > MAX_SHARED_BITS {
                    return Err(Error::InvalidParams("shared domain exceeds 31 bits"));
                }
            }
        }

        Ok(())
    }
}

const KYBER_Q: u32 = 3329;
const KYBER_BITS: u32 = 12;
const SABER_EQ: u32 = 13;
const SABER_EP: u32 = 10;

const fn kyber(k: usize, du: u32, dv: u32) -> Params {
    Params {
        family: Family::Kyber,
        q: KYBER_Q,
        p: KYBER_Q,
        nshares: DEFAULT_SHARES,
        b: Component {
            ncoeffs: k * 256,
            compress_from: KYBER_BITS,
            compress_to: du,
        },
        c: Component {
            ncoeffs: 256,
            compress_from: KYBER_BITS,
            compress_to: dv,
        },
    }
}

const fn saber(l: usize, et: u32) -> Params {
    Params {
        family: Family::Saber,
        q: 1 << SABER_EQ,
        p: 1 << SABER_EP,
        nshares: DEFAULT_SHARES,
        b: Component {
            ncoeffs: l * 256,
            compress_from: SABER_EQ,
            compress_to: SABER_EP,
        },
        c: Component {
            ncoeffs: 256,
            compress_from: SABER_EP,
            compress_to: et,
        },
    }
}

/// Kyber512: `u` compressed to 10 bits, `v` to 4 bits
pub const KYBER_512: Params = kyber(2, 10, 4);

/// Kyber768: `u` compressed to 10 bits, `v` to 4 bits
pub const KYBER_768: Params = kyber(3, 10, 4);

/// Kyber1024: `u` compressed to 11 bits, `v` to 5 bits
pub const KYBER_1024: Params = kyber(4, 11, 5);

/// LightSaber: `b'` rounded from 13 to 10 bits, `c_m` from 10 to 3 bits
pub const LIGHT_SABER: Params = saber(2, 3);

/// Saber: `b'` rounded from 13 to 10 bits, `c_m` from 10 to 4 bits
pub const SABER: Params = saber(3, 4);

/// FireSaber: `b'` rounded from 13 to 10 bits, `c_m` from 10 to 6 bits
pub const FIRE_SABER: Params = saber(4, 6);
