use rand_core::CryptoRng;

use crate::arith::Modulus;

/// Source of fresh share values.
///
/// Wraps the caller's generator and keeps a count of the words handed out, which is how the
/// orchestrator checks that both scenarios consume the same amount of randomness.
#[derive(Debug)]
pub struct ShareSource<R> {
    rng: R,
    drawn: u64,
}

impl<R: CryptoRng> ShareSource<R> {
    /// Draw shares from `rng`
    pub fn new(rng: R) -> Self {
        Self { rng, drawn: 0 }
    }

    /// A value uniform in `[0, q)`, obtained by reducing a 64-bit word. The bias is below
    /// `q / 2^64`.
    pub fn next_mod(&mut self, q: &Modulus) -> u32 {
        self.drawn += 1;
        q.reduce(self.rng.next_u64())
    }

    /// A uniform 32-bit word, used to refresh Boolean shares
    pub fn next_word(&mut self) -> u32 {
        self.drawn += 1;
        self.rng.next_u32()
    }

    /// Fill `out` with values uniform in `[0, q)`.
    pub fn draw(&mut self, q: &Modulus, out: &mut [u32]) {
        for x in out {
            *x = self.next_mod(q);
        }
    }

    /// Total number of values handed out so far
    pub fn drawn(&self) -> u64 {
        self.drawn
    }

    /// The wrapped generator
    pub fn into_inner(self) -> R {
        self.rng
    }
}
