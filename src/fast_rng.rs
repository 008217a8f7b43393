// Per-particle random number stream using OpenMC's PCG-LCG algorithm.
// See: openmc-source-code/random_lcg.cpp
//
// Each particle history owns one of these; nothing is shared between
// threads, so no locking is involved during transport.

use rand::{RngCore, SeedableRng};
use rand_distr::{Distribution, Exp};

/// LCG multiplier (same as OpenMC)
const PRN_MULT: u64 = 6364136223846793005;
/// LCG additive constant (same as OpenMC)
const PRN_ADD: u64 = 1442695040888963407;
/// Stride between independent history streams
const PRN_STRIDE: u64 = 152917;

/// Fast RNG using OpenMC's PCG-LCG algorithm.
///
/// Reference: Melissa E. O'Neill, "PCG: A Family of Simple Fast Space-Efficient
/// Statistically Good Algorithms for Random Number Generation"
#[derive(Clone, Copy, Debug)]
pub struct FastRng {
    seed: u64,
}

impl FastRng {
    /// Create a new FastRng with the given seed
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Stream for history `history_id` of a run seeded with `master_seed`.
    pub fn for_history(master_seed: u64, history_id: u64) -> Self {
        let mut rng = Self::new(
            master_seed
                .wrapping_add(history_id.wrapping_mul(PRN_STRIDE))
                .wrapping_mul(PRN_MULT),
        );
        // Discard the first output so neighbouring seeds decorrelate
        rng.next_u64();
        rng
    }

    /// Generate a random f64 in [0, 1) - matches OpenMC's prn() function
    #[inline(always)]
    pub fn random(&mut self) -> f64 {
        (self.next_u64() as f64) * 5.421010862427522e-20
    }

    /// Sample a flight distance from an exponential distribution with the given rate.
    /// A rate of zero gives an infinite distance.
    #[inline]
    pub fn exponential(&mut self, rate: f64) -> f64 {
        match Exp::new(rate) {
            Ok(exp) if rate > 0.0 => exp.sample(self),
            _ => f64::INFINITY,
        }
    }

    /// Derive an independent stream for a secondary particle.
    pub fn split(&mut self) -> Self {
        let mut child = Self::new(self.next_u64() ^ PRN_ADD);
        child.next_u64();
        child
    }
}

impl SeedableRng for FastRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self {
            seed: u64::from_le_bytes(seed),
        }
    }
}

impl RngCore for FastRng {
    #[inline(always)]
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    #[inline(always)]
    fn next_u64(&mut self) -> u64 {
        // Advance the LCG
        self.seed = PRN_MULT.wrapping_mul(self.seed).wrapping_add(PRN_ADD);

        // PCG output permutation (RXS-M-XS variant)
        let word = ((self.seed >> ((self.seed >> 59) + 5)) ^ self.seed)
            .wrapping_mul(12605985483714917081);
        (word >> 43) ^ word
    }

    #[inline]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut left = dest;
        while left.len() >= 8 {
            let bytes = self.next_u64().to_le_bytes();
            left[..8].copy_from_slice(&bytes);
            left = &mut left[8..];
        }
        if !left.is_empty() {
            let bytes = self.next_u64().to_le_bytes();
            left.copy_from_slice(&bytes[..left.len()]);
        }
    }

    #[inline]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_uniform_draws_stay_in_unit_interval() {
        let mut rng = FastRng::for_history(3, 17);
        let mut sum = 0.0;
        for _ in 0..20_000 {
            let xi = rng.random();
            assert!((0.0..1.0).contains(&xi), "xi = {}", xi);
            sum += xi;
        }
        assert!((sum / 20_000.0 - 0.5).abs() < 0.01);
        // Usable wherever the physics routines take an `Rng`
        let _: f64 = rng.gen();
    }

    #[test]
    fn test_exponential_mean() {
        let mut rng = FastRng::new(7);
        let rate = 2.5;
        let n = 200_000;
        let mean: f64 = (0..n).map(|_| rng.exponential(rate)).sum::<f64>() / n as f64;
        assert!((mean - 1.0 / rate).abs() < 0.01, "mean = {}", mean);
    }

    #[test]
    fn test_exponential_zero_rate_is_infinite() {
        let mut rng = FastRng::new(7);
        assert!(rng.exponential(0.0).is_infinite());
    }

    #[test]
    fn test_history_streams_are_reproducible_and_distinct() {
        let mut a = FastRng::for_history(1, 0);
        let mut b = FastRng::for_history(1, 1);
        assert_ne!(a.random(), b.random());

        let mut c = FastRng::for_history(1, 0);
        let mut d = FastRng::for_history(1, 0);
        for _ in 0..50 {
            assert_eq!(c.random(), d.random());
        }
    }

    #[test]
    fn test_split_is_independent_of_parent_sequence() {
        let mut parent = FastRng::new(99);
        let mut child = parent.split();
        assert_ne!(parent.random(), child.random());
    }
}
