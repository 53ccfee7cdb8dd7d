use anyhow::{ensure, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// A seeded pseudo-random generator owned by a single pipeline instance.
///
/// Every random decision in the pipeline (source selection, cursor skips,
/// transform parameters, noise) draws from one `RandomSource`, so a fixed
/// seed reproduces an entire run. Never relies on process-wide random state.
///
/// # Example
/// ```ignore
/// let mut rng = RandomSource::new(Some(42));
/// let idx = rng.next_int(10)?;          // in [0, 10)
/// let angle = rng.next_float(-5.0, 5.0)?; // in [-5.0, 5.0]
/// ```
#[derive(Debug)]
pub struct RandomSource {
    rng: StdRng,
    seed: u64,
}

impl RandomSource {
    /// Creates a new generator. If `seed` is `None`, a seed is drawn from
    /// process entropy (the effective seed is still queryable afterwards).
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| rand::rng().random());
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Returns the effective seed in use.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Deterministically reseeds the generator.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.seed = seed;
    }

    /// Uniform integer in `[0, n)`. Fails if `n == 0`.
    pub fn next_int(&mut self, n: u32) -> Result<u32> {
        ensure!(n > 0, "next_int requires n > 0 (got {})", n);
        Ok(self.rng.random_range(0..n))
    }

    /// Uniform float in `[min, max]`, inclusive of both bounds.
    /// Fails if `max < min`.
    pub fn next_float(&mut self, min: f32, max: f32) -> Result<f32> {
        ensure!(
            max >= min,
            "next_float requires max >= min (got min={}, max={})",
            min,
            max
        );
        Ok(self.rng.random_range(min..=max))
    }

    /// Draws `count` independent Gaussian samples with the given mean and
    /// standard deviation. Fails if `count == 0` or `std_dev <= 0`.
    pub fn next_gaussian(&mut self, count: usize, mean: f32, std_dev: f32) -> Result<Vec<f32>> {
        ensure!(count > 0, "next_gaussian requires count > 0");
        ensure!(
            std_dev > 0.0,
            "next_gaussian requires std_dev > 0 (got {})",
            std_dev
        );
        let normal = Normal::new(mean, std_dev)?;
        Ok((0..count).map(|_| normal.sample(&mut self.rng)).collect())
    }
}
