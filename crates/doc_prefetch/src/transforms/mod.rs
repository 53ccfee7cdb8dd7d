//! Two-phase image transformation stages.
//!
//! Every stage follows the same contract:
//! 1. `validate()` — rejects contradictory or missing configuration at
//!    setup time, before any data is read.
//! 2. `sample_params(rng, in_shape)` — draws concrete parameters (crop
//!    geometry, noise std-dev, rotation angle) for ONE image and records
//!    them as the stage's current state.
//! 3. `output_shape(in_shape)` — infers the shape the next `execute` will
//!    produce from the current parameters.
//! 4. `execute(rng, image)` — applies the current parameters to a concrete
//!    pixel buffer.
//!
//! The shape reported by `output_shape` after `sample_params` must exactly
//! match what `execute` produces on an input of that shape; the batch
//! assembler allocates its buffers from the planned shape and relies on the
//! agreement.

mod crop;
mod noise;
mod rotate;

pub use crop::{Crop, CropConfig, CropPlacement};
pub use noise::GaussianNoise;
pub use rotate::{BorderMode, Interpolation, Rotate};

use crate::pixels::{ImageShape, PixelImage};
use crate::random::RandomSource;
use anyhow::{ensure, Result};

/// A single transformation stage. See the module docs for the phase
/// contract. Stages own their sampled parameter state as plain values;
/// nothing is shared between stages or pipelines.
pub trait DocTransform: Send {
    /// Checks the stage configuration. Called once when a chain is built.
    fn validate(&self) -> Result<()>;

    /// Draws concrete parameters for the next image.
    fn sample_params(&mut self, rng: &mut RandomSource, in_shape: ImageShape) -> Result<()>;

    /// Infers the output shape under the currently sampled parameters.
    /// Fails if `sample_params` has not been called.
    fn output_shape(&self, in_shape: ImageShape) -> Result<ImageShape>;

    /// Applies the currently sampled parameters to `input`.
    fn execute(&self, rng: &mut RandomSource, input: &PixelImage) -> Result<PixelImage>;
}

/// An inclusive integer range for sampled sizes. A single fixed value is
/// represented as a degenerate range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRange {
    pub lo: u32,
    pub hi: u32,
}

impl SizeRange {
    pub fn fixed(value: u32) -> Self {
        Self {
            lo: value,
            hi: value,
        }
    }

    pub fn bounds(lo: u32, hi: u32) -> Self {
        Self { lo, hi }
    }

    pub fn is_fixed(&self) -> bool {
        self.lo == self.hi
    }

    pub(crate) fn check(&self, what: &str) -> Result<()> {
        ensure!(self.lo > 0, "{} must be positive", what);
        ensure!(
            self.hi >= self.lo,
            "{} upper bound {} < lower bound {}",
            what,
            self.hi,
            self.lo
        );
        Ok(())
    }

    pub(crate) fn sample(&self, rng: &mut RandomSource) -> Result<u32> {
        if self.is_fixed() {
            Ok(self.lo)
        } else {
            Ok(self.lo + rng.next_int(self.hi - self.lo + 1)?)
        }
    }
}

/// An inclusive float range, used for percentages and standard deviations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatRange {
    pub lo: f32,
    pub hi: f32,
}

impl FloatRange {
    pub fn fixed(value: f32) -> Self {
        Self {
            lo: value,
            hi: value,
        }
    }

    pub fn bounds(lo: f32, hi: f32) -> Self {
        Self { lo, hi }
    }

    pub fn is_fixed(&self) -> bool {
        self.lo == self.hi
    }

    pub(crate) fn check(&self, what: &str) -> Result<()> {
        ensure!(self.lo > 0.0, "{} must be positive", what);
        ensure!(
            self.hi >= self.lo,
            "{} upper bound {} < lower bound {}",
            what,
            self.hi,
            self.lo
        );
        Ok(())
    }

    pub(crate) fn sample(&self, rng: &mut RandomSource) -> Result<f32> {
        if self.is_fixed() {
            Ok(self.lo)
        } else {
            rng.next_float(self.lo, self.hi)
        }
    }
}

/// An ordered chain of transformation stages.
///
/// Each stage's planned output shape feeds the next stage's parameter
/// sampling, mirroring how `execute` threads concrete images through the
/// chain. An empty chain is valid and passes images through untouched.
pub struct TransformChain {
    stages: Vec<Box<dyn DocTransform>>,
}

impl TransformChain {
    /// Builds a chain, validating every stage configuration up front.
    pub fn new(stages: Vec<Box<dyn DocTransform>>) -> Result<Self> {
        for stage in &stages {
            stage.validate()?;
        }
        Ok(Self { stages })
    }

    /// A chain with no stages.
    pub fn identity() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Samples fresh parameters for every stage against `in_shape`, feeding
    /// each stage's planned output shape to the next. Returns the planned
    /// final shape.
    pub fn sample_params(
        &mut self,
        rng: &mut RandomSource,
        in_shape: ImageShape,
    ) -> Result<ImageShape> {
        let mut shape = in_shape;
        for stage in &mut self.stages {
            stage.sample_params(rng, shape)?;
            shape = stage.output_shape(shape)?;
        }
        Ok(shape)
    }

    /// Infers the final output shape under the current parameters, without
    /// resampling.
    pub fn output_shape(&self, in_shape: ImageShape) -> Result<ImageShape> {
        let mut shape = in_shape;
        for stage in &self.stages {
            shape = stage.output_shape(shape)?;
        }
        Ok(shape)
    }

    /// Runs `input` through every stage under the current parameters.
    pub fn execute(&self, rng: &mut RandomSource, input: &PixelImage) -> Result<PixelImage> {
        let mut image = input.clone();
        for stage in &self.stages {
            image = stage.execute(rng, &image)?;
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_range_sampling() -> Result<()> {
        let mut rng = RandomSource::new(Some(3));
        assert_eq!(SizeRange::fixed(5).sample(&mut rng)?, 5);
        for _ in 0..200 {
            let v = SizeRange::bounds(2, 4).sample(&mut rng)?;
            assert!((2..=4).contains(&v));
        }
        assert!(SizeRange::bounds(4, 2).check("size").is_err());
        assert!(SizeRange::fixed(0).check("size").is_err());
        Ok(())
    }

    #[test]
    fn float_range_sampling() -> Result<()> {
        let mut rng = RandomSource::new(Some(3));
        assert_eq!(FloatRange::fixed(0.5).sample(&mut rng)?, 0.5);
        for _ in 0..200 {
            let v = FloatRange::bounds(0.1, 0.9).sample(&mut rng)?;
            assert!((0.1..=0.9).contains(&v));
        }
        assert!(FloatRange::bounds(0.9, 0.1).check("perc").is_err());
        Ok(())
    }

    #[test]
    fn identity_chain_passes_shapes_through() -> Result<()> {
        let mut chain = TransformChain::identity();
        let mut rng = RandomSource::new(Some(1));
        let shape = ImageShape::new(3, 20, 30);
        assert_eq!(chain.sample_params(&mut rng, shape)?, shape);
        assert_eq!(chain.output_shape(shape)?, shape);
        Ok(())
    }

    #[test]
    fn chain_threads_shapes_between_stages() -> Result<()> {
        // Crop to 10x10, then noise (shape-preserving): final shape is 10x10.
        let crop = Crop::new(CropConfig {
            size: Some(SizeRange::fixed(10)),
            ..CropConfig::default()
        })?;
        let noise = GaussianNoise::new(FloatRange::fixed(1.0))?;
        let mut chain = TransformChain::new(vec![Box::new(crop), Box::new(noise)])?;

        let mut rng = RandomSource::new(Some(1));
        let out = chain.sample_params(&mut rng, ImageShape::new(1, 40, 40))?;
        assert_eq!(out, ImageShape::new(1, 10, 10));
        Ok(())
    }

    #[test]
    fn stage_without_parameter_group_is_rejected() {
        assert!(Crop::new(CropConfig::default()).is_err());
    }
}
