use super::{DocTransform, FloatRange};
use crate::pixels::{ImageShape, PixelData, PixelImage};
use crate::random::RandomSource;
use anyhow::{ensure, Result};

/// Adds zero-mean Gaussian noise to every pixel-channel value.
///
/// The standard deviation is a single value or an inclusive range sampled
/// once per image; each value then receives an independent draw. The output
/// is always a float buffer of the same shape, regardless of the input
/// element type, and values are not clamped to the integer range.
#[derive(Debug)]
pub struct GaussianNoise {
    std_dev: FloatRange,
    cur_std_dev: Option<f32>,
}

impl GaussianNoise {
    pub fn new(std_dev: FloatRange) -> Result<Self> {
        let noise = Self {
            std_dev,
            cur_std_dev: None,
        };
        noise.validate()?;
        Ok(noise)
    }
}

impl DocTransform for GaussianNoise {
    fn validate(&self) -> Result<()> {
        self.std_dev.check("noise std_dev")
    }

    fn sample_params(&mut self, rng: &mut RandomSource, _in_shape: ImageShape) -> Result<()> {
        self.cur_std_dev = Some(self.std_dev.sample(rng)?);
        Ok(())
    }

    fn output_shape(&self, in_shape: ImageShape) -> Result<ImageShape> {
        ensure!(
            self.cur_std_dev.is_some(),
            "noise parameters not sampled: call sample_params first"
        );
        Ok(in_shape)
    }

    fn execute(&self, rng: &mut RandomSource, input: &PixelImage) -> Result<PixelImage> {
        let std_dev = self
            .cur_std_dev
            .ok_or_else(|| anyhow::anyhow!("noise parameters not sampled"))?;
        let shape = input.shape();
        let noise = rng.next_gaussian(shape.element_count(), 0.0, std_dev)?;

        let out = match input.data() {
            PixelData::U8(src) => src
                .iter()
                .zip(&noise)
                .map(|(&v, &n)| v as f32 + n)
                .collect(),
            PixelData::F32(src) => src.iter().zip(&noise).map(|(&v, &n)| v + n).collect(),
        };
        PixelImage::from_f32(shape, out)
    }
}
