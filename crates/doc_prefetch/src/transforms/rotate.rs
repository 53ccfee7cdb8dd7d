use super::DocTransform;
use crate::pixels::{ImageShape, PixelImage};
use crate::random::RandomSource;
use anyhow::{ensure, Result};

/// Resampling mode used when a rotated destination pixel lands between
/// source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

/// How source reads outside the image bounds are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderMode {
    /// A constant fill value.
    #[default]
    Constant,
    /// Clamp to the nearest edge pixel.
    Replicate,
}

/// Rotates the image about its center.
///
/// When `max_angle > 0` and `max_angle > min_angle`, the angle is drawn
/// uniformly from `[min_angle, max_angle]` degrees and negated with
/// probability `prob_negative`; otherwise the angle is 0. Positive angles
/// rotate the content clockwise. The output keeps the input channel count
/// and spatial size and is always a float buffer.
#[derive(Debug)]
pub struct Rotate {
    min_angle: f32,
    max_angle: f32,
    prob_negative: f32,
    interpolation: Interpolation,
    border_mode: BorderMode,
    border_value: f32,
    cur_angle: Option<f32>,
}

impl Rotate {
    pub fn new(min_angle: f32, max_angle: f32, prob_negative: f32) -> Result<Self> {
        let rotate = Self {
            min_angle,
            max_angle,
            prob_negative,
            interpolation: Interpolation::default(),
            border_mode: BorderMode::default(),
            border_value: 0.0,
            cur_angle: None,
        };
        rotate.validate()?;
        Ok(rotate)
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_border(mut self, mode: BorderMode, value: f32) -> Self {
        self.border_mode = mode;
        self.border_value = value;
        self
    }

    /// The most recently sampled angle in degrees, if any.
    pub fn current_angle(&self) -> Option<f32> {
        self.cur_angle
    }

    fn read(&self, input: &PixelImage, y: i64, x: i64, c: usize) -> f32 {
        let shape = input.shape();
        match self.border_mode {
            BorderMode::Constant => {
                if y < 0 || x < 0 || y >= shape.height as i64 || x >= shape.width as i64 {
                    self.border_value
                } else {
                    input.value(y as usize, x as usize, c)
                }
            }
            BorderMode::Replicate => {
                let y = y.clamp(0, shape.height as i64 - 1) as usize;
                let x = x.clamp(0, shape.width as i64 - 1) as usize;
                input.value(y, x, c)
            }
        }
    }

    fn sample_at(&self, input: &PixelImage, sy: f32, sx: f32, c: usize) -> f32 {
        match self.interpolation {
            Interpolation::Nearest => {
                self.read(input, sy.round() as i64, sx.round() as i64, c)
            }
            Interpolation::Bilinear => {
                let y0 = sy.floor();
                let x0 = sx.floor();
                let fy = sy - y0;
                let fx = sx - x0;
                let (y0, x0) = (y0 as i64, x0 as i64);

                let v00 = self.read(input, y0, x0, c);
                let v01 = self.read(input, y0, x0 + 1, c);
                let v10 = self.read(input, y0 + 1, x0, c);
                let v11 = self.read(input, y0 + 1, x0 + 1, c);

                v00 * (1.0 - fy) * (1.0 - fx)
                    + v01 * (1.0 - fy) * fx
                    + v10 * fy * (1.0 - fx)
                    + v11 * fy * fx
            }
        }
    }
}

impl DocTransform for Rotate {
    fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.prob_negative),
            "prob_negative must be in [0, 1] (got {})",
            self.prob_negative
        );
        Ok(())
    }

    fn sample_params(&mut self, rng: &mut RandomSource, _in_shape: ImageShape) -> Result<()> {
        let mut angle = 0.0;
        if self.max_angle > 0.0 && self.max_angle > self.min_angle {
            angle = rng.next_float(self.min_angle, self.max_angle)?;
            if rng.next_float(0.0, 1.0)? <= self.prob_negative {
                angle = -angle;
            }
        }
        self.cur_angle = Some(angle);
        Ok(())
    }

    fn output_shape(&self, in_shape: ImageShape) -> Result<ImageShape> {
        ensure!(
            self.cur_angle.is_some(),
            "rotation parameters not sampled: call sample_params first"
        );
        Ok(in_shape)
    }

    fn execute(&self, _rng: &mut RandomSource, input: &PixelImage) -> Result<PixelImage> {
        let angle = self
            .cur_angle
            .ok_or_else(|| anyhow::anyhow!("rotation parameters not sampled"))?;
        let shape = input.shape();
        let (height, width, channels) = (shape.height, shape.width, shape.channels);
        let cy = (height as f32 - 1.0) / 2.0;
        let cx = (width as f32 - 1.0) / 2.0;
        let (sin, cos) = angle.to_radians().sin_cos();

        // Inverse mapping: for every destination pixel, rotate back into the
        // source frame and resample.
        let mut out = Vec::with_capacity(shape.element_count());
        for y in 0..height {
            for x in 0..width {
                let dy = y as f32 - cy;
                let dx = x as f32 - cx;
                let sx = cos * dx + sin * dy + cx;
                let sy = -sin * dx + cos * dy + cy;
                for c in 0..channels {
                    out.push(self.sample_at(input, sy, sx, c));
                }
            }
        }
        PixelImage::from_f32(shape, out)
    }
}
