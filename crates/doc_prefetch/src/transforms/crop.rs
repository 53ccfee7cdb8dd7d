use super::{DocTransform, FloatRange, SizeRange};
use crate::pixels::{ImageShape, PixelImage};
use crate::random::RandomSource;
use anyhow::{bail, ensure, Result};

/// Where the crop window is positioned within the input image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropPlacement {
    /// Uniform random offset within the valid range.
    #[default]
    Random,
    /// Centered.
    Center,
    /// One of the four corners, chosen uniformly at random.
    RandomCorner,
    UpperLeft,
    UpperRight,
    BottomLeft,
    BottomRight,
}

/// Crop geometry configuration. Exactly one parameter group must be set:
///
/// - `width` + `height`: fixed pixel sizes, sampled independently.
/// - `size`: one fixed pixel size applied to both dimensions.
/// - `width_perc` + `height_perc`: fractions of the input size, sampled
///   independently.
/// - `size_perc`: one fraction applied to both dimensions.
///
/// Each entry is a single value or an inclusive range. Setting zero groups
/// or more than one is a configuration error.
#[derive(Debug, Clone, Default)]
pub struct CropConfig {
    pub width: Option<SizeRange>,
    pub height: Option<SizeRange>,
    pub size: Option<SizeRange>,
    pub width_perc: Option<FloatRange>,
    pub height_perc: Option<FloatRange>,
    pub size_perc: Option<FloatRange>,
    pub placement: CropPlacement,
}

/// Crops a window out of the input image.
///
/// `sample_params` draws the window size; `execute` draws the window
/// position per the configured [`CropPlacement`] and extracts the window,
/// preserving the input element type. The output shape keeps the channel
/// count and replaces height/width with the sampled window size.
#[derive(Debug)]
pub struct Crop {
    config: CropConfig,
    // 0 until sample_params runs.
    cur_height: usize,
    cur_width: usize,
}

impl Crop {
    pub fn new(config: CropConfig) -> Result<Self> {
        let crop = Self {
            config,
            cur_height: 0,
            cur_width: 0,
        };
        crop.validate()?;
        Ok(crop)
    }

    /// Fixed-size crop at the given placement.
    pub fn fixed(width: u32, height: u32, placement: CropPlacement) -> Result<Self> {
        Self::new(CropConfig {
            width: Some(SizeRange::fixed(width)),
            height: Some(SizeRange::fixed(height)),
            placement,
            ..CropConfig::default()
        })
    }

    fn sample_size(&mut self, rng: &mut RandomSource, in_shape: ImageShape) -> Result<()> {
        let cfg = &self.config;
        if let (Some(width), Some(height)) = (&cfg.width, &cfg.height) {
            self.cur_width = width.sample(rng)? as usize;
            self.cur_height = height.sample(rng)? as usize;
        } else if let Some(size) = &cfg.size {
            let side = size.sample(rng)? as usize;
            self.cur_width = side;
            self.cur_height = side;
        } else if let (Some(width_perc), Some(height_perc)) = (&cfg.width_perc, &cfg.height_perc) {
            self.cur_width = (width_perc.sample(rng)? * in_shape.width as f32) as usize;
            self.cur_height = (height_perc.sample(rng)? * in_shape.height as f32) as usize;
        } else if let Some(size_perc) = &cfg.size_perc {
            let frac = size_perc.sample(rng)?;
            self.cur_width = (frac * in_shape.width as f32) as usize;
            self.cur_height = (frac * in_shape.height as f32) as usize;
        } else {
            bail!("no crop parameter group configured");
        }
        Ok(())
    }

    fn offsets(
        &self,
        rng: &mut RandomSource,
        in_height: usize,
        in_width: usize,
    ) -> Result<(usize, usize)> {
        let max_top = in_height - self.cur_height;
        let max_left = in_width - self.cur_width;
        let pos = match self.config.placement {
            CropPlacement::Random => (
                rng.next_int(max_top as u32 + 1)? as usize,
                rng.next_int(max_left as u32 + 1)? as usize,
            ),
            CropPlacement::Center => (max_top / 2, max_left / 2),
            CropPlacement::RandomCorner => {
                let up = rng.next_int(2)? == 1;
                let left = rng.next_int(2)? == 1;
                (
                    if up { 0 } else { max_top },
                    if left { 0 } else { max_left },
                )
            }
            CropPlacement::UpperLeft => (0, 0),
            CropPlacement::UpperRight => (0, max_left),
            CropPlacement::BottomLeft => (max_top, 0),
            CropPlacement::BottomRight => (max_top, max_left),
        };
        Ok(pos)
    }
}

impl DocTransform for Crop {
    fn validate(&self) -> Result<()> {
        let cfg = &self.config;
        let mut groups = 0;

        if cfg.width.is_some() || cfg.height.is_some() {
            ensure!(
                cfg.width.is_some() && cfg.height.is_some(),
                "crop width and height must be configured together"
            );
            cfg.width.unwrap().check("crop width")?;
            cfg.height.unwrap().check("crop height")?;
            groups += 1;
        }
        if let Some(size) = cfg.size {
            size.check("crop size")?;
            groups += 1;
        }
        if cfg.width_perc.is_some() || cfg.height_perc.is_some() {
            ensure!(
                cfg.width_perc.is_some() && cfg.height_perc.is_some(),
                "crop width_perc and height_perc must be configured together"
            );
            cfg.width_perc.unwrap().check("crop width_perc")?;
            cfg.height_perc.unwrap().check("crop height_perc")?;
            groups += 1;
        }
        if let Some(size_perc) = cfg.size_perc {
            size_perc.check("crop size_perc")?;
            groups += 1;
        }

        ensure!(groups > 0, "no crop parameter group configured");
        ensure!(
            groups == 1,
            "multiple crop parameter groups configured ({} groups)",
            groups
        );
        Ok(())
    }

    fn sample_params(&mut self, rng: &mut RandomSource, in_shape: ImageShape) -> Result<()> {
        self.sample_size(rng, in_shape)?;
        ensure!(
            self.cur_width > 0 && self.cur_height > 0,
            "sampled crop size {}x{} is empty",
            self.cur_height,
            self.cur_width
        );
        Ok(())
    }

    fn output_shape(&self, in_shape: ImageShape) -> Result<ImageShape> {
        ensure!(
            self.cur_width > 0 && self.cur_height > 0,
            "crop parameters not sampled: call sample_params first"
        );
        Ok(ImageShape::new(
            in_shape.channels,
            self.cur_height,
            self.cur_width,
        ))
    }

    fn execute(&self, rng: &mut RandomSource, input: &PixelImage) -> Result<PixelImage> {
        let shape = input.shape();
        ensure!(
            shape.height >= self.cur_height,
            "cannot crop height {} out of image height {}",
            self.cur_height,
            shape.height
        );
        ensure!(
            shape.width >= self.cur_width,
            "cannot crop width {} out of image width {}",
            self.cur_width,
            shape.width
        );
        let (top, left) = self.offsets(rng, shape.height, shape.width)?;
        input.crop(top, left, self.cur_height, self.cur_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(height: usize, width: usize) -> PixelImage {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                for c in 0..3 {
                    data.push((y * 31 + x * 5 + c) as u8);
                }
            }
        }
        PixelImage::from_u8(ImageShape::new(3, height, width), data).unwrap()
    }

    #[test]
    fn exactly_one_group_required() {
        // Zero groups.
        assert!(Crop::new(CropConfig::default()).is_err());

        // Two groups.
        assert!(Crop::new(CropConfig {
            size: Some(SizeRange::fixed(10)),
            size_perc: Some(FloatRange::fixed(0.5)),
            ..CropConfig::default()
        })
        .is_err());

        // Width without height.
        assert!(Crop::new(CropConfig {
            width: Some(SizeRange::fixed(10)),
            ..CropConfig::default()
        })
        .is_err());

        // One well-formed group.
        assert!(Crop::new(CropConfig {
            size_perc: Some(FloatRange::bounds(0.25, 0.75)),
            ..CropConfig::default()
        })
        .is_ok());
    }

    #[test]
    fn fixed_crop_infers_expected_shape() -> Result<()> {
        let mut crop = Crop::fixed(50, 40, CropPlacement::UpperLeft)?;
        let mut rng = RandomSource::new(Some(0));

        let in_shape = ImageShape::new(3, 100, 80);
        crop.sample_params(&mut rng, in_shape)?;
        assert_eq!(crop.output_shape(in_shape)?, ImageShape::new(3, 40, 50));
        Ok(())
    }

    #[test]
    fn output_shape_requires_sampled_params() {
        let crop = Crop::fixed(10, 10, CropPlacement::Center).unwrap();
        assert!(crop.output_shape(ImageShape::new(1, 20, 20)).is_err());
    }

    #[test]
    fn upper_left_crop_is_the_exact_top_left_region() -> Result<()> {
        let mut crop = Crop::fixed(50, 40, CropPlacement::UpperLeft)?;
        let mut rng = RandomSource::new(Some(0));
        let img = gradient(100, 80);

        crop.sample_params(&mut rng, img.shape())?;
        let out = crop.execute(&mut rng, &img)?;
        assert_eq!(out.shape(), ImageShape::new(3, 40, 50));
        for y in 0..40 {
            for x in 0..50 {
                for c in 0..3 {
                    assert_eq!(out.value(y, x, c), img.value(y, x, c));
                }
            }
        }
        Ok(())
    }

    #[test]
    fn corner_placements_pin_the_window() -> Result<()> {
        let mut rng = RandomSource::new(Some(0));
        let img = gradient(10, 10);

        let mut crop = Crop::fixed(4, 4, CropPlacement::BottomRight)?;
        crop.sample_params(&mut rng, img.shape())?;
        let out = crop.execute(&mut rng, &img)?;
        assert_eq!(out.value(0, 0, 0), img.value(6, 6, 0));

        let mut crop = Crop::fixed(4, 4, CropPlacement::Center)?;
        crop.sample_params(&mut rng, img.shape())?;
        let out = crop.execute(&mut rng, &img)?;
        assert_eq!(out.value(0, 0, 0), img.value(3, 3, 0));
        Ok(())
    }

    #[test]
    fn random_placement_stays_in_bounds() -> Result<()> {
        let mut crop = Crop::fixed(6, 3, CropPlacement::Random)?;
        let mut rng = RandomSource::new(Some(11));
        let img = gradient(10, 10);
        crop.sample_params(&mut rng, img.shape())?;
        for _ in 0..100 {
            let out = crop.execute(&mut rng, &img)?;
            assert_eq!(out.shape(), ImageShape::new(3, 3, 6));
        }
        Ok(())
    }

    #[test]
    fn crop_larger_than_input_fails_at_execute() -> Result<()> {
        let mut crop = Crop::fixed(50, 40, CropPlacement::UpperLeft)?;
        let mut rng = RandomSource::new(Some(0));
        crop.sample_params(&mut rng, ImageShape::new(3, 100, 80))?;

        let small = gradient(20, 20);
        assert!(crop.execute(&mut rng, &small).is_err());
        Ok(())
    }

    #[test]
    fn percentage_crop_scales_with_input() -> Result<()> {
        let mut crop = Crop::new(CropConfig {
            size_perc: Some(FloatRange::fixed(0.5)),
            placement: CropPlacement::UpperLeft,
            ..CropConfig::default()
        })?;
        let mut rng = RandomSource::new(Some(0));
        let in_shape = ImageShape::new(1, 60, 40);
        crop.sample_params(&mut rng, in_shape)?;
        assert_eq!(crop.output_shape(in_shape)?, ImageShape::new(1, 30, 20));
        Ok(())
    }

    #[test]
    fn ranged_size_resamples_within_bounds() -> Result<()> {
        let mut crop = Crop::new(CropConfig {
            size: Some(SizeRange::bounds(4, 8)),
            placement: CropPlacement::UpperLeft,
            ..CropConfig::default()
        })?;
        let mut rng = RandomSource::new(Some(5));
        let in_shape = ImageShape::new(1, 20, 20);
        for _ in 0..50 {
            crop.sample_params(&mut rng, in_shape)?;
            let out = crop.output_shape(in_shape)?;
            assert!(out.height >= 4 && out.height <= 8);
            assert_eq!(out.height, out.width); // tied group
        }
        Ok(())
    }
}
