use anyhow::{ensure, Result};
use image::DynamicImage;
use tch::{Kind, Tensor};

/// Channel/height/width shape of a single image.
///
/// Transform stages plan their output in terms of `ImageShape`; the batch
/// dimension is added by the assembler when the batch tensor is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl ImageShape {
    pub fn new(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
        }
    }

    /// Total number of scalar values (`channels * height * width`).
    pub fn element_count(&self) -> usize {
        self.channels * self.height * self.width
    }
}

/// Element storage of a decoded image: 8-bit integer or 32-bit float.
#[derive(Debug, Clone)]
pub enum PixelData {
    U8(Vec<u8>),
    F32(Vec<f32>),
}

/// An in-memory pixel buffer with interleaved channel layout.
///
/// Values are stored row-major, channels interleaved: the value at
/// `(y, x, c)` lives at index `(y * width + x) * channels + c`. Geometric
/// transforms preserve the element type; intensity transforms (noise,
/// rotation resampling) produce `F32` buffers.
#[derive(Debug, Clone)]
pub struct PixelImage {
    shape: ImageShape,
    data: PixelData,
}

impl PixelImage {
    /// Wraps raw interleaved `u8` data. Fails if the buffer length does not
    /// match the shape.
    pub fn from_u8(shape: ImageShape, data: Vec<u8>) -> Result<Self> {
        ensure!(
            data.len() == shape.element_count(),
            "pixel buffer length {} does not match shape {:?}",
            data.len(),
            shape
        );
        Ok(Self {
            shape,
            data: PixelData::U8(data),
        })
    }

    /// Wraps raw interleaved `f32` data. Fails if the buffer length does not
    /// match the shape.
    pub fn from_f32(shape: ImageShape, data: Vec<f32>) -> Result<Self> {
        ensure!(
            data.len() == shape.element_count(),
            "pixel buffer length {} does not match shape {:?}",
            data.len(),
            shape
        );
        Ok(Self {
            shape,
            data: PixelData::F32(data),
        })
    }

    /// Converts a decoded [`DynamicImage`] into an interleaved buffer.
    /// Grayscale maps to 1 channel, everything else to 3-channel RGB.
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        match img {
            DynamicImage::ImageLuma8(gray) => Self {
                shape: ImageShape::new(1, gray.height() as usize, gray.width() as usize),
                data: PixelData::U8(gray.as_raw().clone()),
            },
            DynamicImage::ImageRgb8(rgb) => Self {
                shape: ImageShape::new(3, rgb.height() as usize, rgb.width() as usize),
                data: PixelData::U8(rgb.as_raw().clone()),
            },
            other => {
                let rgb = other.to_rgb8();
                Self {
                    shape: ImageShape::new(3, rgb.height() as usize, rgb.width() as usize),
                    data: PixelData::U8(rgb.into_raw()),
                }
            }
        }
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    pub fn is_float(&self) -> bool {
        matches!(self.data, PixelData::F32(_))
    }

    pub fn data(&self) -> &PixelData {
        &self.data
    }

    /// Reads the value at `(y, x, c)` as `f32` regardless of element type.
    /// Callers are responsible for bounds; out-of-range indices panic.
    pub fn value(&self, y: usize, x: usize, c: usize) -> f32 {
        let idx = (y * self.shape.width + x) * self.shape.channels + c;
        match &self.data {
            PixelData::U8(d) => d[idx] as f32,
            PixelData::F32(d) => d[idx],
        }
    }

    /// Extracts the `height x width` window whose top-left corner sits at
    /// `(top, left)`, preserving the element type.
    pub fn crop(&self, top: usize, left: usize, height: usize, width: usize) -> Result<Self> {
        ensure!(
            top + height <= self.shape.height && left + width <= self.shape.width,
            "crop window {}x{} at ({}, {}) exceeds image bounds {}x{}",
            height,
            width,
            top,
            left,
            self.shape.height,
            self.shape.width
        );
        let channels = self.shape.channels;
        let out_shape = ImageShape::new(channels, height, width);
        let row_len = width * channels;

        let data = match &self.data {
            PixelData::U8(src) => {
                let mut out = Vec::with_capacity(out_shape.element_count());
                for y in 0..height {
                    let start = ((top + y) * self.shape.width + left) * channels;
                    out.extend_from_slice(&src[start..start + row_len]);
                }
                PixelData::U8(out)
            }
            PixelData::F32(src) => {
                let mut out = Vec::with_capacity(out_shape.element_count());
                for y in 0..height {
                    let start = ((top + y) * self.shape.width + left) * channels;
                    out.extend_from_slice(&src[start..start + row_len]);
                }
                PixelData::F32(out)
            }
        };
        Ok(Self {
            shape: out_shape,
            data,
        })
    }

    /// Converts the buffer to a channel-first `[C, H, W]` float tensor.
    /// Integer values are widened to `f32` without rescaling, so the tensor
    /// carries the raw pixel scale.
    pub fn to_tensor(&self) -> Tensor {
        let (c, h, w) = (
            self.shape.channels as i64,
            self.shape.height as i64,
            self.shape.width as i64,
        );
        let hwc = match &self.data {
            PixelData::U8(d) => Tensor::from_slice(d).to_kind(Kind::Float),
            PixelData::F32(d) => Tensor::from_slice(d),
        };
        hwc.reshape([h, w, c]).permute([2, 0, 1]).contiguous()
    }
}
