use crate::pixels::{ImageShape, PixelImage};
use anyhow::{bail, Context, Result};
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// The closed set of scalar label fields a [`DocumentRecord`] can carry.
///
/// `height` and `width` are included here because they are valid label
/// names, but they are always derived from the image payload rather than
/// stored as optional fields.
pub const LABEL_FIELDS: &[&str] = &[
    "country",
    "language",
    "decade",
    "column_count",
    "possible_records",
    "actual_records",
    "pages_per_image",
    "docs_per_image",
    "machine_text",
    "hand_text",
    "layout_category",
    "layout_type",
    "record_type_broad",
    "record_type_fine",
    "media_type",
    "is_document",
    "is_graphical",
    "is_historical",
    "is_textual",
    "dbid",
    "original_aspect_ratio",
    "num",
    "height",
    "width",
];

/// An encoded image embedded in a document record: raw encoded bytes plus
/// the declared channel count and spatial size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePayload {
    /// Encoded image bytes (PNG, JPEG, ...).
    pub data: Vec<u8>,
    /// Declared channel count. Forcing this to 3 requests an RGB decode
    /// regardless of the stored encoding.
    pub channels: u32,
    pub height: u32,
    pub width: u32,
}

impl ImagePayload {
    /// Encodes a decoded image into a payload, recording its dimensions.
    pub fn encode(img: &DynamicImage, format: ImageFormat) -> Result<Self> {
        let channels = match img {
            DynamicImage::ImageLuma8(_) => 1,
            _ => 3,
        };
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, format)
            .context("failed to encode image payload")?;
        Ok(Self {
            data: bytes.into_inner(),
            channels,
            height: img.height(),
            width: img.width(),
        })
    }

    /// The shape the payload declares, before decoding.
    pub fn declared_shape(&self) -> ImageShape {
        ImageShape::new(
            self.channels as usize,
            self.height as usize,
            self.width as usize,
        )
    }

    /// Decodes the payload into a pixel buffer, honouring the declared
    /// channel count (1 decodes to grayscale, 3 to RGB).
    pub fn decode(&self) -> Result<PixelImage> {
        let img = image::load_from_memory(&self.data).context("malformed image payload")?;
        let img = match self.channels {
            1 => DynamicImage::ImageLuma8(img.to_luma8()),
            3 => DynamicImage::ImageRgb8(img.to_rgb8()),
            other => bail!("unsupported declared channel count: {}", other),
        };
        Ok(PixelImage::from_dynamic(&img))
    }
}

/// A single stored document: an embedded image plus optional scalar fields.
///
/// Every optional field is `f32` — the same element type as the label
/// tensors the pipeline emits. Large integer identifiers (e.g. `dbid`) may
/// lose precision; that matches the output the downstream trainer expects,
/// so the type is deliberately not widened.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub image: ImagePayload,
    #[serde(default)]
    pub country: Option<f32>,
    #[serde(default)]
    pub language: Option<f32>,
    #[serde(default)]
    pub decade: Option<f32>,
    #[serde(default)]
    pub column_count: Option<f32>,
    #[serde(default)]
    pub possible_records: Option<f32>,
    #[serde(default)]
    pub actual_records: Option<f32>,
    #[serde(default)]
    pub pages_per_image: Option<f32>,
    #[serde(default)]
    pub docs_per_image: Option<f32>,
    #[serde(default)]
    pub machine_text: Option<f32>,
    #[serde(default)]
    pub hand_text: Option<f32>,
    #[serde(default)]
    pub layout_category: Option<f32>,
    #[serde(default)]
    pub layout_type: Option<f32>,
    #[serde(default)]
    pub record_type_broad: Option<f32>,
    #[serde(default)]
    pub record_type_fine: Option<f32>,
    #[serde(default)]
    pub media_type: Option<f32>,
    #[serde(default)]
    pub is_document: Option<f32>,
    #[serde(default)]
    pub is_graphical: Option<f32>,
    #[serde(default)]
    pub is_historical: Option<f32>,
    #[serde(default)]
    pub is_textual: Option<f32>,
    #[serde(default)]
    pub dbid: Option<f32>,
    #[serde(default)]
    pub original_aspect_ratio: Option<f32>,
    #[serde(default)]
    pub num: Option<f32>,
}

impl Default for ImagePayload {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            channels: 0,
            height: 0,
            width: 0,
        }
    }
}

impl DocumentRecord {
    /// Parses a record from its stored byte representation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("malformed document record")
    }

    /// Serializes the record into its stored byte representation.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context("failed to serialize document record")
    }

    /// Whether `name` is a member of the closed label-field set.
    pub fn is_label_name(name: &str) -> bool {
        LABEL_FIELDS.contains(&name)
    }

    /// Looks up the scalar value for `name`, substituting `missing_value`
    /// when the field is unset. `height`/`width` always come from the image
    /// payload. Fails on a name outside the closed field set.
    pub fn label_value(&self, name: &str, missing_value: f32) -> Result<f32> {
        let value = match name {
            "country" => self.country,
            "language" => self.language,
            "decade" => self.decade,
            "column_count" => self.column_count,
            "possible_records" => self.possible_records,
            "actual_records" => self.actual_records,
            "pages_per_image" => self.pages_per_image,
            "docs_per_image" => self.docs_per_image,
            "machine_text" => self.machine_text,
            "hand_text" => self.hand_text,
            "layout_category" => self.layout_category,
            "layout_type" => self.layout_type,
            "record_type_broad" => self.record_type_broad,
            "record_type_fine" => self.record_type_fine,
            "media_type" => self.media_type,
            "is_document" => self.is_document,
            "is_graphical" => self.is_graphical,
            "is_historical" => self.is_historical,
            "is_textual" => self.is_textual,
            "dbid" => self.dbid,
            "original_aspect_ratio" => self.original_aspect_ratio,
            "num" => self.num,
            "height" => return Ok(self.image.height as f32),
            "width" => return Ok(self.image.width as f32),
            other => bail!("unrecognized label name: {}", other),
        };
        Ok(value.unwrap_or(missing_value))
    }
}
