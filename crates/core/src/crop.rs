//! Image geometry normalization for labeling inputs.
//!
//! Source images are cut to a fixed square. The window is centred
//! horizontally but anchored at a fixed top offset: the camera rigs that
//! feed the drop bucket sit slightly low, so vertical centring would clip
//! the subject. Regions of the window that fall outside the source are left
//! as zero pixels.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::error::CoreError;

/// Default output edge length in pixels.
pub const DEFAULT_TARGET_SIZE: u32 = 512;

/// Default distance from the top edge where the crop window starts.
pub const DEFAULT_TOP_OFFSET: u32 = 10;

// ---------------------------------------------------------------------------
// ImageKind
// ---------------------------------------------------------------------------

/// Encodings accepted by the preprocessing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// Infer the encoding from the object key's extension (case-insensitive).
    pub fn from_key(key: &str) -> Result<Self, CoreError> {
        let ext = Path::new(key)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("png") => Ok(Self::Png),
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            _ => Err(CoreError::UnsupportedExtension {
                key: key.to_string(),
            }),
        }
    }

    pub fn format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

// ---------------------------------------------------------------------------
// Crop geometry
// ---------------------------------------------------------------------------

/// Target square and its vertical anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropSpec {
    pub size: u32,
    pub top_offset: u32,
}

impl Default for CropSpec {
    fn default() -> Self {
        Self {
            size: DEFAULT_TARGET_SIZE,
            top_offset: DEFAULT_TOP_OFFSET,
        }
    }
}

impl CropSpec {
    /// Top-left corner of the crop window in source coordinates.
    ///
    /// The window is centred horizontally. When the centre falls on a half
    /// pixel (odd width difference) it rounds half to even, which matches
    /// the crops already in existing datasets. The x coordinate goes
    /// negative when the source is narrower than the target.
    pub fn origin(&self, width: u32) -> (i64, i64) {
        let twice = i64::from(width) - i64::from(self.size);
        let floor = twice.div_euclid(2);
        let left = if twice.rem_euclid(2) == 0 || floor.rem_euclid(2) == 0 {
            floor
        } else {
            floor + 1
        };
        (left, i64::from(self.top_offset))
    }

    /// Cut `source` to a `size`×`size` canvas of the same colour type.
    pub fn apply(&self, source: &DynamicImage) -> DynamicImage {
        let (left, top) = self.origin(source.width());
        let mut canvas = DynamicImage::new(self.size, self.size, source.color());
        image::imageops::replace(&mut canvas, source, -left, -top);
        canvas
    }
}

// ---------------------------------------------------------------------------
// ImageAsset
// ---------------------------------------------------------------------------

/// One image moving through preprocessing.
///
/// Created from the fetched bytes, cropped exactly once, then dropped after
/// the cropped bytes are published.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub source_key: String,
    pub kind: ImageKind,
    pub raw_bytes: Vec<u8>,
    pub dimensions: Option<(u32, u32)>,
    pub cropped_bytes: Option<Vec<u8>>,
}

impl ImageAsset {
    /// Wrap fetched bytes. Fails fast on unsupported extensions.
    pub fn new(source_key: impl Into<String>, raw_bytes: Vec<u8>) -> Result<Self, CoreError> {
        let source_key = source_key.into();
        let kind = ImageKind::from_key(&source_key)?;
        Ok(Self {
            source_key,
            kind,
            raw_bytes,
            dimensions: None,
            cropped_bytes: None,
        })
    }

    /// Decode, crop and re-encode in the original format.
    pub fn crop(&mut self, spec: &CropSpec) -> Result<&[u8], CoreError> {
        let decoded = image::load_from_memory_with_format(&self.raw_bytes, self.kind.format())?;
        self.dimensions = Some(decoded.dimensions());

        let cropped = spec.apply(&decoded);
        let mut buf = Vec::new();
        cropped.write_to(&mut Cursor::new(&mut buf), self.kind.format())?;

        Ok(self.cropped_bytes.insert(buf).as_slice())
    }
}
