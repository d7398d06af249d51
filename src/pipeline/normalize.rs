//! Image normalisation: any supported upload → RGB JPEG bytes.
//!
//! Cards arrive as PNG screenshots, phone JPEGs, or HEIC photos straight off
//! an iPhone. The VLM request carries exactly one encoding, so every upload
//! is decoded, flattened to three colour channels, and re-encoded as JPEG at
//! a fixed high quality.
//!
//! The declared format comes from the filename suffix (case-insensitive) and
//! only picks the decoder path: PNG and JPEG uploads are sniffed by content,
//! so a PNG saved as `card.jpg` still decodes.
//!
//! Decoding is CPU-bound; [`normalize_blocking`] runs it on tokio's blocking
//! pool the same way page rasterisation was kept off the async workers.

use crate::error::ImageConversionError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Default JPEG quality for the canonical transmission format.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Decoder path selected from the upload's filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredFormat {
    Png,
    Jpeg,
    /// HEIC/HEIF container; decoded through libheif into raw RGB planes.
    Heif,
}

impl DeclaredFormat {
    /// Map a filename to its declared format. Returns `None` for unsupported suffixes.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "heic" | "heif" => Some(Self::Heif),
            _ => None,
        }
    }
}

/// An upload re-encoded to the canonical transmission format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    /// Baseline JPEG bytes, 3 colour channels.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl NormalizedImage {
    pub const MIME_TYPE: &'static str = "image/jpeg";

    /// Standard base64 of the JPEG bytes (no data-URI prefix).
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:image/jpeg;base64,...` form used in chat requests.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", Self::MIME_TYPE, self.to_base64())
    }
}

/// Decode `bytes` and re-encode them as an RGB JPEG at `quality`.
///
/// Every failure (unsupported suffix, corrupt data, missing HEIF support,
/// encoder error) comes back as one [`ImageConversionError`] carrying the
/// decoder's own message. No partial output is ever returned.
pub fn normalize_image(
    filename: &str,
    bytes: &[u8],
    quality: u8,
) -> Result<NormalizedImage, ImageConversionError> {
    let format = DeclaredFormat::from_filename(filename).ok_or_else(|| {
        ImageConversionError::new(
            filename,
            "unsupported file type (expected png, jpg, jpeg, heic or heif)",
        )
    })?;

    let decoded = match format {
        DeclaredFormat::Png | DeclaredFormat::Jpeg => {
            image::load_from_memory(bytes).map_err(|e| ImageConversionError::new(filename, e))?
        }
        DeclaredFormat::Heif => {
            decode_heif(bytes).map_err(|detail| ImageConversionError::new(filename, detail))?
        }
    };

    // Alpha is dropped, 16-bit and greyscale inputs are expanded to 8-bit RGB.
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut buf = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
        encoder
            .encode_image(&rgb)
            .map_err(|e| ImageConversionError::new(filename, e))?;
    }

    debug!(
        "Normalised '{}' ({:?}, {}x{}) → {} bytes JPEG",
        filename,
        format,
        width,
        height,
        buf.len()
    );

    Ok(NormalizedImage {
        bytes: buf,
        width,
        height,
    })
}

/// Run [`normalize_image`] on tokio's blocking pool.
pub async fn normalize_blocking(
    filename: &str,
    bytes: &[u8],
    quality: u8,
) -> Result<NormalizedImage, ImageConversionError> {
    let name = filename.to_string();
    let data = bytes.to_vec();
    tokio::task::spawn_blocking(move || normalize_image(&name, &data, quality))
        .await
        .map_err(|e| ImageConversionError::new(filename, format!("decoder task panicked: {e}")))?
}

#[cfg(feature = "heif")]
fn decode_heif(bytes: &[u8]) -> Result<DynamicImage, String> {
    use image::RgbImage;
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let lib = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(bytes).map_err(|e| e.to_string())?;
    let handle = ctx.primary_image_handle().map_err(|e| e.to_string())?;
    let decoded = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| e.to_string())?;

    let width = decoded.width();
    let height = decoded.height();
    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| "HEIF image has no interleaved RGB plane".to_string())?;

    // Rows are padded to `stride`; copy only the visible RGB bytes.
    let row_len = width as usize * 3;
    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        let visible = row
            .get(..row_len)
            .ok_or_else(|| "HEIF plane row shorter than image width".to_string())?;
        pixels.extend_from_slice(visible);
    }

    RgbImage::from_raw(width, height, pixels)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| "HEIF plane size does not match image dimensions".to_string())
}

#[cfg(not(feature = "heif"))]
fn decode_heif(_bytes: &[u8]) -> Result<DynamicImage, String> {
    Err("HEIC/HEIF support is not enabled (rebuild with the `heif` feature)".to_string())
}
