//! HEIC/HEIF conversion
//!
//! Decoding goes through a [`HeicDecoder`]; re-encoding to the configured target type
//! uses the `image` crate. Both run on the blocking pool.

use std::sync::Arc;

use album_core::models::UploadCandidate;
use album_core::{mime, AppError, ConversionConfig};
use anyhow::bail;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;

/// Decodes the primary image of a HEIC/HEIF container.
pub trait HeicDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> anyhow::Result<DynamicImage>;
}

/// Decoder backed by the system libheif.
#[cfg(feature = "heif")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LibHeifDecoder;

#[cfg(feature = "heif")]
impl HeicDecoder for LibHeifDecoder {
    fn decode(&self, data: &[u8]) -> anyhow::Result<DynamicImage> {
        use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

        let lib_heif = LibHeif::new();
        let ctx = HeifContext::read_from_bytes(data)?;
        let handle = ctx.primary_image_handle()?;
        let decoded = lib_heif.decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)?;

        let planes = decoded.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| anyhow::anyhow!("Decoded HEIC image has no interleaved plane"))?;

        let width = plane.width as usize;
        let height = plane.height as usize;
        let row_len = width * 3;
        let mut pixels = Vec::with_capacity(row_len * height);
        for row in plane.data.chunks(plane.stride).take(height) {
            pixels.extend_from_slice(&row[..row_len]);
        }

        let buffer = image::RgbImage::from_raw(plane.width, plane.height, pixels)
            .ok_or_else(|| anyhow::anyhow!("Decoded HEIC plane has unexpected size"))?;
        Ok(DynamicImage::ImageRgb8(buffer))
    }
}

/// Stand-in used when the crate is built without HEIC support.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedHeicDecoder;

impl HeicDecoder for UnsupportedHeicDecoder {
    fn decode(&self, _data: &[u8]) -> anyhow::Result<DynamicImage> {
        bail!("HEIC decoding is not available (build with the `heif` feature)")
    }
}

/// The best decoder this build provides.
pub fn default_decoder() -> Arc<dyn HeicDecoder> {
    #[cfg(feature = "heif")]
    {
        Arc::new(LibHeifDecoder)
    }
    #[cfg(not(feature = "heif"))]
    {
        Arc::new(UnsupportedHeicDecoder)
    }
}

/// A file the converter could not process.
#[derive(Debug)]
pub struct ConversionFailure {
    /// The original, unconverted candidate
    pub candidate: UploadCandidate,
    pub error: AppError,
}

/// Result of a batch conversion: disjoint successes and failures.
#[derive(Debug, Default)]
pub struct ConversionOutcome {
    /// Converted HEIC files and untouched non-HEIC files, in input order
    pub processed: Vec<UploadCandidate>,
    pub failed: Vec<ConversionFailure>,
}

/// Re-encodes HEIC/HEIF candidates to a widely supported type.
#[derive(Clone)]
pub struct HeicConverter {
    decoder: Arc<dyn HeicDecoder>,
    config: ConversionConfig,
}

impl HeicConverter {
    pub fn new(config: ConversionConfig) -> Self {
        Self::with_decoder(config, default_decoder())
    }

    pub fn with_decoder(config: ConversionConfig, decoder: Arc<dyn HeicDecoder>) -> Self {
        Self { decoder, config }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert one candidate. Non-HEIC candidates are returned unchanged.
    pub async fn convert(&self, candidate: UploadCandidate) -> Result<UploadCandidate, AppError> {
        if !candidate.is_heic() {
            return Ok(candidate);
        }

        let target_type = self.config.to_type.clone();
        let extension = mime::extension_for_content_type(&target_type).ok_or_else(|| {
            AppError::Config(format!("No file extension known for {}", target_type))
        })?;
        let quality = self.config.jpeg_quality();
        let decoder = self.decoder.clone();
        let data = candidate.data.clone();
        let start = std::time::Instant::now();

        let encode_type = target_type.clone();
        let encoded = tokio::task::spawn_blocking(move || {
            let image = decoder.decode(&data)?;
            encode(&image, &encode_type, quality)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Conversion task failed: {}", e)))?
        .map_err(|e| AppError::Conversion(format!("{}: {:#}", candidate.name, e)))?;

        tracing::debug!(
            file = %candidate.name,
            to_type = %target_type,
            original_size = candidate.data.len(),
            converted_size = encoded.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "HEIC file converted"
        );

        Ok(UploadCandidate {
            id: candidate.id,
            name: mime::replace_extension(&candidate.name, extension),
            content_type: target_type,
            data: encoded.into(),
        })
    }

    /// Convert every HEIC candidate; a failing file never stops the batch.
    pub async fn convert_batch(&self, candidates: Vec<UploadCandidate>) -> ConversionOutcome {
        let mut outcome = ConversionOutcome::default();

        for candidate in candidates {
            if !candidate.is_heic() {
                outcome.processed.push(candidate);
                continue;
            }

            match self.convert(candidate.clone()).await {
                Ok(converted) => outcome.processed.push(converted),
                Err(error) => {
                    tracing::warn!(
                        file = %candidate.name,
                        error = %error,
                        "HEIC conversion failed"
                    );
                    outcome.failed.push(ConversionFailure { candidate, error });
                }
            }
        }

        outcome
    }
}

fn encode(image: &DynamicImage, content_type: &str, jpeg_quality: u8) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::new();
    match content_type {
        "image/jpeg" => {
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, jpeg_quality))?;
        }
        "image/png" => {
            image.write_with_encoder(PngEncoder::new(&mut out))?;
        }
        "image/webp" => {
            let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
            rgba.write_with_encoder(WebPEncoder::new_lossless(&mut out))?;
        }
        other => bail!("Unsupported conversion target: {}", other),
    }
    Ok(out)
}
