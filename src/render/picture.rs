use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{ColorType, DynamicImage, ImageFormat};

use crate::sweep::Render;

/// Re-encodes a still image at a JPEG quality level.
///
/// The source is decoded on first use and reused for later levels.
pub struct PictureRenderer {
    input: PathBuf,
    decoded: Option<(DynamicImage, Option<ImageFormat>)>,
}

impl PictureRenderer {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            decoded: None,
        }
    }

    fn source(&mut self) -> Result<&(DynamicImage, Option<ImageFormat>)> {
        if self.decoded.is_none() {
            let reader = image::ImageReader::open(&self.input)
                .with_context(|| format!("Failed to open {}", self.input.display()))?
                .with_guessed_format()
                .context("Failed to sniff image format")?;
            let format = reader.format();
            let img = reader.decode().context("Failed to decode image")?;
            self.decoded = Some((img, format));
        }
        self.decoded
            .as_ref()
            .ok_or_else(|| anyhow!("image not decoded"))
    }
}

/// Encoder quality applied for a sweep level.
pub fn quality_for_level(level: u32) -> u8 {
    level.clamp(1, 100) as u8
}

impl Render for PictureRenderer {
    fn render(&mut self, level: u32, output: &Path) -> Result<()> {
        let quality = quality_for_level(level);
        let (img, source_format) = self.source()?;
        let format = ImageFormat::from_path(output)
            .ok()
            .or(*source_format)
            .ok_or_else(|| anyhow!("Cannot tell image format of {}", output.display()))?;

        encode(img, format, quality, output)
    }
}

pub fn encode(img: &DynamicImage, format: ImageFormat, quality: u8, output: &Path) -> Result<()> {
    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = img.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
            encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8.into())?;
        }
        ImageFormat::WebP => {
            // libwebp takes only 8-bit RGB or RGBA.
            let pixels = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            let encoder = webp::Encoder::from_image(&pixels)
                .map_err(|e| anyhow!("WebP encoder rejected image: {}", e))?;
            let encoded = encoder.encode(quality as f32);
            writer.write_all(&encoded)?;
        }
        ImageFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut writer, CompressionType::Best, PngFilter::Adaptive);
            img.write_with_encoder(encoder)?;
        }
        other => {
            img.write_to(&mut writer, other)
                .with_context(|| format!("Failed to encode {:?}", other))?;
        }
    }

    writer.flush()?;
    Ok(())
}
