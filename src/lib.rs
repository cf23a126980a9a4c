pub mod config;
pub mod error;
pub mod media;
pub mod render;
pub mod report;
pub mod sweep;

#[cfg(all(test, unix))]
mod test_support;

use std::path::PathBuf;

pub use config::Settings;
pub use error::RequestError;
pub use media::{CompressionRequest, MediaKind};
pub use report::{Attempt, CompressionReport, Outcome, Setting};
pub use sweep::{search, ParameterSweep, Render};

use render::archive::{self, DEFLATE_LEVEL};
use render::pdf::PdfRasterizer;
use render::picture::{self, PictureRenderer};
use render::video;
use sweep::measure;

/// Validates the request and runs the policy for its media kind.
pub fn compress_file(
    input: impl Into<PathBuf>,
    target_mb: f64,
    output: Option<PathBuf>,
    settings: &Settings,
) -> Result<CompressionReport, RequestError> {
    let request = CompressionRequest::new(input, target_mb, output)?;
    Ok(compress(&request, settings))
}

pub fn compress(request: &CompressionRequest, settings: &Settings) -> CompressionReport {
    log::info!(
        "Compressing {} as {} toward {} bytes -> {}",
        request.input.display(),
        request.kind,
        request.target_bytes,
        request.output.display()
    );

    let report = match request.kind {
        MediaKind::Image => {
            let mut renderer = PictureRenderer::new(&request.input);
            sweep_with(request, &mut renderer, &settings.image_sweep, |l| {
                Setting::Quality(picture::quality_for_level(l))
            })
        }
        MediaKind::Pdf => {
            let mut renderer = PdfRasterizer::new(&request.input, &settings.pdftoppm);
            sweep_with(request, &mut renderer, &settings.pdf_sweep, Setting::Zoom)
        }
        MediaKind::Video => compress_video(request, settings),
        MediaKind::Other => compress_archive(request),
    };

    match &report.outcome {
        Outcome::Reached => log::info!(
            "Reached target with {:?}: {:?} bytes",
            report.setting,
            report.final_size
        ),
        Outcome::Unreachable => log::info!(
            "Target unreachable after {} attempts",
            report.attempts.len()
        ),
        Outcome::ToolFailure(msg) => log::warn!("Aborted: {}", msg),
    }
    report
}

fn sweep_with<R: Render>(
    request: &CompressionRequest,
    renderer: &mut R,
    sweep: &ParameterSweep,
    to_setting: impl Fn(u32) -> Setting,
) -> CompressionReport {
    let outcome = search(renderer, sweep, &request.output, request.target_bytes);
    CompressionReport::from_search(
        request.kind,
        request.output.clone(),
        request.target_bytes,
        outcome,
        to_setting,
    )
}

fn single_attempt(
    request: &CompressionRequest,
    setting: Setting,
    result: anyhow::Result<u64>,
) -> CompressionReport {
    let (outcome, attempt) = match result {
        Ok(size) => {
            let outcome = if size <= request.target_bytes {
                Outcome::Reached
            } else {
                Outcome::Unreachable
            };
            (
                outcome,
                Attempt {
                    setting,
                    size: Some(size),
                    error: None,
                },
            )
        }
        Err(e) => {
            let msg = format!("{:#}", e);
            (
                Outcome::ToolFailure(msg.clone()),
                Attempt {
                    setting,
                    size: None,
                    error: Some(msg),
                },
            )
        }
    };

    CompressionReport {
        kind: request.kind,
        output: request.output.clone(),
        target_bytes: request.target_bytes,
        outcome,
        final_size: attempt.size,
        setting: attempt.size.map(|_| setting),
        attempts: vec![attempt],
    }
}

fn compress_video(request: &CompressionRequest, settings: &Settings) -> CompressionReport {
    let duration = match video::probe_duration(&settings.ffprobe, &request.input) {
        Ok(d) => d,
        Err(e) => {
            let msg = format!("Error getting video duration: {:#}", e);
            return CompressionReport {
                kind: request.kind,
                output: request.output.clone(),
                target_bytes: request.target_bytes,
                outcome: Outcome::ToolFailure(msg),
                final_size: None,
                setting: None,
                attempts: Vec::new(),
            };
        }
    };

    let kbps = video::bitrate_kbps(request.target_bytes, duration);
    let setting = Setting::Bitrate { kbps };
    log::debug!("duration {:.3}s -> {}", duration, setting);

    if kbps == 0 {
        return CompressionReport {
            kind: request.kind,
            output: request.output.clone(),
            target_bytes: request.target_bytes,
            outcome: Outcome::Unreachable,
            final_size: None,
            setting: None,
            attempts: Vec::new(),
        };
    }

    let result = video::transcode(&settings.ffmpeg, &request.input, &request.output, kbps)
        .and_then(|_| measure(&request.output));
    single_attempt(request, setting, result)
}

fn compress_archive(request: &CompressionRequest) -> CompressionReport {
    let result = archive::archive(&request.input, &request.output)
        .and_then(|_| measure(&request.output));
    let mut report = single_attempt(
        request,
        Setting::Deflate {
            level: DEFLATE_LEVEL,
        },
        result,
    );
    // Only the video path reports tool failures.
    if let Outcome::ToolFailure(_) = report.outcome {
        report.outcome = Outcome::Unreachable;
    }
    report
}
