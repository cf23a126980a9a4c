use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::RequestError;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Pdf,
    Other,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else if ext == "pdf" {
            MediaKind::Pdf
        } else {
            MediaKind::Other
        }
    }

    /// Adjusts the requested output path for this kind.
    pub fn output_path(&self, requested: PathBuf) -> PathBuf {
        match self {
            MediaKind::Other if !requested.to_string_lossy().ends_with(".zip") => {
                let mut name = OsString::from(requested);
                name.push(".zip");
                PathBuf::from(name)
            }
            _ => requested,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Pdf => "PDF",
            MediaKind::Other => "zip",
        };
        f.write_str(name)
    }
}

/// `<dir>/<stem>_compressed<.ext>` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}_compressed.{}", stem, ext.to_string_lossy()),
        None => format!("{}_compressed", stem),
    };
    input.with_file_name(name)
}

pub fn target_bytes_from_mb(target_mb: f64) -> Result<u64, RequestError> {
    if !target_mb.is_finite() || target_mb <= 0.0 {
        return Err(RequestError::InvalidTarget(target_mb));
    }
    let bytes = (target_mb * 1024.0 * 1024.0).trunc() as u64;
    if bytes == 0 {
        return Err(RequestError::InvalidTarget(target_mb));
    }
    Ok(bytes)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// A validated request: the input exists, the budget is positive and the
/// output is a different file.
#[derive(Debug, Clone)]
pub struct CompressionRequest {
    pub input: PathBuf,
    pub target_bytes: u64,
    pub output: PathBuf,
    pub kind: MediaKind,
}

impl CompressionRequest {
    pub fn new(
        input: impl Into<PathBuf>,
        target_mb: f64,
        output: Option<PathBuf>,
    ) -> Result<Self, RequestError> {
        let input = input.into();
        let target_bytes = target_bytes_from_mb(target_mb)?;
        if !input.is_file() {
            return Err(RequestError::InputNotFound(input));
        }

        let kind = MediaKind::from_path(&input);
        let output = output.unwrap_or_else(|| default_output_path(&input));
        let output = kind.output_path(output);
        if same_file(&input, &output) {
            return Err(RequestError::OutputIsInput(output));
        }

        Ok(Self {
            input,
            target_bytes,
            output,
            kind,
        })
    }
}
