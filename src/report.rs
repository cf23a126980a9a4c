use std::fmt;
use std::path::PathBuf;

use crate::media::MediaKind;
use crate::sweep::{SearchOutcome, Step};

/// The concrete encoder setting used on an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Quality(u8),
    /// Zoom in percent; 100 renders pages at their natural 72 dpi size.
    Zoom(u32),
    Bitrate { kbps: u64 },
    Deflate { level: i32 },
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::Quality(q) => write!(f, "quality {}", q),
            Setting::Zoom(pct) => write!(f, "zoom {:.1}", *pct as f64 / 100.0),
            Setting::Bitrate { kbps } => write!(f, "{}k bitrate", kbps),
            Setting::Deflate { level } => write!(f, "deflate level {}", level),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub setting: Setting,
    pub size: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reached,
    /// Every permitted attempt left the output above the target.
    Unreachable,
    /// An external tool could not be run or produced unusable output.
    ToolFailure(String),
}

#[derive(Debug, Clone)]
pub struct CompressionReport {
    pub kind: MediaKind,
    pub output: PathBuf,
    pub target_bytes: u64,
    pub outcome: Outcome,
    /// Size of the artifact left on disk, if any.
    pub final_size: Option<u64>,
    /// Setting of the artifact left on disk, if any.
    pub setting: Option<Setting>,
    pub attempts: Vec<Attempt>,
}

impl CompressionReport {
    pub fn success(&self) -> bool {
        self.outcome == Outcome::Reached
    }

    pub(crate) fn from_search(
        kind: MediaKind,
        output: PathBuf,
        target_bytes: u64,
        search: SearchOutcome,
        to_setting: impl Fn(u32) -> Setting,
    ) -> Self {
        let attempts: Vec<Attempt> = search
            .steps
            .iter()
            .map(|Step { level, size, error }| Attempt {
                setting: to_setting(*level),
                size: *size,
                error: error.clone(),
            })
            .collect();

        // A failed attempt leaves the previous artifact in place.
        let last = attempts.iter().rev().find(|a| a.size.is_some());
        let outcome = if search.success() {
            Outcome::Reached
        } else {
            Outcome::Unreachable
        };

        Self {
            kind,
            output,
            target_bytes,
            outcome,
            final_size: last.and_then(|a| a.size),
            setting: last.map(|a| a.setting),
            attempts,
        }
    }
}

/// Human-readable byte count, binary units.
pub fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
