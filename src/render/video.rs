use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};

/// Reads the container duration in seconds with ffprobe.
pub fn probe_duration(ffprobe: &Path, input: &Path) -> Result<f64> {
    let out = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .with_context(|| format!("Failed to run {}", ffprobe.display()))?;

    if !out.status.success() {
        bail!("{} exited with {}", ffprobe.display(), out.status);
    }

    parse_duration(&String::from_utf8_lossy(&out.stdout))
}

pub fn parse_duration(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let secs: f64 = trimmed
        .parse()
        .map_err(|_| anyhow!("Unusable duration {:?}", trimmed))?;
    if !secs.is_finite() || secs <= 0.0 {
        bail!("Unusable duration {}", secs);
    }
    Ok(secs)
}

/// Whole kbps that spreads `target_bytes` over `duration_secs`.
pub fn bitrate_kbps(target_bytes: u64, duration_secs: f64) -> u64 {
    let bits_per_sec = (target_bytes as f64 * 8.0) / duration_secs;
    (bits_per_sec / 1000.0).floor() as u64
}

/// Re-encodes the video stream at a fixed bitrate, overwriting `output`.
pub fn transcode(ffmpeg: &Path, input: &Path, output: &Path, kbps: u64) -> Result<()> {
    let rate = format!("{}k", kbps);
    let status = Command::new(ffmpeg)
        .arg("-i")
        .arg(input)
        .args(["-b:v", rate.as_str(), "-bufsize", rate.as_str(), "-y"])
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("Failed to run {}", ffmpeg.display()))?;

    if !status.success() {
        bail!("{} exited with {}", ffmpeg.display(), status);
    }
    Ok(())
}
