use std::path::PathBuf;

use crate::sweep::ParameterSweep;

/// Runtime knobs for one compression run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub pdftoppm: PathBuf,
    /// JPEG quality levels tried for images.
    pub image_sweep: ParameterSweep,
    /// Zoom levels, in percent of the page's natural size (72 dpi).
    pub pdf_sweep: ParameterSweep,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            pdftoppm: PathBuf::from("pdftoppm"),
            image_sweep: ParameterSweep::new(95, 5, 10, true),
            pdf_sweep: ParameterSweep::new(100, 10, 10, true),
        }
    }
}
