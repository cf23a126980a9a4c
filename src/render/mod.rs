//! Per-media encoders. Each writes one candidate artifact to the output path,
//! overwriting whatever an earlier attempt left there.

pub mod archive;
pub mod pdf;
pub mod picture;
pub mod video;
