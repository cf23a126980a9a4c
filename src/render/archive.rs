use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// Strongest deflate level the zip writer accepts.
pub const DEFLATE_LEVEL: i32 = 9;

fn archive_options() -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(DEFLATE_LEVEL))
        .large_file(true)
}

/// Writes `input` as the single entry of a deflate ZIP at `output`.
pub fn archive(input: &Path, output: &Path) -> Result<()> {
    let entry = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} has no file name", input.display()))?;

    let out = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(out));
    zip.start_file(entry, archive_options())?;

    let mut reader = BufReader::new(
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?,
    );
    std::io::copy(&mut reader, &mut zip).context("Failed to write archive entry")?;
    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn single_entry_named_after_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        let text = "all work and no play ".repeat(2_000);
        std::fs::write(&input, &text).unwrap();
        let out = dir.path().join("notes.txt.zip");

        archive(&input, &out).unwrap();

        assert!(std::fs::metadata(&out).unwrap().len() < text.len() as u64 / 10);
        let mut zip = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        assert_eq!(zip.len(), 1);
        let mut entry = zip.by_index(0).unwrap();
        assert_eq!(entry.name(), "notes.txt");
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut back = String::new();
        entry.read_to_string(&mut back).unwrap();
        assert_eq!(back, text);
    }

    #[test]
    fn incompressible_input_does_not_shrink() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("noise.bin");
        let mut state = 0x9e37_79b9_u32;
        let noise: Vec<u8> = (0..64 * 1024)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect();
        std::fs::write(&input, &noise).unwrap();
        let out = dir.path().join("noise.zip");

        archive(&input, &out).unwrap();
        assert!(std::fs::metadata(&out).unwrap().len() >= noise.len() as u64);
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = archive(&dir.path().join("gone.bin"), &dir.path().join("gone.zip")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open"));
    }
}
