use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

use crate::sweep::Render;

/// PDF user-space units per inch; zoom 1.0 renders at this resolution.
const POINTS_PER_INCH: f64 = 72.0;

/// Rasterizes every page at a zoom level and recomposes an image-only PDF.
pub struct PdfRasterizer {
    input: PathBuf,
    pdftoppm: PathBuf,
    page_count: Option<usize>,
}

impl PdfRasterizer {
    pub fn new(input: impl Into<PathBuf>, pdftoppm: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            pdftoppm: pdftoppm.into(),
            page_count: None,
        }
    }

    fn page_count(&mut self) -> Result<usize> {
        if let Some(n) = self.page_count {
            return Ok(n);
        }
        let mut doc = Document::load(&self.input).context("Failed to load PDF")?;
        if doc.is_encrypted() {
            log::info!("PDF is encrypted, trying empty password");
            if let Err(e) = doc.decrypt(b"") {
                log::warn!("Failed to decrypt with empty password: {:?}", e);
            }
        }
        let n = doc.get_pages().len();
        self.page_count = Some(n);
        Ok(n)
    }

    fn rasterize(&self, zoom_pct: u32, dir: &Path) -> Result<Vec<RgbImage>> {
        let dpi = POINTS_PER_INCH * zoom_pct as f64 / 100.0;
        let status = Command::new(&self.pdftoppm)
            .arg("-r")
            .arg(format!("{}", dpi))
            .arg("-png")
            .arg(&self.input)
            .arg(dir.join("page"))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to run {}", self.pdftoppm.display()))?;
        if !status.success() {
            bail!("{} exited with {}", self.pdftoppm.display(), status);
        }

        // Page numbers are zero-padded to a common width, so name order is page order.
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|e| e == "png"))
            .collect();
        files.sort();

        files
            .iter()
            .map(|p| {
                image::open(p)
                    .map(|img| img.to_rgb8())
                    .with_context(|| format!("Failed to read rendered page {}", p.display()))
            })
            .collect()
    }
}

impl Render for PdfRasterizer {
    fn render(&mut self, level: u32, output: &Path) -> Result<()> {
        let expected = self.page_count()?;
        let scratch = tempfile::tempdir().context("Failed to create scratch directory")?;
        let pages = self.rasterize(level, scratch.path())?;
        if pages.len() != expected {
            bail!("Rasterizer produced {} pages, expected {}", pages.len(), expected);
        }

        let mut doc = compose(&pages)?;
        doc.save(output).context("Failed to save PDF")?;
        Ok(())
    }
}

fn int(v: u32) -> Object {
    Object::Integer(v as i64)
}

/// Builds a PDF with one full-page bitmap per input image, sized 1 pt per pixel.
pub fn compose(pages: &[RgbImage]) -> Result<Document> {
    if pages.is_empty() {
        return Err(anyhow!("No pages to compose"));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());

    for page in pages {
        let (w, h) = page.dimensions();

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(page.as_raw())?;
        let data = encoder.finish()?;

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => int(w),
                "Height" => int(h),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => Object::Integer(8),
                "Filter" => "FlateDecode",
            },
            data,
        ));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("cm", vec![int(w), int(0), int(0), int(h), int(0), int(0)]),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![int(0), int(0), int(w), int(h)],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    Ok(doc)
}
