use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Parser;
use file_compressor_rust::report::human_size;
use file_compressor_rust::{compress, CompressionRequest, Outcome, Settings};

/// Compress a file toward a target size
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input file (prompted for when omitted)
    input: Option<PathBuf>,

    /// Target size in MB (prompted for when omitted)
    target_mb: Option<f64>,

    /// Output file (prompted for when omitted; empty answer uses <name>_compressed.<ext>)
    output: Option<PathBuf>,

    /// ffmpeg binary used for video transcoding
    #[arg(long, env = "COMPRESSOR_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// ffprobe binary used to read video duration
    #[arg(long, env = "COMPRESSOR_FFPROBE", default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// pdftoppm binary used to rasterize PDF pages
    #[arg(long, env = "COMPRESSOR_PDFTOPPM", default_value = "pdftoppm")]
    pdftoppm: PathBuf,
}

fn prompt(lines: &mut impl BufRead, question: &str) -> Result<String> {
    print!("{}", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    if lines.read_line(&mut answer)? == 0 {
        bail!("stdin closed");
    }
    Ok(answer.trim().to_string())
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();
    let stdin = io::stdin();
    let mut lines = stdin.lock();

    let input = match args.input {
        Some(p) => p,
        None => PathBuf::from(prompt(&mut lines, "Enter input file name (with extension): ")?),
    };
    let target_mb = match args.target_mb {
        Some(mb) => mb,
        None => loop {
            let answer = prompt(&mut lines, "Enter target size in MB: ")?;
            match answer.parse::<f64>() {
                Ok(mb) => break mb,
                Err(_) => println!("Not a number: {:?}", answer),
            }
        },
    };
    let output = match args.output {
        Some(p) => Some(p),
        None => {
            let answer = prompt(&mut lines, "Enter output file name (with extension): ")?;
            (!answer.is_empty()).then(|| PathBuf::from(answer))
        }
    };

    let settings = Settings {
        ffmpeg: args.ffmpeg,
        ffprobe: args.ffprobe,
        pdftoppm: args.pdftoppm,
        ..Settings::default()
    };

    let request = match CompressionRequest::new(input, target_mb, output) {
        Ok(request) => request,
        Err(e) => {
            println!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("Compressing {}...", request.kind);
    let report = compress(&request, &settings);
    for attempt in &report.attempts {
        match (&attempt.size, &attempt.error) {
            (Some(size), _) => println!("  {}: {}", attempt.setting, human_size(*size)),
            (None, Some(err)) => eprintln!("  {}: {}", attempt.setting, err),
            (None, None) => {}
        }
    }

    match &report.outcome {
        Outcome::Reached => {
            println!(
                "Compression successful: {} ({})",
                report.output.display(),
                human_size(report.final_size.unwrap_or_default())
            );
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Unreachable => {
            println!("Could not reach target size.");
            if let (Some(size), Some(setting)) = (report.final_size, report.setting) {
                println!(
                    "Last attempt left at {}: {} with {} (target {})",
                    report.output.display(),
                    human_size(size),
                    setting,
                    human_size(report.target_bytes)
                );
            }
            Ok(ExitCode::FAILURE)
        }
        Outcome::ToolFailure(msg) => {
            println!("{}", msg);
            Ok(ExitCode::FAILURE)
        }
    }
}
