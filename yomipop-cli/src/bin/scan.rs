use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use yomipop_core::ocr::lens::LensOcr;
use yomipop_core::ocr::postprocess::group_lines_into_paragraphs;
use yomipop_core::{
    ConfigHandle, Dictionary, Frame, LookupEngine, OcrProvider, PixelRect, QualityMode, Settings,
    hit_scan,
};

/// yomipop scan tool — run OCR + hit scan + lookup over an image file.
///
/// Feeds a screenshot saved to disk through the same stages the live
/// pipeline uses, for debugging providers and dictionaries without a
/// desktop session.
#[derive(Parser, Debug)]
#[command(name = "yomipop-scan")]
#[command(about = "yomipop scan tool — run OCR + hit scan + lookup over an image file")]
struct Cli {
    /// Image file to scan (PNG or JPEG)
    image: PathBuf,

    /// API key for the remote OCR service
    #[arg(long)]
    api_key: String,

    /// OCR upload quality: fast, balanced or quality
    #[arg(long, default_value = "fast")]
    quality: String,

    /// Regroup provider lines into paragraphs (for line-based providers)
    #[arg(long)]
    regroup: bool,

    /// Compiled dictionary for the lookup step
    #[arg(short, long)]
    dict: Option<PathBuf>,

    /// Normalized cursor position (0..1) for the hit scan
    #[arg(short = 'x', long)]
    cursor_x: Option<f32>,

    /// Normalized cursor position (0..1) for the hit scan
    #[arg(short = 'y', long)]
    cursor_y: Option<f32>,

    /// Longest lookup prefix considered, in characters
    #[arg(long, default_value = "25")]
    max_length: usize,
}

fn load_frame(path: &PathBuf) -> Result<Frame> {
    let rgb = image::open(path)
        .with_context(|| format!("failed to open image {:?}", path))?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::new(width, height, rgb.into_raw())?)
}

fn parse_quality(value: &str) -> Result<QualityMode> {
    match value {
        "fast" => Ok(QualityMode::Fast),
        "balanced" => Ok(QualityMode::Balanced),
        "quality" => Ok(QualityMode::Quality),
        other => anyhow::bail!("unknown quality mode: {other}"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let frame = load_frame(&cli.image)?;

    let mut settings = Settings::default();
    settings.scan.quality = parse_quality(&cli.quality)?;
    let provider = LensOcr::new(ConfigHandle::new(settings), cli.api_key)?;
    let mut paragraphs = provider
        .scan(&frame)
        .context("OCR provider failed (network or decode error)")?;
    if cli.regroup {
        paragraphs = group_lines_into_paragraphs(paragraphs);
    }

    if paragraphs.is_empty() {
        eprintln!("No Japanese text found.");
        return Ok(());
    }

    for (i, para) in paragraphs.iter().enumerate() {
        let orientation = if para.vertical { "vertical" } else { "horizontal" };
        println!(
            "[{}] ({}, {} words) {}",
            i,
            orientation,
            para.words.len(),
            para.full_text
        );
    }

    let (Some(x), Some(y)) = (cli.cursor_x, cli.cursor_y) else {
        return Ok(());
    };
    // normalized cursor against the image's own pixel geometry
    let region = PixelRect::new(0, 0, frame.width, frame.height);
    let cursor = (
        (x * frame.width as f32) as i32,
        (y * frame.height as f32) as i32,
    );
    let Some(hit) = hit_scan(&paragraphs, cursor, &region) else {
        eprintln!("Hit scan found nothing at ({x}, {y}).");
        return Ok(());
    };
    println!("\nhit: char {} of \"{}\"", hit.char_index, hit.text);
    println!("lookup string: {}", hit.lookup);

    let Some(dict_path) = cli.dict else {
        return Ok(());
    };
    let dict = Arc::new(Dictionary::load(&dict_path)?);
    let mut engine = LookupEngine::new(dict, cli.max_length);
    let results = engine.lookup(&hit.lookup);
    if results.is_empty() {
        eprintln!("No dictionary entries found.");
        return Ok(());
    }
    println!();
    for entry in &results {
        let reading = if entry.reading.is_empty() {
            String::new()
        } else {
            format!(" [{}]", entry.reading)
        };
        let glosses: Vec<&str> = entry
            .senses
            .iter()
            .flat_map(|s| s.glosses.iter())
            .map(String::as_str)
            .take(4)
            .collect();
        println!("{}{}  {}", entry.written_form, reading, glosses.join("; "));
    }
    Ok(())
}
