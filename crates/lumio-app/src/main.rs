//! Lumio - RAW preview processor
//!
//! Opens a RAW (or ordinary bitmap) file, develops it in the background and
//! optionally writes the result as a JPEG.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Parser;
use lumio_core::{encode_jpeg, JPEG_DATA_URI_PREFIX};
use lumio_processor::{ProcessorConfig, ProcessorEvent, RawProcessor};
use tracing_subscriber::EnvFilter;

const EVENT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Parser, Debug)]
#[command(name = "lumio")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// RAW or bitmap file (a path or file:// URL)
    file: String,

    /// JSON processor configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Develop in stages from a quick preview up to the default size
    #[arg(short, long, default_value_t = false)]
    progressive: bool,

    /// Use the embedded thumbnail instead of developing
    #[arg(short, long, default_value_t = false)]
    thumbnail: bool,

    /// Print camera metadata as JSON and exit
    #[arg(short, long, default_value_t = false)]
    metadata: bool,

    /// Write the final image to this JPEG file
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    max_width: Option<u32>,

    #[arg(long)]
    max_height: Option<u32>,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    exposure: f32,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    contrast: f32,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    highlights: f32,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    shadows: f32,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    saturation: f32,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    temperature: f32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ProcessorConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => ProcessorConfig::default(),
    };
    tracing::debug!("Using {:?}", config);
    let jpeg_quality = config.jpeg_quality;
    let default_preview = config.default_preview;
    let mut processor = RawProcessor::with_config(config)?;
    let events = processor.subscribe();

    processor.set_adjustments(
        args.exposure,
        args.contrast,
        args.highlights,
        args.shadows,
        args.saturation,
        args.temperature,
    );

    if !processor.open_file(&args.file) {
        bail!("Failed to open {}: {}", args.file, processor.last_error());
    }

    if args.metadata {
        let metadata = processor
            .metadata()
            .context("No metadata for open file")?;
        println!("{}", serde_json::to_string_pretty(&metadata)?);
        return Ok(());
    }

    if args.thumbnail {
        let thumb = processor.thumbnail()?;
        let notice = processor.last_error();
        if !notice.is_empty() {
            println!("{}", notice);
        }
        println!("Thumbnail: {}x{}", thumb.width, thumb.height);
        if let Some(output) = &args.output {
            let jpeg = encode_jpeg(&thumb.pixels, thumb.width, thumb.height, jpeg_quality)?;
            write_output(output, &jpeg)?;
        }
        return Ok(());
    }

    if args.progressive {
        processor.decode_progressive();
    } else {
        processor.decode_async(
            args.max_width.unwrap_or(default_preview.width),
            args.max_height.unwrap_or(default_preview.height),
        );
    }

    let final_uri = loop {
        let event = events
            .recv_timeout(EVENT_TIMEOUT)
            .context("Timed out waiting for decode")?;
        println!("{}", describe(&event));
        match event {
            ProcessorEvent::DecodeFinished(uri) | ProcessorEvent::ProgressiveFinished(uri) => {
                break uri
            }
            ProcessorEvent::DecodeFailed(error) => bail!("Decode failed: {}", error),
            _ => {}
        }
    };

    if let Some(output) = &args.output {
        let payload = final_uri
            .strip_prefix(JPEG_DATA_URI_PREFIX)
            .context("Decoder returned an unexpected data URI")?;
        let jpeg = STANDARD
            .decode(payload)
            .context("Failed to decode base64 payload")?;
        write_output(output, &jpeg)?;
    }

    Ok(())
}

fn describe(event: &ProcessorEvent) -> String {
    match event {
        ProcessorEvent::FileChanged => "File changed".to_string(),
        ProcessorEvent::DecodingChanged(decoding) => format!("Decoding: {}", decoding),
        ProcessorEvent::DecodeFinished(uri) => {
            format!("Decode finished ({} bytes of data URI)", uri.len())
        }
        ProcessorEvent::ProgressiveStageFinished {
            image,
            stage,
            total_stages,
        } => format!(
            "Stage {}/{} finished ({} bytes of data URI)",
            stage,
            total_stages,
            image.len()
        ),
        ProcessorEvent::ProgressiveFinished(uri) => {
            format!("Progressive decode finished ({} bytes of data URI)", uri.len())
        }
        ProcessorEvent::DecodeFailed(error) => format!("Decode failed: {}", error),
    }
}

fn write_output(path: &Path, jpeg: &[u8]) -> Result<()> {
    std::fs::write(path, jpeg)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Saved {} ({} bytes)", path.display(), jpeg.len());
    Ok(())
}
