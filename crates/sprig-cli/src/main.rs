//! Command-line sprite-sheet slicer.

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use sprig_core::config::{Background, SliceOptions, SlicerConfig};
use sprig_core::{Frame, RgbaView, Slicer};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Cut a sprite sheet into one PNG per sprite, in reading order.
#[derive(Parser, Debug)]
#[command(name = "sprig", version, about)]
struct Cli {
    /// The sprite sheet to slice.
    input: PathBuf,

    /// Output folder.
    #[arg(short, long, default_value = "frames")]
    output: PathBuf,

    /// File name prefix for the written frames.
    #[arg(long, default_value = "frame")]
    prefix: String,

    /// Exact number of frames wanted. Switches grouping to weighted k-means.
    #[arg(short = 'n', long)]
    frames: Option<usize>,

    /// Seed for k-means++ initialization.
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file with pipeline configuration; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Merge sprites whose boxes are at most this many pixels apart.
    #[arg(long)]
    merge_distance: Option<u32>,

    /// Margin in pixels around every frame.
    #[arg(long)]
    padding: Option<u32>,

    /// Components smaller than this are treated as noise.
    #[arg(long)]
    min_pixels: Option<u32>,

    /// Alpha above this value counts as sprite content.
    #[arg(long)]
    alpha_threshold: Option<u8>,

    /// How to separate sprites from the background.
    #[arg(long, value_enum, default_value_t = KeyMode::Alpha)]
    key: KeyMode,

    /// Background color as RRGGBB, used with `--key color`.
    #[arg(long, value_parser = parse_hex_color)]
    key_color: Option<[u8; 3]>,

    /// RGB distance still treated as background when color keying.
    #[arg(long, default_value_t = 24)]
    key_tolerance: u32,

    /// Log per-stage details.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum KeyMode {
    /// Transparent background.
    Alpha,
    /// Background color sampled from the top-left pixel.
    Corner,
    /// Background color given by `--key-color`.
    Color,
}

fn parse_hex_color(s: &str) -> Result<[u8; 3], String> {
    let hex = s.trim_start_matches('#');
    if hex.len() != 6 {
        return Err(format!("expected RRGGBB, got {s:?}"));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("invalid color {s:?}: {e}"))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

fn load_config(cli: &Cli) -> Result<SlicerConfig> {
    let base = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => SlicerConfig::default(),
    };

    Ok(SlicerConfig::builder()
        .alpha_threshold(cli.alpha_threshold.unwrap_or(base.alpha_threshold))
        .min_component_pixels(cli.min_pixels.unwrap_or(base.min_component_pixels))
        .merge_distance(cli.merge_distance.unwrap_or(base.merge_distance))
        .frame_padding(cli.padding.unwrap_or(base.frame_padding))
        .row_tolerance(base.row_tolerance)
        .kmeans_max_iterations(base.kmeans_max_iterations)
        .build())
}

fn background(cli: &Cli) -> Result<Background> {
    Ok(match cli.key {
        KeyMode::Alpha => Background::Alpha,
        KeyMode::Corner => Background::CornerKey {
            tolerance: cli.key_tolerance,
        },
        KeyMode::Color => {
            let Some(key) = cli.key_color else {
                bail!("--key color requires --key-color RRGGBB");
            };
            Background::ColorKey {
                key,
                tolerance: cli.key_tolerance,
            }
        }
    })
}

fn save_frame(frame: &Frame, path: &Path) -> Result<()> {
    let img = image::RgbaImage::from_raw(
        frame.width as u32,
        frame.height as u32,
        frame.pixels.clone(),
    )
    .context("frame buffer does not match its dimensions")?;
    img.save(path)
        .with_context(|| format!("failed to save {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = load_config(&cli)?;
    let mut options = SliceOptions::builder().background(background(&cli)?);
    if let Some(frames) = cli.frames {
        options = options.target_frames(frames);
    }
    if let Some(seed) = cli.seed {
        options = options.seed(seed);
    }
    let options = options.build();
    debug!(?config, ?options, "resolved configuration");

    let sheet = image::open(&cli.input)
        .with_context(|| format!("failed to open {}", cli.input.display()))?
        .to_rgba8();
    let (width, height) = sheet.dimensions();
    let view = RgbaView::packed(sheet.as_raw(), width as usize, height as usize)
        .map_err(anyhow::Error::msg)?;
    info!(width, height, input = %cli.input.display(), "loaded sheet");

    let mut slicer = Slicer::with_config(config);
    let (frames, stats) = slicer.slice_with_stats(&view, &options);

    if let Some(k) = options.cluster_count()
        && frames.len() < k
    {
        tracing::warn!(requested = k, found = frames.len(), "fewer sprites than requested");
    }

    std::fs::create_dir_all(&cli.output)
        .with_context(|| format!("failed to create {}", cli.output.display()))?;

    for (i, frame) in frames.iter().enumerate() {
        let path = cli.output.join(format!("{}_{i}.png", cli.prefix));
        save_frame(frame, &path)?;
        let b = frame.bbox;
        info!(
            index = i,
            left = b.left,
            top = b.top,
            right = b.right,
            bottom = b.bottom,
            path = %path.display(),
            "wrote frame"
        );
    }

    info!(
        frames = frames.len(),
        components = stats.num_components,
        total_ms = stats.total_ms,
        output = %cli.output.display(),
        "done"
    );
    Ok(())
}
