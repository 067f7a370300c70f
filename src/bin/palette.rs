use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use place_palette::{ColorSpace, KMeansConfig, PaletteConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

/// Extract a dominant-color palette from a place's photos.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Glob pattern for image files to load
    #[arg(short, long)]
    files: String,

    /// Name of the city, used for the output file names
    #[arg(short, long)]
    city: String,

    /// Color-density histogram (JSON with `bins` and `counts`)
    #[arg(short = 'H', long)]
    hist: PathBuf,

    /// Cluster in the HSV disk embedding instead of RGB
    #[arg(long)]
    hsv: bool,

    /// Number of pixels to grab from each image
    #[arg(long, default_value_t = 1024)]
    ppi: usize,

    /// Number of colors in the palette
    #[arg(short, long, default_value_t = 8)]
    n_colors: usize,

    /// Seed for a reproducible palette
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory
    #[arg(short, long, default_value = "palettes")]
    out_dir: PathBuf,

    /// Swatch block size in pixels
    #[arg(long, default_value_t = 64)]
    swatch_size: u32,

    /// Maximum k-means iterations per run
    #[arg(long, default_value_t = 300)]
    max_iter: usize,

    /// Number of k-means restarts
    #[arg(long, default_value_t = 4)]
    n_init: usize,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = PaletteConfig {
        histogram_path: args.hist,
        pattern: args.files,
        name: args.city,
        color_space: if args.hsv { ColorSpace::HsvDisk } else { ColorSpace::Rgb },
        pixels_per_image: args.ppi,
        n_colors: args.n_colors,
        seed: args.seed,
        output_dir: args.out_dir,
        swatch_size: args.swatch_size,
        kmeans: KMeansConfig {
            max_iter: args.max_iter,
            n_init: args.n_init,
            ..KMeansConfig::default()
        },
    };

    let (palette, artifacts) = place_palette::run(&config)
        .with_context(|| format!("palette extraction failed for '{}'", config.name))?;

    for c in &palette.colors {
        info!(r = c.red, g = c.green, b = c.blue, "palette color");
    }
    println!("Saved → {} and {}", artifacts.swatch.display(), artifacts.csv.display());
    Ok(())
}
