//! Dominant-color palettes for a place, extracted from a collection of
//! photos.
//!
//! Steps performed:
//! 1. Load a precomputed color-density histogram ([`Histogram::load`]).
//! 2. Sample a fixed number of pixels from every matched image ([`sampler`]).
//! 3. Optionally move the samples into an HSV-derived space ([`ColorSpace`]).
//! 4. Resample the pool with inverse-frequency weights so common colors do
//!    not drown out rare ones ([`reweight`]).
//! 5. Run k-means on the resampled pool ([`cluster`]).
//! 6. Map centroids back to RGB and write a swatch and a CSV ([`emit`]).

use std::path::PathBuf;

use palette::Srgb;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

pub mod cluster;
pub mod color_space;
pub mod emit;
pub mod error;
pub mod histogram;
pub mod reweight;
pub mod sampler;

pub use cluster::{Clusters, KMeansConfig};
pub use color_space::{ColorSpace, Feature};
pub use emit::PaletteArtifacts;
pub use error::{PaletteError, Result};
pub use histogram::{Histogram, WeightTable};

/// Everything one palette run needs.
///
/// There is no usable default histogram: build the config with
/// [`PaletteConfig::new`], or set `histogram_path` explicitly when starting
/// from `Default`. An empty path is rejected when the pipeline runs.
#[derive(Clone, Debug)]
pub struct PaletteConfig {
    /// Persisted color-density histogram, see [`histogram`].
    pub histogram_path: PathBuf,
    /// Glob selecting the images.
    pub pattern: String,
    /// Base name of the written artifacts, usually the place name.
    pub name: String,
    pub color_space: ColorSpace,
    pub pixels_per_image: usize,
    pub n_colors: usize,
    /// Fixed seed for a reproducible run; `None` draws one from the OS.
    pub seed: Option<u64>,
    pub output_dir: PathBuf,
    /// Edge length in pixels of each swatch block.
    pub swatch_size: u32,
    pub kmeans: KMeansConfig,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        PaletteConfig {
            histogram_path: PathBuf::new(),
            pattern: String::new(),
            name: String::from("palette"),
            color_space: ColorSpace::Rgb,
            pixels_per_image: 1024,
            n_colors: 8,
            seed: None,
            output_dir: PathBuf::from("palettes"),
            swatch_size: 64,
            kmeans: KMeansConfig::default(),
        }
    }
}

impl PaletteConfig {
    /// Config with the three required inputs and defaults for the rest.
    pub fn new(histogram_path: impl Into<PathBuf>, pattern: impl Into<String>, name: impl Into<String>) -> Self {
        PaletteConfig {
            histogram_path: histogram_path.into(),
            pattern: pattern.into(),
            name: name.into(),
            ..PaletteConfig::default()
        }
    }

    /// Random source for one run: seeded when `seed` is set.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

/// Extracted palette and the clustering it came from.
#[derive(Clone, Debug)]
pub struct Palette {
    /// Centroids as RGB in [0, 1].
    pub colors: Vec<Srgb<f32>>,
    /// Raw clustering result, in `color_space` coordinates.
    pub clusters: Clusters,
    pub color_space: ColorSpace,
}

/// Reweight, cluster and convert an RGB sample pool. `samples` is consumed
/// as scratch space for the color-space mapping.
pub fn palette_from_samples(
    mut samples: Vec<Feature>,
    histogram: &Histogram,
    color_space: ColorSpace,
    n_colors: usize,
    kmeans: &KMeansConfig,
    rng: &mut StdRng,
) -> Result<Palette> {
    if n_colors == 0 || n_colors > samples.len() {
        return Err(PaletteError::invalid(
            "n_colors",
            format!("{n_colors} colors requested from {} samples", samples.len()),
        ));
    }

    // ----------------------
    // 3. Color space
    // ----------------------
    color_space.map_in_place(&mut samples);

    // ----------------------
    // 4. Inverse-frequency resampling
    // ----------------------
    let resampled = reweight::resample(&samples, &histogram.weights(), rng)?;
    drop(samples);

    // ----------------------
    // 5. Cluster, then back to RGB
    // ----------------------
    let clusters = cluster::kmeans(&resampled, n_colors, color_space, kmeans, rng)?;
    let colors = clusters.centroids.iter().map(|c| color_space.to_rgb(*c)).collect();

    Ok(Palette {
        colors,
        clusters,
        color_space,
    })
}

/// Stages 1 to 5: everything except writing the artifacts.
pub fn extract_palette(config: &PaletteConfig) -> Result<Palette> {
    if config.histogram_path.as_os_str().is_empty() {
        return Err(PaletteError::invalid("histogram_path", "no histogram file given"));
    }
    if config.n_colors == 0 {
        return Err(PaletteError::invalid("n_colors", "must be at least 1"));
    }

    // ----------------------
    // 1. Load the reference density
    // ----------------------
    let histogram = Histogram::load(&config.histogram_path)?;
    let mut rng = config.rng();

    // ----------------------
    // 2. Sample pixels
    // ----------------------
    let pool = sampler::sample_images(&config.pattern, config.pixels_per_image, &mut rng)?;
    info!(images = pool.images, samples = pool.len(), color_space = ?config.color_space, "built sample pool");

    palette_from_samples(
        pool.samples,
        &histogram,
        config.color_space,
        config.n_colors,
        &config.kmeans,
        &mut rng,
    )
}

/// Full run: extract the palette, then write `<output_dir>/<name>.png` and
/// `<output_dir>/<name>.csv`. Nothing is written if extraction fails.
pub fn run(config: &PaletteConfig) -> Result<(Palette, PaletteArtifacts)> {
    // Reject an unwritable swatch before spending time on clustering.
    emit::swatch_width(config.n_colors, config.swatch_size)?;
    let palette = extract_palette(config)?;

    // ----------------------
    // 6. Write swatch and CSV
    // ----------------------
    let artifacts = emit::emit(&palette.colors, &config.output_dir, &config.name, config.swatch_size)?;
    Ok((palette, artifacts))
}
