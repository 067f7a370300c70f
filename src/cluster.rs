//! k-means over feature points, delegated to `kmeans_colors`.
//!
//! `kmeans_colors` seeds with k-means++ and runs Lloyd iterations for any
//! type implementing [`Calculate`]. Features are wrapped in [`Point`], tagged
//! with the [`Domain`] they live in so that empty clusters are re-seeded
//! inside the right region (the RGB cube or the HSV cylinder).

use std::marker::PhantomData;

use kmeans_colors::{Calculate, get_kmeans};
use rand::Rng;
use tracing::{debug, info};

use crate::color_space::{ColorSpace, Feature};
use crate::error::{PaletteError, Result};

/// Largest palette `kmeans_colors` can label; it stores labels as `u8`.
pub const MAX_CLUSTERS: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KMeansConfig {
    /// Lloyd iterations per run.
    pub max_iter: usize,
    /// A run stops once the summed squared centroid shift drops to this.
    pub tolerance: f32,
    /// Independent runs; the one with the lowest inertia wins.
    pub n_init: usize,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        KMeansConfig {
            max_iter: 300,
            tolerance: 1e-4,
            n_init: 4,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Clusters {
    /// Cluster centers, in no particular order.
    pub centroids: Vec<Feature>,
    /// Index into `centroids` for every input sample.
    pub labels: Vec<usize>,
    /// Sum of squared distances from samples to their centroid.
    pub inertia: f64,
    /// Summed squared centroid shift of the last iteration of the winning run.
    pub score: f32,
}

// ------------------------------------------------------------
// Feature points for kmeans_colors
// ------------------------------------------------------------

/// Region of feature space a clustering runs in.
pub trait Domain {
    /// Uniform random point of the region, used to re-seed empty clusters.
    fn random_feature(rng: &mut impl Rng) -> Feature;
}

/// The unit RGB cube.
#[derive(Clone, Copy, Debug)]
pub struct RgbCube;

/// The HSV disk embedding: unit disk in `(x, y)`, value in `[0, 1]`.
#[derive(Clone, Copy, Debug)]
pub struct HsvCylinder;

impl Domain for RgbCube {
    fn random_feature(rng: &mut impl Rng) -> Feature {
        [rng.random(), rng.random(), rng.random()]
    }
}

impl Domain for HsvCylinder {
    fn random_feature(rng: &mut impl Rng) -> Feature {
        let radius = rng.random::<f32>().sqrt();
        let phi = rng.random::<f32>() * std::f32::consts::TAU;
        [radius * phi.cos(), radius * phi.sin(), rng.random()]
    }
}

/// A feature tagged with the domain it belongs to.
#[derive(Debug)]
pub struct Point<D> {
    pub feature: Feature,
    domain: PhantomData<D>,
}

impl<D> Point<D> {
    pub fn new(feature: Feature) -> Self {
        Point {
            feature,
            domain: PhantomData,
        }
    }
}

impl<D> Clone for Point<D> {
    fn clone(&self) -> Self {
        Point::new(self.feature)
    }
}

impl<D: Domain> Calculate for Point<D> {
    fn get_closest_centroid(buffer: &[Self], centroids: &[Self], indices: &mut Vec<u8>) {
        indices.clear();
        for p in buffer {
            let mut index = 0;
            let mut min = f32::MAX;
            for (idx, c) in centroids.iter().enumerate() {
                let diff = Self::difference(p, c);
                if diff < min {
                    min = diff;
                    index = idx;
                }
            }
            indices.push(index as u8);
        }
    }

    fn recalculate_centroids(rng: &mut impl Rng, buf: &[Self], centroids: &mut [Self], indices: &[u8]) {
        for (idx, centroid) in centroids.iter_mut().enumerate() {
            let mut sum = [0.0f64; 3];
            let mut count = 0u64;
            for (p, _) in buf.iter().zip(indices).filter(|(_, label)| usize::from(**label) == idx) {
                for axis in 0..3 {
                    sum[axis] += f64::from(p.feature[axis]);
                }
                count += 1;
            }

            *centroid = if count == 0 {
                Point::create_random(rng)
            } else {
                Point::new(sum.map(|s| (s / count as f64) as f32))
            };
        }
    }

    fn check_loop(centroids: &[Self], old_centroids: &[Self]) -> f32 {
        centroids
            .iter()
            .zip(old_centroids)
            .map(|(a, b)| Self::difference(a, b))
            .sum()
    }

    fn create_random(rng: &mut impl Rng) -> Self {
        Point::new(D::random_feature(rng))
    }

    fn difference(c1: &Self, c2: &Self) -> f32 {
        dist_sq(&c1.feature, &c2.feature)
    }
}

// ------------------------------------------------------------
// Clustering
// ------------------------------------------------------------

/// Partition `samples` (points of `space`) into `k` clusters.
///
/// Each of the `n_init` runs gets its own seed drawn from `rng`, so a seeded
/// `rng` gives a reproducible result.
pub fn kmeans<R: Rng + ?Sized>(
    samples: &[Feature],
    k: usize,
    space: ColorSpace,
    config: &KMeansConfig,
    rng: &mut R,
) -> Result<Clusters> {
    if k == 0 {
        return Err(PaletteError::invalid("n_colors", "must be at least 1"));
    }
    if k > samples.len() {
        return Err(PaletteError::invalid(
            "n_colors",
            format!("{k} clusters requested from {} samples", samples.len()),
        ));
    }
    if k > MAX_CLUSTERS {
        return Err(PaletteError::invalid(
            "n_colors",
            format!("at most {MAX_CLUSTERS} clusters are supported, {k} requested"),
        ));
    }
    if config.max_iter == 0 || config.n_init == 0 {
        return Err(PaletteError::invalid("kmeans", "max_iter and n_init must be at least 1"));
    }

    let clusters = match space {
        ColorSpace::Rgb => best_of_runs::<RgbCube, R>(samples, k, config, rng),
        ColorSpace::HsvDisk => best_of_runs::<HsvCylinder, R>(samples, k, config, rng),
    };
    info!(k, inertia = clusters.inertia, score = clusters.score, "clustered samples");
    Ok(clusters)
}

fn best_of_runs<D: Domain, R: Rng + ?Sized>(
    samples: &[Feature],
    k: usize,
    config: &KMeansConfig,
    rng: &mut R,
) -> Clusters {
    let points: Vec<Point<D>> = samples.iter().map(|s| Point::new(*s)).collect();

    // k-means++ needs k distinct points to choose from.
    let mut distinct: Vec<Feature> = samples.to_vec();
    distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    distinct.dedup();
    if distinct.len() <= k {
        debug!(distinct = distinct.len(), k, "no more distinct points than clusters");
        let mut centroids = distinct;
        while centroids.len() < k {
            centroids.push(centroids[0]);
        }
        return labelled(samples, centroids, 0.0);
    }

    let mut best: Option<Clusters> = None;
    for run in 0..config.n_init {
        let seed: u64 = rng.random();
        let result = get_kmeans(k, config.max_iter, config.tolerance, false, &points, seed);

        let centroids: Vec<Feature> = result.centroids.iter().map(|c| c.feature).collect();
        let candidate = labelled(samples, centroids, result.score);
        debug!(run, seed, inertia = candidate.inertia, score = candidate.score, "k-means run finished");

        if best.as_ref().is_none_or(|b| candidate.inertia < b.inertia) {
            best = Some(candidate);
        }
    }

    // n_init >= 1 is checked by the caller.
    best.unwrap_or_else(|| labelled(samples, vec![samples[0]; k], 0.0))
}

/// Assign every sample to its nearest centroid and total the squared
/// distances.
fn labelled(samples: &[Feature], centroids: Vec<Feature>, score: f32) -> Clusters {
    let mut labels = Vec::with_capacity(samples.len());
    let mut inertia = 0.0;
    for s in samples {
        let (label, d) = centroids
            .iter()
            .enumerate()
            .map(|(j, c)| (j, dist_sq(s, c)))
            .fold((0, f32::INFINITY), |acc, cur| if cur.1 < acc.1 { cur } else { acc });
        labels.push(label);
        inertia += f64::from(d);
    }

    Clusters {
        centroids,
        labels,
        inertia,
        score,
    }
}

#[inline]
fn dist_sq(a: &Feature, b: &Feature) -> f32 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}
