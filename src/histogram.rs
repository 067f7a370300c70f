//! Precomputed 3-D color density and the inverse-frequency weights derived
//! from it.
//!
//! The histogram is produced upstream and persisted as JSON:
//!
//! ```json
//! { "bins": [0.0, 0.25, 0.5, 0.75, 1.0], "counts": [[[3, 0, ...], ...], ...] }
//! ```
//!
//! `bins` is either one edge sequence shared by all three axes or three
//! sequences, one per axis. `counts` is indexed `[x][y][z]` and has
//! `edges - 1` entries along each axis.
//!
//! Histograms kept as HDF5 (`hist.h5` with `bins` and `counts` datasets)
//! convert one-to-one, for instance with h5py:
//!
//! ```text
//! python -c "import h5py, json; f = h5py.File('hist.h5', 'r'); \
//!   json.dump({k: f[k][...].tolist() for k in ('bins', 'counts')}, open('hist.json', 'w'))"
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{PaletteError, Result};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBins {
    Shared(Vec<f64>),
    PerAxis(Vec<Vec<f64>>),
}

#[derive(Deserialize)]
struct RawHistogram {
    bins: RawBins,
    counts: Vec<Vec<Vec<f64>>>,
}

/// Immutable joint density over a 3-D color space.
#[derive(Clone, Debug)]
pub struct Histogram {
    edges: [Vec<f64>; 3],
    shape: [usize; 3],
    // Row-major over (x, y, z).
    counts: Vec<f64>,
}

impl Histogram {
    /// Build a histogram from per-axis edges and nested `[x][y][z]` counts.
    pub fn new(edges: [Vec<f64>; 3], counts: Vec<Vec<Vec<f64>>>) -> Result<Self> {
        Self::validated(edges, counts).map_err(|reason| PaletteError::invalid("histogram", reason))
    }

    /// Histogram with the same edges on every axis and the same count in
    /// every bin.
    pub fn uniform(edges: Vec<f64>, count: f64) -> Result<Self> {
        let n = edges.len().saturating_sub(1);
        let counts = vec![vec![vec![count; n]; n]; n];
        Self::new([edges.clone(), edges.clone(), edges], counts)
    }

    /// Read a persisted histogram.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PaletteError::MissingFile(path.to_path_buf()),
            _ => PaletteError::io(path, e),
        })?;

        let raw: RawHistogram = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| PaletteError::corrupt(path, e.to_string()))?;

        let edges = match raw.bins {
            RawBins::Shared(edges) => [edges.clone(), edges.clone(), edges],
            RawBins::PerAxis(axes) => axes.try_into().map_err(|axes: Vec<Vec<f64>>| {
                PaletteError::corrupt(path, format!("expected 3 edge sequences, found {}", axes.len()))
            })?,
        };

        let hist = Self::validated(edges, raw.counts).map_err(|reason| PaletteError::corrupt(path, reason))?;
        info!(path = %path.display(), shape = ?hist.shape, "loaded color histogram");
        Ok(hist)
    }

    fn validated(edges: [Vec<f64>; 3], nested: Vec<Vec<Vec<f64>>>) -> std::result::Result<Self, String> {
        for (axis, e) in edges.iter().enumerate() {
            if e.len() < 2 {
                return Err(format!("axis {axis} needs at least 2 bin edges, found {}", e.len()));
            }
            if e.iter().any(|v| !v.is_finite()) {
                return Err(format!("axis {axis} has non-finite bin edges"));
            }
            if e.windows(2).any(|w| w[0] >= w[1]) {
                return Err(format!("axis {axis} bin edges are not strictly increasing"));
            }
        }

        let shape = [edges[0].len() - 1, edges[1].len() - 1, edges[2].len() - 1];
        if nested.len() != shape[0] {
            return Err(format!("counts has {} x-bins, edges imply {}", nested.len(), shape[0]));
        }

        let mut counts = Vec::with_capacity(shape.iter().product());
        for plane in nested {
            if plane.len() != shape[1] {
                return Err(format!("counts has {} y-bins, edges imply {}", plane.len(), shape[1]));
            }
            for row in plane {
                if row.len() != shape[2] {
                    return Err(format!("counts has {} z-bins, edges imply {}", row.len(), shape[2]));
                }
                counts.extend(row);
            }
        }

        // Infinite counts are legal and map to a zero weight.
        if counts.iter().any(|c| c.is_nan() || *c < 0.0) {
            return Err("counts must be non-negative numbers".to_string());
        }

        Ok(Histogram { edges, shape, counts })
    }

    pub fn edges(&self, axis: usize) -> &[f64] {
        &self.edges[axis]
    }

    /// Number of bins along each axis.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn count(&self, index: [usize; 3]) -> f64 {
        self.counts[flat_index(self.shape, index)]
    }

    /// Inverse-frequency weights, `1 / (1 + count)` per bin.
    pub fn weights(&self) -> WeightTable {
        WeightTable {
            edges: self.edges.clone(),
            shape: self.shape,
            weights: self.counts.iter().map(|c| 1.0 / (1.0 + c)).collect(),
        }
    }
}

/// Per-bin sampling weights, shaped like the histogram they came from.
#[derive(Clone, Debug)]
pub struct WeightTable {
    edges: [Vec<f64>; 3],
    shape: [usize; 3],
    weights: Vec<f64>,
}

impl WeightTable {
    pub fn edges(&self, axis: usize) -> &[f64] {
        &self.edges[axis]
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn get(&self, index: [usize; 3]) -> f64 {
        self.weights[flat_index(self.shape, index)]
    }
}

#[inline]
fn flat_index(shape: [usize; 3], [x, y, z]: [usize; 3]) -> usize {
    (x * shape[1] + y) * shape[2] + z
}
