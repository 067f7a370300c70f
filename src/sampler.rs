use std::path::{Path, PathBuf};

use image::DynamicImage;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::color_space::Feature;
use crate::error::{PaletteError, Result};

/// Normalized RGB samples drawn from an image collection, `per_image`
/// consecutive samples per image.
#[derive(Clone, Debug)]
pub struct SamplePool {
    pub samples: Vec<Feature>,
    pub images: usize,
    pub per_image: usize,
}

impl SamplePool {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples taken from the `i`th image, `None` past the last image.
    pub fn image(&self, i: usize) -> Option<&[Feature]> {
        let start = i.checked_mul(self.per_image)?;
        self.samples.get(start..start.checked_add(self.per_image)?)
    }
}

/// Files matched by `pattern`, sorted by path. Directories are skipped.
pub fn matched_paths(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob::glob(pattern).map_err(|e| PaletteError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            PaletteError::io(path, e.into_error())
        })?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Draw `per_image` pixels from every image matched by `pattern`.
pub fn sample_images<R: Rng + ?Sized>(pattern: &str, per_image: usize, rng: &mut R) -> Result<SamplePool> {
    if per_image == 0 {
        return Err(PaletteError::invalid("pixels_per_image", "must be at least 1"));
    }

    // ----------------------
    // 1. Resolve the glob
    // ----------------------
    let paths = matched_paths(pattern)?;
    if paths.is_empty() {
        return Err(PaletteError::NoImagesFound(pattern.to_string()));
    }
    info!(pattern, images = paths.len(), per_image, "sampling pixels");

    // ----------------------
    // 2. Decode and sample each image; the first failure aborts
    // ----------------------
    let mut samples = Vec::with_capacity(paths.len() * per_image);
    for path in &paths {
        let img = image::open(path).map_err(|source| PaletteError::ImageLoad {
            path: path.clone(),
            source,
        })?;
        samples.extend(sample_image(&img, path, per_image, rng)?);
    }

    Ok(SamplePool {
        samples,
        images: paths.len(),
        per_image,
    })
}

/// Uniformly pick `per_image` distinct pixels of `img` as [0, 1] RGB,
/// ignoring alpha. Images smaller than `per_image` are rejected rather than
/// padded.
pub fn sample_image<R: Rng + ?Sized>(
    img: &DynamicImage,
    path: &Path,
    per_image: usize,
    rng: &mut R,
) -> Result<Vec<Feature>> {
    // Float conversion normalizes 8- and 16-bit sources alike and drops alpha.
    let rgb = img.to_rgb32f();
    let mut pixels: Vec<Feature> = rgb.pixels().map(|p| p.0).collect();
    if pixels.len() < per_image {
        return Err(PaletteError::ImageTooSmall {
            path: path.to_path_buf(),
            pixels: pixels.len(),
            required: per_image,
        });
    }

    // Partial Fisher-Yates: the first `per_image` slots are a uniform draw.
    let (chosen, _) = pixels.partial_shuffle(rng, per_image);
    debug!(path = %path.display(), width = rgb.width(), height = rgb.height(), "sampled image");
    Ok(chosen.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn checker(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 10])
            } else {
                Rgba([0, 0, 255, 255])
            }
        }))
    }

    #[test]
    fn samples_are_normalized_rgb() {
        let mut rng = StdRng::seed_from_u64(3);
        let picked = sample_image(&checker(4, 4), Path::new("c.png"), 16, &mut rng).unwrap();
        assert_eq!(picked.len(), 16);
        let reds = picked.iter().filter(|p| **p == [1.0, 0.0, 0.0]).count();
        let blues = picked.iter().filter(|p| **p == [0.0, 0.0, 1.0]).count();
        assert_eq!((reds, blues), (8, 8));
    }

    #[test]
    fn takes_a_subset_without_replacement() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(16, 16, |x, y| {
            image::Rgb([x as u8, y as u8, 0])
        }));
        let mut rng = StdRng::seed_from_u64(5);
        let mut picked = sample_image(&img, Path::new("g.png"), 40, &mut rng).unwrap();
        assert_eq!(picked.len(), 40);
        picked.sort_by(|a, b| a.partial_cmp(b).unwrap());
        picked.dedup();
        assert_eq!(picked.len(), 40);
    }

    #[test]
    fn small_images_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = sample_image(&checker(2, 2), Path::new("tiny.png"), 5, &mut rng).unwrap_err();
        assert!(matches!(err, PaletteError::ImageTooSmall { pixels: 4, required: 5, .. }));
    }

    #[test]
    fn pool_keeps_images_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbImage::from_pixel(3, 3, image::Rgb([0, 0, 255]))
            .save(dir.path().join("b.png"))
            .unwrap();
        image::RgbImage::from_pixel(3, 3, image::Rgb([255, 0, 0]))
            .save(dir.path().join("a.png"))
            .unwrap();
        std::fs::create_dir(dir.path().join("c.png")).unwrap();

        let pattern = format!("{}/*.png", dir.path().display());
        let mut rng = StdRng::seed_from_u64(8);
        let pool = sample_images(&pattern, 5, &mut rng).unwrap();
        assert_eq!((pool.images, pool.len()), (2, 10));
        assert!(pool.image(0).unwrap().iter().all(|p| *p == [1.0, 0.0, 0.0]));
        assert!(pool.image(1).unwrap().iter().all(|p| *p == [0.0, 0.0, 1.0]));
        assert!(pool.image(pool.images).is_none());
        assert!(pool.image(usize::MAX).is_none());
    }

    #[test]
    fn empty_match_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.png", dir.path().display());
        let mut rng = StdRng::seed_from_u64(0);
        let err = sample_images(&pattern, 4, &mut rng).unwrap_err();
        assert!(matches!(err, PaletteError::NoImagesFound(_)));
    }

    #[test]
    fn undecodable_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.png"), b"not an image").unwrap();
        let pattern = format!("{}/*.png", dir.path().display());
        let mut rng = StdRng::seed_from_u64(0);
        let err = sample_images(&pattern, 4, &mut rng).unwrap_err();
        assert!(matches!(err, PaletteError::ImageLoad { .. }));
    }

    #[test]
    fn bad_pattern_is_reported() {
        let err = matched_paths("[").unwrap_err();
        assert!(matches!(err, PaletteError::InvalidPattern { .. }));
    }
}
