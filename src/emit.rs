use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb, RgbImage};
use palette::Srgb;
use tracing::info;

use crate::error::{PaletteError, Result};

/// Files written for one palette.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaletteArtifacts {
    pub swatch: PathBuf,
    pub csv: PathBuf,
}

/// Create `dir` (and parents) if it does not exist yet.
pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| PaletteError::io(dir, e))
}

/// Largest accepted swatch block edge, in pixels.
pub const MAX_SWATCH_SIZE: u32 = 1024;

/// Width of a swatch of `colors` blocks of `block` pixels, or
/// `InvalidParameter` when a block is empty or the row is too wide.
pub fn swatch_width(colors: usize, block: u32) -> Result<u32> {
    if block == 0 || block > MAX_SWATCH_SIZE {
        return Err(PaletteError::invalid(
            "swatch_size",
            format!("{block} is outside 1..={MAX_SWATCH_SIZE}"),
        ));
    }
    u32::try_from(colors)
        .ok()
        .and_then(|n| n.checked_mul(block))
        .ok_or_else(|| PaletteError::invalid("swatch_size", format!("{colors} blocks of {block} px do not fit a swatch")))
}

/// One row of `block`×`block` squares, one per color, in palette order.
pub fn render_swatch(colors: &[Srgb<f32>], block: u32) -> Result<RgbImage> {
    let width = swatch_width(colors.len(), block)?;

    // Quantize once; clamp first so out-of-gamut centroids saturate.
    let quantized: Vec<Rgb<u8>> = colors
        .iter()
        .map(|c| {
            let c: Srgb<u8> = Srgb::new(c.red.clamp(0.0, 1.0), c.green.clamp(0.0, 1.0), c.blue.clamp(0.0, 1.0))
                .into_format();
            Rgb([c.red, c.green, c.blue])
        })
        .collect();

    Ok(RgbImage::from_fn(width, block, |x, _| quantized[(x / block) as usize]))
}

/// Write one `r,g,b` line per color.
pub fn write_csv(colors: &[Srgb<f32>], path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| PaletteError::io(path, e))?;
    let mut out = BufWriter::new(file);
    for c in colors {
        writeln!(out, "{},{},{}", c.red, c.green, c.blue).map_err(|e| PaletteError::io(path, e))?;
    }
    out.flush().map_err(|e| PaletteError::io(path, e))
}

/// Persist `<dir>/<name>.png` and `<dir>/<name>.csv`, replacing any earlier
/// palette of the same name.
pub fn emit(colors: &[Srgb<f32>], dir: &Path, name: &str, block: u32) -> Result<PaletteArtifacts> {
    if colors.is_empty() {
        return Err(PaletteError::invalid("palette", "no colors to write"));
    }

    // ----------------------
    // 1. Render before touching the filesystem
    // ----------------------
    let image = render_swatch(colors, block)?;
    ensure_output_dir(dir)?;

    // ----------------------
    // 2. Swatch PNG
    // ----------------------
    let swatch = dir.join(format!("{name}.png"));
    image
        .save_with_format(&swatch, ImageFormat::Png)
        .map_err(|source| PaletteError::Encode {
            path: swatch.clone(),
            source,
        })?;

    // ----------------------
    // 3. CSV rows
    // ----------------------
    let csv = dir.join(format!("{name}.csv"));
    write_csv(colors, &csv)?;

    info!(swatch = %swatch.display(), csv = %csv.display(), colors = colors.len(), "wrote palette");
    Ok(PaletteArtifacts { swatch, csv })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swatch_blocks_follow_palette_order() {
        let colors = [Srgb::new(1.0, 0.0, 0.0), Srgb::new(0.0, 0.0, 1.0), Srgb::new(1.2, 1.0, -0.1)];
        let img = render_swatch(&colors, 4).unwrap();
        assert_eq!(img.dimensions(), (12, 4));
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(7, 3).0, [0, 0, 255]);
        assert_eq!(img.get_pixel(11, 2).0, [255, 255, 0]);
    }

    #[test]
    fn emit_creates_directory_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("palettes");

        let first = emit(&[Srgb::new(0.5, 0.25, 1.0)], &dir, "lisbon", 2).unwrap();
        assert_eq!(fs::read_to_string(&first.csv).unwrap(), "0.5,0.25,1\n");

        let second = emit(&[Srgb::new(0.0, 0.0, 0.0), Srgb::new(1.0, 1.0, 1.0)], &dir, "lisbon", 2).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(&second.csv).unwrap().lines().count(), 2);
        assert_eq!(image::open(&second.swatch).unwrap().to_rgb8().dimensions(), (4, 2));
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 2);
    }

    #[test]
    fn oversized_swatch_is_rejected_before_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("palettes");
        let red = Srgb::new(1.0, 0.0, 0.0);

        for block in [0, u32::MAX / 2, MAX_SWATCH_SIZE + 1] {
            let err = emit(&[red; 3], &dir, "x", block).unwrap_err();
            assert!(matches!(err, PaletteError::InvalidParameter { name: "swatch_size", .. }), "{block}: {err}");
        }
        assert!(!dir.exists());

        assert!(swatch_width(usize::MAX, 1).is_err());
        assert_eq!(swatch_width(3, MAX_SWATCH_SIZE).unwrap(), 3 * MAX_SWATCH_SIZE);
    }

    #[test]
    fn ensure_output_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("palettes");
        ensure_output_dir(&dir).unwrap();
        ensure_output_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }
}
