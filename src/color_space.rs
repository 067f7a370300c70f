use std::f32::consts::TAU;

use palette::{FromColor, Hsv, Srgb};

/// A point in the space k-means runs in.
pub type Feature = [f32; 3];

/// Where clustering happens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorSpace {
    /// `(r, g, b)` in [0, 1], unchanged.
    #[default]
    Rgb,
    /// Hue placed on a circle of radius saturation, value as height:
    /// `(S cos 2πH, S sin 2πH, V)`. Hues near 0 and 1 end up close, and
    /// grays collapse towards the axis whatever their hue.
    HsvDisk,
}

impl ColorSpace {
    pub fn to_feature(self, rgb: Srgb<f32>) -> Feature {
        match self {
            ColorSpace::Rgb => [rgb.red, rgb.green, rgb.blue],
            ColorSpace::HsvDisk => {
                let hsv: Hsv = Hsv::from_color(rgb);
                let phi = hsv.hue.into_positive_degrees() / 360.0 * TAU;
                [hsv.saturation * phi.cos(), hsv.saturation * phi.sin(), hsv.value]
            }
        }
    }

    /// Inverse of [`ColorSpace::to_feature`]. Points off the HSV solid (as
    /// centroids can be) are clamped back onto it.
    pub fn to_rgb(self, [x, y, z]: Feature) -> Srgb<f32> {
        match self {
            ColorSpace::Rgb => Srgb::new(x, y, z),
            ColorSpace::HsvDisk => {
                let hue = y.atan2(x).to_degrees().rem_euclid(360.0);
                let saturation = x.hypot(y).min(1.0);
                let hsv: Hsv = Hsv::new(hue, saturation, z.clamp(0.0, 1.0));
                Srgb::from_color(hsv)
            }
        }
    }

    /// Map a pool of RGB samples into this space in place.
    pub fn map_in_place(self, samples: &mut [Feature]) {
        if self == ColorSpace::Rgb {
            return;
        }
        for s in samples.iter_mut() {
            *s = self.to_feature(Srgb::new(s[0], s[1], s[2]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn close(a: Srgb<f32>, b: Srgb<f32>) -> bool {
        (a.red - b.red).abs() < 1e-4 && (a.green - b.green).abs() < 1e-4 && (a.blue - b.blue).abs() < 1e-4
    }

    #[test]
    fn rgb_is_identity() {
        let c = Srgb::new(0.1, 0.5, 0.9);
        assert_eq!(ColorSpace::Rgb.to_feature(c), [0.1, 0.5, 0.9]);
        assert_eq!(ColorSpace::Rgb.to_rgb([0.1, 0.5, 0.9]), c);
    }

    #[test]
    fn hsv_disk_embedding() {
        let [x, y, z] = ColorSpace::HsvDisk.to_feature(Srgb::new(1.0, 0.0, 0.0));
        assert!((x - 1.0).abs() < 1e-6 && y.abs() < 1e-6 && (z - 1.0).abs() < 1e-6);

        // Blue sits at 240 degrees.
        let [x, y, _] = ColorSpace::HsvDisk.to_feature(Srgb::new(0.0, 0.0, 1.0));
        assert!((x + 0.5).abs() < 1e-5);
        assert!((y + 0.75f32.sqrt()).abs() < 1e-5);

        let [x, y, z] = ColorSpace::HsvDisk.to_feature(Srgb::new(0.4, 0.4, 0.4));
        assert_eq!([x, y], [0.0, 0.0]);
        assert!((z - 0.4).abs() < 1e-6);
    }

    #[test]
    fn hues_near_wraparound_are_neighbours() {
        let a = ColorSpace::HsvDisk.to_feature(Srgb::new(1.0, 0.0, 0.02));
        let b = ColorSpace::HsvDisk.to_feature(Srgb::new(1.0, 0.02, 0.0));
        let d: f32 = a.iter().zip(b.iter()).map(|(p, q)| (p - q) * (p - q)).sum();
        assert!(d.sqrt() < 0.05);
    }

    #[test]
    fn hsv_round_trip() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..2000 {
            let c = Srgb::new(rng.random::<f32>(), rng.random::<f32>(), rng.random::<f32>());
            let back = ColorSpace::HsvDisk.to_rgb(ColorSpace::HsvDisk.to_feature(c));
            assert!(close(c, back), "{c:?} -> {back:?}");
        }
    }

    #[test]
    fn grays_round_trip_without_hue() {
        let gray = Srgb::new(0.3, 0.3, 0.3);
        assert!(close(gray, ColorSpace::HsvDisk.to_rgb(ColorSpace::HsvDisk.to_feature(gray))));
    }

    #[test]
    fn map_in_place_converts_every_sample() {
        let mut pool = vec![[1.0, 0.0, 0.0], [0.5, 0.5, 0.5]];
        ColorSpace::HsvDisk.map_in_place(&mut pool);
        assert!((pool[0][0] - 1.0).abs() < 1e-6);
        assert_eq!(&pool[1][..2], &[0.0, 0.0]);
    }
}
