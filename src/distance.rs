//! Combined color and spatial distance used by assignment and by the convergence check.
//!
//! `D = ||color1 - color2|| + (m / S) * ||xy1 - xy2||`
//!
//! Both terms are Euclidean norms. The compactness `m` trades color fidelity for regular
//! superpixel shapes and the seed spacing `S` keeps the spatial term comparable to the color
//! term for any image size and number of clusters.

use crate::arrays::Array2D;
use crate::cluster::PixelFeature;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceMetric {
    spatial_weight: f32,
    search_region_size: usize,
}

impl DistanceMetric {
    /// The caller guarantees `compactness > 0` and `search_region_size > 0`.
    pub fn new(compactness: f32, search_region_size: usize) -> Self {
        debug_assert!(compactness > 0.0);
        debug_assert!(search_region_size > 0);
        Self {
            spatial_weight: compactness / search_region_size as f32,
            search_region_size,
        }
    }

    #[inline(always)]
    pub fn search_region_size(&self) -> usize {
        self.search_region_size
    }

    #[inline(always)]
    pub fn color_distance(c1: &[f32], c2: &[f32]) -> f32 {
        let dl = c1[0] - c2[0];
        let da = c1[1] - c2[1];
        let db = c1[2] - c2[2];
        (dl * dl + da * da + db * db).sqrt()
    }

    /// Weighted spatial term for the offset `(dx, dy)`.
    #[inline(always)]
    pub fn spatial_term(&self, dx: i64, dy: i64) -> f32 {
        self.spatial_weight * ((dx * dx + dy * dy) as f32).sqrt()
    }

    #[inline(always)]
    pub fn distance(&self, f1: &PixelFeature, f2: &PixelFeature) -> f32 {
        let dx = f1.x as i64 - f2.x as i64;
        let dy = f1.y as i64 - f2.y as i64;
        Self::color_distance(&f1.color, &f2.color) + self.spatial_term(dx, dy)
    }

    /// This function computes LUT for spatial distances.
    ///
    /// Entry `(i, j)` holds `spatial_term(i - S, j - S)` for the window offsets `-S..S`, so a
    /// lookup gives exactly the value `distance()` computes.
    pub fn spatial_distance_lut(&self) -> Array2D<f32> {
        let s = self.search_region_size;
        let lut_size = 2 * s;
        let mut spatial_distance_lut: Array2D<f32> =
            Array2D::from_fill(f32::INFINITY, lut_size, lut_size);
        for j in 0..lut_size {
            for i in 0..lut_size {
                spatial_distance_lut[(i, j)] =
                    self.spatial_term(i as i64 - s as i64, j as i64 - s as i64);
            }
        }
        spatial_distance_lut
    }
}

#[cfg(test)]
mod tests {
    use super::DistanceMetric;
    use crate::cluster::PixelFeature;

    fn feature(color: [f32; 3], x: u32, y: u32) -> PixelFeature {
        PixelFeature { color, x, y }
    }

    #[test]
    fn distance_test() {
        let metric = DistanceMetric::new(10.0, 5);
        let f1 = feature([10.0, 0.0, 0.0], 0, 0);
        let f2 = feature([13.0, 4.0, 0.0], 3, 4);
        assert_eq!(DistanceMetric::color_distance(&f1.color, &f2.color), 5.0);
        assert_eq!(metric.spatial_term(3, 4), 10.0);
        assert_eq!(metric.distance(&f1, &f2), 15.0);
        assert_eq!(metric.distance(&f2, &f1), 15.0);
        assert_eq!(metric.distance(&f1, &f1), 0.0);
    }

    #[test]
    fn compactness_weights_spatial_term_test() {
        let f1 = feature([0.0; 3], 0, 0);
        let f2 = feature([0.0; 3], 0, 8);
        let loose = DistanceMetric::new(1.0, 4);
        let compact = DistanceMetric::new(40.0, 4);
        assert_eq!(loose.distance(&f1, &f2), 2.0);
        assert_eq!(compact.distance(&f1, &f2), 80.0);
    }

    #[test]
    fn lut_matches_direct_distance_test() {
        let metric = DistanceMetric::new(7.3, 6);
        let lut = metric.spatial_distance_lut();
        assert_eq!((lut.width, lut.height), (12, 12));
        assert_eq!(lut[(6, 6)], 0.0);
        let center = feature([1.5, -2.0, 30.0], 40, 40);
        for y in 34..46u32 {
            for x in 34..46u32 {
                let pixel = feature([3.0, 1.0, 22.0], x, y);
                let by_lut = DistanceMetric::color_distance(&pixel.color, &center.color)
                    + lut[(x as usize + 6 - 40, y as usize + 6 - 40)];
                assert_eq!(by_lut, metric.distance(&pixel, &center));
            }
        }
    }
}
