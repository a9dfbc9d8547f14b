//! Initial cluster centers.
//!
//! Seeds are laid on a regular grid with step _S_ (one seed in the middle of every `S x S`
//! cell, row by row) and then moved to the lowest-gradient position of their 3x3 neighbourhood,
//! so that no seed starts on an edge or on a noisy pixel.

use crate::arrays::LABImage;
use crate::cluster::{Cluster, PixelFeature};

/// Side of the neighbourhood searched for the lowest gradient.
pub const GRADIENT_NEIGHBORHOOD: usize = 3;

/// Squared central differences in x and y summed over the color channels.
///
/// Needs both neighbours in both directions: `1 <= x < width - 1` and `1 <= y < height - 1`.
#[inline(always)]
pub fn gradient_magnitude(image: &LABImage, x: usize, y: usize) -> f32 {
    debug_assert!(x >= 1 && x + 1 < image.width, "x={x} on the border");
    debug_assert!(y >= 1 && y + 1 < image.height, "y={y} on the border");
    let left = image.get_pixel(x - 1, y);
    let right = image.get_pixel(x + 1, y);
    let up = image.get_pixel(x, y - 1);
    let down = image.get_pixel(x, y + 1);
    (0..3)
        .map(|c| {
            let dx = right[c] - left[c];
            let dy = down[c] - up[c];
            dx * dx + dy * dy
        })
        .sum()
}

/// Position with the lowest gradient in the `n x n` neighbourhood of `(x, y)`.
///
/// Candidates on the image border are skipped. The first candidate in scan order (top to
/// bottom, left to right) wins ties. If there is no candidate, `(x, y)` is returned unchanged.
pub fn lowest_gradient_position(image: &LABImage, x: usize, y: usize, n: usize) -> (usize, usize) {
    let half = n / 2;
    let mut min_gradient = f32::INFINITY;
    let mut best = (x, y);
    for cy in y.saturating_sub(half)..=(y + half) {
        if cy < 1 || cy + 1 >= image.height {
            continue;
        }
        for cx in x.saturating_sub(half)..=(x + half) {
            if cx < 1 || cx + 1 >= image.width {
                continue;
            }
            let gradient = gradient_magnitude(image, cx, cy);
            if gradient < min_gradient {
                min_gradient = gradient;
                best = (cx, cy);
            }
        }
    }
    best
}

/// Exactly `num_of_clusters` grid seeds, numbered in scan order.
///
/// The caller guarantees `0 < num_of_clusters <= width * height` and
/// `search_region_size == floor(sqrt(width * height / num_of_clusters))`, which makes the grid
/// have enough cells.
pub fn grid_seeds(
    image: &LABImage,
    num_of_clusters: u32,
    search_region_size: usize,
) -> Vec<Cluster> {
    let s = search_region_size;
    let mut seeds = Vec::with_capacity(num_of_clusters as usize);
    let mut column = 0;
    let mut row = 0;
    for number in 0..num_of_clusters {
        let grid_x = (column * s + s / 2).min(image.width - 1);
        let grid_y = (row * s + s / 2).min(image.height - 1);
        let (x, y) = lowest_gradient_position(image, grid_x, grid_y, GRADIENT_NEIGHBORHOOD);
        seeds.push(Cluster::new(PixelFeature::from_image(image, x, y), number));
        column += 1;
        if column * s >= image.width {
            column = 0;
            row += 1;
        }
    }
    debug_assert_eq!(seeds.len(), num_of_clusters as usize);
    seeds
}
