//! Synthetic images for the unit tests.

use crate::arrays::LABImage;

fn hash(x: usize, y: usize, seed: u32) -> u32 {
    let mut h = (x as u32).wrapping_mul(0x9E37_79B1) ^ (y as u32).wrapping_mul(0x85EB_CA77) ^ seed;
    h ^= h >> 15;
    h = h.wrapping_mul(0x2C1B_3C6D);
    h ^= h >> 12;
    h = h.wrapping_mul(0x297A_2D39);
    h ^ (h >> 15)
}

/// Smooth gradients with noise, no two neighbours have the same color.
pub(crate) fn textured_image(width: usize, height: usize) -> LABImage {
    LABImage::from_iter(
        (0..width * height).map(|i| {
            let (x, y) = (i % width, i / width);
            [
                (x * 3 + y) as f32 % 100.0 + (hash(x, y, 1) % 7) as f32,
                ((x * y) % 61) as f32 - 30.0 + (hash(x, y, 2) % 5) as f32 * 0.25,
                (hash(x, y, 3) % 40) as f32 - 20.0,
            ]
        }),
        width,
        height,
    )
    .unwrap()
}

/// Flat `block_width x block_height` blocks, block `i` (in scan order) has color `colors[i]`.
pub(crate) fn block_image(
    width: usize,
    height: usize,
    block_width: usize,
    block_height: usize,
    colors: &[[f32; 3]],
) -> LABImage {
    let blocks_per_row = width.div_ceil(block_width);
    LABImage::from_iter(
        (0..width * height).map(|i| {
            let (x, y) = (i % width, i / width);
            colors[(y / block_height) * blocks_per_row + x / block_width]
        }),
        width,
        height,
    )
    .unwrap()
}
