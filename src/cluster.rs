use crate::arrays::LABImage;

/// Color in the working color space together with pixel coordinates.
///
/// Used for pixels and for cluster centers alike.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelFeature {
    /// `[L, a, b]`
    pub color: [f32; 3],
    /// Column, starting from 0.
    pub x: u32,
    /// Row, starting from 0.
    pub y: u32,
}

impl PixelFeature {
    pub fn from_image(image: &LABImage, x: usize, y: usize) -> Self {
        let p = image.get_pixel(x, y);
        Self {
            color: [p[0], p[1], p[2]],
            x: x as u32,
            y: y as u32,
        }
    }
}

/// Struct of SLIC cluster/superpixel.
///
/// `center` and `num_members` are updated by `slic::update()`. Connectivity enforcement
/// moves `num_members` along with the relabelled pixels but leaves centers untouched.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Mean color and mean (rounded) position of the members.
    pub center: PixelFeature,
    /// Number of cluster (used in assignment)
    pub number: u32,
    /// Number of pixels inside cluster
    pub num_members: u32,
    // The window fields are valid only after `Cluster::update_coords()`, which is called at
    // the beginning of every assign step.
    pub(crate) top: usize,
    pub(crate) bottom: usize,
    pub(crate) left: usize,
    pub(crate) right: usize,
}

impl Cluster {
    pub fn new(center: PixelFeature, number: u32) -> Self {
        Self {
            center,
            number,
            num_members: 0,
            top: 0,
            bottom: 0,
            left: 0,
            right: 0,
        }
    }

    /// Search window `[x - S, x + S) x [y - S, y + S)` clipped to the image, as
    /// `(left, right, top, bottom)` with exclusive right and bottom.
    #[inline(always)]
    pub fn window(
        &self,
        width: usize,
        height: usize,
        search_region_size: usize,
    ) -> (usize, usize, usize, usize) {
        let x = self.center.x as usize;
        let y = self.center.y as usize;
        (
            x.saturating_sub(search_region_size),
            (x + search_region_size).min(width),
            y.saturating_sub(search_region_size),
            (y + search_region_size).min(height),
        )
    }

    pub(crate) fn update_coords(&mut self, image: &LABImage, search_region_size: usize) {
        (self.left, self.right, self.top, self.bottom) =
            self.window(image.width, image.height, search_region_size);
        debug_assert!(self.left < self.right && self.top < self.bottom, "{:?}", self);
    }

    /// Column offset of the window's left edge inside the spatial distance LUT.
    #[inline(always)]
    pub(crate) fn lut_left(&self, search_region_size: usize) -> usize {
        self.left + search_region_size - self.center.x as usize
    }

    /// Row offset of the image row inside the spatial distance LUT.
    #[inline(always)]
    pub(crate) fn lut_row(&self, row: usize, search_region_size: usize) -> usize {
        row + search_region_size - self.center.y as usize
    }
}
