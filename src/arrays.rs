use crate::cielab::{cielab_to_srgb_pixel, srgb_to_cielab_pixel};
use crate::error::Error;
use aligned_vec::{AVec, ConstAlign};
use rayon::prelude::*;
use std::ops::{Index, IndexMut};

const ALIGN: usize = 64;

/// Number of `f32` lanes per pixel in [`LABImage`]. The fourth lane is padding.
pub const LAB_LANES: usize = 4;

fn check_dimensions(
    len: usize,
    values_per_pixel: usize,
    width: usize,
    height: usize,
) -> Result<(), Error> {
    if width == 0 || height == 0 {
        return Err(Error::ZeroDimension);
    }
    if len != width * height * values_per_pixel {
        return Err(Error::DimensionMismatch { len, width, height });
    }
    Ok(())
}

/// Row-major 2D array in a cache-aligned buffer.
#[derive(Debug)]
pub struct Array2D<T> {
    pub data: AVec<T, ConstAlign<ALIGN>>,
    pub width: usize,
    pub height: usize,
}

impl<T> Array2D<T> {
    pub fn from_slice(data: &[T], width: usize, height: usize) -> Result<Self, Error>
    where
        T: Clone,
    {
        check_dimensions(data.len(), 1, width, height)?;
        Ok(Self {
            width,
            height,
            data: AVec::from_slice(ALIGN, data),
        })
    }

    pub fn from_fill(value: T, width: usize, height: usize) -> Self
    where
        T: Clone + Copy,
    {
        let data: AVec<T, ConstAlign<ALIGN>> =
            AVec::from_iter(ALIGN, (0..width * height).map(|_| value));
        Self {
            width,
            height,
            data,
        }
    }

    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.data.fill(value)
    }
    #[inline(always)]
    pub fn get_row(&self, row: usize) -> &[T] {
        debug_assert!(row < self.height);
        &self.data[(self.width * row)..(self.width * row + self.width)]
    }
    /// Part of the row with columns `left..right`.
    #[inline(always)]
    pub fn get_row_part(&self, row: usize, left: usize, right: usize) -> &[T] {
        debug_assert!(
            row < self.height,
            "Out-of-bounds row {row} < {}",
            self.height
        );
        debug_assert!(left <= right, "Empty row part {left}..{right}");
        debug_assert!(
            right <= self.width,
            "Out-of-bounds right {right} <= {}",
            self.width
        );
        &self.data[(self.width * row + left)..(self.width * row + right)]
    }
    #[inline(always)]
    pub fn get_index(&self, x: usize, y: usize) -> usize {
        debug_assert!(self.width > x);
        debug_assert!(self.height > y);
        self.width * y + x
    }
    pub fn get_x_y_index(&self, ind: usize) -> (usize, usize) {
        debug_assert!(ind < self.data.len());
        (ind % self.width, ind / self.width)
    }
}
impl<T> Index<(usize, usize)> for Array2D<T> {
    type Output = T;
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.data[self.get_index(x, y)]
    }
}
impl<T> IndexMut<(usize, usize)> for Array2D<T> {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        let idx = self.get_index(x, y);
        &mut self.data[idx]
    }
}

/// Image in the working color space (CIELAB), packed as `[L, a, b, 0]` per pixel.
#[derive(Debug)]
pub struct LABImage {
    pub lab_data: AVec<f32, ConstAlign<ALIGN>>,
    pub width: usize,
    pub height: usize,
}

impl LABImage {
    /// Converts packed RGB24 image.
    pub fn from_srgb(rgb_image: &[u8], width: usize, height: usize) -> Result<Self, Error> {
        check_dimensions(rgb_image.len(), 3, width, height)?;
        let mut lab_output: AVec<f32, ConstAlign<ALIGN>> =
            AVec::from_iter(ALIGN, (0..width * height * LAB_LANES).map(|_| 0f32));
        lab_output
            .par_chunks_exact_mut(LAB_LANES)
            .zip(rgb_image.par_chunks_exact(3))
            .for_each(|(out, rgb)| out[..3].copy_from_slice(&srgb_to_cielab_pixel(rgb)));
        Ok(Self {
            width,
            height,
            lab_data: lab_output,
        })
    }

    /// Wraps already converted colors packed as `[L, a, b]` per pixel.
    pub fn from_lab_slice(lab_data: &[f32], width: usize, height: usize) -> Result<Self, Error> {
        check_dimensions(lab_data.len(), 3, width, height)?;
        Self::from_iter(
            lab_data.chunks_exact(3).map(|p| [p[0], p[1], p[2]]),
            width,
            height,
        )
    }

    pub fn from_iter<I>(lab_iter: I, width: usize, height: usize) -> Result<Self, Error>
    where
        I: IntoIterator<Item = [f32; 3]>,
    {
        if width == 0 || height == 0 {
            return Err(Error::ZeroDimension);
        }
        let lab_output: AVec<f32, ConstAlign<ALIGN>> = AVec::from_iter(
            ALIGN,
            lab_iter.into_iter().flat_map(|[l, a, b]| [l, a, b, 0f32]),
        );
        check_dimensions(lab_output.len(), LAB_LANES, width, height).map_err(|_| {
            Error::DimensionMismatch {
                len: lab_output.len() / LAB_LANES,
                width,
                height,
            }
        })?;
        if let Some(index) = lab_output.iter().position(|v| !v.is_finite()) {
            return Err(Error::NonFiniteColor {
                index: index / LAB_LANES,
            });
        }
        Ok(Self {
            width,
            height,
            lab_data: lab_output,
        })
    }

    /// Converts the image back to packed RGB24.
    pub fn to_srgb(&self) -> Vec<u8> {
        let mut rgb = vec![0u8; self.width * self.height * 3];
        rgb.par_chunks_exact_mut(3)
            .zip(self.lab_data.par_chunks_exact(LAB_LANES))
            .for_each(|(out, lab)| out.copy_from_slice(&cielab_to_srgb_pixel(lab)));
        rgb
    }

    #[inline(always)]
    pub fn get_row(&self, row: usize) -> &[f32] {
        debug_assert!(row < self.height);
        let stride = self.width * LAB_LANES;
        &self.lab_data[(stride * row)..(stride * row + stride)]
    }
    #[inline(always)]
    pub fn get_index(&self, x: usize, y: usize) -> usize {
        debug_assert!(self.width > x);
        debug_assert!(self.height > y);
        (self.width * y + x) * LAB_LANES
    }
    #[inline(always)]
    pub fn get_pixel(&self, x: usize, y: usize) -> &[f32] {
        let idx = self.get_index(x, y);
        &self.lab_data[idx..idx + 3]
    }
    /// Pixels of the row with columns `left..right`, padding lanes included.
    #[inline(always)]
    pub fn get_row_part(&self, row: usize, left: usize, right: usize) -> &[f32] {
        debug_assert!(row < self.height);
        debug_assert!(left <= right);
        debug_assert!(right <= self.width);
        let stride = self.width * LAB_LANES;
        &self.lab_data[(stride * row + LAB_LANES * left)..(stride * row + LAB_LANES * right)]
    }
}
impl Index<(usize, usize)> for LABImage {
    type Output = [f32];
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        self.get_pixel(x, y)
    }
}
