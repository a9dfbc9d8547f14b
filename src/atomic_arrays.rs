use crate::arrays::Array2D;
use aligned_vec::{AVec, ConstAlign};
use rayon::prelude::*;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const ALIGN: usize = 64;

/// Packed value of a pixel no cluster claimed yet.
pub const UNCLAIMED: u64 = u64::MAX;

/// Packs the distance and the cluster number into one word which orders by distance first and
/// by cluster number second.
///
/// Bit patterns of non-negative `f32` values sort in the same order as the values, so
/// `AtomicU64::fetch_min` on packed words keeps the nearest cluster, and the lower cluster
/// number on equal distances.
#[inline(always)]
pub fn pack_distance(distance: f32, cluster_number: u32) -> u64 {
    debug_assert!(distance >= 0.0, "distance {distance} must not be negative");
    ((distance.to_bits() as u64) << 32) | cluster_number as u64
}

#[inline(always)]
pub fn unpack_distance(packed: u64) -> (f32, u32) {
    (f32::from_bits((packed >> 32) as u32), packed as u32)
}

/// Per-pixel nearest cluster shared between threads.
///
/// Any number of threads can [`claim`](AtomicDistanceGrid::claim) pixels through `&self`,
/// the result does not depend on the order of the claims.
pub struct AtomicDistanceGrid {
    pub data: AVec<AtomicU64, ConstAlign<ALIGN>>,
    pub width: usize,
    pub height: usize,
}

impl AtomicDistanceGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: AVec::from_iter(ALIGN, (0..width * height).map(|_| AtomicU64::new(UNCLAIMED))),
            width,
            height,
        }
    }

    #[inline(always)]
    pub fn get_index(&self, x: usize, y: usize) -> usize {
        debug_assert!(
            self.width > x && self.height > y,
            "Index ({x}, {y}) is out of bounds ({}, {})",
            self.width,
            self.height
        );
        self.width * y + x
    }

    /// Claims the pixel for the cluster if it's nearer than the current owner.
    #[inline(always)]
    pub fn claim(&self, index: usize, distance: f32, cluster_number: u32) {
        self.data[index].fetch_min(pack_distance(distance, cluster_number), Ordering::Relaxed);
    }

    /// `(distance, cluster number)` of the current owner.
    pub fn owner(&self, index: usize) -> Option<(f32, u32)> {
        match self.data[index].load(Ordering::Relaxed) {
            UNCLAIMED => None,
            packed => Some(unpack_distance(packed)),
        }
    }

    /// Writes the owners out. Unclaimed pixels get `unclaimed_label` and an infinite distance.
    pub fn write_owners(
        &self,
        assignments: &mut Array2D<u32>,
        min_distances: &mut Array2D<f32>,
        unclaimed_label: u32,
    ) {
        debug_assert_eq!(assignments.data.len(), self.data.len());
        debug_assert_eq!(min_distances.data.len(), self.data.len());
        assignments
            .data
            .par_iter_mut()
            .zip(min_distances.data.par_iter_mut())
            .enumerate()
            .for_each(|(index, (assign, min_dist))| {
                (*min_dist, *assign) = self
                    .owner(index)
                    .unwrap_or((f32::INFINITY, unclaimed_label));
            });
    }
}

impl fmt::Debug for AtomicDistanceGrid {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("AtomicDistanceGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("data", &"Omitted...")
            .finish()
    }
}
