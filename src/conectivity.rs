use crate::arrays::Array2D;
use crate::common::Config;
use crate::slic::{Clusters, UNASSIGNED};
use log::trace;
use std::collections::VecDeque;

/// Outcome of the connectivity enforcement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectivityStats {
    /// 4-connected same-label regions found in the input.
    pub components: usize,
    /// Regions relabelled to a neighbouring label.
    pub merged_islands: usize,
    pub relabelled_pixels: usize,
}

/// Largest island which gets merged: `floor(width * height / num_of_clusters * min_size_factor)`.
pub fn min_island_size(width: usize, height: usize, config: &Config) -> usize {
    let super_size = (width * height) as f64 / config.num_of_clusters as f64;
    (super_size * config.min_size_factor as f64) as usize
}

/// This function implements the CCA step.
///
/// Replaces the assignments with [`relabel_small_islands()`] and moves the member counts of the
/// clusters along. Centers are left as they are.
pub fn enforce_connectivity(clusters: &mut Clusters, config: &Config) -> ConnectivityStats {
    let labels = &clusters.assignments;
    let min_size = min_island_size(labels.width, labels.height, config);
    let (relabelled, stats) = relabel_small_islands(labels, min_size);
    if stats.relabelled_pixels > 0 {
        for (old, new) in clusters.assignments.data.iter().zip(relabelled.data.iter()) {
            if old == new {
                continue;
            }
            if let Some(cluster) = clusters.clusters.get_mut(*old as usize) {
                cluster.num_members = cluster.num_members.saturating_sub(1);
            }
            if let Some(cluster) = clusters.clusters.get_mut(*new as usize) {
                cluster.num_members += 1;
            }
        }
    }
    clusters.assignments = relabelled;
    trace!(
        "connectivity: {} components, {} islands of at most {min_size} pixels merged ({} pixels)",
        stats.components,
        stats.merged_islands,
        stats.relabelled_pixels
    );
    stats
}

/// Merges every 4-connected island of at most `min_size` pixels into an adjacent label.
///
/// Pixels are scanned in row-major order and every unvisited pixel starts a breadth-first flood
/// fill over its label. The adjacent label is the last seen neighbour with a different label
/// that already has its final output label. Only the island containing the top-left pixel can
/// lack one, it then keeps its label even when small.
///
/// Running it again on its own output changes nothing.
pub fn relabel_small_islands(
    labels: &Array2D<u32>,
    min_size: usize,
) -> (Array2D<u32>, ConnectivityStats) {
    let (width, height) = (labels.width, labels.height);
    let mut output = Array2D::from_fill(UNASSIGNED, width, height);
    let mut visited = vec![false; labels.data.len()];
    let mut stats = ConnectivityStats::default();
    let mut queue = VecDeque::new();
    let mut island = Vec::new();

    for start in 0..labels.data.len() {
        if visited[start] {
            continue;
        }
        let label = labels.data[start];
        stats.components += 1;

        island.clear();
        visited[start] = true;
        queue.push_back(start);
        let mut adjacent = None;
        while let Some(index) = queue.pop_front() {
            island.push(index);
            output.data[index] = label;
            let (x, y) = labels.get_x_y_index(index);
            let neighbours = [
                (x > 0).then(|| index - 1),
                (x + 1 < width).then(|| index + 1),
                (y > 0).then(|| index - width),
                (y + 1 < height).then(|| index + width),
            ];
            for neighbour in neighbours.into_iter().flatten() {
                if labels.data[neighbour] == label {
                    if !visited[neighbour] {
                        visited[neighbour] = true;
                        queue.push_back(neighbour);
                    }
                } else if visited[neighbour] {
                    // a different label can only be visited by an earlier, finished island
                    adjacent = Some(output.data[neighbour]);
                }
            }
        }

        if island.len() > min_size {
            continue;
        }
        if let Some(adjacent) = adjacent {
            for index in &island {
                output.data[*index] = adjacent;
            }
            stats.merged_islands += 1;
            stats.relabelled_pixels += island.len();
        }
    }
    (output, stats)
}
