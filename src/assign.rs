use crate::arrays::{Array2D, LABImage, LAB_LANES};
use crate::atomic_arrays::AtomicDistanceGrid;
use crate::cluster::{Cluster, PixelFeature};
use crate::common::{split_length_to_ranges, AssignThreadingStrategy, Config};
use crate::distance::DistanceMetric;
use crate::slic::{Clusters, UNASSIGNED};
use assume::assume;
use multiversion::multiversion;
use rayon::current_num_threads;
use rayon::prelude::*;
use std::ops::Range;

/// Outcome of one assign step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignStats {
    /// Pixels outside every cluster's search window, assigned by a search over all clusters.
    pub uncovered: usize,
}

/// This function implements the assign step in SLIC algorithm.
///
/// Every cluster only looks at its search window `[x - S, x + S) x [y - S, y + S)`. A pixel
/// goes to the cluster with the strictly smallest distance, on equal distances the cluster with
/// the lower number keeps it. `min_distances` ends up holding the winning distance per pixel.
pub fn assign(
    image: &LABImage,
    config: &Config,
    clusters: &mut Clusters,
    min_distances: &mut Array2D<f32>,
    metric: &DistanceMetric,
    spatial_distance_lut: &Array2D<f32>,
) -> AssignStats {
    let search_region_size = metric.search_region_size();
    let Clusters {
        assignments,
        clusters,
    } = clusters;
    clusters
        .iter_mut()
        .for_each(|c| c.update_coords(image, search_region_size));
    let clusters: &[Cluster] = clusters;

    match config.assign_threading_strategy {
        AssignThreadingStrategy::SingleThread => {
            min_distances.fill(f32::INFINITY);
            assignments.fill(UNASSIGNED);
            assign_band(
                image,
                clusters,
                0..image.height,
                &mut assignments.data,
                &mut min_distances.data,
                spatial_distance_lut,
                search_region_size,
            );
        }
        AssignThreadingStrategy::RowBased => {
            min_distances.fill(f32::INFINITY);
            assignments.fill(UNASSIGNED);
            let ranges = split_length_to_ranges(image.height, current_num_threads());
            let mut bands: Vec<(Range<usize>, &mut [u32], &mut [f32])> =
                Vec::with_capacity(ranges.len());
            let mut assignments_rest: &mut [u32] = &mut assignments.data;
            let mut min_distances_rest: &mut [f32] = &mut min_distances.data;
            for rows in ranges {
                let len = rows.len() * image.width;
                let (band_assignments, rest) = assignments_rest.split_at_mut(len);
                assignments_rest = rest;
                let (band_min_distances, rest) = min_distances_rest.split_at_mut(len);
                min_distances_rest = rest;
                bands.push((rows, band_assignments, band_min_distances));
            }
            bands
                .into_par_iter()
                .for_each(|(rows, band_assignments, band_min_distances)| {
                    assign_band(
                        image,
                        clusters,
                        rows,
                        band_assignments,
                        band_min_distances,
                        spatial_distance_lut,
                        search_region_size,
                    )
                });
        }
        AssignThreadingStrategy::ClusterAtomic => {
            assign_clusters_atomic(
                image,
                clusters,
                assignments,
                min_distances,
                spatial_distance_lut,
                search_region_size,
            );
        }
    }

    AssignStats {
        uncovered: assign_uncovered(image, clusters, metric, assignments, min_distances),
    }
}

/// Assigns the rows `rows` of the image. `assignments` and `min_distances` hold exactly these
/// rows. Clusters are visited in the order of the slice.
#[multiversion(targets = "simd")]
fn assign_band(
    image: &LABImage,
    clusters: &[Cluster],
    rows: Range<usize>,
    assignments: &mut [u32],
    min_distances: &mut [f32],
    spatial_distance_lut: &Array2D<f32>,
    search_region_size: usize,
) {
    debug_assert_eq!(assignments.len(), rows.len() * image.width);
    debug_assert_eq!(assignments.len(), min_distances.len());
    let width = image.width;
    for cluster in clusters {
        if cluster.bottom <= rows.start || cluster.top >= rows.end {
            continue;
        }
        let cluster_color = cluster.center.color;
        let lut_left = cluster.lut_left(search_region_size);
        let lut_right = lut_left + (cluster.right - cluster.left);
        for row in cluster.top.max(rows.start)..cluster.bottom.min(rows.end) {
            let start = (row - rows.start) * width;
            assume!(unsafe: start + cluster.right <= assignments.len(), "row {row} of cluster {} is out of band {:?}", cluster.number, rows);
            let image_row = image.get_row_part(row, cluster.left, cluster.right);
            let dist_row = spatial_distance_lut.get_row_part(
                cluster.lut_row(row, search_region_size),
                lut_left,
                lut_right,
            );
            assign_row_generic(
                image_row,
                dist_row,
                &cluster_color,
                cluster.number,
                &mut min_distances[start + cluster.left..start + cluster.right],
                &mut assignments[start + cluster.left..start + cluster.right],
            );
        }
    }
}

#[inline(always)]
fn assign_row_generic(
    image_row: &[f32],
    dist_row: &[f32],
    cluster_color: &[f32; 3],
    cluster_number: u32,
    min_dist_row: &mut [f32],
    assign_row: &mut [u32],
) {
    debug_assert_eq!(image_row.len(), dist_row.len() * LAB_LANES);
    for (((pixel, dist_lut), min_dist), assign) in image_row
        .chunks_exact(LAB_LANES)
        .zip(dist_row)
        .zip(min_dist_row)
        .zip(assign_row)
    {
        let dist = DistanceMetric::color_distance(pixel, cluster_color) + dist_lut;
        // overflowing colors give infinite distances, the first cluster still takes the pixel
        if dist < *min_dist || *assign == UNASSIGNED {
            *min_dist = dist;
            *assign = cluster_number;
        }
    }
}

/// Clusters are processed in parallel, overlapping windows meet in an atomic minimum of
/// `(distance, cluster number)` per pixel.
fn assign_clusters_atomic(
    image: &LABImage,
    clusters: &[Cluster],
    assignments: &mut Array2D<u32>,
    min_distances: &mut Array2D<f32>,
    spatial_distance_lut: &Array2D<f32>,
    search_region_size: usize,
) {
    let claims = AtomicDistanceGrid::new(image.width, image.height);

    clusters.par_iter().for_each(|cluster| {
        let cluster_color = cluster.center.color;
        let lut_left = cluster.lut_left(search_region_size);
        let lut_right = lut_left + (cluster.right - cluster.left);
        for row in cluster.top..cluster.bottom {
            let image_row = image.get_row_part(row, cluster.left, cluster.right);
            let dist_row = spatial_distance_lut.get_row_part(
                cluster.lut_row(row, search_region_size),
                lut_left,
                lut_right,
            );
            let index = claims.get_index(cluster.left, row);
            for (offset, (pixel, dist_lut)) in image_row
                .chunks_exact(LAB_LANES)
                .zip(dist_row)
                .enumerate()
            {
                let dist = DistanceMetric::color_distance(pixel, &cluster_color) + dist_lut;
                claims.claim(index + offset, dist, cluster.number);
            }
        }
    });

    claims.write_owners(assignments, min_distances, UNASSIGNED);
}

/// Pixels no search window reached are given to the nearest cluster over all clusters.
///
/// This happens only near the right and bottom image edges, when the seed grid leaves the
/// last cells without a seed.
fn assign_uncovered(
    image: &LABImage,
    clusters: &[Cluster],
    metric: &DistanceMetric,
    assignments: &mut Array2D<u32>,
    min_distances: &mut Array2D<f32>,
) -> usize {
    let width = image.width;
    assignments
        .data
        .par_chunks_mut(width)
        .zip(min_distances.data.par_chunks_mut(width))
        .enumerate()
        .map(|(y, (assign_row, min_dist_row))| {
            let mut uncovered = 0;
            for (x, (assign, min_dist)) in assign_row.iter_mut().zip(min_dist_row).enumerate() {
                if *assign != UNASSIGNED {
                    continue;
                }
                uncovered += 1;
                let pixel = PixelFeature::from_image(image, x, y);
                for cluster in clusters {
                    let dist = metric.distance(&pixel, &cluster.center);
                    if dist < *min_dist || *assign == UNASSIGNED {
                        *min_dist = dist;
                        *assign = cluster.number;
                    }
                }
            }
            uncovered
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::{assign, AssignStats};
    use crate::arrays::{Array2D, LABImage};
    use crate::cluster::PixelFeature;
    use crate::common::{search_region_size, AssignThreadingStrategy, Config};
    use crate::distance::DistanceMetric;
    use crate::slic::{Clusters, UNASSIGNED};
    use crate::testing::textured_image;

    const STRATEGIES: [AssignThreadingStrategy; 3] = [
        AssignThreadingStrategy::SingleThread,
        AssignThreadingStrategy::RowBased,
        AssignThreadingStrategy::ClusterAtomic,
    ];

    fn run_assign(
        image: &LABImage,
        config: &Config,
    ) -> (Clusters, Array2D<f32>, AssignStats, Vec<PixelFeature>) {
        let s = search_region_size(image.width, image.height, config.num_of_clusters);
        let metric = DistanceMetric::new(config.compactness, s);
        let lut = metric.spatial_distance_lut();
        let mut clusters = Clusters::initialize_clusters(image, config).unwrap();
        let centers = clusters.centers();
        let mut min_distances = Array2D::from_fill(0f32, image.width, image.height);
        let stats = assign(image, config, &mut clusters, &mut min_distances, &metric, &lut);
        (clusters, min_distances, stats, centers)
    }

    #[test]
    fn assign_implementations_test() {
        let image = textured_image(67, 45);
        for num_of_clusters in [1, 7, 30, 200] {
            let mut config = Config {
                num_of_clusters,
                ..Config::default()
            };
            config.assign_threading_strategy = AssignThreadingStrategy::SingleThread;
            let (clusters_ref, min_distances_ref, stats_ref, _) = run_assign(&image, &config);
            for strategy in STRATEGIES {
                config.assign_threading_strategy = strategy;
                let (clusters, min_distances, stats, _) = run_assign(&image, &config);
                assert_eq!(stats, stats_ref, "{strategy:?}");
                assert_eq!(
                    clusters.assignments.data.as_slice(),
                    clusters_ref.assignments.data.as_slice(),
                    "{strategy:?}, K={num_of_clusters}"
                );
                assert_eq!(
                    min_distances.data.as_slice(),
                    min_distances_ref.data.as_slice(),
                    "{strategy:?}, K={num_of_clusters}"
                );
            }
        }
    }

    #[test]
    fn partition_test() {
        let image = textured_image(40, 40);
        for num_of_clusters in [1, 2, 3, 5, 16, 99, 800, 1600] {
            for strategy in STRATEGIES {
                let config = Config {
                    num_of_clusters,
                    assign_threading_strategy: strategy,
                    ..Config::default()
                };
                let (clusters, min_distances, _, _) = run_assign(&image, &config);
                let unassigned: Vec<(usize, usize)> = clusters
                    .assignments
                    .data
                    .iter()
                    .enumerate()
                    .filter(|(_, label)| **label == UNASSIGNED || **label >= num_of_clusters)
                    .map(|(i, _)| clusters.assignments.get_x_y_index(i))
                    .collect();
                assert!(
                    unassigned.is_empty(),
                    "K={num_of_clusters}, {strategy:?}: unassigned pixels {unassigned:?}"
                );
                assert!(min_distances.data.iter().all(|d| d.is_finite()));
            }
        }
    }

    #[test]
    fn overflowing_distances_test() {
        // checkerboard of huge opposite colors, distances between them overflow to infinity
        let image = LABImage::from_iter(
            (0..64).map(|i| {
                let l = if (i % 8 + i / 8) % 2 == 0 { 1e20 } else { -1e20 };
                [l, 0.0, 0.0]
            }),
            8,
            8,
        )
        .unwrap();
        let mut config = Config {
            num_of_clusters: 4,
            assign_threading_strategy: AssignThreadingStrategy::SingleThread,
            ..Config::default()
        };
        let (clusters_ref, min_distances_ref, stats_ref, _) = run_assign(&image, &config);
        assert!(clusters_ref.assignments.data.iter().all(|l| *l < 4));
        assert!(min_distances_ref.data.iter().any(|d| d.is_infinite()));
        for strategy in STRATEGIES {
            config.assign_threading_strategy = strategy;
            let (clusters, min_distances, stats, _) = run_assign(&image, &config);
            assert_eq!(stats, stats_ref, "{strategy:?}");
            assert_eq!(
                clusters.assignments.data.as_slice(),
                clusters_ref.assignments.data.as_slice(),
                "{strategy:?}"
            );
            assert_eq!(
                min_distances.data.as_slice(),
                min_distances_ref.data.as_slice(),
                "{strategy:?}"
            );
        }
    }

    #[test]
    fn uncovered_corner_test() {
        // S = 23, the seed grid has no seed in the bottom right cell
        let image = textured_image(40, 40);
        let config = Config {
            num_of_clusters: 3,
            ..Config::default()
        };
        let (clusters, _, stats, _) = run_assign(&image, &config);
        assert!(stats.uncovered > 0);
        assert!(clusters.assignments[(39, 39)] < 3);
    }

    #[test]
    fn window_bound_test() {
        // 3x3 grid of seeds with S = 4 covers the whole image
        let image = textured_image(12, 12);
        for strategy in STRATEGIES {
            let config = Config {
                num_of_clusters: 9,
                assign_threading_strategy: strategy,
                ..Config::default()
            };
            let (clusters, _, stats, centers) = run_assign(&image, &config);
            assert_eq!(stats.uncovered, 0);
            for (i, label) in clusters.assignments.data.iter().enumerate() {
                let (x, y) = clusters.assignments.get_x_y_index(i);
                let center = &centers[*label as usize];
                let (cx, cy) = (center.x as usize, center.y as usize);
                assert!(
                    x + 4 >= cx && x < cx + 4 && y + 4 >= cy && y < cy + 4,
                    "pixel ({x}, {y}) labeled by cluster {label} centered at ({cx}, {cy})"
                );
            }
        }
    }

    #[test]
    fn nearest_center_in_window_test() {
        // 4x3 seeds in 7x7 cells, the windows cover the whole image
        let image = textured_image(28, 21);
        let config = Config {
            num_of_clusters: 12,
            compactness: 4.0,
            assign_threading_strategy: AssignThreadingStrategy::SingleThread,
            ..Config::default()
        };
        let s = search_region_size(28, 21, 12);
        let metric = DistanceMetric::new(config.compactness, s);
        let (clusters, min_distances, stats, centers) = run_assign(&image, &config);
        assert_eq!(stats.uncovered, 0);
        for y in 0..21 {
            for x in 0..28 {
                let pixel = PixelFeature::from_image(&image, x, y);
                let (best, best_dist) = centers
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| {
                        let (cx, cy) = (c.x as usize, c.y as usize);
                        x + s >= cx && x < cx + s && y + s >= cy && y < cy + s
                    })
                    .map(|(i, c)| (i as u32, metric.distance(&pixel, c)))
                    .fold((UNASSIGNED, f32::INFINITY), |acc, (i, d)| {
                        if d < acc.1 {
                            (i, d)
                        } else {
                            acc
                        }
                    });
                assert_eq!(clusters.assignments[(x, y)], best, "pixel ({x}, {y})");
                assert_eq!(min_distances[(x, y)], best_dist, "pixel ({x}, {y})");
            }
        }
    }
}
