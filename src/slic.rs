use crate::arrays::{Array2D, LABImage, LAB_LANES};
use crate::assign::assign;
use crate::cluster::{Cluster, PixelFeature};
use crate::common::{search_region_size, split_length_to_ranges, Config};
use crate::conectivity::{enforce_connectivity, ConnectivityStats};
use crate::distance::DistanceMetric;
use crate::error::Error;
use crate::seed::grid_seeds;
use log::{debug, info, warn};
use multiversion::multiversion;
use rayon::current_num_threads;
use rayon::prelude::*;
use std::ops::Range;

/// Label of a pixel which was not assigned to any cluster yet.
pub const UNASSIGNED: u32 = u32::MAX;

/// Convenient struct for passing values around.
#[derive(Debug)]
pub struct Clusters {
    /// For every pixel in image this stores to which cluster it belongs (see `Cluster.number`).
    pub assignments: Array2D<u32>,
    pub clusters: Vec<Cluster>,
}

impl Clusters {
    /// Default initialize clusters function.
    ///
    /// For custom implementations the needed filled fields in new cluster are `center` and
    /// `number`, which must be equal to the cluster's index.
    pub fn initialize_clusters(image: &LABImage, config: &Config) -> Result<Clusters, Error> {
        config.validate(image.width, image.height)?;
        let search_region_size =
            search_region_size(image.width, image.height, config.num_of_clusters);
        Ok(Clusters {
            assignments: Array2D::from_fill(UNASSIGNED, image.width, image.height),
            clusters: grid_seeds(image, config.num_of_clusters, search_region_size),
        })
    }

    /// Current centers, indexed by cluster number.
    pub fn centers(&self) -> Vec<PixelFeature> {
        self.clusters.iter().map(|c| c.center).collect()
    }

    /// Flattened preview: every pixel gets the mean color of its cluster.
    ///
    /// Pixels which are still [`UNASSIGNED`] are black.
    pub fn mean_color_image(&self) -> Result<LABImage, Error> {
        LABImage::from_iter(
            self.assignments.data.iter().map(|label| {
                self.clusters
                    .get(*label as usize)
                    .map_or([0.0; 3], |c| c.center.color)
            }),
            self.assignments.width,
            self.assignments.height,
        )
    }

    fn check(&self, image: &LABImage, config: &Config) -> Result<(), Error> {
        if self.clusters.len() != config.num_of_clusters as usize {
            return Err(Error::ClusterCountMismatch {
                expected: config.num_of_clusters as usize,
                actual: self.clusters.len(),
            });
        }
        if let Some((index, cluster)) = self
            .clusters
            .iter()
            .enumerate()
            .find(|(i, c)| c.number as usize != *i)
        {
            return Err(Error::InvalidClusterNumber {
                index,
                number: cluster.number,
            });
        }
        if let Some(index) = self.clusters.iter().position(|c| {
            c.center.x as usize >= image.width
                || c.center.y as usize >= image.height
                || !c.center.color.iter().all(|v| v.is_finite())
        }) {
            return Err(Error::InvalidClusterCenter { index });
        }
        if self.assignments.width != image.width || self.assignments.height != image.height {
            return Err(Error::DimensionMismatch {
                len: self.assignments.data.len(),
                width: image.width,
                height: image.height,
            });
        }
        Ok(())
    }
}

/// Why the clustering loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The convergence error dropped to the threshold.
    Converged,
    /// `max_iterations` was reached first. The last labels and centers are kept.
    IterationCap,
}

/// Report of the main loop.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationSummary {
    /// Number of assign/update rounds done.
    pub iterations: u16,
    /// Convergence error of the last round.
    pub error: f64,
    pub termination: Termination,
    /// Clusters left without pixels in the last round. They kept their previous center.
    pub degenerate_clusters: usize,
    /// Pixels outside of all search windows in the last round.
    pub uncovered_pixels: usize,
    /// `None` if `Config::enforce_connectivity` is off.
    pub connectivity: Option<ConnectivityStats>,
}

/// Segmentation with its report, see [`segment()`].
#[derive(Debug)]
pub struct Segmentation {
    pub clusters: Clusters,
    pub summary: IterationSummary,
}

impl Segmentation {
    /// Label of every pixel, row-major.
    pub fn labels(&self) -> &[u32] {
        &self.clusters.assignments.data
    }

    pub fn centers(&self) -> Vec<PixelFeature> {
        self.clusters.centers()
    }

    pub fn mean_color_image(&self) -> Result<LABImage, Error> {
        self.clusters.mean_color_image()
    }
}

/// Initializes clusters and runs [`iterate()`].
pub fn segment(image: &LABImage, config: &Config) -> Result<Segmentation, Error> {
    let mut clusters = Clusters::initialize_clusters(image, config)?;
    let summary = iterate(image, config, &mut clusters)?;
    Ok(Segmentation { clusters, summary })
}

/// This function is the main loop.
///
/// The steps are generally:
/// - until the convergence error is at most `threshold` or `max_iterations` rounds are done
///     - assign
///     - update
///     - convergence error (sum of distances between old and new centers)
/// - enforce_connectivity (CCA), if enabled
///
/// The returned centers are the means of the final assignment before connectivity enforcement.
pub fn iterate(
    image: &LABImage,
    config: &Config,
    clusters: &mut Clusters,
) -> Result<IterationSummary, Error> {
    config.validate(image.width, image.height)?;
    clusters.check(image, config)?;
    let search_region_size =
        search_region_size(image.width, image.height, config.num_of_clusters);
    let metric = DistanceMetric::new(config.compactness, search_region_size);
    let spatial_distance_lut = metric.spatial_distance_lut();
    let mut min_distances = Array2D::from_fill(f32::INFINITY, image.width, image.height);

    let mut iterations = 0;
    let (error, termination, degenerate_clusters, uncovered_pixels) = loop {
        iterations += 1;
        let assign_stats = assign(
            image,
            config,
            clusters,
            &mut min_distances,
            &metric,
            &spatial_distance_lut,
        );
        let previous = clusters.centers();
        let degenerate_clusters = update(clusters, image);
        let error = convergence_error(&metric, &previous, &clusters.clusters);
        debug!(
            "iteration {iterations}: error={error:.4}, degenerate clusters={degenerate_clusters}, uncovered pixels={}",
            assign_stats.uncovered
        );
        if error <= config.threshold as f64 {
            break (
                error,
                Termination::Converged,
                degenerate_clusters,
                assign_stats.uncovered,
            );
        }
        if iterations >= config.max_iterations {
            warn!(
                "no convergence after {iterations} iterations: error {error:.4} > threshold {}",
                config.threshold
            );
            break (
                error,
                Termination::IterationCap,
                degenerate_clusters,
                assign_stats.uncovered,
            );
        }
    };
    info!("clustering finished after {iterations} iterations ({termination:?})");

    let connectivity = if config.enforce_connectivity {
        Some(enforce_connectivity(clusters, config))
    } else {
        None
    };

    Ok(IterationSummary {
        iterations,
        error,
        termination,
        degenerate_clusters,
        uncovered_pixels,
        connectivity,
    })
}

/// Sum of distances between the old and the new center of every cluster.
///
/// Not normalized by the number of clusters.
pub fn convergence_error(
    metric: &DistanceMetric,
    previous: &[PixelFeature],
    clusters: &[Cluster],
) -> f64 {
    debug_assert_eq!(previous.len(), clusters.len());
    previous
        .iter()
        .zip(clusters)
        .map(|(old, cluster)| metric.distance(old, &cluster.center) as f64)
        .sum()
}

#[derive(Clone, Copy, Default)]
struct ClusterAccumulator {
    members: u64,
    x: u64,
    y: u64,
    color: [f64; 3],
}

impl ClusterAccumulator {
    fn merge(&mut self, other: &ClusterAccumulator) {
        self.members += other.members;
        self.x += other.x;
        self.y += other.y;
        self.color[0] += other.color[0];
        self.color[1] += other.color[1];
        self.color[2] += other.color[2];
    }
}

/// This function does the update step.
///
/// Every cluster moves to the mean position (rounded half up) and the mean color of its
/// pixels. A cluster without pixels keeps its center. Returns the number of such clusters.
pub fn update(clusters: &mut Clusters, image: &LABImage) -> usize {
    let num_of_clusters = clusters.clusters.len();

    #[multiversion(targets = "simd")]
    fn update_part_generic(
        rows: Range<usize>,
        image: &LABImage,
        assignments: &Array2D<u32>,
        accumulators: &mut [ClusterAccumulator],
    ) {
        for row in rows {
            let image_row = image.get_row(row);
            let assignments_row = assignments.get_row(row);
            for (column, (pixel, assignment)) in
                image_row.chunks_exact(LAB_LANES).zip(assignments_row).enumerate()
            {
                if *assignment == UNASSIGNED {
                    continue;
                }
                let acc = &mut accumulators[*assignment as usize];
                acc.members += 1;
                acc.x += column as u64;
                acc.y += row as u64;
                acc.color[0] += pixel[0] as f64;
                acc.color[1] += pixel[1] as f64;
                acc.color[2] += pixel[2] as f64;
            }
        }
    }

    let assignments = &clusters.assignments;
    // bands are merged in row order, so the sums do not depend on scheduling
    let mut bands = split_length_to_ranges(image.height, current_num_threads())
        .into_par_iter()
        .map(|rows| {
            let mut local = vec![ClusterAccumulator::default(); num_of_clusters];
            update_part_generic(rows, image, assignments, &mut local);
            local
        })
        .collect::<Vec<_>>()
        .into_iter();
    let mut accumulators = bands
        .next()
        .unwrap_or_else(|| vec![ClusterAccumulator::default(); num_of_clusters]);
    for band in bands {
        accumulators
            .iter_mut()
            .zip(&band)
            .for_each(|(a, b)| a.merge(b));
    }

    let mut degenerate = 0;
    for (cluster, acc) in clusters.clusters.iter_mut().zip(&accumulators) {
        cluster.num_members = acc.members as u32;
        if acc.members == 0 {
            degenerate += 1;
            continue;
        }
        let members_half = acc.members / 2;
        let next_x = ((acc.x + members_half) / acc.members) as u32;
        let next_y = ((acc.y + members_half) / acc.members) as u32;
        debug_assert!(
            (next_x as usize) < image.width && (next_y as usize) < image.height,
            "{:?} trying to move out of bounds to ({next_x}, {next_y})",
            cluster
        );
        let members = acc.members as f64;
        cluster.center = PixelFeature {
            color: [
                (acc.color[0] / members) as f32,
                (acc.color[1] / members) as f32,
                (acc.color[2] / members) as f32,
            ],
            x: next_x,
            y: next_y,
        };
    }
    degenerate
}
