use crate::error::Error;
use std::ops::Range;

/// Changes between parallelization schemas of the assign step.
///
/// All strategies produce identical label grids and distance buffers. When two clusters offer
/// exactly the same distance to a pixel, the cluster with the lower number wins.
#[derive(Clone, PartialEq, Debug, Copy)]
pub enum AssignThreadingStrategy {
    /// No threading - used for correctness checks and very small images.
    SingleThread,
    /// Image rows are split into bands, one per available `rayon::current_num_threads()`.
    /// Every band owns its part of the label and distance grids, so no synchronization is
    /// needed and clusters are compared in the same order as with `SingleThread`.
    ///
    /// This mode should be the fastest, so it's the default.
    RowBased,
    /// Clusters are distributed over threads and overlapping windows are resolved with an
    /// atomic minimum on a packed `(distance, cluster number)` word per pixel.
    ///
    /// Useful when there are few large clusters on a tall, narrow image.
    ClusterAtomic,
}

/// Main config for the processing.
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of clusters (_K_). This directly influences search region size (_S_)
    ///
    /// Which is calculated using: _S = floor(sqrt((image width * height) / num_of_clusters))_
    pub num_of_clusters: u32,
    /// Upper bound of assign/update rounds. The loop stops earlier when the convergence error
    /// drops to `threshold`.
    pub max_iterations: u16,
    /// Weight of the spatial distance (_m_).
    /// Higher means more compact superpixels -> this is about trading color accuracy for locality.
    pub compactness: f32,
    /// The loop ends when the sum of distances between old and new cluster centers is at most
    /// this value.
    ///
    /// The sum is not normalized by the number of clusters, so a meaningful value depends on
    /// the image size, `num_of_clusters` and `compactness`.
    pub threshold: f32,
    /// This is for Connected-component labeling ([wikipedia](https://en.wikipedia.org/wiki/Connected-component_labeling)).
    ///
    /// Islands with at most `min_size_factor * (width * height / num_of_clusters)` pixels are
    /// merged into a neighbouring superpixel.
    pub min_size_factor: f32,
    /// Threading strategy for assign step.
    pub assign_threading_strategy: AssignThreadingStrategy,
    /// Run the connectivity enforcement after the clustering loop.
    pub enforce_connectivity: bool,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            num_of_clusters: 2000,
            max_iterations: 10,
            compactness: 10f32,
            threshold: 0.5,
            min_size_factor: 0.25,
            assign_threading_strategy: AssignThreadingStrategy::RowBased,
            enforce_connectivity: true,
        }
    }
}

impl Config {
    /// Checks the parameters against the image dimensions.
    pub fn validate(&self, width: usize, height: usize) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Err(Error::ZeroDimension);
        }
        let pixels = width * height;
        if self.num_of_clusters == 0 || self.num_of_clusters as usize > pixels {
            return Err(Error::InvalidClusterCount {
                requested: self.num_of_clusters,
                pixels,
            });
        }
        if !self.compactness.is_finite() || self.compactness <= 0.0 {
            return Err(Error::InvalidCompactness(self.compactness));
        }
        // NaN fails the comparison as well
        if !(self.threshold >= 0.0) {
            return Err(Error::InvalidThreshold(self.threshold));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidMaxIterations);
        }
        if !self.min_size_factor.is_finite() || self.min_size_factor < 0.0 {
            return Err(Error::InvalidMinSizeFactor(self.min_size_factor));
        }
        Ok(())
    }
}

/// Seed spacing _S_, also the half-size of the cluster search window.
///
/// The caller guarantees `0 < num_of_clusters <= width * height`, so the result is at least 1.
pub fn search_region_size(width: usize, height: usize, num_of_clusters: u32) -> usize {
    let area_per_cluster = (width * height) / num_of_clusters as usize;
    ((area_per_cluster as f64).sqrt() as usize).max(1)
}

pub(crate) fn split_length_to_ranges(length: usize, splits: usize) -> Vec<Range<usize>> {
    let chunk_size = length / splits;
    let rem = length % splits;
    (0..splits)
        .scan((rem, 0usize), |(r, acc), _split| {
            let mut size = chunk_size;
            if *r > 0 {
                *r -= 1;
                size += 1;
            }
            let out = (*acc, *acc + size);
            *acc += size;
            Some(out.0..out.1)
        })
        .filter(|r| !r.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{search_region_size, split_length_to_ranges, Config};
    use crate::error::Error;

    #[test]
    fn split_ranges_cover_length() {
        let ranges = split_length_to_ranges(10, 3);
        assert_eq!(ranges, vec![0..4, 4..7, 7..10]);
        let ranges = split_length_to_ranges(2, 4);
        assert_eq!(ranges, vec![0..1, 1..2]);
    }

    #[test]
    fn search_region_size_test() {
        assert_eq!(search_region_size(4, 4, 2), 2);
        assert_eq!(search_region_size(4, 4, 1), 4);
        assert_eq!(search_region_size(4, 4, 16), 1);
        assert_eq!(search_region_size(1920, 1080, 2000), 32);
    }

    #[test]
    fn validate_test() {
        let mut config = Config {
            num_of_clusters: 4,
            ..Config::default()
        };
        assert_eq!(config.validate(2, 2), Ok(()));
        assert_eq!(config.validate(0, 2), Err(Error::ZeroDimension));
        assert_eq!(
            config.validate(1, 3),
            Err(Error::InvalidClusterCount {
                requested: 4,
                pixels: 3
            })
        );
        config.num_of_clusters = 0;
        assert!(matches!(
            config.validate(2, 2),
            Err(Error::InvalidClusterCount { .. })
        ));
        config.num_of_clusters = 1;
        config.compactness = 0.0;
        assert_eq!(config.validate(2, 2), Err(Error::InvalidCompactness(0.0)));
        config.compactness = 10.0;
        config.threshold = -1.0;
        assert_eq!(config.validate(2, 2), Err(Error::InvalidThreshold(-1.0)));
        config.threshold = f32::NAN;
        assert!(matches!(
            config.validate(2, 2),
            Err(Error::InvalidThreshold(_))
        ));
        config.threshold = 0.0;
        config.max_iterations = 0;
        assert_eq!(config.validate(2, 2), Err(Error::InvalidMaxIterations));
        config.max_iterations = 1;
        config.min_size_factor = -0.5;
        assert_eq!(
            config.validate(2, 2),
            Err(Error::InvalidMinSizeFactor(-0.5))
        );
    }
}
