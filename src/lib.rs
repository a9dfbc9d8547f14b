//! SLIC superpixel segmentation in Rust.
//!
//! This crate partitions an image into compact, color-coherent regions (superpixels) using SLIC
//! (Simple Linear Iterative Clustering): a k-means variant over CIELAB color and pixel position
//! where every cluster only searches a `2S x 2S` window around its center. A connectivity pass
//! then merges small disconnected fragments into their neighbours.
//!
//! The following example describes how to process image in packed RGB24 (RGB 8bit) format
//! (default for image crate):
//!
//! ```rust
//! use slic_superpixels::arrays::LABImage;
//! use slic_superpixels::common::*;
//! use slic_superpixels::error::Error;
//! use slic_superpixels::slic::{iterate, Clusters};
//!
//! fn main() -> Result<(), Error> {
//!     let (width, height) = (64, 48);
//!     // two flat halves, red and blue
//!     let img: Vec<u8> = (0..width * height)
//!         .flat_map(|i| if i % width < width / 2 { [200, 30, 30] } else { [20, 40, 190] })
//!         .collect();
//!     // convert image to packed Lab with padding lane
//!     let image = LABImage::from_srgb(&img, width, height)?;
//!     // create config with defaults and ask for 12 superpixels
//!     let config = Config {
//!         num_of_clusters: 12,
//!         ..Config::default()
//!     };
//!     // initialize clusters (it's possible to write custom initializer to have e.g. ROI)
//!     let mut clusters = Clusters::initialize_clusters(&image, &config)?;
//!     // make the computation
//!     let summary = iterate(&image, &config, &mut clusters)?;
//!     assert!(summary.iterations <= config.max_iterations);
//!     assert!(clusters.assignments.data.iter().all(|label| *label < 12));
//!     // flattened preview, every pixel has the mean color of its superpixel
//!     let preview = clusters.mean_color_image()?.to_srgb();
//!     assert_eq!(preview.len(), img.len());
//!     Ok(())
//! }
//! ```
//!
//! [`slic::segment()`] does the initialization and the iterations in one call.
//!
//! The assign step can run single-threaded, in row bands or with atomics per pixel (see
//! [`common::AssignThreadingStrategy`]). All of them give the same labels. It's strongly
//! recommended to use this in release build. This library uses `assume!` macro to avoid boundary
//! checks in hot-loops in release builds.
//!
//! Progress is reported through the `log` facade, the crate does not install any logger.

pub mod arrays;
pub mod assign;
pub mod atomic_arrays;
pub mod cielab;
pub mod cluster;
pub mod common;
pub mod conectivity;
pub mod distance;
pub mod error;
pub mod seed;
pub mod slic;
#[cfg(test)]
mod testing;
