//! chartscope core - chart handling primitives
//!
//! This crate provides the synchronous building blocks of the analysis pipeline:
//! - `archive`: gzip tar extraction and creation for packaged charts
//! - `chart`: chart root discovery and `Chart.yaml` metadata
//! - `images`: container image extraction from rendered manifests

pub mod archive;
pub mod chart;
pub mod error;
pub mod images;

pub use archive::{create_archive, extract_archive};
pub use chart::{CHART_MANIFEST, ChartMetadata, has_chart_manifest, locate_chart_root};
pub use error::{CoreError, Result};
pub use images::{ImageSet, extract_images, split_documents};
