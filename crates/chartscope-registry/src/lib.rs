//! chartscope registry inspection
//!
//! Looks up container images in OCI registries:
//!
//! - **Reference normalization**: `nginx` becomes `docker.io/library/nginx:latest`
//! - **Platform selection**: multi-arch indexes resolve to the requested `os/arch`
//! - **Size accounting**: layer count and compressed size (layers plus config)
//! - **Archives**: optional `docker load` compatible tarballs
//!
//! [`CachingInspector`] memoizes results per `(image, platform)`.

pub mod archive;
pub mod cache;
pub mod error;
pub mod inspect;
pub mod reference;

// Re-exports for convenience
pub use archive::{ArchiveLayer, archive_file_name, write_image_archive};
pub use cache::CachingInspector;
pub use error::{RegistryError, Result};
pub use inspect::{ImageInfo, ImageInspector, InspectOptions, RegistryInspector, human_bytes};
pub use reference::{Platform, normalize_reference};
