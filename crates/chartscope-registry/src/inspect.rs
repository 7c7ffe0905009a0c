//! Registry inspection
//!
//! [`RegistryInspector`] resolves an image reference against its registry,
//! picks the manifest for the requested platform and reports the digest,
//! layer count and compressed size. On request it also pulls the layers and
//! writes a `docker load` compatible archive.

use async_trait::async_trait;
use oci_distribution::client::{Client, ClientConfig, ClientProtocol};
use oci_distribution::manifest::{
    IMAGE_DOCKER_LAYER_GZIP_MEDIA_TYPE, IMAGE_DOCKER_LAYER_TAR_MEDIA_TYPE,
    IMAGE_LAYER_GZIP_MEDIA_TYPE, IMAGE_LAYER_MEDIA_TYPE, ImageIndexEntry, OciImageManifest,
};
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::Reference;
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::archive::{ArchiveLayer, archive_file_name, write_image_archive};
use crate::error::{RegistryError, Result};
use crate::reference::{Platform, normalize_reference};

/// Layer media types accepted when pulling an image for download
const LAYER_MEDIA_TYPES: [&str; 4] = [
    IMAGE_LAYER_MEDIA_TYPE,
    IMAGE_LAYER_GZIP_MEDIA_TYPE,
    IMAGE_DOCKER_LAYER_TAR_MEDIA_TYPE,
    IMAGE_DOCKER_LAYER_GZIP_MEDIA_TYPE,
];

/// Facts about one image as stored in its registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    /// Reference as it appeared in the manifests
    pub image: String,
    /// Fully qualified reference, e.g. `docker.io/library/nginx:latest`
    pub resolved_ref: String,
    /// Manifest digest for the selected platform
    pub digest: String,
    pub layers: usize,
    pub size_bytes: u64,
    pub size_human: String,
    pub platform: String,
    /// Archive path when the image was downloaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded: Option<PathBuf>,
}

impl ImageInfo {
    /// Placeholder for an image whose inspection failed
    pub fn unavailable(image: &str, platform: &Platform) -> Self {
        Self {
            image: image.to_string(),
            size_human: human_bytes(0),
            platform: platform.to_string(),
            ..Default::default()
        }
    }
}

/// Per-call inspection settings
#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    pub platform: Platform,
    /// Pull all layers and write an image archive
    pub download: bool,
    /// Where archives go; a fresh `images-*` directory when unset
    pub download_dir: Option<PathBuf>,
}

/// Looks up image facts in a registry
#[async_trait]
pub trait ImageInspector: Send + Sync {
    async fn inspect(&self, image: &str, options: &InspectOptions) -> Result<ImageInfo>;
}

/// [`ImageInspector`] backed by the OCI distribution API
pub struct RegistryInspector {
    auth: RegistryAuth,
    insecure_registries: Vec<String>,
    timeout: Duration,
}

impl Default for RegistryInspector {
    fn default() -> Self {
        Self {
            auth: RegistryAuth::Anonymous,
            insecure_registries: Vec::new(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl RegistryInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use basic credentials for every registry
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = RegistryAuth::Basic(username.into(), password.into());
        self
    }

    /// Registries reached over plain HTTP
    pub fn insecure_registries(mut self, registries: Vec<String>) -> Self {
        self.insecure_registries = registries;
        self
    }

    /// Deadline for each registry round trip
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn client(&self, platform: &Platform) -> Client {
        let protocol = if self.insecure_registries.is_empty() {
            ClientProtocol::Https
        } else {
            ClientProtocol::HttpsExcept(self.insecure_registries.clone())
        };

        let wanted = platform.clone();
        let resolver = move |entries: &[ImageIndexEntry]| {
            entries
                .iter()
                .find(|entry| {
                    entry.platform.as_ref().is_some_and(|p| {
                        wanted.matches(&p.os, &p.architecture, p.variant.as_deref())
                    })
                })
                .map(|entry| entry.digest.clone())
        };

        Client::new(ClientConfig {
            protocol,
            platform_resolver: Some(Box::new(resolver)),
            ..Default::default()
        })
    }

    async fn with_timeout<T, F>(&self, reference: &Reference, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, oci_distribution::errors::OciDistributionError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| RegistryError::Timeout {
                reference: reference.whole(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(RegistryError::from)
    }

    async fn download(
        &self,
        client: &Client,
        reference: &Reference,
        manifest: &OciImageManifest,
        download_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        let image = self
            .with_timeout(
                reference,
                client.pull(reference, &self.auth, LAYER_MEDIA_TYPES.to_vec()),
            )
            .await?;

        let dir = prepare_download_dir(download_dir)?;
        let path = dir.join(archive_file_name(&reference.whole()));

        let layers: Vec<ArchiveLayer<'_>> = image
            .layers
            .iter()
            .zip(&manifest.layers)
            .map(|(layer, descriptor)| ArchiveLayer {
                digest: descriptor.digest.clone(),
                media_type: &layer.media_type,
                data: &layer.data,
            })
            .collect();

        let repo_tag = reference
            .tag()
            .map(|tag| format!("{}/{}:{}", reference.registry(), reference.repository(), tag));

        write_image_archive(
            &path,
            repo_tag.as_deref(),
            &manifest.config.digest,
            &image.config.data,
            &layers,
        )?;

        tracing::info!("saved {} to {}", reference.whole(), path.display());
        Ok(path)
    }
}

#[async_trait]
impl ImageInspector for RegistryInspector {
    async fn inspect(&self, image: &str, options: &InspectOptions) -> Result<ImageInfo> {
        let reference = normalize_reference(image)?;
        let client = self.client(&options.platform);

        tracing::debug!("inspecting {} for {}", reference.whole(), options.platform);
        let (manifest, digest, _config) = self
            .with_timeout(
                &reference,
                client.pull_manifest_and_config(&reference, &self.auth),
            )
            .await?;

        let size_bytes = image_size(&manifest);
        let downloaded = if options.download {
            Some(
                self.download(&client, &reference, &manifest, options.download_dir.as_deref())
                    .await?,
            )
        } else {
            None
        };

        Ok(ImageInfo {
            image: image.to_string(),
            resolved_ref: reference.whole(),
            digest,
            layers: manifest.layers.len(),
            size_bytes,
            size_human: human_bytes(size_bytes),
            platform: options.platform.to_string(),
            downloaded,
        })
    }
}

/// Sum of the layer sizes plus the config blob size
fn image_size(manifest: &OciImageManifest) -> u64 {
    let layers: i64 = manifest.layers.iter().map(|l| l.size.max(0)).sum();
    (layers + manifest.config.size.max(0)) as u64
}

fn prepare_download_dir(dir: Option<&Path>) -> Result<PathBuf> {
    match dir.filter(|d| !d.as_os_str().is_empty()) {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            Ok(dir.to_path_buf())
        }
        None => Ok(tempfile::Builder::new()
            .prefix("images-")
            .tempdir()?
            .keep()),
    }
}

/// Format a byte count with 1024 units and one decimal
///
/// ```
/// use chartscope_registry::human_bytes;
///
/// assert_eq!(human_bytes(512), "512 B");
/// assert_eq!(human_bytes(1536), "1.5 KB");
/// ```
#[must_use]
pub fn human_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT && exp < 5 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let suffix = b"KMGTPE"[exp] as char;
    format!("{:.1} {}B", bytes as f64 / div as f64, suffix)
}
