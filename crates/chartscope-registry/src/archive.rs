//! Image archives in the `docker save` layout
//!
//! The tarball holds a `manifest.json` index, the image config as
//! `<hex>.json` and one blob per layer named after its digest.

use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tar::{Builder, Header};

use crate::error::Result;

/// One layer blob to store
#[derive(Debug, Clone)]
pub struct ArchiveLayer<'a> {
    /// `sha256:<hex>` digest of `data`
    pub digest: String,
    pub media_type: &'a str,
    pub data: &'a [u8],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ManifestEntry {
    config: String,
    repo_tags: Vec<String>,
    layers: Vec<String>,
}

/// File name for an image archive: separators in the reference become `_`
#[must_use]
pub fn archive_file_name(reference: &str) -> String {
    let base: String = reference
        .chars()
        .map(|c| match c {
            '/' | ':' | '@' => '_',
            other => other,
        })
        .collect();
    format!("{}.tar", base)
}

/// Write an image archive to `path`
pub fn write_image_archive(
    path: &Path,
    repo_tag: Option<&str>,
    config_digest: &str,
    config: &[u8],
    layers: &[ArchiveLayer<'_>],
) -> Result<()> {
    let file = File::create(path)?;
    let mut builder = Builder::new(file);

    let config_name = format!("{}.json", digest_hex(config_digest));
    append(&mut builder, &config_name, config)?;

    let mut layer_names = Vec::with_capacity(layers.len());
    for layer in layers {
        let name = format!("{}{}", digest_hex(&layer.digest), layer_extension(layer.media_type));
        append(&mut builder, &name, layer.data)?;
        layer_names.push(name);
    }

    let manifest = vec![ManifestEntry {
        config: config_name,
        repo_tags: repo_tag.map(|t| vec![t.to_string()]).unwrap_or_default(),
        layers: layer_names,
    }];
    let manifest_json = serde_json::to_vec_pretty(&manifest)?;
    append(&mut builder, "manifest.json", &manifest_json)?;

    let mut file = builder.into_inner()?;
    file.flush()?;
    Ok(())
}

fn digest_hex(digest: &str) -> &str {
    digest.split_once(':').map(|(_, hex)| hex).unwrap_or(digest)
}

fn layer_extension(media_type: &str) -> &'static str {
    if media_type.contains("gzip") {
        ".tar.gz"
    } else if media_type.contains("zstd") {
        ".tar.zst"
    } else {
        ".tar"
    }
}

fn append<W: Write>(builder: &mut Builder<W>, name: &str, data: &[u8]) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();
    builder.append_data(&mut header, name, data)?;
    Ok(())
}
