//! Archive creation and extraction for packaged charts
//!
//! Packaged charts are `.tgz` files: a gzip-compressed tar stream whose
//! entries usually live under a single top-level directory named after the
//! chart.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, Builder, EntryType, Header};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};

/// Extract a gzip tar archive into `dest`
///
/// Directories are recreated, regular files are written with their content,
/// and every other entry type (symlinks, hardlinks, devices) is skipped.
/// Entries that would land outside `dest` are rejected. Nothing is cleaned up
/// on failure; the caller owns `dest`.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    extract_from_reader(file, dest)
}

/// Extract a gzip tar stream from any reader into `dest`
pub fn extract_from_reader<R: Read>(reader: R, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;

    let mut archive = Archive::new(GzDecoder::new(reader));
    let entries = archive.entries().map_err(archive_error)?;

    for entry in entries {
        let mut entry = entry.map_err(archive_error)?;
        let raw_path = entry.path().map_err(archive_error)?.into_owned();
        let Some(relative) = sanitize_entry_path(&raw_path)? else {
            continue;
        };
        let target = dest.join(&relative);

        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&target)?;
            }
            EntryType::Regular | EntryType::Continuous => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&target)?;
                io::copy(&mut entry, &mut out).map_err(archive_error)?;
            }
            other => {
                tracing::debug!(
                    "skipping archive entry {} of type {:?}",
                    raw_path.display(),
                    other
                );
            }
        }
    }

    Ok(())
}

/// Reduce an entry name to a relative path inside the destination
///
/// Returns `None` for entries that name the archive root itself.
fn sanitize_entry_path(path: &Path) -> Result<Option<PathBuf>> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(CoreError::UnsafeArchiveEntry {
                    entry: path.display().to_string(),
                });
            }
        }
    }
    if clean.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(clean))
    }
}

fn archive_error(err: io::Error) -> CoreError {
    CoreError::Archive {
        message: err.to_string(),
    }
}

/// Pack a directory tree into a gzip tar archive
///
/// Entries are stored relative to `source`, in lexical order, with fixed
/// modes and a zero mtime so the same tree always produces the same bytes.
pub fn create_archive(source: &Path, output: &Path) -> Result<PathBuf> {
    let file = File::create(output)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    for entry in WalkDir::new(source).sort_by_file_name().min_depth(1) {
        let entry = entry.map_err(|e| CoreError::Archive {
            message: e.to_string(),
        })?;
        let rel_path = entry
            .path()
            .strip_prefix(source)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");

        if entry.file_type().is_dir() {
            add_dir_to_archive(&mut builder, &rel_path)?;
        } else if entry.file_type().is_file() {
            let content = fs::read(entry.path())?;
            add_bytes_to_archive(&mut builder, &rel_path, &content)?;
        }
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?;

    Ok(output.to_path_buf())
}

fn add_dir_to_archive<W: Write>(builder: &mut Builder<W>, archive_path: &str) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Directory);
    header.set_size(0);
    header.set_mode(0o755);
    header.set_mtime(0);
    header.set_cksum();

    builder.append_data(&mut header, format!("{}/", archive_path), io::empty())?;
    Ok(())
}

fn add_bytes_to_archive<W: Write>(
    builder: &mut Builder<W>,
    archive_path: &str,
    content: &[u8],
) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();

    builder.append_data(&mut header, archive_path, content)?;

    Ok(())
}
