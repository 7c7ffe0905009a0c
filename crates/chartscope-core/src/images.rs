//! Container image extraction from rendered manifests
//!
//! Rendered chart output is a stream of YAML documents of arbitrary kinds.
//! Rather than modelling every workload type, the extractor checks a fixed
//! list of paths where a pod spec can live and collects images from the
//! container lists found there.

use serde_yaml::{Mapping, Value};
use std::collections::HashSet;

/// Paths at which a workload embeds a pod spec
///
/// - `spec`: bare Pod
/// - `spec.template.spec`: Deployment, StatefulSet, DaemonSet, Job, ReplicaSet
/// - `spec.jobTemplate.spec.template.spec`: CronJob
/// - `spec.jobTemplate.template.spec`: CronJob written without the job spec level
const POD_SPEC_PATHS: &[&[&str]] = &[
    &["spec"],
    &["spec", "template", "spec"],
    &["spec", "jobTemplate", "spec", "template", "spec"],
    &["spec", "jobTemplate", "template", "spec"],
];

/// Container lists read from a pod spec, in collection order
const CONTAINER_FIELDS: &[&str] = &["containers", "initContainers", "ephemeralContainers"];

/// Insertion-ordered set of image references
#[derive(Debug, Clone, Default)]
pub struct ImageSet {
    images: Vec<String>,
    seen: HashSet<String>,
}

impl ImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image, returning false if it was already present
    pub fn insert(&mut self, image: &str) -> bool {
        if self.seen.contains(image) {
            return false;
        }
        self.seen.insert(image.to_string());
        self.images.push(image.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.images.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.images
    }
}

/// Extract every distinct image referenced by the rendered manifests
///
/// Documents that fail to parse or are not mappings are skipped. The result
/// keeps first-seen order across documents.
#[must_use]
pub fn extract_images(rendered: &str) -> Vec<String> {
    let mut images = ImageSet::new();
    if rendered.trim().is_empty() {
        return images.into_vec();
    }

    for (index, doc) in split_documents(rendered).into_iter().enumerate() {
        let value: Value = match serde_yaml::from_str(doc) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("skipping document {}: {}", index, e);
                continue;
            }
        };
        if !value.is_mapping() {
            continue;
        }

        for path in POD_SPEC_PATHS {
            if let Some(pod_spec) = lookup_mapping(&value, path) {
                collect_images(pod_spec, &mut images);
            }
        }
    }

    images.into_vec()
}

/// Split a multi-document YAML stream on `---` separator lines
///
/// Returned documents are trimmed and never empty.
#[must_use]
pub fn split_documents(rendered: &str) -> Vec<&str> {
    let mut docs = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in rendered.split_inclusive('\n') {
        if line.trim_end() == "---" {
            docs.push(&rendered[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    docs.push(&rendered[start..]);

    docs.into_iter()
        .map(str::trim)
        .filter(|doc| !doc.is_empty())
        .collect()
}

/// Follow `path` through nested mappings, returning the mapping at its end
fn lookup_mapping<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Mapping> {
    path.iter()
        .try_fold(value, |current, key| current.as_mapping()?.get(*key))?
        .as_mapping()
}

fn collect_images(pod_spec: &Mapping, images: &mut ImageSet) {
    for field in CONTAINER_FIELDS {
        let Some(containers) = pod_spec.get(*field).and_then(Value::as_sequence) else {
            continue;
        };
        for container in containers {
            let image = container
                .as_mapping()
                .and_then(|c| c.get("image"))
                .and_then(Value::as_str);
            if let Some(image) = image {
                if !image.trim().is_empty() {
                    images.insert(image);
                }
            }
        }
    }
}
