//! Image reference normalization and target platforms

use oci_distribution::Reference;
use serde::Serialize;
use std::fmt;

use crate::error::{RegistryError, Result};

/// Parse an image reference as written in a manifest
///
/// Missing registries default to Docker Hub (with the `library/` namespace
/// for single-segment names) and missing tags to `latest`.
pub fn normalize_reference(image: &str) -> Result<Reference> {
    let trimmed = image.trim();
    Reference::try_from(trimmed).map_err(|e| RegistryError::InvalidReference {
        reference: trimmed.to_string(),
        message: e.to_string(),
    })
}

/// Target platform for multi-architecture images
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            os: "linux".to_string(),
            architecture: "amd64".to_string(),
            variant: None,
        }
    }
}

impl Platform {
    /// Parse `os/arch` or `os/arch/variant`
    ///
    /// Anything else, including an empty string, yields `linux/amd64`.
    pub fn parse(value: &str) -> Self {
        let parts: Vec<&str> = value.trim().split('/').collect();
        match parts.as_slice() {
            [os, arch] if !os.is_empty() && !arch.is_empty() => Self {
                os: os.to_string(),
                architecture: arch.to_string(),
                variant: None,
            },
            [os, arch, variant] if !os.is_empty() && !arch.is_empty() && !variant.is_empty() => {
                Self {
                    os: os.to_string(),
                    architecture: arch.to_string(),
                    variant: Some(variant.to_string()),
                }
            }
            _ => Self::default(),
        }
    }

    /// Whether an index entry's platform satisfies this one
    ///
    /// A platform without a variant accepts any variant.
    pub fn matches(&self, os: &str, architecture: &str, variant: Option<&str>) -> bool {
        self.os == os
            && self.architecture == architecture
            && match &self.variant {
                Some(wanted) => variant == Some(wanted.as_str()),
                None => true,
            }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{}", variant)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_short_name() {
        let reference = normalize_reference("nginx").unwrap();
        assert_eq!(reference.registry(), "docker.io");
        assert_eq!(reference.repository(), "library/nginx");
        assert_eq!(reference.tag(), Some("latest"));
    }

    #[test]
    fn test_normalize_full_reference() {
        let reference = normalize_reference(" ghcr.io/acme/api:v2.1 ").unwrap();
        assert_eq!(reference.registry(), "ghcr.io");
        assert_eq!(reference.repository(), "acme/api");
        assert_eq!(reference.tag(), Some("v2.1"));
    }

    #[test]
    fn test_normalize_digest_reference() {
        let digest = "sha256:2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae";
        let reference = normalize_reference(&format!("quay.io/org/app@{}", digest)).unwrap();
        assert_eq!(reference.digest(), Some(digest));
    }

    #[test]
    fn test_normalize_invalid() {
        let err = normalize_reference("bad image:with spaces").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidReference { .. }));
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!(Platform::parse("").to_string(), "linux/amd64");
        assert_eq!(Platform::parse("linux/arm64").to_string(), "linux/arm64");
        assert_eq!(Platform::parse("linux/arm/v7").variant.as_deref(), Some("v7"));
        assert_eq!(Platform::parse("windows").to_string(), "linux/amd64");
        assert_eq!(Platform::parse("/arm64").to_string(), "linux/amd64");
        assert_eq!(Platform::parse("a/b/c/d").to_string(), "linux/amd64");
    }

    #[test]
    fn test_platform_matches() {
        let arm64 = Platform::parse("linux/arm64");
        assert!(arm64.matches("linux", "arm64", Some("v8")));
        assert!(arm64.matches("linux", "arm64", None));
        assert!(!arm64.matches("linux", "amd64", None));

        let armv7 = Platform::parse("linux/arm/v7");
        assert!(armv7.matches("linux", "arm", Some("v7")));
        assert!(!armv7.matches("linux", "arm", Some("v6")));
        assert!(!armv7.matches("linux", "arm", None));
    }
}
