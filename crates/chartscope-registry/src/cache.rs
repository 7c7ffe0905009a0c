//! Memoizing inspector

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;
use crate::inspect::{ImageInfo, ImageInspector, InspectOptions};

/// Wraps an inspector and remembers successful results per `(image, platform)`
///
/// Downloads bypass the cache so the archive is always written.
pub struct CachingInspector<I> {
    inner: I,
    entries: Mutex<HashMap<(String, String), ImageInfo>>,
}

impl<I: ImageInspector> CachingInspector<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cached results
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &(String, String)) -> Option<ImageInfo> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

#[async_trait]
impl<I: ImageInspector> ImageInspector for CachingInspector<I> {
    async fn inspect(&self, image: &str, options: &InspectOptions) -> Result<ImageInfo> {
        if options.download {
            return self.inner.inspect(image, options).await;
        }

        let key = (image.trim().to_string(), options.platform.to_string());
        if let Some(hit) = self.lookup(&key) {
            tracing::debug!("cache hit for {} ({})", key.0, key.1);
            return Ok(ImageInfo {
                image: image.to_string(),
                ..hit
            });
        }

        let info = self.inner.inspect(image, options).await?;
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, info.clone());
        }
        Ok(info)
    }
}
