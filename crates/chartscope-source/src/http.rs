//! Packaged chart downloads

use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::error::{Result, SourceError};

/// Streams chart archives to disk
#[derive(Debug, Clone)]
pub struct ChartDownloader {
    client: reqwest::Client,
    timeout: Duration,
}

impl ChartDownloader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("chartscope/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Network {
                message: e.to_string(),
            })?;

        Ok(Self { client, timeout })
    }

    /// Download `url` into the file at `dest`, returning the number of bytes written
    ///
    /// Any non-2xx response is an error. The whole transfer is bounded by the
    /// downloader timeout.
    pub async fn download_to(&self, url: &str, dest: &Path) -> Result<u64> {
        let transfer = async {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::HttpStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let mut file = tokio::fs::File::create(dest).await?;
            let mut stream = response.bytes_stream();
            let mut written = 0u64;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;

            Ok::<u64, SourceError>(written)
        };

        let written = tokio::time::timeout(self.timeout, transfer)
            .await
            .map_err(|_| SourceError::Timeout {
                operation: format!("download of {}", url),
                seconds: self.timeout.as_secs(),
            })??;

        tracing::debug!("downloaded {} bytes from {}", written, url);
        Ok(written)
    }
}
