//! Asset downloads.

use tracing::debug;

use super::NotionClient;
use crate::error::NotionError;
use crate::types::Download;

/// Largest asset body we are willing to buffer.
const MAX_ASSET_BYTES: u64 = 64 * 1024 * 1024;

impl NotionClient {
    /// Download an asset. Signed file URLs carry their own credentials, so no
    /// API headers are sent.
    pub(crate) fn get_asset(&self, url: &str) -> Result<Download, NotionError> {
        debug!("Downloading asset {}", url);

        let response = self.agent.get(url).call()?;
        let status = response.status().as_u16();

        if !(200..300).contains(&status) {
            return Ok(Download {
                status,
                bytes: Vec::new(),
            });
        }

        let bytes = response
            .into_body()
            .with_config()
            .limit(MAX_ASSET_BYTES)
            .read_to_vec()?;

        Ok(Download { status, bytes })
    }
}
