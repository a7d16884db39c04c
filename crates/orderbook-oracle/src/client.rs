use alloy_primitives::B256;
use orderbook_core::OracleConfig;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{OracleError, Result};
use crate::payload::{decode_payload, PriceUpdate};

/// Fetches the latest signed price updates for a set of feeds
#[derive(Debug, Clone)]
pub struct PriceUpdateClient {
    client: Client,
    base_url: String,
}

impl PriceUpdateClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// `None` when no service URL is configured
    pub fn from_config(config: &OracleConfig) -> Result<Option<Self>> {
        config
            .url
            .as_ref()
            .map(|url| Self::new(url.clone(), Duration::from_secs(config.timeout_secs)))
            .transpose()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request URL for the given feeds
    pub fn latest_url(&self, feed_ids: &[B256]) -> String {
        let ids: Vec<String> = feed_ids.iter().map(|id| format!("ids[]={id}")).collect();
        format!(
            "{}/v2/updates/price/latest?{}&encoding=base64",
            self.base_url,
            ids.join("&")
        )
    }

    pub async fn latest(&self, feed_ids: &[B256]) -> Result<PriceUpdate> {
        if feed_ids.is_empty() {
            return Err(OracleError::NoFeeds);
        }

        let url = self.latest_url(feed_ids);
        let start = Instant::now();
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        orderbook_metrics::histograms::oracle_request_duration(start.elapsed());

        if !status.is_success() {
            warn!(status = %status, feeds = feed_ids.len(), "Price service returned error");
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let update = decode_payload(&body)?;
        debug!(feeds = feed_ids.len(), blobs = update.data.len(), "Price update fetched");
        Ok(update)
    }
}
