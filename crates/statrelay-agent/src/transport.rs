//! Outbound batch delivery to the collector.

use anyhow::{anyhow, Result};
use statrelay_common::types::MetricSample;
use statrelay_common::wire;
use std::time::Duration;

/// HTTP client for the collector's batch endpoint.
pub struct ReportClient {
    client: reqwest::Client,
    endpoint: String,
    sign_key: Option<String>,
}

impl ReportClient {
    pub fn new(base_url: &str, timeout: Duration, sign_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/updates/", base_url.trim_end_matches('/')),
            sign_key,
        })
    }

    /// Encodes, signs, compresses, and POSTs one batch.
    pub async fn send_batch(&self, samples: &[MetricSample]) -> Result<()> {
        let body = wire::encode_batch(samples, self.sign_key.as_deref())?;
        let body = wire::compress(&body)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::CONTENT_ENCODING, "gzip")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "invalid status code {}",
                response.status().as_u16()
            ));
        }
        Ok(())
    }
}
