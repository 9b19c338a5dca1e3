//! HTTP backend for the DataJud public search API.

use async_trait::async_trait;
use datajud_core::{RawRecord, SearchResponse};
use serde_json::Value;
use tracing::debug;

use crate::backend::SearchBackend;
use crate::config::{ApiKey, ClientConfig};
use crate::SearchError;

/// `POST`s search bodies to one tribunal's `_search` endpoint.
pub struct SearchClient {
    client: reqwest::Client,
    url: String,
    api_key: ApiKey,
}

impl SearchClient {
    /// Build a client for the configured tribunal. The credential is reused
    /// verbatim for every request.
    pub fn new(config: &ClientConfig) -> Result<Self, SearchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            url: config.search_url(),
            api_key: config.api_key().clone(),
        })
    }
}

#[async_trait]
impl SearchBackend for SearchClient {
    async fn search(&self, body: &Value) -> Result<Vec<RawRecord>, SearchError> {
        debug!(url = %self.url, "posting search request");
        let resp = self
            .client
            .post(&self.url)
            .header(reqwest::header::AUTHORIZATION, self.api_key.header_value())
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        let parsed: SearchResponse = serde_json::from_slice(&bytes)?;
        Ok(parsed.into_records())
    }
}
