//! Operation status lookups against a chain indexer.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("indexer request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("indexer answered {status}")]
    Unexpected { status: u16 },
}

/// Answers whether an operation has been applied on chain.
///
/// `Ok(Some(true))` means applied, `Ok(Some(false))` means not (yet) applied and
/// `Ok(None)` means the indexer has no usable answer for that hash.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn operation_status(&self, transaction_hash: &str) -> Result<Option<bool>, StatusError>;
}

/// Queries `GET {base}/operations/{hash}/status` on a TzKT-compatible indexer.
#[derive(Debug, Clone)]
pub struct IndexerStatusSource {
    base_url: String,
    client: reqwest::Client,
}

impl IndexerStatusSource {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, StatusError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn status_url(&self, transaction_hash: &str) -> String {
        format!("{}/operations/{}/status", self.base_url, transaction_hash)
    }
}

#[async_trait]
impl StatusSource for IndexerStatusSource {
    async fn operation_status(&self, transaction_hash: &str) -> Result<Option<bool>, StatusError> {
        let response = self
            .client
            .get(self.status_url(transaction_hash))
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => Ok(response.json::<Option<bool>>().await?),
            status => Err(StatusError::Unexpected {
                status: status.as_u16(),
            }),
        }
    }
}
