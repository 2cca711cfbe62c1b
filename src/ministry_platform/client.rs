//! HTTP client for the Ministry Platform events endpoint.

use std::time::Duration;

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::models::RawEvent;
use crate::config::MinistryPlatformConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("MP_BEARER_TOKEN is not configured")]
    MissingCredential,
    #[error("event source returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("event source request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("event source returned a non-list payload")]
    NotAList,
    #[error("could not decode event record: {0}")]
    Decode(#[from] serde_json::Error),
}

pub struct MinistryPlatformClient {
    client: reqwest::Client,
    api_url: String,
    bearer_token: Option<String>,
}

impl MinistryPlatformClient {
    pub fn new(config: MinistryPlatformConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url,
            bearer_token: config.bearer_token,
        })
    }

    /// Fetches the raw event records for the given date range (inclusive,
    /// upstream convention). The range is sent as MM/DD/YYYY strings under
    /// the stored procedure's `@StartDate`/`@EndDate` parameter keys.
    ///
    /// Fails without touching the network when no bearer token is
    /// configured.
    pub async fn fetch_events(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<RawEvent>, FetchError> {
        let Some(bearer_token) = &self.bearer_token else {
            return Err(FetchError::MissingCredential);
        };

        let payload = serde_json::json!({
            "@StartDate": start_date.format("%m/%d/%Y").to_string(),
            "@EndDate": end_date.format("%m/%d/%Y").to_string(),
        });
        debug!("Fetching events from {} with {}", self.api_url, payload);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(bearer_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        decode_event_batch(response.json().await?)
    }
}

/// Decodes the upstream payload into event records. The stored procedure
/// sometimes wraps the record list in a single-element outer list; exactly
/// one level is unwrapped when the first element is itself a list, otherwise
/// the list passes through unchanged.
fn decode_event_batch(payload: Value) -> Result<Vec<RawEvent>, FetchError> {
    let Value::Array(items) = payload else {
        return Err(FetchError::NotAList);
    };

    let mut iter = items.into_iter();
    let records: Vec<Value> = match iter.next() {
        Some(Value::Array(inner)) => inner,
        Some(first) => std::iter::once(first).chain(iter).collect(),
        None => Vec::new(),
    };

    records
        .into_iter()
        .map(|record| serde_json::from_value(record).map_err(FetchError::from))
        .collect()
}
