// HTTP adapter for the replay backend - glucose windows, stats and checkpoints
use crate::application::checkpoint_store::CheckpointStore;
use crate::application::time_series_source::TimeSeriesSource;
use crate::domain::identity::SessionIdentity;
use crate::domain::resolution::Resolution;
use crate::domain::sample::{deserialize_optional_timestamp, format_timestamp, Sample};
use crate::domain::stats::StatsSnapshot;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpReplayApi {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct LastViewedResponse {
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    last_viewed_timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize)]
struct UpdateLastViewedRequest<'a> {
    username: &'a str,
    last_viewed_timestamp: String,
}

#[derive(Debug, Deserialize)]
struct UpdateLastViewedResponse {
    #[serde(default)]
    status: String,
}

/// Older backends send `{"stats": [..]}` with positional label strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatsResponse {
    Positional { stats: Vec<String> },
    Named(StatsSnapshot),
}

impl From<StatsResponse> for StatsSnapshot {
    fn from(response: StatsResponse) -> Self {
        match response {
            StatsResponse::Positional { stats } => StatsSnapshot::from_positional(&stats),
            StatsResponse::Named(snapshot) => snapshot,
        }
    }
}

impl HttpReplayApi {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn window_url(
        &self,
        endpoint: &str,
        identity: &SessionIdentity,
        resolution: Resolution,
        after: Option<NaiveDateTime>,
    ) -> String {
        let mut url = format!(
            "{}/api/{}/{}?time_mod={}&real_data={}",
            self.base_url,
            endpoint,
            identity.subject_id,
            urlencoding::encode(resolution.as_query()),
            identity.use_real_data
        );
        if let Some(after) = after {
            url.push_str("&last_date=");
            url.push_str(&urlencoding::encode(&format_timestamp(&after)));
        }
        url
    }

    fn last_viewed_url(&self, username: &str) -> String {
        format!(
            "{}/api/last_viewed/{}",
            self.base_url,
            urlencoding::encode(username)
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Request to {} failed with status {}: {}", url, status, body);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}

#[async_trait]
impl TimeSeriesSource for HttpReplayApi {
    async fn fetch_window(
        &self,
        identity: &SessionIdentity,
        resolution: Resolution,
        after: Option<NaiveDateTime>,
    ) -> Result<Vec<Sample>> {
        let url = self.window_url("glucose", identity, resolution, after);
        tracing::debug!("Fetching glucose window: {}", url);

        let samples: Vec<Sample> = self.get_json(&url).await?;
        tracing::debug!("Received {} samples", samples.len());
        Ok(samples)
    }

    async fn fetch_stats(
        &self,
        identity: &SessionIdentity,
        resolution: Resolution,
        after: Option<NaiveDateTime>,
    ) -> Result<StatsSnapshot> {
        let url = self.window_url("stats", identity, resolution, after);
        tracing::debug!("Fetching stats: {}", url);

        let response: StatsResponse = self.get_json(&url).await?;
        Ok(response.into())
    }
}

#[async_trait]
impl CheckpointStore for HttpReplayApi {
    async fn get_last_viewed(&self, username: &str) -> Result<Option<NaiveDateTime>> {
        let url = self.last_viewed_url(username);
        let response: LastViewedResponse = self.get_json(&url).await?;
        Ok(response.last_viewed_timestamp)
    }

    async fn set_last_viewed(&self, username: &str, timestamp: NaiveDateTime) -> Result<()> {
        let url = format!("{}/update_last_viewed", self.base_url);
        let body = UpdateLastViewedRequest {
            username,
            last_viewed_timestamp: format_timestamp(&timestamp),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Checkpoint update failed with status {}: {}", status, text);
        }

        let outcome = response
            .json::<UpdateLastViewedResponse>()
            .await
            .context("Failed to parse checkpoint update response")?;

        // The backend ignores timestamps that are not newer than the stored one
        if outcome.status != "success" {
            tracing::debug!(
                "Checkpoint update for {} not applied: {}",
                username,
                outcome.status
            );
        }

        Ok(())
    }
}
