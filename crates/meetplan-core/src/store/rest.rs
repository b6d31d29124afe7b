//! RestStore: read-only HTTP client for a managed scheduling backend.
//!
//! Endpoints, relative to the base URL:
//! - `GET availability?participants=a,b`
//! - `GET meetings?participants=a,b&from=<rfc3339>&to=<rfc3339>`
//!
//! Both return JSON arrays of the model types.

use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use super::SchedulingStore;
use crate::availability::AvailabilityPreference;
use crate::error::DataSourceError;
use crate::meeting::Meeting;
use crate::range::DateRange;

/// HTTP-backed scheduling store.
pub struct RestStore {
    base_url: Url,
    token: Option<String>,
    request_timeout: Option<Duration>,
    http_client: Client,
}

impl RestStore {
    /// Create a client for `base_url`.
    pub fn new(base_url: &str) -> Result<Self, DataSourceError> {
        let mut base_url = Url::parse(base_url).map_err(|e| DataSourceError::Unreachable {
            store: "rest".to_string(),
            message: format!("invalid base url '{base_url}': {e}"),
        })?;
        // Url::join replaces the last segment unless the path ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            token: None,
            request_timeout: None,
            http_client: Client::new(),
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Bound every HTTP request, connect through body, by `timeout`.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self, DataSourceError> {
        self.http_client = Client::builder().timeout(timeout).build()?;
        self.request_timeout = Some(timeout);
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, DataSourceError> {
        let mut url = self.base_url.join(path).map_err(|e| DataSourceError::Unreachable {
            store: "rest".to_string(),
            message: e.to_string(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, DataSourceError> {
        let mut request = self.http_client.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await.map_err(|e| self.request_error(&url, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DataSourceError::Unreachable {
                store: "rest".to_string(),
                message: format!("HTTP {status} from {}", url.path()),
            });
        }

        resp.json::<T>().await.map_err(|e| self.request_error(&url, e))
    }

    /// Client timeouts carry the configured deadline; everything else maps as usual.
    fn request_error(&self, url: &Url, err: reqwest::Error) -> DataSourceError {
        match self.request_timeout {
            Some(limit) if err.is_timeout() => DataSourceError::Timeout {
                operation: format!("GET {}", url.path()),
                timeout_ms: limit.as_millis() as u64,
            },
            _ => err.into(),
        }
    }
}

#[async_trait]
impl SchedulingStore for RestStore {
    fn name(&self) -> &str {
        "rest"
    }

    async fn list_availability(
        &self,
        participant_ids: &[String],
    ) -> Result<Vec<AvailabilityPreference>, DataSourceError> {
        let url = self.endpoint("availability", &[("participants", participant_ids.join(","))])?;
        self.get_json(url).await
    }

    async fn list_meetings(
        &self,
        participant_ids: &[String],
        range: DateRange,
    ) -> Result<Vec<Meeting>, DataSourceError> {
        let url = self.endpoint(
            "meetings",
            &[
                ("participants", participant_ids.join(",")),
                ("from", range.start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("to", range.end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ],
        )?;
        self.get_json(url).await
    }
}
