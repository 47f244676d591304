//! Garmin Connect API client
//!
//! Thin authenticated wrapper over the Connect REST endpoints. All payloads
//! are returned as loosely-structured JSON; shaping them into canonical
//! records is the normalizer's job.

use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use crate::client::{ApiToken, Provider};
use crate::error::{Result, SyncError};
use crate::models::MetricType;

/// User agent for Connect API requests
const API_USER_AGENT: &str = "GCM-iOS-5.7.2.1";

/// Garmin Connect API client
pub struct ConnectClient {
    client: Client,
    base_url: String,
    token: ApiToken,
    display_name: Option<String>,
}

impl ConnectClient {
    /// Create a new API client for the given regional domain
    pub fn new(domain: &str, token: ApiToken) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: format!("https://connectapi.{}", domain),
            token,
            display_name: None,
        }
    }

    /// Create a new API client with a custom base URL (for testing)
    #[doc(hidden)]
    pub fn new_with_base_url(base_url: &str, token: ApiToken) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
            token,
            display_name: None,
        }
    }

    /// Build the full URL for a given path
    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build headers with authorization
    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(API_USER_AGENT));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&self.token.authorization_header())
                .map_err(|e| SyncError::auth(format!("Invalid token header: {}", e)))?,
        );
        Ok(headers)
    }

    /// Fetch the account's display name, required by some wellness endpoints
    pub async fn resolve_display_name(&mut self) -> Result<String> {
        if let Some(ref name) = self.display_name {
            return Ok(name.clone());
        }

        let profile = self.get_value("/userprofile-service/socialProfile").await?;
        let name = profile
            .get("displayName")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| SyncError::invalid_response("Could not get display name"))?;

        self.display_name = Some(name.clone());
        Ok(name)
    }

    /// Make an authenticated GET request and return the raw response
    async fn get(&self, path: &str) -> Result<Response> {
        let url = self.build_url(path);
        let headers = self.build_headers()?;

        self.client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(SyncError::Http)
    }

    /// GET a JSON payload; any non-success status is an error
    async fn get_value(&self, path: &str) -> Result<Value> {
        let response = self.get(path).await?;
        let response = handle_response_status(response).await?;
        response.json().await.map_err(|e| {
            SyncError::invalid_response(format!("Failed to parse JSON response: {}", e))
        })
    }

    /// GET a JSON payload; 404 and empty payloads map to `None`
    async fn get_optional(&self, path: &str) -> Result<Option<Value>> {
        let response = self.get(path).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = handle_response_status(response).await?;
        let value: Value = response.json().await.map_err(|e| {
            SyncError::invalid_response(format!("Failed to parse JSON response: {}", e))
        })?;
        Ok(non_empty(value))
    }

    /// Endpoint path for a date-keyed metric type
    fn daily_metric_path(&self, metric: MetricType, date: NaiveDate) -> Result<String> {
        let path = match metric {
            MetricType::HeartRate => {
                format!("/wellness-service/wellness/dailyHeartRate?date={}", date)
            }
            MetricType::Sleep => {
                let display_name = self
                    .display_name
                    .as_deref()
                    .ok_or_else(|| SyncError::invalid_response("Display name not resolved"))?;
                format!(
                    "/wellness-service/wellness/dailySleepData/{}?date={}&nonSleepBufferMinutes=60",
                    display_name, date
                )
            }
            MetricType::Stress => format!("/wellness-service/wellness/dailyStress/{}", date),
            MetricType::Spo2 => format!("/wellness-service/wellness/daily/spo2/{}", date),
            MetricType::Respiration => {
                format!("/wellness-service/wellness/daily/respiration/{}", date)
            }
            MetricType::Hrv => format!("/hrv-service/hrv/{}", date),
        };
        Ok(path)
    }
}

impl Provider for ConnectClient {
    async fn list_activities(&self, start: u32, limit: u32) -> Result<Vec<Value>> {
        let path = format!(
            "/activitylist-service/activities/search/activities?limit={}&start={}",
            limit, start
        );
        let value = self.get_value(&path).await?;
        match value {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(SyncError::invalid_response(format!(
                "Expected activity array, got {}",
                other
            ))),
        }
    }

    async fn get_activity_detail(&self, activity_id: &str) -> Result<Option<Value>> {
        let path = format!("/activity-service/activity/{}", activity_id);
        self.get_optional(&path).await
    }

    async fn get_activity_track(&self, activity_id: &str) -> Result<Option<Value>> {
        let path = format!("/activity-service/activity/{}/details", activity_id);
        self.get_optional(&path).await
    }

    async fn get_daily_metric(&self, metric: MetricType, date: NaiveDate) -> Result<Option<Value>> {
        let path = self.daily_metric_path(metric, date)?;
        self.get_optional(&path).await
    }
}

/// Map response status codes to errors
async fn handle_response_status(response: Response) -> Result<Response> {
    let status = response.status();

    match status {
        StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => {
            Ok(response)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SyncError::NotAuthenticated),
        StatusCode::TOO_MANY_REQUESTS => Err(SyncError::RateLimited),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(SyncError::Api {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}

/// A null or empty-object payload means the provider has nothing for the key
fn non_empty(value: Value) -> Option<Value> {
    match &value {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        Value::Array(items) if items.is_empty() => None,
        _ => Some(value),
    }
}
