use super::query::QueryParameters;
use crate::config::Config;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

#[derive(Error, Debug)]
pub enum OpenWeatherError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("Rate limited after {0} attempts")]
    RateLimited(u32),
    #[error("API error: HTTP {status}: {body}")]
    ApiError { status: u16, body: String },
}

impl OpenWeatherError {
    /// The provider's status code, when it answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            OpenWeatherError::ApiError { status, .. } => Some(*status),
            OpenWeatherError::RateLimited(_) => Some(429),
            _ => None,
        }
    }

    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            OpenWeatherError::Timeout
        } else {
            OpenWeatherError::RequestFailed(error)
        }
    }
}

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

pub struct OpenWeatherClient {
    client: Client,
    url: String,
    api_key: String,
    timeout: Duration,
}

impl OpenWeatherClient {
    pub fn new(config: &Config) -> Result<Self, OpenWeatherError> {
        let client = Client::builder()
            .user_agent("WeatherCacheProxy/1.0")
            .timeout(config.openweather_timeout())
            .build()?;

        Ok(Self {
            client,
            url: format!(
                "{}{}",
                config.openweather_base_url.trim_end_matches('/'),
                config.openweather_weather_path
            ),
            api_key: config.openweather_api_key.clone(),
            timeout: config.openweather_timeout(),
        })
    }

    /// Fetch current weather for the validated query, returning the raw payload.
    ///
    /// The configured timeout bounds the whole call, 429 retries included.
    pub async fn get_current_weather(
        &self,
        params: &QueryParameters,
    ) -> Result<Value, OpenWeatherError> {
        let canonical = params.canonical_params();
        let mut query: Vec<(&str, &str)> = canonical
            .iter()
            .map(|(name, value)| (*name, value.as_str()))
            .collect();
        query.push(("appid", self.api_key.as_str()));

        tokio::time::timeout(self.timeout, self.make_request_with_retry(&self.url, &query))
            .await
            .map_err(|_| OpenWeatherError::Timeout)?
    }

    async fn make_request_with_retry(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, OpenWeatherError> {
        let mut retry_count = 0;
        let mut delay = INITIAL_BACKOFF;

        loop {
            let response = self
                .client
                .get(url)
                .query(params)
                .send()
                .await
                .map_err(OpenWeatherError::from_reqwest)?;

            let status = response.status();
            if status.is_success() {
                let body = response.text().await.map_err(OpenWeatherError::from_reqwest)?;
                return Ok(serde_json::from_str(&body)?);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if retry_count >= MAX_RETRIES {
                    return Err(OpenWeatherError::RateLimited(retry_count + 1));
                }

                tracing::warn!(
                    "Rate limited by OpenWeather API, retrying in {}ms",
                    delay.as_millis()
                );

                sleep(delay).await;
                delay = delay.mul_f32(2.0 + fastrand::f32() * 0.5); // Exponential backoff with jitter
                retry_count += 1;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(OpenWeatherError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
    }
}
