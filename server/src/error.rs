use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

use crate::weather::openweather::OpenWeatherError;

/// Field-level validation failures, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns `Ok(value)` when no error was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("weather provider request failed: {0}")]
    Upstream(#[from] OpenWeatherError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(OpenWeatherError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ApiError::Validation(errors) => (status, Json(errors)).into_response(),
            ApiError::Upstream(e) => {
                tracing::error!("Weather provider request failed: {}", e);
                let body = ErrorResponse {
                    error: e.to_string(),
                    upstream_status: e.upstream_status(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_collect_per_field() {
        let mut errors = ValidationErrors::new();
        assert!(errors.is_empty());

        errors.add("units", "first");
        errors.add("units", "second");
        errors.add("lang", "third");

        assert_eq!(errors.field("units").unwrap(), ["first", "second"]);
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["lang", "units"]);
        assert!(errors.clone().into_result(()).is_err());

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"lang": ["third"], "units": ["first", "second"]})
        );
    }

    #[test]
    fn test_status_codes() {
        let validation = ApiError::Validation(ValidationErrors::new());
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);

        let timeout = ApiError::Upstream(OpenWeatherError::Timeout);
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let rejected = ApiError::Upstream(OpenWeatherError::ApiError {
            status: 400,
            body: "bad request".to_string(),
        });
        assert_eq!(rejected.status_code(), StatusCode::BAD_GATEWAY);
    }
}
