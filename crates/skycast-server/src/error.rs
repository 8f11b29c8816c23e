//! Maps component errors to HTTP responses.
//!
//! Status-code knowledge lives here and nowhere else.

use serde_json::json;
use skycast_accounts::AccountError;
use skycast_weather::WeatherError;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error("{0}")]
    BadRequest(String),

    /// Failed login. Unknown user and wrong password look the same.
    #[error("Invalid username or password")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Weather(WeatherError::Upstream { status, .. }) => {
                match StatusCode::from_u16(*status) {
                    Ok(code) if code.is_client_error() || code.is_server_error() => code,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                }
            }
            ApiError::Weather(WeatherError::NoData) => StatusCode::NOT_FOUND,
            ApiError::Weather(WeatherError::Transport(_) | WeatherError::Cache(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Account(AccountError::DuplicateUsername(_)) => StatusCode::CONFLICT,
            ApiError::Account(AccountError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            ApiError::Account(AccountError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `{"error": message}` with the mapped status.
    pub fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }
        error_response(status, &self.to_string())
    }
}

pub fn error_response(status: StatusCode, message: &str) -> Response {
    reply::with_status(reply::json(&json!({ "error": message })), status).into_response()
}
