use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::Provider;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("{provider} API returned status {status}")]
    Upstream { provider: Provider, status: u16 },

    #[error("Failed to parse {provider} response: {message}")]
    Parse { provider: Provider, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Request superseded by a newer search")]
    Superseded,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short machine-readable kind the UI can switch on
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Cache(_)
            | AppError::Serialization(_)
            | AppError::Storage(_)
            | AppError::Internal(_) => "internal",
            AppError::HttpClient(_) | AppError::Parse { .. } => "network",
            AppError::MissingConfig(_) => "missingConfig",
            AppError::Upstream { status: 429, .. } => "rateLimited",
            AppError::Upstream { .. } => "upstream",
            AppError::NotFound(_) => "notFound",
            AppError::InvalidInput(_) => "invalidInput",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Superseded => "superseded",
        }
    }

    /// Text shown to the user in place of the panel contents
    pub fn user_message(&self) -> String {
        match self {
            AppError::MissingConfig(what) => format!(
                "{what} is not configured. \
                 Add it to the server environment or supply one with the request."
            ),
            AppError::Upstream { provider, status } => upstream_message(*provider, *status),
            AppError::HttpClient(_) | AppError::Parse { .. } => {
                "Something went wrong while loading results. Please try again.".to_string()
            }
            AppError::NotFound(msg) | AppError::InvalidInput(msg) | AppError::Unauthorized(msg) => {
                msg.clone()
            }
            AppError::Superseded => self.to_string(),
            AppError::Cache(_)
            | AppError::Serialization(_)
            | AppError::Storage(_)
            | AppError::Internal(_) => {
                "Internal error. Please try again later.".to_string()
            }
        }
    }
}

/// Maps an upstream failure to guidance for the user
fn upstream_message(provider: Provider, status: u16) -> String {
    match (provider, status) {
        (Provider::Eventbrite, 401) => {
            "Eventbrite rejected the token. Paste your private OAuth token \
             from the Eventbrite API keys page.".to_string()
        }
        (Provider::Eventbrite, 403) => {
            "This Eventbrite token is not allowed to search events. \
             Check the token's permissions.".to_string()
        }
        (Provider::Eventbrite, 404) => {
            "Eventbrite search is unavailable for this token. \
             Event search may not be enabled for your account.".to_string()
        }
        (Provider::Spotify, 401) => {
            "Your Spotify session expired. Connect Spotify again.".to_string()
        }
        (_, 429) => format!("{provider} is rate limiting requests. Wait a minute and try again."),
        (_, 401 | 403) => format!("{provider} rejected the API key. Check that it is valid."),
        (_, 404) => format!("{provider} could not find anything for this search."),
        _ => format!("{provider} request failed (status {status})."),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Superseded => StatusCode::CONFLICT,
            AppError::MissingConfig(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream { status: 429, .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream {
                provider: Provider::Spotify,
                status: 401,
            } => StatusCode::UNAUTHORIZED,
            AppError::Upstream { .. } | AppError::HttpClient(_) | AppError::Parse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Cache(_)
            | AppError::Serialization(_)
            | AppError::Storage(_)
            | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "Request failed");
        } else {
            tracing::warn!(error = %self, kind = self.kind(), "Request rejected");
        }

        let body = Json(json!({
            "error": self.user_message(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
