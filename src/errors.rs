use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the remote API client
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {url}: {status} {message}")]
    Status {
        method: String,
        url: String,
        status: u16,
        message: String,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API response did not include a {0}")]
    EmptyResponse(&'static str),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("access token is required; pass --access-token or set APPCTL_ACCESS_TOKEN")]
    MissingToken,
}

impl ApiError {
    /// HTTP status of the failed response, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors raised while loading or saving the client configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Configuration load failed: {path}: {source}")]
    Load {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Helper functions for error handling
pub mod util {
    use super::*;

    /// Pull a human readable message out of an API error body.
    ///
    /// The API answers failures with `{"id": "...", "message": "..."}`; anything
    /// else is passed through as trimmed text.
    pub fn error_message(body: &str) -> String {
        #[derive(serde::Deserialize)]
        struct ErrorBody {
            message: Option<String>,
        }

        match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody { message: Some(m) }) if !m.is_empty() => m,
            _ => body.trim().to_string(),
        }
    }
}
