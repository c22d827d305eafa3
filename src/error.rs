use reqwest::StatusCode;
use thiserror::Error;

/// Process exit codes for the failure classes `lmctl` reports.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const TRANSPORT: i32 = 7;
}

/// Failures from a single signed call against the REST API.
///
/// Every variant that comes from a non-200 response keeps the numeric status
/// in its message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{status} (authentication rejected; check ACCESS_ID and ACCESS_KEY)")]
    Unauthorized { status: u16 },

    #[error("{status} (resource not found at {path})")]
    NotFound { status: u16, path: String },

    #[error("{status}")]
    Status { status: u16 },

    #[error("invalid or missing data in the API response")]
    MissingData,

    #[error("could not decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn from_status(status: StatusCode, path: &str) -> Self {
        let code = status.as_u16();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized { status: code },
            StatusCode::NOT_FOUND => Self::NotFound {
                status: code,
                path: path.to_string(),
            },
            _ => Self::Status { status: code },
        }
    }

    /// Numeric HTTP status, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status }
            | Self::NotFound { status, .. }
            | Self::Status { status } => Some(*status),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Transport { .. } => exit_code::TRANSPORT,
            Self::Unauthorized { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            _ => exit_code::GENERAL,
        }
    }
}
