// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types returned by the shipper.

use reqwest::StatusCode;
use thiserror::Error;

use crate::retry::{is_retryable_error, is_retryable_status};

/// Everything that can go wrong while building a shipper or running a sync pass.
#[derive(Debug, Error)]
pub enum ShipperError {
    /// The configured base host could not be parsed as a URL.
    #[error("invalid intake url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// A batch could not be converted to its JSON wire format.
    #[error("error serializing logs: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The gzip encoder failed.
    #[error("error compressing logs: {0}")]
    Compression(#[source] std::io::Error),
    /// The request never produced a usable response.
    #[error("error writing logs: {0}")]
    Transport(#[from] TransportError),
    /// The intake answered with a non-2xx status after retries were exhausted.
    #[error("error writing logs, bad response from API: {0}")]
    ApiResponse(StatusCode),
}

impl ShipperError {
    /// Status code carried by [`ShipperError::ApiResponse`].
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::ApiResponse(status) => Some(*status),
            _ => None,
        }
    }

    /// Whether the lines behind this error may still be accepted by a later
    /// sync. Cancelled requests count, terminal rejections and encoding
    /// failures do not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiResponse(status) => is_retryable_status(*status),
            Self::Transport(TransportError::Request(err)) => is_retryable_error(err),
            Self::Transport(TransportError::Cancelled) => true,
            Self::Transport(TransportError::Client(_) | TransportError::InvalidHeader(_))
            | Self::InvalidUrl { .. }
            | Self::Serialization(_)
            | Self::Compression(_) => false,
        }
    }
}

/// Failures below the HTTP status level.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The reqwest client could not be built, usually a TLS backend problem.
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    /// A header value, such as the API key, contains characters HTTP forbids.
    #[error("invalid value for header {0}")]
    InvalidHeader(&'static str),
    /// The request could not be sent or no response arrived in time.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The cancellation token fired during a request or a retry wait.
    #[error("request cancelled")]
    Cancelled,
}

/// Raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `DD_API_KEY` is required, there is no anonymous intake.
    #[error("DD_API_KEY environment variable is not set")]
    MissingApiKey,
}
