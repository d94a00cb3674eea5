// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of a single payload to the intake.
//!
//! ```text
//!   Payload ──► POST ──► 2xx ──────────────► Ok
//!                │
//!                ├──► 429 / 5xx / network ──► wait, retry (up to the strategy's attempts)
//!                │
//!                └──► other status ─────────► ApiResponse(status)
//! ```
//!
//! Every failure is logged before it is returned so it is visible even when
//! the caller drops the error.

use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::constants::API_KEY_HEADER;
use crate::encoder::Payload;
use crate::errors::{ShipperError, TransportError};
use crate::retry::{is_retryable_error, is_retryable_status, RetryStrategy};

/// Posts payloads to one intake endpoint.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    endpoint: String,
    /// API key and content type, shared by every request.
    headers: HeaderMap,
    retry_strategy: RetryStrategy,
    cancel_token: CancellationToken,
}

enum Attempt {
    Retryable(ShipperError),
    Terminal(ShipperError),
}

impl Transport {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        api_key: &str,
        retry_strategy: RetryStrategy,
        cancel_token: CancellationToken,
    ) -> Result<Self, ShipperError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(api_key).map_err(|_| {
                error!("LOGS | API key is not a valid header value");
                TransportError::InvalidHeader(API_KEY_HEADER)
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            client,
            endpoint,
            headers,
            retry_strategy,
            cancel_token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends `payload`, retrying transient failures.
    pub async fn post(&self, payload: &Payload) -> Result<(), ShipperError> {
        let max_attempts = self.retry_strategy.max_attempts();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let time = Instant::now();
            let err = match self.send(payload).await {
                Ok(()) => {
                    debug!(
                        "LOGS | Sent {} log lines ({} bytes) in {} ms",
                        payload.line_count,
                        payload.body.len(),
                        time.elapsed().as_millis()
                    );
                    return Ok(());
                }
                Err(Attempt::Retryable(err)) if attempts < max_attempts => err,
                Err(Attempt::Retryable(err) | Attempt::Terminal(err)) => {
                    error!(
                        "LOGS | Failed to send {} log lines after {} attempts: {}",
                        payload.line_count, attempts, err
                    );
                    return Err(err);
                }
            };

            let delay = self.retry_strategy.delay(attempts);
            debug!(
                "LOGS | Attempt {}/{} failed: {}, retrying in {} ms",
                attempts,
                max_attempts,
                err,
                delay.as_millis()
            );
            tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => {
                    error!("LOGS | Request cancelled while waiting to retry");
                    return Err(TransportError::Cancelled.into());
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn send(&self, payload: &Payload) -> Result<(), Attempt> {
        let mut headers = self.headers.clone();
        if payload.compressed {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        }
        let request = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .body(payload.body.clone());

        let response = tokio::select! {
            biased;
            () = self.cancel_token.cancelled() => {
                return Err(Attempt::Terminal(TransportError::Cancelled.into()));
            }
            response = request.send() => response,
        };

        match response {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return Ok(());
                }
                // Don't read response body unless needed
                let body = resp.text().await.unwrap_or_default();
                if status == StatusCode::FORBIDDEN {
                    error!(
                        "LOGS | Request was denied by Datadog: Access denied. Please verify that your API key is valid."
                    );
                } else {
                    error!("LOGS | {} status code returned: {:?}", status, body);
                }
                let err = ShipperError::ApiResponse(status);
                if is_retryable_status(status) {
                    Err(Attempt::Retryable(err))
                } else {
                    Err(Attempt::Terminal(err))
                }
            }
            Err(e) => {
                let retryable = is_retryable_error(&e);
                let err = ShipperError::Transport(TransportError::Request(e));
                if retryable {
                    Err(Attempt::Retryable(err))
                } else {
                    Err(Attempt::Terminal(err))
                }
            }
        }
    }
}
