// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Retry policy for intake requests.

use std::time::Duration;

use reqwest::StatusCode;

use crate::constants::{DEFAULT_RETRY_ATTEMPTS, MAX_RETRY_WAIT, MIN_RETRY_WAIT};

/// How many times a payload is attempted and how long to wait in between.
///
/// Attempt counts include the first try, so `Immediate(1)` never retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Retry without waiting.
    Immediate(u32),
    /// Attempts, then a fixed delay in milliseconds between attempts.
    LinearBackoff(u32, u64),
    /// Wait `min_wait`, doubling after each failure, never more than `max_wait`.
    ExponentialBackoff {
        attempts: u32,
        min_wait: Duration,
        max_wait: Duration,
    },
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::ExponentialBackoff {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            min_wait: MIN_RETRY_WAIT,
            max_wait: MAX_RETRY_WAIT,
        }
    }
}

impl RetryStrategy {
    pub fn max_attempts(&self) -> u32 {
        let attempts = match self {
            Self::Immediate(attempts) | Self::LinearBackoff(attempts, _) => *attempts,
            Self::ExponentialBackoff { attempts, .. } => *attempts,
        };
        attempts.max(1)
    }

    /// Delay to observe after the `attempt`-th failed attempt (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Immediate(_) => Duration::ZERO,
            Self::LinearBackoff(_, delay_ms) => Duration::from_millis(*delay_ms),
            Self::ExponentialBackoff {
                min_wait, max_wait, ..
            } => {
                // 2^31 of any non-zero wait is far past any sane cap
                let exponent = attempt.saturating_sub(1).min(31);
                min_wait
                    .checked_mul(1u32 << exponent)
                    .map_or(*max_wait, |wait| wait.min(*max_wait))
            }
        }
    }
}

/// Statuses worth another attempt: rate limiting and server errors, except
/// 501 which will never succeed.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
}

/// Network failures are retried, requests that could not even be built or
/// that looped on redirects are not.
pub fn is_retryable_error(err: &reqwest::Error) -> bool {
    !(err.is_builder() || err.is_redirect())
}
