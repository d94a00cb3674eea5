// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shipper configuration.
//!
//! Everything a [`LogShipper`](crate::LogShipper) needs is passed in explicitly
//! through [`Config`]. [`Config::from_env`] fills it from the usual `DD_*`
//! variables for binaries that want agent-style configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::constants;
use crate::endpoint::{intake_url_for_site, Options};
use crate::errors::ConfigError;
use crate::retry::RetryStrategy;

#[derive(Debug, Clone)]
pub struct Config {
    /// Sent as `DD-API-KEY`. Not checked for emptiness, the intake will
    /// reject a blank key with a 403.
    pub api_key: String,
    /// Datadog site used to derive the intake URL when `options.host` is unset.
    pub site: String,
    pub options: Options,
    pub max_batch_lines: usize,
    pub max_content_size_bytes: usize,
    /// Lines kept between syncs before the oldest are evicted.
    pub max_buffered_lines: usize,
    pub use_compression: bool,
    /// gzip level, 0 to 9.
    pub compression_level: u32,
    /// Timeout of a single request attempt.
    pub timeout: Duration,
    pub retry_strategy: RetryStrategy,
    pub https_proxy: Option<String>,
    /// Cancelling this token aborts in-flight requests and retry waits.
    pub cancel_token: CancellationToken,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            site: constants::DEFAULT_SITE.to_string(),
            options: Options::default(),
            max_batch_lines: constants::MAX_BATCH_ENTRIES_SIZE,
            max_content_size_bytes: constants::MAX_CONTENT_SIZE_BYTES,
            max_buffered_lines: constants::MAX_BUFFERED_LINES,
            use_compression: true,
            compression_level: constants::DEFAULT_COMPRESSION_LEVEL,
            timeout: constants::DEFAULT_FLUSH_TIMEOUT,
            retry_strategy: RetryStrategy::default(),
            https_proxy: None,
            cancel_token: CancellationToken::new(),
        }
    }
}

impl Config {
    pub fn new(api_key: impl Into<String>, options: Options) -> Self {
        Self {
            api_key: api_key.into(),
            options,
            ..Default::default()
        }
    }

    /// Reads the configuration from `DD_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("DD_API_KEY").map_err(|_| ConfigError::MissingApiKey)?;
        let site = env::var("DD_SITE")
            .ok()
            .filter(|site| !site.trim().is_empty())
            .unwrap_or_else(|| constants::DEFAULT_SITE.to_string());

        let options = Options {
            host: non_empty_var("DD_LOGS_CONFIG_LOGS_DD_URL"),
            source: non_empty_var("DD_SOURCE"),
            service: non_empty_var("DD_SERVICE"),
            hostname: non_empty_var("DD_HOSTNAME"),
            tags: env::var("DD_TAGS")
                .map(|tags| parse_tags(&tags))
                .unwrap_or_default(),
        };

        let use_compression = env::var("DD_LOGS_CONFIG_USE_COMPRESSION")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(true);
        let compression_level: u32 = parse_var(
            "DD_LOGS_CONFIG_COMPRESSION_LEVEL",
            constants::DEFAULT_COMPRESSION_LEVEL,
        );
        let compression_level = if compression_level > 9 {
            warn!(
                "DD_LOGS_CONFIG_COMPRESSION_LEVEL must be between 0 and 9, got {}. Using {}.",
                compression_level,
                constants::DEFAULT_COMPRESSION_LEVEL
            );
            constants::DEFAULT_COMPRESSION_LEVEL
        } else {
            compression_level
        };
        let max_buffered_lines = parse_var(
            "DD_LOGS_CONFIG_MAX_BUFFERED_LINES",
            constants::MAX_BUFFERED_LINES,
        );
        let timeout = Duration::from_secs(parse_var(
            "DD_FLUSH_TIMEOUT",
            constants::DEFAULT_FLUSH_TIMEOUT.as_secs(),
        ));

        Ok(Self {
            api_key,
            site,
            options,
            max_buffered_lines,
            use_compression,
            compression_level,
            timeout,
            https_proxy: env::var("DD_PROXY_HTTPS")
                .or_else(|_| env::var("HTTPS_PROXY"))
                .ok(),
            ..Default::default()
        })
    }

    /// Intake URL used when no host override is configured.
    pub fn default_intake_url(&self) -> String {
        intake_url_for_site(&self.site)
    }
}

/// Splits `DD_TAGS` style input. Both comma and whitespace separators are
/// accepted, order is kept and empty entries are dropped.
pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|val| !val.trim().is_empty())
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value '{}' for {}, using {}", val, name, default);
            default
        }),
        Err(_) => default,
    }
}
