// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Intake URL construction.
//!
//! Source, tags, hostname and service are sent as query parameters on every
//! request rather than inside each log entry, so they are encoded once into the
//! endpoint when the shipper is built.

use std::collections::BTreeMap;

use url::Url;

use crate::errors::ShipperError;

/// Endpoint options captured at construction time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Full intake URL overriding the site-derived default.
    pub host: Option<String>,
    pub source: Option<String>,
    pub service: Option<String>,
    pub hostname: Option<String>,
    /// Free-form tags, usually `key:value`. Sent comma-joined in this order.
    pub tags: Vec<String>,
}

/// Returns the logs intake URL for a Datadog site such as `datadoghq.eu`.
#[must_use]
pub fn intake_url_for_site(site: &str) -> String {
    format!("https://http-intake.logs.{}/api/v2/logs", site.trim())
}

/// Builds the endpoint for `options`, falling back to `default_base` when no
/// host override is set.
pub fn endpoint_for(options: &Options, default_base: &str) -> Result<String, ShipperError> {
    let base = options
        .host
        .as_deref()
        .filter(|host| !host.is_empty())
        .unwrap_or(default_base);
    build_endpoint(base, options)
}

/// Parses `base` and replaces its query with the non-empty options.
///
/// Keys are emitted in sorted order so the same options always produce the
/// same URL. An option that is unset or empty produces no key at all.
///
/// ```
/// use datadog_log_shipper::endpoint::{build_endpoint, Options};
///
/// let options = Options {
///     source: Some("rust".to_string()),
///     tags: vec!["env:prod".to_string()],
///     ..Default::default()
/// };
/// assert_eq!(
///     build_endpoint("https://base.url/", &options).unwrap(),
///     "https://base.url/?ddsource=rust&ddtags=env%3Aprod"
/// );
/// ```
pub fn build_endpoint(base: &str, options: &Options) -> Result<String, ShipperError> {
    let mut url = Url::parse(base).map_err(|source| ShipperError::InvalidUrl {
        url: base.to_string(),
        source,
    })?;

    let mut parameters = BTreeMap::new();
    if let Some(source) = non_empty(options.source.as_deref()) {
        parameters.insert("ddsource", source.to_string());
    }
    if !options.tags.is_empty() {
        parameters.insert("ddtags", options.tags.join(","));
    }
    if let Some(hostname) = non_empty(options.hostname.as_deref()) {
        parameters.insert("hostname", hostname.to_string());
    }
    if let Some(service) = non_empty(options.service.as_deref()) {
        parameters.insert("service", service.to_string());
    }

    // `query_pairs_mut` always leaves a `?` behind, even with nothing appended
    url.set_query(None);
    if !parameters.is_empty() {
        let mut query = url.query_pairs_mut();
        for (key, value) in &parameters {
            query.append_pair(key, value);
        }
    }
    Ok(url.to_string())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
