// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client construction.

use std::time::Duration;

use tracing::error;

use crate::errors::TransportError;

/// Builds the intake client, routing through `https_proxy` when set.
///
/// An unusable proxy is logged and skipped rather than failing the shipper,
/// logs still flow over a direct connection.
pub fn get_client(
    https_proxy: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, TransportError> {
    match build_client(https_proxy, timeout) {
        Ok(client) => Ok(client),
        Err(e) if https_proxy.is_some() => {
            error!(
                "LOGS | Unable to parse proxy configuration: {}, falling back to direct connection",
                e
            );
            build_client(None, timeout).map_err(TransportError::Client)
        }
        Err(e) => Err(TransportError::Client(e)),
    }
}

fn build_client(
    https_proxy: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        .tcp_keepalive(Some(Duration::from_secs(120)));

    if let Some(proxy) = https_proxy {
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }

    builder.build()
}
