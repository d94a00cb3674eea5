// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, sync::Arc};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::{interval, timeout, Duration},
};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use datadog_log_shipper::{Config, LogShipper};

const DEFAULT_FLUSH_INTERVAL: u64 = 10;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
pub async fn main() {
    let log_level = env::var("DD_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    // stdout may be piped somewhere else, keep our own output on stderr
    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Error creating config on log forwarder startup: {e}");
            return;
        }
    };
    let cancel_token = config.cancel_token.clone();

    let shipper = match LogShipper::new(config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Error creating log shipper: {e}");
            return;
        }
    };
    info!("Forwarding stdin to {}", shipper.endpoint());

    let flush_interval_secs =
        parse_flush_interval(env::var("DD_LOGS_FLUSH_INTERVAL").ok().as_deref());
    let mut flush_interval = interval(Duration::from_secs(flush_interval_secs));
    flush_interval.tick().await; // discard first tick, which is instantaneous

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    shipper.write(line.as_bytes());
                }
                Ok(None) => {
                    debug!("Reached end of input");
                    break;
                }
                Err(e) => {
                    error!("Failed to read from stdin: {e}");
                    break;
                }
            },
            _ = flush_interval.tick() => {
                let shipper = Arc::clone(&shipper);
                tokio::spawn(async move {
                    debug!("Flushing {} buffered log lines", shipper.len());
                    if let Err(e) = shipper.sync().await {
                        error!("Periodic flush failed: {e}");
                    }
                });
            }
            _ = &mut shutdown => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    match timeout(SHUTDOWN_TIMEOUT, shipper.sync()).await {
        Ok(Ok(())) => debug!("Final flush complete"),
        Ok(Err(e)) => error!("Final flush failed, {} log lines dropped: {e}", shipper.len()),
        Err(_) => {
            cancel_token.cancel();
            error!(
                "Final flush timed out after {}s, {} log lines dropped",
                SHUTDOWN_TIMEOUT.as_secs(),
                shipper.len()
            );
        }
    }
}

/// Seconds between periodic flushes, `DEFAULT_FLUSH_INTERVAL` when unset or
/// not a positive integer.
fn parse_flush_interval(value: Option<&str>) -> u64 {
    value
        .and_then(|val| val.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_FLUSH_INTERVAL)
}
