// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Limits and defaults of the Datadog logs intake API.
//!
//! The intake rejects payloads that exceed either the entry count or the
//! uncompressed size limit, so both are enforced before anything is sent.

use std::time::Duration;

/// Site used to derive the intake URL when neither a site nor a host override
/// is configured.
pub const DEFAULT_SITE: &str = "datadoghq.com";

/// Intake URL for [`DEFAULT_SITE`].
///
/// This is the v2 intake path. The legacy `/v1/input` path is still served by
/// the backend and can be reached through a host override.
pub const DEFAULT_INTAKE_URL: &str = "https://http-intake.logs.datadoghq.com/api/v2/logs";

/// Maximum number of log entries in a single payload.
pub const MAX_BATCH_ENTRIES_SIZE: usize = 1000;

/// Maximum uncompressed payload size in bytes (5MB).
///
/// Batches whose serialized JSON exceeds this are bisected until each half
/// fits, or until a single entry remains.
pub const MAX_CONTENT_SIZE_BYTES: usize = 5 * 1_024 * 1_024;

/// Default gzip level, the same trade-off zlib picks for its own default.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Per-request timeout.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on any single backoff wait between retries.
pub const MAX_RETRY_WAIT: Duration = Duration::from_secs(10);

/// First backoff wait, doubled on each subsequent retry.
pub const MIN_RETRY_WAIT: Duration = Duration::from_secs(1);

/// Total attempts for one payload: the first try plus four retries.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;

/// Header carrying the API key on every intake request.
pub const API_KEY_HEADER: &str = "DD-API-KEY";

/// Maximum number of lines held between syncs. Past this the oldest lines are
/// evicted so a long outage cannot grow the buffer without bound.
pub const MAX_BUFFERED_LINES: usize = 50_000;
