// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Buffered log shipping to the Datadog logs intake.
//!
//! A [`LogShipper`] accumulates raw log lines in memory and, when asked to
//! [`sync`](LogShipper::sync), serializes them into JSON batches, gzips them and
//! posts them to the intake endpoint with retry on transient failures.
//!
//! ```text
//!   write(bytes) ──► LineBuffer ──sync──► BatchEncoder ──► Transport ──► intake
//!                        ▲                                     │
//!                        └──────── re-queue unsent lines ◄─────┘ (on failure)
//! ```
//!
//! No background flushing happens here. Callers decide when to sync, see the
//! `datadog-log-forwarder` binary for an interval-driven example.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod buffer;
pub mod config;
pub mod constants;
pub mod encoder;
pub mod endpoint;
pub mod errors;
pub mod http;
pub mod retry;
pub mod shipper;
pub mod transport;

pub use buffer::LogLine;
pub use config::Config;
pub use endpoint::Options;
pub use errors::{ConfigError, ShipperError, TransportError};
pub use retry::RetryStrategy;
pub use shipper::LogShipper;
