// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The log shipper: buffer, encode and post.
//!
//! # Sync pass
//!
//! 1. Take the sync lock, so only one pass runs per shipper.
//! 2. Snapshot and clear the buffer. Writers are blocked only for this step.
//! 3. Walk the snapshot in chunks of `max_batch_lines`, encode each chunk and
//!    post the resulting payloads in order.
//! 4. On the first failure, stop. What happens to the failed payload depends
//!    on the error:
//!    - retryable (429, 5xx, network, cancellation): the payload and every
//!      line after it go back to the front of the buffer, so the next pass
//!      retries them before anything written in the meantime.
//!    - terminal (other 4xx, encoding failure): the payload is dropped and
//!      logged, only the lines after it are re-queued. A payload the intake
//!      will never accept cannot hold back the rest.

use std::io;

use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, error};

use crate::buffer::{LineBuffer, LogLine};
use crate::config::Config;
use crate::encoder::BatchEncoder;
use crate::endpoint::endpoint_for;
use crate::errors::ShipperError;
use crate::http::get_client;
use crate::transport::Transport;

/// Buffers log lines and ships them to one Datadog logs intake.
///
/// ```no_run
/// use datadog_log_shipper::{Config, LogShipper, Options};
///
/// # async fn run() -> Result<(), datadog_log_shipper::ShipperError> {
/// let shipper = LogShipper::new(Config::new("<api key>", Options::default()))?;
/// shipper.write(b"user signed in");
/// shipper.sync().await?;
/// # Ok(())
/// # }
/// ```
///
/// Nothing is sent until [`sync`](Self::sync) is called and nothing is sent
/// on drop.
#[derive(Debug)]
pub struct LogShipper {
    buffer: LineBuffer,
    encoder: BatchEncoder,
    transport: Transport,
    sync_lock: TokioMutex<()>,
}

/// Where a failed pass stopped.
struct Aborted {
    error: ShipperError,
    /// Lines of the snapshot that are done with, either accepted or dropped.
    /// Everything from here on is re-queued.
    resume_at: usize,
}

impl LogShipper {
    pub fn new(config: Config) -> Result<Self, ShipperError> {
        let endpoint = endpoint_for(&config.options, &config.default_intake_url())?;
        let client = get_client(config.https_proxy.as_deref(), config.timeout)?;
        let transport = Transport::new(
            client,
            endpoint,
            &config.api_key,
            config.retry_strategy,
            config.cancel_token,
        )?;
        let encoder = BatchEncoder::new(
            config.max_batch_lines,
            config.max_content_size_bytes,
            config
                .use_compression
                .then_some(config.compression_level),
        );
        debug!("LOGS | Shipping logs to {}", transport.endpoint());

        Ok(Self {
            buffer: LineBuffer::with_max_lines(config.max_buffered_lines),
            encoder,
            transport,
            sync_lock: TokioMutex::new(()),
        })
    }

    /// The intake URL including its query parameters.
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// Buffers `message` as one log line and returns its length.
    pub fn write(&self, message: &[u8]) -> usize {
        self.buffer.write(message)
    }

    /// Copy of the lines waiting for the next sync, oldest first.
    pub fn lines(&self) -> Vec<LogLine> {
        self.buffer.lines()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Ships every buffered line.
    ///
    /// Returns the first error encountered. Lines that may still be accepted
    /// later are kept for the next call, lines the intake rejected outright
    /// are dropped.
    pub async fn sync(&self) -> Result<(), ShipperError> {
        let _pass = self.sync_lock.lock().await;

        let mut lines = self.buffer.snapshot_and_clear();
        if lines.is_empty() {
            return Ok(());
        }

        match self.ship(&lines).await {
            Ok(payloads) => {
                debug!(
                    "LOGS | Synced {} log lines in {} payloads",
                    lines.len(),
                    payloads
                );
                Ok(())
            }
            Err(Aborted { error, resume_at }) => {
                let unsent = lines.split_off(resume_at.min(lines.len()));
                error!(
                    "LOGS | Sync aborted after {} of {} log lines, keeping {} for the next sync: {}",
                    resume_at,
                    resume_at + unsent.len(),
                    unsent.len(),
                    error
                );
                self.buffer.requeue_front(unsent);
                Err(error)
            }
        }
    }

    async fn ship(&self, lines: &[LogLine]) -> Result<usize, Aborted> {
        let mut done = 0;
        let mut payloads_sent = 0;
        for chunk in lines.chunks(self.encoder.max_batch_lines()) {
            let payloads = self.encoder.encode(chunk).map_err(|error| {
                error!(
                    "LOGS | Dropping {} log lines that could not be encoded",
                    chunk.len()
                );
                Aborted {
                    error,
                    resume_at: done + chunk.len(),
                }
            })?;
            for payload in &payloads {
                if let Err(error) = self.transport.post(payload).await {
                    let resume_at = if error.is_retryable() {
                        done
                    } else {
                        error!(
                            "LOGS | Dropping {} log lines rejected by the intake",
                            payload.line_count
                        );
                        done + payload.line_count
                    };
                    return Err(Aborted { error, resume_at });
                }
                done += payload.line_count;
                payloads_sent += 1;
            }
        }
        Ok(payloads_sent)
    }
}

/// Lets a shared shipper sit behind anything that takes a writer. Each `write`
/// call becomes one log line. `flush` does nothing, shipping needs
/// [`LogShipper::sync`].
impl io::Write for &LogShipper {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(LogShipper::write(self, buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for LogShipper {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(LogShipper::write(self, buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
