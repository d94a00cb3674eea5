// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Conversion of buffered lines into wire-ready payloads.
//!
//! The intake caps both the number of entries and the uncompressed size of a
//! request, so encoding happens in two steps:
//!
//! 1. **Count**: lines are chunked into groups of at most `max_batch_lines`.
//! 2. **Size**: a chunk whose JSON exceeds `max_content_size_bytes` is split in
//!    half and each half is encoded on its own, recursively.
//!
//! Chunks that fit are gzipped (when enabled) into a single [`Payload`].
//! Payloads come out in the same order as the input lines and each line lands
//! in exactly one payload.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{error, warn};

use crate::buffer::LogLine;
use crate::constants;
use crate::errors::ShipperError;

/// One request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub body: Vec<u8>,
    /// Whether `body` is gzip encoded and needs `Content-Encoding: gzip`.
    pub compressed: bool,
    /// Number of log lines in `body`.
    pub line_count: usize,
}

#[derive(Debug, Clone)]
pub struct BatchEncoder {
    max_batch_lines: usize,
    max_content_size_bytes: usize,
    /// `None` disables compression.
    compression: Option<Compression>,
}

impl Default for BatchEncoder {
    fn default() -> Self {
        Self::new(
            constants::MAX_BATCH_ENTRIES_SIZE,
            constants::MAX_CONTENT_SIZE_BYTES,
            Some(constants::DEFAULT_COMPRESSION_LEVEL),
        )
    }
}

impl BatchEncoder {
    /// `compression_level` is a gzip level from 0 to 9, values above 9 are
    /// clamped. `None` sends plain JSON.
    pub fn new(
        max_batch_lines: usize,
        max_content_size_bytes: usize,
        compression_level: Option<u32>,
    ) -> Self {
        Self {
            // a zero limit would never make progress
            max_batch_lines: max_batch_lines.max(1),
            max_content_size_bytes,
            compression: compression_level.map(|level| Compression::new(level.min(9))),
        }
    }

    pub fn max_batch_lines(&self) -> usize {
        self.max_batch_lines
    }

    /// Encodes `lines` into as many payloads as the limits require.
    pub fn encode(&self, lines: &[LogLine]) -> Result<Vec<Payload>, ShipperError> {
        let mut payloads = Vec::new();
        for chunk in lines.chunks(self.max_batch_lines) {
            self.encode_chunk(chunk, &mut payloads)?;
        }
        Ok(payloads)
    }

    fn encode_chunk(
        &self,
        chunk: &[LogLine],
        payloads: &mut Vec<Payload>,
    ) -> Result<(), ShipperError> {
        let body = serde_json::to_vec(chunk).map_err(|e| {
            error!("LOGS | Failed to serialize {} log lines: {}", chunk.len(), e);
            ShipperError::Serialization(e)
        })?;

        if body.len() > self.max_content_size_bytes {
            if chunk.len() > 1 {
                let (first, second) = chunk.split_at(chunk.len() / 2);
                self.encode_chunk(first, payloads)?;
                return self.encode_chunk(second, payloads);
            }
            warn!(
                "LOGS | Single log line of {} bytes exceeds the {} byte payload limit, sending as-is",
                body.len(),
                self.max_content_size_bytes
            );
        }

        let payload = match self.compression {
            Some(level) => Payload {
                body: compress(&body, level).map_err(|e| {
                    error!("LOGS | Failed to compress {} log lines: {}", chunk.len(), e);
                    ShipperError::Compression(e)
                })?,
                compressed: true,
                line_count: chunk.len(),
            },
            None => Payload {
                body,
                compressed: false,
                line_count: chunk.len(),
            },
        };
        payloads.push(payload);
        Ok(())
    }
}

fn compress(data: &[u8], level: Compression) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 4), level);
    encoder.write_all(data)?;
    encoder.finish()
}
