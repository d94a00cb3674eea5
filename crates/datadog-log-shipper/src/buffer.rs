// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory buffer of log lines waiting for the next sync pass.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::MAX_BUFFERED_LINES;

/// A single log entry in the intake's JSON format.
///
/// Only the message is sent. The intake stamps entries at ingest time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub message: String,
}

impl LogLine {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Builds a line from raw bytes, replacing invalid UTF-8 sequences with
    /// `U+FFFD`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(String::from_utf8_lossy(bytes))
    }
}

/// Ordered, thread-safe collection of pending lines.
///
/// Every operation takes the lock for the duration of the call only, so
/// writers never wait on network I/O. The buffer holds at most `max_lines`
/// lines, the oldest are evicted first once it is full.
#[derive(Debug)]
pub struct LineBuffer {
    lines: Mutex<VecDeque<LogLine>>,
    max_lines: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_lines(MAX_BUFFERED_LINES)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_lines(max_lines: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::new()),
            max_lines: max_lines.max(1),
        }
    }

    /// Appends `bytes` as one line and returns how many bytes were accepted,
    /// which is always all of them.
    pub fn write(&self, bytes: &[u8]) -> usize {
        let line = LogLine::from_bytes(bytes);
        let mut lines = self.lock();
        if lines.len() >= self.max_lines {
            lines.pop_front();
            warn!(
                "LOGS | Log buffer full ({} lines), dropping oldest log line",
                self.max_lines
            );
        }
        lines.push_back(line);
        bytes.len()
    }

    /// Takes every buffered line, leaving the buffer empty.
    pub fn snapshot_and_clear(&self) -> Vec<LogLine> {
        Vec::from(std::mem::take(&mut *self.lock()))
    }

    /// Puts `lines` back ahead of anything written since they were taken.
    ///
    /// If that overflows the buffer, the oldest lines are evicted, which are
    /// the re-queued ones.
    pub fn requeue_front(&self, lines: Vec<LogLine>) {
        if lines.is_empty() {
            return;
        }
        let mut buffered = self.lock();
        for line in lines.into_iter().rev() {
            buffered.push_front(line);
        }
        let overflow = buffered.len().saturating_sub(self.max_lines);
        if overflow > 0 {
            buffered.drain(..overflow);
            warn!(
                "LOGS | Log buffer full ({} lines), dropping {} oldest log lines",
                self.max_lines, overflow
            );
        }
    }

    /// Copy of the buffered lines, oldest first.
    pub fn lines(&self) -> Vec<LogLine> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock can only happen mid-push or mid-take,
    // both of which leave the deque valid, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, VecDeque<LogLine>> {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
