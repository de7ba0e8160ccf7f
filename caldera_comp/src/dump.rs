// Copyright 2026 the Caldera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Capacity-capped writing for the diagnostic dump.

use core::fmt;

/// A [`fmt::Write`] adapter that appends to a `String` without ever
/// exceeding a byte budget.
///
/// Once the budget is exhausted further writes are swallowed (still
/// reported as `Ok`, so formatting macros never error). Truncation is
/// char-aligned: a multi-byte character that does not fit entirely is
/// dropped.
#[derive(Debug)]
pub(crate) struct CappedWriter<'a> {
    buf: &'a mut String,
    remaining: usize,
    truncated: bool,
}

impl<'a> CappedWriter<'a> {
    /// Wraps `buf`, allowing at most `capacity` appended bytes.
    pub(crate) fn new(buf: &'a mut String, capacity: usize) -> Self {
        Self {
            buf,
            remaining: capacity,
            truncated: false,
        }
    }

    /// Returns `true` if any output was dropped.
    #[cfg(test)]
    pub(crate) fn truncated(&self) -> bool {
        self.truncated
    }
}

impl fmt::Write for CappedWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.truncated {
            return Ok(());
        }
        if s.len() <= self.remaining {
            self.buf.push_str(s);
            self.remaining -= s.len();
            return Ok(());
        }

        let mut end = self.remaining;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        self.buf.push_str(&s[..end]);
        self.remaining = 0;
        self.truncated = true;
        Ok(())
    }
}
