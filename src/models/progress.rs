//! Cumulative upload progress.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub sent: u64,
    pub total: u64,
    pub percent: u8,
}

impl Progress {
    /// `percent` is `sent / total * 100` rounded to the nearest integer, but
    /// held at 99 until every byte is sent so that 100 always means done.
    pub fn new(sent: u64, total: u64) -> Self {
        let percent = if total == 0 || sent >= total {
            100
        } else {
            let rounded = ((sent as f64 / total as f64) * 100.0).round() as u8;
            rounded.min(99)
        };
        Self {
            sent,
            total,
            percent,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.sent >= self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} % ({}/{} bytes)", self.percent, self.sent, self.total)
    }
}
