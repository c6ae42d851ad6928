//! Mapping of kymograph time bins onto source frames.

use serde::{Deserialize, Serialize};

/// Time bins `first_ms, first_ms + bin_ms, ...` up to and including `last_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinTiming {
    pub first_ms: i64,
    pub last_ms: i64,
    pub bin_ms: i64,
}

impl Default for BinTiming {
    fn default() -> Self {
        Self {
            first_ms: 0,
            last_ms: 0,
            bin_ms: 60_000,
        }
    }
}

impl BinTiming {
    pub fn new(first_ms: i64, last_ms: i64, bin_ms: i64) -> Self {
        Self {
            first_ms,
            last_ms,
            bin_ms,
        }
    }

    /// One bin per frame timestamp of an evenly spaced acquisition.
    pub fn spanning(timestamps_ms: &[i64], bin_ms: i64) -> Self {
        match (timestamps_ms.first(), timestamps_ms.last()) {
            (Some(&first), Some(&last)) => Self::new(first, last, bin_ms),
            _ => Self::new(0, -1, bin_ms),
        }
    }

    pub fn bin_count(&self) -> usize {
        if self.bin_ms <= 0 || self.last_ms < self.first_ms {
            return 0;
        }
        ((self.last_ms - self.first_ms) / self.bin_ms) as usize + 1
    }

    #[inline]
    pub fn bin_time_ms(&self, bin: usize) -> i64 {
        self.first_ms + bin as i64 * self.bin_ms
    }

    /// Frame whose timestamp is nearest to the bin time; ties pick the earlier frame.
    pub fn frame_for_bin(&self, bin: usize, timestamps_ms: &[i64]) -> Option<usize> {
        nearest_index(timestamps_ms, self.bin_time_ms(bin))
    }

    pub fn frames_for_bins(&self, timestamps_ms: &[i64]) -> Vec<Option<usize>> {
        (0..self.bin_count())
            .map(|bin| self.frame_for_bin(bin, timestamps_ms))
            .collect()
    }
}

/// Binary search for the entry of sorted `values` closest to `target`.
pub fn nearest_index(values: &[i64], target: i64) -> Option<usize> {
    if values.is_empty() {
        return None;
    }
    let upper = values.partition_point(|&v| v < target);
    if upper == 0 {
        return Some(0);
    }
    if upper == values.len() {
        return Some(values.len() - 1);
    }
    let below = target - values[upper - 1];
    let above = values[upper] - target;
    Some(if above < below { upper } else { upper - 1 })
}
