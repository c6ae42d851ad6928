//! Frozen per-time-index measures.

use serde::{Deserialize, Serialize};

/// Gap-free series of `(index, value)` pairs with consecutive indices.
///
/// Built through [`Level2DBuilder`] and immutable afterwards; edits produce a new
/// series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Level2D {
    first_index: usize,
    values: Vec<f64>,
}

impl Level2D {
    pub fn from_values(first_index: usize, values: Vec<f64>) -> Self {
        Self {
            first_index,
            values,
        }
    }

    #[inline]
    pub fn first_index(&self) -> usize {
        self.first_index
    }

    /// One past the last index.
    #[inline]
    pub fn end_index(&self) -> usize {
        self.first_index + self.values.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<f64> {
        index
            .checked_sub(self.first_index)
            .and_then(|i| self.values.get(i).copied())
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, &v)| (self.first_index + i, v))
    }

    /// Overlays `update` on top of this series.
    ///
    /// The result spans both ranges; values from `update` win. Indices covered by
    /// neither (a gap between them) carry the last known value forward.
    pub fn with_range_replaced(&self, update: &Level2D) -> Level2D {
        if self.is_empty() {
            return update.clone();
        }
        if update.is_empty() {
            return self.clone();
        }
        let first = self.first_index.min(update.first_index);
        let end = self.end_index().max(update.end_index());
        let mut values = Vec::with_capacity(end - first);
        let mut last = update.values[0];
        for index in first..end {
            let value = update.get(index).or_else(|| self.get(index)).unwrap_or(last);
            values.push(value);
            last = value;
        }
        Level2D::from_values(first, values)
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Level2D {
        Level2D::from_values(self.first_index, self.values.iter().map(|&v| f(v)).collect())
    }

    /// Level in microliters, given the volume of one pixel of capillary length.
    pub fn to_volume(&self, ul_per_px: f64) -> Level2D {
        self.map(|v| v * ul_per_px)
    }

    /// Values relative to the first one (`v[i] - v[first]`).
    pub fn relative_to_first(&self) -> Level2D {
        let base = self.values.first().copied().unwrap_or(0.0);
        self.map(|v| v - base)
    }
}

/// Append-only accumulator frozen into a [`Level2D`].
#[derive(Debug, Clone, Default)]
pub struct Level2DBuilder {
    first_index: usize,
    values: Vec<f64>,
}

impl Level2DBuilder {
    pub fn new(first_index: usize) -> Self {
        Self {
            first_index,
            values: Vec::new(),
        }
    }

    pub fn with_capacity(first_index: usize, capacity: usize) -> Self {
        Self {
            first_index,
            values: Vec::with_capacity(capacity),
        }
    }

    /// Appends the value of the next index.
    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn next_index(&self) -> usize {
        self.first_index + self.values.len()
    }

    pub fn freeze(self) -> Level2D {
        Level2D {
            first_index: self.first_index,
            values: self.values,
        }
    }
}
