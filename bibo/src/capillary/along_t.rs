use crate::geometry::Polyline;
use crate::mask::{build_masks, Mask, MaskGeometry};

/// Geometry of a capillary valid from frame `start` until the next entry starts.
#[derive(Debug, Clone, PartialEq)]
pub struct AlongT {
    pub start: usize,
    pub polyline: Polyline,
    /// Sampling masks of `polyline`; empty until built for an image size.
    pub masks: Vec<Mask>,
}

impl AlongT {
    pub fn new(start: usize, polyline: Polyline) -> Self {
        Self {
            start,
            polyline,
            masks: Vec::new(),
        }
    }

    pub fn with_masks(start: usize, polyline: Polyline, geometry: &MaskGeometry) -> Self {
        let masks = build_masks(&polyline, geometry);
        Self {
            start,
            polyline,
            masks,
        }
    }
}

/// Entries sorted by `start`, one per start frame.
///
/// Entry `i` covers frames `[start_i, start_{i+1})`; the last one is open-ended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlongTList {
    entries: Vec<AlongT>,
}

impl AlongTList {
    /// Inserts `entry` in start order, replacing an entry with the same start.
    pub fn insert(&mut self, entry: AlongT) {
        match self.entries.binary_search_by_key(&entry.start, |e| e.start) {
            Ok(i) => self.entries[i] = entry,
            Err(i) => self.entries.insert(i, entry),
        }
    }

    /// Index of the entry covering `frame`.
    pub fn index_at(&self, frame: usize) -> Option<usize> {
        let upper = self.entries.partition_point(|e| e.start <= frame);
        upper.checked_sub(1)
    }

    pub fn at(&self, frame: usize) -> Option<&AlongT> {
        self.index_at(frame).map(|i| &self.entries[i])
    }

    /// Half-open frame interval of entry `index`; `None` as end means open-ended.
    pub fn interval(&self, index: usize) -> Option<(usize, Option<usize>)> {
        let entry = self.entries.get(index)?;
        Some((entry.start, self.entries.get(index + 1).map(|e| e.start)))
    }

    pub fn get(&self, index: usize) -> Option<&AlongT> {
        self.entries.get(index)
    }

    pub fn first(&self) -> Option<&AlongT> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlongT> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry starting after `frame`.
    pub fn truncate_after(&mut self, frame: usize) {
        self.entries.retain(|e| e.start <= frame);
    }

    pub fn rebuild_masks(&mut self, geometry: &MaskGeometry) {
        for entry in &mut self.entries {
            entry.masks = build_masks(&entry.polyline, geometry);
        }
    }

    /// Longest mask list over all entries; the kymograph height.
    pub fn max_mask_count(&self) -> usize {
        self.entries.iter().map(|e| e.masks.len()).max().unwrap_or(0)
    }
}
