//! # Band Index
//!
//! Candidate retrieval for fingerprint lookups without scanning every
//! reference row.
//!
//! ## How It Works
//! 1. Split each hex fingerprint into `max_distance + 1` contiguous bands
//! 2. Bucket every reference row by each band's text
//! 3. A query only compares against rows sharing at least one band
//!
//! A fingerprint within `d` bits differs in at most `d` nibbles, so with
//! `d + 1` bands at least one band is identical. With `d = 0` there is one
//! band and the index is a plain exact-match map. When `d + 1` exceeds the
//! number of nibbles the index degrades to a linear scan.

use crate::core::fingerprint::Fingerprint;
use crate::core::store::{FingerprintDataset, FingerprintRecord};
use std::collections::HashMap;
use std::ops::Range;

/// One indexed reference row
pub(crate) struct IndexedRow<'a> {
    pub dataset: &'a str,
    pub record: &'a FingerprintRecord,
}

/// Reference rows from every reference dataset, in dataset then row order
pub(crate) struct BandIndex<'a> {
    rows: Vec<IndexedRow<'a>>,
    /// Band boundaries; empty means linear scan
    bands: Vec<Range<usize>>,
    /// band_index -> (band text -> row indices in insertion order)
    tables: Vec<HashMap<&'a str, Vec<usize>>>,
}

impl<'a> BandIndex<'a> {
    /// Index every row of `references` for lookups within `max_distance`
    pub fn build(references: &'a [FingerprintDataset], width: usize, max_distance: u32) -> Self {
        let rows: Vec<IndexedRow<'a>> = references
            .iter()
            .flat_map(|dataset| {
                dataset.iter().map(move |record| IndexedRow {
                    dataset: dataset.label(),
                    record,
                })
            })
            .collect();

        let band_count = max_distance as usize + 1;
        let bands = if band_count <= width {
            split_bands(width, band_count)
        } else {
            Vec::new()
        };

        let mut tables: Vec<HashMap<&'a str, Vec<usize>>> =
            bands.iter().map(|_| HashMap::new()).collect();

        for (row_idx, row) in rows.iter().enumerate() {
            let text = row.record.fingerprint().as_str();
            for (band, range) in bands.iter().enumerate() {
                if let Some(slice) = text.get(range.clone()) {
                    tables[band].entry(slice).or_default().push(row_idx);
                }
            }
        }

        Self {
            rows,
            bands,
            tables,
        }
    }

    /// Whether lookups fall back to comparing every row
    pub fn is_linear(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn row(&self, idx: usize) -> &IndexedRow<'a> {
        &self.rows[idx]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Row indices that may lie within the indexed distance, ascending
    pub fn candidates(&self, fingerprint: &Fingerprint) -> Vec<usize> {
        if self.is_linear() {
            return (0..self.rows.len()).collect();
        }

        let text = fingerprint.as_str();
        let mut found: Vec<usize> = Vec::new();
        for (band, range) in self.bands.iter().enumerate() {
            let Some(slice) = text.get(range.clone()) else {
                continue;
            };
            if let Some(bucket) = self.tables[band].get(slice) {
                found.extend_from_slice(bucket);
            }
        }

        found.sort_unstable();
        found.dedup();
        found
    }
}

/// Split `width` nibbles into `count` contiguous, near-equal ranges
fn split_bands(width: usize, count: usize) -> Vec<Range<usize>> {
    let base = width / count;
    let extra = width % count;
    let mut start = 0;

    (0..count)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}
