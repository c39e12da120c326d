//! # Result Catalog
//!
//! Read model over comparison results, grouped by reference segment.
//!
//! Results live in a flat arena; the per-reference index is built lazily on
//! first read and rebuilt after explicit invalidation. Readers get slices
//! and copies, never live storage; all mutation goes through the explicit
//! update methods, so presentation code cannot corrupt comparison state.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::compare::AlignmentResult;
use crate::{RefId, StoredComparedTour, TourId};

/// Arena of [`AlignmentResult`] records with a lazy per-reference index.
#[derive(Debug, Default)]
pub struct ResultCatalog {
    results: Vec<AlignmentResult>,
    by_reference: HashMap<RefId, Vec<usize>>,
    index_dirty: bool,
}

/// Counts describing one catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    /// Reference segments with at least one result
    pub reference_count: u32,
    /// Total result records
    pub result_count: u32,
    /// Results carrying a persisted identity
    pub saved_count: u32,
}

impl ResultCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the catalog's contents with a new run's results.
    pub fn replace(&mut self, results: Vec<AlignmentResult>) {
        debug!("[ResultCatalog] Installing {} results", results.len());
        self.results = results;
        self.invalidate();
    }

    /// Drop the per-reference index; it is rebuilt on the next read.
    pub fn invalidate(&mut self) {
        self.by_reference.clear();
        self.index_dirty = true;
    }

    /// Remove every result.
    pub fn clear(&mut self) {
        self.results.clear();
        self.invalidate();
    }

    /// Total number of results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if the catalog holds no results.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// All results, in run order.
    pub fn results(&self) -> &[AlignmentResult] {
        &self.results
    }

    /// Reference ids that have at least one result, in ascending order.
    pub fn reference_ids(&mut self) -> Vec<RefId> {
        self.ensure_index();
        let mut ids: Vec<RefId> = self.by_reference.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Results matched against one reference segment, in run order.
    pub fn results_for(&mut self, ref_id: RefId) -> Vec<&AlignmentResult> {
        self.ensure_index();
        self.by_reference
            .get(&ref_id)
            .map(|indices| indices.iter().map(|&i| &self.results[i]).collect())
            .unwrap_or_default()
    }

    /// Stamp a persisted identity onto one result.
    ///
    /// Returns `false` when no result matches the (reference, tour) pair.
    pub fn mark_saved(&mut self, ref_id: RefId, tour_id: TourId, compared_id: i64) -> bool {
        match self
            .results
            .iter_mut()
            .find(|r| r.ref_id == ref_id && r.tour_id == tour_id)
        {
            Some(result) => {
                result.compared_id = Some(compared_id);
                true
            }
            None => false,
        }
    }

    /// Clear the persisted identity of one result.
    ///
    /// Returns `false` when no result matches the (reference, tour) pair.
    pub fn mark_unsaved(&mut self, ref_id: RefId, tour_id: TourId) -> bool {
        match self
            .results
            .iter_mut()
            .find(|r| r.ref_id == ref_id && r.tour_id == tour_id)
        {
            Some(result) => {
                result.compared_id = None;
                true
            }
            None => false,
        }
    }

    /// Stamp stored compare records onto matching results of one reference.
    ///
    /// `stored` maps tour id to the record persisted for that tour under
    /// this reference. Returns how many results were marked saved. A stored
    /// window whose indices differ from the computed ones still marks the
    /// result; the caller can compare the indices to surface the drift.
    pub fn apply_stored(
        &mut self,
        ref_id: RefId,
        stored: &HashMap<TourId, StoredComparedTour>,
    ) -> usize {
        let mut marked = 0;

        for result in self
            .results
            .iter_mut()
            .filter(|r| r.ref_id == ref_id)
        {
            if let Some(record) = stored.get(&result.tour_id) {
                result.compared_id = Some(record.compared_id);
                marked += 1;
            }
        }

        debug!(
            "[ResultCatalog] Applied {} stored records to reference {}",
            marked, ref_id
        );
        marked
    }

    /// Counts for this catalog.
    pub fn stats(&mut self) -> CatalogStats {
        self.ensure_index();
        CatalogStats {
            reference_count: self.by_reference.len() as u32,
            result_count: self.results.len() as u32,
            saved_count: self.results.iter().filter(|r| r.is_saved()).count() as u32,
        }
    }

    /// All results as a JSON array string.
    pub fn results_json(&self) -> String {
        serde_json::to_string(&self.results).unwrap_or_else(|_| "[]".to_string())
    }

    fn ensure_index(&mut self) {
        if !self.index_dirty {
            return;
        }

        self.by_reference.clear();
        for (index, result) in self.results.iter().enumerate() {
            self.by_reference
                .entry(result.ref_id)
                .or_default()
                .push(index);
        }
        self.index_dirty = false;
    }
}
