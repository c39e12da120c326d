//! # Compare Engine
//!
//! Stateful comparison context that keeps all tour data in one place.
//!
//! The engine owns the tour store, the reference segments, the comparison
//! configuration, and the result catalog. It is an explicit context object:
//! the host application constructs it, passes it to whatever needs it, and
//! tears it down with the application lifecycle. There is no process-global
//! instance and no lazy static behind it.

use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::catalog::ResultCatalog;
use crate::compare::{
    compare_tours, compare_tours_background, BreakTimeCalculator, CancellationToken,
    CompareHandle, CompareProgress, CompareRun, NoBreaks, SeriesProvider,
};
use crate::{CompareConfig, RawSeries, RefId, ReferenceSegment, TourId};

/// Counts describing one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Tours in the store
    pub tour_count: u32,
    /// Reference segments registered
    pub reference_count: u32,
    /// Results currently held by the catalog
    pub result_count: u32,
}

/// The comparison context object.
///
/// Maintains tours, reference segments and results between runs. State is
/// never handed out by reference: series reads clone, reference reads copy,
/// and all mutation goes through explicit methods.
pub struct CompareEngine {
    tours: HashMap<TourId, RawSeries>,
    references: Vec<ReferenceSegment>,
    catalog: ResultCatalog,
    config: CompareConfig,
    breaks: Arc<dyn BreakTimeCalculator + Send + Sync>,
}

impl CompareEngine {
    /// Create an engine with default configuration and no break-time model.
    pub fn new() -> Self {
        Self::with_config(CompareConfig::default())
    }

    /// Create an engine with custom configuration.
    pub fn with_config(config: CompareConfig) -> Self {
        Self {
            tours: HashMap::new(),
            references: Vec::new(),
            catalog: ResultCatalog::new(),
            config,
            breaks: Arc::new(NoBreaks),
        }
    }

    /// Replace the break-time model used for driving-time computation.
    pub fn set_break_time_calculator(
        &mut self,
        breaks: Arc<dyn BreakTimeCalculator + Send + Sync>,
    ) {
        self.breaks = breaks;
    }

    // ========================================================================
    // Tour Store
    // ========================================================================

    /// Add or replace a tour's raw series.
    pub fn add_tour(&mut self, tour_id: TourId, series: RawSeries) {
        self.tours.insert(tour_id, series);
    }

    /// Remove a tour. Existing results referring to it stay in the catalog
    /// until the next run replaces them.
    pub fn remove_tour(&mut self, tour_id: TourId) {
        self.tours.remove(&tour_id);
    }

    /// Check if a tour is in the store.
    pub fn has_tour(&self, tour_id: TourId) -> bool {
        self.tours.contains_key(&tour_id)
    }

    /// All tour ids in the store, in ascending order.
    pub fn tour_ids(&self) -> Vec<TourId> {
        let mut ids: Vec<TourId> = self.tours.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of tours in the store.
    pub fn tour_count(&self) -> usize {
        self.tours.len()
    }

    // ========================================================================
    // Reference Segments
    // ========================================================================

    /// Register a reference segment.
    pub fn add_reference(&mut self, reference: ReferenceSegment) {
        self.references.push(reference);
    }

    /// Remove a reference segment by its id.
    pub fn remove_reference(&mut self, ref_id: RefId) {
        self.references.retain(|r| r.ref_id != ref_id);
    }

    /// Registered reference segments, copied.
    pub fn references(&self) -> Vec<ReferenceSegment> {
        self.references.clone()
    }

    /// Number of registered reference segments.
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    // ========================================================================
    // Comparison
    // ========================================================================

    /// Compare all registered references against the given candidates and
    /// install the results into the catalog.
    pub fn compare(
        &mut self,
        candidate_ids: &[TourId],
        cancel: &CancellationToken,
        on_progress: impl FnMut(CompareProgress),
    ) -> CompareRun {
        let run = compare_tours(
            &self.references,
            candidate_ids,
            &self.tours,
            &self.breaks,
            &self.config,
            cancel,
            on_progress,
        );

        self.catalog.replace(run.results.clone());
        run
    }

    /// Compare all registered references against every stored tour, in
    /// ascending tour-id order.
    pub fn compare_all(
        &mut self,
        cancel: &CancellationToken,
        on_progress: impl FnMut(CompareProgress),
    ) -> CompareRun {
        let candidate_ids = self.tour_ids();
        self.compare(&candidate_ids, cancel, on_progress)
    }

    /// Start a comparison run on a background thread.
    ///
    /// The run works on a snapshot of the engine's state taken at call time;
    /// later mutations do not affect it. Install the finished run's results
    /// with [`apply_run`](CompareEngine::apply_run).
    pub fn compare_background(&self, candidate_ids: Vec<TourId>) -> CompareHandle {
        info!(
            "[CompareEngine] Starting background run: {} references, {} candidates",
            self.references.len(),
            candidate_ids.len()
        );

        compare_tours_background(
            self.references.clone(),
            candidate_ids,
            self.tours.clone(),
            Arc::clone(&self.breaks),
            self.config.clone(),
        )
    }

    /// Install a finished run's results into the catalog.
    pub fn apply_run(&mut self, run: &CompareRun) {
        self.catalog.replace(run.results.clone());
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Read access to the result catalog.
    pub fn catalog(&self) -> &ResultCatalog {
        &self.catalog
    }

    /// Mutable access to the result catalog, for saved-state updates.
    pub fn catalog_mut(&mut self) -> &mut ResultCatalog {
        &mut self.catalog
    }

    /// All results as a JSON array string.
    pub fn results_json(&self) -> String {
        self.catalog.results_json()
    }

    /// Counts for this engine.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            tour_count: self.tours.len() as u32,
            reference_count: self.references.len() as u32,
            result_count: self.catalog.len() as u32,
        }
    }

    /// Drop all tours, references and results.
    pub fn clear(&mut self) {
        self.tours.clear();
        self.references.clear();
        self.catalog.clear();
        info!("[CompareEngine] Cleared");
    }
}

impl Default for CompareEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesProvider for CompareEngine {
    fn raw_series(&self, tour_id: TourId) -> Option<RawSeries> {
        self.tours.get(&tour_id).cloned()
    }
}
