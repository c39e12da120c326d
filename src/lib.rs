//! # Tour Compare
//!
//! Elevation-profile comparison and alignment for GPS tours.
//!
//! This library provides:
//! - Resampling of altitude/distance series onto a uniform distance grid
//! - Sliding-window alignment search between a reference segment and
//!   candidate tours
//! - A comparison orchestrator with progress reporting, cooperative
//!   cancellation and a background-thread wrapper
//! - A result catalog grouping matches by reference segment
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::HashMap;
//! use tour_compare::{
//!     compare_tours, CancellationToken, CompareConfig, NoBreaks, RawSeries, ReferenceSegment,
//! };
//!
//! let mut tours = HashMap::new();
//! tours.insert(
//!     1,
//!     RawSeries::new(
//!         vec![0, 100, 200, 300, 400],
//!         vec![100, 110, 120, 110, 100],
//!         vec![0, 25, 50, 75, 100],
//!     ),
//! );
//! tours.insert(
//!     2,
//!     RawSeries::new(
//!         vec![0, 100, 200, 300, 400, 500, 600],
//!         vec![100, 100, 110, 120, 110, 100, 100],
//!         vec![0, 30, 60, 90, 120, 150, 180],
//!     ),
//! );
//!
//! // the climb marked in tour 1 is searched for in tour 2
//! let reference = ReferenceSegment::new(10, 1, 0, 4);
//!
//! let run = compare_tours(
//!     &[reference],
//!     &[2],
//!     &tours,
//!     &NoBreaks,
//!     &CompareConfig::default(),
//!     &CancellationToken::new(),
//!     |_| {},
//! );
//!
//! assert_eq!(run.results.len(), 1);
//! let matched = &run.results[0];
//! println!(
//!     "matched window [{}, {}] at {:.1} km/h",
//!     matched.start_index, matched.end_index, matched.speed
//! );
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TourCompareError};

// Series normalization (uniform distance grid)
pub mod normalizer;
pub use normalizer::{normalize, NormalizedSeries, NORMALIZED_STEP};

// Alignment search (sliding-window profile matching)
pub mod alignment;
pub use alignment::{find_best_alignment, map_scores_to_raw, recover_raw_window, Alignment};

// Compare orchestrator (pair loop, progress, cancellation, background runs)
pub mod compare;
pub use compare::{
    compare_tours, compare_tours_background, AlignmentResult, BreakTimeCalculator,
    CancellationToken, CompareEvent, CompareHandle, CompareProgress, CompareRun, NoBreaks,
    RunOutcome, SeriesProvider, SliceSpeedBreaks,
};

// Result catalog (per-reference read model)
pub mod catalog;
pub use catalog::{CatalogStats, ResultCatalog};

// Stateful comparison context
pub mod engine;
pub use engine::{CompareEngine, EngineStats};

// ============================================================================
// Core Types
// ============================================================================

/// Identifier of a tour.
pub type TourId = i64;

/// Identifier of a reference segment.
pub type RefId = i64;

/// Raw recording of one tour as parallel series.
///
/// `distance` is cumulative and monotonically non-decreasing, `altitude` is
/// signed, `time` is cumulative seconds. All three series share length and
/// index alignment; [`validate`](RawSeries::validate) enforces this. The
/// comparison core only ever reads these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSeries {
    /// Cumulative distance per sample
    pub distance: Vec<i32>,
    /// Altitude per sample
    pub altitude: Vec<i32>,
    /// Cumulative seconds per sample
    pub time: Vec<i32>,
}

impl RawSeries {
    /// Create a raw series from its parallel arrays.
    pub fn new(distance: Vec<i32>, altitude: Vec<i32>, time: Vec<i32>) -> Self {
        Self {
            distance,
            altitude,
            time,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.distance.len()
    }

    /// Check if the series has no samples.
    pub fn is_empty(&self) -> bool {
        self.distance.is_empty()
    }

    /// Check that the parallel arrays are non-empty and of equal length.
    pub fn validate(&self) -> Result<()> {
        if self.distance.is_empty() || self.altitude.is_empty() {
            return Err(TourCompareError::EmptySeries);
        }
        if self.distance.len() != self.altitude.len() {
            return Err(TourCompareError::SeriesLengthMismatch {
                distance_len: self.distance.len(),
                altitude_len: self.altitude.len(),
            });
        }
        if self.distance.len() != self.time.len() {
            return Err(TourCompareError::TimeSeriesMismatch {
                distance_len: self.distance.len(),
                time_len: self.time.len(),
            });
        }
        Ok(())
    }
}

/// A user-marked segment of a tour, the template a comparison searches for.
///
/// `start_index` and `end_index` form a closed range into the tour's raw
/// series. Immutable once handed to the comparison core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSegment {
    /// Identifier of this reference segment
    pub ref_id: RefId,
    /// Tour the segment was marked in
    pub tour_id: TourId,
    /// First raw sample of the segment
    pub start_index: usize,
    /// Last raw sample of the segment (inclusive)
    pub end_index: usize,
    /// Display name
    pub label: String,
}

impl ReferenceSegment {
    /// Create a reference segment without a label.
    pub fn new(ref_id: RefId, tour_id: TourId, start_index: usize, end_index: usize) -> Self {
        Self {
            ref_id,
            tour_id,
            start_index,
            end_index,
            label: String::new(),
        }
    }

    /// Attach a display name.
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }
}

/// Configuration for comparison runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Distance-grid step used by the normalizer.
    /// Default: 100 distance units per normalized sample
    pub normalize_step: i32,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            normalize_step: NORMALIZED_STEP,
        }
    }
}

/// A compare record as external storage persists it.
///
/// The core never writes these; the catalog uses them to stamp saved state
/// onto in-memory results and to let callers surface drift between stored
/// and freshly computed windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredComparedTour {
    /// Identity of the persisted record
    pub compared_id: i64,
    /// Stored start of the matched window
    pub start_index: usize,
    /// Stored end of the matched window
    pub end_index: usize,
    /// Stored speed in km/h
    pub speed: f32,
}

// ============================================================================
// Tests
// ============================================================================
