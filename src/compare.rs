//! # Compare Orchestrator
//!
//! Runs reference segments against candidate tours and assembles one
//! [`AlignmentResult`] per matched pair.
//!
//! The orchestrator is deliberately single-threaded and deterministic: the
//! brute-force alignment search is the bottleneck and gains nothing from
//! intra-run parallelism. For callers that must not block, a background
//! wrapper runs the same loop on a worker thread and reports through a
//! channel-backed [`CompareHandle`] with cooperative cancellation.
//!
//! Skip rules, not errors: candidates without usable data, references
//! without tour data, and pairs without a valid alignment all drop out of
//! the result list. Malformed series are caught per pair at the normalizer
//! boundary and logged, so one bad tour never aborts a run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::alignment::{find_best_alignment, map_scores_to_raw, recover_raw_window};
use crate::error::Result;
use crate::normalizer::normalize;
use crate::{CompareConfig, RawSeries, RefId, ReferenceSegment, TourId};

/// Conversion factor from distance-units-per-second to km/h.
const MS_TO_KMH: f32 = 3.6;

// ============================================================================
// Collaborator Seams
// ============================================================================

/// Source of raw tour series, keyed by tour id.
///
/// Loading a series is the expensive step of a comparison run; the
/// orchestrator loads each candidate once and shares it across all
/// references.
pub trait SeriesProvider {
    /// Load the raw series for a tour, or `None` when the tour is unknown.
    fn raw_series(&self, tour_id: TourId) -> Option<RawSeries>;
}

impl SeriesProvider for HashMap<TourId, RawSeries> {
    fn raw_series(&self, tour_id: TourId) -> Option<RawSeries> {
        self.get(&tour_id).cloned()
    }
}

/// Computes the break time within a window of a raw series.
///
/// Break time is idle/stopped time that gets subtracted from recording time
/// to obtain driving time.
pub trait BreakTimeCalculator {
    /// Break time in seconds within `[start_index, end_index]`.
    fn break_time(&self, series: &RawSeries, start_index: usize, end_index: usize) -> i32;
}

impl<T: BreakTimeCalculator + ?Sized> BreakTimeCalculator for Arc<T> {
    fn break_time(&self, series: &RawSeries, start_index: usize, end_index: usize) -> i32 {
        (**self).break_time(series, start_index, end_index)
    }
}

/// Break-time calculator that reports no breaks at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBreaks;

impl BreakTimeCalculator for NoBreaks {
    fn break_time(&self, _series: &RawSeries, _start_index: usize, _end_index: usize) -> i32 {
        0
    }
}

/// Break-time calculator counting time slices slower than a minimum speed.
///
/// A slice between two adjacent samples counts entirely as break time when
/// its average speed falls below `min_slice_speed` (km/h).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliceSpeedBreaks {
    /// Minimum slice speed in km/h; slower slices count as break time
    pub min_slice_speed: f32,
}

impl Default for SliceSpeedBreaks {
    fn default() -> Self {
        Self {
            min_slice_speed: 1.0,
        }
    }
}

impl BreakTimeCalculator for SliceSpeedBreaks {
    fn break_time(&self, series: &RawSeries, start_index: usize, end_index: usize) -> i32 {
        let end_index = end_index.min(series.len().saturating_sub(1));
        let mut break_seconds = 0;

        for index in start_index..end_index {
            let slice_time = series.time[index + 1] - series.time[index];
            if slice_time <= 0 {
                continue;
            }

            let slice_distance = series.distance[index + 1] - series.distance[index];
            let slice_speed = slice_distance as f32 / slice_time as f32 * MS_TO_KMH;

            if slice_speed < self.min_slice_speed {
                break_seconds += slice_time;
            }
        }

        break_seconds
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result of comparing one reference segment against one candidate tour.
///
/// Immutable after creation; saved-state is stamped on through the result
/// catalog, never by mutating a shared instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    /// Reference segment this result was matched against
    pub ref_id: RefId,
    /// Candidate tour the window was found in
    pub tour_id: TourId,
    /// Start of the matched window in the candidate's raw series
    pub start_index: usize,
    /// End of the matched window in the candidate's raw series
    pub end_index: usize,
    /// Start of the matched window in the candidate's normalized series
    pub normalized_start_index: usize,
    /// End of the matched window in the candidate's normalized series
    pub normalized_end_index: usize,
    /// Cumulative absolute altitude difference at the winning offset
    pub min_altitude_diff: u64,
    /// Altitude-difference score per raw candidate sample, for
    /// visualization; `-1` where no full-length window fits
    pub altitude_diff_series: Vec<i64>,
    /// Distance covered by the matched window
    pub distance: i32,
    /// Elapsed seconds over the matched window
    pub recording_time: i32,
    /// Recording time minus break time
    pub driving_time: i32,
    /// Average speed over the matched window in km/h
    pub speed: f32,
    /// Identity of the persisted compare record, `None` while unsaved
    pub compared_id: Option<i64>,
}

impl AlignmentResult {
    /// Whether this result carries a persisted identity.
    pub fn is_saved(&self) -> bool {
        self.compared_id.is_some()
    }
}

/// Progress of a comparison run, reported once per attempted pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareProgress {
    /// Pairs attempted so far, monotonically increasing
    pub pairs_done: u32,
    /// Total pair count known up front
    pub pairs_total: u32,
}

/// Terminal state of a comparison run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Every candidate was processed
    Completed,
    /// The run was cancelled; results hold all pairs completed before that
    Cancelled,
}

/// Everything a comparison run produced.
///
/// A cancelled run is not an error: its results are exactly as valid as a
/// completed run's, there are just fewer of them. `pairs_attempted` can be
/// less than `pairs_total` even on completion, because candidates without
/// usable data are skipped wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareRun {
    /// One result per matched (reference, candidate) pair
    pub results: Vec<AlignmentResult>,
    /// How the run ended
    pub outcome: RunOutcome,
    /// Pairs actually attempted
    pub pairs_attempted: u32,
    /// Total pair count known up front
    pub pairs_total: u32,
}

impl CompareRun {
    /// Whether the run ended through cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.outcome == RunOutcome::Cancelled
    }
}

/// Shared flag for cooperative cancellation.
///
/// Clones share the same flag. The orchestrator checks it between pair
/// iterations; flipping it mid-pair takes effect before the next pair.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Compare every reference segment against every candidate tour.
///
/// Candidates form the outer loop so each candidate's series is loaded once
/// and shared across all references; reference series are loaded once up
/// front. Progress is reported through `on_progress` once per attempted
/// pair. Cancellation is checked between pairs; a cancelled run returns all
/// results completed up to that point.
pub fn compare_tours<P, B>(
    references: &[ReferenceSegment],
    candidate_ids: &[TourId],
    provider: &P,
    breaks: &B,
    config: &CompareConfig,
    cancel: &CancellationToken,
    mut on_progress: impl FnMut(CompareProgress),
) -> CompareRun
where
    P: SeriesProvider + ?Sized,
    B: BreakTimeCalculator + ?Sized,
{
    let pairs_total = (references.len() * candidate_ids.len()) as u32;

    info!(
        "[TourCompare] Comparing {} reference segments against {} tours ({} pairs)",
        references.len(),
        candidate_ids.len(),
        pairs_total
    );

    // reference series are shared across every candidate, load them once
    let reference_series: Vec<Option<RawSeries>> = references
        .iter()
        .map(|reference| provider.raw_series(reference.tour_id))
        .collect();

    let mut results = Vec::new();
    let mut pairs_done = 0u32;

    for &candidate_id in candidate_ids {
        let candidate = match provider.raw_series(candidate_id) {
            Some(series) if !series.time.is_empty() => series,
            _ => {
                debug!(
                    "[TourCompare] Tour {} has no time series, skipping",
                    candidate_id
                );
                continue;
            }
        };

        for (reference, ref_series) in references.iter().zip(&reference_series) {
            if cancel.is_cancelled() {
                info!(
                    "[TourCompare] Cancelled after {}/{} pairs, {} results",
                    pairs_done,
                    pairs_total,
                    results.len()
                );
                return CompareRun {
                    results,
                    outcome: RunOutcome::Cancelled,
                    pairs_attempted: pairs_done,
                    pairs_total,
                };
            }

            match ref_series {
                Some(ref_series) => {
                    match compare_pair(reference, ref_series, candidate_id, &candidate, breaks, config)
                    {
                        Ok(Some(result)) => results.push(result),
                        Ok(None) => debug!(
                            "[TourCompare] Tour {} holds no window matching reference {}",
                            candidate_id, reference.ref_id
                        ),
                        Err(err) => warn!(
                            "[TourCompare] Skipping pair (reference {}, tour {}): {}",
                            reference.ref_id, candidate_id, err
                        ),
                    }
                }
                None => warn!(
                    "[TourCompare] Reference {} has no tour data, skipping pair",
                    reference.ref_id
                ),
            }

            pairs_done += 1;
            on_progress(CompareProgress {
                pairs_done,
                pairs_total,
            });
        }
    }

    info!(
        "[TourCompare] Completed with {} results from {}/{} pairs",
        results.len(),
        pairs_done,
        pairs_total
    );

    CompareRun {
        results,
        outcome: RunOutcome::Completed,
        pairs_attempted: pairs_done,
        pairs_total,
    }
}

/// Compare one reference segment against one candidate tour.
///
/// Returns `Ok(None)` when the candidate holds no full-length window, an
/// error when either series is malformed.
fn compare_pair<B>(
    reference: &ReferenceSegment,
    reference_series: &RawSeries,
    tour_id: TourId,
    candidate: &RawSeries,
    breaks: &B,
    config: &CompareConfig,
) -> Result<Option<AlignmentResult>>
where
    B: BreakTimeCalculator + ?Sized,
{
    candidate.validate()?;
    reference_series.validate()?;

    let step = config.normalize_step;

    // the candidate is normalized over its whole length, the reference only
    // over its marked segment
    let norm_candidate = normalize(
        &candidate.distance,
        &candidate.altitude,
        0,
        candidate.len() - 1,
        step,
    )?;
    let norm_reference = normalize(
        &reference_series.distance,
        &reference_series.altitude,
        reference.start_index,
        reference.end_index,
        step,
    )?;

    let alignment = match find_best_alignment(&norm_reference.altitude, &norm_candidate.altitude) {
        Some(alignment) => alignment,
        None => return Ok(None),
    };

    // distance span the reference segment covers in its own tour
    let reference_distance = reference_series.distance[reference.end_index]
        - reference_series.distance[reference.start_index];

    let window_start_distance = norm_candidate.distance[alignment.norm_start_index];
    let window_end_distance = window_start_distance + reference_distance;

    let (start_index, end_index) = recover_raw_window(
        &candidate.distance,
        window_start_distance,
        window_end_distance,
    );

    let altitude_diff_series = map_scores_to_raw(
        &candidate.distance,
        &norm_candidate.distance,
        &alignment.offset_scores,
    );

    let distance = candidate.distance[end_index] - candidate.distance[start_index];
    let recording_time = candidate.time[end_index] - candidate.time[start_index];
    let driving_time =
        (recording_time - breaks.break_time(candidate, start_index, end_index)).max(0);
    let speed = if driving_time > 0 {
        distance as f32 / driving_time as f32 * MS_TO_KMH
    } else {
        0.0
    };

    Ok(Some(AlignmentResult {
        ref_id: reference.ref_id,
        tour_id,
        start_index,
        end_index,
        normalized_start_index: alignment.norm_start_index,
        normalized_end_index: alignment.norm_start_index + (reference_distance / step) as usize,
        min_altitude_diff: alignment.min_diff,
        altitude_diff_series,
        distance,
        recording_time,
        driving_time,
        speed,
        compared_id: None,
    }))
}

// ============================================================================
// Background Execution
// ============================================================================

/// Event emitted by a background comparison run.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareEvent {
    /// One more pair was attempted
    Progress(CompareProgress),
    /// The run finished; this is always the last event
    Finished(CompareRun),
}

/// Handle for a comparison run executing on a background thread.
///
/// Poll with [`try_next`](CompareHandle::try_next), block with
/// [`wait`](CompareHandle::wait), or request cooperative cancellation with
/// [`cancel`](CompareHandle::cancel). Dropping the handle detaches the
/// worker; it finishes on its own and its sends go nowhere.
pub struct CompareHandle {
    events: mpsc::Receiver<CompareEvent>,
    cancel: CancellationToken,
}

impl CompareHandle {
    /// Request cancellation; the worker stops between pair iterations.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check for the next event (non-blocking).
    pub fn try_next(&self) -> Option<CompareEvent> {
        self.events.try_recv().ok()
    }

    /// Wait for the run to finish (blocking), discarding progress events.
    ///
    /// Returns `None` when the worker died without delivering a result.
    pub fn wait(self) -> Option<CompareRun> {
        loop {
            match self.events.recv() {
                Ok(CompareEvent::Finished(run)) => return Some(run),
                Ok(CompareEvent::Progress(_)) => {}
                Err(_) => return None,
            }
        }
    }
}

/// Run [`compare_tours`] on a background thread.
///
/// Progress and the final run flow through the returned handle as
/// fire-and-forget events; a dropped handle never blocks the worker.
pub fn compare_tours_background<P, B>(
    references: Vec<ReferenceSegment>,
    candidate_ids: Vec<TourId>,
    provider: P,
    breaks: B,
    config: CompareConfig,
) -> CompareHandle
where
    P: SeriesProvider + Send + 'static,
    B: BreakTimeCalculator + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();

    thread::spawn(move || {
        let progress_tx = tx.clone();
        let run = compare_tours(
            &references,
            &candidate_ids,
            &provider,
            &breaks,
            &config,
            &worker_cancel,
            move |progress| {
                progress_tx.send(CompareEvent::Progress(progress)).ok();
            },
        );
        tx.send(CompareEvent::Finished(run)).ok();
    });

    CompareHandle { events: rx, cancel }
}

// ============================================================================
// Tests
// ============================================================================
