//! Series normalization for elevation-profile comparison.
//!
//! Raw tour recordings sample at irregular distance intervals (one point per
//! GPS fix). Comparing two tours sample-by-sample is meaningless until both
//! are resampled onto the same distance grid. This module resamples an
//! altitude/distance series onto a uniform grid with a fixed step, linearly
//! interpolating altitude between the bracketing raw samples.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TourCompareError};

/// Default grid step in distance units (one normalized sample per 100 units).
pub const NORMALIZED_STEP: i32 = 100;

/// An altitude series resampled onto a uniform distance grid.
///
/// `distance` holds exact multiples of the step used for normalization;
/// `altitude` holds the interpolated altitude at each grid point. Both
/// arrays always have the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedSeries {
    /// Grid distances, strictly increasing by the normalization step
    pub distance: Vec<i32>,
    /// Interpolated altitude at each grid distance
    pub altitude: Vec<i32>,
}

impl NormalizedSeries {
    /// Number of grid samples.
    pub fn len(&self) -> usize {
        self.altitude.len()
    }

    /// Check if the series has no samples.
    pub fn is_empty(&self) -> bool {
        self.altitude.is_empty()
    }
}

/// Resample the `[start_index, end_index]` range of an altitude/distance
/// series onto a uniform grid with the given step.
///
/// The grid starts at `floor(distance[start_index] / step) * step` and ends
/// at `floor(distance[end_index] / step) * step`, inclusive. Altitude at
/// each grid point is linearly interpolated between the raw samples that
/// bracket it. When two raw samples share the same distance (a zero-length
/// segment in the recording) the interpolation term is dropped and the
/// earlier sample's altitude is used.
///
/// Grid points that fall before the first raw sample of the range (the
/// floor of the start distance) are clamped to that sample's altitude.
///
/// # Errors
///
/// - [`TourCompareError::EmptySeries`] when either input series is empty
/// - [`TourCompareError::SeriesLengthMismatch`] when the series differ in length
/// - [`TourCompareError::RangeOutOfBounds`] when the range does not fit
/// - [`TourCompareError::InvalidStep`] when `step` is not positive
pub fn normalize(
    distance: &[i32],
    altitude: &[i32],
    start_index: usize,
    end_index: usize,
    step: i32,
) -> Result<NormalizedSeries> {
    if step <= 0 {
        return Err(TourCompareError::InvalidStep { step });
    }
    if distance.is_empty() || altitude.is_empty() {
        return Err(TourCompareError::EmptySeries);
    }
    if distance.len() != altitude.len() {
        return Err(TourCompareError::SeriesLengthMismatch {
            distance_len: distance.len(),
            altitude_len: altitude.len(),
        });
    }
    if start_index > end_index || end_index >= distance.len() {
        return Err(TourCompareError::RangeOutOfBounds {
            start_index,
            end_index,
            series_len: distance.len(),
        });
    }

    let norm_start = distance[start_index] / step;
    let norm_end = distance[end_index] / step;
    let norm_len = (norm_end - norm_start + 1) as usize;

    let mut norm_distance = Vec::with_capacity(norm_len);
    let mut norm_altitude = Vec::with_capacity(norm_len);

    // cursor into the raw series, only ever moves forward
    let mut next_index = start_index;

    for norm_index in 0..norm_len {
        let target = (norm_start + norm_index as i32) * step;

        // advance until the cursor sample is at or beyond the grid point
        while next_index < end_index && distance[next_index] < target {
            next_index += 1;
        }

        let prev_index = if next_index > start_index {
            next_index - 1
        } else {
            start_index
        };

        let prev_distance = distance[prev_index];
        let next_distance = distance[next_index];

        let interpolated = if next_distance == prev_distance {
            altitude[prev_index]
        } else {
            let span = (next_distance - prev_distance) as i64;
            let offset = (target - prev_distance) as i64;
            let rise = (altitude[next_index] - altitude[prev_index]) as i64;
            (altitude[prev_index] as i64 + rise * offset / span) as i32
        };

        norm_distance.push(target);
        norm_altitude.push(interpolated);
    }

    Ok(NormalizedSeries {
        distance: norm_distance,
        altitude: norm_altitude,
    })
}
