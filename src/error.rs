//! Unified error handling for the tour-compare library.
//!
//! This module provides a consistent error type for all comparison
//! operations. Malformed series data is reported through these variants at
//! the normalizer boundary; the orchestrator catches them per pair so one
//! bad tour cannot abort a whole comparison run.

use std::fmt;

/// Unified error type for tour-compare operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TourCompareError {
    /// A distance or altitude series is empty
    EmptySeries,
    /// Parallel series of one tour have different lengths
    SeriesLengthMismatch {
        distance_len: usize,
        altitude_len: usize,
    },
    /// Time series length differs from the distance series
    TimeSeriesMismatch {
        distance_len: usize,
        time_len: usize,
    },
    /// An index range does not fit into the series it refers to
    RangeOutOfBounds {
        start_index: usize,
        end_index: usize,
        series_len: usize,
    },
    /// The normalization grid step must be positive
    InvalidStep { step: i32 },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for TourCompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TourCompareError::EmptySeries => {
                write!(f, "Distance or altitude series is empty")
            }
            TourCompareError::SeriesLengthMismatch {
                distance_len,
                altitude_len,
            } => {
                write!(
                    f,
                    "Series length mismatch: {} distance values, {} altitude values",
                    distance_len, altitude_len
                )
            }
            TourCompareError::TimeSeriesMismatch {
                distance_len,
                time_len,
            } => {
                write!(
                    f,
                    "Time series has {} samples, distance series {}",
                    time_len, distance_len
                )
            }
            TourCompareError::RangeOutOfBounds {
                start_index,
                end_index,
                series_len,
            } => {
                write!(
                    f,
                    "Range [{}, {}] is out of bounds for a series of {} samples",
                    start_index, end_index, series_len
                )
            }
            TourCompareError::InvalidStep { step } => {
                write!(f, "Normalization step must be positive, got {}", step)
            }
            TourCompareError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for TourCompareError {}

/// Result type alias for tour-compare operations.
pub type Result<T> = std::result::Result<T, TourCompareError>;
