//! Sliding-window alignment search over normalized altitude series.
//!
//! This module provides the core profile comparison: given a reference
//! altitude series and a candidate altitude series on the same distance
//! grid, it finds the candidate offset whose window matches the reference
//! profile with the lowest cumulative absolute altitude difference. The
//! search is a brute-force O(candidate × reference) scan, which is
//! acceptable because normalization has already reduced both series to one
//! sample per grid step rather than one per GPS fix.

/// Outcome of a successful alignment search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    /// Offset of the best-matching window in the candidate's normalized series
    pub norm_start_index: usize,
    /// Cumulative absolute altitude difference at the winning offset
    pub min_diff: u64,
    /// Score per candidate offset; `None` where no full-length window fits
    pub offset_scores: Vec<Option<u64>>,
}

/// Find the candidate offset whose window best matches the reference profile.
///
/// Every offset is scored as the sum of absolute altitude differences over
/// the full reference length. Offsets whose window would overrun the end of
/// the candidate series are rejected outright, never scored partially, so
/// only full-length alignments compete. Ties are won by the lowest offset
/// (ascending scan, strict comparison).
///
/// Returns `None` only when no offset admits a full-length window, i.e. the
/// candidate series is shorter than the reference. A candidate that diverges
/// badly from the reference still produces the least-bad offset.
pub fn find_best_alignment(
    norm_ref_altitude: &[i32],
    norm_cand_altitude: &[i32],
) -> Option<Alignment> {
    if norm_ref_altitude.is_empty() || norm_cand_altitude.is_empty() {
        return None;
    }

    let ref_len = norm_ref_altitude.len();
    let cand_len = norm_cand_altitude.len();

    let mut offset_scores: Vec<Option<u64>> = vec![None; cand_len];
    let mut best: Option<(usize, u64)> = None;

    for offset in 0..cand_len {
        // windows running past the candidate tail are rejected, and every
        // later offset only gets shorter
        if offset + ref_len > cand_len {
            break;
        }

        let score: u64 = norm_ref_altitude
            .iter()
            .zip(&norm_cand_altitude[offset..offset + ref_len])
            .map(|(&r, &c)| (r as i64 - c as i64).unsigned_abs())
            .sum();

        offset_scores[offset] = Some(score);

        match best {
            Some((_, min_diff)) if score >= min_diff => {}
            _ => best = Some((offset, score)),
        }
    }

    best.map(|(norm_start_index, min_diff)| Alignment {
        norm_start_index,
        min_diff,
        offset_scores,
    })
}

/// Map a matched window, given by its start and end distances, back onto raw
/// sample indices.
///
/// Both indices are found by scanning for the first raw sample at or beyond
/// the target distance, clamped to the last sample when the scan exhausts
/// the series. The start is exact under that rule; the end is approximate:
/// the recovered window best matches the reference's real-world distance
/// span, not its raw sample count. The series must be non-empty.
pub fn recover_raw_window(
    raw_distance: &[i32],
    window_start_distance: i32,
    window_end_distance: i32,
) -> (usize, usize) {
    let last = raw_distance.len() - 1;

    let mut start_index = 0;
    while start_index < raw_distance.len() && raw_distance[start_index] < window_start_distance {
        start_index += 1;
    }
    let start_index = start_index.min(last);

    let mut end_index = start_index;
    while end_index < raw_distance.len() && raw_distance[end_index] < window_end_distance {
        end_index += 1;
    }
    let end_index = end_index.min(last);

    (start_index, end_index)
}

/// Spread per-offset scores over the raw candidate series for visualization.
///
/// Each raw sample is assigned the score of the nearest normalized sample at
/// or beyond its distance. Offsets with no full-length window are encoded as
/// `-1` in the output; this sentinel exists only in this presentation series
/// and plays no part in the matching decision.
pub fn map_scores_to_raw(
    raw_distance: &[i32],
    norm_distance: &[i32],
    offset_scores: &[Option<u64>],
) -> Vec<i64> {
    if norm_distance.is_empty() {
        return vec![-1; raw_distance.len()];
    }

    let max_norm_index = norm_distance.len() - 1;
    let mut norm_index = 0;

    raw_distance
        .iter()
        .map(|&raw| {
            while norm_index < max_norm_index && raw > norm_distance[norm_index] {
                norm_index += 1;
            }
            offset_scores[norm_index].map_or(-1, |score| score as i64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_subsequence_scores_zero() {
        let reference = vec![100, 110, 120, 110, 100];
        let candidate = vec![100, 100, 110, 120, 110, 100, 100];

        let alignment = find_best_alignment(&reference, &candidate).unwrap();

        assert_eq!(alignment.norm_start_index, 1);
        assert_eq!(alignment.min_diff, 0);
    }

    #[test]
    fn test_full_window_invariant() {
        let reference = vec![5, 5, 5];
        let candidate = vec![9, 1, 5, 5, 5, 9];

        let alignment = find_best_alignment(&reference, &candidate).unwrap();

        assert!(alignment.norm_start_index + reference.len() <= candidate.len());
        // tail offsets cannot hold a full window
        assert_eq!(alignment.offset_scores[4], None);
        assert_eq!(alignment.offset_scores[5], None);
    }

    #[test]
    fn test_tie_break_takes_first_offset() {
        // repeating pattern: offsets 0 and 2 both score zero
        let reference = vec![1, 2];
        let candidate = vec![1, 2, 1, 2];

        let alignment = find_best_alignment(&reference, &candidate).unwrap();

        assert_eq!(alignment.offset_scores[0], Some(0));
        assert_eq!(alignment.offset_scores[2], Some(0));
        assert_eq!(alignment.norm_start_index, 0);
    }

    #[test]
    fn test_diverging_candidate_still_matches_least_bad() {
        // difference grows with every offset; offset 0 is least bad
        let reference = vec![0, 0, 0];
        let candidate = vec![1, 2, 3, 4, 5, 6];

        let alignment = find_best_alignment(&reference, &candidate).unwrap();

        assert_eq!(alignment.norm_start_index, 0);
        assert_eq!(alignment.min_diff, 6);
    }

    #[test]
    fn test_candidate_shorter_than_reference_not_found() {
        let reference = vec![1, 2, 3, 4];
        let candidate = vec![1, 2, 3];

        assert_eq!(find_best_alignment(&reference, &candidate), None);
    }

    #[test]
    fn test_equal_length_single_offset() {
        let reference = vec![1, 2, 3];
        let candidate = vec![2, 2, 2];

        let alignment = find_best_alignment(&reference, &candidate).unwrap();

        assert_eq!(alignment.norm_start_index, 0);
        assert_eq!(alignment.min_diff, 2);
        assert_eq!(alignment.offset_scores, vec![Some(2), None, None]);
    }

    #[test]
    fn test_recover_raw_window() {
        let raw_distance = vec![0, 100, 200, 300, 400, 500, 600];

        assert_eq!(recover_raw_window(&raw_distance, 100, 500), (1, 5));
        // targets between samples land on the next sample
        assert_eq!(recover_raw_window(&raw_distance, 150, 450), (2, 5));
    }

    #[test]
    fn test_recover_raw_window_clamps_to_last_sample() {
        let raw_distance = vec![0, 100, 200];

        assert_eq!(recover_raw_window(&raw_distance, 150, 900), (2, 2));
    }

    #[test]
    fn test_map_scores_to_raw_carries_nearest() {
        let raw_distance = vec![0, 40, 110, 250];
        let norm_distance = vec![0, 100, 200, 300];
        let scores = vec![Some(7), Some(3), None, Some(9)];

        let mapped = map_scores_to_raw(&raw_distance, &norm_distance, &scores);

        // raw 110 maps to the grid sample at 200, which has no full window
        assert_eq!(mapped, vec![7, 3, -1, 9]);
    }
}
