//! Levenshtein edit distance used by fuzzy term matching.

use std::cmp::min;

/// Levenshtein distance between two char slices, or `None` once it exceeds `threshold`.
///
/// Runs a two-row dynamic program and returns early as soon as every cell of
/// a row exceeds `threshold`.
#[allow(clippy::needless_range_loop)]
pub fn bounded_distance(a: &[char], b: &[char], threshold: usize) -> Option<usize> {
    let (n, m) = (a.len(), b.len());
    if n.abs_diff(m) > threshold {
        return None;
    }
    if n == 0 {
        return Some(m);
    }
    if m == 0 {
        return Some(n);
    }

    let mut prev_row: Vec<usize> = (0..=m).collect();
    let mut curr_row = vec![0; m + 1];

    for i in 1..=n {
        curr_row[0] = i;
        let mut best_in_row = i;

        for j in 1..=m {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr_row[j] = min(
                min(prev_row[j] + 1, curr_row[j - 1] + 1),
                prev_row[j - 1] + cost,
            );
            best_in_row = min(best_in_row, curr_row[j]);
        }

        if best_in_row > threshold {
            return None;
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    let distance = prev_row[m];
    (distance <= threshold).then_some(distance)
}
