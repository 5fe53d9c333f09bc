//! Splitting the particle index range into per-worker batches

use std::ops::Range;

/// Batch length for `workers` workers over `count` particles
///
/// Computed as `(count + workers) / workers`, which is one more than
/// `count / workers`. The extra padding means the last worker's batch is
/// usually short and, when `workers > count`, trailing workers get nothing.
pub fn batch_size(count: usize, workers: usize) -> usize {
    debug_assert!(workers > 0);
    (count + workers) / workers
}

/// Half-open index range of every worker, clamped to `0..count`
///
/// Always returns exactly `workers` ranges, in worker order. Ranges are
/// contiguous and disjoint, and their union is `0..count`. Idle workers get an
/// empty range starting at `count`.
pub fn batch_ranges(count: usize, workers: usize) -> Vec<Range<usize>> {
    let size = batch_size(count, workers);
    (0..workers)
        .map(|w| {
            let start = (w * size).min(count);
            let end = ((w + 1) * size).min(count);
            start..end
        })
        .collect()
}
