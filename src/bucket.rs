use crate::diag::{BucketRangeNotice, Diagnostic, Diagnostics};
use crate::{Error, Result};

/// Number of `width`-second buckets needed to cover `[start, end]`.
pub fn bucket_count(start: i64, end: i64, width: i64) -> Result<usize> {
    if width <= 0 {
        return Err(Error::InvalidBucketWidth(width));
    }
    if end < start {
        return Ok(0);
    }
    let span = end.abs_diff(start);
    usize::try_from(span.div_ceil(width.unsigned_abs()))
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or(Error::TooManyBuckets { start, end, width })
}

/// Counts events per `width`-second bucket starting at `start`. The window ends
/// at the latest timestamp. Events before `start` are dropped with a notice.
pub fn bucketize(
    start: i64,
    width: i64,
    timestamps: &[i64],
    diag: &mut dyn Diagnostics,
) -> Result<Vec<u64>> {
    let Some(&end) = timestamps.iter().max() else {
        if width <= 0 {
            return Err(Error::InvalidBucketWidth(width));
        }
        return Ok(Vec::new());
    };
    let count = bucket_count(start, end, width)?;
    bucketize_into(start, width, count, timestamps, diag)
}

/// Counts events into exactly `count` buckets. Events whose bucket falls outside
/// `[0, count)` are dropped with a notice.
pub fn bucketize_into(
    start: i64,
    width: i64,
    count: usize,
    timestamps: &[i64],
    diag: &mut dyn Diagnostics,
) -> Result<Vec<u64>> {
    if width <= 0 {
        return Err(Error::InvalidBucketWidth(width));
    }
    let mut buckets = vec![0u64; count];
    for &timestamp in timestamps {
        // Offsets that overflow are out of range either way.
        let index = match timestamp.checked_sub(start) {
            Some(offset) => offset.div_euclid(width),
            None if timestamp < start => i64::MIN,
            None => i64::MAX,
        };
        match usize::try_from(index).ok().and_then(|i| buckets.get_mut(i)) {
            Some(bucket) => *bucket += 1,
            None => diag.notice(Diagnostic::BucketRange(BucketRangeNotice {
                timestamp,
                index,
                bucket_count: count,
            })),
        }
    }
    Ok(buckets)
}

/// Running totals; the last element equals the sum of `counts`.
pub fn cumulative(counts: &[u64]) -> Vec<u64> {
    counts
        .iter()
        .scan(0u64, |total, &n| {
            *total += n;
            Some(*total)
        })
        .collect()
}
