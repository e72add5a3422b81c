use serde::{Deserialize, Serialize};

use crate::{Result, Sample, SonifyError};

/// Caller supplied value bounds that replace the observed min/max.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(SonifyError::invalid(format!(
                "value range [{min}, {max}] is not a valid interval"
            )));
        }
        Ok(Self { min, max })
    }

    /// Observed bounds of `samples`, or `None` when empty.
    pub fn observed(samples: &[Sample]) -> Option<Self> {
        let mut values = samples.iter().map(|s| s.value);
        let first = values.next()?;
        let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(Self { min, max })
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Maps every sample onto one of the `buckets`, returning one frequency per
/// sample in the input order.
///
/// Values are interpolated linearly into `[buckets[0], buckets[last]]`, then
/// the samples are visited in ascending value order while a bucket index
/// only moves upwards: it advances while the interpolated frequency is
/// strictly greater than the current bucket. A frequency equal to a bucket
/// therefore stays on it. Higher values never receive lower buckets.
///
/// A zero width range maps every sample to the first bucket.
pub fn harmonize(
    samples: &[Sample],
    buckets: &[f64],
    range: Option<ValueRange>,
) -> Result<Vec<f64>> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }
    let (Some(&low), Some(&high)) = (buckets.first(), buckets.last()) else {
        return Err(SonifyError::invalid("harmonic bucket set is empty"));
    };

    let Some(range) = range.or_else(|| ValueRange::observed(samples)) else {
        return Ok(Vec::new());
    };
    if range.width() == 0.0 {
        return Ok(vec![low; samples.len()]);
    }

    let mut order: Vec<usize> = (0..samples.len()).collect();
    order.sort_by(|&a, &b| samples[a].value.total_cmp(&samples[b].value));

    let span = high - low;
    let mut frequencies = vec![low; samples.len()];
    let mut bucket = 0;
    for index in order {
        let position = (samples[index].value - range.min) / range.width();
        let target = low + position * span;
        while bucket + 1 < buckets.len() && target > buckets[bucket] {
            bucket += 1;
        }
        frequencies[index] = buckets[bucket];
    }

    Ok(frequencies)
}
