use std::{fmt, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Result, SonifyError};

/// A single observation of the series being sonified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

impl From<(i64, f64)> for Sample {
    fn from((timestamp, value): (i64, f64)) -> Self {
        Self { timestamp, value }
    }
}

/// How a representative sample is picked from each stride window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingStrategy {
    /// Always the first sample of the window.
    #[default]
    Systematic,
    /// A uniformly chosen sample inside the window.
    Random,
}

impl SamplingStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            SamplingStrategy::Systematic => "systematic",
            SamplingStrategy::Random => "random",
        }
    }
}

impl fmt::Display for SamplingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SamplingStrategy {
    type Err = SonifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "systematic" => Ok(SamplingStrategy::Systematic),
            "random" => Ok(SamplingStrategy::Random),
            other => Err(SonifyError::invalid(format!(
                "unknown sampling strategy `{other}`"
            ))),
        }
    }
}

/// Decimates `series` to roughly `cap` samples, keeping chronological order.
///
/// Series shorter than `cap` are returned unchanged, as is everything when
/// `cap <= 1`. Otherwise the series is walked in windows of
/// `len / cap` samples and one sample is emitted per window, so the result
/// may exceed `cap` by the remainder windows.
pub fn sample(series: &[Sample], cap: usize, strategy: SamplingStrategy) -> Vec<Sample> {
    sample_with_rng(series, cap, strategy, &mut rand::thread_rng())
}

/// Same as [`sample`] with an explicit random source for the
/// [`SamplingStrategy::Random`] path.
pub fn sample_with_rng<R: Rng>(
    series: &[Sample],
    cap: usize,
    strategy: SamplingStrategy,
    rng: &mut R,
) -> Vec<Sample> {
    if series.len() < cap || cap <= 1 {
        return series.to_vec();
    }

    let step = series.len() / cap;
    series
        .chunks(step)
        .map(|window| match strategy {
            SamplingStrategy::Systematic => window[0],
            SamplingStrategy::Random => window[rng.gen_range(0..window.len())],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn ramp(len: usize) -> Vec<Sample> {
        (0..len)
            .map(|i| Sample::new(i as i64 * 10, (i as f64).sin()))
            .collect()
    }

    #[test]
    fn short_series_is_returned_unchanged() {
        let series = ramp(5);
        assert_eq!(sample(&series, 10, SamplingStrategy::Systematic), series);
        assert_eq!(sample(&series, 10, SamplingStrategy::Random), series);
    }

    #[test]
    fn degenerate_cap_disables_decimation() {
        let series = ramp(7);
        assert_eq!(sample(&series, 1, SamplingStrategy::Systematic), series);
        assert_eq!(sample(&series, 0, SamplingStrategy::Random), series);
    }

    #[test]
    fn systematic_takes_window_starts() {
        let series = ramp(100);
        let sampled = sample(&series, 10, SamplingStrategy::Systematic);

        assert_eq!(sampled.len(), 10);
        for (i, s) in sampled.iter().enumerate() {
            assert_eq!(*s, series[i * 10]);
        }
    }

    #[test]
    fn systematic_is_deterministic() {
        let series = ramp(257);
        let first = sample(&series, 16, SamplingStrategy::Systematic);
        let second = sample(&series, 16, SamplingStrategy::Systematic);
        assert_eq!(first, second);
        // 257 / 16 = 16 per window, plus one trailing remainder window.
        assert_eq!(first.len(), 17);
    }

    #[test]
    fn random_stays_inside_windows_and_in_order() {
        let series = ramp(103);
        let cap = 10;
        let step = series.len() / cap;
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let sampled = sample_with_rng(&series, cap, SamplingStrategy::Random, &mut rng);
            assert_eq!(sampled.len(), series.len().div_ceil(step));
            assert!(sampled
                .windows(2)
                .all(|pair| pair[0].timestamp < pair[1].timestamp));

            for (window, s) in sampled.iter().enumerate() {
                let index = (s.timestamp / 10) as usize;
                assert_eq!(index / step, window);
                assert_eq!(*s, series[index]);
            }
        }
    }

    #[test]
    fn empty_series_is_empty() {
        assert!(sample(&[], 4, SamplingStrategy::Systematic).is_empty());
    }
}
