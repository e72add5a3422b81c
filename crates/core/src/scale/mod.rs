use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{config::validate_scale_params, Result, SonifyError};

mod note;

pub use note::PitchClass;

const MAJOR_STEPS: [u32; 7] = [2, 2, 1, 2, 2, 2, 1];
// Harmonic minor: the augmented second between the sixth and seventh degree.
const MINOR_STEPS: [u32; 7] = [2, 1, 2, 2, 1, 3, 1];

/// Scale pattern used to generate the harmonic buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleType {
    #[default]
    Major,
    Minor,
}

impl ScaleType {
    /// Semitone deltas for one octave. They always sum to 12.
    pub fn steps(self) -> &'static [u32] {
        match self {
            ScaleType::Major => &MAJOR_STEPS,
            ScaleType::Minor => &MINOR_STEPS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScaleType::Major => "major",
            ScaleType::Minor => "minor",
        }
    }
}

impl fmt::Display for ScaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScaleType {
    type Err = SonifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "major" => Ok(ScaleType::Major),
            "minor" => Ok(ScaleType::Minor),
            other => Err(SonifyError::invalid(format!("unknown scale `{other}`"))),
        }
    }
}

/// Builds the ordered bucket frequencies for `octaves` repetitions of the
/// scale, rooted at `base_frequency`.
///
/// Each repetition emits its starting degree followed by one frequency per
/// step, so every octave contributes eight entries and the octave note is
/// repeated at the seam between two repetitions. Zero octaves yields an
/// empty set.
pub fn build_buckets(base_frequency: f64, scale: ScaleType, octaves: u32) -> Vec<f64> {
    let steps = scale.steps();
    let mut buckets = Vec::with_capacity(octaves as usize * (steps.len() + 1));
    let mut distance = 0u32;

    for _ in 0..octaves {
        buckets.push(semitones_above(base_frequency, distance as f64));
        for step in steps {
            distance += step;
            buckets.push(semitones_above(base_frequency, distance as f64));
        }
    }

    buckets
}

/// Equal-tempered frequency `semitones` above `base_frequency`.
pub fn semitones_above(base_frequency: f64, semitones: f64) -> f64 {
    base_frequency * 2f64.powf(semitones / 12.0)
}

/// Scale configuration together with its lazily generated bucket set.
#[derive(Debug, Clone)]
pub struct HarmonicScale {
    base_frequency: f64,
    scale: ScaleType,
    octaves: u32,
    buckets: Option<Vec<f64>>,
}

impl HarmonicScale {
    pub fn new(base_frequency: f64, scale: ScaleType, octaves: u32) -> Result<Self> {
        validate_scale_params(base_frequency, octaves)?;
        Ok(Self {
            base_frequency,
            scale,
            octaves,
            buckets: None,
        })
    }

    pub fn base_frequency(&self) -> f64 {
        self.base_frequency
    }

    pub fn scale(&self) -> ScaleType {
        self.scale
    }

    pub fn octaves(&self) -> u32 {
        self.octaves
    }

    /// Returns the bucket set, generating it if the configuration changed
    /// since the last call.
    pub fn buckets(&mut self) -> &[f64] {
        let (base, scale, octaves) = (self.base_frequency, self.scale, self.octaves);
        self.buckets
            .get_or_insert_with(|| {
                tracing::debug!(base, %scale, octaves, "generating harmonic buckets");
                build_buckets(base, scale, octaves)
            })
            .as_slice()
    }

    pub fn set_base_frequency(&mut self, base_frequency: f64) -> Result<()> {
        validate_scale_params(base_frequency, self.octaves)?;
        if base_frequency != self.base_frequency {
            self.base_frequency = base_frequency;
            self.buckets = None;
        }
        Ok(())
    }

    pub fn set_scale(&mut self, scale: ScaleType) {
        if scale != self.scale {
            self.scale = scale;
            self.buckets = None;
        }
    }

    pub fn set_octaves(&mut self, octaves: u32) -> Result<()> {
        validate_scale_params(self.base_frequency, octaves)?;
        if octaves != self.octaves {
            self.octaves = octaves;
            self.buckets = None;
        }
        Ok(())
    }
}
