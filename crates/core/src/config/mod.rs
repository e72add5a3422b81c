use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{semitones_above, Instrument, Result, SamplingStrategy, ScaleType, SonifyError};

/// Top-level configuration for the sonification engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frequency of the lowest bucket, in Hz.
    pub base_frequency: f64,
    /// Number of times the scale pattern is repeated upwards.
    pub octaves: u32,
    pub scale: ScaleType,
    /// Upper bound on the number of tones produced for a single series.
    pub decimation_cap: usize,
    pub sampling: SamplingStrategy,
    pub instrument: Instrument,
    /// Output gain in `[0.0, 1.0]`.
    pub volume: f64,
    /// Duration of every tone emitted while playing a series.
    pub tone_duration_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_frequency: 440.0,
            octaves: 2,
            scale: ScaleType::Major,
            decimation_cap: 64,
            sampling: SamplingStrategy::Systematic,
            instrument: Instrument::Sine,
            volume: 0.5,
            tone_duration_ms: 200,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON document. Missing fields take their
    /// defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        validate_scale_params(self.base_frequency, self.octaves)?;
        validate_volume(self.volume)?;
        if self.tone_duration_ms == 0 {
            return Err(SonifyError::invalid("tone duration must be positive"));
        }
        Ok(())
    }
}

pub(crate) fn validate_scale_params(base_frequency: f64, octaves: u32) -> Result<()> {
    if !base_frequency.is_finite() || base_frequency <= 0.0 {
        return Err(SonifyError::invalid(format!(
            "base frequency must be positive, got {base_frequency}"
        )));
    }
    if octaves == 0 {
        return Err(SonifyError::invalid("octave count must be positive"));
    }
    let top = semitones_above(base_frequency, 12.0 * octaves as f64);
    if !top.is_finite() {
        return Err(SonifyError::invalid(format!(
            "{octaves} octaves above {base_frequency} Hz exceed the representable range"
        )));
    }
    Ok(())
}

pub(crate) fn validate_volume(volume: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&volume) {
        return Err(SonifyError::invalid(format!(
            "volume must lie in [0, 1], got {volume}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "scale": "minor", "instrument": "square" }"#)
                .unwrap();

        assert_eq!(config.scale, ScaleType::Minor);
        assert_eq!(config.instrument, Instrument::Square);
        assert_eq!(config.base_frequency, 440.0);
        assert_eq!(config.sampling, SamplingStrategy::Systematic);
    }

    #[test]
    fn rejects_out_of_range_volume() {
        let err = EngineConfig::from_json_str(r#"{ "volume": 1.5 }"#).unwrap_err();
        assert!(matches!(err, SonifyError::InvalidConfiguration(_)));
    }

    #[test]
    fn rejects_zero_octaves() {
        let err = EngineConfig::from_json_str(r#"{ "octaves": 0 }"#).unwrap_err();
        assert!(format!("{err}").contains("octave"));
    }

    #[test]
    fn rejects_octaves_beyond_finite_frequencies() {
        let err = EngineConfig::from_json_str(r#"{ "octaves": 1100 }"#).unwrap_err();
        assert!(matches!(err, SonifyError::InvalidConfiguration(_)));

        let err = EngineConfig::from_json_str(r#"{ "octaves": 4294967295 }"#).unwrap_err();
        assert!(matches!(err, SonifyError::InvalidConfiguration(_)));

        let config = EngineConfig::from_json_str(r#"{ "octaves": 10 }"#).unwrap();
        assert_eq!(config.octaves, 10);
    }

    #[test]
    fn loads_config_from_file() {
        let dir = std::env::temp_dir().join(format!("sonify-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("engine.json");
        std::fs::write(&path, r#"{ "base_frequency": 220.0, "sampling": "random" }"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.base_frequency, 220.0);
        assert_eq!(config.sampling, SamplingStrategy::Random);

        let err = EngineConfig::load(dir.join("missing.json")).unwrap_err();
        assert!(matches!(err, SonifyError::Io(_)));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unknown_scale_name_is_a_parse_error() {
        let err = EngineConfig::from_json_str(r#"{ "scale": "lydian" }"#).unwrap_err();
        assert!(matches!(err, SonifyError::Json(_)));
    }
}
