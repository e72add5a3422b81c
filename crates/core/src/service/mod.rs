use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
    thread::{self, JoinHandle},
};

use crate::{
    harmonize, sample, semitones_above, EngineConfig, HarmonicScale, Instrument, Narrator,
    PitchClass, PlaybackScheduler, PlaybackState, Result, Sample, SamplingStrategy, ScaleType,
    SonifyError, ToneDevice, ToneRequest, ValueRange,
};

struct Settings {
    config: EngineConfig,
    scale: HarmonicScale,
}

/// Façade that decimates and harmonises series and plays them through a
/// single shared [`PlaybackScheduler`].
pub struct SonificationService {
    settings: Mutex<Settings>,
    scheduler: PlaybackScheduler,
    narrator: Arc<dyn Narrator>,
}

impl SonificationService {
    pub fn new(
        config: EngineConfig,
        device: Arc<dyn ToneDevice>,
        narrator: Arc<dyn Narrator>,
    ) -> Result<Self> {
        config.validate()?;
        let scale = HarmonicScale::new(config.base_frequency, config.scale, config.octaves)?;

        let scheduler = PlaybackScheduler::new(device);
        scheduler.set_instrument(config.instrument)?;
        scheduler.set_gain(config.volume);

        tracing::info!(
            base_frequency = config.base_frequency,
            scale = %config.scale,
            octaves = config.octaves,
            "sonification service ready"
        );

        Ok(Self {
            settings: Mutex::new(Settings { config, scale }),
            scheduler,
            narrator,
        })
    }

    /// Decimates, harmonises and enqueues `series`. Returns once the tones
    /// are queued; an empty series is a no-op.
    pub fn play_series(&self, series: &[Sample], range: Option<ValueRange>) -> Result<()> {
        if series.is_empty() {
            tracing::debug!("ignoring empty series");
            return Ok(());
        }

        let tones = {
            let mut settings = self.lock_settings()?;
            let (cap, strategy, duration_ms) = (
                settings.config.decimation_cap,
                settings.config.sampling,
                settings.config.tone_duration_ms,
            );
            let sampled = sample(series, cap, strategy);
            let frequencies = harmonize(&sampled, settings.scale.buckets(), range)?;
            tracing::debug!(
                samples = series.len(),
                tones = frequencies.len(),
                %strategy,
                "series harmonised"
            );
            frequencies
                .into_iter()
                .map(|frequency| ToneRequest::new(frequency, duration_ms))
                .collect::<Vec<_>>()
        };

        self.scheduler.enqueue_all(tones)
    }

    /// Enqueues a single note, e.g. `"C"` or `"F#"`, relative to the base
    /// frequency which sounds as `A`.
    pub fn play_note(&self, note: &str, duration_ms: u64) -> Result<()> {
        let class: PitchClass = note.parse()?;
        if duration_ms == 0 {
            return Err(SonifyError::invalid("note duration must be positive"));
        }

        let base = self.lock_settings()?.config.base_frequency;
        let frequency = semitones_above(base, class.semitones() as f64);
        tracing::debug!(%class, frequency, duration_ms, "note requested");
        self.scheduler.enqueue(ToneRequest::new(frequency, duration_ms))
    }

    pub fn pause(&self) -> Result<()> {
        self.scheduler.pause()
    }

    pub fn stop(&self) -> Result<()> {
        self.scheduler.stop()
    }

    pub fn play(&self) -> Result<()> {
        self.scheduler.play()
    }

    pub fn set_volume(&self, volume: f64) -> Result<()> {
        crate::config::validate_volume(volume)?;
        self.lock_settings()?.config.volume = volume;
        self.scheduler.set_gain(volume);
        tracing::info!(volume, "volume changed");
        Ok(())
    }

    pub fn volume(&self) -> Result<f64> {
        Ok(self.lock_settings()?.config.volume)
    }

    pub fn set_instrument(&self, name: &str) -> Result<()> {
        let instrument: Instrument = name.parse()?;
        self.lock_settings()?.config.instrument = instrument;
        self.scheduler.set_instrument(instrument)?;
        tracing::info!(%instrument, "instrument changed");
        Ok(())
    }

    pub fn instrument(&self) -> Result<Instrument> {
        Ok(self.lock_settings()?.config.instrument)
    }

    pub fn available_instruments(&self) -> Vec<&'static str> {
        Instrument::ALL.iter().map(|i| i.as_str()).collect()
    }

    /// Replaces the scale configuration. The bucket set is regenerated on
    /// next use. Nothing changes if any value is rejected.
    pub fn set_scale(&self, base_frequency: f64, scale: ScaleType, octaves: u32) -> Result<()> {
        crate::config::validate_scale_params(base_frequency, octaves)?;

        let mut settings = self.lock_settings()?;
        settings.scale.set_base_frequency(base_frequency)?;
        settings.scale.set_octaves(octaves)?;
        settings.scale.set_scale(scale);
        settings.config.base_frequency = base_frequency;
        settings.config.octaves = octaves;
        settings.config.scale = scale;
        tracing::info!(base_frequency, %scale, octaves, "scale changed");
        Ok(())
    }

    pub fn set_decimation(&self, cap: usize, strategy: SamplingStrategy) -> Result<()> {
        let mut settings = self.lock_settings()?;
        settings.config.decimation_cap = cap;
        settings.config.sampling = strategy;
        Ok(())
    }

    pub fn buckets(&self) -> Result<Vec<f64>> {
        Ok(self.lock_settings()?.scale.buckets().to_vec())
    }

    pub fn config(&self) -> Result<EngineConfig> {
        Ok(self.lock_settings()?.config.clone())
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    pub fn state(&self) -> Result<PlaybackState> {
        self.scheduler.state()
    }

    pub fn is_playing(&self) -> Result<bool> {
        self.scheduler.is_playing()
    }

    /// Narrates `text` on a background thread. Playback is unaffected by the
    /// outcome.
    pub fn speak(&self, text: impl Into<String>) -> Result<NarrationHandle> {
        let text = text.into();
        let narrator = Arc::clone(&self.narrator);
        let handle = thread::Builder::new()
            .name("narration".into())
            .spawn(move || {
                narrator.speak(&text).map_err(|reason| {
                    tracing::warn!(%reason, "narration failed");
                    SonifyError::NarrationFailure { reason }
                })
            })
            .map_err(|err| SonifyError::NarrationFailure {
                reason: err.to_string(),
            })?;
        Ok(NarrationHandle { handle })
    }

    fn lock_settings(&self) -> Result<MutexGuard<'_, Settings>> {
        self.settings
            .lock()
            .map_err(|_| SonifyError::msg("service settings have been poisoned"))
    }
}

impl fmt::Debug for SonificationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SonificationService")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

/// Pending outcome of [`SonificationService::speak`].
#[derive(Debug)]
pub struct NarrationHandle {
    handle: JoinHandle<Result<()>>,
}

impl NarrationHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the narration completes.
    pub fn wait(self) -> Result<()> {
        self.handle
            .join()
            .map_err(|_| SonifyError::NarrationFailure {
                reason: "narrator panicked".to_string(),
            })?
    }
}
