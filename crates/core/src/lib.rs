//! Core library of the data sonifier.
//!
//! A numeric time series is decimated ([`sampler`]), mapped onto the
//! frequencies of a musical scale ([`scale`], [`mapping`]) and played one
//! tone at a time through a self-advancing queue ([`playback`]). The
//! [`service`] module ties these together behind [`SonificationService`];
//! audio output and narration are injected through the traits in
//! [`device`].

pub mod config;
pub mod device;
pub mod error;
pub mod mapping;
pub mod playback;
pub mod sampler;
pub mod scale;
pub mod service;

pub use config::EngineConfig;
pub use device::{
    CompletionCallback, Instrument, Narrator, RecordingDevice, TimerDevice, ToneDevice,
    ToneEvent, ToneHandle,
};
pub use error::{Result, SonifyError};
pub use mapping::{harmonize, ValueRange};
pub use playback::{PlaybackScheduler, PlaybackState, ToneRequest};
pub use sampler::{sample, sample_with_rng, Sample, SamplingStrategy};
pub use scale::{build_buckets, semitones_above, HarmonicScale, PitchClass, ScaleType};
pub use service::{NarrationHandle, SonificationService};
