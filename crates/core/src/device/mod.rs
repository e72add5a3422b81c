//! Seams to the outside world: the tone output device driven by the
//! playback scheduler and the narration capability used by `speak`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Result, SonifyError};

mod recording;
mod timer;

pub use recording::{RecordingDevice, ToneEvent};
pub use timer::TimerDevice;

/// Invoked once by a [`ToneHandle`] when its tone has finished sounding.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Timbre used when creating a tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Instrument {
    pub const ALL: [Instrument; 4] = [
        Instrument::Sine,
        Instrument::Square,
        Instrument::Sawtooth,
        Instrument::Triangle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Instrument::Sine => "sine",
            Instrument::Square => "square",
            Instrument::Sawtooth => "sawtooth",
            Instrument::Triangle => "triangle",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Instrument {
    type Err = SonifyError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.to_ascii_lowercase();
        Instrument::ALL
            .into_iter()
            .find(|instrument| instrument.as_str() == lowered)
            .ok_or_else(|| SonifyError::invalid(format!("unknown instrument `{s}`")))
    }
}

/// A single tone created by a [`ToneDevice`].
///
/// Times are milliseconds relative to the moment of the call.
pub trait ToneHandle: Send {
    fn set_frequency(&mut self, hz: f64);

    fn start(&mut self, at_ms: u64) -> Result<()>;

    /// Schedules the end of the tone. A later call with an earlier time cuts
    /// the tone short.
    fn stop(&mut self, at_ms: u64);

    /// Registers the callback fired when the tone ends. Implementations must
    /// fire it outside of [`ToneHandle::start`] and [`ToneHandle::stop`],
    /// from an audio or timer thread, since it re-enters the scheduler.
    fn on_completion(&mut self, callback: CompletionCallback);
}

/// Audio backend capable of producing one tone at a time.
pub trait ToneDevice: Send + Sync {
    fn is_available(&self) -> bool;

    fn create_tone(&self, instrument: Instrument) -> Result<Box<dyn ToneHandle>>;

    /// Sets the shared output gain read by whichever tone is sounding.
    fn set_gain(&self, volume: f64);
}

/// External text narration capability.
pub trait Narrator: Send + Sync {
    /// Blocks until the narration completes, or returns the failure reason.
    fn speak(&self, text: &str) -> std::result::Result<(), String>;
}
