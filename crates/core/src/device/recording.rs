use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{CompletionCallback, Instrument, ToneDevice, ToneHandle};
use crate::{Result, SonifyError};

/// Everything a [`RecordingDevice`] observed, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum ToneEvent {
    Start {
        tone: usize,
        frequency: f64,
        instrument: Instrument,
    },
    Stop {
        tone: usize,
        at_ms: u64,
    },
}

#[derive(Default)]
struct Recording {
    available: bool,
    fail_on_tone: Option<usize>,
    created: usize,
    gain: f64,
    events: Vec<ToneEvent>,
    sounding: Vec<usize>,
    callbacks: HashMap<usize, CompletionCallback>,
}

/// In-memory tone device that records calls instead of producing audio.
///
/// Completion is never fired on its own; call
/// [`RecordingDevice::complete_active`] to end the sounding tone.
#[derive(Clone)]
pub struct RecordingDevice {
    shared: Arc<Mutex<Recording>>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Recording {
                available: true,
                gain: 1.0,
                ..Default::default()
            })),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Makes the `n`th created tone (1-based) fail to initialise.
    pub fn fail_on_tone(&self, n: usize) {
        self.lock().fail_on_tone = Some(n);
    }

    pub fn events(&self) -> Vec<ToneEvent> {
        self.lock().events.clone()
    }

    pub fn start_count(&self) -> usize {
        self.started_frequencies().len()
    }

    pub fn started_frequencies(&self) -> Vec<f64> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                ToneEvent::Start { frequency, .. } => Some(*frequency),
                ToneEvent::Stop { .. } => None,
            })
            .collect()
    }

    pub fn gain(&self) -> f64 {
        self.lock().gain
    }

    /// Number of tones started but not yet completed.
    pub fn sounding(&self) -> usize {
        self.lock().sounding.len()
    }

    /// Fires the completion of the oldest sounding tone. Returns `false` if
    /// nothing is sounding.
    pub fn complete_active(&self) -> bool {
        let callback = {
            let mut recording = self.lock();
            if recording.sounding.is_empty() {
                return false;
            }
            let tone = recording.sounding.remove(0);
            recording.callbacks.remove(&tone)
        };

        if let Some(callback) = callback {
            callback();
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ToneDevice for RecordingDevice {
    fn is_available(&self) -> bool {
        self.lock().available
    }

    fn create_tone(&self, instrument: Instrument) -> Result<Box<dyn ToneHandle>> {
        let mut recording = self.lock();
        if !recording.available {
            return Err(SonifyError::device("recording device disabled"));
        }
        recording.created += 1;
        if recording.fail_on_tone == Some(recording.created) {
            return Err(SonifyError::device(format!(
                "tone {} failed to initialise",
                recording.created
            )));
        }

        Ok(Box::new(RecordedTone {
            id: recording.created,
            instrument,
            frequency: 0.0,
            shared: self.shared.clone(),
        }))
    }

    fn set_gain(&self, volume: f64) {
        self.lock().gain = volume;
    }
}

struct RecordedTone {
    id: usize,
    instrument: Instrument,
    frequency: f64,
    shared: Arc<Mutex<Recording>>,
}

impl RecordedTone {
    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ToneHandle for RecordedTone {
    fn set_frequency(&mut self, hz: f64) {
        self.frequency = hz;
    }

    fn start(&mut self, _at_ms: u64) -> Result<()> {
        let (id, frequency, instrument) = (self.id, self.frequency, self.instrument);
        let mut recording = self.lock();
        recording.events.push(ToneEvent::Start {
            tone: id,
            frequency,
            instrument,
        });
        recording.sounding.push(id);
        Ok(())
    }

    fn stop(&mut self, at_ms: u64) {
        let id = self.id;
        self.lock().events.push(ToneEvent::Stop { tone: id, at_ms });
    }

    fn on_completion(&mut self, callback: CompletionCallback) {
        let id = self.id;
        self.lock().callbacks.insert(id, callback);
    }
}
