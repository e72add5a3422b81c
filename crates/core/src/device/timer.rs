use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Condvar, Mutex, PoisonError,
    },
    thread,
    time::{Duration, Instant},
};

use super::{CompletionCallback, Instrument, ToneDevice, ToneHandle};
use crate::{Result, SonifyError};

/// Tone device without audio output: each tone occupies a worker thread for
/// its scheduled duration and then signals completion.
#[derive(Debug)]
pub struct TimerDevice {
    // f64 bits of the shared gain.
    gain: Arc<AtomicU64>,
}

impl Default for TimerDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDevice {
    pub fn new() -> Self {
        Self {
            gain: Arc::new(AtomicU64::new(1f64.to_bits())),
        }
    }

    pub fn gain(&self) -> f64 {
        f64::from_bits(self.gain.load(Ordering::Relaxed))
    }
}

impl ToneDevice for TimerDevice {
    fn is_available(&self) -> bool {
        true
    }

    fn create_tone(&self, instrument: Instrument) -> Result<Box<dyn ToneHandle>> {
        Ok(Box::new(TimerTone {
            instrument,
            frequency: 0.0,
            gain: self.gain.clone(),
            deadline: Arc::new((Mutex::new(None), Condvar::new())),
            callback: None,
        }))
    }

    fn set_gain(&self, volume: f64) {
        self.gain.store(volume.to_bits(), Ordering::Relaxed);
    }
}

type Deadline = Arc<(Mutex<Option<u64>>, Condvar)>;

struct TimerTone {
    instrument: Instrument,
    frequency: f64,
    gain: Arc<AtomicU64>,
    deadline: Deadline,
    callback: Option<CompletionCallback>,
}

impl ToneHandle for TimerTone {
    fn set_frequency(&mut self, hz: f64) {
        self.frequency = hz;
    }

    fn start(&mut self, at_ms: u64) -> Result<()> {
        let callback = self.callback.take();
        let deadline = self.deadline.clone();
        let (frequency, instrument) = (self.frequency, self.instrument);
        let gain = f64::from_bits(self.gain.load(Ordering::Relaxed));

        thread::Builder::new()
            .name("timer-tone".into())
            .spawn(move || {
                thread::sleep(Duration::from_millis(at_ms));
                tracing::debug!(frequency, %instrument, gain, "tone on");
                let started = Instant::now();
                wait_for_deadline(&deadline, started);
                let elapsed_ms = started.elapsed().as_millis() as u64;
                tracing::debug!(frequency, elapsed_ms, "tone off");
                if let Some(callback) = callback {
                    callback();
                }
            })
            .map_err(|err| SonifyError::device(format!("failed to spawn tone thread: {err}")))?;
        Ok(())
    }

    fn stop(&mut self, at_ms: u64) {
        let (lock, cvar) = &*self.deadline;
        let mut deadline = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *deadline = Some(deadline.map_or(at_ms, |current| current.min(at_ms)));
        cvar.notify_all();
    }

    fn on_completion(&mut self, callback: CompletionCallback) {
        self.callback = Some(callback);
    }
}

fn wait_for_deadline(deadline: &Deadline, started: Instant) {
    let (lock, cvar) = &**deadline;
    let mut guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
    loop {
        match *guard {
            Some(end_ms) => {
                let elapsed = started.elapsed().as_millis() as u64;
                if elapsed >= end_ms {
                    return;
                }
                guard = cvar
                    .wait_timeout(guard, Duration::from_millis(end_ms - elapsed))
                    .map(|(guard, _)| guard)
                    .unwrap_or_else(|poisoned| poisoned.into_inner().0);
            }
            None => {
                guard = cvar.wait(guard).unwrap_or_else(PoisonError::into_inner);
            }
        }
    }
}
