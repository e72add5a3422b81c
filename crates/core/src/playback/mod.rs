use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Condvar, Mutex, MutexGuard, Weak},
    time::{Duration, Instant},
};

use crate::{Instrument, Result, SonifyError, ToneDevice};

/// A unit of playback work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneRequest {
    pub frequency_hz: f64,
    pub duration_ms: u64,
}

impl ToneRequest {
    pub fn new(frequency_hz: f64, duration_ms: u64) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

struct ActiveTone {
    id: u64,
    request: ToneRequest,
    handle: Box<dyn crate::ToneHandle>,
}

struct SchedulerState {
    queue: VecDeque<ToneRequest>,
    paused: bool,
    active: Option<ActiveTone>,
    next_id: u64,
    instrument: Instrument,
    failure: Option<SonifyError>,
}

impl SchedulerState {
    fn playback_state(&self) -> PlaybackState {
        if self.paused {
            PlaybackState::Paused
        } else if self.active.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        }
    }
}

struct Inner {
    device: Arc<dyn ToneDevice>,
    state: Mutex<SchedulerState>,
    idle: Condvar,
}

/// Self-advancing FIFO of tones with at most one tone sounding at a time.
///
/// Every mutation goes through a single mutex. The next tone is started
/// either by [`PlaybackScheduler::enqueue`] / [`PlaybackScheduler::play`] or
/// by the completion callback of the tone that just ended.
#[derive(Clone)]
pub struct PlaybackScheduler {
    inner: Arc<Inner>,
}

impl PlaybackScheduler {
    pub fn new(device: Arc<dyn ToneDevice>) -> Self {
        Self {
            inner: Arc::new(Inner {
                device,
                state: Mutex::new(SchedulerState {
                    queue: VecDeque::new(),
                    paused: false,
                    active: None,
                    next_id: 0,
                    instrument: Instrument::default(),
                    failure: None,
                }),
                idle: Condvar::new(),
            }),
        }
    }

    /// Appends `tone` and starts it right away when nothing is sounding and
    /// the scheduler is not paused.
    ///
    /// Fails without touching the queue if the device is unavailable. If the
    /// device fails while starting the tone the queue is discarded.
    pub fn enqueue(&self, tone: ToneRequest) -> Result<()> {
        self.enqueue_all(std::iter::once(tone))
    }

    /// Appends several tones under one lock so they stay contiguous.
    pub fn enqueue_all(&self, tones: impl IntoIterator<Item = ToneRequest>) -> Result<()> {
        if !self.inner.device.is_available() {
            return Err(SonifyError::device("cannot enqueue tones"));
        }

        let mut state = self.inner.lock()?;
        state.queue.extend(tones);
        if !state.paused && state.active.is_none() && !state.queue.is_empty() {
            self.inner.start_next(&mut state)?;
        }
        Ok(())
    }

    /// Stops further tones from starting. The sounding tone plays out.
    pub fn pause(&self) -> Result<()> {
        let mut state = self.inner.lock()?;
        state.paused = true;
        tracing::debug!(pending = state.queue.len(), "playback paused");
        Ok(())
    }

    /// Pauses, discards pending tones and cuts the sounding tone short.
    pub fn stop(&self) -> Result<()> {
        let mut state = self.inner.lock()?;
        state.paused = true;
        let discarded = state.queue.len();
        state.queue.clear();
        if let Some(active) = state.active.as_mut() {
            active.handle.stop(0);
        }
        tracing::info!(discarded, "playback stopped");
        Ok(())
    }

    /// Resumes playback, starting the head of the queue if nothing is
    /// sounding.
    pub fn play(&self) -> Result<()> {
        let mut state = self.inner.lock()?;
        state.paused = false;
        if state.active.is_none() && !state.queue.is_empty() {
            self.inner.start_next(&mut state)?;
        }
        Ok(())
    }

    pub fn state(&self) -> Result<PlaybackState> {
        Ok(self.inner.lock()?.playback_state())
    }

    pub fn is_playing(&self) -> Result<bool> {
        Ok(self.state()? == PlaybackState::Playing)
    }

    /// Number of tones waiting behind the sounding one.
    pub fn pending(&self) -> Result<usize> {
        Ok(self.inner.lock()?.queue.len())
    }

    /// The tone currently sounding, if any.
    pub fn active(&self) -> Result<Option<ToneRequest>> {
        Ok(self.inner.lock()?.active.as_ref().map(|tone| tone.request))
    }

    /// Returns the device failure that aborted the queue from a completion
    /// callback, clearing it.
    pub fn take_failure(&self) -> Result<Option<SonifyError>> {
        Ok(self.inner.lock()?.failure.take())
    }

    /// Timbre for tones started from now on.
    pub fn set_instrument(&self, instrument: Instrument) -> Result<()> {
        self.inner.lock()?.instrument = instrument;
        Ok(())
    }

    /// Forwards the gain to the device, affecting the sounding tone too.
    pub fn set_gain(&self, volume: f64) {
        self.inner.device.set_gain(volume);
    }

    /// Blocks until no tone is sounding or `timeout` elapses. Returns whether
    /// the scheduler went quiet.
    pub fn wait_until_idle(&self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.lock()?;
        while state.active.is_some() {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            state = self
                .inner
                .idle
                .wait_timeout(state, deadline - now)
                .map(|(state, _)| state)
                .map_err(|_| SonifyError::msg("playback scheduler has been poisoned"))?;
        }
        Ok(true)
    }
}

impl Inner {
    fn lock(&self) -> Result<MutexGuard<'_, SchedulerState>> {
        self.state
            .lock()
            .map_err(|_| SonifyError::msg("playback scheduler has been poisoned"))
    }

    /// Pops the head of the queue and starts it on the device. On failure
    /// the remaining queue is discarded.
    fn start_next(self: &Arc<Self>, state: &mut SchedulerState) -> Result<()> {
        let Some(request) = state.queue.pop_front() else {
            return Ok(());
        };

        match self.start_tone(state, request) {
            Ok(active) => {
                tracing::debug!(
                    id = active.id,
                    frequency = request.frequency_hz,
                    duration_ms = request.duration_ms,
                    pending = state.queue.len(),
                    "tone started"
                );
                state.active = Some(active);
                Ok(())
            }
            Err(err) => {
                let discarded = state.queue.len();
                state.queue.clear();
                state.active = None;
                tracing::warn!(%err, discarded, "tone device failed, aborting queue");
                self.idle.notify_all();
                Err(err)
            }
        }
    }

    fn start_tone(
        self: &Arc<Self>,
        state: &mut SchedulerState,
        request: ToneRequest,
    ) -> Result<ActiveTone> {
        let id = state.next_id;
        state.next_id += 1;

        let mut handle = self.device.create_tone(state.instrument)?;
        handle.set_frequency(request.frequency_hz);
        let weak: Weak<Inner> = Arc::downgrade(self);
        handle.on_completion(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.advance(id);
            }
        }));
        handle.start(0)?;
        handle.stop(request.duration_ms);

        Ok(ActiveTone {
            id,
            request,
            handle,
        })
    }

    /// Completion signal of tone `id`.
    fn advance(self: &Arc<Self>, id: u64) {
        let mut state = match self.lock() {
            Ok(state) => state,
            Err(err) => {
                tracing::error!(%err, "dropping tone completion");
                return;
            }
        };

        if state.active.as_ref().map(|tone| tone.id) != Some(id) {
            tracing::debug!(id, "ignoring completion of inactive tone");
            return;
        }
        state.active = None;

        if !state.paused && !state.queue.is_empty() {
            if let Err(err) = self.start_next(&mut state) {
                state.failure = Some(err);
            }
        }
        if state.active.is_none() {
            self.idle.notify_all();
        }
    }
}

impl fmt::Debug for PlaybackScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("PlaybackScheduler");
        match self.inner.state.try_lock() {
            Ok(state) => debug
                .field("state", &state.playback_state())
                .field("pending", &state.queue.len())
                .finish(),
            Err(_) => debug.finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RecordingDevice, ToneEvent};

    fn scheduler() -> (PlaybackScheduler, RecordingDevice) {
        let device = RecordingDevice::new();
        (PlaybackScheduler::new(Arc::new(device.clone())), device)
    }

    fn tone(frequency_hz: f64) -> ToneRequest {
        ToneRequest::new(frequency_hz, 100)
    }

    #[test]
    fn enqueue_on_idle_starts_exactly_one_tone() {
        let (scheduler, device) = scheduler();
        assert_eq!(scheduler.state().unwrap(), PlaybackState::Idle);

        scheduler.enqueue(tone(440.0)).unwrap();

        assert_eq!(scheduler.state().unwrap(), PlaybackState::Playing);
        assert_eq!(device.start_count(), 1);
        assert_eq!(
            device.events(),
            vec![
                ToneEvent::Start {
                    tone: 1,
                    frequency: 440.0,
                    instrument: Instrument::Sine,
                },
                ToneEvent::Stop { tone: 1, at_ms: 100 },
            ]
        );
    }

    #[test]
    fn plays_queue_in_order_one_at_a_time() {
        let (scheduler, device) = scheduler();
        for freq in [220.0, 330.0, 440.0] {
            scheduler.enqueue(tone(freq)).unwrap();
        }

        assert_eq!(device.start_count(), 1);
        assert_eq!(scheduler.pending().unwrap(), 2);

        while device.complete_active() {
            assert!(device.sounding() <= 1);
        }

        assert_eq!(device.started_frequencies(), vec![220.0, 330.0, 440.0]);
        assert_eq!(scheduler.state().unwrap(), PlaybackState::Idle);
        assert_eq!(scheduler.active().unwrap(), None);
    }

    #[test]
    fn pause_holds_next_tone_until_play() {
        let (scheduler, device) = scheduler();
        scheduler.enqueue(tone(220.0)).unwrap();
        scheduler.enqueue(tone(330.0)).unwrap();

        scheduler.pause().unwrap();
        assert_eq!(scheduler.state().unwrap(), PlaybackState::Paused);
        assert!(device.complete_active());

        assert_eq!(device.start_count(), 1);
        assert_eq!(scheduler.pending().unwrap(), 1);
        assert_eq!(scheduler.state().unwrap(), PlaybackState::Paused);

        scheduler.play().unwrap();
        assert_eq!(device.started_frequencies(), vec![220.0, 330.0]);
        assert_eq!(scheduler.state().unwrap(), PlaybackState::Playing);
    }

    #[test]
    fn enqueue_while_paused_waits() {
        let (scheduler, device) = scheduler();
        scheduler.pause().unwrap();
        scheduler.enqueue(tone(220.0)).unwrap();

        assert_eq!(device.start_count(), 0);
        assert_eq!(scheduler.state().unwrap(), PlaybackState::Paused);

        scheduler.play().unwrap();
        assert_eq!(device.start_count(), 1);
    }

    #[test]
    fn play_while_tone_sounding_does_not_start_another() {
        let (scheduler, device) = scheduler();
        scheduler.enqueue(tone(220.0)).unwrap();
        scheduler.enqueue(tone(330.0)).unwrap();
        scheduler.pause().unwrap();
        scheduler.play().unwrap();

        assert_eq!(device.start_count(), 1);
        assert_eq!(device.sounding(), 1);
    }

    #[test]
    fn stop_discards_queue_and_cuts_tone() {
        let (scheduler, device) = scheduler();
        for freq in [220.0, 330.0, 440.0] {
            scheduler.enqueue(tone(freq)).unwrap();
        }

        scheduler.stop().unwrap();
        assert_eq!(scheduler.pending().unwrap(), 0);
        assert_eq!(
            device.events().last(),
            Some(&ToneEvent::Stop { tone: 1, at_ms: 0 })
        );

        device.complete_active();
        scheduler.play().unwrap();

        assert_eq!(device.start_count(), 1);
        assert_eq!(scheduler.state().unwrap(), PlaybackState::Idle);
    }

    #[test]
    fn unavailable_device_rejects_enqueue() {
        let (scheduler, device) = scheduler();
        device.set_available(false);

        let err = scheduler.enqueue(tone(440.0)).unwrap_err();
        assert!(matches!(err, SonifyError::OutputDeviceUnavailable(_)));
        assert_eq!(scheduler.pending().unwrap(), 0);
        assert_eq!(scheduler.state().unwrap(), PlaybackState::Idle);
    }

    #[test]
    fn device_failure_mid_queue_aborts_remaining_tones() {
        let (scheduler, device) = scheduler();
        device.fail_on_tone(2);
        for freq in [220.0, 330.0, 440.0] {
            scheduler.enqueue(tone(freq)).unwrap();
        }

        device.complete_active();

        assert_eq!(device.start_count(), 1);
        assert_eq!(scheduler.pending().unwrap(), 0);
        assert_eq!(scheduler.state().unwrap(), PlaybackState::Idle);
        let failure = scheduler.take_failure().unwrap();
        assert!(matches!(
            failure,
            Some(SonifyError::OutputDeviceUnavailable(_))
        ));
        assert!(scheduler.take_failure().unwrap().is_none());
    }

    #[test]
    fn instrument_applies_to_later_tones() {
        let (scheduler, device) = scheduler();
        scheduler.enqueue(tone(220.0)).unwrap();
        scheduler.set_instrument(Instrument::Square).unwrap();
        scheduler.enqueue(tone(330.0)).unwrap();
        device.complete_active();

        let instruments: Vec<_> = device
            .events()
            .into_iter()
            .filter_map(|event| match event {
                ToneEvent::Start { instrument, .. } => Some(instrument),
                ToneEvent::Stop { .. } => None,
            })
            .collect();
        assert_eq!(instruments, vec![Instrument::Sine, Instrument::Square]);
    }

    #[test]
    fn stale_completion_is_ignored() {
        let (scheduler, device) = scheduler();
        scheduler.enqueue(tone(220.0)).unwrap();
        device.complete_active();
        assert!(!device.complete_active());
        assert_eq!(scheduler.state().unwrap(), PlaybackState::Idle);
    }

    #[test]
    fn waits_until_idle() {
        let (scheduler, device) = scheduler();
        assert!(scheduler.wait_until_idle(Duration::from_millis(1)).unwrap());

        scheduler.enqueue(tone(220.0)).unwrap();
        assert!(!scheduler.wait_until_idle(Duration::from_millis(5)).unwrap());

        device.complete_active();
        assert!(scheduler.wait_until_idle(Duration::from_millis(5)).unwrap());
    }
}
