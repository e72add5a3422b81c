use std::{
    io::{self, Write},
    sync::{mpsc, Arc, Mutex},
    time::Duration,
};

use data_sonifier_core::{Instrument, TimerDevice, ToneDevice, ToneHandle};

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn timer_tones_stay_quiet_at_info_level() {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .init();

    let device = TimerDevice::new();
    let (tx, rx) = mpsc::channel();
    for frequency in [440.0, 660.0] {
        let tx = tx.clone();
        let mut tone = device.create_tone(Instrument::Sine).unwrap();
        tone.set_frequency(frequency);
        tone.on_completion(Box::new(move || {
            let _ = tx.send(());
        }));
        tone.start(0).unwrap();
        tone.stop(5);
    }
    for _ in 0..2 {
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
    }
    tracing::info!("tones finished");

    let logged = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    assert!(logged.contains("tones finished"));
    assert!(!logged.contains("tone on"));
    assert!(!logged.contains("tone off"));
}
