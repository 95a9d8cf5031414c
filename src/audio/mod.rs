pub mod tone;

use rodio::{OutputStream, OutputStreamHandle, Source};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;
use std::time::Duration;

use crate::effects::Tone;
use tone::DecayingSine;

enum ToneCommand {
    Play(Tone),
    Shutdown,
}

/// Handle to a dedicated audio thread that owns the non-`Send` output stream.
///
/// Tones are mixed straight into the output, so overlapping chimes play
/// together instead of queueing behind each other.
#[derive(Clone)]
pub struct ToneEngineHandle {
    tx: Arc<Mutex<Option<Sender<ToneCommand>>>>,
}

impl ToneEngineHandle {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<ToneCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<ToneCommand>();

        thread::Builder::new()
            .name("tone-engine".to_string())
            .spawn(move || {
                let mut output: Option<(OutputStream, OutputStreamHandle)> = None;

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        ToneCommand::Play(tone) => {
                            if output.is_none() {
                                match OutputStream::try_default() {
                                    Ok(pair) => output = Some(pair),
                                    Err(e) => {
                                        log::warn!("Failed to create audio output stream: {}", e);
                                        continue;
                                    }
                                }
                            }
                            if let Some((_, handle)) = output.as_ref() {
                                let source = DecayingSine::new(
                                    tone.frequency_hz,
                                    Duration::from_millis(tone.duration_ms),
                                )
                                .delay(Duration::from_millis(tone.delay_ms));
                                if let Err(e) = handle.play_raw(source) {
                                    log::warn!("Failed to play tone: {}", e);
                                }
                            }
                        }
                        ToneCommand::Shutdown => break,
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }

    pub fn play(&self, tone: Tone) -> Result<(), String> {
        let tx = self.ensure_thread()?;
        tx.send(ToneCommand::Play(tone)).map_err(|e| e.to_string())
    }

    pub fn shutdown(&self) {
        if let Ok(Some(tx)) = self.tx.lock().map(|mut g| g.take()) {
            let _ = tx.send(ToneCommand::Shutdown);
        }
    }
}

impl Default for ToneEngineHandle {
    fn default() -> Self {
        Self::new()
    }
}
