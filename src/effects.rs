//! Outbound capabilities the core calls but does not implement.
//!
//! Tones, notifications, wake locks and the reminder modal all live behind
//! [`Effects`]. Every method defaults to a no-op so a host only overrides
//! what it can actually do.

use std::sync::{Arc, Mutex};

use log::info;

use crate::reminders::{Reminder, ReminderId};
use crate::timer::{BreakCard, TimerEvent, TimerSnapshot};

/// One fire-and-forget beep, `delay_ms` after the chime starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration_ms: u64,
    pub delay_ms: u64,
}

impl Tone {
    pub const fn new(frequency_hz: f32, duration_ms: u64, delay_ms: u64) -> Self {
        Self {
            frequency_hz,
            duration_ms,
            delay_ms,
        }
    }
}

pub mod chimes {
    use super::Tone;

    const C5: f32 = 523.25;
    const E5: f32 = 659.25;
    const G5: f32 = 783.99;
    const A5: f32 = 880.00;
    const G4: f32 = 392.00;
    const E4: f32 = 329.63;

    pub const FOCUS_START: &[Tone] = &[Tone::new(C5, 200, 0), Tone::new(E5, 300, 250)];
    pub const BREAK_START: &[Tone] = &[Tone::new(G4, 200, 0), Tone::new(E4, 300, 250)];
    pub const ALL_COMPLETE: &[Tone] = &[
        Tone::new(C5, 150, 0),
        Tone::new(E5, 150, 200),
        Tone::new(G5, 300, 400),
    ];
    pub const REMINDER_FIRED: &[Tone] = &[
        Tone::new(E5, 200, 0),
        Tone::new(G5, 200, 250),
        Tone::new(A5, 300, 500),
    ];
    pub const CONFIRM: &[Tone] = &[Tone::new(C5, 150, 0)];
}

pub trait Effects {
    fn play_tone(&mut self, _tone: Tone) {}

    fn play_chime(&mut self, chime: &[Tone]) {
        for tone in chime {
            self.play_tone(*tone);
        }
    }

    fn show_notification(&mut self, _title: &str, _body: &str) {}

    fn acquire_wake_lock(&mut self) {}

    fn release_wake_lock(&mut self) {}

    /// Show the reminder modal; `waiting` reminders are queued behind it.
    fn present_reminder(&mut self, _reminder: &Reminder, _waiting: usize) {}

    fn close_reminder(&mut self) {}

    fn update_queue_info(&mut self, _waiting: usize) {}

    fn reminder_countdown(&mut self, _reminder: &Reminder, _remaining_secs: u64) {}

    fn timer_updated(&mut self, _snapshot: &TimerSnapshot) {}

    /// Segment transitions, reported before the matching chime.
    fn timer_event(&mut self, _event: &TimerEvent) {}

    fn show_break_card(&mut self, _card: &BreakCard) {}

    fn hide_break_card(&mut self) {}

    fn config_warning(&mut self, _message: &str) {}

    fn counter_updated(&mut self, _count: u64) {}
}

/// Does nothing at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEffects;

impl Effects for NoopEffects {}

/// Logs every effect; plays tones when built with the `audio` feature.
#[derive(Default)]
pub struct LogEffects {
    #[cfg(feature = "audio")]
    tones: Option<crate::audio::ToneEngineHandle>,
}

impl LogEffects {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(feature = "audio")]
    pub fn with_audio(tones: crate::audio::ToneEngineHandle) -> Self {
        Self { tones: Some(tones) }
    }
}

impl Effects for LogEffects {
    fn play_tone(&mut self, tone: Tone) {
        log::debug!(
            "tone {:.2} Hz for {} ms (+{} ms)",
            tone.frequency_hz,
            tone.duration_ms,
            tone.delay_ms
        );
        #[cfg(feature = "audio")]
        if let Some(engine) = &self.tones {
            if let Err(err) = engine.play(tone) {
                log::warn!("tone playback failed: {err}");
            }
        }
    }

    fn show_notification(&mut self, title: &str, body: &str) {
        info!("[notify] {title}: {body}");
    }

    fn acquire_wake_lock(&mut self) {
        info!("wake lock acquired");
    }

    fn release_wake_lock(&mut self) {
        info!("wake lock released");
    }

    fn present_reminder(&mut self, reminder: &Reminder, waiting: usize) {
        info!("[reminder #{}] {} ({} waiting)", reminder.id, reminder.text, waiting);
    }

    fn close_reminder(&mut self) {
        info!("reminder closed");
    }

    fn update_queue_info(&mut self, waiting: usize) {
        if waiting > 0 {
            let plural = if waiting > 1 { "s" } else { "" };
            info!("{waiting} more reminder{plural} waiting");
        }
    }

    fn timer_updated(&mut self, snapshot: &TimerSnapshot) {
        log::debug!("{} {} {}", snapshot.clock, snapshot.segment_label, snapshot.session_label);
    }

    fn timer_event(&mut self, event: &TimerEvent) {
        log::debug!("timer event {event:?}");
    }

    fn show_break_card(&mut self, card: &BreakCard) {
        info!("[break card] {} {}: {}", card.icon, card.title, card.text);
    }

    fn hide_break_card(&mut self) {
        log::debug!("break card hidden");
    }

    fn config_warning(&mut self, message: &str) {
        log::warn!("{message}");
    }

    fn counter_updated(&mut self, count: u64) {
        info!("page hits: {count}");
    }
}

/// Everything a [`RecordingEffects`] saw, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Tone(Tone),
    Notification { title: String, body: String },
    WakeLockAcquired,
    WakeLockReleased,
    Presented { id: ReminderId, text: String, waiting: usize },
    ReminderClosed,
    QueueInfo(usize),
    ReminderCountdown { id: ReminderId, remaining_secs: u64 },
    TimerUpdated { remaining_secs: u64, is_break: bool },
    Timer(TimerEvent),
    CardShown(String),
    CardHidden,
    ConfigWarning(String),
    CounterUpdated(u64),
}

/// Records effects into a shared log; clones share the same log.
#[derive(Debug, Default, Clone)]
pub struct RecordingEffects {
    log: Arc<Mutex<Vec<Effect>>>,
}

impl RecordingEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Effect> {
        self.log.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    pub fn notification_titles(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::Notification { title, .. } => Some(title),
                _ => None,
            })
            .collect()
    }

    /// Ids in the order they were presented in the reminder modal.
    pub fn presented_ids(&self) -> Vec<ReminderId> {
        self.entries()
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::Presented { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn timer_events(&self) -> Vec<TimerEvent> {
        self.entries()
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::Timer(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Effect) -> bool) -> usize {
        self.entries().iter().filter(|effect| matches(effect)).count()
    }

    fn push(&self, effect: Effect) {
        self.log
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(effect);
    }
}

impl Effects for RecordingEffects {
    fn play_tone(&mut self, tone: Tone) {
        self.push(Effect::Tone(tone));
    }

    fn show_notification(&mut self, title: &str, body: &str) {
        self.push(Effect::Notification {
            title: title.to_string(),
            body: body.to_string(),
        });
    }

    fn acquire_wake_lock(&mut self) {
        self.push(Effect::WakeLockAcquired);
    }

    fn release_wake_lock(&mut self) {
        self.push(Effect::WakeLockReleased);
    }

    fn present_reminder(&mut self, reminder: &Reminder, waiting: usize) {
        self.push(Effect::Presented {
            id: reminder.id,
            text: reminder.text.clone(),
            waiting,
        });
    }

    fn close_reminder(&mut self) {
        self.push(Effect::ReminderClosed);
    }

    fn update_queue_info(&mut self, waiting: usize) {
        self.push(Effect::QueueInfo(waiting));
    }

    fn reminder_countdown(&mut self, reminder: &Reminder, remaining_secs: u64) {
        self.push(Effect::ReminderCountdown {
            id: reminder.id,
            remaining_secs,
        });
    }

    fn timer_updated(&mut self, snapshot: &TimerSnapshot) {
        self.push(Effect::TimerUpdated {
            remaining_secs: snapshot.remaining_secs,
            is_break: snapshot.is_break,
        });
    }

    fn timer_event(&mut self, event: &TimerEvent) {
        self.push(Effect::Timer(*event));
    }

    fn show_break_card(&mut self, card: &BreakCard) {
        self.push(Effect::CardShown(card.title.to_string()));
    }

    fn hide_break_card(&mut self) {
        self.push(Effect::CardHidden);
    }

    fn config_warning(&mut self, message: &str) {
        self.push(Effect::ConfigWarning(message.to_string()));
    }

    fn counter_updated(&mut self, count: u64) {
        self.push(Effect::CounterUpdated(count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chime_expands_to_tones_in_order() {
        let recorder = RecordingEffects::new();
        let mut effects = recorder.clone();
        effects.play_chime(chimes::ALL_COMPLETE);
        let tones: Vec<u64> = recorder
            .entries()
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::Tone(tone) => Some(tone.delay_ms),
                _ => None,
            })
            .collect();
        assert_eq!(tones, vec![0, 200, 400]);
    }

    #[test]
    fn clones_share_one_log() {
        let recorder = RecordingEffects::new();
        let mut other = recorder.clone();
        other.show_notification("Break Time!", "stretch");
        assert_eq!(recorder.notification_titles(), vec!["Break Time!".to_string()]);
        recorder.clear();
        assert!(recorder.entries().is_empty());
    }
}
