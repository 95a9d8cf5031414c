//! Eye-exercise cards rotated during breaks.

use std::time::Duration;

use rand::seq::SliceRandom;
use serde::Serialize;

use crate::host::Host;
use crate::scheduler::{disarm, TimerHandle, Wakeup};

const START_DELAY: Duration = Duration::from_secs(5);
const STOP_BEFORE_SECS: u64 = 5;
const ROTATE_EVERY: Duration = Duration::from_secs(30);
/// Breaks this short or shorter get no cards at all.
const MIN_BREAK_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakCard {
    pub icon: &'static str,
    pub title: &'static str,
    pub text: &'static str,
}

pub const BREAK_CARDS: [BreakCard; 6] = [
    BreakCard {
        icon: "👁️",
        title: "20-20-20 Rule",
        text: "Every 20 minutes, look at something 20 feet away for 20 seconds.",
    },
    BreakCard {
        icon: "👀",
        title: "Blink Exercise",
        text: "Blink slowly 10 times. Close your eyes and take 3 deep breaths.",
    },
    BreakCard {
        icon: "🔄",
        title: "Eye Rolls",
        text: "Slowly roll your eyes in a circle, 5 times clockwise and 5 times counter-clockwise.",
    },
    BreakCard {
        icon: "🫴",
        title: "Palm Press",
        text: "Rub your palms together and gently place them over your closed eyes for 30 seconds.",
    },
    BreakCard {
        icon: "➡️⬅️",
        title: "Near & Far Focus",
        text: "Hold your thumb 10 inches away. Focus on it, then focus on something far. Repeat 10 times.",
    },
    BreakCard {
        icon: "✏️",
        title: "Figure Eight",
        text: "Imagine a large figure 8 on the wall. Trace it with your eyes slowly for 30 seconds.",
    },
];

#[derive(Debug, Default)]
pub struct BreakCards {
    deck: Vec<usize>,
    begin: Option<TimerHandle>,
    rotate: Option<TimerHandle>,
    end: Option<TimerHandle>,
    showing: bool,
}

impl BreakCards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_showing(&self) -> bool {
        self.showing
    }

    pub fn is_armed(&self) -> bool {
        self.begin.is_some() || self.rotate.is_some() || self.end.is_some()
    }

    /// Plan cards for a break with `remaining_secs` left.
    pub fn start(&mut self, host: &mut Host<'_>, remaining_secs: u64) {
        self.stop(host);
        if remaining_secs <= MIN_BREAK_SECS {
            return;
        }
        self.begin = Some(host.scheduler.after(START_DELAY, Wakeup::BreakCardsBegin));
        self.end = Some(host.scheduler.after(
            Duration::from_secs(remaining_secs - STOP_BEFORE_SECS),
            Wakeup::BreakCardsEnd,
        ));
    }

    pub fn handle(&mut self, host: &mut Host<'_>, wakeup: Wakeup) {
        match wakeup {
            Wakeup::BreakCardsBegin => {
                self.begin = None;
                self.reshuffle();
                self.show_next(host);
                disarm(host.scheduler, &mut self.rotate);
                self.rotate = Some(host.scheduler.every(ROTATE_EVERY, Wakeup::BreakCardNext));
            }
            Wakeup::BreakCardNext => self.show_next(host),
            Wakeup::BreakCardsEnd => {
                self.end = None;
                self.stop(host);
            }
            _ => {}
        }
    }

    /// Cancel everything pending and hide a visible card.
    pub fn stop(&mut self, host: &mut Host<'_>) {
        disarm(host.scheduler, &mut self.begin);
        disarm(host.scheduler, &mut self.rotate);
        disarm(host.scheduler, &mut self.end);
        if self.showing {
            host.effects.hide_break_card();
            self.showing = false;
        }
    }

    fn reshuffle(&mut self) {
        self.deck = (0..BREAK_CARDS.len()).collect();
        self.deck.shuffle(&mut rand::thread_rng());
    }

    fn show_next(&mut self, host: &mut Host<'_>) {
        if self.deck.is_empty() {
            self.reshuffle();
        }
        if let Some(index) = self.deck.pop() {
            host.effects.show_break_card(&BREAK_CARDS[index]);
            self.showing = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Effect;
    use crate::host::testing::Rig;
    use crate::scheduler::Scheduler;

    #[test]
    fn short_breaks_get_no_cards() {
        let mut rig = Rig::new();
        let mut cards = BreakCards::new();
        cards.start(&mut rig.host(), 10);
        assert!(!cards.is_armed());
        assert_eq!(rig.scheduler.pending(), 0);
    }

    #[test]
    fn rotation_covers_the_deck_before_repeating() {
        let mut rig = Rig::new();
        let mut cards = BreakCards::new();
        cards.start(&mut rig.host(), 600);
        rig.advance(Duration::from_secs(5 + 30 * 5), |host, wakeup| cards.handle(host, wakeup));

        let mut shown: Vec<String> = rig
            .effects
            .entries()
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::CardShown(title) => Some(title),
                _ => None,
            })
            .collect();
        assert_eq!(shown.len(), BREAK_CARDS.len());
        shown.sort();
        shown.dedup();
        assert_eq!(shown.len(), BREAK_CARDS.len());
    }

    #[test]
    fn cards_hide_five_seconds_before_break_ends() {
        let mut rig = Rig::new();
        let mut cards = BreakCards::new();
        cards.start(&mut rig.host(), 60);
        rig.advance(Duration::from_secs(54), |host, wakeup| cards.handle(host, wakeup));
        assert!(cards.is_showing());
        rig.advance(Duration::from_secs(1), |host, wakeup| cards.handle(host, wakeup));
        assert!(!cards.is_showing());
        assert!(!cards.is_armed());
        assert_eq!(rig.scheduler.pending(), 0);
        assert_eq!(rig.effects.count(|e| *e == Effect::CardHidden), 1);
    }
}
