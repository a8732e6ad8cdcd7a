//! Debounced push buttons.

use log::debug;

use crate::config::{ExpanderId, TriggerMode};
use crate::pins::Level;
use crate::time::elapsed_ms;

/// What happened to a button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonEventKind {
    Pressed,
    Released,
}

/// A debounced button transition, queued by value to the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonEvent {
    pub expander: ExpanderId,
    pub pin: u8,
    pub kind: ButtonEventKind,
    /// Clock reading when the transition was accepted.
    pub at_ms: u32,
}

/// A button bound to one expander pin, and its debounce state.
///
/// A raw transition is accepted when the new level differs from the stable level and more than
/// `debounce_ms` have passed since the last accepted transition. Rejected transitions leave the
/// state untouched, so a burst of bounces registers as soon as one edge lands outside the window.
/// Accepted transitions always move the stable level and the timing anchor, even when the trigger
/// mode suppresses the event.
#[derive(Clone, Debug)]
pub struct Button {
    pin: u8,
    mode: TriggerMode,
    debounce_ms: u32,
    stable: Level,
    last_change_ms: u32,
    accepted: u32,
    rejected: u32,
}

impl Button {
    /// Create a button on `pin`. The pin idles high against the expander's pull-up, and the
    /// debounce window is anchored at `now_ms`.
    pub fn new(pin: u8, mode: TriggerMode, debounce_ms: u32, now_ms: u32) -> Self {
        Self {
            pin,
            mode,
            debounce_ms,
            stable: Level::High,
            last_change_ms: now_ms,
            accepted: 0,
            rejected: 0,
        }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn mode(&self) -> TriggerMode {
        self.mode
    }

    pub fn debounce_ms(&self) -> u32 {
        self.debounce_ms
    }

    /// The last accepted level.
    pub fn stable_level(&self) -> Level {
        self.stable
    }

    /// Clock reading of the last accepted transition (or of setup, if none yet).
    pub fn last_change_ms(&self) -> u32 {
        self.last_change_ms
    }

    /// Number of accepted transitions.
    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    /// Number of transitions discarded as bounces.
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    pub(crate) fn rearm(&mut self, now_ms: u32) {
        self.last_change_ms = now_ms;
    }

    /// Feed the raw level of the pin observed at `now_ms`. Returns the event to report, if any.
    pub fn update(&mut self, level: Level, now_ms: u32) -> Option<ButtonEventKind> {
        if level == self.stable {
            return None;
        }
        if elapsed_ms(now_ms, self.last_change_ms) <= self.debounce_ms {
            self.rejected = self.rejected.wrapping_add(1);
            debug!(
                "button {}: bounce to {:?} rejected after {} ms",
                self.pin,
                level,
                elapsed_ms(now_ms, self.last_change_ms)
            );
            return None;
        }

        self.stable = level;
        self.last_change_ms = now_ms;
        self.accepted = self.accepted.wrapping_add(1);

        match (self.mode, level) {
            (TriggerMode::Change, Level::Low) | (TriggerMode::Low, Level::Low) => {
                Some(ButtonEventKind::Pressed)
            }
            (TriggerMode::Change, Level::High) => Some(ButtonEventKind::Released),
            (TriggerMode::High, Level::High) => Some(ButtonEventKind::Pressed),
            (TriggerMode::Low, Level::High) | (TriggerMode::High, Level::Low) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bounce_inside_window_is_rejected() {
        let mut b = Button::new(2, TriggerMode::Change, 20, 0);
        assert_eq!(b.update(Level::Low, 0), None);
        assert_eq!(b.update(Level::High, 5), None);
        assert_eq!(b.update(Level::Low, 25), Some(ButtonEventKind::Pressed));
        assert_eq!(b.stable_level(), Level::Low);
        assert_eq!(b.last_change_ms(), 25);
        assert_eq!(b.accepted(), 1);
        assert_eq!(b.rejected(), 1);
    }

    #[test]
    fn window_boundary_is_exclusive() {
        let mut b = Button::new(0, TriggerMode::Change, 20, 100);
        assert_eq!(b.update(Level::Low, 120), None);
        assert_eq!(b.update(Level::Low, 121), Some(ButtonEventKind::Pressed));
    }

    #[test]
    fn change_mode_alternates() {
        let mut b = Button::new(4, TriggerMode::Change, 20, 0);
        assert_eq!(b.update(Level::Low, 50), Some(ButtonEventKind::Pressed));
        assert_eq!(b.update(Level::High, 100), Some(ButtonEventKind::Released));
        assert_eq!(b.update(Level::Low, 150), Some(ButtonEventKind::Pressed));
    }

    #[test]
    fn low_mode_suppresses_release_but_tracks_it() {
        let mut b = Button::new(4, TriggerMode::Low, 20, 0);
        assert_eq!(b.update(Level::Low, 50), Some(ButtonEventKind::Pressed));
        assert_eq!(b.update(Level::High, 100), None);
        assert_eq!(b.stable_level(), Level::High);
        assert_eq!(b.last_change_ms(), 100);
        // Anchored to the suppressed release, not to the last emitted press.
        assert_eq!(b.update(Level::Low, 110), None);
        assert_eq!(b.update(Level::Low, 121), Some(ButtonEventKind::Pressed));
    }

    #[test]
    fn high_mode_reports_high_as_pressed() {
        let mut b = Button::new(4, TriggerMode::High, 20, 0);
        assert_eq!(b.update(Level::Low, 50), None);
        assert_eq!(b.update(Level::High, 100), Some(ButtonEventKind::Pressed));
    }

    #[test]
    fn same_level_is_ignored() {
        let mut b = Button::new(1, TriggerMode::Change, 20, 0);
        assert_eq!(b.update(Level::High, 500), None);
        assert_eq!(b.last_change_ms(), 0);
        assert_eq!(b.rejected(), 0);
    }

    #[test]
    fn window_spans_clock_wrap() {
        let start = u32::max_value() - 10;
        let mut b = Button::new(1, TriggerMode::Change, 20, start);
        assert_eq!(b.update(Level::Low, 5), None);
        assert_eq!(b.update(Level::Low, 10), Some(ButtonEventKind::Pressed));
    }

    proptest! {
        #[test]
        fn accepted_transitions_are_spaced_by_window(
            steps in prop::collection::vec((any::<bool>(), 0u32..40), 1..64)
        ) {
            let mut b = Button::new(3, TriggerMode::Change, 20, 0);
            let mut now = 0u32;
            let mut last_accept: Option<u32> = None;
            for (bit, gap) in steps {
                now += gap;
                let before = b.accepted();
                b.update(Level::from(bit), now);
                if b.accepted() != before {
                    if let Some(prev) = last_accept {
                        prop_assert!(now - prev > 20);
                    }
                    last_accept = Some(now);
                }
            }
        }

        #[test]
        fn change_mode_emits_once_per_accepted_transition(
            steps in prop::collection::vec((any::<bool>(), 0u32..40), 1..64)
        ) {
            let mut b = Button::new(3, TriggerMode::Change, 20, 0);
            let mut now = 0u32;
            let mut last_kind: Option<ButtonEventKind> = None;
            let mut events = 0u32;
            for (bit, gap) in steps {
                now += gap;
                if let Some(kind) = b.update(Level::from(bit), now) {
                    events += 1;
                    prop_assert_ne!(Some(kind), last_kind);
                    last_kind = Some(kind);
                }
            }
            prop_assert_eq!(events, b.accepted());
        }
    }
}
