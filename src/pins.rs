//! Pin levels and the per-interrupt pin snapshot.

use core::ops::Not;

use crate::config::ConfigError;

/// Number of GPIO pins on a supported expander chip (MCP23017-class, two 8-bit ports). Pin numbers
/// are bit positions in the 16-bit pin mask returned by `PinEventSource::read_all_pins`.
pub const MAX_PINS: u8 = 16;

pub(crate) fn valid_pin(pin: u8) -> Result<u8, ConfigError> {
    if pin < MAX_PINS {
        Ok(pin)
    } else {
        Err(ConfigError::PinOutOfRange(pin))
    }
}

/// A logic level read from a pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(bit: bool) -> Level {
        if bit {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> bool {
        level == Level::High
    }
}

impl Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// The state of an expander's pins as captured by the chip when it raised its interrupt.
///
/// One snapshot is taken per dispatcher cycle, while the chip's interrupt latch is still set, so
/// that the pin states and the triggering pin agree with each other. It is consumed by routing it
/// to the buttons and encoders of that expander and is never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinSnapshot {
    /// Pin states, bit `n` holding the level of pin `n`.
    pub pins: u16,
    /// The pin whose transition raised the interrupt, if the chip reported one.
    pub trigger: Option<u8>,
}

impl PinSnapshot {
    pub fn new(pins: u16, trigger: Option<u8>) -> Self {
        Self { pins, trigger }
    }

    /// Level of a single pin.
    pub fn level(&self, pin: u8) -> Level {
        Level::from(self.pins & (1 << pin) != 0)
    }

    /// Levels of an encoder's pin pair, `(A, B)`.
    pub fn pair(&self, pin_a: u8, pin_b: u8) -> (Level, Level) {
        (self.level(pin_a), self.level(pin_b))
    }

    /// Whether `pin` is the one that raised this interrupt.
    pub fn triggered_by(&self, pin: u8) -> bool {
        self.trigger == Some(pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_levels() {
        let snap = PinSnapshot::new(0b1000_0000_0000_0101, Some(2));
        assert_eq!(snap.level(0), Level::High);
        assert_eq!(snap.level(1), Level::Low);
        assert_eq!(snap.level(2), Level::High);
        assert_eq!(snap.level(15), Level::High);
        assert_eq!(snap.pair(0, 1), (Level::High, Level::Low));
    }

    #[test]
    fn snapshot_trigger() {
        let snap = PinSnapshot::new(0, Some(7));
        assert!(snap.triggered_by(7));
        assert!(!snap.triggered_by(6));
        assert!(!PinSnapshot::new(0, None).triggered_by(0));
    }

    #[test]
    fn level_conversions() {
        assert_eq!(Level::from(true), Level::High);
        assert_eq!(bool::from(Level::Low), false);
        assert_eq!(!Level::Low, Level::High);
    }

    #[test]
    fn pin_range() {
        assert_eq!(valid_pin(0), Ok(0));
        assert_eq!(valid_pin(15), Ok(15));
        assert_eq!(valid_pin(16), Err(ConfigError::PinOutOfRange(16)));
    }
}
