//! Abstractions used to describe the buttons and rotary encoders wired to an expander.

use core::convert::TryFrom;
use core::fmt;

/// Default debounce window for buttons, in milliseconds.
pub const DEFAULT_BUTTON_DEBOUNCE_MS: u32 = 20;

/// Default debounce window for rotary encoders, in milliseconds. Only the
/// [`Algorithm::EdgeWindow`] decoder consults it.
pub const DEFAULT_ENCODER_DEBOUNCE_MS: u32 = 200;

/// Default number of button slots per expander.
pub const DEFAULT_MAX_BUTTONS: usize = 16;

/// Default number of rotary encoder slots per expander.
pub const DEFAULT_MAX_ENCODERS: usize = 8;

/// Default number of expanders that can share one interrupt bridge and dispatcher.
pub const DEFAULT_MAX_EXPANDERS: usize = 8;

/// Default depth of each event queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 50;

/// Which pin polarity a button reports.
///
/// Buttons are wired to ground with the expander's pull-up enabled, so a closed contact reads low.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerMode {
    /// Report `Pressed` when the pin goes low; rising edges are not reported.
    Low,
    /// Report `Pressed` when the pin goes high; falling edges are not reported.
    High,
    /// Report both edges: low is `Pressed`, high is `Released`.
    Change,
}

impl TryFrom<u8> for TriggerMode {
    type Error = ConfigError;

    /// Convert an Arduino-style interrupt mode constant (`LOW` = 0, `HIGH` = 1, `CHANGE` = 3).
    fn try_from(code: u8) -> Result<Self, ConfigError> {
        match code {
            0 => Ok(TriggerMode::Low),
            1 => Ok(TriggerMode::High),
            3 => Ok(TriggerMode::Change),
            other => Err(ConfigError::InvalidTriggerMode(other)),
        }
    }
}

impl From<TriggerMode> for u8 {
    fn from(mode: TriggerMode) -> u8 {
        match mode {
            TriggerMode::Low => 0,
            TriggerMode::High => 1,
            TriggerMode::Change => 3,
        }
    }
}

/// Errors raised while setting up buttons and encoders. These are only produced at setup time and
/// leave the expander unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The trigger mode code is not one of `LOW`, `HIGH` or `CHANGE`.
    InvalidTriggerMode(u8),
    /// The pin number does not exist on the expander.
    PinOutOfRange(u8),
    /// The pin is already bound to a button or encoder on this expander.
    PinInUse(u8),
    /// Both encoder channels were given the same pin.
    SamePin(u8),
    /// Every button slot is taken.
    ButtonsFull,
    /// Every rotary encoder slot is taken.
    EncodersFull,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::InvalidTriggerMode(code) => write!(f, "invalid trigger mode {}", code),
            ConfigError::PinOutOfRange(pin) => write!(f, "expander has no pin {}", pin),
            ConfigError::PinInUse(pin) => write!(f, "pin {} is already in use", pin),
            ConfigError::SamePin(pin) => write!(f, "encoder uses pin {} for both channels", pin),
            ConfigError::ButtonsFull => write!(f, "no free button slot"),
            ConfigError::EncodersFull => write!(f, "no free rotary encoder slot"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// Slot index of a registered expander. Lower ids were registered first and are serviced first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpanderId(pub u8);

/// Slot index of a button on its expander.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ButtonId(pub u8);

/// Slot index of a rotary encoder on its expander.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EncoderId(pub u8);

/// A set of raw encoder values, `(B << 1) | A`, at which the encoder rests mechanically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Detents(u8);

impl Detents {
    /// Both channels low and both channels high. Half-cycle encoders rest at either.
    pub const HALF_CYCLE: Detents = Detents(0b1001);
    /// Both channels high only. Full-cycle encoders pass through all four states between detents
    /// and idle high against the pull-ups.
    pub const FULL_CYCLE: Detents = Detents(0b1000);

    /// An empty set; use [`Detents::with`] to add values.
    pub const fn none() -> Self {
        Detents(0)
    }

    /// Add the raw value `value` (0..=3) to the set.
    pub const fn with(self, value: u8) -> Self {
        Detents(self.0 | 1 << (value & 0b11))
    }

    pub fn contains(&self, value: u8) -> bool {
        value < 4 && self.0 & (1 << value) != 0
    }
}

/// Quadrature decoding strategy for a rotary encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    /// Track the position through the four-state Gray code and report movement at detents.
    GrayCode,
    /// Correlate same-direction edges of the two channels within the debounce window.
    EdgeWindow,
}

/// Per-encoder configuration.
///
/// ```
/// # use gpio_expander_events::config::{Algorithm, Detents, EncoderConfig};
/// let cfg = EncoderConfig::new()
///     .full_cycle(true)
///     .debounce_ms(50)
///     .algorithm(Algorithm::EdgeWindow);
/// assert_eq!(cfg.detents, Detents::FULL_CYCLE);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    pub full_cycle: bool,
    pub debounce_ms: u32,
    pub detents: Detents,
    pub algorithm: Algorithm,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            full_cycle: false,
            debounce_ms: DEFAULT_ENCODER_DEBOUNCE_MS,
            detents: Detents::HALF_CYCLE,
            algorithm: Algorithm::GrayCode,
        }
    }
}

impl EncoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the encoder as cycling through all four states between detents. This also resets the
    /// detent set to the matching default; call [`EncoderConfig::detents`] afterwards to override.
    pub fn full_cycle(mut self, full_cycle: bool) -> Self {
        self.full_cycle = full_cycle;
        self.detents = if full_cycle {
            Detents::FULL_CYCLE
        } else {
            Detents::HALF_CYCLE
        };
        self
    }

    pub fn debounce_ms(mut self, ms: u32) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn detents(mut self, detents: Detents) -> Self {
        self.detents = detents;
        self
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}
