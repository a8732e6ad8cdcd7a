//! Quadrature decoding for rotary encoders wired to two expander pins.
//!
//! Two decoders are available, chosen per encoder through [`Algorithm`]:
//!
//! - **Gray code** (default). The pin pair is read as a 2-bit value `(B << 1) | A` and mapped
//!   through the quadrature sequence `0, 1, 3, 2` to a position index, so that every valid
//!   single-channel transition moves the index by one. A step of +1 is clockwise, a step of -1 is
//!   counter-clockwise, and a step of 2 means a state was missed and the direction is unknown.
//!   Movement is only reported when the pair comes to rest on one of the encoder's detents.
//! - **Edge window.** An edge on one channel that follows a same-direction edge on the other
//!   channel within the debounce window reports the rotation; the channel that moved second
//!   determines the direction. Full-cycle encoders only correlate falling edges.
//!
//! Feeding either decoder the same pair twice in a row never reports anything and leaves the
//! decoder untouched.

use log::{trace, warn};

use crate::config::{Algorithm, EncoderConfig, EncoderId, ExpanderId};
use crate::pins::Level;
use crate::time::elapsed_ms;

/// Direction of one detent of rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

/// A decoded rotation, queued by value to the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RotaryEvent {
    pub expander: ExpanderId,
    pub encoder: EncoderId,
    pub direction: Direction,
    /// Clock reading when the movement was latched.
    pub at_ms: u32,
}

/// Raw 2-bit value of a pin pair.
fn raw_value(pair: (Level, Level)) -> u8 {
    let (a, b) = pair;
    (bool::from(b) as u8) << 1 | bool::from(a) as u8
}

/// Index of a raw value in the quadrature sequence `0, 1, 3, 2`.
fn position_index(raw: u8) -> u8 {
    match raw & 0b11 {
        0b00 => 0,
        0b01 => 1,
        0b11 => 2,
        _ => 3,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Channel {
    A,
    B,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Edge {
    level: Level,
    at_ms: u32,
}

/// A rotary encoder bound to two expander pins, and its decoder state.
#[derive(Clone, Debug)]
pub struct RotaryEncoder {
    pin_a: u8,
    pin_b: u8,
    config: EncoderConfig,
    last: Option<(Level, Level)>,
    last_movement: Option<Direction>,
    last_movement_ms: u32,
    edge_a: Option<Edge>,
    edge_b: Option<Edge>,
    ambiguous: u32,
    emitted: u32,
}

impl RotaryEncoder {
    pub fn new(pin_a: u8, pin_b: u8, config: EncoderConfig) -> Self {
        Self {
            pin_a,
            pin_b,
            config,
            last: None,
            last_movement: None,
            last_movement_ms: 0,
            edge_a: None,
            edge_b: None,
            ambiguous: 0,
            emitted: 0,
        }
    }

    pub fn pins(&self) -> (u8, u8) {
        (self.pin_a, self.pin_b)
    }

    pub fn uses_pin(&self, pin: u8) -> bool {
        self.pin_a == pin || self.pin_b == pin
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// The last pin pair seen, `(A, B)`, or `None` before the first observation.
    pub fn last_pair(&self) -> Option<(Level, Level)> {
        self.last
    }

    /// Direction of the most recent unambiguous step, whether or not it was reported.
    pub fn last_movement(&self) -> Option<Direction> {
        self.last_movement
    }

    /// Clock reading of the most recent change of the pin pair.
    pub fn last_movement_ms(&self) -> u32 {
        self.last_movement_ms
    }

    /// Number of transitions dropped because their direction could not be determined.
    pub fn ambiguous(&self) -> u32 {
        self.ambiguous
    }

    /// Number of rotation events reported.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }

    /// Feed the levels of pins A and B observed at `now_ms`. Returns the rotation to report, if
    /// any.
    pub fn update(&mut self, a: Level, b: Level, now_ms: u32) -> Option<Direction> {
        let pair = (a, b);
        if self.last == Some(pair) {
            return None;
        }
        let previous = match self.last.replace(pair) {
            Some(previous) => previous,
            None => {
                // First observation only establishes where the shaft is. The edge decoder
                // still needs the edges that led there from rest, or the first click is lost.
                if self.config.algorithm == Algorithm::EdgeWindow {
                    let rest = self.rest_pair();
                    if pair != rest {
                        self.last_movement_ms = now_ms;
                        return self.decode_edges(rest, pair, now_ms);
                    }
                }
                return None;
            }
        };
        self.last_movement_ms = now_ms;

        let direction = match self.config.algorithm {
            Algorithm::GrayCode => self.decode_gray(previous, pair),
            Algorithm::EdgeWindow => self.decode_edges(previous, pair, now_ms),
        };
        if direction.is_some() {
            self.emitted = self.emitted.wrapping_add(1);
        }
        direction
    }

    fn decode_gray(&mut self, previous: (Level, Level), pair: (Level, Level)) -> Option<Direction> {
        let value = raw_value(pair);
        let old_value = raw_value(previous);
        let delta = position_index(value).wrapping_sub(position_index(old_value)) & 0b11;

        let step = match delta {
            1 => Some(Direction::Clockwise),
            3 => Some(Direction::CounterClockwise),
            _ => {
                self.ambiguous = self.ambiguous.wrapping_add(1);
                warn!(
                    "encoder ({}, {}): jumped from {} to {}, direction unknown",
                    self.pin_a, self.pin_b, old_value, value
                );
                None
            }
        };
        if step.is_some() {
            self.last_movement = step;
        }

        if self.config.detents.contains(value) {
            step
        } else {
            trace!(
                "encoder ({}, {}): transitional value {}",
                self.pin_a,
                self.pin_b,
                value
            );
            None
        }
    }

    /// The pair the encoder is assumed to rest at before anything was observed: both channels
    /// high against the pull-ups, unless the detents say the encoder only rests low.
    fn rest_pair(&self) -> (Level, Level) {
        if self.config.full_cycle
            || self.config.detents.contains(0b11)
            || !self.config.detents.contains(0b00)
        {
            (Level::High, Level::High)
        } else {
            (Level::Low, Level::Low)
        }
    }

    fn decode_edges(
        &mut self,
        previous: (Level, Level),
        pair: (Level, Level),
        now_ms: u32,
    ) -> Option<Direction> {
        let a_moved = pair.0 != previous.0;
        let b_moved = pair.1 != previous.1;

        if a_moved && b_moved {
            self.ambiguous = self.ambiguous.wrapping_add(1);
            self.edge_a = None;
            self.edge_b = None;
            warn!(
                "encoder ({}, {}): both channels changed at once, direction unknown",
                self.pin_a, self.pin_b
            );
            return None;
        }

        if a_moved {
            self.edge(Channel::A, pair.0, now_ms)
        } else {
            self.edge(Channel::B, pair.1, now_ms)
        }
    }

    fn edge(&mut self, channel: Channel, level: Level, now_ms: u32) -> Option<Direction> {
        if self.config.full_cycle && level == Level::High {
            self.edge_a = None;
            self.edge_b = None;
            return None;
        }

        let other = match channel {
            Channel::A => self.edge_b,
            Channel::B => self.edge_a,
        };
        if let Some(other) = other {
            if other.level == level && elapsed_ms(now_ms, other.at_ms) <= self.config.debounce_ms
            {
                self.edge_a = None;
                self.edge_b = None;
                let direction = match channel {
                    Channel::A => Direction::CounterClockwise,
                    Channel::B => Direction::Clockwise,
                };
                self.last_movement = Some(direction);
                return Some(direction);
            }
        }

        let edge = Some(Edge { level, at_ms: now_ms });
        match channel {
            Channel::A => self.edge_a = edge,
            Channel::B => self.edge_b = edge,
        }
        None
    }
}
