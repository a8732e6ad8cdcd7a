//! The microcontroller pin wired to an expander's interrupt output.

use embedded_hal::digital::v2::InputPin;

use crate::pins::Level;

/// An expander's interrupt output as seen by the microcontroller. The line stays asserted until
/// the chip's interrupt latch is cleared, which is what lets the dispatcher find which of several
/// expanders needs servicing after the shared interrupt fired.
pub struct InterruptLine<IRQ> {
    pin: IRQ,
    active: Level,
}

impl<IRQ: InputPin> InterruptLine<IRQ> {
    /// A line that is asserted when low. This is the usual open-drain wiring.
    pub fn active_low(pin: IRQ) -> Self {
        Self {
            pin,
            active: Level::Low,
        }
    }

    /// A line that is asserted when high.
    pub fn active_high(pin: IRQ) -> Self {
        Self {
            pin,
            active: Level::High,
        }
    }

    /// Whether the expander is currently signalling an unserviced change.
    pub fn is_asserted(&self) -> Result<bool, IRQ::Error> {
        match self.active {
            Level::Low => self.pin.is_low(),
            Level::High => self.pin.is_high(),
        }
    }

    /// Give back the underlying pin.
    pub fn release(self) -> IRQ {
        self.pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::test_spy::TestLine;

    #[test]
    fn active_low_follows_pin() {
        let pin = TestLine::new();
        let line = InterruptLine::active_low(pin.split());
        assert_eq!(line.is_asserted(), Ok(false));
        pin.assert();
        assert_eq!(line.is_asserted(), Ok(true));
    }

    #[test]
    fn active_high_inverts() {
        let pin = TestLine::new();
        let line = InterruptLine::active_high(pin.split());
        assert_eq!(line.is_asserted(), Ok(true));
        pin.assert();
        assert_eq!(line.is_asserted(), Ok(false));
    }
}
