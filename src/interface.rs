//! The seam between this crate and the expander chip driver.
//!
//! The chip driver performs the bus transactions (I2C or SPI) that read pin state, configure
//! pull-ups and arm or clear the chip's interrupt logic. This crate only needs the handful of
//! operations in [`PinEventSource`], which it calls from the dispatcher's context and never from
//! an interrupt handler.

use crate::config::TriggerMode;

/// A GPIO expander chip that latches pin changes and signals them on an interrupt output.
///
/// All methods are synchronous and may block on the bus.
pub trait PinEventSource {
    /// The type of error that bus transactions may return.
    type Error;

    /// Read the state of all pins as captured when the chip raised its last interrupt. Bit `n`
    /// of the result is the level of pin `n`.
    fn read_all_pins(&mut self) -> Result<u16, Self::Error>;

    /// Read which pin's transition raised the last interrupt, or `None` if the chip reports no
    /// pending interrupt.
    fn read_last_interrupt_pin(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Clear the chip's interrupt latch so that it can signal the next change.
    fn clear_interrupt_latch(&mut self) -> Result<(), Self::Error>;

    /// Arm the interrupt for `pin`.
    fn configure_pin_interrupt(&mut self, pin: u8, mode: TriggerMode) -> Result<(), Self::Error>;

    /// Configure `pin` as an input with the weak pull-up enabled.
    fn configure_pullup(&mut self, pin: u8) -> Result<(), Self::Error>;

    /// Enable the chip's interrupt output. Chips that need no global setup can rely on the
    /// default, which does nothing.
    fn enable_interrupts(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// This is here (and has to be pub) for doctests only. It's useless otherwise.
#[doc(hidden)]
pub mod noop {
    use super::PinEventSource;
    use crate::config::TriggerMode;

    pub struct NoopSource;

    impl PinEventSource for NoopSource {
        type Error = core::convert::Infallible;

        fn read_all_pins(&mut self) -> Result<u16, Self::Error> {
            Ok(0xFFFF)
        }
        fn read_last_interrupt_pin(&mut self) -> Result<Option<u8>, Self::Error> {
            Ok(None)
        }
        fn clear_interrupt_latch(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
        fn configure_pin_interrupt(
            &mut self,
            _pin: u8,
            _mode: TriggerMode,
        ) -> Result<(), Self::Error> {
            Ok(())
        }
        fn configure_pullup(&mut self, _pin: u8) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    /// An interrupt line that is never asserted.
    pub struct IdleLine;

    impl embedded_hal::digital::v2::InputPin for IdleLine {
        type Error = core::convert::Infallible;

        fn is_high(&self) -> Result<bool, Self::Error> {
            Ok(true)
        }
        fn is_low(&self) -> Result<bool, Self::Error> {
            Ok(false)
        }
    }
}
