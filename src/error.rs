//! Errors raised while servicing expanders.

use core::fmt;

use crate::queue::QueueClosed;

/// The union of all errors the dispatcher can run into. `SE` is the chip driver's bus error and
/// `LE` the error type of the microcontroller pins used as interrupt lines.
///
/// Spurious wakes and ambiguous rotary transitions are expected in normal operation and are not
/// reported here.
#[derive(Debug, PartialEq)]
pub enum Error<SE, LE> {
    /// A bus transaction with the expander chip failed.
    Source(SE),
    /// An interrupt line could not be read.
    InterruptLine(LE),
    /// The application dropped the receiving end of an event queue.
    QueueClosed,
}

impl<SE, LE> Error<SE, LE> {
    pub(crate) fn from_source(e: SE) -> Self {
        Error::Source(e)
    }
    pub(crate) fn from_line(e: LE) -> Self {
        Error::InterruptLine(e)
    }
}

impl<SE, LE> From<QueueClosed> for Error<SE, LE> {
    fn from(_: QueueClosed) -> Self {
        Error::QueueClosed
    }
}

impl<SE: fmt::Debug, LE: fmt::Debug> fmt::Display for Error<SE, LE> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Source(e) => write!(f, "expander bus error: {:?}", e),
            Error::InterruptLine(e) => write!(f, "interrupt line read error: {:?}", e),
            Error::QueueClosed => write!(f, "event queue closed"),
        }
    }
}

#[cfg(feature = "std")]
impl<SE: fmt::Debug, LE: fmt::Debug> std::error::Error for Error<SE, LE> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_side() {
        let e: Error<&str, ()> = Error::from_source("nak");
        assert_eq!(format!("{}", e), "expander bus error: \"nak\"");
        let e: Error<(), u8> = Error::from_line(3);
        assert_eq!(format!("{}", e), "interrupt line read error: 3");
        let e: Error<(), ()> = QueueClosed.into();
        assert_eq!(e, Error::QueueClosed);
    }
}
