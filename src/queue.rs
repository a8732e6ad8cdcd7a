//! Bounded queues carrying decoded events from the dispatcher to the application.
//!
//! Sending blocks while a queue is full. The dispatcher is the only sender and runs outside
//! interrupt context, so a stalled consumer stalls the dispatcher, further hardware interrupts
//! coalesce in the [`InterruptBridge`](crate::InterruptBridge), and the expanders keep their
//! latches asserted until there is room again. Events are never dropped.

use core::fmt;

use crate::button::ButtonEvent;
use crate::rotary::RotaryEvent;

/// Any event the dispatcher can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Button(ButtonEvent),
    Rotary(RotaryEvent),
}

impl From<ButtonEvent> for Event {
    fn from(event: ButtonEvent) -> Self {
        Event::Button(event)
    }
}

impl From<RotaryEvent> for Event {
    fn from(event: RotaryEvent) -> Self {
        Event::Rotary(event)
    }
}

/// The receiving side of a queue has gone away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueClosed;

impl fmt::Display for QueueClosed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "event queue closed")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for QueueClosed {}

/// The sending side of a bounded queue of `T`.
pub trait EventSender<T> {
    /// Enqueue `event`, waiting for space if the queue is full.
    fn send(&mut self, event: T) -> Result<(), QueueClosed>;
}

/// Where the dispatcher delivers events.
pub trait EventSink {
    fn button(&mut self, event: ButtonEvent) -> Result<(), QueueClosed>;
    fn rotary(&mut self, event: RotaryEvent) -> Result<(), QueueClosed>;
}

/// One queue per event kind.
pub struct SplitQueues<B, R> {
    pub buttons: B,
    pub rotary: R,
}

impl<B, R> EventSink for SplitQueues<B, R>
where
    B: EventSender<ButtonEvent>,
    R: EventSender<RotaryEvent>,
{
    fn button(&mut self, event: ButtonEvent) -> Result<(), QueueClosed> {
        self.buttons.send(event)
    }
    fn rotary(&mut self, event: RotaryEvent) -> Result<(), QueueClosed> {
        self.rotary.send(event)
    }
}

/// A single queue carrying both kinds as [`Event`]s, preserving their relative order.
pub struct TaggedQueue<S>(pub S);

impl<S> EventSink for TaggedQueue<S>
where
    S: EventSender<Event>,
{
    fn button(&mut self, event: ButtonEvent) -> Result<(), QueueClosed> {
        self.0.send(Event::Button(event))
    }
    fn rotary(&mut self, event: RotaryEvent) -> Result<(), QueueClosed> {
        self.0.send(Event::Rotary(event))
    }
}

/// Lock-free single-producer queue for `no_std` targets. Sending spins while the queue is full.
impl<'q, T, const N: usize> EventSender<T> for heapless::spsc::Producer<'q, T, N> {
    fn send(&mut self, event: T) -> Result<(), QueueClosed> {
        let mut event = event;
        loop {
            match self.enqueue(event) {
                Ok(()) => return Ok(()),
                Err(back) => {
                    event = back;
                    core::hint::spin_loop();
                }
            }
        }
    }
}

#[cfg(feature = "std")]
pub use self::channel::{EventQueue, EventReceivers, QueueReceiver, QueueSender};

#[cfg(feature = "std")]
mod channel {
    //! Queues backed by `std::sync::mpsc::sync_channel`.

    use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
    use std::time::Duration;

    use super::{EventSender, QueueClosed, SplitQueues};
    use crate::button::ButtonEvent;
    use crate::rotary::RotaryEvent;

    /// Constructors for bounded channels.
    pub struct EventQueue;

    impl EventQueue {
        /// A single bounded queue holding at most `depth` events.
        pub fn bounded<T>(depth: usize) -> (QueueSender<T>, QueueReceiver<T>) {
            let (tx, rx) = mpsc::sync_channel(depth);
            (QueueSender(tx), QueueReceiver(rx))
        }

        /// One bounded queue for button events and one for rotary events, `depth` each.
        pub fn split(
            depth: usize,
        ) -> (
            SplitQueues<QueueSender<ButtonEvent>, QueueSender<RotaryEvent>>,
            EventReceivers,
        ) {
            let (buttons, button_rx) = Self::bounded(depth);
            let (rotary, rotary_rx) = Self::bounded(depth);
            (
                SplitQueues { buttons, rotary },
                EventReceivers {
                    buttons: button_rx,
                    rotary: rotary_rx,
                },
            )
        }
    }

    /// The application's ends of [`EventQueue::split`].
    pub struct EventReceivers {
        pub buttons: QueueReceiver<ButtonEvent>,
        pub rotary: QueueReceiver<RotaryEvent>,
    }

    /// Sending end of a bounded channel.
    pub struct QueueSender<T>(SyncSender<T>);

    impl<T> Clone for QueueSender<T> {
        fn clone(&self) -> Self {
            QueueSender(self.0.clone())
        }
    }

    impl<T> EventSender<T> for QueueSender<T> {
        fn send(&mut self, event: T) -> Result<(), QueueClosed> {
            self.0.send(event).map_err(|_| QueueClosed)
        }
    }

    /// Receiving end of a bounded channel.
    pub struct QueueReceiver<T>(Receiver<T>);

    impl<T> QueueReceiver<T> {
        /// Block until an event arrives.
        pub fn recv(&self) -> Result<T, QueueClosed> {
            self.0.recv().map_err(|_| QueueClosed)
        }

        /// Block until an event arrives or `timeout` elapses, returning `Ok(None)` on timeout.
        pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<T>, QueueClosed> {
            match self.0.recv_timeout(timeout) {
                Ok(event) => Ok(Some(event)),
                Err(RecvTimeoutError::Timeout) => Ok(None),
                Err(RecvTimeoutError::Disconnected) => Err(QueueClosed),
            }
        }

        /// Take an event if one is waiting.
        pub fn try_recv(&self) -> Result<Option<T>, QueueClosed> {
            match self.0.try_recv() {
                Ok(event) => Ok(Some(event)),
                Err(TryRecvError::Empty) => Ok(None),
                Err(TryRecvError::Disconnected) => Err(QueueClosed),
            }
        }

        /// Iterate over the events waiting right now, without blocking.
        pub fn try_iter(&self) -> impl Iterator<Item = T> + '_ {
            self.0.try_iter()
        }
    }
}
