//! Button and rotary encoder events from interrupt-driven GPIO expanders.
//!
//! GPIO expanders of the MCP23017 class provide 16 extra input pins over I2C or SPI, and signal a
//! change on any of them by asserting an interrupt output that stays asserted until the chip's
//! interrupt latch is cleared. Several expanders can share one microcontroller interrupt.
//!
//! This library turns those interrupts into debounced button presses and decoded rotary encoder
//! movements, delivered through bounded queues to application code. It does not talk to the chip
//! itself: you supply a driver implementing [`PinEventSource`], and any `embedded-hal` input pin
//! for each expander's interrupt line.
//!
//! # Construction
//!
//! To set up the library:
//!
//! - Construct an [`Expander`] for each chip, which takes ownership of its driver and its
//!   interrupt line, and bind buttons and rotary encoders to its pins.
//! - Call [`Expander::init`] to configure the bound pins, then wrap the expander in a mutex (see
//!   [Mutual exclusion](#mutual-exclusion)).
//! - Register every expander with a [`Registry`]. Slots are handed out in registration order.
//!
//! ```
//! # use gpio_expander_events::interface::noop::{IdleLine, NoopSource};
//! use gpio_expander_events::{
//!     DefaultMutex, Expander, ExpanderMutex, InterruptLine, Registry, TriggerMode,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut panel: Expander<_, _> = Expander::new(NoopSource, InterruptLine::active_low(IdleLine));
//! let volume = panel.add_rotary_encoder(0, 1, false, 200)?;
//! let mute = panel.add_button(2, TriggerMode::Low)?;
//! panel.init(0)?;
//!
//! let panel: DefaultMutex<_> = ExpanderMutex::new(panel);
//! let mut registry: Registry<_, _> = Registry::new();
//! let panel_id = registry.register(&panel)?;
//! # let _ = (volume, mute, panel_id);
//! # Ok(())
//! # }
//! ```
//!
//! # Dispatching
//!
//! *See [`InterruptBridge`] and [`Dispatcher`].*
//!
//! The chip cannot be read from an interrupt handler, so the work is split in two:
//!
//! - The handler attached to the shared interrupt calls [`InterruptBridge::fire`], which only
//!   flags a pending wake. Any number of firings before the dispatcher runs collapse into one.
//! - The [`Dispatcher`] runs in a thread or task of its own. When woken it services every
//!   expander whose line is asserted, lowest slot first, until none is. Servicing reads the
//!   triggering pin and the captured pin states, clears the latch, and feeds the change to the
//!   buttons and encoders on that pin.
//!
//! ```ignore
//! let bridge = InterruptBridge::new(DefaultNotify::new());
//! let (sink, receivers) = EventQueue::split(DEFAULT_QUEUE_DEPTH);
//!
//! /* attach `move || bridge.fire()` to the falling edge of the shared interrupt pin */
//!
//! std::thread::scope(|s| {
//!     s.spawn(|| {
//!         let mut dispatcher = Dispatcher::new(&registry, &bridge, StdClock::new(), sink);
//!         dispatcher.run()
//!     });
//!     for press in receivers.buttons.try_iter() { /* ... */ }
//! });
//! ```
//!
//! # Events
//!
//! *See [`button`] and [`rotary`].*
//!
//! Buttons are debounced per pin: a level change is accepted only once the debounce window has
//! passed since the last accepted change. Whether an accepted change is reported as a
//! [`ButtonEventKind::Pressed`] or [`ButtonEventKind::Released`], or not at all, depends on the
//! button's [`TriggerMode`].
//!
//! Rotary encoders report one [`RotaryEvent`] per detent, carrying the [`Direction`]. Transitions
//! where a state was missed cannot be attributed to a direction and are dropped.
//!
//! Events go to an [`EventSink`]. [`EventQueue::split`] gives one bounded queue per event kind,
//! and [`TaggedQueue`] a single queue of [`Event`]s; without `std`, a `heapless::spsc` producer
//! can be used. A full queue makes the dispatcher wait; events are never dropped.
//!
//! # Mutual exclusion
//!
//! The registry holds shared references to the expanders and the dispatcher needs mutable access
//! to whichever one it found, so each expander lives inside a mutex implementing
//! [`ExpanderMutex`]. Only the dispatcher locks an expander once it is running, so the lock is
//! uncontended in normal operation.
//!
//! In a `std` environment you may enable the `std` Cargo feature, and `DefaultMutex<T>` will be a
//! type alias to `std::sync::Mutex<T>` with a provided impl of `ExpanderMutex`. Similarly, for
//! Cortex-M environments using the `cortex-m` crate, enabling the `cortexm` Cargo feature will
//! alias `DefaultMutex<T>` to `cortex_m::interrupt::Mutex<core::cell::RefCell<T>>`, and
//! `DefaultNotify` to a wake flag that sleeps the core with `WFE`.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod button;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod expander;
pub mod interface;
pub mod mutex;
pub mod notify;
pub mod pins;
pub mod queue;
pub mod registry;
pub mod rotary;
pub mod time;

pub use button::{Button, ButtonEvent, ButtonEventKind};
pub use config::{
    Algorithm, ButtonId, ConfigError, Detents, EncoderConfig, EncoderId, ExpanderId, TriggerMode,
    DEFAULT_QUEUE_DEPTH,
};
pub use dispatcher::{DispatchStats, Dispatcher, DispatcherState};
pub use error::Error;
pub use expander::{Expander, InterruptLine, Service, Serviced};
pub use interface::PinEventSource;
#[cfg(any(feature = "std", feature = "cortexm"))]
pub use mutex::DefaultMutex;
pub use mutex::ExpanderMutex;
#[cfg(any(feature = "std", feature = "cortexm"))]
pub use notify::DefaultNotify;
pub use notify::{InterruptBridge, Notify};
pub use pins::{Level, PinSnapshot};
#[cfg(feature = "std")]
pub use queue::EventQueue;
pub use queue::{Event, EventSink, QueueClosed, TaggedQueue};
pub use registry::{Registry, RegistryFull};
pub use rotary::{Direction, RotaryEncoder, RotaryEvent};
#[cfg(feature = "std")]
pub use time::StdClock;
pub use time::Clock;
