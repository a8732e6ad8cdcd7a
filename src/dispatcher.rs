//! The deferred half of interrupt handling.
//!
//! The dispatcher sleeps on the [`InterruptBridge`] until the shared interrupt fires, then keeps
//! asking the [`Registry`] for an expander with its line asserted and services it, until no line
//! is asserted any more. Servicing an expander clears its latch, which releases its line, so
//! every pass either makes progress or ends the drain. Interrupts that fire during a drain leave
//! a wake pending and cause one more (possibly empty) drain.

use core::convert::Infallible;

use log::debug;

use crate::config::ExpanderId;
use crate::error::Error;
use crate::expander::Service;
use crate::mutex::ExpanderMutex;
use crate::notify::{InterruptBridge, Notify};
use crate::queue::EventSink;
use crate::registry::Registry;
use crate::time::Clock;

/// Where the dispatcher is in its cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatcherState {
    /// Waiting for the interrupt to fire.
    Idle,
    /// Looking for an expander with its line asserted.
    Resolving,
    /// Reading and routing one expander's interrupt.
    Servicing,
}

/// Running counts kept by a [`Dispatcher`]. All counters wrap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Wakes consumed from the bridge.
    pub wakes: u32,
    /// Expander interrupts serviced.
    pub serviced: u32,
    /// Events delivered to the sink.
    pub events: u32,
    /// Wakes, or explicit service requests, that found no line asserted.
    pub spurious: u32,
}

type DispatchError<E> = Error<<E as Service>::SourceError, <E as Service>::LineError>;

/// Services the expanders of one registry whenever their shared interrupt fires.
///
/// `C` timestamps events and drives debouncing; `S` receives the decoded events. The dispatcher
/// is the only place that locks the expanders after setup, and it never runs in interrupt
/// context.
pub struct Dispatcher<'a, E, M, N, C, S, const X: usize>
where
    N: Notify,
{
    registry: &'a Registry<'a, E, M, X>,
    bridge: &'a InterruptBridge<N>,
    clock: C,
    sink: S,
    state: DispatcherState,
    stats: DispatchStats,
}

impl<'a, E, M, N, C, S, const X: usize> Dispatcher<'a, E, M, N, C, S, X>
where
    E: Service,
    M: ExpanderMutex<E>,
    N: Notify,
    C: Clock,
    S: EventSink,
{
    pub fn new(
        registry: &'a Registry<'a, E, M, X>,
        bridge: &'a InterruptBridge<N>,
        clock: C,
        sink: S,
    ) -> Self {
        Self {
            registry,
            bridge,
            clock,
            sink,
            state: DispatcherState::Idle,
            stats: DispatchStats::default(),
        }
    }

    fn step(&mut self) -> Result<Option<ExpanderId>, DispatchError<E>> {
        self.state = DispatcherState::Resolving;
        let found = self.registry.find_active().map_err(|e| {
            self.state = DispatcherState::Idle;
            Error::from_line(e)
        })?;
        let (id, expander) = match found {
            Some(found) => found,
            None => {
                self.state = DispatcherState::Idle;
                return Ok(None);
            }
        };

        self.state = DispatcherState::Servicing;
        let now_ms = self.clock.now_ms();
        let sink = &mut self.sink;
        let result = expander.lock(|e| e.service(id, now_ms, sink));
        self.state = DispatcherState::Idle;

        let serviced = result?;
        self.stats.serviced = self.stats.serviced.wrapping_add(1);
        self.stats.events = self.stats.events.wrapping_add(serviced.events as u32);
        Ok(Some(id))
    }

    /// Service at most one expander: the lowest-slot one with its line asserted. Returns its id,
    /// or `None` if no line was asserted, which counts as a spurious wake.
    pub fn service_pending(&mut self) -> Result<Option<ExpanderId>, DispatchError<E>> {
        let serviced = self.step()?;
        if serviced.is_none() {
            self.spurious();
        }
        Ok(serviced)
    }

    /// Service expanders until no line is asserted. Returns how many interrupts were serviced.
    pub fn drain(&mut self) -> Result<usize, DispatchError<E>> {
        let mut serviced = 0;
        while self.step()?.is_some() {
            serviced += 1;
        }
        if serviced == 0 {
            self.spurious();
        }
        Ok(serviced)
    }

    fn spurious(&mut self) {
        self.stats.spurious = self.stats.spurious.wrapping_add(1);
        debug!("spurious wake, no expander line asserted");
    }

    /// Block until the interrupt fires, then drain.
    pub fn run_once(&mut self) -> Result<usize, DispatchError<E>> {
        self.bridge.wait();
        self.stats.wakes = self.stats.wakes.wrapping_add(1);
        self.drain()
    }

    /// Dispatch forever. Only returns if servicing fails.
    ///
    /// Lines already asserted before the first wake are serviced too, since their edge may have
    /// come before the interrupt handler was attached.
    pub fn run(&mut self) -> Result<Infallible, DispatchError<E>> {
        while self.step()?.is_some() {}
        loop {
            self.run_once()?;
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Stop dispatching and give back the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }
}
