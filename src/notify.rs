//! The hand-off from the expander interrupt handler to the dispatcher.
//!
//! The interrupt handler must return quickly and cannot talk to the chip: reading it over the bus
//! from interrupt context would stall with the interrupt line still asserted. All it does is set a
//! pending flag and wake whatever is waiting on it. Any number of firings before the dispatcher
//! gets to run collapse into one pending wake; the dispatcher makes up for that by polling every
//! registered line until none is asserted.

/// A wake primitive that can be signalled from interrupt context.
pub trait Notify {
    /// Mark a wake as pending and wake the waiter. Must not block or allocate.
    fn notify(&self);

    /// Block until a wake is pending, then consume it.
    fn wait(&self);

    /// Consume a pending wake without blocking. Returns whether one was pending.
    fn try_take(&self) -> bool;
}

/// Wake primitive for hosted targets: a flag guarded by a mutex, with a condition variable to
/// park the dispatcher thread.
#[cfg(feature = "std")]
pub struct StdNotify {
    pending: std::sync::Mutex<bool>,
    wakeup: std::sync::Condvar,
}

#[cfg(feature = "std")]
impl StdNotify {
    pub fn new() -> Self {
        Self {
            pending: std::sync::Mutex::new(false),
            wakeup: std::sync::Condvar::new(),
        }
    }

    fn flag(&self) -> std::sync::MutexGuard<'_, bool> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Like [`Notify::wait`], but give up after `timeout`. Returns whether a wake was consumed.
    pub fn wait_timeout(&self, timeout: std::time::Duration) -> bool {
        let guard = self.flag();
        let (mut pending, _) = self
            .wakeup
            .wait_timeout_while(guard, timeout, |pending| !*pending)
            .unwrap_or_else(|e| e.into_inner());
        let woken = *pending;
        *pending = false;
        woken
    }
}

#[cfg(feature = "std")]
impl Default for StdNotify {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Notify for StdNotify {
    fn notify(&self) {
        *self.flag() = true;
        self.wakeup.notify_one();
    }

    fn wait(&self) {
        let mut pending = self.flag();
        while !*pending {
            pending = self.wakeup.wait(pending).unwrap_or_else(|e| e.into_inner());
        }
        *pending = false;
    }

    fn try_take(&self) -> bool {
        let mut pending = self.flag();
        let woken = *pending;
        *pending = false;
        woken
    }
}

/// Wake primitive for Cortex-M targets: a flag set inside a critical section, with `SEV`/`WFE`
/// to sleep the core until the interrupt handler runs.
#[cfg(feature = "cortexm")]
pub struct CortexMNotify {
    pending: cortex_m::interrupt::Mutex<core::cell::Cell<bool>>,
}

#[cfg(feature = "cortexm")]
impl CortexMNotify {
    pub fn new() -> Self {
        Self {
            pending: cortex_m::interrupt::Mutex::new(core::cell::Cell::new(false)),
        }
    }
}

#[cfg(feature = "cortexm")]
impl Notify for CortexMNotify {
    fn notify(&self) {
        cortex_m::interrupt::free(|cs| self.pending.borrow(cs).set(true));
        cortex_m::asm::sev();
    }

    fn wait(&self) {
        while !self.try_take() {
            cortex_m::asm::wfe();
        }
    }

    fn try_take(&self) -> bool {
        cortex_m::interrupt::free(|cs| self.pending.borrow(cs).replace(false))
    }
}

#[cfg(feature = "std")]
pub type DefaultNotify = StdNotify;

#[cfg(all(feature = "cortexm", not(feature = "std")))]
pub type DefaultNotify = CortexMNotify;

/// The interrupt-side half of the dispatcher: call [`InterruptBridge::fire`] from the handler
/// attached to the expanders' shared interrupt (falling edge, as the lines are active-low).
pub struct InterruptBridge<N: Notify> {
    notify: N,
}

impl<N: Notify> InterruptBridge<N> {
    pub fn new(notify: N) -> Self {
        Self { notify }
    }

    /// Signal the dispatcher. Safe to call from interrupt context: it does no bus I/O, never
    /// blocks and never touches the event queues.
    #[inline]
    pub fn fire(&self) {
        self.notify.notify();
    }

    /// Block until the bridge has fired at least once since the last wake was consumed.
    pub fn wait(&self) {
        self.notify.wait();
    }

    /// Consume a pending wake, if any, without blocking.
    pub fn try_take(&self) -> bool {
        self.notify.try_take()
    }

    pub fn notifier(&self) -> &N {
        &self.notify
    }
}

#[cfg(feature = "std")]
impl Default for InterruptBridge<StdNotify> {
    fn default() -> Self {
        Self::new(StdNotify::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn firings_coalesce() {
        let bridge = InterruptBridge::new(StdNotify::new());
        bridge.fire();
        bridge.fire();
        bridge.fire();
        assert!(bridge.try_take());
        assert!(!bridge.try_take());
    }

    #[test]
    fn wait_returns_after_fire_from_other_thread() {
        let bridge = Arc::new(InterruptBridge::new(StdNotify::new()));
        let isr = bridge.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            isr.fire();
        });
        bridge.wait();
        handle.join().unwrap();
        assert!(!bridge.try_take());
    }

    #[test]
    fn wait_consumes_an_earlier_fire() {
        let bridge = InterruptBridge::<StdNotify>::default();
        bridge.fire();
        bridge.wait();
        assert!(!bridge.try_take());
    }

    #[test]
    fn wait_timeout_expires() {
        let notify = StdNotify::new();
        assert!(!notify.wait_timeout(Duration::from_millis(5)));
        notify.notify();
        assert!(notify.wait_timeout(Duration::from_millis(5)));
    }
}
