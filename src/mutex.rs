//! Provides mutual exclusion around expanders for various environments.

/// Any type that can implement `ExpanderMutex` can guard an [`Expander`](crate::Expander) that
/// is shared between the setup code, the registry and the dispatcher.
///
/// Only the dispatcher locks an expander once it is running, so the lock is never contended in
/// normal operation; it exists so that a `Registry` of shared references can hand out mutable
/// access to the expander it found.
///
/// If the `std` feature is enabled, then `ExpanderMutex` is implemented for `std::sync::Mutex`. If
/// `cortexm` is enabled, then it is implemented for
/// `cortex_m::interrupt::Mutex<core::cell::RefCell>`, and the critical section masks interrupts
/// for the duration of the closure, bus transactions included.
///
/// If either of these features is enabled, then the type alias [`DefaultMutex<T>`] will point to
/// the corresponding mutex type to use.
pub trait ExpanderMutex<T> {
    /// Construct a new instance of this mutex containing the value `v`.
    fn new(v: T) -> Self;

    /// Lock the mutex and call the closure `f` with a mutable reference to the guarded value.
    /// Returns the value returned by `f`.
    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R;
}

#[cfg(feature = "std")]
pub type DefaultMutex<T> = std::sync::Mutex<T>;

#[cfg(all(feature = "cortexm", not(feature = "std")))]
pub type DefaultMutex<T> = cortex_m::interrupt::Mutex<core::cell::RefCell<T>>;

#[cfg(feature = "std")]
impl<T> ExpanderMutex<T> for std::sync::Mutex<T> {
    fn new(v: T) -> Self {
        std::sync::Mutex::new(v)
    }
    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        // A panic while servicing leaves the state machines consistent between events, so a
        // poisoned lock is still usable.
        let mut v = std::sync::Mutex::lock(self).unwrap_or_else(|e| e.into_inner());
        f(&mut v)
    }
}

#[cfg(feature = "cortexm")]
impl<T> ExpanderMutex<T> for cortex_m::interrupt::Mutex<core::cell::RefCell<T>> {
    fn new(v: T) -> Self {
        cortex_m::interrupt::Mutex::new(core::cell::RefCell::new(v))
    }
    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        cortex_m::interrupt::free(|cs| {
            let mut v = self.borrow(cs).borrow_mut();
            f(&mut v)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_gives_mutable_access() {
        let m: DefaultMutex<u8> = ExpanderMutex::new(1);
        ExpanderMutex::lock(&m, |v| *v += 1);
        assert_eq!(ExpanderMutex::lock(&m, |v| *v), 2);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let m: std::sync::Arc<DefaultMutex<u8>> = std::sync::Arc::new(ExpanderMutex::new(7));
        let m2 = m.clone();
        let _ = std::thread::spawn(move || {
            ExpanderMutex::lock(&*m2, |_| panic!("poison"));
        })
        .join();
        assert_eq!(ExpanderMutex::lock(&*m, |v| *v), 7);
    }
}
