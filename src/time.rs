//! Millisecond time source used to timestamp pin transitions.

/// A free-running millisecond counter. The counter is allowed to wrap; all interval arithmetic in
/// this crate uses wrapping subtraction.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<F> Clock for F
where
    F: Fn() -> u32,
{
    fn now_ms(&self) -> u32 {
        self()
    }
}

/// Milliseconds elapsed from `earlier` to `now` on a wrapping counter.
pub(crate) fn elapsed_ms(now: u32, earlier: u32) -> u32 {
    now.wrapping_sub(earlier)
}

/// A `Clock` counting milliseconds since it was created.
#[cfg(feature = "std")]
pub struct StdClock {
    start: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_across_wrap() {
        assert_eq!(elapsed_ms(5, u32::max_value() - 4), 10);
        assert_eq!(elapsed_ms(25, 5), 20);
    }

    #[test]
    fn closure_clock() {
        let clock = || 42u32;
        assert_eq!(clock.now_ms(), 42);
    }

    #[cfg(feature = "std")]
    #[test]
    fn std_clock_is_monotonic() {
        let clock = StdClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
