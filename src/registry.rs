//! The table of expanders sharing one interrupt.
//!
//! Each registered expander gets the next free slot and keeps it for the life of the program.
//! After the shared interrupt fires the dispatcher asks the registry which expander still holds
//! its line asserted; the scan goes in slot order, so when several are asserted at once the
//! earliest registered wins and the others are found on later passes.

use core::fmt;
use core::marker::PhantomData;

use heapless::Vec;
use log::debug;

use crate::config::{ExpanderId, DEFAULT_MAX_EXPANDERS};
use crate::expander::Service;
use crate::mutex::ExpanderMutex;

/// Every slot of the registry is taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistryFull;

impl fmt::Display for RegistryFull {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "expander registry is full")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RegistryFull {}

/// Up to `N` expanders of type `E`, each guarded by a mutex `M`.
///
/// The registry only borrows the expanders, so they are typically statics or live in a scope that
/// outlives the dispatcher.
///
/// ```
/// # use gpio_expander_events::interface::noop::{IdleLine, NoopSource};
/// use gpio_expander_events::{DefaultMutex, Expander, ExpanderMutex, InterruptLine, Registry};
///
/// type Ex = Expander<NoopSource, IdleLine>;
/// let first: DefaultMutex<Ex> =
///     ExpanderMutex::new(Expander::new(NoopSource, InterruptLine::active_low(IdleLine)));
/// let mut registry: Registry<Ex, _> = Registry::new();
/// let id = registry.register(&first).unwrap();
/// assert_eq!(id.0, 0);
/// assert!(registry.find_active().unwrap().is_none());
/// ```
pub struct Registry<'a, E, M, const N: usize = DEFAULT_MAX_EXPANDERS> {
    slots: Vec<&'a M, N>,
    _expander: PhantomData<fn() -> E>,
}

impl<'a, E, M, const N: usize> Registry<'a, E, M, N>
where
    E: Service,
    M: ExpanderMutex<E>,
{
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            _expander: PhantomData,
        }
    }

    /// Add `expander` to the next free slot and return the slot's id.
    pub fn register(&mut self, expander: &'a M) -> Result<ExpanderId, RegistryFull> {
        let id = ExpanderId(self.slots.len() as u8);
        self.slots.push(expander).map_err(|_| RegistryFull)?;
        debug!("registered expander {}", id.0);
        Ok(id)
    }

    /// The first expander, in slot order, whose interrupt line is asserted.
    pub fn find_active(&self) -> Result<Option<(ExpanderId, &'a M)>, E::LineError> {
        for (slot, &expander) in self.slots.iter().enumerate() {
            if expander.lock(|e| e.interrupt_asserted())? {
                return Ok(Some((ExpanderId(slot as u8), expander)));
            }
        }
        Ok(None)
    }

    pub fn get(&self, id: ExpanderId) -> Option<&'a M> {
        self.slots.get(id.0 as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        N
    }
}

impl<'a, E, M, const N: usize> Default for Registry<'a, E, M, N>
where
    E: Service,
    M: ExpanderMutex<E>,
{
    fn default() -> Self {
        Self::new()
    }
}
