//! Single-assignment result slot.

use std::sync::{Condvar, Mutex, MutexGuard};

/// Write-once slot shared between the issuing and resolving threads
///
/// The first [`OperationSlot::fulfill`] wins; every later attempt is a
/// no-op. Waiters are woken on fulfillment.
pub(crate) struct OperationSlot<T> {
    state: Mutex<Option<T>>,
    cond: Condvar,
}

impl<T> OperationSlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    fn locked(&self) -> MutexGuard<'_, Option<T>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Store the result if the slot is still empty; true when this call won
    pub(crate) fn fulfill(&self, value: T) -> bool {
        let mut state = self.locked();
        if state.is_some() {
            return false;
        }
        *state = Some(value);
        self.cond.notify_all();
        true
    }
}

impl<T: Clone> OperationSlot<T> {
    /// Current result without blocking
    pub(crate) fn poll(&self) -> Option<T> {
        self.locked().clone()
    }

    /// Block until the slot is fulfilled
    pub(crate) fn wait(&self) -> T {
        let mut state = self.locked();
        loop {
            if let Some(value) = state.as_ref() {
                return value.clone();
            }
            state = match self.cond.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}
