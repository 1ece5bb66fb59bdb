//! Issuer-side operation handle.

use std::sync::Arc;

use crate::slot::OperationSlot;

/// Handle to one asynchronous operation
///
/// Cloning yields another view of the same operation; every clone observes
/// the same single result.
pub struct OperationHandle<T> {
    slot: Arc<OperationSlot<T>>,
}

impl<T> Clone for OperationHandle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> OperationHandle<T> {
    pub(crate) fn new(slot: Arc<OperationSlot<T>>) -> Self {
        Self { slot }
    }

    /// Convert results on the way out, e.g. from the engine's coordinate
    /// convention into the caller's
    pub fn map<U, F>(self, f: F) -> MappedHandle<T, F>
    where
        F: Fn(T) -> U,
    {
        MappedHandle { inner: self, f }
    }
}

impl<T: Clone> OperationHandle<T> {
    /// Result if available; never blocks
    pub fn poll(&self) -> Option<T> {
        self.slot.poll()
    }

    /// Block until the operation resolves
    pub fn wait(&self) -> T {
        self.slot.wait()
    }
}

/// An [`OperationHandle`] composed with a result transform
pub struct MappedHandle<T, F> {
    inner: OperationHandle<T>,
    f: F,
}

impl<T, U, F> MappedHandle<T, F>
where
    T: Clone,
    F: Fn(T) -> U,
{
    /// Transformed result if available; never blocks
    pub fn poll(&self) -> Option<U> {
        self.inner.poll().map(&self.f)
    }

    /// Block until the operation resolves, then transform
    pub fn wait(&self) -> U {
        (self.f)(self.inner.wait())
    }
}
