//! # Coordinator
//!
//! Bridges callback-driven engine completions to blocking and polling
//! consumers.
//!
//! The engine accepts map operations (save, localize) and resolves them
//! later, from its own processing thread, by invoking a completion callback.
//! The issuing thread meanwhile wants either a blocking wait (save) or a
//! pollable handle (localize). [`Coordinator::begin`] produces both ends of
//! that bridge: a one-shot completion function for the engine side and an
//! [`OperationHandle`] for the issuer.
//!
//! Guarantees:
//! - exactly one completion per operation; later completions are ignored
//! - [`Coordinator::shutdown`] force-resolves every outstanding operation
//!   with its terminal value so no waiter blocks forever, skipping
//!   operations that already completed

mod handle;
mod slot;

pub use handle::{MappedHandle, OperationHandle};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use slab::Slab;
use tracing::{debug, info, warn};

use crate::slot::OperationSlot;

/// One-shot completion function handed to the engine side.
/// May be invoked from any thread; at most the first invocation takes effect.
pub type Completion<T> = Box<dyn FnOnce(T) + Send>;

/// Lock a mutex, recovering the guard if a panicking holder poisoned it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Registry of outstanding asynchronous operations
pub struct Coordinator {
    /// Force-resolution thunks for operations still awaiting completion
    pending: Mutex<Slab<Box<dyn FnOnce() + Send>>>,
    shut_down: AtomicBool,
}

impl Coordinator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(Slab::new()),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Operations issued but not yet completed
    pub fn outstanding(&self) -> usize {
        lock(&self.pending).len()
    }

    /// True once [`Coordinator::shutdown`] has run
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Open a new operation
    ///
    /// Returns the completion function for the resolving side and the handle
    /// for the issuing side. `terminal` is the value the operation resolves
    /// to if the system shuts down before the completion fires.
    ///
    /// When the engine rejects a request synchronously, no callback will
    /// ever fire; the issuer must invoke the completion itself with its
    /// failure value.
    pub fn begin<T>(self: &Arc<Self>, terminal: T) -> (Completion<T>, OperationHandle<T>)
    where
        T: Clone + Send + 'static,
    {
        let slot = Arc::new(OperationSlot::new());

        let key = {
            let force_slot = Arc::clone(&slot);
            lock(&self.pending).insert(Box::new(move || {
                force_slot.fulfill(terminal);
            }))
        };
        metrics::counter!("coordinator_operations_total").increment(1);

        let coordinator = Arc::clone(self);
        let completion_slot = Arc::clone(&slot);
        let completion: Completion<T> = Box::new(move |value| {
            if completion_slot.fulfill(value) {
                metrics::counter!("coordinator_completions_total").increment(1);
                let _ = lock(&coordinator.pending).try_remove(key);
            } else {
                warn!("duplicate completion for an already-resolved operation, ignoring");
            }
        });

        // A request issued after shutdown resolves immediately; its engine
        // callback, if any, lands on an already-fulfilled slot.
        if self.shut_down.load(Ordering::Acquire) {
            debug!("operation issued after shutdown, force-resolving");
            if let Some(force) = lock(&self.pending).try_remove(key) {
                force();
            }
        }

        (completion, OperationHandle::new(slot))
    }

    /// Force-resolve every outstanding operation with its terminal value
    ///
    /// Already-completed operations are untouched; their slots refuse a
    /// second fulfillment. Idempotent.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);

        let forced: Vec<Box<dyn FnOnce() + Send>> = lock(&self.pending).drain().collect();
        if !forced.is_empty() {
            info!(
                outstanding = forced.len(),
                "force-resolving outstanding operations"
            );
            metrics::counter!("coordinator_forced_total").increment(forced.len() as u64);
        }
        for force in forced {
            force();
        }
    }
}
