//! `InvPtr<T>`: a refcounted smart handle into the inventory.

use std::sync::Arc;

use parking_lot::MappedMutexGuard;

use super::control_block::{ControlBlock, ResourceState};

/// Implemented by the owning per-type resource system; invoked when an
/// `InvPtr`'s refcount reaches zero so the system can enqueue the
/// deferred release (or free immediately for `ForceNew` entries).
pub(crate) trait ReleaseSink<T>: Send + Sync {
    fn on_release(&self, block: &Arc<ControlBlock<T>>);
}

/// A refcounted handle to an inventory entry of type `T`.
///
/// Dereferencing (via [`InvPtr::get`]) blocks until the entry's state is
/// no longer `Loading`/`Requested`. Cloning increments the refcount;
/// dropping the last clone notifies the owning resource system.
pub struct InvPtr<T> {
    pub(crate) control: Arc<ControlBlock<T>>,
    pub(crate) owner: Arc<dyn ReleaseSink<T>>,
}

impl<T> InvPtr<T> {
    /// Builds a handle over an already-refcounted control block. The
    /// caller (the resource system) is responsible for having already
    /// incremented the refcount for this handle's share.
    pub(crate) fn from_parts(control: Arc<ControlBlock<T>>, owner: Arc<dyn ReleaseSink<T>>) -> Self {
        Self { control, owner }
    }

    /// Blocks until loading has settled, then returns a guard
    /// dereferencing to the published value. Panics (a programmer
    /// error, per the spec's fatal-in-debug policy) if the entry never
    /// reached `Ready`/`Error`/`Released` — which cannot happen through
    /// the public API, since `Empty` handles always have a load in
    /// flight by construction.
    pub fn get(&self) -> MappedMutexGuard<'_, T> {
        self.control.wait_until_settled();
        debug_assert!(
            !matches!(self.control.state(), ResourceState::Empty),
            "InvPtr settled into Empty; this indicates a missing load context upstream"
        );
        parking_lot::MutexGuard::map(self.control.data_lock().lock(), |opt| {
            opt.as_mut()
                .expect("control block settled without publishing data")
        })
    }

    /// True once the load has completed, successfully or not.
    #[must_use]
    pub fn has_loaded(&self) -> bool {
        matches!(
            self.control.state(),
            ResourceState::Ready | ResourceState::Error
        )
    }

    /// True if the published value is a load-failure fallback rather
    /// than the genuine asset.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.control.state() == ResourceState::Error
    }

    #[must_use]
    pub fn refcount(&self) -> u32 {
        self.control.refcount()
    }
}

impl<T> Clone for InvPtr<T> {
    fn clone(&self) -> Self {
        self.control.incref();
        Self {
            control: self.control.clone(),
            owner: self.owner.clone(),
        }
    }
}

impl<T> Drop for InvPtr<T> {
    fn drop(&mut self) {
        if self.control.decref() == 0 {
            self.owner.on_release(&self.control);
        }
    }
}
