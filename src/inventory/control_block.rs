//! Per-entry inventory metadata: atomic state, refcount, and the
//! load-context hook consumed exactly once by the loading job.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::load_context::LoadContext;

/// Lifecycle state of a resource entry. `Requested` is folded into
/// `Loading` for dereference/wait purposes — both mean "not yet
/// `Ready`" — but is retained as a distinct variant because `has()`
/// reports it as present while `Empty` is not (see module docs).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum ResourceState {
    Empty = 0,
    Requested = 1,
    Loading = 2,
    Ready = 3,
    Released = 4,
    Error = 5,
}

impl ResourceState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Empty,
            1 => Self::Requested,
            2 => Self::Loading,
            3 => Self::Ready,
            4 => Self::Released,
            _ => Self::Error,
        }
    }
}

/// How an entry's lifetime is managed once its refcount drops to zero.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Retention {
    /// Normal case: deferred-released, can be resurrected.
    Reusable,
    /// Holds a synthetic extra refcount of 1 for the entry's whole
    /// lifetime; effectively never reaches a real refcount of 0.
    Permanent,
    /// Skips deduplication entirely and is freed immediately (not
    /// deferred) once its refcount hits 0.
    ForceNew,
}

pub(crate) struct ControlBlock<T> {
    pub(crate) id_hash: u64,
    pub(crate) id_text: String,
    state: AtomicU8,
    refcount: AtomicU32,
    data: Mutex<Option<T>>,
    wait_lock: Mutex<()>,
    wait_cv: Condvar,
    load_context: Mutex<Option<Arc<dyn LoadContext<T>>>>,
    pub(crate) retention: Retention,
}

impl<T> ControlBlock<T> {
    pub(crate) fn new(
        id_hash: u64,
        id_text: String,
        load_context: Arc<dyn LoadContext<T>>,
        retention: Retention,
    ) -> Self {
        let refcount = if retention == Retention::Permanent {
            1
        } else {
            0
        };
        Self {
            id_hash,
            id_text,
            state: AtomicU8::new(ResourceState::Empty as u8),
            refcount: AtomicU32::new(refcount),
            data: Mutex::new(None),
            wait_lock: Mutex::new(()),
            wait_cv: Condvar::new(),
            load_context: Mutex::new(Some(load_context)),
            retention,
        }
    }

    pub(crate) fn state(&self) -> ResourceState {
        ResourceState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn refcount(&self) -> u32 {
        self.refcount.load(Ordering::Acquire)
    }

    pub(crate) fn incref(&self) -> u32 {
        self.refcount.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrements the refcount, returning the new value.
    pub(crate) fn decref(&self) -> u32 {
        self.refcount.fetch_sub(1, Ordering::AcqRel) - 1
    }

    /// Attempts the `Empty -> Loading` transition. Returns `true` for
    /// exactly one caller across however many threads race this call —
    /// that caller owns spawning the load job.
    pub(crate) fn try_begin_loading(&self) -> bool {
        self.state
            .compare_exchange(
                ResourceState::Empty as u8,
                ResourceState::Loading as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Attempts to resurrect a `Released` entry straight back to
    /// `Ready` without reloading — the data is still present. Must be
    /// CAS, never a plain store, so a concurrent deferred-release sweep
    /// can't clobber a resurrection that landed first.
    pub(crate) fn try_resurrect(&self) -> bool {
        self.state
            .compare_exchange(
                ResourceState::Released as u8,
                ResourceState::Ready as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn mark_released(&self) {
        self.state.store(ResourceState::Released as u8, Ordering::Release);
    }

    /// Takes the load context, if still attached. Consumed exactly
    /// once, by whichever caller won `try_begin_loading`.
    pub(crate) fn take_load_context(&self) -> Option<Arc<dyn LoadContext<T>>> {
        self.load_context.lock().take()
    }

    /// Publishes `value` without yet changing the state — callers run
    /// `on_load_complete` between this and [`ControlBlock::settle`], per
    /// the contract that finalization sees the value but waiters don't
    /// unblock until after it runs.
    pub(crate) fn set_data(&self, value: T) {
        *self.data.lock() = Some(value);
    }

    /// Transitions to `Ready` or `Error` depending on `is_fallback` and
    /// wakes every waiter blocked in [`ControlBlock::wait_until_settled`].
    pub(crate) fn settle(&self, is_fallback: bool) {
        let final_state = if is_fallback {
            ResourceState::Error
        } else {
            ResourceState::Ready
        };
        let _guard = self.wait_lock.lock();
        self.state.store(final_state as u8, Ordering::Release);
        self.wait_cv.notify_all();
    }

    /// Blocks until the state is no longer `Loading`/`Requested`, i.e.
    /// until the entry has settled into `Ready`, `Error`, or
    /// `Released` (a handle deref'd after release is a programmer
    /// error surfaced by the caller, not by this wait).
    pub(crate) fn wait_until_settled(&self) {
        if !matches!(self.state(), ResourceState::Loading | ResourceState::Requested) {
            return;
        }
        let mut guard = self.wait_lock.lock();
        self.wait_cv.wait_while(&mut guard, |()| {
            matches!(self.state(), ResourceState::Loading | ResourceState::Requested)
        });
    }

    /// Runs `f` with a reference to the published data. Panics if
    /// called before the entry has ever been published — callers are
    /// expected to have gone through [`ControlBlock::wait_until_settled`]
    /// first.
    pub(crate) fn with_data<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.data.lock();
        let value = guard
            .as_ref()
            .expect("control block dereferenced before data was published");
        f(value)
    }

    pub(crate) fn take_data(&self) -> Option<T> {
        self.data.lock().take()
    }

    /// Direct access to the data lock, for `InvPtr::get`'s mapped guard.
    pub(crate) fn data_lock(&self) -> &Mutex<Option<T>> {
        &self.data
    }
}
