//! A single per-type `T` resource system: the entry map, the
//! deferred-release FIFO, and the load-job spawning logic.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::errors::{Result, WeaveError};
use crate::worker_pool::WorkerPool;

use super::control_block::{ControlBlock, Retention};
use super::inv_ptr::{InvPtr, ReleaseSink};
use super::load_context::{LoadContext, LoadOutcome};

/// Implemented so [`super::Inventory`] can hold a type-erased map of
/// these without being generic over every `T` ever requested.
pub(crate) trait AnyResourceSystem: Send + Sync {
    fn on_end_of_frame(&self);
    fn destroy(&self);
}

pub(crate) struct ResourceSystem<T> {
    entries: RwLock<FxHashMap<u64, Arc<ControlBlock<T>>>>,
    deferred: Mutex<VecDeque<(u64, u64)>>,
    worker_pool: Arc<WorkerPool>,
    frame_counter: Arc<AtomicU64>,
    frames_to_retain: u64,
}

impl<T: Send + Sync + 'static> ResourceSystem<T> {
    pub(crate) fn new(
        worker_pool: Arc<WorkerPool>,
        frame_counter: Arc<AtomicU64>,
        frames_to_retain: u64,
    ) -> Arc<Self> {
        Arc::new(Self {
            entries: RwLock::new(FxHashMap::default()),
            deferred: Mutex::new(VecDeque::new()),
            worker_pool,
            frame_counter,
            frames_to_retain,
        })
    }

    /// Implements the four-step `Inventory::get` algorithm (read-lock
    /// fast path, write-lock double-checked creation, handle
    /// construction with the `Empty -> Loading` / `Released -> Ready`
    /// transitions).
    pub(crate) fn get(
        self: &Arc<Self>,
        id_hash: u64,
        id_text: String,
        load_ctx: Option<Arc<dyn LoadContext<T>>>,
        retention: Retention,
    ) -> Result<InvPtr<T>> {
        if let Some(block) = self.entries.read().get(&id_hash) {
            return Ok(self.acquire(block.clone()));
        }

        let mut entries = self.entries.write();
        if let Some(block) = entries.get(&id_hash) {
            return Ok(self.acquire(block.clone()));
        }
        let load_ctx = load_ctx.ok_or(WeaveError::MissingLoadContext)?;
        let block = Arc::new(ControlBlock::new(id_hash, id_text, load_ctx, retention));
        entries.insert(id_hash, block.clone());
        drop(entries);

        Ok(self.acquire(block))
    }

    #[must_use]
    pub(crate) fn has(&self, id_hash: u64) -> bool {
        use super::control_block::ResourceState;
        self.entries.read().get(&id_hash).is_some_and(|b| {
            matches!(
                b.state(),
                ResourceState::Requested | ResourceState::Loading | ResourceState::Ready
            )
        })
    }

    #[must_use]
    pub(crate) fn has_loaded(&self, id_hash: u64) -> bool {
        self.entries
            .read()
            .get(&id_hash)
            .is_some_and(InvPtr::<T>::ready_or_error_static)
    }

    fn acquire(self: &Arc<Self>, block: Arc<ControlBlock<T>>) -> InvPtr<T> {
        block.incref();
        if block.try_begin_loading() {
            self.spawn_load(block.clone());
        } else {
            // Either already loading/ready/error, or a `Released`
            // entry resurrected right back to `Ready` without reload.
            let _ = block.try_resurrect();
        }
        InvPtr::from_parts(block, self.clone() as Arc<dyn ReleaseSink<T>>)
    }

    fn spawn_load(self: &Arc<Self>, block: Arc<ControlBlock<T>>) {
        // The loading job holds its own reference so the entry can't be
        // released out from under it while the job is in flight.
        block.incref();
        let owner: Arc<dyn ReleaseSink<T>> = self.clone();
        let loader_handle = InvPtr::from_parts(block.clone(), owner);
        let Some(load_ctx) = block.take_load_context() else {
            // Another thread already consumed it; nothing to do here.
            return;
        };

        let _ = self.worker_pool.enqueue(move || {
            load_ctx.on_load_begin(&loader_handle);
            let (value, is_fallback) = match load_ctx.load(&loader_handle) {
                LoadOutcome::Loaded(v) => (v, false),
                LoadOutcome::Fallback(v) => (v, true),
            };
            loader_handle.control.set_data(value);
            load_ctx.on_load_complete(&loader_handle);
            loader_handle.control.settle(is_fallback);
        });
    }
}

impl<T: Send + Sync + 'static> ReleaseSink<T> for ResourceSystem<T> {
    fn on_release(&self, block: &Arc<ControlBlock<T>>) {
        block.mark_released();
        if block.retention == Retention::ForceNew {
            self.destroy_if_zero(block.id_hash);
        } else {
            let frame = self.frame_counter.load(Ordering::Acquire);
            self.deferred.lock().push_back((frame, block.id_hash));
        }
    }
}

impl<T: Send + Sync + 'static> AnyResourceSystem for ResourceSystem<T> {
    fn on_end_of_frame(&self) {
        let current = self.frame_counter.load(Ordering::Acquire);
        let mut deferred = self.deferred.lock();
        while let Some(&(enqueued_frame, id_hash)) = deferred.front() {
            if enqueued_frame + self.frames_to_retain > current {
                break;
            }
            deferred.pop_front();
            drop(deferred);
            self.destroy_if_zero(id_hash);
            deferred = self.deferred.lock();
        }
    }

    fn destroy(&self) {
        self.entries.write().clear();
        self.deferred.lock().clear();
    }
}

impl<T: Send + Sync + 'static> ResourceSystem<T> {
    fn destroy_if_zero(&self, id_hash: u64) {
        let mut entries = self.entries.write();
        if let Some(block) = entries.get(&id_hash) {
            if block.refcount() == 0 {
                entries.remove(&id_hash);
            }
            // else: resurrected before the sweep reached it — leave it.
        }
    }
}

impl<T> InvPtr<T> {
    fn ready_or_error_static(block: &Arc<ControlBlock<T>>) -> bool {
        use super::control_block::ResourceState;
        matches!(block.state(), ResourceState::Ready | ResourceState::Error)
    }
}
