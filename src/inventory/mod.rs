//! The central resource cache: dedup-by-key, async load dispatch onto
//! a worker pool, and frame-delayed release.
//!
//! Grounded on SaberEngine's `Inventory`/`InvPtr` pair: callers never
//! see raw resources, only [`InvPtr<T>`] handles that block on first
//! dereference and keep the entry alive until the last clone drops.

mod control_block;
mod inv_ptr;
mod load_context;
mod resource_system;

pub use control_block::Retention;
pub use inv_ptr::InvPtr;
pub use load_context::{LoadContext, LoadOutcome};

use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::key::KeyLike;
use crate::worker_pool::WorkerPool;

use resource_system::{AnyResourceSystem, ResourceSystem};

/// How many end-of-frame sweeps a deferred-released entry survives
/// before it's actually dropped; tunable so short-lived borrow/return
/// churn (e.g. re-requesting the same mesh next frame) dedups for free.
const DEFAULT_FRAMES_TO_RETAIN: u64 = 1;

/// One entry in [`Inventory::systems`]: the concretely-typed system
/// kept around for downcasting back to `Arc<ResourceSystem<T>>`, plus
/// the same system coerced to the type-erased trait used for
/// per-frame sweeps and shutdown, which don't need to know `T`.
struct SystemEntry {
    typed: Box<dyn Any + Send + Sync>,
    erased: Arc<dyn AnyResourceSystem>,
}

/// Type-erased container over one [`ResourceSystem<T>`] per distinct
/// `T` ever requested through this inventory.
pub struct Inventory {
    systems: RwLock<FxHashMap<TypeId, SystemEntry>>,
    worker_pool: Arc<WorkerPool>,
    frame_counter: Arc<AtomicU64>,
    frames_to_retain: u64,
}

impl Inventory {
    #[must_use]
    pub fn new(worker_pool: Arc<WorkerPool>) -> Self {
        Self::with_retention(worker_pool, DEFAULT_FRAMES_TO_RETAIN)
    }

    #[must_use]
    pub fn with_retention(worker_pool: Arc<WorkerPool>, frames_to_retain: u64) -> Self {
        Self {
            systems: RwLock::new(FxHashMap::default()),
            worker_pool,
            frame_counter: Arc::new(AtomicU64::new(0)),
            frames_to_retain,
        }
    }

    fn system_for<T: Send + Sync + 'static>(&self) -> Arc<ResourceSystem<T>> {
        let type_id = TypeId::of::<T>();
        if let Some(existing) = self.systems.read().get(&type_id) {
            return existing
                .typed
                .downcast_ref::<Arc<ResourceSystem<T>>>()
                .expect("TypeId collision in Inventory::system_for")
                .clone();
        }

        let mut systems = self.systems.write();
        let entry = systems.entry(type_id).or_insert_with(|| {
            let system = ResourceSystem::<T>::new(
                self.worker_pool.clone(),
                self.frame_counter.clone(),
                self.frames_to_retain,
            );
            let erased: Arc<dyn AnyResourceSystem> = system.clone();
            SystemEntry {
                typed: Box::new(system),
                erased,
            }
        });
        entry
            .typed
            .downcast_ref::<Arc<ResourceSystem<T>>>()
            .expect("TypeId collision in Inventory::system_for")
            .clone()
    }

    /// Looks up or creates an entry for `key`, returning a handle that
    /// blocks on first [`InvPtr::get`] until loading settles.
    ///
    /// `load_ctx` is only consulted the first time this key is seen;
    /// later callers racing the same key get the in-flight (or
    /// already-settled) entry and their own `load_ctx` is dropped
    /// unused.
    pub fn get<T: Send + Sync + 'static>(
        &self,
        key: impl KeyLike,
        load_ctx: Arc<dyn LoadContext<T>>,
        retention: Retention,
    ) -> Result<InvPtr<T>> {
        let system = self.system_for::<T>();
        system.get(key.key_hash(), key.key_text(), Some(load_ctx), retention)
    }

    /// `true` once an entry for `key` exists and hasn't been released
    /// (`Requested`, `Loading`, or `Ready` — not `Empty`/`Released`/`Error`).
    #[must_use]
    pub fn has<T: Send + Sync + 'static>(&self, key: impl KeyLike) -> bool {
        self.system_for::<T>().has(key.key_hash())
    }

    /// `true` once the entry has finished loading, successfully or as a
    /// fallback.
    #[must_use]
    pub fn has_loaded<T: Send + Sync + 'static>(&self, key: impl KeyLike) -> bool {
        self.system_for::<T>().has_loaded(key.key_hash())
    }

    /// Advances the shared frame counter and sweeps every type's
    /// deferred-release FIFO. Must be called exactly once per frame,
    /// from the same place `FrameLoop` invokes `EndOfFrame` on the
    /// rest of the render pipeline.
    pub fn on_end_of_frame(&self) {
        self.frame_counter.fetch_add(1, Ordering::AcqRel);
        for entry in self.systems.read().values() {
            entry.erased.on_end_of_frame();
        }
    }

    /// Drops every entry across every type, regardless of refcount.
    /// Only safe to call once nothing holds an `InvPtr` anymore — the
    /// same shutdown-time contract SaberEngine's `Inventory::Destroy`
    /// documents.
    pub fn destroy(&self) {
        for entry in self.systems.read().values() {
            entry.erased.destroy();
        }
        self.systems.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32};

    struct Loader {
        value: i32,
    }

    impl LoadContext<i32> for Loader {
        fn load(&self, _handle: &InvPtr<i32>) -> LoadOutcome<i32> {
            LoadOutcome::Loaded(self.value)
        }
    }

    fn test_inventory() -> Inventory {
        let pool = Arc::new(WorkerPool::new(2));
        Inventory::new(pool)
    }

    #[test]
    fn get_blocks_until_loaded_and_returns_value() {
        let inv = test_inventory();
        let handle = inv
            .get::<i32>(
                crate::key::HashKey::new("widget"),
                Arc::new(Loader { value: 42 }),
                Retention::Reusable,
            )
            .unwrap();
        assert_eq!(*handle.get(), 42);
    }

    #[test]
    fn second_get_dedups_and_ignores_new_load_context() {
        let inv = test_inventory();
        let key = crate::key::HashKey::new("widget");
        let first = inv
            .get::<i32>(key, Arc::new(Loader { value: 1 }), Retention::Reusable)
            .unwrap();
        let second = inv
            .get::<i32>(key, Arc::new(Loader { value: 999 }), Retention::Reusable)
            .unwrap();
        assert_eq!(*first.get(), 1);
        assert_eq!(*second.get(), 1);
        assert_eq!(first.refcount(), 2);
    }

    #[test]
    fn dropping_the_last_handle_defers_release_to_the_next_end_of_frame() {
        let inv = test_inventory();
        let key = crate::key::HashKey::new("deferred-thing");
        {
            let handle = inv
                .get::<i32>(key, Arc::new(Loader { value: 3 }), Retention::Reusable)
                .unwrap();
            assert_eq!(*handle.get(), 3);
        }
        // Dropped this frame: still visible until the sweep that follows.
        assert!(inv.has::<i32>(key));
        inv.on_end_of_frame();
        assert!(!inv.has::<i32>(key));
    }

    #[test]
    fn permanent_retention_survives_refcount_reaching_zero() {
        let inv = test_inventory();
        let key = crate::key::HashKey::new("permanent-thing");
        {
            let handle = inv
                .get::<i32>(key, Arc::new(Loader { value: 7 }), Retention::Permanent)
                .unwrap();
            assert_eq!(*handle.get(), 7);
        }
        assert!(inv.has::<i32>(key));
    }
}
