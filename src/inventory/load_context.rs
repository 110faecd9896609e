//! The load-context hook set: `on_load_begin`, `load`, `on_load_complete`.

use super::inv_ptr::InvPtr;

/// What a [`LoadContext::load`] call produced.
///
/// The distilled contract has `load` simply return `T`; this crate makes
/// the asset-load-failure path (`AssetLoadError` in the error taxonomy)
/// explicit at the type level instead of relying on callers to smuggle
/// a sentinel value through `T`: a `Fallback` publishes its value the
/// same way a normal load would, except the entry settles into
/// `ResourceState::Error` rather than `Ready` — `has_loaded` is still
/// true (the fallback is real, loadable data), but callers that care can
/// distinguish via [`crate::inventory::InvPtr::is_fallback`].
pub enum LoadOutcome<T> {
    Loaded(T),
    Fallback(T),
}

/// Hooks invoked while loading a resource of type `T`. All three run on
/// a worker thread unless the caller's own `Inventory::get` happened to
/// win the `Empty -> Loading` race on the calling thread (never true for
/// the worker-pool-backed `Inventory` this crate ships, but true for
/// tests that drive loading inline).
pub trait LoadContext<T>: Send + Sync {
    /// Runs before the heavy work. May register side effects (e.g.
    /// enqueue GPU-side creation) but must not block on the handle
    /// being loaded.
    fn on_load_begin(&self, _handle: &InvPtr<T>) {}

    /// Performs the work and returns the value to publish. May call
    /// back into `Inventory::get` for other resources (dependency
    /// chains) — those calls are ordinary, independent `get`s.
    fn load(&self, handle: &InvPtr<T>) -> LoadOutcome<T>;

    /// Runs after the value is published into the control block but
    /// before the state flips visible to waiters — last chance to
    /// finalize something that needs the value to already exist.
    fn on_load_complete(&self, _handle: &InvPtr<T>) {}
}
