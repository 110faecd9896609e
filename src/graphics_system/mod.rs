//! The `GraphicsSystem` trait, its runtime-binding descriptor, and the
//! per-instance event queue every GS owns.

mod registry;

pub use registry::{create_by_script_name, register_factory, registered_script_names};

use flume::{Receiver, Sender};

use crate::config::ConfigValue;
use crate::key::HashKey;
use crate::stage_pipeline::StagePipeline;

/// What a `GraphicsSystem::register_inputs` call declares for a single
/// texture input: either a concrete default or "no default, must be
/// wired from another GS's output".
#[derive(Clone, Debug)]
pub enum TextureInputDefault {
    None,
    Handle(crate::key::ResourceHandle),
}

/// Dependency maps handed to a GS's init-pipeline closures, already
/// resolved by the builder from the pipeline description.
///
/// Keyed by hash rather than by [`HashKey`] directly: input/output
/// names in a pipeline description arrive as runtime `String`s (parsed
/// from JSON), which can't back a `'static`-text `HashKey`. Lookups
/// take any [`crate::key::KeyLike`] so callers can still address them
/// with compile-time `HashKey` constants.
#[derive(Default, Clone)]
pub struct TextureDeps(pub rustc_hash::FxHashMap<u64, crate::key::ResourceHandle>);
#[derive(Default, Clone)]
pub struct BufferDeps(pub rustc_hash::FxHashMap<u64, Option<crate::key::ResourceHandle>>);
#[derive(Default, Clone)]
pub struct DataDeps(pub rustc_hash::FxHashMap<u64, Option<crate::key::ResourceHandle>>);

impl TextureDeps {
    #[must_use]
    pub fn get(&self, key: impl crate::key::KeyLike) -> Option<crate::key::ResourceHandle> {
        self.0.get(&key.key_hash()).copied()
    }
}
impl BufferDeps {
    #[must_use]
    pub fn get(&self, key: impl crate::key::KeyLike) -> Option<crate::key::ResourceHandle> {
        self.0.get(&key.key_hash()).copied().flatten()
    }
}
impl DataDeps {
    #[must_use]
    pub fn get(&self, key: impl crate::key::KeyLike) -> Option<crate::key::ResourceHandle> {
        self.0.get(&key.key_hash()).copied().flatten()
    }
}

type InitPipelineFn = Box<dyn Fn(&mut StagePipeline, &TextureDeps, &BufferDeps, &DataDeps) + Send>;
/// `Sync` so the render system can hand out cheap `Arc` clones to
/// worker-pool jobs without needing to re-borrow the owning
/// `GraphicsSystem` from another thread.
pub type PreRenderFn = std::sync::Arc<dyn Fn() + Send + Sync>;

/// What `GraphicsSystem::runtime_bindings` returns: named closures the
/// builder drives during construction (`init_pipeline`) and every
/// frame (`pre_render`).
pub struct RuntimeBindings {
    pub init_pipeline: Vec<(&'static str, InitPipelineFn)>,
    pub pre_render: Vec<(&'static str, PreRenderFn)>,
}

impl Default for RuntimeBindings {
    fn default() -> Self {
        Self {
            init_pipeline: Vec::new(),
            pre_render: Vec::new(),
        }
    }
}

/// A single pending event posted into a GS's queue by another GS in a
/// later execution group.
pub struct GsEvent {
    pub kind: HashKey,
    pub payload: ConfigValue,
}

/// Thread-safe event queue every `GraphicsSystem` owns. Other GSs call
/// [`GsEventQueue::post`]; the owning GS drains it from its own
/// `handle_events` during its `pre_render` step.
pub struct GsEventQueue {
    sender: Sender<GsEvent>,
    receiver: Receiver<GsEvent>,
}

impl GsEventQueue {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    #[must_use]
    pub fn sender(&self) -> Sender<GsEvent> {
        self.sender.clone()
    }

    pub fn post(&self, event: GsEvent) {
        let _ = self.sender.send(event);
    }

    /// Drains every currently-queued event, in post order.
    pub fn drain(&self) -> Vec<GsEvent> {
        self.receiver.drain().collect()
    }
}

impl Default for GsEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Registered flag names and the values applied from a pipeline
/// description's `flags` section.
#[derive(Default)]
pub struct FlagSet {
    registered: rustc_hash::FxHashSet<&'static str>,
    values: rustc_hash::FxHashMap<String, ConfigValue>,
}

impl FlagSet {
    pub fn register(&mut self, name: &'static str) {
        self.registered.insert(name);
    }

    /// Applies a `(flag, value)` pair from the pipeline description.
    /// Errors if `flag` was never registered via
    /// [`FlagSet::register`] — mirrors the "fatal if a flag isn't
    /// registered" construction-time check.
    pub fn apply(&mut self, flag: &str, value: ConfigValue) -> crate::errors::Result<()> {
        if !self.registered.contains(flag) {
            return Err(crate::errors::WeaveError::UnknownFlag {
                gs: String::new(),
                flag: flag.to_string(),
            });
        }
        self.values.insert(flag.to_string(), value);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, flag: &str) -> Option<&ConfigValue> {
        self.values.get(flag)
    }
}

/// The ABI every graphics system implements.
///
/// Lifecycle: `register_flags` and `register_inputs` run immediately
/// after construction (inside the factory's `create_fn`); flags from
/// the pipeline description are applied next; `runtime_bindings` is
/// consulted once to extract the init-pipeline and pre-render
/// closures; `register_outputs`/`register_buffer_outputs`/
/// `register_data_outputs` run after every GS has been constructed and
/// initialized, publishing the texture/buffer/data handles later GSs
/// in `pipeline_order` can depend on.
pub trait GraphicsSystem: Send {
    fn script_name(&self) -> &'static str;

    fn register_flags(&mut self, _flags: &mut FlagSet) {}

    fn register_inputs(&mut self) -> Vec<(HashKey, TextureInputDefault)> {
        Vec::new()
    }

    fn register_outputs(&mut self) -> Vec<(HashKey, crate::key::ResourceHandle)> {
        Vec::new()
    }

    fn register_buffer_outputs(&mut self) -> Vec<(HashKey, crate::key::ResourceHandle)> {
        Vec::new()
    }

    fn register_data_outputs(&mut self) -> Vec<(HashKey, crate::key::ResourceHandle)> {
        Vec::new()
    }

    fn runtime_bindings(&mut self) -> RuntimeBindings;

    fn handle_events(&mut self, _events: Vec<GsEvent>) {}

    fn end_of_frame(&mut self) {}

    fn show_debug_ui(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_queue_drains_in_post_order() {
        let queue = GsEventQueue::new();
        queue.post(GsEvent {
            kind: HashKey::new("a"),
            payload: ConfigValue::Bool(true),
        });
        queue.post(GsEvent {
            kind: HashKey::new("b"),
            payload: ConfigValue::Bool(false),
        });
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].kind.as_str(), "a");
        assert_eq!(drained[1].kind.as_str(), "b");
    }

    #[test]
    fn flag_set_rejects_unregistered_flags() {
        let mut flags = FlagSet::default();
        flags.register("wireframe");
        assert!(flags.apply("wireframe", ConfigValue::Bool(true)).is_ok());
        assert!(flags.apply("unknown", ConfigValue::Bool(true)).is_err());
    }
}
