//! Ordered container of render/compute stages with permanent and
//! single-frame lifetimes.
//!
//! The source models this as a `std::list<shared_ptr<Stage>>` with
//! iterators stashed by callers for `append_after`. This crate uses a
//! [`SlotMap`] for stable handles plus a parallel order vector, which
//! gives the same "insert after a remembered position" behavior
//! without unsafe stable-iterator tricks.

use rustc_hash::FxHashSet;
use slotmap::{new_key_type, SlotMap};

use crate::key::{HashKey, RenderDataID};

new_key_type! {
    pub struct StageHandle;
}

/// How long a stage stays in the pipeline once appended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StageLifetime {
    Permanent,
    SingleFrame,
}

/// A named GPU-side binding: either a texture/buffer handle or a
/// resource not yet resolved.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResourceBinding(pub Option<RenderDataID>);

#[derive(Clone, Debug)]
pub enum StageKind {
    Render,
    Compute,
    FullscreenQuad,
    /// An empty grouping container; used to anchor `append_after` calls
    /// for stages that conceptually belong together without the
    /// pipeline needing a name-based index.
    Parent,
}

/// One entry in a [`StagePipeline`].
pub struct Stage {
    pub name: HashKey,
    pub kind: StageKind,
    pub effect_id: Option<crate::key::EffectID>,
    pub targets: Vec<ResourceBinding>,
    pub texture_inputs: Vec<(HashKey, ResourceBinding)>,
    pub buffer_inputs: Vec<(HashKey, ResourceBinding)>,
    pub lifetime: StageLifetime,
    resolve_buffers: Option<Box<dyn FnMut(&mut Stage) + Send>>,
    end_of_frame_hook: Option<Box<dyn FnMut(&mut Stage) + Send>>,
}

impl Stage {
    #[must_use]
    pub fn new(name: HashKey, kind: StageKind) -> Self {
        Self {
            name,
            kind,
            effect_id: None,
            targets: Vec::new(),
            texture_inputs: Vec::new(),
            buffer_inputs: Vec::new(),
            lifetime: StageLifetime::Permanent,
            resolve_buffers: None,
            end_of_frame_hook: None,
        }
    }

    #[must_use]
    pub fn with_resolve_buffers_hook(mut self, hook: impl FnMut(&mut Stage) + Send + 'static) -> Self {
        self.resolve_buffers = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn with_end_of_frame_hook(mut self, hook: impl FnMut(&mut Stage) + Send + 'static) -> Self {
        self.end_of_frame_hook = Some(Box::new(hook));
        self
    }
}

/// Stable-ordered collection of [`Stage`]s, grouped into a permanent
/// set and a per-frame single-frame set cleared at `end_of_frame`.
#[derive(Default)]
pub struct StagePipeline {
    stages: SlotMap<StageHandle, Stage>,
    order: Vec<StageHandle>,
    single_frame: FxHashSet<StageHandle>,
}

impl StagePipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, stage: Stage) -> StageHandle {
        let handle = self.stages.insert(stage);
        self.order.push(handle);
        handle
    }

    /// Inserts `stage` immediately after `after` in iteration order.
    /// Panics if `after` isn't currently in the pipeline — the same
    /// "dangling iterator" programmer error the source's list-based
    /// version would hit.
    pub fn append_after(&mut self, after: StageHandle, stage: Stage) -> StageHandle {
        let position = self
            .order
            .iter()
            .position(|&h| h == after)
            .expect("append_after: handle is not present in this pipeline");
        let handle = self.stages.insert(stage);
        self.order.insert(position + 1, handle);
        handle
    }

    pub fn append_single_frame(&mut self, mut stage: Stage) -> StageHandle {
        stage.lifetime = StageLifetime::SingleFrame;
        let handle = self.append(stage);
        self.single_frame.insert(handle);
        handle
    }

    pub fn append_single_frame_after(&mut self, after: StageHandle, mut stage: Stage) -> StageHandle {
        stage.lifetime = StageLifetime::SingleFrame;
        let handle = self.append_after(after, stage);
        self.single_frame.insert(handle);
        handle
    }

    #[must_use]
    pub fn get(&self, handle: StageHandle) -> Option<&Stage> {
        self.stages.get(handle)
    }

    #[must_use]
    pub fn get_mut(&mut self, handle: StageHandle) -> Option<&mut Stage> {
        self.stages.get_mut(handle)
    }

    /// Iterates stages in insertion order, skipping handles whose
    /// slotmap entry has somehow gone missing (it shouldn't — `order`
    /// and `stages` are kept in lockstep by every mutator here).
    pub fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.order.iter().filter_map(|h| self.stages.get(*h))
    }

    /// Runs each stage's resolve-buffers hook, in pipeline order.
    pub fn post_update_pre_render(&mut self) {
        for handle in self.order.clone() {
            if let Some(stage) = self.stages.get_mut(handle) {
                if let Some(mut hook) = stage.resolve_buffers.take() {
                    hook(stage);
                    stage.resolve_buffers = Some(hook);
                }
            }
        }
    }

    /// Runs every stage's end-of-frame hook, then erases single-frame
    /// entries from both the slotmap and the order vector.
    pub fn end_of_frame(&mut self) {
        for handle in self.order.clone() {
            if let Some(stage) = self.stages.get_mut(handle) {
                if let Some(mut hook) = stage.end_of_frame_hook.take() {
                    hook(stage);
                    stage.end_of_frame_hook = Some(hook);
                }
            }
        }

        if self.single_frame.is_empty() {
            return;
        }
        self.order.retain(|h| !self.single_frame.contains(h));
        for handle in self.single_frame.drain() {
            self.stages.remove(handle);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(name: &'static str) -> Stage {
        Stage::new(HashKey::new(name), StageKind::Render)
    }

    #[test]
    fn append_preserves_insertion_order() {
        let mut pipeline = StagePipeline::new();
        pipeline.append(stage("a"));
        pipeline.append(stage("b"));
        pipeline.append(stage("c"));
        let names: Vec<_> = pipeline.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn append_after_inserts_immediately_following() {
        let mut pipeline = StagePipeline::new();
        let a = pipeline.append(stage("a"));
        pipeline.append(stage("c"));
        pipeline.append_after(a, stage("b"));
        let names: Vec<_> = pipeline.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn single_frame_entries_vanish_after_end_of_frame_without_disturbing_permanent() {
        let mut pipeline = StagePipeline::new();
        pipeline.append(stage("permanent"));
        pipeline.append_single_frame(stage("transient"));
        assert_eq!(pipeline.len(), 2);
        pipeline.end_of_frame();
        let names: Vec<_> = pipeline.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["permanent"]);
    }

    #[test]
    fn repeated_end_of_frame_with_no_single_frame_entries_is_a_no_op() {
        let mut pipeline = StagePipeline::new();
        pipeline.append(stage("permanent"));
        pipeline.end_of_frame();
        pipeline.end_of_frame();
        assert_eq!(pipeline.len(), 1);
    }
}
