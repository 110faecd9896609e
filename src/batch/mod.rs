//! Per-mesh-primitive draw batch cache and per-frame instanced batch
//! emission, grounded on the run-length-merge-by-hash scheme fyrox's
//! renderer uses to collapse visible instances sharing a material into
//! one instanced draw.

use rustc_hash::FxHashMap;

use crate::key::{EffectID, RenderDataID, ResourceHandle, ViewId};

/// Maximum animated vertex-stream overrides a single render-data id can
/// carry; mirrors the original's fixed-size per-stream override array.
pub const MAX_VERTEX_STREAM_OVERRIDES: usize = 4;

/// An override of one vertex stream slot with an animated buffer
/// (skinning, morph targets) instead of the mesh primitive's own.
#[derive(Clone, Copy, Debug)]
pub struct StreamOverride {
    pub slot: u8,
    pub buffer: RenderDataID,
}

/// Known effect buffer names that trigger instance-index LUT binding
/// when a run of identical-hash batches is collapsed.
pub const INSTANCING_BUFFER_NAMES: &[&str] =
    &["TransformData", "PBRMetallicRoughnessData", "UnlitData"];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BatchLifetime {
    Permanent,
    SingleFrame,
}

/// One emitted or cached draw batch.
#[derive(Clone, Debug)]
pub struct Batch {
    pub batch_hash: u64,
    pub render_data_id: RenderDataID,
    pub material_effect_id: EffectID,
    pub stream_overrides: smallvec::SmallVec<[StreamOverride; MAX_VERTEX_STREAM_OVERRIDES]>,
    pub instance_count: u32,
    pub lifetime: BatchLifetime,
    /// Which known instancing buffer this batch's effect binds through,
    /// if any — declared by the graphics system at `upsert_batch` time,
    /// since this crate has no material/effect introspection of its own.
    pub instancing_buffer_name: Option<&'static str>,
    /// The per-instance index LUT bound for this emitted run, set by
    /// [`BatchManager::rebuild_view_batches`] when `instancing_buffer_name`
    /// names a known instancing buffer and an [`IndexedBufferManager`]
    /// was supplied.
    pub lut_buffer: Option<ResourceHandle>,
}

impl Batch {
    fn new(
        render_data_id: RenderDataID,
        material_effect_id: EffectID,
        stream_overrides: smallvec::SmallVec<[StreamOverride; MAX_VERTEX_STREAM_OVERRIDES]>,
        lifetime: BatchLifetime,
        instancing_buffer_name: Option<&'static str>,
    ) -> Self {
        let batch_hash = compute_batch_hash(material_effect_id, &stream_overrides);
        Self {
            batch_hash,
            render_data_id,
            material_effect_id,
            stream_overrides,
            instance_count: 1,
            lifetime,
            instancing_buffer_name,
            lut_buffer: None,
        }
    }

    /// `true` if this batch's effect binds through one of the known
    /// instancing buffers and so should get an instance-index LUT when
    /// collapsed with siblings sharing its hash.
    #[must_use]
    pub fn uses_instancing_buffer(&self, effect_buffer_name: &str) -> bool {
        INSTANCING_BUFFER_NAMES.contains(&effect_buffer_name)
    }
}

/// External collaborator that owns the GPU-side indexed instance
/// buffer: given a known instancing buffer name and the render-data ids
/// participating in one instanced run, returns a handle to a
/// single-frame LUT buffer holding their per-instance indices.
///
/// Not implemented by this crate — modeled as a trait so
/// `rebuild_view_batches` can bind LUTs without owning GPU resources
/// itself.
pub trait IndexedBufferManager {
    fn get_lut_buffer_input(&self, buffer_name: &str, ids: &[RenderDataID]) -> ResourceHandle;
}

fn compute_batch_hash(
    material_effect_id: EffectID,
    stream_overrides: &[StreamOverride],
) -> u64 {
    // Combines the effect id with the override slots/buffers via FNV-style
    // mixing; two render-data ids that resolve to the same material and
    // the same overrides must produce the same hash so they merge.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let mix = |hash: &mut u64, value: u64| {
        *hash ^= value;
        *hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    };
    mix(&mut hash, u64::from(material_effect_id.raw()));
    for over in stream_overrides {
        mix(&mut hash, u64::from(over.slot));
        mix(&mut hash, u64::from(over.buffer.raw()));
    }
    hash
}

/// Where a render-data id's cached batch lives.
#[derive(Clone, Copy, Debug)]
struct BatchMetadata {
    batch_hash: u64,
    render_data_id: RenderDataID,
    material_effect_id: EffectID,
    cache_index: usize,
}

/// Per-view and all-views instanced batch output, plus the permanent
/// cache of per-render-data-id batches it's built from.
///
/// Touched only from the render thread; no internal locking, per the
/// single-owner contract the rest of this crate's render-side types
/// follow.
#[derive(Default)]
pub struct BatchManager {
    permanent_cached_batches: Vec<Batch>,
    metadata: FxHashMap<RenderDataID, BatchMetadata>,
    view_batches: FxHashMap<ViewId, Vec<Batch>>,
    all_batches: Vec<Batch>,
    seen_this_frame: rustc_hash::FxHashSet<RenderDataID>,
}

impl BatchManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes the cached batch for `render_data_id`, if present,
    /// swap-removing from the backing vector and keeping the
    /// id-to-index map consistent for whichever id now occupies the
    /// vacated slot.
    pub fn delete_batch(&mut self, render_data_id: RenderDataID) {
        let Some(removed) = self.metadata.remove(&render_data_id) else {
            return;
        };
        let last_index = self.permanent_cached_batches.len() - 1;
        self.permanent_cached_batches.swap_remove(removed.cache_index);
        if removed.cache_index != last_index {
            // The batch that used to be last now sits at `cache_index`;
            // repoint its metadata entry.
            let moved = self.permanent_cached_batches[removed.cache_index].render_data_id;
            if let Some(meta) = self.metadata.get_mut(&moved) {
                meta.cache_index = removed.cache_index;
            }
        }
    }

    /// Builds or rebuilds the cached batch for `render_data_id`.
    ///
    /// `instancing_buffer_name` is the known instancing buffer (see
    /// [`INSTANCING_BUFFER_NAMES`]) this render-data id's effect binds
    /// through, if any — `None` for effects that don't support
    /// instancing at all.
    pub fn upsert_batch(
        &mut self,
        render_data_id: RenderDataID,
        material_effect_id: EffectID,
        stream_overrides: smallvec::SmallVec<[StreamOverride; MAX_VERTEX_STREAM_OVERRIDES]>,
        instancing_buffer_name: Option<&'static str>,
    ) {
        let batch = Batch::new(
            render_data_id,
            material_effect_id,
            stream_overrides,
            BatchLifetime::Permanent,
            instancing_buffer_name,
        );
        if let Some(meta) = self.metadata.get(&render_data_id) {
            let index = meta.cache_index;
            self.permanent_cached_batches[index] = batch;
            let meta = self.metadata.get_mut(&render_data_id).unwrap();
            meta.batch_hash = self.permanent_cached_batches[index].batch_hash;
            meta.material_effect_id = material_effect_id;
        } else {
            let cache_index = self.permanent_cached_batches.len();
            let batch_hash = batch.batch_hash;
            self.permanent_cached_batches.push(batch);
            self.metadata.insert(
                render_data_id,
                BatchMetadata {
                    batch_hash,
                    render_data_id,
                    material_effect_id,
                    cache_index,
                },
            );
        }
    }

    /// Rebuilds `view_batches` and `all_batches` from the current
    /// culling results: run-length-merges visible ids sharing a batch
    /// hash into single instanced draws, binding an instance-index LUT
    /// for any run whose effect uses a known instancing buffer.
    pub fn rebuild_view_batches(
        &mut self,
        culling_results: &FxHashMap<ViewId, Vec<RenderDataID>>,
        indexed_buffers: Option<&dyn IndexedBufferManager>,
    ) {
        self.view_batches.clear();
        self.all_batches.clear();
        self.seen_this_frame.clear();

        for (&view, visible_ids) in culling_results {
            let mut metas: Vec<&BatchMetadata> = visible_ids
                .iter()
                .filter_map(|id| self.metadata.get(id))
                .collect();
            metas.sort_by_key(|m| m.batch_hash);

            let mut emitted = Vec::new();
            let mut i = 0;
            while i < metas.len() {
                let hash = metas[i].batch_hash;
                let mut run_len = 1;
                while i + run_len < metas.len() && metas[i + run_len].batch_hash == hash {
                    run_len += 1;
                }
                let representative = metas[i];
                let source = &self.permanent_cached_batches[representative.cache_index];
                let mut instanced = source.clone();
                instanced.lifetime = BatchLifetime::SingleFrame;
                instanced.instance_count = run_len as u32;

                if let (Some(buffer_name), Some(mgr)) = (source.instancing_buffer_name, indexed_buffers) {
                    if source.uses_instancing_buffer(buffer_name) {
                        let run_ids: Vec<RenderDataID> =
                            metas[i..i + run_len].iter().map(|m| m.render_data_id).collect();
                        instanced.lut_buffer = Some(mgr.get_lut_buffer_input(buffer_name, &run_ids));
                    }
                }

                emitted.push(instanced);

                for meta in &metas[i..i + run_len] {
                    if self.seen_this_frame.insert(meta.render_data_id) {
                        let mut solo = self.permanent_cached_batches[meta.cache_index].clone();
                        solo.lifetime = BatchLifetime::SingleFrame;
                        solo.instance_count = 1;
                        self.all_batches.push(solo);
                    }
                }

                i += run_len;
            }
            self.view_batches.insert(view, emitted);
        }
    }

    #[must_use]
    pub fn view_batches(&self, view: ViewId) -> Option<&[Batch]> {
        self.view_batches.get(&view).map(Vec::as_slice)
    }

    #[must_use]
    pub fn all_batches(&self) -> &[Batch] {
        &self.all_batches
    }

    #[must_use]
    pub fn cached_batch_count(&self) -> usize {
        self.permanent_cached_batches.len()
    }

    pub fn end_of_frame(&mut self) {
        self.view_batches.clear();
        self.all_batches.clear();
        self.seen_this_frame.clear();
    }
}
