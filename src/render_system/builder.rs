//! Serial, render-thread-only construction of a `RenderSystem` from a
//! parsed [`PipelineDescription`]: factory instantiation, dependency
//! resolution, init-pipeline execution, then output registration.

use rustc_hash::FxHashMap;

use crate::errors::{Result, WeaveError};
use crate::graphics_system::{
    self, BufferDeps, DataDeps, GraphicsSystem, TextureDeps, TextureInputDefault,
};
use crate::key::{HashKey, KeyLike, ResourceHandle};
use crate::stage_pipeline::StagePipeline;

use super::execution_groups::compute_execution_groups;
use super::pipeline_description::{DependencyEntry, PipelineDescription};
use super::{RenderSystem, UpdateStep};

/// Drives construction: instantiates every GS in `pipeline_order`,
/// resolves its texture/buffer/data dependency maps from already-built
/// GSs, runs its init-pipeline closures against a fresh
/// [`StagePipeline`], then registers its outputs so later GSs can
/// depend on them.
pub fn build(
    description: &PipelineDescription,
    single_thread: bool,
) -> Result<RenderSystem> {
    let mut instances: FxHashMap<String, Box<dyn GraphicsSystem>> = FxHashMap::default();
    let mut texture_outputs: FxHashMap<String, FxHashMap<String, ResourceHandle>> = FxHashMap::default();
    let mut buffer_outputs: FxHashMap<String, FxHashMap<String, ResourceHandle>> = FxHashMap::default();
    let mut data_outputs: FxHashMap<String, FxHashMap<String, ResourceHandle>> = FxHashMap::default();
    let mut pipelines: Vec<StagePipeline> = Vec::new();
    let mut update_steps: FxHashMap<String, Vec<UpdateStep>> = FxHashMap::default();

    for name in &description.pipeline_order {
        let mut gs = graphics_system::create_by_script_name(name)?;
        let declared_inputs = gs.register_inputs();

        apply_flags(gs.as_mut(), description, name)?;

        let texture_deps = resolve_texture_deps(&declared_inputs, description, name, &texture_outputs)?;
        let buffer_deps = resolve_buffer_deps(description.buffer_inputs.get(name), &buffer_outputs);
        let data_deps = resolve_data_deps(description.data_inputs.get(name), &data_outputs);

        let bindings = gs.runtime_bindings();
        for (_label, init_fn) in bindings.init_pipeline {
            let mut pipeline = StagePipeline::new();
            init_fn(&mut pipeline, &texture_deps, &buffer_deps, &data_deps);
            pipelines.push(pipeline);
        }

        let steps: Vec<UpdateStep> = bindings
            .pre_render
            .into_iter()
            .map(|(label, run)| UpdateStep {
                gs_name: name.clone(),
                label: label.to_string(),
                run,
            })
            .collect();
        update_steps.insert(name.clone(), steps);

        let outputs = gs.register_outputs();
        texture_outputs
            .entry(name.clone())
            .or_default()
            .extend(outputs.iter().map(|(k, v)| (k.as_str().to_lowercase(), *v)));

        let buffer_outs = gs.register_buffer_outputs();
        buffer_outputs
            .entry(name.clone())
            .or_default()
            .extend(buffer_outs.iter().map(|(k, v)| (k.as_str().to_lowercase(), *v)));

        let data_outs = gs.register_data_outputs();
        data_outputs
            .entry(name.clone())
            .or_default()
            .extend(data_outs.iter().map(|(k, v)| (k.as_str().to_lowercase(), *v)));

        instances.insert(name.clone(), gs);
    }

    let groups = compute_execution_groups(description, single_thread)?;
    let execution_groups = groups
        .into_iter()
        .map(|group_names| {
            group_names
                .into_iter()
                .flat_map(|name| update_steps.remove(&name).unwrap_or_default())
                .collect()
        })
        .collect();

    Ok(RenderSystem {
        instances,
        pipelines,
        execution_groups,
    })
}

fn apply_flags(gs: &mut dyn GraphicsSystem, description: &PipelineDescription, name: &str) -> Result<()> {
    let mut flag_set = graphics_system::FlagSet::default();
    gs.register_flags(&mut flag_set);
    if let Some(pairs) = description.flags.get(name) {
        for (flag, value) in pairs {
            flag_set.apply(flag, value.clone()).map_err(|_| WeaveError::UnknownFlag {
                gs: name.to_string(),
                flag: flag.clone(),
            })?;
        }
    }
    Ok(())
}

fn resolve_texture_deps(
    declared_inputs: &[(HashKey, TextureInputDefault)],
    description: &PipelineDescription,
    gs_name: &str,
    producer_outputs: &FxHashMap<String, FxHashMap<String, ResourceHandle>>,
) -> Result<TextureDeps> {
    let mut resolved = FxHashMap::default();
    for (input_key, default) in declared_inputs {
        if let TextureInputDefault::Handle(handle) = default {
            resolved.insert(input_key.key_hash(), *handle);
        }
    }

    if let Some(entries) = description.texture_inputs.get(gs_name) {
        for entry in entries {
            let producer = producer_outputs
                .get(&entry.src_gs)
                .ok_or_else(|| WeaveError::MissingDependencySource {
                    gs: gs_name.to_string(),
                    src: entry.src_gs.clone(),
                })?;
            for (src_out, dst_in) in &entry.map {
                let handle = producer.get(src_out).ok_or_else(|| WeaveError::UnresolvedInput {
                    gs: gs_name.to_string(),
                    input: dst_in.clone(),
                })?;
                resolved.insert(HashKey::runtime(dst_in).hash(), *handle);
            }
        }
    }

    Ok(TextureDeps(resolved))
}

fn resolve_buffer_deps(
    entries: Option<&Vec<DependencyEntry>>,
    producer_outputs: &FxHashMap<String, FxHashMap<String, ResourceHandle>>,
) -> BufferDeps {
    BufferDeps(resolve_optional_handle_deps(entries, producer_outputs))
}

fn resolve_data_deps(
    entries: Option<&Vec<DependencyEntry>>,
    producer_outputs: &FxHashMap<String, FxHashMap<String, ResourceHandle>>,
) -> DataDeps {
    DataDeps(resolve_optional_handle_deps(entries, producer_outputs))
}

fn resolve_optional_handle_deps(
    entries: Option<&Vec<DependencyEntry>>,
    producer_outputs: &FxHashMap<String, FxHashMap<String, ResourceHandle>>,
) -> FxHashMap<u64, Option<ResourceHandle>> {
    let mut resolved = FxHashMap::default();
    if let Some(entries) = entries {
        for entry in entries {
            if let Some(producer) = producer_outputs.get(&entry.src_gs) {
                for (src_out, dst_in) in &entry.map {
                    let handle = producer.get(src_out).copied();
                    resolved.insert(HashKey::runtime(dst_in).hash(), handle);
                }
            }
        }
    }
    resolved
}
