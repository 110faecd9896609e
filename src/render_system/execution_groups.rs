//! Kahn's-algorithm-style topological layering of GS pre-render steps
//! into parallel execution groups, grounded directly on the source's
//! `RenderSystem::ComputeExecutionGroups`.

use rustc_hash::FxHashSet;

use crate::errors::{Result, WeaveError};

use super::pipeline_description::PipelineDescription;

struct GsDependencies {
    name: String,
    dependencies: FxHashSet<String>,
}

/// Computes the layered execution groups for `pipeline_order`, given
/// its dependency maps in `description`.
///
/// `single_thread` forces one group per entry in declared order,
/// matching the `singleThreadGSExecution` config flag. Otherwise, each
/// round partitions every currently-resolvable entry (zero remaining
/// dependencies) out of `remaining` into the next group, wherever in
/// the list it sits — `pipeline_order` is a declaration order, not a
/// topological one, so a resolvable entry can appear after ones that
/// still depend on something.
pub fn compute_execution_groups(
    description: &PipelineDescription,
    single_thread: bool,
) -> Result<Vec<Vec<String>>> {
    if single_thread {
        return Ok(description
            .pipeline_order
            .iter()
            .map(|name| vec![name.clone()])
            .collect());
    }

    let mut remaining: Vec<GsDependencies> = description
        .pipeline_order
        .iter()
        .map(|name| GsDependencies {
            name: name.clone(),
            dependencies: description.dependencies_of(name),
        })
        .collect();

    let mut groups = Vec::new();

    while !remaining.is_empty() {
        let mut ready = Vec::new();
        let mut blocked = Vec::new();
        for entry in remaining {
            if entry.dependencies.is_empty() {
                ready.push(entry);
            } else {
                blocked.push(entry);
            }
        }

        if ready.is_empty() {
            let cycle = blocked.into_iter().map(|e| e.name).collect();
            return Err(WeaveError::ExecutionGroupCycle(cycle));
        }

        let group_names: Vec<String> = ready.into_iter().map(|e| e.name).collect();
        for entry in &mut blocked {
            for name in &group_names {
                entry.dependencies.remove(name);
            }
        }

        groups.push(group_names);
        remaining = blocked;
    }

    Ok(groups)
}
