//! Builds a render pipeline from a JSON pipeline description and
//! drives its per-frame update execution: grouped, worker-pool-backed
//! dispatch of each graphics system's `pre_render` step.

mod builder;
mod execution_groups;
mod pipeline_description;

pub use execution_groups::compute_execution_groups;
pub use pipeline_description::PipelineDescription;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::graphics_system::GraphicsSystem;
use crate::stage_pipeline::StagePipeline;
use crate::worker_pool::WorkerPool;

/// One graphics system's contribution to an execution group: its
/// `pre_render` closure plus the owning GS name and step label, for
/// error reporting.
pub struct UpdateStep {
    gs_name: String,
    label: String,
    run: crate::graphics_system::PreRenderFn,
}

/// A fully constructed render pipeline: every graphics system
/// instance, the stage pipelines its init closures built, and the
/// layered execution groups driving per-frame updates.
pub struct RenderSystem {
    instances: FxHashMap<String, Box<dyn GraphicsSystem>>,
    pipelines: Vec<StagePipeline>,
    execution_groups: Vec<Vec<UpdateStep>>,
}

impl RenderSystem {
    /// Parses `json` and builds the pipeline it describes.
    pub fn from_description(
        json: &str,
        single_thread: bool,
    ) -> crate::errors::Result<Self> {
        let description = PipelineDescription::parse(json)?;
        builder::build(&description, single_thread)
    }

    #[must_use]
    pub fn stage_pipelines(&self) -> &[StagePipeline] {
        &self.pipelines
    }

    #[must_use]
    pub fn stage_pipelines_mut(&mut self) -> &mut [StagePipeline] {
        &mut self.pipelines
    }

    #[must_use]
    pub fn graphics_system(&self, name: &str) -> Option<&dyn GraphicsSystem> {
        self.instances.get(&name.to_lowercase()).map(AsRef::as_ref)
    }

    /// Runs every execution group in order. Within a group, steps run
    /// concurrently on `worker_pool`; the call blocks on every step in
    /// the group before moving to the next one, matching the
    /// group-is-a-barrier contract.
    ///
    /// A step that panics is reported as a [`crate::errors::WeaveError::RuntimeGsError`]
    /// log line and does not stop the other steps in its group — the
    /// worker pool isolates the panic per job, so the rest of the group
    /// (and every later group) still runs.
    pub fn execute_update_pipeline(&self, worker_pool: &WorkerPool) {
        for group in &self.execution_groups {
            if group.len() == 1 {
                run_step(&group[0]);
                continue;
            }
            let receivers: Vec<_> = group
                .iter()
                .map(|step| {
                    let run = step.run.clone();
                    (step, worker_pool.enqueue(move || run()))
                })
                .collect();
            for (step, rx) in receivers {
                if WorkerPool::block_on(rx).is_err() {
                    report_gs_panic(step);
                }
            }
        }
    }

    /// Calls `end_of_frame` on every graphics system and stage
    /// pipeline.
    pub fn end_of_frame(&mut self) {
        for gs in self.instances.values_mut() {
            gs.end_of_frame();
        }
        for pipeline in &mut self.pipelines {
            pipeline.end_of_frame();
        }
    }
}

fn run_step(step: &UpdateStep) {
    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (step.run)())).is_err() {
        report_gs_panic(step);
    }
}

fn report_gs_panic(step: &UpdateStep) {
    let error = crate::errors::WeaveError::RuntimeGsError {
        gs: step.gs_name.clone(),
        step: step.label.clone(),
        reason: "pre_render closure panicked".to_string(),
    };
    log::error!("{error}");
}

/// Thin per-frame driver tying a [`RenderSystem`] to the worker pool it
/// dispatches onto, matching the source's `RenderSystem::Execute`
/// entry point.
pub struct RenderSystemRunner {
    pub system: RenderSystem,
    pub worker_pool: Arc<WorkerPool>,
}

impl RenderSystemRunner {
    pub fn run_frame(&mut self) {
        self.system.execute_update_pipeline(&self.worker_pool);
        for pipeline in self.system.stage_pipelines_mut() {
            pipeline.post_update_pre_render();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics_system::{register_factory, RuntimeBindings};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGs {
        name: &'static str,
        counter: Arc<AtomicUsize>,
    }

    impl GraphicsSystem for CountingGs {
        fn script_name(&self) -> &'static str {
            self.name
        }
        fn runtime_bindings(&mut self) -> RuntimeBindings {
            let counter = self.counter.clone();
            RuntimeBindings {
                init_pipeline: vec![],
                pre_render: vec![(
                    "tick",
                    Arc::new(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }),
                )],
            }
        }
    }

    #[test]
    fn builds_and_runs_a_linear_pipeline() {
        let counter = Arc::new(AtomicUsize::new(0));
        for name in ["a", "b"] {
            let counter = counter.clone();
            register_factory(&format!("counting-{name}"), move || {
                Box::new(CountingGs {
                    name: match name {
                        "a" => "counting-a",
                        _ => "counting-b",
                    },
                    counter: counter.clone(),
                })
            });
        }

        let json = r#"{
            "name": "test",
            "graphics_systems": ["counting-a", "counting-b"],
            "pipeline_order": ["counting-a", "counting-b"],
            "buffer_inputs": { "counting-b": [ { "src": "counting-a", "map": [] } ] }
        }"#;
        let system = RenderSystem::from_description(json, false).unwrap();
        let pool = WorkerPool::new(2);
        system.execute_update_pipeline(&pool);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    struct PanickingGs;
    impl GraphicsSystem for PanickingGs {
        fn script_name(&self) -> &'static str {
            "panicking-gs"
        }
        fn runtime_bindings(&mut self) -> RuntimeBindings {
            RuntimeBindings {
                init_pipeline: vec![],
                pre_render: vec![("tick", Arc::new(|| panic!("pre_render blew up")))],
            }
        }
    }

    #[test]
    fn a_lone_step_panic_is_isolated_and_does_not_propagate() {
        register_factory("panicking-gs", || Box::new(PanickingGs));
        let json = r#"{
            "name": "solo-panic",
            "graphics_systems": ["panicking-gs"],
            "pipeline_order": ["panicking-gs"]
        }"#;
        let system = RenderSystem::from_description(json, false).unwrap();
        let pool = WorkerPool::new(2);
        // Must not panic or hang — the failing step is caught and logged.
        system.execute_update_pipeline(&pool);
    }

    #[test]
    fn a_group_member_panic_does_not_stop_its_sibling() {
        let counter = Arc::new(AtomicUsize::new(0));
        register_factory("panicking-gs-grouped", || Box::new(PanickingGs));
        register_factory("counting-sibling", {
            let counter = counter.clone();
            move || {
                Box::new(CountingGs {
                    name: "counting-sibling",
                    counter: counter.clone(),
                })
            }
        });

        let json = r#"{
            "name": "group-panic",
            "graphics_systems": ["panicking-gs-grouped", "counting-sibling"],
            "pipeline_order": ["panicking-gs-grouped", "counting-sibling"]
        }"#;
        let system = RenderSystem::from_description(json, false).unwrap();
        let pool = WorkerPool::new(2);
        system.execute_update_pipeline(&pool);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
