//! End-to-end scenario: a pipeline description with order `[a, b, c, d]`
//! and dependencies `b->a`, `c->a`, `d->b`, `d->c` groups as
//! `[[a], [b, c], [d]]`, and every group actually executes in order
//! through `RenderSystem::execute_update_pipeline`.

use std::sync::Arc;

use weave_rg::graphics_system::{register_factory, GraphicsSystem, RuntimeBindings};
use weave_rg::render_system::RenderSystem;
use weave_rg::WorkerPool;

struct RecordingGs {
    name: &'static str,
    order: Arc<std::sync::Mutex<Vec<&'static str>>>,
}

impl GraphicsSystem for RecordingGs {
    fn script_name(&self) -> &'static str {
        self.name
    }

    fn runtime_bindings(&mut self) -> RuntimeBindings {
        let order = self.order.clone();
        let name = self.name;
        RuntimeBindings {
            init_pipeline: vec![],
            pre_render: vec![(
                "tick",
                Arc::new(move || {
                    order.lock().unwrap().push(name);
                }),
            )],
        }
    }
}

#[test]
fn diamond_dependency_groups_and_runs_in_topological_order() {
    let order: Arc<std::sync::Mutex<Vec<&'static str>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
    for name in ["diamond-a", "diamond-b", "diamond-c", "diamond-d"] {
        let order = order.clone();
        register_factory(name, move || Box::new(RecordingGs { name, order: order.clone() }));
    }

    let json = r#"{
        "name": "diamond",
        "graphics_systems": ["diamond-a", "diamond-b", "diamond-c", "diamond-d"],
        "pipeline_order": ["diamond-a", "diamond-b", "diamond-c", "diamond-d"],
        "buffer_inputs": {
            "diamond-b": [ { "src": "diamond-a", "map": [] } ],
            "diamond-c": [ { "src": "diamond-a", "map": [] } ],
            "diamond-d": [ { "src": "diamond-b", "map": [] }, { "src": "diamond-c", "map": [] } ]
        }
    }"#;

    let system = RenderSystem::from_description(json, false).unwrap();
    let pool = WorkerPool::new(4);
    system.execute_update_pipeline(&pool);

    let recorded = order.lock().unwrap().clone();
    assert_eq!(recorded.len(), 4);
    assert_eq!(recorded[0], "diamond-a");
    assert_eq!(recorded[3], "diamond-d");
    let middle: std::collections::HashSet<_> = recorded[1..3].iter().copied().collect();
    assert_eq!(
        middle,
        std::collections::HashSet::from(["diamond-b", "diamond-c"])
    );
}
