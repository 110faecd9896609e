//! End-to-end scenario: 8 threads racing `Inventory::get` for the same
//! key must all observe the same loaded value, and the loader runs
//! exactly once.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Barrier};

use weave_rg::inventory::{Inventory, LoadContext, LoadOutcome};
use weave_rg::key::HashKey;
use weave_rg::worker_pool::WorkerPool;
use weave_rg::InvPtr;

struct CountingLoader {
    counter: Arc<AtomicI32>,
}

impl LoadContext<i32> for CountingLoader {
    fn load(&self, _handle: &InvPtr<i32>) -> LoadOutcome<i32> {
        let value = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        LoadOutcome::Loaded(value)
    }
}

#[test]
fn eight_threads_racing_the_same_key_see_one_load() {
    let pool = Arc::new(WorkerPool::new(4));
    let inventory = Arc::new(Inventory::new(pool));
    let counter = Arc::new(AtomicI32::new(0));
    let key = HashKey::new("x");

    let start = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let inventory = inventory.clone();
            let counter = counter.clone();
            let start = start.clone();
            std::thread::spawn(move || {
                start.wait();
                let handle = inventory
                    .get::<i32>(key, Arc::new(CountingLoader { counter }), weave_rg::inventory::Retention::Reusable)
                    .unwrap();
                *handle.get()
            })
        })
        .collect();

    let values: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(values.iter().all(|&v| v == values[0]));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}
