//! Main/render thread pair synchronized by a barrier once per frame,
//! with a fixed-timestep accumulator on the main thread.
//!
//! Scene, entity, and UI update are out of this crate's scope (see
//! module docs at the crate root); [`FrameLoop`] takes them as
//! injectable hooks instead of owning concrete managers, the way the
//! source's `FrameLoop` owns concrete `SceneManager`/`EntityManager`
//! instances it calls into.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::time::{Duration, Instant};

use crate::event_bus::EventBus;
use crate::inventory::Inventory;
use crate::render_system::RenderSystem;
use crate::worker_pool::WorkerPool;

/// `1000/120`, matching the source's fixed-update cadence.
pub const FIXED_TIMESTEP_MS: f64 = 1000.0 / 120.0;

/// Clamps `elapsed` accumulation after a long stall (e.g. a breakpoint
/// or a slow frame due to OS scheduling) so the fixed-step loop
/// doesn't try to "catch up" through hundreds of steps at once.
pub const MAX_OUTER_FRAME_TIME_MS: f64 = 250.0;

/// Threads synchronized at the per-frame barrier: main + render.
pub const N_SYNC: usize = 2;

/// Hooks the main thread calls each outer frame and each fixed step.
/// All are optional; a `FrameLoop` built with only the render-side
/// hooks still drives the accumulator and barrier correctly.
#[derive(Default)]
pub struct MainThreadHooks {
    pub main_update: Option<Box<dyn FnMut(u64, f64) + Send>>,
    pub fixed_update: Option<Box<dyn FnMut(f64) + Send>>,
    pub scene_update: Option<Box<dyn FnMut(f64) + Send>>,
    pub ui_update: Option<Box<dyn FnMut(f64) + Send>>,
    pub enqueue_render_updates: Option<Box<dyn FnMut() + Send>>,
}

/// Drives the two-thread frame loop described in the module docs.
pub struct FrameLoop {
    event_bus: Arc<EventBus>,
    worker_pool: Arc<WorkerPool>,
    inventory: Arc<Inventory>,
    cancel: Arc<AtomicBool>,
    frame_num: Arc<AtomicU64>,
}

impl FrameLoop {
    #[must_use]
    pub fn new(event_bus: Arc<EventBus>, worker_pool: Arc<WorkerPool>, inventory: Arc<Inventory>) -> Self {
        Self {
            event_bus,
            worker_pool,
            inventory,
            cancel: Arc::new(AtomicBool::new(false)),
            frame_num: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Signals both threads to exit at their next loop head. Does not
    /// interrupt in-flight GPU work on the render thread.
    pub fn request_stop(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn frame_num(&self) -> u64 {
        self.frame_num.load(Ordering::Acquire)
    }

    /// Runs both threads to completion (until [`FrameLoop::request_stop`]
    /// is called from another thread, typically in response to an
    /// `EngineQuit` event). Blocks the calling thread.
    pub fn run(&self, mut hooks: MainThreadHooks, mut render_system: RenderSystem) {
        let barrier = Arc::new(Barrier::new(N_SYNC));

        let render_cancel = self.cancel.clone();
        let render_barrier = barrier.clone();
        let render_worker_pool = self.worker_pool.clone();
        let render_inventory = self.inventory.clone();
        let render_thread = std::thread::Builder::new()
            .name("weave-render".to_string())
            .spawn(move || {
                render_thread_loop(
                    &render_cancel,
                    &render_barrier,
                    &render_worker_pool,
                    &render_inventory,
                    &mut render_system,
                );
            })
            .expect("failed to spawn render thread");

        self.main_thread_loop(&barrier, &mut hooks);

        if let Err(panic) = render_thread.join() {
            log::error!("render thread panicked: {panic:?}");
        }
    }

    /// Both this and [`render_thread_loop`] call `barrier.wait()` exactly
    /// once per iteration and check `cancel` immediately after — that way
    /// a stop requested from any thread, at any time, is observed by both
    /// sides at the same synchronized round and neither ever waits for a
    /// partner that has already returned.
    fn main_thread_loop(&self, barrier: &Arc<Barrier>, hooks: &mut MainThreadHooks) {
        let mut last_outer_start = Instant::now();
        let mut elapsed_ms = 0.0f64;

        loop {
            barrier.wait();
            if self.cancel.load(Ordering::Acquire) {
                return;
            }

            let now = Instant::now();
            let last_outer_ms = now.duration_since(last_outer_start).as_secs_f64() * 1000.0;
            last_outer_start = now;

            let frame_num = self.frame_num.load(Ordering::Acquire);
            if let Some(main_update) = hooks.main_update.as_mut() {
                main_update(frame_num, last_outer_ms);
            }

            elapsed_ms += last_outer_ms.min(MAX_OUTER_FRAME_TIME_MS);
            while elapsed_ms >= FIXED_TIMESTEP_MS {
                elapsed_ms -= FIXED_TIMESTEP_MS;
                self.event_bus.update();
                if let Some(fixed_update) = hooks.fixed_update.as_mut() {
                    fixed_update(FIXED_TIMESTEP_MS);
                }
            }

            if let Some(scene_update) = hooks.scene_update.as_mut() {
                scene_update(last_outer_ms);
            }
            if let Some(ui_update) = hooks.ui_update.as_mut() {
                ui_update(last_outer_ms);
            }
            if let Some(enqueue) = hooks.enqueue_render_updates.as_mut() {
                enqueue();
            }

            self.frame_num.fetch_add(1, Ordering::AcqRel);
        }
    }
}

fn render_thread_loop(
    cancel: &AtomicBool,
    barrier: &Barrier,
    worker_pool: &WorkerPool,
    inventory: &Inventory,
    render_system: &mut RenderSystem,
) {
    loop {
        barrier.wait();
        if cancel.load(Ordering::Acquire) {
            return;
        }
        render_system.execute_update_pipeline(worker_pool);
        for pipeline in render_system.stage_pipelines_mut() {
            pipeline.post_update_pre_render();
        }
        // Submission to a concrete graphics backend is outside this
        // crate's scope; callers observing `RenderSystem` output are
        // expected to submit before the next `end_of_frame`.
        render_system.end_of_frame();
        inventory.on_end_of_frame();
    }
}

/// Measures wall-clock time between successive calls; used by callers
/// driving [`FrameLoop::run`] outside of a fixed test harness.
pub struct FrameTimer {
    last: Instant,
}

impl FrameTimer {
    #[must_use]
    pub fn start() -> Self {
        Self { last: Instant::now() }
    }

    pub fn stop_ms(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last).as_secs_f64() * 1000.0;
        self.last = now;
        elapsed
    }
}

#[must_use]
pub fn fixed_steps_for(outer_frame_ms: f64) -> u64 {
    (outer_frame_ms / FIXED_TIMESTEP_MS) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn fixed_step_cadence_converges_to_outer_time_over_timestep() {
        let expected = (100.0 / FIXED_TIMESTEP_MS) as u64;
        assert_eq!(fixed_steps_for(100.0), expected);
    }

    #[test]
    fn run_executes_fixed_updates_proportional_to_elapsed_time() {
        let event_bus = Arc::new(EventBus::new());
        let worker_pool = Arc::new(WorkerPool::new(1));
        let inventory = Arc::new(Inventory::new(worker_pool.clone()));
        let frame_loop = FrameLoop::new(event_bus, worker_pool, inventory);

        let fixed_update_calls = Arc::new(AtomicUsize::new(0));
        let calls = fixed_update_calls.clone();
        let cancel_after = 3u64;
        let frame_num_seen = frame_loop.frame_num.clone();
        let cancel_flag = frame_loop.cancel.clone();

        let hooks = MainThreadHooks {
            fixed_update: Some(Box::new(move |_dt| {
                calls.fetch_add(1, Ordering::SeqCst);
            })),
            main_update: Some(Box::new(move |frame_num, _dt| {
                if frame_num >= cancel_after {
                    cancel_flag.store(true, Ordering::Release);
                }
            })),
            ..Default::default()
        };

        let json = r#"{"name":"t","graphics_systems":[],"pipeline_order":[]}"#;
        let render_system = RenderSystem::from_description(json, true).unwrap();

        frame_loop.run(hooks, render_system);
        assert!(frame_num_seen.load(Ordering::Acquire) >= cancel_after);
    }
}
