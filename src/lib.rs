//! Weave render-graph orchestration core.
//!
//! This crate is the frame-scheduling and resource-lifetime skeleton of
//! a real-time 3D renderer: a generic, refcounted resource [`inventory`]
//! with deferred release; a [`stage_pipeline`] of render/compute stages
//! a [`GraphicsSystem`](graphics_system::GraphicsSystem) builds once at
//! init time; a [`batch`] manager that groups per-view draw batches by
//! shared state; a [`render_system`] that parses a JSON pipeline
//! description into a dependency-ordered set of graphics systems and
//! drives their per-frame update; and a [`frame_loop`] that runs the
//! main and render threads in lockstep.
//!
//! Concrete GPU backends, windowing, scene graphs, and asset importers
//! are out of scope — this crate schedules work and owns resource
//! lifetimes, it doesn't submit draw calls or own a window.

pub mod batch;
pub mod config;
pub mod errors;
pub mod event_bus;
pub mod events;
pub mod frame_loop;
pub mod graphics_system;
pub mod inventory;
pub mod key;
pub mod logging;
pub mod render_system;
pub mod stage_pipeline;
pub mod worker_pool;

pub use errors::{Result, WeaveError};
pub use event_bus::EventBus;
pub use frame_loop::{FrameLoop, MainThreadHooks};
pub use inventory::{Inventory, InvPtr, LoadContext, LoadOutcome, Retention};
pub use key::{HashKey, KeyLike, ResourceHandle, RuntimeHashKey, ViewId};
pub use render_system::{PipelineDescription, RenderSystem};
pub use worker_pool::WorkerPool;
