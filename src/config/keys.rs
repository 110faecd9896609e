//! Well-known config key constants, mirroring the original engine's
//! `ConfigKeys.h`.

use crate::key::HashKey;

pub const WINDOW_TITLE: HashKey = HashKey::new("windowTitle");
pub const WINDOW_WIDTH: HashKey = HashKey::new("width");
pub const WINDOW_HEIGHT: HashKey = HashKey::new("height");
pub const VSYNC_ENABLED: HashKey = HashKey::new("vsync");

pub const SCENE_PIPELINE: HashKey = HashKey::new("scenePipeline");
pub const MIN_WORKER_THREADS: HashKey = HashKey::new("minWorkerThreads");
pub const SINGLE_THREAD_GS_EXECUTION: HashKey = HashKey::new("singleThreadGSExecution");

pub const SHOW_SYSTEM_CONSOLE_WINDOW: HashKey = HashKey::new("showSystemConsoleWindow");
pub const DEBUG_LEVEL: HashKey = HashKey::new("debugLevel");
pub const DISABLE_CULLING: HashKey = HashKey::new("disableCulling");

pub const COMMAND_LINE_ARGS: HashKey = HashKey::new("commandLineArgs");

/// CLI token spellings (lowercase, no leading `-`) for the keys above
/// that are expected to arrive via the command line.
pub const SCENE_CMD_LINE_ARG: &str = "scene";
pub const SCENE_PIPELINE_CMD_LINE_ARG: &str = "scenepipeline";
pub const SINGLE_THREAD_GS_EXECUTION_CMD_LINE_ARG: &str = "singlethreadgsexecution";
pub const MIN_WORKER_THREADS_CMD_LINE_ARG: &str = "minworkerthreads";
pub const IMPORT_CMD_LINE_ARG: &str = "import";
