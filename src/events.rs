//! Well-known event kinds, as `HashKey` constants, mirroring the
//! original engine's `EventKeys.h`.

use crate::key::HashKey;

pub const KEY_EVENT: HashKey = HashKey::new("KeyEvent");
pub const MOUSE_MOTION_EVENT: HashKey = HashKey::new("MouseMotionEvent");
pub const MOUSE_BUTTON_EVENT: HashKey = HashKey::new("MouseButtonEvent");
pub const MOUSE_WHEEL_EVENT: HashKey = HashKey::new("MouseWheelEvent");
pub const TEXT_INPUT_EVENT: HashKey = HashKey::new("TextInputEvent");

pub const KEYBOARD_INPUT_CAPTURE_CHANGE: HashKey = HashKey::new("KeyboardInputCaptureChange");
pub const MOUSE_INPUT_CAPTURE_CHANGE: HashKey = HashKey::new("MouseInputCaptureChange");

pub const INPUT_FORWARD: HashKey = HashKey::new("InputForward");
pub const INPUT_BACKWARD: HashKey = HashKey::new("InputBackward");
pub const INPUT_LEFT: HashKey = HashKey::new("InputLeft");
pub const INPUT_RIGHT: HashKey = HashKey::new("InputRight");
pub const INPUT_UP: HashKey = HashKey::new("InputUp");
pub const INPUT_DOWN: HashKey = HashKey::new("InputDown");
pub const INPUT_SPRINT: HashKey = HashKey::new("InputSprint");

pub const INPUT_MOUSE_LEFT: HashKey = HashKey::new("InputMouseLeft");
pub const INPUT_MOUSE_MIDDLE: HashKey = HashKey::new("InputMouseMiddle");
pub const INPUT_MOUSE_RIGHT: HashKey = HashKey::new("InputMouseRight");

pub const TOGGLE_FREE_LOOK: HashKey = HashKey::new("ToggleFreeLook");
pub const TOGGLE_PERFORMANCE_TIMERS: HashKey = HashKey::new("TogglePerformanceTimers");
pub const TOGGLE_VSYNC: HashKey = HashKey::new("ToggleVSync");
pub const VSYNC_MODE_CHANGED: HashKey = HashKey::new("VSyncModeChanged");
pub const TOGGLE_UI_VISIBILITY: HashKey = HashKey::new("ToggleUIVisibility");
pub const WINDOW_FOCUS_CHANGED: HashKey = HashKey::new("WindowFocusChanged");
pub const DRAG_AND_DROP_EVENT: HashKey = HashKey::new("DragAndDropEvent");

pub const ENGINE_QUIT: HashKey = HashKey::new("EngineQuit");

pub const FILE_IMPORT_REQUEST: HashKey = HashKey::new("FileImportRequest");
pub const SCENE_CREATED: HashKey = HashKey::new("SceneCreated");
pub const SCENE_RESET_REQUEST: HashKey = HashKey::new("SceneResetRequest");
pub const CONFIG_SET_VALUE: HashKey = HashKey::new("ConfigSetValue");
