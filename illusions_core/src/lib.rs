//! Cooperative thread scheduler and scene lifecycle for the Illusions
//! adventure engine.
//!
//! Script code, timers, dialogue and abortable sequences all run as threads
//! that return control every frame. Threads are owned by the scheduler and
//! referred to by [`ThreadId`]; scenes form a stack whose top is the current
//! scene, and leaving a scene tears down everything it owns. Host subsystems
//! (resources, actors, camera, voice and text, input, clock) are reached
//! through the traits in [`services`].

pub mod active_scenes;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod ids;
pub mod recording;
pub mod services;
pub mod thread;
pub mod thread_list;
pub mod trigger_functions;
pub mod update_functions;

pub use active_scenes::{ActiveScene, ActiveScenes};
pub use catalog::{CodeOffset, SceneInfo, ScriptArgs, ScriptCode, ScriptResource, StaticCatalog, TalkEntry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, TalkTiming};
pub use context::ThreadContext;
pub use engine::{Engine, EngineSnapshot};
pub use error::{ConfigError, SceneStackError};
pub use ids::{SceneId, ThreadId, NO_SCENE};
pub use recording::{HostEvent, RecordingHost};
pub use services::{InputEvent, Services};
pub use thread::{
    TalkRequest, TalkStage, ThreadHeader, ThreadMessage, ThreadStatus, ThreadType, NOTIFY_FLAG_SILENT,
};
pub use trigger_functions::{TriggerCallback, TriggerFunctions, TriggerKey};
pub use update_functions::{UpdateCallback, UpdateStatus};
