//! Contracts for the subsystems the scheduler coordinates but does not own.
//!
//! Every collaborator takes `&self`; implementations keep their own interior
//! state. The engine is single threaded, so everything is shared through
//! `Rc` and never needs to be `Send`.

use std::rc::Rc;

use crate::clock::Clock;
use crate::ids::{SceneId, ThreadId};

/// Resource loader. Unloading must tolerate resources that are already gone.
pub trait ResourceSystem {
    fn load_resource(&self, resource_id: u32, scene_id: SceneId, thread_id: Option<ThreadId>);
    fn unload_resources_by_scene_id(&self, scene_id: SceneId);
    fn unload_resource_by_id(&self, resource_id: u32);
}

/// Actors, backgrounds and other on-screen controls.
pub trait Controls {
    fn pause_controls_by_scene_id(&self, scene_id: SceneId);
    fn unpause_controls_by_scene_id(&self, scene_id: SceneId);
    fn destroy_controls_by_scene_id(&self, scene_id: SceneId);
    /// Starts the talking animation; the actor reports back to `thread_id`.
    fn start_talk_actor(&self, object_id: u32, sequence_id: u32, thread_id: ThreadId);
    fn start_sequence_actor(&self, object_id: u32, sequence_id: u32);
    /// Drops the actor's link to the thread waiting on its sequence.
    fn clear_notify_thread_id(&self, object_id: u32);
}

pub trait Camera {
    fn push_camera_mode(&self);
    fn pop_camera_mode(&self);
    fn clear_camera_mode_stack(&self);
}

/// Voice playback and on-screen dialogue text used by talk threads.
pub trait TalkPresenter {
    fn cue_voice(&self, voice_name: &str);
    fn is_voice_cued(&self) -> bool;
    fn start_voice(&self);
    fn stop_voice(&self);
    fn is_voice_playing(&self) -> bool;
    fn show_text(&self, object_id: u32, text: &str);
    fn remove_text(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
    /// Skip the current line of dialogue or cut a wait short.
    Skip,
    /// Cancel the running abortable sequence.
    Abort,
}

pub trait InputEvents {
    /// Consumes the event if it is pending.
    fn poll_event(&self, event: InputEvent) -> bool;
    fn discard_event(&self, event: InputEvent);
}

/// The collaborator bundle handed to the engine at construction.
#[derive(Clone)]
pub struct Services {
    pub clock: Rc<dyn Clock>,
    pub resources: Rc<dyn ResourceSystem>,
    pub controls: Rc<dyn Controls>,
    pub camera: Rc<dyn Camera>,
    pub presenter: Rc<dyn TalkPresenter>,
    pub input: Rc<dyn InputEvents>,
}

impl Services {
    pub fn now(&self) -> u32 {
        self.clock.now()
    }
}
