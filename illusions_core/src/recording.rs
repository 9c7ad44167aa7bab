//! In-memory collaborators that record every call. The scenario runner uses
//! them as its "hardware", and the tests assert on what they captured.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use serde::Serialize;

use crate::clock::Clock;
use crate::ids::{SceneId, ThreadId};
use crate::services::{
    Camera, Controls, InputEvent, InputEvents, ResourceSystem, Services, TalkPresenter,
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    LoadResource {
        resource_id: u32,
        scene_id: SceneId,
        thread_id: Option<ThreadId>,
    },
    UnloadScene {
        scene_id: SceneId,
    },
    UnloadResource {
        resource_id: u32,
    },
    PauseControls {
        scene_id: SceneId,
    },
    UnpauseControls {
        scene_id: SceneId,
    },
    DestroyControls {
        scene_id: SceneId,
    },
    StartTalkActor {
        object_id: u32,
        sequence_id: u32,
        thread_id: ThreadId,
    },
    StartSequenceActor {
        object_id: u32,
        sequence_id: u32,
    },
    ClearNotifyThreadId {
        object_id: u32,
    },
    PushCameraMode,
    PopCameraMode,
    ClearCameraModeStack,
    CueVoice {
        name: String,
    },
    StartVoice,
    StopVoice,
    ShowText {
        object_id: u32,
        text: String,
    },
    RemoveText,
}

#[derive(Debug, Default)]
struct HostState {
    events: Vec<HostEvent>,
    loaded_resources: BTreeSet<(SceneId, u32)>,
    camera_depth: u32,
    voice_cue_polls: u32,
    voice_length_polls: u32,
    cue_polls_remaining: u32,
    playing_polls_remaining: u32,
    voice_playing: bool,
    pending_input: BTreeSet<InputKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum InputKey {
    Skip,
    Abort,
}

impl From<InputEvent> for InputKey {
    fn from(event: InputEvent) -> Self {
        match event {
            InputEvent::Skip => InputKey::Skip,
            InputEvent::Abort => InputKey::Abort,
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingHost {
    state: Rc<RefCell<HostState>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Voice cues become ready after `cue_polls` checks and play for
    /// `length_polls` checks once started.
    pub fn with_voice_timing(self, cue_polls: u32, length_polls: u32) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.voice_cue_polls = cue_polls;
            state.voice_length_polls = length_polls;
        }
        self
    }

    pub fn services(&self, clock: Rc<dyn Clock>) -> Services {
        let host = Rc::new(self.clone());
        Services {
            clock,
            resources: host.clone(),
            controls: host.clone(),
            camera: host.clone(),
            presenter: host.clone(),
            input: host,
        }
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    pub fn press(&self, event: InputEvent) {
        self.state.borrow_mut().pending_input.insert(event.into());
    }

    pub fn camera_depth(&self) -> u32 {
        self.state.borrow().camera_depth
    }

    pub fn loaded_resources(&self) -> Vec<(SceneId, u32)> {
        self.state.borrow().loaded_resources.iter().copied().collect()
    }

    fn record(&self, event: HostEvent) {
        self.state.borrow_mut().events.push(event);
    }
}

impl ResourceSystem for RecordingHost {
    fn load_resource(&self, resource_id: u32, scene_id: SceneId, thread_id: Option<ThreadId>) {
        self.state
            .borrow_mut()
            .loaded_resources
            .insert((scene_id, resource_id));
        self.record(HostEvent::LoadResource {
            resource_id,
            scene_id,
            thread_id,
        });
    }

    fn unload_resources_by_scene_id(&self, scene_id: SceneId) {
        self.state
            .borrow_mut()
            .loaded_resources
            .retain(|(owner, _)| *owner != scene_id);
        self.record(HostEvent::UnloadScene { scene_id });
    }

    fn unload_resource_by_id(&self, resource_id: u32) {
        self.state
            .borrow_mut()
            .loaded_resources
            .retain(|(_, id)| *id != resource_id);
        self.record(HostEvent::UnloadResource { resource_id });
    }
}

impl Controls for RecordingHost {
    fn pause_controls_by_scene_id(&self, scene_id: SceneId) {
        self.record(HostEvent::PauseControls { scene_id });
    }

    fn unpause_controls_by_scene_id(&self, scene_id: SceneId) {
        self.record(HostEvent::UnpauseControls { scene_id });
    }

    fn destroy_controls_by_scene_id(&self, scene_id: SceneId) {
        self.record(HostEvent::DestroyControls { scene_id });
    }

    fn start_talk_actor(&self, object_id: u32, sequence_id: u32, thread_id: ThreadId) {
        self.record(HostEvent::StartTalkActor {
            object_id,
            sequence_id,
            thread_id,
        });
    }

    fn start_sequence_actor(&self, object_id: u32, sequence_id: u32) {
        self.record(HostEvent::StartSequenceActor {
            object_id,
            sequence_id,
        });
    }

    fn clear_notify_thread_id(&self, object_id: u32) {
        self.record(HostEvent::ClearNotifyThreadId { object_id });
    }
}

impl Camera for RecordingHost {
    fn push_camera_mode(&self) {
        self.state.borrow_mut().camera_depth += 1;
        self.record(HostEvent::PushCameraMode);
    }

    fn pop_camera_mode(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.camera_depth = state.camera_depth.saturating_sub(1);
        }
        self.record(HostEvent::PopCameraMode);
    }

    fn clear_camera_mode_stack(&self) {
        self.state.borrow_mut().camera_depth = 0;
        self.record(HostEvent::ClearCameraModeStack);
    }
}

impl TalkPresenter for RecordingHost {
    fn cue_voice(&self, voice_name: &str) {
        {
            let mut state = self.state.borrow_mut();
            state.cue_polls_remaining = state.voice_cue_polls;
        }
        self.record(HostEvent::CueVoice {
            name: voice_name.to_string(),
        });
    }

    fn is_voice_cued(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.cue_polls_remaining > 0 {
            state.cue_polls_remaining -= 1;
            return false;
        }
        true
    }

    fn start_voice(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.voice_playing = true;
            state.playing_polls_remaining = state.voice_length_polls;
        }
        self.record(HostEvent::StartVoice);
    }

    fn stop_voice(&self) {
        self.state.borrow_mut().voice_playing = false;
        self.record(HostEvent::StopVoice);
    }

    fn is_voice_playing(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if !state.voice_playing {
            return false;
        }
        if state.playing_polls_remaining > 0 {
            state.playing_polls_remaining -= 1;
            return true;
        }
        state.voice_playing = false;
        false
    }

    fn show_text(&self, object_id: u32, text: &str) {
        self.record(HostEvent::ShowText {
            object_id,
            text: text.to_string(),
        });
    }

    fn remove_text(&self) {
        self.record(HostEvent::RemoveText);
    }
}

impl InputEvents for RecordingHost {
    fn poll_event(&self, event: InputEvent) -> bool {
        self.state
            .borrow_mut()
            .pending_input
            .remove(&InputKey::from(event))
    }

    fn discard_event(&self, event: InputEvent) {
        self.state
            .borrow_mut()
            .pending_input
            .remove(&InputKey::from(event));
    }
}
