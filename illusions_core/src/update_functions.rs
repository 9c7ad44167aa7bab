use std::fmt;

use crate::ids::SceneId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    Next,
    Terminate,
}

pub type UpdateCallback = Box<dyn FnMut(u32) -> UpdateStatus>;

struct UpdateFunction {
    priority: i32,
    scene_id: SceneId,
    callback: UpdateCallback,
}

/// Per-frame callbacks (faders, screen shakers, cursor) run in ascending
/// priority before the thread pass. Each belongs to a scene and goes away
/// with it.
#[derive(Default)]
pub struct UpdateFunctions {
    entries: Vec<UpdateFunction>,
}

impl UpdateFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts after any existing entry with the same priority.
    pub fn add(&mut self, priority: i32, scene_id: SceneId, callback: UpdateCallback) {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.priority > priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            position,
            UpdateFunction {
                priority,
                scene_id,
                callback,
            },
        );
    }

    pub fn update(&mut self, now: u32) {
        self.entries
            .retain_mut(|entry| (entry.callback)(now) == UpdateStatus::Next);
    }

    pub fn terminate_by_scene(&mut self, scene_id: SceneId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.scene_id != scene_id);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for UpdateFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|entry| (entry.priority, entry.scene_id)),
            )
            .finish()
    }
}
