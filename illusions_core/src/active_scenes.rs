use serde::Serialize;

use crate::error::SceneStackError;
use crate::ids::{SceneId, NO_SCENE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveScene {
    pub scene_id: SceneId,
    pub pause_ctr: i32,
}

/// Nested scene contexts (main scene, closeup, modal overlay). The top entry
/// is the current scene. The same scene may appear more than once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActiveScenes {
    stack: Vec<ActiveScene>,
}

impl ActiveScenes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn push(&mut self, scene_id: SceneId) {
        self.stack.push(ActiveScene {
            scene_id,
            pause_ctr: 0,
        });
    }

    pub fn pop(&mut self) -> Result<ActiveScene, SceneStackError> {
        self.stack.pop().ok_or(SceneStackError::Empty)
    }

    pub fn pause_active_scene(&mut self) -> Result<(), SceneStackError> {
        let top = self.stack.last_mut().ok_or(SceneStackError::Empty)?;
        top.pause_ctr += 1;
        Ok(())
    }

    pub fn unpause_active_scene(&mut self) -> Result<(), SceneStackError> {
        let top = self.stack.last_mut().ok_or(SceneStackError::Empty)?;
        top.pause_ctr -= 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Returns [`NO_SCENE`] when the stack is empty.
    pub fn current_scene(&self) -> SceneId {
        self.stack
            .last()
            .map(|entry| entry.scene_id)
            .unwrap_or(NO_SCENE)
    }

    /// True if any stacked instance of `scene_id` is unpaused.
    pub fn is_scene_active(&self, scene_id: SceneId) -> bool {
        self.stack
            .iter()
            .any(|entry| entry.scene_id == scene_id && entry.pause_ctr <= 0)
    }

    /// Entry at a 1-based position counted from the bottom of the stack, so
    /// `active_scene_info(len())` is the current scene.
    pub fn active_scene_info(&self, index: usize) -> Result<ActiveScene, SceneStackError> {
        index
            .checked_sub(1)
            .and_then(|slot| self.stack.get(slot))
            .copied()
            .ok_or(SceneStackError::IndexOutOfRange {
                index,
                depth: self.stack.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveScene> {
        self.stack.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stack_reports_no_scene() {
        let mut scenes = ActiveScenes::new();
        assert_eq!(scenes.current_scene(), NO_SCENE);
        assert_eq!(scenes.pop(), Err(SceneStackError::Empty));
        assert_eq!(scenes.pause_active_scene(), Err(SceneStackError::Empty));
    }

    #[test]
    fn info_is_one_based_from_the_bottom() {
        let mut scenes = ActiveScenes::new();
        scenes.push(1000);
        scenes.push(2000);
        assert_eq!(scenes.active_scene_info(1).map(|s| s.scene_id), Ok(1000));
        assert_eq!(scenes.active_scene_info(2).map(|s| s.scene_id), Ok(2000));
        assert_eq!(
            scenes.active_scene_info(0),
            Err(SceneStackError::IndexOutOfRange { index: 0, depth: 2 })
        );
        assert!(scenes.active_scene_info(3).is_err());
    }

    #[test]
    fn pause_affects_only_the_top_instance() {
        let mut scenes = ActiveScenes::new();
        scenes.push(1000);
        scenes.push(2000);
        scenes.push(1000);
        scenes.pause_active_scene().expect("non-empty");
        assert!(scenes.is_scene_active(1000), "bottom instance still active");

        scenes.pop().expect("non-empty");
        scenes.pop().expect("non-empty");
        scenes.pause_active_scene().expect("non-empty");
        assert!(!scenes.is_scene_active(1000));
        scenes.unpause_active_scene().expect("non-empty");
        assert!(scenes.is_scene_active(1000));
    }

    #[test]
    fn nested_pause_needs_matching_unpause() {
        let mut scenes = ActiveScenes::new();
        scenes.push(1000);
        scenes.pause_active_scene().expect("non-empty");
        scenes.pause_active_scene().expect("non-empty");
        scenes.unpause_active_scene().expect("non-empty");
        assert!(!scenes.is_scene_active(1000));
        scenes.unpause_active_scene().expect("non-empty");
        assert!(scenes.is_scene_active(1000));
    }
}
