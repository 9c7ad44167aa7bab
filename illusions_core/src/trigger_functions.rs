use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::engine::Engine;
use crate::ids::{SceneId, ThreadId};

/// The interaction tuple a cause is declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TriggerKey {
    pub scene_id: SceneId,
    pub verb_id: u32,
    pub object_id2: u32,
    pub object_id: u32,
}

impl TriggerKey {
    pub fn new(scene_id: SceneId, verb_id: u32, object_id2: u32, object_id: u32) -> Self {
        TriggerKey {
            scene_id,
            verb_id,
            object_id2,
            object_id,
        }
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08X}/{:08X}/{:08X}/{:08X}",
            self.scene_id, self.verb_id, self.object_id2, self.object_id
        )
    }
}

/// Native "special code" run in place of a scripted cause. The callback
/// decides whether to notify `calling_thread` or keep it parked.
pub trait TriggerCallback {
    fn run(&mut self, engine: &mut Engine, key: &TriggerKey, calling_thread: Option<ThreadId>);
}

impl<F> TriggerCallback for F
where
    F: FnMut(&mut Engine, &TriggerKey, Option<ThreadId>),
{
    fn run(&mut self, engine: &mut Engine, key: &TriggerKey, calling_thread: Option<ThreadId>) {
        self(engine, key, calling_thread)
    }
}

pub type SharedTriggerCallback = Rc<RefCell<dyn TriggerCallback>>;

/// Native cause callbacks keyed by interaction tuple. The registry is the
/// sole owner of each callback; lookups hand out a shared handle so a
/// callback replaced while it runs is dropped once it returns.
#[derive(Default)]
pub struct TriggerFunctions {
    entries: BTreeMap<TriggerKey, SharedTriggerCallback>,
}

impl TriggerFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`, dropping any callback already declared for the
    /// same key. Returns true when an entry was replaced.
    pub fn add<C>(&mut self, key: TriggerKey, callback: C) -> bool
    where
        C: TriggerCallback + 'static,
    {
        let callback: SharedTriggerCallback = Rc::new(RefCell::new(callback));
        self.entries.insert(key, callback).is_some()
    }

    pub fn find(&self, key: &TriggerKey) -> Option<SharedTriggerCallback> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &TriggerKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &TriggerKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn remove_by_scene_id(&mut self, scene_id: SceneId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.scene_id != scene_id);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &TriggerKey> {
        self.entries.keys()
    }
}

impl fmt::Debug for TriggerFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}
