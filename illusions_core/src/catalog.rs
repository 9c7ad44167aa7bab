//! The script resource as seen by the scheduler: scene metadata, bytecode
//! entry points and talk entries. Opcode interpretation lives behind
//! [`ScriptCode`]; the scheduler only ever asks code to run until it blocks.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::context::ThreadContext;
use crate::ids::SceneId;
use crate::thread::ThreadStatus;
use crate::trigger_functions::TriggerKey;

/// Offset of a code block inside the script resource.
pub type CodeOffset = u32;

/// Values a script thread is started with. Cause threads receive the
/// interaction tuple that triggered them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScriptArgs {
    pub verb_id: u32,
    pub object_id2: u32,
    pub object_id: u32,
}

/// One running instance of a bytecode program.
pub trait ScriptCode {
    /// Executes opcodes until one of them blocks. `Run` asks the scheduler
    /// to call again immediately.
    fn execute(&mut self, ctx: &mut ThreadContext<'_>, args: &ScriptArgs) -> ThreadStatus;
}

impl<F> ScriptCode for F
where
    F: FnMut(&mut ThreadContext<'_>, &ScriptArgs) -> ThreadStatus,
{
    fn execute(&mut self, ctx: &mut ThreadContext<'_>, args: &ScriptArgs) -> ThreadStatus {
        self(ctx, args)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneInfo {
    pub scene_id: SceneId,
    /// Started as a temp script thread right after the scene is pushed.
    pub entry_code: Option<CodeOffset>,
    /// Scripted causes keyed by `(verb_id, object_id2, object_id)`.
    pub causes: BTreeMap<(u32, u32, u32), CodeOffset>,
}

impl SceneInfo {
    pub fn new(scene_id: SceneId) -> Self {
        SceneInfo {
            scene_id,
            ..SceneInfo::default()
        }
    }

    pub fn with_entry_code(mut self, offset: CodeOffset) -> Self {
        self.entry_code = Some(offset);
        self
    }

    pub fn with_cause(mut self, verb_id: u32, object_id2: u32, object_id: u32, offset: CodeOffset) -> Self {
        self.causes.insert((verb_id, object_id2, object_id), offset);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TalkEntry {
    pub talk_id: u32,
    /// Pages of text shown one after another.
    pub lines: Vec<String>,
    pub voice: Option<String>,
}

pub trait ScriptResource {
    /// Number of script-defined code blocks; sizes the permanent id space.
    fn code_count(&self) -> u32;

    fn scene_info(&self, scene_id: SceneId) -> Option<&SceneInfo>;

    /// Creates a fresh program instance for the block at `offset`.
    fn load_code(&self, offset: CodeOffset) -> Option<Box<dyn ScriptCode>>;

    fn talk_entry(&self, talk_id: u32) -> Option<&TalkEntry>;

    fn find_trigger_cause(&self, key: &TriggerKey) -> Option<CodeOffset> {
        self.scene_info(key.scene_id)?
            .causes
            .get(&(key.verb_id, key.object_id2, key.object_id))
            .copied()
    }
}

pub type CodeFactory = Rc<dyn Fn() -> Box<dyn ScriptCode>>;

/// Script resource assembled in memory.
#[derive(Clone, Default)]
pub struct StaticCatalog {
    code_count: u32,
    scenes: BTreeMap<SceneId, SceneInfo>,
    code: BTreeMap<CodeOffset, CodeFactory>,
    talk: BTreeMap<u32, TalkEntry>,
}

impl StaticCatalog {
    pub fn new(code_count: u32) -> Self {
        StaticCatalog {
            code_count,
            ..StaticCatalog::default()
        }
    }

    pub fn add_scene(&mut self, info: SceneInfo) -> &mut Self {
        self.scenes.insert(info.scene_id, info);
        self
    }

    pub fn add_code<F, C>(&mut self, offset: CodeOffset, factory: F) -> &mut Self
    where
        F: Fn() -> C + 'static,
        C: ScriptCode + 'static,
    {
        self.code
            .insert(offset, Rc::new(move || Box::new(factory()) as Box<dyn ScriptCode>));
        self
    }

    pub fn add_code_factory(&mut self, offset: CodeOffset, factory: CodeFactory) -> &mut Self {
        self.code.insert(offset, factory);
        self
    }

    pub fn add_talk(&mut self, entry: TalkEntry) -> &mut Self {
        self.talk.insert(entry.talk_id, entry);
        self
    }

    pub fn scene_ids(&self) -> impl Iterator<Item = SceneId> + '_ {
        self.scenes.keys().copied()
    }
}

impl fmt::Debug for StaticCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCatalog")
            .field("code_count", &self.code_count)
            .field("scenes", &self.scenes)
            .field("code", &self.code.keys().collect::<Vec<_>>())
            .field("talk", &self.talk)
            .finish()
    }
}

impl ScriptResource for StaticCatalog {
    fn code_count(&self) -> u32 {
        self.code_count
    }

    fn scene_info(&self, scene_id: SceneId) -> Option<&SceneInfo> {
        self.scenes.get(&scene_id)
    }

    fn load_code(&self, offset: CodeOffset) -> Option<Box<dyn ScriptCode>> {
        self.code.get(&offset).map(|factory| factory())
    }

    fn talk_entry(&self, talk_id: u32) -> Option<&TalkEntry> {
        self.talk.get(&talk_id)
    }
}
