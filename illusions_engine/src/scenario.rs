//! JSON scenario files: scenes, code blocks written as small op lists, talk
//! entries and a per-frame input schedule.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use illusions_core::catalog::CodeFactory;
use illusions_core::{
    CodeOffset, Engine, InputEvent, SceneId, SceneInfo, ScriptArgs, ScriptCode, StaticCatalog,
    TalkEntry, TalkRequest, ThreadContext, ThreadId, ThreadStatus, TriggerKey,
};

const DEFAULT_FRAMES: u32 = 120;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub code_count: u32,
    pub frames: Option<u32>,
    pub boot: BootSpec,
    #[serde(default)]
    pub voice: VoiceSpec,
    #[serde(default)]
    pub scenes: Vec<SceneSpec>,
    #[serde(default)]
    pub code: Vec<CodeSpec>,
    #[serde(default)]
    pub talk: Vec<TalkSpec>,
    #[serde(default)]
    pub input: Vec<InputSpec>,
}

/// The first script thread, run under its permanent id with immediate
/// execution so it can set the stage before frame one.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootSpec {
    pub thread: u16,
    pub code: CodeOffset,
}

/// How many presenter polls a voice cue and a voice line take.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceSpec {
    pub cue_polls: u32,
    pub length_polls: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneSpec {
    pub id: SceneId,
    pub entry_code: Option<CodeOffset>,
    #[serde(default)]
    pub causes: Vec<CauseSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CauseSpec {
    pub verb: u32,
    #[serde(default)]
    pub object2: u32,
    pub object: u32,
    pub code: CodeOffset,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeSpec {
    pub offset: CodeOffset,
    pub ops: Vec<Op>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TalkSpec {
    pub id: u32,
    pub lines: Vec<String>,
    pub voice: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputSpec {
    pub frame: u32,
    pub event: InputName,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputName {
    Skip,
    Abort,
}

impl From<InputName> for InputEvent {
    fn from(name: InputName) -> Self {
        match name {
            InputName::Skip => InputEvent::Skip,
            InputName::Abort => InputEvent::Abort,
        }
    }
}

/// Stand-in for the bytecode interpreter. Ops that wait on another thread
/// return `Suspend` and resume when that thread notifies.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Op {
    Log {
        message: String,
    },
    Yield,
    Delay {
        ms: u32,
        #[serde(default)]
        abortable: bool,
    },
    EnterScene {
        scene: SceneId,
    },
    ExitScene,
    EnterPause,
    LeavePause,
    DumpScenes {
        scene: SceneId,
    },
    Start {
        code: CodeOffset,
    },
    Call {
        code: CodeOffset,
    },
    Talk {
        object: u32,
        talk: u32,
        #[serde(default)]
        sequence1: u32,
        #[serde(default)]
        sequence2: u32,
        #[serde(default)]
        duration: u32,
    },
    Cause {
        verb: u32,
        #[serde(default)]
        object2: u32,
        object: u32,
    },
    DeclareCause {
        verb: u32,
        #[serde(default)]
        object2: u32,
        object: u32,
        message: String,
    },
    LoadResource {
        resource: u32,
    },
    Abortable {
        code: CodeOffset,
        abort: Option<CodeOffset>,
    },
    End,
}

struct OpProgram {
    ops: Rc<[Op]>,
    pc: usize,
}

impl OpProgram {
    fn new(ops: Rc<[Op]>) -> Self {
        OpProgram { ops, pc: 0 }
    }
}

impl ScriptCode for OpProgram {
    fn execute(&mut self, ctx: &mut ThreadContext<'_>, _args: &ScriptArgs) -> ThreadStatus {
        while let Some(op) = self.ops.get(self.pc) {
            self.pc += 1;
            match op {
                Op::Log { message } => ctx.log(message),
                Op::Yield => return ThreadStatus::Yield,
                Op::Delay { ms, abortable } => {
                    ctx.start_timer(*ms, *abortable);
                    return ThreadStatus::Suspend;
                }
                Op::EnterScene { scene } => {
                    ctx.enter_scene(*scene);
                }
                Op::ExitScene => ctx.exit_scene(),
                Op::EnterPause => ctx.enter_pause(),
                Op::LeavePause => ctx.leave_pause(),
                Op::DumpScenes { scene } => ctx.dump_active_scenes(*scene),
                Op::Start { code } => {
                    ctx.start_script_thread(*code, ScriptArgs::default());
                }
                Op::Call { code } => {
                    ctx.start_child_script_thread(*code, ScriptArgs::default());
                    return ThreadStatus::Suspend;
                }
                Op::Talk {
                    object,
                    talk,
                    sequence1,
                    sequence2,
                    duration,
                } => {
                    ctx.start_talk(TalkRequest {
                        object_id: *object,
                        talk_id: *talk,
                        sequence_id1: *sequence1,
                        sequence_id2: *sequence2,
                        duration: *duration,
                    });
                    return ThreadStatus::Suspend;
                }
                Op::Cause {
                    verb,
                    object2,
                    object,
                } => {
                    if ctx.cause_is_declared(*verb, *object2, *object) {
                        ctx.cause_trigger(*verb, *object2, *object);
                        return ThreadStatus::Suspend;
                    }
                    log::debug!(
                        "thread {}: no cause for {verb:08X}/{object2:08X}/{object:08X}",
                        ctx.thread_id()
                    );
                }
                Op::DeclareCause {
                    verb,
                    object2,
                    object,
                    message,
                } => {
                    let message = message.clone();
                    ctx.cause_declare(
                        *verb,
                        *object2,
                        *object,
                        move |engine: &mut Engine, key: &TriggerKey, caller: Option<ThreadId>| {
                            engine.log_event(format!("cause.callback {key} {message}"));
                            let mut caller = caller;
                            engine.notify_thread_id(&mut caller);
                        },
                    );
                }
                Op::LoadResource { resource } => ctx.load_resource(*resource),
                Op::Abortable { code, abort } => {
                    ctx.start_abortable(*code, *abort);
                    return ThreadStatus::Suspend;
                }
                Op::End => return ThreadStatus::Terminate,
            }
        }
        ThreadStatus::Terminate
    }
}

impl Scenario {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let scenario: Scenario = serde_json::from_str(&text)
            .with_context(|| format!("parsing scenario {}", path.display()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn frames(&self) -> u32 {
        self.frames.unwrap_or(DEFAULT_FRAMES)
    }

    pub fn boot_thread(&self) -> ThreadId {
        ThreadId::script(self.boot.thread)
    }

    fn validate(&self) -> Result<()> {
        let mut offsets = BTreeSet::new();
        for block in &self.code {
            if !offsets.insert(block.offset) {
                bail!("code offset {:#X} defined twice", block.offset);
            }
        }
        if !offsets.contains(&self.boot.code) {
            bail!("boot code {:#X} is not defined", self.boot.code);
        }
        if u32::from(self.boot.thread) >= self.code_count.saturating_mul(2) {
            bail!(
                "boot thread index {} collides with temp thread ids (code_count {})",
                self.boot.thread,
                self.code_count
            );
        }
        let mut scenes = BTreeSet::new();
        for scene in &self.scenes {
            if !scenes.insert(scene.id) {
                bail!("scene {} defined twice", scene.id);
            }
        }
        Ok(())
    }

    pub fn build_catalog(&self) -> StaticCatalog {
        let mut catalog = StaticCatalog::new(self.code_count);
        for scene in &self.scenes {
            let mut info = SceneInfo::new(scene.id);
            if let Some(entry_code) = scene.entry_code {
                info = info.with_entry_code(entry_code);
            }
            for cause in &scene.causes {
                info = info.with_cause(cause.verb, cause.object2, cause.object, cause.code);
            }
            catalog.add_scene(info);
        }
        for block in &self.code {
            let ops: Rc<[Op]> = block.ops.clone().into();
            let factory: CodeFactory =
                Rc::new(move || Box::new(OpProgram::new(Rc::clone(&ops))) as Box<dyn ScriptCode>);
            catalog.add_code_factory(block.offset, factory);
        }
        for talk in &self.talk {
            catalog.add_talk(TalkEntry {
                talk_id: talk.id,
                lines: talk.lines.clone(),
                voice: talk.voice.clone(),
            });
        }
        catalog
    }

    /// Inputs scheduled for `frame`, in file order.
    pub fn inputs_at(&self, frame: u32) -> impl Iterator<Item = InputEvent> + '_ {
        self.input
            .iter()
            .filter(move |input| input.frame == frame)
            .map(|input| input.event.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_use_tagged_json() {
        let op: Op = serde_json::from_str(r#"{"op": "delay", "ms": 250}"#).unwrap();
        assert!(matches!(
            op,
            Op::Delay {
                ms: 250,
                abortable: false
            }
        ));
    }

    #[test]
    fn boot_code_must_exist() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "name": "broken",
                "code_count": 4,
                "boot": {"thread": 4, "code": 256},
                "code": [{"offset": 512, "ops": [{"op": "end"}]}]
            }"#,
        )
        .unwrap();
        let err = scenario.validate().unwrap_err();
        assert!(err.to_string().contains("boot code"));
    }

    #[test]
    fn boot_thread_must_sit_below_the_temp_range() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "name": "clash",
                "code_count": 2,
                "boot": {"thread": 4, "code": 256},
                "code": [{"offset": 256, "ops": []}]
            }"#,
        )
        .unwrap();
        assert!(scenario.validate().is_err());
    }
}
