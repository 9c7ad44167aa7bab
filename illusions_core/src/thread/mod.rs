//! Cooperative threads. A thread is a header the scheduler reasons about
//! (ids, pause counter, owning scene) plus a body holding the behaviour of
//! one of the four fixed kinds.

mod abortable;
mod script;
mod talk;
mod timer;

use std::fmt;

use serde::Serialize;

pub use abortable::AbortableThread;
pub use script::ScriptThread;
pub use talk::{TalkRequest, TalkStage, TalkThread};
pub use timer::TimerThread;

use crate::context::ThreadContext;
use crate::ids::{SceneId, ThreadId};
use crate::services::Services;

/// Result of one `on_update` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThreadStatus {
    /// Done; notify the caller and reap.
    Terminate,
    /// Come back next tick.
    Yield,
    /// Park until notified.
    Suspend,
    /// Call again right away.
    Run,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadType {
    Script,
    Timer,
    Talk,
    Abortable,
}

impl ThreadType {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreadType::Script => "script",
            ThreadType::Timer => "timer",
            ThreadType::Talk => "talk",
            ThreadType::Abortable => "abortable",
        }
    }
}

impl fmt::Display for ThreadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed cross-thread signals, answered through [`ThreadBody::send_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadMessage {
    /// Non-zero while a talk thread owns the dialogue display.
    QueryTalkThreadActive,
    ClearSequenceId1,
    ClearSequenceId2,
}

/// Bit 0 of the notify flags: do not wake the caller on termination.
pub const NOTIFY_FLAG_SILENT: u32 = 0x1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadHeader {
    pub id: ThreadId,
    pub kind: ThreadType,
    pub calling_thread_id: Option<ThreadId>,
    pub notify_flags: u32,
    pub pause_ctr: i32,
    pub scene_id: SceneId,
    pub terminated: bool,
}

impl ThreadHeader {
    pub fn new(
        id: ThreadId,
        kind: ThreadType,
        calling_thread_id: Option<ThreadId>,
        notify_flags: u32,
        scene_id: SceneId,
    ) -> Self {
        ThreadHeader {
            id,
            kind,
            calling_thread_id,
            notify_flags,
            pause_ctr: 0,
            scene_id,
            terminated: false,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.pause_ctr > 0
    }

    pub fn notifies_caller(&self) -> bool {
        self.notify_flags & NOTIFY_FLAG_SILENT == 0
    }
}

pub enum ThreadBody {
    Script(ScriptThread),
    Timer(TimerThread),
    Talk(TalkThread),
    Abortable(AbortableThread),
}

impl ThreadBody {
    pub fn kind(&self) -> ThreadType {
        match self {
            ThreadBody::Script(_) => ThreadType::Script,
            ThreadBody::Timer(_) => ThreadType::Timer,
            ThreadBody::Talk(_) => ThreadType::Talk,
            ThreadBody::Abortable(_) => ThreadType::Abortable,
        }
    }

    pub(crate) fn on_update(&mut self, ctx: &mut ThreadContext<'_>) -> ThreadStatus {
        match self {
            ThreadBody::Script(thread) => thread.on_update(ctx),
            ThreadBody::Timer(thread) => thread.on_update(ctx),
            ThreadBody::Talk(thread) => thread.on_update(ctx),
            ThreadBody::Abortable(thread) => thread.on_update(ctx),
        }
    }

    pub(crate) fn on_suspend(&mut self, services: &Services) {
        match self {
            ThreadBody::Timer(thread) => thread.on_suspend(services),
            ThreadBody::Talk(thread) => thread.on_suspend(services),
            ThreadBody::Script(_) | ThreadBody::Abortable(_) => {}
        }
    }

    pub(crate) fn on_notify(&mut self, services: &Services) {
        match self {
            ThreadBody::Timer(thread) => thread.on_notify(services),
            ThreadBody::Talk(thread) => thread.on_resume(services),
            ThreadBody::Script(_) | ThreadBody::Abortable(_) => {}
        }
    }

    pub(crate) fn on_pause(&mut self, services: &Services) {
        match self {
            ThreadBody::Timer(thread) => thread.on_suspend(services),
            ThreadBody::Talk(thread) => thread.on_suspend(services),
            ThreadBody::Script(_) | ThreadBody::Abortable(_) => {}
        }
    }

    pub(crate) fn on_unpause(&mut self, services: &Services) {
        match self {
            ThreadBody::Timer(thread) => thread.on_notify(services),
            ThreadBody::Talk(thread) => thread.on_resume(services),
            ThreadBody::Script(_) | ThreadBody::Abortable(_) => {}
        }
    }

    pub(crate) fn on_resume(&mut self, services: &Services) {
        self.on_unpause(services);
    }

    pub(crate) fn on_terminated(&mut self, services: &Services) {
        if let ThreadBody::Talk(thread) = self {
            thread.on_terminated(services);
        }
    }

    pub(crate) fn on_kill(&mut self, services: &Services) {
        if let ThreadBody::Talk(thread) = self {
            thread.on_kill(services);
        }
    }

    pub(crate) fn send_message(&mut self, message: ThreadMessage) -> u32 {
        match self {
            ThreadBody::Talk(thread) => thread.send_message(message),
            ThreadBody::Script(_) | ThreadBody::Timer(_) | ThreadBody::Abortable(_) => 0,
        }
    }
}

impl fmt::Debug for ThreadBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadBody::Script(thread) => thread.fmt(f),
            ThreadBody::Timer(thread) => thread.fmt(f),
            ThreadBody::Talk(thread) => thread.fmt(f),
            ThreadBody::Abortable(thread) => thread.fmt(f),
        }
    }
}
