use crate::catalog::{CodeOffset, ScriptArgs};
use crate::context::ThreadContext;
use crate::ids::ThreadId;
use crate::services::InputEvent;
use crate::thread::ThreadStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AbortStage {
    Watching,
    Aborting(ThreadId),
}

/// Guards a script thread that the player may cancel. The target runs with
/// this thread as its caller; on the abort input the target is killed and
/// the abort fragment runs in its place.
#[derive(Debug, Clone)]
pub struct AbortableThread {
    target: ThreadId,
    abort_code: Option<CodeOffset>,
    stage: AbortStage,
}

impl AbortableThread {
    pub fn new(target: ThreadId, abort_code: Option<CodeOffset>) -> Self {
        AbortableThread {
            target,
            abort_code,
            stage: AbortStage::Watching,
        }
    }

    pub(crate) fn on_update(&mut self, ctx: &mut ThreadContext<'_>) -> ThreadStatus {
        match self.stage {
            AbortStage::Watching => {
                if ctx.poll_input(InputEvent::Abort) {
                    ctx.kill_thread(self.target);
                    let fragment = self
                        .abort_code
                        .and_then(|code| ctx.start_child_script_thread(code, ScriptArgs::default()));
                    return match fragment {
                        Some(fragment) => {
                            log::debug!(
                                "thread {} aborted {}; fragment {}",
                                ctx.thread_id(),
                                self.target,
                                fragment
                            );
                            self.stage = AbortStage::Aborting(fragment);
                            ThreadStatus::Suspend
                        }
                        None => ThreadStatus::Terminate,
                    };
                }
                if ctx.is_thread_live(self.target) {
                    ThreadStatus::Yield
                } else {
                    ThreadStatus::Terminate
                }
            }
            AbortStage::Aborting(fragment) => {
                if ctx.is_thread_live(fragment) {
                    ThreadStatus::Yield
                } else {
                    ThreadStatus::Terminate
                }
            }
        }
    }
}
