use std::fmt;

use crate::catalog::{ScriptArgs, ScriptCode};
use crate::context::ThreadContext;
use crate::thread::ThreadStatus;

/// Runs a bytecode program until one of its opcodes blocks.
pub struct ScriptThread {
    code: Box<dyn ScriptCode>,
    args: ScriptArgs,
}

impl ScriptThread {
    pub fn new(code: Box<dyn ScriptCode>, args: ScriptArgs) -> Self {
        ScriptThread { code, args }
    }

    pub(crate) fn on_update(&mut self, ctx: &mut ThreadContext<'_>) -> ThreadStatus {
        self.code.execute(ctx, &self.args)
    }
}

impl fmt::Debug for ScriptThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptThread")
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
