#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use illusions_core::catalog::CodeFactory;
use illusions_core::{
    Engine, EngineConfig, ManualClock, RecordingHost, ScriptArgs, ScriptCode, StaticCatalog,
    TalkRequest, ThreadContext, ThreadId, ThreadStatus, ThreadType,
};

pub struct Harness {
    pub engine: Engine,
    pub clock: ManualClock,
    pub host: RecordingHost,
}

impl Harness {
    pub fn new(catalog: StaticCatalog) -> Self {
        Self::with_config(catalog, EngineConfig::default())
    }

    pub fn with_config(catalog: StaticCatalog, config: EngineConfig) -> Self {
        Self::with_host(catalog, config, RecordingHost::new())
    }

    pub fn with_host(catalog: StaticCatalog, config: EngineConfig, host: RecordingHost) -> Self {
        let clock = ManualClock::new(0);
        let services = host.services(Rc::new(clock.clone()));
        let engine = Engine::new(config, services, Rc::new(catalog));
        Harness {
            engine,
            clock,
            host,
        }
    }

    pub fn frame(&mut self, ms: u32) {
        self.clock.advance(ms);
        self.engine.tick();
    }

    pub fn has_event(&self, entry: &str) -> bool {
        self.engine.events().iter().any(|event| event == entry)
    }

    pub fn events_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.engine
            .events()
            .iter()
            .filter(|event| event.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn pause_ctr(&self, id: ThreadId) -> i32 {
        self.engine
            .thread_header(id)
            .map(|header| header.pause_ctr)
            .unwrap_or_default()
    }

    pub fn live(&self, id: ThreadId) -> bool {
        self.engine.is_thread_live(id)
    }

    pub fn talk_threads(&self) -> Vec<ThreadId> {
        self.engine
            .threads()
            .headers()
            .filter(|header| header.kind == ThreadType::Talk)
            .map(|header| header.id)
            .collect()
    }

    pub fn spawn(&mut self, code: u32) -> ThreadId {
        self.engine
            .start_temp_script_thread(code, None, ScriptArgs::default())
            .expect("code block should exist")
    }

    pub fn spawn_for(&mut self, code: u32, caller: ThreadId) -> ThreadId {
        self.engine
            .start_temp_script_thread(code, Some(caller), ScriptArgs::default())
            .expect("code block should exist")
    }
}

pub fn yield_forever(_: &mut ThreadContext<'_>, _: &ScriptArgs) -> ThreadStatus {
    ThreadStatus::Yield
}

/// Logs `label` and ends.
pub fn log_and_finish(label: &'static str) -> CodeFactory {
    Rc::new(move || {
        Box::new(move |ctx: &mut ThreadContext<'_>, _: &ScriptArgs| {
            ctx.log(label);
            ThreadStatus::Terminate
        }) as Box<dyn ScriptCode>
    })
}

/// Logs `label` on every update and yields.
pub fn log_each_update(label: &'static str) -> CodeFactory {
    Rc::new(move || {
        Box::new(move |ctx: &mut ThreadContext<'_>, _: &ScriptArgs| {
            ctx.log(label);
            ThreadStatus::Yield
        }) as Box<dyn ScriptCode>
    })
}

/// Starts a line of dialogue, waits for it, then logs `label` and ends.
pub fn talk_then_log(request: TalkRequest, label: &'static str) -> CodeFactory {
    Rc::new(move || {
        let mut asked = false;
        Box::new(move |ctx: &mut ThreadContext<'_>, _: &ScriptArgs| {
            if !asked {
                asked = true;
                ctx.start_talk(request);
                return ThreadStatus::Suspend;
            }
            ctx.log(label);
            ThreadStatus::Terminate
        }) as Box<dyn ScriptCode>
    })
}

/// Counts its updates; returns `Run` until `runs` extra calls were made.
pub fn counting(counter: Rc<Cell<u32>>, runs: u32) -> CodeFactory {
    Rc::new(move || {
        let counter = Rc::clone(&counter);
        Box::new(move |_: &mut ThreadContext<'_>, _: &ScriptArgs| {
            counter.set(counter.get() + 1);
            if counter.get() <= runs {
                ThreadStatus::Run
            } else {
                ThreadStatus::Yield
            }
        }) as Box<dyn ScriptCode>
    })
}
