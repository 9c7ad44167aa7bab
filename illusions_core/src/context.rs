//! What a running thread sees of the engine.

use crate::catalog::{CodeOffset, ScriptArgs, TalkEntry};
use crate::config::TalkTiming;
use crate::engine::Engine;
use crate::ids::{SceneId, ThreadId};
use crate::services::{InputEvent, Services};
use crate::thread::TalkRequest;
use crate::trigger_functions::TriggerCallback;

/// Handed to a thread for the duration of one `on_update` call. Operations
/// that take a "calling thread" use the running thread, so a script that
/// suspends right after starting a child is woken when the child ends.
pub struct ThreadContext<'a> {
    engine: &'a mut Engine,
    thread_id: ThreadId,
}

impl<'a> ThreadContext<'a> {
    pub(crate) fn new(engine: &'a mut Engine, thread_id: ThreadId) -> Self {
        ThreadContext { engine, thread_id }
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Full engine access for opcodes that have no shortcut here.
    pub fn engine(&mut self) -> &mut Engine {
        self.engine
    }

    pub fn services(&self) -> &Services {
        self.engine.services()
    }

    pub fn now(&self) -> u32 {
        self.engine.now()
    }

    /// Consumes `event` if it is pending.
    pub fn poll_input(&self, event: InputEvent) -> bool {
        self.engine.services().input.poll_event(event)
    }

    pub fn talk_entry(&self, talk_id: u32) -> Option<TalkEntry> {
        self.engine.talk_entry(talk_id)
    }

    pub fn talk_timing(&self) -> TalkTiming {
        self.engine.config().talk
    }

    pub fn current_scene(&self) -> SceneId {
        self.engine.current_scene()
    }

    pub fn is_scene_active(&self, scene_id: SceneId) -> bool {
        self.engine.is_scene_active(scene_id)
    }

    pub fn is_thread_live(&self, thread_id: ThreadId) -> bool {
        self.engine.is_thread_live(thread_id)
    }

    pub fn is_talk_thread_active(&mut self) -> bool {
        self.engine.is_talk_thread_active()
    }

    pub fn log(&mut self, message: &str) {
        let entry = format!("script.log {} {message}", self.thread_id);
        self.engine.log_event(entry);
    }

    /// Fire-and-forget temp script thread.
    pub fn start_script_thread(&mut self, code_offset: CodeOffset, args: ScriptArgs) -> Option<ThreadId> {
        self.engine.start_temp_script_thread(code_offset, None, args)
    }

    /// Temp script thread that wakes this thread when it ends.
    pub fn start_child_script_thread(
        &mut self,
        code_offset: CodeOffset,
        args: ScriptArgs,
    ) -> Option<ThreadId> {
        self.engine
            .start_temp_script_thread(code_offset, Some(self.thread_id), args)
    }

    pub fn start_timer(&mut self, duration: u32, abortable: bool) -> Option<ThreadId> {
        self.engine
            .start_timer_thread(duration, Some(self.thread_id), abortable)
    }

    pub fn start_talk(&mut self, request: TalkRequest) -> ThreadId {
        self.engine.start_talk_thread(request, Some(self.thread_id))
    }

    pub fn start_abortable(
        &mut self,
        code_offset: CodeOffset,
        abort_code: Option<CodeOffset>,
    ) -> Option<ThreadId> {
        self.engine
            .start_abortable_thread(code_offset, abort_code, Some(self.thread_id))
    }

    pub fn notify(&mut self, thread_id: ThreadId) {
        self.engine.notify_thread(thread_id);
    }

    pub fn kill_thread(&mut self, thread_id: ThreadId) {
        self.engine.kill_thread(thread_id);
    }

    pub fn end_talk_threads(&mut self) {
        self.engine.end_talk_threads();
    }

    /// Moves this thread to another scene's bookkeeping.
    pub fn set_scene_id(&mut self, scene_id: SceneId) {
        self.engine.set_thread_scene_id(self.thread_id, scene_id);
    }

    pub fn enter_scene(&mut self, scene_id: SceneId) -> bool {
        self.engine.enter_scene(scene_id, Some(self.thread_id))
    }

    pub fn exit_scene(&mut self) {
        self.engine.exit_scene(Some(self.thread_id));
    }

    pub fn enter_pause(&mut self) {
        self.engine.enter_pause(Some(self.thread_id));
    }

    pub fn leave_pause(&mut self) {
        self.engine.leave_pause(Some(self.thread_id));
    }

    pub fn dump_active_scenes(&mut self, scene_id: SceneId) {
        self.engine.dump_active_scenes(scene_id, Some(self.thread_id));
    }

    pub fn load_resource(&mut self, resource_id: u32) {
        let scene_id = self.engine.current_scene();
        self.engine
            .load_resource(resource_id, scene_id, Some(self.thread_id));
    }

    pub fn cause_is_declared(&self, verb_id: u32, object_id2: u32, object_id: u32) -> bool {
        self.engine
            .cause_is_declared(self.engine.current_scene(), verb_id, object_id2, object_id)
    }

    pub fn cause_declare<C>(&mut self, verb_id: u32, object_id2: u32, object_id: u32, callback: C) -> bool
    where
        C: TriggerCallback + 'static,
    {
        self.engine
            .cause_declare(verb_id, object_id2, object_id, callback)
    }

    /// Triggers a cause in the current scene with this thread as caller.
    pub fn cause_trigger(&mut self, verb_id: u32, object_id2: u32, object_id: u32) -> Option<ThreadId> {
        let scene_id = self.engine.current_scene();
        self.engine
            .cause_trigger(scene_id, verb_id, object_id2, object_id, Some(self.thread_id))
    }
}
