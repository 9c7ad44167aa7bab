//! The engine ties the scheduler to the scene stack, the trigger table and
//! the host collaborators. Everything runs on one logical executor: a host
//! calls [`Engine::tick`] once per frame and script code reaches back in
//! through [`ThreadContext`].

use std::rc::Rc;

use serde::Serialize;

use crate::active_scenes::{ActiveScene, ActiveScenes};
use crate::catalog::{CodeOffset, ScriptArgs, ScriptCode, ScriptResource, TalkEntry};
use crate::config::EngineConfig;
use crate::context::ThreadContext;
use crate::ids::{SceneId, TempIdAllocator, ThreadId};
use crate::services::{InputEvent, Services};
use crate::thread::{
    AbortableThread, ScriptThread, TalkRequest, TalkStage, TalkThread, ThreadBody, ThreadHeader,
    ThreadMessage, ThreadStatus, ThreadType, TimerThread,
};
use crate::thread_list::{ThreadList, ThreadListAdapter};
use crate::trigger_functions::{TriggerCallback, TriggerFunctions, TriggerKey};
use crate::update_functions::{UpdateCallback, UpdateFunctions};

/// Diagnostic view of the scheduler state.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub now: u32,
    pub engine_pause_ctr: i32,
    pub threads: Vec<ThreadHeader>,
    pub active_scenes: Vec<ActiveScene>,
    pub trigger_keys: Vec<TriggerKey>,
    pub update_functions: usize,
}

pub struct Engine {
    config: EngineConfig,
    services: Services,
    resource: Rc<dyn ScriptResource>,
    threads: ThreadList,
    temp_ids: TempIdAllocator,
    active_scenes: ActiveScenes,
    triggers: TriggerFunctions,
    update_functions: UpdateFunctions,
    pause_ctr: i32,
    in_pass: bool,
    events: Vec<String>,
}

impl Engine {
    pub fn new(config: EngineConfig, services: Services, resource: Rc<dyn ScriptResource>) -> Self {
        let temp_ids = TempIdAllocator::new(resource.code_count());
        Engine {
            config,
            services,
            resource,
            threads: ThreadList::new(),
            temp_ids,
            active_scenes: ActiveScenes::new(),
            triggers: TriggerFunctions::new(),
            update_functions: UpdateFunctions::new(),
            pause_ctr: 0,
            in_pass: false,
            events: Vec::new(),
        }
    }

    fn thread_ops(&mut self) -> ThreadListAdapter<'_> {
        ThreadListAdapter::new(&mut self.threads, &self.services, &mut self.events)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn resource(&self) -> &Rc<dyn ScriptResource> {
        &self.resource
    }

    pub fn now(&self) -> u32 {
        self.services.now()
    }

    pub fn threads(&self) -> &ThreadList {
        &self.threads
    }

    pub fn active_scenes(&self) -> &ActiveScenes {
        &self.active_scenes
    }

    pub fn triggers(&self) -> &TriggerFunctions {
        &self.triggers
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<String> {
        std::mem::take(&mut self.events)
    }

    /// Appends a free-form entry to the event log.
    pub fn log_event(&mut self, entry: impl Into<String>) {
        self.events.push(entry.into());
    }

    /// When set, newly started script threads run until they first block
    /// instead of waiting for the next pass. Used while bootstrapping.
    pub fn set_immediate_script_init(&mut self, enabled: bool) {
        self.config.immediate_script_init = enabled;
    }

    pub fn talk_entry(&self, talk_id: u32) -> Option<TalkEntry> {
        self.resource.talk_entry(talk_id).cloned()
    }

    /// One frame: update functions first, then one pass over the threads.
    pub fn tick(&mut self) {
        let now = self.now();
        self.update_functions.update(now);
        self.update_threads();
    }

    /// Visits every thread that existed when the pass began, in start order.
    /// Threads started during the pass get their first update next pass.
    pub fn update_threads(&mut self) {
        if self.in_pass {
            log::warn!("update_threads called from inside a thread pass; ignored");
            return;
        }
        self.in_pass = true;
        self.threads.reap();
        let count = self.threads.slot_count();
        for index in 0..count {
            if self.threads.is_runnable_at(index) {
                self.run_slot(index);
            }
        }
        self.threads.reap();
        self.in_pass = false;
    }

    fn run_slot(&mut self, index: usize) {
        loop {
            if !self.threads.is_runnable_at(index) {
                return;
            }
            let Some(mut body) = self.threads.checkout(index) else {
                return;
            };
            let thread_id = self.threads.header_at(index).id;
            let status = {
                let mut ctx = ThreadContext::new(self, thread_id);
                body.on_update(&mut ctx)
            };
            self.thread_ops().checkin(index, body);
            if self.threads.header_at(index).terminated {
                return;
            }
            match status {
                ThreadStatus::Run => continue,
                ThreadStatus::Yield => return,
                ThreadStatus::Suspend => {
                    self.thread_ops().suspend_at(index);
                    return;
                }
                ThreadStatus::Terminate => {
                    self.thread_ops().terminate_at(index);
                    return;
                }
            }
        }
    }

    fn start_thread(&mut self, header: ThreadHeader, body: ThreadBody) -> usize {
        let index = self.thread_ops().start_thread(header, body);
        if self.pause_ctr > 0 {
            self.thread_ops().pause_at(index);
        }
        index
    }

    pub fn new_temp_thread_id(&mut self) -> ThreadId {
        self.temp_ids.allocate()
    }

    fn load_code_or_notify(
        &mut self,
        code_offset: CodeOffset,
        calling_thread: Option<ThreadId>,
    ) -> Option<Box<dyn ScriptCode>> {
        let code = self.resource.load_code(code_offset);
        if code.is_none() {
            log::warn!("no script code at offset {code_offset:08X}");
            self.events
                .push(format!("thread.missing_code {code_offset:08X}"));
            let mut caller = calling_thread;
            self.notify_thread_id(&mut caller);
        }
        code
    }

    fn launch_script(
        &mut self,
        thread_id: ThreadId,
        code: Box<dyn ScriptCode>,
        calling_thread: Option<ThreadId>,
        args: ScriptArgs,
    ) -> ThreadId {
        let header = ThreadHeader::new(
            thread_id,
            ThreadType::Script,
            calling_thread,
            0,
            self.active_scenes.current_scene(),
        );
        let index = self.start_thread(header, ThreadBody::Script(ScriptThread::new(code, args)));
        if self.config.immediate_script_init {
            self.run_slot(index);
        }
        thread_id
    }

    /// Starts a script-defined thread under its permanent id.
    pub fn start_script_thread(
        &mut self,
        thread_id: ThreadId,
        code_offset: CodeOffset,
        calling_thread: Option<ThreadId>,
        args: ScriptArgs,
    ) -> Option<ThreadId> {
        let code = self.load_code_or_notify(code_offset, calling_thread)?;
        Some(self.launch_script(thread_id, code, calling_thread, args))
    }

    /// Starts a script thread under a freshly allocated temp id.
    pub fn start_temp_script_thread(
        &mut self,
        code_offset: CodeOffset,
        calling_thread: Option<ThreadId>,
        args: ScriptArgs,
    ) -> Option<ThreadId> {
        let code = self.load_code_or_notify(code_offset, calling_thread)?;
        let thread_id = self.temp_ids.allocate();
        Some(self.launch_script(thread_id, code, calling_thread, args))
    }

    /// A zero duration wakes the caller right away and starts nothing.
    pub fn start_timer_thread(
        &mut self,
        duration: u32,
        calling_thread: Option<ThreadId>,
        abortable: bool,
    ) -> Option<ThreadId> {
        if duration == 0 {
            let mut caller = calling_thread;
            self.notify_thread_id(&mut caller);
            return None;
        }
        let thread_id = self.temp_ids.allocate();
        let header = ThreadHeader::new(
            thread_id,
            ThreadType::Timer,
            calling_thread,
            0,
            self.active_scenes.current_scene(),
        );
        let body = ThreadBody::Timer(TimerThread::new(duration, self.now(), abortable));
        self.start_thread(header, body);
        Some(thread_id)
    }

    /// Starts a line of dialogue. Any other talk thread is ended first
    /// without waking its caller.
    pub fn start_talk_thread(
        &mut self,
        request: TalkRequest,
        calling_thread: Option<ThreadId>,
    ) -> ThreadId {
        self.end_talk_threads_no_notify();
        let thread_id = self.temp_ids.allocate();
        let header = ThreadHeader::new(
            thread_id,
            ThreadType::Talk,
            calling_thread,
            0,
            self.active_scenes.current_scene(),
        );
        let body = ThreadBody::Talk(TalkThread::new(request, self.config.talk));
        self.start_thread(header, body);
        thread_id
    }

    /// Runs `code_offset` under an abortable wrapper whose id is returned.
    /// The caller is woken when the wrapper ends, whichever way it ends.
    pub fn start_abortable_thread(
        &mut self,
        code_offset: CodeOffset,
        abort_code: Option<CodeOffset>,
        calling_thread: Option<ThreadId>,
    ) -> Option<ThreadId> {
        let code = self.load_code_or_notify(code_offset, calling_thread)?;
        self.services.input.discard_event(InputEvent::Abort);
        let wrapper_id = self.temp_ids.allocate();
        let target_id = self.temp_ids.allocate();
        let header = ThreadHeader::new(
            wrapper_id,
            ThreadType::Abortable,
            calling_thread,
            0,
            self.active_scenes.current_scene(),
        );
        self.start_thread(
            header,
            ThreadBody::Abortable(AbortableThread::new(target_id, abort_code)),
        );
        self.launch_script(target_id, code, Some(wrapper_id), ScriptArgs::default());
        Some(wrapper_id)
    }

    /// Wakes the thread in `slot`, if any, and clears the slot so the same
    /// wait cannot be released twice.
    pub fn notify_thread_id(&mut self, slot: &mut Option<ThreadId>) {
        if let Some(thread_id) = slot.take() {
            self.thread_ops().notify_id(thread_id);
        }
    }

    pub fn notify_thread(&mut self, thread_id: ThreadId) {
        self.thread_ops().notify_id(thread_id);
    }

    pub fn suspend_thread(&mut self, thread_id: ThreadId) {
        self.thread_ops().suspend_id(thread_id);
    }

    pub fn terminate_thread(&mut self, thread_id: ThreadId) {
        self.thread_ops().terminate_thread(thread_id);
    }

    pub fn kill_thread(&mut self, thread_id: ThreadId) {
        self.thread_ops().kill_thread(thread_id);
    }

    pub fn terminate_thread_chain(&mut self, thread_id: ThreadId) {
        self.thread_ops().terminate_thread_chain(thread_id);
    }

    pub fn send_message(&mut self, thread_id: ThreadId, message: ThreadMessage) -> u32 {
        self.thread_ops().send_message(thread_id, message)
    }

    pub fn is_active_thread(&mut self, message: ThreadMessage) -> bool {
        self.thread_ops().is_active_thread(message)
    }

    pub fn is_talk_thread_active(&mut self) -> bool {
        self.is_active_thread(ThreadMessage::QueryTalkThreadActive)
    }

    pub fn is_thread_live(&self, thread_id: ThreadId) -> bool {
        self.threads.is_live(thread_id)
    }

    pub fn thread_header(&self, thread_id: ThreadId) -> Option<&ThreadHeader> {
        self.threads.header(thread_id)
    }

    pub fn talk_stage(&self, thread_id: ThreadId) -> Option<TalkStage> {
        self.threads.talk_stage(thread_id)
    }

    pub fn set_thread_scene_id(&mut self, thread_id: ThreadId, scene_id: SceneId) -> bool {
        self.threads.set_thread_scene_id(thread_id, scene_id)
    }

    /// See [`crate::thread::NOTIFY_FLAG_SILENT`].
    pub fn set_notify_flags(&mut self, thread_id: ThreadId, notify_flags: u32) -> bool {
        self.threads.set_notify_flags(thread_id, notify_flags)
    }

    pub fn thread_scene_id(&self, thread_id: ThreadId) -> Option<SceneId> {
        self.threads.thread_scene_id(thread_id)
    }

    pub fn terminate_threads_by_scene_id(&mut self, scene_id: SceneId, except: Option<ThreadId>) {
        self.thread_ops()
            .terminate_threads_by_scene_id(scene_id, except);
    }

    pub fn suspend_threads_by_scene_id(&mut self, scene_id: SceneId, except: Option<ThreadId>) {
        self.thread_ops().suspend_threads_by_scene_id(scene_id, except);
    }

    pub fn notify_threads_by_scene_id(&mut self, scene_id: SceneId, except: Option<ThreadId>) {
        self.thread_ops().notify_threads_by_scene_id(scene_id, except);
    }

    pub fn pause_threads(&mut self, except: Option<ThreadId>) {
        self.thread_ops().pause_threads(except);
    }

    pub fn unpause_threads(&mut self, except: Option<ThreadId>) {
        self.thread_ops().unpause_threads(except);
    }

    pub fn suspend_threads(&mut self, except: Option<ThreadId>) {
        self.thread_ops().suspend_threads(except);
    }

    pub fn resume_threads(&mut self, except: Option<ThreadId>) {
        self.thread_ops().resume_threads(except);
    }

    pub fn terminate_threads(&mut self, except: Option<ThreadId>) {
        self.thread_ops().terminate_threads(except);
    }

    pub fn terminate_active_threads(&mut self, except: Option<ThreadId>) {
        let scenes = &self.active_scenes;
        ThreadListAdapter::new(&mut self.threads, &self.services, &mut self.events)
            .terminate_active_threads(except, |scene_id| scenes.is_scene_active(scene_id));
    }

    pub fn end_talk_threads(&mut self) {
        self.thread_ops().end_talk_threads();
    }

    pub fn end_talk_threads_no_notify(&mut self) {
        self.thread_ops().end_talk_threads_no_notify();
    }

    pub fn notify_timer_threads(&mut self, except: Option<ThreadId>) {
        self.thread_ops().notify_timer_threads(except);
    }

    pub fn suspend_timer_threads(&mut self, except: Option<ThreadId>) {
        self.thread_ops().suspend_timer_threads(except);
    }

    /// Nests; threads are paused on the first call and released on the
    /// matching last unpause. Threads started meanwhile begin paused.
    pub fn pause_engine(&mut self) {
        self.pause_ctr += 1;
        if self.pause_ctr == 1 {
            self.events.push("engine.pause".to_string());
            self.thread_ops().pause_threads(None);
        }
    }

    pub fn unpause_engine(&mut self) {
        if self.pause_ctr == 0 {
            log::warn!("unpause_engine without a matching pause");
            return;
        }
        self.pause_ctr -= 1;
        if self.pause_ctr == 0 {
            self.events.push("engine.unpause".to_string());
            self.thread_ops().unpause_threads(None);
        }
    }

    pub fn is_engine_paused(&self) -> bool {
        self.pause_ctr > 0
    }

    pub fn current_scene(&self) -> SceneId {
        self.active_scenes.current_scene()
    }

    pub fn is_scene_active(&self, scene_id: SceneId) -> bool {
        self.active_scenes.is_scene_active(scene_id)
    }

    /// Pushes `scene_id` and starts its entry code. A scene missing from the
    /// script resource unwinds to the global scene and pushes the error
    /// scene instead; the `false` return is the only sign of it.
    pub fn enter_scene(&mut self, scene_id: SceneId, thread_id: Option<ThreadId>) -> bool {
        let resource = Rc::clone(&self.resource);
        let Some(info) = resource.scene_info(scene_id) else {
            log::warn!("scene {scene_id:08X} has no scene info; falling back to the error scene");
            self.events.push(format!("scene.missing {scene_id}"));
            self.dump_active_scenes(self.config.global_scene_id, thread_id);
            let error_scene = self.config.error_scene_id;
            self.active_scenes.push(error_scene);
            self.events.push(format!("scene.enter {error_scene}"));
            return false;
        };
        self.active_scenes.push(scene_id);
        self.events.push(format!("scene.enter {scene_id}"));
        if let Some(entry_code) = info.entry_code {
            self.start_temp_script_thread(entry_code, None, ScriptArgs::default());
        }
        true
    }

    /// Tears down the current scene and pops it. `thread_id` is the thread
    /// asking for the exit; it is spared.
    pub fn exit_scene(&mut self, thread_id: Option<ThreadId>) {
        debug_assert!(!self.active_scenes.is_empty(), "exit_scene on an empty scene stack");
        if self.active_scenes.is_empty() {
            log::error!("exit_scene on an empty scene stack");
            return;
        }
        let scene_id = self.active_scenes.current_scene();
        let update_functions = self.update_functions.terminate_by_scene(scene_id);
        let threads = self
            .thread_ops()
            .terminate_threads_by_scene_id(scene_id, thread_id);
        self.services.controls.destroy_controls_by_scene_id(scene_id);
        let triggers = self.triggers.remove_by_scene_id(scene_id);
        self.services.resources.unload_resources_by_scene_id(scene_id);
        log::debug!(
            "exit scene {scene_id:08X}: {threads} threads, {triggers} triggers, {update_functions} update functions"
        );
        match self.active_scenes.pop() {
            Ok(_) => self.events.push(format!("scene.exit {scene_id}")),
            Err(err) => log::error!("exit_scene: {err}"),
        }
    }

    pub fn enter_pause(&mut self, thread_id: Option<ThreadId>) {
        let scene_id = self.active_scenes.current_scene();
        self.services.camera.push_camera_mode();
        self.thread_ops()
            .suspend_threads_by_scene_id(scene_id, thread_id);
        self.services.controls.pause_controls_by_scene_id(scene_id);
        if let Err(err) = self.active_scenes.pause_active_scene() {
            log::warn!("enter_pause: {err}");
        }
        self.events.push(format!("scene.pause {scene_id}"));
    }

    pub fn leave_pause(&mut self, thread_id: Option<ThreadId>) {
        let scene_id = self.active_scenes.current_scene();
        self.services.controls.unpause_controls_by_scene_id(scene_id);
        self.thread_ops()
            .notify_threads_by_scene_id(scene_id, thread_id);
        self.services.camera.pop_camera_mode();
        if let Err(err) = self.active_scenes.unpause_active_scene() {
            log::warn!("leave_pause: {err}");
        }
        self.events.push(format!("scene.unpause {scene_id}"));
    }

    /// Exits scenes until `scene_id` is on top or the stack is empty, then
    /// resets the camera mode stack.
    pub fn dump_active_scenes(&mut self, scene_id: SceneId, thread_id: Option<ThreadId>) {
        let mut depth = self.active_scenes.len();
        while depth > 0 && self.active_scenes.current_scene() != scene_id {
            self.exit_scene(thread_id);
            depth -= 1;
            debug_assert_eq!(depth, self.active_scenes.len());
        }
        self.services.camera.clear_camera_mode_stack();
    }

    pub fn load_resource(&mut self, resource_id: u32, scene_id: SceneId, thread_id: Option<ThreadId>) {
        self.events
            .push(format!("resource.load {resource_id:08X} {scene_id}"));
        self.services
            .resources
            .load_resource(resource_id, scene_id, thread_id);
    }

    pub fn unload_resource(&mut self, resource_id: u32) {
        self.events
            .push(format!("resource.unload {resource_id:08X}"));
        self.services.resources.unload_resource_by_id(resource_id);
    }

    pub fn add_update_function(&mut self, priority: i32, scene_id: SceneId, callback: UpdateCallback) {
        self.update_functions.add(priority, scene_id, callback);
    }

    pub fn update_function_count(&self) -> usize {
        self.update_functions.len()
    }

    pub fn cause_is_declared(&self, scene_id: SceneId, verb_id: u32, object_id2: u32, object_id: u32) -> bool {
        let key = TriggerKey::new(scene_id, verb_id, object_id2, object_id);
        self.triggers.contains(&key) || self.resource.find_trigger_cause(&key).is_some()
    }

    /// Registers a native cause for the current scene. Returns true if it
    /// replaced an earlier declaration.
    pub fn cause_declare<C>(&mut self, verb_id: u32, object_id2: u32, object_id: u32, callback: C) -> bool
    where
        C: TriggerCallback + 'static,
    {
        let key = TriggerKey::new(self.current_scene(), verb_id, object_id2, object_id);
        self.events.push(format!("cause.declare {key}"));
        self.triggers.add(key, callback)
    }

    pub fn remove_cause(&mut self, key: &TriggerKey) -> bool {
        self.triggers.remove(key)
    }

    /// Fires a cause. A native callback wins and runs synchronously;
    /// otherwise a scripted cause is started as a temp thread and its id
    /// returned.
    pub fn cause_trigger(
        &mut self,
        scene_id: SceneId,
        verb_id: u32,
        object_id2: u32,
        object_id: u32,
        calling_thread: Option<ThreadId>,
    ) -> Option<ThreadId> {
        let key = TriggerKey::new(scene_id, verb_id, object_id2, object_id);
        if let Some(callback) = self.triggers.find(&key) {
            self.events.push(format!("cause.native {key}"));
            match callback.try_borrow_mut() {
                Ok(mut callback) => callback.run(self, &key, calling_thread),
                Err(_) => log::warn!("cause {key} re-entered its own callback; skipped"),
            }
            return None;
        }
        let code_offset = self.resource.find_trigger_cause(&key)?;
        self.events.push(format!("cause.script {key}"));
        let args = ScriptArgs {
            verb_id,
            object_id2,
            object_id,
        };
        self.start_temp_script_thread(code_offset, calling_thread, args)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            now: self.now(),
            engine_pause_ctr: self.pause_ctr,
            threads: self.threads.headers().cloned().collect(),
            active_scenes: self.active_scenes.iter().copied().collect(),
            trigger_keys: self.triggers.keys().copied().collect(),
            update_functions: self.update_functions.len(),
        }
    }
}
