//! Thread arena and the bulk operations the scene orchestrator issues.
//!
//! Slots are never removed while a pass is running; terminated threads are
//! reaped between passes so indices stay valid while a thread's body is
//! checked out for its update. Hooks aimed at a checked-out body are queued
//! and replayed when it is checked back in.

use std::collections::BTreeSet;

use crate::ids::{SceneId, ThreadId, NO_SCENE};
use crate::services::Services;
use crate::thread::{TalkStage, ThreadBody, ThreadHeader, ThreadMessage, ThreadType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hook {
    Suspend,
    Notify,
    Pause,
    Unpause,
    Resume,
    Terminated,
    Kill,
}

impl Hook {
    fn apply(self, body: &mut ThreadBody, services: &Services) {
        match self {
            Hook::Suspend => body.on_suspend(services),
            Hook::Notify => body.on_notify(services),
            Hook::Pause => body.on_pause(services),
            Hook::Unpause => body.on_unpause(services),
            Hook::Resume => body.on_resume(services),
            Hook::Terminated => body.on_terminated(services),
            Hook::Kill => body.on_kill(services),
        }
    }
}

#[derive(Debug)]
struct ThreadSlot {
    header: ThreadHeader,
    body: Option<ThreadBody>,
    deferred: Vec<Hook>,
}

#[derive(Debug, Default)]
pub struct ThreadList {
    slots: Vec<ThreadSlot>,
}

impl ThreadList {
    pub fn new() -> Self {
        ThreadList::default()
    }

    /// Number of threads that have not terminated yet.
    pub fn len(&self) -> usize {
        self.live().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live(&self) -> impl Iterator<Item = &ThreadSlot> {
        self.slots.iter().filter(|slot| !slot.header.terminated)
    }

    fn position(&self, id: ThreadId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.header.id == id && !slot.header.terminated)
    }

    pub fn header(&self, id: ThreadId) -> Option<&ThreadHeader> {
        self.position(id).map(|index| &self.slots[index].header)
    }

    pub fn is_live(&self, id: ThreadId) -> bool {
        self.position(id).is_some()
    }

    pub fn thread_ids(&self) -> Vec<ThreadId> {
        self.live().map(|slot| slot.header.id).collect()
    }

    pub fn headers(&self) -> impl Iterator<Item = &ThreadHeader> {
        self.live().map(|slot| &slot.header)
    }

    /// Stage of a talk thread; `None` for other kinds or while it is running.
    pub fn talk_stage(&self, id: ThreadId) -> Option<TalkStage> {
        let slot = &self.slots[self.position(id)?];
        match slot.body.as_ref()? {
            ThreadBody::Talk(talk) => Some(talk.stage()),
            _ => None,
        }
    }

    pub fn thread_scene_id(&self, id: ThreadId) -> Option<SceneId> {
        self.header(id).map(|header| header.scene_id)
    }

    pub fn set_thread_scene_id(&mut self, id: ThreadId, scene_id: SceneId) -> bool {
        match self.position(id) {
            Some(index) => {
                self.slots[index].header.scene_id = scene_id;
                true
            }
            None => false,
        }
    }

    pub fn set_notify_flags(&mut self, id: ThreadId, notify_flags: u32) -> bool {
        match self.position(id) {
            Some(index) => {
                self.slots[index].header.notify_flags = notify_flags;
                true
            }
            None => false,
        }
    }

    pub(crate) fn push(&mut self, header: ThreadHeader, body: ThreadBody) -> usize {
        self.slots.push(ThreadSlot {
            header,
            body: Some(body),
            deferred: Vec::new(),
        });
        self.slots.len() - 1
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn header_at(&self, index: usize) -> &ThreadHeader {
        &self.slots[index].header
    }

    pub(crate) fn is_runnable_at(&self, index: usize) -> bool {
        let slot = &self.slots[index];
        !slot.header.terminated && !slot.header.is_paused() && slot.body.is_some()
    }

    /// Detaches the body for its update. `None` if it is already out.
    pub(crate) fn checkout(&mut self, index: usize) -> Option<ThreadBody> {
        self.slots.get_mut(index).and_then(|slot| slot.body.take())
    }

    /// Drops terminated slots. Only valid between passes.
    pub(crate) fn reap(&mut self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|slot| !slot.header.terminated);
        before - self.slots.len()
    }
}

/// Couples thread state transitions with the collaborators their hooks talk
/// to and the engine event log.
pub(crate) struct ThreadListAdapter<'a> {
    list: &'a mut ThreadList,
    services: &'a Services,
    events: &'a mut Vec<String>,
}

impl<'a> ThreadListAdapter<'a> {
    pub(crate) fn new(
        list: &'a mut ThreadList,
        services: &'a Services,
        events: &'a mut Vec<String>,
    ) -> Self {
        ThreadListAdapter {
            list,
            services,
            events,
        }
    }

    pub(crate) fn start_thread(&mut self, header: ThreadHeader, body: ThreadBody) -> usize {
        self.events
            .push(format!("thread.start {} {}", header.id, header.kind));
        log::debug!(
            "start {} thread {} (caller {:?}, scene {:08X})",
            header.kind,
            header.id,
            header.calling_thread_id,
            header.scene_id
        );
        self.list.push(header, body)
    }

    pub(crate) fn checkin(&mut self, index: usize, mut body: ThreadBody) {
        let slot = &mut self.list.slots[index];
        for hook in slot.deferred.drain(..) {
            hook.apply(&mut body, self.services);
        }
        slot.body = Some(body);
    }

    fn fire(&mut self, index: usize, hook: Hook) {
        let slot = &mut self.list.slots[index];
        match slot.body.as_mut() {
            Some(body) => hook.apply(body, self.services),
            None => slot.deferred.push(hook),
        }
    }

    fn header_mut(&mut self, index: usize) -> &mut ThreadHeader {
        &mut self.list.slots[index].header
    }

    pub(crate) fn pause_at(&mut self, index: usize) {
        let header = self.header_mut(index);
        if header.terminated {
            return;
        }
        header.pause_ctr += 1;
        if header.pause_ctr == 1 {
            self.fire(index, Hook::Pause);
        }
    }

    pub(crate) fn unpause_at(&mut self, index: usize) {
        let header = self.header_mut(index);
        if header.terminated {
            return;
        }
        header.pause_ctr -= 1;
        if header.pause_ctr == 0 {
            self.fire(index, Hook::Unpause);
        }
    }

    pub(crate) fn suspend_at(&mut self, index: usize) {
        let header = self.header_mut(index);
        if header.terminated {
            return;
        }
        header.pause_ctr += 1;
        if header.pause_ctr == 1 {
            self.fire(index, Hook::Suspend);
        }
    }

    pub(crate) fn resume_at(&mut self, index: usize) {
        let header = self.header_mut(index);
        if header.terminated {
            return;
        }
        header.pause_ctr -= 1;
        if header.pause_ctr == 0 {
            self.fire(index, Hook::Resume);
        }
    }

    pub(crate) fn notify_at(&mut self, index: usize) {
        let header = self.header_mut(index);
        if header.terminated {
            return;
        }
        header.pause_ctr -= 1;
        if header.pause_ctr == 0 {
            self.fire(index, Hook::Notify);
        }
    }

    /// Marks the thread terminated, wakes its caller unless the notify
    /// flags say otherwise, then runs the termination hook.
    pub(crate) fn terminate_at(&mut self, index: usize) {
        let header = self.header_mut(index);
        if header.terminated {
            return;
        }
        header.terminated = true;
        let id = header.id;
        let caller = header.calling_thread_id.take();
        let notify = header.notifies_caller();
        self.events.push(format!("thread.terminate {id}"));
        if let (Some(caller), true) = (caller, notify) {
            self.notify_id(caller);
        }
        self.fire(index, Hook::Terminated);
    }

    fn terminate_silently_at(&mut self, index: usize) {
        self.header_mut(index).calling_thread_id = None;
        self.terminate_at(index);
    }

    pub(crate) fn notify_id(&mut self, id: ThreadId) {
        if let Some(index) = self.list.position(id) {
            self.events.push(format!("thread.notify {id}"));
            self.notify_at(index);
        }
    }

    pub(crate) fn suspend_id(&mut self, id: ThreadId) {
        if let Some(index) = self.list.position(id) {
            self.suspend_at(index);
        }
    }

    pub(crate) fn terminate_thread(&mut self, id: ThreadId) {
        if let Some(index) = self.list.position(id) {
            self.terminate_at(index);
        }
    }

    /// Kills `id` and, before it, every thread it is waiting on.
    pub(crate) fn kill_thread(&mut self, id: ThreadId) {
        let mut visited = BTreeSet::new();
        self.kill_recursive(id, &mut visited);
    }

    fn kill_recursive(&mut self, id: ThreadId, visited: &mut BTreeSet<ThreadId>) {
        if !visited.insert(id) {
            return;
        }
        let Some(index) = self.list.position(id) else {
            return;
        };
        let children: Vec<ThreadId> = self
            .list
            .live()
            .filter(|slot| slot.header.calling_thread_id == Some(id))
            .map(|slot| slot.header.id)
            .collect();
        for child in children {
            self.kill_recursive(child, visited);
        }
        self.events.push(format!("thread.kill {id}"));
        self.fire(index, Hook::Kill);
        if self.list.slots[index].header.kind == ThreadType::Talk {
            self.terminate_silently_at(index);
        } else {
            self.terminate_at(index);
        }
    }

    /// Terminates `id` and every thread up its chain of callers, none of
    /// them notified.
    pub(crate) fn terminate_thread_chain(&mut self, id: ThreadId) {
        let mut visited = BTreeSet::new();
        let mut next = Some(id);
        while let Some(id) = next {
            if !visited.insert(id) {
                log::warn!("caller chain loops back to thread {id}");
                break;
            }
            let Some(index) = self.list.position(id) else {
                break;
            };
            next = self.list.slots[index].header.calling_thread_id;
            self.terminate_silently_at(index);
        }
    }

    pub(crate) fn send_message(&mut self, id: ThreadId, message: ThreadMessage) -> u32 {
        let Some(index) = self.list.position(id) else {
            return 0;
        };
        self.list.slots[index]
            .body
            .as_mut()
            .map_or(0, |body| body.send_message(message))
    }

    /// True if any running thread answers `message` with a non-zero value.
    pub(crate) fn is_active_thread(&mut self, message: ThreadMessage) -> bool {
        self.list.slots.iter_mut().any(|slot| {
            !slot.header.terminated
                && !slot.header.is_paused()
                && slot
                    .body
                    .as_mut()
                    .is_some_and(|body| body.send_message(message) != 0)
        })
    }

    fn matching(&self, keep: impl Fn(&ThreadHeader) -> bool) -> Vec<usize> {
        self.list
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.header.terminated && keep(&slot.header))
            .map(|(index, _)| index)
            .collect()
    }

    fn in_scene(scene_id: SceneId, except: Option<ThreadId>) -> impl Fn(&ThreadHeader) -> bool {
        move |header| {
            scene_id != NO_SCENE && header.scene_id == scene_id && Some(header.id) != except
        }
    }

    fn all_but(except: Option<ThreadId>) -> impl Fn(&ThreadHeader) -> bool {
        move |header| Some(header.id) != except
    }

    pub(crate) fn terminate_threads_by_scene_id(
        &mut self,
        scene_id: SceneId,
        except: Option<ThreadId>,
    ) -> usize {
        let targets = self.matching(Self::in_scene(scene_id, except));
        for &index in &targets {
            self.terminate_at(index);
        }
        targets.len()
    }

    pub(crate) fn suspend_threads_by_scene_id(&mut self, scene_id: SceneId, except: Option<ThreadId>) {
        for index in self.matching(Self::in_scene(scene_id, except)) {
            self.suspend_at(index);
        }
    }

    pub(crate) fn notify_threads_by_scene_id(&mut self, scene_id: SceneId, except: Option<ThreadId>) {
        for index in self.matching(Self::in_scene(scene_id, except)) {
            self.notify_at(index);
        }
    }

    pub(crate) fn pause_threads(&mut self, except: Option<ThreadId>) {
        for index in self.matching(Self::all_but(except)) {
            self.pause_at(index);
        }
    }

    pub(crate) fn unpause_threads(&mut self, except: Option<ThreadId>) {
        for index in self.matching(Self::all_but(except)) {
            self.unpause_at(index);
        }
    }

    pub(crate) fn suspend_threads(&mut self, except: Option<ThreadId>) {
        for index in self.matching(Self::all_but(except)) {
            self.suspend_at(index);
        }
    }

    pub(crate) fn resume_threads(&mut self, except: Option<ThreadId>) {
        for index in self.matching(Self::all_but(except)) {
            self.resume_at(index);
        }
    }

    pub(crate) fn terminate_threads(&mut self, except: Option<ThreadId>) {
        for index in self.matching(Self::all_but(except)) {
            self.terminate_at(index);
        }
    }

    /// Terminates running threads that belong to an active scene. Global
    /// threads and paused threads are left alone.
    pub(crate) fn terminate_active_threads(
        &mut self,
        except: Option<ThreadId>,
        is_scene_active: impl Fn(SceneId) -> bool,
    ) {
        let targets = self.matching(|header| {
            Some(header.id) != except
                && !header.is_paused()
                && header.scene_id != NO_SCENE
                && is_scene_active(header.scene_id)
        });
        for index in targets {
            self.terminate_at(index);
        }
    }

    pub(crate) fn end_talk_threads(&mut self) {
        for index in self.matching(|header| header.kind == ThreadType::Talk) {
            self.terminate_at(index);
        }
    }

    pub(crate) fn end_talk_threads_no_notify(&mut self) {
        for index in self.matching(|header| header.kind == ThreadType::Talk) {
            self.terminate_silently_at(index);
        }
    }

    pub(crate) fn notify_timer_threads(&mut self, except: Option<ThreadId>) {
        let targets =
            self.matching(|header| header.kind == ThreadType::Timer && Some(header.id) != except);
        for index in targets {
            self.notify_at(index);
        }
    }

    pub(crate) fn suspend_timer_threads(&mut self, except: Option<ThreadId>) {
        let targets =
            self.matching(|header| header.kind == ThreadType::Timer && Some(header.id) != except);
        for index in targets {
            self.suspend_at(index);
        }
    }
}
