use std::collections::VecDeque;

use serde::Serialize;

use crate::clock::{duration_elapsed, is_timer_expired};
use crate::config::TalkTiming;
use crate::context::ThreadContext;
use crate::services::{InputEvent, Services};
use crate::thread::{ThreadMessage, ThreadStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TalkRequest {
    /// Speaking actor; `0` for narration, which cannot be skipped.
    pub object_id: u32,
    pub talk_id: u32,
    /// Talking animation played while the line is up.
    pub sequence_id1: u32,
    /// Idle sequence restored afterwards.
    pub sequence_id2: u32,
    /// Fixed time per page in ms; `0` derives it from the text length.
    pub duration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TalkStage {
    WaitForOtherTalk,
    Prepare,
    WaitForVoiceCue,
    Display,
    Speaking,
    Cleanup,
}

/// One line of dialogue: text pages, optional voice and the speaker's talk
/// animation. Stage changes that can proceed in the same tick return `Run`.
#[derive(Debug)]
pub struct TalkThread {
    request: TalkRequest,
    timing: TalkTiming,
    stage: TalkStage,
    pages: VecDeque<String>,
    current_page: Option<String>,
    voice: Option<String>,
    text_start: u32,
    text_end: u32,
    text_elapsed: u32,
    actor_done: bool,
    voice_done: bool,
    text_done: bool,
}

impl TalkThread {
    pub fn new(request: TalkRequest, timing: TalkTiming) -> Self {
        TalkThread {
            request,
            timing,
            stage: TalkStage::WaitForOtherTalk,
            pages: VecDeque::new(),
            current_page: None,
            voice: None,
            text_start: 0,
            text_end: 0,
            text_elapsed: 0,
            actor_done: false,
            voice_done: false,
            text_done: false,
        }
    }

    pub fn stage(&self) -> TalkStage {
        self.stage
    }

    fn is_displaying(&self) -> bool {
        matches!(self.stage, TalkStage::Display | TalkStage::Speaking)
    }

    fn is_finished(&self) -> bool {
        self.actor_done && self.voice_done && self.text_done
    }

    pub(crate) fn on_update(&mut self, ctx: &mut ThreadContext<'_>) -> ThreadStatus {
        match self.stage {
            TalkStage::WaitForOtherTalk => {
                if ctx.is_talk_thread_active() {
                    return ThreadStatus::Yield;
                }
                self.stage = TalkStage::Prepare;
                ThreadStatus::Run
            }
            TalkStage::Prepare => {
                match ctx.talk_entry(self.request.talk_id) {
                    Some(entry) => {
                        self.pages = entry.lines.into_iter().collect();
                        self.voice = entry.voice;
                    }
                    None => log::warn!(
                        "talk entry {:08X} missing; thread {} says nothing",
                        self.request.talk_id,
                        ctx.thread_id()
                    ),
                }
                self.voice_done = self.voice.is_none();
                self.text_done = self.pages.is_empty();
                if let Some(voice) = self.voice.as_deref() {
                    ctx.services().presenter.cue_voice(voice);
                }
                self.stage = TalkStage::WaitForVoiceCue;
                ThreadStatus::Run
            }
            TalkStage::WaitForVoiceCue => {
                if !self.voice_done && !ctx.services().presenter.is_voice_cued() {
                    return ThreadStatus::Yield;
                }
                self.stage = TalkStage::Display;
                ThreadStatus::Run
            }
            TalkStage::Display => {
                let now = ctx.now();
                let thread_id = ctx.thread_id();
                let services = ctx.services();
                if !self.text_done {
                    self.show_next_page(services, now);
                }
                if self.request.sequence_id1 != 0 {
                    services.controls.start_talk_actor(
                        self.request.object_id,
                        self.request.sequence_id1,
                        thread_id,
                    );
                }
                if !self.voice_done {
                    services.presenter.start_voice();
                }
                services.input.discard_event(InputEvent::Skip);
                self.stage = TalkStage::Speaking;
                ThreadStatus::Yield
            }
            TalkStage::Speaking => {
                let now = ctx.now();
                let services = ctx.services();
                if !self.voice_done && !services.presenter.is_voice_playing() {
                    self.voice_done = true;
                }
                if !self.text_done && is_timer_expired(self.text_start, self.text_end, now) {
                    self.next_page(services, now);
                }
                if self.voice_done && self.text_done {
                    self.finish_actor(services);
                }
                if self.request.object_id != 0
                    && !self.is_finished()
                    && services.input.poll_event(InputEvent::Skip)
                {
                    self.skip(services, now);
                }
                if self.is_finished() {
                    services.input.discard_event(InputEvent::Skip);
                    self.stage = TalkStage::Cleanup;
                    return ThreadStatus::Run;
                }
                ThreadStatus::Yield
            }
            TalkStage::Cleanup => ThreadStatus::Terminate,
        }
    }

    fn show_next_page(&mut self, services: &Services, now: u32) {
        match self.pages.pop_front() {
            Some(page) => {
                let duration = if self.request.duration > 0 {
                    self.request.duration
                } else {
                    self.timing.line_duration(&page)
                };
                services.presenter.show_text(self.request.object_id, &page);
                self.text_start = now;
                self.text_end = now.wrapping_add(duration);
                self.current_page = Some(page);
            }
            None => self.text_done = true,
        }
    }

    fn next_page(&mut self, services: &Services, now: u32) {
        if self.current_page.take().is_some() {
            services.presenter.remove_text();
        }
        if self.pages.is_empty() {
            self.text_done = true;
        } else {
            self.show_next_page(services, now);
            services.input.discard_event(InputEvent::Skip);
        }
    }

    // A skip flips one page; on the last page it also cuts the voice.
    fn skip(&mut self, services: &Services, now: u32) {
        if !self.text_done {
            self.next_page(services, now);
        }
        if self.text_done {
            if !self.voice_done {
                services.presenter.stop_voice();
                self.voice_done = true;
            }
            self.finish_actor(services);
        }
    }

    fn finish_actor(&mut self, services: &Services) {
        if self.actor_done {
            return;
        }
        if self.request.sequence_id2 != 0 {
            services
                .controls
                .start_sequence_actor(self.request.object_id, self.request.sequence_id2);
        }
        if self.request.sequence_id1 != 0 {
            services.controls.clear_notify_thread_id(self.request.object_id);
        }
        self.actor_done = true;
    }

    pub(crate) fn on_suspend(&mut self, services: &Services) {
        if !self.is_displaying() {
            return;
        }
        if !self.voice_done {
            services.presenter.stop_voice();
            self.voice_done = true;
        }
        if self.current_page.is_some() {
            self.text_elapsed = duration_elapsed(self.text_start, self.text_end, services.now());
            services.presenter.remove_text();
        }
    }

    pub(crate) fn on_resume(&mut self, services: &Services) {
        if !self.is_displaying() {
            return;
        }
        if let Some(page) = self.current_page.as_deref() {
            let now = services.now();
            let duration = self.text_end.wrapping_sub(self.text_start);
            services.presenter.show_text(self.request.object_id, page);
            self.text_start = now;
            self.text_end = now.wrapping_add(duration.saturating_sub(self.text_elapsed));
            self.text_elapsed = 0;
        }
    }

    pub(crate) fn on_terminated(&mut self, services: &Services) {
        // A voice is cued from Prepare onwards, before anything is shown.
        let voice_cued = !matches!(
            self.stage,
            TalkStage::WaitForOtherTalk | TalkStage::Prepare
        );
        if voice_cued && !self.voice_done {
            services.presenter.stop_voice();
            self.voice_done = true;
        }
        if !self.is_displaying() {
            return;
        }
        if self.current_page.take().is_some() {
            services.presenter.remove_text();
        }
        self.text_done = true;
        self.finish_actor(services);
    }

    pub(crate) fn on_kill(&mut self, services: &Services) {
        if self.request.sequence_id1 != 0 {
            services.controls.clear_notify_thread_id(self.request.object_id);
        }
        self.send_message(ThreadMessage::ClearSequenceId1);
        self.send_message(ThreadMessage::ClearSequenceId2);
    }

    pub(crate) fn send_message(&mut self, message: ThreadMessage) -> u32 {
        match message {
            ThreadMessage::QueryTalkThreadActive => u32::from(!matches!(
                self.stage,
                TalkStage::WaitForOtherTalk | TalkStage::Prepare
            )),
            ThreadMessage::ClearSequenceId1 => {
                self.request.sequence_id1 = 0;
                self.actor_done = true;
                0
            }
            ThreadMessage::ClearSequenceId2 => {
                self.request.sequence_id2 = 0;
                0
            }
        }
    }
}
