use crate::clock::{duration_elapsed, is_timer_expired};
use crate::context::ThreadContext;
use crate::services::{InputEvent, Services};
use crate::thread::ThreadStatus;

/// Waits for a fixed duration. Time spent paused or suspended does not count:
/// the elapsed part is taken off the remaining duration on pause and the end
/// time is rebuilt from what is left on resume.
#[derive(Debug, Clone)]
pub struct TimerThread {
    /// Time still to run as of `start_time`.
    duration: u32,
    start_time: u32,
    end_time: u32,
    elapsed: u32,
    abortable: bool,
}

impl TimerThread {
    pub fn new(duration: u32, now: u32, abortable: bool) -> Self {
        TimerThread {
            duration,
            start_time: now,
            end_time: now.wrapping_add(duration),
            elapsed: 0,
            abortable,
        }
    }

    pub fn end_time(&self) -> u32 {
        self.end_time
    }

    pub(crate) fn on_update(&mut self, ctx: &mut ThreadContext<'_>) -> ThreadStatus {
        if is_timer_expired(self.start_time, self.end_time, ctx.now())
            || (self.abortable && ctx.poll_input(InputEvent::Skip))
        {
            return ThreadStatus::Terminate;
        }
        ThreadStatus::Yield
    }

    pub(crate) fn on_suspend(&mut self, services: &Services) {
        self.elapsed = duration_elapsed(self.start_time, self.end_time, services.now());
    }

    pub(crate) fn on_notify(&mut self, services: &Services) {
        let now = services.now();
        self.duration = self.duration.saturating_sub(self.elapsed);
        self.start_time = now;
        self.end_time = now.wrapping_add(self.duration);
        self.elapsed = 0;
    }
}
