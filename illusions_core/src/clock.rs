use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic millisecond clock. Values wrap around like a 32-bit
/// tick counter, so all comparisons go through the helpers below.
pub trait Clock {
    fn now(&self) -> u32;
}

/// True once `now` has moved past `end`, measured relative to `start` so the
/// check survives counter wraparound.
pub fn is_timer_expired(start: u32, end: u32, now: u32) -> bool {
    now.wrapping_sub(start) >= end.wrapping_sub(start)
}

/// Time already spent between `start` and `end`, clamped to the duration.
pub fn duration_elapsed(start: u32, end: u32, now: u32) -> u32 {
    now.wrapping_sub(start).min(end.wrapping_sub(start))
}

/// Clock driven by hand. Used by the scenario runner and by tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u32>>,
}

impl ManualClock {
    pub fn new(start: u32) -> Self {
        ManualClock {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance(&self, millis: u32) {
        self.now.set(self.now.get().wrapping_add(millis));
    }

    pub fn set(&self, millis: u32) {
        self.now.set(millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u32 {
        self.now.get()
    }
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u32 {
        // Truncation is the wraparound the helpers above expect.
        self.origin.elapsed().as_millis() as u32
    }
}
