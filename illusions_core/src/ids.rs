use std::fmt;

use serde::{Deserialize, Serialize};

/// Scene identifiers straight from the script resource. `0` is the "no scene"
/// sentinel returned by an empty active scene stack; threads tagged with it
/// are global and never matched by scene-scoped operations.
pub type SceneId = u32;

pub const NO_SCENE: SceneId = 0;

/// Every script thread id carries this prefix in its upper half.
pub const THREAD_ID_PREFIX: u32 = 0x0002_0000;

const THREAD_INDEX_MASK: u32 = 0x0000_FFFF;

/// Opaque handle for a cooperative thread. Consumers never own threads, they
/// only hold ids and resolve them through the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(u32);

impl ThreadId {
    /// Wraps a raw id read from bytecode. Zero means "no thread".
    pub fn from_raw(raw: u32) -> Option<Self> {
        (raw != 0).then_some(ThreadId(raw))
    }

    /// Permanent id of a script-defined thread.
    pub const fn script(index: u16) -> Self {
        ThreadId(THREAD_ID_PREFIX | index as u32)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn index(self) -> u32 {
        self.0 & THREAD_INDEX_MASK
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// Hands out ids for dynamically spawned ("temp") threads.
///
/// Script-defined threads own the low indices `0..2 * code_count`; temp ids
/// count upwards from there and wrap back to the first temp index once the
/// 16-bit index space is exhausted, so the two namespaces never overlap.
#[derive(Debug, Clone)]
pub struct TempIdAllocator {
    base: u32,
    next: u32,
}

impl TempIdAllocator {
    pub fn new(code_count: u32) -> Self {
        TempIdAllocator {
            base: code_count.saturating_mul(2).min(THREAD_INDEX_MASK),
            next: 0,
        }
    }

    /// First index handed out to temp threads.
    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn is_temp(&self, id: ThreadId) -> bool {
        id.raw() & !THREAD_INDEX_MASK == THREAD_ID_PREFIX && id.index() >= self.base
    }

    pub fn allocate(&mut self) -> ThreadId {
        let mut index = self.base + self.next;
        if index > THREAD_INDEX_MASK {
            self.next = 0;
            index = self.base;
        }
        self.next += 1;
        ThreadId(THREAD_ID_PREFIX | index)
    }
}
