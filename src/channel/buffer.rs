//! The shared reply region.
//!
//! Layout: `[FLAG, CONTENT_TYPE, CONTENT_SIZE, CONTENT...]`. The coordinator
//! owns every slot except the flag expectation the sandbox tracks locally.
//! Slots are `AtomicI32`, and a mutex/condvar pair stands in for the
//! wait/notify primitive of a shared-memory futex.

use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use super::codec::{ContentType, EncodedReply};

pub const INDEX_SET_FLAG: usize = 0;
pub const INDEX_CONTENT_TYPE: usize = 1;
pub const INDEX_CONTENT_SIZE: usize = 2;
pub const INDEX_CONTENT_START: usize = 3;

pub const DEFAULT_BUFFER_SLOTS: usize = 4096;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("channel buffer needs at least {min} slots, got {requested}")]
    TooSmall { requested: usize, min: usize },
    #[error("payload of {size} slots exceeds buffer capacity of {capacity}")]
    PayloadOverflow { size: usize, capacity: usize },
}

/// Result of blocking on the completion flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The flag changed while we were waiting.
    Woken,
    /// The flag already differed from the expectation when the wait began.
    NotEqual,
    TimedOut,
}

/// A reply as read back out of the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplySnapshot {
    pub flag: i32,
    pub tag: i32,
    pub payload: Vec<i32>,
}

impl ReplySnapshot {
    pub fn content_type(&self) -> ContentType {
        ContentType::from_tag(self.tag)
    }
}

pub struct ChannelBuffer {
    slots: Box<[AtomicI32]>,
    signal: Mutex<()>,
    wake: Condvar,
}

impl ChannelBuffer {
    pub fn new(slot_count: usize) -> Result<Self, BufferError> {
        let min = INDEX_CONTENT_START + 1;
        if slot_count < min {
            return Err(BufferError::TooSmall {
                requested: slot_count,
                min,
            });
        }
        Ok(ChannelBuffer {
            slots: (0..slot_count).map(|_| AtomicI32::new(0)).collect(),
            signal: Mutex::new(()),
            wake: Condvar::new(),
        })
    }

    /// Slots available for payload after the header.
    pub fn payload_capacity(&self) -> usize {
        self.slots.len() - INDEX_CONTENT_START
    }

    pub fn flag(&self) -> i32 {
        self.slots[INDEX_SET_FLAG].load(Ordering::SeqCst)
    }

    pub fn load(&self, index: usize) -> Option<i32> {
        self.slots.get(index).map(|slot| slot.load(Ordering::SeqCst))
    }

    /// Blocks until the flag differs from `expected` or `timeout` elapses.
    pub fn wait(&self, expected: i32, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let mut guard = self.signal.lock();
        if self.flag() != expected {
            return WaitOutcome::NotEqual;
        }
        while self.flag() == expected {
            if self.wake.wait_until(&mut guard, deadline).timed_out() {
                return if self.flag() == expected {
                    WaitOutcome::TimedOut
                } else {
                    WaitOutcome::Woken
                };
            }
        }
        WaitOutcome::Woken
    }

    /// Reads the header and the declared payload. The declared length is
    /// checked against the capacity so a corrupt header cannot index past
    /// the end of the region.
    pub fn read_reply(&self) -> Result<ReplySnapshot, BufferError> {
        let flag = self.flag();
        let tag = self.slots[INDEX_CONTENT_TYPE].load(Ordering::SeqCst);
        let declared = self.slots[INDEX_CONTENT_SIZE].load(Ordering::SeqCst);
        let size = usize::try_from(declared).unwrap_or(usize::MAX);
        if size > self.payload_capacity() {
            return Err(BufferError::PayloadOverflow {
                size,
                capacity: self.payload_capacity(),
            });
        }
        let payload = self.slots[INDEX_CONTENT_START..INDEX_CONTENT_START + size]
            .iter()
            .map(|slot| slot.load(Ordering::SeqCst))
            .collect();
        Ok(ReplySnapshot {
            flag,
            tag,
            payload,
        })
    }

    /// Coordinator side: writes a reply, advances the flag and wakes the
    /// waiter. The flag moves under the signal lock so a waiter that has
    /// checked the flag but not yet parked cannot miss the notification.
    pub fn publish(&self, reply: &EncodedReply) -> Result<i32, BufferError> {
        if reply.payload.len() > self.payload_capacity() {
            return Err(BufferError::PayloadOverflow {
                size: reply.payload.len(),
                capacity: self.payload_capacity(),
            });
        }
        self.slots[INDEX_CONTENT_TYPE].store(reply.content_type.tag(), Ordering::SeqCst);
        // Bounded by payload_capacity, which is below i32::MAX for any real buffer.
        self.slots[INDEX_CONTENT_SIZE].store(reply.payload.len() as i32, Ordering::SeqCst);
        for (slot, value) in self.slots[INDEX_CONTENT_START..].iter().zip(&reply.payload) {
            slot.store(*value, Ordering::SeqCst);
        }
        let _guard = self.signal.lock();
        let flag = self.slots[INDEX_SET_FLAG].fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        self.wake.notify_all();
        Ok(flag)
    }
}

impl std::fmt::Debug for ChannelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelBuffer")
            .field("slots", &self.slots.len())
            .field("flag", &self.flag())
            .finish()
    }
}
