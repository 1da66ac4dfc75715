//! Synchronous round trips on top of an asynchronous message queue.
//!
//! `send` posts the request, then parks the calling thread on the buffer's
//! completion flag. Only one request can be in flight: the caller is blocked
//! for the whole round trip, and re-entrant calls are refused.

use std::cell::Cell;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use log::{debug, warn};
use thiserror::Error;

use super::buffer::{BufferError, ChannelBuffer, WaitOutcome};
use super::codec::{decode_reply, ContentType, DecodeError, DecodedValue};
use super::message::{AccessRequest, AccessorMessage};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChannelError {
    #[error("content type unknown (tag {tag}) in reply to '{path}'")]
    UnknownContentType { path: String, tag: i32 },
    #[error("no reply to '{path}' within {waited:?}")]
    Timeout { path: String, waited: Duration },
    #[error("malformed {content_type:?} reply to '{path}': {reason}")]
    MalformedReply {
        path: String,
        content_type: ContentType,
        reason: String,
    },
    #[error("reply buffer for '{path}' is corrupt: {source}")]
    Buffer { path: String, source: BufferError },
    #[error("coordinator is gone, request for '{path}' was not delivered")]
    Disconnected { path: String },
    #[error("request for '{path}' issued while another request is awaiting its reply")]
    RequestInFlight { path: String },
    #[error("channel unusable after an earlier timeout, request for '{path}' refused")]
    Poisoned { path: String },
}

pub struct BlockingChannel {
    buffer: Arc<ChannelBuffer>,
    outbox: Sender<AccessorMessage>,
    timeout: Duration,
    debug: bool,
    expected_flag: Cell<i32>,
    next_id: Cell<u64>,
    in_flight: Cell<bool>,
    poisoned: Cell<bool>,
}

impl BlockingChannel {
    pub fn new(buffer: Arc<ChannelBuffer>, outbox: Sender<AccessorMessage>) -> Self {
        let expected_flag = buffer.flag();
        BlockingChannel {
            buffer,
            outbox,
            timeout: DEFAULT_TIMEOUT,
            debug: false,
            expected_flag: Cell::new(expected_flag),
            next_id: Cell::new(1),
            in_flight: Cell::new(false),
            poisoned: Cell::new(false),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Last flag value observed after a reply was consumed.
    pub fn expected_flag(&self) -> i32 {
        self.expected_flag.get()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.get()
    }

    pub fn send(&self, request: AccessRequest) -> Result<DecodedValue, ChannelError> {
        let path = request.path.to_string();
        if self.poisoned.get() {
            return Err(ChannelError::Poisoned { path });
        }
        if self.in_flight.replace(true) {
            return Err(ChannelError::RequestInFlight { path });
        }
        let result = self.round_trip(request, &path);
        self.in_flight.set(false);
        result
    }

    fn round_trip(&self, request: AccessRequest, path: &str) -> Result<DecodedValue, ChannelError> {
        // Captured before posting, so a reply racing ahead of the wait is
        // still seen as a flag change.
        let expected = self.buffer.flag();
        self.expected_flag.set(expected);

        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        if self.debug {
            debug!("accessor request #{} {:?} '{}'", id, request.kind, path);
        }
        let message = AccessorMessage {
            accessor_event: true,
            id,
            accessor: request,
        };
        self.outbox.send(message).map_err(|_| ChannelError::Disconnected {
            path: path.to_string(),
        })?;

        let started = Instant::now();
        if self.buffer.wait(expected, self.timeout) == WaitOutcome::TimedOut {
            // A late reply would land while the next request waits and be
            // mistaken for its answer.
            self.poisoned.set(true);
            warn!("accessor request #{} for '{}' timed out", id, path);
            return Err(ChannelError::Timeout {
                path: path.to_string(),
                waited: started.elapsed(),
            });
        }

        let snapshot = self.buffer.read_reply().map_err(|source| ChannelError::Buffer {
            path: path.to_string(),
            source,
        })?;
        self.expected_flag.set(snapshot.flag);
        if self.debug {
            debug!(
                "accessor reply #{} {:?} ({} slots) after {:?}",
                id,
                snapshot.content_type(),
                snapshot.payload.len(),
                started.elapsed()
            );
        }
        decode_reply(snapshot.tag, &snapshot.payload).map_err(|e| match e {
            DecodeError::UnknownContentType(tag) => ChannelError::UnknownContentType {
                path: path.to_string(),
                tag,
            },
            DecodeError::Malformed {
                content_type,
                reason,
            } => ChannelError::MalformedReply {
                path: path.to_string(),
                content_type,
                reason,
            },
        })
    }
}
