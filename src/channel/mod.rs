//! The blocking accessor channel.
//!
//! The sandbox posts an [`AccessorMessage`] for every terminal access and
//! then blocks on the [`ChannelBuffer`] until the coordinator has written a
//! typed reply and advanced the completion flag:
//!
//! ```text
//! sandbox                               coordinator
//!   | -- AccessorMessage (queue) -------->  |
//!   |    wait(flag == expected, 3000ms)     |  resolve path
//!   |                                       |  write [type, len, payload]
//!   | <-------------- flag += 1, notify --  |
//!   |  decode payload                       |
//! ```
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use warden::channel::{
//!     encode_reply, AccessRequest, AccessorPath, BlockingChannel, ChannelBuffer, DecodedValue,
//! };
//!
//! let buffer = Arc::new(ChannelBuffer::new(256).unwrap());
//! let (tx, rx) = crossbeam_channel::unbounded();
//! let writer = Arc::clone(&buffer);
//! thread::spawn(move || {
//!     for _message in rx.iter() {
//!         writer.publish(&encode_reply(&DecodedValue::Integer(42))).unwrap();
//!     }
//! });
//!
//! let channel = BlockingChannel::new(buffer, tx);
//! let reply = channel.send(AccessRequest::get(AccessorPath::root("window.answer"))).unwrap();
//! assert_eq!(reply, DecodedValue::Integer(42));
//! ```

pub mod blocking;
pub mod buffer;
pub mod codec;
pub mod message;

pub use blocking::{BlockingChannel, ChannelError, DEFAULT_TIMEOUT};
pub use buffer::{BufferError, ChannelBuffer, WaitOutcome, DEFAULT_BUFFER_SLOTS};
pub use codec::{decode_reply, encode_reply, ContentType, DecodedValue, EncodedReply};
pub use message::{
    AccessKind, AccessRequest, AccessorMessage, AccessorPath, CommandOptions, ControlMessage,
};
