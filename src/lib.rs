//! # warden - synchronous accessor bridge for sandboxed scripts
//!
//! Runs untrusted scripts in isolation while letting them read and write a
//! privileged object graph they cannot reach directly:
//! - pest grammar and AST for a small script language
//! - tree-walking evaluator with lazily resolved super-globals
//! - capability graph of virtual nodes that only carry dotted paths
//! - a blocking request/reply channel over a shared slot buffer
//!
//! ## How an access travels
//!
//! ```text
//! script: var href = window.location.href;
//!
//! window            → node "window" (free variable)
//! .location         → declared sub-object, node "window.location"
//! .href             → next character is ';', terminal
//!                   → GET "window.location.href" posted to the coordinator
//!                   → sandbox blocks until the reply flag moves (≤ 3000 ms)
//!                   → reply decoded from the buffer into a script value
//! ```
//!
//! Whether an access is terminal is decided by a
//! [`Classifier`](runner::capability::classifier::Classifier): from the
//! declared [`CapabilitySchema`](runner::capability::schema::CapabilitySchema),
//! from the character following the property in the script text, or both.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use warden::channel::{BlockingChannel, ChannelBuffer};
//! use warden::coordinator::{Coordinator, JsonDocument};
//! use warden::runner::SandboxRunner;
//!
//! let buffer = Arc::new(ChannelBuffer::new(1024).unwrap());
//! let (tx, rx) = crossbeam_channel::unbounded();
//! let document = JsonDocument::new(json!({"window": {"location": {"href": "https://a.test/"}}}));
//! let coordinator = Coordinator::new(Arc::clone(&buffer), document).spawn(rx).unwrap();
//!
//! let runner = SandboxRunner::new(BlockingChannel::new(buffer, tx));
//! runner.run("document.title = 'visited ' + window.location.href").unwrap();
//! drop(runner);
//!
//! let document = coordinator.join().unwrap();
//! assert_eq!(document.root()["window"]["document"]["title"], "visited https://a.test/");
//! ```
//!
//! ## Architecture
//!
//! - **[`parser`]** - pest grammar and AST with call-site positions
//! - **[`runner`]** - the sandbox side
//!   - **[`runner::capability`]** - virtual nodes, schema, classifiers
//!   - **[`runner::eval`]** - statements, expressions, execution trace
//!   - **[`runner::plugin`]** - super-global scope and host resolvers
//!   - **[`runner::ds`]** - script values and errors
//! - **[`channel`]** - buffer layout, reply codec, blocking round trip
//! - **[`worker`]** - handshake, configuration and `init` handling
//! - **[`coordinator`]** - reference coordinator over a JSON document
//! - **[`config`]** - worker configuration

#[macro_use]
extern crate lazy_static;

pub mod channel;
pub mod config;
pub mod coordinator;
pub mod parser;
pub mod runner;
pub mod worker;
