extern crate warden;

use std::sync::Arc;
use std::thread;

use serde_json::Value as JsonValue;
use warden::channel::{AccessRequest, BlockingChannel, ChannelBuffer, DecodedValue};
use warden::coordinator::{AccessHandler, Coordinator, JsonDocument};
use warden::runner::SandboxRunner;

/// Coordinator handler that answers from a JSON document and keeps every
/// request it saw.
pub struct Recording {
    pub document: JsonDocument,
    pub requests: Vec<AccessRequest>,
}

impl Recording {
    pub fn paths(&self) -> Vec<String> {
        self.requests.iter().map(|r| r.path.to_string()).collect()
    }
}

impl AccessHandler for Recording {
    fn handle(&mut self, request: &AccessRequest) -> DecodedValue {
        self.requests.push(request.clone());
        self.document.handle(request)
    }
}

pub struct Session {
    pub runner: SandboxRunner,
    coordinator: thread::JoinHandle<Recording>,
}

impl Session {
    /// Drops the runner so the coordinator sees the queue close, and returns
    /// what it recorded.
    pub fn finish(self) -> Recording {
        drop(self.runner);
        self.coordinator.join().unwrap()
    }
}

pub fn session(document: JsonValue) -> Session {
    session_with(document, |runner| runner)
}

pub fn session_with<F>(document: JsonValue, configure: F) -> Session
where
    F: FnOnce(SandboxRunner) -> SandboxRunner,
{
    let buffer = Arc::new(ChannelBuffer::new(256).unwrap());
    let (tx, rx) = crossbeam_channel::unbounded();
    let recording = Recording {
        document: JsonDocument::new(document),
        requests: vec![],
    };
    let coordinator = Coordinator::new(Arc::clone(&buffer), recording)
        .spawn(rx)
        .unwrap();
    let runner = configure(SandboxRunner::new(BlockingChannel::new(buffer, tx)));
    Session {
        runner,
        coordinator,
    }
}
