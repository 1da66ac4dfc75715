//! The sandbox-side message loop.
//!
//! The coordinator talks to the worker with [`HostMessage`]s. A message may
//! carry, handled in this order:
//!
//! 1. a [`ConfigPatch`], merged into the current [`WorkerConfig`],
//! 2. the shared [`ChannelBuffer`] (the handshake),
//! 3. a control command; `init` runs `commandOptions.inlineScript`.
//!
//! Nothing that goes wrong while handling a message escapes `handle`: it is
//! logged and reported in the returned [`Dispatch`].

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::channel::{AccessorMessage, BlockingChannel, ChannelBuffer, CommandOptions, ControlMessage};
use crate::config::{ConfigPatch, WorkerConfig};
use crate::runner::capability::schema::CapabilitySchema;
use crate::runner::plugin::host::ConsoleSink;
use crate::runner::{SandboxError, SandboxRunner};

pub const COMMAND_INIT: &str = "init";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkerError {
    #[error("command '{0}' arrived without commandOptions")]
    MissingInitOptions(String),
    #[error("command '{0}' has no inlineScript to run")]
    MissingInlineScript(String),
    #[error("command '{0}' arrived before the channel buffer")]
    NotConnected(String),
}

#[derive(Debug, Clone, Default)]
pub struct HostMessage {
    pub channel_buffer: Option<Arc<ChannelBuffer>>,
    pub worker_config: Option<ConfigPatch>,
    pub control: Option<ControlMessage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    worker_config: Option<ConfigPatch>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    command_options: Option<CommandOptions>,
}

impl HostMessage {
    pub fn handshake(buffer: Arc<ChannelBuffer>) -> Self {
        HostMessage {
            channel_buffer: Some(buffer),
            ..HostMessage::default()
        }
    }

    pub fn configure(config: impl Into<ConfigPatch>) -> Self {
        HostMessage {
            worker_config: Some(config.into()),
            ..HostMessage::default()
        }
    }

    pub fn control(message: ControlMessage) -> Self {
        HostMessage {
            control: Some(message),
            ..HostMessage::default()
        }
    }

    /// `init` with an inline script.
    pub fn init(script: impl Into<String>) -> Self {
        HostMessage::control(ControlMessage {
            command: COMMAND_INIT.to_string(),
            command_options: Some(CommandOptions {
                inline_script: Some(script.into()),
            }),
        })
    }

    pub fn with_config(mut self, config: impl Into<ConfigPatch>) -> Self {
        self.worker_config = Some(config.into());
        self
    }

    /// The JSON parts of a message: `{"workerConfig": .., "command": ..,
    /// "commandOptions": ..}`. The buffer never travels as JSON.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Ok(HostMessage {
            channel_buffer: None,
            worker_config: envelope.worker_config,
            control: envelope.command.map(|command| ControlMessage {
                command,
                command_options: envelope.command_options,
            }),
        })
    }
}

/// What handling one message amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// No command in the message.
    Idle,
    /// Unknown command, logged and dropped.
    Ignored(String),
    /// `init` could not start.
    Skipped(WorkerError),
    /// `init` ran the script.
    Finished(Result<(), SandboxError>),
}

pub struct Worker {
    session: Uuid,
    outbox: Sender<AccessorMessage>,
    config: WorkerConfig,
    schema: CapabilitySchema,
    console: Option<ConsoleSink>,
    buffer: Option<Arc<ChannelBuffer>>,
    runner: Option<SandboxRunner>,
}

impl Worker {
    pub fn new(outbox: Sender<AccessorMessage>) -> Self {
        Worker {
            session: Uuid::new_v4(),
            outbox,
            config: WorkerConfig::default(),
            schema: CapabilitySchema::browser_default(),
            console: None,
            buffer: None,
            runner: None,
        }
    }

    pub fn with_schema(mut self, schema: CapabilitySchema) -> Self {
        self.schema = schema;
        self.rebuild_runner();
        self
    }

    pub fn with_console_sink(mut self, sink: ConsoleSink) -> Self {
        self.console = Some(sink);
        self.rebuild_runner();
        self
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.runner.is_some()
    }

    pub fn handle(&mut self, message: HostMessage) -> Dispatch {
        if let Some(patch) = message.worker_config {
            self.config.merge(&patch);
            if self.config.debug {
                debug!("[{}] configured: {:?}", self.session, self.config);
            }
            self.rebuild_runner();
        }
        if let Some(buffer) = message.channel_buffer {
            if self.config.debug {
                debug!("[{}] received channel buffer {:?}", self.session, buffer);
            }
            self.buffer = Some(buffer);
            self.rebuild_runner();
        }
        match message.control {
            Some(control) => self.dispatch(control),
            None => Dispatch::Idle,
        }
    }

    /// Handles messages until every sender is gone and returns what each
    /// command amounted to.
    pub fn run(mut self, inbox: Receiver<HostMessage>) -> Vec<Dispatch> {
        info!("[{}] worker started", self.session);
        let mut outcomes = vec![];
        for message in inbox.iter() {
            match self.handle(message) {
                Dispatch::Idle => {}
                outcome => outcomes.push(outcome),
            }
        }
        info!("[{}] worker stopped", self.session);
        outcomes
    }

    /// Runs a worker on its own thread. The worker holds single-threaded
    /// state, so it is built on that thread.
    pub fn spawn(
        outbox: Sender<AccessorMessage>,
        inbox: Receiver<HostMessage>,
        schema: CapabilitySchema,
    ) -> std::io::Result<thread::JoinHandle<Vec<Dispatch>>> {
        thread::Builder::new()
            .name("warden-sandbox".to_string())
            .spawn(move || Worker::new(outbox).with_schema(schema).run(inbox))
    }

    /// A new configuration or buffer starts a new channel, which also clears
    /// a poisoned one.
    fn rebuild_runner(&mut self) {
        let buffer = match &self.buffer {
            Some(buffer) => Arc::clone(buffer),
            None => return,
        };
        let channel = BlockingChannel::new(buffer, self.outbox.clone())
            .with_timeout(self.config.timeout())
            .with_debug(self.config.debug);
        let mut runner = SandboxRunner::new(channel)
            .with_schema(self.schema.clone())
            .with_classifier_mode(self.config.classifier);
        if let Some(sink) = &self.console {
            runner = runner.with_console_sink(ConsoleSink::clone(sink));
        }
        self.runner = Some(runner);
    }

    fn dispatch(&mut self, control: ControlMessage) -> Dispatch {
        if control.command != COMMAND_INIT {
            warn!("[{}] unknown command '{}' ignored", self.session, control.command);
            return Dispatch::Ignored(control.command);
        }
        match self.init(control) {
            Ok(result) => Dispatch::Finished(result),
            Err(e) => {
                warn!("[{}] {}", self.session, e);
                Dispatch::Skipped(e)
            }
        }
    }

    fn init(&self, control: ControlMessage) -> Result<Result<(), SandboxError>, WorkerError> {
        let options = control
            .command_options
            .ok_or_else(|| WorkerError::MissingInitOptions(control.command.clone()))?;
        let script = options
            .inline_script
            .ok_or_else(|| WorkerError::MissingInlineScript(control.command.clone()))?;
        let runner = self
            .runner
            .as_ref()
            .ok_or_else(|| WorkerError::NotConnected(control.command.clone()))?;

        if self.config.debug {
            debug!("[{}] running inline script ({} bytes)", self.session, script.len());
        }
        let result = runner.run(&script);
        match &result {
            Ok(()) => {
                if self.config.debug {
                    debug!("[{}] script finished", self.session);
                }
            }
            Err(e) => error!("[{}] {}", self.session, e),
        }
        Ok(result)
    }
}
