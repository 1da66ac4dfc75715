//! An in-process coordinator.
//!
//! Receives accessor messages from the sandbox, resolves them with an
//! [`AccessHandler`] and writes each reply into the shared buffer. It is the
//! counterpart the CLI and the tests run against; a real host would put its
//! own privileged graph behind the same protocol.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;
use log::{debug, error};
use serde_json::{json, Map, Value as JsonValue};

use crate::channel::{
    encode_reply, AccessKind, AccessRequest, AccessorMessage, AccessorPath, ChannelBuffer,
    ContentType, DecodedValue, EncodedReply,
};

pub trait AccessHandler {
    fn handle(&mut self, request: &AccessRequest) -> DecodedValue;
}

impl<F> AccessHandler for F
where
    F: FnMut(&AccessRequest) -> DecodedValue,
{
    fn handle(&mut self, request: &AccessRequest) -> DecodedValue {
        self(request)
    }
}

/// Privileged graph backed by a JSON document. Paths start at the document
/// root, so `window.location.href` is `doc["window"]["location"]["href"]`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonDocument {
    root: JsonValue,
}

impl JsonDocument {
    pub fn new(root: JsonValue) -> Self {
        JsonDocument { root }
    }

    pub fn browser_default() -> Self {
        JsonDocument::new(json!({
            "window": {
                "location": {"href": "about:blank"},
                "document": {"title": ""}
            }
        }))
    }

    pub fn root(&self) -> &JsonValue {
        &self.root
    }

    pub fn into_inner(self) -> JsonValue {
        self.root
    }

    /// Value at `path`. Arrays and strings also answer `length`, arrays
    /// answer numeric indexes.
    pub fn lookup(&self, path: &AccessorPath) -> Option<JsonValue> {
        let mut current = &self.root;
        let mut segments = path.segments().peekable();
        while let Some(segment) = segments.next() {
            current = match current {
                JsonValue::Object(map) => map.get(segment)?,
                JsonValue::Array(items) if segment == "length" && segments.peek().is_none() => {
                    return Some(JsonValue::from(items.len()))
                }
                JsonValue::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                JsonValue::String(s) if segment == "length" && segments.peek().is_none() => {
                    return Some(JsonValue::from(s.encode_utf16().count()))
                }
                _ => return None,
            };
        }
        Some(current.clone())
    }

    /// Stores `value` at `path`, creating objects along the way. `None`
    /// removes the member. An array index may name an existing element or
    /// the slot right after the last one. Returns whether anything was
    /// written.
    pub fn assign(&mut self, path: &AccessorPath, value: Option<JsonValue>) -> bool {
        let segments: Vec<&str> = path.segments().collect();
        let (last, parents) = match segments.split_last() {
            Some(split) => split,
            None => return false,
        };
        let mut current = &mut self.root;
        for segment in parents {
            current = match child_slot(current, segment) {
                Some(next) => next,
                None => return false,
            };
        }
        if !current.is_object() && !current.is_array() {
            *current = JsonValue::Object(Map::new());
        }
        match (current, value) {
            (JsonValue::Object(map), Some(value)) => {
                map.insert(last.to_string(), value);
                true
            }
            (JsonValue::Object(map), None) => map.remove(*last).is_some(),
            // Arrays grow by at most one element per write.
            (JsonValue::Array(items), value) => {
                let value = value.unwrap_or(JsonValue::Null);
                match last.parse::<usize>() {
                    Ok(index) if index < items.len() => {
                        items[index] = value;
                        true
                    }
                    Ok(index) if index == items.len() => {
                        items.push(value);
                        true
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

/// Member `segment` of `value`, turning scalars and missing members into
/// empty objects.
fn child_slot<'a>(value: &'a mut JsonValue, segment: &str) -> Option<&'a mut JsonValue> {
    if !value.is_object() && !value.is_array() {
        *value = JsonValue::Object(Map::new());
    }
    match value {
        JsonValue::Object(map) => Some(
            map.entry(segment.to_string())
                .or_insert_with(|| JsonValue::Object(Map::new())),
        ),
        JsonValue::Array(items) => items.get_mut(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

impl AccessHandler for JsonDocument {
    fn handle(&mut self, request: &AccessRequest) -> DecodedValue {
        match request.kind {
            AccessKind::Get => self
                .lookup(&request.path)
                .map(|v| DecodedValue::from_json(&v))
                .unwrap_or(DecodedValue::Undefined),
            AccessKind::Set => {
                if !self.assign(&request.path, request.value.clone()) {
                    debug!("cannot write '{}' into the document", request.path);
                }
                request
                    .value
                    .as_ref()
                    .map(DecodedValue::from_json)
                    .unwrap_or(DecodedValue::Undefined)
            }
        }
    }
}

pub struct Coordinator<H> {
    buffer: Arc<ChannelBuffer>,
    handler: H,
}

impl<H: AccessHandler> Coordinator<H> {
    pub fn new(buffer: Arc<ChannelBuffer>, handler: H) -> Self {
        Coordinator { buffer, handler }
    }

    /// Answers messages until the sandbox drops its sender, then hands the
    /// handler back.
    pub fn serve(mut self, inbox: Receiver<AccessorMessage>) -> H {
        for message in inbox.iter() {
            self.reply(&message);
        }
        self.handler
    }

    pub fn reply(&mut self, message: &AccessorMessage) {
        debug!(
            "request #{} {:?} '{}'",
            message.id, message.accessor.kind, message.accessor.path
        );
        let value = self.handler.handle(&message.accessor);
        if let Err(e) = self.buffer.publish(&encode_reply(&value)) {
            error!("reply to request #{} dropped: {}", message.id, e);
            // Still wake the sandbox, with a reply it rejects.
            if let Err(e) = self.buffer.publish(&EncodedReply::empty(ContentType::Unknown)) {
                error!("cannot signal request #{}: {}", message.id, e);
            }
        }
    }
}

impl<H: AccessHandler + Send + 'static> Coordinator<H> {
    pub fn spawn(self, inbox: Receiver<AccessorMessage>) -> std::io::Result<thread::JoinHandle<H>> {
        thread::Builder::new()
            .name("warden-coordinator".to_string())
            .spawn(move || self.serve(inbox))
    }
}
