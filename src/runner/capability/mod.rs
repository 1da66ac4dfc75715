//! The interception layer between the script and the privileged graph.
//!
//! Reads on a [`VirtualNode`] either extend the path (navigational) or
//! resolve it through the blocking channel (terminal). Writes are always
//! terminal.

pub mod classifier;
pub mod node;
pub mod schema;

use std::rc::Rc;

use log::trace;

use crate::channel::{AccessRequest, AccessorPath, BlockingChannel};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::eval::trace::ExecutionTrace;

use self::classifier::{Classifier, Continuation};
use self::node::VirtualNode;
use self::schema::{CapabilitySchema, FreeVariable, Member};

pub struct CapabilityGraph {
    schema: CapabilitySchema,
    classifier: Box<dyn Classifier>,
    channel: Rc<BlockingChannel>,
}

impl CapabilityGraph {
    pub fn new(
        schema: CapabilitySchema,
        classifier: Box<dyn Classifier>,
        channel: Rc<BlockingChannel>,
    ) -> Self {
        CapabilityGraph {
            schema,
            classifier,
            channel,
        }
    }

    pub fn schema(&self) -> &CapabilitySchema {
        &self.schema
    }

    /// Node `this` is bound to.
    pub fn primary_root(&self) -> Option<VirtualNode> {
        self.schema
            .primary_root()
            .map(|root| VirtualNode::new(AccessorPath::root(root)))
    }

    /// Free variables as script values.
    pub fn bindings(&self) -> Vec<(String, JsValue)> {
        self.schema
            .free_variables()
            .into_iter()
            .map(|(name, binding)| {
                let value = match binding {
                    FreeVariable::Node(path) => JsValue::Node(VirtualNode::new(path)),
                    FreeVariable::Constant(value) => value,
                };
                (name, value)
            })
            .collect()
    }

    /// Reads `property` of `node`. Declared sub-objects and constants are
    /// answered locally; everything else goes through the classifier.
    pub fn get(
        &self,
        node: &VirtualNode,
        property: &str,
        trace: &ExecutionTrace,
    ) -> Result<JsValue, JErrorType> {
        match self.schema.member_at(node.path(), property) {
            Some(Member::Navigable(_)) => return Ok(JsValue::Node(node.child(property))),
            Some(Member::Constant(value)) => return Ok(value.clone()),
            _ => {}
        }
        match self.classifier.classify(node.path(), property, trace) {
            Continuation::Navigational => {
                trace!("navigating to {}.{}", node.path(), property);
                Ok(JsValue::Node(node.child(property)))
            }
            Continuation::Terminal => self.fetch(node, property),
        }
    }

    /// Reads `property` of `node` through the channel, skipping the
    /// classifier.
    pub fn fetch(&self, node: &VirtualNode, property: &str) -> Result<JsValue, JErrorType> {
        let reply = self
            .channel
            .send(AccessRequest::get(node.path().child(property)))?;
        Ok(JsValue::from(reply))
    }

    /// Writes `property` of `node` and returns what the coordinator echoed.
    pub fn set(
        &self,
        node: &VirtualNode,
        property: &str,
        value: &JsValue,
    ) -> Result<JsValue, JErrorType> {
        let json = value.to_json()?;
        let reply = self
            .channel
            .send(AccessRequest::set(node.path().child(property), json))?;
        Ok(JsValue::from(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::classifier::TerminalClassifier;
    use super::*;
    use crate::channel::{
        encode_reply, AccessKind, AccessorMessage, AccessorPath, ChannelBuffer, DecodedValue,
    };
    use crate::runner::ds::value::JsNumberType;
    use std::sync::Arc;
    use std::thread;

    fn graph_with_echo(
        schema: CapabilitySchema,
    ) -> (CapabilityGraph, thread::JoinHandle<Vec<AccessorMessage>>) {
        let buffer = Arc::new(ChannelBuffer::new(64).unwrap());
        let (tx, rx) = crossbeam_channel::unbounded::<AccessorMessage>();
        let writer = Arc::clone(&buffer);
        let coordinator = thread::spawn(move || {
            let mut seen = vec![];
            for message in rx.iter() {
                let reply = match message.accessor.kind {
                    AccessKind::Get => DecodedValue::String(message.accessor.path.to_string()),
                    AccessKind::Set => message
                        .accessor
                        .value
                        .as_ref()
                        .map(DecodedValue::from_json)
                        .unwrap_or(DecodedValue::Undefined),
                };
                writer.publish(&encode_reply(&reply)).unwrap();
                seen.push(message);
            }
            seen
        });
        let channel = Rc::new(BlockingChannel::new(buffer, tx));
        (
            CapabilityGraph::new(schema, Box::new(TerminalClassifier), channel),
            coordinator,
        )
    }

    #[test]
    fn test_declared_members_short_circuit() {
        let schema = CapabilitySchema::browser_default();
        let (graph, coordinator) = graph_with_echo(schema);
        let window = graph.primary_root().unwrap();
        let trace = ExecutionTrace::new();
        assert_eq!(
            graph.get(&window, "location", &trace).unwrap(),
            JsValue::Node(VirtualNode::new(AccessorPath::root("window.location")))
        );
        assert_eq!(
            graph.get(&window, "name", &trace).unwrap(),
            JsValue::String("window.name".into())
        );
        assert_eq!(
            graph
                .set(&window, "count", &JsValue::Number(JsNumberType::Integer(3)))
                .unwrap(),
            JsValue::Number(JsNumberType::Integer(3))
        );
        drop(graph);
        let seen = coordinator.join().unwrap();
        let paths: Vec<_> = seen.iter().map(|m| m.accessor.path.to_string()).collect();
        assert_eq!(paths, vec!["window.name", "window.count"]);
    }

    #[test]
    fn test_node_cannot_be_written_as_value() {
        let (graph, coordinator) = graph_with_echo(CapabilitySchema::browser_default());
        let window = graph.primary_root().unwrap();
        let value = JsValue::Node(window.clone());
        assert!(matches!(
            graph.set(&window, "self", &value),
            Err(JErrorType::TypeError(_))
        ));
        drop(graph);
        assert!(coordinator.join().unwrap().is_empty());
    }
}
