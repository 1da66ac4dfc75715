//! Static description of the capability graph.
//!
//! The top level of a [`CapabilitySchema`] lists the roots. Each root
//! declares the members the sandbox knows about ahead of time:
//!
//! - navigable members lead to another node and carry their own schema,
//! - terminal members always resolve through a round trip,
//! - constants are answered locally without asking the coordinator.
//!
//! Members that are not declared are left to the lookahead classifier.

use crate::channel::AccessorPath;
use crate::runner::ds::value::JsValue;

pub const ROOT_WINDOW: &str = "window";
pub const MEMBER_LOCATION: &str = "location";
pub const MEMBER_DOCUMENT: &str = "document";

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Navigable(CapabilitySchema),
    Terminal,
    Constant(JsValue),
}

/// Members in declaration order. Re-declaring a name replaces the earlier
/// entry in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilitySchema {
    members: Vec<(String, Member)>,
}

impl CapabilitySchema {
    pub fn new() -> Self {
        CapabilitySchema { members: vec![] }
    }

    /// `window` with `location` and `document` as known sub-objects.
    pub fn browser_default() -> Self {
        CapabilitySchema::new().navigable(
            ROOT_WINDOW,
            CapabilitySchema::new()
                .navigable(MEMBER_LOCATION, CapabilitySchema::new())
                .navigable(MEMBER_DOCUMENT, CapabilitySchema::new()),
        )
    }

    pub fn navigable(self, name: impl Into<String>, schema: CapabilitySchema) -> Self {
        self.with_member(name.into(), Member::Navigable(schema))
    }

    pub fn terminal(self, name: impl Into<String>) -> Self {
        self.with_member(name.into(), Member::Terminal)
    }

    pub fn constant(self, name: impl Into<String>, value: JsValue) -> Self {
        self.with_member(name.into(), Member::Constant(value))
    }

    fn with_member(mut self, name: String, member: Member) -> Self {
        match self.members.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = member,
            None => self.members.push((name, member)),
        }
        self
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(n, m)| (n.as_str(), m))
    }

    /// Schema of the node at `path`, if every segment is a declared
    /// navigable member.
    pub fn at(&self, path: &AccessorPath) -> Option<&CapabilitySchema> {
        let mut current = self;
        for segment in path.segments() {
            match current.member(segment) {
                Some(Member::Navigable(schema)) => current = schema,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Declared member `property` of the node at `path`.
    pub fn member_at(&self, path: &AccessorPath, property: &str) -> Option<&Member> {
        self.at(path).and_then(|schema| schema.member(property))
    }

    /// The root `this` is bound to: the first declared one.
    pub fn primary_root(&self) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, m)| matches!(m, Member::Navigable(_)))
            .map(|(n, _)| n.as_str())
    }

    /// Names a script sees as free variables, with the paths or constants
    /// they stand for: every root, then each root's navigable members and
    /// constants. The first binding of a name wins.
    pub fn free_variables(&self) -> Vec<(String, FreeVariable)> {
        let mut bindings: Vec<(String, FreeVariable)> = vec![];
        let mut push = |name: &str, binding: FreeVariable| {
            if !bindings.iter().any(|(n, _)| n == name) {
                bindings.push((name.to_string(), binding));
            }
        };
        for (root, member) in self.members() {
            if let Member::Navigable(_) = member {
                push(root, FreeVariable::Node(AccessorPath::root(root)));
            }
        }
        for (root, member) in self.members() {
            if let Member::Navigable(schema) = member {
                let root_path = AccessorPath::root(root);
                for (name, child) in schema.members() {
                    match child {
                        Member::Navigable(_) => push(name, FreeVariable::Node(root_path.child(name))),
                        Member::Constant(value) => push(name, FreeVariable::Constant(value.clone())),
                        Member::Terminal => {}
                    }
                }
            }
        }
        bindings
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FreeVariable {
    Node(AccessorPath),
    Constant(JsValue),
}
