use crate::channel::AccessorPath;

/// Placeholder for a not-yet-resolved location in the privileged graph.
///
/// A node holds nothing but its path. A fresh node is produced on every
/// navigational access; two nodes are equal exactly when their paths are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualNode {
    path: AccessorPath,
}

impl VirtualNode {
    pub fn new(path: AccessorPath) -> Self {
        VirtualNode { path }
    }

    pub fn path(&self) -> &AccessorPath {
        &self.path
    }

    pub fn child(&self, property: &str) -> VirtualNode {
        VirtualNode::new(self.path.child(property))
    }
}
