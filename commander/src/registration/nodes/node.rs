//! The linked node type chains are built from.

use super::{CommandCall, CommandChain};
use crate::registration::ObjectDef;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The category of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// A node that is itself a chain of nodes.
    Chain,
    /// A concrete call.
    Call,
    /// The slot reserved for the caller's unit of work.
    Placeholder,
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chain => write!(f, "chain"),
            Self::Call => write!(f, "call"),
            Self::Placeholder => write!(f, "placeholder"),
        }
    }
}

/// What a node holds.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A nested chain.
    Chain(CommandChain),
    /// A concrete call.
    Call(CommandCall),
    /// An empty slot.
    Placeholder,
}

/// A node in a singly linked command sequence.
///
/// A node owns everything after it, so cloning a node deep-copies its whole
/// tail. Unique ids survive cloning: a cloned node and its original denote
/// the same logical position.
#[derive(Debug, Clone)]
pub struct CommandNode {
    unique_id: Uuid,
    kind: NodeKind,
    pub(crate) next: Option<Box<CommandNode>>,
}

impl CommandNode {
    fn with_kind(unique_id: Uuid, kind: NodeKind) -> Self {
        Self {
            unique_id,
            kind,
            next: None,
        }
    }

    /// Creates a placeholder node.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::with_kind(Uuid::new_v4(), NodeKind::Placeholder)
    }

    /// Creates a call node.
    #[must_use]
    pub fn call(call: CommandCall) -> Self {
        Self::with_kind(Uuid::new_v4(), NodeKind::Call(call))
    }

    /// Creates a node wrapping a nested chain. The node takes the chain's id.
    #[must_use]
    pub fn chain(chain: CommandChain) -> Self {
        Self::with_kind(chain.unique_id(), NodeKind::Chain(chain))
    }

    /// Returns the node category.
    #[must_use]
    pub fn category(&self) -> NodeCategory {
        match self.kind {
            NodeKind::Chain(_) => NodeCategory::Chain,
            NodeKind::Call(_) => NodeCategory::Call,
            NodeKind::Placeholder => NodeCategory::Placeholder,
        }
    }

    /// Returns the unique id.
    #[must_use]
    pub fn unique_id(&self) -> Uuid {
        self.unique_id
    }

    /// Returns what the node holds.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns the call, for call nodes.
    #[must_use]
    pub fn as_call(&self) -> Option<&CommandCall> {
        match &self.kind {
            NodeKind::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Returns the nested chain, for chain nodes.
    #[must_use]
    pub fn as_chain(&self) -> Option<&CommandChain> {
        match &self.kind {
            NodeKind::Chain(chain) => Some(chain),
            _ => None,
        }
    }

    /// Returns true for placeholder nodes.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, NodeKind::Placeholder)
    }

    /// Returns the following node.
    #[must_use]
    pub fn next(&self) -> Option<&CommandNode> {
        self.next.as_deref()
    }

    /// Returns a human-readable description.
    #[must_use]
    pub fn description(&self) -> String {
        match &self.kind {
            NodeKind::Chain(chain) => format!("Chain<{}>", chain.entity_type().short_name()),
            NodeKind::Call(call) => call.description().to_string(),
            NodeKind::Placeholder => "Placeholder".to_string(),
        }
    }

    /// Inserts `node` (with any nodes already linked after it) directly after
    /// this node. This node's former successors follow the inserted ones.
    pub fn add_after(&mut self, node: CommandNode) {
        let rest = self.next.take();
        let mut inserted = Box::new(node);
        attach_tail(&mut inserted.next, rest);
        self.next = Some(inserted);
    }

    /// Inserts `node` (with any nodes already linked after it) directly before
    /// this node.
    ///
    /// The list is singly linked, so the insert happens in place: after the
    /// call, `self` holds the inserted node and the former contents of `self`
    /// follow it.
    pub fn add_before(&mut self, node: CommandNode) {
        let mut previous = node;
        std::mem::swap(self, &mut previous);
        attach_tail(&mut self.next, Some(Box::new(previous)));
    }

    /// Appends `node` after the last node of this sequence.
    pub fn add_to_end(&mut self, node: CommandNode) {
        attach_tail(&mut self.next, Some(Box::new(node)));
    }

    /// Replaces this node with `node`, keeping this node's successors after
    /// it (and after any nodes already linked to `node`).
    pub fn replace_with(&mut self, node: CommandNode) {
        let rest = self.next.take();
        *self = node;
        attach_tail(&mut self.next, rest);
    }

    /// Copies this node alone, without its successors.
    ///
    /// Calls and placeholders keep their unique id. A chain node copies to a
    /// fresh chain for the same entity type.
    #[must_use]
    pub fn copy(&self) -> CommandNode {
        match &self.kind {
            NodeKind::Chain(chain) => CommandNode::chain(chain.copy()),
            kind => Self::with_kind(self.unique_id, kind.clone()),
        }
    }

    /// Iterates over this node and every node after it.
    #[must_use]
    pub fn iter(&self) -> Nodes<'_> {
        Nodes {
            current: Some(self),
        }
    }

    /// Converts this node and its successors into a descriptor.
    #[must_use]
    pub fn to_object_def(&self) -> ObjectDef {
        let def = match &self.kind {
            NodeKind::Chain(chain) => ObjectDef::nested(chain.to_object_def()),
            NodeKind::Call(call) => call.to_object_def(),
            NodeKind::Placeholder => ObjectDef::placeholder(),
        }
        .named(self.unique_id.to_string());

        match &self.next {
            Some(next) => def.with_inner(next.to_object_def()),
            None => def,
        }
    }

    /// Returns the first placeholder in this node's sequence.
    pub(crate) fn find_placeholder_mut(&mut self) -> Option<&mut CommandNode> {
        if self.is_placeholder() {
            Some(self)
        } else {
            self.next
                .as_deref_mut()
                .and_then(CommandNode::find_placeholder_mut)
        }
    }
}

/// Links `tail` into the first empty `next` slot reachable from `slot`.
pub(crate) fn attach_tail(slot: &mut Option<Box<CommandNode>>, tail: Option<Box<CommandNode>>) {
    match slot {
        Some(node) => attach_tail(&mut node.next, tail),
        None => *slot = tail,
    }
}

/// Iterator over a node sequence, in execution order.
#[derive(Debug, Clone)]
pub struct Nodes<'a> {
    pub(crate) current: Option<&'a CommandNode>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a CommandNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        self.current = node.next.as_deref();
        Some(node)
    }
}
