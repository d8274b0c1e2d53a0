//! Command chains: templates and their compiled instances.

use super::node::attach_tail;
use super::{CommandCall, CommandNode, NodeCategory, Nodes};
use crate::core::TypeKey;
use crate::errors::CommanderError;
use crate::registration::ObjectDef;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// An ordered sequence of nodes operating on one entity type.
///
/// Registered chains are templates: they are never mutated once stored in a
/// graph, and every consumer works on a clone. `Clone` copies the full node
/// sequence, so splicing into a clone leaves the template untouched.
///
/// Two chains are equal when they target the same entity type, whatever
/// their nodes.
#[derive(Debug, Clone)]
pub struct CommandChain {
    unique_id: Uuid,
    entity_type: TypeKey,
    top: Option<Box<CommandNode>>,
}

impl CommandChain {
    /// Creates a chain for `entity_type` holding a single placeholder.
    #[must_use]
    pub fn new(entity_type: TypeKey) -> Self {
        let mut chain = Self::empty(entity_type);
        chain.top = Some(Box::new(CommandNode::placeholder()));
        chain
    }

    /// Creates a chain for `T` holding a single placeholder.
    #[must_use]
    pub fn for_entity<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>())
    }

    /// Creates a chain with no nodes.
    #[must_use]
    pub fn empty(entity_type: TypeKey) -> Self {
        Self {
            unique_id: Uuid::new_v4(),
            entity_type,
            top: None,
        }
    }

    /// Returns the unique id.
    #[must_use]
    pub fn unique_id(&self) -> Uuid {
        self.unique_id
    }

    /// Returns the entity type.
    #[must_use]
    pub fn entity_type(&self) -> TypeKey {
        self.entity_type
    }

    /// Returns the first node.
    #[must_use]
    pub fn top(&self) -> Option<&CommandNode> {
        self.top.as_deref()
    }

    /// Iterates over the nodes in execution order.
    #[must_use]
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes {
            current: self.top.as_deref(),
        }
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    /// Returns true if the chain has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.top.is_none()
    }

    /// Appends a node after the current last node.
    pub fn add_to_end(&mut self, node: CommandNode) {
        attach_tail(&mut self.top, Some(Box::new(node)));
    }

    /// Appends a call after the current last node.
    #[must_use]
    pub fn then(mut self, call: CommandCall) -> Self {
        self.add_to_end(CommandNode::call(call));
        self
    }

    /// Links a node before the current first node.
    pub fn prepend(&mut self, node: CommandNode) {
        match self.top.as_deref_mut() {
            Some(top) => top.add_before(node),
            None => self.top = Some(Box::new(node)),
        }
    }

    /// Returns the calls in execution order.
    pub fn calls(&self) -> impl Iterator<Item = &CommandCall> {
        self.nodes().filter_map(CommandNode::as_call)
    }

    /// Returns the first call.
    #[must_use]
    pub fn first_call(&self) -> Option<&CommandCall> {
        self.calls().next()
    }

    /// Returns the first call's description, or an empty string.
    #[must_use]
    pub fn first_call_description(&self) -> &str {
        self.first_call().map_or("", CommandCall::description)
    }

    /// Returns the entity type the first call expects, if any.
    #[must_use]
    pub fn command_input_type(&self) -> Option<TypeKey> {
        self.first_call().and_then(CommandCall::input_type)
    }

    /// Returns the short name of the type the first call expects, or an empty
    /// string.
    #[must_use]
    pub fn input_type_name(&self) -> String {
        self.command_input_type()
            .map_or_else(String::new, |key| key.short_name())
    }

    /// Returns true if the first call operates on an entity.
    #[must_use]
    pub fn has_input(&self) -> bool {
        self.first_call().is_some_and(CommandCall::has_input)
    }

    /// Returns the first placeholder node.
    #[must_use]
    pub fn placeholder(&self) -> Option<&CommandNode> {
        self.nodes().find(|node| node.category() == NodeCategory::Placeholder)
    }

    /// Returns the first placeholder node, mutably.
    pub fn placeholder_mut(&mut self) -> Option<&mut CommandNode> {
        self.top
            .as_deref_mut()
            .and_then(CommandNode::find_placeholder_mut)
    }

    /// Replaces the placeholder with `call`, keeping every other node where it
    /// was.
    ///
    /// # Errors
    ///
    /// Returns `CommanderError::MissingPlaceholder` if the chain has no
    /// placeholder.
    pub fn replace_placeholder(&mut self, call: CommandCall) -> Result<(), CommanderError> {
        let entity_type = self.entity_type;
        let placeholder = self
            .placeholder_mut()
            .ok_or_else(|| CommanderError::missing_placeholder(entity_type.short_name()))?;
        placeholder.replace_with(CommandNode::call(call));
        Ok(())
    }

    /// Checks if any node matches `filter`.
    pub fn contains_node(&self, filter: impl Fn(&CommandNode) -> bool) -> bool {
        self.nodes().any(filter)
    }

    /// Returns a fresh chain for the same entity type, holding a single
    /// placeholder.
    #[must_use]
    pub fn copy(&self) -> CommandChain {
        CommandChain::new(self.entity_type)
    }

    /// Converts the chain into a descriptor named with the chain's unique id.
    #[must_use]
    pub fn to_object_def(&self) -> ObjectDef {
        self.top
            .as_deref()
            .map_or_else(ObjectDef::empty, CommandNode::to_object_def)
            .named(self.unique_id.to_string())
    }
}

impl PartialEq for CommandChain {
    fn eq(&self, other: &Self) -> bool {
        self.entity_type == other.entity_type
    }
}

impl Eq for CommandChain {}

impl Hash for CommandChain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity_type.hash(state);
    }
}
