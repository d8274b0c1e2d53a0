//! The registry of command chain templates.

use super::nodes::{CommandChain, CommandNode, NodeCategory};
use super::services::{ServiceRegistry, TypePool};
use super::ObjectDef;
use crate::core::{CompileMode, TypeKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Visits registered chains, e.g. to analyze or render them.
pub trait CommandVisitor {
    /// Called once per registered chain.
    fn visit_command(&mut self, chain: &CommandChain);
}

/// Holds the template chains for creating and for mutating entities.
///
/// A graph is composed once at startup (possibly by importing other graphs)
/// and shared read-only afterwards. Lookups hand out deep clones, never the
/// stored templates.
#[derive(Debug, Clone, Default)]
pub struct CommandGraph {
    chains_for_new: Vec<CommandChain>,
    chains_for_existing: Vec<CommandChain>,
    types: TypePool,
    services: ServiceRegistry,
}

impl CommandGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the type pool.
    #[must_use]
    pub fn types(&self) -> &TypePool {
        &self.types
    }

    /// Returns the type pool, mutably.
    pub fn types_mut(&mut self) -> &mut TypePool {
        &mut self.types
    }

    /// Returns the service registrations.
    #[must_use]
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// Returns the service registrations, mutably.
    pub fn services_mut(&mut self) -> &mut ServiceRegistry {
        &mut self.services
    }

    /// Returns the templates for creating entities.
    #[must_use]
    pub fn chains_for_new(&self) -> &[CommandChain] {
        &self.chains_for_new
    }

    /// Returns the templates for mutating entities.
    #[must_use]
    pub fn chains_for_existing(&self) -> &[CommandChain] {
        &self.chains_for_existing
    }

    /// Registers a template for creating entities, replacing any template for
    /// the same entity type.
    pub fn add_chain_for_new(&mut self, chain: CommandChain) {
        self.types.add_type(chain.entity_type());
        fill(&mut self.chains_for_new, chain);
    }

    /// Registers a template for mutating entities, replacing any template for
    /// the same entity type.
    pub fn add_chain_for_existing(&mut self, chain: CommandChain) {
        self.types.add_type(chain.entity_type());
        fill(&mut self.chains_for_existing, chain);
    }

    /// Returns a clone of the creation template for `T`.
    #[must_use]
    pub fn chain_for_new<T: ?Sized + 'static>(&self) -> Option<CommandChain> {
        self.chain_for(CompileMode::New, TypeKey::of::<T>())
    }

    /// Returns a clone of the mutation template for `T`.
    #[must_use]
    pub fn chain_for_existing<T: ?Sized + 'static>(&self) -> Option<CommandChain> {
        self.chain_for(CompileMode::Existing, TypeKey::of::<T>())
    }

    /// Returns a clone of the template for `entity_type` in `mode`.
    #[must_use]
    pub fn chain_for(&self, mode: CompileMode, entity_type: TypeKey) -> Option<CommandChain> {
        self.chains(mode)
            .iter()
            .find(|chain| chain.entity_type() == entity_type)
            .cloned()
    }

    /// Returns the templates for `mode`.
    #[must_use]
    pub fn chains(&self, mode: CompileMode) -> &[CommandChain] {
        match mode {
            CompileMode::New => &self.chains_for_new,
            CompileMode::Existing => &self.chains_for_existing,
        }
    }

    /// Returns the first template matching `predicate`, searching creation
    /// templates before mutation templates.
    pub fn find_chain(&self, predicate: impl Fn(&CommandChain) -> bool) -> Option<&CommandChain> {
        self.chains_for_new
            .iter()
            .find(|chain| predicate(chain))
            .or_else(|| self.chains_for_existing.iter().find(|chain| predicate(chain)))
    }

    /// Merges another graph's templates and registrations into this one.
    ///
    /// Mutation templates merge before creation templates; templates for an
    /// entity type this graph already has replace the existing ones.
    pub fn import(&mut self, other: &CommandGraph) {
        for chain in &other.chains_for_existing {
            self.add_chain_for_existing(chain.clone());
        }
        for chain in &other.chains_for_new {
            self.add_chain_for_new(chain.clone());
        }
        self.types.merge(&other.types);
        self.services.merge(&other.services);
    }

    /// Calls `action` for every service registration, then once for the
    /// graph itself so pipelines can resolve it as a dependency.
    pub fn each_service(self: &Arc<Self>, mut action: impl FnMut(TypeKey, ObjectDef)) {
        self.services.each(|service, def| action(service, def.clone()));
        action(
            TypeKey::of::<CommandGraph>(),
            ObjectDef::value_arc(Arc::clone(self)),
        );
    }

    /// Visits every creation template, then every mutation template.
    pub fn visit_commands(&self, visitor: &mut dyn CommandVisitor) {
        for chain in self.chains_for_new.iter().chain(&self.chains_for_existing) {
            visitor.visit_command(chain);
        }
    }

    /// Describes every template for visualization.
    #[must_use]
    pub fn describe(&self) -> GraphDescription {
        let describe = |mode: CompileMode| {
            self.chains(mode)
                .iter()
                .map(move |chain| ChainDescription::new(mode, chain))
        };

        GraphDescription {
            chains: describe(CompileMode::New)
                .chain(describe(CompileMode::Existing))
                .collect(),
        }
    }
}

fn fill(chains: &mut Vec<CommandChain>, chain: CommandChain) {
    match chains.iter_mut().find(|existing| **existing == chain) {
        Some(existing) => *existing = chain,
        None => chains.push(chain),
    }
}

/// A serializable summary of a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDescription {
    /// One entry per template.
    pub chains: Vec<ChainDescription>,
}

/// A serializable summary of one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDescription {
    /// The entity type name.
    pub entity_type: String,
    /// The mode the template serves.
    pub mode: CompileMode,
    /// The chain's unique id.
    pub unique_id: Uuid,
    /// The nodes in execution order.
    pub nodes: Vec<NodeDescription>,
}

impl ChainDescription {
    fn new(mode: CompileMode, chain: &CommandChain) -> Self {
        Self {
            entity_type: chain.entity_type().short_name(),
            mode,
            unique_id: chain.unique_id(),
            nodes: chain
                .nodes()
                .map(|node: &CommandNode| NodeDescription {
                    category: node.category(),
                    description: node.description(),
                })
                .collect(),
        }
    }
}

/// A serializable summary of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    /// The node category.
    pub category: NodeCategory,
    /// The node description.
    pub description: String,
}
