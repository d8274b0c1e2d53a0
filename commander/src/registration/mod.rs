//! Pipeline registration: template chains, the graph that stores them, and
//! the descriptors handed to the resolver.

mod graph;
pub mod nodes;
mod object_def;
mod services;

pub use graph::{ChainDescription, CommandGraph, CommandVisitor, GraphDescription, NodeDescription};
pub use nodes::{CommandCall, CommandChain, CommandNode, NodeCategory, NodeKind, Nodes};
pub use object_def::{CallTarget, DefSource, Factory, Instance, Lifetime, ObjectDef};
pub use services::{ServiceRegistry, TypePool};
