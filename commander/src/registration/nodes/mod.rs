//! Pipeline nodes: placeholders, calls and chains.

mod call;
mod chain;
mod node;

pub use call::CommandCall;
pub use chain::CommandChain;
pub use node::{CommandNode, NodeCategory, NodeKind, Nodes};
