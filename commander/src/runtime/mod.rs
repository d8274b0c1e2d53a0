//! Per-invocation runtime: contexts, the container, compilation and
//! compiled commands.

mod arguments;
mod compiled;
mod compiler;
mod container;
mod context;
mod resolver;
mod result;
mod scope;

pub use arguments::ServiceArguments;
pub use compiled::{BoundStep, CompiledCommand, CompiledPipeline};
pub use compiler::CommandCompiler;
pub use container::Container;
pub use context::{CommandContext, EntityBuilderRegistry};
#[cfg(test)]
pub use resolver::MockResolver;
pub use resolver::Resolver;
pub use result::InvocationResult;
pub use scope::{DisposeCallback, ResolutionScope};
