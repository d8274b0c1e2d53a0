//! # Commander
//!
//! A command pipeline compiler and invoker.
//!
//! Applications register *template chains* per entity type: ordered
//! sequences of calls (validate, persist, publish) with one placeholder
//! where the caller's unit of work goes. Invoking a unit of work:
//!
//! - **Compiles**: clones the template, splices the unit of work into the
//!   placeholder, and binds every call to components resolved from an
//!   isolated per-invocation scope
//! - **Executes**: runs the calls in chain order against a typed context
//! - **Extracts**: reads the published [`InvocationResult`](runtime::InvocationResult)
//!   and disposes the scope
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use commander::prelude::*;
//!
//! let mut graph = CommandGraph::new();
//! graph.add_chain_for_new(
//!     CommandChain::for_entity::<Order>()
//!         .then(CommandCall::for_step_type::<PersistOrder>())
//!         .then(CommandCall::for_step(PublishOrder)),
//! );
//!
//! let commander = Commander::bootstrap(graph, Container::new(), CommanderSettings::default())?;
//! let result = commander.invoker().for_new(SetOrderTotal { total: 30 })?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod bootstrap;
pub mod commands;
pub mod config;
pub mod core;
pub mod errors;
pub mod invoker;
pub mod observability;
pub mod registration;
pub mod runtime;
pub mod testing;


/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bootstrap::{Commander, CommanderBuilder};
    pub use crate::commands::{CommandStep, DomainCommand, EmptyDomainCommand, FnCommand, FnStep};
    pub use crate::config::CommanderSettings;
    pub use crate::core::{CompileMode, TypeKey};
    pub use crate::errors::{
        CommanderError, ContextError, MissingResultError, ResolutionError, UnknownPipelineError,
    };
    pub use crate::invoker::CommandInvoker;
    pub use crate::registration::{
        CommandCall, CommandChain, CommandGraph, CommandNode, CommandVisitor, NodeCategory,
        ObjectDef,
    };
    pub use crate::runtime::{
        CommandCompiler, CommandContext, CompiledCommand, Container, EntityBuilderRegistry,
        InvocationResult, ResolutionScope, Resolver, ServiceArguments,
    };
}
