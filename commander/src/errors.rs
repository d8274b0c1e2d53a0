//! Error types for the commander engine.
//!
//! Every failure of a single invocation surfaces as a [`CommanderError`].
//! None of them are retried by the engine; a caller that wants a retry
//! re-invokes, which compiles a fresh scope.

use crate::core::CompileMode;
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for commander operations.
#[derive(Debug, Error)]
pub enum CommanderError {
    /// No template is registered for the requested entity type and mode.
    #[error("{0}")]
    UnknownPipeline(#[from] UnknownPipelineError),

    /// The pipeline ran to completion without publishing its result.
    #[error("{0}")]
    MissingResult(#[from] MissingResultError),

    /// A component could not be constructed by the resolver.
    #[error("{0}")]
    Resolution(#[from] ResolutionError),

    /// A value expected in the command context was absent.
    #[error("{0}")]
    Context(#[from] ContextError),

    /// A template chain has no placeholder to splice the unit of work into.
    #[error("Chain for '{entity_type}' has no placeholder to receive the command")]
    MissingPlaceholder {
        /// The entity type of the malformed chain.
        entity_type: String,
    },

    /// A unit of work failed while the pipeline was executing.
    #[error("Command step '{step}' failed: {source}")]
    CommandFailed {
        /// Description of the failing step.
        step: String,
        /// The error raised by the unit of work.
        #[source]
        source: anyhow::Error,
    },
}

impl CommanderError {
    /// Creates a command failure for the named step.
    #[must_use]
    pub fn command_failed(step: impl Into<String>, source: anyhow::Error) -> Self {
        Self::CommandFailed {
            step: step.into(),
            source,
        }
    }

    /// Creates a missing placeholder error.
    #[must_use]
    pub fn missing_placeholder(entity_type: impl Into<String>) -> Self {
        Self::MissingPlaceholder {
            entity_type: entity_type.into(),
        }
    }

    /// Returns a short machine-readable kind for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownPipeline(_) => "UnknownPipeline",
            Self::MissingResult(_) => "MissingResult",
            Self::Resolution(_) => "Resolution",
            Self::Context(_) => "Context",
            Self::MissingPlaceholder { .. } => "MissingPlaceholder",
            Self::CommandFailed { .. } => "CommandFailed",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), json!(self.kind()));
        map.insert("message".to_string(), json!(self.to_string()));

        match self {
            Self::UnknownPipeline(err) => {
                map.insert("entity_type".to_string(), json!(err.entity_type));
                map.insert("mode".to_string(), json!(err.mode.to_string()));
            }
            Self::MissingResult(err) => {
                map.insert("result_type".to_string(), json!(err.result_type));
            }
            Self::Resolution(err) => {
                map.insert("service".to_string(), json!(err.service));
            }
            Self::MissingPlaceholder { entity_type } => {
                map.insert("entity_type".to_string(), json!(entity_type));
            }
            Self::CommandFailed { step, .. } => {
                map.insert("step".to_string(), json!(step));
            }
            Self::Context(_) => {}
        }

        map
    }
}

/// Error raised when no template chain exists for an entity type and mode.
#[derive(Debug, Clone, Error)]
#[error("No {mode} pipeline is registered for entity type '{entity_type}'")]
pub struct UnknownPipelineError {
    /// The requested entity type.
    pub entity_type: String,
    /// The requested compile mode.
    pub mode: CompileMode,
}

impl UnknownPipelineError {
    /// Creates a new unknown pipeline error.
    #[must_use]
    pub fn new(entity_type: impl Into<String>, mode: CompileMode) -> Self {
        Self {
            entity_type: entity_type.into(),
            mode,
        }
    }
}

/// Error raised when a pipeline completes without publishing its result.
#[derive(Debug, Clone, Error)]
#[error("Pipeline completed without publishing a result of type '{result_type}'")]
pub struct MissingResultError {
    /// The expected result type.
    pub result_type: String,
}

impl MissingResultError {
    /// Creates a new missing result error.
    #[must_use]
    pub fn new(result_type: impl Into<String>) -> Self {
        Self {
            result_type: result_type.into(),
        }
    }
}

/// Error raised when the resolver cannot produce an instance.
#[derive(Debug, Clone, Error)]
#[error("Unable to resolve '{service}': {reason}")]
pub struct ResolutionError {
    /// The service type or definition name.
    pub service: String,
    /// Why resolution failed.
    pub reason: String,
}

impl ResolutionError {
    /// Creates a new resolution error.
    #[must_use]
    pub fn new(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// The service has no registration.
    #[must_use]
    pub fn not_registered(service: impl Into<String>) -> Self {
        Self::new(service, "no registration found")
    }

    /// A registration produced an instance of the wrong type.
    #[must_use]
    pub fn type_mismatch(service: impl Into<String>) -> Self {
        Self::new(service, "registered instance has a different type")
    }

    /// The scope was already disposed.
    #[must_use]
    pub fn disposed(service: impl Into<String>) -> Self {
        Self::new(service, "scope has been disposed")
    }

    /// Constructing the service requires the service itself.
    #[must_use]
    pub fn circular(service: impl Into<String>) -> Self {
        Self::new(service, "circular dependency")
    }
}

/// Errors raised by the command context.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    /// No value of the requested type was set.
    #[error("Context has no value of type '{type_name}'")]
    MissingValue {
        /// The requested type.
        type_name: String,
    },

    /// The entity is absent and no builder is registered for it.
    #[error("Context has no entity of type '{type_name}' and no builder is registered for it")]
    MissingEntity {
        /// The entity type.
        type_name: String,
    },

    /// The registered builder failed to construct the entity.
    #[error("Building entity of type '{type_name}' failed: {source}")]
    EntityBuildFailed {
        /// The entity type.
        type_name: String,
        /// Why the builder failed.
        #[source]
        source: ResolutionError,
    },
}

impl ContextError {
    /// Creates a missing value error.
    #[must_use]
    pub fn missing_value(type_name: impl Into<String>) -> Self {
        Self::MissingValue {
            type_name: type_name.into(),
        }
    }

    /// Creates a missing entity error.
    #[must_use]
    pub fn missing_entity(type_name: impl Into<String>) -> Self {
        Self::MissingEntity {
            type_name: type_name.into(),
        }
    }

    /// Creates an entity build failure.
    #[must_use]
    pub fn entity_build_failed(type_name: impl Into<String>, source: ResolutionError) -> Self {
        Self::EntityBuildFailed {
            type_name: type_name.into(),
            source,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T, E = CommanderError> = std::result::Result<T, E>;
