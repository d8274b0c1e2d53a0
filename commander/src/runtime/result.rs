//! The typed result a pipeline publishes into its context.

use serde::{Deserialize, Serialize};

/// The outcome of one invocation against an entity of type `E`.
///
/// A pipeline step stores this in the command context; the invoker reads it
/// back once the pipeline has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult<E> {
    /// The entity after the pipeline ran.
    pub entity: E,
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Messages collected along the way (validation notes, warnings).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl<E> InvocationResult<E> {
    /// Creates a successful result.
    #[must_use]
    pub fn success(entity: E) -> Self {
        Self {
            entity,
            success: true,
            messages: Vec::new(),
        }
    }

    /// Creates a failed result with messages.
    #[must_use]
    pub fn failure(entity: E, messages: Vec<String>) -> Self {
        Self {
            entity,
            success: false,
            messages,
        }
    }

    /// Adds a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    /// Returns true if the invocation succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Consumes the result and returns the entity.
    #[must_use]
    pub fn into_entity(self) -> E {
        self.entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        let result = InvocationResult::success(10_u32);
        assert!(result.is_success());
        assert!(result.messages.is_empty());
        assert_eq!(result.into_entity(), 10);
    }

    #[test]
    fn test_failure_with_messages() {
        let result = InvocationResult::failure("order", vec!["total must be positive".into()])
            .with_message("second");

        assert!(!result.is_success());
        assert_eq!(result.messages.len(), 2);
    }

    #[test]
    fn test_serialization_skips_empty_messages() {
        let json = serde_json::to_value(InvocationResult::success(1)).unwrap();
        assert_eq!(json, serde_json::json!({"entity": 1, "success": true}));
    }
}
