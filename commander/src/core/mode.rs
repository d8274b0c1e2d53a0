//! Compile mode enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which family of template chains a compilation draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileMode {
    /// Workflows that create a new entity.
    New,
    /// Workflows that mutate an existing entity.
    Existing,
}

impl fmt::Display for CompileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Existing => write!(f, "existing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_display() {
        assert_eq!(CompileMode::New.to_string(), "new");
        assert_eq!(CompileMode::Existing.to_string(), "existing");
    }

    #[test]
    fn test_mode_serde() {
        let json = serde_json::to_string(&CompileMode::Existing).unwrap();
        assert_eq!(json, "\"existing\"");

        let mode: CompileMode = serde_json::from_str("\"new\"").unwrap();
        assert_eq!(mode, CompileMode::New);
    }
}
