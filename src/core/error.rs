//! Error taxonomy for the decomposition engine
//!
//! Every failure the engine can report is one of four kinds. None of them is
//! fatal: the dispatcher turns each into a `failed` envelope and the engine
//! state is left exactly as it was before the call.

use serde::{Deserialize, Serialize};

/// The kind of entity an identifier was expected to resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Problem,
    Component,
    /// A component referenced from a dependency list
    Dependency,
    Phase,
}

impl EntityKind {
    /// Human-readable name used in error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Problem => "Problem",
            EntityKind::Component => "Component",
            EntityKind::Dependency => "Dependency",
            EntityKind::Phase => "Phase",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while executing a decomposition action
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed, missing, or out-of-range input field
    Validation { field: String, message: String },
    /// Referenced identifier does not exist
    NotFound { kind: EntityKind, id: String },
    /// Identifier already taken on create
    AlreadyExists { kind: EntityKind, id: String },
    /// Adding `source -> target` would close a loop.
    ///
    /// `path` is the existing chain `target -> ... -> source`.
    CycleDetected {
        source: String,
        target: String,
        path: Vec<String>,
    },
}

impl EngineError {
    /// Shorthand for a validation failure on a named field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn already_exists(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.into(),
        }
    }

    /// Stable name of the error class, used in logs and events
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::NotFound { .. } => "NotFoundError",
            Self::AlreadyExists { .. } => "AlreadyExistsError",
            Self::CycleDetected { .. } => "CycleDetectedError",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation { field, message } => {
                write!(f, "Invalid {}: {}", field, message)
            }
            Self::NotFound { kind, id } => write!(f, "{} '{}' not found", kind, id),
            Self::AlreadyExists { kind, id } => write!(f, "{} '{}' already exists", kind, id),
            Self::CycleDetected {
                source,
                target,
                path,
            } => {
                write!(
                    f,
                    "Linking '{}' -> '{}' would create a dependency cycle: {} -> {}",
                    source,
                    target,
                    source,
                    path.join(" -> ")
                )
            }
        }
    }
}

impl std::error::Error for EngineError {}
