//! Error taxonomy of the engine.
//!
//! None of these are fatal: invalid nodes are dropped, unresolved references
//! render as placeholders and rejected style values are omitted. The variants
//! exist so callers can log or report what was discarded.

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid node {id}: {reason}")]
    InvalidNode { id: String, reason: String },

    #[error("Unresolved reference {reference}: {reason}")]
    UnresolvedReference { reference: String, reason: String },

    #[error("Style property {property} rejected: {reason}")]
    SanitizationRejected { property: String, reason: String },

    #[error("Invalid document: {reason}")]
    InvalidDocument { reason: String },
}

impl EngineError {
    pub fn invalid_node(id: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidNode {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn unresolved(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::UnresolvedReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    pub fn rejected(property: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::SanitizationRejected {
            property: property.into(),
            reason: reason.into(),
        }
    }
}
