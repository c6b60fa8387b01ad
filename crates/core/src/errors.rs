use thiserror::Error;

use crate::domain::{ItemId, ProfileId};

/// Failures reported by the external collaborators (catalog, profile, and
/// vector-store services).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("{kind} `{id}` was not found")]
    NotFound { kind: RecordKind, id: String },
    #[error("{0}")]
    Unavailable(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Item,
    Profile,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Item => f.write_str("item"),
            Self::Profile => f.write_str("profile"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RecommendError {
    #[error("{kind} `{id}` was not found")]
    NotFound { kind: RecordKind, id: String },
    #[error("no embedding vector is stored for item `{0}`")]
    VectorMissing(ItemId),
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("profile `{0}` has no liked items with stored vectors; similarity is undefined")]
    ProfileIncomplete(ProfileId),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl RecommendError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::VectorMissing(_) => "vector_missing",
            Self::CatalogUnavailable(_) => "catalog_unavailable",
            Self::ProfileIncomplete(_) => "profile_incomplete",
            Self::InvalidConfiguration(_) => "invalid_configuration",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "The requested profile or item does not exist.",
            Self::VectorMissing(_) => "An item is missing its similarity data.",
            Self::CatalogUnavailable(_) => {
                "The catalog is temporarily unavailable. Please retry shortly."
            }
            Self::ProfileIncomplete(_) => {
                "The profile needs at least one liked item before recommendations can be made."
            }
            Self::InvalidConfiguration(_) => {
                "The request parameters are inconsistent. Check inputs and try again."
            }
        }
    }

    /// Whether a single item's failure may be skipped without aborting a run.
    pub fn is_item_recoverable(&self) -> bool {
        matches!(self, Self::VectorMissing(_))
    }
}

impl From<CollaboratorError> for RecommendError {
    fn from(value: CollaboratorError) -> Self {
        match value {
            CollaboratorError::NotFound { kind, id } => Self::NotFound { kind, id },
            CollaboratorError::Unavailable(message) => Self::CatalogUnavailable(message),
        }
    }
}
