//! Service-level error for vocabulary use-cases.

use crate::model::vocabulary::{ValidationError, VocabularyId};
use crate::repo::vocabulary_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, VocabularyError>;

/// Failure surfaced to vocabulary engine callers.
///
/// Every variant aborts the whole operation; nothing is downgraded to a
/// warning.
#[derive(Debug)]
pub enum VocabularyError {
    /// Document or item rule violation.
    Validation(ValidationError),
    /// Custom vocabulary id shadows a built-in article field.
    ReservedIdConflict(VocabularyId),
    /// Id still belongs to a soft-deleted vocabulary.
    DeletedIdConflict(VocabularyId),
    /// Default/system vocabularies cannot be deleted.
    ProtectedVocabulary(VocabularyId),
    /// Replacement document tries to change the vocabulary id.
    IdMismatch {
        expected: VocabularyId,
        actual: VocabularyId,
    },
    NotFound(VocabularyId),
    Repo(RepoError),
}

impl VocabularyError {
    /// Stable machine-readable code for error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(err) => err.code(),
            Self::ReservedIdConflict(_) => "conflict",
            Self::DeletedIdConflict(_) => "deleted",
            Self::ProtectedVocabulary(_) => "protected",
            Self::IdMismatch { .. } => "immutable_id",
            Self::NotFound(_) => "not_found",
            Self::Repo(_) => "store",
        }
    }
}

impl Display for VocabularyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ReservedIdConflict(id) => write!(f, "{id} is in use"),
            Self::DeletedIdConflict(id) => write!(f, "{id} is used by deleted vocabulary"),
            Self::ProtectedVocabulary(id) => {
                write!(f, "default vocabulary `{id}` cannot be deleted")
            }
            Self::IdMismatch { expected, actual } => write!(
                f,
                "vocabulary id is immutable: expected `{expected}`, got `{actual}`"
            ),
            Self::NotFound(id) => write!(f, "vocabulary not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for VocabularyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for VocabularyError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for VocabularyError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}
