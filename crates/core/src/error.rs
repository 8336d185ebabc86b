use crate::repositories::StoreError;
use serde::Serialize;
use std::fmt;

/// A single violated rule, keyed by the JSON field name it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_failures(failures: &[FieldError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum PandaError {
    /// Input broke one or more rules. Always carries every failure, never just the first.
    #[error("validation failed: {}", join_failures(.0))]
    Validation(Vec<FieldError>),
    #[error("storage error: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for PandaError {
    /// Constraint violations the caller can fix become validation failures; everything
    /// else stays a storage error.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateNhsNumber(_) => {
                Self::invalid("nhsNumber", "NHS number is already registered.")
            }
            StoreError::UnknownPatient(_) => Self::invalid("patientId", "Patient does not exist."),
            other => Self::Store(other),
        }
    }
}

impl PandaError {
    /// Shorthand for a validation error with a single failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// Returns the field failures if this is a validation error.
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            Self::Validation(failures) => Some(failures),
            Self::Store(_) => None,
        }
    }
}

pub type PandaResult<T> = std::result::Result<T, PandaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_failure() {
        let err = PandaError::Validation(vec![
            FieldError::new("name", "must not be empty"),
            FieldError::new("postcode", "is not a valid UK postcode"),
        ]);

        assert_eq!(
            err.to_string(),
            "validation failed: name: must not be empty; postcode: is not a valid UK postcode"
        );
        assert_eq!(err.field_errors().map(<[FieldError]>::len), Some(2));
    }

    #[test]
    fn test_duplicate_nhs_number_becomes_validation_error() {
        let err = PandaError::from(StoreError::DuplicateNhsNumber("1373645350".into()));
        assert_eq!(
            err.field_errors(),
            Some(&[FieldError::new("nhsNumber", "NHS number is already registered.")][..])
        );
    }

    #[test]
    fn test_store_error_has_no_field_errors() {
        let err = PandaError::from(StoreError::Poisoned);
        assert!(err.field_errors().is_none());
    }
}
