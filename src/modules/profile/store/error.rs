use std::error::Error;
use std::fmt;

use crate::modules::context::ContextError;
use crate::modules::error::{ConstraintViolationError, ConstraintViolationType, InternalError};

/// Errors that may occur during [`ProfileStore`](super::ProfileStore) operations.
#[derive(Debug)]
pub enum ProfileStoreError {
    /// A pooled connection could not be acquired or the transaction could not be started.
    Connection(InternalError),
    /// No row matched the lookup, or a write affected zero rows.
    NotFound(String),
    /// The write would collide with an existing id or login.
    ConstraintViolation(ConstraintViolationError),
    /// The request context was cancelled or timed out; any open transaction was rolled back.
    Cancelled(ContextError),
    Internal(InternalError),
}

impl ProfileStoreError {
    /// Wraps a statement failure with the operation and statement it came from.
    ///
    /// Unique and foreign key violations become `ConstraintViolation`; everything else is
    /// `Internal`.
    pub fn from_query_error(context: &str, err: ::diesel::result::Error) -> Self {
        use ::diesel::result::{DatabaseErrorKind, Error as DieselError};

        let violation_type = match &err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                Some(ConstraintViolationType::Unique)
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                Some(ConstraintViolationType::ForeignKey)
            }
            DieselError::DatabaseError(DatabaseErrorKind::NotNullViolation, _) => {
                Some(ConstraintViolationType::NotNull)
            }
            _ => None,
        };

        match violation_type {
            Some(violation_type) => ProfileStoreError::ConstraintViolation(
                ConstraintViolationError::from_source_with_violation_type(
                    violation_type,
                    Box::new(err),
                )
                .with_context(context.to_string()),
            ),
            None => ProfileStoreError::Internal(InternalError::from_source_with_prefix(
                Box::new(err),
                context.to_string(),
            )),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProfileStoreError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ProfileStoreError::ConstraintViolation(err)
                if *err.violation_type() == ConstraintViolationType::Unique
        )
    }
}

impl Error for ProfileStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProfileStoreError::Connection(err) => Some(err),
            ProfileStoreError::NotFound(_) => None,
            ProfileStoreError::ConstraintViolation(err) => Some(err),
            ProfileStoreError::Cancelled(err) => Some(err),
            ProfileStoreError::Internal(err) => Some(err),
        }
    }
}

impl fmt::Display for ProfileStoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProfileStoreError::Connection(err) => write!(f, "connection error: {}", err),
            ProfileStoreError::NotFound(msg) => f.write_str(msg),
            ProfileStoreError::ConstraintViolation(err) => f.write_str(&err.to_string()),
            ProfileStoreError::Cancelled(err) => f.write_str(&err.to_string()),
            ProfileStoreError::Internal(err) => f.write_str(&err.to_string()),
        }
    }
}

impl From<ContextError> for ProfileStoreError {
    fn from(err: ContextError) -> Self {
        Self::Cancelled(err)
    }
}

impl From<InternalError> for ProfileStoreError {
    fn from(err: InternalError) -> Self {
        Self::Internal(err)
    }
}

#[cfg(test)]
mod tests {
    use ::diesel::result::{DatabaseErrorKind, Error as DieselError};

    use super::*;

    #[test]
    fn unique_violation_maps_to_conflict_with_context() {
        let err = ProfileStoreError::from_query_error(
            "create_profile: INSERT INTO profiles",
            DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                Box::new("UNIQUE constraint failed: profiles.login".to_string()),
            ),
        );

        assert!(err.is_conflict());
        assert!(err
            .to_string()
            .starts_with("create_profile: INSERT INTO profiles: Unique constraint violated"));
    }

    #[test]
    fn other_errors_map_to_internal() {
        let err = ProfileStoreError::from_query_error(
            "get_profile_by_id: SELECT profiles by id",
            DieselError::RollbackTransaction,
        );

        match err {
            ProfileStoreError::Internal(inner) => assert!(inner
                .to_string()
                .starts_with("get_profile_by_id: SELECT profiles by id: ")),
            other => panic!("Expected an internal error, got {:?}", other),
        }
    }
}
