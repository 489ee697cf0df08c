use std::error;
use std::fmt;

/// The type of constraint violation that caused the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintViolationType {
    Unique,
    ForeignKey,
    NotNull,
    Other,
}

impl fmt::Display for ConstraintViolationType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConstraintViolationType::Unique => write!(f, "Unique"),
            ConstraintViolationType::ForeignKey => write!(f, "Foreign Key"),
            ConstraintViolationType::NotNull => write!(f, "Not Null"),
            ConstraintViolationType::Other => write!(f, "Other"),
        }
    }
}

/// An error which is returned because of a database constraint violation.
///
/// This error indicates that an update to a database failed because it would have violated
/// a constraint, such as inserting a second profile with an existing login.
pub struct ConstraintViolationError {
    violation_type: ConstraintViolationType,
    source: Option<Box<dyn error::Error + Send + Sync>>,
    context: Option<String>,
}

impl ConstraintViolationError {
    /// Constructs a new `ConstraintViolationError` from a specified violation type.
    pub fn with_violation_type(violation_type: ConstraintViolationType) -> Self {
        Self {
            violation_type,
            source: None,
            context: None,
        }
    }

    /// Constructs a new `ConstraintViolationError` from a specified violation type and source
    /// error.
    pub fn from_source_with_violation_type(
        violation_type: ConstraintViolationType,
        source: Box<dyn error::Error + Send + Sync>,
    ) -> Self {
        Self {
            violation_type,
            source: Some(source),
            context: None,
        }
    }

    /// Attaches the operation that hit the violation; it becomes the display prefix.
    pub fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }

    /// Returns the type of violation.
    pub fn violation_type(&self) -> &ConstraintViolationType {
        &self.violation_type
    }
}

impl error::Error for ConstraintViolationError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.source {
            Some(s) => Some(&**s),
            None => None,
        }
    }
}

impl fmt::Display for ConstraintViolationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{}: ", context)?;
        }
        match &self.source {
            Some(s) => write!(
                f,
                "{} constraint violated: {}",
                self.violation_type, s
            ),
            None => write!(f, "{} constraint violated", self.violation_type),
        }
    }
}

impl fmt::Debug for ConstraintViolationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConstraintViolationError")
            .field("violation_type", &self.violation_type)
            .field("context", &self.context)
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_display_with_violation_type() {
        let err = ConstraintViolationError::with_violation_type(ConstraintViolationType::Unique);
        assert_eq!(format!("{}", err), "Unique constraint violated");
    }

    #[test]
    fn test_display_with_context() {
        let err = ConstraintViolationError::with_violation_type(ConstraintViolationType::Unique)
            .with_context("create_profile".to_string());
        assert_eq!(
            format!("{}", err),
            "create_profile: Unique constraint violated"
        );
        assert_eq!(err.violation_type(), &ConstraintViolationType::Unique);
    }
}
