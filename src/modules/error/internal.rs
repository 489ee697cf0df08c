use std::error;
use std::fmt;

struct Source {
    prefix: Option<String>,
    source: Box<dyn error::Error + Send + Sync>,
}

/// An error which is returned for reasons internal to the function.
///
/// This error is produced when a failure occurred within the function but the failure is due to
/// an internal implementation detail of the function. This generally means that there is no
/// specific information which can be returned that would help the caller of the function recover
/// or otherwise take action.
pub struct InternalError {
    message: Option<String>,
    source: Option<Source>,
}

impl InternalError {
    /// Constructs a new `InternalError` from a specified source error.
    ///
    /// The implementation of `std::fmt::Display` for this error will simply pass through the
    /// display of the source message unmodified.
    pub fn from_source(source: Box<dyn error::Error + Send + Sync>) -> Self {
        Self {
            message: None,
            source: Some(Source {
                prefix: None,
                source,
            }),
        }
    }

    /// Constructs a new `InternalError` from a specified source error and prefix string.
    ///
    /// The display string will be `"{prefix}: {source}"`. This is how operation and statement
    /// context is attached to driver errors.
    pub fn from_source_with_prefix(
        source: Box<dyn error::Error + Send + Sync>,
        prefix: String,
    ) -> Self {
        Self {
            message: None,
            source: Some(Source {
                prefix: Some(prefix),
                source,
            }),
        }
    }

    /// Constructs a new `InternalError` with a specified message string.
    pub fn with_message(message: String) -> Self {
        Self {
            message: Some(message),
            source: None,
        }
    }
}

impl error::Error for InternalError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.source {
            Some(s) => Some(&*s.source),
            None => None,
        }
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.message {
            Some(m) => write!(f, "{}", m),
            None => match &self.source {
                Some(s) => match &s.prefix {
                    Some(p) => write!(f, "{}: {}", p, s.source),
                    None => write!(f, "{}", s.source),
                },
                None => write!(f, "{}", std::any::type_name::<InternalError>()),
            },
        }
    }
}

impl fmt::Debug for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        const TYPE_NAME: &str = "InternalError";

        match &self.message {
            Some(m) => match &self.source {
                Some(s) => write!(
                    f,
                    "{} {{ message: {:?}, source: {:?} }}",
                    TYPE_NAME, m, s.source
                ),
                None => write!(f, "{} {{ message: {:?} }}", TYPE_NAME, m),
            },
            None => match &self.source {
                Some(s) => match &s.prefix {
                    Some(p) => write!(
                        f,
                        "{} {{ prefix: {:?}, source: {:?} }}",
                        TYPE_NAME, p, s.source
                    ),
                    None => write!(f, "{} {{ source: {:?} }}", TYPE_NAME, s.source),
                },
                None => write!(f, "{}", TYPE_NAME),
            },
        }
    }
}
