use std::error;
use std::fmt;

/// Returned when a value is assembled from parts that leave it incomplete, such as a
/// [`ProfileBuilder`](crate::modules::profile::ProfileBuilder) that was never given a login.
///
/// It points at the caller, not at storage: retrying the same call cannot succeed.
#[derive(Debug)]
pub struct InvalidStateError {
    message: String,
}

impl InvalidStateError {
    /// ```
    /// use profile_store::modules::error::InvalidStateError;
    ///
    /// let err = InvalidStateError::with_message("profile store is closed".to_string());
    /// assert_eq!(err.to_string(), "profile store is closed");
    /// ```
    pub fn with_message(message: String) -> Self {
        Self { message }
    }

    /// A required `field` of `target` was never set.
    ///
    /// ```
    /// use profile_store::modules::error::InvalidStateError;
    ///
    /// let err = InvalidStateError::missing_field("Profile", "login");
    /// assert_eq!(err.to_string(), "Cannot build Profile: login is required");
    /// ```
    pub fn missing_field(target: &str, field: &str) -> Self {
        Self::with_message(format!("Cannot build {}: {} is required", target, field))
    }
}

impl error::Error for InvalidStateError {}

impl fmt::Display for InvalidStateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.message)
    }
}
