//! Common set of basic errors used throughout the library.
//!
//! The errors in this module are intended to be used by themselves or as part of a more complex
//! error `enum`, such as [`ProfileStoreError`](crate::modules::profile::ProfileStoreError).
//!
//! # Examples
//!
//! ## Returning an Error from a Function
//!
//! A function may return an error such as `InternalError` by itself.
//!
//! ```
//! use std::fs;
//!
//! use profile_store::modules::error::InternalError;
//!
//! fn check_path(path: &str) -> Result<bool, InternalError> {
//!     let metadata = fs::metadata(path).map_err(|e| InternalError::from_source(Box::new(e)))?;
//!     Ok(metadata.is_file())
//! }
//! ```
//!
//! ## Constructing Complex Errors
//!
//! Errors such as `InternalError` may be used to construct more complicated errors by defining
//! an `enum`.
//!
//! ```
//! use std::error;
//! use std::fmt;
//!
//! use profile_store::modules::error::{ConstraintViolationError, InternalError};
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Internal(InternalError),
//!     ConstraintViolation(ConstraintViolationError),
//! }
//!
//! impl error::Error for MyError {}
//!
//! impl fmt::Display for MyError {
//!     fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
//!         match self {
//!             MyError::Internal(e) => write!(f, "{}", e),
//!             MyError::ConstraintViolation(e) => write!(f, "{}", e),
//!         }
//!     }
//! }
//! ```

mod constraint_violation;
mod internal;
mod invalid_state;

pub use constraint_violation::{ConstraintViolationError, ConstraintViolationType};
pub use internal::InternalError;
pub use invalid_state::InvalidStateError;
