//! # plancraft-error
//!
//! Unified error handling for plancraft, in the style of OpenDAL's errors.
//!
//! - **ErrorKind**: what went wrong (e.g. `FileNotFound`, `InferenceFailed`)
//! - **ErrorStatus**: whether trying again could help
//! - **Context**: key-value pairs that locate the failure
//! - **Source**: the wrapped underlying error, never leaked as a raw type
//!
//! ## Usage
//!
//! ```rust
//! use plancraft_error::{Error, ErrorKind};
//!
//! fn load() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::FileNotFound, "plan file does not exist")
//!         .with_operation("plan::load")
//!         .with_context("path", "plans/implementation_plan_20250101_120000.md"))
//! }
//! ```
//!
//! Every library function returns `plancraft_error::Result<T>`. An error is
//! handled once; callers further up only append context.

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using the plancraft Error
pub type Result<T> = std::result::Result<T, Error>;
