//! QueryOptim Core - Shared error types and vocabulary
//!
//! The workbench and the CLI depend on this crate. It defines:
//!
//! - `QoptError` - The error taxonomy surfaced at the workbench boundary
//! - `Severity` - Severity of user-facing messages

mod error;
mod severity;

pub use error::*;
pub use severity::*;
