//! Error handling for CRN transcoding
//!
//! This module re-exports the error types defined in `common`. It uses
//! thiserror for ergonomic error handling and maps each structural failure
//! class onto its own variant.

pub use crate::common::CrndError;
pub use crate::common::Result;
