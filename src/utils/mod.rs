//! Generic utility primitives with zero domain knowledge.
//!
//! - `io` - File I/O with consistent error handling
//! - `paths` - Lexical path normalization and `~` expansion
//! - `validation` - Attribute validation helpers

pub mod io;
pub mod paths;
pub mod validation;
