//! Theme engine and template rendering.
//!
//! Provides Tera-based template rendering. Templates are built into the
//! binary and can be overridden from a directory.

mod engine;

pub use engine::{ThemeEngine, group_account_number};
