//! Registra Kernel Library
//!
//! Registration form server: a shared rule table, a validator, a per-session
//! CSRF guard, and a two-phase (validate, then confirm) submission flow.
//! The main entry point for running the server is the `registra` binary.

pub mod config;
pub mod error;
pub mod form;
pub mod routes;
pub mod session;
pub mod state;
pub mod theme;

pub use config::Config;
pub use state::AppState;
