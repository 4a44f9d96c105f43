//! Shared data model, error taxonomy, and configuration for the concierge
//! backend. Every other crate in the workspace depends on this one.

pub mod config;
pub mod error;
pub mod model;

pub use error::{Error, Result};
pub use model::*;
