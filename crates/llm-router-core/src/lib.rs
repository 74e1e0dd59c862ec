//! Core infrastructure for llm-router.
//!
//! This crate provides the pieces shared by every layer of the router:
//! - The error taxonomy, with per-variant retry and fallback semantics
//! - The observer-callback lists router components report events through

pub mod error;
pub mod events;

pub use error::{ConnectionKind, ErrorClass, RouterError};
pub use events::Listeners;
