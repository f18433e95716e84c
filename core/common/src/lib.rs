//! Common utilities and types shared across the Firewood Bank core crates.
//!
//! This module provides the error taxonomy and the identifier, actor and
//! entity-kind types every other crate builds on.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Actor, EntityId, EntityKind, Role, Timestamp};
