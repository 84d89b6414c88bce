//! `clientmerge-core`: shared domain primitives.
//!
//! This crate contains **pure domain** primitives (no IO, no spreadsheets).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ClientIdNo, DestinationId, RunId};
