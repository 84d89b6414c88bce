//! Identity resolution (record linkage for client rows).
//!
//! This crate decides, row by row, whether a set of identifying facts belongs
//! to a client seen before or to a new one. It is implemented purely as
//! deterministic domain logic (no IO, no spreadsheets).
//!
//! Resolution is online and append-only: every row commits its identifiers
//! before the next row is assessed, so row order is part of the contract.
//! A merge that later turns out to be wrong cannot be undone.

pub mod client;
pub mod filters;
pub mod identifier;
pub mod registry;
pub mod resolver;
pub mod vote;

pub use client::{
    ClientIdentity, ClientRegistry, DEFAULT_STARTING_IDNO, InMemoryRowAllocator, RowAllocator,
    RowIndex,
};
pub use filters::{NoiseFilters, NoisePredicate};
pub use identifier::{EMAIL, Identifier, PHONE};
pub use registry::{IdentifierEntry, IdentifierRegistry};
pub use resolver::{Resolution, Resolver};
pub use vote::plurality_winner;
