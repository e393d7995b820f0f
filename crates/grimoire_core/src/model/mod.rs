//! Domain model for the grimoire → chapter → plot hierarchy.
//!
//! # Responsibility
//! - Define canonical records returned by the repository.
//! - Define request/response bodies shared by server and client.
//!
//! # Invariants
//! - Every record is identified by its composite name key.
//! - Deletion is a hard delete; there are no tombstones.

pub mod plot;
