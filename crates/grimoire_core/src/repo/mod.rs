//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Delete APIs report absence as `false`, never as an error.
//! - Repository APIs surface transport errors unchanged in `PlotRepoError::Db`.

pub mod plot_repo;
