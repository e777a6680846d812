//! incidents-core library.
//!
//! Incident model and lifecycle rules, input validation, and the
//! write-through [`store::IncidentStore`] with its JSON file backend.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums per module, each mapping to an [`error::ErrorCode`].
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod import;
pub mod lock;
pub mod model;
pub mod persist;
pub mod recovery;
pub mod store;
pub mod validate;
