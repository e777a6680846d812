//! Domain model for incidents and their lifecycle.

pub mod incident;
