//! API endpoint handlers.
//!
//! Handlers reuse the repository and lifecycle functions the pipeline uses.

pub mod artifacts;
pub mod events;
pub mod health;
pub mod metrics;
pub mod runs;
pub mod traces;
