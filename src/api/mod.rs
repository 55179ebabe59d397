//! HTTP surface: run lifecycle operations, artifact and trace queries,
//! upload-event ingest and pipeline counters.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;
