//! HTTP surface: the live items endpoint plus health and status probes.

pub mod error;
pub mod live;
pub mod middleware;
pub mod routes;
pub mod status;

pub use routes::*;
