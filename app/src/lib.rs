//! Notes client library: session, note feed, composer, and view wiring.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;

pub use domain::TraceId;
