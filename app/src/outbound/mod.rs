//! Outbound adapters implementing the domain ports.
//!
//! - **memory**: in-process identity service and live note store that behave
//!   like the managed services' local emulators
//!
//! Adapters translate between domain types and the service's representation.
//! They hold no application state beyond what the service itself would keep.

pub mod memory;
