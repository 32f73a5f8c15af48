//! Inbound adapters that translate user interaction into application events
//! while keeping the medium's details at the edge.
//!
//! The line-oriented terminal front end lives under [`terminal`].

pub mod terminal;
