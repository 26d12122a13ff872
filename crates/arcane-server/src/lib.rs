//! Arcane Server - SpacetimeDB Module
//!
//! Authoritative storage for exploration maps. Generation and access rules
//! live in arcane-logic; this module only maps them onto tables and
//! reducers.

mod reducers;
mod store;
mod tables;

pub use reducers::*;
pub use tables::*;
