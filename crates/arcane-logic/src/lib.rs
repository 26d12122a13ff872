//! Exploration map logic for Arcane.
//!
//! This crate contains the map generator and the access rules around it,
//! independent of any database, engine, or runtime. The same code produces a
//! client-side preview and the authoritative server copy, so a seeded run is
//! reproducible everywhere.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Generation limits and node type weights |
//! | [`error`] | Error taxonomy with stable machine-readable kinds |
//! | [`generator`] | Level-by-level procedural map generation |
//! | [`lane`] | Three-lane coordinate space and legal transitions |
//! | [`map`] | Index-based graph model, adjacency and traversal |
//! | [`node_type`] | Probabilistic node roles and the actions they offer |
//! | [`random`] | Injected randomness capability and seeded sources |
//! | [`records`] | Flat node/path records and rehydration |
//! | [`response`] | Serializable response shapes for callers |
//! | [`service`] | Owner-scoped generate / fetch / visit operations |
//! | [`store`] | Persistence contract and the in-memory store |
//! | [`validate`] | Structural invariant checks for a generated map |
//!
//! ```
//! use arcane_logic::generator::MapGenerator;
//! use arcane_logic::random::seeded_source;
//! use arcane_logic::validate::check_invariants;
//!
//! let mut rng = seeded_source(42);
//! let map = MapGenerator::default().generate(5, &mut rng).unwrap();
//! assert!(check_invariants(&map).is_empty());
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod lane;
pub mod map;
pub mod node_type;
pub mod random;
pub mod records;
pub mod response;
pub mod service;
pub mod store;
pub mod validate;
