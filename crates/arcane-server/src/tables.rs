//! SpacetimeDB table definitions for exploration maps.
//!
//! Node and path rows mirror `NodeRecord` / `PathRecord` from arcane-logic.
//! Owners are the caller's `Identity`; the reducers convert to `OwnerId` at
//! the service boundary.

use spacetimedb::{client_visibility_filter, table, Filter, Identity, Timestamp};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Generation settings singleton (id always 0)
#[table(name = generation_config, public)]
#[derive(Clone)]
pub struct ConfigRow {
    #[primary_key]
    pub id: u32,
    pub min_level: u32,
    pub max_level: u32,
    pub secondary_path_chance: f64,
    pub battle_weight: f64,
    pub safe_haven_weight: f64,
}

// ============================================================================
// MAPS
// ============================================================================

/// One generated map. The seed is kept so the map can be regenerated.
#[table(name = exploration_map)]
pub struct MapRow {
    #[primary_key]
    pub map_id: String,
    #[index(btree)]
    pub owner: Identity,
    pub max_level: u32,
    pub seed: u64,
    pub created_at: Timestamp,
}

/// A node on a map
#[table(name = exploration_node)]
#[derive(Clone)]
pub struct NodeRow {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    #[index(btree)]
    pub map_id: String,
    pub owner: Identity,
    pub level: u32,
    pub lane: u8,      // Lane as u8
    pub node_type: u8, // NodeType as u8
    pub visited: bool,
}

/// A directed path between two nodes of the same map
#[table(name = exploration_path)]
#[derive(Clone)]
pub struct PathRow {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    #[index(btree)]
    pub map_id: String,
    pub from_node: u64,
    pub to_node: u64,
}

// ============================================================================
// CLIENT VIEW
// ============================================================================

/// Last map response produced for an owner, as JSON
#[table(name = exploration_map_view, public)]
pub struct MapViewRow {
    #[primary_key]
    pub owner: Identity,
    pub map_id: String,
    pub json: String,
    pub updated_at: Timestamp,
}

/// Subscribers only ever receive their own view row.
#[client_visibility_filter]
const MAP_VIEW_OWNER_ONLY: Filter =
    Filter::Sql("SELECT * FROM exploration_map_view WHERE owner = :sender");
