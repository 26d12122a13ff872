//! Client-facing reducers for generating, reading, and visiting maps.
//!
//! Failing reducers return the `ErrorResponse` JSON as their error string,
//! and SpacetimeDB discards every row they wrote.

use crate::store::{owner_id, SpacetimeStore};
use crate::tables::*;
use arcane_logic::config::{GenerationConfig, NodeTypeWeights};
use arcane_logic::error::MapError;
use arcane_logic::map::{MapId, NodeId, OwnerId};
use arcane_logic::random::seeded_source;
use arcane_logic::response::ErrorResponse;
use arcane_logic::service::MapService;
use serde::Serialize;
use spacetimedb::{reducer, Identity, ReducerContext, Table};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[reducer(init)]
pub fn init(ctx: &ReducerContext) {
    log::info!("Seeding default generation config");
    ctx.db
        .generation_config()
        .insert(config_row(&GenerationConfig::default()));
}

/// Replace the generation settings. Only the database's own identity may call
/// this, and the whole update is rejected if any field is bad.
#[reducer]
pub fn set_generation_config(
    ctx: &ReducerContext,
    min_level: u32,
    max_level: u32,
    secondary_path_chance: f64,
    battle_weight: f64,
    safe_haven_weight: f64,
) -> Result<(), String> {
    if !may_configure(ctx.sender, ctx.identity()) {
        log::warn!("Rejected generation config from {}", ctx.sender);
        return Err(format!("{} may not change the generation config", ctx.sender));
    }
    let config = GenerationConfig {
        min_level,
        max_level,
        secondary_path_chance,
        node_weights: NodeTypeWeights {
            battle: battle_weight,
            safe_haven: safe_haven_weight,
        },
    };
    let errors = config.validate();
    if !errors.is_empty() {
        let detail: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        log::warn!("Rejected generation config: {}", detail.join("; "));
        return Err(detail.join("; "));
    }

    let row = config_row(&config);
    if ctx.db.generation_config().id().find(0).is_some() {
        ctx.db.generation_config().id().update(row);
    } else {
        ctx.db.generation_config().insert(row);
    }
    log::info!(
        "Generation config set: levels [{}, {}], secondary chance {}",
        min_level,
        max_level,
        secondary_path_chance
    );
    Ok(())
}

fn may_configure(sender: Identity, module: Identity) -> bool {
    sender == module
}

fn config_row(config: &GenerationConfig) -> ConfigRow {
    ConfigRow {
        id: 0,
        min_level: config.min_level,
        max_level: config.max_level,
        secondary_path_chance: config.secondary_path_chance,
        battle_weight: config.node_weights.battle,
        safe_haven_weight: config.node_weights.safe_haven,
    }
}

fn config_from_row(row: &ConfigRow) -> GenerationConfig {
    GenerationConfig {
        min_level: row.min_level,
        max_level: row.max_level,
        secondary_path_chance: row.secondary_path_chance,
        node_weights: NodeTypeWeights {
            battle: row.battle_weight,
            safe_haven: row.safe_haven_weight,
        },
    }
}

fn load_config(ctx: &ReducerContext) -> GenerationConfig {
    ctx.db
        .generation_config()
        .id()
        .find(0)
        .map(|row| config_from_row(&row))
        .unwrap_or_default()
}

// ============================================================================
// MAP REDUCERS
// ============================================================================

/// Generate a new map for the caller and publish it to their view row.
#[reducer]
pub fn generate_exploration_map(ctx: &ReducerContext, max_level: u32) -> Result<(), String> {
    let owner = caller(ctx);
    let seed: u64 = ctx.random();
    log::info!("Generating map for {} (depth {}, seed {})", owner, max_level, seed);

    let store = SpacetimeStore::new(ctx).with_seed(seed);
    let mut service = MapService::new(store, load_config(ctx));
    let map_id = service
        .generate_map(max_level, &owner, &mut seeded_source(seed))
        .map_err(|e| error_json(&e))?;
    publish_view(ctx, &service, &map_id, &owner)
}

/// Refresh the caller's view row with one of their maps.
#[reducer]
pub fn request_exploration_map(ctx: &ReducerContext, map_id: String) -> Result<(), String> {
    let owner = caller(ctx);
    let service = MapService::new(SpacetimeStore::new(ctx), load_config(ctx));
    publish_view(ctx, &service, &MapId(map_id), &owner)
}

/// Mark a node of one of the caller's maps as visited.
#[reducer]
pub fn visit_exploration_node(
    ctx: &ReducerContext,
    map_id: String,
    node_id: u64,
) -> Result<(), String> {
    let owner = caller(ctx);
    let map_id = MapId(map_id);
    let mut service = MapService::new(SpacetimeStore::new(ctx), load_config(ctx));
    service
        .visit_node(&map_id, NodeId(node_id), &owner)
        .map_err(|e| error_json(&e))?;
    publish_view(ctx, &service, &map_id, &owner)
}

// ============================================================================
// HELPERS
// ============================================================================

fn caller(ctx: &ReducerContext) -> OwnerId {
    owner_id(ctx.sender)
}

fn publish_view(
    ctx: &ReducerContext,
    service: &MapService<SpacetimeStore<'_>>,
    map_id: &MapId,
    owner: &OwnerId,
) -> Result<(), String> {
    let response = service
        .map_response(map_id, owner)
        .map_err(|e| error_json(&e))?;
    let row = MapViewRow {
        owner: ctx.sender,
        map_id: map_id.0.clone(),
        json: to_json(&response)?,
        updated_at: ctx.timestamp,
    };
    if ctx.db.exploration_map_view().owner().find(ctx.sender).is_some() {
        ctx.db.exploration_map_view().owner().update(row);
    } else {
        ctx.db.exploration_map_view().insert(row);
    }
    Ok(())
}

fn error_json(err: &MapError) -> String {
    log::warn!("Map request failed: {}", err);
    to_json(&ErrorResponse::from(err)).unwrap_or_else(|e| e)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("failed to encode response: {}", e))
}
