//! Arcane Headless Map Harness
//!
//! Sweeps the generator and the map service across depths and seeds without
//! SpacetimeDB. Runs entirely in-process: no DB, no networking.
//!
//! Usage:
//!   cargo run -p arcane-simtest
//!   cargo run -p arcane-simtest -- --verbose
//!   cargo run -p arcane-simtest -- --json <max_level> <seed>

use arcane_logic::config::GenerationConfig;
use arcane_logic::error::ErrorKind;
use arcane_logic::generator::MapGenerator;
use arcane_logic::map::{ExplorationMap, OwnerId, TypeCounts};
use arcane_logic::node_type::{NodeAction, NodeType};
use arcane_logic::random::{seeded_source, RandomSource};
use arcane_logic::records::{flatten, rehydrate};
use arcane_logic::response::MapResponse;
use arcane_logic::service::MapService;
use arcane_logic::store::MemoryStore;
use arcane_logic::validate::check_invariants;
use serde::Serialize;

// ── Generation config (same JSON the server is seeded from) ─────────────
const CONFIG_JSON: &str = include_str!("../../../data/generation_config.json");

const SEEDS_PER_DEPTH: u64 = 64;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

#[derive(Serialize)]
struct MapDump {
    max_level: u32,
    seed: u64,
    counts: TypeCounts,
    map: MapResponse,
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().position(|a| a == "--json") {
        std::process::exit(dump_map(&args[pos + 1..]));
    }

    let verbose = args.iter().any(|a| a == "--verbose");
    println!("=== Arcane Map Harness ===\n");

    let mut results = Vec::new();

    // 1. Config file
    let config = match load_config(&mut results) {
        Some(c) => c,
        None => {
            report(&results, verbose);
            std::process::exit(1);
        }
    };

    // 2. Structural invariants over the whole depth range
    results.extend(validate_invariant_sweep(&config, verbose));

    // 3. Seed reproducibility
    results.extend(validate_determinism(&config, verbose));

    // 4. Flatten / rehydrate fidelity
    results.extend(validate_round_trip(&config, verbose));

    // 5. Node role distribution
    results.extend(validate_type_distribution(&config, verbose));

    // 6. Service access rules
    results.extend(validate_service_rules(&config, verbose));

    // 7. Random walks start → end
    results.extend(validate_random_walks(&config, verbose));

    // 8. Store snapshots
    results.extend(validate_snapshots(&config, verbose));

    // 9. Node actions
    results.extend(validate_node_actions(verbose));

    if !report(&results, verbose) {
        std::process::exit(1);
    }
}

/// Print the summary. Returns whether everything passed.
fn report(results: &[TestResult], verbose: bool) -> bool {
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );
    failed == 0
}

// ── --json mode ─────────────────────────────────────────────────────────

fn dump_map(args: &[String]) -> i32 {
    let parsed = match args {
        [level, seed, ..] => level.parse::<u32>().ok().zip(seed.parse::<u64>().ok()),
        _ => None,
    };
    let Some((max_level, seed)) = parsed else {
        eprintln!("usage: arcane-simtest --json <max_level> <seed>");
        return 2;
    };
    let config: GenerationConfig = serde_json::from_str(CONFIG_JSON).unwrap_or_default();

    let owner = OwnerId::from("simtest");
    let mut service = MapService::new(MemoryStore::new(), config);
    let result = service
        .generate_map(max_level, &owner, &mut seeded_source(seed))
        .and_then(|id| {
            let map = service.load_map(&id, &owner)?;
            let response = service.map_response(&id, &owner)?;
            Ok((map, response))
        });
    let (map, response) = match result {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error ({}): {}", e.kind(), e);
            return 1;
        }
    };

    let dump = MapDump {
        max_level,
        seed,
        counts: map.type_counts(),
        map: response,
    };
    match serde_json::to_string_pretty(&dump) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("failed to encode map: {}", e);
            1
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn depths(config: &GenerationConfig) -> std::ops::RangeInclusive<u32> {
    config.min_level..=config.max_level
}

/// Every (depth, seed) pair of the sweep, generated once.
fn sweep(config: &GenerationConfig) -> Vec<(u32, u64, ExplorationMap)> {
    let generator = MapGenerator::new(config.clone());
    let mut maps = Vec::new();
    for depth in depths(config) {
        for seed in 0..SEEDS_PER_DEPTH {
            let seed = seed * 7919 + depth as u64;
            match generator.generate(depth, &mut seeded_source(seed)) {
                Ok(map) => maps.push((depth, seed, map)),
                Err(e) => eprintln!("  generation failed at depth {} seed {}: {}", depth, seed, e),
            }
        }
    }
    maps
}

fn expected_runs(config: &GenerationConfig) -> usize {
    depths(config).count() * SEEDS_PER_DEPTH as usize
}

// ── 1. Config ───────────────────────────────────────────────────────────

fn load_config(results: &mut Vec<TestResult>) -> Option<GenerationConfig> {
    println!("--- Generation Config ---");
    let config: GenerationConfig = match serde_json::from_str(CONFIG_JSON) {
        Ok(c) => c,
        Err(e) => {
            results.push(TestResult {
                name: "config_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return None;
        }
    };

    let errors = config.validate();
    results.push(TestResult {
        name: "config_valid".into(),
        passed: errors.is_empty(),
        detail: if errors.is_empty() {
            format!(
                "levels [{}, {}], secondary chance {}",
                config.min_level, config.max_level, config.secondary_path_chance
            )
        } else {
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        },
    });

    if errors.is_empty() {
        Some(config)
    } else {
        None
    }
}

// ── 2. Invariant sweep ──────────────────────────────────────────────────

fn validate_invariant_sweep(config: &GenerationConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Invariant Sweep ---");
    let mut results = Vec::new();
    let maps = sweep(config);

    results.push(TestResult {
        name: "sweep_all_generated".into(),
        passed: maps.len() == expected_runs(config),
        detail: format!("{}/{} maps generated", maps.len(), expected_runs(config)),
    });

    let mut broken = 0;
    for (depth, seed, map) in &maps {
        let violations = check_invariants(map);
        if !violations.is_empty() {
            broken += 1;
            if verbose {
                println!("  depth {} seed {}: {:?}", depth, seed, violations);
            }
        }
    }
    results.push(TestResult {
        name: "sweep_invariants".into(),
        passed: broken == 0,
        detail: format!("{} of {} maps violate an invariant", broken, maps.len()),
    });

    let wrong_depth = maps
        .iter()
        .filter(|(depth, _, map)| map.max_level() != *depth)
        .count();
    results.push(TestResult {
        name: "sweep_depth_matches_request".into(),
        passed: wrong_depth == 0,
        detail: format!("{} maps with unexpected depth", wrong_depth),
    });

    let (smallest, largest) = maps
        .iter()
        .map(|(_, _, m)| m.node_count())
        .fold((usize::MAX, 0), |(lo, hi), n| (lo.min(n), hi.max(n)));
    if verbose {
        println!("  node counts range {}..={}", smallest, largest);
    }

    let rejected = MapGenerator::new(config.clone())
        .generate(1, &mut seeded_source(0))
        .is_err();
    results.push(TestResult {
        name: "sweep_rejects_depth_1".into(),
        passed: rejected,
        detail: "depth 1 is not generatable".into(),
    });

    results
}

// ── 3. Determinism ──────────────────────────────────────────────────────

fn validate_determinism(config: &GenerationConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Determinism ---");
    let mut results = Vec::new();
    let generator = MapGenerator::new(config.clone());

    let mut mismatches = 0;
    let mut checked = 0;
    for depth in depths(config) {
        for seed in 0..16 {
            let a = generator.generate(depth, &mut seeded_source(seed));
            let b = generator.generate(depth, &mut seeded_source(seed));
            checked += 1;
            match (a, b) {
                (Ok(a), Ok(b)) if a == b => {}
                _ => {
                    mismatches += 1;
                    if verbose {
                        println!("  depth {} seed {} is not reproducible", depth, seed);
                    }
                }
            }
        }
    }
    results.push(TestResult {
        name: "same_seed_same_map".into(),
        passed: mismatches == 0,
        detail: format!("{} of {} seed replays differ", mismatches, checked),
    });

    let mut ids: Vec<String> = (0..64)
        .filter_map(|seed| generator.generate(5, &mut seeded_source(seed)).ok())
        .map(|m| m.id().0.clone())
        .collect();
    let total = ids.len();
    ids.sort();
    ids.dedup();
    results.push(TestResult {
        name: "map_ids_distinct".into(),
        passed: ids.len() == total && total == 64,
        detail: format!("{} distinct ids from {} seeds", ids.len(), total),
    });

    results
}

// ── 4. Round trip ───────────────────────────────────────────────────────

fn validate_round_trip(config: &GenerationConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Round Trip ---");
    let mut results = Vec::new();
    let maps = sweep(config);

    let mut lossy = 0;
    for (depth, seed, map) in &maps {
        let records = flatten(map);
        let same = records.nodes.len() == map.node_count()
            && records.paths.len() == map.path_count()
            && rehydrate(records.max_level, &records.nodes, &records.paths).ok().as_ref() == Some(map);
        if !same {
            lossy += 1;
            if verbose {
                println!("  depth {} seed {} does not survive flatten/rehydrate", depth, seed);
            }
        }
    }
    results.push(TestResult {
        name: "flatten_rehydrate_identity".into(),
        passed: lossy == 0,
        detail: format!("{} of {} maps changed after a round trip", lossy, maps.len()),
    });

    results
}

// ── 5. Type distribution ────────────────────────────────────────────────

fn validate_type_distribution(config: &GenerationConfig, _verbose: bool) -> Vec<TestResult> {
    println!("--- Node Roles ---");
    let mut results = Vec::new();
    let maps = sweep(config);

    let mut total = TypeCounts::default();
    for (_, _, map) in &maps {
        let c = map.type_counts();
        // Endpoints are always Basic and are not drawn.
        total.basic += c.basic - 2;
        total.battle += c.battle;
        total.safe_haven += c.safe_haven;
    }
    let interior = (total.basic + total.battle + total.safe_haven) as f64;
    let battle = total.battle as f64 / interior;
    let haven = total.safe_haven as f64 / interior;
    let weights = config.node_weights;

    results.push(TestResult {
        name: "battle_ratio".into(),
        passed: (battle - weights.battle).abs() < 0.05,
        detail: format!("{:.3} observed, {:.3} configured", battle, weights.battle),
    });
    results.push(TestResult {
        name: "safe_haven_ratio".into(),
        passed: (haven - weights.safe_haven).abs() < 0.03,
        detail: format!("{:.3} observed, {:.3} configured", haven, weights.safe_haven),
    });

    let bad_endpoints = maps
        .iter()
        .filter(|(_, _, m)| {
            [m.start(), m.end()]
                .iter()
                .any(|e| e.map(|i| m.node(i).node_type()) != Some(NodeType::Basic))
        })
        .count();
    results.push(TestResult {
        name: "endpoints_basic".into(),
        passed: bad_endpoints == 0,
        detail: format!("{} maps with a non-Basic endpoint", bad_endpoints),
    });

    results
}

// ── 6. Service rules ────────────────────────────────────────────────────

fn validate_service_rules(config: &GenerationConfig, _verbose: bool) -> Vec<TestResult> {
    println!("--- Service Rules ---");
    let mut results = Vec::new();
    let alice = OwnerId::from("alice");
    let bob = OwnerId::from("bob");
    let mut service = MapService::new(MemoryStore::new(), config.clone());

    let below = service.generate_map(config.min_level.saturating_sub(1), &alice, &mut seeded_source(1));
    let above = service.generate_map(config.max_level + 1, &alice, &mut seeded_source(1));
    let both_invalid = [below, above]
        .iter()
        .all(|r| matches!(r, Err(e) if e.kind() == ErrorKind::InvalidParameter));
    results.push(TestResult {
        name: "policy_bounds_enforced".into(),
        passed: both_invalid && service.store().map_count() == 0,
        detail: format!(
            "depths outside [{}, {}] rejected, nothing stored",
            config.min_level, config.max_level
        ),
    });

    let (first, second) = match (
        service.generate_map(config.max_level, &alice, &mut seeded_source(2)),
        service.generate_map(config.min_level, &alice, &mut seeded_source(3)),
    ) {
        (Ok(a), Ok(b)) => (a, b),
        _ => {
            results.push(TestResult {
                name: "service_generate".into(),
                passed: false,
                detail: "could not generate maps in policy range".into(),
            });
            return results;
        }
    };

    let hidden = matches!(service.get_map_nodes(&first, &bob), Err(e) if e.kind() == ErrorKind::NotFound);
    results.push(TestResult {
        name: "owner_isolation_read".into(),
        passed: hidden,
        detail: "foreign owner gets NotFound".into(),
    });

    let nodes = service.get_map_nodes(&first, &alice).unwrap_or_default();
    let Some(target) = nodes.iter().find(|n| !n.visited).map(|n| n.id) else {
        results.push(TestResult {
            name: "service_nodes".into(),
            passed: false,
            detail: "map has no unvisited node".into(),
        });
        return results;
    };

    let foreign_write = matches!(service.mark_node_visited(target, &bob), Err(e) if e.kind() == ErrorKind::NotFound);
    results.push(TestResult {
        name: "owner_isolation_write".into(),
        passed: foreign_write,
        detail: "foreign owner cannot mark visited".into(),
    });

    let twice = service.mark_node_visited(target, &alice).is_ok()
        && service.mark_node_visited(target, &alice).is_ok();
    let still_visited = service
        .get_map_nodes(&first, &alice)
        .map(|ns| ns.iter().any(|n| n.id == target && n.visited))
        .unwrap_or(false);
    results.push(TestResult {
        name: "visit_idempotent".into(),
        passed: twice && still_visited,
        detail: format!("node {} visited twice without error", target),
    });

    let mismatch = matches!(
        service.visit_node(&second, target, &alice),
        Err(e) if e.kind() == ErrorKind::OwnershipMismatch
    );
    results.push(TestResult {
        name: "visit_wrong_map".into(),
        passed: mismatch,
        detail: "node from another map is an ownership mismatch".into(),
    });

    results
}

// ── 7. Random walks ─────────────────────────────────────────────────────

fn validate_random_walks(config: &GenerationConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Random Walks ---");
    let mut results = Vec::new();
    let owner = OwnerId::from("walker");
    let mut service = MapService::new(MemoryStore::new(), config.clone());

    let mut failures = 0;
    let mut walks = 0;
    for depth in depths(config) {
        for seed in 0..8 {
            walks += 1;
            match walk(&mut service, &owner, depth, seed) {
                Ok(()) => {}
                Err(reason) => {
                    failures += 1;
                    if verbose {
                        println!("  depth {} seed {}: {}", depth, seed, reason);
                    }
                }
            }
        }
    }
    results.push(TestResult {
        name: "walk_start_to_end".into(),
        passed: failures == 0,
        detail: format!("{} of {} walks failed", failures, walks),
    });

    results
}

/// Generate a map, then follow random outgoing paths to the end, visiting
/// each node through the service.
fn walk(
    service: &mut MapService<MemoryStore>,
    owner: &OwnerId,
    depth: u32,
    seed: u64,
) -> Result<(), String> {
    let map_id = service
        .generate_map(depth, owner, &mut seeded_source(seed))
        .map_err(|e| e.to_string())?;
    let map = service.load_map(&map_id, owner).map_err(|e| e.to_string())?;
    let nodes = service.get_map_nodes(&map_id, owner).map_err(|e| e.to_string())?;
    let mut rng = seeded_source(seed ^ 0x5eed);

    let mut current = map.start().ok_or("no start node")?;
    let mut steps = 0;
    while map.node(current).level() < map.max_level() {
        let choices = map.next_choices(current);
        if choices.is_empty() {
            return Err(format!("stuck at {}", map.node(current).coord()));
        }
        let next = choices[rng.next_index(choices.len())];
        if !map.can_advance(current, next) {
            return Err("offered a move without a path".into());
        }
        let coord = map.node(next).coord();
        let id = nodes
            .iter()
            .find(|n| n.coord() == coord)
            .map(|n| n.id)
            .ok_or("node missing from store")?;
        service
            .visit_node(&map_id, id, owner)
            .map_err(|e| e.to_string())?;
        current = next;
        steps += 1;
    }
    if steps != depth {
        return Err(format!("reached the end in {} steps", steps));
    }

    let visited = service
        .get_map_nodes(&map_id, owner)
        .map_err(|e| e.to_string())?
        .iter()
        .filter(|n| n.visited)
        .count();
    if visited != depth as usize + 1 {
        return Err(format!("{} nodes visited after {} steps", visited, steps));
    }
    Ok(())
}

// ── 8. Snapshots ────────────────────────────────────────────────────────

fn validate_snapshots(config: &GenerationConfig, _verbose: bool) -> Vec<TestResult> {
    println!("--- Snapshots ---");
    let mut results = Vec::new();
    let owner = OwnerId::from("saver");
    let mut service = MapService::new(MemoryStore::new(), config.clone());

    let mut ids = Vec::new();
    for seed in 0..4 {
        if let Ok(id) = service.generate_map(config.max_level, &owner, &mut seeded_source(seed)) {
            ids.push(id);
        }
    }

    let mut bytes = Vec::new();
    let saved = service.store().save(&mut bytes);
    let restored = saved.and_then(|()| MemoryStore::load(bytes.as_slice()));
    let Ok(restored) = restored else {
        results.push(TestResult {
            name: "snapshot_roundtrip".into(),
            passed: false,
            detail: "save or load failed".into(),
        });
        return results;
    };

    let reloaded = MapService::new(restored, config.clone());
    let identical = ids.iter().all(|id| {
        match (service.load_map(id, &owner), reloaded.load_map(id, &owner)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    });
    results.push(TestResult {
        name: "snapshot_roundtrip".into(),
        passed: identical && ids.len() == 4,
        detail: format!("{} maps, {} bytes", ids.len(), bytes.len()),
    });

    results
}

// ── 9. Node actions ─────────────────────────────────────────────────────

fn validate_node_actions(_verbose: bool) -> Vec<TestResult> {
    println!("--- Node Actions ---");
    let mut results = Vec::new();

    results.push(TestResult {
        name: "basic_has_no_actions".into(),
        passed: NodeType::Basic.actions().is_empty(),
        detail: format!("{:?}", NodeType::Basic.actions()),
    });
    results.push(TestResult {
        name: "battle_actions".into(),
        passed: NodeType::Battle.actions() == [NodeAction::Fight, NodeAction::Sneak],
        detail: format!("{:?}", NodeType::Battle.actions()),
    });
    results.push(TestResult {
        name: "safe_haven_actions".into(),
        passed: NodeType::SafeHaven.actions() == [NodeAction::Build, NodeAction::DoNothing],
        detail: format!("{:?}", NodeType::SafeHaven.actions()),
    });
    results.push(TestResult {
        name: "fight_defers_visit".into(),
        passed: !NodeAction::Fight.completes_visit() && NodeAction::Sneak.completes_visit(),
        detail: "only Fight leaves the node unvisited".into(),
    });

    results
}
