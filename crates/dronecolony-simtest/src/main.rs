//! DroneColony Headless Simulation Harness
//!
//! Runs seeded scenarios against the simulation engine and checks the
//! invariants a full game relies on. Entirely in-process, nothing rendered.
//!
//! Usage:
//!   cargo run -p dronecolony-simtest
//!   cargo run -p dronecolony-simtest -- --verbose --seed 42
//!   cargo run -p dronecolony-simtest -- --json

use dronecolony_core::config::SimConfig;
use dronecolony_core::engine::SimulationEngine;
use dronecolony_core::prelude::*;
use dronecolony_core::result::SimResult;
use dronecolony_logic::creeps::{frag_score, CRAWLER, DOMINATOR, WANDERER};
use dronecolony_logic::economy::{upkeep_price, unit_limit, MAX_UPKEEP_VALUE};
use dronecolony_logic::faction::FactionTag;
use dronecolony_logic::merge::RECIPES;
use dronecolony_logic::stats::{agent_stats, AgentKind, ARK_CORE, DEN_CORE};
use dronecolony_logic::weights::WeightContainer;

const STEP: f64 = 0.1;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn new(name: &str, passed: bool, detail: String) -> Self {
        Self {
            name: name.into(),
            passed,
            detail,
        }
    }
}

struct Options {
    verbose: bool,
    json: bool,
    seed: u64,
}

fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut options = Options {
        verbose: false,
        json: false,
        seed: 42,
    };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--verbose" | "-v" => options.verbose = true,
            "--json" => options.json = true,
            "--seed" => {
                i += 1;
                match args.get(i).and_then(|s| s.parse().ok()) {
                    Some(seed) => options.seed = seed,
                    None => eprintln!("--seed expects an integer, keeping {}", options.seed),
                }
            }
            other => eprintln!("ignoring unknown argument {}", other),
        }
        i += 1;
    }
    options
}

fn main() {
    let options = parse_args();
    let default_filter = if options.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    println!("=== DroneColony Simulation Harness (seed {}) ===\n", options.seed);

    let mut results = Vec::new();

    // 1. Configuration loading
    log::info!("checking configuration");
    results.extend(validate_config());

    // 2. Static tables
    log::info!("checking static tables");
    results.extend(validate_tables(options.verbose));

    // 3. Wave generator
    log::info!("checking wave generator");
    results.extend(validate_arena(options.seed));

    // 4. Colony economy in peace
    log::info!("running peaceful economy");
    let (economy, peaceful) = validate_economy(options.seed, options.verbose);
    results.extend(economy);

    // 5. Full battle run
    log::info!("running battle");
    let (battle, fought) = validate_battle(options.seed, options.verbose);
    results.extend(battle);

    // 6. Determinism
    log::info!("checking determinism");
    results.extend(validate_determinism(options.seed));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || options.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    if options.json {
        let dump = serde_json::json!({
            "seed": options.seed,
            "passed": passed,
            "failed": failed,
            "peaceful": peaceful,
            "battle": fought,
        });
        match serde_json::to_string_pretty(&dump) {
            Ok(text) => println!("\n{}", text),
            Err(e) => eprintln!("failed to encode results: {}", e),
        }
    }

    println!("\n=== RESULT: {}/{} passed, {} failed ===", passed, total, failed);

    if failed > 0 {
        log::warn!("{} checks failed", failed);
        std::process::exit(1);
    }
}

/// Step `engine` for `seconds`, optionally removing every creep after each tick.
fn run(engine: &mut SimulationEngine, seconds: f64, peaceful: bool) {
    let mut elapsed = 0.0;
    while elapsed < seconds && !engine.is_finished() {
        engine.update(STEP);
        if peaceful {
            let ctx = engine.context_mut();
            for e in ctx.creep_entities() {
                let _ = ctx.world.despawn(e);
            }
        }
        elapsed += STEP;
    }
}

/// Problems found in the live colonies; empty when everything holds.
fn colony_problems(engine: &SimulationEngine) -> Vec<String> {
    let mut problems = Vec::new();
    for colony in engine.colonies().iter().filter(|c| !c.disposed) {
        let total: f64 = ColonyPriority::ALL.iter().map(|&p| colony.priority(p)).sum();
        if (total - 1.0).abs() > 1e-6 {
            problems.push(format!("colony {} priorities sum to {:.4}", colony.id.0, total));
        }
        if colony.resources < 0.0 {
            problems.push(format!("colony {} resources {:.2}", colony.id.0, colony.resources));
        }
        if colony.health > colony.max_health {
            problems.push(format!("colony {} overhealed", colony.id.0));
        }
    }
    for (_, a) in engine.context().world.query::<&Agent>().iter() {
        if a.health > a.max_health + 1e-9 {
            problems.push(format!("{:?} overhealed", a.kind()));
        }
    }
    problems
}

// ── 1. Configuration ────────────────────────────────────────────────────

fn validate_config() -> Vec<TestResult> {
    println!("--- Configuration ---");
    let mut results = Vec::new();

    let defaults = SimConfig::default().validate();
    results.push(TestResult::new(
        "config_defaults_valid",
        defaults.is_empty(),
        format!("{} problems in the default config", defaults.len()),
    ));

    let partial = SimConfig::load(r#"{"seed": 5, "colony_count": 2}"#);
    results.push(TestResult::new(
        "config_partial_json",
        partial.as_ref().map_or(false, |c| c.colony_count == 2 && c.last_level == 20),
        match &partial {
            Ok(c) => format!("seed {} with {} colonies", c.seed, c.colony_count),
            Err(e) => e.to_string(),
        },
    ));

    let invalid = SimulationEngine::from_json(r#"{"map_width": 10, "colony_count": 9}"#);
    results.push(TestResult::new(
        "config_invalid_rejected",
        invalid.is_err(),
        match invalid {
            Ok(_) => "engine accepted an invalid config".into(),
            Err(e) => e.to_string(),
        },
    ));

    results
}

// ── 2. Static tables ────────────────────────────────────────────────────

fn validate_tables(verbose: bool) -> Vec<TestResult> {
    println!("--- Static Tables ---");
    let mut results = Vec::new();

    let unreachable: Vec<AgentKind> = AgentKind::ALL
        .iter()
        .copied()
        .filter(|&k| {
            let stats = agent_stats(k);
            stats.tier == 2 && !stats.is_turret && !RECIPES.iter().any(|r| r.result == k)
        })
        .collect();
    results.push(TestResult::new(
        "tables_merge_tree_complete",
        unreachable.is_empty(),
        if unreachable.is_empty() {
            format!("{} recipes cover every tier-2 drone", RECIPES.len())
        } else {
            format!("no recipe for {:?}", unreachable)
        },
    ));

    let monotonic = (0..MAX_UPKEEP_VALUE + 10).all(|v| upkeep_price(v) <= upkeep_price(v + 1));
    results.push(TestResult::new(
        "tables_upkeep_monotonic",
        monotonic,
        format!("upkeep price 0..{} never decreases", MAX_UPKEEP_VALUE + 10),
    ));

    let limits_ok = [&DEN_CORE, &ARK_CORE].iter().all(|core| {
        [96.0, 128.0, 400.0, 5000.0].iter().all(|&r| {
            let limit = unit_limit(r, 1.0, core.drone_limit);
            (10..=core.drone_limit).contains(&limit)
        })
    });
    results.push(TestResult::new(
        "tables_unit_limit_bounds",
        limits_ok,
        format!("den {} / ark {} drones max", DEN_CORE.drone_limit, ARK_CORE.drone_limit),
    ));

    let pricing = frag_score(&CRAWLER) < frag_score(&WANDERER) && frag_score(&WANDERER) < frag_score(&DOMINATOR);
    results.push(TestResult::new(
        "tables_creep_pricing",
        pricing,
        format!(
            "crawler {} < wanderer {} < dominator {}",
            frag_score(&CRAWLER),
            frag_score(&WANDERER),
            frag_score(&DOMINATOR)
        ),
    ));

    let mut weights = WeightContainer::new(&FactionTag::ALL);
    weights.set_weight(FactionTag::Neutral, 1.0);
    for tag in FactionTag::ALL {
        weights.add_weight(tag, 0.1);
    }
    results.push(TestResult::new(
        "tables_weights_normalized",
        (weights.total() - 1.0).abs() < 1e-9,
        format!("faction weights sum to {:.6}", weights.total()),
    ));

    if verbose {
        println!("  Drone costs:");
        for kind in AgentKind::ALL {
            let stats = agent_stats(kind);
            println!("    {:14} tier {} cost {:5.1} upkeep {}", format!("{:?}", kind), stats.tier, stats.cost, stats.upkeep);
        }
    }

    results
}

// ── 3. Wave generator ───────────────────────────────────────────────────

fn validate_arena(seed: u64) -> Vec<TestResult> {
    println!("--- Wave Generator ---");
    let mut results = Vec::new();

    let engine = SimulationEngine::new(SimConfig {
        seed,
        ..SimConfig::default()
    });
    let Ok(mut engine) = engine else {
        results.push(TestResult::new("arena_setup", false, "engine rejected the default config".into()));
        return results;
    };
    results.push(TestResult::new(
        "arena_first_budget",
        engine.arena().wave_budget() == 25,
        format!("level 1 budget {}", engine.arena().wave_budget()),
    ));

    let mut infinite = match SimulationEngine::new(SimConfig {
        seed,
        infinite_arena: true,
        ..SimConfig::default()
    }) {
        Ok(e) => e,
        Err(e) => {
            results.push(TestResult::new("arena_setup", false, e.to_string()));
            return results;
        }
    };
    let mut budgets = vec![infinite.arena().wave_budget()];
    let mut non_decreasing = true;
    while infinite.arena().level() < 25 && infinite.time() < 6000.0 {
        run(&mut infinite, 30.0, true);
        let budget = infinite.arena().wave_budget();
        if budget < *budgets.last().unwrap_or(&0) {
            non_decreasing = false;
        }
        if budgets.last() != Some(&budget) {
            budgets.push(budget);
        }
    }
    results.push(TestResult::new(
        "arena_budget_non_decreasing",
        non_decreasing,
        format!("budgets {:?}", budgets),
    ));
    results.push(TestResult::new(
        "arena_infinite_not_terminal",
        !infinite.is_finished() && infinite.arena().level() >= 20,
        format!("level {} after {:.0}s", infinite.arena().level(), infinite.time()),
    ));

    run(&mut engine, 5.0 * 3600.0, true);
    results.push(TestResult::new(
        "arena_finite_victory",
        engine.result().victory && engine.result().waves_spawned == engine.config().last_level,
        format!(
            "victory {} after {} waves at {:.0}s",
            engine.result().victory,
            engine.result().waves_spawned,
            engine.time()
        ),
    ));

    results
}

// ── 4. Colony economy ───────────────────────────────────────────────────

fn validate_economy(seed: u64, verbose: bool) -> (Vec<TestResult>, Option<SimResult>) {
    println!("--- Colony Economy ---");
    let mut results = Vec::new();

    let mut engine = match SimulationEngine::new(SimConfig {
        seed,
        starting_resources: 100.0,
        neutral_buildings: 2,
        ..SimConfig::default()
    }) {
        Ok(e) => e,
        Err(e) => {
            results.push(TestResult::new("economy_setup", false, e.to_string()));
            return (results, None);
        }
    };
    let starting_agents = engine.agent_count();
    run(&mut engine, 300.0, true);

    let result = engine.result().clone();
    results.push(TestResult::new(
        "economy_mining",
        result.resources_gathered > 0.0,
        format!("{:.1} resources gathered", result.resources_gathered),
    ));
    results.push(TestResult::new(
        "economy_growth",
        engine.agent_count() > starting_agents,
        format!("{} -> {} agents, {} produced", starting_agents, engine.agent_count(), result.drones_produced),
    ));
    let problems = colony_problems(&engine);
    results.push(TestResult::new(
        "economy_invariants",
        problems.is_empty(),
        if problems.is_empty() {
            "priorities normalized, no overspend".into()
        } else {
            problems.join("; ")
        },
    ));

    if verbose {
        for colony in engine.colonies() {
            println!(
                "  colony {}: {:.1} resources, {:.1} evo, {} units",
                colony.id.0,
                colony.resources,
                colony.evo_points,
                colony.total_units()
            );
        }
    }

    (results, Some(result))
}

// ── 5. Battle ───────────────────────────────────────────────────────────

fn validate_battle(seed: u64, verbose: bool) -> (Vec<TestResult>, Option<SimResult>) {
    println!("--- Battle ---");
    let mut results = Vec::new();

    let mut engine = match SimulationEngine::new(SimConfig {
        seed,
        colony_count: 2,
        teleporter_pairs: 1,
        constructions: 2,
        ..SimConfig::default()
    }) {
        Ok(e) => e,
        Err(e) => {
            results.push(TestResult::new("battle_setup", false, e.to_string()));
            return (results, None);
        }
    };

    let mut problems = Vec::new();
    let mut elapsed = 0.0;
    while elapsed < 900.0 && !engine.is_finished() {
        run(&mut engine, 10.0, false);
        problems.extend(colony_problems(&engine));
        elapsed += 10.0;
    }

    let result = engine.result().clone();
    results.push(TestResult::new(
        "battle_waves_arrive",
        result.waves_spawned >= 3,
        format!("{} waves, {} creeps defeated", result.waves_spawned, result.creeps_defeated),
    ));
    results.push(TestResult::new(
        "battle_invariants",
        problems.is_empty(),
        if problems.is_empty() {
            format!("held for {:.0}s", engine.time())
        } else {
            problems.join("; ")
        },
    ));

    if verbose {
        println!("  {}", result.to_json().replace('\n', "\n  "));
    }

    (results, Some(result))
}

// ── 6. Determinism ──────────────────────────────────────────────────────

fn validate_determinism(seed: u64) -> Vec<TestResult> {
    println!("--- Determinism ---");
    let config = SimConfig {
        seed,
        colony_count: 2,
        ..SimConfig::default()
    };
    let outcome = |config: SimConfig| {
        SimulationEngine::new(config).ok().map(|mut engine| {
            run(&mut engine, 240.0, false);
            (engine.result().clone(), engine.agent_count(), engine.creep_count())
        })
    };
    let a = outcome(config.clone());
    let b = outcome(config);
    vec![TestResult::new(
        "determinism_same_seed",
        a.is_some() && a == b,
        match &a {
            Some((result, agents, creeps)) => format!(
                "{} agents, {} creeps, {:.1} gathered in both runs",
                agents, creeps, result.resources_gathered
            ),
            None => "engine failed to start".into(),
        },
    )]
}
