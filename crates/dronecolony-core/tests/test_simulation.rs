//! Integration tests for full simulation runs.
//!
//! Exercises: SimConfig → map generation → colony planner → agent modes
//! → creeps and wave generator → events and result.
//!
//! All tests are headless, with no presentation layer.

use std::cell::RefCell;
use std::rc::Rc;

use dronecolony_core::config::SimConfig;
use dronecolony_core::events::SimEvent;
use dronecolony_core::prelude::*;
use dronecolony_core::systems::{assign_mode_to, queue_hit};
use dronecolony_core::world::{DamageSource, HitTarget};
use dronecolony_logic::stats::{DamageValue, SCOUT};

// ── Helpers ────────────────────────────────────────────────────────────

fn engine(config: SimConfig) -> SimulationEngine {
    SimulationEngine::new(config).expect("valid config")
}

/// Remove every creep so long runs are not decided by combat.
fn clear_creeps(engine: &mut SimulationEngine) {
    let ctx = engine.context_mut();
    for e in ctx.creep_entities() {
        let _ = ctx.world.despawn(e);
    }
}

fn count_events(engine: &mut SimulationEngine, pred: fn(&SimEvent) -> bool) -> Rc<RefCell<u32>> {
    let counter = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&counter);
    engine.subscribe(move |e| {
        if pred(e) {
            *sink.borrow_mut() += 1;
        }
    });
    counter
}

fn check_invariants(engine: &SimulationEngine) {
    let ctx = engine.context();
    for (_, a) in ctx.world.query::<&Agent>().iter() {
        assert!(a.health <= a.max_health + 1e-9, "{:?} overhealed", a.kind());
        assert!(a.disposed || a.health >= 0.0, "{:?} alive with negative health", a.kind());
    }
    for colony in engine.colonies() {
        let mut total = 0.0;
        for p in ColonyPriority::ALL {
            let w = colony.priority(p);
            assert!((0.0..=1.0).contains(&w), "priority {:?} = {}", p, w);
            total += w;
        }
        assert!((total - 1.0).abs() < 1e-6);
        assert!(colony.resources >= 0.0, "colony overspent: {}", colony.resources);
        assert!(colony.health <= colony.max_health);
    }
}

// ── Determinism ────────────────────────────────────────────────────────

#[test]
fn same_seed_same_run() {
    let config = SimConfig {
        seed: 1234,
        colony_count: 2,
        teleporter_pairs: 1,
        ..SimConfig::default()
    };
    let mut a = engine(config.clone());
    let mut b = engine(config);
    a.run_for(200.0, 0.1);
    b.run_for(200.0, 0.1);

    assert_eq!(a.result(), b.result());
    assert_eq!(a.agent_count(), b.agent_count());
    assert_eq!(a.creep_count(), b.creep_count());
    for (x, y) in a.colonies().iter().zip(b.colonies()) {
        assert_eq!(x.resources.to_bits(), y.resources.to_bits());
        assert_eq!(x.pos, y.pos);
        assert_eq!(x.agents.total_num(), y.agents.total_num());
    }
}

#[test]
fn different_seeds_diverge() {
    let mut a = engine(SimConfig {
        seed: 1,
        ..SimConfig::default()
    });
    let mut b = engine(SimConfig {
        seed: 2,
        ..SimConfig::default()
    });
    a.run_for(120.0, 0.1);
    b.run_for(120.0, 0.1);
    let pos = |e: &SimulationEngine| e.layout().sources.iter().filter_map(|&s| e.context().source_pos(s)).collect::<Vec<_>>();
    assert_ne!(pos(&a), pos(&b));
}

// ── Arena ──────────────────────────────────────────────────────────────

#[test]
fn finite_arena_wins_exactly_once() {
    let mut engine = engine(SimConfig {
        seed: 8,
        last_level: 2,
        ..SimConfig::default()
    });
    let victories = count_events(&mut engine, |e| matches!(e, SimEvent::Victory));

    // Wave 1 at 90s, the last wave 240s later, victory 300s after that.
    let mut elapsed: f64 = 0.0;
    while !engine.is_finished() && elapsed < 1000.0 {
        engine.update(0.5);
        clear_creeps(&mut engine);
        elapsed += 0.5;
    }
    assert!(engine.is_finished());
    assert!(engine.result().victory);
    assert_eq!(engine.result().waves_spawned, 2);
    assert!((elapsed - 630.0).abs() <= 0.5, "victory at {}", elapsed);

    engine.update(0.5);
    assert_eq!(*victories.borrow(), 1);
}

#[test]
fn infinite_arena_never_ends() {
    let mut engine = engine(SimConfig {
        seed: 8,
        infinite_arena: true,
        last_level: 1,
        ..SimConfig::default()
    });
    for _ in 0..2000 {
        engine.update(0.5);
        clear_creeps(&mut engine);
    }
    assert!(!engine.is_finished());
    assert!(!engine.arena().is_victory());
    assert!(engine.arena().level() > 5);
    assert!(engine.result().waves_spawned >= 5);
}

// ── Agents ─────────────────────────────────────────────────────────────

#[test]
fn low_hp_retreat_ends_tick_in_move() {
    let mut engine = engine(SimConfig::default());
    let colony = ColonyId(0);
    let ctx = engine.context_mut();
    let e = ctx.spawn_agent(Agent::new(&SCOUT, colony, Vec2::new(800.0, 700.0)));
    ctx.attach_agent(colony, e);
    let threat = Vec2::new(800.0, 500.0);
    {
        let mut a = ctx.world.get::<&mut Agent>(e).unwrap();
        a.traits = AgentTraits::LOW_HP_RETREAT;
        a.health = a.max_health * 0.5;
    }
    let hit = ctx.world.get::<&Agent>(e).unwrap().max_health * 0.3;
    let source = DamageSource {
        pos: threat,
        flying: false,
        creep: None,
    };
    queue_hit(ctx, HitTarget::Agent(e), DamageValue::health(hit), 0.0, source);

    engine.update(0.1);
    let a = engine.agent(e).expect("agent survives the hit");
    assert_eq!(a.mode, AgentMode::Move);
    assert!(a.waypoint.dist(threat) > a.pos.dist(threat));
}

#[test]
fn mine_essence_rejects_non_gatherer() {
    let mut engine = engine(SimConfig::default());
    let colony = ColonyId(0);
    let source = engine.layout().sources[0];
    let ctx = engine.context_mut();
    let e = ctx.spawn_agent(Agent::new(&SCOUT, colony, Vec2::new(800.0, 700.0)));
    ctx.attach_agent(colony, e);
    let before = ctx.world.get::<&Agent>(e).unwrap().mode;

    let accepted = assign_mode_to(ctx, e, AgentMode::MineEssence, Vec2::ZERO, Some(AgentTarget::Source(source)));
    assert!(!accepted);
    assert_eq!(engine.agent(e).unwrap().mode, before);
}

// ── Colony ─────────────────────────────────────────────────────────────

#[test]
fn invariants_hold_through_a_battle() {
    let mut engine = engine(SimConfig {
        seed: 99,
        colony_count: 2,
        neutral_buildings: 2,
        constructions: 2,
        ..SimConfig::default()
    });
    for step in 0..4000 {
        engine.update(0.1);
        if step % 50 == 0 {
            check_invariants(&engine);
        }
    }
    check_invariants(&engine);
    assert!(engine.result().waves_spawned >= 1);
}

#[test]
fn colonies_grow_while_unthreatened() {
    let mut engine = engine(SimConfig {
        seed: 5,
        starting_resources: 100.0,
        ..SimConfig::default()
    });
    for _ in 0..1200 {
        engine.update(0.1);
        clear_creeps(&mut engine);
    }
    let result = engine.result();
    assert!(result.resources_gathered > 0.0);
    assert!(result.drones_produced > 0);
    check_invariants(&engine);
}

#[test]
fn relocated_colony_lands_at_destination() {
    let mut engine = engine(SimConfig {
        seed: 12,
        ..SimConfig::default()
    });
    let target = Vec2::new(480.0, 480.0);
    assert!(engine.relocate_colony(ColonyId(0), target));
    assert!(!engine.relocate_colony(ColonyId(0), target), "already in flight");

    for _ in 0..600 {
        engine.update(0.1);
        clear_creeps(&mut engine);
        if engine.colony(ColonyId(0)).unwrap().is_normal() {
            break;
        }
    }
    let colony = engine.colony(ColonyId(0)).unwrap();
    assert!(colony.is_normal());
    assert!(colony.pos.dist(target) < 100.0, "landed at {:?}", colony.pos);
}

#[test]
fn destroyed_colonies_finish_the_run() {
    let mut engine = engine(SimConfig::default());
    let destroyed = count_events(&mut engine, |e| matches!(e, SimEvent::ColonyDestroyed { .. }));
    dronecolony_core::systems::destroy_colony(engine.context_mut(), ColonyId(0));
    engine.update(0.1);
    assert!(engine.is_finished());
    assert_eq!(*destroyed.borrow(), 1);
    assert_eq!(engine.result().colonies_lost, 1);
}
