//! Colony core update: timers, upkeep, relocation flight, teleporters and
//! the planner loop.

use dronecolony_logic::economy::{calc_upkeep, MAX_ELITE_RESOURCES};
use dronecolony_logic::stats::{CoreKind, DamageValue};
use hecs::Entity;

use super::agent_modes::assign_mode;
use super::damage::{damage_creep, LETHAL_DAMAGE};
use super::planner::{execute_action, pick_action};
use crate::components::{
    Agent, AgentMode, ColonyCore, ColonyId, ColonyMode, ColonyPriority, Creep, Vec2, TELEPORTER_COOLDOWN,
};
use crate::events::SimEvent;
use crate::presentation::{EffectKind, SoundKind};
use crate::rng::{rand_iterate, SimRng};
use crate::spatial::{footprint_coord, footprint_pos, GridCoord, PathGrid, NEAR_OFFSETS};
use crate::world::SimContext;

const STOMP_KILL_RANGE: f64 = 24.0;
const STOMP_DAMAGE_RANGE: f64 = 42.0;
const TELEPORT_RANGE: f64 = 34.0;
const TELEPORT_CHARGE_TIME: f64 = 2.0;
const TELEPORT_SCATTER: f64 = 38.0;
/// Worker assignment failures that nudge the resources priority up.
const SHORTAGE_THRESHOLD: u32 = 5;
const LANDING_TRIES: i32 = 3;
const RELOCATION_EDGE_PAD: f64 = 64.0;

pub fn update_colonies(ctx: &mut SimContext, delta: f64) {
    for i in 0..ctx.colonies.len() {
        update_colony(ctx, ColonyId(i as u32), delta);
    }
}

pub fn update_colony(ctx: &mut SimContext, id: ColonyId, delta: f64) {
    let Some(colony) = ctx.colonies.get_mut(id.index()).filter(|c| !c.disposed) else {
        return;
    };
    colony.cloning_delay = (colony.cloning_delay - delta).max(0.0);
    colony.resource_delay = (colony.resource_delay - delta).max(0.0);
    colony.capture_delay = (colony.capture_delay - delta).max(0.0);
    colony.warning_cooldown = (colony.warning_cooldown - delta).max(0.0);
    let mode = colony.mode;

    process_upkeep(ctx, id, delta);

    match mode {
        ColonyMode::Normal => update_normal(ctx, id, delta),
        ColonyMode::Takeoff => update_takeoff(ctx, id, delta),
        ColonyMode::Relocating => update_relocating(ctx, id, delta),
        ColonyMode::Landing => update_landing(ctx, id, delta),
        ColonyMode::Teleporting => update_teleporting(ctx, id, delta),
    }
}

fn process_upkeep(ctx: &mut SimContext, id: ColonyId, delta: f64) {
    let Some(colony) = ctx.colonies.get_mut(id.index()) else {
        return;
    };
    if colony.resources > colony.storage_cap() {
        colony.resources = (colony.resources - delta).max(0.0);
    }
    colony.upkeep_delay -= delta;
    if colony.upkeep_delay > 0.0 {
        return;
    }
    colony.upkeep_delay = ctx.rng.float_range(7.5, 12.5);
    colony.elite_resources = colony.elite_resources.min(MAX_ELITE_RESOURCES);
    colony.failed_resource = None;

    let units: Vec<_> = colony
        .all_units()
        .into_iter()
        .filter_map(|e| ctx.world.get::<&Agent>(e).ok().map(|a| a.stats))
        .collect();
    let resources_priority = colony.resources_priority();
    let (price, _) = calc_upkeep(units, resources_priority);
    if colony.resources >= price {
        colony.resources -= price;
        return;
    }
    colony.resources = 0.0;
    if resources_priority < 0.5 {
        ctx.add_priority(id, ColonyPriority::Resources, 0.03);
    }
}

fn update_normal(ctx: &mut SimContext, id: ColonyId, delta: f64) {
    let Some(colony) = ctx.colony_mut(id) else {
        return;
    };
    colony.action_delay = (colony.action_delay - delta).max(0.0);
    if colony.action_delay == 0.0 {
        do_action(ctx, id);
    }
}

/// One planner round: pick, execute, and schedule the next round.
pub fn do_action(ctx: &mut SimContext, id: ColonyId) {
    let Some((shortage, resources_priority)) = ctx
        .live_colony(id)
        .map(|c| (c.resource_shortage, c.resources_priority()))
    else {
        return;
    };
    if shortage >= SHORTAGE_THRESHOLD && resources_priority < 0.4 {
        let bump = ctx.rng.float_range(0.01, 0.03);
        ctx.add_priority(id, ColonyPriority::Resources, bump);
        if let Some(colony) = ctx.colony_mut(id) {
            colony.resource_shortage -= SHORTAGE_THRESHOLD;
        }
    }

    let delay = match pick_action(ctx, id) {
        None => ctx.rng.float_range(0.15, 0.3),
        Some(action) => {
            if execute_action(ctx, id, action) {
                let cost = action.time_cost();
                ctx.rng.float_range(cost * 0.75, cost * 1.25)
            } else {
                ctx.rng.float_range(0.15, 0.25)
            }
        }
    };
    if let Some(colony) = ctx.colony_mut(id) {
        colony.action_delay = delay;
    }
}

fn flight_speed(c: &ColonyCore) -> f64 {
    let servo = f64::from(c.agents.servo_num);
    let tether = f64::from(c.tether);
    let speed = match c.mode {
        ColonyMode::Relocating => c.stats.speed + servo * 3.0 + tether * 15.0,
        _ => 12.0 + servo + tether * 5.0,
    };
    speed.min(c.stats.max_speed)
}

/// Step the core towards its waypoint. True on arrival.
fn move_core(c: &mut ColonyCore, delta: f64, speed: f64) -> bool {
    c.pos = c.pos.move_towards(c.waypoint, speed * delta);
    c.pos == c.waypoint
}

/// Send a landed colony to `pos`. Its drones drop whatever they are doing
/// and follow the core.
pub fn relocate_colony(ctx: &mut SimContext, id: ColonyId, pos: Vec2) -> bool {
    let Some(agents) = ctx
        .live_colony(id)
        .filter(|c| c.is_normal())
        .map(|c| c.agents.iter().collect::<Vec<Entity>>())
    else {
        return false;
    };
    for e in agents {
        ctx.with_agent(e, |a, ctx| {
            a.clear_cargo();
            a.uncloak();
            if a.mode != AgentMode::KamikazeAttack {
                assign_mode(ctx, a, AgentMode::Standby, Vec2::ZERO, None);
            }
        });
    }

    let destination = ctx.state.map.clamp_pos(pos, RELOCATION_EDGE_PAD);
    let Some(colony) = ctx.colonies.get_mut(id.index()) else {
        return false;
    };
    colony.relocation_point = destination;
    match colony.stats.kind {
        CoreKind::Den => {
            ctx.state.path_grid.set_2x2(footprint_coord(colony.pos), false);
            colony.mode = ColonyMode::Takeoff;
            colony.waypoint = colony.pos - Vec2::new(0.0, colony.stats.flight_height);
        }
        CoreKind::Ark => {
            colony.mode = ColonyMode::Relocating;
            colony.waypoint = destination;
        }
    }
    log::debug!("colony {:?} relocating to {:?}", id, destination);
    true
}

fn update_takeoff(ctx: &mut SimContext, id: ColonyId, delta: f64) {
    let Some(colony) = ctx.colony_mut(id) else {
        return;
    };
    let speed = flight_speed(colony);
    colony.height = (colony.height + delta * speed).min(colony.stats.flight_height);
    if !move_core(colony, delta, speed) {
        return;
    }
    colony.height = colony.stats.flight_height;
    match colony.stats.kind {
        CoreKind::Den => {
            colony.waypoint = colony.relocation_point - Vec2::new(0.0, colony.stats.flight_height);
            colony.mode = ColonyMode::Relocating;
        }
        CoreKind::Ark => colony.mode = ColonyMode::Normal,
    }
}

fn update_relocating(ctx: &mut SimContext, id: ColonyId, delta: f64) {
    let Some(colony) = ctx.colonies.get_mut(id.index()) else {
        return;
    };
    let speed = flight_speed(colony);
    if !move_core(colony, delta, speed) {
        return;
    }
    if colony.stats.kind == CoreKind::Ark {
        colony.mode = ColonyMode::Normal;
        return;
    }

    let coord = footprint_coord(colony.relocation_point);
    if !ctx.state.path_grid.is_free_2x2(coord) {
        if let Some(spot) = find_landing_spot(&ctx.state.path_grid, &mut ctx.rng, coord) {
            colony.relocation_point = footprint_pos(spot);
            colony.waypoint = colony.relocation_point - Vec2::new(0.0, colony.stats.flight_height);
            return;
        }
    }
    colony.waypoint = colony.relocation_point;
    colony.mode = ColonyMode::Landing;
    ctx.state.path_grid.set_2x2(footprint_coord(colony.relocation_point), true);
}

/// Nearest free 2x2 footprint around `coord`, widening the ring each try.
fn find_landing_spot(grid: &PathGrid, rng: &mut SimRng, coord: GridCoord) -> Option<GridCoord> {
    for ring in 1..=LANDING_TRIES {
        let found = rand_iterate(rng, &NEAR_OFFSETS, |&(dx, dy)| {
            grid.is_free_2x2(coord.offset(dx * ring, dy * ring))
        });
        if let Some(&(dx, dy)) = found {
            return Some(coord.offset(dx * ring, dy * ring));
        }
    }
    None
}

fn update_landing(ctx: &mut SimContext, id: ColonyId, delta: f64) {
    let Some(colony) = ctx.colony_mut(id) else {
        return;
    };
    let speed = flight_speed(colony);
    colony.height = (colony.height - delta * speed).max(0.0);
    if !move_core(colony, delta, speed) {
        return;
    }
    colony.height = 0.0;
    colony.mode = ColonyMode::Normal;
    let pos = colony.pos;

    crush_crawlers(ctx, pos);
    maybe_teleport(ctx, id);
}

/// Crawlers under a landing core are flattened.
fn crush_crawlers(ctx: &mut SimContext, pos: Vec2) {
    let crush_pos = pos + Vec2::new(0.0, 4.0);
    let mut victims: Vec<(Entity, f64)> = ctx
        .world
        .query::<&Creep>()
        .iter()
        .filter(|(_, c)| !c.disposed && c.stats.is_crawler())
        .map(|(e, c)| (e, c.pos.dist_sqr(crush_pos)))
        .filter(|&(_, dist_sqr)| dist_sqr <= STOMP_DAMAGE_RANGE * STOMP_DAMAGE_RANGE)
        .collect();
    victims.sort_by_key(|(e, _)| e.id());

    for (e, dist_sqr) in victims {
        let stomped = if dist_sqr <= STOMP_KILL_RANGE * STOMP_KILL_RANGE {
            ctx.with_creep(e, |c, ctx| {
                c.disposed = true;
                ctx.state.presentation.create_effect(EffectKind::Stomp, c.pos);
            })
            .is_some()
        } else {
            damage_creep(ctx, e, &DamageValue::health(LETHAL_DAMAGE))
        };
        if stomped {
            ctx.state.result.creeps_stomped += 1;
        }
    }
}

fn maybe_teleport(ctx: &mut SimContext, id: ColonyId) {
    let Some(pos) = ctx.colony(id).map(|c| c.pos) else {
        return;
    };
    let teleporters = &mut ctx.state.teleporters;
    let Some(index) = teleporters
        .iter()
        .position(|t| t.can_be_used() && t.pos.dist(pos) <= TELEPORT_RANGE)
    else {
        return;
    };
    let other = teleporters[index].other;
    let Some(destination) = teleporters.get_mut(other).map(|t| {
        t.cooldown = TELEPORTER_COOLDOWN;
        t.pos
    }) else {
        return;
    };
    teleporters[index].cooldown = TELEPORTER_COOLDOWN;

    if let Some(colony) = ctx.colony_mut(id) {
        colony.mode = ColonyMode::Teleporting;
        colony.teleport_delay = TELEPORT_CHARGE_TIME;
        colony.relocation_point = destination;
    }
    ctx.state.presentation.create_effect(EffectKind::Teleport, pos);
}

fn update_teleporting(ctx: &mut SimContext, id: ColonyId, delta: f64) {
    let Some(colony) = ctx.colonies.get_mut(id.index()) else {
        return;
    };
    colony.teleport_delay = (colony.teleport_delay - delta).max(0.0);
    if colony.teleport_delay > 0.0 {
        return;
    }

    let from = colony.pos;
    let to = colony.relocation_point;
    if colony.stats.kind == CoreKind::Den {
        ctx.state.path_grid.set_2x2(footprint_coord(from), false);
        ctx.state.path_grid.set_2x2(footprint_coord(to), true);
    }
    colony.pos = to;
    colony.mode = ColonyMode::Normal;
    let agents: Vec<Entity> = colony.agents.iter().collect();

    for e in agents {
        ctx.with_agent(e, |a, ctx| {
            if a.mode == AgentMode::KamikazeAttack {
                return;
            }
            a.pos = to + ctx.rng.offset(-TELEPORT_SCATTER, TELEPORT_SCATTER);
            let pose = ctx.rng.float_range(0.5, 2.5);
            assign_mode(ctx, a, AgentMode::Posing, Vec2::new(pose, 0.0), None);
        });
    }

    ctx.state.presentation.create_effect(EffectKind::Teleport, to);
    ctx.state.presentation.play_sound(SoundKind::Beam, to);
    ctx.emit(SimEvent::ColonyTeleported { colony: id });
    log::debug!("colony {:?} teleported to {:?}", id, to);
}
