//! Per-tick agent update: passive effects, weapon and support routines,
//! then exactly one mode handler.

use dronecolony_logic::faction::FactionTag;
use dronecolony_logic::merge::{merge_rank, merge_result};
use dronecolony_logic::stats::{agent_stats, AgentKind, DamageValue, DEVOURER_MAX_LEVEL};
use hecs::Entity;

use super::agent_modes::{assign_mode, assign_mode_to, follow_waypoint, get_closer_waypoint, orbiting_waypoint};
use super::combat::process_attack;
use super::damage::damage_creep;
use super::support::process_support;
use crate::components::{
    Agent, AgentMode, AgentTarget, AgentTraits, ColonyId, Construction, Creep, EssenceSource, NeutralBuilding, Vec2,
    AGENT_FLIGHT_HEIGHT,
};
use crate::presentation::{EffectKind, SoundKind};
use crate::rng::rand_iterate;
use crate::spatial::{align_pos, corrected_pos, pos_move, random_sector_pos};
use crate::world::SimContext;

const KAMIKAZE_EXPLOSION_RANGE_SQR: f64 = 34.0 * 34.0;
const KAMIKAZE_EXPLOSION_DAMAGE: f64 = 35.0;

/// Advance every agent by `delta`, in spawn order.
pub fn update_agents(ctx: &mut SimContext, delta: f64) {
    for e in ctx.agent_entities() {
        ctx.with_agent(e, |a, ctx| update_agent(ctx, a, delta));
    }
}

pub fn update_agent(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    if a.disposed {
        return;
    }
    if a.stats.tier == 1 {
        a.lifetime -= delta;
    }

    if a.energy_bill != 0.0 {
        a.energy -= delta * 2.0;
        a.energy_bill = (a.energy_bill - delta * 2.0).max(0.0);
    }

    if a.resting {
        a.add_energy(delta * 0.5);
        if a.energy > a.max_energy * 0.6 {
            a.resting = false;
        }
    } else if a.mode != AgentMode::Standby && a.mode != AgentMode::Charging && a.energy < a.max_energy * 0.5 {
        a.resting = true;
    }

    a.slow = (a.slow - delta).max(0.0);
    a.special_delay = (a.special_delay - delta).max(0.0);
    a.tether_time = (a.tether_time - delta).max(0.0);

    if a.cloaking > 0.0 {
        a.cloaking -= delta;
        if a.cloaking <= 0.0 {
            a.uncloak();
        }
    }

    process_attack(ctx, a, delta);
    process_support(ctx, a, delta);
    if a.disposed {
        return;
    }

    match a.mode {
        AgentMode::Standby => update_standby(ctx, a, delta),
        AgentMode::AlignStandby => update_align_standby(ctx, a, delta),
        AgentMode::Posing => update_posing(ctx, a, delta),
        AgentMode::Charging => update_charging(ctx, a, delta),
        AgentMode::ForcedCharging => update_forced_charging(ctx, a, delta),
        AgentMode::CloakHide => update_cloak_hide(ctx, a, delta),
        AgentMode::MineEssence => update_mine_essence(ctx, a, delta),
        AgentMode::Pickup => update_pickup(ctx, a, delta),
        AgentMode::ResourceTakeoff => update_resource_takeoff(ctx, a, delta),
        AgentMode::Return => update_return(ctx, a, delta),
        AgentMode::Patrol => update_patrol(ctx, a, delta),
        AgentMode::Move => update_move(ctx, a, delta),
        AgentMode::Panic => update_panic(ctx, a, delta),
        AgentMode::CourierFlight => update_courier_flight(ctx, a, delta),
        AgentMode::Follow => update_follow(ctx, a, delta),
        AgentMode::WaitCloning => update_wait_cloning(ctx, a),
        AgentMode::MakeClone => update_make_clone(ctx, a, delta),
        AgentMode::Merging | AgentMode::MergingRoomba => update_merging(ctx, a, delta),
        AgentMode::Takeoff => update_takeoff(ctx, a, delta),
        AgentMode::RecycleReturn => update_recycle_return(ctx, a, delta),
        AgentMode::RecycleLanding => update_recycle_landing(ctx, a, delta),
        AgentMode::BuildBuilding => update_build_building(ctx, a, delta),
        AgentMode::CaptureBuilding => update_capture_building(ctx, a, delta),
        AgentMode::RepairBase => update_repair_base(ctx, a, delta),
        AgentMode::RepairTurret => update_repair_turret(ctx, a, delta),
        AgentMode::KamikazeAttack => update_kamikaze_attack(ctx, a, delta),
        AgentMode::ConsumeDrone => update_consume_drone(ctx, a, delta),
        AgentMode::RoombaPatrol => update_roomba_patrol(ctx, a, delta),
        AgentMode::RoombaWait => update_roomba_wait(a, delta),
        // Turrets just hold position.
        AgentMode::GuardForever => {}
        // Assign-only aliases never stay the current mode.
        AgentMode::Scavenge | AgentMode::Attack => standby(ctx, a),
    }
}

fn standby(ctx: &mut SimContext, a: &mut Agent) {
    assign_mode(ctx, a, AgentMode::Standby, Vec2::ZERO, None);
}

fn colony_is_normal(ctx: &SimContext, id: ColonyId) -> bool {
    ctx.live_colony(id).map_or(false, |c| c.is_normal())
}

fn target_agent(ctx: &SimContext, a: &Agent) -> Option<(Entity, Vec2)> {
    let e = a.target.and_then(|t| t.agent())?;
    ctx.agent_pos(e).map(|pos| (e, pos))
}

fn target_creep(ctx: &SimContext, a: &Agent) -> Option<(Entity, Vec2)> {
    let e = a.target.and_then(|t| t.creep())?;
    ctx.creep_pos(e).map(|pos| (e, pos))
}

fn update_standby(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    if a.health_regen != 0.0 {
        a.heal(delta * a.health_regen);
    }
    a.add_energy(delta * 0.5 * a.energy_regen_rate);

    if !a.move_towards(delta, a.waypoint) {
        return;
    }
    let normal = colony_is_normal(ctx, a.colony);
    if a.stats.tier == 1 && a.lifetime < 0.0 && normal {
        assign_mode(ctx, a, AgentMode::RecycleReturn, Vec2::ZERO, None);
        return;
    }

    let center = ctx.colony(a.colony).map_or(a.pos, |c| c.pos);
    let clockwise = !a.has_trait(AgentTraits::COUNTER_CLOCKWISE);
    a.waypoint = orbiting_waypoint(&mut ctx.rng, a.pos, center, a.dist, clockwise);

    if a.has_trait(AgentTraits::ADVENTURER) {
        a.waypoints_left += 1;
        if a.waypoints_left > 10 {
            a.waypoints_left = 0;
            if ctx.rng.float() <= 0.4 {
                let pos = a.pos + ctx.rng.offset(-100.0, 100.0);
                assign_mode(ctx, a, AgentMode::Move, pos, None);
                // Compensation for the detour.
                a.add_energy(5.0);
                a.energy_bill = (a.energy_bill - 5.0).max(0.0);
                return;
            }
        }
    }

    if normal && !a.has_trait(AgentTraits::NEVER_STOP) && a.energy < 40.0 && ctx.rng.chance(0.2) {
        assign_mode(ctx, a, AgentMode::Charging, Vec2::ZERO, None);
    }
}

fn update_align_standby(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    let speed = a.movement_speed();
    a.height += delta * speed;
    if a.move_towards_with_speed(delta, speed, a.waypoint) {
        a.height = AGENT_FLIGHT_HEIGHT;
        standby(ctx, a);
    }
}

fn update_posing(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    a.dist -= delta;
    if a.dist <= 0.0 {
        a.dist = 0.0;
        standby(ctx, a);
    }
}

fn update_charging(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    a.add_energy(delta * 4.0 * a.energy_regen_rate);
    if a.energy >= a.max_energy * 0.55 {
        a.energy_bill = 0.0;
        standby(ctx, a);
    }
}

fn update_forced_charging(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    a.add_energy(delta * 2.0 * a.energy_regen_rate);
    a.special_delay -= delta;
    if a.special_delay <= 0.0 {
        a.special_delay = 0.0;
        standby(ctx, a);
    }
}

fn update_cloak_hide(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    a.add_energy(delta * a.energy_regen_rate);
    if a.cloaking <= 0.0 {
        a.heal(2.0);
        standby(ctx, a);
    }
}

fn update_mine_essence(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    if !a.move_towards(delta, a.waypoint) {
        return;
    }
    let alive = a.target.and_then(|t| t.source()).and_then(|e| ctx.source_pos(e)).is_some();
    if alive {
        let target = a.target;
        assign_mode(ctx, a, AgentMode::Pickup, Vec2::ZERO, target);
    } else {
        a.uncloak();
        standby(ctx, a);
    }
}

fn update_pickup(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    let speed = a.movement_speed();
    a.height -= delta * speed;
    if !a.move_towards_with_speed(delta, speed, a.waypoint) {
        return;
    }
    a.height = 0.0;
    a.mode = AgentMode::ResourceTakeoff;
    a.waypoint = a.pos - Vec2::new(0.0, AGENT_FLIGHT_HEIGHT);

    let Some(source) = a.target.and_then(|t| t.source()) else {
        return;
    };
    if let Ok(mut s) = ctx.world.get::<&mut EssenceSource>(source) {
        if s.disposed {
            return;
        }
        let harvested = s.harvest(a.max_payload());
        let stats = s.stats();
        a.payload = harvested;
        a.cargo_value = f64::from(harvested) * stats.value;
        a.cargo_elite_value = f64::from(harvested) * stats.elite_value;
    }
}

fn update_resource_takeoff(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    let speed = a.movement_speed();
    a.height += delta * speed;
    if a.move_towards_with_speed(delta, speed, a.waypoint) {
        a.height = AGENT_FLIGHT_HEIGHT;
        assign_mode(ctx, a, AgentMode::Return, Vec2::ZERO, None);
    }
}

fn update_return(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    if !a.move_towards(delta, a.waypoint) {
        return;
    }
    a.uncloak();
    if a.payload != 0 {
        if let Some(colony) = ctx.colony_mut(a.colony) {
            colony.add_resources(a.cargo_value);
            colony.add_elite_resources(a.cargo_elite_value);
        }
        ctx.state.result.resources_gathered += a.cargo_value;
        ctx.state.result.elite_resources_gathered += a.cargo_elite_value;
        a.clear_cargo();
        ctx.state.presentation.play_sound(SoundKind::Production, a.pos);
    }
    standby(ctx, a);
}

fn update_patrol(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    if !a.move_towards(delta, a.waypoint) {
        return;
    }
    let Some((center, radius)) = ctx.colony(a.colony).map(|c| (c.pos, c.patrol_radius())) else {
        return;
    };
    a.dist = radius;
    let clockwise = !a.has_trait(AgentTraits::COUNTER_CLOCKWISE);
    a.waypoint = orbiting_waypoint(&mut ctx.rng, a.pos, center, a.dist, clockwise);
    a.waypoints_left -= 1;
    if a.waypoints_left == 0 {
        standby(ctx, a);
    }
}

fn update_move(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    if a.move_towards(delta, a.waypoint) {
        standby(ctx, a);
    }
}

fn update_panic(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    if a.move_towards(delta, a.waypoint) {
        a.waypoints_left -= 1;
        a.waypoint = Vec2::ZERO;
    }
    if !a.waypoint.is_zero() {
        return;
    }
    if a.waypoints_left <= 0 {
        standby(ctx, a);
        return;
    }
    let waypoint = a.pos + ctx.rng.offset(-32.0, 32.0);
    a.waypoint = corrected_pos(&ctx.state.map, waypoint, 64.0);
}

fn update_courier_flight(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    if !a.move_towards(delta, a.waypoint) {
        return;
    }
    let target = a.target.and_then(|t| t.colony());
    let Some((target_id, target_pos)) = target
        .and_then(|id| ctx.live_colony(id))
        .filter(|c| c.is_normal())
        .map(|c| (c.id, c.pos))
    else {
        let mode = if a.payload != 0 {
            AgentMode::Return
        } else {
            AgentMode::Standby
        };
        assign_mode(ctx, a, mode, Vec2::ZERO, None);
        return;
    };

    if target_pos.dist_sqr(a.pos) >= 70.0 * 70.0 {
        a.waypoint = a.pos.direction_to(target_pos) * 60.0 + target_pos + ctx.rng.offset(-20.0, 20.0);
        return;
    }

    if a.payload != 0 {
        if let Some(colony) = ctx.colony_mut(target_id) {
            colony.add_resources(a.cargo_value);
        }
        a.clear_cargo();
    }
    ctx.state.presentation.create_beam(a.pos, target_pos);
    ctx.state.presentation.play_sound(SoundKind::Beam, a.pos);

    // Bring something back; the longer the route, the more it is worth.
    let home = ctx.colony(a.colony).map_or(target_pos, |c| c.pos);
    let dist = target_pos.dist(home);
    if dist > 115.0 {
        a.payload = a.max_payload();
        a.cargo_value = (f64::from(a.payload) * (((dist - 100.0) / 15.0).trunc() * 0.08)).min(10.0);
        assign_mode(ctx, a, AgentMode::Return, Vec2::ZERO, None);
    } else {
        standby(ctx, a);
    }
    a.heal(5.0);
    a.add_energy(15.0);
}

fn update_follow(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    if !a.move_towards(delta, a.waypoint) {
        return;
    }
    let target = target_creep(ctx, a);
    match target {
        Some((_, pos)) if a.waypoints_left != 0 => {
            a.waypoints_left -= 1;
            a.waypoint = follow_waypoint(&mut ctx.rng, a, pos);
        }
        _ => standby(ctx, a),
    }
}

fn update_wait_cloning(ctx: &mut SimContext, a: &mut Agent) {
    if target_agent(ctx, a).is_none() {
        standby(ctx, a);
    }
}

fn update_make_clone(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    let Some((target, target_pos)) = target_agent(ctx, a) else {
        standby(ctx, a);
        return;
    };
    if !a.waypoint.is_zero() {
        if a.move_towards(delta, a.waypoint) {
            a.waypoint = Vec2::ZERO;
            ctx.state.presentation.create_beam(a.pos, target_pos);
        }
        return;
    }
    a.dist -= delta;
    if a.dist > 0.0 {
        return;
    }

    standby(ctx, a);
    assign_mode_to(ctx, target, AgentMode::Standby, Vec2::ZERO, None);
    let Some(clone) = ctx.world.get::<&Agent>(target).ok().map(|x| x.make_clone(x.pos)) else {
        return;
    };
    let colony = clone.colony;
    let e = ctx.spawn_agent(clone);
    ctx.attach_agent(colony, e);
    assign_mode_to(ctx, e, AgentMode::Standby, Vec2::ZERO, None);
    ctx.state.result.drones_cloned += 1;
}

fn update_merging(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    let Some((target, target_pos)) = target_agent(ctx, a) else {
        standby(ctx, a);
        return;
    };
    if a.waypoint.is_zero() {
        let dist = target_pos.dist(a.pos);
        if dist > 64.0 {
            a.waypoint = a.pos.move_towards(target_pos, dist - 20.0) + ctx.rng.offset(-8.0, 8.0);
            return;
        }
    }
    if !a.waypoint.is_zero() {
        if a.move_towards(delta, a.waypoint) {
            a.waypoint = Vec2::ZERO;
        }
        return;
    }

    a.dist -= delta;
    if a.pos.dist_sqr(target_pos) > 10.0 * 10.0 {
        a.pos = a.pos.move_towards(target_pos, delta * 12.0);
    } else {
        // Three times faster side by side.
        a.dist -= delta * 2.0;
        if a.mode == AgentMode::MergingRoomba && a.height > 5.0 {
            let descent = (20.0 * delta).min(a.height - 5.0);
            a.pos.y += descent;
            a.height -= descent;
        }
    }
    if a.dist > 0.0 {
        return;
    }

    let roomba = a.mode == AgentMode::MergingRoomba;
    let ground = align_pos(a.pos + Vec2::new(0.0, a.height));
    if roomba && !ctx.state.path_grid.is_pos_free(ground) {
        assign_mode(ctx, a, AgentMode::AlignStandby, Vec2::ZERO, None);
        assign_mode_to(ctx, target, AgentMode::AlignStandby, Vec2::ZERO, None);
        return;
    }

    let Some((target_kind, target_faction, target_rank)) =
        ctx.world.get::<&Agent>(target).ok().map(|x| (x.kind(), x.faction, x.rank))
    else {
        return;
    };
    let Some(stats) = merge_result(a.kind(), a.faction, target_kind, target_faction) else {
        panic!(
            "empty merge result for {:?} {:?} + {:?} {:?}",
            a.faction, a.kind(), target_faction, target_kind
        );
    };

    let outcome = merge_rank(a.rank, target_rank);
    let rank = if outcome.needs_roll() {
        outcome.resolve(ctx.rng.float())
    } else {
        outcome.resolve(0.0)
    };
    let faction = if stats.tier == 2 {
        ctx.colonies
            .get(a.colony.index())
            .map_or(FactionTag::Neutral, |c| c.pick_faction(&mut ctx.rng))
    } else {
        let swap = a.faction == FactionTag::Neutral
            || (target_faction != FactionTag::Neutral && a.faction != target_faction && ctx.rng.bool());
        if swap {
            target_faction
        } else {
            a.faction
        }
    };

    let is_roomba = stats.kind == AgentKind::Roomba;
    let spawn_pos = if is_roomba { ground } else { target_pos };
    let merged = Agent::new(stats, a.colony, spawn_pos).with_rank(rank).with_faction(faction);
    let e = ctx.spawn_agent(merged);
    ctx.attach_agent(a.colony, e);
    if is_roomba {
        ctx.with_agent(e, |x, _| {
            x.height = 0.0;
            x.mode = AgentMode::RoombaWait;
            x.dist = 1.0;
        });
    } else {
        assign_mode_to(ctx, e, AgentMode::Standby, Vec2::ZERO, None);
    }

    ctx.state.result.drones_merged += 1;
    if stats.tier == 3 {
        ctx.state.result.t3_created += 1;
    }
    ctx.destroy_agent(target);
    a.disposed = true;
    ctx.state.presentation.play_sound(SoundKind::Merge, target_pos);
}

fn update_takeoff(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    a.height += delta * 30.0;
    if a.move_towards(delta, a.waypoint) {
        a.height = AGENT_FLIGHT_HEIGHT;
        standby(ctx, a);
    }
}

fn update_recycle_return(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    if a.move_towards(delta, a.waypoint) {
        assign_mode(ctx, a, AgentMode::RecycleLanding, Vec2::ZERO, None);
    }
}

fn update_recycle_landing(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    a.height -= delta * 30.0;
    if !a.move_towards(delta, a.waypoint) {
        return;
    }
    if let Some(colony) = ctx.colony_mut(a.colony) {
        colony.add_resources(a.stats.cost * 0.9);
        if a.rank != 0 {
            colony.add_elite_resources(f64::from(a.rank));
        }
    }
    ctx.state.presentation.create_effect(EffectKind::Recycle, a.pos);
    a.disposed = true;
}

fn build_amount(a: &Agent, delta: f64) -> f64 {
    delta * a.faction.work_multiplier()
}

fn update_build_building(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    let Some(site) = a.target.and_then(|t| match t {
        AgentTarget::Construction(e) => Some(e),
        _ => None,
    }) else {
        standby(ctx, a);
        return;
    };
    let Some(site_pos) = ctx.construction_pos(site) else {
        standby(ctx, a);
        return;
    };
    if !a.waypoint.is_zero() {
        if a.move_towards(delta, a.waypoint) {
            a.waypoint = Vec2::ZERO;
            if let Ok(mut c) = ctx.world.get::<&mut Construction>(site) {
                c.attention += 1;
            }
            ctx.state.presentation.create_beam(a.pos, site_pos);
        }
        return;
    }

    let amount = build_amount(a, delta);
    let complete = ctx
        .world
        .get::<&mut Construction>(site)
        .map_or(false, |mut c| c.construct(amount));
    if complete {
        complete_construction(ctx, site);
        standby(ctx, a);
        return;
    }
    a.dist -= delta;
    if a.dist <= 0.0 || a.energy < 20.0 {
        if let Ok(mut c) = ctx.world.get::<&mut Construction>(site) {
            c.attention = c.attention.saturating_sub(1);
        }
        standby(ctx, a);
    }
}

/// Replace a finished site with a turret owned by the site's colony.
pub fn complete_construction(ctx: &mut SimContext, site: Entity) {
    let Ok(c) = ctx.world.remove_one::<Construction>(site) else {
        return;
    };
    let _ = ctx.world.despawn(site);
    let Some(colony) = ctx.colonies.get(c.colony.index()).filter(|x| !x.disposed) else {
        return;
    };
    let faction = colony.pick_faction(&mut ctx.rng);
    let mut turret = Agent::new(agent_stats(c.kind), c.colony, c.pos).with_faction(faction);
    turret.height = 0.0;
    let e = ctx.spawn_agent(turret);
    ctx.attach_agent(c.colony, e);
    log::debug!("colony {:?} finished a {:?}", c.colony, c.kind);
}

fn update_capture_building(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    let Some(building) = a.target.and_then(|t| match t {
        AgentTarget::Building(e) => Some(e),
        _ => None,
    }) else {
        standby(ctx, a);
        return;
    };
    let Some(building_pos) = ctx.building_pos(building) else {
        standby(ctx, a);
        return;
    };
    if !a.waypoint.is_zero() {
        if a.move_towards(delta, a.waypoint) {
            a.waypoint = Vec2::ZERO;
            ctx.state.presentation.create_beam(a.pos, building_pos);
        }
        return;
    }

    let amount = build_amount(a, delta);
    let colony = a.colony;
    let captured = ctx
        .world
        .get::<&mut NeutralBuilding>(building)
        .map_or(false, |mut b| b.capture(colony, amount));
    if captured {
        standby(ctx, a);
        return;
    }
    a.dist -= delta;
    if a.dist <= 0.0 || a.energy < 20.0 {
        standby(ctx, a);
    }
}

fn update_repair_base(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    if !a.waypoint.is_zero() {
        if a.move_towards(delta, a.waypoint) {
            a.waypoint = Vec2::ZERO;
            if let Some(pos) = ctx.colony(a.colony).map(|c| c.pos) {
                let to = pos + Vec2::new(ctx.rng.float_range(-18.0, 18.0), 0.0);
                ctx.state.presentation.create_beam(a.pos, to);
            }
        }
        return;
    }
    a.dist -= delta;
    if a.dist <= 0.0 {
        standby(ctx, a);
        let amount = ctx.rng.float_range(3.0, 5.0);
        if let Some(colony) = ctx.colony_mut(a.colony) {
            colony.heal(amount);
        }
    }
}

fn update_repair_turret(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    let Some((target, target_pos)) = target_agent(ctx, a) else {
        standby(ctx, a);
        return;
    };
    if !a.waypoint.is_zero() {
        if a.move_towards(delta, a.waypoint) {
            a.waypoint = Vec2::ZERO;
            let to = target_pos + Vec2::new(ctx.rng.float_range(-10.0, 10.0), 0.0);
            ctx.state.presentation.create_beam(a.pos, to);
        }
        return;
    }
    a.dist -= delta;
    if a.dist <= 0.0 {
        standby(ctx, a);
        let amount = ctx.rng.float_range(5.0, 8.0) * a.faction.work_multiplier();
        if let Ok(mut turret) = ctx.world.get::<&mut Agent>(target) {
            turret.on_building_repair(amount);
        }
    }
}

fn update_kamikaze_attack(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    let Some((creep, creep_pos)) = target_creep(ctx, a) else {
        standby(ctx, a);
        return;
    };

    if a.waypoint.is_zero() {
        a.waypoint = get_closer_waypoint(&mut ctx.rng, a.pos, creep_pos, 4.0, 16.0);
    }
    if !a.move_towards(delta, a.waypoint) {
        return;
    }
    if a.pos.dist_sqr(creep_pos) > KAMIKAZE_EXPLOSION_RANGE_SQR {
        a.waypoint = Vec2::ZERO;
        return;
    }

    ctx.state.presentation.create_effect(EffectKind::Explosion, a.pos);
    ctx.state.presentation.play_sound(SoundKind::Explosion, a.pos);
    damage_creep(ctx, creep, &DamageValue::health(KAMIKAZE_EXPLOSION_DAMAGE));
    let splash: Vec<Entity> = ctx
        .world
        .query::<&Creep>()
        .iter()
        .filter(|(e, c)| {
            *e != creep && !c.disposed && c.is_flying() && c.pos.dist_sqr(a.pos) <= KAMIKAZE_EXPLOSION_RANGE_SQR
        })
        .map(|(e, _)| e)
        .collect();
    for e in splash {
        damage_creep(ctx, e, &DamageValue::health(KAMIKAZE_EXPLOSION_DAMAGE * 0.5));
    }
    a.disposed = true;
}

fn update_consume_drone(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    let victim = a
        .target
        .and_then(|t| t.agent())
        .and_then(|e| ctx.world.get::<&Agent>(e).ok().filter(|x| !x.disposed).map(|x| (e, x.mode)));
    let Some((victim, AgentMode::Posing)) = victim else {
        standby(ctx, a);
        return;
    };

    if !a.move_towards(delta, a.waypoint) {
        return;
    }
    let Some((cost, rank, victim_max_health)) = ctx
        .world
        .get::<&Agent>(victim)
        .ok()
        .map(|x| (x.stats.cost, x.rank, x.max_health))
    else {
        return;
    };

    // Partial refund of the eaten drone.
    if let Some(colony) = ctx.colony_mut(a.colony) {
        colony.add_resources(cost * 0.5);
        colony.add_elite_resources(f64::from(rank));
    }
    if a.devourer_level < DEVOURER_MAX_LEVEL {
        a.devourer_level += 1;
        a.max_health += 5.0;
    }
    a.heal(victim_max_health * 2.0);
    ctx.destroy_agent(victim);
    ctx.state.presentation.create_effect(EffectKind::SmallExplosion, a.pos);
}

/// Plan a grid path towards `pos`; the roomba starts from its aligned cell.
fn send_to(ctx: &SimContext, a: &mut Agent, pos: Vec2) {
    a.path = ctx.state.path_grid.build_path(a.pos, pos);
    a.waypoint = align_pos(a.pos);
}

fn roomba_rest(a: &mut Agent, dist: f64) {
    a.mode = AgentMode::RoombaWait;
    a.dist = dist;
    a.waypoint = Vec2::ZERO;
}

fn update_roomba_patrol(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    if a.energy < 0.0 {
        // Discharged; needs time to recover.
        let dist = ctx.rng.float_range(5.0, 25.0);
        roomba_rest(a, dist);
        a.energy = ctx.rng.float_range(10.0, 20.0);
        return;
    }

    if !a.waypoint.is_zero() {
        a.energy -= 3.0 * delta;
        if !a.move_towards(delta, a.waypoint) {
            return;
        }
        if let Some(e) = a.target.and_then(|t| t.creep()) {
            match ctx.creep_pos(e) {
                None => a.target = None,
                Some(pos) => {
                    let range_sqr = a.stats.weapon.map_or(0.0, |w| w.attack_range_sqr());
                    if a.pos.dist_sqr(pos) <= range_sqr * a.support_delay {
                        let dist = ctx.rng.float_range(7.0, 11.0);
                        roomba_rest(a, dist);
                        a.target = None;
                        return;
                    }
                }
            }
        }
        if let Some(dir) = a.path.pop_front() {
            if a.health < a.max_health * 0.8 && ctx.rng.chance(0.1) {
                a.path.push_front(dir);
                let dist = ctx.rng.float_range(1.0, 10.0);
                roomba_rest(a, dist);
                return;
            }
            let aligned = align_pos(a.pos);
            a.waypoint = pos_move(aligned, dir) + ctx.rng.offset(-4.0, 4.0);
            return;
        }
        a.waypoint = Vec2::ZERO;
        return;
    }

    if let Some(e) = a.target.and_then(|t| t.creep()) {
        match ctx.creep_pos(e) {
            None => a.target = None,
            Some(pos) => {
                let goal = pos + ctx.rng.offset(-80.0, 80.0);
                send_to(ctx, a, goal);
                return;
            }
        }
    }

    let prey: Vec<(Entity, Vec2)> = ctx
        .creep_entities()
        .into_iter()
        .filter_map(|e| {
            ctx.world
                .get::<&Creep>(e)
                .ok()
                .filter(|c| !c.disposed && c.is_roomba_prey())
                .map(|c| (e, c.pos))
        })
        .collect();
    if let Some(&(e, pos)) = rand_iterate(&mut ctx.rng, &prey, |_| true) {
        a.support_delay = ctx.rng.float_range(0.4, 0.95);
        a.target = Some(AgentTarget::Creep(e));
        let goal = pos + ctx.rng.offset(-80.0, 80.0);
        send_to(ctx, a, goal);
    } else if ctx.rng.chance(0.4) {
        let map = ctx.state.map;
        let goal = corrected_pos(&map, random_sector_pos(&mut ctx.rng, &map), 480.0);
        send_to(ctx, a, goal);
    } else {
        let dist = ctx.rng.float_range(2.0, 5.0);
        roomba_rest(a, dist);
    }
}

fn update_roomba_wait(a: &mut Agent, delta: f64) {
    a.dist -= delta;
    a.heal(delta * 0.2);
    a.add_energy(delta * 2.0);
    if a.dist <= 0.0 {
        a.mode = AgentMode::RoombaPatrol;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ColonyCore, Rect};
    use dronecolony_logic::creeps::CRAWLER;
    use dronecolony_logic::stats::{AgentStats, CLONER, DEN_CORE, KAMIKAZE, ROOMBA, SCOUT, WORKER};

    fn context() -> (SimContext, ColonyId) {
        let mut ctx = SimContext::new(Rect::from_size(1600.0, 1600.0), 3);
        let id = ctx.add_colony(ColonyCore::new(ColonyId(0), &DEN_CORE, Vec2::new(800.0, 800.0)));
        (ctx, id)
    }

    fn detached(ctx: &mut SimContext, stats: &'static AgentStats, id: ColonyId, pos: Vec2) -> Agent {
        let mut a = Agent::new(stats, id, pos);
        a.init(&mut ctx.rng);
        a
    }

    #[test]
    fn test_return_delivers_cargo() {
        let (mut ctx, id) = context();
        let mut a = detached(&mut ctx, &WORKER, id, Vec2::new(790.0, 760.0));
        a.mode = AgentMode::Return;
        a.waypoint = a.pos;
        a.payload = 2;
        a.cargo_value = 3.0;
        a.cargo_elite_value = 0.5;

        update_agent(&mut ctx, &mut a, 0.01);
        let colony = ctx.colony(id).unwrap();
        assert_eq!(colony.resources, 3.0);
        assert_eq!(colony.elite_resources, 0.5);
        assert_eq!(ctx.state.result.resources_gathered, 3.0);
        assert_eq!(ctx.state.result.elite_resources_gathered, 0.5);
        assert_eq!(a.payload, 0);
        assert_eq!(a.mode, AgentMode::Standby);
    }

    #[test]
    fn test_charging_stops_past_threshold() {
        let (mut ctx, id) = context();
        let mut a = detached(&mut ctx, &WORKER, id, Vec2::new(800.0, 760.0));
        a.mode = AgentMode::Charging;
        a.max_energy = 100.0;
        a.energy = 40.0;
        update_agent(&mut ctx, &mut a, 1.0);
        assert_eq!(a.mode, AgentMode::Charging);

        a.energy = 54.0;
        update_agent(&mut ctx, &mut a, 1.0);
        assert_eq!(a.mode, AgentMode::Standby);
        assert_eq!(a.energy_bill, 0.0);
    }

    #[test]
    fn test_recycle_landing_refunds_cost() {
        let (mut ctx, id) = context();
        let mut a = detached(&mut ctx, &WORKER, id, Vec2::new(799.0, 806.0));
        a.mode = AgentMode::RecycleLanding;
        a.waypoint = a.pos;
        update_agent(&mut ctx, &mut a, 0.1);
        assert!(a.disposed);
        assert!((ctx.colony(id).unwrap().resources - WORKER.cost * 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_make_clone_spawns_copy() {
        let (mut ctx, id) = context();
        let target = ctx.spawn_agent(Agent::new(&WORKER, id, Vec2::new(810.0, 800.0)));
        ctx.attach_agent(id, target);
        let mut cloner = detached(&mut ctx, &CLONER, id, Vec2::new(800.0, 800.0));
        cloner.mode = AgentMode::MakeClone;
        cloner.target = Some(AgentTarget::Agent(target));
        cloner.waypoint = Vec2::ZERO;
        cloner.dist = 0.05;

        update_agent(&mut ctx, &mut cloner, 0.1);
        assert_eq!(ctx.state.result.drones_cloned, 1);
        assert_eq!(cloner.mode, AgentMode::Standby);
        let workers = &ctx.colony(id).unwrap().agents.workers;
        assert_eq!(workers.len(), 2);
        let clone = workers.iter().copied().find(|&e| e != target).unwrap();
        assert_eq!(ctx.world.get::<&Agent>(clone).unwrap().clone_gen, 1);
    }

    #[test]
    fn test_red_scouts_merge_into_fighter() {
        let (mut ctx, id) = context();
        let pos = Vec2::new(820.0, 790.0);
        let target = ctx.spawn_agent(Agent::new(&SCOUT, id, pos).with_faction(FactionTag::Red));
        ctx.attach_agent(id, target);
        let mut a = Agent::new(&SCOUT, id, pos).with_faction(FactionTag::Red);
        a.init(&mut ctx.rng);
        a.mode = AgentMode::Merging;
        a.target = Some(AgentTarget::Agent(target));
        a.waypoint = Vec2::ZERO;
        a.dist = 0.05;

        update_agent(&mut ctx, &mut a, 0.1);
        assert!(a.disposed);
        assert!(!ctx.agent_exists(target));
        assert_eq!(ctx.state.result.drones_merged, 1);
        let fighters: Vec<AgentKind> = ctx.world.query::<&Agent>().iter().map(|(_, x)| x.kind()).collect();
        assert_eq!(fighters, vec![AgentKind::Fighter]);
    }

    #[test]
    fn test_merge_with_missing_partner_stands_by() {
        let (mut ctx, id) = context();
        let gone = ctx.spawn_agent(Agent::new(&SCOUT, id, Vec2::new(820.0, 790.0)));
        ctx.destroy_agent(gone);
        let mut a = detached(&mut ctx, &SCOUT, id, Vec2::new(800.0, 790.0));
        a.mode = AgentMode::Merging;
        a.target = Some(AgentTarget::Agent(gone));
        update_agent(&mut ctx, &mut a, 0.1);
        assert_eq!(a.mode, AgentMode::Standby);
        assert_eq!(ctx.state.result.drones_merged, 0);
    }

    #[test]
    fn test_kamikaze_detonates_in_range() {
        let (mut ctx, id) = context();
        let creep = ctx.spawn_creep(Creep::new(&CRAWLER, Vec2::new(800.0, 700.0), false));
        let mut a = detached(&mut ctx, &KAMIKAZE, id, Vec2::new(800.0, 690.0));
        a.mode = AgentMode::KamikazeAttack;
        a.target = Some(AgentTarget::Creep(creep));
        a.waypoint = a.pos;

        update_agent(&mut ctx, &mut a, 0.01);
        assert!(a.disposed);
        assert!(ctx.creep_pos(creep).is_none());
    }

    #[test]
    fn test_roomba_wakes_up() {
        let (mut ctx, id) = context();
        let mut a = detached(&mut ctx, &ROOMBA, id, Vec2::new(800.0, 700.0));
        a.mode = AgentMode::RoombaWait;
        a.dist = 0.5;
        update_agent(&mut ctx, &mut a, 0.25);
        assert_eq!(a.mode, AgentMode::RoombaWait);
        update_agent(&mut ctx, &mut a, 0.3);
        assert_eq!(a.mode, AgentMode::RoombaPatrol);
    }

    #[test]
    fn test_tier_one_expires_into_recycling() {
        let (mut ctx, id) = context();
        let mut a = detached(&mut ctx, &WORKER, id, Vec2::new(800.0, 760.0));
        a.lifetime = 0.01;
        a.waypoint = a.pos;
        update_agent(&mut ctx, &mut a, 0.1);
        assert_eq!(a.mode, AgentMode::RecycleReturn);
    }
}
