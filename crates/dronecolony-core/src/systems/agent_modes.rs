//! Agent mode transitions.
//!
//! [`assign_mode`] is the only way into a mode. Rejections are resource or
//! capability gates and leave the agent untouched; accepted transitions set
//! the mode, the target, the first waypoint and may add to the energy bill.

use dronecolony_logic::stats::AgentKind;
use hecs::Entity;

use crate::components::{Agent, AgentMode, AgentTarget, AgentTraits, Vec2, AGENT_FLIGHT_HEIGHT};
use crate::rng::SimRng;
use crate::world::SimContext;

/// Energy cost of a trip of `dist`, before the agent's modifiers.
fn trip_cost(a: &Agent, dist: f64, per_unit: f64) -> f64 {
    let mut cost = dist * per_unit;
    if a.is_tethered() {
        cost *= 0.5;
    }
    cost
}

/// Workaholics take jobs they cannot pay for.
fn can_afford(a: &Agent, cost: f64) -> bool {
    cost <= a.energy || a.has_trait(AgentTraits::WORKAHOLIC)
}

/// Point `dist` away from `center`, rotated 0.4 rad from the agent's bearing.
pub fn orbiting_waypoint(rng: &mut SimRng, pos: Vec2, center: Vec2, dist: f64, clockwise: bool) -> Vec2 {
    let direction = if pos == center {
        Vec2::from_angle(rng.rad())
    } else {
        pos.direction_to(center)
    };
    let angle = if clockwise { 0.4 } else { -0.4 };
    direction.rotated(angle) * dist + center
}

fn agent_orbit(rng: &mut SimRng, a: &Agent, center: Vec2) -> Vec2 {
    let clockwise = !a.has_trait(AgentTraits::COUNTER_CLOCKWISE);
    orbiting_waypoint(rng, a.pos, center, a.dist, clockwise)
}

/// Next leg towards `target`: jump close when already within `pref`,
/// otherwise cover up to ~96 units of the remaining distance.
pub fn get_closer_waypoint(rng: &mut SimRng, pos: Vec2, target: Vec2, spread: f64, pref: f64) -> Vec2 {
    let current = pos.dist(target);
    if current <= pref {
        return target + rng.offset(-spread, spread);
    }
    let step = (96.0 * rng.float_range(0.8, 1.2)).min((current - pref).max(24.0));
    pos.direction_to(target) * step + pos + rng.offset(-28.0, 28.0)
}

/// Waypoint that keeps a chasing fighter around its weapon range.
pub fn follow_waypoint(rng: &mut SimRng, a: &Agent, target: Vec2) -> Vec2 {
    let range = a.stats.weapon.map_or(0.0, |w| w.attack_range) * 0.8;
    let pref = range.max(80.0);
    get_closer_waypoint(rng, a.pos, target, range, pref)
}

/// Resource waypoint: just above the source, slightly scattered.
fn source_waypoint(rng: &mut SimRng, source: Vec2) -> Vec2 {
    (source - Vec2::new(0.0, AGENT_FLIGHT_HEIGHT) + rng.offset(-8.0, 8.0)).rounded()
}

/// Try to switch `a` into `mode`. `aux` carries a position (Move, Merging)
/// or a scalar in `aux.x` (Posing duration, RoombaWait duration).
///
/// Panics for turrets: they never leave GuardForever.
pub fn assign_mode(
    ctx: &mut SimContext,
    a: &mut Agent,
    mode: AgentMode,
    aux: Vec2,
    target: Option<AgentTarget>,
) -> bool {
    if a.is_turret() {
        panic!("turret {:?} can't be assigned to {:?}", a.kind(), mode);
    }
    if a.disposed {
        return false;
    }
    let Some((colony_pos, colony_radius, patrol_radius, storage_pos, entrance_pos)) = ctx
        .colony(a.colony)
        .map(|c| (c.pos, c.radius, c.patrol_radius(), c.storage_pos(), c.entrance_pos()))
    else {
        return false;
    };
    let target_pos = target.and_then(|t| ctx.target_pos(t));
    let rng = &mut ctx.rng;

    let mut next_mode = mode;
    match mode {
        AgentMode::Return => {
            let lane = rng.int_range(0, 2) as f64;
            a.waypoint = storage_pos + Vec2::new(0.0, lane * 8.0);
        }
        AgentMode::Patrol => {
            a.dist = patrol_radius;
            a.waypoint = agent_orbit(rng, a, colony_pos);
            a.waypoints_left = rng.int_range(40, 70) as i32;
        }
        AgentMode::WaitCloning => {
            if target_pos.is_none() {
                return false;
            }
            a.waypoint = Vec2::ZERO;
        }
        AgentMode::MakeClone => {
            let Some(tpos) = target_pos else {
                return false;
            };
            a.dist = rng.float_range(1.2, 2.0);
            a.energy_bill += 20.0;
            a.waypoint = tpos.direction_to(a.pos) * 110.0 + tpos + rng.offset(-20.0, 20.0);
        }
        AgentMode::Merging | AgentMode::MergingRoomba => {
            if target_pos.is_none() {
                return false;
            }
            if mode == AgentMode::MergingRoomba
                && !ctx.state.path_grid.is_pos_free(aux + Vec2::new(0.0, AGENT_FLIGHT_HEIGHT))
            {
                return false;
            }
            a.dist = rng.float_range(8.0, 10.0);
            if mode == AgentMode::MergingRoomba {
                a.dist *= 1.5;
            }
            a.waypoint = aux;
        }
        AgentMode::AlignStandby => {
            a.waypoint = a.pos - Vec2::new(0.0, AGENT_FLIGHT_HEIGHT - a.height);
        }
        AgentMode::Move => {
            a.waypoint = aux;
        }
        AgentMode::Panic => {
            a.waypoint = a.pos;
            a.waypoints_left = rng.int_range(4, 9) as i32;
        }
        AgentMode::Standby => {
            let max = if a.stats.can_patrol {
                colony_radius
            } else {
                colony_radius * 0.65
            };
            a.dist = rng.float_range(40.0, max);
            a.waypoint = agent_orbit(rng, a, colony_pos);
            a.waypoints_left = 0;
        }
        AgentMode::Follow | AgentMode::Attack => {
            let Some(tpos) = target_pos else {
                return false;
            };
            let from_patrol = a.mode == AgentMode::Patrol;
            next_mode = AgentMode::Follow;
            a.waypoint = follow_waypoint(rng, a, tpos);
            let mut legs = if from_patrol {
                rng.int_range(4, 6)
            } else {
                rng.int_range(6, 8)
            };
            if mode == AgentMode::Attack {
                legs += 5;
                if a.has_trait(AgentTraits::DO_OR_DIE) {
                    legs += 15;
                }
            }
            a.waypoints_left = legs as i32;
        }
        AgentMode::CloakHide | AgentMode::Charging | AgentMode::ForcedCharging => {
            a.waypoint = Vec2::ZERO;
        }
        AgentMode::Posing => {
            a.dist = aux.x;
            a.waypoint = Vec2::ZERO;
        }
        AgentMode::CourierFlight => {
            let Some(tpos) = target_pos else {
                return false;
            };
            let mut cost = (a.pos.dist(tpos) * 0.33).min(100.0);
            if a.is_tethered() {
                cost *= 0.5;
            }
            if a.kind() == AgentKind::Trucker {
                cost *= 0.8;
            }
            a.energy_bill += cost;
            a.waypoint = a.pos;
        }
        AgentMode::Scavenge => {
            let Some(tpos) = target_pos else {
                return false;
            };
            let cost = trip_cost(a, a.pos.dist(tpos), 0.33);
            if !can_afford(a, cost) {
                return false;
            }
            a.energy_bill += cost;
            next_mode = AgentMode::MineEssence;
            a.waypoint = source_waypoint(rng, tpos);
        }
        AgentMode::MineEssence => {
            if !a.stats.can_gather {
                return false;
            }
            if matches!(a.kind(), AgentKind::Courier | AgentKind::Trucker) && (a.energy < 120.0 || a.energy_bill > 10.0) {
                return false;
            }
            let Some(source) = target.and_then(|t| t.source()) else {
                return false;
            };
            let Some(tpos) = target_pos else {
                return false;
            };
            let red_oil = ctx
                .world
                .get::<&crate::components::EssenceSource>(source)
                .map_or(false, |s| s.kind.requires_redminer());
            if red_oil && a.kind() != AgentKind::Redminer {
                return false;
            }
            let cost = trip_cost(a, a.pos.dist(tpos), 0.5);
            if !can_afford(a, cost) {
                return false;
            }
            a.energy_bill += cost;
            a.waypoint = source_waypoint(rng, tpos);
        }
        AgentMode::Takeoff | AgentMode::ResourceTakeoff => {
            a.waypoint = a.pos - Vec2::new(0.0, AGENT_FLIGHT_HEIGHT);
        }
        AgentMode::Pickup => {
            a.waypoint = a.pos + Vec2::new(0.0, AGENT_FLIGHT_HEIGHT);
        }
        AgentMode::RecycleReturn => {
            a.waypoint = entrance_pos - Vec2::new(0.0, AGENT_FLIGHT_HEIGHT);
        }
        AgentMode::RecycleLanding => {
            a.waypoint = entrance_pos;
        }
        AgentMode::RepairTurret | AgentMode::RepairBase => {
            let center = if mode == AgentMode::RepairBase {
                colony_pos
            } else {
                let Some(tpos) = target_pos else {
                    return false;
                };
                tpos
            };
            if !can_afford(a, 40.0) {
                return false;
            }
            a.energy_bill += 40.0;
            a.dist = rng.float_range(3.0, 4.0);
            a.waypoint = Vec2::from_angle(rng.rad()) * 64.0 + center;
        }
        AgentMode::BuildBuilding | AgentMode::CaptureBuilding => {
            let Some(tpos) = target_pos else {
                return false;
            };
            let cost = a.pos.dist(tpos) * 0.6;
            if !can_afford(a, cost) {
                return false;
            }
            a.energy_bill += cost;
            a.dist = rng.float_range(5.0, 7.0);
            a.waypoint = Vec2::from_angle(rng.rad()) * 64.0 + tpos;
        }
        AgentMode::KamikazeAttack => {
            if target_pos.is_none() {
                return false;
            }
            a.waypoint = Vec2::ZERO;
        }
        AgentMode::ConsumeDrone => {
            let Some(tpos) = target_pos else {
                return false;
            };
            a.waypoint = tpos + rng.offset(-4.0, 4.0);
        }
        AgentMode::RoombaWait => {
            a.dist = aux.x;
            a.waypoint = Vec2::ZERO;
        }
        AgentMode::RoombaPatrol | AgentMode::GuardForever => {
            a.waypoint = Vec2::ZERO;
        }
    }

    a.mode = next_mode;
    a.target = target;
    true
}

/// [`assign_mode`] for an agent still attached to the world.
pub fn assign_mode_to(
    ctx: &mut SimContext,
    e: Entity,
    mode: AgentMode,
    aux: Vec2,
    target: Option<AgentTarget>,
) -> bool {
    ctx.with_agent(e, |a, ctx| assign_mode(ctx, a, mode, aux, target))
        .unwrap_or(false)
}
