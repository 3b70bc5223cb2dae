//! Creep behavior: march on the nearest colony and shoot whatever is in
//! range along the way.

use dronecolony_logic::stats::TargetKind;
use hecs::Entity;

use super::combat::queue_hit;
use crate::components::{Agent, ColonyId, Creep, Vec2, STEALTH_REVEAL_TIME};
use crate::presentation::SoundKind;
use crate::world::{DamageSource, HitTarget, SimContext};

/// Creeps halt at this share of their weapon range from a colony.
const HALT_RANGE_FACTOR: f64 = 0.8;
/// Unarmed creeps close in this far.
const UNARMED_HALT_DIST: f64 = 60.0;
const CREEP_PROJECTILE_SPEED: f64 = 300.0;
const RETARGET_DELAY: f64 = 0.3;

pub fn update_creeps(ctx: &mut SimContext, delta: f64) {
    for e in ctx.creep_entities() {
        ctx.with_creep(e, |c, ctx| update_creep(ctx, c, delta));
    }
}

pub fn update_creep(ctx: &mut SimContext, c: &mut Creep, delta: f64) {
    if c.disposed {
        return;
    }
    c.slow = (c.slow - delta).max(0.0);
    c.marked = (c.marked - delta).max(0.0);
    c.revealed = (c.revealed - delta).max(0.0);

    advance(ctx, c, delta);
    attack(ctx, c, delta);
}

fn nearest_colony(ctx: &SimContext, pos: Vec2) -> Option<(ColonyId, Vec2)> {
    ctx.colonies
        .iter()
        .filter(|x| !x.disposed)
        .min_by(|a, b| a.pos.dist_sqr(pos).total_cmp(&b.pos.dist_sqr(pos)))
        .map(|x| (x.id, x.pos))
}

fn advance(ctx: &SimContext, c: &mut Creep, delta: f64) {
    let Some((_, target)) = nearest_colony(ctx, c.pos) else {
        c.waypoint = Vec2::ZERO;
        return;
    };
    let halt = c
        .stats
        .weapon
        .map_or(UNARMED_HALT_DIST, |w| w.attack_range * HALT_RANGE_FACTOR);
    if c.pos.dist_sqr(target) <= halt * halt {
        c.waypoint = Vec2::ZERO;
        return;
    }
    c.waypoint = target;
    c.pos = c.pos.move_towards(target, c.movement_speed() * delta);
}

/// Closest agent this creep's weapon may hit.
fn find_agent_target(ctx: &SimContext, c: &Creep, range_sqr: f64) -> Option<(Entity, Vec2, bool)> {
    let weapon = c.stats.weapon?;
    let mut best: Option<(Entity, Vec2, bool, f64)> = None;
    for (e, a) in ctx.world.query::<&Agent>().iter() {
        if a.disposed || a.is_cloaked() || !weapon.can_target(a.target_kind()) {
            continue;
        }
        let dist_sqr = a.pos.dist_sqr(c.pos);
        if dist_sqr > range_sqr {
            continue;
        }
        // Entity id breaks ties so query order never matters.
        let better = best.map_or(true, |(be, _, _, bd)| dist_sqr < bd || (dist_sqr == bd && e.id() < be.id()));
        if better {
            best = Some((e, a.pos, a.is_flying(), dist_sqr));
        }
    }
    best.map(|(e, pos, flying, _)| (e, pos, flying))
}

fn find_colony_target(ctx: &SimContext, c: &Creep, range_sqr: f64) -> Option<(ColonyId, Vec2)> {
    let weapon = c.stats.weapon?;
    let (id, pos) = nearest_colony(ctx, c.pos)?;
    let in_flight = ctx.colony(id).map_or(false, |x| x.is_in_flight());
    if !weapon.can_target(TargetKind::from_flying(in_flight)) {
        return None;
    }
    (pos.dist_sqr(c.pos) <= range_sqr).then_some((id, pos))
}

fn attack(ctx: &mut SimContext, c: &mut Creep, delta: f64) {
    let (Some(weapon), Some(damage)) = (c.stats.weapon, c.shot_damage()) else {
        return;
    };
    c.attack_delay = (c.attack_delay - delta).max(0.0);
    if c.attack_delay != 0.0 {
        return;
    }

    let range_sqr = weapon.attack_range_sqr();
    let (target, target_pos, damage) = if let Some((e, pos, flying)) = find_agent_target(ctx, c, range_sqr) {
        let multiplier = weapon.damage_multiplier(flying);
        (HitTarget::Agent(e), pos, damage.with_health_multiplier(multiplier))
    } else if let Some((id, pos)) = find_colony_target(ctx, c, range_sqr) {
        (HitTarget::Colony(id), pos, damage)
    } else {
        c.attack_delay = RETARGET_DELAY;
        return;
    };

    let travel = c.pos.dist(target_pos) / CREEP_PROJECTILE_SPEED;
    let source = DamageSource {
        pos: c.pos,
        flying: c.is_flying(),
        creep: Some(c.id),
    };
    queue_hit(ctx, target, damage, travel, source);
    c.attack_delay = weapon.reload * ctx.rng.float_range(0.9, 1.1);
    if c.stats.stealth {
        c.revealed = STEALTH_REVEAL_TIME;
    }
    ctx.state.presentation.play_sound(SoundKind::Shot, c.pos);
}
