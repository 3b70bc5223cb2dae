//! Agent weapons: target acquisition, attack resolution and the projectile
//! queue.

use dronecolony_logic::stats::{AgentKind, DamageValue, WeaponStats, DEVOURER_MAX_LEVEL};
use hecs::Entity;

use super::damage::{damage_agent, damage_colony, damage_creep};
use crate::components::{Agent, Creep, SearchFlags, Vec2};
use crate::presentation::SoundKind;
use crate::rng::rand_order;
use crate::spatial::snipe_pos;
use crate::world::{DamageSource, HitTarget, PendingHit, SimContext};

/// Prisms reflect through allied prisms within this radius.
pub const PRISM_REFLECT_RADIUS: f64 = 196.0;
pub const PRISM_MAX_REFLECTIONS: u32 = 4;

pub fn is_valid_creep_target(pos: Vec2, creep: &Creep, weapon: &WeaponStats) -> bool {
    if creep.disposed || creep.is_cloaked() {
        return false;
    }
    if !weapon.can_target(creep.target_kind()) {
        return false;
    }
    let mut range_sqr = weapon.attack_range_sqr();
    if creep.is_marked() {
        range_sqr *= weapon.range_mark_multiplier;
    }
    creep.pos.dist_sqr(pos) <= range_sqr
}

/// Up to `weapon.max_targets` creeps in range of `pos`.
///
/// The cluster window around `pos` is expanded by the weapon range and
/// walked in a random x/y direction; each cluster is scanned from a random
/// start. The fallback cluster is checked last.
pub fn find_attack_targets(ctx: &mut SimContext, pos: Vec2, weapon: &WeaponStats) -> Vec<Entity> {
    let max = weapon.max_targets.max(1);
    let mut targets = Vec::with_capacity(max);

    let SimContext { world, rng, state, .. } = ctx;
    let grid = &state.creep_grid;

    let scan = |cell: &[Entity], targets: &mut Vec<Entity>, rng: &mut crate::rng::SimRng| -> bool {
        for i in rand_order(rng, cell.len()) {
            let e = cell[i];
            let valid = world
                .get::<&Creep>(e)
                .map_or(false, |c| is_valid_creep_target(pos, &c, weapon));
            if valid {
                targets.push(e);
                if targets.len() >= max {
                    return true;
                }
            }
        }
        false
    };

    if let Some(((x0, y0), (x1, y1))) = grid.search_window(pos, weapon.attack_range) {
        let mut xs: Vec<usize> = (x0..=x1).collect();
        let mut ys: Vec<usize> = (y0..=y1).collect();
        if rng.bool() {
            xs.reverse();
        }
        if rng.bool() {
            ys.reverse();
        }
        for &y in &ys {
            for &x in &xs {
                if scan(grid.cell(x, y), &mut targets, rng) {
                    return targets;
                }
            }
        }
    }
    scan(&grid.fallback, &mut targets, rng);
    targets
}

/// Weapon sub-routine, run every tick before the mode update.
pub fn process_attack(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    let Some(weapon) = a.stats.weapon else {
        return;
    };
    // Disintegrators fire through their support routine.
    if a.kind() == AgentKind::Disintegrator {
        return;
    }

    a.attack_delay = (a.attack_delay - delta * a.reload_rate).max(0.0);
    if a.attack_delay != 0.0 || a.is_cloaked() {
        return;
    }

    let targets = find_attack_targets(ctx, a.pos, &weapon);
    if targets.is_empty() {
        a.attack_delay = 0.75 * ctx.rng.float_range(0.8, 1.4);
        return;
    }

    let mut multiplier = ctx.rng.float_range(0.8, 1.2);
    if a.kind() == AgentKind::BeamTower {
        multiplier += a.special_delay * 0.3;
        a.special_delay += (weapon.reload + 1.75) * multiplier;
    }
    a.attack_delay = weapon.reload * multiplier;

    match a.kind() {
        AgentKind::Destroyer => {
            let target = targets[0];
            let Some((tpos, flying)) = creep_info(ctx, target) else {
                return;
            };
            ctx.state.presentation.create_beam(a.pos + Vec2::new(-4.0, 0.0), tpos);
            ctx.state.presentation.create_beam(a.pos + Vec2::new(4.0, 0.0), tpos);
            damage_creep(ctx, target, &weapon.damage_against(flying));
        }
        AgentKind::Prism => prism_attack(ctx, a, targets[0], &weapon),
        AgentKind::Devourer => {
            let burst = weapon.burst_size + a.devourer_level.min(DEVOURER_MAX_LEVEL);
            attack_targets(ctx, a, &targets, &weapon, burst);
        }
        _ => attack_targets(ctx, a, &targets, &weapon, weapon.burst_size),
    }

    let sound = if weapon.is_beam() { SoundKind::Beam } else { SoundKind::Shot };
    ctx.state.presentation.play_sound(sound, a.pos);
}

fn creep_info(ctx: &SimContext, e: Entity) -> Option<(Vec2, bool)> {
    ctx.world
        .get::<&Creep>(e)
        .ok()
        .filter(|c| !c.disposed)
        .map(|c| (c.pos, c.is_flying()))
}

fn agent_source(a: &Agent) -> DamageSource {
    DamageSource {
        pos: a.pos,
        flying: a.is_flying(),
        creep: None,
    }
}

/// Beams hit at once; projectiles are queued in sub-bursts of
/// `attacks_per_burst`, each sub-burst `burst_delay` after the previous one.
pub fn attack_targets(ctx: &mut SimContext, a: &Agent, targets: &[Entity], weapon: &WeaponStats, burst: u32) {
    let source = agent_source(a);
    for &target in targets {
        let Some((tpos, flying)) = creep_info(ctx, target) else {
            continue;
        };
        let damage = weapon.damage_against(flying);
        if weapon.is_beam() {
            ctx.state.presentation.create_beam(a.pos, tpos);
            damage_creep(ctx, target, &damage);
            continue;
        }

        let velocity = ctx
            .world
            .get::<&Creep>(target)
            .map_or(Vec2::ZERO, |c| {
                if c.waypoint.is_zero() {
                    Vec2::ZERO
                } else {
                    c.pos.direction_to(c.waypoint) * c.movement_speed()
                }
            });
        let aim = snipe_pos(weapon.projectile_speed, a.pos, tpos, velocity);
        let travel = a.pos.dist(aim) / weapon.projectile_speed;

        let per_burst = weapon.attacks_per_burst.max(1);
        let mut wave = 0;
        let mut i = 0;
        while i < burst {
            let n = per_burst.min(burst - i);
            for _ in 0..n {
                ctx.state.pending_hits.push(PendingHit {
                    target: HitTarget::Creep(target),
                    damage,
                    delay: f64::from(wave) * weapon.burst_delay + travel,
                    source,
                });
            }
            wave += 1;
            i += per_burst;
        }
    }
}

/// Chain the shot through allied prisms: each reflection adds one damage
/// and delays the reflecting prism's next shot.
fn prism_attack(ctx: &mut SimContext, a: &Agent, target: Entity, weapon: &WeaponStats) {
    let Some((tpos, flying)) = creep_info(ctx, target) else {
        return;
    };
    let mut damage = weapon.damage;
    let mut current = a.pos;
    let mut reflections: Vec<(Entity, u32, Vec2, Vec2)> = Vec::new();

    if let Some(colony) = ctx.colonies.get(a.colony.index()) {
        let radius_sqr = PRISM_REFLECT_RADIUS * PRISM_REFLECT_RADIUS;
        let mut n = 0;
        colony.agents.collect(
            &ctx.world,
            &mut ctx.rng,
            SearchFlags::FIGHTERS | SearchFlags::RANDOMIZED,
            PRISM_MAX_REFLECTIONS as usize,
            |x| {
                if x.kind() != AgentKind::Prism {
                    return false;
                }
                if x.pos.dist_sqr(current) > radius_sqr {
                    return false;
                }
                reflections.push((x.id, n, current, x.pos));
                n += 1;
                damage.health += 1.0;
                current = x.pos;
                true
            },
        );
    }

    for &(ally, n, from, to) in &reflections {
        ctx.state.presentation.create_beam(from, to);
        if let Ok(mut ally) = ctx.world.get::<&mut Agent>(ally) {
            ally.attack_delay += f64::from(n) * 0.1;
        }
    }
    if reflections.len() as u32 == PRISM_MAX_REFLECTIONS {
        damage.health += 1.0;
    }
    ctx.state.presentation.create_beam(current, tpos);
    let damage = damage.with_health_multiplier(weapon.damage_multiplier(flying));
    damage_creep(ctx, target, &damage);
}

/// Disintegrator shot: one heavy projectile at the first target.
pub fn fire_projectile(ctx: &mut SimContext, a: &Agent, target: Entity, weapon: &WeaponStats) {
    attack_targets(ctx, a, &[target], weapon, 1);
}

/// Land every queued hit whose delay ran out.
pub fn resolve_pending_hits(ctx: &mut SimContext, delta: f64) {
    let mut due = Vec::new();
    ctx.state.pending_hits.retain_mut(|hit| {
        hit.delay -= delta;
        if hit.delay <= 0.0 {
            due.push(*hit);
            false
        } else {
            true
        }
    });
    for hit in due {
        apply_hit(ctx, &hit);
    }
}

fn apply_hit(ctx: &mut SimContext, hit: &PendingHit) {
    match hit.target {
        HitTarget::Creep(e) => {
            damage_creep(ctx, e, &hit.damage);
        }
        HitTarget::Agent(e) => damage_agent(ctx, e, &hit.damage, &hit.source),
        HitTarget::Colony(id) => damage_colony(ctx, id, &hit.damage),
    }
}

/// A ready-made hit for tests and creep attacks.
pub fn queue_hit(ctx: &mut SimContext, target: HitTarget, damage: DamageValue, delay: f64, source: DamageSource) {
    ctx.state.pending_hits.push(PendingHit {
        target,
        damage,
        delay,
        source,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ColonyCore, ColonyId, Rect};
    use dronecolony_logic::creeps::{CRAWLER, STEALTH_CRAWLER, WANDERER};
    use dronecolony_logic::stats::{DEN_CORE, FIGHTER, PRISM, SCARAB};

    fn context() -> (SimContext, ColonyId) {
        let mut ctx = SimContext::new(Rect::from_size(1600.0, 1600.0), 31);
        let id = ctx.add_colony(ColonyCore::new(ColonyId(0), &DEN_CORE, Vec2::new(800.0, 800.0)));
        (ctx, id)
    }

    fn creep_at(ctx: &mut SimContext, stats: &'static dronecolony_logic::creeps::CreepStats, pos: Vec2) -> Entity {
        let e = ctx.spawn_creep(Creep::new(stats, pos, false));
        ctx.rebuild_creep_grid();
        e
    }

    #[test]
    fn test_targets_respect_range_and_flags() {
        let (mut ctx, _) = context();
        let near = creep_at(&mut ctx, &CRAWLER, Vec2::new(850.0, 800.0));
        let _far = creep_at(&mut ctx, &CRAWLER, Vec2::new(1300.0, 800.0));
        let flyer = creep_at(&mut ctx, &WANDERER, Vec2::new(820.0, 820.0));
        let _hidden = creep_at(&mut ctx, &STEALTH_CRAWLER, Vec2::new(810.0, 800.0));

        let scarab = SCARAB.weapon.unwrap();
        let targets = find_attack_targets(&mut ctx, Vec2::new(800.0, 800.0), &scarab);
        assert_eq!(targets, vec![near]);

        let mut wide = FIGHTER.weapon.unwrap();
        wide.max_targets = 10;
        let targets = find_attack_targets(&mut ctx, Vec2::new(800.0, 800.0), &wide);
        assert_eq!(targets.len(), 2);
        assert!(targets.contains(&flyer));
    }

    #[test]
    fn test_projectiles_split_into_sub_bursts() {
        let (mut ctx, id) = context();
        let target = creep_at(&mut ctx, &CRAWLER, Vec2::new(900.0, 800.0));
        let mut a = Agent::new(&FIGHTER, id, Vec2::new(800.0, 800.0));
        a.init(&mut ctx.rng);
        let mut weapon = FIGHTER.weapon.unwrap();
        weapon.attacks_per_burst = 2;
        attack_targets(&mut ctx, &a, &[target], &weapon, 5);
        let delays: Vec<f64> = ctx.state.pending_hits.iter().map(|h| h.delay).collect();
        assert_eq!(delays.len(), 5);
        let travel = delays[0];
        assert!((delays[2] - travel - weapon.burst_delay).abs() < 1e-9);
        assert!((delays[4] - travel - 2.0 * weapon.burst_delay).abs() < 1e-9);
    }

    #[test]
    fn test_pending_hits_land_after_delay() {
        let (mut ctx, _) = context();
        let target = creep_at(&mut ctx, &CRAWLER, Vec2::new(900.0, 800.0));
        let source = DamageSource {
            pos: Vec2::ZERO,
            flying: true,
            creep: None,
        };
        queue_hit(&mut ctx, HitTarget::Creep(target), DamageValue::health(5.0), 0.5, source);
        resolve_pending_hits(&mut ctx, 0.25);
        assert_eq!(ctx.world.get::<&Creep>(target).unwrap().health, CRAWLER.max_health);
        resolve_pending_hits(&mut ctx, 0.25);
        assert_eq!(ctx.world.get::<&Creep>(target).unwrap().health, CRAWLER.max_health - 5.0);
        assert!(ctx.state.pending_hits.is_empty());
    }

    #[test]
    fn test_prism_reflections_add_damage() {
        let (mut ctx, id) = context();
        let target = creep_at(&mut ctx, &WANDERER, Vec2::new(900.0, 800.0));
        for i in 0..5 {
            let e = ctx.spawn_agent(Agent::new(&PRISM, id, Vec2::new(700.0 + f64::from(i) * 10.0, 800.0)));
            ctx.attach_agent(id, e);
        }
        let mut shooter = Agent::new(&PRISM, id, Vec2::new(690.0, 800.0));
        shooter.init(&mut ctx.rng);
        let weapon = PRISM.weapon.unwrap();
        prism_attack(&mut ctx, &shooter, target, &weapon);
        // Four reflections plus the cap bonus.
        let expected = WANDERER.max_health - (weapon.damage.health + 4.0 + 1.0);
        let health = ctx.world.get::<&Creep>(target).unwrap().health;
        assert!((health - expected).abs() < 1e-9);
    }
}
