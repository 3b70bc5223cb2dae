//! Damage reactions for agents, creeps and colony cores.

use dronecolony_logic::resources::SourceKind;
use dronecolony_logic::stats::{AgentKind, DamageValue, UnitSize};
use hecs::Entity;

use super::agent_modes::assign_mode;
use crate::components::{Agent, AgentMode, AgentTarget, AgentTraits, ColonyId, ColonyPriority, EssenceSource, Vec2};
use crate::events::SimEvent;
use crate::presentation::{EffectKind, SoundKind};
use crate::spatial::retreat_pos;
use crate::world::{DamageSource, SimContext};

/// Damage that wipes anything it touches; used for colony destruction and
/// landing stomps.
pub const LETHAL_DAMAGE: f64 = 1000.0;

pub fn damage_agent(ctx: &mut SimContext, e: Entity, damage: &DamageValue, source: &DamageSource) {
    ctx.with_agent(e, |a, ctx| on_agent_damage(ctx, a, damage, source));
}

pub fn on_agent_damage(ctx: &mut SimContext, a: &mut Agent, damage: &DamageValue, source: &DamageSource) {
    if a.disposed {
        return;
    }
    a.health -= damage.health;
    if a.health < 0.0 {
        explode(ctx, a);
        a.disposed = true;
        return;
    }

    if !a.is_turret() {
        let security = ctx.colony(a.colony).map_or(1.0, |c| c.security_priority());
        if security < 0.3 && ctx.rng.chance(1.0 - security) {
            ctx.add_priority(a.colony, ColonyPriority::Security, 0.01);
        }
    }

    a.energy = (a.energy - damage.energy).max(0.0);
    a.slow = (a.slow + damage.slow).min(5.0);

    if a.health <= a.max_health * 0.33 || a.health <= damage.health {
        on_low_health(ctx, a, source);
    }

    if damage.morale != 0.0 && a.is_flying() {
        match a.mode {
            AgentMode::MineEssence => {
                a.clear_cargo();
                assign_mode(ctx, a, AgentMode::Standby, Vec2::ZERO, None);
            }
            AgentMode::Patrol | AgentMode::Standby | AgentMode::Follow => {
                if !ctx.rng.chance(damage.morale) {
                    return;
                }
                if ctx.rng.float() < 0.4 {
                    assign_mode(ctx, a, AgentMode::Panic, Vec2::ZERO, None);
                } else {
                    let dist = ctx.rng.float_range(80.0, 140.0);
                    let pos = retreat_pos(&mut ctx.rng, a.pos, source.pos, dist);
                    assign_mode(ctx, a, AgentMode::Move, pos, None);
                }
            }
            _ => {}
        }
    }
}

fn on_low_health(ctx: &mut SimContext, a: &mut Agent, source: &DamageSource) {
    if a.kind() == AgentKind::Kamikaze && source.flying {
        if let (
            AgentMode::Patrol | AgentMode::Standby | AgentMode::MineEssence | AgentMode::Return | AgentMode::Follow,
            Some(creep),
        ) = (a.mode, source.creep)
        {
            a.heal(10.0);
            a.dist = 0.1 + ctx.rng.float_range(0.05, 0.25);
            assign_mode(ctx, a, AgentMode::KamikazeAttack, Vec2::ZERO, Some(AgentTarget::Creep(creep)));
            return;
        }
    }

    // Relocation keeps everyone close to the core.
    if !ctx.colony(a.colony).map_or(false, |c| c.is_normal()) {
        return;
    }
    if !matches!(a.mode, AgentMode::Standby | AgentMode::Follow | AgentMode::Patrol) {
        return;
    }

    if a.stats.can_cloak && !a.is_cloaked() && a.special_delay == 0.0 {
        assign_mode(ctx, a, AgentMode::CloakHide, Vec2::ZERO, None);
        a.cloak(ctx.rng.float_range(6.0, 10.0));
        a.special_delay = ctx.rng.float_range(6.0, 10.0);
        return;
    }

    if a.has_trait(AgentTraits::LOW_HP_BERSERK) {
        let pos = source.pos + ctx.rng.offset(-20.0, 20.0);
        assign_mode(ctx, a, AgentMode::Move, pos, None);
    } else if a.has_trait(AgentTraits::LOW_HP_RECYCLE) {
        if ctx.rng.chance(0.8) {
            assign_mode(ctx, a, AgentMode::RecycleReturn, Vec2::ZERO, None);
        }
    } else if a.has_trait(AgentTraits::LOW_HP_RETREAT) {
        let dist = ctx.rng.float_range(80.0, 140.0);
        let pos = retreat_pos(&mut ctx.rng, a.pos, source.pos, dist);
        assign_mode(ctx, a, AgentMode::Move, pos, None);
    } else if a.has_trait(AgentTraits::LOW_HP_PANIC) {
        assign_mode(ctx, a, AgentMode::Panic, Vec2::ZERO, None);
    }
}

pub fn spawn_scrap(ctx: &mut SimContext, kind: SourceKind, pos: Vec2) -> Entity {
    let stats = kind.stats();
    let amount = ctx
        .rng
        .int_range(i64::from(stats.min_capacity), i64::from(stats.max_capacity)) as u32;
    ctx.spawn_source(EssenceSource::new(kind, pos, amount))
}

/// Death effects of an agent: ground units may leave scrap; flying units
/// nudge colony priorities and may drop wreckage.
pub fn explode(ctx: &mut SimContext, a: &Agent) {
    ctx.state.presentation.play_sound(SoundKind::Explosion, a.pos);
    if !a.is_flying() {
        ctx.state.presentation.create_effect(EffectKind::Explosion, a.pos);
        if a.is_turret() || ctx.rng.chance(0.3) {
            spawn_scrap(ctx, SourceKind::Scrap, a.pos + Vec2::new(0.0, 2.0));
        }
        return;
    }

    let security = ctx.colony(a.colony).map_or(1.0, |c| c.security_priority());
    if security < 0.4 {
        ctx.add_priority(a.colony, ColonyPriority::Security, 0.04);
    }
    if ctx.rng.chance(0.6) {
        ctx.add_priority(a.colony, ColonyPriority::Growth, 0.01);
    }
    let roll = ctx.rng.float();
    if roll < 0.3 {
        ctx.state.presentation.create_effect(EffectKind::Explosion, a.pos);
    } else if roll > 0.6 {
        let kind = if a.stats.size == UnitSize::Small {
            SourceKind::SmallScrap
        } else {
            SourceKind::Scrap
        };
        let ground = a.pos + Vec2::new(0.0, a.height);
        spawn_scrap(ctx, kind, ground);
    }
}

/// Hit a creep. Kill bookkeeping (result, scrap drop) happens here.
pub fn damage_creep(ctx: &mut SimContext, e: Entity, damage: &DamageValue) -> bool {
    let killed = ctx.with_creep(e, |c, ctx| {
        if !c.apply_damage(damage) {
            return None;
        }
        ctx.state.result.creeps_defeated += 1;
        ctx.state.result.creep_total_value += u64::from(c.value);
        ctx.state.presentation.create_effect(EffectKind::SmallExplosion, c.pos);
        Some((c.pos, c.is_flying()))
    });
    let Some(Some((pos, flying))) = killed else {
        return false;
    };
    if !flying && ctx.rng.chance(0.3) {
        spawn_scrap(ctx, SourceKind::CreepScrap, pos);
    }
    true
}

pub fn damage_colony(ctx: &mut SimContext, id: ColonyId, damage: &DamageValue) {
    let Some(colony) = ctx.colony_mut(id) else {
        return;
    };
    if colony.disposed {
        return;
    }
    colony.health -= damage.health;
    if colony.health < 0.0 {
        destroy_colony(ctx, id);
        return;
    }
    let under_attack = damage.health != 0.0 && colony.warning_cooldown == 0.0 && colony.health <= colony.max_health * 0.75;
    if under_attack {
        colony.warning_cooldown = 45.0;
        let pos = colony.pos;
        ctx.emit(SimEvent::ColonyUnderAttack { colony: id });
        ctx.state.presentation.play_sound(SoundKind::Alarm, pos);
    }
    if ctx.rng.chance(0.7) {
        ctx.add_priority(id, ColonyPriority::Security, 0.02);
    }
}

/// Every owned unit dies with the core.
pub fn destroy_colony(ctx: &mut SimContext, id: ColonyId) {
    let Some(colony) = ctx.colony_mut(id) else {
        return;
    };
    if colony.disposed {
        return;
    }
    colony.disposed = true;
    let pos = colony.pos;
    let footprint = crate::spatial::footprint_coord(pos);
    let landed = colony.is_normal() && colony.height == 0.0;
    let units = colony.all_units();
    if landed {
        ctx.state.path_grid.set_2x2(footprint, false);
    }

    let source = DamageSource {
        pos,
        flying: false,
        creep: None,
    };
    let lethal = DamageValue::health(LETHAL_DAMAGE);
    for e in units {
        damage_agent(ctx, e, &lethal, &source);
    }

    log::info!("colony {} destroyed at ({:.0}, {:.0})", id.0, pos.x, pos.y);
    ctx.state.result.colonies_lost += 1;
    ctx.state.presentation.create_effect(EffectKind::Explosion, pos);
    ctx.emit(SimEvent::ColonyDestroyed { colony: id });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ColonyCore, Creep, Rect};
    use dronecolony_logic::creeps::{CRAWLER, WANDERER};
    use dronecolony_logic::stats::{DEN_CORE, KAMIKAZE, SCOUT, WORKER};

    fn context() -> (SimContext, ColonyId) {
        let mut ctx = SimContext::new(Rect::from_size(1600.0, 1600.0), 21);
        let id = ctx.add_colony(ColonyCore::new(ColonyId(0), &DEN_CORE, Vec2::new(800.0, 800.0)));
        (ctx, id)
    }

    fn spawn(ctx: &mut SimContext, stats: &'static dronecolony_logic::stats::AgentStats, id: ColonyId) -> Entity {
        let e = ctx.spawn_agent(Agent::new(stats, id, Vec2::new(800.0, 700.0)));
        ctx.attach_agent(id, e);
        e
    }

    fn creep_source(pos: Vec2, creep: Option<Entity>, flying: bool) -> DamageSource {
        DamageSource { pos, flying, creep }
    }

    #[test]
    fn test_low_hp_retreat_moves_away() {
        let (mut ctx, id) = context();
        let e = spawn(&mut ctx, &SCOUT, id);
        {
            let mut a = ctx.world.get::<&mut Agent>(e).unwrap();
            a.traits = AgentTraits::LOW_HP_RETREAT;
            a.health = a.max_health * 0.5;
            a.mode = AgentMode::Standby;
        }
        let threat = Vec2::new(800.0, 600.0);
        let dmg = a_fraction(&ctx, e);
        damage_agent(&mut ctx, e, &DamageValue::health(dmg), &creep_source(threat, None, false));
        let a = ctx.world.get::<&Agent>(e).unwrap();
        assert_eq!(a.mode, AgentMode::Move);
        assert!(a.waypoint.dist(threat) > a.pos.dist(threat));
    }

    fn a_fraction(ctx: &SimContext, e: Entity) -> f64 {
        ctx.world.get::<&Agent>(e).unwrap().max_health * 0.3
    }

    #[test]
    fn test_lethal_hit_destroys() {
        let (mut ctx, id) = context();
        let e = spawn(&mut ctx, &WORKER, id);
        damage_agent(&mut ctx, e, &DamageValue::health(500.0), &creep_source(Vec2::ZERO, None, false));
        assert!(!ctx.agent_exists(e));
        assert_eq!(ctx.colonies[0].agents.total_num(), 0);
    }

    #[test]
    fn test_health_stays_bounded() {
        let (mut ctx, id) = context();
        let e = spawn(&mut ctx, &WORKER, id);
        for _ in 0..3 {
            damage_agent(&mut ctx, e, &DamageValue::health(1.0), &creep_source(Vec2::ZERO, None, false));
        }
        let a = ctx.world.get::<&Agent>(e).unwrap();
        assert!(a.health >= 0.0 && a.health <= a.max_health);
    }

    #[test]
    fn test_kamikaze_counterattacks_flying() {
        let (mut ctx, id) = context();
        let creep = ctx.spawn_creep(Creep::new(&WANDERER, Vec2::new(800.0, 600.0), false));
        let e = spawn(&mut ctx, &KAMIKAZE, id);
        let dmg = a_fraction(&ctx, e) * 2.5;
        damage_agent(&mut ctx, e, &DamageValue::health(dmg), &creep_source(Vec2::new(800.0, 600.0), Some(creep), true));
        let a = ctx.world.get::<&Agent>(e).unwrap();
        assert_eq!(a.mode, AgentMode::KamikazeAttack);
        assert_eq!(a.target, Some(AgentTarget::Creep(creep)));
    }

    #[test]
    fn test_creep_kill_is_counted_once() {
        let (mut ctx, _) = context();
        let c = ctx.spawn_creep(Creep::new(&CRAWLER, Vec2::new(100.0, 100.0), false));
        assert!(!damage_creep(&mut ctx, c, &DamageValue::health(1.0)));
        assert!(damage_creep(&mut ctx, c, &DamageValue::health(100.0)));
        assert!(!damage_creep(&mut ctx, c, &DamageValue::health(100.0)));
        assert_eq!(ctx.state.result.creeps_defeated, 1);
        assert_eq!(ctx.state.result.creep_total_value, u64::from(CRAWLER.frag_score));
    }

    #[test]
    fn test_colony_warning_and_destruction() {
        let (mut ctx, id) = context();
        let e = spawn(&mut ctx, &WORKER, id);
        damage_colony(&mut ctx, id, &DamageValue::health(100.0));
        assert_eq!(ctx.colonies[0].warning_cooldown, 45.0);
        assert!(ctx
            .state
            .events
            .pending()
            .iter()
            .any(|ev| matches!(ev, SimEvent::ColonyUnderAttack { .. })));

        damage_colony(&mut ctx, id, &DamageValue::health(1000.0));
        assert!(ctx.colonies[0].disposed);
        assert!(!ctx.agent_exists(e));
        assert!(ctx
            .state
            .events
            .pending()
            .iter()
            .any(|ev| matches!(ev, SimEvent::ColonyDestroyed { .. })));
    }
}
