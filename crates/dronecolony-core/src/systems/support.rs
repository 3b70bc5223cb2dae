//! Support sub-routines: everything an agent does on its support timer
//! rather than its weapon timer.

use dronecolony_logic::faction::FactionTag;
use dronecolony_logic::stats::{AgentKind, SupportKind, DEVOURER_MAX_LEVEL};
use hecs::Entity;

use super::agent_modes::assign_mode;
use super::combat::{find_attack_targets, fire_projectile};
use crate::components::{
    Agent, AgentMode, AgentTarget, ColonyId, EssenceSource, SearchFlags, Vec2, AGENT_FLIGHT_HEIGHT,
    TETHER_DURATION,
};
use crate::presentation::{EffectKind, SoundKind};
use crate::rng::{rand_iterate, rand_order};
use crate::world::SimContext;

pub const RECHARGE_AMOUNT: f64 = 25.0;
pub const REPAIR_AMOUNT: f64 = 3.0;
pub const DISINTEGRATOR_ENERGY_COST: f64 = 40.0;
pub const MAX_TETHER_TARGETS: usize = 4;

/// Run the support routine when its timer is up. Disintegrators and tether
/// beacons set their own delay.
pub fn process_support(ctx: &mut SimContext, a: &mut Agent, delta: f64) {
    let Some(kind) = a.stats.support else {
        return;
    };
    a.support_delay = (a.support_delay - delta * a.reload_rate).max(0.0);
    if a.support_delay != 0.0 {
        return;
    }

    match kind {
        SupportKind::Recharge => do_recharge(ctx, a),
        SupportKind::Repair => do_repair(ctx, a),
        SupportKind::Scavenge => do_scavenge(ctx, a),
        SupportKind::ConsumeDrone => do_consume_drone(ctx, a),
        SupportKind::Disintegrate => {
            do_disintegrator_attack(ctx, a);
            return;
        }
        SupportKind::Tether => {
            do_tether(ctx, a);
            return;
        }
    }
    a.support_delay = a.stats.support_reload * ctx.rng.float_range(0.7, 1.4);
}

/// A random ally in support range matching `pred`.
fn find_ally(ctx: &mut SimContext, a: &Agent, mut pred: impl FnMut(&Agent) -> bool) -> Option<Entity> {
    let colony = ctx.colonies.get(a.colony.index())?;
    let range_sqr = a.stats.support_range_sqr();
    colony.agents.find(
        &ctx.world,
        &mut ctx.rng,
        SearchFlags::WORKERS | SearchFlags::FIGHTERS | SearchFlags::RANDOMIZED,
        |x| x.mode != AgentMode::KamikazeAttack && x.pos.dist_sqr(a.pos) < range_sqr && pred(x),
    )
}

fn do_recharge(ctx: &mut SimContext, a: &Agent) {
    let Some(e) = find_ally(ctx, a, |x| x.energy + RECHARGE_AMOUNT < x.max_energy) else {
        return;
    };
    if let Ok(mut x) = ctx.world.get::<&mut Agent>(e) {
        x.add_energy(RECHARGE_AMOUNT);
        ctx.state.presentation.create_beam(a.pos, x.pos);
    }
    ctx.state.presentation.play_sound(SoundKind::Beam, a.pos);
}

fn do_repair(ctx: &mut SimContext, a: &Agent) {
    let Some(e) = find_ally(ctx, a, |x| x.health < x.max_health) else {
        return;
    };
    if let Ok(mut x) = ctx.world.get::<&mut Agent>(e) {
        x.heal(REPAIR_AMOUNT);
        ctx.state.presentation.create_beam(a.pos, x.pos);
    }
    ctx.state.presentation.play_sound(SoundKind::Beam, a.pos);
}

fn do_scavenge(ctx: &mut SimContext, a: &mut Agent) {
    let Some(colony) = ctx.live_colony(a.colony) else {
        return;
    };
    if !colony.is_normal() || colony.resources > colony.storage_cap() {
        return;
    }
    if !matches!(a.mode, AgentMode::Standby | AgentMode::Patrol) {
        return;
    }
    if a.energy < 20.0 || a.energy_bill > 100.0 {
        return;
    }

    let max_dist_sqr = a.stats.support_range_sqr();
    let mut scrap: Vec<(Entity, Vec2)> = ctx
        .world
        .query::<&EssenceSource>()
        .iter()
        .filter(|(_, s)| !s.disposed && s.kind.is_scrap())
        .map(|(e, s)| (e, s.pos))
        .collect();
    scrap.sort_by_key(|(e, _)| e.id());

    let mut best = None;
    let mut best_score = 0.0;
    for (e, pos) in scrap {
        let dist_sqr = a.pos.dist_sqr(pos);
        if dist_sqr > max_dist_sqr {
            continue;
        }
        let score = dist_sqr * ctx.rng.float_range(0.6, 1.6);
        if score != 0.0 && score > best_score {
            best_score = score;
            best = Some(e);
        }
    }
    let Some(source) = best else {
        return;
    };
    if assign_mode(ctx, a, AgentMode::Scavenge, Vec2::ZERO, Some(AgentTarget::Source(source)))
        && a.kind() == AgentKind::Marauder
        && a.special_delay == 0.0
    {
        a.cloak(20.0);
        a.special_delay = 10.0;
    }
}

fn do_disintegrator_attack(ctx: &mut SimContext, a: &mut Agent) {
    if !matches!(
        a.mode,
        AgentMode::Patrol | AgentMode::Standby | AgentMode::Follow | AgentMode::MineEssence
    ) {
        return;
    }
    let Some(weapon) = a.stats.weapon else {
        return;
    };
    if a.energy < DISINTEGRATOR_ENERGY_COST || a.height != AGENT_FLIGHT_HEIGHT {
        return;
    }
    let targets = find_attack_targets(ctx, a.pos, &weapon);
    let Some(&target) = targets.first() else {
        a.support_delay = ctx.rng.float_range(0.15, 1.2);
        return;
    };
    a.energy -= DISINTEGRATOR_ENERGY_COST;
    a.support_delay = a.stats.support_reload * ctx.rng.float_range(0.8, 1.2);
    fire_projectile(ctx, a, target, &weapon);
    assign_mode(ctx, a, AgentMode::ForcedCharging, Vec2::ZERO, None);
    ctx.state.presentation.play_sound(SoundKind::Shot, a.pos);
    ctx.state.presentation.create_effect(EffectKind::SmallExplosion, a.pos);
    a.special_delay = ctx.rng.float_range(9.0, 12.0);
}

/// Devourers eat a tier-1 drone to heal and, below the level cap, to grow.
fn do_consume_drone(ctx: &mut SimContext, a: &mut Agent) {
    let Some(colony) = ctx.live_colony(a.colony) else {
        return;
    };
    if !colony.is_normal() || colony.resources < 100.0 {
        return;
    }
    if !matches!(a.mode, AgentMode::Standby | AgentMode::Patrol) {
        return;
    }
    let workers = colony.agents.num_available_workers(&ctx.world);
    let fighters = colony.agents.num_available_fighters(&ctx.world);
    if workers < 5 || fighters < 5 {
        return;
    }

    if a.devourer_level >= DEVOURER_MAX_LEVEL {
        if a.health >= a.max_health * 0.6 {
            return;
        }
    } else if a.health >= a.max_health && ctx.rng.chance(0.65) {
        return;
    }

    // Prefer whichever tier-1 kind is more plentiful.
    let best_kind = if fighters > workers {
        AgentKind::Scout
    } else {
        AgentKind::Worker
    };

    // Kind, faction and rank bonuses are the devourer's own; candidates differ
    // only by condition.
    let mut base_score = 2.0;
    if a.kind() == best_kind {
        base_score += 0.5;
    }
    if a.faction == FactionTag::Neutral {
        base_score += 0.5;
    }
    base_score -= f64::from(a.rank) * 0.5;

    let mut best = None;
    let mut best_score = 0.0;
    let Some(colony) = ctx.colonies.get(a.colony.index()) else {
        return;
    };
    colony.agents.collect(
        &ctx.world,
        &mut ctx.rng,
        SearchFlags::WORKERS | SearchFlags::FIGHTERS | SearchFlags::RANDOMIZED | SearchFlags::ONLY_AVAILABLE,
        usize::MAX,
        |x| {
            if x.stats.tier != 1 {
                return false;
            }
            if x.kind() == AgentKind::Scout && x.health == x.max_health {
                return false;
            }
            let score = base_score * ((2.0 - x.health_percentage()) + (1.2 - x.energy_percentage()));
            if score > best_score {
                best = Some(x.id);
                best_score = score;
            }
            false
        },
    );
    let Some(victim) = best else {
        return;
    };

    // The victim holds still until the devourer arrives.
    ctx.with_agent(victim, |x, ctx| assign_mode(ctx, x, AgentMode::Posing, Vec2::new(8.0, 0.0), None));
    assign_mode(ctx, a, AgentMode::ConsumeDrone, Vec2::ZERO, Some(AgentTarget::Agent(victim)));
}

fn tether_link_alive(ctx: &SimContext, a: &Agent, c: ColonyId) -> bool {
    ctx.live_colony(c)
        .map_or(false, |colony| colony.is_in_flight() && colony.pos.dist_sqr(a.pos) <= a.stats.support_range_sqr())
}

fn release_tether(ctx: &mut SimContext, a: &mut Agent, c: ColonyId) {
    if let Some(colony) = ctx.colony_mut(c) {
        colony.tether = colony.tether.saturating_sub(1);
    }
    a.target = None;
    a.tether_time = 0.0;
}

/// Tether beacons boost a flying colony in range; otherwise up to four
/// working drones, preferring the ones hauling resources.
fn do_tether(ctx: &mut SimContext, a: &mut Agent) {
    if let Some(AgentTarget::Tether(c)) = a.target {
        a.support_delay = ctx.rng.float_range(0.5, 2.0);
        if a.tether_time > 0.0 && tether_link_alive(ctx, a, c) {
            return;
        }
        release_tether(ctx, a, c);
    }

    let range_sqr = a.stats.support_range_sqr();
    let live: Vec<ColonyId> = ctx
        .colonies
        .iter()
        .filter(|c| !c.disposed)
        .map(|c| c.id)
        .collect();
    let colony_target = rand_iterate(&mut ctx.rng, &live, |&id| {
        ctx.colonies[id.index()].is_in_flight() && ctx.colonies[id.index()].pos.dist_sqr(a.pos) <= range_sqr
    })
    .copied();
    if let Some(c) = colony_target {
        a.target = Some(AgentTarget::Tether(c));
        a.tether_time = TETHER_DURATION;
        if let Some(colony) = ctx.colony_mut(c) {
            colony.tether += 1;
        }
        ctx.state.presentation.play_sound(SoundKind::Beam, a.pos);
        a.support_delay = a.stats.support_reload * ctx.rng.float_range(0.95, 1.35);
        return;
    }

    let mut actions_left = MAX_TETHER_TARGETS;
    actions_left -= walk_tether_targets(ctx, a, a.colony, actions_left);
    if actions_left != 0 {
        let others: Vec<ColonyId> = live.into_iter().filter(|&c| c != a.colony).collect();
        for i in rand_order(&mut ctx.rng, others.len()) {
            actions_left -= walk_tether_targets(ctx, a, others[i], actions_left);
            if actions_left == 0 {
                break;
            }
        }
    }

    a.support_delay = if actions_left != MAX_TETHER_TARGETS {
        a.stats.support_reload * ctx.rng.float_range(0.95, 1.35)
    } else {
        ctx.rng.float_range(0.5, 2.0)
    };
}

/// Tether up to `num` workers of `colony`; drones mining or hauling go
/// first. Returns how many were tethered.
fn walk_tether_targets(ctx: &mut SimContext, a: &Agent, colony: ColonyId, num: usize) -> usize {
    let Some(core) = ctx.colonies.get(colony.index()).filter(|c| !c.disposed) else {
        return 0;
    };
    let range_sqr = a.stats.support_range_sqr();
    let candidates = core.agents.collect(
        &ctx.world,
        &mut ctx.rng,
        SearchFlags::WORKERS | SearchFlags::RANDOMIZED,
        usize::MAX,
        |x| {
            !x.is_tethered()
                && x.pos.dist_sqr(a.pos) <= range_sqr
                && !matches!(
                    x.mode,
                    AgentMode::KamikazeAttack
                        | AgentMode::ConsumeDrone
                        | AgentMode::Charging
                        | AgentMode::ForcedCharging
                        | AgentMode::Panic
                        | AgentMode::WaitCloning
                        | AgentMode::MakeClone
                        | AgentMode::RecycleReturn
                        | AgentMode::RecycleLanding
                        | AgentMode::Merging
                        | AgentMode::Posing
                )
        },
    );

    let hastened = |e: &Entity| {
        ctx.world.get::<&Agent>(*e).map_or(false, |x| {
            matches!(x.mode, AgentMode::MineEssence | AgentMode::Return | AgentMode::CourierFlight)
        })
    };
    let (preferred, rest): (Vec<Entity>, Vec<Entity>) = candidates.into_iter().partition(hastened);

    let chosen: Vec<Entity> = preferred.into_iter().chain(rest).take(num).collect();
    for &e in &chosen {
        if let Ok(mut x) = ctx.world.get::<&mut Agent>(e) {
            tether_agent(&mut x);
        }
    }
    if !chosen.is_empty() {
        ctx.state.presentation.play_sound(SoundKind::Beam, a.pos);
    }
    chosen.len()
}

fn tether_agent(x: &mut Agent) {
    x.tether_time = TETHER_DURATION;
    if x.energy_bill > 50.0 {
        x.energy_bill = (x.energy_bill - 20.0).max(50.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ColonyCore, ColonyMode, Rect};
    use dronecolony_logic::resources::SourceKind;
    use dronecolony_logic::stats::{
        AgentStats, ARK_CORE, DEN_CORE, DEVOURER, RECHARGER, REPAIR, SCAVENGER, SCOUT, TETHER_BEACON, WORKER,
    };

    fn context() -> (SimContext, ColonyId) {
        let mut ctx = SimContext::new(Rect::from_size(1600.0, 1600.0), 5);
        let id = ctx.add_colony(ColonyCore::new(ColonyId(0), &DEN_CORE, Vec2::new(800.0, 800.0)));
        (ctx, id)
    }

    fn spawn(ctx: &mut SimContext, stats: &'static AgentStats, id: ColonyId, pos: Vec2) -> Entity {
        let e = ctx.spawn_agent(Agent::new(stats, id, pos));
        ctx.attach_agent(id, e);
        e
    }

    fn detached(ctx: &mut SimContext, stats: &'static AgentStats, id: ColonyId, pos: Vec2) -> Agent {
        let mut a = Agent::new(stats, id, pos);
        a.init(&mut ctx.rng);
        a.support_delay = 0.0;
        a
    }

    #[test]
    fn test_recharger_restores_energy() {
        let (mut ctx, id) = context();
        let e = spawn(&mut ctx, &WORKER, id, Vec2::new(810.0, 800.0));
        ctx.world.get::<&mut Agent>(e).unwrap().energy = 10.0;
        let mut r = detached(&mut ctx, &RECHARGER, id, Vec2::new(800.0, 800.0));
        process_support(&mut ctx, &mut r, 0.1);
        assert_eq!(ctx.world.get::<&Agent>(e).unwrap().energy, 10.0 + RECHARGE_AMOUNT);
        assert!(r.support_delay > 0.0);
    }

    #[test]
    fn test_repair_heals_three() {
        let (mut ctx, id) = context();
        let e = spawn(&mut ctx, &SCOUT, id, Vec2::new(810.0, 800.0));
        let max = {
            let mut x = ctx.world.get::<&mut Agent>(e).unwrap();
            x.health = 1.0;
            x.max_health
        };
        let mut r = detached(&mut ctx, &REPAIR, id, Vec2::new(800.0, 800.0));
        process_support(&mut ctx, &mut r, 0.1);
        let health = ctx.world.get::<&Agent>(e).unwrap().health;
        assert_eq!(health, (1.0 + REPAIR_AMOUNT).min(max));
    }

    #[test]
    fn test_scavenger_goes_for_scrap() {
        let (mut ctx, id) = context();
        let scrap = ctx.spawn_source(EssenceSource::new(SourceKind::Scrap, Vec2::new(900.0, 800.0), 10));
        let _crystal = ctx.spawn_source(EssenceSource::new(SourceKind::Crystal, Vec2::new(850.0, 800.0), 10));
        let mut s = detached(&mut ctx, &SCAVENGER, id, Vec2::new(800.0, 800.0));
        s.energy = s.max_energy;
        process_support(&mut ctx, &mut s, 0.1);
        assert_eq!(s.mode, AgentMode::MineEssence);
        assert_eq!(s.target, Some(AgentTarget::Source(scrap)));
    }

    #[test]
    fn test_devourer_waits_for_a_big_colony() {
        let (mut ctx, id) = context();
        ctx.colonies[0].resources = 200.0;
        for i in 0..4 {
            spawn(&mut ctx, &WORKER, id, Vec2::new(800.0 + f64::from(i), 800.0));
        }
        let mut d = detached(&mut ctx, &DEVOURER, id, Vec2::new(800.0, 800.0));
        d.health = 1.0;
        process_support(&mut ctx, &mut d, 0.1);
        assert_eq!(d.mode, AgentMode::Standby);
    }

    #[test]
    fn test_devourer_picks_a_drone() {
        let (mut ctx, id) = context();
        ctx.colonies[0].resources = 200.0;
        for i in 0..5 {
            spawn(&mut ctx, &WORKER, id, Vec2::new(800.0 + f64::from(i), 800.0));
            let e = spawn(&mut ctx, &SCOUT, id, Vec2::new(820.0 + f64::from(i), 800.0));
            ctx.world.get::<&mut Agent>(e).unwrap().mode = AgentMode::Patrol;
        }
        let mut d = detached(&mut ctx, &DEVOURER, id, Vec2::new(800.0, 800.0));
        d.rank = 0;
        d.health = 1.0;
        process_support(&mut ctx, &mut d, 0.1);
        assert_eq!(d.mode, AgentMode::ConsumeDrone);
        let victim = d.target.and_then(|t| t.agent()).unwrap();
        let victim = ctx.world.get::<&Agent>(victim).unwrap();
        assert_eq!(victim.kind(), dronecolony_logic::stats::AgentKind::Worker);
        assert_eq!(victim.mode, AgentMode::Posing);
    }

    #[test]
    fn test_beacon_links_flying_colony() {
        let (mut ctx, id) = context();
        let ark = ctx.add_colony(ColonyCore::new(ColonyId(0), &ARK_CORE, Vec2::new(900.0, 800.0)));
        ctx.colonies[ark.index()].mode = ColonyMode::Relocating;
        let mut b = detached(&mut ctx, &TETHER_BEACON, id, Vec2::new(800.0, 800.0));
        process_support(&mut ctx, &mut b, 0.1);
        assert_eq!(b.target, Some(AgentTarget::Tether(ark)));
        assert_eq!(ctx.colonies[ark.index()].tether, 1);

        ctx.colonies[ark.index()].mode = ColonyMode::Normal;
        b.support_delay = 0.0;
        process_support(&mut ctx, &mut b, 0.1);
        assert_eq!(ctx.colonies[ark.index()].tether, 0);
        assert_ne!(b.target, Some(AgentTarget::Tether(ark)));
    }

    #[test]
    fn test_beacon_prefers_busy_workers() {
        let (mut ctx, id) = context();
        let mut busy = Vec::new();
        for i in 0..6 {
            let e = spawn(&mut ctx, &WORKER, id, Vec2::new(800.0 + f64::from(i) * 5.0, 800.0));
            if i < 3 {
                ctx.world.get::<&mut Agent>(e).unwrap().mode = AgentMode::Return;
                busy.push(e);
            }
        }
        let mut b = detached(&mut ctx, &TETHER_BEACON, id, Vec2::new(800.0, 800.0));
        process_support(&mut ctx, &mut b, 0.1);
        for e in busy {
            assert!(ctx.world.get::<&Agent>(e).unwrap().is_tethered());
        }
        let total = ctx
            .world
            .query::<&Agent>()
            .iter()
            .filter(|(_, x)| x.is_tethered())
            .count();
        assert_eq!(total, MAX_TETHER_TARGETS);
    }

    #[test]
    fn test_devourer_ranks_victims_by_condition() {
        let (mut ctx, id) = context();
        ctx.colonies[0].resources = 200.0;
        let mut workers = Vec::new();
        for i in 0..5 {
            workers.push(spawn(&mut ctx, &WORKER, id, Vec2::new(800.0 + f64::from(i), 800.0)));
            let e = spawn(&mut ctx, &SCOUT, id, Vec2::new(820.0 + f64::from(i), 800.0));
            ctx.world.get::<&mut Agent>(e).unwrap().mode = AgentMode::Patrol;
        }
        for &e in &workers {
            let mut x = ctx.world.get::<&mut Agent>(e).unwrap();
            x.energy = x.max_energy;
            x.health = x.max_health;
        }
        // A veteran in poor shape is still the cheapest meal.
        let wounded = workers[2];
        {
            let mut x = ctx.world.get::<&mut Agent>(wounded).unwrap();
            x.rank = 2;
            x.health = x.max_health * 0.5;
        }
        let mut d = detached(&mut ctx, &DEVOURER, id, Vec2::new(800.0, 800.0));
        d.rank = 0;
        d.health = 1.0;
        process_support(&mut ctx, &mut d, 0.1);
        assert_eq!(d.mode, AgentMode::ConsumeDrone);
        assert_eq!(d.target, Some(AgentTarget::Agent(wounded)));
    }
}
