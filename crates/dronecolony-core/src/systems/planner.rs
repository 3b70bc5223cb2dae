//! Colony action planner.
//!
//! On every action tick a colony rolls one of its priorities, gathers the
//! actions that serve it and picks the best scoring one. Picking only draws
//! from the RNG; [`execute_action`] is where resources are spent and agents
//! receive their new modes.

use dronecolony_logic::economy::{
    cloning_cost, evo_gain_multiplier, miners_to_assign, mining_delay, MAX_EVO_GAIN, MAX_EVO_POINTS,
};
use dronecolony_logic::merge::{merge_evo_cost, merge_result};
use dronecolony_logic::stats::{agent_stats, AgentKind};
use hecs::Entity;

use super::agent_modes::{assign_mode, assign_mode_to};
use crate::components::{
    Agent, AgentMode, AgentTarget, ColonyCore, ColonyId, ColonyPriority, Construction, Creep, EssenceSource,
    NeutralBuilding, SearchFlags, Vec2, BUILDING_CONVERT_COOLDOWN, BUILDING_EVO_POINTS,
};
use crate::presentation::SoundKind;
use crate::world::SimContext;

pub const REPAIR_TURRET_COST: f64 = 4.0;
pub const REPAIR_BASE_COST: f64 = 7.0;
/// Charged per worker sent to a construction site.
pub const BUILD_COST: f64 = 3.0;
pub const CAPTURE_COST: f64 = 20.0;
pub const CLONING_DELAY: f64 = 6.5;
pub const CAPTURE_DELAY: f64 = 10.0;

/// Sources farther than this many colony radii are not mined.
const MINING_RANGE: f64 = 2.5;
const CAPTURE_RANGE: f64 = 3.0;
const MERGE_POOL_SIZE: usize = 20;
const MAX_BUILDERS: u32 = 3;
const DAMAGED_RATIO: f64 = 0.9;
const COURIER_MIN_RESOURCES: f64 = 60.0;
const COURIER_CARGO_PER_UNIT: f64 = 12.0;
const MERGE_SPREAD: f64 = 14.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColonyAction {
    ConvertEvo { building: Entity },
    GenerateEvo,
    SendCourier { courier: Entity, target: ColonyId },
    MineEssence { source: Entity },
    RepairTurret { turret: Entity },
    RepairBase,
    BuildBuilding { site: Entity },
    CaptureBuilding { building: Entity },
    RecycleAgent { agent: Entity },
    ProduceAgent { kind: AgentKind },
    GetReinforcements { from: ColonyId },
    CloneAgent { target: Entity, cloner: Entity },
    MergeAgents { a: Entity, b: Entity, evo_cost: f64, roomba: bool },
    SetPatrol,
    DefenceGarrison { attacker: Entity },
    DefencePatrol { attacker: Entity },
}

impl ColonyAction {
    /// Base delay before the next action once this one succeeded.
    pub fn time_cost(&self) -> f64 {
        match self {
            ColonyAction::ConvertEvo { .. } => 0.5,
            ColonyAction::GenerateEvo => 2.0,
            ColonyAction::SendCourier { .. } => 0.5,
            ColonyAction::MineEssence { .. } => 1.0,
            ColonyAction::RepairTurret { .. } | ColonyAction::RepairBase => 1.0,
            ColonyAction::BuildBuilding { .. } => 1.5,
            ColonyAction::CaptureBuilding { .. } => 1.0,
            ColonyAction::RecycleAgent { .. } => 0.3,
            ColonyAction::ProduceAgent { .. } => 1.0,
            ColonyAction::GetReinforcements { .. } => 2.0,
            ColonyAction::CloneAgent { .. } => 1.0,
            ColonyAction::MergeAgents { .. } => 1.5,
            ColonyAction::SetPatrol => 1.0,
            ColonyAction::DefenceGarrison { .. } | ColonyAction::DefencePatrol { .. } => 0.5,
        }
    }
}

/// Colony figures the candidate search reads, copied out so the RNG and the
/// world stay freely borrowable.
#[derive(Debug, Clone, Copy)]
struct Outlook {
    id: ColonyId,
    pos: Vec2,
    radius: f64,
    resources: f64,
    evo_points: f64,
    health: f64,
    max_health: f64,
    units: usize,
    unit_limit: usize,
    patrol_radius: f64,
    attack_radius: f64,
    security: f64,
    resource_delay: f64,
    cloning_delay: f64,
    capture_delay: f64,
    failed_resource: Option<Entity>,
    workers: usize,
    fighters: usize,
}

impl Outlook {
    fn of(c: &ColonyCore, world: &hecs::World) -> Self {
        Self {
            id: c.id,
            pos: c.pos,
            radius: c.radius,
            resources: c.resources,
            evo_points: c.evo_points,
            health: c.health,
            max_health: c.max_health,
            units: c.total_units(),
            unit_limit: c.unit_limit(),
            patrol_radius: c.patrol_radius(),
            attack_radius: c.attack_radius(),
            security: c.security_priority(),
            resource_delay: c.resource_delay,
            cloning_delay: c.cloning_delay,
            capture_delay: c.capture_delay,
            failed_resource: c.failed_resource,
            workers: c.agents.num_available_workers(world),
            fighters: c.agents.num_available_fighters(world),
        }
    }

    fn has_room(&self) -> bool {
        self.units < self.unit_limit
    }
}

type Candidates = Vec<(ColonyAction, f64)>;

fn push(ctx: &mut SimContext, out: &mut Candidates, action: ColonyAction, weight: f64) {
    let score = weight * ctx.rng.float_range(0.8, 1.2);
    out.push((action, score));
}

/// Propose the next action for a landed colony, or `None` when nothing
/// useful can be done right now.
pub fn pick_action(ctx: &mut SimContext, id: ColonyId) -> Option<ColonyAction> {
    let view = ctx
        .live_colony(id)
        .filter(|c| c.is_normal())
        .map(|c| Outlook::of(c, &ctx.world))?;

    if let Some(building) = convertible_building(ctx, id) {
        return Some(ColonyAction::ConvertEvo { building });
    }

    let priority = ctx.colonies.get(id.index())?.priorities.pick(ctx.rng.float())?;
    let mut candidates = Candidates::new();
    match priority {
        ColonyPriority::Resources => resource_candidates(ctx, &view, &mut candidates),
        ColonyPriority::Growth => growth_candidates(ctx, &view, &mut candidates),
        ColonyPriority::Evolution => evolution_candidates(ctx, &view, &mut candidates),
        ColonyPriority::Security => security_candidates(ctx, &view, &mut candidates),
    }
    candidates
        .into_iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(action, _)| action)
}

fn convertible_building(ctx: &SimContext, id: ColonyId) -> Option<Entity> {
    ctx.world
        .query::<&NeutralBuilding>()
        .iter()
        .filter(|(_, b)| b.can_convert(id))
        .map(|(e, _)| e)
        .min_by_key(|e| e.id())
}

// Resources

fn resource_candidates(ctx: &mut SimContext, view: &Outlook, out: &mut Candidates) {
    if view.resource_delay <= 0.0 {
        if let Some(source) = best_source(ctx, view) {
            push(ctx, out, ColonyAction::MineEssence { source }, 1.0);
        }
    }
    if let Some((courier, target)) = pick_courier(ctx, view) {
        push(ctx, out, ColonyAction::SendCourier { courier, target }, 0.8);
    }
    if view.units > view.unit_limit {
        let flags = SearchFlags::WORKERS | SearchFlags::ONLY_AVAILABLE | SearchFlags::RANDOMIZED;
        let agent = ctx
            .colonies
            .get(view.id.index())
            .and_then(|c| c.agents.find(&ctx.world, &mut ctx.rng, flags, |a| a.stats.tier == 1));
        if let Some(agent) = agent {
            push(ctx, out, ColonyAction::RecycleAgent { agent }, 1.5);
        }
    }
}

fn best_source(ctx: &mut SimContext, view: &Outlook) -> Option<Entity> {
    let has_redminer = ctx.colonies.get(view.id.index()).map_or(false, |c| {
        c.agents
            .workers
            .iter()
            .any(|&e| ctx.world.get::<&Agent>(e).map_or(false, |a| a.kind() == AgentKind::Redminer))
    });
    let max_dist = view.radius * MINING_RANGE;

    let mut best = None;
    let mut best_score = 0.0;
    for e in ctx.source_entities() {
        if Some(e) == view.failed_resource {
            continue;
        }
        let Ok(source) = ctx.world.get::<&EssenceSource>(e) else {
            continue;
        };
        if source.kind.requires_redminer() && !has_redminer {
            continue;
        }
        let dist = source.pos.dist(view.pos);
        if dist > max_dist {
            continue;
        }
        let stats = source.stats();
        let value = stats.value + stats.elite_value * 10.0;
        let score = value * ctx.rng.float_range(0.6, 1.4) / (1.0 + dist / view.radius);
        if best.is_none() || score > best_score {
            best = Some(e);
            best_score = score;
        }
    }
    best
}

fn pick_courier(ctx: &mut SimContext, view: &Outlook) -> Option<(Entity, ColonyId)> {
    if view.resources <= COURIER_MIN_RESOURCES {
        return None;
    }
    let target = ctx
        .colonies
        .iter()
        .filter(|c| c.id != view.id && !c.disposed && c.is_normal())
        .filter(|c| c.resources * 1.2 < view.resources)
        .min_by(|a, b| a.resources.total_cmp(&b.resources))
        .map(|c| c.id)?;
    let flags = SearchFlags::WORKERS | SearchFlags::FIGHTERS | SearchFlags::ONLY_AVAILABLE | SearchFlags::RANDOMIZED;
    let courier = ctx.colonies.get(view.id.index())?.agents.find(&ctx.world, &mut ctx.rng, flags, |a| {
        matches!(a.kind(), AgentKind::Courier | AgentKind::Trucker) && a.energy_percentage() >= 0.5
    })?;
    Some((courier, target))
}

// Growth

fn growth_candidates(ctx: &mut SimContext, view: &Outlook, out: &mut Candidates) {
    if view.has_room() {
        let kind = if ctx.rng.chance(0.2 + view.security * 0.5) {
            AgentKind::Scout
        } else {
            AgentKind::Worker
        };
        if agent_stats(kind).cost <= view.resources {
            push(ctx, out, ColonyAction::ProduceAgent { kind }, 1.0);
        }
    }
    if view.workers > 0 && view.resources >= BUILD_COST {
        if let Some(site) = construction_site(ctx, view) {
            push(ctx, out, ColonyAction::BuildBuilding { site }, 1.2);
        }
    }
    if view.workers > 0 && view.capture_delay <= 0.0 && view.resources >= CAPTURE_COST {
        if let Some(building) = capturable_building(ctx, view) {
            push(ctx, out, ColonyAction::CaptureBuilding { building }, 0.9);
        }
    }
    if let Some(from) = reinforcement_donor(ctx, view) {
        push(ctx, out, ColonyAction::GetReinforcements { from }, 0.7);
    }
}

fn construction_site(ctx: &SimContext, view: &Outlook) -> Option<Entity> {
    ctx.world
        .query::<&Construction>()
        .iter()
        .filter(|(_, c)| c.colony == view.id && !c.disposed && c.attention < MAX_BUILDERS)
        .min_by(|(ea, a), (eb, b)| {
            a.pos
                .dist_sqr(view.pos)
                .total_cmp(&b.pos.dist_sqr(view.pos))
                .then(ea.id().cmp(&eb.id()))
        })
        .map(|(e, _)| e)
}

fn capturable_building(ctx: &SimContext, view: &Outlook) -> Option<Entity> {
    let max_dist = view.radius * CAPTURE_RANGE;
    ctx.world
        .query::<&NeutralBuilding>()
        .iter()
        .filter(|(_, b)| b.owner != Some(view.id) && b.pos.dist(view.pos) <= max_dist)
        .min_by(|(ea, a), (eb, b)| {
            a.pos
                .dist_sqr(view.pos)
                .total_cmp(&b.pos.dist_sqr(view.pos))
                .then(ea.id().cmp(&eb.id()))
        })
        .map(|(e, _)| e)
}

/// A landed colony with plenty of idle workers, if ours is running short.
fn reinforcement_donor(ctx: &SimContext, view: &Outlook) -> Option<ColonyId> {
    let own = ctx.colonies.get(view.id.index())?.agents.total_num();
    if own >= 10 || !view.has_room() {
        return None;
    }
    ctx.colonies
        .iter()
        .filter(|c| c.id != view.id && !c.disposed && c.is_normal())
        .map(|c| (c.id, c.agents.num_available_workers(&ctx.world)))
        .filter(|&(_, idle)| idle >= 2 && idle > own * 2 + 4)
        .max_by_key(|&(_, idle)| idle)
        .map(|(id, _)| id)
}

// Evolution

fn evolution_candidates(ctx: &mut SimContext, view: &Outlook, out: &mut Candidates) {
    if view.evo_points < MAX_EVO_POINTS {
        let flags = SearchFlags::WORKERS | SearchFlags::FIGHTERS | SearchFlags::ONLY_AVAILABLE;
        let has_donor = ctx
            .colonies
            .get(view.id.index())
            .and_then(|c| c.agents.find(&ctx.world, &mut ctx.rng, flags, |a| a.stats.tier == 2))
            .is_some();
        if has_donor {
            push(ctx, out, ColonyAction::GenerateEvo, 1.0);
        }
    }
    if let Some(action) = merge_pair(ctx, view) {
        push(ctx, out, action, 1.2);
    }
    if let Some((target, cloner)) = clone_pair(ctx, view) {
        push(ctx, out, ColonyAction::CloneAgent { target, cloner }, 1.1);
    }
}

fn merge_pair(ctx: &mut SimContext, view: &Outlook) -> Option<ColonyAction> {
    let flags = SearchFlags::WORKERS | SearchFlags::FIGHTERS | SearchFlags::ONLY_AVAILABLE | SearchFlags::RANDOMIZED;
    let pool = ctx.colonies.get(view.id.index())?.agents.collect(
        &ctx.world,
        &mut ctx.rng,
        flags,
        MERGE_POOL_SIZE,
        |a| a.stats.tier < 3 && a.mode == AgentMode::Standby,
    );
    let info: Vec<_> = pool
        .iter()
        .filter_map(|&e| ctx.world.get::<&Agent>(e).ok().map(|a| (e, a.kind(), a.faction)))
        .collect();
    for (i, &(a, kind_a, faction_a)) in info.iter().enumerate() {
        for &(b, kind_b, faction_b) in &info[i + 1..] {
            let Some(result) = merge_result(kind_a, faction_a, kind_b, faction_b) else {
                continue;
            };
            let evo_cost = merge_evo_cost(result);
            if evo_cost > view.evo_points {
                continue;
            }
            return Some(ColonyAction::MergeAgents {
                a,
                b,
                evo_cost,
                roomba: result.kind == AgentKind::Roomba,
            });
        }
    }
    None
}

fn clone_pair(ctx: &mut SimContext, view: &Outlook) -> Option<(Entity, Entity)> {
    if view.cloning_delay > 0.0 || !view.has_room() {
        return None;
    }
    let colony = ctx.colonies.get(view.id.index())?;
    let flags = SearchFlags::WORKERS | SearchFlags::FIGHTERS | SearchFlags::ONLY_AVAILABLE | SearchFlags::RANDOMIZED;
    let cloner = colony.agents.find(&ctx.world, &mut ctx.rng, flags, |a| {
        a.kind() == AgentKind::Cloner && a.mode == AgentMode::Standby
    })?;
    let resources = view.resources;
    let target = colony.agents.find(&ctx.world, &mut ctx.rng, flags, |a| {
        a.id != cloner
            && a.rank == 0
            && a.stats.tier >= 2
            && a.kind() != AgentKind::Cloner
            && cloning_cost(a.stats) <= resources
    })?;
    Some((target, cloner))
}

// Security

fn security_candidates(ctx: &mut SimContext, view: &Outlook, out: &mut Candidates) {
    if view.fighters > 0 {
        if let Some((attacker, dist)) = nearest_threat(ctx, view) {
            let action = if dist <= view.patrol_radius {
                ColonyAction::DefenceGarrison { attacker }
            } else {
                ColonyAction::DefencePatrol { attacker }
            };
            push(ctx, out, action, 2.0);
        }
        let idle = ctx.colonies.get(view.id.index()).map_or(false, |c| {
            c.agents.fighters.iter().any(|&e| {
                ctx.world
                    .get::<&Agent>(e)
                    .map_or(false, |a| a.mode == AgentMode::Standby)
            })
        });
        if idle {
            push(ctx, out, ColonyAction::SetPatrol, 1.0);
        }
    }
    if view.has_room() && agent_stats(AgentKind::Scout).cost <= view.resources {
        push(ctx, out, ColonyAction::ProduceAgent { kind: AgentKind::Scout }, 0.9);
    }
    if view.workers > 0 && view.resources >= REPAIR_BASE_COST && view.health < view.max_health * DAMAGED_RATIO {
        push(ctx, out, ColonyAction::RepairBase, 1.3);
    }
    if view.workers > 0 && view.resources >= REPAIR_TURRET_COST {
        if let Some(turret) = damaged_turret(ctx, view) {
            push(ctx, out, ColonyAction::RepairTurret { turret }, 1.1);
        }
    }
}

fn nearest_threat(ctx: &SimContext, view: &Outlook) -> Option<(Entity, f64)> {
    ctx.world
        .query::<&Creep>()
        .iter()
        .filter(|(_, c)| !c.disposed && !c.is_cloaked())
        .map(|(e, c)| (e, c.pos.dist(view.pos)))
        .filter(|&(_, dist)| dist <= view.attack_radius)
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.id().cmp(&b.0.id())))
}

fn damaged_turret(ctx: &SimContext, view: &Outlook) -> Option<Entity> {
    ctx.colonies.get(view.id.index())?.turrets.iter().copied().find(|&e| {
        ctx.world
            .get::<&Agent>(e)
            .map_or(false, |t| !t.disposed && t.health < t.max_health * DAMAGED_RATIO)
    })
}

// Execution

/// Apply `action` for colony `id`. Returns false when the action could not
/// be carried out; nothing is spent in that case.
pub fn execute_action(ctx: &mut SimContext, id: ColonyId, action: ColonyAction) -> bool {
    if ctx.live_colony(id).is_none() {
        return false;
    }
    let done = match action {
        ColonyAction::ConvertEvo { building } => convert_evo(ctx, id, building),
        ColonyAction::GenerateEvo => generate_evo(ctx, id),
        ColonyAction::SendCourier { courier, target } => send_courier(ctx, id, courier, target),
        ColonyAction::MineEssence { source } => mine_essence(ctx, id, source),
        ColonyAction::RepairTurret { turret } => send_worker(
            ctx,
            id,
            AgentMode::RepairTurret,
            Some(AgentTarget::Agent(turret)),
            REPAIR_TURRET_COST,
        ),
        ColonyAction::RepairBase => send_worker(ctx, id, AgentMode::RepairBase, None, REPAIR_BASE_COST),
        ColonyAction::BuildBuilding { site } => build(ctx, id, site),
        ColonyAction::CaptureBuilding { building } => capture(ctx, id, building),
        ColonyAction::RecycleAgent { agent } => recycle(ctx, id, agent),
        ColonyAction::ProduceAgent { kind } => produce(ctx, id, kind),
        ColonyAction::GetReinforcements { from } => get_reinforcements(ctx, id, from),
        ColonyAction::CloneAgent { target, cloner } => clone_agent(ctx, id, target, cloner),
        ColonyAction::MergeAgents { a, b, evo_cost, roomba } => merge_agents(ctx, id, a, b, evo_cost, roomba),
        ColonyAction::SetPatrol => set_patrol(ctx, id),
        ColonyAction::DefenceGarrison { attacker } => defend(ctx, id, attacker, true),
        ColonyAction::DefencePatrol { attacker } => defend(ctx, id, attacker, false),
    };
    if !done {
        log::debug!("colony {:?} failed {:?}", id, action);
    }
    done
}

fn owned_by(ctx: &SimContext, e: Entity, id: ColonyId) -> bool {
    ctx.world
        .get::<&Agent>(e)
        .map_or(false, |a| !a.disposed && a.colony == id)
}

fn convert_evo(ctx: &mut SimContext, id: ColonyId, building: Entity) -> bool {
    let converted = ctx.world.get::<&mut NeutralBuilding>(building).map_or(false, |mut b| {
        if !b.can_convert(id) {
            return false;
        }
        b.cooldown = BUILDING_CONVERT_COOLDOWN;
        true
    });
    if !converted {
        return false;
    }
    match ctx.colony_mut(id) {
        Some(colony) => {
            colony.add_evo_points(BUILDING_EVO_POINTS);
            true
        }
        None => false,
    }
}

fn generate_evo(ctx: &mut SimContext, id: ColonyId) -> bool {
    let Some(colony) = ctx.colonies.get(id.index()) else {
        return false;
    };
    let (center, radius) = (colony.pos, colony.radius);
    let flags = SearchFlags::WORKERS | SearchFlags::FIGHTERS | SearchFlags::ONLY_AVAILABLE | SearchFlags::RANDOMIZED;
    let donors = colony
        .agents
        .collect(&ctx.world, &mut ctx.rng, flags, usize::MAX, |a| a.stats.tier == 2);

    let mut gain = 0.0;
    for e in donors {
        if gain >= MAX_EVO_GAIN {
            break;
        }
        let Some((pos, amount)) = ctx.world.get::<&Agent>(e).ok().map(|a| (a.pos, a.faction.evo_yield())) else {
            continue;
        };
        gain += amount;
        ctx.state.presentation.create_beam(pos, center);
    }
    if gain == 0.0 {
        return false;
    }
    let gain = gain.min(MAX_EVO_GAIN) * evo_gain_multiplier(radius);
    match ctx.colony_mut(id) {
        Some(colony) => {
            colony.add_evo_points(gain);
            true
        }
        None => false,
    }
}

fn send_courier(ctx: &mut SimContext, id: ColonyId, courier: Entity, target: ColonyId) -> bool {
    if target == id || !owned_by(ctx, courier, id) {
        return false;
    }
    let Some(target_resources) = ctx.live_colony(target).filter(|c| c.is_normal()).map(|c| c.resources) else {
        return false;
    };
    let Some(payload) = ctx.world.get::<&Agent>(courier).ok().map(|a| a.max_payload()) else {
        return false;
    };
    let Some(colony) = ctx.colony_mut(id) else {
        return false;
    };
    if colony.resources <= COURIER_MIN_RESOURCES || target_resources * 1.2 >= colony.resources {
        return false;
    }
    let cargo = (f64::from(payload) * COURIER_CARGO_PER_UNIT).min(colony.resources - COURIER_MIN_RESOURCES);
    colony.resources -= cargo;

    let sent = ctx
        .with_agent(courier, |a, ctx| {
            if !assign_mode(ctx, a, AgentMode::CourierFlight, Vec2::ZERO, Some(AgentTarget::Colony(target))) {
                return false;
            }
            a.payload = payload;
            a.cargo_value = cargo;
            true
        })
        .unwrap_or(false);
    if !sent {
        if let Some(colony) = ctx.colony_mut(id) {
            colony.add_resources(cargo);
        }
    }
    sent
}

fn mine_essence(ctx: &mut SimContext, id: ColonyId, source: Entity) -> bool {
    let Some((workers, priority)) = ctx
        .colonies
        .get(id.index())
        .map(|c| (c.agents.num_available_workers(&ctx.world), c.resources_priority()))
    else {
        return false;
    };
    if workers == 0 {
        if let Some(colony) = ctx.colony_mut(id) {
            colony.resource_shortage += 1;
        }
        return false;
    }
    let Some(remaining) = ctx
        .world
        .get::<&EssenceSource>(source)
        .ok()
        .filter(|s| !s.disposed)
        .map(|s| s.resource as usize)
    else {
        return false;
    };

    let scale = ctx.rng.float_range(0.8, 1.3);
    let to_assign = miners_to_assign(priority, workers, scale).min(remaining);
    if to_assign == 0 {
        return false;
    }
    let flags = SearchFlags::WORKERS | SearchFlags::ONLY_AVAILABLE | SearchFlags::RANDOMIZED;
    let miners = match ctx.colonies.get(id.index()) {
        Some(colony) => colony
            .agents
            .collect(&ctx.world, &mut ctx.rng, flags, to_assign, |a| a.stats.can_gather),
        None => return false,
    };
    let mut assigned = 0;
    for e in miners {
        if assign_mode_to(ctx, e, AgentMode::MineEssence, Vec2::ZERO, Some(AgentTarget::Source(source))) {
            assigned += 1;
        }
    }

    let Some(colony) = ctx.colony_mut(id) else {
        return false;
    };
    if assigned == 0 {
        if colony.failed_resource.is_none() {
            colony.failed_resource = Some(source);
        }
        colony.resource_shortage += 1;
        return false;
    }
    colony.resource_delay += mining_delay(priority);
    true
}

/// One available worker for a repair job costing `cost`.
fn send_worker(ctx: &mut SimContext, id: ColonyId, mode: AgentMode, target: Option<AgentTarget>, cost: f64) -> bool {
    let flags = SearchFlags::WORKERS | SearchFlags::ONLY_AVAILABLE | SearchFlags::RANDOMIZED;
    let worker = match ctx.colonies.get(id.index()) {
        Some(colony) if colony.resources >= cost => {
            colony
                .agents
                .find(&ctx.world, &mut ctx.rng, flags, |a| a.energy >= 40.0 && a.kind() != AgentKind::Cloner)
        }
        _ => None,
    };
    let Some(worker) = worker else {
        return false;
    };
    if !assign_mode_to(ctx, worker, mode, Vec2::ZERO, target) {
        return false;
    }
    ctx.colony_mut(id).map_or(false, |c| c.spend(cost))
}

fn build(ctx: &mut SimContext, id: ColonyId, site: Entity) -> bool {
    let open = ctx
        .world
        .get::<&Construction>(site)
        .map_or(false, |c| !c.disposed && c.colony == id && c.attention < MAX_BUILDERS);
    if !open {
        return false;
    }
    let Some((available, resources)) = ctx
        .colonies
        .get(id.index())
        .map(|c| (c.agents.num_available_workers(&ctx.world), c.resources))
    else {
        return false;
    };
    if available == 0 {
        return false;
    }
    let min = (available / 15).clamp(1, 3);
    let max = (available / 10).clamp(1, 6).max(min);
    let count = (ctx.rng.int_range(min as i64, max as i64) as usize).min((resources / BUILD_COST) as usize);
    if count == 0 {
        return false;
    }

    let flags = SearchFlags::WORKERS | SearchFlags::ONLY_AVAILABLE | SearchFlags::RANDOMIZED;
    let builders = match ctx.colonies.get(id.index()) {
        Some(colony) => colony.agents.collect(&ctx.world, &mut ctx.rng, flags, count, |_| true),
        None => return false,
    };
    let mut sent = 0u32;
    for e in builders {
        if assign_mode_to(ctx, e, AgentMode::BuildBuilding, Vec2::ZERO, Some(AgentTarget::Construction(site))) {
            sent += 1;
        }
    }
    if sent == 0 {
        return false;
    }
    ctx.colony_mut(id).map_or(false, |c| c.spend(BUILD_COST * f64::from(sent)))
}

fn capture(ctx: &mut SimContext, id: ColonyId, building: Entity) -> bool {
    let capturable = ctx
        .world
        .get::<&NeutralBuilding>(building)
        .map_or(false, |b| b.owner != Some(id));
    if !capturable || ctx.colony(id).map_or(true, |c| c.resources < CAPTURE_COST) {
        return false;
    }
    let flags = SearchFlags::WORKERS | SearchFlags::ONLY_AVAILABLE | SearchFlags::RANDOMIZED;
    let limit = ctx.rng.int_range(1, 2) as usize;
    let workers = match ctx.colonies.get(id.index()) {
        Some(colony) => colony.agents.collect(&ctx.world, &mut ctx.rng, flags, limit, |_| true),
        None => return false,
    };
    let mut sent = 0;
    for e in workers {
        if assign_mode_to(ctx, e, AgentMode::CaptureBuilding, Vec2::ZERO, Some(AgentTarget::Building(building))) {
            sent += 1;
        }
    }
    if sent == 0 {
        return false;
    }
    let Some(colony) = ctx.colony_mut(id) else {
        return false;
    };
    colony.capture_delay = CAPTURE_DELAY;
    colony.spend(CAPTURE_COST)
}

fn recycle(ctx: &mut SimContext, id: ColonyId, agent: Entity) -> bool {
    if !owned_by(ctx, agent, id) {
        return false;
    }
    assign_mode_to(ctx, agent, AgentMode::RecycleReturn, Vec2::ZERO, None)
}

fn produce(ctx: &mut SimContext, id: ColonyId, kind: AgentKind) -> bool {
    let stats = agent_stats(kind);
    if stats.is_turret || kind == AgentKind::Roomba {
        return false;
    }
    let Some(colony) = ctx.colonies.get_mut(id.index()) else {
        return false;
    };
    if colony.total_units() >= colony.unit_limit() || !colony.spend(stats.cost) {
        return false;
    }
    let mut pos = colony.entrance_pos();
    if ctx.rng.bool() {
        pos.x += 1.0;
    }
    let faction = colony.pick_faction(&mut ctx.rng);
    let rank = if colony.elite_resources >= 1.0 {
        colony.elite_resources -= 1.0;
        1
    } else {
        0
    };

    let mut agent = Agent::new(stats, id, pos).with_faction(faction).with_rank(rank);
    agent.height = 0.0;
    let e = ctx.spawn_agent(agent);
    ctx.attach_agent(id, e);
    assign_mode_to(ctx, e, AgentMode::Takeoff, Vec2::ZERO, None);
    ctx.state.result.drones_produced += 1;
    ctx.state.presentation.play_sound(SoundKind::Production, pos);
    true
}

fn get_reinforcements(ctx: &mut SimContext, id: ColonyId, from: ColonyId) -> bool {
    if from == id {
        return false;
    }
    let num_workers = ctx.rng.int_range(2, 4) as usize;
    let num_fighters = ctx.rng.int_range(1, 2) as usize;
    let Some(donor) = ctx.colonies.get(from.index()).filter(|c| !c.disposed && c.is_normal()) else {
        return false;
    };
    let flags = SearchFlags::ONLY_AVAILABLE | SearchFlags::RANDOMIZED;
    let workers = donor
        .agents
        .collect(&ctx.world, &mut ctx.rng, flags | SearchFlags::WORKERS, num_workers, |_| true);
    if workers.is_empty() {
        return false;
    }
    let fighters = donor
        .agents
        .collect(&ctx.world, &mut ctx.rng, flags | SearchFlags::FIGHTERS, num_fighters, |_| true);
    for e in workers.into_iter().chain(fighters) {
        ctx.transfer_agent(e, id);
        assign_mode_to(ctx, e, AgentMode::Standby, Vec2::ZERO, None);
    }
    true
}

fn clone_agent(ctx: &mut SimContext, id: ColonyId, target: Entity, cloner: Entity) -> bool {
    if !owned_by(ctx, cloner, id) {
        return false;
    }
    let Some(cost) = ctx
        .world
        .get::<&Agent>(target)
        .ok()
        .filter(|a| !a.disposed && a.colony == id && a.rank == 0 && !a.is_turret())
        .map(|a| cloning_cost(a.stats))
    else {
        return false;
    };
    let ready = ctx.colony(id).map_or(false, |c| {
        c.cloning_delay <= 0.0 && c.total_units() < c.unit_limit() && c.resources >= cost
    });
    if !ready {
        return false;
    }
    if !assign_mode_to(ctx, cloner, AgentMode::MakeClone, Vec2::ZERO, Some(AgentTarget::Agent(target))) {
        return false;
    }
    if !assign_mode_to(ctx, target, AgentMode::WaitCloning, Vec2::ZERO, Some(AgentTarget::Agent(cloner))) {
        assign_mode_to(ctx, cloner, AgentMode::Standby, Vec2::ZERO, None);
        return false;
    }
    let Some(colony) = ctx.colony_mut(id) else {
        return false;
    };
    colony.cloning_delay = CLONING_DELAY;
    colony.spend(cost)
}

fn merge_agents(ctx: &mut SimContext, id: ColonyId, a: Entity, b: Entity, evo_cost: f64, roomba: bool) -> bool {
    if a == b || !owned_by(ctx, a, id) || !owned_by(ctx, b, id) {
        return false;
    }
    if ctx.colony(id).map_or(true, |c| c.evo_points < evo_cost) {
        return false;
    }
    let (Some(pos_a), Some(pos_b)) = (ctx.agent_pos(a), ctx.agent_pos(b)) else {
        return false;
    };
    let mid = pos_a.midpoint(pos_b);
    let mode = if roomba {
        AgentMode::MergingRoomba
    } else {
        AgentMode::Merging
    };
    let spread = Vec2::new(MERGE_SPREAD, 0.0);
    if !assign_mode_to(ctx, a, mode, mid - spread, Some(AgentTarget::Agent(b))) {
        return false;
    }
    if !assign_mode_to(ctx, b, mode, mid + spread, Some(AgentTarget::Agent(a))) {
        assign_mode_to(ctx, a, AgentMode::Standby, Vec2::ZERO, None);
        return false;
    }
    if let Some(colony) = ctx.colony_mut(id) {
        colony.evo_points = (colony.evo_points - evo_cost).max(0.0);
    }
    true
}

fn set_patrol(ctx: &mut SimContext, id: ColonyId) -> bool {
    let limit = ctx.rng.int_range(1, 3) as usize;
    let flags = SearchFlags::FIGHTERS | SearchFlags::RANDOMIZED;
    let fighters = match ctx.colonies.get(id.index()) {
        Some(colony) => colony
            .agents
            .collect(&ctx.world, &mut ctx.rng, flags, limit, |a| a.mode == AgentMode::Standby),
        None => return false,
    };
    let mut assigned = false;
    for e in fighters {
        assigned |= assign_mode_to(ctx, e, AgentMode::Patrol, Vec2::ZERO, None);
    }
    assigned
}

/// Send fighters after `attacker`. A garrison call only takes a few idle
/// fighters; a patrol call takes every available one.
fn defend(ctx: &mut SimContext, id: ColonyId, attacker: Entity, garrison: bool) -> bool {
    let Some(kind) = ctx
        .world
        .get::<&Creep>(attacker)
        .ok()
        .filter(|c| !c.disposed)
        .map(|c| c.target_kind())
    else {
        return false;
    };
    let (flags, limit) = if garrison {
        (SearchFlags::FIGHTERS | SearchFlags::RANDOMIZED, ctx.rng.int_range(2, 4) as usize)
    } else {
        (
            SearchFlags::FIGHTERS | SearchFlags::ONLY_AVAILABLE | SearchFlags::RANDOMIZED,
            usize::MAX,
        )
    };
    let defenders = match ctx.colonies.get(id.index()) {
        Some(colony) => colony.agents.collect(&ctx.world, &mut ctx.rng, flags, limit, |a| {
            a.can_attack(kind) && (!garrison || a.mode == AgentMode::Standby)
        }),
        None => return false,
    };
    let mut assigned = false;
    for e in defenders {
        assigned |= assign_mode_to(ctx, e, AgentMode::Follow, Vec2::ZERO, Some(AgentTarget::Creep(attacker)));
    }
    assigned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{BuildingKind, ColonyCore, Rect};
    use dronecolony_logic::creeps::CRAWLER;
    use dronecolony_logic::faction::FactionTag;
    use dronecolony_logic::resources::SourceKind;
    use dronecolony_logic::stats::{AgentStats, CLONER, DEN_CORE, FIGHTER, GUNPOINT, SCOUT, WORKER};

    fn context() -> (SimContext, ColonyId) {
        let mut ctx = SimContext::new(Rect::from_size(1600.0, 1600.0), 17);
        let id = ctx.add_colony(ColonyCore::new(ColonyId(0), &DEN_CORE, Vec2::new(800.0, 800.0)));
        (ctx, id)
    }

    fn add(ctx: &mut SimContext, id: ColonyId, stats: &'static AgentStats, pos: Vec2) -> Entity {
        let e = ctx.spawn_agent(Agent::new(stats, id, pos));
        ctx.attach_agent(id, e);
        e
    }

    fn mode(ctx: &SimContext, e: Entity) -> AgentMode {
        ctx.world.get::<&Agent>(e).unwrap().mode
    }

    #[test]
    fn test_mine_essence_dispatches_workers() {
        let (mut ctx, id) = context();
        for _ in 0..5 {
            add(&mut ctx, id, &WORKER, Vec2::new(800.0, 760.0));
        }
        let source = ctx.spawn_source(EssenceSource::new(SourceKind::Iron, Vec2::new(900.0, 800.0), 20));

        assert!(execute_action(&mut ctx, id, ColonyAction::MineEssence { source }));
        let miners = ctx.colonies[0]
            .agents
            .workers
            .iter()
            .filter(|&&e| mode(&ctx, e) == AgentMode::MineEssence)
            .count();
        assert!(miners >= 1);
        // Resources priority is 0.5: 2.0 seconds of mining delay.
        assert!((ctx.colonies[0].resource_delay - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_mine_essence_without_workers_counts_shortage() {
        let (mut ctx, id) = context();
        let source = ctx.spawn_source(EssenceSource::new(SourceKind::Iron, Vec2::new(900.0, 800.0), 20));
        assert!(!execute_action(&mut ctx, id, ColonyAction::MineEssence { source }));
        assert_eq!(ctx.colonies[0].resource_shortage, 1);
        assert_eq!(ctx.colonies[0].resource_delay, 0.0);
    }

    #[test]
    fn test_produce_spends_cost() {
        let (mut ctx, id) = context();
        ctx.colonies[0].resources = 10.0;
        ctx.colonies[0].elite_resources = 1.5;
        assert!(execute_action(&mut ctx, id, ColonyAction::ProduceAgent { kind: AgentKind::Worker }));
        let colony = &ctx.colonies[0];
        assert!((colony.resources - (10.0 - WORKER.cost)).abs() < 1e-9);
        assert!((colony.elite_resources - 0.5).abs() < 1e-9);
        assert_eq!(ctx.state.result.drones_produced, 1);
        let e = colony.agents.workers[0];
        let agent = ctx.world.get::<&Agent>(e).unwrap();
        assert_eq!(agent.mode, AgentMode::Takeoff);
        assert_eq!(agent.rank, 1);
    }

    #[test]
    fn test_produce_refuses_when_broke() {
        let (mut ctx, id) = context();
        ctx.colonies[0].resources = WORKER.cost - 0.5;
        assert!(!execute_action(&mut ctx, id, ColonyAction::ProduceAgent { kind: AgentKind::Worker }));
        assert_eq!(ctx.colonies[0].resources, WORKER.cost - 0.5);
        assert_eq!(ctx.colonies[0].agents.total_num(), 0);
    }

    #[test]
    fn test_repair_base_costs_seven() {
        let (mut ctx, id) = context();
        add(&mut ctx, id, &WORKER, Vec2::new(800.0, 760.0));
        ctx.colonies[0].resources = 6.0;
        assert!(!execute_action(&mut ctx, id, ColonyAction::RepairBase));
        ctx.colonies[0].resources = 10.0;
        assert!(execute_action(&mut ctx, id, ColonyAction::RepairBase));
        assert!((ctx.colonies[0].resources - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_repair_turret_targets_turret() {
        let (mut ctx, id) = context();
        let worker = add(&mut ctx, id, &WORKER, Vec2::new(800.0, 760.0));
        let turret = add(&mut ctx, id, &GUNPOINT, Vec2::new(900.0, 900.0));
        ctx.colonies[0].resources = 5.0;
        assert!(execute_action(&mut ctx, id, ColonyAction::RepairTurret { turret }));
        assert_eq!(mode(&ctx, worker), AgentMode::RepairTurret);
        assert!((ctx.colonies[0].resources - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_build_charges_per_worker() {
        let (mut ctx, id) = context();
        for _ in 0..3 {
            add(&mut ctx, id, &WORKER, Vec2::new(800.0, 760.0));
        }
        let site = ctx
            .world
            .spawn((Construction::new(AgentKind::Gunpoint, id, Vec2::new(860.0, 800.0)),));
        ctx.colonies[0].resources = 10.0;
        assert!(execute_action(&mut ctx, id, ColonyAction::BuildBuilding { site }));
        let builders = ctx.colonies[0]
            .agents
            .workers
            .iter()
            .filter(|&&e| mode(&ctx, e) == AgentMode::BuildBuilding)
            .count();
        assert_eq!(builders, 1);
        assert!((ctx.colonies[0].resources - (10.0 - BUILD_COST)).abs() < 1e-9);
    }

    #[test]
    fn test_convert_evo_sets_cooldown() {
        let (mut ctx, id) = context();
        let mut pillar = NeutralBuilding::new(BuildingKind::EvoPillar, Vec2::new(900.0, 900.0));
        pillar.owner = Some(id);
        let building = ctx.world.spawn((pillar,));
        assert_eq!(pick_action(&mut ctx, id), Some(ColonyAction::ConvertEvo { building }));
        assert!(execute_action(&mut ctx, id, ColonyAction::ConvertEvo { building }));
        assert_eq!(ctx.colonies[0].evo_points, BUILDING_EVO_POINTS);
        assert!(!execute_action(&mut ctx, id, ColonyAction::ConvertEvo { building }));
    }

    #[test]
    fn test_generate_evo_from_tier_two() {
        let (mut ctx, id) = context();
        assert!(!execute_action(&mut ctx, id, ColonyAction::GenerateEvo));
        for _ in 0..3 {
            add(&mut ctx, id, &FIGHTER, Vec2::new(800.0, 760.0));
        }
        assert!(execute_action(&mut ctx, id, ColonyAction::GenerateEvo));
        let expected = 3.0 * FactionTag::Neutral.evo_yield() * evo_gain_multiplier(ctx.colonies[0].radius);
        assert!((ctx.colonies[0].evo_points - expected).abs() < 1e-9);
    }

    #[test]
    fn test_clone_pairs_cloner_with_target() {
        let (mut ctx, id) = context();
        let cloner = add(&mut ctx, id, &CLONER, Vec2::new(800.0, 760.0));
        let target = add(&mut ctx, id, &FIGHTER, Vec2::new(820.0, 760.0));
        ctx.colonies[0].resources = 100.0;
        assert!(execute_action(&mut ctx, id, ColonyAction::CloneAgent { target, cloner }));
        assert_eq!(mode(&ctx, cloner), AgentMode::MakeClone);
        assert_eq!(mode(&ctx, target), AgentMode::WaitCloning);
        assert_eq!(ctx.colonies[0].cloning_delay, CLONING_DELAY);
        assert!((ctx.colonies[0].resources - (100.0 - cloning_cost(&FIGHTER))).abs() < 1e-9);
        assert!(!execute_action(&mut ctx, id, ColonyAction::CloneAgent { target, cloner }));
    }

    #[test]
    fn test_merge_assigns_both_partners() {
        let (mut ctx, id) = context();
        let a = add(&mut ctx, id, &SCOUT, Vec2::new(780.0, 760.0));
        let b = add(&mut ctx, id, &SCOUT, Vec2::new(820.0, 760.0));
        let action = ColonyAction::MergeAgents {
            a,
            b,
            evo_cost: 0.0,
            roomba: false,
        };
        assert!(execute_action(&mut ctx, id, action));
        assert_eq!(mode(&ctx, a), AgentMode::Merging);
        assert_eq!(mode(&ctx, b), AgentMode::Merging);
    }

    #[test]
    fn test_merge_needs_evolution_points() {
        let (mut ctx, id) = context();
        let a = add(&mut ctx, id, &FIGHTER, Vec2::new(780.0, 760.0));
        let b = add(&mut ctx, id, &FIGHTER, Vec2::new(820.0, 760.0));
        let action = ColonyAction::MergeAgents {
            a,
            b,
            evo_cost: 5.0,
            roomba: false,
        };
        assert!(!execute_action(&mut ctx, id, action));
        assert_eq!(mode(&ctx, a), AgentMode::Standby);
    }

    #[test]
    fn test_defence_follows_attacker() {
        let (mut ctx, id) = context();
        let fighter = add(&mut ctx, id, &FIGHTER, Vec2::new(800.0, 760.0));
        let creep = ctx.spawn_creep(Creep::new(&CRAWLER, Vec2::new(900.0, 800.0), false));
        ctx.add_priority(id, ColonyPriority::Security, 1.0);
        assert_eq!(
            pick_action(&mut ctx, id),
            Some(ColonyAction::DefenceGarrison { attacker: creep })
        );
        assert!(execute_action(&mut ctx, id, ColonyAction::DefenceGarrison { attacker: creep }));
        assert_eq!(mode(&ctx, fighter), AgentMode::Follow);
    }

    #[test]
    fn test_pick_is_none_in_flight() {
        let (mut ctx, id) = context();
        ctx.colonies[0].mode = crate::components::ColonyMode::Takeoff;
        assert_eq!(pick_action(&mut ctx, id), None);
    }

    #[test]
    fn test_pick_does_not_spend() {
        let (mut ctx, id) = context();
        for _ in 0..4 {
            add(&mut ctx, id, &WORKER, Vec2::new(800.0, 760.0));
        }
        ctx.spawn_source(EssenceSource::new(SourceKind::Iron, Vec2::new(900.0, 800.0), 20));
        ctx.colonies[0].resources = 30.0;
        for _ in 0..50 {
            pick_action(&mut ctx, id);
        }
        assert_eq!(ctx.colonies[0].resources, 30.0);
        assert!(ctx.colonies[0]
            .agents
            .workers
            .iter()
            .all(|&e| mode(&ctx, e) == AgentMode::Standby));
    }
}
