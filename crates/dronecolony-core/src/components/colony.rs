//! Colony core component and its agent bookkeeping.

use bitflags::bitflags;
use dronecolony_logic::economy::{
    attack_radius, patrol_radius, storage_cap, unit_limit, INITIAL_COLONY_RADIUS, MAX_ELITE_RESOURCES,
    MAX_EVO_POINTS,
};
use dronecolony_logic::faction::FactionTag;
use dronecolony_logic::stats::{AgentKind, AgentStats, CoreKind, CoreStats};
use dronecolony_logic::weights::WeightContainer;
use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use super::agent::{Agent, AgentMode};
use super::common::Vec2;
use crate::rng::{rand_order, SimRng};

/// Index into the engine's colony list. Colonies are never removed, only
/// disposed, so an id stays valid for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColonyId(pub u32);

impl ColonyId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColonyMode {
    Normal,
    Takeoff,
    Relocating,
    Landing,
    Teleporting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColonyPriority {
    Resources,
    Growth,
    Evolution,
    Security,
}

impl ColonyPriority {
    pub const ALL: [ColonyPriority; 4] = [
        ColonyPriority::Resources,
        ColonyPriority::Growth,
        ColonyPriority::Evolution,
        ColonyPriority::Security,
    ];
}

bitflags! {
    /// Filters for [`AgentContainer::collect`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SearchFlags: u8 {
        const WORKERS = 1 << 0;
        const FIGHTERS = 1 << 1;
        /// Standby agents, plus patrolling fighters.
        const ONLY_AVAILABLE = 1 << 2;
        /// Start at a random index and walk in a random direction.
        const RANDOMIZED = 1 << 3;
    }
}

/// Mobile agents of a colony split by role. Turrets and roombas are
/// tracked separately on [`ColonyCore`].
#[derive(Debug, Clone, Default)]
pub struct AgentContainer {
    pub workers: Vec<Entity>,
    pub fighters: Vec<Entity>,
    pub servo_num: u32,
}

fn is_available(agent: &Agent, fighter: bool) -> bool {
    agent.mode == AgentMode::Standby || (fighter && agent.mode == AgentMode::Patrol)
}

impl AgentContainer {
    pub fn add(&mut self, e: Entity, stats: &AgentStats) {
        if stats.kind == AgentKind::Servo {
            self.servo_num += 1;
        }
        if stats.can_patrol {
            self.fighters.push(e);
        } else {
            self.workers.push(e);
        }
    }

    pub fn remove(&mut self, e: Entity, stats: &AgentStats) -> bool {
        let list = if stats.can_patrol {
            &mut self.fighters
        } else {
            &mut self.workers
        };
        let Some(i) = list.iter().position(|&x| x == e) else {
            return false;
        };
        list.swap_remove(i);
        if stats.kind == AgentKind::Servo {
            self.servo_num = self.servo_num.saturating_sub(1);
        }
        true
    }

    pub fn contains(&self, e: Entity) -> bool {
        self.workers.contains(&e) || self.fighters.contains(&e)
    }

    pub fn total_num(&self) -> usize {
        self.workers.len() + self.fighters.len()
    }

    pub fn num_available_workers(&self, world: &World) -> usize {
        count_available(world, &self.workers, false)
    }

    pub fn num_available_fighters(&self, world: &World) -> usize {
        count_available(world, &self.fighters, true)
    }

    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.workers.iter().chain(self.fighters.iter()).copied()
    }

    /// Up to `limit` agents matching `flags` and `pred`. Agents currently
    /// detached from the world (mid-update) are skipped.
    pub fn collect(
        &self,
        world: &World,
        rng: &mut SimRng,
        flags: SearchFlags,
        limit: usize,
        mut pred: impl FnMut(&Agent) -> bool,
    ) -> Vec<Entity> {
        let mut found = Vec::new();
        let lists = [
            (SearchFlags::WORKERS, &self.workers, false),
            (SearchFlags::FIGHTERS, &self.fighters, true),
        ];
        for (flag, list, fighter) in lists {
            if !flags.contains(flag) {
                continue;
            }
            let order: Vec<usize> = if flags.contains(SearchFlags::RANDOMIZED) {
                rand_order(rng, list.len())
            } else {
                (0..list.len()).collect()
            };
            for i in order {
                if found.len() >= limit {
                    return found;
                }
                let e = list[i];
                let Ok(agent) = world.get::<&Agent>(e) else {
                    continue;
                };
                if agent.disposed {
                    continue;
                }
                if flags.contains(SearchFlags::ONLY_AVAILABLE) && !is_available(&agent, fighter) {
                    continue;
                }
                if pred(&agent) {
                    found.push(e);
                }
            }
        }
        found
    }

    pub fn find(
        &self,
        world: &World,
        rng: &mut SimRng,
        flags: SearchFlags,
        pred: impl FnMut(&Agent) -> bool,
    ) -> Option<Entity> {
        self.collect(world, rng, flags, 1, pred).into_iter().next()
    }
}

fn count_available(world: &World, list: &[Entity], fighter: bool) -> usize {
    list.iter()
        .filter(|&&e| {
            world
                .get::<&Agent>(e)
                .map_or(false, |a| !a.disposed && is_available(&a, fighter))
        })
        .count()
}

#[derive(Debug, Clone)]
pub struct ColonyCore {
    pub id: ColonyId,
    pub stats: &'static CoreStats,
    pub pos: Vec2,
    pub waypoint: Vec2,
    /// Destination of the current relocation.
    pub relocation_point: Vec2,
    pub height: f64,
    pub mode: ColonyMode,

    pub health: f64,
    pub max_health: f64,
    pub radius: f64,
    pub resources: f64,
    pub elite_resources: f64,
    pub evo_points: f64,

    pub priorities: WeightContainer<ColonyPriority>,
    pub faction_weights: WeightContainer<FactionTag>,

    pub agents: AgentContainer,
    pub turrets: Vec<Entity>,
    pub roombas: Vec<Entity>,
    /// Beacons currently boosting this colony's flight.
    pub tether: u32,

    pub action_delay: f64,
    pub cloning_delay: f64,
    pub resource_delay: f64,
    pub capture_delay: f64,
    pub upkeep_delay: f64,
    pub warning_cooldown: f64,
    pub teleport_delay: f64,
    /// Source a MineEssence action could not staff; skipped next time.
    pub failed_resource: Option<Entity>,
    /// Workers that could not be assigned, accumulated across actions.
    pub resource_shortage: u32,
    /// Vertical offset of the hatch agents enter and leave through.
    pub hatch_offset_y: f64,

    pub disposed: bool,
}

impl ColonyCore {
    pub fn new(id: ColonyId, stats: &'static CoreStats, pos: Vec2) -> Self {
        let mut priorities = WeightContainer::new(&ColonyPriority::ALL);
        priorities.set_weight(ColonyPriority::Resources, 0.5);
        priorities.set_weight(ColonyPriority::Growth, 0.4);
        priorities.set_weight(ColonyPriority::Security, 0.1);
        let mut faction_weights = WeightContainer::new(&FactionTag::ALL);
        faction_weights.set_weight(FactionTag::Neutral, 1.0);

        let height = if stats.kind == CoreKind::Ark {
            stats.flight_height
        } else {
            0.0
        };

        Self {
            id,
            stats,
            pos,
            waypoint: Vec2::ZERO,
            relocation_point: Vec2::ZERO,
            height,
            mode: ColonyMode::Normal,
            health: stats.max_health,
            max_health: stats.max_health,
            radius: INITIAL_COLONY_RADIUS,
            resources: 0.0,
            elite_resources: 0.0,
            evo_points: 0.0,
            priorities,
            faction_weights,
            agents: AgentContainer::default(),
            turrets: Vec::new(),
            roombas: Vec::new(),
            tether: 0,
            action_delay: 0.0,
            cloning_delay: 0.0,
            resource_delay: 0.0,
            capture_delay: 0.0,
            upkeep_delay: 10.0,
            warning_cooldown: 0.0,
            teleport_delay: 0.0,
            failed_resource: None,
            resource_shortage: 0,
            hatch_offset_y: 6.0,
            disposed: false,
        }
    }

    pub fn is_normal(&self) -> bool {
        self.mode == ColonyMode::Normal
    }

    /// True while the core is airborne between two landing spots.
    pub fn is_in_flight(&self) -> bool {
        !self.is_normal()
    }

    pub fn priority(&self, p: ColonyPriority) -> f64 {
        self.priorities.get_weight(p)
    }

    pub fn resources_priority(&self) -> f64 {
        self.priority(ColonyPriority::Resources)
    }

    pub fn growth_priority(&self) -> f64 {
        self.priority(ColonyPriority::Growth)
    }

    pub fn evolution_priority(&self) -> f64 {
        self.priority(ColonyPriority::Evolution)
    }

    pub fn security_priority(&self) -> f64 {
        self.priority(ColonyPriority::Security)
    }

    pub fn patrol_radius(&self) -> f64 {
        patrol_radius(self.radius, self.security_priority())
    }

    pub fn attack_radius(&self) -> f64 {
        attack_radius(self.radius, self.security_priority())
    }

    pub fn unit_limit(&self) -> usize {
        unit_limit(self.radius, self.growth_priority(), self.stats.drone_limit)
    }

    pub fn storage_cap(&self) -> f64 {
        storage_cap(self.stats.resources_limit)
    }

    pub fn entrance_pos(&self) -> Vec2 {
        self.pos + Vec2::new(-1.0, self.hatch_offset_y)
    }

    pub fn storage_pos(&self) -> Vec2 {
        self.pos + Vec2::new(1.0, 0.0)
    }

    pub fn total_units(&self) -> usize {
        self.agents.total_num() + self.turrets.len() + self.roombas.len()
    }

    pub fn heal(&mut self, amount: f64) {
        self.health = (self.health + amount).min(self.max_health);
    }

    pub fn add_resources(&mut self, amount: f64) {
        self.resources = (self.resources + amount).max(0.0);
    }

    /// Spend `amount` if affordable.
    pub fn spend(&mut self, amount: f64) -> bool {
        if self.resources < amount {
            return false;
        }
        self.resources -= amount;
        true
    }

    pub fn add_elite_resources(&mut self, amount: f64) {
        self.elite_resources = (self.elite_resources + amount).clamp(0.0, MAX_ELITE_RESOURCES);
    }

    pub fn add_evo_points(&mut self, amount: f64) {
        self.evo_points = (self.evo_points + amount).clamp(0.0, MAX_EVO_POINTS);
    }

    pub fn pick_faction(&self, rng: &mut SimRng) -> FactionTag {
        self.faction_weights
            .pick(rng.float())
            .unwrap_or(FactionTag::Neutral)
    }

    /// Every owned unit: workers, fighters, turrets and roombas.
    pub fn all_units(&self) -> Vec<Entity> {
        self.agents
            .iter()
            .chain(self.turrets.iter().copied())
            .chain(self.roombas.iter().copied())
            .collect()
    }

    pub fn owns(&self, e: Entity) -> bool {
        self.agents.contains(e) || self.turrets.contains(&e) || self.roombas.contains(&e)
    }

    /// Drop `e` from whichever list holds it.
    pub fn detach(&mut self, e: Entity, stats: &AgentStats) {
        if self.agents.remove(e, stats) {
            return;
        }
        self.turrets.retain(|&x| x != e);
        self.roombas.retain(|&x| x != e);
    }
}
