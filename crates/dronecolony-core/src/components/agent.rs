//! Colony agent component: drones, turrets and roombas.
//!
//! An [`Agent`] is a mutable runtime snapshot. Behavior lives in
//! `systems::agent_modes` (transitions) and `systems::agent_update`
//! (per-tick work); this module only holds the data and the creation rolls.

use bitflags::bitflags;
use dronecolony_logic::faction::{faction_bonus, FactionTag};
use dronecolony_logic::stats::{AgentKind, AgentStats, TargetKind};
use hecs::Entity;
use serde::{Deserialize, Serialize};

use super::colony::ColonyId;
use super::common::Vec2;
use crate::rng::SimRng;

/// Cruise altitude of flying drones.
pub const AGENT_FLIGHT_HEIGHT: f64 = 40.0;
/// Vertical speed used while picking up resources and aligning.
pub const AGENT_PICKUP_SPEED: f64 = 40.0;
/// Seconds a tether beacon boost lasts on a drone.
pub const TETHER_DURATION: f64 = 8.0;

/// Exactly one mode is active at a time.
///
/// Shared scratch fields on [`Agent`] change meaning per mode:
/// `dist` is an orbit radius (Standby, Patrol), a countdown (Posing,
/// MakeClone, Merging, repairs, builds, RoombaWait, KamikazeAttack fuse);
/// `waypoints_left` counts remaining legs (Patrol, Follow, Panic) or
/// Adventurer orbit laps (Standby).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentMode {
    Standby,
    AlignStandby,
    Charging,
    Posing,
    ForcedCharging,
    MineEssence,
    CourierFlight,
    /// Assign-only: enters MineEssence on a scrap source.
    Scavenge,
    RepairBase,
    RepairTurret,
    Return,
    Patrol,
    Follow,
    Move,
    CloakHide,
    Panic,
    /// Assign-only: a long-range Follow.
    Attack,
    MakeClone,
    WaitCloning,
    Pickup,
    ResourceTakeoff,
    Takeoff,
    RecycleReturn,
    RecycleLanding,
    Merging,
    MergingRoomba,
    BuildBuilding,
    CaptureBuilding,
    GuardForever,
    RoombaPatrol,
    RoombaWait,
    KamikazeAttack,
    ConsumeDrone,
}

bitflags! {
    /// Behavioral modifiers rolled once at creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AgentTraits: u64 {
        const NEVER_STOP = 1 << 0;
        const COUNTER_CLOCKWISE = 1 << 1;
        const WORKAHOLIC = 1 << 2;
        const DO_OR_DIE = 1 << 3;
        const ADVENTURER = 1 << 4;
        const LOW_HP_BERSERK = 1 << 5;
        const LOW_HP_RETREAT = 1 << 6;
        const LOW_HP_RECYCLE = 1 << 7;
        const LOW_HP_PANIC = 1 << 8;
    }
}

/// What the current mode is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentTarget {
    Agent(Entity),
    Creep(Entity),
    Source(Entity),
    Construction(Entity),
    Building(Entity),
    Colony(ColonyId),
    /// A tether beacon's link to a flying colony.
    Tether(ColonyId),
}

impl AgentTarget {
    pub fn agent(self) -> Option<Entity> {
        match self {
            AgentTarget::Agent(e) => Some(e),
            _ => None,
        }
    }

    pub fn creep(self) -> Option<Entity> {
        match self {
            AgentTarget::Creep(e) => Some(e),
            _ => None,
        }
    }

    pub fn source(self) -> Option<Entity> {
        match self {
            AgentTarget::Source(e) => Some(e),
            _ => None,
        }
    }

    pub fn colony(self) -> Option<ColonyId> {
        match self {
            AgentTarget::Colony(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Agent {
    /// Own entity handle, set on spawn.
    pub id: Entity,
    pub stats: &'static AgentStats,
    pub colony: ColonyId,

    pub pos: Vec2,
    pub height: f64,
    pub traits: AgentTraits,
    pub path: std::collections::VecDeque<crate::spatial::Direction>,

    pub mode: AgentMode,
    pub waypoint: Vec2,
    pub target: Option<AgentTarget>,

    pub payload: u32,
    pub clone_gen: u32,
    pub rank: u8,
    pub devourer_level: u32,
    pub faction: FactionTag,
    pub cargo_value: f64,
    pub cargo_elite_value: f64,
    pub reload_rate: f64,
    pub health_regen: f64,

    pub attack_delay: f64,
    pub support_delay: f64,
    pub special_delay: f64,
    pub cloaking: f64,

    pub max_health: f64,
    pub health: f64,
    pub max_energy: f64,
    pub energy: f64,
    pub energy_bill: f64,
    pub energy_regen_rate: f64,
    pub slow: f64,
    pub lifetime: f64,

    /// Remaining tether boost; for a beacon linked to a colony, the link time.
    pub tether_time: f64,
    pub resting: bool,
    pub speed: f64,

    pub dist: f64,
    pub waypoints_left: i32,

    pub disposed: bool,
}

impl Agent {
    /// A bare agent. Faction and rank are set by the creator before
    /// [`Agent::init`] rolls the per-instance attributes.
    pub fn new(stats: &'static AgentStats, colony: ColonyId, pos: Vec2) -> Self {
        Self {
            id: Entity::DANGLING,
            stats,
            colony,
            pos,
            height: AGENT_FLIGHT_HEIGHT,
            traits: AgentTraits::empty(),
            path: Default::default(),
            mode: AgentMode::Standby,
            waypoint: Vec2::ZERO,
            target: None,
            payload: 0,
            clone_gen: 0,
            rank: 0,
            devourer_level: 0,
            faction: FactionTag::Neutral,
            cargo_value: 0.0,
            cargo_elite_value: 0.0,
            reload_rate: 1.0,
            health_regen: 0.0,
            attack_delay: 0.0,
            support_delay: 0.0,
            special_delay: 0.0,
            cloaking: 0.0,
            max_health: stats.max_health,
            health: stats.max_health,
            max_energy: 0.0,
            energy: 0.0,
            energy_bill: 0.0,
            energy_regen_rate: 1.0,
            slow: 0.0,
            lifetime: 0.0,
            tether_time: 0.0,
            resting: false,
            speed: stats.speed,
            dist: 0.0,
            waypoints_left: 0,
            disposed: false,
        }
    }

    pub fn with_faction(mut self, faction: FactionTag) -> Self {
        self.faction = faction;
        self
    }

    pub fn with_rank(mut self, rank: u8) -> Self {
        self.rank = rank;
        self
    }

    /// A fresh copy of a normal-rank agent. Elite units cannot be cloned.
    pub fn make_clone(&self, pos: Vec2) -> Agent {
        if self.rank > 0 {
            panic!("attempted to clone an elite unit ({:?})", self.stats.kind);
        }
        let mut cloned = Agent::new(self.stats, self.colony, pos);
        cloned.speed = self.speed;
        cloned.devourer_level = self.devourer_level;
        cloned.max_health = self.max_health;
        cloned.max_energy = self.max_energy;
        cloned.reload_rate = self.reload_rate;
        cloned.traits = self.traits;
        cloned.clone_gen = self.clone_gen + 1;
        cloned.faction = self.faction;
        cloned.energy_regen_rate = self.energy_regen_rate;
        cloned.health_regen = self.health_regen;
        cloned
    }

    /// Roll lifetime, stats variance, traits and rank bonuses.
    pub fn init(&mut self, rng: &mut SimRng) {
        if self.stats.tier == 1 {
            self.lifetime = rng.float_range(90.0, 180.0);
            // A neutral drone is probably part of a young colony.
            if self.faction == FactionTag::Neutral {
                self.lifetime *= 2.0;
            }
        }

        if self.clone_gen == 0 {
            self.energy_regen_rate = 1.0 + self.stats.energy_regen_bonus;
            self.health_regen = self.stats.self_repair;
            self.max_health = self.stats.max_health * rng.float_range(0.9, 1.1);
            self.max_energy = rng.float_range(120.0, 200.0);
            self.speed = self.stats.speed * rng.float_range(0.8, 1.1);

            let bonus = faction_bonus(self.faction);
            self.max_health *= bonus.max_health;
            self.speed *= bonus.speed;
            self.max_energy *= bonus.max_energy;
            self.energy_regen_rate += bonus.energy_regen;
        }

        if self.clone_gen == 0 && !self.is_turret() {
            self.traits |= roll_traits(rng, self.stats.tier);
        }

        if self.clone_gen == 0 {
            self.apply_rank_bonuses();
        }

        self.health = self.max_health;
        self.energy = self.max_energy;
        self.support_delay = rng.float_range(0.8, 2.0);
    }

    fn apply_rank_bonuses(&mut self) {
        match self.rank {
            0 => {}
            1 => {
                self.max_health *= 1.15;
                self.speed *= 1.15;
                self.max_energy *= 1.4;
                self.energy_regen_rate += 0.1;
                self.reload_rate = 1.3;
                self.health_regen += 0.25;
            }
            _ => {
                self.max_health *= 1.5;
                self.speed *= 1.2;
                self.max_energy *= 2.0;
                self.energy_regen_rate += 0.3;
                self.reload_rate = 1.6;
                self.health_regen += 0.5;
            }
        }
    }

    pub fn kind(&self) -> AgentKind {
        self.stats.kind
    }

    pub fn is_turret(&self) -> bool {
        self.stats.is_turret
    }

    pub fn is_flying(&self) -> bool {
        self.stats.is_flying
    }

    pub fn is_cloaked(&self) -> bool {
        self.cloaking > 0.0
    }

    pub fn is_tethered(&self) -> bool {
        self.tether_time > 0.0
    }

    pub fn has_trait(&self, t: AgentTraits) -> bool {
        self.traits.intersects(t)
    }

    pub fn can_attack(&self, kind: TargetKind) -> bool {
        self.stats.can_attack(kind)
    }

    pub fn target_kind(&self) -> TargetKind {
        self.stats.target_kind()
    }

    pub fn max_payload(&self) -> u32 {
        self.stats.max_payload + self.faction.payload_bonus()
    }

    pub fn health_percentage(&self) -> f64 {
        self.health / self.max_health
    }

    pub fn energy_percentage(&self) -> f64 {
        if self.max_energy == 0.0 {
            return 0.0;
        }
        self.energy / self.max_energy
    }

    pub fn heal(&mut self, amount: f64) {
        self.health = (self.health + amount).min(self.max_health);
    }

    pub fn add_energy(&mut self, amount: f64) {
        self.energy = (self.energy + amount).min(self.max_energy);
    }

    pub fn clear_cargo(&mut self) {
        self.payload = 0;
        self.cargo_value = 0.0;
        self.cargo_elite_value = 0.0;
    }

    pub fn cloak(&mut self, duration: f64) {
        self.cloaking = duration;
    }

    pub fn uncloak(&mut self) {
        self.cloaking = 0.0;
    }

    /// Repairs applied by workers count double on turrets.
    pub fn on_building_repair(&mut self, amount: f64) {
        if self.health >= self.max_health {
            return;
        }
        self.heal(amount * 2.0);
    }

    /// Current travel speed for the active mode.
    pub fn movement_speed(&self) -> f64 {
        let base = match self.mode {
            AgentMode::KamikazeAttack => return 2.0 * self.speed,
            AgentMode::Takeoff | AgentMode::RecycleLanding => return 30.0,
            AgentMode::Pickup | AgentMode::ResourceTakeoff | AgentMode::AlignStandby => {
                AGENT_PICKUP_SPEED
            }
            _ => self.speed,
        };
        let mut multiplier = if self.resting { 0.5 } else { 1.0 };
        if self.slow > 0.0 {
            multiplier *= 0.55;
        }
        if self.is_tethered() {
            multiplier *= 2.0;
        }
        base * multiplier
    }

    /// Move towards `pos` at `speed`. True once the agent stands on it.
    pub fn move_towards_with_speed(&mut self, delta: f64, speed: f64, pos: Vec2) -> bool {
        self.pos = self.pos.move_towards(pos, speed * delta);
        self.pos == pos
    }

    pub fn move_towards(&mut self, delta: f64, pos: Vec2) -> bool {
        let speed = self.movement_speed();
        self.move_towards_with_speed(delta, speed, pos)
    }

    /// Velocity estimate used for projectile leading.
    pub fn velocity(&self) -> Vec2 {
        if self.waypoint.is_zero() {
            return Vec2::ZERO;
        }
        self.pos.direction_to(self.waypoint) * self.movement_speed()
    }
}

/// Each 3-bit mask of a 64-bit roll matches with a 1/8 chance.
fn roll_traits(rng: &mut SimRng, tier: u8) -> AgentTraits {
    const CHANCE_12: u64 = 0b111;
    const COUNTER_CLOCKWISE_BITS: u64 = CHANCE_12;
    const WORKAHOLIC_BITS: u64 = CHANCE_12 << 3;
    const DO_OR_DIE_BITS: u64 = CHANCE_12 << 6;
    const ADVENTURER_BITS: u64 = CHANCE_12 << 9;

    let mut traits = AgentTraits::empty();
    let bits = rng.u64();
    for (mask, t) in [
        (COUNTER_CLOCKWISE_BITS, AgentTraits::COUNTER_CLOCKWISE),
        (WORKAHOLIC_BITS, AgentTraits::WORKAHOLIC),
        (DO_OR_DIE_BITS, AgentTraits::DO_OR_DIE),
        (ADVENTURER_BITS, AgentTraits::ADVENTURER),
    ] {
        if bits & mask == mask {
            traits |= t;
        }
    }

    if rng.chance(0.4) {
        traits |= AgentTraits::NEVER_STOP;
    }

    // At most one low-health reaction.
    let roll = rng.float();
    if roll < 0.10 {
        traits |= AgentTraits::LOW_HP_RETREAT;
    } else if roll < 0.20 {
        if tier == 1 {
            traits |= AgentTraits::LOW_HP_RECYCLE;
        }
    } else if roll < 0.25 {
        traits |= AgentTraits::LOW_HP_BERSERK;
    } else if roll < 0.30 {
        traits |= AgentTraits::LOW_HP_PANIC;
    }

    traits
}

#[cfg(test)]
mod tests {
    use super::*;
    use dronecolony_logic::stats::{GUNPOINT, SCOUT, WORKER};

    fn colony() -> ColonyId {
        ColonyId(0)
    }

    #[test]
    fn test_init_rolls_within_ranges() {
        let mut rng = SimRng::new(1);
        for _ in 0..50 {
            let mut a = Agent::new(&WORKER, colony(), Vec2::ZERO);
            a.init(&mut rng);
            assert!(a.max_health >= WORKER.max_health * 0.9);
            assert!(a.max_health <= WORKER.max_health * 1.1);
            assert!((120.0..200.0).contains(&a.max_energy));
            // Neutral tier-1 drones live twice as long.
            assert!((180.0..360.0).contains(&a.lifetime));
            assert_eq!(a.health, a.max_health);
            assert!((0.8..2.0).contains(&a.support_delay));
        }
    }

    #[test]
    fn test_faction_and_rank_bonuses() {
        let mut rng = SimRng::new(2);
        let mut red = Agent::new(&SCOUT, colony(), Vec2::ZERO)
            .with_faction(FactionTag::Red)
            .with_rank(2);
        red.init(&mut rng);
        assert!(red.max_health >= SCOUT.max_health * 0.9 * 1.4 * 1.5 - 1e-9);
        assert_eq!(red.reload_rate, 1.6);
        assert!((red.health_regen - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_turrets_have_no_traits() {
        let mut rng = SimRng::new(3);
        for _ in 0..30 {
            let mut t = Agent::new(&GUNPOINT, colony(), Vec2::ZERO);
            t.init(&mut rng);
            assert!(t.traits.is_empty());
        }
    }

    #[test]
    fn test_recycle_trait_only_for_tier_one() {
        let mut rng = SimRng::new(4);
        for _ in 0..500 {
            assert!(!roll_traits(&mut rng, 2).contains(AgentTraits::LOW_HP_RECYCLE));
        }
    }

    #[test]
    fn test_clone_copies_rolled_stats() {
        let mut rng = SimRng::new(5);
        let mut a = Agent::new(&WORKER, colony(), Vec2::ZERO).with_faction(FactionTag::Blue);
        a.init(&mut rng);
        let mut c = a.make_clone(Vec2::new(4.0, 4.0));
        c.init(&mut rng);
        assert_eq!(c.clone_gen, 1);
        assert_eq!(c.max_health, a.max_health);
        assert_eq!(c.speed, a.speed);
        assert_eq!(c.traits, a.traits);
        assert_eq!(c.faction, FactionTag::Blue);
    }

    #[test]
    #[should_panic]
    fn test_elite_clone_panics() {
        let a = Agent::new(&WORKER, colony(), Vec2::ZERO).with_rank(1);
        let _ = a.make_clone(Vec2::ZERO);
    }

    #[test]
    fn test_movement_speed_modifiers() {
        let mut a = Agent::new(&SCOUT, colony(), Vec2::ZERO);
        a.speed = 100.0;
        assert_eq!(a.movement_speed(), 100.0);
        a.resting = true;
        assert_eq!(a.movement_speed(), 50.0);
        a.tether_time = 1.0;
        assert_eq!(a.movement_speed(), 100.0);
        a.mode = AgentMode::Takeoff;
        assert_eq!(a.movement_speed(), 30.0);
        a.mode = AgentMode::KamikazeAttack;
        assert_eq!(a.movement_speed(), 200.0);
    }

    #[test]
    fn test_yellow_payload_bonus() {
        let a = Agent::new(&WORKER, colony(), Vec2::ZERO).with_faction(FactionTag::Yellow);
        assert_eq!(a.max_payload(), WORKER.max_payload + 2);
    }
}
