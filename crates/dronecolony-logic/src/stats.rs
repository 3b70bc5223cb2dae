//! Static per-kind attributes for colony agents and colony cores.
//!
//! Every agent holds a `&'static AgentStats` pointing into this table; the
//! runtime never mutates stats. Per-instance variation (health/speed rolls,
//! faction and rank bonuses) lives on the agent itself.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// What a weapon can hit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TargetKind: u8 {
        const GROUND = 1 << 0;
        const FLYING = 1 << 1;
    }
}

impl TargetKind {
    pub const fn from_flying(flying: bool) -> Self {
        if flying {
            TargetKind::FLYING
        } else {
            TargetKind::GROUND
        }
    }
}

/// One hit worth of effects.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DamageValue {
    pub health: f64,
    /// Drained from the victim's energy pool.
    pub energy: f64,
    /// Probability (0..1) that a flying victim abandons what it is doing.
    pub morale: f64,
    /// Seconds of slowdown added to the victim (capped at 5).
    pub slow: f64,
    /// Seconds of "marked" debuff, extends attack range against the victim.
    pub mark: f64,
}

impl DamageValue {
    pub const ZERO: Self = Self {
        health: 0.0,
        energy: 0.0,
        morale: 0.0,
        slow: 0.0,
        mark: 0.0,
    };

    pub const fn health(amount: f64) -> Self {
        Self {
            health: amount,
            energy: 0.0,
            morale: 0.0,
            slow: 0.0,
            mark: 0.0,
        }
    }

    /// Scale the health component only; side effects stay as they are.
    pub fn with_health_multiplier(self, multiplier: f64) -> Self {
        Self {
            health: self.health * multiplier,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    pub damage: DamageValue,
    pub reload: f64,
    pub attack_range: f64,
    pub max_targets: usize,
    pub burst_size: u32,
    pub attacks_per_burst: u32,
    pub burst_delay: f64,
    /// Zero means an instant-hit beam.
    pub projectile_speed: f64,
    pub target_flags: TargetKind,
    pub ground_damage_multiplier: f64,
    pub flying_damage_multiplier: f64,
    /// Multiplies the squared range when the target carries a mark.
    pub range_mark_multiplier: f64,
}

impl WeaponStats {
    pub fn attack_range_sqr(&self) -> f64 {
        self.attack_range * self.attack_range
    }

    pub fn is_beam(&self) -> bool {
        self.projectile_speed == 0.0
    }

    pub fn can_target(&self, kind: TargetKind) -> bool {
        self.target_flags.intersects(kind)
    }

    pub fn damage_multiplier(&self, target_flying: bool) -> f64 {
        if target_flying {
            self.flying_damage_multiplier
        } else {
            self.ground_damage_multiplier
        }
    }

    /// Damage adjusted for the victim's layer.
    pub fn damage_against(&self, target_flying: bool) -> DamageValue {
        self.damage
            .with_health_multiplier(self.damage_multiplier(target_flying))
    }
}

const fn weapon(
    damage: f64,
    reload: f64,
    attack_range: f64,
    projectile_speed: f64,
    target_flags: TargetKind,
) -> WeaponStats {
    WeaponStats {
        damage: DamageValue::health(damage),
        reload,
        attack_range,
        max_targets: 1,
        burst_size: 1,
        attacks_per_burst: 1,
        burst_delay: 0.0,
        projectile_speed,
        target_flags,
        ground_damage_multiplier: 1.0,
        flying_damage_multiplier: 1.0,
        range_mark_multiplier: 1.0,
    }
}

const ANY_TARGET: TargetKind = TargetKind::GROUND.union(TargetKind::FLYING);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Worker,
    Scout,
    Freighter,
    Redminer,
    Crippler,
    Fighter,
    Scavenger,
    Courier,
    Prism,
    Servo,
    Repeller,
    Disintegrator,
    Repair,
    Cloner,
    Recharger,
    Generator,
    Mortar,
    AntiAir,
    Defender,
    Kamikaze,
    Skirmisher,
    Scarab,
    Roomba,
    Guardian,
    Stormbringer,
    Destroyer,
    Marauder,
    Trucker,
    Devourer,
    Gunpoint,
    TetherBeacon,
    BeamTower,
}

impl AgentKind {
    pub const ALL: [AgentKind; 32] = [
        AgentKind::Worker,
        AgentKind::Scout,
        AgentKind::Freighter,
        AgentKind::Redminer,
        AgentKind::Crippler,
        AgentKind::Fighter,
        AgentKind::Scavenger,
        AgentKind::Courier,
        AgentKind::Prism,
        AgentKind::Servo,
        AgentKind::Repeller,
        AgentKind::Disintegrator,
        AgentKind::Repair,
        AgentKind::Cloner,
        AgentKind::Recharger,
        AgentKind::Generator,
        AgentKind::Mortar,
        AgentKind::AntiAir,
        AgentKind::Defender,
        AgentKind::Kamikaze,
        AgentKind::Skirmisher,
        AgentKind::Scarab,
        AgentKind::Roomba,
        AgentKind::Guardian,
        AgentKind::Stormbringer,
        AgentKind::Destroyer,
        AgentKind::Marauder,
        AgentKind::Trucker,
        AgentKind::Devourer,
        AgentKind::Gunpoint,
        AgentKind::TetherBeacon,
        AgentKind::BeamTower,
    ];

    pub fn stats(self) -> &'static AgentStats {
        agent_stats(self)
    }
}

/// Support sub-routine an agent runs on its own reload timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportKind {
    Recharge,
    Repair,
    Scavenge,
    Disintegrate,
    ConsumeDrone,
    Tether,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitSize {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentStats {
    pub kind: AgentKind,
    pub tier: u8,
    pub cost: f64,
    pub upkeep: u32,
    pub max_health: f64,
    pub speed: f64,
    pub size: UnitSize,
    pub max_payload: u32,
    pub energy_regen_bonus: f64,
    /// Health per second recovered while idle.
    pub self_repair: f64,
    pub can_gather: bool,
    pub can_patrol: bool,
    pub can_cloak: bool,
    pub is_flying: bool,
    pub is_turret: bool,
    pub support: Option<SupportKind>,
    pub support_reload: f64,
    pub support_range: f64,
    pub weapon: Option<WeaponStats>,
}

impl AgentStats {
    pub fn has_support(&self) -> bool {
        self.support.is_some()
    }

    pub fn support_range_sqr(&self) -> f64 {
        self.support_range * self.support_range
    }

    pub fn can_attack(&self, kind: TargetKind) -> bool {
        self.weapon.map_or(false, |w| w.can_target(kind))
    }

    pub fn target_kind(&self) -> TargetKind {
        TargetKind::from_flying(self.is_flying)
    }
}

const BASE_DRONE: AgentStats = AgentStats {
    kind: AgentKind::Worker,
    tier: 1,
    cost: 0.0,
    upkeep: 0,
    max_health: 10.0,
    speed: 80.0,
    size: UnitSize::Small,
    max_payload: 0,
    energy_regen_bonus: 0.0,
    self_repair: 0.0,
    can_gather: false,
    can_patrol: false,
    can_cloak: false,
    is_flying: true,
    is_turret: false,
    support: None,
    support_reload: 0.0,
    support_range: 0.0,
    weapon: None,
};

const BASE_TURRET: AgentStats = AgentStats {
    tier: 2,
    speed: 0.0,
    size: UnitSize::Medium,
    is_flying: false,
    is_turret: true,
    ..BASE_DRONE
};

pub static WORKER: AgentStats = AgentStats {
    kind: AgentKind::Worker,
    cost: 8.0,
    upkeep: 2,
    max_health: 12.0,
    speed: 80.0,
    max_payload: 1,
    can_gather: true,
    ..BASE_DRONE
};

pub static SCOUT: AgentStats = AgentStats {
    kind: AgentKind::Scout,
    cost: 12.0,
    upkeep: 3,
    max_health: 15.0,
    speed: 100.0,
    can_patrol: true,
    weapon: Some(weapon(2.0, 1.8, 150.0, 320.0, ANY_TARGET)),
    ..BASE_DRONE
};

pub static FREIGHTER: AgentStats = AgentStats {
    kind: AgentKind::Freighter,
    tier: 2,
    cost: 20.0,
    upkeep: 5,
    max_health: 30.0,
    speed: 70.0,
    size: UnitSize::Medium,
    max_payload: 3,
    can_gather: true,
    ..BASE_DRONE
};

pub static REDMINER: AgentStats = AgentStats {
    kind: AgentKind::Redminer,
    tier: 2,
    cost: 22.0,
    upkeep: 6,
    max_health: 24.0,
    speed: 70.0,
    size: UnitSize::Medium,
    max_payload: 1,
    can_gather: true,
    ..BASE_DRONE
};

pub static CRIPPLER: AgentStats = AgentStats {
    kind: AgentKind::Crippler,
    tier: 2,
    cost: 22.0,
    upkeep: 5,
    max_health: 18.0,
    speed: 90.0,
    can_patrol: true,
    weapon: Some(WeaponStats {
        damage: DamageValue {
            health: 1.0,
            slow: 2.0,
            mark: 3.0,
            ..DamageValue::ZERO
        },
        max_targets: 3,
        ..weapon(1.0, 2.0, 230.0, 250.0, TargetKind::GROUND)
    }),
    ..BASE_DRONE
};

pub static FIGHTER: AgentStats = AgentStats {
    kind: AgentKind::Fighter,
    tier: 2,
    cost: 26.0,
    upkeep: 6,
    max_health: 28.0,
    speed: 90.0,
    size: UnitSize::Medium,
    can_patrol: true,
    weapon: Some(WeaponStats {
        burst_size: 2,
        burst_delay: 0.1,
        ..weapon(4.0, 1.6, 170.0, 350.0, ANY_TARGET)
    }),
    ..BASE_DRONE
};

pub static SCAVENGER: AgentStats = AgentStats {
    kind: AgentKind::Scavenger,
    tier: 2,
    cost: 18.0,
    upkeep: 4,
    max_health: 22.0,
    speed: 90.0,
    max_payload: 2,
    can_gather: true,
    support: Some(SupportKind::Scavenge),
    support_reload: 8.0,
    support_range: 256.0,
    ..BASE_DRONE
};

pub static COURIER: AgentStats = AgentStats {
    kind: AgentKind::Courier,
    tier: 2,
    cost: 18.0,
    upkeep: 3,
    max_health: 25.0,
    speed: 100.0,
    max_payload: 3,
    can_gather: true,
    ..BASE_DRONE
};

pub static PRISM: AgentStats = AgentStats {
    kind: AgentKind::Prism,
    tier: 2,
    cost: 28.0,
    upkeep: 7,
    max_health: 30.0,
    speed: 65.0,
    size: UnitSize::Medium,
    can_patrol: true,
    weapon: Some(weapon(3.0, 2.5, 200.0, 0.0, ANY_TARGET)),
    ..BASE_DRONE
};

pub static SERVO: AgentStats = AgentStats {
    kind: AgentKind::Servo,
    tier: 2,
    cost: 18.0,
    upkeep: 5,
    max_health: 22.0,
    speed: 110.0,
    ..BASE_DRONE
};

pub static REPELLER: AgentStats = AgentStats {
    kind: AgentKind::Repeller,
    tier: 2,
    cost: 22.0,
    upkeep: 5,
    max_health: 24.0,
    speed: 90.0,
    can_patrol: true,
    weapon: Some(WeaponStats {
        damage: DamageValue {
            health: 1.0,
            energy: 10.0,
            ..DamageValue::ZERO
        },
        max_targets: 2,
        ..weapon(1.0, 1.5, 160.0, 300.0, ANY_TARGET)
    }),
    ..BASE_DRONE
};

pub static DISINTEGRATOR: AgentStats = AgentStats {
    kind: AgentKind::Disintegrator,
    tier: 2,
    cost: 30.0,
    upkeep: 6,
    max_health: 20.0,
    speed: 90.0,
    can_patrol: true,
    support: Some(SupportKind::Disintegrate),
    support_reload: 9.0,
    weapon: Some(weapon(18.0, 9.0, 220.0, 380.0, ANY_TARGET)),
    ..BASE_DRONE
};

pub static REPAIR: AgentStats = AgentStats {
    kind: AgentKind::Repair,
    tier: 2,
    cost: 20.0,
    upkeep: 4,
    max_health: 22.0,
    speed: 90.0,
    support: Some(SupportKind::Repair),
    support_reload: 4.0,
    support_range: 200.0,
    ..BASE_DRONE
};

pub static CLONER: AgentStats = AgentStats {
    kind: AgentKind::Cloner,
    tier: 2,
    cost: 22.0,
    upkeep: 4,
    max_health: 18.0,
    speed: 90.0,
    ..BASE_DRONE
};

pub static RECHARGER: AgentStats = AgentStats {
    kind: AgentKind::Recharger,
    tier: 2,
    cost: 20.0,
    upkeep: 4,
    max_health: 18.0,
    speed: 90.0,
    support: Some(SupportKind::Recharge),
    support_reload: 5.0,
    support_range: 220.0,
    ..BASE_DRONE
};

pub static GENERATOR: AgentStats = AgentStats {
    kind: AgentKind::Generator,
    tier: 2,
    cost: 20.0,
    upkeep: 0,
    max_health: 22.0,
    speed: 75.0,
    energy_regen_bonus: 0.4,
    ..BASE_DRONE
};

pub static MORTAR: AgentStats = AgentStats {
    kind: AgentKind::Mortar,
    tier: 2,
    cost: 26.0,
    upkeep: 6,
    max_health: 22.0,
    speed: 70.0,
    size: UnitSize::Medium,
    can_patrol: true,
    weapon: Some(WeaponStats {
        ground_damage_multiplier: 1.5,
        ..weapon(6.0, 3.2, 320.0, 180.0, TargetKind::GROUND)
    }),
    ..BASE_DRONE
};

pub static ANTI_AIR: AgentStats = AgentStats {
    kind: AgentKind::AntiAir,
    tier: 2,
    cost: 26.0,
    upkeep: 6,
    max_health: 24.0,
    speed: 85.0,
    can_patrol: true,
    weapon: Some(WeaponStats {
        burst_size: 2,
        attacks_per_burst: 2,
        max_targets: 2,
        ..weapon(3.0, 1.7, 260.0, 420.0, TargetKind::FLYING)
    }),
    ..BASE_DRONE
};

pub static DEFENDER: AgentStats = AgentStats {
    kind: AgentKind::Defender,
    tier: 2,
    cost: 28.0,
    upkeep: 6,
    max_health: 36.0,
    speed: 80.0,
    size: UnitSize::Medium,
    can_patrol: true,
    self_repair: 0.2,
    weapon: Some(weapon(2.0, 0.9, 150.0, 300.0, ANY_TARGET)),
    ..BASE_DRONE
};

pub static KAMIKAZE: AgentStats = AgentStats {
    kind: AgentKind::Kamikaze,
    tier: 2,
    cost: 18.0,
    upkeep: 3,
    max_health: 20.0,
    speed: 100.0,
    can_patrol: true,
    ..BASE_DRONE
};

pub static SKIRMISHER: AgentStats = AgentStats {
    kind: AgentKind::Skirmisher,
    tier: 2,
    cost: 24.0,
    upkeep: 5,
    max_health: 22.0,
    speed: 110.0,
    can_patrol: true,
    weapon: Some(WeaponStats {
        burst_size: 3,
        burst_delay: 0.08,
        ..weapon(1.5, 1.4, 160.0, 380.0, ANY_TARGET)
    }),
    ..BASE_DRONE
};

pub static SCARAB: AgentStats = AgentStats {
    kind: AgentKind::Scarab,
    tier: 2,
    cost: 26.0,
    upkeep: 5,
    max_health: 26.0,
    speed: 85.0,
    can_patrol: true,
    can_cloak: true,
    weapon: Some(weapon(3.0, 1.5, 180.0, 300.0, TargetKind::GROUND)),
    ..BASE_DRONE
};

pub static ROOMBA: AgentStats = AgentStats {
    kind: AgentKind::Roomba,
    tier: 2,
    cost: 30.0,
    upkeep: 6,
    max_health: 60.0,
    speed: 40.0,
    size: UnitSize::Medium,
    is_flying: false,
    weapon: Some(weapon(6.0, 2.4, 200.0, 260.0, TargetKind::GROUND)),
    ..BASE_DRONE
};

pub static GUARDIAN: AgentStats = AgentStats {
    kind: AgentKind::Guardian,
    tier: 3,
    cost: 50.0,
    upkeep: 10,
    max_health: 70.0,
    speed: 70.0,
    size: UnitSize::Large,
    can_patrol: true,
    self_repair: 0.5,
    weapon: Some(WeaponStats {
        burst_size: 3,
        attacks_per_burst: 3,
        max_targets: 2,
        ..weapon(5.0, 2.0, 200.0, 350.0, ANY_TARGET)
    }),
    ..BASE_DRONE
};

pub static STORMBRINGER: AgentStats = AgentStats {
    kind: AgentKind::Stormbringer,
    tier: 3,
    cost: 45.0,
    upkeep: 0,
    max_health: 40.0,
    speed: 80.0,
    size: UnitSize::Large,
    energy_regen_bonus: 0.6,
    ..BASE_DRONE
};

pub static DESTROYER: AgentStats = AgentStats {
    kind: AgentKind::Destroyer,
    tier: 3,
    cost: 60.0,
    upkeep: 12,
    max_health: 80.0,
    speed: 60.0,
    size: UnitSize::Large,
    can_patrol: true,
    weapon: Some(weapon(9.0, 2.2, 210.0, 0.0, ANY_TARGET)),
    ..BASE_DRONE
};

pub static MARAUDER: AgentStats = AgentStats {
    kind: AgentKind::Marauder,
    tier: 3,
    cost: 45.0,
    upkeep: 8,
    max_health: 45.0,
    speed: 95.0,
    size: UnitSize::Medium,
    max_payload: 3,
    can_gather: true,
    can_cloak: true,
    support: Some(SupportKind::Scavenge),
    support_reload: 7.0,
    support_range: 300.0,
    weapon: Some(WeaponStats {
        burst_size: 2,
        burst_delay: 0.1,
        ..weapon(4.0, 1.8, 180.0, 340.0, TargetKind::GROUND)
    }),
    ..BASE_DRONE
};

pub static TRUCKER: AgentStats = AgentStats {
    kind: AgentKind::Trucker,
    tier: 3,
    cost: 40.0,
    upkeep: 7,
    max_health: 60.0,
    speed: 75.0,
    size: UnitSize::Large,
    max_payload: 6,
    can_gather: true,
    ..BASE_DRONE
};

pub static DEVOURER: AgentStats = AgentStats {
    kind: AgentKind::Devourer,
    tier: 3,
    cost: 50.0,
    upkeep: 9,
    max_health: 50.0,
    speed: 70.0,
    size: UnitSize::Large,
    can_patrol: true,
    support: Some(SupportKind::ConsumeDrone),
    support_reload: 6.0,
    weapon: Some(WeaponStats {
        attacks_per_burst: 2,
        burst_delay: 0.12,
        ..weapon(3.0, 1.8, 180.0, 300.0, ANY_TARGET)
    }),
    ..BASE_DRONE
};

pub static GUNPOINT: AgentStats = AgentStats {
    kind: AgentKind::Gunpoint,
    cost: 40.0,
    upkeep: 4,
    max_health: 100.0,
    weapon: Some(WeaponStats {
        burst_size: 3,
        burst_delay: 0.1,
        ..weapon(4.0, 2.5, 200.0, 320.0, TargetKind::GROUND)
    }),
    ..BASE_TURRET
};

pub static TETHER_BEACON: AgentStats = AgentStats {
    kind: AgentKind::TetherBeacon,
    cost: 35.0,
    upkeep: 3,
    max_health: 80.0,
    support: Some(SupportKind::Tether),
    support_reload: 10.0,
    support_range: 280.0,
    ..BASE_TURRET
};

pub static BEAM_TOWER: AgentStats = AgentStats {
    kind: AgentKind::BeamTower,
    cost: 55.0,
    upkeep: 6,
    max_health: 120.0,
    size: UnitSize::Large,
    weapon: Some(weapon(12.0, 3.5, 350.0, 0.0, ANY_TARGET)),
    ..BASE_TURRET
};

pub fn agent_stats(kind: AgentKind) -> &'static AgentStats {
    match kind {
        AgentKind::Worker => &WORKER,
        AgentKind::Scout => &SCOUT,
        AgentKind::Freighter => &FREIGHTER,
        AgentKind::Redminer => &REDMINER,
        AgentKind::Crippler => &CRIPPLER,
        AgentKind::Fighter => &FIGHTER,
        AgentKind::Scavenger => &SCAVENGER,
        AgentKind::Courier => &COURIER,
        AgentKind::Prism => &PRISM,
        AgentKind::Servo => &SERVO,
        AgentKind::Repeller => &REPELLER,
        AgentKind::Disintegrator => &DISINTEGRATOR,
        AgentKind::Repair => &REPAIR,
        AgentKind::Cloner => &CLONER,
        AgentKind::Recharger => &RECHARGER,
        AgentKind::Generator => &GENERATOR,
        AgentKind::Mortar => &MORTAR,
        AgentKind::AntiAir => &ANTI_AIR,
        AgentKind::Defender => &DEFENDER,
        AgentKind::Kamikaze => &KAMIKAZE,
        AgentKind::Skirmisher => &SKIRMISHER,
        AgentKind::Scarab => &SCARAB,
        AgentKind::Roomba => &ROOMBA,
        AgentKind::Guardian => &GUARDIAN,
        AgentKind::Stormbringer => &STORMBRINGER,
        AgentKind::Destroyer => &DESTROYER,
        AgentKind::Marauder => &MARAUDER,
        AgentKind::Trucker => &TRUCKER,
        AgentKind::Devourer => &DEVOURER,
        AgentKind::Gunpoint => &GUNPOINT,
        AgentKind::TetherBeacon => &TETHER_BEACON,
        AgentKind::BeamTower => &BEAM_TOWER,
    }
}

/// Devourer power level cap (each level adds one projectile per burst).
pub const DEVOURER_MAX_LEVEL: u32 = 10;

/// Colony core design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoreKind {
    /// Lands between relocations.
    Den,
    /// Hovers permanently and relocates without takeoff/landing.
    Ark,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoreStats {
    pub kind: CoreKind,
    pub max_health: f64,
    pub speed: f64,
    pub max_speed: f64,
    pub drone_limit: usize,
    pub resources_limit: f64,
    pub flight_height: f64,
}

pub static DEN_CORE: CoreStats = CoreStats {
    kind: CoreKind::Den,
    max_health: 260.0,
    speed: 15.0,
    max_speed: 40.0,
    drone_limit: 140,
    resources_limit: 500.0,
    flight_height: 50.0,
};

pub static ARK_CORE: CoreStats = CoreStats {
    kind: CoreKind::Ark,
    max_health: 200.0,
    speed: 20.0,
    max_speed: 45.0,
    drone_limit: 100,
    resources_limit: 400.0,
    flight_height: 50.0,
};

pub fn core_stats(kind: CoreKind) -> &'static CoreStats {
    match kind {
        CoreKind::Den => &DEN_CORE,
        CoreKind::Ark => &ARK_CORE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup_matches_kind() {
        for kind in AgentKind::ALL {
            assert_eq!(agent_stats(kind).kind, kind);
        }
    }

    #[test]
    fn test_turrets_never_fly_or_patrol() {
        for kind in AgentKind::ALL {
            let stats = agent_stats(kind);
            if stats.is_turret {
                assert!(!stats.is_flying, "{:?}", kind);
                assert!(!stats.can_patrol, "{:?}", kind);
                assert_ne!(stats.tier, 1, "{:?}", kind);
            }
        }
    }

    #[test]
    fn test_support_units_have_reload() {
        for kind in AgentKind::ALL {
            let stats = agent_stats(kind);
            if stats.has_support() {
                assert!(stats.support_reload > 0.0, "{:?}", kind);
            }
        }
    }

    #[test]
    fn test_weapon_target_flags() {
        let mortar = MORTAR.weapon.unwrap();
        assert!(mortar.can_target(TargetKind::GROUND));
        assert!(!mortar.can_target(TargetKind::FLYING));
        assert!(SCOUT.can_attack(TargetKind::FLYING));
        assert!(!WORKER.can_attack(TargetKind::GROUND));
    }

    #[test]
    fn test_damage_multiplier_keeps_side_effects() {
        let w = CRIPPLER.weapon.unwrap();
        let d = w.damage.with_health_multiplier(2.0);
        assert!((d.health - 2.0).abs() < 1e-9);
        assert!((d.slow - 2.0).abs() < 1e-9);
    }
}
