//! Enemy (creep) kinds and their static attributes.
//!
//! The wave generator prices every unit by its frag score; a "super" creep
//! costs `frag_score * super_cost_multiplier`.

use serde::{Deserialize, Serialize};

use crate::stats::{DamageValue, TargetKind, WeaponStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreepKind {
    Crawler,
    EliteCrawler,
    StealthCrawler,
    HeavyCrawler,
    Wanderer,
    Stunner,
    Assault,
    Builder,
    Templar,
    Servant,
    Dominator,
    Howitzer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreepStats {
    pub kind: CreepKind,
    pub max_health: f64,
    pub speed: f64,
    pub is_flying: bool,
    /// Stays cloaked while it has not attacked recently.
    pub stealth: bool,
    pub boss: bool,
    pub frag_score: u32,
    pub weapon: Option<WeaponStats>,
}

impl CreepStats {
    pub fn target_kind(&self) -> TargetKind {
        TargetKind::from_flying(self.is_flying)
    }

    pub fn is_crawler(&self) -> bool {
        matches!(
            self.kind,
            CreepKind::Crawler
                | CreepKind::EliteCrawler
                | CreepKind::StealthCrawler
                | CreepKind::HeavyCrawler
        )
    }
}

const fn creep_weapon(
    damage: DamageValue,
    reload: f64,
    attack_range: f64,
    target_flags: TargetKind,
) -> WeaponStats {
    WeaponStats {
        damage,
        reload,
        attack_range,
        max_targets: 1,
        burst_size: 1,
        attacks_per_burst: 1,
        burst_delay: 0.0,
        projectile_speed: 0.0,
        target_flags,
        ground_damage_multiplier: 1.0,
        flying_damage_multiplier: 1.0,
        range_mark_multiplier: 1.0,
    }
}

const ANY_TARGET: TargetKind = TargetKind::GROUND.union(TargetKind::FLYING);

const GROUND_CREEP: CreepStats = CreepStats {
    kind: CreepKind::Crawler,
    max_health: 18.0,
    speed: 40.0,
    is_flying: false,
    stealth: false,
    boss: false,
    frag_score: 3,
    weapon: Some(creep_weapon(DamageValue::health(2.0), 1.5, 100.0, ANY_TARGET)),
};

const FLYING_CREEP: CreepStats = CreepStats {
    kind: CreepKind::Wanderer,
    max_health: 15.0,
    speed: 50.0,
    is_flying: true,
    stealth: false,
    boss: false,
    frag_score: 4,
    weapon: Some(creep_weapon(DamageValue::health(2.0), 1.8, 140.0, ANY_TARGET)),
};

pub static CRAWLER: CreepStats = GROUND_CREEP;

pub static ELITE_CRAWLER: CreepStats = CreepStats {
    kind: CreepKind::EliteCrawler,
    max_health: 28.0,
    frag_score: 6,
    weapon: Some(creep_weapon(DamageValue::health(3.0), 1.3, 130.0, ANY_TARGET)),
    ..GROUND_CREEP
};

pub static STEALTH_CRAWLER: CreepStats = CreepStats {
    kind: CreepKind::StealthCrawler,
    max_health: 24.0,
    stealth: true,
    frag_score: 7,
    weapon: Some(creep_weapon(DamageValue::health(4.0), 1.6, 110.0, ANY_TARGET)),
    ..GROUND_CREEP
};

pub static HEAVY_CRAWLER: CreepStats = CreepStats {
    kind: CreepKind::HeavyCrawler,
    max_health: 70.0,
    speed: 30.0,
    frag_score: 14,
    weapon: Some(creep_weapon(DamageValue::health(6.0), 2.4, 180.0, TargetKind::GROUND)),
    ..GROUND_CREEP
};

pub static WANDERER: CreepStats = FLYING_CREEP;

pub static STUNNER: CreepStats = CreepStats {
    kind: CreepKind::Stunner,
    max_health: 22.0,
    frag_score: 7,
    weapon: Some(creep_weapon(
        DamageValue {
            health: 1.0,
            energy: 20.0,
            morale: 0.0,
            slow: 1.0,
            mark: 0.0,
        },
        2.0,
        150.0,
        TargetKind::FLYING,
    )),
    ..FLYING_CREEP
};

pub static ASSAULT: CreepStats = CreepStats {
    kind: CreepKind::Assault,
    max_health: 60.0,
    speed: 40.0,
    frag_score: 16,
    weapon: Some(creep_weapon(DamageValue::health(4.0), 1.2, 160.0, ANY_TARGET)),
    ..FLYING_CREEP
};

pub static BUILDER: CreepStats = CreepStats {
    kind: CreepKind::Builder,
    max_health: 90.0,
    speed: 25.0,
    frag_score: 18,
    weapon: None,
    ..FLYING_CREEP
};

pub static TEMPLAR: CreepStats = CreepStats {
    kind: CreepKind::Templar,
    max_health: 80.0,
    speed: 35.0,
    frag_score: 20,
    weapon: Some(creep_weapon(
        DamageValue {
            health: 5.0,
            energy: 0.0,
            morale: 0.25,
            slow: 0.0,
            mark: 0.0,
        },
        2.2,
        190.0,
        ANY_TARGET,
    )),
    ..FLYING_CREEP
};

pub static SERVANT: CreepStats = CreepStats {
    kind: CreepKind::Servant,
    max_health: 100.0,
    speed: 45.0,
    frag_score: 24,
    weapon: Some(creep_weapon(DamageValue::health(6.0), 1.8, 220.0, ANY_TARGET)),
    ..FLYING_CREEP
};

const BOSS_CREEP: CreepStats = CreepStats {
    kind: CreepKind::Dominator,
    max_health: 400.0,
    speed: 25.0,
    is_flying: true,
    stealth: false,
    boss: true,
    frag_score: 60,
    weapon: Some(creep_weapon(
        DamageValue {
            health: 12.0,
            energy: 10.0,
            morale: 0.4,
            slow: 0.0,
            mark: 0.0,
        },
        2.5,
        260.0,
        ANY_TARGET,
    )),
};

pub static DOMINATOR: CreepStats = BOSS_CREEP;

pub static HOWITZER: CreepStats = CreepStats {
    kind: CreepKind::Howitzer,
    max_health: 350.0,
    speed: 15.0,
    is_flying: false,
    frag_score: 50,
    weapon: Some(creep_weapon(DamageValue::health(20.0), 4.0, 400.0, TargetKind::GROUND)),
    ..BOSS_CREEP
};

pub fn creep_stats(kind: CreepKind) -> &'static CreepStats {
    match kind {
        CreepKind::Crawler => &CRAWLER,
        CreepKind::EliteCrawler => &ELITE_CRAWLER,
        CreepKind::StealthCrawler => &STEALTH_CRAWLER,
        CreepKind::HeavyCrawler => &HEAVY_CRAWLER,
        CreepKind::Wanderer => &WANDERER,
        CreepKind::Stunner => &STUNNER,
        CreepKind::Assault => &ASSAULT,
        CreepKind::Builder => &BUILDER,
        CreepKind::Templar => &TEMPLAR,
        CreepKind::Servant => &SERVANT,
        CreepKind::Dominator => &DOMINATOR,
        CreepKind::Howitzer => &HOWITZER,
    }
}

/// Wave-budget price of one normal unit.
pub fn frag_score(stats: &CreepStats) -> u32 {
    stats.frag_score
}

/// Price multiplier for the elite ("super") variant. Wave budgets are whole
/// numbers, so the multiplier is too.
pub fn super_cost_multiplier(stats: &CreepStats) -> u32 {
    if stats.boss {
        3
    } else {
        2
    }
}

/// Stat multipliers applied to super creeps when spawned.
pub const SUPER_HEALTH_MULTIPLIER: f64 = 2.0;
pub const SUPER_DAMAGE_MULTIPLIER: f64 = 1.5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_heads_are_cheapest() {
        // The wave generator bails out as soon as the first pool entry is unaffordable.
        assert!(frag_score(&CRAWLER) <= frag_score(&ELITE_CRAWLER));
        assert!(frag_score(&CRAWLER) <= frag_score(&HEAVY_CRAWLER));
        assert!(frag_score(&WANDERER) <= frag_score(&STUNNER));
        assert!(frag_score(&WANDERER) <= frag_score(&TEMPLAR));
    }

    #[test]
    fn test_super_multiplier() {
        assert_eq!(super_cost_multiplier(&CRAWLER), 2);
        assert_eq!(super_cost_multiplier(&DOMINATOR), 3);
    }

    #[test]
    fn test_crawler_family() {
        assert!(HEAVY_CRAWLER.is_crawler());
        assert!(!WANDERER.is_crawler());
        assert!(!HOWITZER.is_flying);
    }
}
