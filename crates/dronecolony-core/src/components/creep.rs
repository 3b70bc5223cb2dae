//! Enemy units spawned by the wave generator.

use dronecolony_logic::creeps::{CreepKind, CreepStats, SUPER_DAMAGE_MULTIPLIER, SUPER_HEALTH_MULTIPLIER};
use dronecolony_logic::stats::{DamageValue, TargetKind};
use hecs::Entity;

use super::common::Vec2;

/// Seconds a stealth creep stays visible after it fires.
pub const STEALTH_REVEAL_TIME: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct Creep {
    pub id: Entity,
    pub stats: &'static CreepStats,
    pub pos: Vec2,
    pub waypoint: Vec2,
    pub health: f64,
    pub max_health: f64,
    pub super_elite: bool,
    pub attack_delay: f64,
    /// Remaining mark debuff; extends attack range against this creep.
    pub marked: f64,
    pub slow: f64,
    /// Time left visible for stealth kinds.
    pub revealed: f64,
    /// Frag-score value credited to the result on death.
    pub value: u32,
    pub disposed: bool,
}

impl Creep {
    pub fn new(stats: &'static CreepStats, pos: Vec2, super_elite: bool) -> Self {
        let max_health = if super_elite {
            stats.max_health * SUPER_HEALTH_MULTIPLIER
        } else {
            stats.max_health
        };
        Self {
            id: Entity::DANGLING,
            stats,
            pos,
            waypoint: Vec2::ZERO,
            health: max_health,
            max_health,
            super_elite,
            attack_delay: 0.0,
            marked: 0.0,
            slow: 0.0,
            revealed: 0.0,
            value: stats.frag_score,
            disposed: false,
        }
    }

    pub fn kind(&self) -> CreepKind {
        self.stats.kind
    }

    pub fn is_flying(&self) -> bool {
        self.stats.is_flying
    }

    pub fn target_kind(&self) -> TargetKind {
        self.stats.target_kind()
    }

    pub fn is_cloaked(&self) -> bool {
        self.stats.stealth && self.revealed <= 0.0
    }

    pub fn is_marked(&self) -> bool {
        self.marked > 0.0
    }

    pub fn movement_speed(&self) -> f64 {
        if self.slow > 0.0 {
            self.stats.speed * 0.55
        } else {
            self.stats.speed
        }
    }

    /// Damage of one shot, including the super multiplier.
    pub fn shot_damage(&self) -> Option<DamageValue> {
        let weapon = self.stats.weapon?;
        if self.super_elite {
            Some(weapon.damage.with_health_multiplier(SUPER_DAMAGE_MULTIPLIER))
        } else {
            Some(weapon.damage)
        }
    }

    /// Wanted by roombas: slow, heavy ground targets.
    pub fn is_roomba_prey(&self) -> bool {
        !self.is_flying()
            && (self.stats.boss || matches!(self.kind(), CreepKind::Howitzer | CreepKind::HeavyCrawler))
    }

    /// Apply a hit. Returns true if this hit killed the creep.
    pub fn apply_damage(&mut self, damage: &DamageValue) -> bool {
        if self.disposed {
            return false;
        }
        self.health -= damage.health;
        self.slow = (self.slow + damage.slow).min(5.0);
        self.marked = self.marked.max(damage.mark);
        if self.health < 0.0 {
            self.disposed = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dronecolony_logic::creeps::{CRAWLER, HOWITZER, STEALTH_CRAWLER};

    #[test]
    fn test_super_creep_has_more_health() {
        let normal = Creep::new(&CRAWLER, Vec2::ZERO, false);
        let elite = Creep::new(&CRAWLER, Vec2::ZERO, true);
        assert!(elite.max_health > normal.max_health);
        assert!(elite.shot_damage().unwrap().health > normal.shot_damage().unwrap().health);
    }

    #[test]
    fn test_stealth_reveal() {
        let mut c = Creep::new(&STEALTH_CRAWLER, Vec2::ZERO, false);
        assert!(c.is_cloaked());
        c.revealed = STEALTH_REVEAL_TIME;
        assert!(!c.is_cloaked());
    }

    #[test]
    fn test_damage_kills_once() {
        let mut c = Creep::new(&CRAWLER, Vec2::ZERO, false);
        assert!(!c.apply_damage(&DamageValue::health(10.0)));
        assert!(c.apply_damage(&DamageValue::health(100.0)));
        assert!(!c.apply_damage(&DamageValue::health(100.0)));
    }

    #[test]
    fn test_roomba_prey() {
        assert!(Creep::new(&HOWITZER, Vec2::ZERO, false).is_roomba_prey());
        assert!(!Creep::new(&CRAWLER, Vec2::ZERO, false).is_roomba_prey());
    }
}
