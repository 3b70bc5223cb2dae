//! Faction tags. A drone's faction is picked from its colony's faction
//! weights when it is produced and grants a one-time stat bonus.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FactionTag {
    #[default]
    Neutral,
    Yellow,
    Red,
    Green,
    Blue,
}

impl FactionTag {
    pub const ALL: [FactionTag; 5] = [
        FactionTag::Neutral,
        FactionTag::Yellow,
        FactionTag::Red,
        FactionTag::Green,
        FactionTag::Blue,
    ];

    /// Build and repair work multiplier.
    pub fn work_multiplier(self) -> f64 {
        match self {
            FactionTag::Green => 1.5,
            _ => 1.0,
        }
    }

    /// Extra units a gatherer can carry per trip.
    pub fn payload_bonus(self) -> u32 {
        match self {
            FactionTag::Yellow => 2,
            _ => 0,
        }
    }

    /// Evolution points contributed per tier-2 drone.
    pub fn evo_yield(self) -> f64 {
        match self {
            FactionTag::Blue => 0.05,
            _ => 0.04,
        }
    }
}

/// Multipliers and flat bonuses applied to a freshly rolled drone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactionBonus {
    pub max_health: f64,
    pub speed: f64,
    pub max_energy: f64,
    pub energy_regen: f64,
}

pub fn faction_bonus(tag: FactionTag) -> FactionBonus {
    let none = FactionBonus {
        max_health: 1.0,
        speed: 1.0,
        max_energy: 1.0,
        energy_regen: 0.0,
    };
    match tag {
        FactionTag::Neutral => none,
        FactionTag::Red => FactionBonus {
            max_health: 1.4,
            ..none
        },
        FactionTag::Green => FactionBonus { speed: 1.25, ..none },
        FactionTag::Blue => FactionBonus {
            max_energy: 1.8,
            energy_regen: 0.2,
            ..none
        },
        FactionTag::Yellow => FactionBonus {
            energy_regen: 0.5,
            ..none
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_has_no_bonus() {
        let b = faction_bonus(FactionTag::Neutral);
        assert_eq!(b.max_health, 1.0);
        assert_eq!(b.speed, 1.0);
        assert_eq!(b.max_energy, 1.0);
        assert_eq!(b.energy_regen, 0.0);
    }

    #[test]
    fn test_blue_bonus() {
        let b = faction_bonus(FactionTag::Blue);
        assert!((b.max_energy - 1.8).abs() < 1e-9);
        assert!((FactionTag::Blue.evo_yield() - 0.05).abs() < 1e-9);
    }
}
