//! Static map objects: essence sources, construction sites, neutral
//! buildings and teleporters.

use dronecolony_logic::resources::{SourceKind, SourceStats};
use dronecolony_logic::stats::{agent_stats, AgentKind};
use serde::{Deserialize, Serialize};

use super::colony::ColonyId;
use super::common::Vec2;

#[derive(Debug, Clone)]
pub struct EssenceSource {
    pub kind: SourceKind,
    pub pos: Vec2,
    /// Units left; the source is removed once it reaches zero.
    pub resource: u32,
    pub disposed: bool,
}

impl EssenceSource {
    pub fn new(kind: SourceKind, pos: Vec2, resource: u32) -> Self {
        Self {
            kind,
            pos,
            resource,
            disposed: false,
        }
    }

    pub fn stats(&self) -> SourceStats {
        self.kind.stats()
    }

    /// Take up to `n` units. Returns how many were taken.
    pub fn harvest(&mut self, n: u32) -> u32 {
        let taken = n.min(self.resource);
        self.resource -= taken;
        if self.resource == 0 {
            self.disposed = true;
        }
        taken
    }
}

/// Unfinished turret site. Workers in BuildBuilding push `progress`
/// towards 1, at which point the owning colony accepts a new turret.
#[derive(Debug, Clone)]
pub struct Construction {
    pub kind: AgentKind,
    pub colony: ColonyId,
    pub pos: Vec2,
    pub progress: f64,
    /// Builders currently assigned.
    pub attention: u32,
    pub build_time: f64,
    pub disposed: bool,
}

impl Construction {
    pub fn new(kind: AgentKind, colony: ColonyId, pos: Vec2) -> Self {
        Self {
            kind,
            colony,
            pos,
            progress: 0.0,
            attention: 0,
            build_time: agent_stats(kind).cost * 0.5,
            disposed: false,
        }
    }

    /// Add `amount` seconds of work. True once the site is complete.
    pub fn construct(&mut self, amount: f64) -> bool {
        if self.disposed {
            return true;
        }
        self.progress = (self.progress + amount / self.build_time).min(1.0);
        self.progress >= 1.0
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingKind {
    /// Converted into evolution points by its owner.
    EvoPillar,
}

#[derive(Debug, Clone)]
pub struct NeutralBuilding {
    pub kind: BuildingKind,
    pub pos: Vec2,
    pub owner: Option<ColonyId>,
    pub capture_progress: f64,
    /// Time until the owner may convert again.
    pub cooldown: f64,
}

pub const BUILDING_CAPTURE_TIME: f64 = 6.0;
pub const BUILDING_CONVERT_COOLDOWN: f64 = 12.0;
pub const BUILDING_EVO_POINTS: f64 = 2.0;

impl NeutralBuilding {
    pub fn new(kind: BuildingKind, pos: Vec2) -> Self {
        Self {
            kind,
            pos,
            owner: None,
            capture_progress: 0.0,
            cooldown: 0.0,
        }
    }

    /// Work on capturing for `colony`. True once owned by it.
    pub fn capture(&mut self, colony: ColonyId, amount: f64) -> bool {
        if self.owner == Some(colony) {
            return true;
        }
        self.capture_progress += amount / BUILDING_CAPTURE_TIME;
        if self.capture_progress >= 1.0 {
            self.owner = Some(colony);
            self.capture_progress = 0.0;
            self.cooldown = BUILDING_CONVERT_COOLDOWN;
            return true;
        }
        false
    }

    pub fn can_convert(&self, colony: ColonyId) -> bool {
        self.owner == Some(colony) && self.cooldown <= 0.0
    }
}

#[derive(Debug, Clone)]
pub struct Teleporter {
    pub pos: Vec2,
    /// Index of the paired teleporter in the world list.
    pub other: usize,
    pub cooldown: f64,
}

pub const TELEPORTER_COOLDOWN: f64 = 20.0;

impl Teleporter {
    pub fn can_be_used(&self) -> bool {
        self.cooldown <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harvest_empties_source() {
        let mut s = EssenceSource::new(SourceKind::Iron, Vec2::ZERO, 3);
        assert_eq!(s.harvest(2), 2);
        assert!(!s.disposed);
        assert_eq!(s.harvest(2), 1);
        assert!(s.disposed);
        assert_eq!(s.harvest(2), 0);
    }

    #[test]
    fn test_construction_completes() {
        let mut c = Construction::new(AgentKind::Gunpoint, ColonyId(0), Vec2::ZERO);
        assert!((c.build_time - 20.0).abs() < 1e-9);
        assert!(!c.construct(10.0));
        assert!(c.construct(10.0));
        assert!(c.is_complete());
    }

    #[test]
    fn test_capture_takes_time() {
        let mut b = NeutralBuilding::new(BuildingKind::EvoPillar, Vec2::ZERO);
        assert!(!b.capture(ColonyId(1), 3.0));
        assert!(b.capture(ColonyId(1), 3.0));
        assert_eq!(b.owner, Some(ColonyId(1)));
        assert!(!b.can_convert(ColonyId(1)));
        assert!(!b.can_convert(ColonyId(0)));
    }
}
