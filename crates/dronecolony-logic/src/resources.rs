//! Resource source kinds that gatherers harvest.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Organic,
    Iron,
    Gold,
    Crystal,
    Oil,
    RedOil,
    RedCrystal,
    Scrap,
    SmallScrap,
    CreepScrap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceStats {
    pub kind: SourceKind,
    /// Colony resources per harvested unit.
    pub value: f64,
    /// Elite resources per harvested unit.
    pub elite_value: f64,
    pub min_capacity: u32,
    pub max_capacity: u32,
}

impl SourceKind {
    pub fn stats(self) -> SourceStats {
        let (value, elite_value, min_capacity, max_capacity) = match self {
            SourceKind::Organic => (1.0, 0.0, 10, 20),
            SourceKind::Iron => (1.4, 0.0, 40, 80),
            SourceKind::Gold => (2.5, 0.0, 30, 60),
            SourceKind::Crystal => (4.0, 0.0, 15, 25),
            SourceKind::Oil => (2.0, 0.0, 60, 100),
            SourceKind::RedOil => (1.5, 0.2, 50, 80),
            SourceKind::RedCrystal => (2.0, 0.25, 10, 20),
            SourceKind::Scrap => (4.0, 0.0, 8, 14),
            SourceKind::SmallScrap => (2.5, 0.0, 4, 8),
            SourceKind::CreepScrap => (3.0, 0.0, 6, 10),
        };
        SourceStats {
            kind: self,
            value,
            elite_value,
            min_capacity,
            max_capacity,
        }
    }

    /// Scrap is left behind by destroyed units and picked up by scavengers.
    pub fn is_scrap(self) -> bool {
        matches!(
            self,
            SourceKind::Scrap | SourceKind::SmallScrap | SourceKind::CreepScrap
        )
    }

    /// Only red miners can extract it.
    pub fn requires_redminer(self) -> bool {
        self == SourceKind::RedOil
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_ranges_are_ordered() {
        for kind in [
            SourceKind::Organic,
            SourceKind::Iron,
            SourceKind::Gold,
            SourceKind::Crystal,
            SourceKind::Oil,
            SourceKind::RedOil,
            SourceKind::RedCrystal,
            SourceKind::Scrap,
            SourceKind::SmallScrap,
            SourceKind::CreepScrap,
        ] {
            let s = kind.stats();
            assert!(s.min_capacity <= s.max_capacity, "{:?}", kind);
            assert!(s.value > 0.0);
        }
    }

    #[test]
    fn test_scrap_kinds() {
        assert!(SourceKind::SmallScrap.is_scrap());
        assert!(!SourceKind::Iron.is_scrap());
        assert!(SourceKind::RedOil.requires_redminer());
    }
}
