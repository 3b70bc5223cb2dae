//! Merge recipes and the merge rank table.
//!
//! Two drones of matching kinds (and, for most tier-2 recipes, matching
//! factions) fuse into one unit of a higher tier. Recipes are symmetric:
//! `a + b` and `b + a` resolve to the same result.

use crate::faction::FactionTag;
use crate::stats::{agent_stats, AgentKind, AgentStats};

/// One side of a recipe. `faction: None` matches any faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeSubject {
    pub kind: AgentKind,
    pub faction: Option<FactionTag>,
}

impl RecipeSubject {
    const fn of(kind: AgentKind, faction: FactionTag) -> Self {
        Self {
            kind,
            faction: Some(faction),
        }
    }

    const fn any(kind: AgentKind) -> Self {
        Self {
            kind,
            faction: None,
        }
    }

    fn matches(&self, kind: AgentKind, faction: FactionTag) -> bool {
        self.kind == kind && self.faction.map_or(true, |f| f == faction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipe {
    pub a: RecipeSubject,
    pub b: RecipeSubject,
    pub result: AgentKind,
}

const fn recipe(a: RecipeSubject, b: RecipeSubject, result: AgentKind) -> Recipe {
    Recipe { a, b, result }
}

use AgentKind::*;
use FactionTag::{Blue, Green, Neutral, Red, Yellow};

/// Ordered: the first matching recipe wins, so faction-specific entries come
/// before their any-faction fallbacks.
pub const RECIPES: &[Recipe] = &[
    recipe(RecipeSubject::of(Worker, Yellow), RecipeSubject::of(Worker, Yellow), Freighter),
    recipe(RecipeSubject::of(Worker, Red), RecipeSubject::of(Worker, Red), Redminer),
    recipe(RecipeSubject::of(Worker, Green), RecipeSubject::of(Worker, Green), Servo),
    recipe(RecipeSubject::of(Worker, Blue), RecipeSubject::of(Worker, Blue), Recharger),
    recipe(RecipeSubject::of(Worker, Neutral), RecipeSubject::of(Worker, Neutral), Generator),
    recipe(RecipeSubject::of(Worker, Yellow), RecipeSubject::of(Scout, Yellow), Courier),
    recipe(RecipeSubject::of(Worker, Red), RecipeSubject::of(Scout, Red), Scavenger),
    recipe(RecipeSubject::of(Worker, Green), RecipeSubject::of(Scout, Green), Repair),
    recipe(RecipeSubject::of(Worker, Blue), RecipeSubject::of(Scout, Blue), Cloner),
    recipe(RecipeSubject::of(Worker, Neutral), RecipeSubject::of(Scout, Neutral), Repeller),
    recipe(RecipeSubject::of(Scout, Yellow), RecipeSubject::of(Scout, Yellow), Crippler),
    recipe(RecipeSubject::of(Scout, Red), RecipeSubject::of(Scout, Red), Fighter),
    recipe(RecipeSubject::of(Scout, Green), RecipeSubject::of(Scout, Green), Skirmisher),
    recipe(RecipeSubject::of(Scout, Blue), RecipeSubject::of(Scout, Blue), Prism),
    recipe(RecipeSubject::of(Scout, Neutral), RecipeSubject::of(Scout, Neutral), Defender),
    recipe(RecipeSubject::of(Scout, Red), RecipeSubject::of(Scout, Yellow), AntiAir),
    recipe(RecipeSubject::of(Scout, Blue), RecipeSubject::of(Scout, Green), Disintegrator),
    recipe(RecipeSubject::of(Scout, Green), RecipeSubject::of(Scout, Yellow), Scarab),
    recipe(RecipeSubject::any(Worker), RecipeSubject::any(Scout), Kamikaze),
    recipe(RecipeSubject::any(Scout), RecipeSubject::any(Scout), Mortar),
    recipe(RecipeSubject::any(Worker), RecipeSubject::any(Worker), Freighter),
    recipe(RecipeSubject::any(Scavenger), RecipeSubject::any(Fighter), Roomba),
    recipe(RecipeSubject::any(Freighter), RecipeSubject::any(Courier), Trucker),
    recipe(RecipeSubject::any(Fighter), RecipeSubject::any(Defender), Guardian),
    recipe(RecipeSubject::any(Generator), RecipeSubject::any(Recharger), Stormbringer),
    recipe(RecipeSubject::any(Prism), RecipeSubject::any(Disintegrator), Destroyer),
    recipe(RecipeSubject::any(Scavenger), RecipeSubject::any(Skirmisher), Marauder),
    recipe(RecipeSubject::any(Fighter), RecipeSubject::any(Repair), Devourer),
];

/// Find the merge result for two drones, if any recipe applies.
pub fn merge_result(
    kind_a: AgentKind,
    faction_a: FactionTag,
    kind_b: AgentKind,
    faction_b: FactionTag,
) -> Option<&'static AgentStats> {
    RECIPES
        .iter()
        .find(|r| {
            (r.a.matches(kind_a, faction_a) && r.b.matches(kind_b, faction_b))
                || (r.a.matches(kind_b, faction_b) && r.b.matches(kind_a, faction_a))
        })
        .map(|r| agent_stats(r.result))
}

/// Evolution points a merge into `result` costs.
pub fn merge_evo_cost(result: &AgentStats) -> f64 {
    match result.tier {
        3 => 5.0,
        _ => 0.0,
    }
}

/// Outcome of the rank table for two merged ranks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankOutcome {
    Fixed(u8),
    /// `hit` with probability `chance`, otherwise `miss`.
    Chance { chance: f64, hit: u8, miss: u8 },
}

impl RankOutcome {
    /// Resolve with a pre-rolled value in `[0, 1)`.
    pub fn resolve(self, roll: f64) -> u8 {
        match self {
            RankOutcome::Fixed(rank) => rank,
            RankOutcome::Chance { chance, hit, miss } => {
                if roll < chance {
                    hit
                } else {
                    miss
                }
            }
        }
    }

    pub fn needs_roll(self) -> bool {
        matches!(self, RankOutcome::Chance { .. })
    }
}

/// Rank of a merged unit as a function of the two input ranks.
///
/// Two normal units stay normal; one elite gives a 75% elite; two elites (or
/// one super-elite) give a 75% super-elite and an elite otherwise; anything
/// better is capped at super-elite.
pub fn merge_rank(rank_a: u8, rank_b: u8) -> RankOutcome {
    match rank_a + rank_b {
        0 => RankOutcome::Fixed(0),
        1 => RankOutcome::Chance {
            chance: 0.75,
            hit: 1,
            miss: 0,
        },
        2 => RankOutcome::Chance {
            chance: 0.75,
            hit: 2,
            miss: 1,
        },
        _ => RankOutcome::Fixed(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipes_are_symmetric() {
        let ab = merge_result(Worker, Yellow, Scout, Yellow).map(|s| s.kind);
        let ba = merge_result(Scout, Yellow, Worker, Yellow).map(|s| s.kind);
        assert_eq!(ab, Some(Courier));
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_faction_specific_before_fallback() {
        assert_eq!(merge_result(Worker, Red, Worker, Red).map(|s| s.kind), Some(Redminer));
        assert_eq!(merge_result(Worker, Red, Worker, Blue).map(|s| s.kind), Some(Freighter));
    }

    #[test]
    fn test_no_recipe() {
        assert!(merge_result(Gunpoint, Neutral, Worker, Neutral).is_none());
        assert!(merge_result(Trucker, Neutral, Trucker, Neutral).is_none());
    }

    #[test]
    fn test_recipe_tiers() {
        for r in RECIPES {
            let a = agent_stats(r.a.kind);
            let b = agent_stats(r.b.kind);
            let result = agent_stats(r.result);
            assert_eq!(a.tier, b.tier);
            if result.kind != Roomba {
                assert_eq!(result.tier, a.tier + 1, "{:?}", r);
            }
        }
    }

    #[test]
    fn test_two_normal_units_never_rank_up() {
        assert_eq!(merge_rank(0, 0), RankOutcome::Fixed(0));
        assert!(!merge_rank(0, 0).needs_roll());
    }

    #[test]
    fn test_rank_table_literal() {
        let one = merge_rank(1, 0);
        assert_eq!(one.resolve(0.74), 1);
        assert_eq!(one.resolve(0.75), 0);
        let two = merge_rank(1, 1);
        assert_eq!(two.resolve(0.1), 2);
        assert_eq!(two.resolve(0.9), 1);
        assert_eq!(merge_rank(2, 0), two);
        assert_eq!(merge_rank(2, 2), RankOutcome::Fixed(2));
    }

    #[test]
    fn test_rank_table_is_pure() {
        for a in 0..=2u8 {
            for b in 0..=2u8 {
                assert_eq!(merge_rank(a, b), merge_rank(a, b));
                assert_eq!(merge_rank(a, b), merge_rank(b, a));
            }
        }
    }
}
