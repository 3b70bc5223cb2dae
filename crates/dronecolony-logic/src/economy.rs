//! Colony economy formulas.
//!
//! Every function here is a pure mapping from colony figures (radius,
//! priorities, unit counts) to a balance value. The colony core owns the
//! state and calls into these on its own timers.

use crate::stats::{AgentKind, AgentStats};

pub const MAX_UPKEEP_VALUE: u32 = 800;
pub const MAX_EVO_POINTS: f64 = 20.0;
/// Cap on evolution points one GenerateEvo action can produce before the
/// radius multiplier.
pub const MAX_EVO_GAIN: f64 = 1.0;
pub const BLUE_EVO_THRESHOLD: f64 = 18.0;
/// Elite resources are clamped to this on every upkeep tick.
pub const MAX_ELITE_RESOURCES: f64 = 10.0;

pub const INITIAL_COLONY_RADIUS: f64 = 128.0;
pub const MIN_COLONY_RADIUS: f64 = 96.0;

/// Each generator or stormbringer cancels this much summed upkeep.
const UPKEEP_DECREASE_PER_GENERATOR: u32 = 20;
const MAX_UPKEEP_GENERATORS: u32 = 10;

/// Resources charged per upkeep tick for a given summed upkeep value.
pub fn upkeep_price(upkeep_total: u32) -> f64 {
    match upkeep_total {
        0..=30 => 0.0,
        31..=45 => 1.0,
        46..=70 => 2.0,
        71..=95 => 3.0,
        96..=120 => 5.0,
        121..=150 => 7.0,
        151..=215 => 9.0,
        216..=300 => 12.0,
        301..=400 => 15.0,
        401..=500 => 20.0,
        501..=600 => 25.0,
        601..=700 => 35.0,
        701..=MAX_UPKEEP_VALUE => 50.0,
        _ => 65.0,
    }
}

pub fn is_upkeep_reducer(kind: AgentKind) -> bool {
    matches!(kind, AgentKind::Generator | AgentKind::Stormbringer)
}

/// Apply generator reductions and the resources-priority discount to a raw
/// upkeep sum. Returns the effective upkeep value.
pub fn effective_upkeep(raw_total: u32, num_generators: u32, resources_priority: f64) -> u32 {
    let decrease = num_generators.min(MAX_UPKEEP_GENERATORS) * UPKEEP_DECREASE_PER_GENERATOR;
    let mut total = raw_total.saturating_sub(decrease);
    if resources_priority > 0.2 {
        // 40% => -20%, 80% and above => -60%
        let max_decrease = resources_priority.min(0.6);
        total = (f64::from(total) * (1.2 - max_decrease)) as u32;
    }
    total
}

/// Summed upkeep of a set of units, with generator reductions applied.
pub fn calc_upkeep<'a>(
    units: impl IntoIterator<Item = &'a AgentStats>,
    resources_priority: f64,
) -> (f64, u32) {
    let mut raw = 0;
    let mut generators = 0;
    for stats in units {
        if is_upkeep_reducer(stats.kind) {
            generators += 1;
        }
        raw += stats.upkeep;
    }
    let total = effective_upkeep(raw, generators, resources_priority);
    (upkeep_price(total), total)
}

/// Max number of agents a colony may own.
///
/// A radius of 128 gives 10, 256 gives 61; a growth priority above 10% adds
/// up to 54 more.
pub fn unit_limit(radius: f64, growth_priority: f64, drone_limit: usize) -> usize {
    let mut calculated = (radius - 128.0).max(0.0) * 0.4 + 10.0;
    if growth_priority > 0.1 {
        calculated += (growth_priority - 0.1) * 60.0;
    }
    (calculated as usize).clamp(10, drone_limit.max(10))
}

/// Larger colonies convert drones into evolution points less efficiently.
pub fn evo_gain_multiplier(radius: f64) -> f64 {
    (2.0 - radius / 200.0).clamp(0.1, 1.5)
}

/// Workers one MineEssence action may dispatch before the random scale.
pub fn mine_priority_capacity(resources_priority: f64) -> f64 {
    (resources_priority * 20.0 - 1.0).clamp(0.0, 15.0).floor()
}

/// Extra miners for large colonies: +1 per 10 workers past 15.
pub fn colony_size_bonus(num_workers: usize) -> usize {
    (num_workers.saturating_sub(15) / 10).min(10)
}

/// Final MineEssence assignment count given a pre-rolled scale in `[0.8, 1.3]`.
pub fn miners_to_assign(resources_priority: f64, num_workers: usize, scale: f64) -> usize {
    (mine_priority_capacity(resources_priority) * scale) as usize + colony_size_bonus(num_workers)
}

/// Cooldown added after a successful MineEssence action.
pub fn mining_delay(resources_priority: f64) -> f64 {
    4.0 - resources_priority * 4.0
}

pub fn patrol_radius(radius: f64, security_priority: f64) -> f64 {
    radius * (1.0 + security_priority * 0.25)
}

pub fn attack_radius(radius: f64, security_priority: f64) -> f64 {
    1.4 * patrol_radius(radius, security_priority) + 320.0
}

/// Resources spent to clone `target`.
pub fn cloning_cost(target: &AgentStats) -> f64 {
    target.cost * 0.85
}

/// Evolution points contributed by one tier-2 drone during GenerateEvo.
pub fn drone_evo_yield(blue: bool) -> f64 {
    if blue {
        0.05
    } else {
        0.04
    }
}

/// Resources above the visual storage cap decay at 1/s.
pub fn storage_cap(resources_limit: f64) -> f64 {
    resources_limit - 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{agent_stats, GENERATOR, SCOUT, WORKER};

    #[test]
    fn test_upkeep_price_table() {
        assert_eq!(upkeep_price(0), 0.0);
        assert_eq!(upkeep_price(30), 0.0);
        assert_eq!(upkeep_price(31), 1.0);
        assert_eq!(upkeep_price(120), 5.0);
        assert_eq!(upkeep_price(215), 9.0);
        assert_eq!(upkeep_price(800), 50.0);
        assert_eq!(upkeep_price(801), 65.0);
    }

    #[test]
    fn test_generators_reduce_upkeep() {
        let mut units = vec![&SCOUT; 20];
        let (_, without) = calc_upkeep(units.iter().copied(), 0.0);
        units.push(&GENERATOR);
        let (_, with) = calc_upkeep(units.iter().copied(), 0.0);
        assert_eq!(without, 60);
        assert_eq!(with, 40);
    }

    #[test]
    fn test_generator_reduction_is_capped() {
        assert_eq!(effective_upkeep(1000, 50, 0.0), 800);
        assert_eq!(effective_upkeep(10, 3, 0.0), 0);
    }

    #[test]
    fn test_resource_priority_discount() {
        assert_eq!(effective_upkeep(100, 0, 0.2), 100);
        assert!((79..=80).contains(&effective_upkeep(100, 0, 0.4)));
        assert!((59..=60).contains(&effective_upkeep(100, 0, 0.9)));
    }

    #[test]
    fn test_unit_limit() {
        assert_eq!(unit_limit(128.0, 0.0, 140), 10);
        assert_eq!(unit_limit(256.0, 0.0, 140), 61);
        assert_eq!(unit_limit(128.0, 0.5, 140), 34);
        assert_eq!(unit_limit(1000.0, 1.0, 140), 140);
    }

    #[test]
    fn test_mining_capacity() {
        assert_eq!(mine_priority_capacity(0.1), 1.0);
        assert_eq!(mine_priority_capacity(0.5), 9.0);
        assert_eq!(mine_priority_capacity(0.9), 15.0);
        assert_eq!(mine_priority_capacity(0.0), 0.0);
        assert_eq!(colony_size_bonus(14), 0);
        assert_eq!(colony_size_bonus(25), 1);
        assert_eq!(colony_size_bonus(500), 10);
        assert_eq!(miners_to_assign(0.5, 25, 1.0), 10);
    }

    #[test]
    fn test_radius_formulas() {
        assert!((evo_gain_multiplier(100.0) - 1.5).abs() < 1e-9);
        assert!((evo_gain_multiplier(200.0) - 1.0).abs() < 1e-9);
        assert!((evo_gain_multiplier(500.0) - 0.1).abs() < 1e-9);
        assert!((patrol_radius(128.0, 0.0) - 128.0).abs() < 1e-9);
        assert!((attack_radius(100.0, 0.0) - 460.0).abs() < 1e-9);
    }

    #[test]
    fn test_cloning_cost_below_production() {
        for kind in [AgentKind::Worker, AgentKind::Fighter, AgentKind::Devourer] {
            let stats = agent_stats(kind);
            assert!(cloning_cost(stats) < stats.cost);
        }
        assert!((cloning_cost(&WORKER) - 6.8).abs() < 1e-9);
    }
}
