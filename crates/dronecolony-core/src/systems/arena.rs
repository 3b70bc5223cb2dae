//! Arena wave generator.
//!
//! Every level has a countdown; when it expires the prepared wave is sent in
//! and the next one is composed from a growing frag-score budget. Finite
//! arenas end with a victory once the wave after the last level would start.

use dronecolony_logic::creeps::{
    frag_score, super_cost_multiplier, CreepKind, CreepStats, ASSAULT, BUILDER, CRAWLER, DOMINATOR,
    ELITE_CRAWLER, HEAVY_CRAWLER, HOWITZER, SERVANT, STEALTH_CRAWLER, STUNNER, TEMPLAR, WANDERER,
};

use crate::components::{Creep, Rect, Vec2};
use crate::config::SimConfig;
use crate::events::SimEvent;
use crate::presentation::SoundKind;
use crate::rng::{rand_iterate, SimRng};
use crate::world::SimContext;

/// Largest budget a single group may spend; the rest of a side's budget
/// opens another group.
pub const MAX_GROUP_BUDGET: u32 = 120;

const FIRST_LEVEL_BUDGET: u32 = 25;
const BUILDER_CHANCE: f64 = 0.6;
/// Distance outside the map edge where a group appears.
const SPAWN_MARGIN: f64 = 96.0;
const SPAWN_SCATTER: f64 = 40.0;

/// Map edge a group enters from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    North,
    East,
    South,
    West,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Random point just past this edge of `map`.
    fn spawn_pos(self, rng: &mut SimRng, map: &Rect) -> Vec2 {
        let x = rng.float_range(map.min.x + SPAWN_MARGIN, map.max.x - SPAWN_MARGIN);
        let y = rng.float_range(map.min.y + SPAWN_MARGIN, map.max.y - SPAWN_MARGIN);
        match self {
            Side::North => Vec2::new(x, map.min.y - SPAWN_MARGIN),
            Side::East => Vec2::new(map.max.x + SPAWN_MARGIN, y),
            Side::South => Vec2::new(x, map.max.y + SPAWN_MARGIN),
            Side::West => Vec2::new(map.min.x - SPAWN_MARGIN, y),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PoolEntry {
    stats: &'static CreepStats,
    cost: u32,
    min_level: u32,
}

impl PoolEntry {
    fn new(stats: &'static CreepStats, min_level: u32) -> Self {
        Self {
            stats,
            cost: frag_score(stats),
            min_level,
        }
    }
}

/// Cheapest entry first: `pick_unit` gives up when the head is unaffordable.
fn flying_pool() -> [PoolEntry; 4] {
    [
        PoolEntry::new(&WANDERER, 0),
        PoolEntry::new(&STUNNER, 2),
        PoolEntry::new(&ASSAULT, 6),
        PoolEntry::new(&TEMPLAR, 11),
    ]
}

fn ground_pool() -> [PoolEntry; 4] {
    [
        PoolEntry::new(&CRAWLER, 0),
        PoolEntry::new(&ELITE_CRAWLER, 2),
        PoolEntry::new(&STEALTH_CRAWLER, 3),
        PoolEntry::new(&HEAVY_CRAWLER, 9),
    ]
}

fn builder_entry() -> PoolEntry {
    PoolEntry::new(&BUILDER, 7)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveUnit {
    pub stats: &'static CreepStats,
    pub super_elite: bool,
}

impl WaveUnit {
    fn new(stats: &'static CreepStats, super_elite: bool) -> Self {
        Self { stats, super_elite }
    }

    /// Frag-score value of this unit, super multiplier included.
    pub fn cost(&self) -> u32 {
        let base = frag_score(self.stats);
        if self.super_elite {
            base * super_cost_multiplier(self.stats)
        } else {
            base
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaveGroup {
    pub side: Side,
    pub units: Vec<WaveUnit>,
}

impl WaveGroup {
    fn new(side: Side) -> Self {
        Self {
            side,
            units: Vec::new(),
        }
    }

    pub fn total_cost(&self) -> u32 {
        self.units.iter().map(WaveUnit::cost).sum()
    }
}

/// Composition of the next wave plus the summary flags shown to the player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveInfo {
    pub groups: Vec<WaveGroup>,
    pub is_last: bool,
    pub dominator: bool,
    pub howitzer: bool,
    pub task_force: bool,
    pub builders: bool,
    pub flying_attackers: bool,
    pub ground_attackers: bool,
    pub attack_sides: [bool; 4],
}

impl WaveInfo {
    pub fn unit_count(&self) -> usize {
        self.groups.iter().map(|g| g.units.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.unit_count() == 0
    }
}

#[derive(Debug, Clone)]
pub struct ArenaManager {
    level: u32,
    /// `None` in the endless arena.
    last_level: Option<u32>,
    wave_budget: u32,
    budget_step_multiplier: f64,
    level_start_delay: f64,
    victory: bool,
    sides: [Side; 4],
    wave: WaveInfo,
}

impl ArenaManager {
    /// Create the manager and compose the first wave.
    pub fn new(config: &SimConfig, rng: &mut SimRng) -> Self {
        let mut arena = Self {
            level: 1,
            last_level: (!config.infinite_arena).then_some(config.last_level),
            wave_budget: 0,
            budget_step_multiplier: config.budget_step_multiplier(),
            level_start_delay: 0.0,
            victory: false,
            sides: Side::ALL,
            wave: WaveInfo::default(),
        };
        arena.prepare_wave(rng);
        arena
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn wave_budget(&self) -> u32 {
        self.wave_budget
    }

    pub fn level_start_delay(&self) -> f64 {
        self.level_start_delay
    }

    pub fn wave(&self) -> &WaveInfo {
        &self.wave
    }

    pub fn is_victory(&self) -> bool {
        self.victory
    }

    pub fn is_infinite(&self) -> bool {
        self.last_level.is_none()
    }

    fn is_last_level(&self) -> bool {
        self.last_level == Some(self.level)
    }

    fn is_past_last_level(&self) -> bool {
        self.last_level.map_or(false, |last| self.level > last)
    }

    pub fn update(&mut self, ctx: &mut SimContext, delta: f64) {
        if self.victory {
            return;
        }
        self.level_start_delay -= delta;
        if self.level_start_delay > 0.0 {
            return;
        }
        if self.is_past_last_level() {
            self.victory = true;
            ctx.state.result.victory = true;
            ctx.emit(SimEvent::Victory);
            log::info!("arena cleared after {} waves", self.level - 1);
            return;
        }
        self.spawn_wave(ctx);
        self.level += 1;
        self.prepare_wave(&mut ctx.rng);
    }

    /// Send the prepared wave in from its sides.
    pub fn spawn_wave(&mut self, ctx: &mut SimContext) {
        let map = ctx.state.map;
        ctx.state.presentation.play_sound(SoundKind::Alarm, map.center());
        for group in &self.wave.groups {
            let center = group.side.spawn_pos(&mut ctx.rng, &map);
            for unit in &group.units {
                let pos = center + ctx.rng.offset(-SPAWN_SCATTER, SPAWN_SCATTER);
                let mut creep = Creep::new(unit.stats, pos, unit.super_elite);
                creep.value = unit.cost();
                ctx.spawn_creep(creep);
            }
        }
        ctx.state.result.waves_spawned += 1;
        ctx.emit(SimEvent::WaveSpawned { level: self.level });
        log::info!(
            "wave {} spawned: {} units in {} groups",
            self.level,
            self.wave.unit_count(),
            self.wave.groups.len()
        );
    }

    /// Compose the wave for the current level and reset the countdown.
    pub fn prepare_wave(&mut self, rng: &mut SimRng) {
        if self.is_past_last_level() {
            self.level_start_delay = 5.0 * 60.0;
            self.wave = WaveInfo::default();
            return;
        }

        let is_last = self.is_last_level();
        let budget_step = if is_last {
            self.level_start_delay = 4.0 * 60.0;
            140
        } else if self.level % 5 == 0 {
            self.level_start_delay = 4.0 * 60.0;
            if self.is_infinite() {
                20 + self.level
            } else {
                20 + 2 * self.level
            }
        } else if self.level == 1 {
            self.level_start_delay = 90.0;
            self.wave_budget = FIRST_LEVEL_BUDGET;
            0
        } else {
            self.level_start_delay = 2.5 * 60.0;
            10
        };
        self.wave_budget += (f64::from(budget_step) * self.budget_step_multiplier).round() as u32;
        log::info!("wave {} budget is {}", self.level, self.wave_budget);

        let roll = rng.float();
        let (num_sides, budget_multiplier) = if roll < 0.5 {
            (1, 1.0)
        } else if roll < 0.8 {
            (2, 0.75)
        } else {
            (4, 0.4)
        };

        let mut wave = WaveInfo::default();
        rng.shuffle(&mut self.sides);
        for &side in &self.sides[..num_sides] {
            wave.attack_sides[side.index()] = true;
            let mut side_budget = (f64::from(self.wave_budget) * budget_multiplier).round() as u32;

            let mut selection = Vec::with_capacity(9);
            let pool_roll = rng.float();
            let allow_flying = if pool_roll <= 0.5 {
                selection.extend(flying_pool());
                wave.flying_attackers = true;
                true
            } else if pool_roll <= 0.8 {
                selection.extend(ground_pool());
                wave.ground_attackers = true;
                false
            } else {
                selection.extend(flying_pool());
                selection.extend(ground_pool());
                wave.flying_attackers = true;
                wave.ground_attackers = true;
                true
            };
            if allow_flying && rng.chance(BUILDER_CHANCE) {
                selection.push(builder_entry());
            }

            while side_budget > 0 {
                let mut group = WaveGroup::new(side);
                let mut local_budget = side_budget.min(MAX_GROUP_BUDGET);
                side_budget -= local_budget;
                // At most one builder per group.
                let mut group_selection = selection.clone();
                while let Some((unit, remaining)) = pick_unit(rng, self.level, local_budget, &group_selection) {
                    if unit.stats.kind == CreepKind::Builder {
                        wave.builders = true;
                        group_selection.retain(|x| x.stats.kind != CreepKind::Builder);
                    }
                    local_budget = remaining;
                    group.units.push(unit);
                }
                wave.groups.push(group);
            }
        }
        if wave.groups.is_empty() {
            wave.groups.push(WaveGroup::new(self.sides[0]));
        }

        if self.level > 6 && self.level % 6 == 0 {
            // 12 => 3 servants, 18 => 4, 24 => 5
            wave.task_force = true;
            let mut group = WaveGroup::new(self.sides[0]);
            let num_attackers = 1 + self.level / 6;
            group
                .units
                .extend((0..num_attackers).map(|i| WaveUnit::new(&SERVANT, i == 0)));
            wave.groups.push(group);
        }

        if is_last {
            wave.is_last = true;
            for i in 0..3 {
                wave.groups[0].units.push(WaveUnit::new(&DOMINATOR, i == 0));
            }
            for _ in 0..2 {
                let index = rng.index(wave.groups.len());
                wave.groups[index].units.push(WaveUnit::new(&HOWITZER, false));
            }
            let num_groups = wave.groups.len();
            for i in 0..7 {
                wave.groups[i % num_groups].units.push(WaveUnit::new(&SERVANT, i <= 1));
            }
        } else if self.level % 5 == 0 {
            // One boss per five levels; the second one is always super.
            let num_bosses = self.level / 5;
            for i in 0..num_bosses {
                let index = rng.index(wave.groups.len());
                let stats = if rng.bool() {
                    wave.howitzer = true;
                    &HOWITZER
                } else {
                    wave.dominator = true;
                    &DOMINATOR
                };
                wave.groups[index].units.push(WaveUnit::new(stats, i == 1));
            }
        }

        self.wave = wave;
    }
}

/// Pick one affordable unit from `selection`, possibly upgraded to super.
///
/// Returns the unit and the budget left, or `None` when nothing fits.
fn pick_unit(rng: &mut SimRng, level: u32, budget: u32, selection: &[PoolEntry]) -> Option<(WaveUnit, u32)> {
    let head = selection.first()?;
    if budget < head.cost {
        return None;
    }
    let entry = *rand_iterate(rng, selection, |x| x.cost <= budget && x.min_level <= level)?;
    let super_cost = entry.cost * super_cost_multiplier(entry.stats);
    if entry.min_level + 4 <= level && super_cost <= budget {
        // 5 => 3%, 10 => 18%, 20 => 48%, 30 => 78%
        let elite_chance = ((f64::from(level) - 4.0) * 0.03).clamp(0.0, 0.9);
        if rng.chance(elite_chance) {
            return Some((WaveUnit::new(entry.stats, true), budget - super_cost));
        }
    }
    Some((WaveUnit::new(entry.stats, false), budget - entry.cost))
}
