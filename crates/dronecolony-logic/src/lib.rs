//! Pure data and formulas for the drone colony simulation.
//!
//! This crate contains the static tables and the balance formulas that the
//! engine consults every tick. Nothing in here owns runtime state: functions
//! take plain data (and pre-rolled random values where a decision is
//! probabilistic) and return results, so every rule is unit-testable without
//! spinning up a world.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`stats`] | Agent kinds, weapons, damage values, colony core designs |
//! | [`creeps`] | Creep kinds, creep stats, frag-score costs for the wave generator |
//! | [`economy`] | Upkeep price table, unit limit, evolution and mining formulas |
//! | [`faction`] | Faction tags and creation bonuses |
//! | [`merge`] | Merge recipes and the merge rank probability table |
//! | [`resources`] | Resource source kinds and their yields |
//! | [`weights`] | Normalized weight container for priorities and factions |

pub mod creeps;
pub mod economy;
pub mod faction;
pub mod merge;
pub mod resources;
pub mod stats;
pub mod weights;
