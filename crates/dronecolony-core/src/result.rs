//! Run statistics accumulated while the simulation plays.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimResult {
    pub resources_gathered: f64,
    pub elite_resources_gathered: f64,
    pub drones_produced: u32,
    pub drones_cloned: u32,
    pub drones_merged: u32,
    pub t3_created: u32,
    pub creeps_defeated: u32,
    pub creeps_stomped: u32,
    /// Summed frag score of defeated creeps.
    pub creep_total_value: u64,
    pub waves_spawned: u32,
    pub colonies_lost: u32,
    pub victory: bool,
}

impl SimResult {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
