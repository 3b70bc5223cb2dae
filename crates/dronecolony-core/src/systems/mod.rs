//! Systems - per-tick logic over the simulation context

mod agent_modes;
mod agent_update;
mod arena;
mod colony;
mod combat;
mod creeps;
mod damage;
mod planner;
mod support;

pub use agent_modes::*;
pub use agent_update::*;
pub use arena::*;
pub use colony::*;
pub use combat::*;
pub use creeps::*;
pub use damage::*;
pub use planner::*;
pub use support::*;
