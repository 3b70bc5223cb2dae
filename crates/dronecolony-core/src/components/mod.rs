//! Component definitions for the ECS simulation.
//!
//! Components are plain data attached to entities (agents, creeps, map
//! objects) or owned by the engine (colony cores). Behavior lives in systems.

mod agent;
mod colony;
mod common;
mod creep;
mod world_objects;

pub use agent::*;
pub use colony::*;
pub use common::*;
pub use creep::*;
pub use world_objects::*;
