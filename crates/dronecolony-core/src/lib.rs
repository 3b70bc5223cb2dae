//! DroneColony Core - Drone Colony Simulation Engine
//!
//! An ECS-based simulation of drone colonies that mine, build, evolve and
//! defend themselves against escalating waves of enemy creeps.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Agents (drones, turrets, roombas), creeps, essence sources,
//!   construction sites, neutral buildings
//! - **Components**: Pure data attached to entities (Agent, Creep, EssenceSource, etc.)
//! - **Systems**: Logic that runs once per tick over a shared [`world::SimContext`]
//!
//! Colony cores live outside the ECS world in a plain list indexed by
//! [`components::ColonyId`]; agents refer to their colony by id.
//! Every decision draws from one seeded RNG, so a seed reproduces a run.
//!
//! # Example
//!
//! ```rust,no_run
//! use dronecolony_core::prelude::*;
//! use dronecolony_core::config::SimConfig;
//!
//! let mut engine = SimulationEngine::new(SimConfig::default()).unwrap();
//!
//! // Nudge the first colony towards defence
//! engine.add_priority(ColonyId(0), ColonyPriority::Security, 0.2);
//!
//! // Run simulation
//! while !engine.is_finished() {
//!     engine.update(1.0 / 60.0); // 60 FPS
//! }
//! println!("{}", engine.result().to_json());
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod generation;
pub mod presentation;
pub mod result;
pub mod rng;
pub mod spatial;
pub mod systems;
pub mod world;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::SimulationEngine;
}
