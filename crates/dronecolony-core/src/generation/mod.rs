//! Generation - procedural creation of the starting map

mod map;

pub use map::*;
