//! Game Simulation Module
//!
//! Everything that runs inside a tick. Deterministic given the same
//! definitions, delta time and random sequence.
//!
//! ## Module Structure
//!
//! - `handle`: Generational actor handles
//! - `definitions`: Immutable actor, weapon, tile and map tables
//! - `grid`: Tile solidity and bounds
//! - `actor`: Per-actor kinematics, health and inventory
//! - `map`: Actor registry, damage and death
//! - `raycast`: Grid, plane and actor ray queries; vision
//! - `collision`: Actor-actor and actor-world resolution
//! - `ai`: Idle/engaged state machine
//! - `controller`: AI or player control, possession
//! - `weapon`: Ammo phases, refire and fire resolution
//! - `events`: Per-tick events for presentation and replay
//! - `tick`: Fixed-order simulation step

pub mod actor;
pub mod ai;
pub mod collision;
pub mod controller;
pub mod definitions;
pub mod events;
pub mod grid;
pub mod handle;
pub mod map;
pub mod raycast;
pub mod tick;
pub mod weapon;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types
pub use actor::Actor;
pub use ai::{AiController, AiState};
pub use controller::{Controller, PlayerController, PlayerIntent};
pub use definitions::{DefinitionError, DefinitionSet, SpawnInfo};
pub use events::{GameEvent, GameEventData};
pub use handle::ActorHandle;
pub use map::{Map, MapBuildError, SpawnError};
pub use raycast::RaycastResult;
pub use tick::{run_ticks, tick, SimConfig, SimContext, TickResult};
pub use weapon::{Weapon, WeaponPhase};
