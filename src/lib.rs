//! # Gridfire Simulation Core
//!
//! Deterministic actor simulation on a tile grid: hitscan, projectile and
//! melee weapons, AI pursuit, possession, and collision.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    GRIDFIRE SIM CORE                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Simulation primitives                     │
//! │  ├── math.rs     - Angles, ranges, planar push-out           │
//! │  ├── timer.rs    - Elapsed-time timers                       │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for replay checks           │
//! │                                                              │
//! │  game/           - Simulation (deterministic)                │
//! │  ├── handle.rs   - Generational actor handles                │
//! │  ├── map.rs      - Actor registry, damage, death             │
//! │  ├── raycast.rs  - Ray queries and vision                    │
//! │  ├── collision.rs- Collision resolution                      │
//! │  ├── ai.rs       - Idle/engaged AI                           │
//! │  ├── weapon.rs   - Weapon phases and fire                    │
//! │  └── tick.rs     - Fixed-order simulation step               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Given identical definitions, map, delta time and RNG seed, the
//! simulation produces identical state hashes:
//! - Actors are visited in slot order
//! - Definition tables are `BTreeMap`s
//! - No system time dependencies
//! - All randomness from a seeded Xorshift128+

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;

// Re-export commonly used types
pub use core::rng::{DeterministicRng, RandomSource};
pub use game::definitions::DefinitionSet;
pub use game::handle::ActorHandle;
pub use game::map::Map;
pub use game::tick::{tick, SimConfig, SimContext};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
