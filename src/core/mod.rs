//! Core simulation primitives.
//!
//! Geometry helpers, timers, the seeded RNG and state hashing. Nothing in
//! here knows about actors or maps.

pub mod math;
pub mod timer;
pub mod rng;
pub mod hash;

// Re-export core types
pub use math::{Aabb2, Aabb3, EulerAngles, FloatRange};
pub use timer::Timer;
pub use rng::{DeterministicRng, RandomSource};
pub use hash::{compute_state_hash, StateHash};
