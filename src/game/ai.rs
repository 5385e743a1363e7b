//! AI Controller
//!
//! Two-state machine per AI actor:
//!
//! ```text
//!   Idle ──(visible hostile found)──▶ Engaged(target)
//!     ▲                                   │
//!     └──────(target gone or dead)────────┘
//!
//!   any ──(damaged by living attacker)──▶ Engaged(attacker)
//! ```
//!
//! Passive acquisition is faction-filtered; aggro on hit is not. Same-faction
//! attackers are adopted as targets too.

use glam::Vec3;

use crate::core::rng::RandomSource;
use crate::game::controller::Controller;
use crate::game::events::GameEventData;
use crate::game::handle::ActorHandle;
use crate::game::map::{Map, SpawnError};

/// Engagement state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AiState {
    /// Looking for a target
    #[default]
    Idle,
    /// Pursuing or attacking a target
    Engaged(ActorHandle),
}

/// Per-actor AI state.
#[derive(Clone, Debug, Default)]
pub struct AiController {
    state: AiState,
}

impl AiController {
    /// Idle controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> AiState {
        self.state
    }

    /// Current target, if engaged.
    pub fn target(&self) -> Option<ActorHandle> {
        match self.state {
            AiState::Idle => None,
            AiState::Engaged(target) => Some(target),
        }
    }

    /// Adopt `attacker` as target. Returns true if the target changed.
    pub fn damaged_by(&mut self, attacker: ActorHandle) -> bool {
        let changed = self.target() != Some(attacker);
        self.state = AiState::Engaged(attacker);
        changed
    }

    /// Drop any target.
    pub fn disengage(&mut self) {
        self.state = AiState::Idle;
    }

    fn engage(&mut self, target: ActorHandle) {
        self.state = AiState::Engaged(target);
    }
}

impl Map {
    fn ai_mut(&mut self, handle: ActorHandle) -> Option<&mut AiController> {
        match self.resolve_mut(handle)?.controller.as_mut()? {
            Controller::Ai(ai) => Some(ai),
            Controller::Player(_) => None,
        }
    }

    /// Run one AI decision for `handle`: validate or acquire a target, turn
    /// toward it, then attack or close the distance.
    pub fn update_ai(
        &mut self,
        handle: ActorHandle,
        delta_seconds: f32,
        rng: &mut dyn RandomSource,
    ) -> Result<(), SpawnError> {
        let Some(actor) = self.resolve(handle) else {
            return Ok(());
        };
        if actor.is_dead {
            return Ok(());
        }
        let Some(ai) = actor.controller.as_ref().and_then(Controller::ai) else {
            return Ok(());
        };

        let mut target = ai.target();
        if let Some(t) = target {
            if !self.resolve(t).is_some_and(|a| a.is_alive()) {
                if let Some(ai) = self.ai_mut(handle) {
                    ai.disengage();
                }
                target = None;
            }
        }

        if target.is_none() {
            target = self.closest_visible_enemy(handle, rng);
            if let Some(t) = target {
                if let Some(ai) = self.ai_mut(handle) {
                    ai.engage(t);
                }
                self.push_event(GameEventData::TargetAcquired { actor: handle, target: t });
            }
        }

        let Some(target) = target else {
            return Ok(());
        };
        let Some(target_position) = self.resolve(target).map(|a| a.position) else {
            return Ok(());
        };
        let Some(actor) = self.resolve_mut(handle) else {
            return Ok(());
        };

        // Yaw follows the planar offset; reach is measured in 3-D
        let offset = target_position - actor.position;
        if offset.x != 0.0 || offset.y != 0.0 {
            let goal_yaw = offset.y.atan2(offset.x).to_degrees();
            let max_turn = actor.definition.physics.turn_speed * delta_seconds;
            actor.turn_toward(goal_yaw, max_turn);
        }

        let distance = offset.length();
        let range = match actor.equipped_weapon() {
            Some(weapon) => weapon.definition.melee_range(),
            None => actor.radius(),
        };

        if actor.equipped_weapon().is_some() && distance <= range {
            self.attack(handle, rng)?;
        } else {
            let forward = actor.forward();
            let run_speed = actor.definition.physics.run_speed;
            actor.move_in_direction(Vec3::new(forward.x, forward.y, 0.0), run_speed);
        }
        Ok(())
    }
}
