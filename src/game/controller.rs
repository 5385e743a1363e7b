//! Actor Controllers
//!
//! An actor is driven by at most one controller: an AI state machine or a
//! player. Players possess actors; the possessed actor's AI is suspended
//! inside the player controller and restored when it is released.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::math::EulerAngles;
use crate::core::rng::RandomSource;
use crate::game::ai::AiController;
use crate::game::handle::ActorHandle;
use crate::game::map::{Map, SpawnError};

/// What drives an actor.
#[derive(Clone, Debug)]
pub enum Controller {
    /// Idle/engaged state machine
    Ai(AiController),
    /// Player intent
    Player(PlayerController),
}

impl Controller {
    /// AI state, if AI-driven.
    pub fn ai(&self) -> Option<&AiController> {
        match self {
            Controller::Ai(ai) => Some(ai),
            Controller::Player(_) => None,
        }
    }
}

/// Per-tick player input, already polled and normalized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerIntent {
    /// Local movement: +X forward, +Y left. Clamped to unit length.
    pub movement: Vec2,
    /// Use run speed instead of walk speed
    pub run: bool,
    /// Absolute aim; becomes the actor's orientation
    pub aim: EulerAngles,
    /// Trigger held
    pub fire: bool,
    /// Weapon cycle step (0 = keep)
    pub cycle_weapon: i32,
}

/// Player-side controller state.
#[derive(Clone, Debug, Default)]
pub struct PlayerController {
    /// Input applied on the next update
    pub intent: PlayerIntent,
    /// Player-vs-player kills
    pub kills: u32,
    /// Deaths to other players
    pub deaths: u32,
    suspended_ai: Option<AiController>,
}

impl PlayerController {
    /// Fresh controller with no stats.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Map {
    /// Set the intent a player-controlled actor will act on next update.
    pub fn set_player_intent(&mut self, handle: ActorHandle, intent: PlayerIntent) -> bool {
        match self.resolve_mut(handle).and_then(|a| a.player_mut()) {
            Some(player) => {
                player.intent = intent;
                true
            }
            None => false,
        }
    }

    /// Put a fresh player controller on a possessable actor.
    ///
    /// Fails if the actor is stale, dead, not possessable, or already
    /// player-controlled.
    pub fn possess(&mut self, handle: ActorHandle) -> bool {
        self.install_player(handle, PlayerController::new())
    }

    /// Move the player controller from `from` onto `to`, keeping stats.
    pub fn transfer_possession(&mut self, from: ActorHandle, to: ActorHandle) -> bool {
        if from == to {
            return false;
        }
        let possessable = self
            .resolve(to)
            .is_some_and(|a| a.definition.can_be_possessed && a.is_alive() && !a.is_player_controlled());
        if !possessable {
            return false;
        }
        match self.unpossess(from) {
            Some(player) => self.install_player(to, player),
            None => false,
        }
    }

    /// Release a possessed actor, restoring any suspended AI.
    pub fn unpossess(&mut self, handle: ActorHandle) -> Option<PlayerController> {
        let actor = self.resolve_mut(handle)?;
        if !actor.is_player_controlled() {
            return None;
        }
        let Some(Controller::Player(mut player)) = actor.controller.take() else {
            return None;
        };
        actor.controller = player.suspended_ai.take().map(Controller::Ai);
        debug!(?handle, "Actor unpossessed");
        Some(player)
    }

    fn install_player(&mut self, handle: ActorHandle, mut player: PlayerController) -> bool {
        let Some(actor) = self.resolve_mut(handle) else {
            self.warn_stale(handle, "possess");
            return false;
        };
        if !actor.definition.can_be_possessed || actor.is_dead || actor.is_player_controlled() {
            return false;
        }
        player.suspended_ai = match actor.controller.take() {
            Some(Controller::Ai(ai)) => Some(ai),
            _ => None,
        };
        player.intent = PlayerIntent { aim: actor.orientation, ..Default::default() };
        actor.controller = Some(Controller::Player(player));
        debug!(?handle, "Actor possessed");
        true
    }

    /// Apply a player's intent to its actor for one tick.
    pub(crate) fn update_player(
        &mut self,
        handle: ActorHandle,
        rng: &mut dyn RandomSource,
    ) -> Result<(), SpawnError> {
        let Some(actor) = self.resolve_mut(handle) else {
            return Ok(());
        };
        if actor.is_dead {
            return Ok(());
        }
        let Some(intent) = actor.player().map(|p| p.intent) else {
            return Ok(());
        };

        actor.orientation = intent.aim;
        actor.cycle_weapon(intent.cycle_weapon);
        if let Some(player) = actor.player_mut() {
            player.intent.cycle_weapon = 0;
        }

        let movement = intent.movement.clamp_length_max(1.0);
        if movement != Vec2::ZERO {
            let forward = EulerAngles::from_yaw(actor.orientation.yaw).forward();
            let left = Vec3::new(-forward.y, forward.x, 0.0);
            let direction = forward * movement.x + left * movement.y;
            let physics = &actor.definition.physics;
            let speed = if intent.run { physics.run_speed } else { physics.walk_speed } * movement.length();
            actor.move_in_direction(direction, speed);
        }

        if intent.fire {
            self.attack(handle, rng)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::DeterministicRng;
    use crate::game::testing;

    #[test]
    fn test_possess_suspends_and_restores_ai() {
        let mut map = testing::open_map(5, 5);
        let imp = map.spawn(&testing::at(testing::IMP, 1.0, 1.0)).unwrap();

        assert!(map.possess(imp));
        assert!(map.resolve(imp).unwrap().is_player_controlled());
        assert!(!map.possess(imp));

        let player = map.unpossess(imp).unwrap();
        assert_eq!(player.kills, 0);
        assert!(matches!(map.resolve(imp).unwrap().controller, Some(Controller::Ai(_))));
    }

    #[test]
    fn test_cannot_possess_unpossessable() {
        let mut map = testing::open_map(5, 5);
        let dummy = map.spawn(&testing::at(testing::DUMMY, 1.0, 1.0)).unwrap();
        assert!(!map.possess(dummy));
        assert!(!map.possess(ActorHandle::INVALID));
    }

    #[test]
    fn test_transfer_keeps_stats() {
        let mut map = testing::open_map(5, 5);
        let a = map.spawn(&testing::at(testing::MARINE, 1.0, 1.0)).unwrap();
        let b = map.spawn(&testing::at(testing::IMP, 3.0, 1.0)).unwrap();
        map.possess(a);
        map.resolve_mut(a).unwrap().player_mut().unwrap().kills = 4;

        assert!(map.transfer_possession(a, b));
        assert!(map.resolve(a).unwrap().controller.is_none());
        assert_eq!(map.resolve(b).unwrap().player().unwrap().kills, 4);
    }

    #[test]
    fn test_player_move_intent_pushes_forward() {
        let mut map = testing::open_map(5, 5);
        let mut rng = DeterministicRng::new(1);
        let a = map.spawn(&testing::at(testing::MARINE, 1.0, 1.0)).unwrap();
        map.possess(a);
        map.set_player_intent(
            a,
            PlayerIntent {
                movement: Vec2::new(1.0, 0.0),
                run: true,
                aim: EulerAngles::from_yaw(90.0),
                ..Default::default()
            },
        );

        map.update_player(a, &mut rng).unwrap();
        let actor = map.resolve(a).unwrap();
        assert_eq!(actor.orientation.yaw, 90.0);
        assert!(actor.acceleration.y > 0.0);
        assert!(actor.acceleration.x.abs() < 1e-4);
    }

    #[test]
    fn test_player_fire_intent_shoots() {
        let mut map = testing::open_map(8, 3);
        let mut rng = DeterministicRng::new(1);
        let a = map.spawn(&testing::at(testing::MARINE, 1.0, 1.5)).unwrap();
        map.possess(a);
        map.set_player_intent(a, PlayerIntent { fire: true, ..Default::default() });

        // Fresh refire timer has no banked period yet
        map.resolve_mut(a).unwrap().refire_timer.advance(0.5);
        map.update_player(a, &mut rng).unwrap();
        assert_eq!(map.resolve(a).unwrap().weapons[0].rounds_in_mag, 9);
    }
}
