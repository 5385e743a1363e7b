//! Actor State
//!
//! Per-actor kinematics, health and inventory. Actors never hold references
//! to each other; cross-actor relationships (owner, AI target) are handles
//! resolved through the map on every use.

use std::sync::Arc;

use glam::Vec3;

use crate::core::math::{turned_toward, EulerAngles};
use crate::core::timer::Timer;
use crate::game::controller::{Controller, PlayerController};
use crate::game::definitions::{ActorDefinition, Faction, SpawnInfo};
use crate::game::handle::ActorHandle;
use crate::game::weapon::Weapon;

/// A live entity in a map slot.
#[derive(Clone, Debug)]
pub struct Actor {
    /// Handle this actor was spawned under
    pub handle: ActorHandle,
    /// Immutable stat block
    pub definition: Arc<ActorDefinition>,

    /// Feet position
    pub position: Vec3,
    /// Velocity (units/s)
    pub velocity: Vec3,
    /// Accumulated acceleration, cleared after integration
    pub acceleration: Vec3,
    /// Facing
    pub orientation: EulerAngles,

    /// Remaining health
    pub health: f32,
    /// Health reached zero or death was forced
    pub is_dead: bool,
    /// Ready to be swept
    pub is_expired: bool,
    /// Touched something during the last collision passes
    pub did_collide: bool,

    /// Launcher of this actor (projectiles)
    pub owner: Option<ActorHandle>,
    /// AI or player control
    pub controller: Option<Controller>,

    /// Weapon inventory
    pub weapons: Vec<Weapon>,
    /// Index into `weapons`
    pub equipped: Option<usize>,
    /// Gates repeated fire of the equipped weapon
    pub refire_timer: Timer,
    /// Runs from death until expiry
    pub corpse_timer: Timer,

    pub(crate) attacked_this_tick: bool,
}

impl Actor {
    /// Build a fresh actor from its definition and spawn transform.
    pub fn new(handle: ActorHandle, definition: Arc<ActorDefinition>, info: &SpawnInfo, weapons: Vec<Weapon>) -> Self {
        let equipped = if weapons.is_empty() { None } else { Some(0) };
        let refire_period = weapons.first().map_or(0.0, |w| w.definition.refire_time);

        Self {
            handle,
            position: info.position,
            velocity: info.velocity,
            acceleration: Vec3::ZERO,
            orientation: info.orientation,
            health: definition.health,
            is_dead: false,
            is_expired: false,
            did_collide: false,
            owner: None,
            controller: None,
            weapons,
            equipped,
            refire_timer: Timer::started(refire_period),
            corpse_timer: Timer::new(definition.corpse_lifetime),
            attacked_this_tick: false,
            definition,
        }
    }

    // =========================================================================
    // Definition accessors
    // =========================================================================

    /// Cylinder radius.
    pub fn radius(&self) -> f32 {
        self.definition.collision.radius
    }

    /// Cylinder height.
    pub fn height(&self) -> f32 {
        self.definition.collision.height
    }

    /// Allegiance.
    pub fn faction(&self) -> Faction {
        self.definition.faction
    }

    /// Unsimulated actors are never moved by physics or collision.
    pub fn is_static(&self) -> bool {
        !self.definition.physics.simulated
    }

    /// Whether this actor is a pickup.
    pub fn is_pickup(&self) -> bool {
        self.definition.is_pickup()
    }

    /// Alive means not dead; expired actors are also dead.
    pub fn is_alive(&self) -> bool {
        !self.is_dead
    }

    /// Whether a player currently controls this actor.
    pub fn is_player_controlled(&self) -> bool {
        matches!(self.controller, Some(Controller::Player(_)))
    }

    /// Player controller, if possessed.
    pub fn player(&self) -> Option<&PlayerController> {
        match &self.controller {
            Some(Controller::Player(p)) => Some(p),
            _ => None,
        }
    }

    /// Mutable player controller, if possessed.
    pub fn player_mut(&mut self) -> Option<&mut PlayerController> {
        match &mut self.controller {
            Some(Controller::Player(p)) => Some(p),
            _ => None,
        }
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// Point rays and vision checks start from.
    pub fn eye_position(&self) -> Vec3 {
        self.position + Vec3::new(0.0, 0.0, self.definition.eye_height)
    }

    /// Center of the collision cylinder.
    pub fn midpoint(&self) -> Vec3 {
        self.position + Vec3::new(0.0, 0.0, self.height() * 0.5)
    }

    /// Unit forward vector of the current facing.
    pub fn forward(&self) -> Vec3 {
        self.orientation.forward()
    }

    /// Vertical extent `[z, z + height]`.
    pub fn z_range(&self) -> (f32, f32) {
        (self.position.z, self.position.z + self.height())
    }

    // =========================================================================
    // Motion
    // =========================================================================

    /// Accumulate a force for this tick's integration.
    pub fn add_force(&mut self, force: Vec3) {
        self.acceleration += force;
    }

    /// Apply an instantaneous velocity change.
    pub fn add_impulse(&mut self, impulse: Vec3) {
        self.velocity += impulse;
    }

    /// Push toward `direction` with enough force to reach `speed` against drag.
    pub fn move_in_direction(&mut self, direction: Vec3, speed: f32) {
        let force = direction.normalize_or_zero() * speed * self.definition.physics.drag;
        self.add_force(force);
    }

    /// Rotate yaw toward `goal_yaw` by at most `max_delta` degrees.
    pub fn turn_toward(&mut self, goal_yaw: f32, max_delta: f32) {
        self.orientation.yaw = turned_toward(self.orientation.yaw, goal_yaw, max_delta);
    }

    /// Drag, velocity and position integration. Dead and static actors
    /// do not move.
    pub fn integrate(&mut self, dt: f32) {
        if self.is_dead || self.is_static() {
            self.acceleration = Vec3::ZERO;
            return;
        }

        let drag = self.definition.physics.drag;
        self.add_force(-self.velocity * drag);
        self.velocity += self.acceleration * dt;
        self.position += self.velocity * dt;
        self.acceleration = Vec3::ZERO;

        if !self.definition.physics.flying {
            self.position.z = 0.0;
        }
    }

    // =========================================================================
    // Weapons
    // =========================================================================

    /// Currently equipped weapon.
    pub fn equipped_weapon(&self) -> Option<&Weapon> {
        self.equipped.and_then(|i| self.weapons.get(i))
    }

    /// Currently equipped weapon, mutably.
    pub fn equipped_weapon_mut(&mut self) -> Option<&mut Weapon> {
        match self.equipped {
            Some(i) => self.weapons.get_mut(i),
            None => None,
        }
    }

    /// Step the equipped index by `step`, wrapping. Resets the refire timer
    /// to the new weapon's period.
    pub fn cycle_weapon(&mut self, step: i32) {
        let count = self.weapons.len() as i32;
        if count == 0 || step == 0 {
            return;
        }
        let current = self.equipped.unwrap_or(0) as i32;
        let next = (current + step).rem_euclid(count) as usize;
        self.equipped = Some(next);
        self.refire_timer = Timer::started(self.weapons[next].definition.refire_time);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Mark dead and start the corpse timer. Returns false if already dead.
    pub fn begin_death(&mut self) -> bool {
        if self.is_dead {
            return false;
        }
        self.is_dead = true;
        self.corpse_timer.start();
        true
    }

    /// Advance the corpse timer; flags expiry once it elapses.
    pub fn advance_corpse(&mut self, dt: f32) {
        self.corpse_timer.advance(dt);
        if self.corpse_timer.is_running() && self.corpse_timer.has_period_elapsed() {
            self.is_expired = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::testing;

    fn marine() -> Actor {
        let defs = testing::definitions();
        let def = defs.actor(testing::MARINE).unwrap().clone();
        let weapons = def
            .weapons
            .iter()
            .map(|w| Weapon::new(defs.weapon(w).unwrap().clone()))
            .collect();
        Actor::new(ActorHandle::new(0, 0), def, &SpawnInfo::new(testing::MARINE, Vec3::ONE), weapons)
    }

    #[test]
    fn test_new_actor_from_definition() {
        let actor = marine();
        assert_eq!(actor.health, actor.definition.health);
        assert!(actor.is_alive());
        assert!(!actor.is_static());
        assert_eq!(actor.equipped, Some(0));
        assert!(actor.refire_timer.is_running());
    }

    #[test]
    fn test_integrate_pins_walkers_to_floor() {
        let mut actor = marine();
        actor.position.z = 0.5;
        actor.velocity = Vec3::new(1.0, 0.0, 0.0);
        actor.integrate(0.1);
        assert_eq!(actor.position.z, 0.0);
        assert!(actor.position.x > 1.0);
        assert_eq!(actor.acceleration, Vec3::ZERO);
    }

    #[test]
    fn test_dead_actor_frozen() {
        let mut actor = marine();
        actor.velocity = Vec3::X;
        assert!(actor.begin_death());
        assert!(!actor.begin_death());
        let before = actor.position;
        actor.integrate(0.5);
        assert_eq!(actor.position, before);
    }

    #[test]
    fn test_corpse_expiry() {
        let mut actor = marine();
        actor.begin_death();
        let lifetime = actor.definition.corpse_lifetime;
        actor.advance_corpse(lifetime * 0.5);
        assert!(!actor.is_expired);
        actor.advance_corpse(lifetime);
        assert!(actor.is_expired);
    }

    #[test]
    fn test_cycle_weapon_wraps() {
        let mut actor = marine();
        let count = actor.weapons.len();
        assert!(count >= 2);
        actor.cycle_weapon(-1);
        assert_eq!(actor.equipped, Some(count - 1));
        actor.cycle_weapon(1);
        assert_eq!(actor.equipped, Some(0));
    }

    #[test]
    fn test_move_in_direction_scales_by_drag() {
        let mut actor = marine();
        actor.move_in_direction(Vec3::new(2.0, 0.0, 0.0), 3.0);
        let drag = actor.definition.physics.drag;
        assert!((actor.acceleration.x - 3.0 * drag).abs() < 1e-5);
    }
}
