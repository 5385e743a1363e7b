//! Weapon Resolution
//!
//! Each weapon instance runs a small phase machine:
//!
//! ```text
//!   Ready ──(magazine empty, reserve left)──▶ Reloading ──(reload_time)──▶ Ready
//!   Ready ──(heat reaches max)──────────────▶ OverheatCooldown ──(cooldown_time)──▶ Ready
//! ```
//!
//! Firing is gated twice: the wielder's refire timer decides how many shots
//! are due, the ammo model decides whether a ranged shot is possible. When
//! the ranged gate fails a melee component swings instead.

use std::sync::Arc;

use glam::Vec3;
use tracing::debug;

use crate::core::math::EulerAngles;
use crate::core::rng::RandomSource;
use crate::core::timer::Timer;
use crate::game::definitions::{AmmoModel, MeleeFire, ProjectileFire, RayFire, SpawnInfo, WeaponDefinition};
use crate::game::events::GameEventData;
use crate::game::handle::ActorHandle;
use crate::game::map::{Map, SpawnError};

/// Height fraction projectiles launch from.
const MUZZLE_HEIGHT_FRACTION: f32 = 0.7;

/// Forward offset of the projectile launch point.
const MUZZLE_FORWARD_OFFSET: f32 = 0.3;

/// Where a weapon is in its ammo cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum WeaponPhase {
    /// Can fire if the ammo model allows
    #[default]
    Ready,
    /// Moving reserve rounds into the magazine
    Reloading(Timer),
    /// Locked out until heat resets
    OverheatCooldown(Timer),
}

/// Phase change reported by [`Weapon::update`] or [`Weapon::consume_shot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeaponTransition {
    /// Empty magazine began refilling
    ReloadStarted,
    /// Magazine refilled from reserve
    ReloadFinished,
    /// Heat reached its cap
    OverheatStarted,
    /// Heat reset after cooling down
    CooldownFinished,
}

impl WeaponTransition {
    fn event(self, actor: ActorHandle, weapon: String) -> GameEventData {
        match self {
            WeaponTransition::ReloadStarted => GameEventData::ReloadStarted { actor, weapon },
            WeaponTransition::ReloadFinished => GameEventData::ReloadFinished { actor, weapon },
            WeaponTransition::OverheatStarted => GameEventData::OverheatStarted { actor, weapon },
            WeaponTransition::CooldownFinished => GameEventData::CooldownFinished { actor, weapon },
        }
    }
}

/// One weapon in an actor's inventory.
#[derive(Clone, Debug)]
pub struct Weapon {
    /// Immutable stats
    pub definition: Arc<WeaponDefinition>,
    /// Rounds ready to fire
    pub rounds_in_mag: u32,
    /// Reserve rounds
    pub rounds_in_bag: u32,
    /// Current heat
    pub heat: f32,
    /// Ammo cycle phase
    pub phase: WeaponPhase,
}

impl Weapon {
    /// Fresh weapon: full magazine plus one magazine of reserve.
    pub fn new(definition: Arc<WeaponDefinition>) -> Self {
        let size = match definition.ammo {
            AmmoModel::Magazine { size, .. } => size,
            _ => 0,
        };
        Self { definition, rounds_in_mag: size, rounds_in_bag: size, heat: 0.0, phase: WeaponPhase::Ready }
    }

    /// Definition name.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Whether the ammo model allows a ranged shot right now.
    pub fn can_fire_ranged(&self) -> bool {
        if self.phase != WeaponPhase::Ready {
            return false;
        }
        match self.definition.ammo {
            AmmoModel::Unlimited => true,
            AmmoModel::Magazine { .. } => self.rounds_in_mag > 0,
            AmmoModel::Heat { max_heat, .. } => self.heat < max_heat,
        }
    }

    /// Spend one ranged shot. Call only after [`Self::can_fire_ranged`].
    pub fn consume_shot(&mut self) -> Option<WeaponTransition> {
        match self.definition.ammo {
            AmmoModel::Unlimited => None,
            AmmoModel::Magazine { .. } => {
                self.rounds_in_mag = self.rounds_in_mag.saturating_sub(1);
                None
            }
            AmmoModel::Heat { heat_per_shot, max_heat, cooldown_time } => {
                self.heat = (self.heat + heat_per_shot).min(max_heat);
                if self.heat >= max_heat {
                    self.phase = WeaponPhase::OverheatCooldown(Timer::started(cooldown_time));
                    Some(WeaponTransition::OverheatStarted)
                } else {
                    None
                }
            }
        }
    }

    /// Advance reload, cooldown and heat decay by `dt` seconds.
    pub fn update(&mut self, dt: f32) -> Option<WeaponTransition> {
        match &mut self.phase {
            WeaponPhase::Reloading(timer) => {
                timer.advance(dt);
                if timer.has_period_elapsed() {
                    self.finish_reload();
                    self.phase = WeaponPhase::Ready;
                    return Some(WeaponTransition::ReloadFinished);
                }
                None
            }
            WeaponPhase::OverheatCooldown(timer) => {
                timer.advance(dt);
                if timer.has_period_elapsed() {
                    self.heat = 0.0;
                    self.phase = WeaponPhase::Ready;
                    return Some(WeaponTransition::CooldownFinished);
                }
                None
            }
            WeaponPhase::Ready => match self.definition.ammo {
                AmmoModel::Magazine { reload_time, .. } if self.rounds_in_mag == 0 && self.rounds_in_bag > 0 => {
                    self.phase = WeaponPhase::Reloading(Timer::started(reload_time));
                    Some(WeaponTransition::ReloadStarted)
                }
                AmmoModel::Heat { max_heat, cooldown_time, .. } if cooldown_time > 0.0 => {
                    self.heat = (self.heat - max_heat / cooldown_time * dt).max(0.0);
                    None
                }
                _ => None,
            },
        }
    }

    /// Move reserve rounds into the magazine, up to capacity.
    fn finish_reload(&mut self) {
        if let AmmoModel::Magazine { size, .. } = self.definition.ammo {
            let moved = size.saturating_sub(self.rounds_in_mag).min(self.rounds_in_bag);
            self.rounds_in_mag += moved;
            self.rounds_in_bag -= moved;
        }
    }

    /// Add reserve rounds to a magazine weapon. Returns false for other models.
    pub fn add_reserve(&mut self, rounds: u32) -> bool {
        match self.definition.ammo {
            AmmoModel::Magazine { .. } => {
                self.rounds_in_bag = self.rounds_in_bag.saturating_add(rounds);
                true
            }
            _ => false,
        }
    }

    /// Magazine capacity, or 0 for non-magazine weapons.
    pub fn magazine_size(&self) -> u32 {
        match self.definition.ammo {
            AmmoModel::Magazine { size, .. } => size,
            _ => 0,
        }
    }
}

/// Perturb `aim` by independent uniform yaw and pitch offsets within
/// half the cone, and return the resulting direction.
pub fn random_direction_in_cone(aim: EulerAngles, cone_degrees: f32, rng: &mut dyn RandomSource) -> EulerAngles {
    if cone_degrees <= 0.0 {
        return aim;
    }
    let half = cone_degrees * 0.5;
    let yaw = aim.yaw + rng.float_in_range(-half, half);
    let pitch = aim.pitch + rng.float_in_range(-half, half);
    EulerAngles::new(yaw, pitch, aim.roll)
}

impl Map {
    /// Fire the equipped weapon once per elapsed refire period.
    ///
    /// Marks the actor as having attacked this tick. A period of zero or
    /// less fires exactly once. Returns the number of shots resolved.
    pub fn attack(&mut self, handle: ActorHandle, rng: &mut dyn RandomSource) -> Result<u32, SpawnError> {
        let Some(actor) = self.resolve_mut(handle) else {
            return Ok(0);
        };
        if actor.is_dead {
            return Ok(0);
        }
        actor.attacked_this_tick = true;
        if actor.equipped_weapon().is_none() {
            return Ok(0);
        }

        let shots = if actor.refire_timer.period <= 0.0 {
            1
        } else {
            let mut due = 0;
            while actor.refire_timer.decrement_period_if_elapsed() {
                due += 1;
            }
            due
        };

        for _ in 0..shots {
            self.fire_weapon(handle, rng)?;
        }
        Ok(shots)
    }

    /// Resolve one shot: ranged if the ammo gate passes, else melee.
    fn fire_weapon(&mut self, handle: ActorHandle, rng: &mut dyn RandomSource) -> Result<(), SpawnError> {
        let Some(actor) = self.resolve_mut(handle) else {
            return Ok(());
        };
        if actor.is_dead {
            return Ok(());
        }
        let Some(weapon) = actor.equipped_weapon_mut() else {
            return Ok(());
        };
        let definition = weapon.definition.clone();

        if definition.has_ranged() && weapon.can_fire_ranged() {
            let transition = weapon.consume_shot();
            self.push_event(GameEventData::WeaponFired {
                actor: handle,
                weapon: definition.name.clone(),
                melee: false,
            });
            if let Some(transition) = transition {
                debug!(actor = ?handle, weapon = %definition.name, "Weapon overheated");
                self.push_event(transition.event(handle, definition.name.clone()));
            }
            if let Some(ray) = &definition.ray {
                self.fire_rays(handle, ray, rng)?;
            }
            if let Some(projectile) = &definition.projectile {
                self.fire_projectiles(handle, projectile, rng)?;
            }
        } else if let Some(melee) = &definition.melee {
            self.push_event(GameEventData::WeaponFired {
                actor: handle,
                weapon: definition.name.clone(),
                melee: true,
            });
            self.fire_melee(handle, melee, rng)?;
        }
        Ok(())
    }

    fn fire_rays(&mut self, handle: ActorHandle, ray: &RayFire, rng: &mut dyn RandomSource) -> Result<(), SpawnError> {
        for _ in 0..ray.count {
            let Some(shooter) = self.resolve(handle) else {
                return Ok(());
            };
            let eye = shooter.eye_position();
            let aim = shooter.orientation;
            let push = shooter.forward() * ray.impulse;

            let direction = random_direction_in_cone(aim, ray.cone, rng).forward();
            let result = self.raycast_all(eye, direction, ray.range, Some(handle));

            let effect = if let Some(target) = result.hit_actor {
                let damage = ray.damage.roll(rng);
                self.apply_damage(target, Some(handle), damage, rng)?;
                self.apply_impulse(target, push);
                ray.actor_hit_effect.as_ref()
            } else if result.did_impact {
                ray.world_hit_effect.as_ref()
            } else {
                None
            };

            if let Some(effect) = effect {
                let info = SpawnInfo::new(effect.clone(), result.impact_point)
                    .with_orientation(EulerAngles::looking_along(result.impact_normal));
                self.spawn(&info)?;
            }
        }
        Ok(())
    }

    fn fire_projectiles(
        &mut self,
        handle: ActorHandle,
        projectile: &ProjectileFire,
        rng: &mut dyn RandomSource,
    ) -> Result<(), SpawnError> {
        for _ in 0..projectile.count {
            let Some(shooter) = self.resolve(handle) else {
                return Ok(());
            };
            let muzzle = shooter.position
                + Vec3::new(0.0, 0.0, MUZZLE_HEIGHT_FRACTION * shooter.height())
                + shooter.forward() * MUZZLE_FORWARD_OFFSET;
            let aim = random_direction_in_cone(shooter.orientation, projectile.cone, rng);

            let info = SpawnInfo::new(projectile.actor.clone(), muzzle)
                .with_orientation(aim)
                .with_velocity(aim.forward() * projectile.speed);
            let spawned = self.spawn(&info)?;
            if let Some(bolt) = self.resolve_mut(spawned) {
                bolt.owner = Some(handle);
            }
        }
        Ok(())
    }

    fn fire_melee(&mut self, handle: ActorHandle, melee: &MeleeFire, rng: &mut dyn RandomSource) -> Result<(), SpawnError> {
        let Some(wielder) = self.resolve(handle) else {
            return Ok(());
        };
        let faction = wielder.faction();
        let push = wielder.forward() * melee.impulse;

        for target in self.actors_in_sector(handle, melee.arc, melee.range) {
            let opposing = self.resolve(target).is_some_and(|t| t.faction() != faction);
            if !opposing {
                continue;
            }
            let damage: f32 = (0..melee.count).map(|_| melee.damage.roll(rng)).sum();
            self.apply_damage(target, Some(handle), damage, rng)?;
            self.apply_impulse(target, push);
        }
        Ok(())
    }

    /// Advance every weapon an actor carries and queue phase-change events.
    pub(crate) fn update_weapons(&mut self, handle: ActorHandle, dt: f32) {
        let Some(actor) = self.resolve_mut(handle) else {
            return;
        };
        let transitions: Vec<(WeaponTransition, String)> = actor
            .weapons
            .iter_mut()
            .filter_map(|w| w.update(dt).map(|t| (t, w.name().to_owned())))
            .collect();

        for (transition, weapon) in transitions {
            debug!(actor = ?handle, %weapon, ?transition, "Weapon phase changed");
            self.push_event(transition.event(handle, weapon));
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
