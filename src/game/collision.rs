//! Collision Resolution
//!
//! Two passes per tick, each run once (no iteration to a fixed point):
//!
//! 1. Actor vs actor: every ordered pair of living actors that overlap
//!    vertically is separated in XY. Static actors never move.
//! 2. Actor vs world: discs are pushed out of solid neighbour tiles and
//!    clamped between floor and ceiling.
//!
//! Contacts feed the actor callbacks: pickups, collision damage and
//! impulse, die-on-collision.

use glam::IVec2;
use tracing::debug;

use crate::core::math::{push_disc_out_of_aabb_2d, push_disc_out_of_disc_2d, push_discs_out_of_each_other_2d};
use crate::core::rng::RandomSource;
use crate::game::definitions::PickupKind;
use crate::game::events::GameEventData;
use crate::game::grid::TileGrid;
use crate::game::handle::ActorHandle;
use crate::game::map::{Map, SpawnError};

/// Shaved off the top of each cylinder so stacked actors do not touch.
const VERTICAL_OVERLAP_MARGIN: f32 = 0.001;

/// Neighbour offsets checked by the world pass.
const NEIGHBOURS: [IVec2; 8] = [
    IVec2::new(0, 1),
    IVec2::new(0, -1),
    IVec2::new(-1, 0),
    IVec2::new(1, 0),
    IVec2::new(1, 1),
    IVec2::new(-1, 1),
    IVec2::new(-1, -1),
    IVec2::new(1, -1),
];

impl Map {
    /// Separate overlapping actor pairs and run contact callbacks.
    pub fn collide_actors(&mut self, rng: &mut dyn RandomSource) -> Result<(), SpawnError> {
        let handles = self.live_handles();
        for &a in &handles {
            for &b in &handles {
                if a != b && self.separate_pair(a, b) {
                    self.on_actor_contact(a, b, rng)?;
                    self.on_actor_contact(b, a, rng)?;
                }
            }
        }
        Ok(())
    }

    /// Push `a` and `b` apart if they overlap. Returns true if anything moved.
    fn separate_pair(&mut self, a: ActorHandle, b: ActorHandle) -> bool {
        let Some((first, second)) = self.pair_mut(a, b) else {
            return false;
        };
        if !first.definition.collision.collides_with_actors || !second.definition.collision.collides_with_actors {
            return false;
        }
        if first.is_dead || second.is_dead || first.owner == Some(b) || second.owner == Some(a) {
            return false;
        }

        let (first_min, first_max) = first.z_range();
        let (second_min, second_max) = second.z_range();
        let overlapping = first_min <= second_max - VERTICAL_OVERLAP_MARGIN
            && second_min <= first_max - VERTICAL_OVERLAP_MARGIN;
        if !overlapping {
            return false;
        }

        let mut first_xy = first.position.truncate();
        let mut second_xy = second.position.truncate();
        let (first_radius, second_radius) = (first.radius(), second.radius());

        let moved = match (first.is_static(), second.is_static()) {
            (true, true) => false,
            (true, false) => push_disc_out_of_disc_2d(&mut second_xy, second_radius, first_xy, first_radius),
            (false, true) => push_disc_out_of_disc_2d(&mut first_xy, first_radius, second_xy, second_radius),
            (false, false) => push_discs_out_of_each_other_2d(&mut first_xy, first_radius, &mut second_xy, second_radius),
        };

        first.position = first_xy.extend(first.position.z);
        second.position = second_xy.extend(second.position.z);
        moved
    }

    /// Contact callback for `actor` touching `other`.
    ///
    /// Pickups ignore contacts. A player-controlled actor consumes pickups it
    /// touches; any other contact applies the other actor's collision damage
    /// and impulse.
    pub fn on_actor_contact(
        &mut self,
        actor: ActorHandle,
        other: ActorHandle,
        rng: &mut dyn RandomSource,
    ) -> Result<(), SpawnError> {
        let Some(me) = self.resolve_mut(actor) else {
            return Ok(());
        };
        me.did_collide = true;
        if me.is_pickup() {
            return Ok(());
        }
        let is_player = me.is_player_controlled();
        let my_position = me.position;
        let dies = me.definition.collision.die_on_collision;

        let Some(them) = self.resolve(other) else {
            return Ok(());
        };

        if them.is_pickup() && is_player {
            if them.is_alive() {
                self.collect_pickup(actor, other);
            }
        } else {
            let damage = them.definition.collision.damage_on_collide;
            let impulse = them.definition.collision.impulse_on_collide;
            let away = (my_position - them.position).normalize_or_zero();

            if !damage.is_zero() {
                let amount = damage.roll(rng);
                if amount > 0.0 {
                    self.apply_damage(actor, Some(other), amount, rng)?;
                }
            }
            if impulse != 0.0 {
                self.apply_impulse(actor, away * impulse);
            }
        }

        if dies {
            self.kill(actor, None, rng)?;
        }
        Ok(())
    }

    fn collect_pickup(&mut self, collector: ActorHandle, pickup: ActorHandle) {
        let Some(kind) = self.resolve(pickup).and_then(|p| p.definition.pickup) else {
            return;
        };

        if let Some(actor) = self.resolve_mut(collector) {
            match kind {
                PickupKind::Ammo => {
                    for weapon in &mut actor.weapons {
                        let size = weapon.magazine_size();
                        weapon.add_reserve(size);
                    }
                }
            }
        }
        if let Some(item) = self.resolve_mut(pickup) {
            item.is_dead = true;
            item.is_expired = true;
        }

        debug!(?collector, ?pickup, ?kind, "Pickup collected");
        self.push_event(GameEventData::PickupCollected { actor: collector, pickup, kind });
    }

    /// Push actors out of solid tiles and clamp them between floor and ceiling.
    pub fn collide_actors_with_world(&mut self, rng: &mut dyn RandomSource) -> Result<(), SpawnError> {
        for handle in self.live_handles() {
            if self.push_out_of_world(handle) {
                self.on_world_contact(handle, rng)?;
            }
        }
        Ok(())
    }

    fn push_out_of_world(&mut self, handle: ActorHandle) -> bool {
        let grid = self.grid();
        let Some(actor) = self.resolve(handle) else {
            return false;
        };
        if !actor.definition.collision.collides_with_world || !grid.is_in_bounds(actor.position.truncate()) {
            return false;
        }

        let radius = actor.radius();
        let height = actor.height();
        let cell = TileGrid::coords_of(actor.position.truncate());
        let mut center = actor.position.truncate();
        let mut impacted = false;

        for offset in NEIGHBOURS {
            let tile = grid.tile_at(cell + offset);
            if tile.solid {
                let footprint = grid.tile_bounds(tile.coords).footprint();
                impacted |= push_disc_out_of_aabb_2d(&mut center, radius, &footprint);
            }
        }

        let mut z = actor.position.z;
        if z < 0.0 {
            z = 0.0;
            impacted = true;
        }
        let ceiling = grid.ceiling_height();
        if z + height > ceiling {
            z = ceiling - height;
            impacted = true;
        }

        if let Some(actor) = self.resolve_mut(handle) {
            actor.position = center.extend(z);
        }
        impacted
    }

    fn on_world_contact(&mut self, handle: ActorHandle, rng: &mut dyn RandomSource) -> Result<(), SpawnError> {
        let Some(actor) = self.resolve_mut(handle) else {
            return Ok(());
        };
        actor.did_collide = true;
        if actor.definition.collision.die_on_collision {
            self.kill(handle, None, rng)?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::DeterministicRng;
    use crate::game::ai::AiState;
    use crate::game::definitions::SpawnInfo;
    use crate::game::testing;
    use glam::{Vec2, Vec3};

    const EPS: f32 = 1e-4;

    #[test]
    fn test_static_pairs_never_move() {
        let mut map = testing::open_map(5, 5);
        let mut rng = DeterministicRng::new(1);
        let a = map.spawn(&testing::at(testing::DUMMY, 2.0, 2.0)).unwrap();
        let b = map.spawn(&testing::at(testing::DUMMY, 2.2, 2.0)).unwrap();

        map.collide_actors(&mut rng).unwrap();
        assert_eq!(map.resolve(a).unwrap().position, Vec3::new(2.0, 2.0, 0.0));
        assert_eq!(map.resolve(b).unwrap().position, Vec3::new(2.2, 2.0, 0.0));
        assert!(!map.resolve(a).unwrap().did_collide);
    }

    #[test]
    fn test_dynamic_pushed_off_static() {
        let mut map = testing::open_map(5, 5);
        let mut rng = DeterministicRng::new(1);
        let dummy = map.spawn(&testing::at(testing::DUMMY, 2.0, 2.0)).unwrap();
        let marine = map.spawn(&testing::at(testing::MARINE, 2.4, 2.0)).unwrap();

        map.collide_actors(&mut rng).unwrap();
        assert_eq!(map.resolve(dummy).unwrap().position.x, 2.0);
        assert!((map.resolve(marine).unwrap().position.x - 2.6).abs() < EPS);
        assert!(map.resolve(marine).unwrap().did_collide);
        assert!(map.resolve(dummy).unwrap().did_collide);
    }

    #[test]
    fn test_dynamic_pair_split_evenly() {
        let mut map = testing::open_map(5, 5);
        let mut rng = DeterministicRng::new(1);
        let a = map.spawn(&testing::at(testing::MARINE, 2.0, 2.0)).unwrap();
        let b = map.spawn(&testing::at(testing::MARINE, 2.4, 2.0)).unwrap();

        map.collide_actors(&mut rng).unwrap();
        assert!((map.resolve(a).unwrap().position.x - 1.9).abs() < EPS);
        assert!((map.resolve(b).unwrap().position.x - 2.5).abs() < EPS);
    }

    #[test]
    fn test_vertically_separated_do_not_collide() {
        let mut map = testing::open_map(5, 5);
        let mut rng = DeterministicRng::new(1);
        let marine = map.spawn(&testing::at(testing::MARINE, 2.0, 2.0)).unwrap();
        let bolt = map
            .spawn(&SpawnInfo::new(testing::BOLT, Vec3::new(2.0, 2.0, 0.9)))
            .unwrap();

        map.collide_actors(&mut rng).unwrap();
        assert!(map.resolve(bolt).unwrap().is_alive());
        assert_eq!(map.resolve(marine).unwrap().health, 100.0);
    }

    #[test]
    fn test_projectile_skips_owner() {
        let mut map = testing::open_map(5, 5);
        let mut rng = DeterministicRng::new(1);
        let marine = map.spawn(&testing::at(testing::MARINE, 2.0, 2.0)).unwrap();
        let bolt = map
            .spawn(&SpawnInfo::new(testing::BOLT, Vec3::new(2.1, 2.0, 0.5)))
            .unwrap();
        map.resolve_mut(bolt).unwrap().owner = Some(marine);

        map.collide_actors(&mut rng).unwrap();
        assert!(map.resolve(bolt).unwrap().is_alive());
        assert_eq!(map.resolve(bolt).unwrap().position.truncate(), Vec2::new(2.1, 2.0));
    }

    #[test]
    fn test_projectile_damages_and_dies() {
        let mut map = testing::open_map(5, 5);
        let mut rng = DeterministicRng::new(1);
        let marine = map.spawn(&testing::at(testing::MARINE, 0.5, 0.5)).unwrap();
        let imp = map.spawn(&testing::at(testing::IMP, 3.0, 3.0)).unwrap();
        let bolt = map
            .spawn(&SpawnInfo::new(testing::BOLT, Vec3::new(2.7, 3.0, 0.5)))
            .unwrap();
        map.resolve_mut(bolt).unwrap().owner = Some(marine);

        map.collide_actors(&mut rng).unwrap();

        let hit = map.resolve(imp).unwrap();
        assert_eq!(hit.health, 10.0);
        assert!(hit.velocity.x > 0.0);
        let ai = hit.controller.as_ref().unwrap().ai().unwrap();
        assert_eq!(ai.state(), AiState::Engaged(marine));
        assert!(map.resolve(bolt).unwrap().is_dead);
    }

    #[test]
    fn test_player_collects_ammo() {
        let mut map = testing::open_map(5, 5);
        let mut rng = DeterministicRng::new(1);
        let marine = map.spawn(&testing::at(testing::MARINE, 2.0, 2.0)).unwrap();
        let ammo = map.spawn(&testing::at(testing::AMMO, 2.3, 2.0)).unwrap();
        map.possess(marine);

        map.collide_actors(&mut rng).unwrap();

        let actor = map.resolve(marine).unwrap();
        assert_eq!(actor.weapons[0].rounds_in_bag, 20);
        assert_eq!(actor.weapons[1].rounds_in_bag, 0);
        let pickup = map.resolve(ammo).unwrap();
        assert!(pickup.is_dead && pickup.is_expired);

        let events = map.take_events();
        assert!(events
            .iter()
            .any(|e| matches!(e.data, GameEventData::PickupCollected { pickup, .. } if pickup == ammo)));
    }

    #[test]
    fn test_unpossessed_actor_ignores_ammo() {
        let mut map = testing::open_map(5, 5);
        let mut rng = DeterministicRng::new(1);
        let marine = map.spawn(&testing::at(testing::MARINE, 2.0, 2.0)).unwrap();
        let ammo = map.spawn(&testing::at(testing::AMMO, 2.3, 2.0)).unwrap();

        map.collide_actors(&mut rng).unwrap();
        assert_eq!(map.resolve(marine).unwrap().weapons[0].rounds_in_bag, 10);
        assert!(map.resolve(ammo).unwrap().is_alive());
    }

    #[test]
    fn test_pushed_out_of_wall() {
        let mut map = Map::from_definition(testing::definitions(), "Corridor").unwrap();
        let mut rng = DeterministicRng::new(1);
        let marine = map.live_handles()[0];
        map.resolve_mut(marine).unwrap().position = Vec3::new(1.1, 1.5, 0.0);

        map.collide_actors_with_world(&mut rng).unwrap();
        let actor = map.resolve(marine).unwrap();
        assert!((actor.position.x - 1.3).abs() < EPS);
        assert!(actor.did_collide);
    }

    #[test]
    fn test_clear_of_walls_untouched() {
        let mut map = testing::map_from(&["#####", "#...#", "#####"]);
        let mut rng = DeterministicRng::new(1);
        let marine = map.spawn(&testing::at(testing::MARINE, 2.5, 1.5)).unwrap();

        map.collide_actors_with_world(&mut rng).unwrap();
        let actor = map.resolve(marine).unwrap();
        assert_eq!(actor.position, Vec3::new(2.5, 1.5, 0.0));
        assert!(!actor.did_collide);
    }

    #[test]
    fn test_ceiling_clamp_kills_projectile() {
        let mut map = testing::open_map(5, 5);
        let mut rng = DeterministicRng::new(1);
        let bolt = map
            .spawn(&SpawnInfo::new(testing::BOLT, Vec3::new(2.5, 2.5, 0.99)))
            .unwrap();

        map.collide_actors_with_world(&mut rng).unwrap();
        let actor = map.resolve(bolt).unwrap();
        assert!((actor.position.z - (testing::CEILING - 0.05)).abs() < EPS);
        assert!(actor.is_dead);
    }

    #[test]
    fn test_floor_clamp() {
        let mut map = testing::open_map(5, 5);
        let mut rng = DeterministicRng::new(1);
        let bolt = map
            .spawn(&SpawnInfo::new(testing::BOLT, Vec3::new(2.5, 2.5, -0.2)))
            .unwrap();

        map.collide_actors_with_world(&mut rng).unwrap();
        assert_eq!(map.resolve(bolt).unwrap().position.z, 0.0);
    }
}
