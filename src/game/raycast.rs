//! Spatial Queries
//!
//! Three ray primitives and their combination:
//!
//! - **Grid (XY)**: DDA walk across tile boundaries, one axis step at a time
//! - **Z planes**: floor at z = 0 and ceiling at the map's ceiling height
//! - **Actors**: vertical cylinders of every living actor except the owner
//!
//! `raycast_all` keeps the grid result unless a plane hit is strictly
//! nearer, then replaces that with an actor hit if strictly nearer. Only an
//! actor win reports `hit_actor`.
//!
//! Vision and sector queries live here too since they are built on the
//! same geometry.

use glam::{Vec2, Vec3};
#[cfg(feature = "debug-tracing")]
use tracing::trace;

use crate::core::math::is_point_inside_directed_sector_2d;
use crate::core::rng::RandomSource;
use crate::game::grid::TileGrid;
use crate::game::handle::ActorHandle;
use crate::game::map::Map;

/// Outcome of a ray query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastResult {
    /// Something was hit
    pub did_impact: bool,
    /// Ray origin
    pub start: Vec3,
    /// Unit direction
    pub direction: Vec3,
    /// Requested length
    pub max_distance: f32,
    /// Hit point, or the ray end on a miss
    pub impact_point: Vec3,
    /// Surface normal at the hit, zero on a miss
    pub impact_normal: Vec3,
    /// Distance to the hit, or `max_distance` on a miss
    pub impact_distance: f32,
    /// Actor hit, when an actor was the nearest impact
    pub hit_actor: Option<ActorHandle>,
}

impl RaycastResult {
    /// Non-impacting result reaching the full length.
    pub fn miss(start: Vec3, direction: Vec3, max_distance: f32) -> Self {
        Self {
            did_impact: false,
            start,
            direction,
            max_distance,
            impact_point: start + direction * max_distance,
            impact_normal: Vec3::ZERO,
            impact_distance: max_distance,
            hit_actor: None,
        }
    }

    fn hit(start: Vec3, direction: Vec3, max_distance: f32, distance: f32, normal: Vec3) -> Self {
        Self {
            did_impact: true,
            start,
            direction,
            max_distance,
            impact_point: start + direction * distance,
            impact_normal: normal,
            impact_distance: distance,
            hit_actor: None,
        }
    }

    /// Whether `self` is an impact strictly nearer than `other`.
    fn beats(&self, other: &Self) -> bool {
        self.did_impact && (!other.did_impact || self.impact_distance < other.impact_distance)
    }
}

/// Ray against a vertical cylinder. Returns hit distance and normal.
///
/// A start inside the cylinder hits at distance 0 facing back along the ray.
pub fn raycast_vs_cylinder_z(
    start: Vec3,
    direction: Vec3,
    max_distance: f32,
    center: Vec2,
    z_range: (f32, f32),
    radius: f32,
) -> Option<(f32, Vec3)> {
    let (z_min, z_max) = z_range;
    let offset = start.truncate() - center;
    let radius_sq = radius * radius;
    let inside_disc = offset.length_squared() < radius_sq;

    if inside_disc && start.z >= z_min && start.z <= z_max {
        return Some((0.0, -direction));
    }

    let mut best: Option<(f32, Vec3)> = None;

    // Cap facing the ray
    if direction.z != 0.0 {
        let (plane_z, normal) = if direction.z > 0.0 { (z_min, Vec3::NEG_Z) } else { (z_max, Vec3::Z) };
        let t = (plane_z - start.z) / direction.z;
        if (0.0..=max_distance).contains(&t) {
            let point = start + direction * t;
            if (point.truncate() - center).length_squared() <= radius_sq {
                best = Some((t, normal));
            }
        }
    }

    // Side, only when starting outside the disc
    let planar = direction.truncate();
    let a = planar.length_squared();
    if a > 0.0 && !inside_disc {
        let b = 2.0 * offset.dot(planar);
        let c = offset.length_squared() - radius_sq;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant >= 0.0 {
            let t = (-b - discriminant.sqrt()) / (2.0 * a);
            if (0.0..=max_distance).contains(&t) {
                let point = start + direction * t;
                if point.z >= z_min && point.z <= z_max && best.map_or(true, |(bt, _)| t < bt) {
                    let normal = ((point.truncate() - center) / radius).extend(0.0);
                    best = Some((t, normal));
                }
            }
        }
    }

    best
}

impl Map {
    /// DDA walk across the tile grid.
    ///
    /// `direction` must be unit length. Out-of-bounds starts never impact;
    /// cells off the grid are open.
    pub fn raycast_world_xy(&self, start: Vec3, direction: Vec3, max_distance: f32) -> RaycastResult {
        let grid = self.grid();
        let miss = RaycastResult::miss(start, direction, max_distance);

        if !grid.is_in_bounds(start.truncate()) {
            return miss;
        }

        let mut cell = TileGrid::coords_of(start.truncate());
        if grid.is_solid(cell) {
            return RaycastResult::hit(start, direction, max_distance, 0.0, -direction);
        }

        let ray = direction * max_distance;
        if ray.x == 0.0 && ray.y == 0.0 {
            return miss;
        }

        let step_x: i32 = if ray.x > 0.0 { 1 } else if ray.x < 0.0 { -1 } else { 0 };
        let step_y: i32 = if ray.y > 0.0 { 1 } else if ray.y < 0.0 { -1 } else { 0 };

        let t_delta_x = if step_x != 0 { 1.0 / ray.x.abs() } else { f32::INFINITY };
        let t_delta_y = if step_y != 0 { 1.0 / ray.y.abs() } else { f32::INFINITY };

        let mut t_max_x = match step_x {
            1 => (cell.x as f32 + 1.0 - start.x) * t_delta_x,
            -1 => (start.x - cell.x as f32) * t_delta_x,
            _ => f32::INFINITY,
        };
        let mut t_max_y = match step_y {
            1 => (cell.y as f32 + 1.0 - start.y) * t_delta_y,
            -1 => (start.y - cell.y as f32) * t_delta_y,
            _ => f32::INFINITY,
        };

        while t_max_x <= 1.0 || t_max_y <= 1.0 {
            let (t, normal) = if t_max_x < t_max_y {
                cell.x += step_x;
                let t = t_max_x;
                t_max_x += t_delta_x;
                (t, Vec3::new(-step_x as f32, 0.0, 0.0))
            } else {
                cell.y += step_y;
                let t = t_max_y;
                t_max_y += t_delta_y;
                (t, Vec3::new(0.0, -step_y as f32, 0.0))
            };

            if grid.is_solid(cell) {
                return RaycastResult::hit(start, direction, max_distance, t * max_distance, normal);
            }

            // Left the grid and heading further away
            let leaving_x = (cell.x < 0 && step_x <= 0) || (cell.x >= grid.width() && step_x >= 0);
            let leaving_y = (cell.y < 0 && step_y <= 0) || (cell.y >= grid.height() && step_y >= 0);
            if leaving_x || leaving_y {
                break;
            }
        }

        miss
    }

    /// Ray against the floor (descending) or ceiling (ascending).
    pub fn raycast_world_z(&self, start: Vec3, direction: Vec3, max_distance: f32) -> RaycastResult {
        let miss = RaycastResult::miss(start, direction, max_distance);
        if direction.z == 0.0 || max_distance <= 0.0 {
            return miss;
        }

        let (plane_z, normal) = if direction.z > 0.0 {
            (self.grid().ceiling_height(), Vec3::NEG_Z)
        } else {
            (0.0, Vec3::Z)
        };

        let t = (plane_z - start.z) / (direction.z * max_distance);
        if !(0.0..=1.0).contains(&t) {
            return miss;
        }

        let distance = t * max_distance;
        let point = start + direction * distance;
        if !self.grid().is_in_bounds(point.truncate()) {
            return miss;
        }
        RaycastResult::hit(start, direction, max_distance, distance, normal)
    }

    /// Ray against every living actor's cylinder except `owner`.
    pub fn raycast_actors(
        &self,
        start: Vec3,
        direction: Vec3,
        max_distance: f32,
        owner: Option<ActorHandle>,
    ) -> RaycastResult {
        let mut best = RaycastResult::miss(start, direction, max_distance);

        for actor in self.actors() {
            if Some(actor.handle) == owner || actor.is_dead {
                continue;
            }
            let hit = raycast_vs_cylinder_z(
                start,
                direction,
                max_distance,
                actor.position.truncate(),
                actor.z_range(),
                actor.radius(),
            );
            if let Some((distance, normal)) = hit {
                if !best.did_impact || distance < best.impact_distance {
                    best = RaycastResult::hit(start, direction, max_distance, distance, normal);
                    best.hit_actor = Some(actor.handle);
                }
            }
        }

        best
    }

    /// Nearest impact among grid, planes and actors.
    ///
    /// `direction` is normalized here; a zero direction or zero length
    /// returns a miss at the origin.
    pub fn raycast_all(
        &self,
        start: Vec3,
        direction: Vec3,
        max_distance: f32,
        owner: Option<ActorHandle>,
    ) -> RaycastResult {
        let direction = direction.normalize_or_zero();
        if max_distance <= 0.0 || direction == Vec3::ZERO {
            return RaycastResult::miss(start, direction, 0.0);
        }

        let mut result = self.raycast_world_xy(start, direction, max_distance);

        let plane = self.raycast_world_z(start, direction, max_distance);
        if plane.beats(&result) {
            result = plane;
        }

        let actors = self.raycast_actors(start, direction, max_distance, owner);
        if actors.beats(&result) {
            result = actors;
        } else {
            result.hit_actor = None;
        }

        #[cfg(feature = "debug-tracing")]
        trace!(?start, ?direction, max_distance, hit = result.did_impact, distance = result.impact_distance, actor = ?result.hit_actor, "raycast");

        result
    }

    /// Whether `observer` can see `candidate`: inside its vision cone and
    /// sight radius, with the first thing along the sight line being the
    /// candidate itself.
    pub fn is_visible(&self, observer: ActorHandle, candidate: ActorHandle) -> bool {
        self.visibility_distance(observer, candidate).is_some()
    }

    /// Sight-line distance to `candidate` when visible.
    fn visibility_distance(&self, observer: ActorHandle, candidate: ActorHandle) -> Option<f32> {
        if observer == candidate {
            return None;
        }
        let watcher = self.resolve(observer)?;
        let target = self.resolve(candidate)?;
        let ai = watcher.definition.ai.as_ref()?;

        let eye = watcher.eye_position();
        let aim = target.midpoint();

        // Cheap rejection before any ray work
        if !is_point_inside_directed_sector_2d(
            aim.truncate(),
            eye.truncate(),
            watcher.orientation.yaw,
            ai.sight_angle,
            ai.sight_radius,
        ) {
            return None;
        }

        let result = self.raycast_all(eye, aim - eye, ai.sight_radius, Some(observer));
        (result.hit_actor == Some(candidate)).then_some(result.impact_distance)
    }

    /// Nearest visible hostile for an AI observer.
    ///
    /// Candidates are living, visible, non-pickup actors of a different,
    /// non-neutral faction. Exact distance ties are broken at random.
    pub fn closest_visible_enemy(&self, observer: ActorHandle, rng: &mut dyn RandomSource) -> Option<ActorHandle> {
        let watcher = self.resolve(observer)?;
        if !watcher.definition.ai_enabled() {
            return None;
        }
        let faction = watcher.faction();

        let mut best: Option<f32> = None;
        let mut tied: Vec<ActorHandle> = Vec::new();

        for candidate in self.actors() {
            let def = &candidate.definition;
            if candidate.handle == observer
                || candidate.is_dead
                || !def.visible
                || def.is_pickup()
                || !faction.is_hostile_to(candidate.faction())
            {
                continue;
            }
            let Some(distance) = self.visibility_distance(observer, candidate.handle) else {
                continue;
            };
            match best {
                Some(b) if distance > b => {}
                Some(b) if distance == b => tied.push(candidate.handle),
                _ => {
                    best = Some(distance);
                    tied.clear();
                    tied.push(candidate.handle);
                }
            }
        }

        match tied.len() {
            0 => None,
            1 => Some(tied[0]),
            n => Some(tied[rng.int_in_range(0, n as i32 - 1) as usize]),
        }
    }

    /// Other actors whose position lies in `actor`'s forward planar sector.
    ///
    /// No occlusion test; walls do not block.
    pub fn actors_in_sector(&self, actor: ActorHandle, arc_degrees: f32, radius: f32) -> Vec<ActorHandle> {
        let Some(source) = self.resolve(actor) else {
            return Vec::new();
        };
        let apex = source.position.truncate();
        let yaw = source.orientation.yaw;

        self.actors()
            .filter(|other| other.handle != actor)
            .filter(|other| is_point_inside_directed_sector_2d(other.position.truncate(), apex, yaw, arc_degrees, radius))
            .map(|other| other.handle)
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
