//! Definition Tables
//!
//! Immutable stat blocks for actors, weapons, tiles and maps. Built once
//! from JSON, validated, and then shared by `Arc` for the lifetime of a
//! simulation. Lookups are by name; tables are `BTreeMap`s so iteration
//! order is stable.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::math::{EulerAngles, FloatRange};

/// Errors raised while building a [`DefinitionSet`].
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// JSON could not be parsed into the document shape.
    #[error("failed to parse definitions: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two definitions of the same kind share a name.
    #[error("duplicate {kind} definition '{name}'")]
    Duplicate {
        /// Table the duplicate was found in
        kind: &'static str,
        /// The repeated name
        name: String,
    },

    /// A definition names another definition that does not exist.
    #[error("'{owner}' references unknown {kind} '{name}'")]
    UnknownReference {
        /// Definition holding the reference
        owner: String,
        /// Table the reference points into
        kind: &'static str,
        /// The missing name
        name: String,
    },

    /// A map layout uses a glyph with no tile definition.
    #[error("map '{map}' uses unknown tile glyph '{glyph}'")]
    UnknownGlyph {
        /// Map name
        map: String,
        /// Offending glyph
        glyph: char,
    },

    /// Map rows differ in length.
    #[error("map '{map}' row {row} has a different width from row 0")]
    RaggedRows {
        /// Map name
        map: String,
        /// First mismatching row
        row: usize,
    },

    /// Map layout has no tiles.
    #[error("map '{0}' has no tiles")]
    EmptyMap(String),

    /// Requested map is not defined.
    #[error("unknown map '{0}'")]
    UnknownMap(String),
}

// =============================================================================
// ACTORS
// =============================================================================

/// Actor allegiance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Faction {
    /// Player side
    Good,
    /// Monsters
    Evil,
    /// Never targeted by AI acquisition
    #[default]
    Neutral,
}

impl Faction {
    /// Whether an actor of this faction considers `other` an enemy.
    pub fn is_hostile_to(self, other: Faction) -> bool {
        self != other && self != Faction::Neutral && other != Faction::Neutral
    }
}

/// What a pickup grants when consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupKind {
    /// One magazine of reserve for every magazine weapon
    Ammo,
}

/// Actor spawned where another actor dies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeathDrop {
    /// Actor definition to spawn
    pub actor: String,
    /// Probability in `[0, 1]`
    #[serde(default = "one")]
    pub chance: f32,
}

/// Collision shape and contact behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionDefinition {
    /// Cylinder radius
    pub radius: f32,
    /// Cylinder height
    pub height: f32,
    /// Resolved against solid tiles and the floor/ceiling
    pub collides_with_world: bool,
    /// Resolved against other actors
    pub collides_with_actors: bool,
    /// Starts dying on any contact
    pub die_on_collision: bool,
    /// Damage dealt to whatever this actor touches
    pub damage_on_collide: FloatRange,
    /// Impulse dealt to whatever this actor touches
    pub impulse_on_collide: f32,
}

impl Default for CollisionDefinition {
    fn default() -> Self {
        Self {
            radius: 0.5,
            height: 1.0,
            collides_with_world: true,
            collides_with_actors: true,
            die_on_collision: false,
            damage_on_collide: FloatRange::ZERO,
            impulse_on_collide: 0.0,
        }
    }
}

/// Movement parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsDefinition {
    /// Integrated by the physics step; unsimulated actors are static
    pub simulated: bool,
    /// Keeps its Z instead of being pinned to the floor
    pub flying: bool,
    /// Walking speed (units/s)
    pub walk_speed: f32,
    /// Running speed (units/s)
    pub run_speed: f32,
    /// Linear drag coefficient
    pub drag: f32,
    /// Maximum turn rate (degrees/s)
    pub turn_speed: f32,
}

/// Perception parameters for AI-driven actors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiDefinition {
    /// Maximum sight distance
    pub sight_radius: f32,
    /// Full vision cone aperture (degrees)
    pub sight_angle: f32,
}

/// Stat block for one kind of actor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorDefinition {
    /// Unique name
    pub name: String,
    /// Considered by AI target acquisition
    pub visible: bool,
    /// Starts dying on its first update (impact effects)
    pub die_on_spawn: bool,
    /// Starting health
    pub health: f32,
    /// Seconds between death and expiry
    pub corpse_lifetime: f32,
    /// Allegiance
    pub faction: Faction,
    /// Player may take control of it
    pub can_be_possessed: bool,
    /// Eye height above the actor's feet
    pub eye_height: f32,
    /// Collision shape and contact behaviour
    pub collision: CollisionDefinition,
    /// Movement parameters
    pub physics: PhysicsDefinition,
    /// AI perception; `None` means no AI controller
    pub ai: Option<AiDefinition>,
    /// Pickup behaviour, if this actor is a pickup
    pub pickup: Option<PickupKind>,
    /// Drop spawned on death
    pub death_drop: Option<DeathDrop>,
    /// Weapon names, first is equipped
    pub weapons: Vec<String>,
}

impl Default for ActorDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            visible: true,
            die_on_spawn: false,
            health: 1.0,
            corpse_lifetime: 0.0,
            faction: Faction::Neutral,
            can_be_possessed: false,
            eye_height: 0.0,
            collision: CollisionDefinition::default(),
            physics: PhysicsDefinition::default(),
            ai: None,
            pickup: None,
            death_drop: None,
            weapons: Vec::new(),
        }
    }
}

impl ActorDefinition {
    /// Whether this actor is a pickup.
    pub fn is_pickup(&self) -> bool {
        self.pickup.is_some()
    }

    /// Whether this actor gets an AI controller at spawn.
    pub fn ai_enabled(&self) -> bool {
        self.ai.is_some()
    }
}

// =============================================================================
// WEAPONS
// =============================================================================

/// How a weapon limits sustained ranged fire.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum AmmoModel {
    /// No ammunition or heat
    #[default]
    Unlimited,
    /// Discrete rounds with timed reloads from a reserve
    Magazine {
        /// Magazine capacity (also the starting reserve)
        size: u32,
        /// Reload duration in seconds
        reload_time: f32,
    },
    /// Continuous heat with a forced cooldown at the cap
    Heat {
        /// Heat added per shot
        heat_per_shot: f32,
        /// Heat cap
        max_heat: f32,
        /// Forced cooldown duration, also sets the passive decay rate
        cooldown_time: f32,
    },
}

/// Hitscan component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RayFire {
    /// Rays per shot
    #[serde(default = "one_u32")]
    pub count: u32,
    /// Full spread (degrees)
    #[serde(default)]
    pub cone: f32,
    /// Maximum ray length
    pub range: f32,
    /// Damage per hit
    pub damage: FloatRange,
    /// Impulse along the aim direction on hit
    #[serde(default)]
    pub impulse: f32,
    /// Effect spawned where a ray hits an actor
    #[serde(default)]
    pub actor_hit_effect: Option<String>,
    /// Effect spawned where a ray hits the world
    #[serde(default)]
    pub world_hit_effect: Option<String>,
}

/// Projectile component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileFire {
    /// Projectiles per shot
    #[serde(default = "one_u32")]
    pub count: u32,
    /// Full spread (degrees)
    #[serde(default)]
    pub cone: f32,
    /// Launch speed
    pub speed: f32,
    /// Projectile actor definition
    pub actor: String,
}

/// Melee component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeleeFire {
    /// Damage rolls summed per swing
    #[serde(default = "one_u32")]
    pub count: u32,
    /// Reach
    pub range: f32,
    /// Full sector aperture (degrees)
    pub arc: f32,
    /// Damage per roll
    pub damage: FloatRange,
    /// Impulse along the wielder's forward
    #[serde(default)]
    pub impulse: f32,
}

/// Stat block for one kind of weapon.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponDefinition {
    /// Unique name
    pub name: String,
    /// Seconds between shots
    pub refire_time: f32,
    /// Ammunition model
    pub ammo: AmmoModel,
    /// Hitscan component
    pub ray: Option<RayFire>,
    /// Projectile component
    pub projectile: Option<ProjectileFire>,
    /// Melee component
    pub melee: Option<MeleeFire>,
}

impl WeaponDefinition {
    /// Whether firing goes through the ammo gate.
    pub fn has_ranged(&self) -> bool {
        self.ray.is_some() || self.projectile.is_some()
    }

    /// Reach of the melee component, or 0.
    pub fn melee_range(&self) -> f32 {
        self.melee.as_ref().map_or(0.0, |m| m.range)
    }
}

// =============================================================================
// TILES & MAPS
// =============================================================================

/// One kind of tile, keyed by its layout glyph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileDefinition {
    /// Unique name
    pub name: String,
    /// Character used in map layouts
    pub glyph: char,
    /// Blocks movement and rays
    #[serde(default)]
    pub solid: bool,
}

/// Spawn request: a definition name plus transform.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnInfo {
    /// Actor definition name
    pub actor: String,
    /// Feet position
    pub position: Vec3,
    /// Initial facing
    pub orientation: EulerAngles,
    /// Initial velocity
    pub velocity: Vec3,
}

impl SpawnInfo {
    /// Spawn `actor` at `position` facing +X.
    pub fn new(actor: impl Into<String>, position: Vec3) -> Self {
        Self {
            actor: actor.into(),
            position,
            ..Default::default()
        }
    }

    /// Set the initial facing.
    pub fn with_orientation(mut self, orientation: EulerAngles) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set the initial velocity.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }
}

/// Map layout and initial population.
///
/// `rows[y]` is the row at tile Y; each character is a tile glyph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapDefinition {
    /// Unique name
    pub name: String,
    /// World ceiling height
    pub ceiling_height: f32,
    /// Tile glyph rows
    pub rows: Vec<String>,
    /// Actors spawned when the map is built
    #[serde(default)]
    pub spawns: Vec<SpawnInfo>,
}

impl MapDefinition {
    /// Layout width in tiles.
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.chars().count())
    }

    /// Layout height in tiles.
    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

// =============================================================================
// DEFINITION SET
// =============================================================================

#[derive(Default, Deserialize)]
#[serde(default)]
struct DefinitionDocument {
    actors: Vec<ActorDefinition>,
    weapons: Vec<WeaponDefinition>,
    tiles: Vec<TileDefinition>,
    maps: Vec<MapDefinition>,
}

/// Validated, immutable definition tables.
#[derive(Clone, Debug, Default)]
pub struct DefinitionSet {
    actors: BTreeMap<String, Arc<ActorDefinition>>,
    weapons: BTreeMap<String, Arc<WeaponDefinition>>,
    tiles: BTreeMap<char, TileDefinition>,
    maps: BTreeMap<String, MapDefinition>,
}

impl DefinitionSet {
    /// Parse and validate a JSON document with `actors`, `weapons`,
    /// `tiles` and `maps` arrays.
    pub fn from_json_str(json: &str) -> Result<Self, DefinitionError> {
        let doc: DefinitionDocument = serde_json::from_str(json)?;
        Self::from_parts(doc.actors, doc.weapons, doc.tiles, doc.maps)
    }

    /// Build from already-constructed definitions and validate references.
    pub fn from_parts(
        actors: Vec<ActorDefinition>,
        weapons: Vec<WeaponDefinition>,
        tiles: Vec<TileDefinition>,
        maps: Vec<MapDefinition>,
    ) -> Result<Self, DefinitionError> {
        let mut set = Self::default();

        for actor in actors {
            if set.actors.contains_key(&actor.name) {
                return Err(DefinitionError::Duplicate { kind: "actor", name: actor.name });
            }
            set.actors.insert(actor.name.clone(), Arc::new(actor));
        }
        for weapon in weapons {
            if set.weapons.contains_key(&weapon.name) {
                return Err(DefinitionError::Duplicate { kind: "weapon", name: weapon.name });
            }
            set.weapons.insert(weapon.name.clone(), Arc::new(weapon));
        }
        for tile in tiles {
            if set.tiles.contains_key(&tile.glyph) {
                return Err(DefinitionError::Duplicate { kind: "tile", name: tile.name });
            }
            set.tiles.insert(tile.glyph, tile);
        }
        for map in maps {
            if set.maps.contains_key(&map.name) {
                return Err(DefinitionError::Duplicate { kind: "map", name: map.name });
            }
            set.maps.insert(map.name.clone(), map);
        }

        set.validate()?;
        Ok(set)
    }

    fn validate(&self) -> Result<(), DefinitionError> {
        for actor in self.actors.values() {
            for weapon in &actor.weapons {
                self.require_weapon(&actor.name, weapon)?;
            }
            if let Some(drop) = &actor.death_drop {
                self.require_actor(&actor.name, &drop.actor)?;
            }
        }

        for weapon in self.weapons.values() {
            if let Some(ray) = &weapon.ray {
                for effect in ray.actor_hit_effect.iter().chain(ray.world_hit_effect.iter()) {
                    self.require_actor(&weapon.name, effect)?;
                }
            }
            if let Some(projectile) = &weapon.projectile {
                self.require_actor(&weapon.name, &projectile.actor)?;
            }
        }

        for map in self.maps.values() {
            let width = map.width();
            if width == 0 {
                return Err(DefinitionError::EmptyMap(map.name.clone()));
            }
            for (y, row) in map.rows.iter().enumerate() {
                if row.chars().count() != width {
                    return Err(DefinitionError::RaggedRows { map: map.name.clone(), row: y });
                }
                if let Some(glyph) = row.chars().find(|g| !self.tiles.contains_key(g)) {
                    return Err(DefinitionError::UnknownGlyph { map: map.name.clone(), glyph });
                }
            }
            for spawn in &map.spawns {
                self.require_actor(&map.name, &spawn.actor)?;
            }
        }

        Ok(())
    }

    fn require_actor(&self, owner: &str, name: &str) -> Result<(), DefinitionError> {
        if self.actors.contains_key(name) {
            Ok(())
        } else {
            Err(DefinitionError::UnknownReference {
                owner: owner.to_string(),
                kind: "actor",
                name: name.to_string(),
            })
        }
    }

    fn require_weapon(&self, owner: &str, name: &str) -> Result<(), DefinitionError> {
        if self.weapons.contains_key(name) {
            Ok(())
        } else {
            Err(DefinitionError::UnknownReference {
                owner: owner.to_string(),
                kind: "weapon",
                name: name.to_string(),
            })
        }
    }

    /// Look up an actor definition.
    pub fn actor(&self, name: &str) -> Option<&Arc<ActorDefinition>> {
        self.actors.get(name)
    }

    /// Look up a weapon definition.
    pub fn weapon(&self, name: &str) -> Option<&Arc<WeaponDefinition>> {
        self.weapons.get(name)
    }

    /// Look up a tile by glyph.
    pub fn tile(&self, glyph: char) -> Option<&TileDefinition> {
        self.tiles.get(&glyph)
    }

    /// Look up a map definition.
    pub fn map(&self, name: &str) -> Result<&MapDefinition, DefinitionError> {
        self.maps
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownMap(name.to_string()))
    }

    /// Number of actor definitions.
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }
}

fn one() -> f32 {
    1.0
}

fn one_u32() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r####"{
        "actors": [
            { "name": "Marine", "faction": "GOOD", "health": 100.0, "weapons": ["Pistol"] },
            { "name": "BulletHit", "die_on_spawn": true, "visible": false }
        ],
        "weapons": [
            {
                "name": "Pistol",
                "refire_time": 0.5,
                "ammo": { "model": "magazine", "size": 12, "reload_time": 1.5 },
                "ray": { "range": 20.0, "damage": { "min": 3.0, "max": 5.0 }, "world_hit_effect": "BulletHit" }
            }
        ],
        "tiles": [
            { "name": "Floor", "glyph": "." },
            { "name": "Wall", "glyph": "#", "solid": true }
        ],
        "maps": [
            { "name": "Box", "ceiling_height": 1.0, "rows": ["###", "#.#", "###"] }
        ]
    }"####;

    #[test]
    fn test_parse_minimal_document() {
        let set = DefinitionSet::from_json_str(MINIMAL).unwrap();

        let marine = set.actor("Marine").unwrap();
        assert_eq!(marine.faction, Faction::Good);
        assert!(marine.visible);
        assert!(!marine.is_pickup());

        let pistol = set.weapon("Pistol").unwrap();
        assert_eq!(pistol.ammo, AmmoModel::Magazine { size: 12, reload_time: 1.5 });
        assert_eq!(pistol.ray.as_ref().unwrap().count, 1);
        assert!(pistol.has_ranged());
        assert_eq!(pistol.melee_range(), 0.0);

        assert!(set.tile('#').unwrap().solid);
        assert_eq!(set.map("Box").unwrap().width(), 3);
    }

    #[test]
    fn test_unknown_weapon_reference() {
        let json = MINIMAL.replace(r#""weapons": ["Pistol"]"#, r#""weapons": ["Railgun"]"#);
        let err = DefinitionSet::from_json_str(&json).unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownReference { kind: "weapon", .. }));
    }

    #[test]
    fn test_unknown_glyph() {
        let json = MINIMAL.replace(r##""#.#""##, r##""#?#""##);
        let err = DefinitionSet::from_json_str(&json).unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownGlyph { glyph: '?', .. }));
    }

    #[test]
    fn test_ragged_rows() {
        let json = MINIMAL.replace(r##""#.#""##, r##""#..#""##);
        let err = DefinitionSet::from_json_str(&json).unwrap_err();
        assert!(matches!(err, DefinitionError::RaggedRows { row: 1, .. }));
    }

    #[test]
    fn test_unknown_map() {
        let set = DefinitionSet::from_json_str(MINIMAL).unwrap();
        assert!(matches!(set.map("Nowhere"), Err(DefinitionError::UnknownMap(_))));
    }

    #[test]
    fn test_faction_hostility() {
        assert!(Faction::Good.is_hostile_to(Faction::Evil));
        assert!(!Faction::Good.is_hostile_to(Faction::Good));
        assert!(!Faction::Evil.is_hostile_to(Faction::Neutral));
        assert!(!Faction::Neutral.is_hostile_to(Faction::Evil));
    }
}
