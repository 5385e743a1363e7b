//! Shared fixtures for unit tests: a small definition set and map builders.

use std::sync::Arc;

use glam::Vec3;

use crate::core::math::FloatRange;
use crate::game::definitions::*;
use crate::game::grid::TileGrid;
use crate::game::map::Map;

pub const MARINE: &str = "Marine";
pub const IMP: &str = "Imp";
pub const DUMMY: &str = "Dummy";
pub const BOLT: &str = "PlasmaBolt";
pub const AMMO: &str = "AmmoPickup";
pub const PUFF: &str = "BulletHit";
pub const BLOOD: &str = "BloodSplatter";

pub const PISTOL: &str = "Pistol";
pub const PLASMA: &str = "PlasmaRifle";
pub const CLAWS: &str = "Claws";
pub const BAYONET: &str = "BayonetRifle";

pub const CEILING: f32 = 1.0;

fn collision(radius: f32, height: f32) -> CollisionDefinition {
    CollisionDefinition { radius, height, ..Default::default() }
}

fn walker(run_speed: f32) -> PhysicsDefinition {
    PhysicsDefinition {
        simulated: true,
        flying: false,
        walk_speed: run_speed * 0.25,
        run_speed,
        drag: 9.0,
        turn_speed: 180.0,
    }
}

fn effect(name: &str) -> ActorDefinition {
    ActorDefinition {
        name: name.into(),
        visible: false,
        die_on_spawn: true,
        corpse_lifetime: 0.1,
        collision: CollisionDefinition {
            collides_with_world: false,
            collides_with_actors: false,
            ..collision(0.05, 0.05)
        },
        ..Default::default()
    }
}

pub fn actor_definitions() -> Vec<ActorDefinition> {
    vec![
        ActorDefinition {
            name: MARINE.into(),
            faction: Faction::Good,
            health: 100.0,
            corpse_lifetime: 1.0,
            can_be_possessed: true,
            eye_height: 0.6,
            collision: collision(0.3, 0.75),
            physics: walker(6.0),
            death_drop: Some(DeathDrop { actor: AMMO.into(), chance: 1.0 }),
            weapons: vec![PISTOL.into(), PLASMA.into()],
            ..Default::default()
        },
        ActorDefinition {
            name: IMP.into(),
            faction: Faction::Evil,
            health: 20.0,
            corpse_lifetime: 1.0,
            can_be_possessed: true,
            eye_height: 0.5,
            collision: collision(0.35, 0.75),
            physics: walker(5.0),
            ai: Some(AiDefinition { sight_radius: 20.0, sight_angle: 120.0 }),
            weapons: vec![CLAWS.into()],
            ..Default::default()
        },
        ActorDefinition {
            name: DUMMY.into(),
            faction: Faction::Evil,
            health: 10.0,
            corpse_lifetime: 1.0,
            eye_height: 0.5,
            collision: collision(0.3, 1.0),
            ..Default::default()
        },
        ActorDefinition {
            name: BOLT.into(),
            visible: false,
            collision: CollisionDefinition {
                die_on_collision: true,
                damage_on_collide: FloatRange::new(10.0, 10.0),
                impulse_on_collide: 2.0,
                ..collision(0.05, 0.05)
            },
            physics: PhysicsDefinition { simulated: true, flying: true, ..Default::default() },
            ..Default::default()
        },
        ActorDefinition {
            name: AMMO.into(),
            pickup: Some(PickupKind::Ammo),
            collision: collision(0.2, 0.2),
            ..Default::default()
        },
        effect(PUFF),
        effect(BLOOD),
    ]
}

pub fn weapon_definitions() -> Vec<WeaponDefinition> {
    let pistol_ray = RayFire {
        count: 1,
        cone: 0.0,
        range: 20.0,
        damage: FloatRange::new(5.0, 5.0),
        impulse: 1.0,
        actor_hit_effect: Some(BLOOD.into()),
        world_hit_effect: Some(PUFF.into()),
    };

    vec![
        WeaponDefinition {
            name: PISTOL.into(),
            refire_time: 0.5,
            ammo: AmmoModel::Magazine { size: 10, reload_time: 1.0 },
            ray: Some(pistol_ray.clone()),
            ..Default::default()
        },
        WeaponDefinition {
            name: PLASMA.into(),
            refire_time: 0.1,
            ammo: AmmoModel::Heat { heat_per_shot: 25.0, max_heat: 100.0, cooldown_time: 2.0 },
            projectile: Some(ProjectileFire { count: 1, cone: 0.0, speed: 20.0, actor: BOLT.into() }),
            ..Default::default()
        },
        WeaponDefinition {
            name: CLAWS.into(),
            refire_time: 1.0,
            melee: Some(MeleeFire {
                count: 2,
                range: 1.0,
                arc: 90.0,
                damage: FloatRange::new(3.0, 3.0),
                impulse: 1.0,
            }),
            ..Default::default()
        },
        WeaponDefinition {
            name: BAYONET.into(),
            refire_time: 0.5,
            ammo: AmmoModel::Magazine { size: 1, reload_time: 5.0 },
            ray: Some(pistol_ray),
            melee: Some(MeleeFire {
                count: 1,
                range: 1.0,
                arc: 60.0,
                damage: FloatRange::new(4.0, 4.0),
                impulse: 0.0,
            }),
            ..Default::default()
        },
    ]
}

pub fn definitions() -> Arc<DefinitionSet> {
    let tiles = vec![
        TileDefinition { name: "Floor".into(), glyph: '.', solid: false },
        TileDefinition { name: "Wall".into(), glyph: '#', solid: true },
    ];
    let maps = vec![MapDefinition {
        name: "Corridor".into(),
        ceiling_height: CEILING,
        rows: vec!["#####".into(), "#...#".into(), "#####".into()],
        spawns: vec![SpawnInfo::new(MARINE, Vec3::new(1.5, 1.5, 0.0))],
    }];

    match DefinitionSet::from_parts(actor_definitions(), weapon_definitions(), tiles, maps) {
        Ok(set) => Arc::new(set),
        Err(e) => panic!("fixture definitions invalid: {e}"),
    }
}

/// Grid where `#` is solid and anything else is open; `rows[y]` is row y.
pub fn grid(rows: &[&str]) -> TileGrid {
    let width = rows[0].chars().count();
    let solid = rows.iter().flat_map(|r| r.chars().map(|c| c == '#')).collect();
    TileGrid::from_mask(width, rows.len(), CEILING, solid).unwrap()
}

pub fn map_from(rows: &[&str]) -> Map {
    Map::new("test", grid(rows), definitions())
}

pub fn open_map(width: usize, height: usize) -> Map {
    let row = ".".repeat(width);
    let rows: Vec<&str> = (0..height).map(|_| row.as_str()).collect();
    map_from(&rows)
}

pub fn at(actor: &str, x: f32, y: f32) -> SpawnInfo {
    SpawnInfo::new(actor, Vec3::new(x, y, 0.0))
}
