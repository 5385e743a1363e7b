//! Gridfire Simulation Demo
//!
//! Loads a definition set, runs a scripted match on one of its maps with a
//! possessed marine, then replays it and checks the state hashes agree.
//!
//! Usage: `gridfire-sim [definitions.json] [map name]`

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use glam::Vec2;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gridfire::{
    core::hash::StateHash,
    core::math::EulerAngles,
    game::{
        controller::PlayerIntent,
        events::{GameEvent, GameEventData},
        run_ticks,
    },
    ActorHandle, DefinitionSet, DeterministicRng, Map, SimConfig, TICK_RATE, VERSION,
};

const BUNDLED_DEFINITIONS: &str = include_str!("../data/definitions.json");
const DEFAULT_MAP: &str = "Arena";

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Gridfire Sim v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let mut args = std::env::args().skip(1);
    let defs = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading definitions from {path}"))?;
            DefinitionSet::from_json_str(&json).with_context(|| format!("loading definitions from {path}"))?
        }
        None => DefinitionSet::from_json_str(BUNDLED_DEFINITIONS).context("loading bundled definitions")?,
    };
    let map_name = args.next().unwrap_or_else(|| DEFAULT_MAP.to_string());
    let defs = Arc::new(defs);

    let config = SimConfig { seed: 12345, ..Default::default() };
    info!("Map: {}, seed: {}, ticks: {}", map_name, config.seed, config.max_ticks);

    let (hash, events) = run_demo(&defs, &map_name, &config)?;
    report(&events);
    info!("Final State Hash: {}", hex::encode(hash));

    info!("=== Verifying Determinism ===");
    let (replay_hash, _) = run_demo(&defs, &map_name, &config)?;
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash != replay_hash {
        bail!("determinism failure: replay hash differs");
    }
    info!("DETERMINISM VERIFIED: Hashes match!");
    Ok(())
}

/// Build the map, possess the first possessable actor, and run the script.
fn run_demo(defs: &Arc<DefinitionSet>, map_name: &str, config: &SimConfig) -> Result<(StateHash, Vec<GameEvent>)> {
    let mut map = Map::from_definition(Arc::clone(defs), map_name)?;
    let mut rng = DeterministicRng::new(config.seed);

    let player = map
        .actors()
        .find(|a| a.definition.can_be_possessed)
        .map(|a| a.handle)
        .unwrap_or(ActorHandle::INVALID);
    if !map.possess(player) {
        warn!("No possessable actor on map '{}'; running AI only", map_name);
    }

    let events = run_ticks(&mut map, config, &mut rng, config.max_ticks, |map, t| {
        map.set_player_intent(player, scripted_intent(t));
    })?;
    Ok((map.compute_hash(), events))
}

/// Sweep the aim back and forth, strafe, and fire in bursts.
fn scripted_intent(t: u32) -> PlayerIntent {
    let seconds = t as f32 / TICK_RATE as f32;
    PlayerIntent {
        movement: Vec2::new(if t % 240 < 120 { 0.5 } else { -0.5 }, 0.25),
        run: t % 180 < 60,
        aim: EulerAngles::from_yaw((seconds * 40.0).sin() * 60.0),
        fire: t % 90 < 45,
        cycle_weapon: if t > 0 && t % 600 == 0 { 1 } else { 0 },
    }
}

fn report(events: &[GameEvent]) {
    let mut deaths = 0;
    let mut shots = 0;
    for event in events {
        match &event.data {
            GameEventData::ActorDied { victim, killer } => {
                deaths += 1;
                info!("Tick {}: {:?} died (killer: {:?})", event.tick, victim, killer);
            }
            GameEventData::PickupCollected { actor, kind, .. } => {
                info!("Tick {}: {:?} collected {:?}", event.tick, actor, kind);
            }
            GameEventData::OverheatStarted { actor, weapon } => {
                info!("Tick {}: {:?} overheated {}", event.tick, actor, weapon);
            }
            GameEventData::WeaponFired { .. } => shots += 1,
            _ => {}
        }
    }
    info!("=== Match Results ===");
    info!("Total events: {}, shots: {}, deaths: {}", events.len(), shots, deaths);
}
