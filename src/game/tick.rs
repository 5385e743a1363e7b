//! Simulation Tick
//!
//! One fixed-order step of the whole map. Given the same map, definitions,
//! delta time and random sequence, a tick produces the same state.
//!
//! Phase order:
//!
//! 0. Advance the tick counter
//! 1. Per-actor update in slot order over the actors live at phase start:
//!    die-on-spawn, controller, weapon phases, refire bookkeeping, corpse timer
//! 2. Physics integration
//! 3. Actor vs actor collision
//! 4. Actor vs world collision
//! 5. Sweep expired actors

use tracing::trace;

use crate::core::rng::RandomSource;
use crate::game::controller::Controller;
use crate::game::events::GameEvent;
use crate::game::handle::ActorHandle;
use crate::game::map::{Map, SpawnError};
use crate::TICK_RATE;

/// Configuration for a simulation run.
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Ticks per second
    pub tick_rate: u32,
    /// Ticks to run before stopping
    pub max_ticks: u32,
    /// Seed for the deterministic random source
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            max_ticks: TICK_RATE * 30, // 30 seconds
            seed: 0,
        }
    }
}

impl SimConfig {
    /// Seconds per tick.
    pub fn delta_seconds(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

/// Per-tick inputs threaded through every update.
pub struct SimContext<'a> {
    /// Seconds simulated by this tick
    pub delta_seconds: f32,
    /// Source for every roll made this tick
    pub rng: &'a mut dyn RandomSource,
}

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick, in processing order
    pub events: Vec<GameEvent>,
    /// Actors swept at the end of the tick
    pub expired: usize,
}

/// Run one simulation tick.
pub fn tick(map: &mut Map, ctx: &mut SimContext<'_>) -> Result<TickResult, SpawnError> {
    let dt = ctx.delta_seconds;

    // 0. Advance tick counter
    map.tick += 1;

    // 1. Actor updates; spawns made here wait for the next tick
    for handle in map.live_handles() {
        update_actor(map, handle, dt, &mut *ctx.rng)?;
    }

    // 2. Physics
    for actor in map.actors_mut() {
        actor.integrate(dt);
    }

    // 3-4. Collision
    for actor in map.actors_mut() {
        actor.did_collide = false;
    }
    map.collide_actors(&mut *ctx.rng)?;
    map.collide_actors_with_world(&mut *ctx.rng)?;

    // 5. Sweep
    let expired = map.sweep_expired();

    let events = map.take_events();
    trace!(tick = map.tick, events = events.len(), expired, "Tick complete");
    Ok(TickResult { events, expired })
}

fn update_actor(map: &mut Map, handle: ActorHandle, dt: f32, rng: &mut dyn RandomSource) -> Result<(), SpawnError> {
    let Some(actor) = map.resolve_mut(handle) else {
        return Ok(());
    };
    let dies_on_spawn = actor.definition.die_on_spawn && !actor.is_dead;
    actor.attacked_this_tick = false;
    actor.refire_timer.advance(dt);
    let driver = actor.controller.as_ref().map(|c| matches!(c, Controller::Ai(_)));

    if dies_on_spawn {
        map.kill(handle, None, rng)?;
    }

    match driver {
        Some(true) => map.update_ai(handle, dt, rng)?,
        Some(false) => map.update_player(handle, rng)?,
        None => {}
    }

    map.update_weapons(handle, dt);

    let Some(actor) = map.resolve_mut(handle) else {
        return Ok(());
    };
    if !actor.attacked_this_tick {
        actor.refire_timer.clamp_to_period();
    }
    if actor.is_dead {
        actor.advance_corpse(dt);
    }
    Ok(())
}

/// Run `ticks` ticks, calling `script` before each one to set inputs.
///
/// Returns every event in order. Used for replays: the same map, seed and
/// script always produce the same state hash.
pub fn run_ticks(
    map: &mut Map,
    config: &SimConfig,
    rng: &mut dyn RandomSource,
    ticks: u32,
    mut script: impl FnMut(&mut Map, u32),
) -> Result<Vec<GameEvent>, SpawnError> {
    let mut all_events = Vec::new();
    let mut ctx = SimContext { delta_seconds: config.delta_seconds(), rng };

    for t in 0..ticks.min(config.max_ticks) {
        script(map, t);
        let result = tick(map, &mut ctx)?;
        all_events.extend(result.events);
    }
    Ok(all_events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::DeterministicRng;
    use crate::game::controller::PlayerIntent;
    use crate::game::events::GameEventData;
    use crate::game::testing;

    fn step(map: &mut Map, rng: &mut DeterministicRng) -> TickResult {
        let mut ctx = SimContext { delta_seconds: 1.0 / 60.0, rng };
        tick(map, &mut ctx).unwrap()
    }

    #[test]
    fn test_tick_counter_and_event_stamps() {
        let mut map = testing::open_map(5, 5);
        let mut rng = DeterministicRng::new(1);
        map.spawn(&testing::at(testing::PUFF, 1.0, 1.0)).unwrap();

        let result = step(&mut map, &mut rng);
        assert_eq!(map.tick, 1);
        assert!(result.events.iter().all(|e| e.tick <= 1));
        assert!(result.events.iter().any(|e| matches!(e.data, GameEventData::ActorDied { .. })));
    }

    #[test]
    fn test_effect_dies_then_expires() {
        let mut map = testing::open_map(5, 5);
        let mut rng = DeterministicRng::new(1);
        let puff = map.spawn(&testing::at(testing::PUFF, 1.0, 1.0)).unwrap();

        step(&mut map, &mut rng);
        assert!(map.resolve(puff).unwrap().is_dead);

        let swept: usize = (0..10).map(|_| step(&mut map, &mut rng).expired).sum();
        assert_eq!(swept, 1);
        assert!(map.resolve(puff).is_none());
    }

    #[test]
    fn test_idle_refire_banks_one_period() {
        let mut map = testing::open_map(5, 5);
        let mut rng = DeterministicRng::new(1);
        let marine = map.spawn(&testing::at(testing::MARINE, 2.0, 2.0)).unwrap();

        for _ in 0..120 {
            step(&mut map, &mut rng);
        }
        let timer = map.resolve(marine).unwrap().refire_timer;
        assert!(timer.elapsed() <= timer.period);
    }

    #[test]
    fn test_imp_hunts_marine() {
        let mut map = testing::open_map(12, 5);
        let mut rng = DeterministicRng::new(5);
        map.spawn(&testing::at(testing::IMP, 1.5, 2.5)).unwrap();
        let marine = map.spawn(&testing::at(testing::MARINE, 4.5, 2.5)).unwrap();

        for _ in 0..180 {
            step(&mut map, &mut rng);
        }
        assert!(map.resolve(marine).unwrap().health < 100.0);
    }

    #[test]
    fn test_possessed_marine_shoots_plasma() {
        let mut map = testing::open_map(12, 5);
        let mut rng = DeterministicRng::new(5);
        let marine = map.spawn(&testing::at(testing::MARINE, 1.5, 2.5)).unwrap();
        let dummy = map.spawn(&testing::at(testing::DUMMY, 6.0, 2.5)).unwrap();
        assert!(map.possess(marine));
        map.set_player_intent(marine, PlayerIntent { fire: true, cycle_weapon: 1, ..Default::default() });

        let events = run_ticks(&mut map, &SimConfig::default(), &mut rng, 60, |_, _| {}).unwrap();

        assert!(events.iter().any(|e| matches!(
            e.data,
            GameEventData::ActorDied { victim, killer: Some(k) } if victim == dummy && k == marine
        )));
        assert_eq!(map.resolve(marine).unwrap().equipped, Some(1));
    }

    #[test]
    fn test_replay_determinism() {
        let run = || {
            let mut map = testing::open_map(12, 8);
            let mut rng = DeterministicRng::new(99999);
            let marine = map.spawn(&testing::at(testing::MARINE, 2.0, 4.0)).unwrap();
            map.spawn(&testing::at(testing::IMP, 9.0, 3.0)).unwrap();
            map.spawn(&testing::at(testing::IMP, 9.0, 5.0)).unwrap();
            map.possess(marine);

            let events = run_ticks(&mut map, &SimConfig::default(), &mut rng, 240, |map, t| {
                let intent = PlayerIntent {
                    fire: t % 30 < 15,
                    cycle_weapon: if t == 60 { 1 } else { 0 },
                    ..Default::default()
                };
                map.set_player_intent(marine, intent);
            })
            .unwrap();
            (map.compute_hash(), events)
        };

        let (hash1, events1) = run();
        let (hash2, events2) = run();
        assert_eq!(hash1, hash2);
        let data1: Vec<_> = events1.iter().map(|e| &e.data).collect();
        let data2: Vec<_> = events2.iter().map(|e| &e.data).collect();
        assert_eq!(data1, data2);
    }
}
