//! Map and Actor Registry
//!
//! The map owns the tile grid and every actor. Actors live in a dense slot
//! array addressed by generational [`ActorHandle`]s:
//!
//! - `spawn` reuses the lowest free slot, else appends
//! - every spawn consumes a fresh uniqueness tag; tags are never reclaimed
//! - `resolve` checks bounds, occupancy and tag, so stale handles simply
//!   return `None`
//!
//! Damage, impulse and death handling also live here since they touch more
//! than one actor (attackers, kill credit, death drops).

use std::collections::BTreeSet;
use std::sync::Arc;

use glam::Vec3;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::RandomSource;
use crate::game::actor::Actor;
use crate::game::ai::AiController;
use crate::game::controller::Controller;
use crate::game::definitions::{DefinitionError, DefinitionSet, SpawnInfo};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::grid::TileGrid;
use crate::game::handle::{ActorHandle, MAX_HANDLE_PART};
use crate::game::weapon::{Weapon, WeaponPhase};

/// Unrecoverable spawn failures. These indicate bad content or a
/// simulation that has outgrown the handle domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    /// No actor definition with this name.
    #[error("unknown actor definition '{0}'")]
    UnknownActor(String),

    /// Actor definition lists a weapon that does not exist.
    #[error("actor '{actor}' references unknown weapon '{weapon}'")]
    UnknownWeapon {
        /// Actor definition name
        actor: String,
        /// Missing weapon name
        weapon: String,
    },

    /// Every 16-bit uniqueness tag has been handed out.
    #[error("actor uniqueness tags exhausted")]
    TagsExhausted,

    /// No slot index below the 16-bit limit is available.
    #[error("actor slots exhausted")]
    SlotsExhausted,
}

/// Failure building a map from its definition.
#[derive(Debug, Error)]
pub enum MapBuildError {
    /// Layout or lookup problem.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// Initial population could not be spawned.
    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

/// Tile grid plus the actors living on it.
#[derive(Clone, Debug)]
pub struct Map {
    name: String,
    grid: TileGrid,
    defs: Arc<DefinitionSet>,
    slots: Vec<Option<Actor>>,
    free_slots: BTreeSet<usize>,
    next_tag: u32,
    /// Ticks simulated so far
    pub tick: u32,
    pending_events: Vec<GameEvent>,
}

impl Map {
    /// Create an empty map over `grid`.
    pub fn new(name: impl Into<String>, grid: TileGrid, defs: Arc<DefinitionSet>) -> Self {
        Self {
            name: name.into(),
            grid,
            defs,
            slots: Vec::new(),
            free_slots: BTreeSet::new(),
            next_tag: 0,
            tick: 0,
            pending_events: Vec::new(),
        }
    }

    /// Build the named map and spawn its initial population.
    pub fn from_definition(defs: Arc<DefinitionSet>, map_name: &str) -> Result<Self, MapBuildError> {
        let definition = defs.map(map_name)?;
        let grid = TileGrid::from_definition(definition, &defs)?;
        let spawns = definition.spawns.clone();

        let mut map = Self::new(map_name, grid, defs);
        for info in &spawns {
            map.spawn(info)?;
        }
        debug!(map = map_name, actors = map.actor_count(), "Map built");
        Ok(map)
    }

    /// Map name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tile grid.
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Shared definition tables.
    pub fn definitions(&self) -> &Arc<DefinitionSet> {
        &self.defs
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Spawn an actor from a definition name and transform.
    pub fn spawn(&mut self, info: &SpawnInfo) -> Result<ActorHandle, SpawnError> {
        let definition = self
            .defs
            .actor(&info.actor)
            .cloned()
            .ok_or_else(|| SpawnError::UnknownActor(info.actor.clone()))?;

        let weapons = definition
            .weapons
            .iter()
            .map(|name| {
                self.defs.weapon(name).cloned().map(Weapon::new).ok_or_else(|| SpawnError::UnknownWeapon {
                    actor: definition.name.clone(),
                    weapon: name.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if self.next_tag >= MAX_HANDLE_PART {
            return Err(SpawnError::TagsExhausted);
        }
        // Every spawn consumes a tag and at most one new slot, so the tag
        // guard above trips first; this keeps the index bound local.
        let index = self.free_slots.first().copied().unwrap_or(self.slots.len());
        if index >= MAX_HANDLE_PART as usize {
            return Err(SpawnError::SlotsExhausted);
        }
        if !self.free_slots.remove(&index) {
            self.slots.push(None);
        }

        let handle = ActorHandle::new(self.next_tag, index as u32);
        self.next_tag += 1;

        let mut actor = Actor::new(handle, definition.clone(), info, weapons);
        if definition.ai_enabled() {
            actor.controller = Some(Controller::Ai(AiController::new()));
        }
        self.slots[index] = Some(actor);

        debug!(?handle, definition = %definition.name, "Actor spawned");
        self.push_event(GameEventData::ActorSpawned {
            actor: handle,
            definition: definition.name.clone(),
        });
        Ok(handle)
    }

    /// Look up a live actor. Stale or invalid handles yield `None`.
    pub fn resolve(&self, handle: ActorHandle) -> Option<&Actor> {
        if !handle.is_valid() {
            return None;
        }
        self.slots
            .get(handle.index())?
            .as_ref()
            .filter(|actor| actor.handle == handle)
    }

    /// Mutable lookup; same rules as [`Map::resolve`].
    pub fn resolve_mut(&mut self, handle: ActorHandle) -> Option<&mut Actor> {
        if !handle.is_valid() {
            return None;
        }
        self.slots
            .get_mut(handle.index())?
            .as_mut()
            .filter(|actor| actor.handle == handle)
    }

    /// Two distinct live actors at once.
    pub fn pair_mut(&mut self, a: ActorHandle, b: ActorHandle) -> Option<(&mut Actor, &mut Actor)> {
        let (ia, ib) = (a.index(), b.index());
        if ia == ib || self.resolve(a).is_none() || self.resolve(b).is_none() {
            return None;
        }

        let (first, second) = if ia < ib { (ia, ib) } else { (ib, ia) };
        let (head, tail) = self.slots.split_at_mut(second);
        let low = head[first].as_mut()?;
        let high = tail[0].as_mut()?;

        if ia < ib {
            Some((low, high))
        } else {
            Some((high, low))
        }
    }

    /// Remove an actor immediately and free its slot for reuse.
    pub fn despawn(&mut self, handle: ActorHandle) -> Option<Actor> {
        self.resolve(handle)?;
        let actor = self.slots[handle.index()].take();
        self.free_slots.insert(handle.index());
        debug!(?handle, "Actor despawned");
        actor
    }

    /// Remove every expired actor. Returns how many were removed.
    pub fn sweep_expired(&mut self) -> usize {
        let mut removed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.as_ref().is_some_and(|actor| actor.is_expired) {
                *slot = None;
                self.free_slots.insert(index);
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "Swept expired actors");
        }
        removed
    }

    /// Handles of all live actors, in slot order.
    pub fn live_handles(&self) -> Vec<ActorHandle> {
        self.actors().map(|actor| actor.handle).collect()
    }

    /// All live actors, in slot order.
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.slots.iter().flatten()
    }

    /// All live actors, mutably, in slot order.
    pub fn actors_mut(&mut self) -> impl Iterator<Item = &mut Actor> {
        self.slots.iter_mut().flatten()
    }

    /// Number of live actors.
    pub fn actor_count(&self) -> usize {
        self.actors().count()
    }

    #[cfg(test)]
    pub(crate) fn force_next_tag(&mut self, tag: u32) {
        self.next_tag = tag;
    }

    // =========================================================================
    // Damage & impulse
    // =========================================================================

    /// Apply `amount` damage to `target` from `source`.
    ///
    /// The attacker is the source's owner if it has one, else the source.
    /// Pickups neither take nor deal damage; corpses ignore it. An AI
    /// target adopts any living attacker. Returns true if this killed it.
    pub fn apply_damage(
        &mut self,
        target: ActorHandle,
        source: Option<ActorHandle>,
        amount: f32,
        rng: &mut dyn RandomSource,
    ) -> Result<bool, SpawnError> {
        let source_actor = source.and_then(|s| self.resolve(s));
        if source_actor.is_some_and(|s| s.is_pickup()) {
            return Ok(false);
        }
        let attacker = source_actor
            .map(|s| s.owner.unwrap_or(s.handle))
            .filter(|&a| a != target);
        let attacker_alive = attacker.and_then(|a| self.resolve(a)).is_some_and(|a| a.is_alive());

        let Some(victim) = self.resolve_mut(target) else {
            return Ok(false);
        };
        if victim.is_pickup() || victim.is_dead {
            return Ok(false);
        }

        victim.health -= amount;
        let remaining = victim.health;
        let killed = remaining <= 0.0;

        let mut aggro = None;
        if attacker_alive {
            if let (Some(attacker), Some(Controller::Ai(ai))) = (attacker, victim.controller.as_mut()) {
                if ai.damaged_by(attacker) {
                    aggro = Some(attacker);
                }
            }
        }

        self.push_event(GameEventData::ActorDamaged { target, attacker, amount, remaining });
        if let Some(new_target) = aggro {
            self.push_event(GameEventData::TargetAcquired { actor: target, target: new_target });
        }

        if killed {
            self.kill(target, attacker, rng)?;
        }
        Ok(killed)
    }

    /// Add `impulse` to a live actor's velocity. Returns false if stale.
    pub fn apply_impulse(&mut self, target: ActorHandle, impulse: Vec3) -> bool {
        match self.resolve_mut(target) {
            Some(actor) => {
                actor.add_impulse(impulse);
                true
            }
            None => false,
        }
    }

    /// Start an actor's death: corpse timer, kill credit, death drop.
    ///
    /// Does nothing if it is already dead.
    pub fn kill(
        &mut self,
        victim: ActorHandle,
        killer: Option<ActorHandle>,
        rng: &mut dyn RandomSource,
    ) -> Result<(), SpawnError> {
        let Some(actor) = self.resolve_mut(victim) else {
            return Ok(());
        };
        if !actor.begin_death() {
            return Ok(());
        }
        let position = actor.position;
        let drop = actor.definition.death_drop.clone();
        let victim_is_player = actor.is_player_controlled();

        if let Some(killer) = killer.filter(|&k| k != victim) {
            let killer_is_player = self.resolve(killer).is_some_and(|k| k.is_player_controlled());
            if victim_is_player && killer_is_player {
                if let Some(stats) = self.resolve_mut(killer).and_then(|k| k.player_mut()) {
                    stats.kills += 1;
                }
                if let Some(stats) = self.resolve_mut(victim).and_then(|v| v.player_mut()) {
                    stats.deaths += 1;
                }
            }
        }

        debug!(?victim, ?killer, "Actor died");
        self.push_event(GameEventData::ActorDied { victim, killer });

        if let Some(drop) = drop {
            if rng.chance(drop.chance) {
                self.spawn(&SpawnInfo::new(drop.actor, position))?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Events & hashing
    // =========================================================================

    /// Queue an event stamped with the current tick.
    pub fn push_event(&mut self, data: GameEventData) {
        self.pending_events.push(GameEvent::new(self.tick, data));
    }

    /// Drain queued events in processing order.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        let mut events = std::mem::take(&mut self.pending_events);
        events.sort();
        events
    }

    /// Hash of every simulation-relevant field, for replay comparison.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, |h| {
            h.update_u32(self.next_tag);
            h.update_u32(self.slots.len() as u32);

            for slot in &self.slots {
                let Some(actor) = slot else {
                    h.update_bool(false);
                    continue;
                };
                h.update_bool(true);
                h.update_u32(actor.handle.raw());
                h.update_str(&actor.definition.name);
                h.update_vec3(actor.position);
                h.update_vec3(actor.velocity);
                h.update_f32(actor.orientation.yaw);
                h.update_f32(actor.orientation.pitch);
                h.update_f32(actor.health);
                h.update_bool(actor.is_dead);
                h.update_bool(actor.is_expired);
                h.update_u32(actor.owner.unwrap_or(ActorHandle::INVALID).raw());
                h.update_u32(actor.equipped.map_or(u32::MAX, |i| i as u32));

                match &actor.controller {
                    None => h.update_u8(0),
                    Some(Controller::Ai(ai)) => {
                        h.update_u8(1);
                        h.update_u32(ai.target().unwrap_or(ActorHandle::INVALID).raw());
                    }
                    Some(Controller::Player(p)) => {
                        h.update_u8(2);
                        h.update_u32(p.kills);
                        h.update_u32(p.deaths);
                    }
                }

                for weapon in &actor.weapons {
                    h.update_u32(weapon.rounds_in_mag);
                    h.update_u32(weapon.rounds_in_bag);
                    h.update_f32(weapon.heat);
                    let (phase, elapsed) = match &weapon.phase {
                        WeaponPhase::Ready => (0, 0.0),
                        WeaponPhase::Reloading(t) => (1, t.elapsed()),
                        WeaponPhase::OverheatCooldown(t) => (2, t.elapsed()),
                    };
                    h.update_u8(phase);
                    h.update_f32(elapsed);
                }
            }
        })
    }

    pub(crate) fn warn_stale(&self, handle: ActorHandle, context: &str) {
        warn!(?handle, context, "Stale actor handle");
    }
}

// =============================================================================
// TESTS
// =============================================================================
