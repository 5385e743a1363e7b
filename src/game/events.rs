//! Simulation Events
//!
//! Events generated during a tick for the presentation layer and for
//! replay comparison. The core never calls into rendering or audio; those
//! react to these events and to actor state.

use serde::{Deserialize, Serialize};

use crate::game::definitions::PickupKind;
use crate::game::handle::ActorHandle;

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Deaths first
    Death = 0,
    /// Then damage
    Damage = 1,
    /// Then pickups
    Pickup = 2,
    /// Then weapon and AI state changes
    Combat = 3,
    /// Lowest priority
    Other = 255,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Actor entered the map
    ActorSpawned {
        /// New actor
        actor: ActorHandle,
        /// Definition name
        definition: String,
    },

    /// Actor lost health
    ActorDamaged {
        /// Damaged actor
        target: ActorHandle,
        /// Attacker after owner resolution, if any
        attacker: Option<ActorHandle>,
        /// Damage applied
        amount: f32,
        /// Health afterwards
        remaining: f32,
    },

    /// Actor started dying
    ActorDied {
        /// Dying actor
        victim: ActorHandle,
        /// Attacker credited with the kill
        killer: Option<ActorHandle>,
    },

    /// AI adopted a new target
    TargetAcquired {
        /// AI actor
        actor: ActorHandle,
        /// New target
        target: ActorHandle,
    },

    /// Weapon resolved one shot or swing
    WeaponFired {
        /// Wielder
        actor: ActorHandle,
        /// Weapon definition name
        weapon: String,
        /// Melee fallback was used
        melee: bool,
    },

    /// Magazine weapon began reloading
    ReloadStarted {
        /// Wielder
        actor: ActorHandle,
        /// Weapon definition name
        weapon: String,
    },

    /// Magazine weapon finished reloading
    ReloadFinished {
        /// Wielder
        actor: ActorHandle,
        /// Weapon definition name
        weapon: String,
    },

    /// Heat weapon hit its cap
    OverheatStarted {
        /// Wielder
        actor: ActorHandle,
        /// Weapon definition name
        weapon: String,
    },

    /// Heat weapon cooled down
    CooldownFinished {
        /// Wielder
        actor: ActorHandle,
        /// Weapon definition name
        weapon: String,
    },

    /// Player-controlled actor consumed a pickup
    PickupCollected {
        /// Collector
        actor: ActorHandle,
        /// Consumed pickup
        pickup: ActorHandle,
        /// What it granted
        kind: PickupKind,
    },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u32,

    /// Processing priority
    pub priority: EventPriority,

    /// Primary actor (for tie-breaking)
    pub actor: ActorHandle,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event; priority and primary actor follow from the data.
    pub fn new(tick: u32, data: GameEventData) -> Self {
        use GameEventData::*;

        let (priority, actor) = match &data {
            ActorDied { victim, .. } => (EventPriority::Death, *victim),
            ActorDamaged { target, .. } => (EventPriority::Damage, *target),
            PickupCollected { actor, .. } => (EventPriority::Pickup, *actor),
            TargetAcquired { actor, .. }
            | WeaponFired { actor, .. }
            | ReloadStarted { actor, .. }
            | ReloadFinished { actor, .. }
            | OverheatStarted { actor, .. }
            | CooldownFinished { actor, .. } => (EventPriority::Combat, *actor),
            ActorSpawned { actor, .. } => (EventPriority::Other, *actor),
        };

        Self { tick, priority, actor, data }
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick && self.priority == other.priority && self.actor == other.actor
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: tick, then priority, then slot handle
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
            .then(self.actor.cmp(&other.actor))
    }
}
