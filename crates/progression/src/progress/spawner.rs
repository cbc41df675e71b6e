use std::collections::BTreeMap;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::world::{
    ActorId, FragmentSet, GroundProbe, SpawnSchedule, SpawnerId, TemplateId, Transform, Vec3,
};

use super::effects::{IntentQueue, ProgressionEvent, ProgressionEventBus, ProgressionIntent};
use super::hazard::UnsafeRegistry;
use super::ledger::FragmentLedger;
use super::placement::{resolve_spawn_position, PlacementRequest};

pub const DEFAULT_MIN_SPAWN_RADIUS: f32 = 10.0;
pub const DEFAULT_MAX_SPAWN_RADIUS: f32 = 18.0;
pub const DEFAULT_TIMER_INTERVAL_SECONDS: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SpawnCadence {
    NightGated,
    Timer { interval_seconds: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnerDef {
    pub def_name: String,
    pub driving: FragmentSet,
    pub schedule: SpawnSchedule,
    pub first_index: usize,
    pub last_index: usize,
    pub min_radius: f32,
    pub max_radius: f32,
    pub cadence: SpawnCadence,
    pub spawn_on_actor: bool,
    pub log_fragment_detail: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpawnerConfigError {
    #[error(
        "spawner '{def_name}' pairs {driving_len} driving fragments with {schedule_len} templates; lengths must match"
    )]
    ScheduleLengthMismatch {
        def_name: String,
        driving_len: usize,
        schedule_len: usize,
    },
    #[error("spawner '{def_name}' has an empty index window [{first_index}, {last_index}]")]
    EmptyIndexWindow {
        def_name: String,
        first_index: usize,
        last_index: usize,
    },
}

/// `last_acted_index` only moves forward, even if fragments are later removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressCounter {
    pub owned_count: usize,
    pub last_acted_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CadenceState {
    pub was_night: bool,
    pub armed: bool,
    pub timer_seconds: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ActorSpawnState {
    pub progress: ProgressCounter,
    pub cadence: CadenceState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    Unsafe,
    NotDue,
    NoClock,
    NoInventory,
    Exhausted,
    AlreadyActed,
    OutsideWindow,
    MissingTemplate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpawnAttempt {
    Spawned {
        index: usize,
        template: TemplateId,
        position: Vec3,
    },
    Declined(DeclineReason),
}

#[derive(Clone, Copy)]
pub struct SpawnContext<'a> {
    pub actor_id: ActorId,
    pub position: Vec3,
    pub facing: Vec3,
    pub is_night: Option<bool>,
    pub ledger: FragmentLedger<'a>,
    pub ground: Option<&'a dyn GroundProbe>,
}

#[derive(Debug, Clone)]
pub struct SequentialSpawner {
    id: SpawnerId,
    def: SpawnerDef,
    actors: BTreeMap<ActorId, ActorSpawnState>,
}

impl SequentialSpawner {
    pub fn new(id: SpawnerId, def: SpawnerDef) -> Result<Self, SpawnerConfigError> {
        if def.driving.len() != def.schedule.len() {
            return Err(SpawnerConfigError::ScheduleLengthMismatch {
                def_name: def.def_name,
                driving_len: def.driving.len(),
                schedule_len: def.schedule.len(),
            });
        }
        if def.first_index > def.last_index {
            return Err(SpawnerConfigError::EmptyIndexWindow {
                def_name: def.def_name,
                first_index: def.first_index,
                last_index: def.last_index,
            });
        }
        Ok(Self {
            id,
            def,
            actors: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> SpawnerId {
        self.id
    }

    pub fn def(&self) -> &SpawnerDef {
        &self.def
    }

    pub fn actor_state(&self, actor_id: ActorId) -> Option<&ActorSpawnState> {
        self.actors.get(&actor_id)
    }

    pub fn actor_states(&self) -> impl Iterator<Item = (ActorId, &ActorSpawnState)> {
        self.actors.iter().map(|(id, state)| (*id, state))
    }

    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        dt_seconds: f32,
        context: &SpawnContext<'_>,
        registry: &UnsafeRegistry,
        rng: &mut R,
        intents: &mut IntentQueue,
        events: &mut ProgressionEventBus,
    ) -> SpawnAttempt {
        let owned = context
            .ledger
            .owned_count_within(context.actor_id, &self.def.driving);
        let state = self.actors.entry(context.actor_id).or_default();
        state.progress.owned_count = owned;
        if registry.is_unsafe(context.actor_id) {
            return SpawnAttempt::Declined(DeclineReason::Unsafe);
        }

        match self.def.cadence {
            SpawnCadence::Timer { interval_seconds } => {
                state.cadence.timer_seconds += dt_seconds.max(0.0);
                if state.cadence.timer_seconds < interval_seconds {
                    return SpawnAttempt::Declined(DeclineReason::NotDue);
                }
                state.cadence.timer_seconds = 0.0;
            }
            SpawnCadence::NightGated => {
                let Some(is_night) = context.is_night else {
                    return SpawnAttempt::Declined(DeclineReason::NoClock);
                };
                let was_night = state.cadence.was_night;
                state.cadence.was_night = is_night;
                if !is_night {
                    if was_night {
                        state.cadence.armed = false;
                    }
                    return SpawnAttempt::Declined(DeclineReason::NotDue);
                }
                if was_night || state.cadence.armed {
                    return SpawnAttempt::Declined(DeclineReason::NotDue);
                }
                state.cadence.armed = true;
            }
        }

        self.attempt(context, rng, intents, events)
    }

    pub fn attempt<R: Rng + ?Sized>(
        &mut self,
        context: &SpawnContext<'_>,
        rng: &mut R,
        intents: &mut IntentQueue,
        events: &mut ProgressionEventBus,
    ) -> SpawnAttempt {
        if !context.ledger.is_attached() {
            return SpawnAttempt::Declined(DeclineReason::NoInventory);
        }
        if self.def.schedule.is_empty() {
            warn!(spawner = %self.def.def_name, "spawner_schedule_empty");
            return SpawnAttempt::Declined(DeclineReason::Exhausted);
        }

        if self.def.log_fragment_detail {
            for (slot_index, slot) in self.def.driving.slots().iter().enumerate() {
                debug!(
                    spawner = %self.def.def_name,
                    slot_index,
                    fragment = slot.as_ref().map_or("<none>", |id| id.as_str()),
                    owned = context.ledger.owns(context.actor_id, slot.as_ref()),
                    "spawner_fragment_check"
                );
            }
        }

        let owned = context
            .ledger
            .owned_count_within(context.actor_id, &self.def.driving);
        let next_index = owned;
        let state = self.actors.entry(context.actor_id).or_default();
        state.progress.owned_count = owned;
        debug!(
            spawner = %self.def.def_name,
            actor = %context.actor_id,
            owned,
            next_index,
            last_acted_index = ?state.progress.last_acted_index,
            "spawner_evaluate"
        );

        if next_index >= self.def.schedule.len() {
            debug!(spawner = %self.def.def_name, "spawner_exhausted");
            return SpawnAttempt::Declined(DeclineReason::Exhausted);
        }
        if state
            .progress
            .last_acted_index
            .is_some_and(|last| next_index <= last)
        {
            return SpawnAttempt::Declined(DeclineReason::AlreadyActed);
        }
        if next_index < self.def.first_index || next_index > self.def.last_index {
            debug!(
                spawner = %self.def.def_name,
                next_index,
                first_index = self.def.first_index,
                last_index = self.def.last_index,
                "spawner_outside_window"
            );
            return SpawnAttempt::Declined(DeclineReason::OutsideWindow);
        }
        let Some(template) = self.def.schedule.template_at(next_index).cloned() else {
            warn!(
                spawner = %self.def.def_name,
                index = next_index,
                "spawner_template_missing"
            );
            return SpawnAttempt::Declined(DeclineReason::MissingTemplate);
        };

        let placement = resolve_spawn_position(
            &PlacementRequest {
                center: context.position,
                facing: context.facing,
                min_radius: self.def.min_radius,
                max_radius: self.def.max_radius,
                on_actor: self.def.spawn_on_actor,
            },
            context.ground,
            rng,
        );
        state.progress.last_acted_index = Some(next_index);

        info!(
            spawner = %self.def.def_name,
            actor = %context.actor_id,
            index = next_index,
            template = %template,
            x = placement.position.x,
            y = placement.position.y,
            z = placement.position.z,
            source = ?placement.source,
            "enemy_spawned"
        );
        intents.enqueue(ProgressionIntent::SpawnEntity {
            template: template.clone(),
            transform: Transform::at(placement.position),
        });
        events.emit(ProgressionEvent::EnemySpawned {
            actor_id: context.actor_id,
            spawner: self.id,
            index: next_index,
            template: template.clone(),
            position: placement.position,
        });
        SpawnAttempt::Spawned {
            index: next_index,
            template,
            position: placement.position,
        }
    }
}
