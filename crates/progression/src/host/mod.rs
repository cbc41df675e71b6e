use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::content::LevelDatabase;
use crate::progress::{
    ActorSpawnState, AreaGate, DeclineReason, FragmentLedger, HazardZone, IntentApplyStats,
    IntentQueue, ProgressTracker, ProgressionEvent, ProgressionEventBus, ProgressionEventCounts,
    ProgressionIntent, SequentialSpawner, SpawnAttempt, SpawnContext, SpawnerConfigError,
    StoryPagesDef, TerminalEncounter, UnsafeRegistry,
};
use crate::world::{
    ActorId, AttributeKind, Fragment, FragmentId, RegionBounds, SpawnerId, Vec3, WorldServices,
    ZoneId, ZoneKind,
};

pub const PROGRESSION_SYSTEM_ORDER_TEXT: &str = "Triggers>Hazards>Spawners>ApplyIntents";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressionSystemId {
    Triggers,
    Hazards,
    Spawners,
    ApplyIntents,
}

impl ProgressionSystemId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Triggers => "Triggers",
            Self::Hazards => "Hazards",
            Self::Spawners => "Spawners",
            Self::ApplyIntents => "ApplyIntents",
        }
    }
}

/// Hazards must write the unsafe registry before spawners read it.
pub const PROGRESSION_SYSTEM_ORDER: [ProgressionSystemId; 4] = [
    ProgressionSystemId::Triggers,
    ProgressionSystemId::Hazards,
    ProgressionSystemId::Spawners,
    ProgressionSystemId::ApplyIntents,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPhase {
    Enter,
    Stay,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub actor_id: ActorId,
    pub zone: ZoneId,
    pub phase: TriggerPhase,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorFrame {
    pub actor_id: ActorId,
    pub position: Vec3,
    pub facing: Vec3,
}

#[derive(Debug, Clone, Copy)]
pub struct TickInput<'a> {
    pub dt_seconds: f32,
    pub triggers: &'a [TriggerEvent],
    pub actors: &'a [ActorFrame],
}

#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<ProgressionEvent>,
    pub event_counts: ProgressionEventCounts,
    pub apply_stats: IntentApplyStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct GateSnapshot {
    pub def_name: String,
    pub zone: ZoneId,
    pub is_open: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpawnerActorSnapshot {
    pub actor_id: ActorId,
    pub state: ActorSpawnState,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpawnerSnapshot {
    pub def_name: String,
    pub id: SpawnerId,
    pub actors: Vec<SpawnerActorSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TerminalSnapshot {
    pub def_name: String,
    pub zone: ZoneId,
    pub spawned: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackerSnapshot {
    pub actor_id: ActorId,
    pub collected: usize,
    pub total: usize,
    pub all_pages_found: bool,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressionSnapshot {
    pub tick: u64,
    pub gates: Vec<GateSnapshot>,
    pub spawners: Vec<SpawnerSnapshot>,
    pub terminals: Vec<TerminalSnapshot>,
    pub unsafe_actors: Vec<ActorId>,
    pub trackers: Vec<TrackerSnapshot>,
}

#[derive(Debug)]
pub struct ProgressionHost {
    fragments: BTreeMap<FragmentId, Fragment>,
    story_pages: StoryPagesDef,
    gates: Vec<AreaGate>,
    hazards: Vec<HazardZone>,
    spawners: Vec<SequentialSpawner>,
    terminals: Vec<TerminalEncounter>,
    registry: UnsafeRegistry,
    trackers: BTreeMap<ActorId, ProgressTracker>,
    resync_elapsed_seconds: f32,
    intents: IntentQueue,
    events: ProgressionEventBus,
    rng: SmallRng,
    tick: u64,
    last_tick_order: Vec<ProgressionSystemId>,
}

impl ProgressionHost {
    pub fn from_level(level: &LevelDatabase, seed: u64) -> Result<Self, SpawnerConfigError> {
        let gates = level
            .gates()
            .iter()
            .enumerate()
            .map(|(idx, def)| AreaGate::new(ZoneId::gate(idx as u32), def.clone()))
            .collect();
        let hazards = level
            .hazards()
            .iter()
            .enumerate()
            .map(|(idx, def)| HazardZone::new(ZoneId::hazard(idx as u32), def.clone()))
            .collect();
        let spawners = level
            .spawners()
            .iter()
            .enumerate()
            .map(|(idx, def)| SequentialSpawner::new(SpawnerId(idx as u32), def.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let terminals = level
            .terminals()
            .iter()
            .enumerate()
            .map(|(idx, def)| TerminalEncounter::new(ZoneId::terminal(idx as u32), def.clone()))
            .collect();

        info!(
            gates = level.gates().len(),
            hazards = level.hazards().len(),
            spawners = level.spawners().len(),
            terminals = level.terminals().len(),
            pages = level.story_pages().pages.len(),
            seed,
            order = PROGRESSION_SYSTEM_ORDER_TEXT,
            "progression_host_ready"
        );

        Ok(Self {
            fragments: level
                .fragments()
                .iter()
                .map(|fragment| (fragment.id.clone(), fragment.clone()))
                .collect(),
            story_pages: level.story_pages().clone(),
            gates,
            hazards,
            spawners,
            terminals,
            registry: UnsafeRegistry::default(),
            trackers: BTreeMap::new(),
            resync_elapsed_seconds: 0.0,
            intents: IntentQueue::default(),
            events: ProgressionEventBus::default(),
            rng: SmallRng::seed_from_u64(seed),
            tick: 0,
            last_tick_order: Vec::with_capacity(PROGRESSION_SYSTEM_ORDER.len()),
        })
    }

    pub fn trigger_regions(&self) -> Vec<(ZoneId, RegionBounds)> {
        let gates = self.gates.iter().map(|gate| (gate.id(), gate.def().region));
        let hazards = self
            .hazards
            .iter()
            .map(|hazard| (hazard.id(), hazard.def().region));
        let terminals = self
            .terminals
            .iter()
            .map(|terminal| (terminal.id(), terminal.def().region));
        gates.chain(hazards).chain(terminals).collect()
    }

    pub fn last_tick_order(&self) -> &[ProgressionSystemId] {
        &self.last_tick_order
    }

    pub fn is_unsafe(&self, actor_id: ActorId) -> bool {
        self.registry.is_unsafe(actor_id)
    }

    pub fn gate_is_open(&self, zone: ZoneId) -> bool {
        self.gates
            .get(zone.index as usize)
            .is_some_and(|gate| zone.kind == ZoneKind::Gate && gate.is_open())
    }

    pub fn tracker(&self, actor_id: ActorId) -> Option<&ProgressTracker> {
        self.trackers.get(&actor_id)
    }

    pub fn start_actor(&mut self, actor_id: ActorId, world: &mut dyn WorldServices) {
        let mut tracker = ProgressTracker::new(&self.story_pages);
        if self.story_pages.grant_all_on_start {
            match world.inventory_mut(actor_id) {
                Some(inventory) => {
                    let granted = tracker.grant_missing(actor_id, inventory);
                    info!(actor = %actor_id, granted, "story_pages_granted_on_start");
                }
                None => warn!(actor = %actor_id, "story_pages_grant_skipped_no_inventory"),
            }
        }
        tracker.sync_from_inventory(actor_id, &FragmentLedger::new(world.inventory(actor_id)));
        self.trackers.insert(actor_id, tracker);
        self.intents
            .enqueue(ProgressionIntent::RefreshProgressDisplay { actor_id });
    }

    pub fn notify_item_acquired(&mut self, actor_id: ActorId, fragment: &FragmentId) {
        let tracker = self
            .trackers
            .entry(actor_id)
            .or_insert_with(|| ProgressTracker::new(&self.story_pages));
        if let Some(fragment) = tracker.on_item_acquired(fragment) {
            info!(actor = %actor_id, fragment = %fragment, "fragment_announced");
            self.events.emit(ProgressionEvent::FragmentAnnounced {
                actor_id,
                fragment: fragment.clone(),
            });
            self.intents.enqueue(ProgressionIntent::ShowFragmentPopup { actor_id, fragment });
        }
        self.intents
            .enqueue(ProgressionIntent::RefreshProgressDisplay { actor_id });
    }

    pub fn run_tick(&mut self, input: &TickInput<'_>, world: &mut dyn WorldServices) -> TickReport {
        self.tick = self.tick.saturating_add(1);
        self.last_tick_order.clear();
        let mut apply_stats = IntentApplyStats::default();
        for system_id in PROGRESSION_SYSTEM_ORDER {
            self.last_tick_order.push(system_id);
            match system_id {
                ProgressionSystemId::Triggers => self.run_triggers(input, world),
                ProgressionSystemId::Hazards => self.run_hazards(input, world),
                ProgressionSystemId::Spawners => self.run_spawners(input, world),
                ProgressionSystemId::ApplyIntents => {
                    apply_stats = self.apply_intents(input.dt_seconds, world);
                }
            }
        }

        let events = self.events.finish_tick_rollover();
        TickReport {
            tick: self.tick,
            events,
            event_counts: self.events.last_tick_counts(),
            apply_stats,
        }
    }

    fn run_triggers(&mut self, input: &TickInput<'_>, world: &dyn WorldServices) {
        for trigger in input.triggers {
            let ledger = FragmentLedger::new(world.inventory(trigger.actor_id));
            match (trigger.zone.kind, trigger.phase) {
                (ZoneKind::Gate, phase) => {
                    let Some(gate) = self.gates.get_mut(trigger.zone.index as usize) else {
                        warn!(zone = ?trigger.zone, "trigger_zone_unknown");
                        continue;
                    };
                    match phase {
                        TriggerPhase::Enter => {
                            gate.on_actor_enter(
                                trigger.actor_id,
                                &ledger,
                                &mut self.intents,
                                &mut self.events,
                            );
                        }
                        TriggerPhase::Exit => gate.on_actor_exit(trigger.actor_id, &mut self.intents),
                        TriggerPhase::Stay => {}
                    }
                }
                (ZoneKind::Terminal, TriggerPhase::Enter) => {
                    let Some(terminal) = self.terminals.get_mut(trigger.zone.index as usize) else {
                        warn!(zone = ?trigger.zone, "trigger_zone_unknown");
                        continue;
                    };
                    terminal.on_actor_enter(
                        trigger.actor_id,
                        &ledger,
                        &mut self.intents,
                        &mut self.events,
                    );
                }
                (ZoneKind::Terminal, _) | (ZoneKind::Hazard, _) => {}
            }
        }
    }

    fn run_hazards(&mut self, input: &TickInput<'_>, world: &dyn WorldServices) {
        for trigger in input
            .triggers
            .iter()
            .filter(|trigger| trigger.zone.kind == ZoneKind::Hazard)
        {
            let Some(hazard) = self.hazards.get(trigger.zone.index as usize) else {
                warn!(zone = ?trigger.zone, "trigger_zone_unknown");
                continue;
            };
            match trigger.phase {
                TriggerPhase::Enter | TriggerPhase::Stay => {
                    let ledger = FragmentLedger::new(world.inventory(trigger.actor_id));
                    hazard.on_actor_stay(
                        trigger.actor_id,
                        input.dt_seconds,
                        &ledger,
                        &mut self.registry,
                        &mut self.intents,
                        &mut self.events,
                    );
                }
                TriggerPhase::Exit => {
                    hazard.on_actor_exit(trigger.actor_id, &mut self.registry, &mut self.intents)
                }
            }
        }
    }

    fn run_spawners(&mut self, input: &TickInput<'_>, world: &dyn WorldServices) {
        let is_night = world.clock().map(|clock| clock.is_night());
        for frame in input.actors {
            let context = SpawnContext {
                actor_id: frame.actor_id,
                position: frame.position,
                facing: frame.facing,
                is_night,
                ledger: FragmentLedger::new(world.inventory(frame.actor_id)),
                ground: world.ground(),
            };
            for spawner in &mut self.spawners {
                let attempt = spawner.tick(
                    input.dt_seconds,
                    &context,
                    &self.registry,
                    &mut self.rng,
                    &mut self.intents,
                    &mut self.events,
                );
                if let SpawnAttempt::Declined(
                    reason @ (DeclineReason::Unsafe
                    | DeclineReason::OutsideWindow
                    | DeclineReason::MissingTemplate
                    | DeclineReason::NoInventory),
                ) = attempt
                {
                    debug!(
                        spawner = %spawner.def().def_name,
                        actor = %frame.actor_id,
                        ?reason,
                        "spawn_declined"
                    );
                }
            }
        }
    }

    fn apply_intents(&mut self, dt_seconds: f32, world: &mut dyn WorldServices) -> IntentApplyStats {
        self.resync_trackers_if_due(dt_seconds, world);

        let mut stats = IntentApplyStats::default();
        for intent in self.intents.drain_current_tick() {
            stats.record_intent(intent.kind());
            let applied = match intent {
                ProgressionIntent::ShowMessage { actor_id, text } => world
                    .message_display(actor_id)
                    .map(|display| display.show_message(&text))
                    .is_some(),
                ProgressionIntent::RefreshProgressDisplay { actor_id } => {
                    let readout = {
                        let ledger = FragmentLedger::new(world.inventory(actor_id));
                        let tracker = self
                            .trackers
                            .entry(actor_id)
                            .or_insert_with(|| ProgressTracker::new(&self.story_pages));
                        tracker.sync_from_inventory(actor_id, &ledger);
                        tracker.readout()
                    };
                    world
                        .message_display(actor_id)
                        .map(|display| display.refresh_progress_display(&readout))
                        .is_some()
                }
                ProgressionIntent::ShowFragmentPopup { actor_id, fragment } => {
                    let details = self.fragments.get(&fragment).cloned().unwrap_or_else(|| {
                        warn!(fragment = %fragment, "fragment_details_missing");
                        Fragment {
                            title: fragment.to_string(),
                            id: fragment,
                            body: String::new(),
                            icon: None,
                        }
                    });
                    world
                        .message_display(actor_id)
                        .map(|display| display.show_fragment_popup(&details))
                        .is_some()
                }
                ProgressionIntent::RemoveBarrier { gate } => world
                    .barriers()
                    .map(|barriers| barriers.remove_barrier(gate))
                    .is_some(),
                ProgressionIntent::ApplyDamage { actor_id, amount } => world
                    .attributes(actor_id)
                    .map(|attributes| attributes.add_attribute(AttributeKind::Health, -amount))
                    .is_some(),
                ProgressionIntent::SpawnEntity {
                    template,
                    transform,
                } => world
                    .spawner()
                    .map(|spawner| spawner.instantiate(&template, transform))
                    .is_some(),
                ProgressionIntent::PlayAudio {
                    clip,
                    position,
                    volume,
                } => world
                    .audio()
                    .map(|audio| audio.play_clip_at_point(&clip, position, volume))
                    .is_some(),
            };
            if !applied {
                stats.record_missing_collaborator();
            }
        }
        stats
    }

    fn resync_trackers_if_due(&mut self, dt_seconds: f32, world: &dyn WorldServices) {
        self.resync_elapsed_seconds += dt_seconds.max(0.0);
        if self.resync_elapsed_seconds < self.story_pages.resync_interval_seconds {
            return;
        }
        self.resync_elapsed_seconds = 0.0;

        for (actor_id, tracker) in &mut self.trackers {
            let before = tracker.collected_count();
            tracker.sync_from_inventory(*actor_id, &FragmentLedger::new(world.inventory(*actor_id)));
            if tracker.collected_count() != before {
                debug!(
                    actor = %actor_id,
                    collected = tracker.collected_count(),
                    "tracker_resynced"
                );
                self.intents
                    .enqueue(ProgressionIntent::RefreshProgressDisplay {
                        actor_id: *actor_id,
                    });
            }
        }
    }

    pub fn snapshot(&self) -> ProgressionSnapshot {
        ProgressionSnapshot {
            tick: self.tick,
            gates: self
                .gates
                .iter()
                .map(|gate| GateSnapshot {
                    def_name: gate.def().def_name.clone(),
                    zone: gate.id(),
                    is_open: gate.is_open(),
                })
                .collect(),
            spawners: self
                .spawners
                .iter()
                .map(|spawner| SpawnerSnapshot {
                    def_name: spawner.def().def_name.clone(),
                    id: spawner.id(),
                    actors: spawner
                        .actor_states()
                        .map(|(actor_id, state)| SpawnerActorSnapshot {
                            actor_id,
                            state: *state,
                        })
                        .collect(),
                })
                .collect(),
            terminals: self
                .terminals
                .iter()
                .map(|terminal| TerminalSnapshot {
                    def_name: terminal.def().def_name.clone(),
                    zone: terminal.id(),
                    spawned: terminal.state().spawned,
                })
                .collect(),
            unsafe_actors: self.registry.unsafe_actors().collect(),
            trackers: self
                .trackers
                .iter()
                .map(|(actor_id, tracker)| {
                    let readout = tracker.readout();
                    TrackerSnapshot {
                        actor_id: *actor_id,
                        collected: readout.collected,
                        total: readout.total,
                        all_pages_found: tracker.has_all_pages(),
                        text: readout.text,
                    }
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests;
