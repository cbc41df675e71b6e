use serde::Serialize;
use tracing::{debug, info, warn};

use crate::world::{
    ActorId, AudioClipId, FragmentSet, RegionBounds, TemplateId, Transform, ZoneId,
};

use super::effects::{IntentQueue, ProgressionEvent, ProgressionEventBus, ProgressionIntent};
use super::ledger::FragmentLedger;

pub const DEFAULT_HINT_MESSAGE: &str =
    "You feel something watching you...\nBut the truth is still hidden in the missing pages.";
pub const DEFAULT_ENCOUNTER_MESSAGE: &str = "Something massive is moving behind the mountain...";
pub const DEFAULT_CUE_VOLUME: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AudioCue {
    pub clip: AudioClipId,
    pub volume: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerminalDef {
    pub def_name: String,
    pub region: RegionBounds,
    pub completion: FragmentSet,
    pub template: Option<TemplateId>,
    pub spawn_point: Option<Transform>,
    pub cue: Option<AudioCue>,
    pub encounter_message: String,
    pub hint_message: String,
}

impl TerminalDef {
    pub fn spawn_transform(&self) -> Transform {
        self.spawn_point
            .unwrap_or_else(|| Transform::at(self.region.center()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TerminalState {
    pub spawned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalOutcome {
    AlreadySpawned,
    Spawned,
    Hinted,
}

#[derive(Debug, Clone)]
pub struct TerminalEncounter {
    id: ZoneId,
    def: TerminalDef,
    state: TerminalState,
}

impl TerminalEncounter {
    pub fn new(id: ZoneId, def: TerminalDef) -> Self {
        Self {
            id,
            def,
            state: TerminalState::default(),
        }
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn def(&self) -> &TerminalDef {
        &self.def
    }

    pub fn state(&self) -> TerminalState {
        self.state
    }

    pub fn on_actor_enter(
        &mut self,
        actor_id: ActorId,
        ledger: &FragmentLedger<'_>,
        intents: &mut IntentQueue,
        events: &mut ProgressionEventBus,
    ) -> TerminalOutcome {
        if self.state.spawned {
            return TerminalOutcome::AlreadySpawned;
        }

        if !ledger.has_all(actor_id, &self.def.completion) {
            debug!(terminal = %self.def.def_name, actor = %actor_id, "terminal_hint");
            intents.enqueue(ProgressionIntent::ShowMessage {
                actor_id,
                text: self.def.hint_message.clone(),
            });
            events.emit(ProgressionEvent::TerminalHint {
                actor_id,
                zone: self.id,
            });
            return TerminalOutcome::Hinted;
        }

        let transform = self.def.spawn_transform();
        match &self.def.template {
            Some(template) => intents.enqueue(ProgressionIntent::SpawnEntity {
                template: template.clone(),
                transform,
            }),
            None => warn!(terminal = %self.def.def_name, "terminal_template_missing"),
        }
        if let Some(cue) = &self.def.cue {
            intents.enqueue(ProgressionIntent::PlayAudio {
                clip: cue.clip.clone(),
                position: transform.position,
                volume: cue.volume,
            });
        }
        self.state.spawned = true;
        intents.enqueue(ProgressionIntent::ShowMessage {
            actor_id,
            text: self.def.encounter_message.clone(),
        });
        events.emit(ProgressionEvent::TerminalSpawned {
            actor_id,
            zone: self.id,
        });
        info!(terminal = %self.def.def_name, actor = %actor_id, "terminal_spawned");
        TerminalOutcome::Spawned
    }
}
