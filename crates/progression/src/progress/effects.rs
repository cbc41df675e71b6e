use serde::Serialize;

use crate::world::{
    ActorId, AudioClipId, FragmentId, SpawnerId, TemplateId, Transform, Vec3, ZoneId,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressionIntent {
    ShowMessage {
        actor_id: ActorId,
        text: String,
    },
    RefreshProgressDisplay {
        actor_id: ActorId,
    },
    ShowFragmentPopup {
        actor_id: ActorId,
        fragment: FragmentId,
    },
    RemoveBarrier {
        gate: ZoneId,
    },
    ApplyDamage {
        actor_id: ActorId,
        amount: f32,
    },
    SpawnEntity {
        template: TemplateId,
        transform: Transform,
    },
    PlayAudio {
        clip: AudioClipId,
        position: Vec3,
        volume: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressionIntentKind {
    ShowMessage,
    RefreshProgressDisplay,
    ShowFragmentPopup,
    RemoveBarrier,
    ApplyDamage,
    SpawnEntity,
    PlayAudio,
}

impl ProgressionIntent {
    pub fn kind(&self) -> ProgressionIntentKind {
        match self {
            Self::ShowMessage { .. } => ProgressionIntentKind::ShowMessage,
            Self::RefreshProgressDisplay { .. } => ProgressionIntentKind::RefreshProgressDisplay,
            Self::ShowFragmentPopup { .. } => ProgressionIntentKind::ShowFragmentPopup,
            Self::RemoveBarrier { .. } => ProgressionIntentKind::RemoveBarrier,
            Self::ApplyDamage { .. } => ProgressionIntentKind::ApplyDamage,
            Self::SpawnEntity { .. } => ProgressionIntentKind::SpawnEntity,
            Self::PlayAudio { .. } => ProgressionIntentKind::PlayAudio,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntentApplyStats {
    pub total: u32,
    pub show_message: u32,
    pub refresh_progress_display: u32,
    pub show_fragment_popup: u32,
    pub remove_barrier: u32,
    pub apply_damage: u32,
    pub spawn_entity: u32,
    pub play_audio: u32,
    pub missing_collaborator_count: u32,
}

impl IntentApplyStats {
    pub fn record_intent(&mut self, kind: ProgressionIntentKind) {
        self.total = self.total.saturating_add(1);
        match kind {
            ProgressionIntentKind::ShowMessage => {
                self.show_message = self.show_message.saturating_add(1)
            }
            ProgressionIntentKind::RefreshProgressDisplay => {
                self.refresh_progress_display = self.refresh_progress_display.saturating_add(1)
            }
            ProgressionIntentKind::ShowFragmentPopup => {
                self.show_fragment_popup = self.show_fragment_popup.saturating_add(1)
            }
            ProgressionIntentKind::RemoveBarrier => {
                self.remove_barrier = self.remove_barrier.saturating_add(1)
            }
            ProgressionIntentKind::ApplyDamage => {
                self.apply_damage = self.apply_damage.saturating_add(1)
            }
            ProgressionIntentKind::SpawnEntity => {
                self.spawn_entity = self.spawn_entity.saturating_add(1)
            }
            ProgressionIntentKind::PlayAudio => self.play_audio = self.play_audio.saturating_add(1),
        }
    }

    pub fn record_missing_collaborator(&mut self) {
        self.missing_collaborator_count = self.missing_collaborator_count.saturating_add(1);
    }
}

#[derive(Debug, Default)]
pub struct IntentQueue {
    intents: Vec<ProgressionIntent>,
}

impl IntentQueue {
    pub fn enqueue(&mut self, intent: ProgressionIntent) {
        self.intents.push(intent);
    }

    pub fn drain_current_tick(&mut self) -> Vec<ProgressionIntent> {
        std::mem::take(&mut self.intents)
    }

    pub fn pending(&self) -> &[ProgressionIntent] {
        &self.intents
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressionEvent {
    FragmentAnnounced {
        actor_id: ActorId,
        fragment: FragmentId,
    },
    GateOpened {
        actor_id: ActorId,
        gate: ZoneId,
    },
    GateRefused {
        actor_id: ActorId,
        gate: ZoneId,
    },
    HazardDamage {
        actor_id: ActorId,
        zone: ZoneId,
        amount: f32,
    },
    EnemySpawned {
        actor_id: ActorId,
        spawner: SpawnerId,
        index: usize,
        template: TemplateId,
        position: Vec3,
    },
    TerminalSpawned {
        actor_id: ActorId,
        zone: ZoneId,
    },
    TerminalHint {
        actor_id: ActorId,
        zone: ZoneId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressionEventKind {
    FragmentAnnounced,
    GateOpened,
    GateRefused,
    HazardDamage,
    EnemySpawned,
    TerminalSpawned,
    TerminalHint,
}

impl ProgressionEvent {
    pub fn kind(&self) -> ProgressionEventKind {
        match self {
            Self::FragmentAnnounced { .. } => ProgressionEventKind::FragmentAnnounced,
            Self::GateOpened { .. } => ProgressionEventKind::GateOpened,
            Self::GateRefused { .. } => ProgressionEventKind::GateRefused,
            Self::HazardDamage { .. } => ProgressionEventKind::HazardDamage,
            Self::EnemySpawned { .. } => ProgressionEventKind::EnemySpawned,
            Self::TerminalSpawned { .. } => ProgressionEventKind::TerminalSpawned,
            Self::TerminalHint { .. } => ProgressionEventKind::TerminalHint,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressionEventCounts {
    pub total: u32,
    pub fragment_announced: u32,
    pub gate_opened: u32,
    pub gate_refused: u32,
    pub hazard_damage: u32,
    pub enemy_spawned: u32,
    pub terminal_spawned: u32,
    pub terminal_hint: u32,
}

impl ProgressionEventCounts {
    pub fn record(&mut self, kind: ProgressionEventKind) {
        self.total = self.total.saturating_add(1);
        match kind {
            ProgressionEventKind::FragmentAnnounced => {
                self.fragment_announced = self.fragment_announced.saturating_add(1)
            }
            ProgressionEventKind::GateOpened => {
                self.gate_opened = self.gate_opened.saturating_add(1)
            }
            ProgressionEventKind::GateRefused => {
                self.gate_refused = self.gate_refused.saturating_add(1)
            }
            ProgressionEventKind::HazardDamage => {
                self.hazard_damage = self.hazard_damage.saturating_add(1)
            }
            ProgressionEventKind::EnemySpawned => {
                self.enemy_spawned = self.enemy_spawned.saturating_add(1)
            }
            ProgressionEventKind::TerminalSpawned => {
                self.terminal_spawned = self.terminal_spawned.saturating_add(1)
            }
            ProgressionEventKind::TerminalHint => {
                self.terminal_hint = self.terminal_hint.saturating_add(1)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ProgressionEventBus {
    current_tick_events: Vec<ProgressionEvent>,
    last_tick_counts: ProgressionEventCounts,
}

impl ProgressionEventBus {
    pub fn emit(&mut self, event: ProgressionEvent) {
        self.current_tick_events.push(event);
    }

    pub fn iter_emitted_so_far(&self) -> impl Iterator<Item = &ProgressionEvent> {
        self.current_tick_events.iter()
    }

    pub fn finish_tick_rollover(&mut self) -> Vec<ProgressionEvent> {
        let mut counts = ProgressionEventCounts::default();
        for event in &self.current_tick_events {
            counts.record(event.kind());
        }
        self.last_tick_counts = counts;
        std::mem::take(&mut self.current_tick_events)
    }

    pub fn last_tick_counts(&self) -> ProgressionEventCounts {
        self.last_tick_counts
    }
}
