use serde::Serialize;
use tracing::{debug, info};

use crate::world::{ActorId, FragmentSet, RegionBounds, ZoneId};

use super::effects::{IntentQueue, ProgressionEvent, ProgressionEventBus, ProgressionIntent};
use super::ledger::FragmentLedger;

pub const DEFAULT_LOCKED_MESSAGE: &str =
    "You feel something is missing... Go back and find the pages.";

#[derive(Debug, Clone, PartialEq)]
pub struct GateDef {
    pub def_name: String,
    pub region: RegionBounds,
    pub required: FragmentSet,
    pub locked_message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GateState {
    pub is_open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    AlreadyOpen,
    Opened,
    Locked,
}

#[derive(Debug, Clone)]
pub struct AreaGate {
    id: ZoneId,
    def: GateDef,
    state: GateState,
}

impl AreaGate {
    pub fn new(id: ZoneId, def: GateDef) -> Self {
        Self {
            id,
            def,
            state: GateState::default(),
        }
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn def(&self) -> &GateDef {
        &self.def
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open
    }

    pub fn on_actor_enter(
        &mut self,
        actor_id: ActorId,
        ledger: &FragmentLedger<'_>,
        intents: &mut IntentQueue,
        events: &mut ProgressionEventBus,
    ) -> GateOutcome {
        if self.state.is_open {
            return GateOutcome::AlreadyOpen;
        }

        if ledger.has_all(actor_id, &self.def.required) {
            self.state.is_open = true;
            intents.enqueue(ProgressionIntent::RemoveBarrier { gate: self.id });
            events.emit(ProgressionEvent::GateOpened {
                actor_id,
                gate: self.id,
            });
            info!(
                gate = %self.def.def_name,
                actor = %actor_id,
                "gate_opened"
            );
            return GateOutcome::Opened;
        }

        debug!(
            gate = %self.def.def_name,
            actor = %actor_id,
            message = %self.def.locked_message,
            "gate_locked"
        );
        intents.enqueue(ProgressionIntent::ShowMessage {
            actor_id,
            text: self.def.locked_message.clone(),
        });
        events.emit(ProgressionEvent::GateRefused {
            actor_id,
            gate: self.id,
        });
        GateOutcome::Locked
    }

    pub fn on_actor_exit(&mut self, actor_id: ActorId, intents: &mut IntentQueue) {
        if self.state.is_open {
            return;
        }
        intents.enqueue(ProgressionIntent::RefreshProgressDisplay { actor_id });
    }
}
