use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::world::{ActorId, FragmentSet, RegionBounds, ZoneId};

use super::effects::{IntentQueue, ProgressionEvent, ProgressionEventBus, ProgressionIntent};
use super::ledger::FragmentLedger;

pub const DEFAULT_DAMAGE_PER_SECOND: f32 = 5.0;
pub const DEFAULT_WARNING_MESSAGE: &str = "You feel sick... You left pages behind. Go back.";

#[derive(Debug, Clone, PartialEq)]
pub struct HazardDef {
    pub def_name: String,
    pub region: RegionBounds,
    pub required: FragmentSet,
    pub damage_per_second: f32,
    pub warning_message: String,
}

/// Which hazard zones currently consider each actor unsafe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsafeRegistry {
    zones_by_actor: BTreeMap<ActorId, BTreeSet<ZoneId>>,
}

impl UnsafeRegistry {
    pub fn is_unsafe(&self, actor_id: ActorId) -> bool {
        self.zones_by_actor
            .get(&actor_id)
            .is_some_and(|zones| !zones.is_empty())
    }

    pub fn is_unsafe_in(&self, actor_id: ActorId, zone: ZoneId) -> bool {
        self.zones_by_actor
            .get(&actor_id)
            .is_some_and(|zones| zones.contains(&zone))
    }

    pub fn mark(&mut self, actor_id: ActorId, zone: ZoneId) {
        self.zones_by_actor.entry(actor_id).or_default().insert(zone);
    }

    pub fn clear(&mut self, actor_id: ActorId, zone: ZoneId) {
        if let Some(zones) = self.zones_by_actor.get_mut(&actor_id) {
            zones.remove(&zone);
            if zones.is_empty() {
                self.zones_by_actor.remove(&actor_id);
            }
        }
    }

    pub fn unsafe_actors(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.zones_by_actor.keys().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HazardVerdict {
    Unevaluated,
    Safe,
    Unsafe { damage: f32 },
}

#[derive(Debug, Clone)]
pub struct HazardZone {
    id: ZoneId,
    def: HazardDef,
}

impl HazardZone {
    pub fn new(id: ZoneId, def: HazardDef) -> Self {
        Self { id, def }
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn def(&self) -> &HazardDef {
        &self.def
    }

    pub fn on_actor_stay(
        &self,
        actor_id: ActorId,
        elapsed_seconds: f32,
        ledger: &FragmentLedger<'_>,
        registry: &mut UnsafeRegistry,
        intents: &mut IntentQueue,
        events: &mut ProgressionEventBus,
    ) -> HazardVerdict {
        if !ledger.is_attached() {
            return HazardVerdict::Unevaluated;
        }
        if ledger.has_all(actor_id, &self.def.required) {
            if registry.is_unsafe_in(actor_id, self.id) {
                info!(zone = %self.def.def_name, actor = %actor_id, "hazard_cleared");
            }
            registry.clear(actor_id, self.id);
            intents.enqueue(ProgressionIntent::RefreshProgressDisplay { actor_id });
            return HazardVerdict::Safe;
        }

        if !registry.is_unsafe_in(actor_id, self.id) {
            info!(zone = %self.def.def_name, actor = %actor_id, "hazard_entered_unsafe");
        }
        registry.mark(actor_id, self.id);

        let damage = self.def.damage_per_second * elapsed_seconds.max(0.0);
        debug!(
            zone = %self.def.def_name,
            actor = %actor_id,
            damage,
            "hazard_damage"
        );
        intents.enqueue(ProgressionIntent::ApplyDamage {
            actor_id,
            amount: damage,
        });
        intents.enqueue(ProgressionIntent::ShowMessage {
            actor_id,
            text: self.def.warning_message.clone(),
        });
        events.emit(ProgressionEvent::HazardDamage {
            actor_id,
            zone: self.id,
            amount: damage,
        });
        HazardVerdict::Unsafe { damage }
    }

    pub fn on_actor_exit(
        &self,
        actor_id: ActorId,
        registry: &mut UnsafeRegistry,
        intents: &mut IntentQueue,
    ) {
        registry.clear(actor_id, self.id);
        intents.enqueue(ProgressionIntent::RefreshProgressDisplay { actor_id });
    }
}
