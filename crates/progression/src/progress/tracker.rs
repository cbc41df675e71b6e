use serde::Serialize;

use crate::world::{ActorId, FragmentId, FragmentSet, Inventory, ProgressReadout};

use super::ledger::FragmentLedger;

pub const DEFAULT_ALL_COMPLETE_TEXT: &str =
    "All lost pages found.\nBe fully prepared before you go behind the mountain.";
pub const DEFAULT_RESYNC_INTERVAL_SECONDS: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct StoryPagesDef {
    pub pages: FragmentSet,
    pub all_complete_text: String,
    pub grant_all_on_start: bool,
    pub resync_interval_seconds: f32,
}

impl Default for StoryPagesDef {
    fn default() -> Self {
        Self {
            pages: FragmentSet::default(),
            all_complete_text: DEFAULT_ALL_COMPLETE_TEXT.to_string(),
            grant_all_on_start: false,
            resync_interval_seconds: DEFAULT_RESYNC_INTERVAL_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressTracker {
    #[serde(skip)]
    pages: FragmentSet,
    #[serde(skip)]
    all_complete_text: String,
    collected: Vec<bool>,
}

impl ProgressTracker {
    pub fn new(def: &StoryPagesDef) -> Self {
        Self {
            pages: def.pages.clone(),
            all_complete_text: def.all_complete_text.clone(),
            collected: vec![false; def.pages.len()],
        }
    }

    pub fn grant_missing(&self, actor: ActorId, inventory: &mut dyn Inventory) -> usize {
        let mut granted = 0;
        for page in self.pages.slots().iter().flatten() {
            if !inventory.has_item(actor, page, 1) {
                inventory.grant_item(actor, page, 1);
                granted += 1;
            }
        }
        granted
    }

    pub fn on_item_acquired(&mut self, fragment: &FragmentId) -> Option<FragmentId> {
        let index = self.pages.position_of(fragment)?;
        let flag = self.collected.get_mut(index)?;
        if *flag {
            return None;
        }
        *flag = true;
        Some(fragment.clone())
    }

    pub fn sync_from_inventory(&mut self, actor: ActorId, ledger: &FragmentLedger<'_>) {
        for (flag, slot) in self.collected.iter_mut().zip(self.pages.slots()) {
            if ledger.owns(actor, slot.as_ref()) {
                *flag = true;
            }
        }
    }

    pub fn collected_count(&self) -> usize {
        self.collected.iter().filter(|flag| **flag).count()
    }

    pub fn total(&self) -> usize {
        self.pages.len()
    }

    pub fn has_all_pages(&self) -> bool {
        !self.pages.is_empty() && self.collected_count() >= self.pages.len()
    }

    pub fn readout(&self) -> ProgressReadout {
        let collected = self.collected_count();
        let total = self.total();
        let text = if collected >= total {
            self.all_complete_text.clone()
        } else {
            format!("Lost pages found: {collected} / {total}")
        };
        ProgressReadout {
            collected,
            total,
            text,
        }
    }
}
