use crate::world::{ActorId, FragmentId, FragmentSet, Inventory};

#[derive(Clone, Copy)]
pub struct FragmentLedger<'a> {
    inventory: Option<&'a dyn Inventory>,
}

impl<'a> FragmentLedger<'a> {
    pub fn new(inventory: Option<&'a dyn Inventory>) -> Self {
        Self { inventory }
    }

    pub fn is_attached(&self) -> bool {
        self.inventory.is_some()
    }

    pub fn owns(&self, actor: ActorId, fragment: Option<&FragmentId>) -> bool {
        match (self.inventory, fragment) {
            (Some(inventory), Some(fragment)) => inventory.has_item(actor, fragment, 1),
            _ => false,
        }
    }

    pub fn owned_count_within(&self, actor: ActorId, set: &FragmentSet) -> usize {
        set.slots()
            .iter()
            .filter(|slot| self.owns(actor, slot.as_ref()))
            .count()
    }

    pub fn has_all(&self, actor: ActorId, set: &FragmentSet) -> bool {
        if self.inventory.is_none() {
            return false;
        }
        self.owned_count_within(actor, set) == set.len()
    }
}

impl std::fmt::Debug for FragmentLedger<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentLedger")
            .field("attached", &self.inventory.is_some())
            .finish()
    }
}
