use std::collections::HashMap;

use crate::progress::{GateDef, HazardDef, SpawnerDef, StoryPagesDef, TerminalDef};
use crate::world::{Fragment, FragmentId};

#[derive(Debug, Default, Clone)]
pub(crate) struct LevelDefs {
    pub fragments: Vec<Fragment>,
    pub story_pages: StoryPagesDef,
    pub gates: Vec<GateDef>,
    pub hazards: Vec<HazardDef>,
    pub spawners: Vec<SpawnerDef>,
    pub terminals: Vec<TerminalDef>,
}

#[derive(Debug, Default, Clone)]
pub struct LevelDatabase {
    fragments: Vec<Fragment>,
    fragment_index_by_id: HashMap<FragmentId, usize>,
    story_pages: StoryPagesDef,
    gates: Vec<GateDef>,
    hazards: Vec<HazardDef>,
    spawners: Vec<SpawnerDef>,
    terminals: Vec<TerminalDef>,
}

impl LevelDatabase {
    pub(crate) fn from_defs(defs: LevelDefs) -> Self {
        let fragment_index_by_id = defs
            .fragments
            .iter()
            .enumerate()
            .map(|(idx, fragment)| (fragment.id.clone(), idx))
            .collect();
        Self {
            fragments: defs.fragments,
            fragment_index_by_id,
            story_pages: defs.story_pages,
            gates: defs.gates,
            hazards: defs.hazards,
            spawners: defs.spawners,
            terminals: defs.terminals,
        }
    }

    pub fn fragment(&self, id: &FragmentId) -> Option<&Fragment> {
        self.fragment_index_by_id
            .get(id)
            .and_then(|idx| self.fragments.get(*idx))
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn story_pages(&self) -> &StoryPagesDef {
        &self.story_pages
    }

    pub fn gates(&self) -> &[GateDef] {
        &self.gates
    }

    pub fn hazards(&self) -> &[HazardDef] {
        &self.hazards
    }

    pub fn spawners(&self) -> &[SpawnerDef] {
        &self.spawners
    }

    pub fn terminals(&self) -> &[TerminalDef] {
        &self.terminals
    }
}
