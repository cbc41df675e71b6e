use std::collections::{BTreeMap, BTreeSet};

use crate::world::{
    ActorId, AttributeKind, Attributes, AudioClipId, AudioService, BarrierControl, Clock,
    Fragment, FragmentId, GroundProbe, Inventory, MessageDisplay, ProgressReadout, RegionBounds,
    SpawnService, TemplateId, Transform, Vec3, WorldServices, ZoneId,
};

pub(crate) fn unit_region() -> RegionBounds {
    RegionBounds::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0))
}

#[derive(Debug, Default)]
pub(crate) struct FakeInventory {
    items: BTreeMap<ActorId, BTreeSet<FragmentId>>,
    pub granted: Vec<(ActorId, FragmentId)>,
}

impl FakeInventory {
    pub(crate) fn give(&mut self, actor: ActorId, fragment: &str) {
        self.items
            .entry(actor)
            .or_default()
            .insert(FragmentId::new(fragment));
    }

    pub(crate) fn take(&mut self, actor: ActorId, fragment: &str) {
        if let Some(items) = self.items.get_mut(&actor) {
            items.remove(&FragmentId::new(fragment));
        }
    }
}

impl Inventory for FakeInventory {
    fn has_item(&self, actor: ActorId, fragment: &FragmentId, quantity: u32) -> bool {
        quantity <= 1
            && self
                .items
                .get(&actor)
                .is_some_and(|items| items.contains(fragment))
    }

    fn grant_item(&mut self, actor: ActorId, fragment: &FragmentId, _quantity: u32) {
        self.items
            .entry(actor)
            .or_default()
            .insert(fragment.clone());
        self.granted.push((actor, fragment.clone()));
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingDisplay {
    pub messages: Vec<String>,
    pub readouts: Vec<ProgressReadout>,
    pub popups: Vec<FragmentId>,
}

impl RecordingDisplay {
    pub(crate) fn current_text(&self) -> Option<&str> {
        self.readouts.last().map(|readout| readout.text.as_str())
    }
}

impl MessageDisplay for RecordingDisplay {
    fn show_message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }

    fn refresh_progress_display(&mut self, readout: &ProgressReadout) {
        self.readouts.push(readout.clone());
    }

    fn show_fragment_popup(&mut self, fragment: &Fragment) {
        self.popups.push(fragment.id.clone());
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingAttributes {
    pub health_delta: f32,
}

impl Attributes for RecordingAttributes {
    fn add_attribute(&mut self, kind: AttributeKind, delta: f32) {
        match kind {
            AttributeKind::Health => self.health_delta += delta,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingSpawner {
    pub spawned: Vec<(TemplateId, Transform)>,
}

impl RecordingSpawner {
    pub(crate) fn templates(&self) -> Vec<&str> {
        self.spawned
            .iter()
            .map(|(template, _)| template.0.as_str())
            .collect()
    }
}

impl SpawnService for RecordingSpawner {
    fn instantiate(&mut self, template: &TemplateId, transform: Transform) {
        self.spawned.push((template.clone(), transform));
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingBarriers {
    pub removed: Vec<ZoneId>,
}

impl BarrierControl for RecordingBarriers {
    fn remove_barrier(&mut self, gate: ZoneId) {
        self.removed.push(gate);
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingAudio {
    pub played: Vec<(AudioClipId, Vec3, f32)>,
}

impl AudioService for RecordingAudio {
    fn play_clip_at_point(&mut self, clip: &AudioClipId, position: Vec3, volume: f32) {
        self.played.push((clip.clone(), position, volume));
    }
}

#[derive(Debug, Default)]
pub(crate) struct FixedClock {
    pub night: bool,
}

impl Clock for FixedClock {
    fn is_night(&self) -> bool {
        self.night
    }
}

#[derive(Debug, Default)]
pub(crate) struct FlatGround;

impl GroundProbe for FlatGround {
    fn cast_down(&self, origin: Vec3, max_distance: f32) -> Option<Vec3> {
        (origin.y >= 0.0 && origin.y <= max_distance).then_some(Vec3::new(origin.x, 0.0, origin.z))
    }
}

#[derive(Debug)]
pub(crate) struct FakeWorld {
    pub inventory: Option<FakeInventory>,
    pub displays: BTreeMap<ActorId, RecordingDisplay>,
    pub attributes: BTreeMap<ActorId, RecordingAttributes>,
    pub spawner: Option<RecordingSpawner>,
    pub barriers: Option<RecordingBarriers>,
    pub audio: Option<RecordingAudio>,
    pub clock: Option<FixedClock>,
    pub ground: Option<FlatGround>,
}

impl FakeWorld {
    pub(crate) fn with_actors(actors: &[ActorId]) -> Self {
        Self {
            inventory: Some(FakeInventory::default()),
            displays: actors
                .iter()
                .map(|actor| (*actor, RecordingDisplay::default()))
                .collect(),
            attributes: actors
                .iter()
                .map(|actor| (*actor, RecordingAttributes::default()))
                .collect(),
            spawner: Some(RecordingSpawner::default()),
            barriers: Some(RecordingBarriers::default()),
            audio: Some(RecordingAudio::default()),
            clock: Some(FixedClock::default()),
            ground: Some(FlatGround),
        }
    }

    pub(crate) fn give(&mut self, actor: ActorId, fragment: &str) {
        if let Some(inventory) = self.inventory.as_mut() {
            inventory.give(actor, fragment);
        }
    }

    pub(crate) fn take(&mut self, actor: ActorId, fragment: &str) {
        if let Some(inventory) = self.inventory.as_mut() {
            inventory.take(actor, fragment);
        }
    }

    pub(crate) fn set_night(&mut self, night: bool) {
        if let Some(clock) = self.clock.as_mut() {
            clock.night = night;
        }
    }

    pub(crate) fn display(&self, actor: ActorId) -> &RecordingDisplay {
        &self.displays[&actor]
    }

    pub(crate) fn health_delta(&self, actor: ActorId) -> f32 {
        self.attributes
            .get(&actor)
            .map_or(0.0, |attributes| attributes.health_delta)
    }

    pub(crate) fn spawned_templates(&self) -> Vec<&str> {
        self.spawner
            .as_ref()
            .map(RecordingSpawner::templates)
            .unwrap_or_default()
    }
}

impl WorldServices for FakeWorld {
    fn inventory(&self, _actor: ActorId) -> Option<&dyn Inventory> {
        self.inventory
            .as_ref()
            .map(|inventory| inventory as &dyn Inventory)
    }

    fn inventory_mut(&mut self, _actor: ActorId) -> Option<&mut dyn Inventory> {
        self.inventory
            .as_mut()
            .map(|inventory| inventory as &mut dyn Inventory)
    }

    fn message_display(&mut self, actor: ActorId) -> Option<&mut dyn MessageDisplay> {
        self.displays
            .get_mut(&actor)
            .map(|display| display as &mut dyn MessageDisplay)
    }

    fn attributes(&mut self, actor: ActorId) -> Option<&mut dyn Attributes> {
        self.attributes
            .get_mut(&actor)
            .map(|attributes| attributes as &mut dyn Attributes)
    }

    fn spawner(&mut self) -> Option<&mut dyn SpawnService> {
        self.spawner
            .as_mut()
            .map(|spawner| spawner as &mut dyn SpawnService)
    }

    fn barriers(&mut self) -> Option<&mut dyn BarrierControl> {
        self.barriers
            .as_mut()
            .map(|barriers| barriers as &mut dyn BarrierControl)
    }

    fn audio(&mut self) -> Option<&mut dyn AudioService> {
        self.audio
            .as_mut()
            .map(|audio| audio as &mut dyn AudioService)
    }

    fn clock(&self) -> Option<&dyn Clock> {
        self.clock.as_ref().map(|clock| clock as &dyn Clock)
    }

    fn ground(&self) -> Option<&dyn GroundProbe> {
        self.ground.as_ref().map(|ground| ground as &dyn GroundProbe)
    }
}
