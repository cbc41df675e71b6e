use std::collections::{BTreeMap, BTreeSet};

use progression::world::{
    ActorId, AttributeKind, Attributes, AudioClipId, AudioService, BarrierControl, Clock,
    Fragment, FragmentId, GroundProbe, Inventory, MessageDisplay, ProgressReadout,
    SpawnService, TemplateId, Transform, Vec3, WorldServices, ZoneId,
};
use serde::Serialize;
use tracing::{debug, info};

pub(crate) const STARTING_HEALTH: f32 = 100.0;

#[derive(Debug, Default)]
pub(crate) struct SimInventory {
    attached: BTreeSet<ActorId>,
    items: BTreeMap<ActorId, BTreeMap<FragmentId, u32>>,
}

impl SimInventory {
    pub fn attach(&mut self, actor: ActorId) {
        self.attached.insert(actor);
    }

    pub fn is_attached(&self, actor: ActorId) -> bool {
        self.attached.contains(&actor)
    }

    pub fn add(&mut self, actor: ActorId, fragment: &FragmentId, quantity: u32) -> bool {
        if !self.is_attached(actor) {
            return false;
        }
        let held = self
            .items
            .entry(actor)
            .or_default()
            .entry(fragment.clone())
            .or_insert(0);
        let was_empty = *held == 0;
        *held = held.saturating_add(quantity);
        was_empty
    }

    pub fn remove(&mut self, actor: ActorId, fragment: &FragmentId) -> bool {
        self.items
            .get_mut(&actor)
            .and_then(|items| items.remove(fragment))
            .is_some()
    }

    pub fn held(&self, actor: ActorId) -> Vec<FragmentId> {
        self.items
            .get(&actor)
            .map(|items| {
                items
                    .iter()
                    .filter(|(_, count)| **count > 0)
                    .map(|(fragment, _)| fragment.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Inventory for SimInventory {
    fn has_item(&self, actor: ActorId, fragment: &FragmentId, quantity: u32) -> bool {
        self.items
            .get(&actor)
            .and_then(|items| items.get(fragment))
            .is_some_and(|held| *held >= quantity)
    }

    fn grant_item(&mut self, actor: ActorId, fragment: &FragmentId, quantity: u32) {
        self.add(actor, fragment, quantity);
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct Hud {
    pub text: String,
    pub last_message: Option<String>,
    pub message_count: u32,
    pub popups: Vec<String>,
}

impl MessageDisplay for Hud {
    fn show_message(&mut self, text: &str) {
        if self.last_message.as_deref() != Some(text) {
            debug!(text, "hud_message");
        }
        self.text = text.to_string();
        self.last_message = Some(text.to_string());
        self.message_count = self.message_count.saturating_add(1);
    }

    fn refresh_progress_display(&mut self, readout: &ProgressReadout) {
        self.text = readout.text.clone();
    }

    fn show_fragment_popup(&mut self, fragment: &Fragment) {
        info!(fragment = %fragment.id, title = %fragment.title, "hud_popup");
        self.popups.push(fragment.title.clone());
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct HealthPool {
    pub current: f32,
}

impl Default for HealthPool {
    fn default() -> Self {
        Self {
            current: STARTING_HEALTH,
        }
    }
}

impl Attributes for HealthPool {
    fn add_attribute(&mut self, kind: AttributeKind, delta: f32) {
        match kind {
            AttributeKind::Health => self.current = (self.current + delta).max(0.0),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SpawnRecord {
    pub template: TemplateId,
    pub position: Vec3,
    pub yaw_radians: Option<f32>,
}

#[derive(Debug, Default)]
pub(crate) struct SpawnLog {
    pub records: Vec<SpawnRecord>,
}

impl SpawnService for SpawnLog {
    fn instantiate(&mut self, template: &TemplateId, transform: Transform) {
        self.records.push(SpawnRecord {
            template: template.clone(),
            position: transform.position,
            yaw_radians: transform.yaw_radians,
        });
    }
}

#[derive(Debug, Default)]
pub(crate) struct BarrierLog {
    pub removed: Vec<ZoneId>,
}

impl BarrierControl for BarrierLog {
    fn remove_barrier(&mut self, gate: ZoneId) {
        if !self.removed.contains(&gate) {
            self.removed.push(gate);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AudioRecord {
    pub clip: AudioClipId,
    pub position: Vec3,
    pub volume: f32,
}

#[derive(Debug, Default)]
pub(crate) struct AudioLog {
    pub played: Vec<AudioRecord>,
}

impl AudioService for AudioLog {
    fn play_clip_at_point(&mut self, clip: &AudioClipId, position: Vec3, volume: f32) {
        self.played.push(AudioRecord {
            clip: clip.clone(),
            position,
            volume,
        });
    }
}

/// Day first, then night for the trailing `night_fraction` of each cycle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DayNightClock {
    elapsed_seconds: f32,
    day_length_seconds: f32,
    night_fraction: f32,
}

impl DayNightClock {
    pub fn new(day_length_seconds: f32, night_fraction: f32) -> Self {
        Self {
            elapsed_seconds: 0.0,
            day_length_seconds: day_length_seconds.max(f32::EPSILON),
            night_fraction: night_fraction.clamp(0.0, 1.0),
        }
    }

    pub fn advance(&mut self, dt_seconds: f32) {
        self.elapsed_seconds += dt_seconds.max(0.0);
    }

    fn phase(&self) -> f32 {
        (self.elapsed_seconds % self.day_length_seconds) / self.day_length_seconds
    }
}

impl Clock for DayNightClock {
    fn is_night(&self) -> bool {
        self.night_fraction > 0.0 && self.phase() >= 1.0 - self.night_fraction
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FlatGround {
    pub height: f32,
}

impl GroundProbe for FlatGround {
    fn cast_down(&self, origin: Vec3, max_distance: f32) -> Option<Vec3> {
        let drop = origin.y - self.height;
        (drop >= 0.0 && drop <= max_distance).then(|| Vec3::new(origin.x, self.height, origin.z))
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ActorSummary {
    pub actor_id: ActorId,
    pub health: Option<f32>,
    pub fragments: Vec<FragmentId>,
    pub hud: Option<Hud>,
}

pub(crate) struct SimWorld {
    inventory: SimInventory,
    huds: BTreeMap<ActorId, Hud>,
    health: BTreeMap<ActorId, HealthPool>,
    spawns: SpawnLog,
    barriers: BarrierLog,
    audio: AudioLog,
    clock: DayNightClock,
    ground: FlatGround,
    actors: BTreeSet<ActorId>,
}

impl SimWorld {
    pub fn new(clock: DayNightClock) -> Self {
        Self {
            inventory: SimInventory::default(),
            huds: BTreeMap::new(),
            health: BTreeMap::new(),
            spawns: SpawnLog::default(),
            barriers: BarrierLog::default(),
            audio: AudioLog::default(),
            clock,
            ground: FlatGround::default(),
            actors: BTreeSet::new(),
        }
    }

    pub fn add_actor(&mut self, actor: ActorId, inventory: bool, display: bool, attributes: bool) {
        self.actors.insert(actor);
        if inventory {
            self.inventory.attach(actor);
        }
        if display {
            self.huds.insert(actor, Hud::default());
        }
        if attributes {
            self.health.insert(actor, HealthPool::default());
        }
    }

    pub fn grant(&mut self, actor: ActorId, fragment: &FragmentId) -> bool {
        self.inventory.add(actor, fragment, 1)
    }

    pub fn revoke(&mut self, actor: ActorId, fragment: &FragmentId) -> bool {
        self.inventory.remove(actor, fragment)
    }

    pub fn has_inventory(&self, actor: ActorId) -> bool {
        self.inventory.is_attached(actor)
    }

    pub fn advance_clock(&mut self, dt_seconds: f32) {
        self.clock.advance(dt_seconds);
    }

    pub fn spawn_records(&self) -> &[SpawnRecord] {
        &self.spawns.records
    }

    pub fn removed_barriers(&self) -> &[ZoneId] {
        &self.barriers.removed
    }

    pub fn audio_records(&self) -> &[AudioRecord] {
        &self.audio.played
    }

    pub fn actor_summaries(&self) -> Vec<ActorSummary> {
        self.actors
            .iter()
            .map(|actor| ActorSummary {
                actor_id: *actor,
                health: self.health.get(actor).map(|pool| pool.current),
                fragments: self.inventory.held(*actor),
                hud: self.huds.get(actor).cloned(),
            })
            .collect()
    }
}

impl WorldServices for SimWorld {
    fn inventory(&self, actor: ActorId) -> Option<&dyn Inventory> {
        self.inventory
            .is_attached(actor)
            .then_some(&self.inventory as &dyn Inventory)
    }

    fn inventory_mut(&mut self, actor: ActorId) -> Option<&mut dyn Inventory> {
        if self.inventory.is_attached(actor) {
            Some(&mut self.inventory)
        } else {
            None
        }
    }

    fn message_display(&mut self, actor: ActorId) -> Option<&mut dyn MessageDisplay> {
        self.huds
            .get_mut(&actor)
            .map(|hud| hud as &mut dyn MessageDisplay)
    }

    fn attributes(&mut self, actor: ActorId) -> Option<&mut dyn Attributes> {
        self.health
            .get_mut(&actor)
            .map(|pool| pool as &mut dyn Attributes)
    }

    fn spawner(&mut self) -> Option<&mut dyn SpawnService> {
        Some(&mut self.spawns)
    }

    fn barriers(&mut self) -> Option<&mut dyn BarrierControl> {
        Some(&mut self.barriers)
    }

    fn audio(&mut self) -> Option<&mut dyn AudioService> {
        Some(&mut self.audio)
    }

    fn clock(&self) -> Option<&dyn Clock> {
        Some(&self.clock)
    }

    fn ground(&self) -> Option<&dyn GroundProbe> {
        Some(&self.ground)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_in_day_and_turns_to_night() {
        let mut clock = DayNightClock::new(10.0, 0.4);
        assert!(!clock.is_night());
        clock.advance(5.9);
        assert!(!clock.is_night());
        clock.advance(0.2);
        assert!(clock.is_night());
        clock.advance(4.0);
        assert!(!clock.is_night());
    }

    #[test]
    fn zero_night_fraction_never_turns_night() {
        let mut clock = DayNightClock::new(4.0, 0.0);
        for _ in 0..40 {
            clock.advance(0.25);
            assert!(!clock.is_night());
        }
    }

    #[test]
    fn flat_ground_hits_only_within_range_below_origin() {
        let ground = FlatGround { height: 0.0 };
        assert_eq!(
            ground.cast_down(Vec3::new(3.0, 20.0, -2.0), 40.0),
            Some(Vec3::new(3.0, 0.0, -2.0))
        );
        assert_eq!(ground.cast_down(Vec3::new(0.0, 50.0, 0.0), 40.0), None);
        assert_eq!(ground.cast_down(Vec3::new(0.0, -1.0, 0.0), 40.0), None);
    }

    #[test]
    fn detached_inventory_is_hidden_and_ignores_grants() {
        let mut world = SimWorld::new(DayNightClock::new(60.0, 0.5));
        world.add_actor(ActorId(1), true, true, true);
        world.add_actor(ActorId(2), false, false, false);
        let page = FragmentId::new("page.01");

        assert!(world.grant(ActorId(1), &page));
        assert!(!world.grant(ActorId(1), &page));
        assert!(!world.grant(ActorId(2), &page));
        assert!(world.inventory(ActorId(2)).is_none());
        assert!(world.message_display(ActorId(2)).is_none());
        assert!(world
            .inventory(ActorId(1))
            .is_some_and(|inv| inv.has_item(ActorId(1), &page, 1)));

        assert!(world.revoke(ActorId(1), &page));
        assert!(!world
            .inventory(ActorId(1))
            .is_some_and(|inv| inv.has_item(ActorId(1), &page, 1)));
    }

    #[test]
    fn health_never_drops_below_zero() {
        let mut pool = HealthPool::default();
        pool.add_attribute(AttributeKind::Health, -30.0);
        assert!((pool.current - 70.0).abs() < 1e-4);
        pool.add_attribute(AttributeKind::Health, -500.0);
        assert_eq!(pool.current, 0.0);
    }

    #[test]
    fn hud_keeps_last_message_until_readout_refresh() {
        let mut hud = Hud::default();
        hud.show_message("locked");
        hud.show_message("locked");
        assert_eq!(hud.text, "locked");
        assert_eq!(hud.message_count, 2);
        hud.refresh_progress_display(&ProgressReadout {
            collected: 1,
            total: 3,
            text: "Lost pages found: 1 / 3".to_string(),
        });
        assert_eq!(hud.text, "Lost pages found: 1 / 3");
        assert_eq!(hud.last_message.as_deref(), Some("locked"));
    }
}
