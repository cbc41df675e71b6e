use super::types::{
    ActorId, AudioClipId, Fragment, FragmentId, TemplateId, Transform, Vec3, ZoneId,
};

pub trait Inventory {
    fn has_item(&self, actor: ActorId, fragment: &FragmentId, quantity: u32) -> bool;

    /// Debug bootstrap path only.
    fn grant_item(&mut self, actor: ActorId, fragment: &FragmentId, quantity: u32);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReadout {
    pub collected: usize,
    pub total: usize,
    pub text: String,
}

pub trait MessageDisplay {
    fn show_message(&mut self, text: &str);

    fn refresh_progress_display(&mut self, readout: &ProgressReadout);

    fn show_fragment_popup(&mut self, _fragment: &Fragment) {}
}

pub trait SpawnService {
    fn instantiate(&mut self, template: &TemplateId, transform: Transform);
}

pub trait BarrierControl {
    fn remove_barrier(&mut self, gate: ZoneId);
}

pub trait Clock {
    fn is_night(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Health,
}

pub trait Attributes {
    fn add_attribute(&mut self, kind: AttributeKind, delta: f32);
}

pub trait AudioService {
    fn play_clip_at_point(&mut self, clip: &AudioClipId, position: Vec3, volume: f32);
}

pub trait GroundProbe {
    fn cast_down(&self, origin: Vec3, max_distance: f32) -> Option<Vec3>;
}

pub trait WorldServices {
    fn inventory(&self, actor: ActorId) -> Option<&dyn Inventory>;

    fn inventory_mut(&mut self, actor: ActorId) -> Option<&mut dyn Inventory>;

    fn message_display(&mut self, actor: ActorId) -> Option<&mut dyn MessageDisplay>;

    fn attributes(&mut self, actor: ActorId) -> Option<&mut dyn Attributes>;

    fn spawner(&mut self) -> Option<&mut dyn SpawnService>;

    fn barriers(&mut self) -> Option<&mut dyn BarrierControl>;

    fn audio(&mut self) -> Option<&mut dyn AudioService>;

    fn clock(&self) -> Option<&dyn Clock>;

    fn ground(&self) -> Option<&dyn GroundProbe>;
}
