mod services;
mod types;

pub use services::{
    AttributeKind, Attributes, AudioService, BarrierControl, Clock, GroundProbe, Inventory,
    MessageDisplay, ProgressReadout, SpawnService, WorldServices,
};
pub use types::{
    ActorId, AudioClipId, Fragment, FragmentId, FragmentSet, RegionBounds, SpawnSchedule,
    SpawnerId, TemplateId, Transform, Vec3, ZoneId, ZoneKind,
};
