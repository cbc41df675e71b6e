use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FragmentId(pub String);

impl FragmentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TemplateId(pub String);

impl TemplateId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AudioClipId(pub String);

impl fmt::Display for AudioClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ZoneKind {
    Gate,
    Hazard,
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ZoneId {
    pub kind: ZoneKind,
    pub index: u32,
}

impl ZoneId {
    pub fn gate(index: u32) -> Self {
        Self {
            kind: ZoneKind::Gate,
            index,
        }
    }

    pub fn hazard(index: u32) -> Self {
        Self {
            kind: ZoneKind::Hazard,
            index,
        }
    }

    pub fn terminal(index: u32) -> Self {
        Self {
            kind: ZoneKind::Terminal,
            index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SpawnerId(pub u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const FORWARD: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    pub fn scale(self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            z: self.z * factor,
        }
    }

    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn flattened(self) -> Self {
        Self { y: 0.0, ..self }
    }

    pub fn normalized_or(self, fallback: Self) -> Self {
        let len_sq = self.length_sq();
        if len_sq <= f32::EPSILON || !len_sq.is_finite() {
            return fallback;
        }
        self.scale(len_sq.sqrt().recip())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub position: Vec3,
    pub yaw_radians: Option<f32>,
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            yaw_radians: None,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl RegionBounds {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    pub fn center(&self) -> Vec3 {
        self.min.add(self.max).scale(0.5)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    pub id: FragmentId,
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
}

/// Ordered required-fragment list. `None` slots are never satisfied.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FragmentSet {
    slots: Vec<Option<FragmentId>>,
}

impl FragmentSet {
    pub fn new(slots: Vec<Option<FragmentId>>) -> Self {
        Self { slots }
    }

    pub fn of<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slots: ids.into_iter().map(|id| Some(FragmentId::new(id))).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Option<FragmentId>] {
        &self.slots
    }

    pub fn position_of(&self, fragment: &FragmentId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref() == Some(fragment))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpawnSchedule {
    templates: Vec<Option<TemplateId>>,
}

impl SpawnSchedule {
    pub fn new(templates: Vec<Option<TemplateId>>) -> Self {
        Self { templates }
    }

    pub fn of<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            templates: ids.into_iter().map(|id| Some(TemplateId::new(id))).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn template_at(&self, index: usize) -> Option<&TemplateId> {
        self.templates.get(index).and_then(Option::as_ref)
    }
}
