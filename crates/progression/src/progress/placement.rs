use rand::Rng;
use tracing::debug;

use crate::world::{GroundProbe, Vec3};

pub const SPAWN_SEARCH_ATTEMPTS: u32 = 10;
pub const PROBE_HEIGHT_OFFSET: f32 = 20.0;
pub const PROBE_MAX_DISTANCE: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRequest {
    pub center: Vec3,
    pub facing: Vec3,
    pub min_radius: f32,
    pub max_radius: f32,
    pub on_actor: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementSource {
    OnActor,
    Ground { attempt: u32 },
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    pub source: PlacementSource,
}

pub fn resolve_spawn_position<R: Rng + ?Sized>(
    request: &PlacementRequest,
    probe: Option<&dyn GroundProbe>,
    rng: &mut R,
) -> Placement {
    if request.on_actor {
        return Placement {
            position: request.center,
            source: PlacementSource::OnActor,
        };
    }

    let (min_radius, max_radius) = ordered_radii(request.min_radius, request.max_radius);

    if let Some(probe) = probe {
        for attempt in 0..SPAWN_SEARCH_ATTEMPTS {
            let radius = if max_radius > min_radius {
                rng.random_range(min_radius..=max_radius)
            } else {
                min_radius
            };
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let origin = Vec3::new(
                request.center.x + angle.cos() * radius,
                request.center.y + PROBE_HEIGHT_OFFSET,
                request.center.z + angle.sin() * radius,
            );
            if let Some(hit) = probe.cast_down(origin, PROBE_MAX_DISTANCE) {
                debug!(attempt, x = hit.x, y = hit.y, z = hit.z, "spawn_ground_found");
                return Placement {
                    position: hit,
                    source: PlacementSource::Ground { attempt },
                };
            }
        }
    }

    let forward = request.facing.flattened().normalized_or(Vec3::FORWARD);
    let position = request.center.add(forward.scale(min_radius));
    debug!(
        x = position.x,
        y = position.y,
        z = position.z,
        "spawn_fallback_used"
    );
    Placement {
        position,
        source: PlacementSource::Fallback,
    }
}

fn ordered_radii(a: f32, b: f32) -> (f32, f32) {
    let a = if a.is_finite() { a.max(0.0) } else { 0.0 };
    let b = if b.is_finite() { b.max(0.0) } else { a };
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
