use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use progression::world::{ActorId, FragmentId, Vec3};
use serde::Deserialize;

use super::SessionError;

const DEFAULT_DAY_LENGTH_SECONDS: f32 = 120.0;
const DEFAULT_NIGHT_FRACTION: f32 = 0.5;
pub(crate) const MAX_SESSION_SECONDS: f32 = 86_400.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SessionScript {
    pub duration_seconds: f32,
    #[serde(default = "default_day_length")]
    pub day_length_seconds: f32,
    #[serde(default = "default_night_fraction")]
    pub night_fraction: f32,
    #[serde(default)]
    pub seed: u64,
    pub actors: Vec<ActorScript>,
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ActorScript {
    pub id: u64,
    pub position: [f32; 3],
    #[serde(default = "default_facing")]
    pub facing: [f32; 3],
    #[serde(default)]
    pub attach: Attachments,
    #[serde(default)]
    pub starting_fragments: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub(crate) struct Attachments {
    pub inventory: bool,
    pub display: bool,
    pub attributes: bool,
}

impl Default for Attachments {
    fn default() -> Self {
        Self {
            inventory: true,
            display: true,
            attributes: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScriptStep {
    pub at_seconds: f32,
    #[serde(flatten)]
    pub action: StepAction,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum StepAction {
    MoveActor {
        actor: u64,
        position: [f32; 3],
        #[serde(default)]
        facing: Option<[f32; 3]>,
    },
    GrantFragment {
        actor: u64,
        fragment: String,
    },
    RevokeFragment {
        actor: u64,
        fragment: String,
    },
}

impl StepAction {
    pub fn actor_id(&self) -> ActorId {
        match self {
            Self::MoveActor { actor, .. }
            | Self::GrantFragment { actor, .. }
            | Self::RevokeFragment { actor, .. } => ActorId(*actor),
        }
    }
}

pub(crate) fn to_vec3(raw: [f32; 3]) -> Vec3 {
    Vec3::new(raw[0], raw[1], raw[2])
}

pub(crate) fn to_fragment(raw: &str) -> FragmentId {
    FragmentId::new(raw.trim())
}

fn default_day_length() -> f32 {
    DEFAULT_DAY_LENGTH_SECONDS
}

fn default_night_fraction() -> f32 {
    DEFAULT_NIGHT_FRACTION
}

fn default_facing() -> [f32; 3] {
    [0.0, 0.0, 1.0]
}

pub(crate) fn load_session_script(path: &Path) -> Result<SessionScript, SessionError> {
    let raw = fs::read_to_string(path).map_err(|source| SessionError::ReadScript {
        path: path.to_path_buf(),
        source,
    })?;
    parse_session_script(&raw, path)
}

pub(crate) fn parse_session_script(raw: &str, path: &Path) -> Result<SessionScript, SessionError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let mut script = match serde_path_to_error::deserialize::<_, SessionScript>(&mut deserializer) {
        Ok(script) => script,
        Err(error) => {
            let json_path = error.path().to_string();
            let source = error.into_inner();
            let message = if json_path.is_empty() || json_path == "." {
                format!("parse session json: {source}")
            } else {
                format!("parse session json at {json_path}: {source}")
            };
            return Err(SessionError::ParseScript {
                path: path.to_path_buf(),
                message,
            });
        }
    };
    validate(&script).map_err(|message| SessionError::InvalidScript {
        path: path.to_path_buf(),
        message,
    })?;
    script
        .steps
        .sort_by(|a, b| a.at_seconds.total_cmp(&b.at_seconds));
    Ok(script)
}

fn validate(script: &SessionScript) -> Result<(), String> {
    if !(script.duration_seconds > 0.0 && script.duration_seconds <= MAX_SESSION_SECONDS) {
        return Err(format!(
            "duration_seconds must be within (0, {MAX_SESSION_SECONDS}]"
        ));
    }
    if !(script.day_length_seconds.is_finite() && script.day_length_seconds > 0.0) {
        return Err("day_length_seconds must be finite and > 0".to_string());
    }
    if !(0.0..=1.0).contains(&script.night_fraction) {
        return Err("night_fraction must be within [0, 1]".to_string());
    }
    if script.actors.is_empty() {
        return Err("at least one actor is required".to_string());
    }

    let mut ids = BTreeSet::new();
    for actor in &script.actors {
        if !ids.insert(actor.id) {
            return Err(format!("duplicate actor id {}", actor.id));
        }
    }
    for (index, step) in script.steps.iter().enumerate() {
        if !(step.at_seconds.is_finite() && step.at_seconds >= 0.0) {
            return Err(format!("steps[{index}].at_seconds must be finite and >= 0"));
        }
        let actor = step.action.actor_id();
        if !ids.contains(&actor.0) {
            return Err(format!("steps[{index}] references unknown actor {}", actor.0));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const SCRIPT: &str = r#"{
        "duration_seconds": 90,
        "seed": 7,
        "actors": [
            { "id": 1, "position": [0, 0, 0], "starting_fragments": ["page.01"] },
            { "id": 2, "position": [5, 0, 5], "attach": { "inventory": false } }
        ],
        "steps": [
            { "at_seconds": 30, "action": "grant_fragment", "actor": 1, "fragment": "page.02" },
            { "at_seconds": 10, "action": "move_actor", "actor": 2, "position": [1, 0, 1] },
            { "at_seconds": 45, "action": "revoke_fragment", "actor": 1, "fragment": "page.01" }
        ]
    }"#;

    #[test]
    fn parses_defaults_and_sorts_steps() {
        let script = parse_session_script(SCRIPT, Path::new("session.json")).expect("parse");
        assert_eq!(script.seed, 7);
        assert!((script.day_length_seconds - DEFAULT_DAY_LENGTH_SECONDS).abs() < f32::EPSILON);
        assert_eq!(script.actors[0].facing, [0.0, 0.0, 1.0]);
        assert!(script.actors[0].attach.inventory);
        assert!(!script.actors[1].attach.inventory);
        assert!(script.actors[1].attach.display);
        let times = script
            .steps
            .iter()
            .map(|step| step.at_seconds)
            .collect::<Vec<_>>();
        assert_eq!(times, vec![10.0, 30.0, 45.0]);
        assert!(matches!(
            &script.steps[1].action,
            StepAction::GrantFragment { fragment, .. } if fragment == "page.02"
        ));
    }

    #[test]
    fn parse_error_names_the_json_path() {
        let raw = r#"{ "duration_seconds": 10, "actors": [ { "id": "one", "position": [0,0,0] } ] }"#;
        let err = parse_session_script(raw, Path::new("bad.json")).expect_err("err");
        let message = err.to_string();
        assert!(message.contains("actors[0].id"), "{message}");
    }

    #[test]
    fn unknown_actor_in_step_is_rejected() {
        let raw = r#"{
            "duration_seconds": 10,
            "actors": [ { "id": 1, "position": [0,0,0] } ],
            "steps": [ { "at_seconds": 1, "action": "grant_fragment", "actor": 9, "fragment": "p" } ]
        }"#;
        let err = parse_session_script(raw, Path::new("s.json")).expect_err("err");
        assert!(matches!(err, SessionError::InvalidScript { .. }));
        assert!(err.to_string().contains("unknown actor 9"));
    }

    #[test]
    fn duplicate_actor_ids_are_rejected() {
        let raw = r#"{
            "duration_seconds": 10,
            "actors": [ { "id": 1, "position": [0,0,0] }, { "id": 1, "position": [1,0,0] } ]
        }"#;
        let err = parse_session_script(raw, Path::new("s.json")).expect_err("err");
        assert!(err.to_string().contains("duplicate actor id 1"));
    }

    #[test]
    fn loads_script_from_disk() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("session.json");
        fs::write(&path, SCRIPT).expect("write");
        let script = load_session_script(&path).expect("load");
        assert_eq!(script.actors.len(), 2);

        let err = load_session_script(&temp.path().join("missing.json")).expect_err("err");
        assert!(matches!(err, SessionError::ReadScript { .. }));
    }
}
