use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::{info, warn};

use crate::progress::{
    AudioCue, GateDef, HazardDef, SpawnCadence, SpawnerDef, StoryPagesDef, TerminalDef,
    DEFAULT_CUE_VOLUME, DEFAULT_DAMAGE_PER_SECOND, DEFAULT_ENCOUNTER_MESSAGE,
    DEFAULT_HINT_MESSAGE, DEFAULT_LOCKED_MESSAGE, DEFAULT_MAX_SPAWN_RADIUS,
    DEFAULT_MIN_SPAWN_RADIUS, DEFAULT_TIMER_INTERVAL_SECONDS, DEFAULT_WARNING_MESSAGE,
};
use crate::world::{
    AudioClipId, Fragment, FragmentId, FragmentSet, RegionBounds, SpawnSchedule, TemplateId,
    Transform, Vec3,
};

use super::database::{LevelDatabase, LevelDefs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDefName,
    ScheduleLengthMismatch,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

pub fn compile_level_file(file_path: &Path) -> Result<LevelDatabase, ContentCompileError> {
    let raw = fs::read_to_string(file_path).map_err(|source| ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read level XML: {source}"),
        file_path: file_path.to_path_buf(),
        location: None,
    })?;
    compile_level(&raw, file_path)
}

pub fn compile_level(raw: &str, file_path: &Path) -> Result<LevelDatabase, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    let mut cx = LevelParser {
        file_path,
        doc: &doc,
        known_fragments: HashSet::new(),
        def_names: HashSet::new(),
    };
    if root.tag_name().name() != "Level" {
        return Err(cx.error_at(
            ContentErrorCode::InvalidRoot,
            "root element must be <Level>".to_string(),
            root,
        ));
    }

    let defs_nodes = root
        .children()
        .filter(|node| node.is_element())
        .collect::<Vec<_>>();

    // Fragments first so references resolve regardless of document order.
    let mut level = LevelDefs::default();
    for node in defs_nodes
        .iter()
        .filter(|node| node.tag_name().name() == "FragmentDef")
    {
        let fragment = cx.parse_fragment_def(*node)?;
        cx.known_fragments.insert(fragment.id.0.clone());
        level.fragments.push(fragment);
    }

    let mut story_pages_seen = false;
    for node in defs_nodes {
        match node.tag_name().name() {
            "FragmentDef" => {}
            "StoryPages" => {
                if story_pages_seen {
                    return Err(cx.error_at(
                        ContentErrorCode::DuplicateDefName,
                        "a level may declare <StoryPages> only once".to_string(),
                        node,
                    ));
                }
                story_pages_seen = true;
                level.story_pages = cx.parse_story_pages(node)?;
            }
            "GateDef" => level.gates.push(cx.parse_gate_def(node)?),
            "HazardDef" => level.hazards.push(cx.parse_hazard_def(node)?),
            "SpawnerDef" => level.spawners.push(cx.parse_spawner_def(node)?),
            "TerminalDef" => level.terminals.push(cx.parse_terminal_def(node)?),
            other => {
                return Err(cx.error_at(
                    ContentErrorCode::UnknownDefType,
                    format!(
                        "unsupported def type <{other}>; expected FragmentDef, StoryPages, \
GateDef, HazardDef, SpawnerDef or TerminalDef"
                    ),
                    node,
                ))
            }
        }
    }

    info!(
        file = %file_path.display(),
        fragments = level.fragments.len(),
        gates = level.gates.len(),
        hazards = level.hazards.len(),
        spawners = level.spawners.len(),
        terminals = level.terminals.len(),
        "level_compiled"
    );
    Ok(LevelDatabase::from_defs(level))
}

struct LevelParser<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
    known_fragments: HashSet<String>,
    def_names: HashSet<String>,
}

impl<'a, 'input> LevelParser<'a, 'input> {
    fn parse_fragment_def(
        &mut self,
        node: Node<'a, 'input>,
    ) -> Result<Fragment, ContentCompileError> {
        let mut def_name = None;
        let mut title = None;
        let mut body = None;
        let mut icon = None;
        for (name, field) in self.fields(node, "FragmentDef")? {
            match name {
                "defName" => def_name = Some(self.required_text(field, name)?),
                "title" => title = Some(self.required_text(field, name)?),
                "body" => body = Some(self.required_text(field, name)?),
                "icon" => icon = Some(self.required_text(field, name)?),
                _ => return Err(self.unknown_field(field, "FragmentDef")),
            }
        }
        let def_name = self.claim_def_name(node, "FragmentDef", def_name)?;
        Ok(Fragment {
            title: title.unwrap_or_else(|| def_name.clone()),
            id: FragmentId::new(def_name),
            body: body.unwrap_or_default(),
            icon,
        })
    }

    fn parse_story_pages(
        &self,
        node: Node<'a, 'input>,
    ) -> Result<StoryPagesDef, ContentCompileError> {
        let mut def = StoryPagesDef::default();
        let mut pages = None;
        for (name, field) in self.fields(node, "StoryPages")? {
            match name {
                "pages" => pages = Some(self.fragment_list(field, "StoryPages")?),
                "allCompleteText" => def.all_complete_text = self.required_text(field, name)?,
                "grantAllOnStart" => def.grant_all_on_start = self.parse_bool(field, name)?,
                "resyncIntervalSeconds" => {
                    def.resync_interval_seconds = self.parse_positive_f32(field, name)?
                }
                _ => return Err(self.unknown_field(field, "StoryPages")),
            }
        }
        def.pages = pages.ok_or_else(|| self.missing_field(node, "StoryPages", "pages"))?;
        Ok(def)
    }

    fn parse_gate_def(&mut self, node: Node<'a, 'input>) -> Result<GateDef, ContentCompileError> {
        let mut def_name = None;
        let mut region = None;
        let mut required = None;
        let mut locked_message = None;
        for (name, field) in self.fields(node, "GateDef")? {
            match name {
                "defName" => def_name = Some(self.required_text(field, name)?),
                "region" => region = Some(self.parse_region(field)?),
                "required" => required = Some(self.fragment_list(field, "GateDef")?),
                "lockedMessage" => locked_message = Some(self.required_text(field, name)?),
                _ => return Err(self.unknown_field(field, "GateDef")),
            }
        }
        let def_name = self.claim_def_name(node, "GateDef", def_name)?;
        Ok(GateDef {
            region: region.ok_or_else(|| self.missing_field(node, "GateDef", "region"))?,
            required: required.ok_or_else(|| self.missing_field(node, "GateDef", "required"))?,
            locked_message: locked_message.unwrap_or_else(|| DEFAULT_LOCKED_MESSAGE.to_string()),
            def_name,
        })
    }

    fn parse_hazard_def(
        &mut self,
        node: Node<'a, 'input>,
    ) -> Result<HazardDef, ContentCompileError> {
        let mut def_name = None;
        let mut region = None;
        let mut required = None;
        let mut damage_per_second = DEFAULT_DAMAGE_PER_SECOND;
        let mut warning_message = None;
        for (name, field) in self.fields(node, "HazardDef")? {
            match name {
                "defName" => def_name = Some(self.required_text(field, name)?),
                "region" => region = Some(self.parse_region(field)?),
                "required" => required = Some(self.fragment_list(field, "HazardDef")?),
                "damagePerSecond" => damage_per_second = self.parse_non_negative_f32(field, name)?,
                "warningMessage" => warning_message = Some(self.required_text(field, name)?),
                _ => return Err(self.unknown_field(field, "HazardDef")),
            }
        }
        let def_name = self.claim_def_name(node, "HazardDef", def_name)?;
        Ok(HazardDef {
            region: region.ok_or_else(|| self.missing_field(node, "HazardDef", "region"))?,
            required: required.ok_or_else(|| self.missing_field(node, "HazardDef", "required"))?,
            damage_per_second,
            warning_message: warning_message
                .unwrap_or_else(|| DEFAULT_WARNING_MESSAGE.to_string()),
            def_name,
        })
    }

    fn parse_spawner_def(
        &mut self,
        node: Node<'a, 'input>,
    ) -> Result<SpawnerDef, ContentCompileError> {
        let mut def_name = None;
        let mut driving = None;
        let mut schedule = None;
        let mut first_index = None;
        let mut last_index = None;
        let mut min_radius = DEFAULT_MIN_SPAWN_RADIUS;
        let mut max_radius = DEFAULT_MAX_SPAWN_RADIUS;
        let mut cadence_name = None;
        let mut timer_interval = DEFAULT_TIMER_INTERVAL_SECONDS;
        let mut spawn_on_actor = false;
        let mut log_fragment_detail = false;
        for (name, field) in self.fields(node, "SpawnerDef")? {
            match name {
                "defName" => def_name = Some(self.required_text(field, name)?),
                "driving" => driving = Some(self.fragment_list(field, "SpawnerDef")?),
                "schedule" => schedule = Some(self.template_list(field)?),
                "firstIndex" => first_index = Some(self.parse_usize(field, name)?),
                "lastIndex" => last_index = Some(self.parse_usize(field, name)?),
                "minRadius" => min_radius = self.parse_non_negative_f32(field, name)?,
                "maxRadius" => max_radius = self.parse_non_negative_f32(field, name)?,
                "cadence" => cadence_name = Some((self.required_text(field, name)?, field)),
                "timerIntervalSeconds" => timer_interval = self.parse_positive_f32(field, name)?,
                "spawnOnActor" => spawn_on_actor = self.parse_bool(field, name)?,
                "logFragmentDetail" => log_fragment_detail = self.parse_bool(field, name)?,
                _ => return Err(self.unknown_field(field, "SpawnerDef")),
            }
        }
        let def_name = self.claim_def_name(node, "SpawnerDef", def_name)?;
        let driving = driving.ok_or_else(|| self.missing_field(node, "SpawnerDef", "driving"))?;
        let schedule =
            schedule.ok_or_else(|| self.missing_field(node, "SpawnerDef", "schedule"))?;
        if driving.len() != schedule.len() {
            return Err(self.error_at(
                ContentErrorCode::ScheduleLengthMismatch,
                format!(
                    "SpawnerDef '{}' lists {} driving fragments but {} schedule entries; \
they are paired by index and must match",
                    def_name,
                    driving.len(),
                    schedule.len()
                ),
                node,
            ));
        }

        let cadence = match cadence_name {
            None => SpawnCadence::NightGated,
            Some((value, field)) => match value.as_str() {
                "NightGated" => SpawnCadence::NightGated,
                "Timer" => SpawnCadence::Timer {
                    interval_seconds: timer_interval,
                },
                _ => {
                    return Err(self.error_at(
                        ContentErrorCode::InvalidValue,
                        format!("invalid cadence '{value}'; allowed values: NightGated, Timer"),
                        field,
                    ))
                }
            },
        };

        let first_index = first_index.unwrap_or(0);
        let last_index = last_index.unwrap_or_else(|| schedule.len().saturating_sub(1));
        if first_index > last_index {
            return Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!(
                    "SpawnerDef '{def_name}' has firstIndex {first_index} greater than lastIndex {last_index}"
                ),
                node,
            ));
        }
        if min_radius > max_radius {
            warn!(spawner = %def_name, min_radius, max_radius, "spawner_radii_swapped");
        }

        Ok(SpawnerDef {
            def_name,
            driving,
            schedule,
            first_index,
            last_index,
            min_radius,
            max_radius,
            cadence,
            spawn_on_actor,
            log_fragment_detail,
        })
    }

    fn parse_terminal_def(
        &mut self,
        node: Node<'a, 'input>,
    ) -> Result<TerminalDef, ContentCompileError> {
        let mut def_name = None;
        let mut region = None;
        let mut completion = None;
        let mut template = None;
        let mut spawn_point = None;
        let mut audio_clip = None;
        let mut audio_volume = DEFAULT_CUE_VOLUME;
        let mut encounter_message = None;
        let mut hint_message = None;
        for (name, field) in self.fields(node, "TerminalDef")? {
            match name {
                "defName" => def_name = Some(self.required_text(field, name)?),
                "region" => region = Some(self.parse_region(field)?),
                "completion" => completion = Some(self.fragment_list(field, "TerminalDef")?),
                "template" => template = Some(TemplateId::new(self.required_text(field, name)?)),
                "spawnPoint" => spawn_point = Some(self.parse_spawn_point(field)?),
                "audioClip" => audio_clip = Some(AudioClipId(self.required_text(field, name)?)),
                "audioVolume" => audio_volume = self.parse_non_negative_f32(field, name)?,
                "encounterMessage" => encounter_message = Some(self.required_text(field, name)?),
                "hintMessage" => hint_message = Some(self.required_text(field, name)?),
                _ => return Err(self.unknown_field(field, "TerminalDef")),
            }
        }
        let def_name = self.claim_def_name(node, "TerminalDef", def_name)?;
        if template.is_none() {
            warn!(terminal = %def_name, "terminal_template_unset");
        }
        Ok(TerminalDef {
            region: region.ok_or_else(|| self.missing_field(node, "TerminalDef", "region"))?,
            completion: completion
                .ok_or_else(|| self.missing_field(node, "TerminalDef", "completion"))?,
            template,
            spawn_point,
            cue: audio_clip.map(|clip| AudioCue {
                clip,
                volume: audio_volume,
            }),
            encounter_message: encounter_message
                .unwrap_or_else(|| DEFAULT_ENCOUNTER_MESSAGE.to_string()),
            hint_message: hint_message.unwrap_or_else(|| DEFAULT_HINT_MESSAGE.to_string()),
            def_name,
        })
    }

    fn fields(
        &self,
        node: Node<'a, 'input>,
        def_type: &str,
    ) -> Result<Vec<(&'a str, Node<'a, 'input>)>, ContentCompileError> {
        let mut seen = HashSet::<&str>::new();
        let mut fields = Vec::new();
        for field in node.children().filter(|child| child.is_element()) {
            let name = field.tag_name().name();
            if !seen.insert(name) {
                return Err(self.error_at(
                    ContentErrorCode::DuplicateField,
                    format!("duplicate field <{name}> in <{def_type}>"),
                    field,
                ));
            }
            fields.push((name, field));
        }
        Ok(fields)
    }

    fn claim_def_name(
        &mut self,
        node: Node<'a, 'input>,
        def_type: &str,
        def_name: Option<String>,
    ) -> Result<String, ContentCompileError> {
        let def_name = def_name.ok_or_else(|| self.missing_field(node, def_type, "defName"))?;
        if !self.def_names.insert(def_name.clone()) {
            return Err(self.error_at(
                ContentErrorCode::DuplicateDefName,
                format!("duplicate defName '{def_name}'; each defName may appear once per level"),
                node,
            ));
        }
        Ok(def_name)
    }

    fn fragment_list(
        &self,
        node: Node<'a, 'input>,
        def_type: &str,
    ) -> Result<FragmentSet, ContentCompileError> {
        let mut slots = Vec::new();
        for item in node.children().filter(|child| child.is_element()) {
            if item.tag_name().name() != "li" {
                return Err(self.unknown_field(item, def_type));
            }
            let value = item.text().map(str::trim).unwrap_or_default();
            if value.is_empty() {
                slots.push(None);
            } else if self.known_fragments.contains(value) {
                slots.push(Some(FragmentId::new(value)));
            } else {
                let pos = self.doc.text_pos_at(item.range().start);
                warn!(
                    def_type,
                    fragment = value,
                    line = pos.row,
                    "level_fragment_unknown"
                );
                slots.push(None);
            }
        }
        Ok(FragmentSet::new(slots))
    }

    fn template_list(&self, node: Node<'a, 'input>) -> Result<SpawnSchedule, ContentCompileError> {
        let mut templates = Vec::new();
        for item in node.children().filter(|child| child.is_element()) {
            if item.tag_name().name() != "li" {
                return Err(self.unknown_field(item, "SpawnerDef"));
            }
            let value = item.text().map(str::trim).unwrap_or_default();
            templates.push((!value.is_empty()).then(|| TemplateId::new(value)));
        }
        Ok(SpawnSchedule::new(templates))
    }

    fn parse_region(&self, node: Node<'a, 'input>) -> Result<RegionBounds, ContentCompileError> {
        let mut min = None;
        let mut max = None;
        for (name, field) in self.fields(node, "region")? {
            match name {
                "min" => min = Some(self.parse_vec3(field, name)?),
                "max" => max = Some(self.parse_vec3(field, name)?),
                _ => return Err(self.unknown_field(field, "region")),
            }
        }
        let min = min.ok_or_else(|| self.missing_field(node, "region", "min"))?;
        let max = max.ok_or_else(|| self.missing_field(node, "region", "max"))?;
        Ok(RegionBounds::new(min, max))
    }

    fn parse_spawn_point(&self, node: Node<'a, 'input>) -> Result<Transform, ContentCompileError> {
        let mut position = None;
        let mut yaw_degrees = None;
        for (name, field) in self.fields(node, "spawnPoint")? {
            match name {
                "position" => position = Some(self.parse_vec3(field, name)?),
                "yawDegrees" => yaw_degrees = Some(self.parse_f32(field, name)?),
                _ => return Err(self.unknown_field(field, "spawnPoint")),
            }
        }
        Ok(Transform {
            position: position.ok_or_else(|| self.missing_field(node, "spawnPoint", "position"))?,
            yaw_radians: yaw_degrees.map(f32::to_radians),
        })
    }

    fn parse_vec3(&self, node: Node<'a, 'input>, field_name: &str) -> Result<Vec3, ContentCompileError> {
        let value = self.required_text(node, field_name)?;
        let inner = value.trim_start_matches('(').trim_end_matches(')');
        let parts = inner
            .split(',')
            .map(|part| part.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .ok()
            .filter(|parts| parts.len() == 3 && parts.iter().all(|v| v.is_finite()));
        match parts.as_deref() {
            Some([x, y, z]) => Ok(Vec3::new(*x, *y, *z)),
            _ => Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} '{value}' is not a vector of three finite numbers (x,y,z)"),
                node,
            )),
        }
    }

    fn parse_f32(&self, node: Node<'a, 'input>, field_name: &str) -> Result<f32, ContentCompileError> {
        let value = self.required_text(node, field_name)?;
        let parsed = value.parse::<f32>().map_err(|_| {
            self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} '{value}' is not a valid number"),
                node,
            )
        })?;
        if !parsed.is_finite() {
            return Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} must be finite"),
                node,
            ));
        }
        Ok(parsed)
    }

    fn parse_non_negative_f32(
        &self,
        node: Node<'a, 'input>,
        field_name: &str,
    ) -> Result<f32, ContentCompileError> {
        let parsed = self.parse_f32(node, field_name)?;
        if parsed < 0.0 {
            return Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} must be >= 0"),
                node,
            ));
        }
        Ok(parsed)
    }

    fn parse_positive_f32(
        &self,
        node: Node<'a, 'input>,
        field_name: &str,
    ) -> Result<f32, ContentCompileError> {
        let parsed = self.parse_f32(node, field_name)?;
        if parsed <= 0.0 {
            return Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} must be > 0"),
                node,
            ));
        }
        Ok(parsed)
    }

    fn parse_usize(
        &self,
        node: Node<'a, 'input>,
        field_name: &str,
    ) -> Result<usize, ContentCompileError> {
        let value = self.required_text(node, field_name)?;
        value.parse::<usize>().map_err(|_| {
            self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} '{value}' is not a non-negative integer"),
                node,
            )
        })
    }

    fn parse_bool(&self, node: Node<'a, 'input>, field_name: &str) -> Result<bool, ContentCompileError> {
        let value = self.required_text(node, field_name)?;
        match value.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} '{value}' must be true or false"),
                node,
            )),
        }
    }

    fn required_text(
        &self,
        node: Node<'a, 'input>,
        field_name: &str,
    ) -> Result<String, ContentCompileError> {
        let value = node.text().map(str::trim).unwrap_or_default().to_string();
        if value.is_empty() {
            return Err(self.error_at(
                ContentErrorCode::MissingField,
                format!("field <{field_name}> must not be empty"),
                node,
            ));
        }
        Ok(value)
    }

    fn unknown_field(&self, node: Node<'a, 'input>, def_type: &str) -> ContentCompileError {
        self.error_at(
            ContentErrorCode::UnknownField,
            format!("unknown field <{}> in <{def_type}>", node.tag_name().name()),
            node,
        )
    }

    fn missing_field(
        &self,
        node: Node<'a, 'input>,
        def_type: &str,
        field_name: &str,
    ) -> ContentCompileError {
        self.error_at(
            ContentErrorCode::MissingField,
            format!("missing required field <{field_name}> in <{def_type}>"),
            node,
        )
    }

    fn error_at(
        &self,
        code: ContentErrorCode,
        message: String,
        node: Node<'_, '_>,
    ) -> ContentCompileError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentCompileError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }
}
