use super::*;
use crate::content::LevelDefs;
use crate::progress::{
    AudioCue, GateDef, HazardDef, SpawnCadence, SpawnerDef, TerminalDef, DEFAULT_ALL_COMPLETE_TEXT,
    DEFAULT_DAMAGE_PER_SECOND, DEFAULT_ENCOUNTER_MESSAGE, DEFAULT_HINT_MESSAGE,
    DEFAULT_LOCKED_MESSAGE, DEFAULT_WARNING_MESSAGE,
};
use crate::testing::{unit_region, FakeWorld};
use crate::world::{AudioClipId, FragmentSet, SpawnSchedule, TemplateId};

const PLAYER: ActorId = ActorId(1);
const PAGES: [&str; 6] = ["p1", "p2", "p3", "p4", "p5", "p6"];

fn base_defs() -> LevelDefs {
    LevelDefs {
        fragments: PAGES
            .iter()
            .map(|id| Fragment {
                id: FragmentId::new(*id),
                title: format!("Page {id}"),
                body: format!("Body of {id}"),
                icon: None,
            })
            .collect(),
        story_pages: StoryPagesDef {
            pages: FragmentSet::of(PAGES),
            ..StoryPagesDef::default()
        },
        ..LevelDefs::default()
    }
}

fn gate_def() -> GateDef {
    GateDef {
        def_name: "gate.area2".to_string(),
        region: unit_region(),
        required: FragmentSet::of(["p1", "p2"]),
        locked_message: DEFAULT_LOCKED_MESSAGE.to_string(),
    }
}

fn hazard_def() -> HazardDef {
    HazardDef {
        def_name: "hazard.area2".to_string(),
        region: unit_region(),
        required: FragmentSet::of(["p1"]),
        damage_per_second: DEFAULT_DAMAGE_PER_SECOND,
        warning_message: DEFAULT_WARNING_MESSAGE.to_string(),
    }
}

fn spawner_def(cadence: SpawnCadence) -> SpawnerDef {
    SpawnerDef {
        def_name: "spawner.area1".to_string(),
        driving: FragmentSet::of(["p1", "p2", "p3"]),
        schedule: SpawnSchedule::of(["z1", "z2", "z3"]),
        first_index: 0,
        last_index: 2,
        min_radius: 10.0,
        max_radius: 18.0,
        cadence,
        spawn_on_actor: false,
        log_fragment_detail: false,
    }
}

fn terminal_def() -> TerminalDef {
    TerminalDef {
        def_name: "terminal.mountain".to_string(),
        region: unit_region(),
        completion: FragmentSet::of(PAGES),
        template: Some(TemplateId::new("boss.colossus")),
        spawn_point: None,
        cue: Some(AudioCue {
            clip: AudioClipId("audio.roar".to_string()),
            volume: 1.0,
        }),
        encounter_message: DEFAULT_ENCOUNTER_MESSAGE.to_string(),
        hint_message: DEFAULT_HINT_MESSAGE.to_string(),
    }
}

fn host_with(edit: impl FnOnce(&mut LevelDefs)) -> ProgressionHost {
    let mut defs = base_defs();
    edit(&mut defs);
    ProgressionHost::from_level(&LevelDatabase::from_defs(defs), 11).expect("valid level")
}

fn frame() -> ActorFrame {
    ActorFrame {
        actor_id: PLAYER,
        position: Vec3::ZERO,
        facing: Vec3::FORWARD,
    }
}

fn trigger(zone: ZoneId, phase: TriggerPhase) -> TriggerEvent {
    TriggerEvent {
        actor_id: PLAYER,
        zone,
        phase,
    }
}

fn tick(
    host: &mut ProgressionHost,
    world: &mut FakeWorld,
    dt_seconds: f32,
    triggers: &[TriggerEvent],
) -> TickReport {
    let actors = [frame()];
    host.run_tick(
        &TickInput {
            dt_seconds,
            triggers,
            actors: &actors,
        },
        world,
    )
}

#[test]
fn systems_run_in_fixed_order() {
    let mut host = host_with(|_| {});
    let mut world = FakeWorld::with_actors(&[PLAYER]);
    tick(&mut host, &mut world, 0.1, &[]);
    assert_eq!(host.last_tick_order(), PROGRESSION_SYSTEM_ORDER.as_slice());
    let names = host
        .last_tick_order()
        .iter()
        .map(|system| system.name())
        .collect::<Vec<_>>()
        .join(">");
    assert_eq!(names, PROGRESSION_SYSTEM_ORDER_TEXT);
}

#[test]
fn hazard_marking_suppresses_spawner_in_the_same_tick() {
    let mut host = host_with(|defs| {
        defs.hazards.push(hazard_def());
        defs.spawners.push(spawner_def(SpawnCadence::NightGated));
    });
    let mut world = FakeWorld::with_actors(&[PLAYER]);
    world.set_night(true);

    let report = tick(
        &mut host,
        &mut world,
        0.1,
        &[trigger(ZoneId::hazard(0), TriggerPhase::Enter)],
    );

    assert!(host.is_unsafe(PLAYER));
    assert_eq!(report.event_counts.hazard_damage, 1);
    assert_eq!(report.event_counts.enemy_spawned, 0);
    assert!(world.spawned_templates().is_empty());
    assert!((world.health_delta(PLAYER) + 0.5).abs() < 1e-6);
    assert_eq!(
        world.display(PLAYER).messages.last().map(String::as_str),
        Some(DEFAULT_WARNING_MESSAGE)
    );

    let report = tick(
        &mut host,
        &mut world,
        0.1,
        &[trigger(ZoneId::hazard(0), TriggerPhase::Exit)],
    );
    assert!(!host.is_unsafe(PLAYER));
    assert_eq!(report.event_counts.enemy_spawned, 1);
    assert_eq!(world.spawned_templates(), vec!["z1"]);
}

#[test]
fn unsafe_actor_does_not_suppress_another_actors_spawns() {
    const COMPANION: ActorId = ActorId(2);
    let mut host = host_with(|defs| {
        defs.hazards.push(hazard_def());
        defs.spawners.push(spawner_def(SpawnCadence::NightGated));
    });
    let mut world = FakeWorld::with_actors(&[PLAYER, COMPANION]);
    world.set_night(true);

    let actors = [
        frame(),
        ActorFrame {
            actor_id: COMPANION,
            position: Vec3::new(40.0, 0.0, 0.0),
            facing: Vec3::FORWARD,
        },
    ];
    let report = host.run_tick(
        &TickInput {
            dt_seconds: 0.1,
            triggers: &[trigger(ZoneId::hazard(0), TriggerPhase::Enter)],
            actors: &actors,
        },
        &mut world,
    );

    assert!(host.is_unsafe(PLAYER));
    assert!(!host.is_unsafe(COMPANION));
    assert_eq!(report.event_counts.enemy_spawned, 1);
    assert_eq!(world.spawned_templates(), vec!["z1"]);
    assert!(report.events.iter().any(|event| matches!(
        event,
        ProgressionEvent::EnemySpawned { actor_id, .. } if *actor_id == COMPANION
    )));
}

#[test]
fn timer_spawner_follows_owned_count() {
    let mut host = host_with(|defs| {
        defs.spawners.push(spawner_def(SpawnCadence::Timer {
            interval_seconds: 1.0,
        }))
    });
    let mut world = FakeWorld::with_actors(&[PLAYER]);

    tick(&mut host, &mut world, 1.0, &[]);
    tick(&mut host, &mut world, 1.0, &[]);
    world.give(PLAYER, "p1");
    tick(&mut host, &mut world, 1.0, &[]);
    world.give(PLAYER, "p2");
    world.give(PLAYER, "p3");
    tick(&mut host, &mut world, 1.0, &[]);
    tick(&mut host, &mut world, 1.0, &[]);

    assert_eq!(world.spawned_templates(), vec!["z1", "z2"]);
    let snapshot = host.snapshot();
    let state = snapshot.spawners[0].actors[0].state;
    assert_eq!(state.progress.last_acted_index, Some(1));
    assert_eq!(state.progress.owned_count, 3);
}

#[test]
fn gate_refuses_then_opens_and_removes_barrier() {
    let mut host = host_with(|defs| defs.gates.push(gate_def()));
    let mut world = FakeWorld::with_actors(&[PLAYER]);
    let gate = ZoneId::gate(0);

    let report = tick(&mut host, &mut world, 0.1, &[trigger(gate, TriggerPhase::Enter)]);
    assert_eq!(report.event_counts.gate_refused, 1);
    assert_eq!(
        world.display(PLAYER).messages,
        vec![DEFAULT_LOCKED_MESSAGE.to_string()]
    );

    tick(&mut host, &mut world, 0.1, &[trigger(gate, TriggerPhase::Exit)]);
    assert_eq!(
        world.display(PLAYER).current_text(),
        Some("Lost pages found: 0 / 6")
    );

    world.give(PLAYER, "p1");
    world.give(PLAYER, "p2");
    let report = tick(&mut host, &mut world, 0.1, &[trigger(gate, TriggerPhase::Enter)]);
    assert_eq!(report.event_counts.gate_opened, 1);
    assert!(host.gate_is_open(gate));
    assert_eq!(world.barriers.as_ref().map(|b| b.removed.clone()), Some(vec![gate]));

    world.take(PLAYER, "p2");
    let report = tick(&mut host, &mut world, 0.1, &[trigger(gate, TriggerPhase::Enter)]);
    assert_eq!(report.event_counts.total, 0);
    assert!(host.gate_is_open(gate));
}

#[test]
fn terminal_spawns_once_for_full_completion() {
    let mut host = host_with(|defs| defs.terminals.push(terminal_def()));
    let mut world = FakeWorld::with_actors(&[PLAYER]);
    for page in PAGES {
        world.give(PLAYER, page);
    }
    let zone = ZoneId::terminal(0);

    let report = tick(&mut host, &mut world, 0.1, &[trigger(zone, TriggerPhase::Enter)]);
    assert_eq!(report.event_counts.terminal_spawned, 1);
    tick(&mut host, &mut world, 0.1, &[trigger(zone, TriggerPhase::Exit)]);
    tick(&mut host, &mut world, 0.1, &[trigger(zone, TriggerPhase::Enter)]);

    assert_eq!(world.spawned_templates(), vec!["boss.colossus"]);
    assert_eq!(world.audio.as_ref().map(|audio| audio.played.len()), Some(1));
    assert_eq!(
        world.display(PLAYER).messages,
        vec![DEFAULT_ENCOUNTER_MESSAGE.to_string()]
    );
    assert!(host.snapshot().terminals[0].spawned);
}

#[test]
fn terminal_hints_until_complete() {
    let mut host = host_with(|defs| defs.terminals.push(terminal_def()));
    let mut world = FakeWorld::with_actors(&[PLAYER]);
    world.give(PLAYER, "p1");
    let zone = ZoneId::terminal(0);
    for _ in 0..2 {
        tick(&mut host, &mut world, 0.1, &[trigger(zone, TriggerPhase::Enter)]);
        tick(&mut host, &mut world, 0.1, &[trigger(zone, TriggerPhase::Exit)]);
    }
    assert_eq!(world.display(PLAYER).messages.len(), 2);
    assert!(world.spawned_templates().is_empty());
}

#[test]
fn first_acquisition_shows_popup_once() {
    let mut host = host_with(|_| {});
    let mut world = FakeWorld::with_actors(&[PLAYER]);
    host.start_actor(PLAYER, &mut world);

    world.give(PLAYER, "p3");
    host.notify_item_acquired(PLAYER, &FragmentId::new("p3"));
    let report = tick(&mut host, &mut world, 0.1, &[]);
    assert_eq!(report.event_counts.fragment_announced, 1);

    host.notify_item_acquired(PLAYER, &FragmentId::new("p3"));
    host.notify_item_acquired(PLAYER, &FragmentId::new("lantern"));
    tick(&mut host, &mut world, 0.1, &[]);

    let display = world.display(PLAYER);
    assert_eq!(display.popups, vec![FragmentId::new("p3")]);
    assert_eq!(display.current_text(), Some("Lost pages found: 1 / 6"));
}

#[test]
fn grant_all_on_start_completes_readout() {
    let mut host = host_with(|defs| defs.story_pages.grant_all_on_start = true);
    let mut world = FakeWorld::with_actors(&[PLAYER]);
    host.start_actor(PLAYER, &mut world);
    tick(&mut host, &mut world, 0.1, &[]);

    assert_eq!(
        world.inventory.as_ref().map(|inventory| inventory.granted.len()),
        Some(PAGES.len())
    );
    assert_eq!(
        world.display(PLAYER).current_text(),
        Some(DEFAULT_ALL_COMPLETE_TEXT)
    );
    assert!(host.tracker(PLAYER).is_some_and(ProgressTracker::has_all_pages));
    let snapshot = host.snapshot();
    assert!(snapshot.trackers[0].all_pages_found);
    assert_eq!(snapshot.trackers[0].collected, PAGES.len());
}

#[test]
fn periodic_resync_picks_up_silent_inventory_changes() {
    let mut host = host_with(|_| {});
    let mut world = FakeWorld::with_actors(&[PLAYER]);
    host.start_actor(PLAYER, &mut world);
    tick(&mut host, &mut world, 0.1, &[]);

    world.give(PLAYER, "p5");
    let mut elapsed = 0.0;
    while elapsed < 1.5 {
        tick(&mut host, &mut world, 0.25, &[]);
        elapsed += 0.25;
    }
    assert_eq!(
        world.display(PLAYER).current_text(),
        Some("Lost pages found: 1 / 6")
    );
}

#[test]
fn missing_collaborators_are_counted_not_fatal() {
    let mut host = host_with(|defs| {
        defs.spawners.push(spawner_def(SpawnCadence::Timer {
            interval_seconds: 1.0,
        }))
    });
    let mut world = FakeWorld::with_actors(&[PLAYER]);
    world.spawner = None;
    world.displays.clear();

    let report = tick(&mut host, &mut world, 1.0, &[]);
    assert_eq!(report.apply_stats.spawn_entity, 1);
    assert_eq!(report.apply_stats.missing_collaborator_count, 1);
}

#[test]
fn detached_inventory_keeps_everything_inert() {
    let mut host = host_with(|defs| {
        defs.hazards.push(hazard_def());
        defs.spawners.push(spawner_def(SpawnCadence::Timer {
            interval_seconds: 1.0,
        }));
    });
    let mut world = FakeWorld::with_actors(&[PLAYER]);
    world.inventory = None;

    let report = tick(
        &mut host,
        &mut world,
        1.0,
        &[trigger(ZoneId::hazard(0), TriggerPhase::Stay)],
    );
    assert_eq!(report.event_counts.total, 0);
    assert!(!host.is_unsafe(PLAYER));
    assert!(world.spawned_templates().is_empty());
}

#[test]
fn unknown_zone_is_ignored() {
    let mut host = host_with(|_| {});
    let mut world = FakeWorld::with_actors(&[PLAYER]);
    let report = tick(
        &mut host,
        &mut world,
        0.1,
        &[
            trigger(ZoneId::gate(4), TriggerPhase::Enter),
            trigger(ZoneId::hazard(2), TriggerPhase::Stay),
        ],
    );
    assert_eq!(report.event_counts.total, 0);
}

#[test]
fn mismatched_spawner_fails_host_construction() {
    let mut defs = base_defs();
    let mut spawner = spawner_def(SpawnCadence::NightGated);
    spawner.schedule = SpawnSchedule::of(["z1"]);
    defs.spawners.push(spawner);
    let err = ProgressionHost::from_level(&LevelDatabase::from_defs(defs), 0)
        .expect_err("length mismatch");
    assert!(matches!(err, SpawnerConfigError::ScheduleLengthMismatch { .. }));
}

#[test]
fn snapshot_lists_regions_and_unsafe_actors() {
    let mut host = host_with(|defs| {
        defs.gates.push(gate_def());
        defs.hazards.push(hazard_def());
        defs.terminals.push(terminal_def());
    });
    let mut world = FakeWorld::with_actors(&[PLAYER]);
    tick(
        &mut host,
        &mut world,
        0.1,
        &[trigger(ZoneId::hazard(0), TriggerPhase::Stay)],
    );
    let regions = host
        .trigger_regions()
        .into_iter()
        .map(|(zone, _)| zone)
        .collect::<Vec<_>>();
    assert_eq!(
        regions,
        vec![ZoneId::gate(0), ZoneId::hazard(0), ZoneId::terminal(0)]
    );
    let snapshot = host.snapshot();
    assert_eq!(snapshot.tick, 1);
    assert_eq!(snapshot.unsafe_actors, vec![PLAYER]);
    assert!(!snapshot.gates[0].is_open);
}
