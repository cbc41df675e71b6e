use std::collections::BTreeSet;
use std::process::ExitCode;
use std::time::Duration;

use progression::progress::{ProgressionEvent, ProgressionEventCounts};
use progression::world::{ActorId, RegionBounds, ZoneId};
use progression::{
    ActorFrame, ProgressionHost, ProgressionSnapshot, TickInput, TickReport, TriggerEvent,
    TriggerPhase, PROGRESSION_SYSTEM_ORDER_TEXT,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::bootstrap::AppWiring;
use super::script::{
    to_fragment, to_vec3, ScriptStep, SessionScript, StepAction, MAX_SESSION_SECONDS,
};
use super::sim::{ActorSummary, AudioRecord, SimWorld, SpawnRecord};
use super::SessionError;

#[derive(Debug, Clone)]
pub(crate) struct LoopConfig {
    pub target_tps: u32,
    pub frame_interval: Duration,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            frame_interval: Duration::from_millis(50),
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TimedEvent {
    pub tick: u64,
    pub at_seconds: f32,
    #[serde(flatten)]
    pub event: ProgressionEvent,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SessionSummary {
    pub seed: u64,
    pub system_order: &'static str,
    pub ticks: u64,
    pub simulated_seconds: f32,
    pub dropped_backlog_ms: u64,
    pub event_totals: ProgressionEventCounts,
    pub missing_collaborators: u64,
    pub events: Vec<TimedEvent>,
    pub spawns: Vec<SpawnRecord>,
    pub barriers_removed: Vec<ZoneId>,
    pub audio: Vec<AudioRecord>,
    pub actors: Vec<ActorSummary>,
    pub progression: ProgressionSnapshot,
}

pub(crate) struct Session {
    host: ProgressionHost,
    world: SimWorld,
    actors: Vec<ActorFrame>,
    pending_steps: Vec<ScriptStep>,
    next_step: usize,
    regions: Vec<(ZoneId, RegionBounds)>,
    inside: BTreeSet<(ActorId, ZoneId)>,
    elapsed_seconds: f32,
    ticks: u64,
    event_totals: ProgressionEventCounts,
    missing_collaborators: u64,
    events: Vec<TimedEvent>,
}

impl Session {
    pub fn new(mut host: ProgressionHost, mut world: SimWorld, script: &SessionScript) -> Self {
        let mut actors = Vec::with_capacity(script.actors.len());
        for actor in &script.actors {
            let actor_id = ActorId(actor.id);
            world.add_actor(
                actor_id,
                actor.attach.inventory,
                actor.attach.display,
                actor.attach.attributes,
            );
            for fragment in &actor.starting_fragments {
                world.grant(actor_id, &to_fragment(fragment));
            }
            actors.push(ActorFrame {
                actor_id,
                position: to_vec3(actor.position),
                facing: to_vec3(actor.facing),
            });
        }
        actors.sort_by_key(|frame| frame.actor_id);
        for frame in &actors {
            host.start_actor(frame.actor_id, &mut world);
        }

        let regions = host.trigger_regions();
        Self {
            host,
            world,
            actors,
            pending_steps: script.steps.clone(),
            next_step: 0,
            regions,
            inside: BTreeSet::new(),
            elapsed_seconds: 0.0,
            ticks: 0,
            event_totals: ProgressionEventCounts::default(),
            missing_collaborators: 0,
            events: Vec::new(),
        }
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed_seconds
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn host(&self) -> &ProgressionHost {
        &self.host
    }

    pub fn world(&self) -> &SimWorld {
        &self.world
    }

    pub fn step(&mut self, dt_seconds: f32) -> TickReport {
        self.apply_due_steps();
        self.world.advance_clock(dt_seconds);
        let triggers = self.collect_triggers();
        let report = self.host.run_tick(
            &TickInput {
                dt_seconds,
                triggers: &triggers,
                actors: &self.actors,
            },
            &mut self.world,
        );
        self.elapsed_seconds += dt_seconds;
        self.ticks = self.ticks.saturating_add(1);
        self.record(&report);
        report
    }

    fn apply_due_steps(&mut self) {
        while let Some(step) = self.pending_steps.get(self.next_step) {
            if step.at_seconds > self.elapsed_seconds {
                break;
            }
            let action = step.action.clone();
            self.next_step += 1;
            self.apply_action(action);
        }
    }

    fn apply_action(&mut self, action: StepAction) {
        match action {
            StepAction::MoveActor {
                actor,
                position,
                facing,
            } => {
                if let Some(frame) = self
                    .actors
                    .iter_mut()
                    .find(|frame| frame.actor_id == ActorId(actor))
                {
                    frame.position = to_vec3(position);
                    if let Some(facing) = facing {
                        frame.facing = to_vec3(facing);
                    }
                    debug!(actor, x = position[0], y = position[1], z = position[2], "actor_moved");
                }
            }
            StepAction::GrantFragment { actor, fragment } => {
                let actor_id = ActorId(actor);
                let fragment = to_fragment(&fragment);
                if self.world.grant(actor_id, &fragment) {
                    info!(actor, fragment = %fragment, "fragment_granted");
                    self.host.notify_item_acquired(actor_id, &fragment);
                } else if !self.world.has_inventory(actor_id) {
                    warn!(actor, fragment = %fragment, "fragment_grant_skipped_no_inventory");
                }
            }
            StepAction::RevokeFragment { actor, fragment } => {
                let fragment = to_fragment(&fragment);
                if self.world.revoke(ActorId(actor), &fragment) {
                    info!(actor, fragment = %fragment, "fragment_revoked");
                }
            }
        }
    }

    fn collect_triggers(&mut self) -> Vec<TriggerEvent> {
        let mut triggers = Vec::new();
        for frame in &self.actors {
            for (zone, bounds) in &self.regions {
                let key = (frame.actor_id, *zone);
                let was_inside = self.inside.contains(&key);
                let is_inside = bounds.contains(frame.position);
                let phase = match (was_inside, is_inside) {
                    (false, true) => TriggerPhase::Enter,
                    (true, true) => TriggerPhase::Stay,
                    (true, false) => TriggerPhase::Exit,
                    (false, false) => continue,
                };
                if is_inside {
                    self.inside.insert(key);
                } else {
                    self.inside.remove(&key);
                }
                triggers.push(TriggerEvent {
                    actor_id: frame.actor_id,
                    zone: *zone,
                    phase,
                });
            }
        }
        triggers
    }

    fn record(&mut self, report: &TickReport) {
        for event in &report.events {
            self.event_totals.record(event.kind());
            if !matches!(event, ProgressionEvent::HazardDamage { .. }) {
                self.events.push(TimedEvent {
                    tick: report.tick,
                    at_seconds: self.elapsed_seconds,
                    event: event.clone(),
                });
            }
        }
        self.missing_collaborators = self
            .missing_collaborators
            .saturating_add(u64::from(report.apply_stats.missing_collaborator_count));
    }

    pub fn into_summary(self, seed: u64, dropped_backlog: Duration) -> SessionSummary {
        SessionSummary {
            seed,
            system_order: PROGRESSION_SYSTEM_ORDER_TEXT,
            ticks: self.ticks,
            simulated_seconds: self.elapsed_seconds,
            dropped_backlog_ms: dropped_backlog.as_millis() as u64,
            event_totals: self.event_totals,
            missing_collaborators: self.missing_collaborators,
            events: self.events,
            spawns: self.world.spawn_records().to_vec(),
            barriers_removed: self.world.removed_barriers().to_vec(),
            audio: self.world.audio_records().to_vec(),
            actors: self.world.actor_summaries(),
            progression: self.host.snapshot(),
        }
    }
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let summary = run_session(app);
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(source) => {
            error!(error = %SessionError::WriteSummary(source), "session_failed");
            ExitCode::FAILURE
        }
    }
}

pub(crate) fn run_session(app: AppWiring) -> SessionSummary {
    let AppWiring {
        config,
        host,
        world,
        script,
    } = app;

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let frame_interval =
        normalize_non_zero_duration(config.frame_interval, Duration::from_millis(50));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let frame_dt = clamp_frame_delta(frame_interval, max_frame_delta);
    let max_ticks_per_frame = config
        .max_ticks_per_frame
        .max(frame_tick_budget(frame_dt, fixed_dt));
    let duration = Duration::from_secs_f32(script.duration_seconds.clamp(0.0, MAX_SESSION_SECONDS));

    info!(
        target_tps,
        frame_interval_ms = frame_interval.as_millis() as u64,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        duration_seconds = script.duration_seconds,
        seed = script.seed,
        "loop_config"
    );

    let mut session = Session::new(host, world, &script);
    let mut accumulator = Duration::ZERO;
    let mut simulated = Duration::ZERO;
    let mut dropped_backlog = Duration::ZERO;

    while simulated < duration {
        simulated = simulated.saturating_add(frame_dt);
        accumulator = accumulator.saturating_add(frame_dt);

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            session.step(fixed_dt_seconds);
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            dropped_backlog = dropped_backlog.saturating_add(step_plan.dropped_backlog);
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }
    }

    info!(
        ticks = session.ticks(),
        simulated_seconds = session.elapsed_seconds(),
        unsafe_actors = session.host().snapshot().unsafe_actors.len(),
        spawns = session.world().spawn_records().len(),
        "session_finished"
    );
    session.into_summary(script.seed, dropped_backlog)
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

/// Simulated frames are never late, so every frame must be able to drain its own time.
fn frame_tick_budget(frame_dt: Duration, fixed_dt: Duration) -> u32 {
    let whole_ticks = frame_dt.as_nanos() / fixed_dt.as_nanos().max(1);
    u32::try_from(whole_ticks)
        .unwrap_or(u32::MAX - 1)
        .saturating_add(1)
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
