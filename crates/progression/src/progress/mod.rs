mod effects;
mod gate;
mod hazard;
mod ledger;
mod placement;
mod spawner;
mod terminal;
mod tracker;

pub use effects::{
    IntentApplyStats, IntentQueue, ProgressionEvent, ProgressionEventBus, ProgressionEventCounts,
    ProgressionEventKind, ProgressionIntent, ProgressionIntentKind,
};
pub use gate::{AreaGate, GateDef, GateOutcome, GateState, DEFAULT_LOCKED_MESSAGE};
pub use hazard::{
    HazardDef, HazardVerdict, HazardZone, UnsafeRegistry, DEFAULT_DAMAGE_PER_SECOND,
    DEFAULT_WARNING_MESSAGE,
};
pub use ledger::FragmentLedger;
pub use placement::{
    resolve_spawn_position, Placement, PlacementRequest, PlacementSource, PROBE_HEIGHT_OFFSET,
    PROBE_MAX_DISTANCE, SPAWN_SEARCH_ATTEMPTS,
};
pub use spawner::{
    ActorSpawnState, CadenceState, DeclineReason, ProgressCounter, SequentialSpawner,
    SpawnAttempt, SpawnCadence, SpawnContext, SpawnerConfigError, SpawnerDef,
    DEFAULT_MAX_SPAWN_RADIUS, DEFAULT_MIN_SPAWN_RADIUS, DEFAULT_TIMER_INTERVAL_SECONDS,
};
pub use terminal::{
    AudioCue, TerminalDef, TerminalEncounter, TerminalOutcome, TerminalState,
    DEFAULT_CUE_VOLUME, DEFAULT_ENCOUNTER_MESSAGE, DEFAULT_HINT_MESSAGE,
};
pub use tracker::{
    ProgressTracker, StoryPagesDef, DEFAULT_ALL_COMPLETE_TEXT, DEFAULT_RESYNC_INTERVAL_SECONDS,
};
