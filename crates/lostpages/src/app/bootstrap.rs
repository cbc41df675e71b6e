use std::env;
use std::ffi::OsString;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use progression::{compile_level_file, resolve_app_paths, ProgressionHost};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::loop_runner::LoopConfig;
use super::script::{load_session_script, SessionScript};
use super::sim::{DayNightClock, SimWorld};
use super::SessionError;

const LEVEL_ENV_VAR: &str = "LOSTPAGES_LEVEL";
const SCRIPT_ENV_VAR: &str = "LOSTPAGES_SCRIPT";
const SEED_ENV_VAR: &str = "LOSTPAGES_SEED";
const TPS_ENV_VAR: &str = "LOSTPAGES_TPS";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) host: ProgressionHost,
    pub(crate) world: SimWorld,
    pub(crate) script: SessionScript,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionInputs {
    level: PathBuf,
    script: PathBuf,
}

pub(crate) fn build_app() -> Result<AppWiring, SessionError> {
    init_tracing();
    info!("=== Lost Pages Startup ===");

    let args = env::args_os().skip(1).collect::<Vec<_>>();
    let inputs = resolve_session_inputs(&args)?;
    info!(
        level = %inputs.level.display(),
        script = %inputs.script.display(),
        "session_inputs"
    );

    let level = compile_level_file(&inputs.level)?;
    let mut script = load_session_script(&inputs.script)?;
    if let Some(seed) = env_number::<u64>(SEED_ENV_VAR)? {
        info!(seed, script_seed = script.seed, "seed_overridden");
        script.seed = seed;
    }

    let mut config = LoopConfig::default();
    if let Some(target_tps) = env_number::<u32>(TPS_ENV_VAR)? {
        config.target_tps = target_tps;
    }

    let host = ProgressionHost::from_level(&level, script.seed)?;
    let world = SimWorld::new(DayNightClock::new(
        script.day_length_seconds,
        script.night_fraction,
    ));

    Ok(AppWiring {
        config,
        host,
        world,
        script,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn resolve_session_inputs(args: &[OsString]) -> Result<SessionInputs, SessionError> {
    let mut positional = args.iter().map(PathBuf::from);
    let level = positional.next().or_else(|| env_path(LEVEL_ENV_VAR));
    let script = positional.next().or_else(|| env_path(SCRIPT_ENV_VAR));

    match (level, script) {
        (Some(level), Some(script)) => Ok(SessionInputs { level, script }),
        (level, script) => {
            let paths = resolve_app_paths()?;
            info!(root = %paths.root.display(), "startup");
            Ok(SessionInputs {
                level: level.unwrap_or_else(|| paths.default_level()),
                script: script.unwrap_or_else(|| paths.default_session()),
            })
        }
    }
}

fn env_path(var: &'static str) -> Option<PathBuf> {
    env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn env_number<T>(var: &'static str) -> Result<Option<T>, SessionError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(var) {
        Ok(raw) => parse_env_number(var, &raw).map(Some),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(SessionError::InvalidEnv {
            var,
            message: err.to_string(),
        }),
    }
}

fn parse_env_number<T>(var: &'static str, raw: &str) -> Result<T, SessionError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|err| SessionError::InvalidEnv {
            var,
            message: format!("'{raw}': {err}"),
        })
}
