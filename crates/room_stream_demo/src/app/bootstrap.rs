use std::env;
use std::path::PathBuf;
use std::time::Duration;

use room_stream::{ConfigLoadError, StreamConfig, CONFIG_ENV_VAR};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const RUN_SECONDS_ENV_VAR: &str = "ROOM_STREAM_DEMO_SECONDS";
const DEFAULT_RUN_SECONDS: u64 = 90;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DemoSettings {
    pub(crate) run_duration: Duration,
    pub(crate) fixed_dt: Duration,
    pub(crate) max_ticks_per_frame: u32,
    pub(crate) walk_speed: f32,
    pub(crate) patrol_rooms: i64,
    pub(crate) fix_duration: Duration,
    pub(crate) stats_interval: Duration,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            run_duration: Duration::from_secs(DEFAULT_RUN_SECONDS),
            fixed_dt: Duration::from_micros(16_667),
            max_ticks_per_frame: 5,
            walk_speed: 12.0,
            patrol_rooms: 30,
            fix_duration: Duration::from_millis(400),
            stats_interval: Duration::from_secs(10),
        }
    }
}

pub(crate) struct AppWiring {
    pub(crate) config: StreamConfig,
    pub(crate) settings: DemoSettings,
}

pub(crate) fn build_app() -> Result<AppWiring, ConfigLoadError> {
    init_tracing();
    info!("=== Room Stream Demo ===");

    let config = match env::var_os(CONFIG_ENV_VAR) {
        Some(path) => {
            let path = PathBuf::from(path);
            let config = StreamConfig::load(&path)?;
            info!(
                path = %path.display(),
                variants = config.variant_count(),
                "stream_config_loaded"
            );
            config
        }
        None => {
            info!(env_var = CONFIG_ENV_VAR, "stream_config_default");
            StreamConfig::default()
        }
    };
    let settings = DemoSettings {
        run_duration: resolve_run_duration(DEFAULT_RUN_SECONDS),
        ..DemoSettings::default()
    };

    Ok(AppWiring { config, settings })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn resolve_run_duration(default_seconds: u64) -> Duration {
    parse_run_seconds(env::var(RUN_SECONDS_ENV_VAR), default_seconds)
}

fn parse_run_seconds(raw: Result<String, env::VarError>, default_seconds: u64) -> Duration {
    match raw {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(seconds) => Duration::from_secs(seconds),
            Err(_) => {
                warn!(
                    env_var = RUN_SECONDS_ENV_VAR,
                    value = value.as_str(),
                    "invalid run-duration env var value; falling back to default"
                );
                Duration::from_secs(default_seconds)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_secs(default_seconds),
        Err(err) => {
            warn!(
                env_var = RUN_SECONDS_ENV_VAR,
                error = %err,
                "unable to read run-duration env var; falling back to default"
            );
            Duration::from_secs(default_seconds)
        }
    }
}
