use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Instant;

use common_status::StatusReporter;
use envconfig::Envconfig;
use lifecycle::{ExitCoordinator, LifecycleManager};
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use wavepipe::checks::{running_as_root, startup_warnings};
use wavepipe::config::Config;
use wavepipe::data::MemoryStore;
use wavepipe::server::{setup_metrics_recorder, AppState, HttpSubsystem};

#[tokio::main]
async fn main() {
    let started_at = Instant::now();
    let config = Config::init_from_env().expect("Invalid configuration");

    let log_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stdout().is_terminal());
    tracing_subscriber::registry()
        .with(log_layer)
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    info!("wavepipe: starting...");
    for warning in startup_warnings(running_as_root(), config.debug) {
        warn!("wavepipe: {warning}");
    }

    let metrics = if config.export_prometheus {
        match setup_metrics_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("wavepipe: metrics exporter disabled: {e}");
                None
            }
        }
    } else {
        None
    };

    let state = AppState::new(
        StatusReporter::new(started_at),
        config.mode(),
        Arc::new(MemoryStore::default()),
    );
    let manager = LifecycleManager::new(
        "wavepipe",
        HttpSubsystem::new(config.bind.clone(), state, metrics),
    );

    let mut coordinator = ExitCoordinator::builder("wavepipe");
    if config.test_mode {
        coordinator = coordinator.with_test_mode(config.test_mode_delay());
    }

    match coordinator.build().run(manager).await {
        Ok(termination) => termination.exit(),
        Err(e) => {
            error!("wavepipe: lifecycle failed: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
