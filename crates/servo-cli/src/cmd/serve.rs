use anyhow::Context;
use servo_core::config::{Config, WarnLevel};
use servo_core::driver::SimulatedDriver;
use servo_core::metrics::HostMetrics;
use servo_core::Channel;
use servo_server::AppState;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

pub fn run(path: &Path, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    crate::init_tracing(&config.log.level);

    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => warn!("config: {}", w.message),
            WarnLevel::Error => error!("config: {}", w.message),
        }
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        warn!("no hardware backend configured; driving the simulated controller");
        let state = AppState::new(
            Arc::new(SimulatedDriver::new()),
            Arc::new(HostMetrics::new()),
        );
        apply_startup(&state, &config);

        let addr = config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        servo_server::serve_on(state, listener, shutdown_signal()).await
    })
}

/// Configure startup channels and preload patterns. Failures are logged and
/// skipped so one bad entry does not keep the daemon down.
fn apply_startup(state: &AppState, config: &Config) {
    for (&raw, servo) in &config.servos {
        let result = Channel::new(raw).and_then(|ch| state.registry.configure(ch, servo.clone()));
        match result {
            Ok(()) => info!(channel = raw, "startup servo configured"),
            Err(e) => error!(channel = raw, error = %e, "startup servo configuration failed"),
        }
    }
    for pattern in &config.patterns {
        if let Err(e) = state.patterns.save(pattern.clone()) {
            error!(pattern = %pattern.name, error = %e, "startup pattern rejected");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
