use servo_core::driver::ServoDriver;
use servo_core::metrics::MetricsSource;
use servo_core::pattern::PatternStore;
use servo_core::{ActuatorRegistry, PatternRunner};
use std::sync::Arc;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ActuatorRegistry>,
    pub patterns: Arc<PatternStore>,
    pub runner: PatternRunner,
    pub metrics: Arc<dyn MetricsSource>,
}

impl AppState {
    pub fn new(driver: Arc<dyn ServoDriver>, metrics: Arc<dyn MetricsSource>) -> Self {
        let registry = Arc::new(ActuatorRegistry::new(driver));
        let patterns = Arc::new(PatternStore::new());
        let runner = PatternRunner::new(registry.clone(), patterns.clone());
        Self {
            registry,
            patterns,
            runner,
            metrics,
        }
    }
}
