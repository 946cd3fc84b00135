//! Background playback of saved patterns.
//!
//! Each `start` spawns one tokio task. The task walks the pattern's steps in
//! order, issuing moves through the registry and sleeping between steps. A
//! pattern name's presence in the running set is its liveness flag: `stop`
//! removes the entry and raises the run's cancel flag, and the task checks
//! that flag at every step boundary.

use crate::error::{Result, ServoError};
use crate::pattern::PatternStore;
use crate::registry::ActuatorRegistry;
use crate::types::{Channel, Pattern};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Number of recent runs kept for status reporting. Older records are
/// dropped once they finish; a running record is never evicted.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub pattern: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Lifecycle notifications, fanned out to `/api/events` subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    PatternStarted {
        id: Uuid,
        pattern: String,
    },
    PatternFinished {
        id: Uuid,
        pattern: String,
        status: RunStatus,
        error: Option<String>,
    },
}

struct ActiveRun {
    id: Uuid,
    cancel: Arc<AtomicBool>,
}

#[derive(Clone)]
pub struct PatternRunner {
    registry: Arc<ActuatorRegistry>,
    store: Arc<PatternStore>,
    running: Arc<Mutex<HashMap<String, ActiveRun>>>,
    history: Arc<Mutex<VecDeque<RunRecord>>>,
    events: broadcast::Sender<RunEvent>,
}

impl PatternRunner {
    pub fn new(registry: Arc<ActuatorRegistry>, store: Arc<PatternStore>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            registry,
            store,
            running: Arc::new(Mutex::new(HashMap::new())),
            history: Arc::new(Mutex::new(VecDeque::new())),
            events,
        }
    }

    /// Spawn playback of `name` and return as soon as the task is launched.
    ///
    /// A name that is already running is rejected with `AlreadyRunning`.
    pub async fn start(&self, name: &str) -> Result<RunRecord> {
        let pattern = self.store.get(name)?;
        let cancel = Arc::new(AtomicBool::new(false));
        let record = RunRecord {
            id: Uuid::new_v4(),
            pattern: name.to_string(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        };

        // Check and insert in one lock window.
        {
            let mut running = self.running.lock().await;
            if running.contains_key(name) {
                warn!(pattern = %name, "start rejected: pattern already running");
                return Err(ServoError::AlreadyRunning(name.to_string()));
            }
            running.insert(
                name.to_string(),
                ActiveRun {
                    id: record.id,
                    cancel: cancel.clone(),
                },
            );
        }

        {
            let mut history = self.history.lock().await;
            history.push_front(record.clone());
            trim_history(&mut history);
        }

        let _ = self.events.send(RunEvent::PatternStarted {
            id: record.id,
            pattern: name.to_string(),
        });
        info!(pattern = %name, run_id = %record.id, steps = pattern.steps.len(), "pattern started");

        let runner = self.clone();
        let id = record.id;
        tokio::spawn(async move {
            runner.play(id, pattern, cancel).await;
        });

        Ok(record)
    }

    /// Request cancellation. Returns whether the pattern was running; never
    /// waits for the task to observe the request.
    pub async fn stop(&self, name: &str) -> bool {
        match self.running.lock().await.remove(name) {
            Some(run) => {
                run.cancel.store(true, Ordering::Release);
                info!(pattern = %name, run_id = %run.id, "pattern stop requested");
                true
            }
            None => false,
        }
    }

    pub async fn stop_all(&self) -> usize {
        let drained: Vec<(String, ActiveRun)> = self.running.lock().await.drain().collect();
        for (name, run) in &drained {
            run.cancel.store(true, Ordering::Release);
            info!(pattern = %name, run_id = %run.id, "pattern stop requested");
        }
        drained.len()
    }

    /// Names currently in the running set, sorted.
    pub async fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = self.running.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Recent runs, newest first.
    pub async fn history(&self) -> Vec<RunRecord> {
        self.history.lock().await.iter().cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }

    async fn play(self, id: Uuid, pattern: Pattern, cancel: Arc<AtomicBool>) {
        let (status, error) = match self.play_steps(&pattern, &cancel).await {
            Ok(true) => {
                info!(pattern = %pattern.name, run_id = %id, "pattern completed");
                (RunStatus::Completed, None)
            }
            Ok(false) => {
                info!(pattern = %pattern.name, run_id = %id, "pattern cancelled");
                (RunStatus::Cancelled, None)
            }
            Err(e) => {
                error!(pattern = %pattern.name, run_id = %id, error = %e, "pattern aborted");
                (RunStatus::Failed, Some(e.to_string()))
            }
        };

        // A stopped run may wake after the name was restarted; only release
        // the entry if it is still ours.
        {
            let mut running = self.running.lock().await;
            if running.get(&pattern.name).is_some_and(|r| r.id == id) {
                running.remove(&pattern.name);
            }
        }

        {
            let mut history = self.history.lock().await;
            match history.iter_mut().find(|r| r.id == id) {
                Some(rec) => {
                    rec.status = status;
                    rec.completed_at = Some(Utc::now());
                    rec.error = error.clone();
                }
                None => warn!(run_id = %id, "run record missing from history"),
            }
            trim_history(&mut history);
        }

        let _ = self.events.send(RunEvent::PatternFinished {
            id,
            pattern: pattern.name,
            status,
            error,
        });
    }

    /// Returns `Ok(false)` when cancelled at a step boundary, including a
    /// stop that arrives during the final step. The first failing move
    /// aborts the whole pattern.
    async fn play_steps(&self, pattern: &Pattern, cancel: &AtomicBool) -> Result<bool> {
        for (index, step) in pattern.steps.iter().enumerate() {
            if cancel.load(Ordering::Acquire) {
                return Ok(false);
            }

            let wait = step.wait()?;
            for (&raw, &angle) in &step.positions {
                let channel = Channel::new(raw)?;
                self.registry.move_to(channel, angle)?;
            }

            debug!(pattern = %pattern.name, step = index, wait_ms = wait.as_millis() as u64, "step issued");
            tokio::time::sleep(wait).await;
        }
        Ok(!cancel.load(Ordering::Acquire))
    }
}

/// Drop finished records past the newest `HISTORY_LIMIT`.
fn trim_history(history: &mut VecDeque<RunRecord>) {
    let mut i = HISTORY_LIMIT;
    while i < history.len() {
        if history[i].status == RunStatus::Running {
            i += 1;
        } else {
            history.remove(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverCall, SimulatedDriver};
    use crate::types::{ActuatorConfig, Step};
    use std::time::Duration;

    struct Rig {
        driver: Arc<SimulatedDriver>,
        registry: Arc<ActuatorRegistry>,
        store: Arc<PatternStore>,
        runner: PatternRunner,
    }

    fn rig(channels: &[i64]) -> Rig {
        let driver = Arc::new(SimulatedDriver::new());
        let registry = Arc::new(ActuatorRegistry::new(driver.clone()));
        for &n in channels {
            registry
                .configure(Channel::new(n).unwrap(), ActuatorConfig::new(500, 2500))
                .unwrap();
        }
        let store = Arc::new(PatternStore::new());
        let runner = PatternRunner::new(registry.clone(), store.clone());
        Rig {
            driver,
            registry,
            store,
            runner,
        }
    }

    fn angle_calls(driver: &SimulatedDriver, channel: u8) -> Vec<f64> {
        driver
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                DriverCall::Angle { channel: ch, angle } if ch == channel => Some(angle),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn pattern_leaves_running_set_after_its_duration() {
        let rig = rig(&[0]);
        rig.store
            .save(Pattern::new("wave", vec![Step::new([(0, 90.0)], 0.1)]))
            .unwrap();

        let record = rig.runner.start("wave").await.unwrap();
        assert_eq!(record.status, RunStatus::Running);
        assert_eq!(rig.runner.running().await, vec!["wave".to_string()]);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rig.runner.running().await.is_empty());

        let history = rig.runner.history().await;
        assert_eq!(history[0].id, record.id);
        assert_eq!(history[0].status, RunStatus::Completed);
        assert!(history[0].completed_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_later_steps() {
        let rig = rig(&[0]);
        rig.store
            .save(Pattern::new(
                "slow",
                vec![Step::new([(0, 30.0)], 10.0), Step::new([(0, 150.0)], 10.0)],
            ))
            .unwrap();

        rig.runner.start("slow").await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(rig.driver.angle(Channel::new(0).unwrap()), Some(30.0));

        assert!(rig.runner.stop("slow").await);
        assert!(rig.runner.running().await.is_empty());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!angle_calls(&rig.driver, 0).contains(&150.0));
        assert_eq!(rig.runner.history().await[0].status, RunStatus::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_final_step_is_cancelled() {
        let rig = rig(&[0]);
        rig.store
            .save(Pattern::new("once", vec![Step::new([(0, 30.0)], 10.0)]))
            .unwrap();
        let mut rx = rig.runner.subscribe();

        rig.runner.start("once").await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rig.runner.stop("once").await);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(rig.runner.history().await[0].status, RunStatus::Cancelled);

        assert!(matches!(rx.recv().await.unwrap(), RunEvent::PatternStarted { .. }));
        match rx.recv().await.unwrap() {
            RunEvent::PatternFinished { status, .. } => assert_eq!(status, RunStatus::Cancelled),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reconfigure_between_steps_applies_to_later_steps() {
        let rig = rig(&[0]);
        rig.store
            .save(Pattern::new(
                "sweep",
                vec![Step::new([(0, 30.0)], 10.0), Step::new([(0, 30.0)], 10.0)],
            ))
            .unwrap();

        rig.runner.start("sweep").await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(rig.driver.angle(Channel::new(0).unwrap()), Some(30.0));

        let mut inverted = ActuatorConfig::new(500, 2500);
        inverted.inverted = true;
        rig.registry
            .configure(Channel::new(0).unwrap(), inverted)
            .unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        // initial 90, step one, re-seek of 90 (inverted), step two inverted
        assert_eq!(angle_calls(&rig.driver, 0), vec![90.0, 30.0, 90.0, 150.0]);
        let snap = rig.registry.get(Channel::new(0).unwrap()).unwrap();
        assert_eq!(snap.position, Some(30.0));
    }

    #[tokio::test(start_paused = true)]
    async fn history_keeps_running_records_past_the_limit() {
        let total = HISTORY_LIMIT + 5;
        let rig = rig(&[0]);
        for i in 0..total {
            rig.store
                .save(Pattern::new(format!("p{i}"), vec![Step::new([(0, 90.0)], 5.0)]))
                .unwrap();
        }
        for i in 0..total {
            rig.runner.start(&format!("p{i}")).await.unwrap();
        }

        let history = rig.runner.history().await;
        assert_eq!(history.len(), total);
        assert!(history.iter().all(|r| r.status == RunStatus::Running));

        tokio::time::sleep(Duration::from_secs(10)).await;
        let history = rig.runner.history().await;
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert!(history.iter().all(|r| r.status == RunStatus::Completed));
        assert_eq!(history[0].pattern, format!("p{}", total - 1));
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_while_running_is_rejected() {
        let rig = rig(&[0]);
        rig.store
            .save(Pattern::new("hold", vec![Step::new([(0, 45.0)], 5.0)]))
            .unwrap();

        rig.runner.start("hold").await.unwrap();
        let err = rig.runner.start("hold").await.unwrap_err();
        assert!(matches!(err, ServoError::AlreadyRunning(name) if name == "hold"));
        assert_eq!(rig.runner.history().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_pattern_is_not_started() {
        let rig = rig(&[]);
        let err = rig.runner.start("ghost").await.unwrap_err();
        assert!(matches!(err, ServoError::PatternNotFound(_)));
        assert!(rig.runner.running().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_move_aborts_whole_pattern() {
        let rig = rig(&[0, 5]);
        rig.store
            .save(Pattern::new(
                "broken",
                vec![
                    Step::new([(0, 10.0), (3, 20.0), (5, 30.0)], 1.0),
                    Step::new([(0, 170.0)], 1.0),
                ],
            ))
            .unwrap();

        rig.runner.start("broken").await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(angle_calls(&rig.driver, 0), vec![90.0, 10.0]);
        assert_eq!(angle_calls(&rig.driver, 5), vec![90.0]);
        assert!(rig.runner.running().await.is_empty());

        let run = &rig.runner.history().await[0];
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.error.as_deref().unwrap().contains("channel 3"));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_step_channel_or_duration_fails_playback() {
        let rig = rig(&[0]);
        rig.store
            .save(Pattern::new("far", vec![Step::new([(16, 90.0)], 0.1)]))
            .unwrap();
        rig.store
            .save(Pattern::new("neg", vec![Step::new([(0, 90.0)], -1.0)]))
            .unwrap();

        rig.runner.start("far").await.unwrap();
        rig.runner.start("neg").await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let history = rig.runner.history().await;
        assert!(history.iter().all(|r| r.status == RunStatus::Failed));
        assert!(rig.runner.running().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_run_does_not_release_restarted_name() {
        let rig = rig(&[0]);
        rig.store
            .save(Pattern::new(
                "loop",
                vec![Step::new([(0, 20.0)], 10.0), Step::new([(0, 160.0)], 10.0)],
            ))
            .unwrap();

        rig.runner.start("loop").await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        rig.runner.stop("loop").await;
        let second = rig.runner.start("loop").await.unwrap();

        // First run wakes at t=10s and exits; second is mid-step until t=11s.
        tokio::time::sleep(Duration::from_millis(9_500)).await;
        assert_eq!(rig.runner.running().await, vec!["loop".to_string()]);

        let history = rig.runner.history().await;
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[0].status, RunStatus::Running);
        assert_eq!(history[1].status, RunStatus::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let rig = rig(&[]);
        assert!(!rig.runner.stop("nothing").await);
        assert!(!rig.runner.stop("nothing").await);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_clears_running_set() {
        let rig = rig(&[0, 1]);
        rig.store
            .save(Pattern::new("a", vec![Step::new([(0, 10.0)], 5.0)]))
            .unwrap();
        rig.store
            .save(Pattern::new("b", vec![Step::new([(1, 10.0)], 5.0)]))
            .unwrap();
        rig.runner.start("a").await.unwrap();
        rig.runner.start("b").await.unwrap();

        assert_eq!(rig.runner.stop_all().await, 2);
        assert!(rig.runner.running().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_events_are_broadcast() {
        let rig = rig(&[0]);
        rig.store
            .save(Pattern::new("blink", vec![Step::new([(0, 60.0)], 0.5)]))
            .unwrap();
        let mut rx = rig.runner.subscribe();

        let record = rig.runner.start("blink").await.unwrap();
        match rx.recv().await.unwrap() {
            RunEvent::PatternStarted { id, pattern } => {
                assert_eq!(id, record.id);
                assert_eq!(pattern, "blink");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.recv().await.unwrap() {
            RunEvent::PatternFinished { id, status, .. } => {
                assert_eq!(id, record.id);
                assert_eq!(status, RunStatus::Completed);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
