/// Run/loop controller
///
/// Owns the run state the hosting UI drives: validates the graph, performs a
/// single run for a trigger node or arms a repeating loop for a schedule node,
/// and cancels everything on stop. While a run or loop is active the graph is
/// locked against edits.
///
/// States: `Idle -> Running -> Idle` for manual runs,
/// `Idle -> ArmedLooping -> Idle` for schedules.

use crate::error::{ControllerError, EngineError, ValidationError};
use crate::nodes::trigger::ScheduleSettings;
use crate::runtime::engine::{ExecutionEngine, RunReport};
use crate::workflow::graph::SharedGraph;
use crate::workflow::types::NodeKind;
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};
use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};

/// Controller state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunPhase {
    Idle,
    /// A manual run is in flight
    Running,
    /// A schedule loop is armed (a run may or may not be in flight)
    ArmedLooping,
}

/// Snapshot of the controller for the hosting UI
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStatus {
    pub phase: RunPhase,
    /// Graph edits must be rejected while set
    pub locked: bool,
    pub iteration_count: u64,
    pub runs_completed: u64,
    pub executing_node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
}

/// Result of a successful `start`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum StartOutcome {
    /// Manual trigger: the single run finished
    Completed { report: RunReport },
    /// Manual trigger: the run was stopped before it finished
    Cancelled,
    /// Schedule: the loop is armed and running in the background
    Armed {
        trigger_id: String,
        interval_ms: u64,
        repeat_count: u64,
    },
}

/// Trigger node picked by validation
struct ValidatedStart {
    trigger_id: String,
    schedule: Option<ScheduleSettings>,
}

/// Mutable controller state guarded by one lock
#[derive(Debug)]
struct Slot {
    phase: RunPhase,
    /// Background task of the active manual run or loop
    task: Option<JoinHandle<()>>,
    interval_ms: Option<u64>,
    /// Bumped on every start and stop so stale tasks leave newer state alone
    generation: u64,
}

struct Shared {
    graph: SharedGraph,
    engine: Arc<ExecutionEngine>,
    slot: Mutex<Slot>,
    locked: AtomicBool,
    iteration_count: AtomicU64,
    runs_completed: AtomicU64,
    phase_tx: watch::Sender<RunPhase>,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        // a poisoned slot still holds consistent plain data
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_phase(&self, slot: &mut Slot, phase: RunPhase) {
        slot.phase = phase;
        self.locked.store(phase != RunPhase::Idle, Ordering::SeqCst);
        self.phase_tx.send_replace(phase);
    }

    /// Return to idle unless a stop or newer start already moved on
    fn finish(&self, generation: u64) {
        let mut slot = self.slot();
        if slot.generation == generation && slot.phase != RunPhase::Idle {
            slot.task = None;
            slot.interval_ms = None;
            self.set_phase(&mut slot, RunPhase::Idle);
        }
    }

    async fn run_loop(self: Arc<Self>, generation: u64, trigger_id: String, settings: ScheduleSettings) {
        if !settings.delay.is_zero() {
            tracing::info!("⏳ Waiting {:?} before the first iteration", settings.delay);
            tokio::time::sleep(settings.delay).await;
        }

        let mut ticker = tokio::time::interval(settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // first tick completes immediately
            ticker.tick().await;

            if self.engine.is_running() {
                tracing::warn!("⏭️ Another run is still executing, skipping this tick");
                continue;
            }

            let iteration = self.iteration_count.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::info!("🔁 Executing flow (iteration {})", iteration);

            match self.engine.run(&self.graph, &trigger_id).await {
                Ok(report) => {
                    self.runs_completed.fetch_add(1, Ordering::SeqCst);
                    tracing::debug!("📋 Iteration {} visited {:?}", iteration, report.visited);
                }
                Err(EngineError::ConcurrentRun) => {
                    self.iteration_count.fetch_sub(1, Ordering::SeqCst);
                    tracing::warn!("⏭️ Run started elsewhere, skipping this tick");
                    continue;
                }
                Err(e) => {
                    tracing::error!("❌ Scheduled run failed, stopping loop: {}", e);
                    break;
                }
            }

            if settings.repeat_count > 0 && iteration >= settings.repeat_count {
                tracing::info!(
                    "🏁 Loop finished after {} iterations (max: {})",
                    iteration,
                    settings.repeat_count
                );
                break;
            }
        }

        self.graph.write().await.clear_running_flags();
        self.finish(generation);
    }
}

/// Controller owning the lock flag, iteration count and loop timer
pub struct RunController {
    shared: Arc<Shared>,
}

impl RunController {
    pub fn new(graph: SharedGraph, engine: Arc<ExecutionEngine>) -> Self {
        let (phase_tx, _) = watch::channel(RunPhase::Idle);
        Self {
            shared: Arc::new(Shared {
                graph,
                engine,
                slot: Mutex::new(Slot {
                    phase: RunPhase::Idle,
                    task: None,
                    interval_ms: None,
                    generation: 0,
                }),
                locked: AtomicBool::new(false),
                iteration_count: AtomicU64::new(0),
                runs_completed: AtomicU64::new(0),
                phase_tx,
            }),
        }
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.shared.graph
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.shared.engine
    }

    /// Whether graph edits must currently be rejected
    pub fn is_locked(&self) -> bool {
        self.shared.locked.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> RunPhase {
        self.shared.slot().phase
    }

    /// Watch phase transitions
    pub fn subscribe(&self) -> watch::Receiver<RunPhase> {
        self.shared.phase_tx.subscribe()
    }

    pub async fn status(&self) -> ControllerStatus {
        let executing_node_id = self
            .shared
            .graph
            .read()
            .await
            .executing_node_id()
            .map(str::to_string);
        let slot = self.shared.slot();
        ControllerStatus {
            phase: slot.phase,
            locked: self.is_locked(),
            iteration_count: self.shared.iteration_count.load(Ordering::SeqCst),
            runs_completed: self.shared.runs_completed.load(Ordering::SeqCst),
            executing_node_id,
            interval_ms: slot.interval_ms,
        }
    }

    /// Validate the graph and start a manual run or a schedule loop
    ///
    /// Rejected as a no-op while a run is in flight or a loop is armed.
    pub async fn start(&self) -> Result<StartOutcome, ControllerError> {
        if self.phase() != RunPhase::Idle || self.shared.engine.is_running() {
            tracing::warn!("⚠️ A run or loop is already active. Stop it first to start a new one.");
            return Err(ControllerError::AlreadyActive);
        }

        let validated = self.validate().await.inspect_err(|e| {
            tracing::warn!("🚫 Flow validation failed: {}", e);
        })?;

        match validated.schedule {
            None => self.start_manual(validated.trigger_id).await,
            Some(settings) => self.arm_loop(validated.trigger_id, settings),
        }
    }

    /// Cancel the active run or loop and return to idle
    ///
    /// Returns whether anything was active.
    pub async fn stop(&self) -> bool {
        let (task, was_active) = {
            let mut slot = self.shared.slot();
            let was_active = slot.phase != RunPhase::Idle;
            slot.generation += 1;
            slot.interval_ms = None;
            let task = slot.task.take();
            self.shared.set_phase(&mut slot, RunPhase::Idle);
            (task, was_active)
        };
        self.shared.iteration_count.store(0, Ordering::SeqCst);

        if let Some(task) = task {
            task.abort();
            // wait for the task to drop so the engine's in-flight flag is released
            let _ = task.await;
        }
        self.shared.graph.write().await.clear_running_flags();

        if was_active {
            tracing::info!("⏹️ Flow stopped");
        }
        was_active
    }

    async fn validate(&self) -> Result<ValidatedStart, ValidationError> {
        let graph = self.shared.graph.read().await;
        let candidates = graph.trigger_candidates();

        let trigger = match candidates.as_slice() {
            [] => return Err(ValidationError::NoTrigger),
            [trigger] => *trigger,
            many => {
                return Err(ValidationError::MultipleTriggers(
                    many.iter().map(|node| node.id.clone()).collect(),
                ))
            }
        };

        tracing::debug!(
            "🔍 Trigger '{}' reaches {} nodes (cycles: {})",
            trigger.id,
            graph.reachable_from(&trigger.id).len(),
            graph.has_cycle()
        );

        let schedule = match trigger.kind {
            NodeKind::Schedule => Some(ScheduleSettings::from_data(&trigger.id, &trigger.data)?),
            _ => None,
        };

        Ok(ValidatedStart {
            trigger_id: trigger.id.clone(),
            schedule,
        })
    }

    async fn start_manual(&self, trigger_id: String) -> Result<StartOutcome, ControllerError> {
        let (result_tx, result_rx) = oneshot::channel();
        {
            let mut slot = self.shared.slot();
            if slot.phase != RunPhase::Idle || self.shared.engine.is_running() {
                return Err(ControllerError::AlreadyActive);
            }
            slot.generation += 1;
            let generation = slot.generation;

            // bookkeeping lives in the task, the caller may be dropped mid-run
            let shared = Arc::clone(&self.shared);
            let id = trigger_id.clone();
            slot.task = Some(tokio::spawn(async move {
                let result = shared.engine.run(&shared.graph, &id).await;
                if result.is_ok() {
                    shared.runs_completed.fetch_add(1, Ordering::SeqCst);
                }
                shared.finish(generation);
                let _ = result_tx.send(result);
            }));
            self.shared.set_phase(&mut slot, RunPhase::Running);
        }

        tracing::info!("▶️ Manual run from trigger '{}'", trigger_id);
        match result_rx.await {
            Ok(Ok(report)) => {
                tracing::info!("✅ Manual trigger flow completed");
                Ok(StartOutcome::Completed { report })
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                tracing::info!("⏹️ Manual run was stopped before completing");
                Ok(StartOutcome::Cancelled)
            }
        }
    }

    fn arm_loop(&self, trigger_id: String, settings: ScheduleSettings) -> Result<StartOutcome, ControllerError> {
        let mut slot = self.shared.slot();
        if slot.phase != RunPhase::Idle || self.shared.engine.is_running() {
            return Err(ControllerError::AlreadyActive);
        }
        slot.generation += 1;
        let generation = slot.generation;
        self.shared.iteration_count.store(0, Ordering::SeqCst);

        let interval_ms = settings.interval_ms();
        let shared = Arc::clone(&self.shared);
        slot.task = Some(tokio::spawn(shared.run_loop(
            generation,
            trigger_id.clone(),
            settings,
        )));
        slot.interval_ms = Some(interval_ms);
        self.shared.set_phase(&mut slot, RunPhase::ArmedLooping);

        tracing::info!(
            "⏰ Flow scheduled to repeat every {}ms from '{}' (repeat count: {})",
            interval_ms,
            trigger_id,
            settings.repeat_count
        );

        Ok(StartOutcome::Armed {
            trigger_id,
            interval_ms,
            repeat_count: settings.repeat_count,
        })
    }
}

impl Drop for RunController {
    fn drop(&mut self) {
        if let Some(task) = self.shared.slot().task.take() {
            tracing::debug!("🧹 Aborting active run task on controller teardown");
            task.abort();
        }
    }
}

impl std::fmt::Debug for RunController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunController")
            .field("phase", &self.phase())
            .field("locked", &self.is_locked())
            .finish()
    }
}
