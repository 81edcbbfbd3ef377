//! Simulation Engine Root
//!
//! Owns every subsystem and the handles of background tasks. Operation
//! logic lives in the per-category modules as `impl SimEngine` blocks;
//! this file wires construction, settings, reset and shutdown together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::constants::{APP_NAME, APP_VERSION, STATUS_RESET_DELAY_MS};
use super::activity::ActivityLog;
use super::opstate::OpRegistry;
use super::settings::{SettingChange, Settings};
use super::status::StatusBoard;
use super::store::Store;

static ENGINE: Lazy<Arc<SimEngine>> = Lazy::new(SimEngine::new);

/// Background task handles, one slot per periodic or armed job.
#[derive(Debug, Default)]
pub struct TaskSlots {
    pub timed_collection: Mutex<Option<JoinHandle<()>>>,
    pub scheduled_sweeps: Mutex<Option<JoinHandle<()>>>,
    pub armed_schedule: Mutex<Option<JoinHandle<()>>>,
    pub monitor: Mutex<Option<JoinHandle<()>>>,
    pub demo: Mutex<Option<JoinHandle<()>>>,
}

fn abort_slot(slot: &Mutex<Option<JoinHandle<()>>>) -> bool {
    if let Some(handle) = slot.lock().take() {
        handle.abort();
        true
    } else {
        false
    }
}

#[derive(Debug)]
pub struct SimEngine {
    pub settings: Settings,
    pub store: Store,
    pub activity: ActivityLog,
    pub status: StatusBoard,
    pub ops: Arc<OpRegistry>,
    pub tasks: TaskSlots,
    pub(crate) demo_active: AtomicBool,
}

impl SimEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(SimEngine {
            settings: Settings::new(),
            store: Store::new(),
            activity: ActivityLog::new(),
            status: StatusBoard::new(),
            ops: Arc::new(OpRegistry::new()),
            tasks: TaskSlots::default(),
            demo_active: AtomicBool::new(false),
        })
    }

    /// The process-wide engine behind the console surface.
    pub fn global() -> Arc<Self> {
        Arc::clone(&ENGINE)
    }

    /// Welcome banner into the activity feed, once at startup.
    pub fn init(&self) {
        self.activity.info(format!(
            "[system] {APP_NAME} v{APP_VERSION} initialized - trigger demonstration ready"
        ));
        self.activity
            .info("[system] data collection and prediction triggers ready");
    }

    pub fn apply_setting(&self, change: SettingChange) -> String {
        let description = self.settings.apply(&change);
        self.activity.info(format!("[settings] {description}"));
        description
    }

    pub fn is_timed_collection_active(&self) -> bool {
        self.tasks.timed_collection.lock().is_some()
    }

    pub fn is_scheduled_sweeps_active(&self) -> bool {
        self.tasks.scheduled_sweeps.lock().is_some()
    }

    pub fn is_schedule_armed(&self) -> bool {
        self.tasks
            .armed_schedule
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub fn is_demo_active(&self) -> bool {
        self.demo_active.load(Ordering::SeqCst)
    }

    /// Finished collection/prediction slots settle back to idle after the
    /// board delay, provided nothing else started running meanwhile.
    pub(crate) fn schedule_settle(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(STATUS_RESET_DELAY_MS)).await;
            engine.ops.settle_finished();
        });
    }

    /// Workflow settles unconditionally, and takes the rest of the board
    /// with it once nothing is running.
    pub(crate) fn schedule_workflow_settle(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(STATUS_RESET_DELAY_MS)).await;
            engine.ops.settle_workflow();
            engine.ops.settle_finished();
        });
    }

    /// Full reset: periodic jobs stop, records and feed are wiped, live
    /// values return to boot state. A phased run already in flight is left
    /// to finish on its own.
    pub fn reset(&self) {
        abort_slot(&self.tasks.timed_collection);
        abort_slot(&self.tasks.scheduled_sweeps);
        abort_slot(&self.tasks.armed_schedule);
        abort_slot(&self.tasks.demo);
        self.demo_active.store(false, Ordering::SeqCst);

        self.store.reset();
        self.settings.reset_live_values();
        self.status.reset();
        self.ops.clear_finished();

        self.activity.wipe();
        self.init();
        self.activity.info("[system] system reset complete");
    }

    /// Process exit: stop every background task.
    pub fn shutdown(&self) {
        abort_slot(&self.tasks.timed_collection);
        abort_slot(&self.tasks.scheduled_sweeps);
        abort_slot(&self.tasks.armed_schedule);
        abort_slot(&self.tasks.monitor);
        abort_slot(&self.tasks.demo);
        self.demo_active.store(false, Ordering::SeqCst);
        log::info!("[system] background tasks stopped, cleanup complete");
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::opstate::{OpCategory, OpState};
    use crate::logic::settings::ModelKind;
    use crate::logic::store::{DataPoint, PointKind, Quality};
    use chrono::Utc;
    use uuid::Uuid;

    fn seed_point(engine: &SimEngine, value: f64) {
        engine.store.push_point(DataPoint {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind: PointKind::TimeBased,
            source: engine.settings.data_source(),
            value,
            quality: Quality::Good,
        });
    }

    #[test]
    fn apply_setting_writes_the_feed() {
        let engine = SimEngine::new();
        engine.apply_setting(SettingChange::Model(ModelKind::Ensemble));
        let lines = engine.activity.snapshot(5);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].message, "[settings] prediction model: ensemble");
        assert_eq!(engine.settings.model(), ModelKind::Ensemble);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restores_boot_state() {
        let engine = SimEngine::new();
        engine.init();
        engine.toggle_timed_collection();
        seed_point(&engine, 42.0);
        engine.store.set_model_accuracy(55.0);
        engine.settings.set_current_value(88.0);
        engine.settings.set_current_accuracy(55.0);
        assert!(engine.is_timed_collection_active());

        engine.reset();

        assert!(!engine.is_timed_collection_active());
        assert_eq!(engine.store.point_count(), 0);
        assert_eq!(engine.store.model_accuracy(), 90.0);
        assert_eq!(engine.settings.current_value(), 0.0);
        assert_eq!(engine.settings.current_accuracy(), 90.0);

        let lines = engine.activity.snapshot(10);
        assert!(lines
            .iter()
            .any(|l| l.message.contains("system reset complete")));
        assert!(lines
            .iter()
            .any(|l| l.message.contains("trigger demonstration ready")));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_leaves_a_running_sweep_to_finish() {
        let engine = SimEngine::new();
        let running = tokio::spawn(Arc::clone(&engine).run_collection());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(engine.ops.state(OpCategory::Collection), OpState::Running);

        engine.reset();
        // the in-flight sweep keeps its slot and finishes on its own
        assert_eq!(engine.ops.state(OpCategory::Collection), OpState::Running);

        let outcome = running.await.unwrap().unwrap();
        assert!((100..1100).contains(&outcome.records));
        assert!(engine.store.point_count() >= 100);
        assert_eq!(engine.store.sweeps_completed(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(engine.ops.state(OpCategory::Collection), OpState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_background_tasks() {
        let engine = SimEngine::new();
        engine.start_monitor();
        engine.toggle_timed_collection();
        assert!(engine.is_timed_collection_active());

        engine.shutdown();
        assert!(!engine.is_timed_collection_active());
        assert!(engine.tasks.monitor.lock().is_none());
    }
}
