//! Collection Operations
//!
//! The timed stream, instant event triggers, the threshold watch and the
//! phased collection sweep. Everything here produces simulated data points;
//! real acquisition is out of scope for the lab.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::constants::{
    self, EVENT_PANEL_REVERT_MS, SOURCE_PHASE_MS, SWEEP_FINALIZE_MS, THRESHOLD_PANEL_REVERT_MS,
};
use super::engine::SimEngine;
use super::opstate::{OpCategory, OpState};
use super::settings::DataSource;
use super::status::Indicator;
use super::store::{DataPoint, PointKind, Quality};
use super::error::EngineError;

// ============================================================================
// EVENT TRIGGERS
// ============================================================================

/// Instant collection triggers, each with its own measurement range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserAction,
    DataChange,
    SystemEvent,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::UserAction => "user action",
            EventKind::DataChange => "data change",
            EventKind::SystemEvent => "system event",
        }
    }

    /// Upper bound of the simulated measurement for this event family.
    fn magnitude(&self) -> u32 {
        match self {
            EventKind::UserAction => 50,
            EventKind::DataChange => 75,
            EventKind::SystemEvent => 200,
        }
    }
}

/// Outcome of a completed collection sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepOutcome {
    pub records: usize,
    pub duration_ms: u64,
}

impl SimEngine {
    /// Append a simulated point under the configured data source.
    pub(crate) fn record_point(&self, kind: PointKind, value: f64, quality: Quality) {
        let point = DataPoint {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
            source: self.settings.data_source(),
            value,
            quality,
        };
        if self.store.push_point(point) {
            self.activity
                .info("[store] data pruned, most recent 500 entries kept");
        }
    }

    // ------------------------------------------------------------------
    // Timed stream
    // ------------------------------------------------------------------

    /// Start or stop the periodic stream. The interval is read once at
    /// start; re-toggling picks up the latest setting.
    pub fn toggle_timed_collection(self: &Arc<Self>) -> bool {
        let mut slot = self.tasks.timed_collection.lock();
        if let Some(handle) = slot.take() {
            handle.abort();
            self.status.set_idle(Indicator::TimedCollection, "stopped");
            self.activity.info(format!(
                "[collection] time-based collection stopped ({} points held)",
                self.store.point_count()
            ));
            false
        } else {
            let secs = self.settings.time_interval_secs();
            let source = self.settings.data_source();
            let engine = Arc::clone(self);
            *slot = Some(tokio::spawn(async move {
                loop {
                    engine.collect_timed_point();
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                }
            }));
            self.status.set_active(
                Indicator::TimedCollection,
                &format!("running ({secs}s interval)"),
            );
            self.activity.info(format!(
                "[collection] time-based collection started: {}, {secs}s interval",
                source.as_str()
            ));
            true
        }
    }

    pub(crate) fn collect_timed_point(self: &Arc<Self>) {
        let (value, quality) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(0.0..100.0), Quality::draw(&mut rng))
        };
        self.record_point(PointKind::TimeBased, value, quality);
        self.activity.info(format!(
            "[collection] data point collected: value {value:.2}, quality {}",
            quality.as_str()
        ));
        self.evaluate_prediction_triggers();
    }

    // ------------------------------------------------------------------
    // Event triggers
    // ------------------------------------------------------------------

    pub fn trigger_user_action(self: &Arc<Self>) {
        self.trigger_event(EventKind::UserAction);
    }

    pub fn trigger_data_change(self: &Arc<Self>) {
        self.trigger_event(EventKind::DataChange);
    }

    pub fn trigger_system_event(self: &Arc<Self>) {
        self.trigger_event(EventKind::SystemEvent);
    }

    pub fn trigger_event(self: &Arc<Self>, kind: EventKind) {
        let (value, quality) = {
            let mut rng = rand::thread_rng();
            (
                f64::from(rng.gen_range(0..kind.magnitude())),
                Quality::draw(&mut rng),
            )
        };
        self.record_point(PointKind::EventBased, value, quality);
        self.activity.info(format!(
            "[event] {} trigger: value {value}",
            kind.as_str()
        ));
        self.status.set_active(
            Indicator::EventCollection,
            &format!("{} data collection", kind.as_str()),
        );

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(EVENT_PANEL_REVERT_MS)).await;
            engine.status.set_idle(Indicator::EventCollection, "waiting");
        });
    }

    // ------------------------------------------------------------------
    // Threshold watch
    // ------------------------------------------------------------------

    /// Evaluate the value watch against the live settings. A hit collects
    /// the current value as a threshold-based point.
    pub fn check_threshold(self: &Arc<Self>) -> bool {
        let value = self.settings.current_value();
        let threshold = self.settings.threshold();
        if value >= threshold {
            let quality = Quality::draw(&mut rand::thread_rng());
            self.record_point(PointKind::ThresholdBased, value, quality);
            self.activity.info(format!(
                "[threshold] threshold {threshold} reached: value {value}, data collected"
            ));
            self.status.set_active(
                Indicator::ThresholdWatch,
                &format!("threshold reached ({value} >= {threshold})"),
            );

            let engine = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(THRESHOLD_PANEL_REVERT_MS)).await;
                engine
                    .status
                    .set_idle(Indicator::ThresholdWatch, "below threshold");
            });
            true
        } else {
            self.status.set_idle(
                Indicator::ThresholdWatch,
                &format!("below threshold ({value} < {threshold})"),
            );
            self.activity.info(format!(
                "[threshold] check: value {value} below threshold {threshold}"
            ));
            false
        }
    }

    /// Push the watched value up by a random step, then re-check.
    pub fn simulate_value_increase(self: &Arc<Self>) -> (f64, f64) {
        let old = self.settings.current_value();
        let step = f64::from(rand::thread_rng().gen_range(5..25));
        let new = old + step;
        self.settings.set_current_value(new);
        self.activity
            .info(format!("[threshold] value increase simulated: {old} -> {new}"));
        self.check_threshold();
        (old, new)
    }

    // ------------------------------------------------------------------
    // Collection sweep
    // ------------------------------------------------------------------

    /// Phased run over all four sources, landing a random batch of sweep
    /// records. Re-entry while running is rejected with a single warning.
    pub async fn run_collection(self: Arc<Self>) -> Result<SweepOutcome, EngineError> {
        let guard = match self.ops.begin(OpCategory::Collection, "collecting") {
            Ok(guard) => guard,
            Err(e) => {
                self.activity
                    .warn("[collection] already running, request ignored");
                return Err(e);
            }
        };

        self.activity.info("[collection] data collection started");
        let started = tokio::time::Instant::now();

        for (i, source) in DataSource::ALL.iter().enumerate() {
            tokio::time::sleep(Duration::from_millis(SOURCE_PHASE_MS)).await;
            self.activity.info(format!(
                "[collection] collecting {} ({}/{})",
                source.as_str(),
                i + 1,
                DataSource::ALL.len()
            ));
        }

        tokio::time::sleep(Duration::from_millis(SWEEP_FINALIZE_MS)).await;

        let records = rand::thread_rng().gen_range(100..1100);
        self.land_sweep_records(records);
        self.store.mark_sweep();

        let duration_ms = started.elapsed().as_millis() as u64;
        self.activity.info(format!(
            "[collection] collection completed: {records} records collected in {duration_ms}ms"
        ));
        guard.complete("completed");
        self.evaluate_prediction_triggers();
        self.schedule_settle();

        Ok(SweepOutcome {
            records,
            duration_ms,
        })
    }

    /// Bulk-append sweep records, cycling the sources. Cap pruning applies
    /// mid-append like any other push.
    fn land_sweep_records(&self, records: usize) {
        let mut rng = rand::thread_rng();
        let mut pruned = false;
        for i in 0..records {
            let source = DataSource::ALL[i % DataSource::ALL.len()];
            let point = DataPoint {
                id: Uuid::new_v4(),
                timestamp: Utc::now(),
                kind: PointKind::Sweep,
                source,
                value: rng.gen_range(0.0..100.0),
                quality: Quality::draw(&mut rng),
            };
            pruned |= self.store.push_point(point);
        }
        if pruned {
            self.activity
                .info("[store] data pruned, most recent 500 entries kept");
        }
    }

    // ------------------------------------------------------------------
    // Scheduled sweeps
    // ------------------------------------------------------------------

    /// Enable or disable the periodic sweep job. Ticks that land while a
    /// collection is already running are skipped silently.
    pub fn toggle_scheduled_sweeps(self: &Arc<Self>) -> bool {
        let mut slot = self.tasks.scheduled_sweeps.lock();
        if let Some(handle) = slot.take() {
            handle.abort();
            self.activity
                .info("[collection] scheduled collection disabled");
            false
        } else {
            let interval = constants::sweep_interval_secs();
            let engine = Arc::clone(self);
            *slot = Some(tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_secs(interval)).await;
                    if engine.ops.state(OpCategory::Collection) != OpState::Running {
                        engine.activity.info("[collection] scheduled sweep due");
                        let _ = Arc::clone(&engine).run_collection().await;
                    }
                }
            }));
            self.activity.info(format!(
                "[collection] scheduled collection enabled ({interval}s interval)"
            ));
            true
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
