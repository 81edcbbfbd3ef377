//! Health Monitor
//!
//! Periodic self-check over the store and the model accuracy scalar.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::{self, HEALTH_ACCURACY_WARN, HEALTH_DATA_WARN_COUNT};
use super::engine::SimEngine;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub data_points: usize,
    pub predictions: usize,
    pub model_accuracy: f64,
    pub warnings: Vec<String>,
}

/// Counter snapshot for the console `stats` command.
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub data_points: usize,
    pub predictions_run: usize,
    pub model_accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

impl SimEngine {
    pub fn health_report(&self) -> HealthReport {
        let data_points = self.store.point_count();
        let predictions = self.store.prediction_count();
        let model_accuracy = self.store.model_accuracy();

        let mut warnings = Vec::new();
        if data_points > HEALTH_DATA_WARN_COUNT {
            warnings.push(format!(
                "large data store ({data_points} points), consider pruning"
            ));
        }
        if model_accuracy < HEALTH_ACCURACY_WARN {
            warnings.push(format!(
                "model accuracy low ({model_accuracy:.1}%), retraining required"
            ));
        }

        HealthReport {
            data_points,
            predictions,
            model_accuracy,
            warnings,
        }
    }

    pub(crate) fn run_health_check(&self) {
        let report = self.health_report();
        for warning in &report.warnings {
            self.activity.warn(format!("[health] {warning}"));
        }
        self.activity.info(format!(
            "[health] status: data={}, predictions={}, accuracy={:.1}%",
            report.data_points, report.predictions, report.model_accuracy
        ));
    }

    /// Start the periodic health loop. Runs until shutdown.
    pub fn start_monitor(self: &Arc<Self>) -> bool {
        let mut slot = self.tasks.monitor.lock();
        if slot.is_some() {
            self.activity.info("[health] monitor already running");
            return false;
        }

        let interval = constants::health_interval_secs();
        let engine = Arc::clone(self);
        *slot = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(interval)).await;
                engine.run_health_check();
            }
        }));
        self.activity
            .info(format!("[health] monitor started ({interval}s interval)"));
        true
    }

    pub fn statistics(&self) -> Statistics {
        Statistics {
            data_points: self.store.point_count(),
            predictions_run: self.store.prediction_count(),
            model_accuracy: self.store.model_accuracy(),
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::store::{PointKind, Quality};

    #[tokio::test(start_paused = true)]
    async fn health_report_flags_store_size_and_accuracy() {
        let engine = SimEngine::new();
        for i in 0..150 {
            engine.record_point(PointKind::TimeBased, f64::from(i), Quality::Good);
        }
        engine.store.set_model_accuracy(50.0);

        let report = engine.health_report();
        assert_eq!(report.data_points, 150);
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].contains("consider pruning"));
        assert!(report.warnings[1].contains("retraining required"));
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_system_reports_clean() {
        let engine = SimEngine::new();
        let report = engine.health_report();
        assert!(report.warnings.is_empty());
        assert_eq!(report.model_accuracy, 90.0);
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_loop_emits_status_lines() {
        let engine = SimEngine::new();
        assert!(engine.start_monitor());
        assert!(!engine.start_monitor());

        tokio::time::sleep(Duration::from_secs(95)).await;
        let status_lines = |e: &Arc<SimEngine>| {
            e.activity
                .snapshot(1000)
                .iter()
                .filter(|l| l.message.contains("[health] status:"))
                .count()
        };
        assert_eq!(status_lines(&engine), 3);

        engine.shutdown();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(status_lines(&engine), 3);
    }
}
