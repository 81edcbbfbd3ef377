//! Prediction Operations
//!
//! Quick single-shot predictions fired by the various triggers, the phased
//! realtime and batch runs, and the checks that decide when a prediction
//! should fire at all. Every completed prediction feeds one shared model
//! accuracy scalar and goes through the same post-processing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::constants::{
    ACCURACY_RECHECK_MS, BATCH_FINALIZE_MS, BATCH_STEP_MS, HIGH_RISK_THRESHOLD,
    LOW_CONFIDENCE_THRESHOLD, PREDICTION_FINALIZE_MS, PREDICTION_STEP_MS, QUICK_PASS_MS,
    VALUE_ALERT_THRESHOLD,
};
use super::engine::SimEngine;
use super::error::EngineError;
use super::opstate::OpCategory;
use super::status::Indicator;
use super::store::{PredictionRecord, PredictionTrigger};

/// Pipeline stages reported by the phased run.
const REALTIME_STEPS: [&str; 5] = [
    "preprocessing",
    "feature extraction",
    "model load",
    "inference",
    "validation",
];

/// Records per batch in the batch run.
const BATCH_CHUNK: usize = 50;

impl SimEngine {
    // ------------------------------------------------------------------
    // Quick prediction
    // ------------------------------------------------------------------

    /// Single prediction pass. Needs at least one stored data point and an
    /// idle Prediction slot; the drawn processing time is simulated payload,
    /// actual pacing is one fixed completion step.
    pub async fn execute_prediction(
        self: Arc<Self>,
        trigger: PredictionTrigger,
    ) -> Result<PredictionRecord, EngineError> {
        let points = self.store.point_count();
        if points == 0 {
            self.activity.error(format!(
                "[prediction] no data available, {} prediction cancelled",
                trigger.as_str()
            ));
            return Err(EngineError::NoData);
        }

        let guard = match self.ops.begin(OpCategory::Prediction, "processing") {
            Ok(guard) => guard,
            Err(e) => {
                self.activity.warn(format!(
                    "[prediction] already running, {} trigger ignored",
                    trigger.as_str()
                ));
                return Err(e);
            }
        };

        let model = self.settings.model();
        let (predicted_value, confidence, accuracy, processing_time_ms) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(0.0..100.0),
                rng.gen_range(0.7..1.0),
                (self.store.model_accuracy() + rng.gen_range(-5.0..5.0)).clamp(0.0, 100.0),
                rng.gen_range(1000..6000),
            )
        };
        let data_points_used = points.min(self.settings.batch_size());

        self.activity.info(format!(
            "[prediction] {} prediction started: {}, {data_points_used} data points",
            trigger.as_str(),
            model.as_str()
        ));

        tokio::time::sleep(Duration::from_millis(QUICK_PASS_MS)).await;

        let record = PredictionRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            trigger,
            model,
            predicted_value,
            confidence,
            accuracy,
            processing_time_ms,
            data_points_used,
        };
        self.finish_prediction(&record);
        self.activity.info(format!(
            "[prediction] prediction completed: accuracy {accuracy:.1}%, {processing_time_ms}ms"
        ));
        guard.complete("completed");
        self.schedule_settle();

        Ok(record)
    }

    /// Fire-and-forget variant for trigger paths. Busy and no-data outcomes
    /// are already logged by the pass itself.
    pub(crate) fn spawn_prediction(self: &Arc<Self>, trigger: PredictionTrigger) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let _ = engine.execute_prediction(trigger).await;
        });
    }

    /// Record a completed prediction and fold its accuracy into the model.
    pub(crate) fn finish_prediction(&self, record: &PredictionRecord) {
        if self.store.push_prediction(record.clone()) {
            self.activity
                .info("[store] prediction history pruned, most recent 500 entries kept");
        }
        let stored = self.store.set_model_accuracy(record.accuracy);
        self.settings.set_current_accuracy(stored.floor());
        self.post_process(record);
    }

    fn post_process(&self, record: &PredictionRecord) {
        if record.predicted_value > HIGH_RISK_THRESHOLD {
            self.activity.warn(format!(
                "[prediction] high risk result: value {:.1} above {HIGH_RISK_THRESHOLD}",
                record.predicted_value
            ));
        }
        if record.confidence < LOW_CONFIDENCE_THRESHOLD {
            self.activity.warn(format!(
                "[prediction] low confidence ({:.2}), more data needed",
                record.confidence
            ));
        }
        self.activity.info("[prediction] post-processing complete");
    }

    // ------------------------------------------------------------------
    // Trigger checks
    // ------------------------------------------------------------------

    /// Run after every collected point and after each sweep.
    pub(crate) fn evaluate_prediction_triggers(self: &Arc<Self>) {
        self.check_data_count();
        if let Some(value) = self.store.latest_value() {
            if value > VALUE_ALERT_THRESHOLD {
                self.activity.info(format!(
                    "[prediction] value alert: {value:.2} above {VALUE_ALERT_THRESHOLD}, prediction triggered"
                ));
                self.spawn_prediction(PredictionTrigger::ValueAlert);
            }
        }
    }

    /// Data-volume trigger. Returns true when a prediction was fired.
    pub fn check_data_count(self: &Arc<Self>) -> bool {
        let count = self.store.point_count();
        let required = self.settings.required_data_count();
        if count >= required {
            self.status.set_active(
                Indicator::DataVolume,
                &format!("threshold reached ({count}/{required})"),
            );
            self.activity.info(format!(
                "[prediction] data threshold reached: {count}/{required} points, prediction triggered"
            ));
            self.spawn_prediction(PredictionTrigger::DataVolume);
            true
        } else {
            self.status.set_idle(
                Indicator::DataVolume,
                &format!("insufficient data ({count}/{required})"),
            );
            self.activity.info(format!(
                "[prediction] data count check: {count}/{required} points"
            ));
            false
        }
    }

    /// Accuracy watch. A degraded model fires a retraining prediction and
    /// re-reads the panel after the recheck delay.
    pub fn check_accuracy(self: &Arc<Self>) -> bool {
        let accuracy = self.settings.current_accuracy();
        let threshold = self.settings.accuracy_threshold();
        if accuracy < threshold {
            self.status.set_active(
                Indicator::AccuracyWatch,
                &format!("accuracy degraded ({accuracy}% < {threshold}%)"),
            );
            self.activity.warn(format!(
                "[accuracy] accuracy {accuracy}% below threshold {threshold}%, retraining prediction triggered"
            ));
            self.spawn_prediction(PredictionTrigger::AccuracyWatch);

            let engine = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(ACCURACY_RECHECK_MS)).await;
                engine.refresh_accuracy_panel();
            });
            true
        } else {
            self.status.set_active(
                Indicator::AccuracyWatch,
                &format!("criteria met ({accuracy}% >= {threshold}%)"),
            );
            self.activity.info(format!(
                "[accuracy] accuracy {accuracy}% meets threshold {threshold}%"
            ));
            false
        }
    }

    /// Display-only re-read, no second trigger.
    fn refresh_accuracy_panel(&self) {
        let accuracy = self.settings.current_accuracy();
        let threshold = self.settings.accuracy_threshold();
        let message = if accuracy < threshold {
            format!("accuracy degraded ({accuracy}% < {threshold}%)")
        } else {
            format!("criteria met ({accuracy}% >= {threshold}%)")
        };
        self.status.set_active(Indicator::AccuracyWatch, &message);
    }

    /// Knock the model accuracy down by a random amount, then re-check.
    pub fn simulate_accuracy_drop(self: &Arc<Self>) -> (f64, f64) {
        let drop = rand::thread_rng().gen_range(5.0..25.0);
        let old = self.store.model_accuracy();
        let new = self.store.set_model_accuracy(old - drop);
        self.settings.set_current_accuracy(new.floor());
        self.activity.warn(format!(
            "[accuracy] accuracy drop simulated: {old:.1}% -> {new:.1}%"
        ));
        self.check_accuracy();
        (old, new)
    }

    // ------------------------------------------------------------------
    // Phased runs
    // ------------------------------------------------------------------

    /// Realtime prediction run over the whole store.
    pub async fn run_prediction(self: Arc<Self>) -> Result<PredictionRecord, EngineError> {
        self.run_phased_prediction(PredictionTrigger::Realtime).await
    }

    pub(crate) async fn run_phased_prediction(
        self: Arc<Self>,
        trigger: PredictionTrigger,
    ) -> Result<PredictionRecord, EngineError> {
        let guard = match self.ops.begin(OpCategory::Prediction, "processing") {
            Ok(guard) => guard,
            Err(e) => {
                self.activity
                    .warn("[prediction] already running, request ignored");
                return Err(e);
            }
        };

        let model = self.settings.model();
        self.activity.info(format!(
            "[prediction] {} prediction started: {}",
            trigger.as_str(),
            model.as_str()
        ));
        let started = tokio::time::Instant::now();

        for (i, step) in REALTIME_STEPS.iter().enumerate() {
            tokio::time::sleep(Duration::from_millis(PREDICTION_STEP_MS)).await;
            self.activity.info(format!(
                "[prediction] {step} ({}/{})",
                i + 1,
                REALTIME_STEPS.len()
            ));
        }

        tokio::time::sleep(Duration::from_millis(PREDICTION_FINALIZE_MS)).await;

        let (accuracy, generated, predicted_value, confidence) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(70.0..100.0),
                rng.gen_range(10..60),
                rng.gen_range(0.0..100.0),
                rng.gen_range(0.7..1.0),
            )
        };
        let record = PredictionRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            trigger,
            model,
            predicted_value,
            confidence,
            accuracy,
            processing_time_ms: started.elapsed().as_millis() as u64,
            data_points_used: self.store.point_count(),
        };
        self.finish_prediction(&record);
        self.activity.info(format!(
            "[prediction] prediction completed: accuracy {accuracy:.1}%, {generated} predictions generated"
        ));
        guard.complete("completed");
        self.schedule_settle();

        Ok(record)
    }

    /// Batch run over a randomly sized record set, chunked for progress.
    pub async fn run_batch_prediction(self: Arc<Self>) -> Result<PredictionRecord, EngineError> {
        let guard = match self.ops.begin(OpCategory::Prediction, "batch processing") {
            Ok(guard) => guard,
            Err(e) => {
                self.activity
                    .warn("[prediction] already running, batch request ignored");
                return Err(e);
            }
        };

        let size: usize = rand::thread_rng().gen_range(100..600);
        let batches = (size + BATCH_CHUNK - 1) / BATCH_CHUNK;
        self.activity.info(format!(
            "[prediction] batch prediction started: {size} records, {batches} batches"
        ));
        let started = tokio::time::Instant::now();

        for i in 1..=batches {
            tokio::time::sleep(Duration::from_millis(BATCH_STEP_MS)).await;
            let pct = i * 100 / batches;
            self.activity
                .info(format!("[prediction] batch {i}/{batches} ({pct}% complete)"));
        }

        tokio::time::sleep(Duration::from_millis(BATCH_FINALIZE_MS)).await;

        let (accuracy, predicted_value, confidence) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(80.0..100.0),
                rng.gen_range(0.0..100.0),
                rng.gen_range(0.7..1.0),
            )
        };
        let record = PredictionRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            trigger: PredictionTrigger::Batch,
            model: self.settings.model(),
            predicted_value,
            confidence,
            accuracy,
            processing_time_ms: started.elapsed().as_millis() as u64,
            data_points_used: size,
        };
        self.finish_prediction(&record);
        self.activity.info(format!(
            "[prediction] batch prediction completed: {size} records, accuracy {accuracy:.1}%"
        ));
        guard.complete("completed");
        self.schedule_settle();

        Ok(record)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::activity::LogLevel;
    use crate::logic::opstate::OpState;
    use crate::logic::settings::SettingChange;
    use crate::logic::status::IndicatorLevel;
    use crate::logic::store::{PointKind, Quality};

    fn seed_points(engine: &Arc<SimEngine>, n: usize) {
        for i in 0..n {
            engine.record_point(PointKind::TimeBased, i as f64, Quality::Good);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn quick_prediction_needs_data() {
        let engine = SimEngine::new();
        let result = Arc::clone(&engine)
            .execute_prediction(PredictionTrigger::Manual)
            .await;
        assert!(matches!(result, Err(EngineError::NoData)));
        assert_eq!(engine.store.prediction_count(), 0);
        assert_eq!(engine.ops.state(OpCategory::Prediction), OpState::Idle);

        let errors = engine
            .activity
            .snapshot(10)
            .iter()
            .filter(|l| l.level == LogLevel::Error)
            .count();
        assert_eq!(errors, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn quick_prediction_rejects_reentry() {
        let engine = SimEngine::new();
        seed_points(&engine, 1);

        let first = tokio::spawn(
            Arc::clone(&engine).execute_prediction(PredictionTrigger::Manual),
        );
        tokio::task::yield_now().await;
        assert_eq!(engine.ops.state(OpCategory::Prediction), OpState::Running);

        let second = Arc::clone(&engine)
            .execute_prediction(PredictionTrigger::DataVolume)
            .await;
        assert!(matches!(second, Err(EngineError::Busy(_))));
        assert_eq!(engine.activity.warn_count(), 1);

        first.await.unwrap().unwrap();
        assert_eq!(engine.store.prediction_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn accuracy_tracks_the_completed_prediction() {
        let engine = SimEngine::new();
        seed_points(&engine, 5);
        engine.store.set_model_accuracy(50.0);

        let record = Arc::clone(&engine)
            .execute_prediction(PredictionTrigger::Manual)
            .await
            .unwrap();
        assert!((45.0..55.0).contains(&record.accuracy));
        assert_eq!(engine.store.model_accuracy(), record.accuracy);
        assert_eq!(engine.settings.current_accuracy(), record.accuracy.floor());
        assert_eq!(record.data_points_used, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn accuracy_drop_floors_at_zero() {
        let engine = SimEngine::new();
        engine.store.set_model_accuracy(3.0);
        let (old, new) = engine.simulate_accuracy_drop();
        assert_eq!(old, 3.0);
        assert_eq!(new, 0.0);
        assert_eq!(engine.settings.current_accuracy(), 0.0);

        let watch = engine.status.get(Indicator::AccuracyWatch);
        assert_eq!(watch.level, IndicatorLevel::Active);
        assert!(watch.message.contains("degraded"));
    }

    #[tokio::test(start_paused = true)]
    async fn volume_check_fires_once_threshold_is_met() {
        let engine = SimEngine::new();
        engine.apply_setting(SettingChange::RequiredDataCount(3));

        seed_points(&engine, 2);
        assert!(!engine.check_data_count());
        let panel = engine.status.get(Indicator::DataVolume);
        assert_eq!(panel.message, "insufficient data (2/3)");

        seed_points(&engine, 1);
        assert!(engine.check_data_count());
        assert_eq!(
            engine.status.get(Indicator::DataVolume).message,
            "threshold reached (3/3)"
        );

        // the fired prediction completes after the fixed pacing step
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(engine.store.prediction_count(), 1);
        let record = &engine.store.recent_predictions(1)[0];
        assert!(matches!(record.trigger, PredictionTrigger::DataVolume));
    }

    #[tokio::test(start_paused = true)]
    async fn recovered_accuracy_reports_criteria_met() {
        let engine = SimEngine::new();
        engine.store.set_model_accuracy(40.0);
        engine.settings.set_current_accuracy(40.0);

        // empty store, so the fired retraining pass cannot move the scalar
        assert!(engine.check_accuracy());
        engine.store.set_model_accuracy(95.0);
        engine.settings.set_current_accuracy(95.0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        let watch = engine.status.get(Indicator::AccuracyWatch);
        assert!(watch.message.contains("criteria met"));
    }

    #[tokio::test(start_paused = true)]
    async fn accuracy_equal_to_threshold_meets_criteria() {
        let engine = SimEngine::new();
        engine.apply_setting(SettingChange::AccuracyThreshold(85.0));
        engine.settings.set_current_accuracy(85.0);

        // degradation fires strictly below the threshold
        assert!(!engine.check_accuracy());
        let watch = engine.status.get(Indicator::AccuracyWatch);
        assert_eq!(watch.level, IndicatorLevel::Active);
        assert_eq!(watch.message, "criteria met (85% >= 85%)");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(engine.store.prediction_count(), 0);
        assert_eq!(engine.activity.warn_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn realtime_run_walks_all_stages() {
        let engine = SimEngine::new();
        seed_points(&engine, 4);

        let record = Arc::clone(&engine).run_prediction().await.unwrap();
        assert!(matches!(record.trigger, PredictionTrigger::Realtime));
        assert!((70.0..100.0).contains(&record.accuracy));
        assert_eq!(record.processing_time_ms, 5 * 800 + 1000);
        assert_eq!(record.data_points_used, 4);

        for step in REALTIME_STEPS {
            let found = engine
                .activity
                .snapshot(100)
                .iter()
                .any(|l| l.message.contains(step));
            assert!(found, "missing stage log: {step}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn batch_run_paces_by_chunk_count() {
        let engine = SimEngine::new();
        let record = Arc::clone(&engine).run_batch_prediction().await.unwrap();

        let size = record.data_points_used;
        assert!((100..600).contains(&size));
        let batches = (size + BATCH_CHUNK - 1) / BATCH_CHUNK;
        assert_eq!(
            record.processing_time_ms,
            batches as u64 * BATCH_STEP_MS + BATCH_FINALIZE_MS
        );
        assert!((80.0..100.0).contains(&record.accuracy));
        assert!(matches!(record.trigger, PredictionTrigger::Batch));
    }
}
