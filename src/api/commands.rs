//! Console Commands - the stable surface over the simulation engine
//!
//! Every console keyword maps to one async function here. Errors are
//! stringified so the surface stays serialization-friendly.

use std::sync::Arc;

use serde::Serialize;

use crate::constants::{APP_NAME, APP_VERSION};
use crate::logic::engine::SimEngine;
use crate::logic::opstate::{OpCategory, OpSnapshot};
use crate::logic::settings::{self, SettingsSnapshot};
use crate::logic::status::BoardSnapshot;
use crate::logic::store::PredictionTrigger;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Full snapshot for the `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub app: String,
    pub version: String,
    pub operations: OperationsStatus,
    pub indicators: BoardSnapshot,
    pub data_points: usize,
    pub predictions_run: usize,
    pub model_accuracy: f64,
    pub current_value: f64,
    pub current_accuracy: f64,
    pub points_collected_total: u64,
    pub sweeps_completed_total: u64,
    pub predictions_completed_total: u64,
    pub timed_collection_active: bool,
    pub scheduled_sweeps_active: bool,
    pub schedule_armed: bool,
    pub demo_active: bool,
    pub activity_lines: usize,
    pub timestamp: String,
}

/// One slot per operation family.
#[derive(Debug, Clone, Serialize)]
pub struct OperationsStatus {
    pub collection: OpSnapshot,
    pub prediction: OpSnapshot,
    pub workflow: OpSnapshot,
}

/// Data point shaped for display.
#[derive(Debug, Clone, Serialize)]
pub struct DataPointDto {
    pub id: String,
    pub timestamp: String,
    pub kind: String,
    pub source: String,
    pub value: f64,
    pub quality: String,
}

/// Prediction record shaped for display.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionDto {
    pub id: String,
    pub timestamp: String,
    pub trigger: String,
    pub model: String,
    pub predicted_value: f64,
    pub confidence: f64,
    pub accuracy: f64,
    pub processing_time_ms: u64,
    pub data_points_used: usize,
}

/// Activity feed line.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityLineDto {
    pub timestamp: String,
    pub level: String,
    pub message: String,
}

/// Counter snapshot for the `stats` command.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsDto {
    pub data_points: usize,
    pub predictions_run: usize,
    pub model_accuracy: f64,
    pub timestamp: String,
}

/// Before/after pair from the simulation commands.
#[derive(Debug, Clone, Serialize)]
pub struct ValueChange {
    pub old: f64,
    pub new: f64,
}

// ============================================================================
// SYSTEM COMMANDS
// ============================================================================

/// Everything the status board shows, in one snapshot.
pub async fn get_system_status(engine: &Arc<SimEngine>) -> Result<SystemStatus, String> {
    Ok(SystemStatus {
        app: APP_NAME.to_string(),
        version: APP_VERSION.to_string(),
        operations: OperationsStatus {
            collection: engine.ops.snapshot(OpCategory::Collection),
            prediction: engine.ops.snapshot(OpCategory::Prediction),
            workflow: engine.ops.snapshot(OpCategory::Workflow),
        },
        indicators: engine.status.snapshot(),
        data_points: engine.store.point_count(),
        predictions_run: engine.store.prediction_count(),
        model_accuracy: engine.store.model_accuracy(),
        current_value: engine.settings.current_value(),
        current_accuracy: engine.settings.current_accuracy(),
        points_collected_total: engine.store.points_collected(),
        sweeps_completed_total: engine.store.sweeps_completed(),
        predictions_completed_total: engine.store.predictions_completed(),
        timed_collection_active: engine.is_timed_collection_active(),
        scheduled_sweeps_active: engine.is_scheduled_sweeps_active(),
        schedule_armed: engine.is_schedule_armed(),
        demo_active: engine.is_demo_active(),
        activity_lines: engine.activity.line_count(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn get_statistics(engine: &Arc<SimEngine>) -> Result<StatisticsDto, String> {
    let stats = engine.statistics();
    Ok(StatisticsDto {
        data_points: stats.data_points,
        predictions_run: stats.predictions_run,
        model_accuracy: stats.model_accuracy,
        timestamp: stats.timestamp.to_rfc3339(),
    })
}

pub async fn get_settings(engine: &Arc<SimEngine>) -> Result<SettingsSnapshot, String> {
    Ok(engine.settings.snapshot())
}

/// Parse and apply one `key value` pair, returning the applied description.
pub async fn set_setting(
    engine: &Arc<SimEngine>,
    key: &str,
    value: &str,
) -> Result<String, String> {
    let change = settings::parse_change(key, value).map_err(|e| e.to_string())?;
    Ok(engine.apply_setting(change))
}

pub async fn reset_system(engine: &Arc<SimEngine>) -> Result<(), String> {
    engine.reset();
    Ok(())
}

pub async fn clear_log(engine: &Arc<SimEngine>) -> Result<(), String> {
    engine.activity.clear();
    Ok(())
}

// ============================================================================
// COLLECTION COMMANDS
// ============================================================================

/// Flip the timed stream; returns the new state.
pub async fn toggle_timed_collection(engine: &Arc<SimEngine>) -> Result<bool, String> {
    Ok(engine.toggle_timed_collection())
}

pub async fn trigger_user_action(engine: &Arc<SimEngine>) -> Result<(), String> {
    engine.trigger_user_action();
    Ok(())
}

pub async fn trigger_data_change(engine: &Arc<SimEngine>) -> Result<(), String> {
    engine.trigger_data_change();
    Ok(())
}

pub async fn trigger_system_event(engine: &Arc<SimEngine>) -> Result<(), String> {
    engine.trigger_system_event();
    Ok(())
}

/// Threshold watch; true when the check collected a point.
pub async fn check_threshold(engine: &Arc<SimEngine>) -> Result<bool, String> {
    Ok(engine.check_threshold())
}

pub async fn simulate_value_increase(engine: &Arc<SimEngine>) -> Result<ValueChange, String> {
    let (old, new) = engine.simulate_value_increase();
    Ok(ValueChange { old, new })
}

/// Full phased sweep to completion.
pub async fn trigger_collection_sweep(engine: &Arc<SimEngine>) -> Result<usize, String> {
    let outcome = Arc::clone(engine)
        .run_collection()
        .await
        .map_err(|e| e.to_string())?;
    Ok(outcome.records)
}

pub async fn toggle_scheduled_sweeps(engine: &Arc<SimEngine>) -> Result<bool, String> {
    Ok(engine.toggle_scheduled_sweeps())
}

pub async fn get_data_points(
    engine: &Arc<SimEngine>,
    limit: Option<usize>,
) -> Result<Vec<DataPointDto>, String> {
    let limit = limit.unwrap_or(20);
    Ok(engine
        .store
        .recent_points(limit)
        .into_iter()
        .map(|p| DataPointDto {
            id: p.id.to_string(),
            timestamp: p.timestamp.to_rfc3339(),
            kind: p.kind.as_str().to_string(),
            source: p.source.as_str().to_string(),
            value: p.value,
            quality: p.quality.as_str().to_string(),
        })
        .collect())
}

// ============================================================================
// PREDICTION COMMANDS
// ============================================================================

/// Quick manual prediction pass.
pub async fn execute_prediction(engine: &Arc<SimEngine>) -> Result<PredictionDto, String> {
    let record = Arc::clone(engine)
        .execute_prediction(PredictionTrigger::Manual)
        .await
        .map_err(|e| e.to_string())?;
    Ok(prediction_dto(&record))
}

/// Phased realtime run to completion.
pub async fn trigger_prediction(engine: &Arc<SimEngine>) -> Result<PredictionDto, String> {
    let record = Arc::clone(engine)
        .run_prediction()
        .await
        .map_err(|e| e.to_string())?;
    Ok(prediction_dto(&record))
}

/// Batch run to completion.
pub async fn trigger_batch_prediction(engine: &Arc<SimEngine>) -> Result<PredictionDto, String> {
    let record = Arc::clone(engine)
        .run_batch_prediction()
        .await
        .map_err(|e| e.to_string())?;
    Ok(prediction_dto(&record))
}

/// Data-volume check; true when a prediction was fired.
pub async fn check_data_count(engine: &Arc<SimEngine>) -> Result<bool, String> {
    Ok(engine.check_data_count())
}

/// Accuracy watch; true when a retraining prediction was fired.
pub async fn check_accuracy(engine: &Arc<SimEngine>) -> Result<bool, String> {
    Ok(engine.check_accuracy())
}

pub async fn simulate_accuracy_drop(engine: &Arc<SimEngine>) -> Result<ValueChange, String> {
    let (old, new) = engine.simulate_accuracy_drop();
    Ok(ValueChange { old, new })
}

/// Arm the configured schedule; returns the next run timestamp.
pub async fn schedule_next_prediction(engine: &Arc<SimEngine>) -> Result<String, String> {
    Ok(engine.schedule_next_prediction().to_rfc3339())
}

pub async fn get_predictions(
    engine: &Arc<SimEngine>,
    limit: Option<usize>,
) -> Result<Vec<PredictionDto>, String> {
    let limit = limit.unwrap_or(20);
    Ok(engine
        .store
        .recent_predictions(limit)
        .iter()
        .map(prediction_dto)
        .collect())
}

// ============================================================================
// WORKFLOW & DEMO COMMANDS
// ============================================================================

/// Full chained workflow to completion.
pub async fn trigger_workflow(engine: &Arc<SimEngine>) -> Result<(), String> {
    Arc::clone(engine)
        .run_workflow()
        .await
        .map_err(|e| e.to_string())
}

pub async fn start_demo(engine: &Arc<SimEngine>) -> Result<(), String> {
    engine.start_demo().map_err(|e| e.to_string())
}

pub async fn get_recent_activity(
    engine: &Arc<SimEngine>,
    limit: Option<usize>,
) -> Result<Vec<ActivityLineDto>, String> {
    let limit = limit.unwrap_or(50);
    Ok(engine
        .activity
        .snapshot(limit)
        .into_iter()
        .map(|l| ActivityLineDto {
            timestamp: l.timestamp.to_rfc3339(),
            level: l.level.as_str().to_string(),
            message: l.message,
        })
        .collect())
}

fn prediction_dto(record: &crate::logic::store::PredictionRecord) -> PredictionDto {
    PredictionDto {
        id: record.id.to_string(),
        timestamp: record.timestamp.to_rfc3339(),
        trigger: record.trigger.as_str().to_string(),
        model: record.model.as_str().to_string(),
        predicted_value: record.predicted_value,
        confidence: record.confidence,
        accuracy: record.accuracy,
        processing_time_ms: record.processing_time_ms,
        data_points_used: record.data_points_used,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::opstate::OpState;
    use tokio_test::assert_ok;

    #[tokio::test(start_paused = true)]
    async fn status_snapshot_reflects_engine_state() {
        let engine = SimEngine::new();
        engine.init();

        let status = get_system_status(&engine).await.unwrap();
        assert_eq!(status.version, APP_VERSION);
        assert_eq!(status.data_points, 0);
        assert_eq!(status.model_accuracy, 90.0);
        assert_eq!(status.operations.collection.state, OpState::Idle);
        assert!(!status.timed_collection_active);
        assert_eq!(status.activity_lines, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn set_setting_round_trips_through_parse() {
        let engine = SimEngine::new();
        let applied = set_setting(&engine, "model", "ensemble").await.unwrap();
        assert!(applied.contains("ensemble"));

        let snapshot = get_settings(&engine).await.unwrap();
        assert_eq!(snapshot.model.as_str(), "ensemble");

        let bad = set_setting(&engine, "interval", "fast").await;
        assert!(bad.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_command_reports_record_count() {
        let engine = SimEngine::new();
        let records = assert_ok!(trigger_collection_sweep(&engine).await);
        assert!((100..1100).contains(&records));

        let points = get_data_points(&engine, Some(5)).await.unwrap();
        assert_eq!(points.len(), 5);
        assert!(points.iter().all(|p| p.kind == "sweep"));
    }

    #[tokio::test(start_paused = true)]
    async fn prediction_errors_come_back_as_strings() {
        let engine = SimEngine::new();
        let err = execute_prediction(&engine).await.unwrap_err();
        assert_eq!(err, "no data available for prediction");
    }
}
