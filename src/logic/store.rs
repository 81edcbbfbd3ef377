//! In-Memory Record Store
//!
//! Collected data points and prediction history, both behind the same
//! cap rule: past 1000 entries the list is pruned to the most recent 500.
//! Also owns the model-accuracy scalar every completed prediction updates.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    DEFAULT_MODEL_ACCURACY, MAX_DATA_POINTS, MAX_PREDICTION_HISTORY, PRUNE_KEEP,
};
use super::settings::{DataSource, ModelKind};

// ============================================================================
// RECORD TYPES
// ============================================================================

/// How a data point entered the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    TimeBased,
    EventBased,
    ThresholdBased,
    Sweep,
}

impl PointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointKind::TimeBased => "time-based",
            PointKind::EventBased => "event-based",
            PointKind::ThresholdBased => "threshold-based",
            PointKind::Sweep => "sweep",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Good,
    Poor,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Good => "good",
            Quality::Poor => "poor",
        }
    }

    /// 90% of simulated measurements come back clean.
    pub fn draw<R: Rng>(rng: &mut R) -> Self {
        if rng.gen::<f64>() > 0.1 {
            Quality::Good
        } else {
            Quality::Poor
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPoint {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: PointKind,
    pub source: DataSource,
    pub value: f64,
    pub quality: Quality,
}

/// What fired a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionTrigger {
    Manual,
    DataVolume,
    Schedule,
    AccuracyWatch,
    ValueAlert,
    Workflow,
    Realtime,
    Batch,
}

impl PredictionTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionTrigger::Manual => "manual",
            PredictionTrigger::DataVolume => "data volume",
            PredictionTrigger::Schedule => "schedule",
            PredictionTrigger::AccuracyWatch => "accuracy watch",
            PredictionTrigger::ValueAlert => "value alert",
            PredictionTrigger::Workflow => "workflow",
            PredictionTrigger::Realtime => "realtime",
            PredictionTrigger::Batch => "batch",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub trigger: PredictionTrigger,
    pub model: ModelKind,
    /// Simulated model output, 0..100
    pub predicted_value: f64,
    /// Simulated confidence, 0.7..1.0
    pub confidence: f64,
    /// Result accuracy in percent, clamped to 0..=100
    pub accuracy: f64,
    pub processing_time_ms: u64,
    pub data_points_used: usize,
}

// ============================================================================
// STORE
// ============================================================================

#[derive(Debug)]
pub struct Store {
    points: RwLock<Vec<DataPoint>>,
    predictions: RwLock<Vec<PredictionRecord>>,
    model_accuracy: RwLock<f64>,
    points_collected: AtomicU64,
    sweeps_completed: AtomicU64,
    predictions_completed: AtomicU64,
}

impl Store {
    pub fn new() -> Self {
        Store {
            points: RwLock::new(Vec::new()),
            predictions: RwLock::new(Vec::new()),
            model_accuracy: RwLock::new(DEFAULT_MODEL_ACCURACY),
            points_collected: AtomicU64::new(0),
            sweeps_completed: AtomicU64::new(0),
            predictions_completed: AtomicU64::new(0),
        }
    }

    /// Append a point. Returns true when the cap triggered a prune.
    pub fn push_point(&self, point: DataPoint) -> bool {
        let mut points = self.points.write();
        points.push(point);
        self.points_collected.fetch_add(1, Ordering::Relaxed);
        if points.len() > MAX_DATA_POINTS {
            let excess = points.len() - PRUNE_KEEP;
            points.drain(0..excess);
            true
        } else {
            false
        }
    }

    /// Append a prediction record. Same cap rule as the data list.
    pub fn push_prediction(&self, record: PredictionRecord) -> bool {
        let mut predictions = self.predictions.write();
        predictions.push(record);
        self.predictions_completed.fetch_add(1, Ordering::Relaxed);
        if predictions.len() > MAX_PREDICTION_HISTORY {
            let excess = predictions.len() - PRUNE_KEEP;
            predictions.drain(0..excess);
            true
        } else {
            false
        }
    }

    pub fn point_count(&self) -> usize {
        self.points.read().len()
    }

    pub fn prediction_count(&self) -> usize {
        self.predictions.read().len()
    }

    pub fn latest_value(&self) -> Option<f64> {
        self.points.read().last().map(|p| p.value)
    }

    pub fn recent_points(&self, limit: usize) -> Vec<DataPoint> {
        let points = self.points.read();
        let start = points.len().saturating_sub(limit);
        points[start..].to_vec()
    }

    pub fn recent_predictions(&self, limit: usize) -> Vec<PredictionRecord> {
        let predictions = self.predictions.read();
        let start = predictions.len().saturating_sub(limit);
        predictions[start..].to_vec()
    }

    pub fn model_accuracy(&self) -> f64 {
        *self.model_accuracy.read()
    }

    /// Clamps into 0..=100 and returns the stored value.
    pub fn set_model_accuracy(&self, value: f64) -> f64 {
        let clamped = value.clamp(0.0, 100.0);
        *self.model_accuracy.write() = clamped;
        clamped
    }

    pub fn mark_sweep(&self) {
        self.sweeps_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn points_collected(&self) -> u64 {
        self.points_collected.load(Ordering::Relaxed)
    }

    pub fn sweeps_completed(&self) -> u64 {
        self.sweeps_completed.load(Ordering::Relaxed)
    }

    pub fn predictions_completed(&self) -> u64 {
        self.predictions_completed.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.points.write().clear();
        self.predictions.write().clear();
        *self.model_accuracy.write() = DEFAULT_MODEL_ACCURACY;
        self.points_collected.store(0, Ordering::Relaxed);
        self.sweeps_completed.store(0, Ordering::Relaxed);
        self.predictions_completed.store(0, Ordering::Relaxed);
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn point(value: f64) -> DataPoint {
        DataPoint {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind: PointKind::TimeBased,
            source: DataSource::Sensor,
            value,
            quality: Quality::Good,
        }
    }

    fn prediction(accuracy: f64) -> PredictionRecord {
        PredictionRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            trigger: PredictionTrigger::Manual,
            model: ModelKind::Linear,
            predicted_value: 42.0,
            confidence: 0.9,
            accuracy,
            processing_time_ms: 1200,
            data_points_used: 10,
        }
    }

    #[test]
    fn prune_keeps_the_most_recent_500() {
        let store = Store::new();
        for i in 0..1000 {
            assert!(!store.push_point(point(i as f64)));
        }
        assert_eq!(store.point_count(), 1000);

        // the push that crosses the cap prunes down to 500
        assert!(store.push_point(point(1000.0)));
        assert_eq!(store.point_count(), 500);

        let recent = store.recent_points(500);
        assert_eq!(recent.first().map(|p| p.value), Some(501.0));
        assert_eq!(recent.last().map(|p| p.value), Some(1000.0));

        // lifetime counter is unaffected by pruning
        assert_eq!(store.points_collected(), 1001);
    }

    #[test]
    fn prediction_history_shares_the_cap_rule() {
        let store = Store::new();
        for _ in 0..1001 {
            store.push_prediction(prediction(90.0));
        }
        assert_eq!(store.prediction_count(), 500);
        assert_eq!(store.predictions_completed(), 1001);
    }

    #[test]
    fn model_accuracy_is_clamped() {
        let store = Store::new();
        assert_eq!(store.model_accuracy(), 90.0);
        assert_eq!(store.set_model_accuracy(104.2), 100.0);
        assert_eq!(store.set_model_accuracy(-7.0), 0.0);
        assert_eq!(store.set_model_accuracy(63.4), 63.4);
        assert_eq!(store.model_accuracy(), 63.4);
    }

    #[test]
    fn latest_value_tracks_the_tail() {
        let store = Store::new();
        assert_eq!(store.latest_value(), None);
        store.push_point(point(12.0));
        store.push_point(point(88.5));
        assert_eq!(store.latest_value(), Some(88.5));
    }

    #[test]
    fn recent_points_honors_the_limit() {
        let store = Store::new();
        for i in 0..30 {
            store.push_point(point(i as f64));
        }
        let recent = store.recent_points(10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent.first().map(|p| p.value), Some(20.0));
        assert_eq!(store.recent_points(100).len(), 30);
    }

    #[test]
    fn records_serialize_with_their_ids() {
        let original = point(7.5);
        let json = serde_json::to_value(&original).unwrap();
        assert_eq!(json["id"].as_str(), Some(original.id.to_string().as_str()));
        assert_eq!(json["kind"], "time_based");
        let back: DataPoint = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, original.id);
        assert_eq!(back.value, 7.5);

        let record = prediction(88.0);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"].as_str(), Some(record.id.to_string().as_str()));
        assert_eq!(json["trigger"], "manual");
        let back: PredictionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, record.id);
    }

    #[test]
    fn reset_clears_records_and_restores_accuracy() {
        let store = Store::new();
        store.push_point(point(1.0));
        store.push_prediction(prediction(55.0));
        store.set_model_accuracy(55.0);
        store.mark_sweep();

        store.reset();
        assert_eq!(store.point_count(), 0);
        assert_eq!(store.prediction_count(), 0);
        assert_eq!(store.model_accuracy(), 90.0);
        assert_eq!(store.points_collected(), 0);
        assert_eq!(store.sweeps_completed(), 0);
        assert_eq!(store.predictions_completed(), 0);
    }
}
