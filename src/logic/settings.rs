//! Live Control Panel
//!
//! The knobs a trigger evaluation reads at fire time. Values are sampled
//! when a trigger fires, never cached by the operations.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ACCURACY_THRESHOLD, DEFAULT_BATCH_SIZE, DEFAULT_MODEL_ACCURACY,
    DEFAULT_REQUIRED_DATA_COUNT, DEFAULT_THRESHOLD, DEFAULT_TIME_INTERVAL_SECS,
};
use super::error::EngineError;

// ============================================================================
// SELECTORS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Hourly,
    Daily,
    Weekly,
}

impl ScheduleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleKind::Hourly => "hourly",
            ScheduleKind::Daily => "daily",
            ScheduleKind::Weekly => "weekly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "hourly" => Some(ScheduleKind::Hourly),
            "daily" => Some(ScheduleKind::Daily),
            "weekly" => Some(ScheduleKind::Weekly),
            _ => None,
        }
    }
}

/// Where collected points are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Sensor,
    Database,
    ExternalApi,
    FileUpload,
}

impl DataSource {
    pub const ALL: [DataSource; 4] = [
        DataSource::Sensor,
        DataSource::Database,
        DataSource::ExternalApi,
        DataSource::FileUpload,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Sensor => "sensor data",
            DataSource::Database => "database",
            DataSource::ExternalApi => "external api",
            DataSource::FileUpload => "file upload",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sensor" => Some(DataSource::Sensor),
            "database" | "db" => Some(DataSource::Database),
            "api" | "external-api" => Some(DataSource::ExternalApi),
            "file" | "file-upload" => Some(DataSource::FileUpload),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Linear,
    Neural,
    DecisionTree,
    Ensemble,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Linear => "linear regression",
            ModelKind::Neural => "neural network",
            ModelKind::DecisionTree => "decision tree",
            ModelKind::Ensemble => "ensemble",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "linear" => Some(ModelKind::Linear),
            "neural" => Some(ModelKind::Neural),
            "tree" | "decision-tree" => Some(ModelKind::DecisionTree),
            "ensemble" => Some(ModelKind::Ensemble),
            _ => None,
        }
    }
}

// ============================================================================
// SETTINGS STATE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub time_interval_secs: u64,
    pub threshold: f64,
    pub current_value: f64,
    pub required_data_count: usize,
    pub accuracy_threshold: f64,
    pub current_accuracy: f64,
    pub schedule: ScheduleKind,
    pub data_source: DataSource,
    pub model: ModelKind,
    pub batch_size: usize,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        SettingsSnapshot {
            time_interval_secs: DEFAULT_TIME_INTERVAL_SECS,
            threshold: DEFAULT_THRESHOLD,
            current_value: 0.0,
            required_data_count: DEFAULT_REQUIRED_DATA_COUNT,
            accuracy_threshold: DEFAULT_ACCURACY_THRESHOLD,
            current_accuracy: DEFAULT_MODEL_ACCURACY,
            schedule: ScheduleKind::Hourly,
            data_source: DataSource::Sensor,
            model: ModelKind::Linear,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// A parsed settings change, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingChange {
    TimeInterval(u64),
    Threshold(f64),
    CurrentValue(f64),
    RequiredDataCount(usize),
    AccuracyThreshold(f64),
    CurrentAccuracy(f64),
    Schedule(ScheduleKind),
    DataSource(DataSource),
    Model(ModelKind),
    BatchSize(usize),
}

/// Parse a key/value pair from the console into a change.
pub fn parse_change(key: &str, value: &str) -> Result<SettingChange, EngineError> {
    let invalid = || EngineError::InvalidSetting(format!("{key} = {value}"));
    match key {
        "interval" => value
            .parse()
            .map(SettingChange::TimeInterval)
            .map_err(|_| invalid()),
        "threshold" => value
            .parse()
            .map(SettingChange::Threshold)
            .map_err(|_| invalid()),
        "value" => value
            .parse()
            .map(SettingChange::CurrentValue)
            .map_err(|_| invalid()),
        "required" => value
            .parse()
            .map(SettingChange::RequiredDataCount)
            .map_err(|_| invalid()),
        "accuracy-threshold" => value
            .parse()
            .map(SettingChange::AccuracyThreshold)
            .map_err(|_| invalid()),
        "accuracy" => value
            .parse()
            .map(SettingChange::CurrentAccuracy)
            .map_err(|_| invalid()),
        "schedule" => ScheduleKind::parse(value)
            .map(SettingChange::Schedule)
            .ok_or_else(invalid),
        "source" => DataSource::parse(value)
            .map(SettingChange::DataSource)
            .ok_or_else(invalid),
        "model" => ModelKind::parse(value)
            .map(SettingChange::Model)
            .ok_or_else(invalid),
        "batch" => value
            .parse()
            .map(SettingChange::BatchSize)
            .map_err(|_| invalid()),
        _ => Err(EngineError::InvalidSetting(format!("unknown key: {key}"))),
    }
}

/// Shared mutable settings, read live by every trigger check.
#[derive(Debug)]
pub struct Settings {
    inner: RwLock<SettingsSnapshot>,
}

impl Settings {
    pub fn new() -> Self {
        Settings {
            inner: RwLock::new(SettingsSnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        self.inner.read().clone()
    }

    pub fn time_interval_secs(&self) -> u64 {
        self.inner.read().time_interval_secs
    }

    pub fn threshold(&self) -> f64 {
        self.inner.read().threshold
    }

    pub fn current_value(&self) -> f64 {
        self.inner.read().current_value
    }

    pub fn required_data_count(&self) -> usize {
        self.inner.read().required_data_count
    }

    pub fn accuracy_threshold(&self) -> f64 {
        self.inner.read().accuracy_threshold
    }

    pub fn current_accuracy(&self) -> f64 {
        self.inner.read().current_accuracy
    }

    pub fn schedule(&self) -> ScheduleKind {
        self.inner.read().schedule
    }

    pub fn data_source(&self) -> DataSource {
        self.inner.read().data_source
    }

    pub fn model(&self) -> ModelKind {
        self.inner.read().model
    }

    pub fn batch_size(&self) -> usize {
        self.inner.read().batch_size
    }

    /// Simulated value feeding the threshold watch. Not range-limited, the
    /// increase simulation pushes it wherever it lands.
    pub fn set_current_value(&self, value: f64) {
        self.inner.write().current_value = value;
    }

    /// Floored display accuracy, kept in step with the model scalar.
    pub fn set_current_accuracy(&self, value: f64) {
        self.inner.write().current_accuracy = value.clamp(0.0, 100.0);
    }

    /// Apply a change; returns the line logged to the activity feed.
    pub fn apply(&self, change: &SettingChange) -> String {
        let mut inner = self.inner.write();
        match change {
            SettingChange::TimeInterval(v) => {
                inner.time_interval_secs = (*v).clamp(1, 60);
                format!("time interval: {}s", inner.time_interval_secs)
            }
            SettingChange::Threshold(v) => {
                inner.threshold = v.clamp(0.0, 100.0);
                format!("threshold: {}", inner.threshold)
            }
            SettingChange::CurrentValue(v) => {
                inner.current_value = *v;
                format!("current value: {}", inner.current_value)
            }
            SettingChange::RequiredDataCount(v) => {
                inner.required_data_count = (*v).max(1);
                format!("required data count: {}", inner.required_data_count)
            }
            SettingChange::AccuracyThreshold(v) => {
                inner.accuracy_threshold = v.clamp(0.0, 100.0);
                format!("accuracy threshold: {}%", inner.accuracy_threshold)
            }
            SettingChange::CurrentAccuracy(v) => {
                inner.current_accuracy = v.clamp(0.0, 100.0);
                format!("current accuracy: {}%", inner.current_accuracy)
            }
            SettingChange::Schedule(v) => {
                inner.schedule = *v;
                format!("schedule: {}", v.as_str())
            }
            SettingChange::DataSource(v) => {
                inner.data_source = *v;
                format!("data source: {}", v.as_str())
            }
            SettingChange::Model(v) => {
                inner.model = *v;
                format!("prediction model: {}", v.as_str())
            }
            SettingChange::BatchSize(v) => {
                inner.batch_size = (*v).max(1);
                format!("batch size: {}", inner.batch_size)
            }
        }
    }

    /// System reset: runtime values return to their boot state, the
    /// configured selectors stay as the operator left them.
    pub fn reset_live_values(&self) {
        let mut inner = self.inner.write();
        inner.current_value = 0.0;
        inner.current_accuracy = DEFAULT_MODEL_ACCURACY;
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
