//! Central Configuration Constants
//!
//! Single source of truth for every tunable in the simulator.
//! Durations are milliseconds unless the name says otherwise.

/// App name
pub const APP_NAME: &str = "Trigger Lab";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Setting defaults
// ============================================

/// Default time-based collection interval (seconds)
pub const DEFAULT_TIME_INTERVAL_SECS: u64 = 5;

/// Default threshold for the value watch
pub const DEFAULT_THRESHOLD: f64 = 50.0;

/// Default data-volume trigger requirement
pub const DEFAULT_REQUIRED_DATA_COUNT: usize = 10;

/// Default accuracy-watch threshold (%)
pub const DEFAULT_ACCURACY_THRESHOLD: f64 = 85.0;

/// Initial model accuracy (%)
pub const DEFAULT_MODEL_ACCURACY: f64 = 90.0;

/// Default prediction input slice size
pub const DEFAULT_BATCH_SIZE: usize = 20;

// ============================================
// Buffer caps
// ============================================

/// A list longer than this gets pruned
pub const MAX_DATA_POINTS: usize = 1000;

/// Entries kept after a prune (most recent)
pub const PRUNE_KEEP: usize = 500;

/// Prediction history cap
pub const MAX_PREDICTION_HISTORY: usize = 1000;

/// Activity log cap
pub const MAX_ACTIVITY_LINES: usize = 1000;

// ============================================
// Operation pacing
// ============================================

/// Per-source phase of a collection sweep
pub const SOURCE_PHASE_MS: u64 = 1_000;

/// Sweep finalize pause before records land
pub const SWEEP_FINALIZE_MS: u64 = 1_500;

/// Per-step phase of a realtime prediction run
pub const PREDICTION_STEP_MS: u64 = 800;

/// Realtime run finalize pause
pub const PREDICTION_FINALIZE_MS: u64 = 1_000;

/// Per-batch phase of a batch prediction run
pub const BATCH_STEP_MS: u64 = 1_200;

/// Batch run finalize pause
pub const BATCH_FINALIZE_MS: u64 = 1_000;

/// Completion pacing of a quick trigger-driven prediction
pub const QUICK_PASS_MS: u64 = 1_000;

/// Workflow pause between collection and prediction
pub const WORKFLOW_GAP_AFTER_COLLECTION_MS: u64 = 2_000;

/// Workflow pause before completion
pub const WORKFLOW_GAP_AFTER_PREDICTION_MS: u64 = 1_000;

// ============================================
// Status board timing
// ============================================

/// Finished operations settle back to idle after this long
pub const STATUS_RESET_DELAY_MS: u64 = 3_000;

/// Event indicator reverts to waiting after this long
pub const EVENT_PANEL_REVERT_MS: u64 = 2_000;

/// Threshold indicator reverts after this long
pub const THRESHOLD_PANEL_REVERT_MS: u64 = 3_000;

/// Accuracy watch re-checks this long after a retrain fires
pub const ACCURACY_RECHECK_MS: u64 = 2_000;

// ============================================
// Trigger thresholds (hardwired in the pipeline)
// ============================================

/// A collected value above this fires an immediate prediction
pub const VALUE_ALERT_THRESHOLD: f64 = 80.0;

/// Predicted values above this raise a high-risk warning
pub const HIGH_RISK_THRESHOLD: f64 = 75.0;

/// Confidence below this recommends collecting more data
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.8;

// ============================================
// Health monitor
// ============================================

/// Default health check interval (seconds)
pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 30;

/// Data count above this draws a pruning warning
pub const HEALTH_DATA_WARN_COUNT: usize = 100;

/// Model accuracy below this draws a retraining warning (%)
pub const HEALTH_ACCURACY_WARN: f64 = 70.0;

// ============================================
// Scheduled sweeps & demo script
// ============================================

/// Default scheduled sweep interval (seconds)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 120;

/// Default gap between demo script steps (seconds)
pub const DEFAULT_DEMO_STEP_SECS: u64 = 5;

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get health check interval from environment or use default
pub fn health_interval_secs() -> u64 {
    std::env::var("TRIGGER_LAB_HEALTH_INTERVAL")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_HEALTH_INTERVAL_SECS)
}

/// Get scheduled sweep interval from environment or use default
pub fn sweep_interval_secs() -> u64 {
    std::env::var("TRIGGER_LAB_SWEEP_INTERVAL")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS)
}

/// Get demo step gap from environment or use default
pub fn demo_step_secs() -> u64 {
    std::env::var("TRIGGER_LAB_DEMO_STEP")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_DEMO_STEP_SECS)
}
