//! Demo Script
//!
//! Scripted walk through the trigger families, one step per interval.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::constants;
use super::engine::SimEngine;
use super::error::EngineError;
use super::settings::SettingChange;
use super::store::PredictionTrigger;

impl SimEngine {
    /// Kick off the demo sequence. One script at a time; the guard clears
    /// when the script finishes or the engine is reset.
    pub fn start_demo(self: &Arc<Self>) -> Result<(), EngineError> {
        if self.demo_active.swap(true, Ordering::SeqCst) {
            self.activity.warn("[demo] demo script is already running");
            return Err(EngineError::DemoRunning);
        }

        let step = constants::demo_step_secs();
        self.activity
            .info(format!("[demo] demo mode started ({step}s per step)"));

        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(step)).await;
            engine.apply_setting(SettingChange::TimeInterval(3));
            if !engine.is_timed_collection_active() {
                engine.toggle_timed_collection();
            }

            tokio::time::sleep(Duration::from_secs(step)).await;
            engine.trigger_user_action();

            tokio::time::sleep(Duration::from_secs(step)).await;
            engine.simulate_value_increase();

            tokio::time::sleep(Duration::from_secs(step)).await;
            engine.spawn_prediction(PredictionTrigger::Manual);

            tokio::time::sleep(Duration::from_secs(step)).await;
            engine.simulate_accuracy_drop();

            engine.activity.info("[demo] demo sequence completed");
            engine.demo_active.store(false, Ordering::SeqCst);
        });
        *self.tasks.demo.lock() = Some(handle);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn demo_rejects_a_second_start() {
        let engine = SimEngine::new();
        engine.start_demo().unwrap();
        assert!(engine.is_demo_active());

        let second = engine.start_demo();
        assert!(matches!(second, Err(EngineError::DemoRunning)));
        assert_eq!(engine.activity.warn_count(), 1);

        tokio::time::sleep(Duration::from_secs(26)).await;
        assert!(!engine.is_demo_active());
    }

    #[tokio::test(start_paused = true)]
    async fn demo_script_drives_every_trigger_family() {
        let engine = SimEngine::new();
        engine.start_demo().unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(engine.is_timed_collection_active());
        assert_eq!(engine.settings.time_interval_secs(), 3);
        assert!(engine.store.point_count() >= 10);
        assert!(engine.store.prediction_count() >= 1);
        assert!(!engine.is_demo_active());

        let lines = engine.activity.snapshot(1000);
        let has = |needle: &str| lines.iter().any(|l| l.message.contains(needle));
        assert!(has("[demo] demo sequence completed"));
        assert!(has("[accuracy] accuracy drop simulated"));
        assert!(has("[event] user action trigger"));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_aborts_a_running_demo() {
        let engine = SimEngine::new();
        engine.start_demo().unwrap();
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(engine.is_timed_collection_active());

        engine.reset();
        assert!(!engine.is_demo_active());
        assert!(!engine.is_timed_collection_active());
        assert_eq!(engine.store.point_count(), 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(engine.store.point_count(), 0);
        let finished = engine
            .activity
            .snapshot(1000)
            .iter()
            .any(|l| l.message.contains("demo sequence completed"));
        assert!(!finished);
    }
}
