//! Workflow Operation
//!
//! The chained collection-then-prediction run. Admission requires every
//! category idle, so the chain never interleaves with a standalone run.

use std::sync::Arc;
use std::time::Duration;

use crate::constants::{WORKFLOW_GAP_AFTER_COLLECTION_MS, WORKFLOW_GAP_AFTER_PREDICTION_MS};
use super::engine::SimEngine;
use super::error::EngineError;
use super::store::PredictionTrigger;

impl SimEngine {
    /// Collection sweep, pause, prediction run, pause. A failed phase fails
    /// the whole workflow.
    pub async fn run_workflow(self: Arc<Self>) -> Result<(), EngineError> {
        let guard = match self.ops.begin_workflow("running") {
            Ok(guard) => guard,
            Err(e) => {
                self.activity
                    .warn("[workflow] another operation is running, workflow rejected");
                return Err(e);
            }
        };

        self.activity.info("[workflow] workflow started");

        self.activity.info("[workflow] phase 1: data collection");
        if let Err(e) = Arc::clone(&self).run_collection().await {
            self.activity
                .error(format!("[workflow] collection phase failed: {e}"));
            guard.fail("collection phase failed");
            self.schedule_workflow_settle();
            return Err(e);
        }

        tokio::time::sleep(Duration::from_millis(WORKFLOW_GAP_AFTER_COLLECTION_MS)).await;

        self.activity.info("[workflow] phase 2: prediction");
        if let Err(e) = Arc::clone(&self)
            .run_phased_prediction(PredictionTrigger::Workflow)
            .await
        {
            self.activity
                .error(format!("[workflow] prediction phase failed: {e}"));
            guard.fail("prediction phase failed");
            self.schedule_workflow_settle();
            return Err(e);
        }

        tokio::time::sleep(Duration::from_millis(WORKFLOW_GAP_AFTER_PREDICTION_MS)).await;

        self.activity.info("[workflow] workflow completed");
        guard.complete("completed");
        self.schedule_workflow_settle();
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::opstate::{OpCategory, OpState};
    use crate::logic::store::PointKind;
    use tokio_test::assert_ok;

    #[tokio::test(start_paused = true)]
    async fn workflow_rejected_while_prediction_runs() {
        let engine = SimEngine::new();
        let running = tokio::spawn(Arc::clone(&engine).run_prediction());
        tokio::task::yield_now().await;
        assert_eq!(engine.ops.state(OpCategory::Prediction), OpState::Running);

        let result = Arc::clone(&engine).run_workflow().await;
        assert!(matches!(result, Err(EngineError::NotIdle)));
        assert_eq!(engine.ops.state(OpCategory::Workflow), OpState::Idle);

        let phases = engine
            .activity
            .snapshot(100)
            .iter()
            .filter(|l| l.message.contains("[workflow] phase"))
            .count();
        assert_eq!(phases, 0);

        running.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn workflow_chains_both_phases_and_settles() {
        let engine = SimEngine::new();
        assert_ok!(Arc::clone(&engine).run_workflow().await);

        assert_eq!(engine.store.sweeps_completed(), 1);
        assert!(engine.store.point_count() >= 100);
        let chained = engine
            .store
            .recent_predictions(10)
            .iter()
            .any(|r| matches!(r.trigger, PredictionTrigger::Workflow));
        assert!(chained);
        assert!(engine
            .store
            .recent_points(1)
            .iter()
            .all(|p| p.kind == PointKind::Sweep));

        // deferred resets bring every category back to idle
        tokio::time::sleep(Duration::from_secs(5)).await;
        for category in OpCategory::ALL {
            assert_eq!(engine.ops.state(category), OpState::Idle);
        }
    }
}
