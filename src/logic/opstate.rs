//! Operation State Machine
//!
//! One slot per operation family, one transition table for all of them.
//! Replaces the scattered busy flags the pipeline grew up with: a category
//! is either idle, running, or settling out of a finished run.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::EngineError;

// ============================================================================
// CATEGORIES & STATES
// ============================================================================

/// Operation family. Each owns a single slot in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpCategory {
    Collection,
    Prediction,
    Workflow,
}

impl OpCategory {
    pub const ALL: [OpCategory; 3] = [
        OpCategory::Collection,
        OpCategory::Prediction,
        OpCategory::Workflow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OpCategory::Collection => "data collection",
            OpCategory::Prediction => "prediction",
            OpCategory::Workflow => "workflow",
        }
    }
}

impl fmt::Display for OpCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpState {
    Idle,
    Running,
    Completed,
    Error,
}

/// The transition table. Everything not listed is rejected.
pub fn can_transition(from: OpState, to: OpState) -> bool {
    matches!(
        (from, to),
        (OpState::Idle, OpState::Running)
            | (OpState::Completed, OpState::Running)
            | (OpState::Error, OpState::Running)
            | (OpState::Running, OpState::Completed)
            | (OpState::Running, OpState::Error)
            | (OpState::Completed, OpState::Idle)
            | (OpState::Error, OpState::Idle)
    )
}

// ============================================================================
// REGISTRY
// ============================================================================

/// State and message of one category slot.
#[derive(Debug, Clone, Serialize)]
pub struct OpSnapshot {
    pub state: OpState,
    pub message: String,
}

impl OpSnapshot {
    fn idle() -> Self {
        OpSnapshot {
            state: OpState::Idle,
            message: "waiting".to_string(),
        }
    }
}

#[derive(Debug)]
struct Slots {
    collection: OpSnapshot,
    prediction: OpSnapshot,
    workflow: OpSnapshot,
}

impl Slots {
    fn get(&self, category: OpCategory) -> &OpSnapshot {
        match category {
            OpCategory::Collection => &self.collection,
            OpCategory::Prediction => &self.prediction,
            OpCategory::Workflow => &self.workflow,
        }
    }

    fn get_mut(&mut self, category: OpCategory) -> &mut OpSnapshot {
        match category {
            OpCategory::Collection => &mut self.collection,
            OpCategory::Prediction => &mut self.prediction,
            OpCategory::Workflow => &mut self.workflow,
        }
    }

    fn any_running(&self) -> bool {
        OpCategory::ALL
            .iter()
            .any(|c| self.get(*c).state == OpState::Running)
    }
}

/// All three category slots behind one lock, so admission checks see a
/// consistent view.
#[derive(Debug)]
pub struct OpRegistry {
    slots: RwLock<Slots>,
}

impl OpRegistry {
    pub fn new() -> Self {
        OpRegistry {
            slots: RwLock::new(Slots {
                collection: OpSnapshot::idle(),
                prediction: OpSnapshot::idle(),
                workflow: OpSnapshot::idle(),
            }),
        }
    }

    pub fn state(&self, category: OpCategory) -> OpState {
        self.slots.read().get(category).state
    }

    pub fn snapshot(&self, category: OpCategory) -> OpSnapshot {
        self.slots.read().get(category).clone()
    }

    /// Admit an operation. A category already running rejects the start.
    pub fn begin(
        self: &Arc<Self>,
        category: OpCategory,
        message: &str,
    ) -> Result<RunGuard, EngineError> {
        let mut slots = self.slots.write();
        let slot = slots.get_mut(category);
        if slot.state == OpState::Running {
            return Err(EngineError::Busy(category));
        }
        slot.state = OpState::Running;
        slot.message = message.to_string();
        Ok(RunGuard {
            registry: Arc::clone(self),
            category,
            finished: false,
        })
    }

    /// Workflow admission: rejected while any category is running.
    pub fn begin_workflow(self: &Arc<Self>, message: &str) -> Result<RunGuard, EngineError> {
        let mut slots = self.slots.write();
        if slots.any_running() {
            return Err(EngineError::NotIdle);
        }
        let slot = slots.get_mut(OpCategory::Workflow);
        slot.state = OpState::Running;
        slot.message = message.to_string();
        Ok(RunGuard {
            registry: Arc::clone(self),
            category: OpCategory::Workflow,
            finished: false,
        })
    }

    fn finish(&self, category: OpCategory, to: OpState, message: &str) -> bool {
        let mut slots = self.slots.write();
        let slot = slots.get_mut(category);
        if !can_transition(slot.state, to) {
            return false;
        }
        slot.state = to;
        slot.message = message.to_string();
        true
    }

    /// Deferred board settling: once nothing is running, finished collection
    /// and prediction slots return to idle together.
    pub fn settle_finished(&self) -> bool {
        let mut slots = self.slots.write();
        if slots.any_running() {
            return false;
        }
        let mut changed = false;
        for category in [OpCategory::Collection, OpCategory::Prediction] {
            let slot = slots.get_mut(category);
            if matches!(slot.state, OpState::Completed | OpState::Error) {
                *slot = OpSnapshot::idle();
                changed = true;
            }
        }
        changed
    }

    /// Workflow settles unconditionally.
    pub fn settle_workflow(&self) -> bool {
        let mut slots = self.slots.write();
        let slot = slots.get_mut(OpCategory::Workflow);
        if matches!(slot.state, OpState::Completed | OpState::Error) {
            *slot = OpSnapshot::idle();
            true
        } else {
            false
        }
    }

    /// System reset: everything not running snaps back to idle.
    pub fn clear_finished(&self) {
        let mut slots = self.slots.write();
        for category in OpCategory::ALL {
            let slot = slots.get_mut(category);
            if slot.state != OpState::Running {
                *slot = OpSnapshot::idle();
            }
        }
    }
}

impl Default for OpRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// RUN GUARD
// ============================================================================

/// Handle of an admitted operation. Dropping it without finishing marks the
/// category as failed, so a panicked task cannot wedge the machine.
#[derive(Debug)]
pub struct RunGuard {
    registry: Arc<OpRegistry>,
    category: OpCategory,
    finished: bool,
}

impl RunGuard {
    pub fn complete(mut self, message: &str) {
        self.finish(OpState::Completed, message);
    }

    pub fn fail(mut self, message: &str) {
        self.finish(OpState::Error, message);
    }

    fn finish(&mut self, to: OpState, message: &str) {
        if !self.finished {
            self.registry.finish(self.category, to, message);
            self.finished = true;
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.registry
                .finish(self.category, OpState::Error, "aborted");
            self.finished = true;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
