//! Trigger Indicator Board
//!
//! One lamp per trigger family: level plus a short message, with timed
//! reverts handled by the operations that light them.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    TimedCollection,
    EventCollection,
    ThresholdWatch,
    DataVolume,
    Schedule,
    AccuracyWatch,
}

impl Indicator {
    pub const ALL: [Indicator; 6] = [
        Indicator::TimedCollection,
        Indicator::EventCollection,
        Indicator::ThresholdWatch,
        Indicator::DataVolume,
        Indicator::Schedule,
        Indicator::AccuracyWatch,
    ];

    fn initial_message(&self) -> &'static str {
        match self {
            Indicator::TimedCollection => "stopped",
            Indicator::Schedule => "no schedule armed",
            _ => "waiting",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorLevel {
    Idle,
    Active,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorState {
    pub level: IndicatorLevel,
    pub message: String,
}

/// Per-indicator snapshot, shaped for the status DTO.
#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    pub timed_collection: IndicatorState,
    pub event_collection: IndicatorState,
    pub threshold_watch: IndicatorState,
    pub data_volume: IndicatorState,
    pub schedule: IndicatorState,
    pub accuracy_watch: IndicatorState,
}

#[derive(Debug)]
pub struct StatusBoard {
    slots: RwLock<HashMap<Indicator, IndicatorState>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let board = StatusBoard {
            slots: RwLock::new(HashMap::new()),
        };
        board.reset();
        board
    }

    pub fn set_active(&self, indicator: Indicator, message: &str) {
        self.set(indicator, IndicatorLevel::Active, message);
    }

    pub fn set_idle(&self, indicator: Indicator, message: &str) {
        self.set(indicator, IndicatorLevel::Idle, message);
    }

    pub fn set(&self, indicator: Indicator, level: IndicatorLevel, message: &str) {
        self.slots.write().insert(
            indicator,
            IndicatorState {
                level,
                message: message.to_string(),
            },
        );
    }

    pub fn get(&self, indicator: Indicator) -> IndicatorState {
        self.slots
            .read()
            .get(&indicator)
            .cloned()
            .unwrap_or(IndicatorState {
                level: IndicatorLevel::Idle,
                message: indicator.initial_message().to_string(),
            })
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            timed_collection: self.get(Indicator::TimedCollection),
            event_collection: self.get(Indicator::EventCollection),
            threshold_watch: self.get(Indicator::ThresholdWatch),
            data_volume: self.get(Indicator::DataVolume),
            schedule: self.get(Indicator::Schedule),
            accuracy_watch: self.get(Indicator::AccuracyWatch),
        }
    }

    pub fn reset(&self) {
        let mut slots = self.slots.write();
        for indicator in Indicator::ALL {
            slots.insert(
                indicator,
                IndicatorState {
                    level: IndicatorLevel::Idle,
                    message: indicator.initial_message().to_string(),
                },
            );
        }
    }
}

impl Default for StatusBoard {
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

    #[test]
    fn board_starts_idle() {
        let board = StatusBoard::new();
        for indicator in Indicator::ALL {
            assert_eq!(board.get(indicator).level, IndicatorLevel::Idle);
        }
        assert_eq!(board.get(Indicator::Schedule).message, "no schedule armed");
        assert_eq!(board.get(Indicator::TimedCollection).message, "stopped");
    }

    #[test]
    fn set_and_reset_round_trip() {
        let board = StatusBoard::new();
        board.set_active(Indicator::EventCollection, "user action received");
        let state = board.get(Indicator::EventCollection);
        assert_eq!(state.level, IndicatorLevel::Active);
        assert_eq!(state.message, "user action received");

        board.reset();
        assert_eq!(
            board.get(Indicator::EventCollection).level,
            IndicatorLevel::Idle
        );
        assert_eq!(board.get(Indicator::EventCollection).message, "waiting");
    }

    #[test]
    fn snapshot_mirrors_the_slots() {
        let board = StatusBoard::new();
        board.set_active(Indicator::DataVolume, "data volume reached (12/10)");
        let snap = board.snapshot();
        assert_eq!(snap.data_volume.level, IndicatorLevel::Active);
        assert_eq!(snap.timed_collection.level, IndicatorLevel::Idle);
    }
}
