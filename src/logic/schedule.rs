//! Schedule Trigger
//!
//! Next-run arithmetic for the schedule selector, plus the armed one-shot
//! timer that fires the scheduled prediction when the moment arrives.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Timelike, Utc};

use crate::constants::STATUS_RESET_DELAY_MS;
use super::engine::SimEngine;
use super::settings::ScheduleKind;
use super::status::Indicator;
use super::store::PredictionTrigger;

/// Next run strictly after `now`: hourly lands on the next top-of-hour,
/// daily on the coming midnight, weekly on the next Sunday midnight
/// (a Sunday schedules the Sunday after).
pub fn next_run_after(now: DateTime<Utc>, kind: ScheduleKind) -> DateTime<Utc> {
    let day_start = now.date_naive().and_time(NaiveTime::MIN);
    let next = match kind {
        ScheduleKind::Hourly => day_start + chrono::Duration::hours(i64::from(now.hour()) + 1),
        ScheduleKind::Daily => day_start + chrono::Duration::days(1),
        ScheduleKind::Weekly => {
            let ahead = 7 - i64::from(now.weekday().num_days_from_sunday());
            day_start + chrono::Duration::days(ahead)
        }
    };
    Utc.from_utc_datetime(&next)
}

impl SimEngine {
    /// Arm the schedule trigger for the configured cadence. Re-arming
    /// replaces any previously armed timer.
    pub fn schedule_next_prediction(self: &Arc<Self>) -> DateTime<Utc> {
        let kind = self.settings.schedule();
        let now = Utc::now();
        let next = next_run_after(now, kind);
        let stamp = next.format("%Y-%m-%d %H:%M:%S UTC").to_string();

        self.status
            .set_active(Indicator::Schedule, &format!("next run: {stamp}"));
        self.activity.info(format!(
            "[schedule] {} prediction scheduled, next run {stamp}",
            kind.as_str()
        ));

        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        let engine = Arc::clone(self);
        let mut slot = self.tasks.armed_schedule.lock();
        if let Some(old) = slot.take() {
            old.abort();
        }
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            engine.activity.info("[schedule] scheduled run due");
            let _ = Arc::clone(&engine)
                .execute_prediction(PredictionTrigger::Schedule)
                .await;
            engine
                .status
                .set_active(Indicator::Schedule, "scheduled run fired");
            tokio::time::sleep(Duration::from_millis(STATUS_RESET_DELAY_MS)).await;
            engine
                .status
                .set_idle(Indicator::Schedule, "no schedule armed");
        }));

        next
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::status::IndicatorLevel;
    use crate::logic::store::{PointKind, Quality};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn hourly_lands_on_the_next_hour_boundary() {
        let next = next_run_after(at(2024, 6, 12, 14, 23, 45), ScheduleKind::Hourly);
        assert_eq!(next, at(2024, 6, 12, 15, 0, 0));
    }

    #[test]
    fn hourly_rolls_past_midnight() {
        let next = next_run_after(at(2024, 6, 12, 23, 59, 1), ScheduleKind::Hourly);
        assert_eq!(next, at(2024, 6, 13, 0, 0, 0));
    }

    #[test]
    fn daily_is_the_coming_midnight() {
        let next = next_run_after(at(2024, 6, 12, 0, 0, 1), ScheduleKind::Daily);
        assert_eq!(next, at(2024, 6, 13, 0, 0, 0));

        let next = next_run_after(at(2024, 6, 30, 23, 59, 59), ScheduleKind::Daily);
        assert_eq!(next, at(2024, 7, 1, 0, 0, 0));
    }

    #[test]
    fn weekly_lands_on_sunday_midnight() {
        // 2024-06-12 is a Wednesday
        let next = next_run_after(at(2024, 6, 12, 9, 30, 0), ScheduleKind::Weekly);
        assert_eq!(next, at(2024, 6, 16, 0, 0, 0));
        assert_eq!(next.weekday(), chrono::Weekday::Sun);
    }

    #[test]
    fn weekly_on_a_sunday_jumps_a_full_week() {
        // 2024-06-16 is a Sunday
        let next = next_run_after(at(2024, 6, 16, 8, 0, 0), ScheduleKind::Weekly);
        assert_eq!(next, at(2024, 6, 23, 0, 0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn armed_schedule_fires_and_disarms() {
        let engine = SimEngine::new();
        engine.record_point(PointKind::TimeBased, 10.0, Quality::Good);

        let next = engine.schedule_next_prediction();
        assert!(engine.is_schedule_armed());
        let panel = engine.status.get(Indicator::Schedule);
        assert_eq!(panel.level, IndicatorLevel::Active);
        assert_eq!(
            panel.message,
            format!("next run: {}", next.format("%Y-%m-%d %H:%M:%S UTC"))
        );

        // hourly waits at most one hour, then the pass runs and the panel
        // reverts after the board delay
        tokio::time::sleep(Duration::from_secs(3610)).await;
        assert_eq!(engine.store.prediction_count(), 1);
        let record = &engine.store.recent_predictions(1)[0];
        assert!(matches!(record.trigger, PredictionTrigger::Schedule));

        assert!(!engine.is_schedule_armed());
        let panel = engine.status.get(Indicator::Schedule);
        assert_eq!(panel.level, IndicatorLevel::Idle);
        assert_eq!(panel.message, "no schedule armed");
    }
}
