//! Overtime Engine (C15).
//!
//! Computes overtime windows and spawns overtime-task variants when a
//! task's deadline slips past regular hours.

use chrono::{NaiveDateTime, NaiveTime};

use crate::config::EngineConfig;
use crate::task::{PriorityClass, Task, TaskType};

#[derive(Debug, Clone)]
pub struct OvertimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub required_hours: f64,
}

/// Computes the overtime window for a task needing overtime, clamping the
/// end time to `overtime_end_time` on the same day.
pub fn compute_window(config: &EngineConfig, remaining_duration_minutes: f64, start: NaiveDateTime) -> OvertimeWindow {
    let required_hours = (remaining_duration_minutes / 60.0).max(1.0).min(config.max_overtime_hours);
    let naive_end = start + chrono::Duration::minutes((required_hours * 60.0) as i64);

    let overtime_end_time: NaiveTime = crate::time_util::parse_hms(&config.overtime_end_time)
        .unwrap_or_else(|_| NaiveTime::from_hms_opt(20, 30, 0).expect("valid fallback overtime end"));
    let day_cap = chrono::NaiveDateTime::new(start.date(), overtime_end_time);

    let end = naive_end.min(day_cap);
    OvertimeWindow { start, end, required_hours }
}

/// Spawns the overtime variant of `original`: a clone re-priced to P1 in
/// an overtime window, with the original task marked CANCELLED by the
/// caller. The variant inherits the original task's fields (item, floor,
/// quantity, station assignment) and carries the remaining work forward.
pub fn spawn_overtime_variant(original: &Task, overtime_task_id: impl Into<String>, window: &OvertimeWindow) -> Task {
    let mut variant = original.clone();
    variant.task_id = overtime_task_id.into();
    variant.task_type = TaskType::Overtime;
    variant.priority_class = PriorityClass::P1;
    variant.status = crate::task::TaskStatus::Pending;
    variant.planned_start = Some(window.start);
    variant.planned_completion = Some(window.end);
    variant.superseded_by = None;
    variant.remaining_duration_override = None;
    variant
}

/// Whether a staff member's projected regular+overtime total for the day
/// stays within `max_hours_per_day`.
pub fn fits_within_daily_cap(
    minutes_already_worked: f64,
    additional_overtime_minutes: f64,
    max_hours_per_day: f64,
) -> bool {
    minutes_already_worked + additional_overtime_minutes <= max_hours_per_day * 60.0
}
