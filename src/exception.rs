//! Exception Handler (C14).
//!
//! Detects, prioritizes, assigns leaders/stations to, and resolves task
//! exceptions, possibly preempting a BUSY task.

use crate::rng::EngineRng;
use crate::task::PriorityClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionType {
    PickingError,
    BarcodeUnreadable,
    InventoryShortage,
    PackagingError,
    ItemDamage,
    LocationError,
    QualityIssue,
    SystemError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExceptionPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl ExceptionPriority {
    pub fn raised_one_level(self) -> Self {
        match self {
            ExceptionPriority::Low => ExceptionPriority::Medium,
            ExceptionPriority::Medium => ExceptionPriority::High,
            ExceptionPriority::High => ExceptionPriority::Critical,
            ExceptionPriority::Critical => ExceptionPriority::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionStatus {
    Detected,
    Assigned,
    InProgress,
    Resolved,
    Escalated,
}

#[derive(Debug, Clone)]
pub struct Exception {
    pub exception_id: String,
    pub task_id: String,
    pub exception_type: ExceptionType,
    pub priority: ExceptionPriority,
    pub status: ExceptionStatus,
    pub handling_minutes: f64,
    pub assigned_leader: Option<String>,
    pub reserved_station: Option<String>,
    pub detected_at: chrono::NaiveDateTime,
    pub assigned_at: Option<chrono::NaiveDateTime>,
}

/// (weight, exception_type, base_priority, min, avg, max) sampling table,
/// with per-type handling-time bounds.
const SAMPLING_TABLE: [(f64, ExceptionType, ExceptionPriority, f64, f64, f64); 8] = [
    (0.30, ExceptionType::PickingError, ExceptionPriority::Medium, 8.0, 15.0, 25.0),
    (0.20, ExceptionType::BarcodeUnreadable, ExceptionPriority::Low, 3.0, 8.0, 15.0),
    (0.15, ExceptionType::InventoryShortage, ExceptionPriority::High, 10.0, 20.0, 45.0),
    (0.15, ExceptionType::PackagingError, ExceptionPriority::Medium, 5.0, 10.0, 20.0),
    (0.10, ExceptionType::ItemDamage, ExceptionPriority::Medium, 5.0, 12.0, 30.0),
    (0.05, ExceptionType::LocationError, ExceptionPriority::Medium, 8.0, 18.0, 35.0),
    (0.03, ExceptionType::QualityIssue, ExceptionPriority::High, 20.0, 35.0, 90.0),
    (0.02, ExceptionType::SystemError, ExceptionPriority::Critical, 15.0, 30.0, 60.0),
];

/// Samples an exception type/priority/handling-time for a task that just
/// failed its per-task exception check. `task_priority` is the owning
/// task's priority class: a P1 task raises the exception's base priority
/// one level.
pub fn sample_exception(
    exception_id: impl Into<String>,
    task_id: impl Into<String>,
    detected_at: chrono::NaiveDateTime,
    task_priority: PriorityClass,
    rng: &mut EngineRng,
) -> Exception {
    let weighted: Vec<(f64, usize)> = SAMPLING_TABLE.iter().enumerate().map(|(i, row)| (row.0, i)).collect();
    let idx = *rng.weighted_choice(&weighted);
    let (_, exception_type, base_priority, min, avg, max) = SAMPLING_TABLE[idx];

    let priority = if task_priority == PriorityClass::P1 { base_priority.raised_one_level() } else { base_priority };

    let scale = match priority {
        ExceptionPriority::Critical => 0.8,
        ExceptionPriority::Low => 1.2,
        _ => 1.0,
    };
    let handling_minutes = rng.triangular(min, avg, max) * scale;

    Exception {
        exception_id: exception_id.into(),
        task_id: task_id.into(),
        exception_type,
        priority,
        status: ExceptionStatus::Detected,
        handling_minutes,
        assigned_leader: None,
        reserved_station: None,
        detected_at,
        assigned_at: None,
    }
}

/// Whether preemption of a BUSY task is allowed for this exception
/// (`allow_task_interruption` and priority ∈ {CRITICAL, HIGH}).
pub fn may_preempt(exception: &Exception, task_interruption_allowed: bool) -> bool {
    task_interruption_allowed
        && matches!(exception.priority, ExceptionPriority::Critical | ExceptionPriority::High)
}

/// Escalation predicate: elapsed since detection exceeds
/// threshold, or the exception is CRITICAL and still ASSIGNED, or it has
/// waited more than 10 minutes in DETECTED.
pub fn should_escalate(
    exception: &Exception,
    now: chrono::NaiveDateTime,
    escalation_time_threshold_minutes: f64,
) -> bool {
    let elapsed_minutes = (now - exception.detected_at).num_seconds() as f64 / 60.0;
    if elapsed_minutes > escalation_time_threshold_minutes {
        return true;
    }
    if exception.priority == ExceptionPriority::Critical && exception.status == ExceptionStatus::Assigned {
        return true;
    }
    if exception.status == ExceptionStatus::Detected && elapsed_minutes > 10.0 {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 7, 27).unwrap().and_hms_opt(10, 0, 0).unwrap()
    }

    #[test]
    fn p1_task_raises_exception_priority_one_level() {
        let mut rng = EngineRng::new(Some(1));
        let mut saw_raised = false;
        for _ in 0..200 {
            let exc = sample_exception("E1", "T1", now(), PriorityClass::P1, &mut rng);
            if exc.priority != ExceptionPriority::Low {
                saw_raised = true;
            }
        }
        assert!(saw_raised);
    }

    #[test]
    fn handling_time_scaled_for_critical_and_low() {
        let mut rng = EngineRng::new(Some(5));
        for _ in 0..100 {
            let exc = sample_exception("E1", "T1", now(), PriorityClass::P2, &mut rng);
            assert!(exc.handling_minutes > 0.0);
        }
    }

    #[test]
    fn critical_high_priority_allows_preemption() {
        let exc = Exception {
            exception_id: "E1".into(),
            task_id: "T1".into(),
            exception_type: ExceptionType::SystemError,
            priority: ExceptionPriority::Critical,
            status: ExceptionStatus::Detected,
            handling_minutes: 10.0,
            assigned_leader: None,
            reserved_station: None,
            detected_at: now(),
            assigned_at: None,
        };
        assert!(may_preempt(&exc, true));
        assert!(!may_preempt(&exc, false));
    }

    #[test]
    fn escalates_after_threshold() {
        let exc = Exception {
            exception_id: "E1".into(),
            task_id: "T1".into(),
            exception_type: ExceptionType::PickingError,
            priority: ExceptionPriority::Medium,
            status: ExceptionStatus::Assigned,
            handling_minutes: 10.0,
            assigned_leader: Some("L1".into()),
            reserved_station: None,
            detected_at: now(),
            assigned_at: Some(now()),
        };
        let later = now() + chrono::Duration::minutes(30);
        assert!(should_escalate(&exc, later, 15.0));
    }

    #[test]
    fn long_wait_in_detected_escalates() {
        let exc = Exception {
            exception_id: "E1".into(),
            task_id: "T1".into(),
            exception_type: ExceptionType::PickingError,
            priority: ExceptionPriority::Medium,
            status: ExceptionStatus::Detected,
            handling_minutes: 10.0,
            assigned_leader: None,
            reserved_station: None,
            detected_at: now(),
            assigned_at: None,
        };
        let later = now() + chrono::Duration::minutes(11);
        assert!(should_escalate(&exc, later, 60.0));
    }
}
