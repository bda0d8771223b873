//! Unified task model (C7) and duration estimation.
//!
//! A single [`Task`] record represents shipping, receiving, and overtime
//! work. Duration estimation has two modes: a deterministic "fixed"
//! estimate used for planning and packing, and a jittered "actual"
//! estimate applied once a task starts.

use chrono::NaiveDateTime;

use crate::config::EngineConfig;
use crate::master_data::ItemKey;
use crate::rng::EngineRng;
use crate::staff::Staff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    Shipping,
    Receiving,
    Overtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityClass {
    /// Normal shipping; highest scheduling priority within a wave.
    P1,
    /// Urgent shipping / gap-fill.
    P2,
    /// Sub-warehouse shipping / receiving gap-fill.
    P3,
    /// Normal receiving.
    P4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Paused,
    Cancelled,
}

/// Fields present only on shipping tasks.
#[derive(Debug, Clone, Default)]
pub struct ShippingInfo {
    pub partcustid: Option<String>,
    pub route_code: Option<String>,
    pub wave_id: Option<String>,
    pub delivery_deadline: Option<NaiveDateTime>,
    pub available_work_minutes: Option<i64>,
}

/// Fields present only on receiving tasks.
#[derive(Debug, Clone, Default)]
pub struct ReceivingInfo {
    pub arrival_date: Option<chrono::NaiveDate>,
    pub deadline_date: Option<chrono::NaiveDate>,
    pub days_since_arrival: Option<i64>,
    pub is_overdue: bool,
}

#[derive(Debug, Clone)]
pub struct Task {
    pub task_id: String,
    pub task_type: TaskType,
    pub priority_class: PriorityClass,
    pub floor: u8,
    pub item_key: ItemKey,
    pub quantity: u32,
    pub requires_repack: bool,
    pub estimated_duration_minutes: f64,
    pub shipping: ShippingInfo,
    pub receiving: ReceivingInfo,
    pub assigned_station: Option<String>,
    pub assigned_staff: Option<String>,
    pub status: TaskStatus,
    pub planned_start: Option<NaiveDateTime>,
    pub planned_completion: Option<NaiveDateTime>,
    pub actual_start: Option<NaiveDateTime>,
    pub actual_completion: Option<NaiveDateTime>,
    pub actual_duration: Option<f64>,
    /// Set when an overtime variant replaced this task.
    pub superseded_by: Option<String>,
    /// Remaining-duration override left by an exception preemption resume
    /// (remaining duration resumes at 50% of the original estimate).
    pub remaining_duration_override: Option<f64>,
}

impl Task {
    pub fn is_sub_warehouse(&self) -> bool {
        self.priority_class == PriorityClass::P3 && self.task_type == TaskType::Shipping
    }

    pub fn mark_assigned(&mut self, station_id: impl Into<String>, staff_id: Option<String>) {
        self.assigned_station = Some(station_id.into());
        self.assigned_staff = staff_id;
        self.status = TaskStatus::Assigned;
    }

    pub fn mark_in_progress(&mut self, at: NaiveDateTime, actual_duration: f64) {
        self.status = TaskStatus::InProgress;
        self.actual_start = Some(at);
        self.actual_duration = Some(actual_duration);
        self.planned_completion = Some(at + chrono::Duration::seconds((actual_duration * 60.0) as i64));
    }

    pub fn mark_completed(&mut self, at: NaiveDateTime) {
        self.status = TaskStatus::Completed;
        self.actual_completion = Some(at);
    }

    pub fn mark_paused(&mut self) {
        self.status = TaskStatus::Paused;
    }

    pub fn mark_cancelled(&mut self) {
        self.status = TaskStatus::Cancelled;
    }

    /// Remaining duration used on resume after an exception preemption:
    /// half of the original fixed estimate. This is a policy decision
    /// recorded in DESIGN.md's open-question ledger.
    pub fn preemption_resume_duration(&self) -> f64 {
        self.remaining_duration_override.unwrap_or(self.estimated_duration_minutes * 0.5)
    }
}

/// Fixed (planning) duration estimate — deterministic, no randomness.
pub fn fixed_shipping_duration(
    config: &EngineConfig,
    requires_repack: bool,
    item_mean_repack: Option<f64>,
    item_mean_no_repack: Option<f64>,
) -> f64 {
    let base = if requires_repack {
        item_mean_repack.unwrap_or(config.picking_base_time_repack)
    } else {
        item_mean_no_repack.unwrap_or(config.picking_base_time_no_repack)
    };
    let with_repack_addon = if requires_repack { base + config.repack_additional_time } else { base };
    config.clamp_duration(with_repack_addon)
}

pub fn fixed_receiving_duration(config: &EngineConfig, quantity: u32) -> f64 {
    let raw = quantity as f64 * config.receiving_time_per_piece;
    let low = (raw * 0.5).max(1.0);
    let high = raw * 3.0;
    config.clamp_duration(raw.clamp(low, high))
}

/// Actual (execution) duration: applied when a task transitions to
/// IN_PROGRESS (the jittered execution estimate).
pub fn actual_duration(config: &EngineConfig, fixed_estimate: f64, staff: Option<&Staff>, rng: &mut EngineRng) -> f64 {
    let mut minutes = fixed_estimate;

    if let Some(staff) = staff {
        let skill_factor = 1.0 - (staff.skill_level as f64 - 3.0) * config.skill_impact_multiplier;
        let skill_factor = skill_factor.clamp(0.5, 1.5);
        minutes = minutes * skill_factor / staff.capacity_multiplier.max(0.01);
    }

    let jitter = rng.uniform(0.85, 1.15);
    minutes *= jitter;

    config.clamp_duration(minutes)
}
