//! Wave Feasibility Check (C10).
//!
//! Decides whether a wave's tasks can be packed onto the available
//! stations before its earliest deadline, or must be routed to overtime
//! instead.

use chrono::NaiveDateTime;

use crate::task::Task;

#[derive(Debug, Clone)]
pub struct FeasibilityReport {
    pub earliest_deadline: Option<NaiveDateTime>,
    pub available_minutes: f64,
    pub total_workload: f64,
    pub unique_partcustids: usize,
    pub stations_needed_by_partcustid: u32,
    pub stations_needed_by_time: u32,
    pub estimated_stations_needed: u32,
    pub feasible: bool,
}

/// Evaluates feasibility for a set of wave tasks against `now` and the
/// stations available on the relevant floor(s).
pub fn evaluate(
    tasks: &[&Task],
    now: NaiveDateTime,
    time_buffer_minutes: f64,
    max_partcustids_per_station: i64,
    total_stations_available: u32,
) -> FeasibilityReport {
    let earliest_deadline = tasks.iter().filter_map(|t| t.shipping.delivery_deadline).min();

    let available_minutes = match earliest_deadline {
        Some(deadline) => (deadline - now).num_seconds() as f64 / 60.0 - time_buffer_minutes,
        None => 0.0,
    };

    let total_workload: f64 = tasks.iter().map(|t| t.estimated_duration_minutes).sum();

    let unique_partcustids: std::collections::HashSet<&str> = tasks
        .iter()
        .filter_map(|t| t.shipping.partcustid.as_deref())
        .collect();
    let unique_partcustids = unique_partcustids.len();

    let stations_needed_by_partcustid =
        div_ceil(unique_partcustids as i64, max_partcustids_per_station.max(1)) as u32;

    let stations_needed_by_time = if available_minutes > 0.0 {
        (total_workload / available_minutes).ceil().max(0.0) as u32
    } else {
        u32::MAX
    };

    let estimated_stations_needed = stations_needed_by_partcustid.max(stations_needed_by_time);

    let feasible = available_minutes > 0.0
        && estimated_stations_needed <= total_stations_available
        && total_workload <= available_minutes * total_stations_available as f64;

    FeasibilityReport {
        earliest_deadline,
        available_minutes,
        total_workload,
        unique_partcustids,
        stations_needed_by_partcustid,
        stations_needed_by_time,
        estimated_stations_needed,
        feasible,
    }
}

fn div_ceil(a: i64, b: i64) -> i64 {
    if a <= 0 {
        return 0;
    }
    (a + b - 1) / b
}
