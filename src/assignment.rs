//! Staged Assignment Controller (C12).
//!
//! Pipeline: P1 per-wave (feasibility + packer) → P2 gap-fill → P3/receiving
//! gap-fill, in that order, within one clock tick.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::config::EngineConfig;
use crate::feasibility;
use crate::packer::{self, PartcustidGroup, StationAssignment};
use crate::station::StationPool;
use crate::task::{PriorityClass, Task, TaskStatus};
use crate::wave::WaveCatalog;

#[derive(Debug, Default)]
pub struct AssignmentOutcome {
    pub placements: Vec<Placement>,
    pub unassigned_task_ids: Vec<String>,
    /// Tasks whose wave was infeasible, or that could not be placed and
    /// are overdue — both forwarded to overtime.
    pub forward_to_overtime: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Placement {
    pub task_id: String,
    pub station_id: String,
    pub planned_start: NaiveDateTime,
    pub planned_completion: NaiveDateTime,
    pub station_was_idle: bool,
}

/// Runs the three-stage placement pipeline for one floor's pending tasks
/// at `now`. `tasks` must all be PENDING and on `floor`.
pub fn run_assignment_pipeline(
    config: &EngineConfig,
    stations: &mut StationPool,
    _wave_catalog: &WaveCatalog,
    floor: u8,
    now: NaiveDateTime,
    tasks: &mut [Task],
) -> AssignmentOutcome {
    let mut outcome = AssignmentOutcome::default();
    let mut used_stations: HashSet<String> = HashSet::new();

    stage_p1_waves(config, stations, _wave_catalog, floor, now, tasks, &mut used_stations, &mut outcome);
    stage_gap_fill(config, stations, floor, now, tasks, PriorityClass::P2, &mut used_stations, &mut outcome);
    stage_receiving_and_sub_warehouse_gap_fill(config, stations, floor, now, tasks, &mut used_stations, &mut outcome);

    outcome
}

fn stage_p1_waves(
    config: &EngineConfig,
    stations: &mut StationPool,
    _wave_catalog: &WaveCatalog,
    floor: u8,
    now: NaiveDateTime,
    tasks: &mut [Task],
    used_stations: &mut HashSet<String>,
    outcome: &mut AssignmentOutcome,
) {
    let mut by_wave: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, t) in tasks.iter().enumerate() {
        if t.floor == floor && t.status == TaskStatus::Pending && t.priority_class == PriorityClass::P1 {
            if let Some(wave_id) = &t.shipping.wave_id {
                by_wave.entry(wave_id.clone()).or_default().push(i);
            }
        }
    }

    for (wave_id, indices) in by_wave {
        let refs: Vec<&Task> = indices.iter().map(|&i| &tasks[i]).collect();
        let total_stations = stations.count_on_floor(floor) as u32;
        let report = feasibility::evaluate(&refs, now, config.time_buffer_minutes, config.max_partcustids_per_station, total_stations);

        if !report.feasible {
            for &i in &indices {
                outcome.forward_to_overtime.push(tasks[i].task_id.clone());
            }
            continue;
        }

        let mut groups: HashMap<String, PartcustidGroup> = HashMap::new();
        for &i in &indices {
            let task = &tasks[i];
            let partcustid = task.shipping.partcustid.clone().unwrap_or_else(|| wave_id.clone());
            let group = groups.entry(partcustid.clone()).or_insert_with(|| PartcustidGroup {
                partcustid,
                task_ids: Vec::new(),
                workload_minutes: 0.0,
            });
            group.task_ids.push(task.task_id.clone());
            group.workload_minutes += task.estimated_duration_minutes;
        }
        let groups: Vec<PartcustidGroup> = groups.into_values().collect();

        let cap_time = packer::p1_cap_time_minutes(floor);
        let pack_result = packer::pack(stations, floor, groups, config.max_partcustids_per_station, cap_time, used_stations);

        for assignment in &pack_result.assignments {
            place_assignment(stations, now, config, assignment, tasks, outcome);
        }
        for group in &pack_result.unassigned {
            for task_id in &group.task_ids {
                outcome.forward_to_overtime.push(task_id.clone());
            }
        }
        used_stations.extend(pack_result.used_stations);
    }
}

fn place_assignment(
    stations: &mut StationPool,
    now: NaiveDateTime,
    config: &EngineConfig,
    assignment: &StationAssignment,
    tasks: &mut [Task],
    outcome: &mut AssignmentOutcome,
) {
    let Some(station) = stations.get_mut(&assignment.station_id) else { return };
    let station_was_idle = station.is_idle();
    let mut cursor = station.available_time.unwrap_or(now).max(now);
    if station_was_idle {
        cursor += chrono::Duration::seconds((config.station_startup_time_minutes * 60.0) as i64);
    }

    for group in &assignment.groups {
        for task_id in &group.task_ids {
            if let Some(task) = tasks.iter_mut().find(|t| &t.task_id == task_id) {
                let planned_start = cursor;
                let planned_completion = planned_start
                    + chrono::Duration::seconds((task.estimated_duration_minutes * 60.0) as i64);
                cursor = planned_completion;
                task.mark_assigned(assignment.station_id.clone(), None);
                task.planned_start = Some(planned_start);
                task.planned_completion = Some(planned_completion);
                outcome.placements.push(Placement {
                    task_id: task_id.clone(),
                    station_id: assignment.station_id.clone(),
                    planned_start,
                    planned_completion,
                    station_was_idle,
                });
            }
        }
    }

    station.available_time = Some(cursor);
    station.status =
        if station_was_idle { crate::station::StationStatus::StartingUp } else { crate::station::StationStatus::Busy };
}

fn stage_gap_fill(
    config: &EngineConfig,
    stations: &mut StationPool,
    floor: u8,
    now: NaiveDateTime,
    tasks: &mut [Task],
    priority: PriorityClass,
    used_stations: &mut HashSet<String>,
    outcome: &mut AssignmentOutcome,
) {
    let candidate_ids: Vec<String> = tasks
        .iter()
        .filter(|t| t.floor == floor && t.status == TaskStatus::Pending && t.priority_class == priority)
        .map(|t| t.task_id.clone())
        .collect();

    for task_id in candidate_ids {
        place_single_gap_fill(config, stations, floor, now, tasks, &task_id, used_stations, outcome);
    }
}

fn stage_receiving_and_sub_warehouse_gap_fill(
    config: &EngineConfig,
    stations: &mut StationPool,
    floor: u8,
    now: NaiveDateTime,
    tasks: &mut [Task],
    used_stations: &mut HashSet<String>,
    outcome: &mut AssignmentOutcome,
) {
    let remaining_gap_minutes: f64 = stations
        .on_floor(floor)
        .filter(|s| s.is_available_for_packing() && !used_stations.contains(&s.station_id))
        .map(|s| {
            s.available_time
                .map(|t| (now - t).num_seconds() as f64 / 60.0)
                .unwrap_or(0.0)
                .max(0.0)
        })
        .sum();

    let receiving_first = remaining_gap_minutes < 60.0;

    let mut candidates: Vec<String> = tasks
        .iter()
        .filter(|t| t.floor == floor && t.status == TaskStatus::Pending && t.priority_class == PriorityClass::P3)
        .map(|t| t.task_id.clone())
        .collect();

    if receiving_first {
        candidates.sort_by_key(|id| {
            let t = tasks.iter().find(|t| &t.task_id == id).expect("task exists");
            if t.task_type == crate::task::TaskType::Receiving { 0 } else { 1 }
        });
    }

    for task_id in candidates {
        place_single_gap_fill(config, stations, floor, now, tasks, &task_id, used_stations, outcome);
    }
}

fn place_single_gap_fill(
    config: &EngineConfig,
    stations: &mut StationPool,
    floor: u8,
    now: NaiveDateTime,
    tasks: &mut [Task],
    task_id: &str,
    used_stations: &mut HashSet<String>,
    outcome: &mut AssignmentOutcome,
) {
    let Some(station_id) = stations.next_free_on_floor(floor, used_stations) else {
        let task = tasks.iter().find(|t| t.task_id == task_id);
        let is_overdue = task.map(|t| t.receiving.is_overdue).unwrap_or(false);
        if is_overdue {
            outcome.forward_to_overtime.push(task_id.to_string());
        } else {
            outcome.unassigned_task_ids.push(task_id.to_string());
        }
        return;
    };

    let Some(station) = stations.get(&station_id) else { return };
    if station.available_time.map(|t| t > now).unwrap_or(false) {
        outcome.unassigned_task_ids.push(task_id.to_string());
        return;
    }

    used_stations.insert(station_id.clone());
    let assignment = StationAssignment {
        station_id: station_id.clone(),
        groups: vec![PartcustidGroup {
            partcustid: task_id.to_string(),
            task_ids: vec![task_id.to_string()],
            workload_minutes: tasks
                .iter()
                .find(|t| t.task_id == task_id)
                .map(|t| t.estimated_duration_minutes)
                .unwrap_or(0.0),
        }],
    };
    place_assignment(stations, now, config, &assignment, tasks, outcome);
}
