//! State Tracker & Metrics (C16).
//!
//! Periodic snapshots into a fixed-size ring buffer, diffed into
//! structured change events, plus rolling [`SystemMetrics`].

use std::collections::VecDeque;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::station::{Station, StationStatus};
use crate::task::{Task, TaskStatus};

/// A single component's observed field value at snapshot time, used to
/// diff against the previous snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub at: NaiveDateTime,
    pub component_kind: String,
    pub component_id: String,
    pub field: String,
    pub old_value: String,
    pub new_value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub workstation_utilization: f64,
    pub task_completion_rate: f64,
    pub wave_progress_avg: f64,
    pub active_exceptions: usize,
    pub staff_utilization: f64,
    pub overall_efficiency: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub at: NaiveDateTime,
    pub metrics: SystemMetrics,
}

/// Append-only ring buffer of fixed size, plus the diff/metrics machinery
/// that periodically observes engine state.
#[derive(Debug)]
pub struct StateTracker {
    capacity: usize,
    snapshots: VecDeque<Snapshot>,
    changes: VecDeque<ChangeEvent>,
    last_station_status: std::collections::HashMap<String, String>,
    last_task_status: std::collections::HashMap<String, String>,
}

impl StateTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            snapshots: VecDeque::new(),
            changes: VecDeque::new(),
            last_station_status: std::collections::HashMap::new(),
            last_task_status: std::collections::HashMap::new(),
        }
    }

    pub fn snapshots(&self) -> &VecDeque<Snapshot> {
        &self.snapshots
    }

    pub fn changes(&self) -> &VecDeque<ChangeEvent> {
        &self.changes
    }

    /// Diffs stations/tasks against the last observation and records any
    /// changed status fields, then computes and stores [`SystemMetrics`].
    pub fn observe(
        &mut self,
        at: NaiveDateTime,
        stations: &[Station],
        tasks: &[&Task],
        wave_progress_avg: f64,
        active_exceptions: usize,
        staff_present: usize,
        staff_busy: usize,
    ) {
        for station in stations {
            let new_value = format!("{:?}", station.status);
            if let Some(old) = self.last_station_status.get(&station.station_id) {
                if old != &new_value {
                    self.push_change(ChangeEvent {
                        at,
                        component_kind: "station".into(),
                        component_id: station.station_id.clone(),
                        field: "status".into(),
                        old_value: old.clone(),
                        new_value: new_value.clone(),
                    });
                }
            }
            self.last_station_status.insert(station.station_id.clone(), new_value);
        }

        for task in tasks {
            let new_value = format!("{:?}", task.status);
            if let Some(old) = self.last_task_status.get(&task.task_id) {
                if old != &new_value {
                    self.push_change(ChangeEvent {
                        at,
                        component_kind: "task".into(),
                        component_id: task.task_id.clone(),
                        field: "status".into(),
                        old_value: old.clone(),
                        new_value: new_value.clone(),
                    });
                }
            }
            self.last_task_status.insert(task.task_id.clone(), new_value);
        }

        let workstation_utilization = ratio(
            stations.iter().filter(|s| matches!(s.status, StationStatus::Busy | StationStatus::StartingUp)).count(),
            stations.len(),
        );
        let task_completion_rate = ratio(tasks.iter().filter(|t| t.status == TaskStatus::Completed).count(), tasks.len());
        let staff_utilization = ratio(staff_busy, staff_present);

        let mean_of_four =
            (workstation_utilization + task_completion_rate + wave_progress_avg + staff_utilization) / 4.0 * 100.0;
        let overall_efficiency = (mean_of_four - active_exceptions as f64).min(100.0).max(0.0);

        let metrics = SystemMetrics {
            workstation_utilization,
            task_completion_rate,
            wave_progress_avg,
            active_exceptions,
            staff_utilization,
            overall_efficiency,
        };

        if self.snapshots.len() >= self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(Snapshot { at, metrics });
    }

    pub fn latest_metrics(&self) -> Option<&SystemMetrics> {
        self.snapshots.back().map(|s| &s.metrics)
    }

    fn push_change(&mut self, change: ChangeEvent) {
        if self.changes.len() >= self.capacity {
            self.changes.pop_front();
        }
        self.changes.push_back(change);
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}
