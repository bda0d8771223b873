//! Partcustid Packer (C11).
//!
//! Greedily bin-packs partcustid groups onto stations, minimizing station
//! count under two hard per-station caps: distinct partcustid count and
//! total workload.

use std::collections::HashSet;

use crate::station::StationPool;

#[derive(Debug, Clone)]
pub struct PartcustidGroup {
    pub partcustid: String,
    pub task_ids: Vec<String>,
    pub workload_minutes: f64,
}

#[derive(Debug, Clone)]
pub struct StationAssignment {
    pub station_id: String,
    pub groups: Vec<PartcustidGroup>,
}

impl StationAssignment {
    pub fn partcustid_count(&self) -> usize {
        self.groups.len()
    }

    pub fn workload_minutes(&self) -> f64 {
        self.groups.iter().map(|g| g.workload_minutes).sum()
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().flat_map(|g| g.task_ids.iter().map(|s| s.as_str()))
    }
}

#[derive(Debug, Default)]
pub struct PackResult {
    pub assignments: Vec<StationAssignment>,
    pub unassigned: Vec<PartcustidGroup>,
    pub used_stations: HashSet<String>,
}

/// Packs pre-sorted (workload desc) partcustid groups for one floor within
/// one wave, per a greedy descending-workload algorithm. Groups that cannot
/// find a free station are returned unassigned rather than erroring — the
/// caller forwards them to overtime.
pub fn pack(
    stations: &StationPool,
    floor: u8,
    mut groups: Vec<PartcustidGroup>,
    cap_partcustids: i64,
    cap_time_minutes: f64,
    already_used: &HashSet<String>,
) -> PackResult {
    groups.sort_by(|a, b| b.workload_minutes.partial_cmp(&a.workload_minutes).unwrap());

    let mut result = PackResult { used_stations: already_used.clone(), ..Default::default() };
    let mut current: Option<StationAssignment> = None;

    for group in groups.into_iter() {
        if let Some(assignment) = &mut current {
            let ok = (assignment.partcustid_count() + 1) as i64 <= cap_partcustids
                && assignment.workload_minutes() + group.workload_minutes <= cap_time_minutes;
            if ok {
                assignment.groups.push(group);
                continue;
            }
            result.assignments.push(current.take().unwrap());
        }

        match stations.next_free_on_floor(floor, &result.used_stations) {
            Some(station_id) => {
                result.used_stations.insert(station_id.clone());
                current = Some(StationAssignment { station_id, groups: vec![group] });
            }
            None => {
                result.unassigned.push(group);
            }
        }
    }

    if let Some(assignment) = current {
        result.assignments.push(assignment);
    }

    result
}

/// Floor-specific fixed packing window for P1 waves:
/// floor 3 = 30 min, floor 2 = 25 min, other = 30 min.
pub fn p1_cap_time_minutes(floor: u8) -> f64 {
    match floor {
        2 => 25.0,
        3 => 30.0,
        _ => 30.0,
    }
}
