//! Station Pool (C8).
//!
//! Stations are created once per (floor, type) from the capacity table and
//! live for the whole run; only their status/occupant fields change day to
//! day.

use chrono::NaiveDateTime;

use crate::master_data::MasterData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationType {
    Fixed,
    Flex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationStatus {
    Idle,
    StartingUp,
    Busy,
    /// Held for an in-progress exception handling session; the packer and
    /// gap-fill must skip it.
    Reserved,
}

#[derive(Debug, Clone)]
pub struct Station {
    pub station_id: String,
    pub floor: u8,
    pub station_type: StationType,
    pub status: StationStatus,
    pub available_time: Option<NaiveDateTime>,
    pub current_task_id: Option<String>,
    pub reserved_for_exception: bool,
}

impl Station {
    pub fn is_idle(&self) -> bool {
        self.status == StationStatus::Idle
    }

    pub fn is_available_for_packing(&self) -> bool {
        !self.reserved_for_exception && self.status != StationStatus::Reserved
    }
}

/// All stations on the floor, created once from the capacity table and
/// mutated in place as the run progresses.
#[derive(Debug, Default)]
pub struct StationPool {
    stations: Vec<Station>,
}

impl StationPool {
    /// Builds the fixed set of stations for every floor named in the
    /// capacity table. IDs follow `STxF01...` (fixed) / `STxT01...` (flex).
    pub fn build(master_data: &MasterData) -> Self {
        let mut stations = Vec::new();
        for row in master_data.station_capacity() {
            for i in 1..=row.fixed_stations {
                stations.push(Station {
                    station_id: format!("ST{}F{:02}", row.floor, i),
                    floor: row.floor,
                    station_type: StationType::Fixed,
                    status: StationStatus::Idle,
                    available_time: None,
                    current_task_id: None,
                    reserved_for_exception: false,
                });
            }
            for i in 1..=row.temp_stations {
                stations.push(Station {
                    station_id: format!("ST{}T{:02}", row.floor, i),
                    floor: row.floor,
                    station_type: StationType::Flex,
                    status: StationStatus::Idle,
                    available_time: None,
                    current_task_id: None,
                    reserved_for_exception: false,
                });
            }
        }
        Self { stations }
    }

    pub fn all(&self) -> &[Station] {
        &self.stations
    }

    pub fn on_floor(&self, floor: u8) -> impl Iterator<Item = &Station> {
        self.stations.iter().filter(move |s| s.floor == floor)
    }

    pub fn get(&self, station_id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.station_id == station_id)
    }

    pub fn get_mut(&mut self, station_id: &str) -> Option<&mut Station> {
        self.stations.iter_mut().find(|s| s.station_id == station_id)
    }

    /// Finds the next free station on a floor, deterministically preferring
    /// fixed-IDLE, then any fixed, then flex, iterating by id ascending
    /// (station selection within a floor is deterministic).
    pub fn next_free_on_floor(&self, floor: u8, used_stations: &std::collections::HashSet<String>) -> Option<String> {
        let mut candidates: Vec<&Station> = self
            .on_floor(floor)
            .filter(|s| s.is_available_for_packing() && !used_stations.contains(&s.station_id))
            .collect();
        candidates.sort_by(|a, b| a.station_id.cmp(&b.station_id));

        candidates
            .iter()
            .find(|s| s.station_type == StationType::Fixed && s.is_idle())
            .or_else(|| candidates.iter().find(|s| s.station_type == StationType::Fixed))
            .or_else(|| candidates.iter().find(|s| s.station_type == StationType::Flex))
            .map(|s| s.station_id.clone())
    }

    pub fn count_on_floor(&self, floor: u8) -> usize {
        self.on_floor(floor).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master_data::WorkstationCapacityRow;

    fn sample_pool() -> StationPool {
        let mut md = MasterData::new();
        md.add_station_capacity(WorkstationCapacityRow { floor: 3, fixed_stations: 2, temp_stations: 1 });
        StationPool::build(&md)
    }

    #[test]
    fn builds_fixed_and_flex_ids() {
        let pool = sample_pool();
        assert_eq!(pool.count_on_floor(3), 3);
        assert!(pool.get("ST3F01").is_some());
        assert!(pool.get("ST3F02").is_some());
        assert!(pool.get("ST3T01").is_some());
    }

    #[test]
    fn prefers_fixed_idle_first() {
        let mut pool = sample_pool();
        pool.get_mut("ST3F01").unwrap().status = StationStatus::Busy;
        let used = std::collections::HashSet::new();
        let next = pool.next_free_on_floor(3, &used).unwrap();
        assert_eq!(next, "ST3F02");
    }

    #[test]
    fn reserved_stations_skipped() {
        let mut pool = sample_pool();
        pool.get_mut("ST3F01").unwrap().reserved_for_exception = true;
        pool.get_mut("ST3F01").unwrap().status = StationStatus::Reserved;
        let used = std::collections::HashSet::new();
        let next = pool.next_free_on_floor(3, &used).unwrap();
        assert_eq!(next, "ST3F02");
    }
}
