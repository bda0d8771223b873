//! Master Data Facade (C3).
//!
//! Read-only access to items, the route timetable, station capacity, and
//! staff skills. Tabular ingestion/validation is treated as an
//! external collaborator; this module is the narrow typed surface the core
//! actually consumes.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::time_util;

/// (family-code, part-number) — the item key used throughout the engine.
pub type ItemKey = (String, String);

#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub family_code: String,
    pub part_number: String,
    pub floor: u8,
    pub requires_repack: bool,
    pub mean_pick_time_repack: Option<f64>,
    pub mean_pick_time_no_repack: Option<f64>,
}

impl Item {
    pub fn key(&self) -> ItemKey {
        (self.family_code.clone(), self.part_number.clone())
    }
}

/// A row from `route_schedule_master`: (route_code, partcustid) -> cutoff/delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteScheduleEntry {
    pub route_code: String,
    pub partcustid: String,
    pub order_cutoff_raw: String,
    pub delivery_time_raw: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaffSkillRow {
    pub staff_id: String,
    pub staff_name: String,
    pub home_floor: String, // floor number as string, or "ALL"
    pub skill_level: u8,
    pub capacity_multiplier: f64,
    pub max_hours_per_day: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WorkstationCapacityRow {
    pub floor: u8,
    pub fixed_stations: u32,
    pub temp_stations: u32,
}

/// A single outbound order line.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRecord {
    pub index_no: String,
    pub route_code: String,
    pub partcustid: String,
    pub order_time_raw: String,
    pub family_code: String,
    pub part_number: String,
    pub quantity: u32,
    pub transaction_code: String,
}

/// A single inbound receiving line.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceivingRecord {
    pub receiving_id: String,
    pub arrival_date: NaiveDate,
    pub family_code: String,
    pub part_number: String,
    pub quantity: u32,
}

/// Read-only facade over the ingested master-data tables. The intake layer
/// (out of scope for this crate) is responsible for producing this value;
/// the core never parses CSV/Excel itself.
#[derive(Debug, Default)]
pub struct MasterData {
    items: HashMap<ItemKey, Item>,
    route_schedule: Vec<RouteScheduleEntry>,
    staff: Vec<StaffSkillRow>,
    station_capacity: Vec<WorkstationCapacityRow>,
}

impl MasterData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, item: Item) {
        self.items.insert(item.key(), item);
    }

    pub fn add_route_schedule_entry(&mut self, entry: RouteScheduleEntry) {
        self.route_schedule.push(entry);
    }

    pub fn add_staff(&mut self, staff: StaffSkillRow) {
        self.staff.push(staff);
    }

    pub fn add_station_capacity(&mut self, row: WorkstationCapacityRow) {
        self.station_capacity.push(row);
    }

    pub fn item(&self, key: &ItemKey) -> Option<&Item> {
        self.items.get(key)
    }

    pub fn route_schedule(&self) -> &[RouteScheduleEntry] {
        &self.route_schedule
    }

    pub fn find_schedule(&self, route_code: &str, partcustid: &str) -> Option<&RouteScheduleEntry> {
        self.route_schedule
            .iter()
            .find(|e| e.route_code == route_code && e.partcustid == partcustid)
    }

    pub fn staff(&self) -> &[StaffSkillRow] {
        &self.staff
    }

    pub fn staff_for_floor<'a>(&'a self, floor: u8) -> impl Iterator<Item = &'a StaffSkillRow> {
        let floor_str = floor.to_string();
        self.staff
            .iter()
            .filter(move |s| s.home_floor == floor_str || s.home_floor.eq_ignore_ascii_case("ALL"))
    }

    pub fn station_capacity(&self) -> &[WorkstationCapacityRow] {
        &self.station_capacity
    }

    pub fn capacity_for_floor(&self, floor: u8) -> Option<WorkstationCapacityRow> {
        self.station_capacity.iter().find(|r| r.floor == floor).copied()
    }

    /// Validates that every `station_capacity` row names a floor in
    /// {2,3,4}.
    pub fn validate(&self) -> EngineResult<()> {
        for row in &self.station_capacity {
            if !(2..=4).contains(&row.floor) {
                return Err(EngineError::MasterData(format!(
                    "workstation_capacity names floor {} outside {{2,3,4}}",
                    row.floor
                )));
            }
        }
        Ok(())
    }
}

/// Resolves a route-schedule entry's raw time fields into wallclock times,
/// returning `InputDataMissing`/`TimeParseError` conditions as `Err`.
pub fn resolve_schedule_times(entry: &RouteScheduleEntry) -> EngineResult<(chrono::NaiveTime, chrono::NaiveTime)> {
    let cutoff = time_util::parse_hhmm(&entry.order_cutoff_raw)?;
    let delivery = time_util::parse_hhmm(&entry.delivery_time_raw)?;
    Ok((cutoff, delivery))
}
