//! Shared scenario-test builders.
//!
//! Kept deliberately thin: each helper mirrors a fixture already used by the
//! unit tests beside the modules it touches, just reusable across the
//! scenario files under `tests/`.

#![allow(dead_code)]

use chrono::NaiveDate;
use warehouse_sim::config::{EngineConfig, ParamValue, ParameterStore};
use warehouse_sim::master_data::{
    Item, MasterData, OrderRecord, ReceivingRecord, RouteScheduleEntry, StaffSkillRow,
    WorkstationCapacityRow,
};

pub fn config_with(overrides: &[(&str, ParamValue)]) -> EngineConfig {
    let mut store = ParameterStore::new();
    for (name, value) in overrides {
        store.insert(*name, value.clone());
    }
    EngineConfig::from_store(&store).expect("valid overrides")
}

pub fn default_config() -> EngineConfig {
    EngineConfig::from_store(&ParameterStore::new()).expect("defaults are always valid")
}

pub fn item(family: &str, part: &str, floor: u8) -> Item {
    Item {
        family_code: family.into(),
        part_number: part.into(),
        floor,
        requires_repack: false,
        mean_pick_time_repack: None,
        mean_pick_time_no_repack: None,
    }
}

pub fn route_schedule(route: &str, partcustid: &str, cutoff_raw: &str, delivery_raw: &str) -> RouteScheduleEntry {
    RouteScheduleEntry {
        route_code: route.into(),
        partcustid: partcustid.into(),
        order_cutoff_raw: cutoff_raw.into(),
        delivery_time_raw: delivery_raw.into(),
    }
}

pub fn staff(id: &str, home_floor: &str) -> StaffSkillRow {
    StaffSkillRow {
        staff_id: id.into(),
        staff_name: format!("Staff {id}"),
        home_floor: home_floor.into(),
        skill_level: 3,
        capacity_multiplier: 1.0,
        max_hours_per_day: 8.0,
    }
}

pub fn station_capacity(floor: u8, fixed: u32, temp: u32) -> WorkstationCapacityRow {
    WorkstationCapacityRow { floor, fixed_stations: fixed, temp_stations: temp }
}

pub fn order(index_no: &str, route: &str, partcustid: &str, time_raw: &str, family: &str, part: &str, transcd: &str) -> OrderRecord {
    OrderRecord {
        index_no: index_no.into(),
        route_code: route.into(),
        partcustid: partcustid.into(),
        order_time_raw: time_raw.into(),
        family_code: family.into(),
        part_number: part.into(),
        quantity: 1,
        transaction_code: transcd.into(),
    }
}

pub fn receiving(id: &str, arrival_date: NaiveDate, family: &str, part: &str, quantity: u32) -> ReceivingRecord {
    ReceivingRecord { receiving_id: id.into(), arrival_date, family_code: family.into(), part_number: part.into(), quantity }
}

/// A single floor-3 item/route/station/staff fixture shared by the wave
/// scenarios (S1, S4, S6).
pub fn single_floor3_master_data(fixed_stations: u32, temp_stations: u32) -> MasterData {
    let mut md = MasterData::new();
    md.add_item(item("F", "P", 3));
    md.add_route_schedule_entry(route_schedule("R1", "C1", "930", "1100"));
    md.add_station_capacity(station_capacity(3, fixed_stations, temp_stations));
    md.add_staff(staff("S1", "3"));
    md.add_staff(staff("S2", "3"));
    md
}
