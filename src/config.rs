//! Parameter Store (C2) and the typed [`EngineConfig`] built from it.
//!
//! `system_parameters` rows arrive as name/value/type triples with
//! typed default-on-miss lookup. A typed config struct is resolved once at
//! init, keeping the name-based lookup confined to the intake layer.
//! [`ParameterStore`] is that intake-layer lookup; [`EngineConfig`] is the
//! hot-path struct.

use std::collections::HashMap;

use crate::error::{EngineError, EngineResult};

/// A single typed parameter value, as read from `system_parameters`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Name-based lookup over the raw `system_parameters` rows, with typed
/// defaults on miss.
#[derive(Debug, Default, Clone)]
pub struct ParameterStore {
    values: HashMap<String, ParamValue>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self { values: HashMap::new() }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get_int(&self, name: &str, default: i64) -> i64 {
        match self.values.get(name) {
            Some(ParamValue::Integer(v)) => *v,
            Some(ParamValue::Float(v)) => *v as i64,
            Some(ParamValue::Text(v)) => v.parse().unwrap_or(default),
            None => default,
        }
    }

    pub fn get_float(&self, name: &str, default: f64) -> f64 {
        match self.values.get(name) {
            Some(ParamValue::Float(v)) => *v,
            Some(ParamValue::Integer(v)) => *v as f64,
            Some(ParamValue::Text(v)) => v.parse().unwrap_or(default),
            None => default,
        }
    }

    pub fn get_str<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.values.get(name) {
            Some(ParamValue::Text(v)) => v.as_str(),
            _ => default,
        }
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.values.get(name) {
            Some(ParamValue::Text(v)) => matches!(v.as_str(), "Y" | "y" | "true" | "1"),
            Some(ParamValue::Integer(v)) => *v != 0,
            _ => default,
        }
    }

    /// Parses a comma-separated list parameter, trimming each entry
    /// (matches the original's `x.strip() for x in value.split(',')`).
    pub fn get_list(&self, name: &str, default: &str) -> Vec<String> {
        let raw = self.get_str(name, default);
        raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
    }
}

/// Hot-path configuration, resolved once at [`crate::engine::Engine::new`]
/// from the [`ParameterStore`]. Every field here has a recognized
/// configuration name it was read from.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub daily_work_hours: f64,
    pub shift_start_time: String,
    pub shift_end_time: String,
    pub planned_staff_2f: i64,
    pub planned_staff_3f: i64,
    pub planned_staff_4f: i64,
    pub staff_shortage_probability: f64,
    pub staff_shortage_reduction_min: i64,
    pub staff_shortage_reduction_max: i64,
    pub station_startup_time_minutes: f64,
    pub picking_base_time_repack: f64,
    pub picking_base_time_no_repack: f64,
    pub repack_additional_time: f64,
    pub min_task_duration: f64,
    pub max_task_duration: f64,
    pub receiving_time_per_piece: f64,
    pub receiving_completion_days: i64,
    pub max_partcustids_per_station: i64,
    pub time_buffer_minutes: f64,
    pub skill_impact_multiplier: f64,
    pub task_interruption_allowed: bool,
    pub exception_probability_shipping: f64,
    pub exception_probability_receiving: f64,
    pub exception_handling_time_avg: f64,
    pub exception_handling_time_std: f64,
    pub leader_count: i64,
    pub escalation_time_threshold: f64,
    pub critical_exception_immediate_escalation: bool,
    pub overtime_enabled: bool,
    pub max_overtime_hours: f64,
    pub overtime_end_time: String,
    pub urgent_transcd_list: Vec<String>,
    pub normal_transcd_list: Vec<String>,
    pub sub_warehouse_routes: Vec<String>,
    pub receiving_normal_priority: String,
    pub receiving_urgent_priority: String,
    pub receiving_critical_priority: String,
    pub overtime_evaluation_interval_minutes: i64,
    pub snapshot_interval_minutes: i64,
    pub urgent_receiving_item_codes: Vec<String>,
    pub bulk_quantity_threshold: i64,
}

impl EngineConfig {
    pub fn from_store(store: &ParameterStore) -> EngineResult<Self> {
        let cfg = Self {
            daily_work_hours: store.get_float("daily_work_hours", 8.0),
            shift_start_time: store.get_str("shift_start_time", "08:50:00").to_string(),
            shift_end_time: store.get_str("shift_end_time", "17:30:00").to_string(),
            planned_staff_2f: store.get_int("planned_staff_2f", 8),
            planned_staff_3f: store.get_int("planned_staff_3f", 8),
            planned_staff_4f: store.get_int("planned_staff_4f", 8),
            staff_shortage_probability: store.get_float("staff_shortage_probability", 0.03),
            staff_shortage_reduction_min: store.get_int("staff_shortage_reduction_min", 1),
            staff_shortage_reduction_max: store.get_int("staff_shortage_reduction_max", 3),
            station_startup_time_minutes: store.get_float("station_startup_time_minutes", 3.0),
            picking_base_time_repack: store.get_float("picking_base_time_repack", 12.0),
            picking_base_time_no_repack: store.get_float("picking_base_time_no_repack", 6.0),
            repack_additional_time: store.get_float("repack_additional_time", 4.0),
            min_task_duration: store.get_float("min_task_duration", 2.0),
            max_task_duration: store.get_float("max_task_duration", 120.0),
            receiving_time_per_piece: store.get_float("receiving_time_per_piece", 0.5),
            receiving_completion_days: store.get_int("receiving_completion_days", 3),
            max_partcustids_per_station: store.get_int("max_partcustids_per_station", 12),
            time_buffer_minutes: store.get_float("time_buffer_minutes", 10.0),
            skill_impact_multiplier: store.get_float("skill_impact_multiplier", 0.1),
            task_interruption_allowed: store.get_bool("task_interruption_allowed", true),
            exception_probability_shipping: store.get_float("exception_probability_shipping", 0.02),
            exception_probability_receiving: store.get_float("exception_probability_receiving", 0.03),
            exception_handling_time_avg: store.get_float("exception_handling_time_avg", 18.0),
            exception_handling_time_std: store.get_float("exception_handling_time_std", 8.0),
            leader_count: store.get_int("leader_count", 3),
            escalation_time_threshold: store.get_float("escalation_time_threshold", 15.0),
            critical_exception_immediate_escalation: store
                .get_bool("critical_exception_immediate_escalation", true),
            overtime_enabled: store.get_bool("overtime_enabled", true),
            max_overtime_hours: store.get_float("max_overtime_hours", 3.0),
            overtime_end_time: store.get_str("overtime_end_time", "20:30:00").to_string(),
            urgent_transcd_list: store.get_list("urgent_transcd_list", "3,6,8,A"),
            normal_transcd_list: store.get_list("normal_transcd_list", "1,2,4,5,7,9,C,D,E,F"),
            sub_warehouse_routes: store.get_list("sub_warehouse_routes", "SDTC,SDHN"),
            receiving_normal_priority: store.get_str("receiving_normal_priority", "P4").to_string(),
            receiving_urgent_priority: store.get_str("receiving_urgent_priority", "P2").to_string(),
            receiving_critical_priority: store.get_str("receiving_critical_priority", "P1").to_string(),
            overtime_evaluation_interval_minutes: store.get_int("overtime_evaluation_interval_minutes", 60),
            snapshot_interval_minutes: store.get_int("snapshot_interval_minutes", 15),
            urgent_receiving_item_codes: store.get_list("urgent_receiving_item_codes", ""),
            bulk_quantity_threshold: store.get_int("bulk_quantity_threshold", 500),
        };

        if cfg.min_task_duration > cfg.max_task_duration {
            return Err(EngineError::Config(format!(
                "min_task_duration ({}) exceeds max_task_duration ({})",
                cfg.min_task_duration, cfg.max_task_duration
            )));
        }

        Ok(cfg)
    }

    pub fn clamp_duration(&self, minutes: f64) -> f64 {
        minutes.clamp(self.min_task_duration, self.max_task_duration)
    }
}
