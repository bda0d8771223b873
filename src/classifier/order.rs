//! Order Classifier (C5).
//!
//! Assigns priority class and deadline-feasibility to each outbound order
//! from route-code and transaction code alone — no item lookups, no
//! randomness.

use chrono::NaiveTime;

use crate::config::EngineConfig;
use crate::master_data::{resolve_schedule_times, MasterData};
use crate::task::PriorityClass;
use crate::time_util::{self, AvailableMinutes};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Normal,
    Urgent,
    Other,
    SubWarehouse,
}

#[derive(Debug, Clone)]
pub struct OrderClassification {
    pub priority_class: PriorityClass,
    pub order_type: OrderType,
    pub delivery_time: Option<NaiveTime>,
    pub cutoff: Option<NaiveTime>,
    pub available_minutes: Option<f64>,
    pub is_late: bool,
    pub schedule_found: bool,
    pub time_invalid: bool,
}

const SUB_WAREHOUSE_DELIVERY: (u32, u32) = (17, 0);
const SUB_WAREHOUSE_CUTOFF: (u32, u32) = (16, 30);

/// Classifies a single order. `order_time_raw` is the raw intake time
/// field (numeric HHMM or literal `HH:MM[:SS]`).
pub fn classify_order(
    config: &EngineConfig,
    master_data: &MasterData,
    route_code: &str,
    partcustid: &str,
    transaction_code: &str,
    order_time_raw: &str,
) -> OrderClassification {
    let (priority_class, order_type) = classify_priority(config, route_code, partcustid, transaction_code);

    let is_sub_warehouse = order_type == OrderType::SubWarehouse;

    let (delivery, cutoff, schedule_found) = if is_sub_warehouse {
        (
            NaiveTime::from_hms_opt(SUB_WAREHOUSE_DELIVERY.0, SUB_WAREHOUSE_DELIVERY.1, 0),
            NaiveTime::from_hms_opt(SUB_WAREHOUSE_CUTOFF.0, SUB_WAREHOUSE_CUTOFF.1, 0),
            true,
        )
    } else {
        match master_data.find_schedule(route_code, partcustid) {
            Some(entry) => match resolve_schedule_times(entry) {
                Ok((cutoff, delivery)) => (Some(delivery), Some(cutoff), true),
                Err(_) => (None, None, false),
            },
            None => (None, None, false),
        }
    };

    let order_time = time_util::parse_hhmm(order_time_raw).ok();

    let mut available_minutes = None;
    let mut is_late = false;
    let mut time_invalid = false;

    if let (Some(delivery), Some(order_time)) = (delivery, order_time) {
        match time_util::available_minutes(order_time, delivery) {
            AvailableMinutes::Minutes(m) => available_minutes = Some(m as f64),
            AvailableMinutes::Invalid => time_invalid = true,
        }
    }

    if let (Some(cutoff), Some(order_time)) = (cutoff, order_time) {
        is_late = time_util::is_late(order_time, cutoff);
    }

    OrderClassification {
        priority_class,
        order_type,
        delivery_time: delivery,
        cutoff,
        available_minutes,
        is_late,
        schedule_found,
        time_invalid,
    }
}

fn classify_priority(
    config: &EngineConfig,
    route_code: &str,
    partcustid: &str,
    transaction_code: &str,
) -> (PriorityClass, OrderType) {
    if config.sub_warehouse_routes.iter().any(|r| r == route_code) {
        return (PriorityClass::P3, OrderType::SubWarehouse);
    }
    if (route_code == "R15" && partcustid == "SDTC") || (route_code == "R16" && partcustid == "SDHN") {
        return (PriorityClass::P3, OrderType::SubWarehouse);
    }
    if config.normal_transcd_list.iter().any(|t| t == transaction_code) {
        return (PriorityClass::P1, OrderType::Normal);
    }
    if config.urgent_transcd_list.iter().any(|t| t == transaction_code) {
        return (PriorityClass::P2, OrderType::Urgent);
    }
    (PriorityClass::P2, OrderType::Other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParameterStore;
    use crate::master_data::RouteScheduleEntry;

    fn cfg() -> EngineConfig {
        EngineConfig::from_store(&ParameterStore::new()).unwrap()
    }

    #[test]
    fn sub_warehouse_route_short_circuits() {
        let md = MasterData::new();
        let c = classify_order(&cfg(), &md, "SDTC", "X", "1", "900");
        assert_eq!(c.priority_class, PriorityClass::P3);
        assert_eq!(c.order_type, OrderType::SubWarehouse);
        assert!(c.schedule_found);
        assert_eq!(c.delivery_time, NaiveTime::from_hms_opt(17, 0, 0));
    }

    #[test]
    fn r15_sdtc_combo_is_sub_warehouse() {
        let md = MasterData::new();
        let c = classify_order(&cfg(), &md, "R15", "SDTC", "1", "900");
        assert_eq!(c.order_type, OrderType::SubWarehouse);
    }

    #[test]
    fn normal_transcd_yields_p1() {
        let mut md = MasterData::new();
        md.add_route_schedule_entry(RouteScheduleEntry {
            route_code: "R1".into(),
            partcustid: "C1".into(),
            order_cutoff_raw: "930".into(),
            delivery_time_raw: "1100".into(),
        });
        let c = classify_order(&cfg(), &md, "R1", "C1", "1", "900");
        assert_eq!(c.priority_class, PriorityClass::P1);
        assert_eq!(c.order_type, OrderType::Normal);
        assert!(!c.is_late);
        assert_eq!(c.available_minutes, Some(120.0));
    }

    #[test]
    fn missing_schedule_flagged() {
        let md = MasterData::new();
        let c = classify_order(&cfg(), &md, "R1", "C1", "1", "900");
        assert!(!c.schedule_found);
        assert_eq!(c.available_minutes, None);
    }

    #[test]
    fn large_gap_without_cross_midnight_shape_is_invalid() {
        let mut md = MasterData::new();
        md.add_route_schedule_entry(RouteScheduleEntry {
            route_code: "R1".into(),
            partcustid: "C1".into(),
            order_cutoff_raw: "1700".into(),
            delivery_time_raw: "900".into(),
        });
        let c = classify_order(&cfg(), &md, "R1", "C1", "1", "1600");
        assert!(c.time_invalid);
    }

    #[test]
    fn cross_midnight_order_computed() {
        let mut md = MasterData::new();
        md.add_route_schedule_entry(RouteScheduleEntry {
            route_code: "R1".into(),
            partcustid: "C1".into(),
            order_cutoff_raw: "2200".into(),
            delivery_time_raw: "600".into(),
        });
        let c = classify_order(&cfg(), &md, "R1", "C1", "1", "2130");
        assert!(!c.time_invalid);
        assert!(c.available_minutes.is_some());
    }

    #[test]
    fn is_late_compares_same_day() {
        let mut md = MasterData::new();
        md.add_route_schedule_entry(RouteScheduleEntry {
            route_code: "R1".into(),
            partcustid: "C1".into(),
            order_cutoff_raw: "900".into(),
            delivery_time_raw: "1100".into(),
        });
        let c = classify_order(&cfg(), &md, "R1", "C1", "1", "930");
        assert!(c.is_late);
    }
}
