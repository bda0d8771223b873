//! Route/Wave Catalog (C4).
//!
//! Groups outbound orders into delivery waves keyed by delivery time,
//! derives `latest_cutoff = max(cutoffs)` per wave, and tracks cross-day
//! wave boundaries.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};

use crate::error::EngineResult;
use crate::master_data::{resolve_schedule_times, MasterData};

#[derive(Debug, Clone)]
pub struct DeliveryWave {
    pub wave_id: String,
    pub delivery_time: NaiveTime,
    pub latest_cutoff: NaiveTime,
    /// True when `delivery_time` falls on the day after the order cutoffs
    /// feeding it.
    pub crosses_midnight: bool,
    pub route_partcustids: Vec<(String, String)>,
}

/// Route/partcustid -> wave id, for reverse lookup when classifying a
/// single order.
#[derive(Debug, Default)]
pub struct WaveCatalog {
    waves: Vec<DeliveryWave>,
    reverse: HashMap<(String, String), String>,
}

impl WaveCatalog {
    /// Builds the day's wave catalog from the master-data route schedule.
    /// Entries are grouped by `delivery_time_raw`; a wave's id is derived
    /// from that delivery time so it is stable across runs for the same
    /// schedule.
    pub fn build(master_data: &MasterData) -> EngineResult<Self> {
        let mut by_delivery: HashMap<NaiveTime, Vec<(String, String, NaiveTime)>> = HashMap::new();

        for entry in master_data.route_schedule() {
            let (cutoff, delivery) = resolve_schedule_times(entry)?;
            by_delivery.entry(delivery).or_default().push((
                entry.route_code.clone(),
                entry.partcustid.clone(),
                cutoff,
            ));
        }

        let mut waves = Vec::new();
        let mut reverse = HashMap::new();

        let mut delivery_times: Vec<_> = by_delivery.keys().copied().collect();
        delivery_times.sort();

        for delivery_time in delivery_times {
            let rows = &by_delivery[&delivery_time];
            let latest_cutoff = rows.iter().map(|(_, _, c)| *c).max().expect("non-empty group");
            let wave_id = format!("W{:02}{:02}", delivery_time.format("%H"), delivery_time.format("%M"));
            let crosses_midnight = latest_cutoff.hour() >= 20 && delivery_time.hour() <= 12;

            let route_partcustids: Vec<(String, String)> =
                rows.iter().map(|(r, p, _)| (r.clone(), p.clone())).collect();

            for (route, partcustid) in &route_partcustids {
                reverse.insert((route.clone(), partcustid.clone()), wave_id.clone());
            }

            waves.push(DeliveryWave {
                wave_id,
                delivery_time,
                latest_cutoff,
                crosses_midnight,
                route_partcustids,
            });
        }

        Ok(Self { waves, reverse })
    }

    pub fn waves(&self) -> &[DeliveryWave] {
        &self.waves
    }

    pub fn wave_for(&self, route_code: &str, partcustid: &str) -> Option<&DeliveryWave> {
        let wave_id = self.reverse.get(&(route_code.to_string(), partcustid.to_string()))?;
        self.waves.iter().find(|w| &w.wave_id == wave_id)
    }

    pub fn wave_by_id(&self, wave_id: &str) -> Option<&DeliveryWave> {
        self.waves.iter().find(|w| w.wave_id == wave_id)
    }
}

use chrono::Timelike;

/// Determines whether `order_date` is the cutoff day or the day before
/// the wave's delivery, for waves that cross midnight.
pub fn wave_order_date(wave: &DeliveryWave, delivery_date: NaiveDate) -> NaiveDate {
    if wave.crosses_midnight {
        delivery_date - chrono::Duration::days(1)
    } else {
        delivery_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master_data::RouteScheduleEntry;

    #[test]
    fn groups_by_delivery_time_and_takes_max_cutoff() {
        let mut md = MasterData::new();
        md.add_route_schedule_entry(RouteScheduleEntry {
            route_code: "R1".into(),
            partcustid: "C1".into(),
            order_cutoff_raw: "900".into(),
            delivery_time_raw: "1100".into(),
        });
        md.add_route_schedule_entry(RouteScheduleEntry {
            route_code: "R2".into(),
            partcustid: "C2".into(),
            order_cutoff_raw: "945".into(),
            delivery_time_raw: "1100".into(),
        });
        let catalog = WaveCatalog::build(&md).unwrap();
        assert_eq!(catalog.waves().len(), 1);
        let wave = &catalog.waves()[0];
        assert_eq!(wave.latest_cutoff, NaiveTime::from_hms_opt(9, 45, 0).unwrap());
        assert_eq!(wave.route_partcustids.len(), 2);
    }

    #[test]
    fn reverse_lookup_finds_wave_by_route_and_partcustid() {
        let mut md = MasterData::new();
        md.add_route_schedule_entry(RouteScheduleEntry {
            route_code: "R1".into(),
            partcustid: "C1".into(),
            order_cutoff_raw: "900".into(),
            delivery_time_raw: "1100".into(),
        });
        let catalog = WaveCatalog::build(&md).unwrap();
        let wave = catalog.wave_for("R1", "C1").expect("wave found");
        assert_eq!(wave.delivery_time, NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    }

    #[test]
    fn cross_midnight_wave_flagged() {
        let mut md = MasterData::new();
        md.add_route_schedule_entry(RouteScheduleEntry {
            route_code: "R1".into(),
            partcustid: "C1".into(),
            order_cutoff_raw: "2100".into(),
            delivery_time_raw: "600".into(),
        });
        let catalog = WaveCatalog::build(&md).unwrap();
        let wave = &catalog.waves()[0];
        assert!(wave.crosses_midnight);
    }
}
