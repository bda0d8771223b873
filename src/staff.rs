//! Staff Roster (C9).
//!
//! Daily per-floor staff selection with stochastic shortage and
//! duplicate-avoidance across floors, under a single-shift model.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::master_data::MasterData;
use crate::rng::EngineRng;

#[derive(Debug, Clone)]
pub struct Staff {
    pub staff_id: String,
    pub home_floor: String,
    pub skill_level: u8,
    pub capacity_multiplier: f64,
    pub max_hours_per_day: f64,
}

/// One staff member's shift on one day at one station.
#[derive(Debug, Clone)]
pub struct ShiftAssignment {
    pub date: NaiveDate,
    pub station_id: String,
    pub staff_id: String,
    pub shift_start: chrono::NaiveTime,
    pub shift_end: chrono::NaiveTime,
    pub is_overtime: bool,
    /// Minutes of task time already charged against this staff member
    /// today, used to enforce `max_hours_per_day`.
    pub minutes_worked: f64,
}

/// The day's roster: which staff are present, per floor, with
/// duplicate-avoidance across floors.
#[derive(Debug, Default, Clone)]
pub struct DailyRoster {
    pub date: Option<NaiveDate>,
    pub present_by_floor: std::collections::HashMap<u8, Vec<Staff>>,
    pub shifts: Vec<ShiftAssignment>,
}

impl DailyRoster {
    pub fn staff_on_floor(&self, floor: u8) -> &[Staff] {
        self.present_by_floor.get(&floor).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn minutes_worked(&self, staff_id: &str) -> f64 {
        self.shifts.iter().filter(|s| s.staff_id == staff_id).map(|s| s.minutes_worked).sum()
    }

    pub fn charge_minutes(&mut self, staff_id: &str, minutes: f64) {
        if let Some(shift) = self.shifts.iter_mut().find(|s| s.staff_id == staff_id) {
            shift.minutes_worked += minutes;
        }
    }

    pub fn remaining_minutes(&self, staff_id: &str, max_hours_per_day: f64) -> f64 {
        (max_hours_per_day * 60.0 - self.minutes_worked(staff_id)).max(0.0)
    }
}

/// Builds the daily roster for the given date: per floor, draw the planned
/// headcount (possibly reduced by a shortage draw), picking distinct staff
/// ids and avoiding anyone already picked for another floor that day.
pub fn generate_daily_roster(
    master_data: &MasterData,
    config: &EngineConfig,
    date: NaiveDate,
    rng: &mut EngineRng,
) -> DailyRoster {
    let mut roster = DailyRoster { date: Some(date), ..Default::default() };
    let mut already_picked: HashSet<String> = HashSet::new();

    let shift_start = crate::time_util::parse_hms(&config.shift_start_time).unwrap_or_else(|_| {
        chrono::NaiveTime::from_hms_opt(8, 50, 0).expect("valid fallback shift start")
    });
    let shift_end = crate::time_util::parse_hms(&config.shift_end_time).unwrap_or_else(|_| {
        chrono::NaiveTime::from_hms_opt(17, 30, 0).expect("valid fallback shift end")
    });

    for floor in [2u8, 3u8, 4u8] {
        let planned = match floor {
            2 => config.planned_staff_2f,
            3 => config.planned_staff_3f,
            _ => config.planned_staff_4f,
        };

        let mut target = planned;
        if rng.chance(config.staff_shortage_probability) {
            let reduction = rng.uniform_int(config.staff_shortage_reduction_min, config.staff_shortage_reduction_max);
            target = (planned - reduction).max(0);
        }

        let eligible: Vec<_> = master_data
            .staff_for_floor(floor)
            .filter(|s| !already_picked.contains(&s.staff_id))
            .cloned()
            .collect();

        let mut picked = Vec::new();
        for candidate in eligible.into_iter() {
            if picked.len() as i64 >= target {
                break;
            }
            already_picked.insert(candidate.staff_id.clone());
            picked.push(Staff {
                staff_id: candidate.staff_id.clone(),
                home_floor: candidate.home_floor.clone(),
                skill_level: candidate.skill_level,
                capacity_multiplier: candidate.capacity_multiplier,
                max_hours_per_day: candidate.max_hours_per_day,
            });
        }

        for staff in &picked {
            roster.shifts.push(ShiftAssignment {
                date,
                station_id: String::new(),
                staff_id: staff.staff_id.clone(),
                shift_start,
                shift_end,
                is_overtime: false,
                minutes_worked: 0.0,
            });
        }

        roster.present_by_floor.insert(floor, picked);
    }

    roster
}
