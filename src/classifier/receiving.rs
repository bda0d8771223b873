//! Receiving Classifier (C6).
//!
//! Assigns each inbound receiving record a completion deadline and an
//! urgency tier.

use chrono::NaiveDate;

use crate::config::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReceivingUrgency {
    Normal,
    Urgent,
    Critical,
}

#[derive(Debug, Clone)]
pub struct ReceivingClassification {
    pub deadline_date: NaiveDate,
    pub days_since_arrival: i64,
    pub is_overdue: bool,
    pub urgency: ReceivingUrgency,
}

/// Classifies a receiving record as of `current_date`. `item_code` and
/// `quantity` drive the urgent-items/bulk-quantity override.
pub fn classify_receiving(
    config: &EngineConfig,
    arrival_date: NaiveDate,
    current_date: NaiveDate,
    item_code: &str,
    quantity: u32,
) -> ReceivingClassification {
    let deadline_date = arrival_date + chrono::Duration::days(config.receiving_completion_days - 1);
    let days_since_arrival = (current_date - arrival_date).num_days();
    let is_overdue = current_date > deadline_date;
    let due_today = current_date == deadline_date;
    let due_tomorrow = current_date == deadline_date - chrono::Duration::days(1);

    let urgency = if is_overdue {
        ReceivingUrgency::Critical
    } else if due_today {
        ReceivingUrgency::Urgent
    } else if config.urgent_receiving_item_codes.iter().any(|c| c == item_code)
        || quantity as i64 >= config.bulk_quantity_threshold
    {
        ReceivingUrgency::Urgent
    } else if due_tomorrow {
        ReceivingUrgency::Urgent
    } else {
        ReceivingUrgency::Normal
    };

    ReceivingClassification { deadline_date, days_since_arrival, is_overdue, urgency }
}
