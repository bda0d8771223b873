//! Scheduler (C13).
//!
//! Pumps the event queue, advances simulated time, and dispatches the
//! handler contract for every event type the daily schedule produces. This
//! is the sole catch point for `EngineError::HandlerException`: other
//! handlers' errors are logged and folded into the run's error list rather
//! than unwinding across the dispatch loop.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::assignment::{self, AssignmentOutcome};
use crate::classifier::{classify_order, classify_receiving, OrderType};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::event::{priority, Event, EventPayload, EventQueue, EventType};
use crate::exception::{self, Exception, ExceptionStatus};
use crate::master_data::{ItemKey, MasterData, OrderRecord, ReceivingRecord};
use crate::metrics::StateTracker;
use crate::overtime;
use crate::rng::EngineRng;
use crate::staff::{self, DailyRoster};
use crate::station::StationPool;
use crate::task::{self, PriorityClass, ReceivingInfo, ShippingInfo, Task, TaskStatus, TaskType};
use crate::wave::WaveCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    Completed,
    Aborted,
}

#[derive(Debug, Default, Serialize)]
pub struct RunOutcome {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub daily_summaries: Vec<DailySummary>,
    pub metrics: crate::metrics::SystemMetrics,
    pub status: Option<RunStatus>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub tasks_completed: usize,
    pub tasks_overtime: usize,
    pub exceptions_detected: usize,
}

/// Owns every piece of mutable simulation state and drives it through
/// simulated time via the event queue.
pub struct Scheduler {
    pub config: EngineConfig,
    master_data: MasterData,
    queue: EventQueue,
    rng: EngineRng,
    stations: StationPool,
    wave_catalog: WaveCatalog,
    tasks: HashMap<String, Task>,
    task_sequence: u64,
    roster: DailyRoster,
    exceptions: HashMap<String, Exception>,
    exception_sequence: u64,
    leaders_free: usize,
    wave_task_ids: HashMap<String, HashSet<String>>,
    wave_completed: HashSet<String>,
    orders: Vec<OrderRecord>,
    receiving_records: Vec<ReceivingRecord>,
    state_tracker: StateTracker,
    errors: Vec<String>,
    warnings: Vec<String>,
    daily_summaries: Vec<DailySummary>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl Scheduler {
    pub fn new(master_data: MasterData, config: EngineConfig, seed: Option<u64>) -> EngineResult<Self> {
        master_data.validate()?;
        let wave_catalog = WaveCatalog::build(&master_data)?;
        let stations = StationPool::build(&master_data);
        let leaders_free = config.leader_count.max(0) as usize;

        Ok(Self {
            config,
            master_data,
            queue: EventQueue::new(),
            rng: EngineRng::new(seed),
            stations,
            wave_catalog,
            tasks: HashMap::new(),
            task_sequence: 0,
            roster: DailyRoster::default(),
            exceptions: HashMap::new(),
            exception_sequence: 0,
            leaders_free,
            wave_task_ids: HashMap::new(),
            wave_completed: HashSet::new(),
            orders: Vec::new(),
            receiving_records: Vec::new(),
            state_tracker: StateTracker::new(500),
            errors: Vec::new(),
            warnings: Vec::new(),
            daily_summaries: Vec::new(),
            start_date: None,
            end_date: None,
        })
    }

    pub fn load_orders(&mut self, orders: Vec<OrderRecord>) {
        self.orders = orders;
    }

    pub fn load_receiving(&mut self, records: Vec<ReceivingRecord>) {
        self.receiving_records = records;
    }

    /// Enqueues the bookend and per-weekday recurring events for
    /// `[start_date, end_date]`.
    pub fn initialize(&mut self, start_date: NaiveDate, end_date: NaiveDate) -> EngineResult<()> {
        self.start_date = Some(start_date);
        self.end_date = Some(end_date);

        let sim_start = crate::time_util::combine(start_date, chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        self.queue.schedule(EventType::SimulationStart, sim_start, priority::HIGHEST, EventPayload::default());

        let mut date = start_date;
        while date <= end_date {
            if crate::time_util::is_workday(date) {
                self.enqueue_day(date);
            }
            date += chrono::Duration::days(1);
        }

        let sim_end = crate::time_util::combine(end_date, chrono::NaiveTime::from_hms_opt(23, 59, 59).unwrap());
        self.queue.schedule(EventType::SimulationEnd, sim_end, priority::LOW, EventPayload::default());

        Ok(())
    }

    fn enqueue_day(&mut self, date: NaiveDate) {
        let at = |h: u32, m: u32| crate::time_util::combine(date, chrono::NaiveTime::from_hms_opt(h, m, 0).unwrap());

        self.queue.schedule(
            EventType::DailyScheduleGenerate,
            at(6, 0),
            priority::NORMAL,
            EventPayload { date: Some(date), ..Default::default() },
        );
        self.queue.schedule(
            EventType::ReceivingLoad,
            at(8, 0),
            priority::NORMAL,
            EventPayload { date: Some(date), ..Default::default() },
        );
        for hour in [10, 14, 16] {
            self.queue.schedule(
                EventType::ReceivingDeadlineCheck,
                at(hour, 0),
                priority::NORMAL,
                EventPayload { date: Some(date), ..Default::default() },
            );
        }
        self.queue.schedule(
            EventType::EndOfDayProcessing,
            at(17, 0),
            priority::NORMAL,
            EventPayload { date: Some(date), ..Default::default() },
        );

        let mut hour = 8;
        while hour <= 20 {
            self.queue.schedule(
                EventType::OvertimeEvaluation,
                at(hour, 0),
                priority::LOW,
                EventPayload { date: Some(date), ..Default::default() },
            );
            hour += (self.config.overtime_evaluation_interval_minutes / 60).max(1);
        }

        let mut minute_mark = 0i64;
        while minute_mark < 24 * 60 {
            let h = (minute_mark / 60) as u32;
            let m = (minute_mark % 60) as u32;
            self.queue.schedule(
                EventType::SystemStatusUpdate,
                at(h, m),
                priority::LOW,
                EventPayload { date: Some(date), ..Default::default() },
            );
            minute_mark += self.config.snapshot_interval_minutes.max(1);
        }
    }

    /// Drains the event queue, dispatching each event's handler, until
    /// empty or `SIMULATION_END` is processed.
    pub fn run(&mut self) -> EngineResult<RunOutcome> {
        loop {
            let Some(event) = self.queue.pop() else { break };
            let now = event.scheduled_time;

            let result = self.dispatch(&event, now);
            if let Err(err) = result {
                if event.event_type == EventType::SimulationStart {
                    error!(event_type = %event.event_type, error = %err, "aborting on SIMULATION_START failure");
                    return Ok(RunOutcome {
                        errors: vec![err.to_string()],
                        warnings: std::mem::take(&mut self.warnings),
                        daily_summaries: std::mem::take(&mut self.daily_summaries),
                        metrics: self.state_tracker.latest_metrics().cloned().unwrap_or_default(),
                        status: Some(RunStatus::Aborted),
                    });
                }
                error!(event_type = %event.event_type, error = %err, "handler exception");
                self.errors.push(err.to_string());
            }

            if event.event_type == EventType::SimulationEnd {
                info!("SIMULATION_END processed, terminating dispatch loop");
                break;
            }
        }

        Ok(RunOutcome {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
            daily_summaries: std::mem::take(&mut self.daily_summaries),
            metrics: self.state_tracker.latest_metrics().cloned().unwrap_or_default(),
            status: Some(RunStatus::Completed),
        })
    }

    fn dispatch(&mut self, event: &Event, now: NaiveDateTime) -> EngineResult<()> {
        debug!(event_type = %event.event_type, at = %now, "dispatching event");
        match event.event_type {
            EventType::SimulationStart => self.handle_simulation_start(now),
            EventType::SimulationEnd => Ok(()),
            EventType::DailyScheduleGenerate => self.handle_daily_schedule_generate(event),
            EventType::ReceivingLoad => self.handle_receiving_load(event, now),
            EventType::ReceivingTaskAssign => self.handle_task_assign(now, TaskType::Receiving),
            EventType::ReceivingDeadlineCheck => self.handle_receiving_deadline_check(event, now),
            EventType::EndOfDayProcessing => self.handle_end_of_day(event, now),
            EventType::TaskAssign => self.handle_task_assign(now, TaskType::Shipping),
            EventType::TaskStart => self.handle_task_start(event, now),
            EventType::TaskComplete => self.handle_task_complete(event, now),
            EventType::StationStartupComplete => Ok(()),
            EventType::StationBecomeIdle => self.handle_station_become_idle(event),
            EventType::WaveCompletionCheck => self.handle_wave_completion_check(event, now),
            EventType::OvertimeEvaluation => self.handle_overtime_evaluation(now),
            EventType::OvertimeStart => self.handle_overtime_start(event, now),
            EventType::OvertimeEnd => self.handle_overtime_end(event, now),
            EventType::ExceptionDetected => self.handle_exception_detected(event, now),
            EventType::ExceptionResolved => self.handle_exception_resolved(event, now),
            EventType::SystemStatusUpdate => self.handle_system_status_update(now),
        }
    }

    fn next_task_id(&mut self, prefix: &str) -> String {
        self.task_sequence += 1;
        format!("{prefix}-{}", self.task_sequence)
    }

    fn next_exception_id(&mut self) -> String {
        self.exception_sequence += 1;
        format!("EXC-{}", self.exception_sequence)
    }

    // --- handlers -------------------------------------------------------

    fn handle_simulation_start(&mut self, now: NaiveDateTime) -> EngineResult<()> {
        let orders = self.orders.clone();
        for order in &orders {
            self.classify_and_create_shipping_task(order, now)?;
        }
        Ok(())
    }

    fn classify_and_create_shipping_task(&mut self, order: &OrderRecord, now: NaiveDateTime) -> EngineResult<()> {
        let classification = classify_order(
            &self.config,
            &self.master_data,
            &order.route_code,
            &order.partcustid,
            &order.transaction_code,
            &order.order_time_raw,
        );

        if classification.time_invalid || !classification.schedule_found {
            let message = format!(
                "order {} skipped: schedule_found={} time_invalid={}",
                order.index_no, classification.schedule_found, classification.time_invalid
            );
            warn!(order = %order.index_no, %message, "order skipped");
            self.warnings.push(message);
            return Ok(());
        }

        let item_key: ItemKey = (order.family_code.clone(), order.part_number.clone());
        let item = self.master_data.item(&item_key);
        let (floor, requires_repack, mean_repack, mean_no_repack) = match item {
            Some(item) => (item.floor, item.requires_repack, item.mean_pick_time_repack, item.mean_pick_time_no_repack),
            None => {
                let message = format!("order {} references unknown item {:?}", order.index_no, item_key);
                warn!(%message, "item lookup miss");
                self.warnings.push(message);
                return Ok(());
            }
        };

        let estimated_duration =
            task::fixed_shipping_duration(&self.config, requires_repack, mean_repack, mean_no_repack);

        let wave_id = if classification.order_type == OrderType::SubWarehouse {
            None
        } else {
            self.wave_catalog.wave_for(&order.route_code, &order.partcustid).map(|w| w.wave_id.clone())
        };

        let delivery_deadline = classification.delivery_time.map(|t| crate::time_util::combine(now.date(), t));

        let task_id = self.next_task_id("SHIP");
        let task = Task {
            task_id: task_id.clone(),
            task_type: TaskType::Shipping,
            priority_class: classification.priority_class,
            floor,
            item_key,
            quantity: order.quantity,
            requires_repack,
            estimated_duration_minutes: estimated_duration,
            shipping: ShippingInfo {
                partcustid: Some(order.partcustid.clone()),
                route_code: Some(order.route_code.clone()),
                wave_id: wave_id.clone(),
                delivery_deadline,
                available_work_minutes: classification.available_minutes.map(|m| m as i64),
            },
            receiving: ReceivingInfo::default(),
            assigned_station: None,
            assigned_staff: None,
            status: TaskStatus::Pending,
            planned_start: None,
            planned_completion: None,
            actual_start: None,
            actual_completion: None,
            actual_duration: None,
            superseded_by: None,
            remaining_duration_override: None,
        };

        if let Some(wave_id) = &wave_id {
            self.wave_task_ids.entry(wave_id.clone()).or_default().insert(task_id.clone());
        }

        let delay_minutes = match classification.priority_class {
            PriorityClass::P1 => self.rng.uniform(5.0, 15.0),
            PriorityClass::P2 => self.rng.uniform(15.0, 45.0),
            _ => self.rng.uniform(30.0, 90.0),
        };
        let assign_at = now + chrono::Duration::seconds((delay_minutes * 60.0) as i64);

        self.tasks.insert(task_id.clone(), task);
        self.queue.schedule(
            EventType::TaskAssign,
            assign_at,
            priority::NORMAL,
            EventPayload { task_id: Some(task_id), ..Default::default() },
        );

        Ok(())
    }

    fn handle_daily_schedule_generate(&mut self, event: &Event) -> EngineResult<()> {
        let date = event.payload.date.ok_or_else(|| EngineError::Config("missing date payload".into()))?;
        self.roster = staff::generate_daily_roster(&self.master_data, &self.config, date, &mut self.rng);
        Ok(())
    }

    fn handle_receiving_load(&mut self, event: &Event, now: NaiveDateTime) -> EngineResult<()> {
        let date = event.payload.date.ok_or_else(|| EngineError::Config("missing date payload".into()))?;
        let records = self.receiving_records.clone();
        for record in records.iter().filter(|r| r.arrival_date == date) {
            self.create_receiving_task(record, date)?;
        }
        self.queue.schedule(
            EventType::ReceivingTaskAssign,
            now + chrono::Duration::minutes(30),
            priority::NORMAL,
            EventPayload { date: Some(date), ..Default::default() },
        );
        Ok(())
    }

    fn create_receiving_task(&mut self, record: &ReceivingRecord, current_date: NaiveDate) -> EngineResult<()> {
        let classification = classify_receiving(
            &self.config,
            record.arrival_date,
            current_date,
            &record.family_code,
            record.quantity,
        );

        let item_key: ItemKey = (record.family_code.clone(), record.part_number.clone());
        let floor = self.master_data.item(&item_key).map(|i| i.floor).unwrap_or(2);

        let priority_class = match classification.urgency {
            crate::classifier::ReceivingUrgency::Critical => PriorityClass::P1,
            crate::classifier::ReceivingUrgency::Urgent => PriorityClass::P2,
            crate::classifier::ReceivingUrgency::Normal => PriorityClass::P4,
        };

        let estimated_duration = task::fixed_receiving_duration(&self.config, record.quantity);
        let task_id = self.next_task_id("RECV");

        let task = Task {
            task_id: task_id.clone(),
            task_type: TaskType::Receiving,
            priority_class,
            floor,
            item_key,
            quantity: record.quantity,
            requires_repack: false,
            estimated_duration_minutes: estimated_duration,
            shipping: ShippingInfo::default(),
            receiving: ReceivingInfo {
                arrival_date: Some(record.arrival_date),
                deadline_date: Some(classification.deadline_date),
                days_since_arrival: Some(classification.days_since_arrival),
                is_overdue: classification.is_overdue,
            },
            assigned_station: None,
            assigned_staff: None,
            status: TaskStatus::Pending,
            planned_start: None,
            planned_completion: None,
            actual_start: None,
            actual_completion: None,
            actual_duration: None,
            superseded_by: None,
            remaining_duration_override: None,
        };

        self.tasks.insert(task_id, task);
        Ok(())
    }

    fn handle_task_assign(&mut self, now: NaiveDateTime, task_type: TaskType) -> EngineResult<()> {
        let floors: Vec<u8> = self.tasks.values().filter(|t| t.task_type == task_type).map(|t| t.floor).collect();
        let floors: HashSet<u8> = floors.into_iter().collect();

        for floor in floors {
            let mut floor_tasks: Vec<Task> = self
                .tasks
                .values()
                .filter(|t| t.floor == floor && t.status == TaskStatus::Pending)
                .cloned()
                .collect();

            if floor_tasks.is_empty() {
                continue;
            }

            let outcome: AssignmentOutcome = assignment::run_assignment_pipeline(
                &self.config,
                &mut self.stations,
                &self.wave_catalog,
                floor,
                now,
                &mut floor_tasks,
            );

            for task in floor_tasks {
                self.tasks.insert(task.task_id.clone(), task);
            }

            for placement in &outcome.placements {
                self.queue.schedule(
                    EventType::TaskStart,
                    placement.planned_start,
                    priority::NORMAL,
                    EventPayload { task_id: Some(placement.task_id.clone()), ..Default::default() },
                );
            }

            for task_id in &outcome.forward_to_overtime {
                self.queue.schedule(
                    EventType::OvertimeStart,
                    now,
                    priority::HIGH,
                    EventPayload { task_id: Some(task_id.clone()), ..Default::default() },
                );
            }
        }

        Ok(())
    }

    fn handle_task_start(&mut self, event: &Event, now: NaiveDateTime) -> EngineResult<()> {
        let task_id = event.payload.task_id.clone().ok_or_else(|| EngineError::Config("missing task_id".into()))?;

        let exception_probability = {
            let Some(task) = self.tasks.get(&task_id) else { return Ok(()) };
            match task.task_type {
                TaskType::Receiving => self.config.exception_probability_receiving,
                _ => self.config.exception_probability_shipping,
            }
        };

        if self.rng.chance(exception_probability) {
            self.queue.schedule(
                EventType::ExceptionDetected,
                now,
                priority::HIGH,
                EventPayload { task_id: Some(task_id), ..Default::default() },
            );
            return Ok(());
        }

        self.begin_execution(&task_id, now);
        Ok(())
    }

    /// Transitions an ASSIGNED task to IN_PROGRESS and schedules its
    /// TASK_COMPLETE, applying the actual-duration jitter. Shared by the
    /// `TASK_START` no-exception path and by exception resolution for a
    /// task that was blocked pre-roll rather than preempted mid-flight.
    fn begin_execution(&mut self, task_id: &str, now: NaiveDateTime) {
        let Some(task) = self.tasks.get_mut(task_id) else { return };
        let actual = task::actual_duration(&self.config, task.estimated_duration_minutes, None, &mut self.rng);
        task.mark_in_progress(now, actual);
        let wave_id = task.shipping.wave_id.clone();

        self.queue.schedule(
            EventType::TaskComplete,
            now + chrono::Duration::seconds((actual * 60.0) as i64),
            priority::NORMAL,
            EventPayload { task_id: Some(task_id.to_string()), wave_id, ..Default::default() },
        );
    }

    fn handle_task_complete(&mut self, event: &Event, now: NaiveDateTime) -> EngineResult<()> {
        let task_id = event.payload.task_id.clone().ok_or_else(|| EngineError::Config("missing task_id".into()))?;
        let station_id = self.tasks.get(&task_id).and_then(|t| t.assigned_station.clone());

        if let Some(task) = self.tasks.get_mut(&task_id) {
            task.mark_completed(now);
        }

        if let Some(station_id) = station_id {
            self.queue.schedule(
                EventType::StationBecomeIdle,
                now,
                priority::HIGHEST,
                EventPayload { station_id: Some(station_id), ..Default::default() },
            );
        }

        if let Some(wave_id) = event.payload.wave_id.clone() {
            self.queue.schedule(
                EventType::WaveCompletionCheck,
                now + chrono::Duration::seconds(1),
                priority::NORMAL,
                EventPayload { wave_id: Some(wave_id), ..Default::default() },
            );
        }

        Ok(())
    }

    fn handle_station_become_idle(&mut self, event: &Event) -> EngineResult<()> {
        if let Some(station_id) = &event.payload.station_id {
            if let Some(station) = self.stations.get_mut(station_id) {
                station.status = crate::station::StationStatus::Idle;
                station.current_task_id = None;
            }
        }
        Ok(())
    }

    fn handle_wave_completion_check(&mut self, event: &Event, _now: NaiveDateTime) -> EngineResult<()> {
        let Some(wave_id) = &event.payload.wave_id else { return Ok(()) };
        let Some(task_ids) = self.wave_task_ids.get(wave_id) else { return Ok(()) };

        let all_completed = task_ids
            .iter()
            .all(|id| self.tasks.get(id).map(|t| t.status == TaskStatus::Completed).unwrap_or(false));

        if all_completed {
            self.wave_completed.insert(wave_id.clone());
        }

        Ok(())
    }

    fn handle_receiving_deadline_check(&mut self, event: &Event, now: NaiveDateTime) -> EngineResult<()> {
        let date = event.payload.date.ok_or_else(|| EngineError::Config("missing date payload".into()))?;
        let incomplete_due_today: Vec<String> = self
            .tasks
            .values()
            .filter(|t| {
                t.task_type == TaskType::Receiving
                    && t.status != TaskStatus::Completed
                    && (t.receiving.is_overdue || t.receiving.deadline_date == Some(date))
            })
            .map(|t| t.task_id.clone())
            .collect();

        if now.time().hour() >= 15 && !incomplete_due_today.is_empty() {
            for task_id in incomplete_due_today {
                self.queue.schedule(
                    EventType::OvertimeStart,
                    now,
                    priority::HIGH,
                    EventPayload { task_id: Some(task_id), ..Default::default() },
                );
            }
        }

        Ok(())
    }

    fn handle_end_of_day(&mut self, event: &Event, now: NaiveDateTime) -> EngineResult<()> {
        let date = event.payload.date.ok_or_else(|| EngineError::Config("missing date payload".into()))?;

        let incomplete: Vec<String> = self
            .tasks
            .values()
            .filter(|t| {
                t.status != TaskStatus::Completed
                    && t.status != TaskStatus::Cancelled
                    && ((t.is_sub_warehouse()) || (t.task_type == TaskType::Receiving && t.receiving.deadline_date == Some(date)))
            })
            .map(|t| t.task_id.clone())
            .collect();

        let completed = self
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Completed && t.planned_completion.map(|p| p.date() == date).unwrap_or(false))
            .count();

        for task_id in &incomplete {
            self.queue.schedule(
                EventType::OvertimeStart,
                now,
                priority::HIGH,
                EventPayload { task_id: Some(task_id.clone()), ..Default::default() },
            );
        }

        self.daily_summaries.push(DailySummary {
            date,
            tasks_completed: completed,
            tasks_overtime: incomplete.len(),
            exceptions_detected: self.exceptions.len(),
        });

        Ok(())
    }

    fn handle_overtime_evaluation(&mut self, now: NaiveDateTime) -> EngineResult<()> {
        if !self.config.overtime_enabled {
            return Ok(());
        }

        let slipping: Vec<String> = self
            .tasks
            .values()
            .filter(|t| {
                t.status != TaskStatus::Completed
                    && t.status != TaskStatus::Cancelled
                    && t.shipping.delivery_deadline.map(|d| d < now).unwrap_or(false)
            })
            .map(|t| t.task_id.clone())
            .collect();

        for task_id in slipping {
            self.queue.schedule(
                EventType::OvertimeStart,
                now,
                priority::HIGH,
                EventPayload { task_id: Some(task_id), ..Default::default() },
            );
        }

        Ok(())
    }

    fn handle_overtime_start(&mut self, event: &Event, now: NaiveDateTime) -> EngineResult<()> {
        if !self.config.overtime_enabled {
            return Ok(());
        }
        let task_id = event.payload.task_id.clone().ok_or_else(|| EngineError::Config("missing task_id".into()))?;
        let Some(original) = self.tasks.get(&task_id).cloned() else { return Ok(()) };
        if original.status == TaskStatus::Completed || original.status == TaskStatus::Cancelled {
            return Ok(());
        }

        let remaining = original.estimated_duration_minutes;
        let window = overtime::compute_window(&self.config, remaining, now);
        let variant_id = self.next_task_id("OT");
        let variant = overtime::spawn_overtime_variant(&original, variant_id.clone(), &window);

        if let Some(original_mut) = self.tasks.get_mut(&task_id) {
            original_mut.mark_cancelled();
            original_mut.superseded_by = Some(variant_id.clone());
        }
        self.tasks.insert(variant_id.clone(), variant);

        self.queue.schedule(
            EventType::OvertimeEnd,
            window.end,
            priority::HIGH,
            EventPayload { task_id: Some(variant_id), ..Default::default() },
        );

        Ok(())
    }

    fn handle_overtime_end(&mut self, event: &Event, now: NaiveDateTime) -> EngineResult<()> {
        let task_id = event.payload.task_id.clone().ok_or_else(|| EngineError::Config("missing task_id".into()))?;
        if let Some(task) = self.tasks.get_mut(&task_id) {
            task.mark_completed(now);
        }
        Ok(())
    }

    fn handle_exception_detected(&mut self, event: &Event, now: NaiveDateTime) -> EngineResult<()> {
        let task_id = event.payload.task_id.clone().ok_or_else(|| EngineError::Config("missing task_id".into()))?;
        let Some(task) = self.tasks.get(&task_id) else { return Ok(()) };
        let task_priority = task.priority_class;

        let exception_id = self.next_exception_id();
        let exception = exception::sample_exception(exception_id.clone(), task_id.clone(), now, task_priority, &mut self.rng);
        self.exceptions.insert(exception_id.clone(), exception);

        self.try_assign_leader(&exception_id, now);
        Ok(())
    }

    fn try_assign_leader(&mut self, exception_id: &str, now: NaiveDateTime) {
        if self.leaders_free == 0 {
            return;
        }
        let Some(exception) = self.exceptions.get_mut(exception_id) else { return };
        if exception.status != ExceptionStatus::Detected {
            return;
        }
        self.leaders_free -= 1;
        exception.assigned_leader = Some(format!("LEADER-{}", self.leaders_free));
        exception.status = ExceptionStatus::Assigned;
        exception.assigned_at = Some(now);

        let may_preempt = exception::may_preempt(exception, self.config.task_interruption_allowed);
        let handling_minutes = exception.handling_minutes;
        let task_id = exception.task_id.clone();
        let exception_id = exception.exception_id.clone();

        if may_preempt {
            self.preempt_task(&task_id, &exception_id);
        }

        self.queue.schedule(
            EventType::ExceptionResolved,
            now + chrono::Duration::seconds((handling_minutes * 60.0) as i64),
            priority::HIGH,
            EventPayload { exception_id: Some(exception_id), ..Default::default() },
        );
    }

    fn preempt_task(&mut self, task_id: &str, exception_id: &str) {
        let Some(task) = self.tasks.get_mut(task_id) else { return };
        let station_id = task.assigned_station.clone();
        task.mark_paused();

        if let Some(station_id) = station_id {
            if let Some(station) = self.stations.get_mut(&station_id) {
                station.status = crate::station::StationStatus::Reserved;
                station.reserved_for_exception = true;
            }
            if let Some(exception) = self.exceptions.get_mut(exception_id) {
                exception.reserved_station = Some(station_id);
                exception.status = ExceptionStatus::InProgress;
            }
        }
    }

    fn handle_exception_resolved(&mut self, event: &Event, now: NaiveDateTime) -> EngineResult<()> {
        let Some(exception_id) = &event.payload.exception_id else { return Ok(()) };
        let Some(exception) = self.exceptions.remove(exception_id) else { return Ok(()) };

        self.leaders_free += 1;

        if let Some(station_id) = &exception.reserved_station {
            if let Some(station) = self.stations.get_mut(station_id) {
                station.reserved_for_exception = false;
                station.status = crate::station::StationStatus::Busy;
            }
        }

        let task_status = self.tasks.get(&exception.task_id).map(|t| t.status);
        match task_status {
            Some(TaskStatus::Paused) => {
                let task = self.tasks.get_mut(&exception.task_id).expect("status checked above");
                let remaining = task.preemption_resume_duration();
                task.status = TaskStatus::InProgress;
                task.remaining_duration_override = None;
                self.queue.schedule(
                    EventType::TaskComplete,
                    now + chrono::Duration::seconds((remaining * 60.0) as i64),
                    priority::NORMAL,
                    EventPayload { task_id: Some(exception.task_id.clone()), ..Default::default() },
                );
            }
            Some(TaskStatus::Assigned) => {
                // Blocked at the TASK_START pre-roll check rather than
                // preempted mid-flight: it never began executing, so resume
                // means starting it now rather than resuming a remainder.
                self.begin_execution(&exception.task_id, now);
            }
            _ => {}
        }

        Ok(())
    }

    /// Sweeps open exceptions for escalation. A still-DETECTED
    /// exception that escalates gets one more leader-assignment attempt;
    /// one already ASSIGNED/IN_PROGRESS just has its status flagged.
    fn sweep_exception_escalation(&mut self, now: NaiveDateTime) {
        let threshold = self.config.escalation_time_threshold;
        let to_escalate: Vec<String> = self
            .exceptions
            .iter()
            .filter(|(_, e)| e.status != ExceptionStatus::Resolved && exception::should_escalate(e, now, threshold))
            .map(|(id, _)| id.clone())
            .collect();

        for exception_id in to_escalate {
            let was_detected = self.exceptions.get(&exception_id).map(|e| e.status == ExceptionStatus::Detected).unwrap_or(false);
            warn!(exception_id = %exception_id, "exception escalated");
            if was_detected {
                self.try_assign_leader(&exception_id, now);
            }
            if let Some(exc) = self.exceptions.get_mut(&exception_id) {
                if exc.status != ExceptionStatus::Assigned && exc.status != ExceptionStatus::InProgress {
                    exc.status = ExceptionStatus::Escalated;
                }
            }
        }
    }

    fn handle_system_status_update(&mut self, now: NaiveDateTime) -> EngineResult<()> {
        self.sweep_exception_escalation(now);
        let stations: Vec<crate::station::Station> = self.stations.all().to_vec();
        let tasks: Vec<&Task> = self.tasks.values().collect();
        let total_waves = self.wave_task_ids.len().max(1);
        let wave_progress_avg = self.wave_completed.len() as f64 / total_waves as f64;

        let staff_present = self.roster.present_by_floor.values().map(|v| v.len()).sum();
        let staff_busy = tasks.iter().filter(|t| t.status == TaskStatus::InProgress).count();

        self.state_tracker.observe(
            now,
            &stations,
            &tasks,
            wave_progress_avg,
            self.exceptions.len(),
            staff_present,
            staff_busy,
        );

        Ok(())
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn exceptions(&self) -> impl Iterator<Item = &Exception> {
        self.exceptions.values()
    }

    pub fn stations(&self) -> &StationPool {
        &self.stations
    }

    /// Whether `wave_id` has transitioned to COMPLETED via a
    /// `WAVE_COMPLETION_CHECK` pass. Returns `false` for an unknown wave id.
    pub fn is_wave_completed(&self, wave_id: &str) -> bool {
        self.wave_completed.contains(wave_id)
    }

    /// Task ids belonging to `wave_id`, as tracked at shipping-task
    /// creation time.
    pub fn wave_task_ids(&self, wave_id: &str) -> impl Iterator<Item = &str> {
        self.wave_task_ids.get(wave_id).into_iter().flat_map(|s| s.iter().map(|id| id.as_str()))
    }
}

use chrono::Timelike;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParameterStore;
    use crate::master_data::{Item, RouteScheduleEntry, StaffSkillRow, WorkstationCapacityRow};

    fn sample_master_data() -> MasterData {
        let mut md = MasterData::new();
        md.add_item(Item {
            family_code: "F".into(),
            part_number: "P".into(),
            floor: 3,
            requires_repack: false,
            mean_pick_time_repack: None,
            mean_pick_time_no_repack: None,
        });
        md.add_route_schedule_entry(RouteScheduleEntry {
            route_code: "R1".into(),
            partcustid: "C1".into(),
            order_cutoff_raw: "930".into(),
            delivery_time_raw: "1100".into(),
        });
        md.add_station_capacity(WorkstationCapacityRow { floor: 3, fixed_stations: 2, temp_stations: 1 });
        md.add_staff(StaffSkillRow {
            staff_id: "S1".into(),
            staff_name: "A".into(),
            home_floor: "3".into(),
            skill_level: 3,
            capacity_multiplier: 1.0,
            max_hours_per_day: 8.0,
        });
        md
    }

    #[test]
    fn initialize_enqueues_bookends() {
        let md = sample_master_data();
        let cfg = EngineConfig::from_store(&ParameterStore::new()).unwrap();
        let mut scheduler = Scheduler::new(md, cfg, Some(1)).unwrap();
        let start = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        scheduler.initialize(start, end).unwrap();
        assert!(scheduler.queue.len() > 0);
    }

    #[test]
    fn run_processes_a_simple_order_to_completion() {
        let md = sample_master_data();
        let cfg = EngineConfig::from_store(&ParameterStore::new()).unwrap();
        let mut scheduler = Scheduler::new(md, cfg, Some(7)).unwrap();
        scheduler.load_orders(vec![OrderRecord {
            index_no: "1".into(),
            route_code: "R1".into(),
            partcustid: "C1".into(),
            order_time_raw: "900".into(),
            family_code: "F".into(),
            part_number: "P".into(),
            quantity: 1,
            transaction_code: "1".into(),
        }]);

        let start = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        scheduler.initialize(start, end).unwrap();
        let outcome = scheduler.run().unwrap();
        assert_eq!(outcome.status, Some(RunStatus::Completed));
    }

    fn sample_scheduler(seed: u64) -> Scheduler {
        let md = sample_master_data();
        let cfg = EngineConfig::from_store(&ParameterStore::new()).unwrap();
        Scheduler::new(md, cfg, Some(seed)).unwrap()
    }

    /// `Event::sequence` is private; route through a throwaway queue to get
    /// a real instance instead of constructing one field-by-field.
    fn make_event(event_type: EventType, at: NaiveDateTime, payload: EventPayload) -> Event {
        let mut q = EventQueue::new();
        q.schedule(event_type, at, priority::HIGH, payload);
        q.pop().unwrap()
    }

    fn bare_shipping_task(id: &str, status: TaskStatus, station: Option<&str>) -> Task {
        Task {
            task_id: id.into(),
            task_type: TaskType::Shipping,
            priority_class: PriorityClass::P1,
            floor: 3,
            item_key: ("F".into(), "P".into()),
            quantity: 1,
            requires_repack: false,
            estimated_duration_minutes: 20.0,
            shipping: crate::task::ShippingInfo::default(),
            receiving: crate::task::ReceivingInfo::default(),
            assigned_station: station.map(|s| s.to_string()),
            assigned_staff: None,
            status,
            planned_start: None,
            planned_completion: None,
            actual_start: None,
            actual_completion: None,
            actual_duration: None,
            superseded_by: None,
            remaining_duration_override: None,
        }
    }

    /// Regression test: a task blocked at the TASK_START
    /// pre-roll check (never reached IN_PROGRESS, so its status is
    /// ASSIGNED when the exception resolves) must begin execution on
    /// resolve rather than resume a remainder duration it never had.
    #[test]
    fn exception_resolved_for_assigned_task_begins_execution() {
        let mut scheduler = sample_scheduler(3);
        let task = bare_shipping_task("SHIP-1", TaskStatus::Assigned, Some("ST3F01"));
        scheduler.tasks.insert("SHIP-1".into(), task);

        let now = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let exception = Exception {
            exception_id: "EXC-1".into(),
            task_id: "SHIP-1".into(),
            exception_type: crate::exception::ExceptionType::BarcodeUnreadable,
            priority: crate::exception::ExceptionPriority::Medium,
            status: ExceptionStatus::Assigned,
            handling_minutes: 10.0,
            assigned_leader: Some("LEADER-0".into()),
            reserved_station: None,
            detected_at: now,
            assigned_at: Some(now),
        };
        scheduler.exceptions.insert("EXC-1".into(), exception);

        let event = make_event(
            EventType::ExceptionResolved,
            now,
            EventPayload { exception_id: Some("EXC-1".into()), ..Default::default() },
        );
        scheduler.handle_exception_resolved(&event, now).unwrap();

        assert_eq!(scheduler.exceptions.len(), 0);
        let task = scheduler.tasks.get("SHIP-1").unwrap();
        assert_eq!(task.status, TaskStatus::InProgress, "begin_execution transitions ASSIGNED straight to IN_PROGRESS");
        assert!(scheduler.queue.len() > 0, "TASK_COMPLETE must be scheduled");
    }

    /// Regression test: a task preempted mid-flight (PAUSED) resumes at the
    /// 50%-of-estimate policy rather than restarting from scratch.
    #[test]
    fn exception_resolved_for_paused_task_resumes_at_half_duration() {
        let mut scheduler = sample_scheduler(5);
        let task = bare_shipping_task("SHIP-2", TaskStatus::Paused, Some("ST3F01"));
        scheduler.tasks.insert("SHIP-2".into(), task);

        let now = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let exception = Exception {
            exception_id: "EXC-2".into(),
            task_id: "SHIP-2".into(),
            exception_type: crate::exception::ExceptionType::InventoryShortage,
            priority: crate::exception::ExceptionPriority::Critical,
            status: ExceptionStatus::InProgress,
            handling_minutes: 20.0,
            assigned_leader: Some("LEADER-0".into()),
            reserved_station: Some("ST3F01".into()),
            detected_at: now,
            assigned_at: Some(now),
        };
        scheduler.exceptions.insert("EXC-2".into(), exception);
        scheduler.stations.get_mut("ST3F01").unwrap().status = crate::station::StationStatus::Reserved;
        scheduler.stations.get_mut("ST3F01").unwrap().reserved_for_exception = true;

        let event = make_event(
            EventType::ExceptionResolved,
            now,
            EventPayload { exception_id: Some("EXC-2".into()), ..Default::default() },
        );
        scheduler.handle_exception_resolved(&event, now).unwrap();

        assert_eq!(scheduler.exceptions.len(), 0);
        let task = scheduler.tasks.get("SHIP-2").unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);

        let station = scheduler.stations.get("ST3F01").unwrap();
        assert_eq!(station.status, crate::station::StationStatus::Busy);
        assert!(!station.reserved_for_exception);
    }
}
