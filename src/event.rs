//! Clock & Event Queue (C1).
//!
//! A min-heap of future events ordered by `(scheduled_time, priority)`,
//! with stable insertion-order tie-breaking.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    SimulationStart,
    SimulationEnd,
    DailyScheduleGenerate,
    ReceivingLoad,
    ReceivingDeadlineCheck,
    EndOfDayProcessing,
    TaskAssign,
    ReceivingTaskAssign,
    TaskStart,
    TaskComplete,
    StationStartupComplete,
    StationBecomeIdle,
    WaveCompletionCheck,
    OvertimeEvaluation,
    OvertimeStart,
    OvertimeEnd,
    ExceptionDetected,
    ExceptionResolved,
    SystemStatusUpdate,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Payload carried by an event. Kept as a small closed set of fields
/// rather than a dynamic bag, matching the closed `EventType` enum it
/// tags along with.
#[derive(Debug, Clone, Default)]
pub struct EventPayload {
    pub task_id: Option<String>,
    pub wave_id: Option<String>,
    pub station_id: Option<String>,
    pub exception_id: Option<String>,
    pub date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub scheduled_time: NaiveDateTime,
    /// Lower value dispatches first among events at the same time.
    pub priority: i32,
    pub event_type: EventType,
    pub payload: EventPayload,
    /// Monotonically increasing insertion sequence number, used only as
    /// the final tie-break so same-(time, priority) events dispatch in
    /// the order they were scheduled.
    sequence: u64,
}

/// Reverses ordering so `BinaryHeap` (a max-heap) behaves as a min-heap on
/// `(scheduled_time, priority, sequence)`.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .scheduled_time
            .cmp(&self.scheduled_time)
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.scheduled_time == other.scheduled_time && self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for Event {}

/// Priority levels used throughout scheduling calls (lower dispatches
/// first). Named constants for readability at call sites.
pub mod priority {
    pub const HIGHEST: i32 = 0;
    pub const HIGH: i32 = 10;
    pub const NORMAL: i32 = 50;
    pub const LOW: i32 = 90;
}

/// The simulated clock plus its pending-event min-heap.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Event>,
    next_sequence: u64,
    now: Option<NaiveDateTime>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Option<NaiveDateTime> {
        self.now
    }

    pub fn schedule(&mut self, event_type: EventType, at: NaiveDateTime, priority: i32, payload: EventPayload) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(Event { scheduled_time: at, priority, event_type, payload, sequence });
    }

    /// Pops the next event and advances the clock to its scheduled time.
    pub fn pop(&mut self) -> Option<Event> {
        let event = self.heap.pop()?;
        self.now = Some(event.scheduled_time);
        Some(event)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
