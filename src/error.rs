//! Engine-wide error types.
//!
//! Every component surfaces failure through [`EngineError`] rather than by
//! unwinding. The [`crate::scheduler::Scheduler`] is the sole place a
//! [`EngineError::HandlerException`] is caught and folded into
//! `RunOutcome::errors` without aborting the dispatch loop, except when it
//! originates in the `SIMULATION_START` handler.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// A referenced item/route/partcustid has no master record.
    #[error("input data missing: {what} (context: {context})")]
    InputDataMissing { what: String, context: String },

    /// A time field could not be parsed, or parsed to a nonsensical value.
    #[error("time parse error: '{raw}' ({reason})")]
    TimeParseError { raw: String, reason: String },

    /// The packer could not find a station for a task.
    #[error("capacity exhausted on floor {floor} for partcustid {partcustid}")]
    CapacityExhausted { floor: u8, partcustid: String },

    /// Exception preemption was requested but policy forbids it or no
    /// station is free.
    #[error("preemption denied for exception {exception_id}: {reason}")]
    PreemptionDenied { exception_id: String, reason: String },

    /// Any unexpected error raised inside an event handler.
    #[error("handler exception while processing {event_type} at t={scheduled_time}: {source}")]
    HandlerException {
        event_type: String,
        scheduled_time: String,
        #[source]
        source: anyhow::Error,
    },

    /// Parameter Store lookup or type coercion failure.
    #[error("config error: {0}")]
    Config(String),

    /// Master data intake shape error (out of scope ingestion, but the
    /// core still validates the narrow shape it depends on).
    #[error("master data error: {0}")]
    MasterData(String),
}

impl EngineError {
    pub fn handler(event_type: impl Into<String>, scheduled_time: impl Into<String>, source: anyhow::Error) -> Self {
        EngineError::HandlerException {
            event_type: event_type.into(),
            scheduled_time: scheduled_time.into(),
            source,
        }
    }
}
