//! Engine (top-level entry point).
//!
//! Owns a [`crate::scheduler::Scheduler`] end to end: construction from
//! master data and parameters, intake loading, and the run itself.

use chrono::NaiveDate;
use tracing::info;

use crate::config::{EngineConfig, ParameterStore};
use crate::error::EngineResult;
use crate::master_data::{MasterData, OrderRecord, ReceivingRecord};
use crate::scheduler::{RunOutcome, Scheduler};

pub struct Engine {
    scheduler: Scheduler,
}

impl Engine {
    /// Builds the engine from master data and a raw parameter store,
    /// resolving the typed [`EngineConfig`] once.
    pub fn new(master_data: MasterData, params: &ParameterStore, seed: Option<u64>) -> EngineResult<Self> {
        let config = EngineConfig::from_store(params)?;
        let scheduler = Scheduler::new(master_data, config, seed)?;
        Ok(Self { scheduler })
    }

    pub fn load_orders(&mut self, orders: Vec<OrderRecord>) {
        self.scheduler.load_orders(orders);
    }

    pub fn load_receiving(&mut self, records: Vec<ReceivingRecord>) {
        self.scheduler.load_receiving(records);
    }

    /// Enqueues the simulation bookends for `[start_date, end_date]`.
    pub fn initialize(&mut self, start_date: NaiveDate, end_date: NaiveDate) -> EngineResult<()> {
        info!(%start_date, %end_date, "initializing simulation window");
        self.scheduler.initialize(start_date, end_date)
    }

    /// Runs to completion (or abort), returning the run's [`RunOutcome`].
    pub fn run(&mut self) -> EngineResult<RunOutcome> {
        info!("starting dispatch loop");
        let outcome = self.scheduler.run()?;
        info!(
            errors = outcome.errors.len(),
            warnings = outcome.warnings.len(),
            days = outcome.daily_summaries.len(),
            "dispatch loop finished"
        );
        Ok(outcome)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}
