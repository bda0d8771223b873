//! Scenario runner CLI.
//!
//! Intake plumbing only (tabular ingestion and validation are treated as an
//! external collaborator) — loads `system_parameters` and the five
//! master/transaction CSVs from a directory, builds
//! the [`Engine`], runs it over `[start, end]`, and prints the resulting
//! [`RunOutcome`] as JSON.

use std::path::{Path, PathBuf};

use clap::Parser;
use chrono::NaiveDate;

use warehouse_sim::config::{ParamValue, ParameterStore};
use warehouse_sim::master_data::{
    Item, MasterData, OrderRecord, ReceivingRecord, RouteScheduleEntry, StaffSkillRow,
    WorkstationCapacityRow,
};
use warehouse_sim::Engine;

#[derive(Parser)]
#[command(name = "warehouse-sim")]
#[command(about = "Discrete-event warehouse wave-shipping and receiving simulator")]
#[command(version)]
struct Cli {
    /// Directory containing system_parameters.csv, item_master.csv,
    /// route_schedule_master.csv, staff_skill_master.csv,
    /// workstation_capacity.csv, historical_orders.csv and
    /// historical_receiving.csv. Missing files default to empty tables.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// First simulated day, YYYY-MM-DD.
    #[arg(long)]
    start_date: NaiveDate,

    /// Last simulated day (inclusive), YYYY-MM-DD. Defaults to `start_date`.
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Seed for the centralized RNG, for reproducible runs; omit for
    /// non-deterministic runs.
    #[arg(long)]
    seed: Option<u64>,
}

fn read_rows<T: for<'de> serde::Deserialize<'de>>(path: &Path) -> anyhow::Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn load_parameters(dir: &Path) -> anyhow::Result<ParameterStore> {
    #[derive(serde::Deserialize)]
    struct Row {
        parameter_name: String,
        parameter_value: String,
        data_type: String,
    }

    let mut store = ParameterStore::new();
    for row in read_rows::<Row>(&dir.join("system_parameters.csv"))? {
        let value = match row.data_type.as_str() {
            "integer" => ParamValue::Integer(row.parameter_value.parse()?),
            "float" => ParamValue::Float(row.parameter_value.parse()?),
            _ => ParamValue::Text(row.parameter_value),
        };
        store.insert(row.parameter_name, value);
    }
    Ok(store)
}

fn load_master_data(dir: &Path) -> anyhow::Result<MasterData> {
    let mut master = MasterData::new();
    for item in read_rows::<Item>(&dir.join("item_master.csv"))? {
        master.add_item(item);
    }
    for entry in read_rows::<RouteScheduleEntry>(&dir.join("route_schedule_master.csv"))? {
        master.add_route_schedule_entry(entry);
    }
    for staff in read_rows::<StaffSkillRow>(&dir.join("staff_skill_master.csv"))? {
        master.add_staff(staff);
    }
    for row in read_rows::<WorkstationCapacityRow>(&dir.join("workstation_capacity.csv"))? {
        master.add_station_capacity(row);
    }
    master.validate()?;
    Ok(master)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let end_date = cli.end_date.unwrap_or(cli.start_date);

    let (params, master_data, orders, receiving) = if let Some(dir) = &cli.data_dir {
        let params = load_parameters(dir)?;
        let master_data = load_master_data(dir)?;
        let orders = read_rows::<OrderRecord>(&dir.join("historical_orders.csv"))?;
        let receiving = read_rows::<ReceivingRecord>(&dir.join("historical_receiving.csv"))?;
        (params, master_data, orders, receiving)
    } else {
        tracing::warn!("no --data-dir supplied; running with empty master and transaction data");
        (ParameterStore::new(), MasterData::new(), Vec::new(), Vec::new())
    };

    let mut engine = Engine::new(master_data, &params, cli.seed)
        .map_err(|e| anyhow::anyhow!("failed to build engine: {e}"))?;
    engine.load_orders(orders);
    engine.load_receiving(receiving);
    engine
        .initialize(cli.start_date, end_date)
        .map_err(|e| anyhow::anyhow!("failed to initialize run: {e}"))?;

    let outcome = engine.run().map_err(|e| anyhow::anyhow!("run failed: {e}"))?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
