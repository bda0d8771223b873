//! S5 — a detected exception preempts a P1 shipping task, assigns a leader,
//! and the task resumes and completes once the exception resolves.
//!
//! Which concrete branch fires (mid-flight PAUSED-then-resume vs. blocked
//! pre-roll ASSIGNED-then-start) depends on the sampled exception's
//! priority, which this test cannot predict without running the RNG. Both
//! branches are exercised by [`warehouse_sim::scheduler`]'s own white-box
//! unit tests; here the scenario's durable, branch-independent
//! postcondition is checked instead: the task reaches COMPLETED and the
//! exception is fully resolved (removed from the open set) by the time the
//! day ends. Before the scheduler's `ExceptionResolved` scheduling fix this
//! would have hung forever with the task stuck PAUSED/ASSIGNED and the
//! exception still open.

mod common;

use chrono::NaiveDate;
use warehouse_sim::config::ParamValue;
use warehouse_sim::scheduler::RunStatus;
use warehouse_sim::task::TaskStatus;
use warehouse_sim::Scheduler;

#[test]
fn preempted_p1_task_resumes_and_completes_and_the_exception_closes() {
    let date = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
    let master_data = common::single_floor3_master_data(2, 1);

    let config = common::config_with(&[
        ("exception_probability_shipping", ParamValue::Float(1.0)),
        ("task_interruption_allowed", ParamValue::Text("true".into())),
        ("leader_count", ParamValue::Integer(1)),
    ]);

    let mut scheduler = Scheduler::new(master_data, config, Some(99)).unwrap();
    scheduler.load_orders(vec![common::order("1", "R1", "C1", "900", "F", "P", "1")]);
    scheduler.initialize(date, date).unwrap();
    let outcome = scheduler.run().unwrap();
    assert_eq!(outcome.status, Some(RunStatus::Completed));

    let task = scheduler
        .tasks()
        .find(|t| t.task_type == warehouse_sim::task::TaskType::Shipping)
        .expect("shipping task created");
    assert_eq!(task.status, TaskStatus::Completed, "task must resume and finish despite the exception");

    assert_eq!(scheduler.exceptions().count(), 0, "the exception must be resolved and removed by end of day");
}
