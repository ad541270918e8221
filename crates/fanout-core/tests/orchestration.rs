//! End-to-end: job YAML -> tasks -> orchestrator -> report.

use std::sync::Arc;

use fanout_core::app::{ExitStatus, Orchestrator, RunPlan};
use fanout_core::config::JobConfig;
use fanout_core::domain::{SessionError, TaskKey};
use fanout_core::impls::{InMemorySessionClient, RunScript};
use tokio_util::sync::CancellationToken;

const JOB: &str = r#"
name: trading_sim
connection:
  url: sim://
execution:
  script_path: ./worker.py
  num_partitions: 2
  max_concurrent_sessions: 2
  heap_size_gb: 4.0
  max_failures: 2
  retry_delay_secs: 1
replay:
  replay_time: "09:30:00"
dates:
  start: 2024-01-01
  end: 2024-01-03
"#;

fn job() -> Arc<JobConfig> {
    Arc::new(JobConfig::from_yaml_with_env(JOB, |_| None).unwrap())
}

fn task(day: u32, partition: u32) -> TaskKey {
    TaskKey::new(chrono::NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), partition)
}

#[test]
fn dry_run_plans_without_a_backend() {
    let config = job();
    let plan = RunPlan::for_job(&config);

    assert_eq!(plan.tasks.len(), 6);
    assert_eq!(
        plan.task_keys(),
        vec![task(1, 0), task(1, 1), task(2, 0), task(2, 1), task(3, 0), task(3, 1)]
    );
    assert_eq!(plan.tasks[3].query_name, "trading_sim-20240102-1");
    assert!(plan.summary_lines()[0].contains("3 dates x 2 partitions = 6 tasks"));
    // 1x replay needs no engine overrides.
    assert!(plan.jvm_args.is_empty());
}

#[test]
fn dry_run_shows_replay_engine_arguments() {
    let yaml = JOB.replace(
        "  replay_time: \"09:30:00\"\n",
        "  replay_time: \"09:30:00\"\n  replay_speed: 4.0\n  buffer_rows: 1000\n",
    );
    let config = JobConfig::from_yaml_with_env(&yaml, |_| None).unwrap();
    let plan = RunPlan::for_job(&config);

    assert_eq!(
        plan.summary_lines()[1],
        "  jvm args: -DReplayDatabase.BufferSize=1000 -DPeriodicUpdateGraph.targetCycleDurationMillis=250"
    );
}

#[tokio::test(start_paused = true)]
async fn full_run_succeeds() {
    let config = job();
    let client = Arc::new(InMemorySessionClient::new());
    let mut orch = Orchestrator::for_job(client.clone(), Arc::clone(&config));

    let report = orch
        .run(config.tasks(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.counts.created, 6);
    assert_eq!(report.counts.completed, 6);
    assert!(report.failed.is_empty());
    assert_eq!(report.exit_status().code(), 0);
    assert!(client.peak_live() <= 2);
}

#[tokio::test(start_paused = true)]
async fn failure_limit_stops_the_run_with_unstarted_tasks_reported() {
    let config = job();
    let client = Arc::new(InMemorySessionClient::new());
    for t in [task(1, 0), task(1, 1), task(2, 0)] {
        client.push_run(t, RunScript::fails_after(0, "Traceback: KeyError 'px'"));
    }
    let mut orch = Orchestrator::for_job(client.clone(), Arc::clone(&config));

    let report = orch
        .run(config.tasks(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.aborted);
    assert_eq!(report.counts.execution_failures, 2);
    assert!(client.create_calls() < 6, "launching stops once the limit is hit");
    assert!(report.counts.pending > 0);
    // Tasks left pending never ran, so the exit status is not plain execution failure.
    assert_eq!(report.exit_status(), ExitStatus::BothFailures);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["exit_status"], "both_failures");
    assert_eq!(json["failed"][0]["kind"], "execution");
}

#[tokio::test(start_paused = true)]
async fn mixed_failures_map_to_both() {
    let yaml = JOB.replace("  max_failures: 2\n", "");
    let config = Arc::new(JobConfig::from_yaml_with_env(&yaml, |_| None).unwrap());
    let client = Arc::new(InMemorySessionClient::new());
    client.fail_creation(task(1, 0), 4, SessionError::Connection("refused".into()));
    client.push_run(task(3, 1), RunScript::fails_after(1, "ZeroDivisionError"));
    let mut orch = Orchestrator::for_job(client.clone(), Arc::clone(&config));

    let report = orch
        .run(config.tasks(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.counts.creation_failures, 1);
    assert_eq!(report.counts.execution_failures, 1);
    assert_eq!(report.counts.completed, 4);
    assert!(!report.aborted);
    assert_eq!(report.exit_status().code(), 3);
}

#[cfg(unix)]
#[tokio::test]
async fn local_backend_runs_worker_scripts() {
    use std::io::Write;

    let mut script = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        script,
        "test \"$PARTITION_ID\" = 1 && {{ echo \"bad partition for $QUERY_NAME\" >&2; exit 1; }}; exit 0"
    )
    .unwrap();

    let yaml = format!(
        r#"
name: local_job
connection:
  url: local://
execution:
  script_path: {}
  launcher: sh
  mode: batch
  num_partitions: 2
  max_concurrent_sessions: 2
  heap_size_gb: 1.0
dates:
  start: 2024-01-01
  end: 2024-01-01
"#,
        script.path().display()
    );
    let config = Arc::new(JobConfig::from_yaml_with_env(&yaml, |_| None).unwrap());
    let client = fanout_core::impls::connect(&config.connection).unwrap();
    let mut orch = Orchestrator::for_job(client, Arc::clone(&config));

    let report = orch
        .run(config.tasks(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.counts.completed, 1);
    assert_eq!(report.counts.execution_failures, 1);
    assert!(report.failed[0].detail.contains("bad partition for local_job-20240101-1"));
    assert_eq!(report.exit_status(), ExitStatus::ExecutionFailures);
}
