//! Deployment orchestrator
//!
//! Runs the fixed step sequence in order. The first fatal failure stops
//! the pipeline and triggers rollback exactly once; non-fatal failures
//! are recorded and execution proceeds. Rollback failure is logged and
//! never retried; the report always names the step that originally
//! failed.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::env::DeployConfig;
use crate::domain::step::{deploy_sequence, DeployOutcome, StepKind, StepRecord, StepSpec};
use crate::error::ExecError;
use crate::infra::ssh::RemoteExecutor;
use crate::services::steps;

/// Runs a single step, dispatching on its kind.
///
/// The production runner executes over SSH; tests substitute a scripted
/// runner to exercise the sequencing and rollback policy.
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run(&self, kind: StepKind) -> Result<String, ExecError>;
}

/// Production runner: step library over a remote executor.
pub struct SshStepRunner<'a> {
    exec: &'a dyn RemoteExecutor,
    cfg: &'a DeployConfig,
}

impl<'a> SshStepRunner<'a> {
    pub fn new(exec: &'a dyn RemoteExecutor, cfg: &'a DeployConfig) -> Self {
        Self { exec, cfg }
    }
}

#[async_trait]
impl StepRunner for SshStepRunner<'_> {
    async fn run(&self, kind: StepKind) -> Result<String, ExecError> {
        let path = self.cfg.project_path.as_str();
        match kind {
            StepKind::TestConnection => steps::test_connection(self.exec).await,
            StepKind::PullCode => steps::pull_code(self.exec, path).await,
            StepKind::BackupDatabase => steps::backup_database(self.exec, path).await,
            StepKind::BuildImages => steps::build_images(self.exec, path).await,
            StepKind::DeployServices => steps::deploy_services(self.exec, path).await,
            StepKind::RunMigrations => steps::run_migrations(self.exec, path).await,
            StepKind::HealthCheck => steps::health_check(self.exec, path).await,
            StepKind::Rollback => steps::rollback(self.exec, path).await,
        }
    }
}

/// Result of one full pipeline run.
#[derive(Debug)]
pub struct DeployReport {
    pub outcome: DeployOutcome,
    /// One record per executed step, plus the rollback record
    /// (skipped when rollback was never needed).
    pub steps: Vec<StepRecord>,
}

/// Run the full deployment pipeline.
pub async fn run_full_deploy(runner: &dyn StepRunner) -> DeployReport {
    run_sequence(runner, &deploy_sequence()).await
}

/// Run a step sequence with compensating rollback.
pub async fn run_sequence(runner: &dyn StepRunner, specs: &[StepSpec]) -> DeployReport {
    let total = specs.len();
    let mut records: Vec<StepRecord> = specs
        .iter()
        .map(|s| StepRecord::new(s.name, s.display_name))
        .collect();

    for (index, spec) in specs.iter().enumerate() {
        info!("[{}/{}] {}", index + 1, total, spec.display_name);
        records[index].start();

        match runner.run(spec.kind).await {
            Ok(output) => {
                records[index].finish(true, None);
                let output = output.trim_end();
                if !output.is_empty() {
                    info!("{}", output);
                }
            }
            Err(err) if !spec.fatal => {
                warn!(step = spec.name, error = %err, "step failed, continuing");
                records[index].finish(false, Some(err.to_string()));
            }
            Err(err) => {
                error!(step = spec.name, error = %err, "step failed");
                if let Some(partial) = err.partial_output() {
                    info!("{}", partial.trim_end());
                }
                records[index].finish(false, Some(err.to_string()));

                let outcome = attempt_rollback(runner, spec.name, &mut records).await;
                return DeployReport { outcome, steps: records };
            }
        }
    }

    // All steps succeeded; rollback was never needed.
    let mut rollback = rollback_record();
    rollback.skip(Some("not needed".to_string()));
    records.push(rollback);

    DeployReport {
        outcome: DeployOutcome::Succeeded,
        steps: records,
    }
}

/// Run rollback exactly once and derive the terminal outcome.
async fn attempt_rollback(
    runner: &dyn StepRunner,
    failed_step: &'static str,
    records: &mut Vec<StepRecord>,
) -> DeployOutcome {
    warn!("attempting rollback");
    let mut record = rollback_record();
    record.start();

    let outcome = match runner.run(StepKind::Rollback).await {
        Ok(_) => {
            record.finish(true, None);
            DeployOutcome::RolledBack { failed_step }
        }
        Err(err) => {
            // Not retried, not escalated; the report keeps the original failure.
            error!(error = %err, "rollback failed");
            record.finish(false, Some(err.to_string()));
            DeployOutcome::Failed { failed_step }
        }
    };

    records.push(record);
    outcome
}

fn rollback_record() -> StepRecord {
    let spec = StepKind::Rollback.spec();
    StepRecord::new(spec.name, spec.display_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::step::StepStatus;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Scripted runner: fails for the configured kinds, records call order.
    struct ScriptedRunner {
        fail: HashSet<StepKind>,
        calls: Mutex<Vec<StepKind>>,
    }

    impl ScriptedRunner {
        fn new(fail: impl IntoIterator<Item = StepKind>) -> Self {
            Self {
                fail: fail.into_iter().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<StepKind> {
            self.calls.lock().unwrap().clone()
        }

        fn rollback_count(&self) -> usize {
            self.calls()
                .iter()
                .filter(|k| **k == StepKind::Rollback)
                .count()
        }
    }

    #[async_trait]
    impl StepRunner for ScriptedRunner {
        async fn run(&self, kind: StepKind) -> Result<String, ExecError> {
            self.calls.lock().unwrap().push(kind);
            if self.fail.contains(&kind) {
                Err(ExecError::Command {
                    status: 1,
                    output: String::new(),
                })
            } else {
                Ok(format!("{:?} ok", kind))
            }
        }
    }

    #[tokio::test]
    async fn all_steps_succeed() {
        let runner = ScriptedRunner::new([]);
        let report = run_full_deploy(&runner).await;

        assert_eq!(report.outcome, DeployOutcome::Succeeded);
        assert_eq!(runner.rollback_count(), 0);
        assert_eq!(report.steps.len(), 8);
        assert!(report.steps[..7]
            .iter()
            .all(|r| r.status == StepStatus::Success));
        assert_eq!(report.steps[7].status, StepStatus::Skipped);
    }

    #[tokio::test]
    async fn fatal_failure_stops_the_pipeline_and_rolls_back_once() {
        let runner = ScriptedRunner::new([StepKind::DeployServices]);
        let report = run_full_deploy(&runner).await;

        assert_eq!(
            report.outcome,
            DeployOutcome::RolledBack {
                failed_step: "deploy-services"
            }
        );
        assert_eq!(runner.rollback_count(), 1);

        // Steps after the failure never execute.
        let calls = runner.calls();
        assert!(!calls.contains(&StepKind::RunMigrations));
        assert!(!calls.contains(&StepKind::HealthCheck));
        assert_eq!(*calls.last().unwrap(), StepKind::Rollback);
    }

    #[tokio::test]
    async fn non_fatal_failures_do_not_stop_the_pipeline() {
        let runner = ScriptedRunner::new([StepKind::BackupDatabase, StepKind::RunMigrations]);
        let report = run_full_deploy(&runner).await;

        assert_eq!(report.outcome, DeployOutcome::Succeeded);
        assert_eq!(runner.rollback_count(), 0);

        // Every pipeline step ran despite the two failures.
        let calls = runner.calls();
        assert!(calls.contains(&StepKind::HealthCheck));
        assert_eq!(calls.len(), 7);

        let failed: Vec<&str> = report
            .steps
            .iter()
            .filter(|r| r.status == StepStatus::Failed)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(failed, ["backup-database", "run-migrations"]);
    }

    #[tokio::test]
    async fn rollback_failure_keeps_the_original_failed_step() {
        let runner = ScriptedRunner::new([StepKind::BuildImages, StepKind::Rollback]);
        let report = run_full_deploy(&runner).await;

        assert_eq!(
            report.outcome,
            DeployOutcome::Failed {
                failed_step: "build-images"
            }
        );
        assert_eq!(runner.rollback_count(), 1);
        assert_eq!(report.steps.last().unwrap().status, StepStatus::Failed);
    }

    #[tokio::test]
    async fn first_step_failure_runs_nothing_else_but_rollback() {
        let runner = ScriptedRunner::new([StepKind::TestConnection]);
        let report = run_full_deploy(&runner).await;

        assert!(!report.outcome.is_success());
        assert_eq!(
            runner.calls(),
            [StepKind::TestConnection, StepKind::Rollback]
        );
    }

    #[tokio::test]
    async fn scripted_scenario_a_ok_b_ok_c_fail_d_never_runs() {
        // A:ok, B:ok, C:fail, D:ok over an explicit sub-sequence.
        let specs: Vec<StepSpec> = [
            StepKind::PullCode,
            StepKind::BuildImages,
            StepKind::DeployServices,
            StepKind::HealthCheck,
        ]
        .into_iter()
        .map(StepKind::spec)
        .collect();

        let runner = ScriptedRunner::new([StepKind::DeployServices]);
        let report = run_sequence(&runner, &specs).await;

        assert_eq!(
            report.outcome,
            DeployOutcome::RolledBack {
                failed_step: "deploy-services"
            }
        );
        assert_eq!(
            runner.calls(),
            [
                StepKind::PullCode,
                StepKind::BuildImages,
                StepKind::DeployServices,
                StepKind::Rollback,
            ]
        );
        // D's record stays pending: it never started.
        assert_eq!(report.steps[3].status, StepStatus::Pending);
    }
}
