//! Deployment step library
//!
//! Each operation formats a parameterized shell command and delegates to
//! the remote executor. Steps are stateless; every path and service name
//! is re-derived from the caller-supplied project path. Whether a failure
//! is fatal is decided by the orchestrator, not here.

use chrono::Utc;
use tracing::debug;

use crate::config::env::constants::LOG_TAIL_LINES;
use crate::error::ExecError;
use crate::infra::ssh::RemoteExecutor;

/// Diagnostic command used to verify the connection works at all.
const TEST_COMMAND: &str = "uname -a";

/// Run a command on the remote host, echoing it at debug level.
async fn run(exec: &dyn RemoteExecutor, command: &str) -> Result<String, ExecError> {
    debug!(">>> {}", command);
    exec.execute(command).await
}

/// Prefix an action with a change into the project directory.
fn at_project(project_path: &str, action: &str) -> String {
    format!("cd {} && {}", project_path, action)
}

/// Backup file names carry a timestamp so successive backups never collide.
pub fn backup_command(project_path: &str, stamp: &str) -> String {
    at_project(
        project_path,
        &format!(
            "docker-compose exec -T postgres pg_dump -U postgres postgres > backup_db_{}.sql",
            stamp
        ),
    )
}

pub fn pull_command(project_path: &str) -> String {
    at_project(project_path, "git pull origin main")
}

pub fn build_command(project_path: &str) -> String {
    at_project(project_path, "docker-compose build --no-cache")
}

pub fn deploy_command(project_path: &str) -> String {
    at_project(project_path, "docker-compose up -d")
}

pub fn migrate_command(project_path: &str) -> String {
    at_project(
        project_path,
        "docker-compose exec -T backend python manage.py migrate",
    )
}

pub fn logs_command(project_path: &str, service: &str) -> String {
    at_project(
        project_path,
        &format!("docker-compose logs --tail={} {}", LOG_TAIL_LINES, service),
    )
}

pub fn rollback_command(project_path: &str) -> String {
    at_project(
        project_path,
        "git revert HEAD --no-edit && docker-compose restart",
    )
}

pub fn status_command(project_path: &str, service: Option<&str>) -> String {
    match service {
        Some(service) => at_project(project_path, &format!("docker-compose ps {}", service)),
        None => at_project(project_path, "docker-compose ps"),
    }
}

/// Run a benign diagnostic command against the remote host.
pub async fn test_connection(exec: &dyn RemoteExecutor) -> Result<String, ExecError> {
    run(exec, TEST_COMMAND).await
}

/// Fetch the latest source at the remote project path.
pub async fn pull_code(exec: &dyn RemoteExecutor, project_path: &str) -> Result<String, ExecError> {
    run(exec, &pull_command(project_path)).await
}

/// Dump the database to a timestamped file next to the project.
pub async fn backup_database(
    exec: &dyn RemoteExecutor,
    project_path: &str,
) -> Result<String, ExecError> {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    run(exec, &backup_command(project_path, &stamp)).await
}

/// Rebuild container images without cache.
pub async fn build_images(
    exec: &dyn RemoteExecutor,
    project_path: &str,
) -> Result<String, ExecError> {
    run(exec, &build_command(project_path)).await
}

/// Start or recreate the containers.
pub async fn deploy_services(
    exec: &dyn RemoteExecutor,
    project_path: &str,
) -> Result<String, ExecError> {
    run(exec, &deploy_command(project_path)).await
}

/// Apply schema migrations inside the backend container.
pub async fn run_migrations(
    exec: &dyn RemoteExecutor,
    project_path: &str,
) -> Result<String, ExecError> {
    run(exec, &migrate_command(project_path)).await
}

/// Report the status of all containers.
pub async fn health_check(
    exec: &dyn RemoteExecutor,
    project_path: &str,
) -> Result<String, ExecError> {
    run(exec, &status_command(project_path, None)).await
}

/// Return the tail of a service's logs.
pub async fn fetch_logs(
    exec: &dyn RemoteExecutor,
    project_path: &str,
    service: &str,
) -> Result<String, ExecError> {
    run(exec, &logs_command(project_path, service)).await
}

/// Revert the last commit and restart the containers.
pub async fn rollback(exec: &dyn RemoteExecutor, project_path: &str) -> Result<String, ExecError> {
    run(exec, &rollback_command(project_path)).await
}

/// Report the state of a single service, or of all services.
pub async fn service_status(
    exec: &dyn RemoteExecutor,
    project_path: &str,
    service: Option<&str>,
) -> Result<String, ExecError> {
    run(exec, &status_command(project_path, service)).await
}
