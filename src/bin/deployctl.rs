//! deployctl - SSH 远程部署工具
//!
//! Usage:
//! - Full deploy: `deployctl deploy`
//! - Service status: `deployctl status`
//! - Service logs: `deployctl logs [service]`
//! - Health check: `deployctl health`
//! - Monitor loop: `deployctl monitor [seconds]`
//! - Rollback: `deployctl rollback`
//! - Connection test: `deployctl test`

use std::sync::Arc;

use opskit::config::env::constants::{DEFAULT_LOG_SERVICE, DEFAULT_MONITOR_INTERVAL_SECS, VERSION};
use opskit::config::env::DeployConfig;
use opskit::error::ExecError;
use opskit::infra::ssh::{RemoteExecutor, SshExecutor};
use opskit::services::orchestrator::{run_full_deploy, DeployReport, SshStepRunner};
use opskit::services::{monitor, steps};

fn print_help() {
    println!("deployctl {} - remote deployment manager", VERSION);
    println!();
    println!("USAGE:");
    println!("    deployctl <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    deploy             Run the full deployment pipeline");
    println!("    status             Show service status");
    println!("    logs [service]     Tail a service's logs (default: backend)");
    println!("    health             Check container health");
    println!("    monitor [seconds]  Poll service status every N seconds (default: 10)");
    println!("    rollback           Revert the last deployment");
    println!("    test               Test the SSH connection");
    println!("    help               Print this help");
    println!();
    println!("ENVIRONMENT:");
    println!("    DEPLOY_HOST               Remote host address (required)");
    println!("    DEPLOY_SSH_USER           SSH user (default: root)");
    println!("    DEPLOY_SSH_KEY            Private key path (default: ~/.ssh/id_rsa)");
    println!("    DEPLOY_PROJECT_PATH       Remote project path (default: /srv/app)");
    println!("    DEPLOY_SKIP_HOST_VERIFY   Skip host identity verification (default: true)");
}

/// 打印阶段摘要与终态
fn print_report(report: &DeployReport) {
    println!();
    println!("=== Stage Summary ===");
    for step in &report.steps {
        let duration = step
            .duration_ms
            .map(|d| format!("{}ms", d))
            .unwrap_or_else(|| "-".to_string());
        println!("{} {} ({})", step.status.icon(), step.display_name, duration);
    }
    println!();

    match report.outcome.failed_step() {
        None => println!("✓ deployment completed"),
        Some(step) => {
            if report.outcome.is_rolled_back() {
                println!("✗ deployment failed at {}; rollback completed", step);
            } else {
                println!("✗ deployment failed at {}; rollback also failed", step);
            }
        }
    }
}

/// 打印单个操作的结果，失败时以非零退出
fn print_result(result: Result<String, ExecError>) {
    match result {
        Ok(output) => println!("{}", output.trim_end()),
        Err(err) => {
            eprintln!("✗ {}", err);
            if let Some(partial) = err.partial_output() {
                eprintln!("{}", partial.trim_end());
            }
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    opskit::logging::init();

    let args: Vec<String> = std::env::args().collect();
    let command = match args.get(1) {
        Some(command) => command.as_str(),
        None => {
            print_help();
            return;
        }
    };

    if command == "help" {
        print_help();
        return;
    }

    let cfg = match DeployConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("✗ {}", err);
            std::process::exit(1);
        }
    };

    println!("deploy target:");
    println!("    host: {}", cfg.host);
    println!("    user: {}", cfg.ssh_user);
    println!("    path: {}", cfg.project_path);

    let exec: Arc<dyn RemoteExecutor> = match SshExecutor::new(&cfg) {
        Ok(exec) => Arc::new(exec),
        Err(err) => {
            eprintln!("✗ {}", err);
            std::process::exit(1);
        }
    };

    match command {
        "deploy" => {
            let runner = SshStepRunner::new(exec.as_ref(), &cfg);
            let report = run_full_deploy(&runner).await;
            print_report(&report);
            if !report.outcome.is_success() {
                std::process::exit(1);
            }
        }

        "status" => {
            print_result(steps::service_status(exec.as_ref(), &cfg.project_path, None).await);
        }

        "logs" => {
            let service = args.get(2).map(String::as_str).unwrap_or(DEFAULT_LOG_SERVICE);
            print_result(steps::fetch_logs(exec.as_ref(), &cfg.project_path, service).await);
        }

        "health" => {
            print_result(steps::health_check(exec.as_ref(), &cfg.project_path).await);
        }

        "monitor" => {
            let interval = args
                .get(2)
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MONITOR_INTERVAL_SECS);
            monitor::run(exec, cfg, interval).await;
        }

        "rollback" => {
            print_result(steps::rollback(exec.as_ref(), &cfg.project_path).await);
        }

        "test" => {
            print_result(steps::test_connection(exec.as_ref()).await);
        }

        unknown => {
            eprintln!("✗ unknown command: {}", unknown);
            print_help();
            std::process::exit(2);
        }
    }
}
