//! 服务状态监控循环
//!
//! 定时执行一次状态检查并打印带时间戳的结果。循环没有退出条件，
//! 只能由外部终止进程；单次检查失败记录后继续下一轮。

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::{info, warn};

use crate::config::env::DeployConfig;
use crate::infra::ssh::RemoteExecutor;
use crate::services::steps;

/// 启动监控循环（永不返回）
///
/// 每 `interval_secs` 秒执行一次 service-status 并打印结果。
pub async fn run(exec: Arc<dyn RemoteExecutor>, cfg: DeployConfig, interval_secs: u64) {
    let interval_secs = interval_secs.max(1);
    info!(interval_secs, host = %cfg.host, "starting monitor loop");

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    // 第一轮检查等满一个周期后再执行
    ticker.tick().await;

    loop {
        ticker.tick().await;
        tick(exec.as_ref(), &cfg).await;
    }
}

/// 执行一轮状态检查
async fn tick(exec: &dyn RemoteExecutor, cfg: &DeployConfig) {
    match steps::service_status(exec, &cfg.project_path, None).await {
        Ok(output) => {
            println!("[{}]", Local::now().format("%H:%M:%S"));
            println!("{}", output.trim_end());
        }
        Err(err) => {
            warn!(error = %err, "status check failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecError;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExecutor {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingExecutor {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl RemoteExecutor for CountingExecutor {
        async fn execute(&self, _command: &str) -> Result<String, ExecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ExecError::Transport("unreachable".to_string()))
            } else {
                Ok("backend running".to_string())
            }
        }
    }

    fn test_config() -> DeployConfig {
        DeployConfig {
            host: "203.0.113.7".to_string(),
            ssh_user: "root".to_string(),
            ssh_key_path: PathBuf::from("/dev/null"),
            project_path: "/srv/app".to_string(),
            skip_host_verify: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn produces_one_check_per_elapsed_second() {
        let exec = Arc::new(CountingExecutor::new(false));
        let monitor = tokio::spawn(run(exec.clone(), test_config(), 1));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        monitor.abort();

        // Three full seconds elapsed after the initial tick.
        assert_eq!(exec.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_running_after_failed_checks() {
        let exec = Arc::new(CountingExecutor::new(true));
        let monitor = tokio::spawn(run(exec.clone(), test_config(), 1));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        monitor.abort();

        assert!(exec.calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_clamped() {
        let exec = Arc::new(CountingExecutor::new(false));
        let monitor = tokio::spawn(run(exec.clone(), test_config(), 0));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        monitor.abort();

        // Clamped to one second, so roughly one check in 1.5 s.
        let calls = exec.calls.load(Ordering::SeqCst);
        assert!(calls >= 1 && calls <= 2, "calls = {}", calls);
    }
}
