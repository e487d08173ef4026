//! 部署步骤领域模型
//!
//! 步骤的致命性是数据（`StepSpec::fatal`）而不是控制流：步骤函数只返回
//! 原始结果，编排器根据标志决定继续还是回滚。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 步骤执行状态
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl StepStatus {
    /// 状态图标（用于阶段摘要输出）
    pub fn icon(&self) -> &'static str {
        match self {
            StepStatus::Success => "✓",
            StepStatus::Failed => "✗",
            StepStatus::Skipped => "⊘",
            StepStatus::Running => "⟳",
            StepStatus::Pending => "○",
        }
    }
}

/// 步骤种类
///
/// 固定部署序列与回滚操作的标签，供编排器向步骤库分派。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepKind {
    TestConnection,
    PullCode,
    BackupDatabase,
    BuildImages,
    DeployServices,
    RunMigrations,
    HealthCheck,
    Rollback,
}

impl StepKind {
    /// 步骤描述：名称、显示名、失败是否致命
    pub fn spec(self) -> StepSpec {
        match self {
            StepKind::TestConnection => StepSpec::new(self, "test-connection", "Test Connection", true),
            StepKind::PullCode => StepSpec::new(self, "pull-code", "Pull Code", true),
            StepKind::BackupDatabase => {
                StepSpec::new(self, "backup-database", "Backup Database", false)
            }
            StepKind::BuildImages => StepSpec::new(self, "build-images", "Build Images", true),
            StepKind::DeployServices => {
                StepSpec::new(self, "deploy-services", "Deploy Services", true)
            }
            StepKind::RunMigrations => {
                StepSpec::new(self, "run-migrations", "Run Migrations", false)
            }
            StepKind::HealthCheck => StepSpec::new(self, "health-check", "Health Check", true),
            StepKind::Rollback => StepSpec::new(self, "rollback", "Rollback", true),
        }
    }
}

/// 步骤描述
#[derive(Clone, Copy, Debug)]
pub struct StepSpec {
    pub kind: StepKind,
    /// 步骤标识 (e.g., "pull-code")
    pub name: &'static str,
    /// 显示名称 (e.g., "Pull Code")
    pub display_name: &'static str,
    /// 失败时是否中止流水线并触发回滚
    pub fatal: bool,
}

impl StepSpec {
    fn new(kind: StepKind, name: &'static str, display_name: &'static str, fatal: bool) -> Self {
        Self {
            kind,
            name,
            display_name,
            fatal,
        }
    }
}

/// 固定部署序列
///
/// 每次部署都从第一步完整执行，没有断点续跑。
pub fn deploy_sequence() -> Vec<StepSpec> {
    [
        StepKind::TestConnection,
        StepKind::PullCode,
        StepKind::BackupDatabase,
        StepKind::BuildImages,
        StepKind::DeployServices,
        StepKind::RunMigrations,
        StepKind::HealthCheck,
    ]
    .into_iter()
    .map(StepKind::spec)
    .collect()
}

/// 单个步骤的执行记录
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepRecord {
    /// 步骤标识
    pub name: String,
    /// 显示名称
    pub display_name: String,
    /// 开始时间
    pub started_at: Option<DateTime<Utc>>,
    /// 结束时间
    pub finished_at: Option<DateTime<Utc>>,
    /// 持续时间（毫秒）
    pub duration_ms: Option<i64>,
    /// 步骤状态
    pub status: StepStatus,
    /// 附加信息
    pub message: Option<String>,
}

impl StepRecord {
    /// 创建待执行记录
    pub fn new(name: &str, display_name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            started_at: None,
            finished_at: None,
            duration_ms: None,
            status: StepStatus::Pending,
            message: None,
        }
    }

    /// 开始执行
    pub fn start(&mut self) {
        self.started_at = Some(Utc::now());
        self.status = StepStatus::Running;
    }

    /// 完成执行
    pub fn finish(&mut self, success: bool, message: Option<String>) {
        let now = Utc::now();
        self.finished_at = Some(now);
        self.status = if success {
            StepStatus::Success
        } else {
            StepStatus::Failed
        };
        self.message = message;
        if let Some(started) = self.started_at {
            self.duration_ms = Some((now - started).num_milliseconds());
        }
    }

    /// 跳过执行
    pub fn skip(&mut self, reason: Option<String>) {
        self.status = StepStatus::Skipped;
        self.message = reason;
    }
}

/// 部署终态
///
/// 回滚成功不会把本次部署变成成功：`RolledBack` 与 `Failed` 都是整体失败，
/// 只有 `Succeeded` 算成功。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeployOutcome {
    /// 所有步骤成功
    Succeeded,
    /// 某步骤致命失败，回滚已完成
    RolledBack { failed_step: &'static str },
    /// 某步骤致命失败，且回滚本身也失败
    Failed { failed_step: &'static str },
}

impl DeployOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeployOutcome::Succeeded)
    }

    /// 回滚是否已成功执行
    pub fn is_rolled_back(&self) -> bool {
        matches!(self, DeployOutcome::RolledBack { .. })
    }

    /// 致命失败的步骤名（成功时为 None）
    pub fn failed_step(&self) -> Option<&'static str> {
        match self {
            DeployOutcome::Succeeded => None,
            DeployOutcome::RolledBack { failed_step } | DeployOutcome::Failed { failed_step } => {
                Some(failed_step)
            }
        }
    }
}
