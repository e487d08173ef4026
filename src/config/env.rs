//! 环境变量配置加载
//!
//! 每个工具的配置对象在进程入口构造一次，之后按引用传入各组件，
//! 组件自身不读取环境变量。

use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;

/// 远程部署连接配置
///
/// 进程生命周期内不可变。私钥内容在构造执行器时读取一次。
#[derive(Clone, Debug)]
pub struct DeployConfig {
    /// 远程主机地址
    pub host: String,
    /// SSH 用户
    pub ssh_user: String,
    /// SSH 私钥路径
    pub ssh_key_path: PathBuf,
    /// 远程项目路径
    pub project_path: String,
    /// 跳过远程主机身份校验（默认 true，与现有部署流程一致）
    pub skip_host_verify: bool,
}

impl DeployConfig {
    /// 从环境变量加载配置
    ///
    /// `DEPLOY_HOST` 为必需项，缺失时返回配置错误。
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = require("DEPLOY_HOST")?;

        let ssh_user = env::var("DEPLOY_SSH_USER").unwrap_or_else(|_| "root".to_string());

        let ssh_key_path = env::var("DEPLOY_SSH_KEY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_key_path());

        let project_path =
            env::var("DEPLOY_PROJECT_PATH").unwrap_or_else(|_| "/srv/app".to_string());

        let skip_host_verify = env::var("DEPLOY_SKIP_HOST_VERIFY")
            .map(|v| parse_bool(&v))
            .unwrap_or(true);

        Ok(Self {
            host,
            ssh_user,
            ssh_key_path,
            project_path,
            skip_host_verify,
        })
    }
}

/// 静态站点同步配置
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// 本地构建目录
    pub build_dir: PathBuf,
    /// 目标 bucket
    pub bucket: String,
    /// AWS 区域
    pub region: String,
    /// CloudFront distribution（未配置时跳过失效请求）
    pub distribution_id: Option<String>,
}

impl SyncConfig {
    /// 从环境变量加载配置
    ///
    /// `S3_BUCKET` 为必需项。
    pub fn from_env() -> Result<Self, ConfigError> {
        let build_dir = env::var("BUILD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("dist"));

        let bucket = require("S3_BUCKET")?;

        let region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let distribution_id = env::var("CLOUDFRONT_DISTRIBUTION_ID")
            .ok()
            .filter(|s| !s.is_empty());

        Ok(Self {
            build_dir,
            bucket,
            region,
            distribution_id,
        })
    }
}

/// 健康检查配置
#[derive(Clone, Debug)]
pub struct HealthConfig {
    /// 状态端点 URL
    pub url: String,
}

impl HealthConfig {
    /// 从环境变量加载配置，`HEALTH_URL` 可覆盖默认端点
    pub fn from_env() -> Self {
        let url = env::var("HEALTH_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| constants::DEFAULT_HEALTH_URL.to_string());

        Self { url }
    }
}

/// 读取必需的环境变量
fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

/// 布尔环境变量解析
fn parse_bool(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}

/// 默认私钥路径：~/.ssh/id_rsa
fn default_key_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".ssh").join("id_rsa"))
        .unwrap_or_else(|| PathBuf::from("/root/.ssh/id_rsa"))
}

/// 常量
pub mod constants {
    /// SSH 连接超时（秒）
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    /// HTTP 请求超时（秒）
    pub const HTTP_TIMEOUT_SECS: u64 = 10;

    /// 监控循环默认间隔（秒）
    pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 10;

    /// 日志命令默认服务
    pub const DEFAULT_LOG_SERVICE: &str = "backend";

    /// 日志命令返回的行数
    pub const LOG_TAIL_LINES: u32 = 50;

    /// 健康检查默认端点
    pub const DEFAULT_HEALTH_URL: &str = "https://example.com/api/health";

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
