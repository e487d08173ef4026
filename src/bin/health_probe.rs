//! health-probe - 健康检查探测
//!
//! 单次执行：请求状态端点并打印原始响应体。探测从不失败，
//! 网络或解析错误都退化为可记录的结果。

use opskit::config::env::HealthConfig;
use opskit::services::health_poll;

#[tokio::main]
async fn main() {
    opskit::logging::init();

    let cfg = HealthConfig::from_env();
    let body = health_poll::poll_once(&cfg).await;
    println!("{}", body);
}
