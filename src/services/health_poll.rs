//! 健康检查探测
//!
//! 对状态端点执行一次 GET，宽容解析响应并返回原始响应体。
//! 本调用从不失败：网络错误退化为固定结果，解析错误退化为零值对象。

use std::time::Duration;

use tracing::{info, warn};

use crate::config::env::constants::HTTP_TIMEOUT_SECS;
use crate::config::env::HealthConfig;
use crate::domain::health::HealthReport;

/// 探测失败时的固定结果
const FETCH_FAILED_RESULT: &str = "error";

/// 执行一次健康检查，返回原始响应体
pub async fn poll_once(cfg: &HealthConfig) -> String {
    let client = reqwest::Client::new();

    let response = match client
        .get(&cfg.url)
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            warn!(url = %cfg.url, error = %err, "health fetch failed");
            return FETCH_FAILED_RESULT.to_string();
        }
    };

    let body = response.text().await.unwrap_or_default();
    let report = HealthReport::parse(&body);
    info!(status = %report.status, message = %report.message, "health report");

    body
}
