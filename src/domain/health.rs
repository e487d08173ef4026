//! 健康检查响应模型

use serde::{Deserialize, Serialize};

/// 健康端点返回的状态对象
///
/// 解析是宽容的：字段缺失或整体解析失败都退化为零值对象，不产生错误。
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HealthReport {
    pub status: String,
    pub message: String,
    pub timestamp: String,
}

impl HealthReport {
    /// 从响应体解析，失败时返回零值对象
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}
