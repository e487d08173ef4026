//! 服务层
//!
//! 各工具的执行逻辑：远程部署步骤与编排、监控循环、站点同步、健康探测。

pub mod health_poll;
pub mod monitor;
pub mod orchestrator;
pub mod site_sync;
pub mod steps;
