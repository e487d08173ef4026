//! opskit - Web 应用部署运维工具集
//!
//! 三个独立的命令行入口：
//! - `deployctl`: 通过 SSH 执行远程部署流水线（含回滚）
//! - `site-sync`: 静态站点上传到 S3 并触发 CloudFront 失效
//! - `health-probe`: 健康检查探测（单次执行）

pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod logging;
pub mod services;
