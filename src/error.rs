//! 统一错误类型
//!
//! 按错误类别区分：配置错误在进程启动时即致命；传输错误（无法连接/认证）
//! 不携带任何输出；命令错误（远程命令非零退出）携带已捕获的部分输出。

use std::path::PathBuf;

use thiserror::Error;

/// 远程命令执行错误
#[derive(Debug, Error)]
pub enum ExecError {
    /// 私钥读取或解析失败（构造执行器时产生）
    #[error("cannot load ssh key {}: {source}", path.display())]
    Key {
        path: PathBuf,
        #[source]
        source: russh_keys::Error,
    },

    /// 传输层失败：主机不可达、握手失败、会话异常中断
    #[error("ssh transport failure: {0}")]
    Transport(String),

    /// 公钥认证被拒绝
    #[error("ssh authentication rejected for user {0}")]
    Auth(String),

    /// 远程命令非零退出，`output` 为已捕获的标准输出
    #[error("remote command exited with status {status}")]
    Command { status: u32, output: String },
}

impl ExecError {
    /// 命令失败前已捕获的部分输出（传输错误没有输出）
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            ExecError::Command { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }

    /// 是否为命令级失败（区别于传输级失败）
    pub fn is_command_failure(&self) -> bool {
        matches!(self, ExecError::Command { .. })
    }
}

/// 配置错误：缺少必需的环境变量
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not configured")]
    MissingVar(&'static str),
}
