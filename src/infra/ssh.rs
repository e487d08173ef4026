//! SSH 远程命令执行器
//!
//! 每次执行打开独立的连接和会话，任何退出路径都会断开连接，
//! 步骤之间不复用会话。认证只支持私钥，没有密码回退。
//!
//! 主机身份校验由 `DeployConfig::skip_host_verify` 控制，默认跳过。
//! 这是沿用现有部署流程的已知弱化，见 DESIGN.md。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client;
use russh::{ChannelMsg, Disconnect};
use russh_keys::key;

use crate::config::env::constants::CONNECT_TIMEOUT_SECS;
use crate::config::env::DeployConfig;
use crate::error::ExecError;

/// SSH 标准端口
const SSH_PORT: u16 = 22;

/// 远程命令执行接口
///
/// 执行一条非交互命令，返回捕获的标准输出；命令非零退出时错误中
/// 携带已捕获的部分输出，传输失败时没有输出。
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(&self, command: &str) -> Result<String, ExecError>;
}

/// 基于 russh 的执行器
#[derive(Debug)]
pub struct SshExecutor {
    host: String,
    user: String,
    key: Arc<key::KeyPair>,
    skip_host_verify: bool,
    config: Arc<client::Config>,
}

impl SshExecutor {
    /// 创建执行器，读取并解析私钥
    pub fn new(cfg: &DeployConfig) -> Result<Self, ExecError> {
        let key = russh_keys::load_secret_key(&cfg.ssh_key_path, None).map_err(|source| {
            ExecError::Key {
                path: cfg.ssh_key_path.clone(),
                source,
            }
        })?;

        Ok(Self {
            host: cfg.host.clone(),
            user: cfg.ssh_user.clone(),
            key: Arc::new(key),
            skip_host_verify: cfg.skip_host_verify,
            config: Arc::new(client::Config::default()),
        })
    }

    /// 建立连接并完成公钥认证
    async fn open_session(&self) -> Result<client::Handle<HostKeyPolicy>, ExecError> {
        let handler = HostKeyPolicy {
            skip_verify: self.skip_host_verify,
        };

        let connect = client::connect(
            self.config.clone(),
            (self.host.as_str(), SSH_PORT),
            handler,
        );
        let mut handle = tokio::time::timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS), connect)
            .await
            .map_err(|_| ExecError::Transport(format!("connection to {} timed out", self.host)))?
            .map_err(|e| ExecError::Transport(e.to_string()))?;

        let authenticated = handle
            .authenticate_publickey(self.user.as_str(), self.key.clone())
            .await
            .map_err(|e| ExecError::Transport(e.to_string()))?;

        if !authenticated {
            return Err(ExecError::Auth(self.user.clone()));
        }

        Ok(handle)
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn execute(&self, command: &str) -> Result<String, ExecError> {
        let handle = self.open_session().await?;
        let result = exec_command(&handle, command).await;

        // 断开连接；失败路径上 handle 同样在此处结束
        let _ = handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await;

        result
    }
}

/// 在已认证的连接上执行一条命令
async fn exec_command(
    handle: &client::Handle<HostKeyPolicy>,
    command: &str,
) -> Result<String, ExecError> {
    let mut channel = handle
        .channel_open_session()
        .await
        .map_err(|e| ExecError::Transport(e.to_string()))?;

    channel
        .exec(true, command)
        .await
        .map_err(|e| ExecError::Transport(e.to_string()))?;

    let mut stdout = Vec::new();
    let mut exit_status = None;

    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
            ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
            _ => {}
        }
    }

    let output = String::from_utf8_lossy(&stdout).into_owned();

    match exit_status {
        Some(0) => Ok(output),
        Some(status) => Err(ExecError::Command { status, output }),
        None => Err(ExecError::Transport(
            "session closed before reporting an exit status".to_string(),
        )),
    }
}

/// 主机密钥策略
///
/// `skip_verify` 为 true 时无条件接受远程主机密钥。
struct HostKeyPolicy {
    skip_verify: bool,
}

#[async_trait]
impl client::Handler for HostKeyPolicy {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(self.skip_verify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config_with_key(path: &str) -> DeployConfig {
        DeployConfig {
            host: "203.0.113.7".to_string(),
            ssh_user: "root".to_string(),
            ssh_key_path: PathBuf::from(path),
            project_path: "/srv/app".to_string(),
            skip_host_verify: true,
        }
    }

    #[test]
    fn missing_key_is_a_construction_error() {
        let cfg = config_with_key("/nonexistent/id_rsa");
        let err = SshExecutor::new(&cfg).unwrap_err();
        assert!(matches!(err, ExecError::Key { .. }));
    }

    #[test]
    fn garbage_key_is_a_construction_error() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("id_rsa");
        std::fs::write(&key_path, "not a private key").unwrap();

        let cfg = config_with_key(key_path.to_str().unwrap());
        let err = SshExecutor::new(&cfg).unwrap_err();
        assert!(matches!(err, ExecError::Key { .. }));
    }
}
