//! systemd 服务管理：写入单元、激活、状态、日志、卸载

use crate::constants::{JOURNALCTL, SYSTEMCTL};
use crate::error::{CoreError, IoContext, Result};
use crate::host::{CommandOutput, CommandSpec, Host};
use crate::stream_config::write_atomic;
use crate::unit::ServiceUnit;
use std::path::Path;
use std::time::Duration;

/// 等待服务进入 active 的参数
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll: Duration,
    /// 首次 active 后再确认一次的间隔，排除启动即崩溃
    pub settle: Duration,
}

impl WaitPolicy {
    pub fn from_timeout_secs(secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(secs),
            poll: Duration::from_secs(1),
            settle: Duration::from_secs(2),
        }
    }

    pub fn immediate() -> Self {
        Self {
            timeout: Duration::ZERO,
            poll: Duration::ZERO,
            settle: Duration::ZERO,
        }
    }
}

pub struct ServiceManager<'a> {
    host: &'a dyn Host,
    name: String,
}

impl<'a> ServiceManager<'a> {
    pub fn new(host: &'a dyn Host, name: impl Into<String>) -> Self {
        Self {
            host,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn systemctl(&self, args: &[&str]) -> Result<CommandOutput> {
        self.host
            .run_checked(&CommandSpec::new(SYSTEMCTL, args))
            .await
    }

    pub async fn daemon_reload(&self) -> Result<()> {
        self.systemctl(&["daemon-reload"]).await.map(|_| ())
    }

    pub async fn enable(&self) -> Result<()> {
        self.systemctl(&["enable", &self.name]).await.map(|_| ())
    }

    pub async fn disable(&self) -> Result<()> {
        self.systemctl(&["disable", &self.name]).await.map(|_| ())
    }

    pub async fn start(&self) -> Result<()> {
        self.systemctl(&["start", &self.name]).await.map(|_| ())
    }

    pub async fn stop(&self) -> Result<()> {
        self.systemctl(&["stop", &self.name]).await.map(|_| ())
    }

    pub async fn restart(&self) -> Result<()> {
        self.systemctl(&["restart", &self.name]).await.map(|_| ())
    }

    /// active|activating|failed|inactive|unknown
    pub async fn active_state(&self) -> Result<String> {
        let out = self
            .host
            .run(&CommandSpec::new(SYSTEMCTL, ["is-active", self.name.as_str()]))
            .await?;
        let state = out.stdout.trim();
        Ok(if state.is_empty() { "unknown" } else { state }.to_string())
    }

    /// 轮询直到服务连续两次处于 active，超时报错
    pub async fn wait_active(&self, policy: WaitPolicy) -> Result<()> {
        let started = tokio::time::Instant::now();
        loop {
            let mut state = self.active_state().await?;
            if state == "active" {
                tokio::time::sleep(policy.settle).await;
                let again = self.active_state().await?;
                if again == "active" {
                    return Ok(());
                }
                tracing::debug!(state = %again, "service left active state");
                state = again;
            }
            if started.elapsed() >= policy.timeout {
                return Err(CoreError::ServiceNotActive {
                    service: self.name.clone(),
                    state,
                });
            }
            tokio::time::sleep(policy.poll).await;
        }
    }

    /// 写入单元文件（0644）
    pub fn write_unit(&self, unit: &ServiceUnit, unit_path: &Path) -> Result<()> {
        let text = unit.render()?;
        if let Some(dir) = unit_path.parent() {
            std::fs::create_dir_all(dir).with_path(dir)?;
        }
        write_atomic(unit_path, text.as_bytes(), 0o644)?;
        tracing::info!(path = %unit_path.display(), "wrote service unit");
        Ok(())
    }

    /// 激活：可执行文件检查 -> daemon-reload -> enable -> start
    pub async fn activate(&self, unit: &ServiceUnit) -> Result<()> {
        unit.ensure_executable()?;
        self.daemon_reload().await?;
        self.enable().await?;
        self.start().await?;
        Ok(())
    }

    /// `systemctl status`，输出直接到终端。返回服务是否在运行
    pub async fn print_status(&self) -> Result<bool> {
        let out = self
            .host
            .run(
                &CommandSpec::new(SYSTEMCTL, ["status", self.name.as_str(), "--no-pager"])
                    .interactive(),
            )
            .await?;
        Ok(out.success())
    }

    /// 最近的日志（捕获输出）
    pub async fn recent_logs(&self, lines: u32) -> Result<String> {
        let n = lines.to_string();
        let out = self
            .host
            .run(&CommandSpec::new(
                JOURNALCTL,
                ["-u", self.name.as_str(), "--no-pager", "-n", n.as_str()],
            ))
            .await?;
        Ok(out.stdout)
    }

    /// `journalctl -u`，输出直接到终端
    pub async fn follow_logs(&self, lines: u32, follow: bool) -> Result<()> {
        let n = lines.to_string();
        let mut args = vec!["-u", self.name.as_str(), "--no-pager", "-n", n.as_str()];
        if follow {
            args.push("-f");
        }
        let out = self
            .host
            .run(&CommandSpec::new(JOURNALCTL, args).interactive())
            .await?;
        if !out.success() {
            return Err(CoreError::Command {
                command: JOURNALCTL.into(),
                code: out.code,
                stderr: String::new(),
            });
        }
        Ok(())
    }

    /// 停止、禁用并删除单元文件。返回单元文件是否存在过
    pub async fn uninstall(&self, unit_path: &Path) -> Result<bool> {
        if let Err(e) = self.stop().await {
            tracing::debug!("stop failed during uninstall: {e}");
        }
        if let Err(e) = self.disable().await {
            tracing::debug!("disable failed during uninstall: {e}");
        }
        if !unit_path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(unit_path).with_path(unit_path)?;
        self.daemon_reload().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::CommandOutput;
    use crate::testing::FakeHost;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn unit_for(bin: PathBuf) -> ServiceUnit {
        ServiceUnit {
            name: "camhost".into(),
            description: "camhost".into(),
            working_directory: bin.parent().unwrap().to_path_buf(),
            exec_start: bin,
            args: vec![],
            restart: "always".into(),
            user: None,
        }
    }

    #[tokio::test]
    async fn activation_order() {
        let dir = tempdir().unwrap();
        let bin = dir.path().join("go2rtc");
        std::fs::write(&bin, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let host = FakeHost::root();
        let svc = ServiceManager::new(&host, "camhost");
        svc.activate(&unit_for(bin)).await.unwrap();
        assert_eq!(
            host.commands(),
            vec![
                "systemctl daemon-reload".to_string(),
                "systemctl enable camhost".to_string(),
                "systemctl start camhost".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn refuses_to_activate_missing_binary() {
        let dir = tempdir().unwrap();
        let host = FakeHost::root();
        let svc = ServiceManager::new(&host, "camhost");
        assert!(svc.activate(&unit_for(dir.path().join("go2rtc"))).await.is_err());
        assert!(host.commands().is_empty());
    }

    #[tokio::test]
    async fn wait_active_times_out_on_failed_service() {
        let host = FakeHost::root().respond(
            "systemctl is-active",
            CommandOutput {
                code: 3,
                stdout: "failed\n".into(),
                stderr: String::new(),
            },
        );
        let svc = ServiceManager::new(&host, "camhost");
        let err = svc.wait_active(WaitPolicy::immediate()).await.unwrap_err();
        match err {
            CoreError::ServiceNotActive { state, .. } => assert_eq!(state, "failed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn wait_active_reports_state_after_settle() {
        let active = CommandOutput {
            code: 0,
            stdout: "active\n".into(),
            stderr: String::new(),
        };
        let host = FakeHost::root()
            .respond_once("systemctl is-active", active)
            .respond(
                "systemctl is-active",
                CommandOutput {
                    code: 3,
                    stdout: "deactivating\n".into(),
                    stderr: String::new(),
                },
            );
        let svc = ServiceManager::new(&host, "camhost");
        let err = svc.wait_active(WaitPolicy::immediate()).await.unwrap_err();
        match err {
            CoreError::ServiceNotActive { state, .. } => assert_eq!(state, "deactivating"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn wait_active_confirms_twice() {
        let host = FakeHost::root();
        let svc = ServiceManager::new(&host, "camhost");
        svc.wait_active(WaitPolicy::immediate()).await.unwrap();
        let checks = host
            .commands()
            .iter()
            .filter(|c| c.as_str() == "systemctl is-active camhost")
            .count();
        assert_eq!(checks, 2);
    }

    #[tokio::test]
    async fn uninstall_removes_unit_and_reloads() {
        let dir = tempdir().unwrap();
        let unit_path = dir.path().join("camhost.service");
        std::fs::write(&unit_path, "[Unit]\n").unwrap();

        let host = FakeHost::root().fail("systemctl stop", 5, "not loaded");
        let svc = ServiceManager::new(&host, "camhost");
        assert!(svc.uninstall(&unit_path).await.unwrap());
        assert!(!unit_path.exists());
        assert_eq!(host.commands().last().unwrap(), "systemctl daemon-reload");

        assert!(!svc.uninstall(&unit_path).await.unwrap());
    }

    #[test]
    fn write_unit_creates_directory() {
        let dir = tempdir().unwrap();
        let unit_path = dir.path().join("system").join("camhost.service");
        let host = FakeHost::root();
        let svc = ServiceManager::new(&host, "camhost");
        svc.write_unit(&unit_for(PathBuf::from("/opt/camhost/go2rtc")), &unit_path)
            .unwrap();
        let text = std::fs::read_to_string(&unit_path).unwrap();
        assert!(text.contains("ExecStart=/opt/camhost/go2rtc\n"));
    }
}
