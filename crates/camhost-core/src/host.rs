//! 宿主机访问：外部命令、工具查找、权限
//!
//! 所有步骤都通过 [`Host`] 调用外部世界，测试中以假实现替换。

use crate::error::{CoreError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// 外部命令的执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// 一条待执行的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// 继承终端 stdio（用于 systemctl status、journalctl、脚本执行）
    pub inherit_stdio: bool,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(|a| a.as_ref().to_string()).collect(),
            inherit_stdio: false,
        }
    }

    pub fn interactive(mut self) -> Self {
        self.inherit_stdio = true;
        self
    }

    /// 用于日志与错误信息的命令行
    pub fn display(&self) -> String {
        let mut s = self.program.clone();
        for a in &self.args {
            s.push(' ');
            s.push_str(a);
        }
        s
    }
}

#[async_trait]
pub trait Host: Send + Sync {
    /// 有效用户 ID
    async fn effective_uid(&self) -> Result<u32>;

    /// 在 PATH 中查找工具
    fn find_tool(&self, name: &str) -> Option<PathBuf>;

    /// 执行命令并返回结果（不检查退出码）
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// 执行命令，退出码非零时报错
    async fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let out = self.run(spec).await?;
        if !out.success() {
            return Err(CoreError::Command {
                command: spec.display(),
                code: out.code,
                stderr: out.stderr,
            });
        }
        Ok(out)
    }

    fn has_tool(&self, name: &str) -> bool {
        self.find_tool(name).is_some()
    }
}

/// 真实宿主机
#[derive(Debug, Default, Clone)]
pub struct SystemHost;

impl SystemHost {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Host for SystemHost {
    async fn effective_uid(&self) -> Result<u32> {
        let out = self.run(&CommandSpec::new("id", ["-u"])).await?;
        if !out.success() {
            return Err(CoreError::Command {
                command: "id -u".into(),
                code: out.code,
                stderr: out.stderr,
            });
        }
        out.stdout
            .trim()
            .parse::<u32>()
            .map_err(|e| CoreError::invalid_input(format!("unexpected output of id -u: {e}")))
    }

    fn find_tool(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }

    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        tracing::debug!(command = %spec.display(), "running");
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).kill_on_drop(true);

        if spec.inherit_stdio {
            let status = cmd
                .status()
                .await
                .map_err(|e| spawn_error(&spec.program, e))?;
            return Ok(CommandOutput {
                code: status.code().unwrap_or(-1),
                ..CommandOutput::default()
            });
        }

        let out = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| spawn_error(&spec.program, e))?;

        let output = CommandOutput {
            code: out.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        };
        tracing::debug!(command = %spec.display(), code = output.code, "finished");
        Ok(output)
    }
}

fn spawn_error(program: &str, err: std::io::Error) -> CoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        CoreError::tool_missing(program)
    } else {
        CoreError::Command {
            command: program.to_string(),
            code: -1,
            stderr: err.to_string(),
        }
    }
}

/// 文件存在且有执行权限
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
