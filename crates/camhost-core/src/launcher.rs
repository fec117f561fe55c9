//! 远程脚本启动器
//!
//! 流程：校验脚本名 -> 下载到临时目录 -> 校验固定的 SHA-256 -> 用 /bin/sh 执行。
//! 没有固定摘要的脚本不会被执行。

use crate::checksum::{parse_sha256, verify_file};
use crate::config::LauncherConfig;
use crate::constants::MAX_SCRIPT_NAME_LEN;
use crate::error::{CoreError, Result};
use crate::fetch::{TransferTool, download};
use crate::host::{CommandSpec, Host};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static SCRIPT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9._-]*$").unwrap()
});

/// 脚本名只允许安全字符，不能以 `.` 开头，不含路径分隔符
pub fn validate_script_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("script name must not be empty".into());
    }
    if name.len() > MAX_SCRIPT_NAME_LEN {
        return Err(format!(
            "script name is longer than {MAX_SCRIPT_NAME_LEN} characters"
        ));
    }
    if !SCRIPT_NAME_RE.is_match(name) {
        return Err(format!(
            "invalid script name {name:?} (allowed: letters, digits, '.', '_', '-'; no leading '.')"
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct LaunchRequest {
    /// 未指定时使用配置中的默认脚本
    pub script: Option<String>,
    /// 命令行给出的摘要，优先于配置中的固定值
    pub sha256: Option<String>,
    /// 传给脚本的参数
    pub args: Vec<String>,
}

/// 已下载并通过校验的脚本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedScript {
    pub name: String,
    pub path: PathBuf,
    pub sha256: String,
}

pub struct Launcher<'a> {
    host: &'a dyn Host,
    config: &'a LauncherConfig,
}

impl<'a> Launcher<'a> {
    pub fn new(host: &'a dyn Host, config: &'a LauncherConfig) -> Self {
        Self { host, config }
    }

    pub fn script_url(&self, name: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), name)
    }

    /// 取固定摘要：命令行 > 配置
    pub fn pin_for(&self, name: &str, explicit: Option<&str>) -> Result<String> {
        let pin = explicit
            .map(str::to_string)
            .or_else(|| self.config.pins.get(name).cloned())
            .ok_or_else(|| {
                CoreError::invalid_input(format!(
                    "no pinned sha256 for {name}; pass --sha256 or add it to [launcher.pins]"
                ))
            })?;
        parse_sha256(&pin).map_err(|e| CoreError::invalid_input(format!("sha256 for {name}: {e}")))
    }

    /// 下载到 `staging_dir` 并校验摘要；不匹配时删除文件
    pub async fn stage(
        &self,
        tool: TransferTool,
        name: &str,
        pin: &str,
        staging_dir: &Path,
    ) -> Result<StagedScript> {
        validate_script_name(name).map_err(CoreError::invalid_input)?;
        let url = self.script_url(name);
        let path = staging_dir.join(name);
        download(self.host, tool, &url, &path).await?;

        match verify_file(&path, name, pin) {
            Ok(sha256) => {
                tracing::info!(script = name, %sha256, "script verified");
                Ok(StagedScript {
                    name: name.to_string(),
                    path,
                    sha256,
                })
            }
            Err(e) => {
                let _ = std::fs::remove_file(&path);
                Err(e)
            }
        }
    }

    /// 执行已校验的脚本；非零退出码视为失败
    pub async fn execute(&self, staged: &StagedScript, args: &[String]) -> Result<()> {
        let mut argv = vec![staged.path.to_string_lossy().to_string()];
        argv.extend(args.iter().cloned());
        let spec = CommandSpec::new("/bin/sh", argv).interactive();
        tracing::debug!(command = %spec.display(), "executing staged script");
        let out = self.host.run(&spec).await?;
        if !out.success() {
            return Err(CoreError::Command {
                command: format!("sh {}", staged.name),
                code: out.code,
                stderr: String::new(),
            });
        }
        Ok(())
    }

    /// 完整流程。临时目录在返回时删除
    pub async fn run(&self, req: &LaunchRequest) -> Result<StagedScript> {
        let name = req
            .script
            .clone()
            .unwrap_or_else(|| self.config.default_script.clone());
        validate_script_name(&name).map_err(CoreError::invalid_input)?;
        let pin = self.pin_for(&name, req.sha256.as_deref())?;

        let tool = TransferTool::resolve(self.host, &TransferTool::LAUNCHER_PREFERENCE)
            .ok_or_else(|| CoreError::tool_missing("curl, wget, fetch or busybox"))?;
        tracing::debug!(%tool, "selected transfer tool");

        let staging = tempfile::Builder::new()
            .prefix("camhost-launch-")
            .tempdir()
            .map_err(|e| CoreError::from_io_with_path(e, std::env::temp_dir()))?;
        let staged = self.stage(tool, &name, &pin, staging.path()).await?;
        self.execute(&staged, &req.args).await?;
        Ok(staged)
    }
}
