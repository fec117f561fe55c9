//! 通过系统包管理器安装依赖

use crate::error::{CoreError, Result};
use crate::host::{CommandSpec, Host};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Yum,
    Apk,
    Pacman,
    Zypper,
}

impl PackageManager {
    const DETECTION_ORDER: [PackageManager; 6] = [
        PackageManager::Apt,
        PackageManager::Dnf,
        PackageManager::Yum,
        PackageManager::Apk,
        PackageManager::Pacman,
        PackageManager::Zypper,
    ];

    pub fn program(&self) -> &'static str {
        match self {
            PackageManager::Apt => "apt-get",
            PackageManager::Dnf => "dnf",
            PackageManager::Yum => "yum",
            PackageManager::Apk => "apk",
            PackageManager::Pacman => "pacman",
            PackageManager::Zypper => "zypper",
        }
    }

    pub fn detect(host: &dyn Host) -> Option<Self> {
        Self::DETECTION_ORDER
            .into_iter()
            .find(|pm| host.has_tool(pm.program()))
    }

    /// 安装前刷新索引（部分包管理器不需要）
    pub fn refresh_command(&self) -> Option<CommandSpec> {
        match self {
            PackageManager::Apt => Some(CommandSpec::new("apt-get", ["update", "-q"])),
            PackageManager::Apk => Some(CommandSpec::new("apk", ["update", "-q"])),
            PackageManager::Pacman => Some(CommandSpec::new("pacman", ["-Sy", "--noconfirm"])),
            _ => None,
        }
    }

    pub fn install_command(&self, packages: &[String]) -> CommandSpec {
        let base: &[&str] = match self {
            PackageManager::Apt => &["install", "-y", "-q", "--no-install-recommends"],
            PackageManager::Dnf | PackageManager::Yum => &["install", "-y", "-q"],
            PackageManager::Apk => &["add", "--no-cache"],
            PackageManager::Pacman => &["-S", "--needed", "--noconfirm"],
            PackageManager::Zypper => &["--non-interactive", "install"],
        };
        let args = base
            .iter()
            .map(|s| s.to_string())
            .chain(packages.iter().cloned());
        CommandSpec::new(self.program(), args.collect::<Vec<_>>())
    }
}

/// 安装依赖包；列表为空时跳过
pub async fn install_packages(host: &dyn Host, packages: &[String]) -> Result<Option<PackageManager>> {
    if packages.is_empty() {
        tracing::debug!("no packages requested");
        return Ok(None);
    }
    if let Some(bad) = packages
        .iter()
        .find(|p| p.is_empty() || p.starts_with('-') || p.chars().any(char::is_whitespace))
    {
        return Err(CoreError::invalid_input(format!("invalid package name: {bad:?}")));
    }

    let pm = PackageManager::detect(host).ok_or_else(|| {
        CoreError::tool_missing("a supported package manager (apt-get, dnf, yum, apk, pacman, zypper)")
    })?;
    tracing::info!(manager = pm.program(), ?packages, "installing dependencies");

    if let Some(refresh) = pm.refresh_command() {
        host.run_checked(&refresh).await?;
    }
    host.run_checked(&pm.install_command(packages)).await?;
    Ok(Some(pm))
}
