//! 安装流程
//!
//! 预检 -> 解析地址 -> 检查已有安装 -> 安装依赖 -> 下载解包 -> 部署 -> 注册并启动服务。
//! 任一步骤失败即终止；临时目录在任何退出路径上都会被删除。

use crate::account::apply_identity;
use crate::archive::{ArchiveKind, unpack};
use crate::checksum::verify_file;
use crate::config::CamhostConfig;
use crate::constants::expand_release_url;
use crate::error::{CoreError, IoContext, Result};
use crate::fetch::download;
use crate::host::Host;
use crate::input::{Prompt, ResolvedUrl, UrlResolver};
use crate::packages::{PackageManager, install_packages};
use crate::precheck::precheck_install_host;
use crate::service::{ServiceManager, WaitPolicy};
use crate::stream_config::StreamConfig;
use crate::unit::ServiceUnit;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStep {
    Precheck,
    ResolveUrl,
    CheckExisting,
    Dependencies,
    Download,
    Extract,
    Deploy,
    Identity,
    Register,
    Activate,
}

impl InstallStep {
    pub fn label(&self) -> &'static str {
        match self {
            InstallStep::Precheck => "Checking host",
            InstallStep::ResolveUrl => "Resolving camera URL",
            InstallStep::CheckExisting => "Checking existing installation",
            InstallStep::Dependencies => "Installing dependencies",
            InstallStep::Download => "Downloading release",
            InstallStep::Extract => "Extracting release",
            InstallStep::Deploy => "Deploying files",
            InstallStep::Identity => "Preparing service account",
            InstallStep::Register => "Writing service unit",
            InstallStep::Activate => "Starting service",
        }
    }
}

/// 进度回调；CLI 用它驱动终端输出
pub trait InstallReporter {
    fn started(&mut self, _step: InstallStep) {}
    fn finished(&mut self, _step: InstallStep, _detail: &str) {}
}

pub struct NoopReporter;

impl InstallReporter for NoopReporter {}

#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub url_flag: Option<String>,
    pub url_env: Option<String>,
    /// 已有安装时不询问直接重装
    pub assume_yes: bool,
    pub wait: WaitPolicy,
}

impl InstallOptions {
    pub fn new(url_flag: Option<String>, url_env: Option<String>) -> Self {
        Self {
            url_flag,
            url_env,
            assume_yes: false,
            wait: WaitPolicy::from_timeout_secs(20),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstallReport {
    pub url: ResolvedUrl,
    pub binary_path: PathBuf,
    pub config_path: PathBuf,
    pub unit_path: PathBuf,
    pub reinstalled: bool,
    pub package_manager: Option<PackageManager>,
}

#[derive(Debug, Clone)]
pub struct UninstallReport {
    pub unit_path: PathBuf,
    pub unit_removed: bool,
    pub purged: bool,
}

pub struct Installer<'a> {
    host: &'a dyn Host,
    config: &'a CamhostConfig,
}

impl<'a> Installer<'a> {
    pub fn new(host: &'a dyn Host, config: &'a CamhostConfig) -> Self {
        Self { host, config }
    }

    /// 服务单元描述
    pub fn service_unit(&self) -> ServiceUnit {
        let install = &self.config.install;
        ServiceUnit {
            name: self.config.service.name.clone(),
            description: format!("camhost stream server ({})", install.binary_name),
            exec_start: install.binary_path(),
            args: vec![
                "-config".to_string(),
                install.stream_config_path().to_string_lossy().to_string(),
            ],
            working_directory: install.install_dir.clone(),
            restart: self.config.service.restart.clone(),
            user: self.config.service.run_as().map(str::to_string),
        }
    }

    pub async fn run(
        &self,
        opts: &InstallOptions,
        prompt: &mut dyn Prompt,
        reporter: &mut dyn InstallReporter,
    ) -> Result<InstallReport> {
        let install = &self.config.install;
        let service = ServiceManager::new(self.host, self.config.service.name.clone());

        reporter.started(InstallStep::Precheck);
        let precheck = precheck_install_host(self.host).await?;
        reporter.finished(
            InstallStep::Precheck,
            &format!("root, systemd, {}", precheck.transfer_tool),
        );

        reporter.started(InstallStep::ResolveUrl);
        let url = UrlResolver::new(&install.url_prefix, install.max_prompt_attempts).resolve(
            opts.url_flag.as_deref(),
            opts.url_env.as_deref(),
            prompt,
        )?;
        reporter.finished(InstallStep::ResolveUrl, &format!("from {}", url.source));

        reporter.started(InstallStep::CheckExisting);
        let reinstall = self.confirm_reinstall(opts.assume_yes, prompt)?;
        reporter.finished(
            InstallStep::CheckExisting,
            if reinstall { "will reinstall" } else { "fresh install" },
        );

        reporter.started(InstallStep::Dependencies);
        let package_manager = install_packages(self.host, &install.packages).await?;
        reporter.finished(
            InstallStep::Dependencies,
            package_manager.map(|pm| pm.program()).unwrap_or("none requested"),
        );

        // 临时工作目录：离开作用域即删除
        let work = tempfile::Builder::new()
            .prefix("camhost-")
            .tempdir()
            .map_err(|e| CoreError::from_io_with_path(e, std::env::temp_dir()))?;
        tracing::debug!(dir = %work.path().display(), "working directory");

        reporter.started(InstallStep::Download);
        let release_url = expand_release_url(&install.release_url);
        let kind = ArchiveKind::from_url(&release_url);
        let download_path = work.path().join("release.download");
        download(self.host, precheck.transfer_tool, &release_url, &download_path).await?;
        if let Some(pin) = &install.release_sha256 {
            verify_file(&download_path, &release_url, pin)?;
        }
        reporter.finished(InstallStep::Download, &release_url);

        reporter.started(InstallStep::Extract);
        let payload = unpack(
            kind,
            &download_path,
            &work.path().join("extract"),
            &install.binary_name,
        )
        .await?;
        reporter.finished(InstallStep::Extract, &format!("{kind:?}"));

        reporter.started(InstallStep::Deploy);
        if reinstall {
            // 旧服务可能仍在运行；停止失败不影响重装
            if let Err(e) = service.stop().await {
                tracing::debug!("stopping previous service: {e}");
            }
            std::fs::remove_dir_all(&install.install_dir).with_path(&install.install_dir)?;
            tracing::info!(dir = %install.install_dir.display(), "removed previous installation");
        }
        std::fs::create_dir_all(&install.install_dir).with_path(&install.install_dir)?;
        copy_tree(&payload, &install.install_dir)?;
        let stream_config = StreamConfig::single(install.camera_id.clone(), url.url.clone())?;
        let config_path = install.stream_config_path();
        stream_config.write(&config_path, 0o640)?;
        reporter.finished(InstallStep::Deploy, &install.install_dir.display().to_string());

        reporter.started(InstallStep::Identity);
        apply_identity(self.host, &self.config.service, &install.install_dir).await?;
        reporter.finished(
            InstallStep::Identity,
            self.config.service.run_as().unwrap_or("root"),
        );

        reporter.started(InstallStep::Register);
        let unit = self.service_unit();
        let unit_path = self.config.service.unit_path();
        service.write_unit(&unit, &unit_path)?;
        reporter.finished(InstallStep::Register, &unit_path.display().to_string());

        reporter.started(InstallStep::Activate);
        service.activate(&unit).await?;
        service.wait_active(opts.wait).await?;
        reporter.finished(InstallStep::Activate, "active");

        Ok(InstallReport {
            url,
            binary_path: install.binary_path(),
            config_path,
            unit_path,
            reinstalled: reinstall,
            package_manager,
        })
    }

    /// 卸载服务；`purge` 时同时删除安装目录
    pub async fn uninstall(&self, purge: bool) -> Result<UninstallReport> {
        crate::precheck::require_root(self.host, "uninstall").await?;
        let service = ServiceManager::new(self.host, self.config.service.name.clone());
        let unit_path = self.config.service.unit_path();
        let unit_removed = service.uninstall(&unit_path).await?;

        let install_dir = &self.config.install.install_dir;
        let purged = purge && install_dir.exists();
        if purged {
            std::fs::remove_dir_all(install_dir).with_path(install_dir)?;
            tracing::info!(dir = %install_dir.display(), "removed installation directory");
        }
        Ok(UninstallReport {
            unit_path,
            unit_removed,
            purged,
        })
    }

    /// 已有安装时询问是否重装；拒绝即终止，不做任何删除
    fn confirm_reinstall(&self, assume_yes: bool, prompt: &mut dyn Prompt) -> Result<bool> {
        let marker = self.config.install.marker_path();
        if !marker.exists() {
            return Ok(false);
        }
        if assume_yes {
            tracing::info!(marker = %marker.display(), "existing installation, reinstalling (--yes)");
            return Ok(true);
        }
        if !prompt.is_interactive() {
            return Err(CoreError::declined(format!(
                "{} already exists; rerun with --yes to reinstall",
                marker.display()
            )));
        }
        let question = format!(
            "{} already exists. Remove {} and reinstall?",
            marker.display(),
            self.config.install.install_dir.display()
        );
        match prompt.confirm(&question) {
            Some(true) => Ok(true),
            _ => Err(CoreError::declined("existing installation kept")),
        }
    }
}

/// 递归复制目录内容，保留权限与符号链接
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in std::fs::read_dir(src).with_path(src)? {
        let entry = entry.with_path(src)?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let ft = entry.file_type().with_path(&from)?;
        if ft.is_dir() {
            std::fs::create_dir_all(&to).with_path(&to)?;
            copy_tree(&from, &to)?;
        } else if ft.is_symlink() {
            let target = std::fs::read_link(&from).with_path(&from)?;
            std::os::unix::fs::symlink(target, &to).with_path(&to)?;
        } else {
            std::fs::copy(&from, &to).with_path(&to)?;
        }
    }
    Ok(())
}
