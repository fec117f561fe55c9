//! 统一配置
//!
//! 所有步骤都从这里读取参数，不依赖全局环境变量。加载顺序：
//! 默认值 -> camhost.toml -> `CAMHOST__` 前缀环境变量。

pub mod loader;
pub mod validation;

use crate::constants::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use loader::ConfigLoader;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CamhostConfig {
    #[serde(default)]
    pub install: InstallConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub launcher: LauncherConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// 安装流程配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InstallConfig {
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,
    /// 版本固定的发布地址，支持 {arch}
    #[serde(default = "default_release_url")]
    pub release_url: String,
    /// 发布包 SHA-256（可选）；设置后下载内容必须匹配
    #[serde(default)]
    pub release_sha256: Option<String>,
    /// 可执行文件名；同时作为安装标记
    #[serde(default = "default_binary_name")]
    pub binary_name: String,
    #[serde(default = "default_stream_config_name")]
    pub config_file_name: String,
    #[serde(default = "default_camera_id")]
    pub camera_id: String,
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    #[serde(default = "default_max_prompt_attempts")]
    pub max_prompt_attempts: u32,
    /// 通过系统包管理器安装的依赖
    #[serde(default = "default_packages")]
    pub packages: Vec<String>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            install_dir: default_install_dir(),
            release_url: default_release_url(),
            release_sha256: None,
            binary_name: default_binary_name(),
            config_file_name: default_stream_config_name(),
            camera_id: default_camera_id(),
            url_prefix: default_url_prefix(),
            max_prompt_attempts: default_max_prompt_attempts(),
            packages: default_packages(),
        }
    }
}

impl InstallConfig {
    /// 安装标记：已安装的可执行文件
    pub fn marker_path(&self) -> PathBuf {
        self.binary_path()
    }

    pub fn binary_path(&self) -> PathBuf {
        self.install_dir.join(&self.binary_name)
    }

    pub fn stream_config_path(&self) -> PathBuf {
        self.install_dir.join(&self.config_file_name)
    }
}

/// 服务运行身份
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceIdentity {
    /// 以 root 运行
    Root,
    /// 以专用低权限系统账号运行（默认）
    #[default]
    Dedicated,
}

impl std::str::FromStr for ServiceIdentity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "root" => Ok(ServiceIdentity::Root),
            "dedicated" => Ok(ServiceIdentity::Dedicated),
            other => Err(format!("unknown service identity: {other} (expected root|dedicated)")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default = "default_unit_dir")]
    pub unit_dir: PathBuf,
    #[serde(default)]
    pub identity: ServiceIdentity,
    #[serde(default = "default_service_user")]
    pub user: String,
    #[serde(default = "default_restart")]
    pub restart: String,
    #[serde(default = "default_start_timeout_sec")]
    pub start_timeout_sec: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            unit_dir: default_unit_dir(),
            identity: ServiceIdentity::default(),
            user: default_service_user(),
            restart: default_restart(),
            start_timeout_sec: default_start_timeout_sec(),
        }
    }
}

impl ServiceConfig {
    pub fn unit_path(&self) -> PathBuf {
        self.unit_dir.join(unit_file_name(&self.name))
    }

    /// 实际运行账号；root 身份时返回 None
    pub fn run_as(&self) -> Option<&str> {
        match self.identity {
            ServiceIdentity::Root => None,
            ServiceIdentity::Dedicated => Some(self.user.as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LauncherConfig {
    #[serde(default = "default_launcher_base_url")]
    pub base_url: String,
    #[serde(default = "default_launcher_script")]
    pub default_script: String,
    /// 脚本名 -> 固定的 SHA-256
    #[serde(default)]
    pub pins: BTreeMap<String, String>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            base_url: default_launcher_base_url(),
            default_script: default_launcher_script(),
            pins: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default)]
    pub log_no_ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            log_no_ansi: false,
        }
    }
}

fn default_install_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INSTALL_DIR)
}
fn default_release_url() -> String {
    DEFAULT_RELEASE_URL.to_string()
}
fn default_binary_name() -> String {
    DEFAULT_BINARY_NAME.to_string()
}
fn default_stream_config_name() -> String {
    DEFAULT_STREAM_CONFIG_NAME.to_string()
}
fn default_camera_id() -> String {
    DEFAULT_CAMERA_ID.to_string()
}
fn default_url_prefix() -> String {
    DEFAULT_URL_PREFIX.to_string()
}
fn default_max_prompt_attempts() -> u32 {
    DEFAULT_MAX_PROMPT_ATTEMPTS
}
fn default_packages() -> Vec<String> {
    vec!["ca-certificates".to_string(), "ffmpeg".to_string()]
}
fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}
fn default_unit_dir() -> PathBuf {
    PathBuf::from(DEFAULT_UNIT_DIR)
}
fn default_service_user() -> String {
    DEFAULT_SERVICE_USER.to_string()
}
fn default_restart() -> String {
    "always".to_string()
}
fn default_start_timeout_sec() -> u64 {
    20
}
fn default_launcher_base_url() -> String {
    DEFAULT_LAUNCHER_BASE_URL.to_string()
}
fn default_launcher_script() -> String {
    DEFAULT_LAUNCHER_SCRIPT.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_into_install_dir() {
        let cfg = CamhostConfig::default();
        assert_eq!(cfg.install.binary_path(), PathBuf::from("/opt/camhost/go2rtc"));
        assert_eq!(cfg.install.marker_path(), cfg.install.binary_path());
        assert_eq!(
            cfg.install.stream_config_path(),
            PathBuf::from("/opt/camhost/go2rtc.json")
        );
        assert_eq!(
            cfg.service.unit_path(),
            PathBuf::from("/etc/systemd/system/camhost.service")
        );
    }

    #[test]
    fn identity_defaults_to_dedicated_account() {
        let svc = ServiceConfig::default();
        assert_eq!(svc.identity, ServiceIdentity::Dedicated);
        assert_eq!(svc.run_as(), Some("camhost"));

        let root = ServiceConfig {
            identity: ServiceIdentity::Root,
            ..ServiceConfig::default()
        };
        assert_eq!(root.run_as(), None);
    }

    #[test]
    fn identity_parses_case_insensitively() {
        assert_eq!("ROOT".parse::<ServiceIdentity>(), Ok(ServiceIdentity::Root));
        assert_eq!(
            "dedicated".parse::<ServiceIdentity>(),
            Ok(ServiceIdentity::Dedicated)
        );
        assert!("nobody".parse::<ServiceIdentity>().is_err());
    }
}
