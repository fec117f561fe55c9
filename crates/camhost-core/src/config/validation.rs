use super::CamhostConfig;
use crate::error::{CoreError, Result};
use crate::launcher::validate_script_name;
use crate::checksum::parse_sha256;
use std::path::{Component, Path};

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_FORMATS: [&str; 2] = ["text", "json"];
/// 重装与 --purge 会整体删除安装目录，这些目录不能作为安装目录
const PROTECTED_DIRS: [&str; 12] = [
    "/usr/bin",
    "/usr/sbin",
    "/usr/lib",
    "/usr/lib64",
    "/usr/local",
    "/usr/share",
    "/usr/include",
    "/var/lib",
    "/var/log",
    "/var/cache",
    "/etc/systemd",
    "/opt/bin",
];

const VALID_RESTART: [&str; 7] = [
    "no",
    "always",
    "on-success",
    "on-failure",
    "on-abnormal",
    "on-abort",
    "on-watchdog",
];

impl CamhostConfig {
    /// 验证配置参数的有效性
    pub fn validate(&self) -> Result<()> {
        let install = &self.install;
        if !install.install_dir.is_absolute() {
            return Err(CoreError::config_error(format!(
                "install.install_dir must be absolute: {}",
                install.install_dir.display()
            )));
        }
        validate_install_dir(&install.install_dir)?;
        if !install.release_url.starts_with("https://") && !install.release_url.starts_with("http://")
        {
            return Err(CoreError::config_error(format!(
                "install.release_url must be an http(s) URL: {}",
                install.release_url
            )));
        }
        if let Some(digest) = &install.release_sha256 {
            parse_sha256(digest)
                .map_err(|e| CoreError::config_error(format!("install.release_sha256: {e}")))?;
        }
        validate_file_name("install.binary_name", &install.binary_name)?;
        validate_file_name("install.config_file_name", &install.config_file_name)?;
        if install.camera_id.trim().is_empty() {
            return Err(CoreError::config_error("install.camera_id must not be empty"));
        }
        if install.url_prefix.is_empty() {
            return Err(CoreError::config_error("install.url_prefix must not be empty"));
        }
        if install.max_prompt_attempts == 0 {
            return Err(CoreError::config_error(
                "install.max_prompt_attempts must be greater than 0",
            ));
        }

        let service = &self.service;
        if service.name.is_empty()
            || !service
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
        {
            return Err(CoreError::config_error(format!(
                "service.name is not a valid unit name: {}",
                service.name
            )));
        }
        if !service.unit_dir.is_absolute() {
            return Err(CoreError::config_error("service.unit_dir must be absolute"));
        }
        if !is_valid_account_name(&service.user) {
            return Err(CoreError::config_error(format!(
                "service.user is not a valid account name: {}",
                service.user
            )));
        }
        if !VALID_RESTART.contains(&service.restart.as_str()) {
            return Err(CoreError::config_error(format!(
                "service.restart must be one of {}: {}",
                VALID_RESTART.join("|"),
                service.restart
            )));
        }

        let launcher = &self.launcher;
        if !launcher.base_url.starts_with("https://") && !launcher.base_url.starts_with("http://") {
            return Err(CoreError::config_error(format!(
                "launcher.base_url must be an http(s) URL: {}",
                launcher.base_url
            )));
        }
        validate_script_name(&launcher.default_script)
            .map_err(|e| CoreError::config_error(format!("launcher.default_script: {e}")))?;
        for (name, digest) in &launcher.pins {
            validate_script_name(name)
                .map_err(|e| CoreError::config_error(format!("launcher.pins: {e}")))?;
            parse_sha256(digest)
                .map_err(|e| CoreError::config_error(format!("launcher.pins.{name}: {e}")))?;
        }

        let telemetry = &self.telemetry;
        if !VALID_LEVELS.contains(&telemetry.log_level.to_lowercase().as_str()) {
            return Err(CoreError::config_error(format!(
                "Invalid log level: {}",
                telemetry.log_level
            )));
        }
        if !VALID_FORMATS.contains(&telemetry.log_format.to_lowercase().as_str()) {
            return Err(CoreError::config_error(format!(
                "Invalid log format: {}",
                telemetry.log_format
            )));
        }

        Ok(())
    }
}

/// 至少两级普通路径，且不是系统目录
fn validate_install_dir(dir: &Path) -> Result<()> {
    let mut depth = 0;
    for component in dir.components() {
        match component {
            Component::RootDir => {}
            Component::Normal(_) => depth += 1,
            _ => {
                return Err(CoreError::config_error(format!(
                    "install.install_dir must not contain '..': {}",
                    dir.display()
                )));
            }
        }
    }
    let normalized = dir.to_string_lossy();
    let normalized = normalized.trim_end_matches('/');
    if depth < 2 || PROTECTED_DIRS.contains(&normalized) {
        return Err(CoreError::config_error(format!(
            "install.install_dir must be a dedicated directory, not {}",
            dir.display()
        )));
    }
    Ok(())
}

fn validate_file_name(key: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.contains('/') || value == "." || value == ".." {
        return Err(CoreError::config_error(format!(
            "{key} must be a plain file name: {value}"
        )));
    }
    Ok(())
}

/// useradd 接受的账号名子集
pub fn is_valid_account_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 32
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}
