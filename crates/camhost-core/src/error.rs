//! 统一错误处理

use std::path::{Path, PathBuf};
use thiserror::Error;

/// 核心错误类型。任何一步失败都会终止整个流程。
#[derive(Error, Debug)]
pub enum CoreError {
    // === 预检 ===
    #[error("Permission denied: {operation} requires root (effective uid {uid})")]
    PermissionDenied { operation: String, uid: u32 },

    #[error("Required tool not found: {tool}")]
    ToolMissing { tool: String },

    // === 输入 ===
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("No valid {what} after {attempts} attempt(s)")]
    InputExhausted { what: String, attempts: u32 },

    #[error("{what} is required but no interactive input is available")]
    NotInteractive { what: String },

    #[error("Aborted: {reason}")]
    Declined { reason: String },

    // === 外部命令 ===
    #[error("Command failed: {command} (exit {code}){}", fmt_stderr(.stderr))]
    Command {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Service {service} did not become active (state: {state})")]
    ServiceNotActive { service: String, state: String },

    // === 下载与校验 ===
    #[error("Download failed: {url} - {message}")]
    Download { url: String, message: String },

    #[error("Checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Archive error: {message}")]
    Archive { message: String },

    // === 文件 ===
    #[error("File error: {path} - {message}")]
    File { path: PathBuf, message: String },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    // === 配置 ===
    #[error("Config error: {message}")]
    Config { message: String },

    #[error("Interrupted")]
    Interrupted,
}

fn fmt_stderr(stderr: &str) -> String {
    let s = stderr.trim();
    if s.is_empty() {
        String::new()
    } else {
        format!(": {s}")
    }
}

impl CoreError {
    pub fn config_error(message: impl Into<String>) -> Self {
        CoreError::Config {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        CoreError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn tool_missing(tool: impl Into<String>) -> Self {
        CoreError::ToolMissing { tool: tool.into() }
    }

    pub fn declined(reason: impl Into<String>) -> Self {
        CoreError::Declined {
            reason: reason.into(),
        }
    }

    pub fn archive(message: impl Into<String>) -> Self {
        CoreError::Archive {
            message: message.into(),
        }
    }

    pub fn download(url: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Download {
            url: url.into(),
            message: message.into(),
        }
    }

    /// 从 IO 错误创建文件错误，保留文件路径上下文
    pub fn from_io_with_path(err: std::io::Error, path: impl AsRef<Path>) -> Self {
        CoreError::File {
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }

    /// 用户拒绝或输入不可用等"预期内"的终止
    pub fn is_user_abort(&self) -> bool {
        matches!(
            self,
            CoreError::Declined { .. } | CoreError::NotInteractive { .. } | CoreError::Interrupted
        )
    }
}

/// Core 操作的 Result 类型别名
pub type Result<T> = std::result::Result<T, CoreError>;

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<figment::Error> for CoreError {
    fn from(err: figment::Error) -> Self {
        CoreError::Config {
            message: err.to_string(),
        }
    }
}

/// 为 IO 结果附加路径上下文
pub trait IoContext<T> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| CoreError::from_io_with_path(e, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_error_includes_trimmed_stderr() {
        let err = CoreError::Command {
            command: "apt-get install -y ffmpeg".into(),
            code: 100,
            stderr: "E: Unable to locate package\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "Command failed: apt-get install -y ffmpeg (exit 100): E: Unable to locate package"
        );
    }

    #[test]
    fn command_error_without_stderr() {
        let err = CoreError::Command {
            command: "systemctl start camhost".into(),
            code: 1,
            stderr: "  ".into(),
        };
        assert_eq!(err.to_string(), "Command failed: systemctl start camhost (exit 1)");
    }

    #[test]
    fn io_context_keeps_path() {
        let res: std::io::Result<()> = Err(std::io::Error::from(std::io::ErrorKind::NotFound));
        let err = res.with_path("/opt/camhost/go2rtc").unwrap_err();
        match err {
            CoreError::File { path, .. } => assert_eq!(path, PathBuf::from("/opt/camhost/go2rtc")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn user_abort_classification() {
        assert!(CoreError::declined("reinstall").is_user_abort());
        assert!(CoreError::Interrupted.is_user_abort());
        assert!(!CoreError::tool_missing("curl").is_user_abort());
    }
}
