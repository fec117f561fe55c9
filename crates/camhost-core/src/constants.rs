// 默认安装位置与服务命名
pub const DEFAULT_INSTALL_DIR: &str = "/opt/camhost";
pub const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";
pub const DEFAULT_SERVICE_NAME: &str = "camhost";
pub const DEFAULT_SERVICE_USER: &str = "camhost";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/camhost/camhost.toml";

// 发布包（版本固定）。{arch} 在运行时展开为 amd64/arm64/arm
pub const DEFAULT_RELEASE_URL: &str =
    "https://github.com/AlexxIT/go2rtc/releases/download/v1.9.4/go2rtc_linux_{arch}";
pub const DEFAULT_BINARY_NAME: &str = "go2rtc";
pub const DEFAULT_STREAM_CONFIG_NAME: &str = "go2rtc.json";
pub const DEFAULT_CAMERA_ID: &str = "video";
pub const DEFAULT_URL_PREFIX: &str = "rtsp://";
pub const DEFAULT_MAX_PROMPT_ATTEMPTS: u32 = 3;

// 远程脚本
pub const DEFAULT_LAUNCHER_BASE_URL: &str = "https://raw.githubusercontent.com/camhost/scripts/main";
pub const DEFAULT_LAUNCHER_SCRIPT: &str = "install.sh";
pub const MAX_SCRIPT_NAME_LEN: usize = 128;

// 环境变量（与 figment 的 CAMHOST__ 前缀区分开）
pub const ENV_URL: &str = "CAMHOST_URL";
pub const ENV_DEBUG: &str = "CAMHOST_DEBUG";
pub const ENV_CONFIG_PREFIX: &str = "CAMHOST__";

pub const SYSTEMCTL: &str = "systemctl";
pub const JOURNALCTL: &str = "journalctl";


/// 将 Rust 的目标架构名映射为发布包使用的命名
pub fn release_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "arm" => "arm",
        "x86" => "386",
        other => other,
    }
}

/// 展开发布地址模板中的 {arch}
pub fn expand_release_url(template: &str) -> String {
    template.replace("{arch}", release_arch())
}

/// 服务单元文件名：<name>.service
pub fn unit_file_name(service_name: &str) -> String {
    format!("{service_name}.service")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_arch_placeholder() {
        let url = expand_release_url("https://example.com/v1/bin_linux_{arch}.tar.gz");
        assert!(!url.contains("{arch}"));
        assert!(url.ends_with(&format!("bin_linux_{}.tar.gz", release_arch())));
    }

    #[test]
    fn template_without_placeholder_is_unchanged() {
        assert_eq!(expand_release_url("https://x/y"), "https://x/y");
    }
}
