//! 下载：通过外部传输工具把远程文件保存到本地

use crate::error::{CoreError, Result};
use crate::host::{CommandSpec, Host};
use std::path::Path;

/// 支持的传输工具
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferTool {
    Curl,
    Wget,
    Fetch,
    BusyboxWget,
}

impl TransferTool {
    /// 脚本启动器的候选顺序
    pub const LAUNCHER_PREFERENCE: [TransferTool; 4] = [
        TransferTool::Curl,
        TransferTool::Wget,
        TransferTool::Fetch,
        TransferTool::BusyboxWget,
    ];

    /// 安装器只接受 curl / wget
    pub const INSTALLER_PREFERENCE: [TransferTool; 2] = [TransferTool::Curl, TransferTool::Wget];

    /// PATH 中需要存在的程序名
    pub fn program(&self) -> &'static str {
        match self {
            TransferTool::Curl => "curl",
            TransferTool::Wget => "wget",
            TransferTool::Fetch => "fetch",
            TransferTool::BusyboxWget => "busybox",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransferTool::BusyboxWget => "busybox wget",
            other => other.program(),
        }
    }

    /// 下载 `url` 到 `dest` 的命令
    pub fn download_command(&self, url: &str, dest: &Path) -> CommandSpec {
        let dest = dest.to_string_lossy().to_string();
        match self {
            TransferTool::Curl => CommandSpec::new(
                "curl",
                ["-fsSL", "--proto", "=https,http", "-o", dest.as_str(), url],
            ),
            TransferTool::Wget => CommandSpec::new("wget", ["-q", "-O", dest.as_str(), url]),
            TransferTool::Fetch => CommandSpec::new("fetch", ["-q", "-o", dest.as_str(), url]),
            TransferTool::BusyboxWget => {
                CommandSpec::new("busybox", ["wget", "-q", "-O", dest.as_str(), url])
            }
        }
    }

    /// 按给定顺序选出第一个可用工具
    pub fn resolve(host: &dyn Host, candidates: &[TransferTool]) -> Option<TransferTool> {
        candidates
            .iter()
            .copied()
            .find(|tool| host.has_tool(tool.program()))
    }
}

impl std::fmt::Display for TransferTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 下载文件；失败时删除残留的部分文件
pub async fn download(host: &dyn Host, tool: TransferTool, url: &str, dest: &Path) -> Result<()> {
    tracing::info!(tool = %tool, url, dest = %dest.display(), "downloading");
    let spec = tool.download_command(url, dest);
    let out = host.run(&spec).await?;
    if !out.success() {
        let _ = std::fs::remove_file(dest);
        let detail = out.stderr.trim();
        return Err(CoreError::download(
            url,
            if detail.is_empty() {
                format!("{} exited with {}", tool, out.code)
            } else {
                format!("{} exited with {}: {}", tool, out.code, detail)
            },
        ));
    }
    let size = std::fs::metadata(dest).map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        let _ = std::fs::remove_file(dest);
        return Err(CoreError::download(url, "downloaded file is empty"));
    }
    tracing::debug!(bytes = size, "download complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;
    use tempfile::tempdir;

    #[test]
    fn launcher_prefers_curl_then_wget_then_fetch_then_busybox() {
        let host = FakeHost::root().with_tools(["busybox", "fetch", "wget"]);
        assert_eq!(
            TransferTool::resolve(&host, &TransferTool::LAUNCHER_PREFERENCE),
            Some(TransferTool::Wget)
        );

        let host = FakeHost::root().with_tools(["busybox"]);
        assert_eq!(
            TransferTool::resolve(&host, &TransferTool::LAUNCHER_PREFERENCE),
            Some(TransferTool::BusyboxWget)
        );

        let host = FakeHost::root().with_tools(["fetch", "busybox"]);
        assert_eq!(
            TransferTool::resolve(&host, &TransferTool::INSTALLER_PREFERENCE),
            None
        );
    }

    #[test]
    fn download_commands_put_url_last() {
        let dest = Path::new("/tmp/x");
        for tool in TransferTool::LAUNCHER_PREFERENCE {
            let spec = tool.download_command("https://h/a.sh", dest);
            assert_eq!(spec.program, tool.program());
            assert_eq!(spec.args.last().map(String::as_str), Some("https://h/a.sh"));
            assert!(spec.args.iter().any(|a| a == "/tmp/x"));
        }
    }

    #[tokio::test]
    async fn download_writes_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("a.sh");
        let host = FakeHost::root()
            .with_tools(["curl"])
            .with_download("https://h/a.sh", b"echo hi\n".to_vec());
        download(&host, TransferTool::Curl, "https://h/a.sh", &dest)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"echo hi\n");
    }

    #[tokio::test]
    async fn failed_download_is_fatal_and_leaves_nothing() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("a.sh");
        let host = FakeHost::root().with_tools(["wget"]);
        let err = download(&host, TransferTool::Wget, "https://h/missing.sh", &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Download { .. }));
        assert!(!dest.exists());
    }
}
