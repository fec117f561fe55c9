//! 安装前检查：权限、服务管理器、下载工具。只读，不做任何修改。

use crate::constants::SYSTEMCTL;
use crate::error::{CoreError, Result};
use crate::fetch::TransferTool;
use crate::host::Host;

/// 预检通过后的宿主机信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecheckReport {
    pub transfer_tool: TransferTool,
}

/// 需要 root 权限
pub async fn require_root(host: &dyn Host, operation: &str) -> Result<()> {
    let uid = host.effective_uid().await?;
    if uid != 0 {
        return Err(CoreError::PermissionDenied {
            operation: operation.to_string(),
            uid,
        });
    }
    Ok(())
}

pub fn require_service_manager(host: &dyn Host) -> Result<()> {
    if !host.has_tool(SYSTEMCTL) {
        return Err(CoreError::tool_missing(format!(
            "{SYSTEMCTL} (systemd is required to register the service)"
        )));
    }
    Ok(())
}

/// 安装预检。任意一项失败立即返回。
pub async fn precheck_install_host(host: &dyn Host) -> Result<PrecheckReport> {
    require_root(host, "install").await?;
    require_service_manager(host)?;

    let transfer_tool = TransferTool::resolve(host, &TransferTool::INSTALLER_PREFERENCE)
        .ok_or_else(|| {
            CoreError::tool_missing(
                TransferTool::INSTALLER_PREFERENCE
                    .iter()
                    .map(|t| t.name())
                    .collect::<Vec<_>>()
                    .join(" or "),
            )
        })?;
    tracing::debug!(tool = %transfer_tool, "precheck passed");

    Ok(PrecheckReport { transfer_tool })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;

    #[tokio::test]
    async fn non_root_fails_before_anything_else() {
        let host = FakeHost::with_uid(1000).with_tools(["systemctl", "curl"]);
        let err = precheck_install_host(&host).await.unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied { uid: 1000, .. }));
        assert!(host.commands().is_empty());
    }

    #[tokio::test]
    async fn missing_systemctl() {
        let host = FakeHost::root().with_tools(["curl"]);
        let err = precheck_install_host(&host).await.unwrap_err();
        assert!(err.to_string().contains("systemctl"));
    }

    #[tokio::test]
    async fn needs_curl_or_wget() {
        let host = FakeHost::root().with_tools(["systemctl", "fetch"]);
        let err = precheck_install_host(&host).await.unwrap_err();
        assert_eq!(err.to_string(), "Required tool not found: curl or wget");

        let host = FakeHost::root().with_tools(["systemctl", "wget"]);
        let report = precheck_install_host(&host).await.unwrap();
        assert_eq!(report.transfer_tool, TransferTool::Wget);

        let host = FakeHost::root().with_tools(["systemctl", "wget", "curl"]);
        let report = precheck_install_host(&host).await.unwrap();
        assert_eq!(report.transfer_tool, TransferTool::Curl);
    }
}
