//! 服务运行账号

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::host::{CommandSpec, Host};
use std::path::Path;

/// 账号是否存在
pub async fn account_exists(host: &dyn Host, user: &str) -> Result<bool> {
    Ok(host.run(&CommandSpec::new("id", ["-u", user])).await?.success())
}

/// 专用身份：账号不存在时创建系统账号（无登录 shell、无家目录）
pub async fn ensure_account(host: &dyn Host, user: &str) -> Result<bool> {
    if account_exists(host, user).await? {
        tracing::debug!(user, "service account already exists");
        return Ok(false);
    }
    tracing::info!(user, "creating service account");
    host.run_checked(&CommandSpec::new(
        "useradd",
        [
            "--system",
            "--no-create-home",
            "--user-group",
            "--shell",
            "/usr/sbin/nologin",
            user,
        ],
    ))
    .await?;
    Ok(true)
}

/// 根据配置的身份准备账号并设置安装目录属主
pub async fn apply_identity(host: &dyn Host, service: &ServiceConfig, install_dir: &Path) -> Result<()> {
    let Some(user) = service.run_as() else {
        tracing::info!("service will run as root");
        return Ok(());
    };
    ensure_account(host, user).await?;
    // 属组取账号的主组
    let owner = format!("{user}:");
    let dir = install_dir.to_string_lossy();
    host.run_checked(&CommandSpec::new("chown", ["-R", owner.as_str(), &*dir]))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceIdentity;
    use crate::host::CommandOutput;
    use crate::testing::FakeHost;

    #[tokio::test]
    async fn creates_missing_account_and_chowns() {
        let host = FakeHost::root().fail("id -u camhost", 1, "id: 'camhost': no such user");
        apply_identity(&host, &ServiceConfig::default(), Path::new("/opt/camhost"))
            .await
            .unwrap();
        assert_eq!(
            host.commands(),
            vec![
                "id -u camhost".to_string(),
                "useradd --system --no-create-home --user-group --shell /usr/sbin/nologin camhost"
                    .to_string(),
                "chown -R camhost: /opt/camhost".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn existing_account_is_reused() {
        let host = FakeHost::root().respond(
            "id -u camhost",
            CommandOutput {
                code: 0,
                stdout: "998\n".into(),
                stderr: String::new(),
            },
        );
        assert!(!ensure_account(&host, "camhost").await.unwrap());
        assert!(!host.ran("useradd"));
    }

    #[tokio::test]
    async fn existing_account_keeps_its_primary_group() {
        let host = FakeHost::root().respond(
            "id -u camhost",
            CommandOutput {
                code: 0,
                stdout: "998\n".into(),
                stderr: String::new(),
            },
        );
        apply_identity(&host, &ServiceConfig::default(), Path::new("/opt/camhost"))
            .await
            .unwrap();
        assert_eq!(host.commands().last().unwrap(), "chown -R camhost: /opt/camhost");
        assert!(!host.ran("chown -R camhost:camhost"));
    }

    #[tokio::test]
    async fn root_identity_touches_nothing() {
        let host = FakeHost::root();
        let svc = ServiceConfig {
            identity: ServiceIdentity::Root,
            ..ServiceConfig::default()
        };
        apply_identity(&host, &svc, Path::new("/opt/camhost")).await.unwrap();
        assert!(host.commands().is_empty());
    }
}
