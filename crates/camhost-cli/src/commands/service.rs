use crate::ui::{log_detail, print_header, print_info, print_status};
use anyhow::{Context, Result};
use camhost_core::config::CamhostConfig;
use camhost_core::host::Host;
use camhost_core::install::Installer;
use camhost_core::precheck::{require_root, require_service_manager};
use camhost_core::service::{ServiceManager, WaitPolicy};
use clap::Args;

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Follow the journal
    #[arg(short, long)]
    pub follow: bool,

    /// Number of lines to show
    #[arg(short = 'n', long, default_value_t = 100)]
    pub lines: u32,
}

#[derive(Args, Debug)]
pub struct UninstallArgs {
    /// Also delete the installation directory
    #[arg(long)]
    pub purge: bool,
}

#[derive(Debug)]
pub enum ServiceCmd {
    Status,
    Logs(LogsArgs),
    Start,
    Stop,
    Restart,
    Uninstall(UninstallArgs),
}

pub async fn run_service(host: &dyn Host, cfg: &CamhostConfig, cmd: ServiceCmd) -> Result<()> {
    require_service_manager(host)?;
    let manager = ServiceManager::new(host, cfg.service.name.clone());

    match cmd {
        ServiceCmd::Status => {
            if !manager.print_status().await? {
                anyhow::bail!("{} is not running", manager.name());
            }
        }
        ServiceCmd::Logs(args) => {
            manager.follow_logs(args.lines, args.follow).await?;
        }
        ServiceCmd::Start => {
            require_root(host, "start").await?;
            manager.start().await.context("failed to start service")?;
            manager
                .wait_active(WaitPolicy::from_timeout_secs(cfg.service.start_timeout_sec))
                .await?;
            print_status(&format!("{} started", manager.name()), true);
        }
        ServiceCmd::Stop => {
            require_root(host, "stop").await?;
            manager.stop().await.context("failed to stop service")?;
            print_status(&format!("{} stopped", manager.name()), true);
        }
        ServiceCmd::Restart => {
            require_root(host, "restart").await?;
            manager.restart().await.context("failed to restart service")?;
            manager
                .wait_active(WaitPolicy::from_timeout_secs(cfg.service.start_timeout_sec))
                .await?;
            print_status(&format!("{} restarted", manager.name()), true);
        }
        ServiceCmd::Uninstall(args) => {
            print_header("Uninstalling camhost");
            let report = Installer::new(host, cfg).uninstall(args.purge).await?;
            if report.unit_removed {
                print_status("Service unit removed", true);
                log_detail("unit", &report.unit_path.display().to_string());
            } else {
                print_info(&format!("No unit file at {}", report.unit_path.display()));
            }
            if report.purged {
                print_status("Installation directory removed", true);
                log_detail("dir", &cfg.install.install_dir.display().to_string());
            } else if !args.purge {
                print_info("Installation directory kept (use --purge to remove)");
            }
        }
    }
    Ok(())
}
