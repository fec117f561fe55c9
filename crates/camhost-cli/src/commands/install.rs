use crate::ui::{
    StepReporter, TermPrompt, log_detail, print_header, print_info, print_next_step,
    print_warning,
};
use anyhow::Result;
use camhost_core::config::{CamhostConfig, ServiceIdentity};
use camhost_core::constants::ENV_URL;
use camhost_core::error::CoreError;
use camhost_core::host::Host;
use camhost_core::install::{InstallOptions, Installer};
use camhost_core::service::{ServiceManager, WaitPolicy};
use clap::Args;
use console::style;

/// 启动失败时展示的日志行数
const FAILURE_LOG_LINES: u32 = 80;

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Camera stream URL (rtsp://...); falls back to CAMHOST_URL, then a prompt
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Reinstall over an existing installation without asking
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Account the service runs as
    #[arg(long, value_name = "root|dedicated")]
    pub identity: Option<ServiceIdentity>,
}

pub async fn run_install(host: &dyn Host, cfg: &CamhostConfig, args: InstallArgs) -> Result<()> {
    let mut cfg = cfg.clone();
    if let Some(identity) = args.identity {
        cfg.service.identity = identity;
    }

    print_header("Installing camhost");

    let mut opts = InstallOptions::new(args.url, std::env::var(ENV_URL).ok());
    opts.assume_yes = args.yes;
    opts.wait = WaitPolicy::from_timeout_secs(cfg.service.start_timeout_sec);

    let installer = Installer::new(host, &cfg);
    let mut prompt = TermPrompt::stdin();
    let mut reporter = StepReporter::new();

    let report = match installer.run(&opts, &mut prompt, &mut reporter).await {
        Ok(report) => report,
        Err(e) => {
            reporter.abort();
            if let CoreError::ServiceNotActive { service, .. } = &e {
                show_recent_logs(host, service).await;
            }
            return Err(e.into());
        }
    };
    drop(reporter);

    println!();
    println!(
        "  {} {}",
        style("camhost").green().bold(),
        if report.reinstalled { "reinstalled" } else { "installed" }
    );
    log_detail("binary", &report.binary_path.display().to_string());
    log_detail("config", &report.config_path.display().to_string());
    log_detail("unit", &report.unit_path.display().to_string());
    log_detail("run as", cfg.service.run_as().unwrap_or("root"));
    if let Some(pm) = report.package_manager {
        log_detail("packages", pm.program());
    }

    println!();
    let service = ServiceManager::new(host, cfg.service.name.clone());
    if !service.print_status().await? {
        print_warning("systemctl status reported a problem");
    }

    println!();
    print_next_step("camhost logs -f");
    print_next_step(&format!("edit {} to add streams", report.config_path.display()));
    Ok(())
}

async fn show_recent_logs(host: &dyn Host, service: &str) {
    let manager = ServiceManager::new(host, service);
    match manager.recent_logs(FAILURE_LOG_LINES).await {
        Ok(logs) if !logs.trim().is_empty() => {
            println!();
            print_info(&format!("Last {FAILURE_LOG_LINES} log lines of {service}:"));
            println!("{}", style(logs.trim_end()).dim());
        }
        Ok(_) => print_info(&format!("No log output from {service}")),
        Err(e) => tracing::debug!("failed to read journal: {e}"),
    }
}
