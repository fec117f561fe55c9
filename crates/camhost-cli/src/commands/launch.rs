use crate::ui::{log_detail, print_status};
use anyhow::{Context, Result};
use camhost_core::config::CamhostConfig;
use camhost_core::host::Host;
use camhost_core::launcher::{LaunchRequest, Launcher};
use clap::Args;

#[derive(Args, Debug)]
pub struct LaunchArgs {
    /// Script name under the launcher base URL (default: install.sh)
    #[arg(short, long, value_name = "NAME")]
    pub script: Option<String>,

    /// Expected SHA-256 of the script; overrides [launcher.pins]
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,

    /// Arguments passed to the script (after `--`)
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

pub async fn run_launch(host: &dyn Host, cfg: &CamhostConfig, args: LaunchArgs) -> Result<()> {
    let launcher = Launcher::new(host, &cfg.launcher);
    let req = LaunchRequest {
        script: args.script,
        sha256: args.sha256,
        args: args.args,
    };
    let name = req
        .script
        .clone()
        .unwrap_or_else(|| cfg.launcher.default_script.clone());
    tracing::debug!(script = %name, url = %launcher.script_url(&name), "launching remote script");

    let staged = launcher
        .run(&req)
        .await
        .with_context(|| format!("failed to launch {name}"))?;

    print_status(&format!("{} finished", staged.name), true);
    log_detail("sha256", &staged.sha256);
    Ok(())
}
