use camhost_core::config::CamhostConfig;
use camhost_core::constants::ENV_DEBUG;
use camhost_core::error::CoreError;
use camhost_core::telemetry::{debug_from_env, init_tracing_with};
use console::style;
mod client;
mod commands;
mod ui;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match client::parse_args(std::env::args()) {
        Ok(cli) => cli,
        Err(e) => {
            let code = client::parse_exit_code(&e);
            let _ = e.print();
            std::process::exit(code);
        }
    };
    let debug = cli.debug || debug_from_env(std::env::var(ENV_DEBUG).ok().as_deref());

    let cfg = match CamhostConfig::load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => fail(anyhow::Error::new(e).context("failed to load camhost configuration")),
    };
    init_tracing_with(&cfg.telemetry, debug);

    // 中断时丢弃流程 future，临时目录随之清理
    let result = tokio::select! {
        r = client::run(cli, &cfg) => r,
        _ = shutdown_signal() => Err(CoreError::Interrupted.into()),
    };

    if let Err(e) = result {
        fail(e);
    }
}

/// 等待 SIGINT 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}

fn fail(e: anyhow::Error) -> ! {
    if client::is_user_abort(&e) {
        eprintln!("{} {:#}", style("Aborted:").yellow().bold(), e);
    } else {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
    }
    std::process::exit(1);
}
