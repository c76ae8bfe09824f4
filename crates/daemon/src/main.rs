// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! devarchd: the DevArch control plane daemon.

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let daemon = match devarch_daemon::Daemon::start().await {
        Ok(daemon) => daemon,
        Err(err) => {
            tracing::error!(error = %err, "startup failed");
            return std::process::ExitCode::FAILURE;
        }
    };
    tracing::info!(port = devarch_daemon::env::port(), "control plane ready");

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "signal handler failed");
    }
    daemon.shutdown().await;
    std::process::ExitCode::SUCCESS
}
