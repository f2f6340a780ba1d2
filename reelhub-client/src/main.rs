//! `reelhub-probe`: check connectivity and credentials against the backend.
//!
//! Usage: `reelhub-probe [--config <path>] [--api-key <key>]`

use std::process::ExitCode;

use reelhub_client::{init_logging, open_store, run_probe, BackendApi, CachedApiClient};
use reelhub_core::{BackendConfig, ReelhubResult, TenantCredential};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match BackendConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(config.log_format) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Backend probe failed");
            eprintln!("Backend probe failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &BackendConfig) -> ReelhubResult<()> {
    let store = open_store(&config.cache)?;
    let credential = api_key_from_args().map(TenantCredential::new);
    let client = CachedApiClient::configure(config, credential, store)?;

    tracing::info!(
        base_url = client.base_url(),
        credential_len = client.credential().len(),
        timeout_secs = config.timeout_secs,
        "Starting backend probe"
    );

    let api = BackendApi::new(client);
    let mut stdout = std::io::stdout();
    let report = run_probe(&api, &mut stdout).await?;

    if !report.is_complete() {
        tracing::warn!(unavailable = ?report.unavailable, "Some optional sections were unavailable");
    }
    Ok(())
}

fn api_key_from_args() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--api-key" {
            return args.next().filter(|key| !key.trim().is_empty());
        }
    }
    None
}
