use std::collections::VecDeque;
use std::io::IsTerminal;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;

use kiwoom_token::config::{self, CliArgs, Config, InitialSettings};
use kiwoom_token::dashboard::{self, DashboardApp};
use kiwoom_token::logging::{self, LogOutput};
use kiwoom_token::TokenManager;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // First run: create a config file before anything reads it
    if config::needs_initial_setup(&args) {
        let path = config::expand_tilde(&args.config);
        if std::io::stdin().is_terminal() {
            let settings = config::run_interactive_setup()?;
            config::save_config_file(&path, &settings)?;
            println!("✅ Configuration saved to {}", path.display());
        } else {
            config::save_config_file(&path, &InitialSettings::placeholder())?;
            anyhow::bail!(
                "Created {} with placeholder keys; fill in [KIWOOM] appkey and secretkey, then run again",
                path.display()
            );
        }
    }

    let config = Config::load(&args)?;

    let log_buffer = Arc::new(Mutex::new(VecDeque::new()));
    let output = if config.once {
        LogOutput::Console
    } else {
        LogOutput::Dashboard(Arc::clone(&log_buffer))
    };
    logging::init(&config, output)?;

    config.validate()?;

    let manager = Arc::new(TokenManager::with_endpoints(
        config.credentials(),
        config.target_environment(),
        config.endpoints(),
        config.request_timeout(),
    )?);
    tracing::info!(
        "Token manager ready (environment: {}, server: {})",
        manager.environment(),
        manager.base_url()
    );

    if config.once {
        return issue_once(&manager).await;
    }

    let app = DashboardApp::new(manager, log_buffer, tokio::runtime::Handle::current());
    tokio::task::spawn_blocking(move || dashboard::run(app))
        .await
        .context("Dashboard task panicked")?
        .context("Dashboard terminal error")?;

    tracing::info!("👋 Token manager closed");
    Ok(())
}

/// Headless mode: issue one token and print the snapshot as JSON
async fn issue_once(manager: &TokenManager) -> Result<()> {
    if let Err(e) = manager.issue().await {
        tracing::error!("❌ Access token issuance failed: {}", e);
        anyhow::bail!("Token issuance failed: {}", e);
    }

    let info = manager.current_info();
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
