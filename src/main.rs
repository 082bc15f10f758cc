//! Verigate: single-use email verification for a signup backend.
//! Used by: binary entrypoint.

pub mod accounts;
pub mod config;
pub mod console;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod ratelimit;
pub mod server;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod verification;

use std::time::Duration;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::Config::from_env()?;
    let state = state::build_state(&config)?;
    let _sweeper = verification::sweep::spawn_sweeper(
        state.tokens.clone(),
        Duration::from_secs(config.sweep_interval_secs),
    );

    console::print_banner();
    console::print_startup(
        &config.bind_addr,
        &format!("{:?}", config.token_backend).to_lowercase(),
        config.mail.is_some(),
    );
    tracing::info!("starting verigate on {}", config.bind_addr);

    server::run(state, &config.bind_addr).await?;
    Ok(())
}
