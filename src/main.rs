//! cookie-refresher service
//!
//! Refreshes the cookie file in a background thread and serves the health
//! endpoint until Ctrl-C.

use std::process::ExitCode;

use cookie_refresher::browser::WebDriverLauncher;
use cookie_refresher::server::{self, HealthState};
use cookie_refresher::telemetry::init_subscriber;
use cookie_refresher::{Config, CookieRefresher, RefreshWorker};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("cookie-refresher: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    init_subscriber(&config.log)?;
    tracing::info!(
        cookies_file = %config.cookies_file.display(),
        interval_secs = config.refresh_interval.as_secs(),
        "Starting cookie refresher"
    );

    // The blocking WebDriver client must be built outside the async runtime.
    let launcher = WebDriverLauncher::new(config.webdriver_url.clone(), config.browser)?;
    let health = HealthState::new(config.cookies_file.clone());
    let refresher = CookieRefresher::new(launcher, config.credentials, config.cookies_file);
    let worker = RefreshWorker::spawn(refresher, config.refresh_interval)?;

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let served = runtime.block_on(server::serve(config.bind_addr, health, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Shutting down...");
    }));

    worker.shutdown();
    served?;
    Ok(())
}
