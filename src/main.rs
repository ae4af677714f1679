mod config;
mod database;
mod models;
mod station;
mod utils;

use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::time::{sleep, Duration};

use config::StationConfig;
use database::store_weather_data;
use station::{poll_serial, StationPoller};
use utils::{duration_to_seconds, format_datetime, log_snapshot_summary};

async fn main_loop(
    config: StationConfig,
    shutdown: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting weather station data collection service");

    let poller = StationPoller::from_config(&config).with_shutdown_flag(shutdown);

    loop {
        let start_time = OffsetDateTime::now_utc();

        info!("Starting poll at: {}", format_datetime(&start_time));

        // The station protocol blocks on every step, keep it off the async workers
        let device = config.device.clone();
        let job_poller = poller.clone();
        let result =
            tokio::task::spawn_blocking(move || poll_serial(&device, &job_poller)).await?;

        match result {
            Ok(snapshot) => {
                log_snapshot_summary(&snapshot);

                if let Some(database_url) = &config.database_url {
                    if let Err(e) =
                        store_weather_data(&config.device, &snapshot, database_url).await
                    {
                        error!("Failed to store weather data from {}: {}", config.device, e);
                    } else {
                        info!("Successfully stored weather data from {}", config.device);
                    }
                }
            }
            Err(e) => {
                warn!("Poll failed, no data stored for this interval: {}", e);
            }
        }

        // Wait until next interval should start
        let total_elapsed = duration_to_seconds(OffsetDateTime::now_utc() - start_time);
        if total_elapsed < config.poll_interval_secs {
            let wait_time = config.poll_interval_secs - total_elapsed;
            info!("Waiting {} seconds until next poll", wait_time);
            sleep(Duration::from_secs(wait_time)).await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match StationConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Handle Ctrl+C gracefully
    let shutdown = Arc::new(AtomicBool::new(false));
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    let signal_flag = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        // A poll in progress stops before its next field read
        signal_flag.store(true, Ordering::SeqCst);
        let _ = tx.send(());
    });

    // Run main loop or wait for shutdown signal
    tokio::select! {
        result = main_loop(config, shutdown) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting after the current station read, if any.");
        }
    }

    Ok(())
}
