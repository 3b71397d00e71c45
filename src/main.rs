//! Application entry point for pressroom.
//!
//! Initializes storage, the event bus and the services, then waits for Ctrl+C.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use dotenv::dotenv;
use log::debug;
use log::info;
use log::warn;
use pressroom::config::Config;
use pressroom::event::Signal;
use pressroom::event::event_bus::EventBus;
use pressroom::logging::setup_logging;
use pressroom::repository::Repository;
use pressroom::service::Services;
use pressroom::subscriber;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let init_start = Instant::now();
    let config = load_config()?;

    let db = setup_database(&config, init_start).await?;
    let event_bus = setup_event_bus(&config, db.clone())?;
    let services = Arc::new(Services::new(db, event_bus));

    if config.reconcile_on_startup {
        reconcile(&services).await?;
    }

    run(init_start).await
}

fn load_config() -> Result<Arc<Config>> {
    let config = Arc::new(Config::new());
    setup_logging(&config)?;
    info!("Starting pressroom...");
    for warning in &config.env_warnings {
        warn!("{warning}");
    }
    debug!("Configuration: {config:?}");
    Ok(config)
}

async fn setup_database(config: &Config, init_start: Instant) -> Result<Arc<Repository>> {
    debug!("Setting up Database...");
    let db = Arc::new(Repository::new(&config.db_url, &config.db_path).await?);

    info!("Running database migrations...");
    db.run_migrations().await?;
    info!(
        "Database setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );

    Ok(db)
}

fn setup_event_bus(config: &Config, db: Arc<Repository>) -> Result<Arc<EventBus>> {
    debug!("Setting up Subscribers...");
    let event_bus = EventBus::with_retry_policy(config.retry_policy());
    subscriber::register_all(&event_bus, db)?;

    for signal in Signal::ALL {
        let count = event_bus.subscriber_count(*signal);
        if count > 0 {
            debug!("{signal}: {count} subscriber(s)");
        }
    }
    Ok(Arc::new(event_bus))
}

async fn reconcile(services: &Services) -> Result<()> {
    info!("Reconciling counters...");
    let drifts = services.maintenance.reconcile_counters().await?;
    for drift in &drifts {
        info!(
            "Fixed {} of {}: {} -> {}",
            drift.counter.column(),
            drift.username,
            drift.stored,
            drift.actual
        );
    }
    Ok(())
}

async fn run(init_start: Instant) -> Result<()> {
    info!(
        "pressroom is up in {:.2}s. Press Ctrl+C to stop.",
        init_start.elapsed().as_secs_f64()
    );

    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down.");

    Ok(())
}
