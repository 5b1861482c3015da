//! # volv0xd — volv0x daemon
//!
//! Composition root that finds the proximity patch and keeps a GATT session
//! with it until interrupted.
//!
//! ## Responsibilities
//! - Load configuration (`volv0x.toml`, env vars) and initialise tracing
//! - Scan for the configured peripheral and register it with the btleplug transport
//! - Wire the lifecycle binder into a [`Session`] and start it
//! - Spawn the consumers: alerting, the driver, optional JSON snapshot output
//! - Map start to foreground and SIGINT / SIGTERM to teardown
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no connection logic belongs here.

mod config;
mod driver;
mod notifier;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use volv0x_adapter_ble::{BtleplugTransport, scanner};
use volv0x_app::alerting::AlertService;
use volv0x_app::lifecycle::LifecycleBinder;
use volv0x_app::session::Session;
use volv0x_domain::connection::ConnectionState;

use crate::config::Config;
use crate::driver::DriverConfig;
use crate::notifier::LogNotifier;

const SESSION_CAPACITY: usize = 64;
const TEARDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging.filter);

    let router_config = config.router_config()?;

    // BLE
    let central = scanner::default_adapter().await?;
    let peripheral = scanner::find_peripheral(&central, &config.peripheral).await?;
    let (transport, events) =
        BtleplugTransport::new(&central, config.peripheral.event_capacity).await?;
    let peripheral_id = transport.register(peripheral);
    let transport = Arc::new(transport);

    // Session
    tracing::info!(
        peripheral = %peripheral_id,
        byte_order = %router_config.codec.byte_order(),
        "peripheral registered"
    );
    let binder = LifecycleBinder::new(Arc::clone(&transport), peripheral_id, router_config);
    let (session, handle) = Session::new(binder, events, SESSION_CAPACITY);

    // Consumers
    let alerts = tokio::spawn(AlertService::new(LogNotifier).run(handle.subscribe()));
    let driver = tokio::spawn(driver::run(
        DriverConfig {
            mtu: config.gatt.mtu,
            greet: config.gatt.greet,
        },
        handle.clone(),
        handle.subscribe(),
    ));
    let printer = config
        .output
        .snapshots_as_json
        .then(|| tokio::spawn(print_snapshots(handle.subscribe())));

    let session = tokio::spawn(session.run());
    handle
        .foreground()
        .await
        .context("session stopped before start")?;

    shutdown_signal().await;
    tracing::info!("shutdown requested");
    if handle.shutdown().await.is_err() {
        tracing::warn!("session had already stopped");
    }
    drop(handle);

    session.await?;
    if tokio::time::timeout(TEARDOWN_GRACE, transport.closed())
        .await
        .is_err()
    {
        tracing::warn!("BLE teardown did not finish in time");
    }
    alerts.await?;
    driver.await?;
    if let Some(printer) = printer {
        printer.await?;
    }

    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn print_snapshots(mut snapshots: broadcast::Receiver<ConnectionState>) {
    loop {
        match snapshots.recv().await {
            Ok(state) => match serde_json::to_string(&state) {
                Ok(line) => println!("{line}"),
                Err(err) => tracing::warn!(%err, "failed to serialize snapshot"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "snapshot output lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
