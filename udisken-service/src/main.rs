// SPDX-License-Identifier: GPL-3.0-only

//! udisken - automount removable storage through UDisks2
//!
//! Watches the UDisks2 ObjectManager for block devices, keeps one aggregate per
//! device and mounts new filesystems whose `HintAuto` is set.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use udisken_contracts::Notifier;
use udisken_udisks::{DesktopNotifier, DisabledNotifier, UdisksClient};

mod automount;
mod config;
mod device;
mod error;
mod logging;
mod registry;
#[cfg(test)]
mod testing;

use automount::AutomountEngine;
use config::{Cli, Environment, Settings};
use registry::DeviceRegistry;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli, &Environment::from_process())?;
    logging::init(settings.log_level);

    tracing::info!("Starting udisken v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &settings.source {
        tracing::debug!("Loaded configuration from {}", path.display());
    }
    tracing::debug!(
        "Automount: {}, notifications: {}, automount on attach: {}",
        settings.automount,
        settings.notify,
        settings.automount_on_attach
    );

    let client = UdisksClient::connect().await?;
    match client.version().await {
        Ok(version) => tracing::info!("Connected to UDisks version {version}"),
        Err(e) => tracing::warn!("Could not read UDisks version: {e}"),
    }

    let automount = if settings.automount {
        let notifier = notifier(settings.notify).await;
        Some(AutomountEngine::new(
            notifier,
            settings.notify,
            settings.mount_options.clone(),
        ))
    } else {
        tracing::info!("Automounting disabled, only tracking devices");
        None
    };

    let mut registry = DeviceRegistry::new(
        Arc::new(client.binder()),
        automount,
        settings.automount_on_attach,
    );

    // Subscribe before enumerating so nothing that appears in between is lost.
    let events = client.object_events().await?;
    let registered = registry.bootstrap(&client).await?;
    tracing::info!("Tracking {registered} block devices, waiting for events...");

    let result = registry.run(events, shutdown_signal()).await;

    tracing::info!("udisken shutting down");
    registry.shutdown();
    drop(registry);
    drop(client);

    match result {
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) => {
            tracing::warn!("{e}");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

async fn notifier(enabled: bool) -> Arc<dyn Notifier> {
    if !enabled {
        return Arc::new(DisabledNotifier);
    }

    match DesktopNotifier::new().await {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            tracing::warn!("Desktop notifications unavailable: {e}");
            Arc::new(DisabledNotifier)
        }
    }
}

async fn shutdown_signal() {
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            tracing::warn!("Cannot listen for SIGTERM: {e}");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Cannot listen for SIGINT: {e}");
                std::future::pending::<()>().await;
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => tracing::info!("Received SIGINT"),
            Err(e) => {
                tracing::warn!("Cannot listen for SIGINT: {e}");
                terminate.recv().await;
                tracing::info!("Received SIGTERM");
            }
        },
        _ = terminate.recv() => tracing::info!("Received SIGTERM"),
    }
}
