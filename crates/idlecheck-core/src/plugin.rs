//! Plugin lifecycle: attach, route events, tear down

use idlecheck_config::{IdleConfig, load_config};
use idlecheck_host_api::{MembershipStore, SessionTransport};
use idlecheck_util::{IdleCheckError, Result};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::{EventRouter, IdleScheduler, ReconcileSummary, reconcile};

/// The idle-check plugin attached to one host session
pub struct IdleCheck {
    transport: Arc<dyn SessionTransport>,
    scheduler: IdleScheduler,
    router: EventRouter,
}

impl IdleCheck {
    pub fn new(
        config: IdleConfig,
        store: Arc<dyn MembershipStore>,
        transport: Arc<dyn SessionTransport>,
    ) -> Self {
        let scheduler = IdleScheduler::new(config, store, transport.clone());
        let router = EventRouter::new(scheduler.clone(), transport.self_id());

        Self {
            transport,
            scheduler,
            router,
        }
    }

    /// Build the plugin from a config file (TOML, or the plugin-style
    /// `config.json`)
    pub fn from_config_file(
        path: impl AsRef<Path>,
        store: Arc<dyn MembershipStore>,
        transport: Arc<dyn SessionTransport>,
    ) -> Result<Self> {
        let config = load_config(path)?;
        Ok(Self::new(config, store, transport))
    }

    pub fn scheduler(&self) -> &IdleScheduler {
        &self.scheduler
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Run one reconciliation pass against the live roster
    pub async fn reconcile(&self) -> Result<ReconcileSummary> {
        let summary = reconcile(&self.scheduler, self.transport.self_id()).await?;

        info!(
            armed = summary.armed,
            exempt = summary.exempt,
            dropped = summary.dropped,
            in_flight = summary.in_flight,
            "Roster reconciled"
        );

        Ok(summary)
    }

    /// Attach to the session and process events until `shutdown` resolves
    /// or the transport's event stream ends.
    ///
    /// The subscription is taken before reconciliation so events that
    /// arrive meanwhile are queued and routed afterwards, in order.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if self.scheduler.is_shut_down() {
            return Err(IdleCheckError::ShutDown);
        }
        if !self.transport.is_connected() {
            return Err(IdleCheckError::transport("Session transport is not connected"));
        }

        let mut events = self.transport.subscribe();

        if let Err(e) = self.reconcile().await {
            // Live events still arm timers; a later resync retries.
            warn!(error = %e, "Startup reconciliation failed");
        }

        let resync_period = self.scheduler.config().resync_interval.filter(|p| !p.is_zero());
        let mut resync = resync_period.map(|period| {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        tokio::pin!(shutdown);

        info!("Idle check running");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Idle check unloading");
                    break;
                }

                event = events.recv() => match event {
                    Some(event) => self.router.dispatch(&event),
                    None => {
                        info!("Session disconnected, unloading idle check");
                        break;
                    }
                },

                _ = next_tick(&mut resync) => {
                    if let Err(e) = self.reconcile().await {
                        warn!(error = %e, "Roster resync failed");
                    }
                }
            }
        }

        drop(events);
        self.unload().await;
        Ok(())
    }

    /// Already attached; nothing to reload
    pub fn reload(&self) {
        info!("Idle check already loaded");
    }

    /// Cancel every outstanding timer. Safe to call more than once.
    pub async fn unload(&self) {
        if self.scheduler.is_shut_down() {
            return;
        }
        info!(tracked = self.scheduler.len(), "Unloading idle check");
        self.scheduler.shutdown().await;
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
