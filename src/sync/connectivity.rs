// src/sync/connectivity.rs

use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle};

use crate::store::{RemoteError, RemoteStore};

/// Online/offline status of the remote store, observable as a `watch` channel.
#[derive(Clone, Debug)]
pub struct ConnectivityMonitor {
    status: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (status, _) = watch::channel(initially_online);
        Self {
            status: Arc::new(status),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.status.borrow()
    }

    /// Updates the status. Returns `true` only on an offline→online transition.
    /// Receivers are not woken when the status is unchanged.
    pub fn set_online(&self, online: bool) -> bool {
        let mut came_online = false;
        self.status.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            came_online = online;
            *current = online;
            true
        });
        came_online
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.status.subscribe()
    }

    /// Pings `remote` every `interval` and publishes the result.
    pub fn spawn_probe(&self, remote: Arc<dyn RemoteStore>, interval: Duration) -> JoinHandle<()> {
        let monitor = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let online = match remote.ping().await {
                    Ok(()) => true,
                    Err(RemoteError::NotConfigured) => false,
                    Err(e) => {
                        tracing::debug!("Remote store probe failed: {}", e);
                        false
                    }
                };

                let was_online = monitor.is_online();
                if monitor.set_online(online) {
                    tracing::info!("Remote store reachable");
                } else if was_online && !online {
                    tracing::warn!("Remote store unreachable, buffering locally");
                }
            }
        })
    }
}
