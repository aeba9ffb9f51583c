// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use tokio::task::JoinHandle;

use crate::{
    config::Config,
    error::AppError,
    exam::SessionStore,
    store::{LocalBuffer, RemoteStore},
    sync::{ConnectivityMonitor, SyncCoordinator, SyncStatus},
    utils::hash::AdminAccount,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub buffer: LocalBuffer,
    pub remote: Arc<dyn RemoteStore>,
    pub connectivity: ConnectivityMonitor,
    pub coordinator: SyncCoordinator,
    pub sync_status: SyncStatus,
    pub sessions: SessionStore,
    /// `None` when no admin credentials are configured.
    pub admin: Option<AdminAccount>,
}

impl AppState {
    /// Assembles the state. Connectivity starts offline; the first successful
    /// probe is the offline→online edge that flushes anything left buffered.
    pub fn new(
        config: Config,
        buffer: LocalBuffer,
        remote: Arc<dyn RemoteStore>,
    ) -> Result<Self, AppError> {
        let admin = match (&config.admin_username, &config.admin_password) {
            (Some(username), Some(password)) => Some(AdminAccount::from_plain(username, password)?),
            _ => None,
        };

        Ok(Self {
            coordinator: SyncCoordinator::new(buffer.clone(), remote.clone()),
            connectivity: ConnectivityMonitor::new(false),
            sync_status: SyncStatus::default(),
            sessions: SessionStore::default(),
            config,
            buffer,
            remote,
            admin,
        })
    }

    /// Spawns the reconnect watcher and the sync status tracker.
    pub fn start_sync_tasks(&self) -> Vec<JoinHandle<()>> {
        vec![
            self.sync_status.track(self.coordinator.subscribe()),
            self.coordinator.watch(&self.connectivity),
        ]
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for LocalBuffer {
    fn from_ref(state: &AppState) -> Self {
        state.buffer.clone()
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
