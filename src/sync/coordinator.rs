// src/sync/coordinator.rs

//! Reconciles the local buffer with the remote store.
//!
//! A sync reads every buffered user and result, joins results to their users,
//! and submits the batch as one upsert keyed on `user_id`. The buffered
//! entries are removed only after the remote store confirms the write, so a
//! failed or interrupted attempt leaves everything in place for the next one.
//! Because the remote write is an upsert, repeating a sync over the same
//! buffer converges to the same remote state.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::{RwLock, broadcast},
    task::JoinHandle,
};

use crate::{
    models::{
        exam_result::{ExamResult, ResultRow},
        user::User,
    },
    store::{BufferError, LocalBuffer, RemoteError, RemoteStore},
    sync::connectivity::ConnectivityMonitor,
};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Published to subscribers after every sync attempt that had work to do.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncEvent {
    Completed {
        synced: usize,
        dropped: usize,
        at: DateTime<Utc>,
    },
    /// Buffered data is untouched; the next reconnect or manual trigger retries.
    Failed { reason: String, at: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Rows accepted by the remote store.
    pub synced: usize,
    /// Buffered results discarded because their user is unknown locally and remotely.
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Another attempt was in flight; nothing was done.
    AlreadyRunning,
    NothingToSync,
    Synced(SyncReport),
    Failed { reason: String },
}

/// Clears the in-flight flag when the attempt ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Inner {
    buffer: LocalBuffer,
    remote: Arc<dyn RemoteStore>,
    in_flight: AtomicBool,
    events: broadcast::Sender<SyncEvent>,
}

#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    pub fn new(buffer: LocalBuffer, remote: Arc<dyn RemoteStore>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Inner {
                buffer,
                remote,
                in_flight: AtomicBool::new(false),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Runs one sync attempt unless another is already in flight.
    pub async fn sync_now(&self) -> SyncOutcome {
        let Some(_guard) = InFlight::acquire(&self.inner.in_flight) else {
            tracing::debug!("Sync already in flight, skipping");
            return SyncOutcome::AlreadyRunning;
        };

        match self.drain().await {
            Ok(None) => SyncOutcome::NothingToSync,
            Ok(Some(report)) => {
                tracing::info!(
                    synced = report.synced,
                    dropped = report.dropped,
                    "Offline data synced"
                );
                self.publish(SyncEvent::Completed {
                    synced: report.synced,
                    dropped: report.dropped,
                    at: Utc::now(),
                });
                SyncOutcome::Synced(report)
            }
            Err(e) => {
                tracing::warn!("Sync failed, data stays buffered: {}", e);
                let reason = e.to_string();
                self.publish(SyncEvent::Failed {
                    reason: reason.clone(),
                    at: Utc::now(),
                });
                SyncOutcome::Failed { reason }
            }
        }
    }

    /// Starts a sync on every offline→online transition of `connectivity`.
    pub fn watch(&self, connectivity: &ConnectivityMonitor) -> JoinHandle<()> {
        let coordinator = self.clone();
        let mut status = connectivity.subscribe();
        let mut was_online = *status.borrow_and_update();

        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let online = *status.borrow_and_update();
                if online && !was_online {
                    tracing::info!("Connectivity restored, syncing buffered data");
                    let coordinator = coordinator.clone();
                    tokio::spawn(async move {
                        coordinator.sync_now().await;
                    });
                }
                was_online = online;
            }
        })
    }

    fn publish(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    async fn drain(&self) -> Result<Option<SyncReport>, SyncError> {
        let users = self.inner.buffer.list_users().await?;
        let results = self.inner.buffer.list_results().await?;

        if users.is_empty() && results.is_empty() {
            return Ok(None);
        }

        let (rows, dropped) = self.build_batch(&users, &results).await?;

        if !rows.is_empty() {
            self.inner.remote.upsert_results(&rows).await?;
        }

        self.inner.buffer.remove_synced(&users, &results).await?;

        Ok(Some(SyncReport {
            synced: rows.len(),
            dropped,
        }))
    }

    /// Joins each result to its user. Results whose user is not buffered fall
    /// back to the identity the remote store already holds for that user id.
    async fn build_batch(
        &self,
        users: &[User],
        results: &[ExamResult],
    ) -> Result<(Vec<ResultRow>, usize), SyncError> {
        let by_id: HashMap<&str, &User> = users.iter().map(|u| (u.id.as_str(), u)).collect();

        let mut rows = Vec::with_capacity(results.len());
        let mut dropped = 0;

        for result in results {
            if let Some(user) = by_id.get(result.user_id.as_str()) {
                rows.push(ResultRow::new(user, result));
                continue;
            }

            match self.inner.remote.find_by_user_id(&result.user_id).await? {
                Some(known) => {
                    rows.push(ResultRow::with_identity(
                        &known.name,
                        &known.enrollment_id,
                        result,
                    ));
                }
                None => {
                    tracing::warn!(
                        user_id = %result.user_id,
                        "Dropping buffered result with no known user"
                    );
                    dropped += 1;
                }
            }
        }

        Ok((rows, dropped))
    }
}

/// Latest sync event, kept current by a subscriber task.
#[derive(Clone, Default)]
pub struct SyncStatus {
    latest: Arc<RwLock<Option<SyncEvent>>>,
}

impl SyncStatus {
    pub async fn latest(&self) -> Option<SyncEvent> {
        self.latest.read().await.clone()
    }

    pub fn track(&self, mut events: broadcast::Receiver<SyncEvent>) -> JoinHandle<()> {
        let latest = self.latest.clone();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => *latest.write().await = Some(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("Sync status tracker skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
