// src/sync/delivery.rs

use serde::Serialize;

use crate::{
    models::{
        exam_result::{ExamResult, ResultRow},
        user::User,
    },
    store::{BufferError, LocalBuffer, RemoteError, RemoteStore},
    sync::connectivity::ConnectivityMonitor,
};

/// What happened to a submitted result beyond the local save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Delivery {
    /// The remote store confirmed the row.
    Pushed,
    /// Offline at submission time; waits in the local buffer.
    Buffered,
    /// No remote store is configured; the local buffer is the only record.
    LocalOnly,
    /// The direct push failed; waits in the local buffer for the next sync.
    Deferred { reason: String },
}

/// Saves an attempt locally, then pushes it straight to the remote store when online.
///
/// The local write always happens first and its failure aborts the submission.
/// After a confirmed push the entries are taken out of the buffer again.
pub async fn deliver(
    buffer: &LocalBuffer,
    remote: &dyn RemoteStore,
    connectivity: &ConnectivityMonitor,
    user: &User,
    result: &ExamResult,
) -> Result<Delivery, BufferError> {
    buffer.put_user(user).await?;
    buffer.put_result(result).await?;

    if !connectivity.is_online() {
        return Ok(Delivery::Buffered);
    }

    let row = ResultRow::new(user, result);
    match remote.upsert_results(std::slice::from_ref(&row)).await {
        Ok(()) => {
            let users = std::slice::from_ref(user);
            let results = std::slice::from_ref(result);
            if let Err(e) = buffer.remove_synced(users, results).await {
                // Harmless: the next sync upserts the same row again.
                tracing::warn!("Pushed result stays buffered: {}", e);
            }
            Ok(Delivery::Pushed)
        }
        Err(RemoteError::NotConfigured) => Ok(Delivery::LocalOnly),
        Err(e) => {
            tracing::warn!(user_id = %user.id, "Direct push failed, result stays buffered: {}", e);
            // Treat the remote as offline so the next successful probe triggers a sync.
            connectivity.set_online(false);
            Ok(Delivery::Deferred {
                reason: e.to_string(),
            })
        }
    }
}
