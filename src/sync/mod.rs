// src/sync/mod.rs

pub mod connectivity;
pub mod coordinator;
pub mod delivery;

pub use connectivity::ConnectivityMonitor;
pub use coordinator::{SyncCoordinator, SyncEvent, SyncOutcome, SyncReport, SyncStatus};
pub use delivery::{Delivery, deliver};
