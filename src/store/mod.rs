// src/store/mod.rs

pub mod local;
pub mod remote;

pub use local::{BufferError, LocalBuffer};
pub use remote::{PgRemoteStore, RemoteError, RemoteStore};
