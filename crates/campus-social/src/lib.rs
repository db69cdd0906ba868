//! Relationship and vote engines.
//!
//! Every operation is a synchronous read-modify-write against
//! [`campus_db::Database`]; async callers go through [`run_blocking`].

pub mod error;
pub mod relationships;
pub mod validate;
pub mod votes;

use std::sync::Arc;

use campus_db::Database;

pub use error::{ErrorKind, SocialError};

/// Run a store operation on the blocking pool so SQLite calls never stall
/// the async runtime.
pub async fn run_blocking<F, T>(db: &Arc<Database>, f: F) -> Result<T, SocialError>
where
    F: FnOnce(&Database) -> Result<T, SocialError> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| SocialError::Server(anyhow::anyhow!("spawn_blocking join error: {}", e)))?
}
