pub mod connections;
pub mod error;
pub mod messages;
pub mod notifications;
pub mod pair_lock;

pub use connections::ConnectionGraph;
pub use error::{Result, SocialError};
pub use messages::{MessageStore, SendOutcome};
pub use notifications::{NotificationService, NotifyOutcome, SourceRef};
pub use pair_lock::PairLocks;

use tracing::error;

/// Run a storage closure off the async runtime. Disconnection of the caller
/// never cancels the blocking task; writes run to completion once started.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        SocialError::Store(anyhow::anyhow!("blocking task failed: {}", e))
    })?
}
