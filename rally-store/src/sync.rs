use rally_core::repository::{LocationRepository, SessionRepository, Store, StoreEvent};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Keep `local` as a copy of `remote` so the next start has data to show
/// before the remote answers. Stops when the remote feed closes.
pub fn mirror(remote: Arc<dyn Store>, local: Arc<dyn Store>) -> JoinHandle<()> {
    let mut feed = remote.subscribe();
    tokio::spawn(async move {
        match remote.list_sessions().await {
            Ok(sessions) => {
                if let Err(e) = local.replace_sessions(&sessions).await {
                    warn!("Initial session mirror failed: {}", e);
                }
            }
            Err(e) => warn!("Remote unavailable for initial mirror: {}", e),
        }
        match remote.list_locations().await {
            Ok(locations) if !locations.is_empty() => {
                if let Err(e) = local.replace_locations(&locations).await {
                    warn!("Initial location mirror failed: {}", e);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Remote unavailable for initial mirror: {}", e),
        }

        while let Some(event) = feed.next().await {
            let result = match &event {
                StoreEvent::Sessions(sessions) => {
                    debug!("Mirroring {} sessions", sessions.len());
                    local.replace_sessions(sessions).await
                }
                // An empty remote registry means "use defaults"; keep the cached one.
                StoreEvent::Locations(locations) if locations.is_empty() => Ok(()),
                StoreEvent::Locations(locations) => local.replace_locations(locations).await,
                StoreEvent::SyncError(message) => {
                    warn!("Remote sync error, cache left as is: {}", message);
                    Ok(())
                }
            };
            if let Err(e) = result {
                warn!("Mirror write failed: {}", e);
            }
        }
        info!("Remote feed closed, mirror stopped");
    })
}
