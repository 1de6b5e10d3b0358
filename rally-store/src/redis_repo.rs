use async_trait::async_trait;
use futures_util::StreamExt;
use rally_catalog::LocationConfig;
use rally_core::repository::{LocationRepository, SessionRepository, Store, StoreEvent, StoreKind, Subscription};
use rally_core::{CoreError, CoreResult, Session, SessionPatch};
use rally_shared::models::events::{ChangeKind, ChangeNotice, Collection};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

const SESSIONS_KEY: &str = "rally:sessions";
const LOCATIONS_KEY: &str = "rally:locations";
const FEED_CAPACITY: usize = 64;
const MIN_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Shared remote store.
///
/// Each collection is a hash of JSON documents keyed by id. Every write
/// publishes a [`ChangeNotice`] on the change channel, and a background
/// listener turns notices (from any client) into full-collection snapshots
/// on the local feed.
pub struct RedisStore {
    client: redis::Client,
    channel: String,
    origin: Uuid,
    events: broadcast::Sender<StoreEvent>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

fn map_redis(e: redis::RedisError) -> CoreError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout() {
        CoreError::Unavailable(e.to_string())
    } else {
        CoreError::StorageError(e.to_string())
    }
}

impl RedisStore {
    pub async fn connect(url: &str, channel: &str) -> CoreResult<Self> {
        let client = redis::Client::open(url).map_err(map_redis)?;
        let mut conn = client.get_multiplexed_async_connection().await.map_err(map_redis)?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await.map_err(map_redis)?;

        let (events, _) = broadcast::channel(FEED_CAPACITY);
        let listener = tokio::spawn(listen(client.clone(), channel.to_string(), events.clone()));
        info!("Connected to redis, change channel '{}'", channel);

        Ok(Self {
            client,
            channel: channel.to_string(),
            origin: Uuid::new_v4(),
            events,
            listener: Mutex::new(Some(listener)),
        })
    }

    async fn conn(&self) -> CoreResult<MultiplexedConnection> {
        self.client.get_multiplexed_async_connection().await.map_err(map_redis)
    }

    async fn notify(
        &self,
        conn: &mut MultiplexedConnection,
        collection: Collection,
        kind: ChangeKind,
        document_id: Option<&str>,
    ) -> CoreResult<()> {
        let notice = ChangeNotice::new(collection, kind, document_id.map(str::to_string), self.origin);
        let payload = serde_json::to_string(&notice)?;
        conn.publish::<_, _, ()>(&self.channel, payload).await.map_err(map_redis)
    }
}

fn encode_all<'a, T: serde::Serialize + 'a>(
    items: impl Iterator<Item = (&'a String, &'a T)>,
) -> CoreResult<Vec<(String, String)>> {
    items
        .map(|(id, item)| -> CoreResult<(String, String)> { Ok((id.clone(), serde_json::to_string(item)?)) })
        .collect()
}

async fn load_sessions(conn: &mut MultiplexedConnection) -> CoreResult<Vec<Session>> {
    let raw: Vec<String> = conn.hvals(SESSIONS_KEY).await.map_err(map_redis)?;
    let mut sessions = Vec::with_capacity(raw.len());
    for doc in raw {
        match serde_json::from_str::<Session>(&doc) {
            Ok(session) => sessions.push(session),
            Err(e) => warn!("Skipping unreadable session document: {}", e),
        }
    }
    sessions.sort_by(|a, b| b.date.cmp(&a.date).then(b.time.start.cmp(&a.time.start)));
    Ok(sessions)
}

async fn load_locations(conn: &mut MultiplexedConnection) -> CoreResult<Vec<LocationConfig>> {
    let raw: Vec<String> = conn.hvals(LOCATIONS_KEY).await.map_err(map_redis)?;
    let mut locations = raw
        .iter()
        .filter_map(|doc| serde_json::from_str::<LocationConfig>(doc).ok())
        .collect::<Vec<_>>();
    locations.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(locations)
}

/// Reconnect delay: doubles per failed attempt up to `MAX_BACKOFF`.
#[derive(Debug)]
struct Backoff {
    current: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self { current: MIN_BACKOFF }
    }

    /// Delay to wait now; the next one is twice as long.
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(MAX_BACKOFF);
        delay
    }

    fn reset(&mut self) {
        self.current = MIN_BACKOFF;
    }
}

/// Pub/sub loop; reconnects with backoff until the task is aborted.
async fn listen(client: redis::Client, channel: String, events: broadcast::Sender<StoreEvent>) {
    let mut backoff = Backoff::new();
    loop {
        match listen_once(&client, &channel, &events, &mut backoff).await {
            Ok(()) => warn!("Change feed '{}' closed, reconnecting", channel),
            Err(e) => {
                error!("Change feed '{}' failed: {}", channel, e);
                let _ = events.send(StoreEvent::SyncError(e.to_string()));
            }
        }
        tokio::time::sleep(backoff.next_delay()).await;
    }
}

/// `backoff` goes back to its floor once the subscription is up.
async fn listen_once(
    client: &redis::Client,
    channel: &str,
    events: &broadcast::Sender<StoreEvent>,
    backoff: &mut Backoff,
) -> CoreResult<()> {
    let mut pubsub = client.get_async_pubsub().await.map_err(map_redis)?;
    pubsub.subscribe(channel).await.map_err(map_redis)?;
    let mut conn = client.get_multiplexed_async_connection().await.map_err(map_redis)?;
    backoff.reset();

    // Initial snapshot so late subscribers are not left empty.
    let _ = events.send(StoreEvent::Sessions(load_sessions(&mut conn).await?));
    let _ = events.send(StoreEvent::Locations(load_locations(&mut conn).await?));

    let mut messages = pubsub.on_message();
    while let Some(msg) = messages.next().await {
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                warn!("Unreadable change notice: {}", e);
                continue;
            }
        };
        let notice: ChangeNotice = match serde_json::from_str(&payload) {
            Ok(n) => n,
            Err(e) => {
                warn!("Ignoring malformed change notice: {}", e);
                continue;
            }
        };

        let event = match notice.collection {
            Collection::Sessions => StoreEvent::Sessions(load_sessions(&mut conn).await?),
            Collection::Locations => StoreEvent::Locations(load_locations(&mut conn).await?),
        };
        let _ = events.send(event);
    }
    Ok(())
}

#[async_trait]
impl SessionRepository for RedisStore {
    async fn list_sessions(&self) -> CoreResult<Vec<Session>> {
        let mut conn = self.conn().await?;
        load_sessions(&mut conn).await
    }

    async fn get_session(&self, id: &str) -> CoreResult<Option<Session>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.hget(SESSIONS_KEY, id).await.map_err(map_redis)?;
        match raw {
            Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }

    async fn create_session(&self, session: &Session) -> CoreResult<()> {
        let mut conn = self.conn().await?;
        let doc = serde_json::to_string(session)?;
        let created: bool = conn.hset_nx(SESSIONS_KEY, &session.id, doc).await.map_err(map_redis)?;
        if !created {
            return Err(CoreError::ValidationError(format!("session {} already exists", session.id)));
        }
        self.notify(&mut conn, Collection::Sessions, ChangeKind::Created, Some(&session.id)).await
    }

    /// Read, merge, write back. Concurrent patches of different fields only
    /// race inside that window.
    async fn patch_session(&self, id: &str, patch: &SessionPatch) -> CoreResult<()> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.hget(SESSIONS_KEY, id).await.map_err(map_redis)?;
        let mut session: Session = match raw {
            Some(doc) => serde_json::from_str(&doc)?,
            None => return Err(CoreError::NotFoundError(format!("session {}", id))),
        };
        patch.apply_to(&mut session);
        let doc = serde_json::to_string(&session)?;
        conn.hset::<_, _, _, ()>(SESSIONS_KEY, id, doc).await.map_err(map_redis)?;
        self.notify(&mut conn, Collection::Sessions, ChangeKind::Patched, Some(id)).await
    }

    async fn delete_session(&self, id: &str) -> CoreResult<()> {
        let mut conn = self.conn().await?;
        let removed: i64 = conn.hdel(SESSIONS_KEY, id).await.map_err(map_redis)?;
        if removed > 0 {
            self.notify(&mut conn, Collection::Sessions, ChangeKind::Deleted, Some(id)).await?;
        }
        Ok(())
    }

    async fn replace_sessions(&self, sessions: &[Session]) -> CoreResult<()> {
        let mut conn = self.conn().await?;
        let docs = encode_all(sessions.iter().map(|s| (&s.id, s)))?;

        let mut pipe = redis::pipe();
        pipe.atomic().del(SESSIONS_KEY);
        if !docs.is_empty() {
            pipe.hset_multiple(SESSIONS_KEY, &docs);
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(map_redis)?;
        self.notify(&mut conn, Collection::Sessions, ChangeKind::Replaced, None).await
    }
}

#[async_trait]
impl LocationRepository for RedisStore {
    async fn list_locations(&self) -> CoreResult<Vec<LocationConfig>> {
        let mut conn = self.conn().await?;
        load_locations(&mut conn).await
    }

    async fn save_locations(&self, locations: &[LocationConfig]) -> CoreResult<()> {
        if locations.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let docs = encode_all(locations.iter().map(|l| (&l.id, l)))?;
        conn.hset_multiple::<_, _, _, ()>(LOCATIONS_KEY, &docs).await.map_err(map_redis)?;
        self.notify(&mut conn, Collection::Locations, ChangeKind::Upserted, None).await
    }

    async fn delete_location(&self, id: &str) -> CoreResult<()> {
        let mut conn = self.conn().await?;
        let _: i64 = conn.hdel(LOCATIONS_KEY, id).await.map_err(map_redis)?;
        self.notify(&mut conn, Collection::Locations, ChangeKind::Deleted, Some(id)).await
    }

    async fn replace_locations(&self, locations: &[LocationConfig]) -> CoreResult<()> {
        let mut conn = self.conn().await?;
        let docs = encode_all(locations.iter().map(|l| (&l.id, l)))?;

        let mut pipe = redis::pipe();
        pipe.atomic().del(LOCATIONS_KEY);
        if !docs.is_empty() {
            pipe.hset_multiple(LOCATIONS_KEY, &docs);
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(map_redis)?;
        self.notify(&mut conn, Collection::Locations, ChangeKind::Replaced, None).await
    }
}

#[async_trait]
impl Store for RedisStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Remote
    }

    fn subscribe(&self) -> Subscription {
        Subscription::new(self.events.subscribe())
    }

    /// One MULTI/EXEC over both hashes.
    async fn replace_all(&self, sessions: &[Session], locations: &[LocationConfig]) -> CoreResult<()> {
        let mut conn = self.conn().await?;
        let session_docs = encode_all(sessions.iter().map(|s| (&s.id, s)))?;
        let location_docs = encode_all(locations.iter().map(|l| (&l.id, l)))?;

        let mut pipe = redis::pipe();
        pipe.atomic().del(SESSIONS_KEY).del(LOCATIONS_KEY);
        if !session_docs.is_empty() {
            pipe.hset_multiple(SESSIONS_KEY, &session_docs);
        }
        if !location_docs.is_empty() {
            pipe.hset_multiple(LOCATIONS_KEY, &location_docs);
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(map_redis)?;

        self.notify(&mut conn, Collection::Sessions, ChangeKind::Replaced, None).await?;
        self.notify(&mut conn, Collection::Locations, ChangeKind::Replaced, None).await
    }

    async fn close(&self) -> CoreResult<()> {
        let listener = self
            .listener
            .lock()
            .map_err(|_| CoreError::StorageError("listener lock poisoned".into()))?
            .take();
        if let Some(handle) = listener {
            handle.abort();
            info!("Stopped change feed '{}'", self.channel);
        }
        Ok(())
    }
}

impl Drop for RedisStore {
    fn drop(&mut self) {
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_are_unavailable() {
        let io = redis::RedisError::from(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"));
        assert!(matches!(map_redis(io), CoreError::Unavailable(_)));
    }

    #[test]
    fn test_backoff_doubles_caps_and_resets() {
        let mut backoff = Backoff::new();
        let delays: Vec<u64> = (0..7).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);

        backoff.reset();
        assert_eq!(backoff.next_delay(), MIN_BACKOFF);
    }

    #[test]
    fn test_documents_are_keyed_by_id() {
        let locations = LocationConfig::defaults();
        let docs = encode_all(locations.iter().map(|l| (&l.id, l))).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].0, "1");
        let back: LocationConfig = serde_json::from_str(&docs[0].1).unwrap();
        assert_eq!(back, locations[0]);
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails_cleanly() {
        let result = RedisStore::connect("redis://127.0.0.1:1/", "rally:test").await;
        assert!(result.is_err());
    }
}
