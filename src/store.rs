use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::ViewSettings;
use crate::view::{FeedView, ViewError};

/// Identifies one page mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct ViewId(u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ViewId {
    fn from(raw: u64) -> Self {
        ViewId(raw)
    }
}

struct Entry {
    view: FeedView,
    last_seen: Instant,
}

/// Views plus an index ordered by last use, oldest first.
#[derive(Default)]
struct Views {
    entries: HashMap<ViewId, Entry>,
    recency: BTreeSet<(Instant, ViewId)>,
}

impl Views {
    fn insert(&mut self, id: ViewId, view: FeedView) {
        let last_seen = Instant::now();
        self.recency.insert((last_seen, id));
        self.entries.insert(id, Entry { view, last_seen });
    }

    fn remove(&mut self, id: ViewId) -> Option<Entry> {
        let entry = self.entries.remove(&id)?;
        self.recency.remove(&(entry.last_seen, id));
        Some(entry)
    }

    fn touch(&mut self, id: ViewId) -> Option<&mut Entry> {
        let entry = self.entries.get_mut(&id)?;
        self.recency.remove(&(entry.last_seen, id));
        entry.last_seen = Instant::now();
        self.recency.insert((entry.last_seen, id));
        Some(entry)
    }

    fn oldest(&self) -> Option<(Instant, ViewId)> {
        self.recency.first().copied()
    }
}

/// Server-side home of every mounted [`FeedView`].
///
/// A view lives until it has been idle for `ttl` or until it is the least
/// recently used one when the store is full.
pub struct ViewStore {
    views: RwLock<Views>,
    ttl: Duration,
    max_views: usize,
}

impl ViewStore {
    pub fn new(ttl: Duration, max_views: usize) -> Self {
        Self {
            views: RwLock::new(Views::default()),
            ttl,
            max_views: max_views.max(1),
        }
    }

    pub fn from_settings(settings: &ViewSettings) -> Self {
        Self::new(settings.ttl(), settings.max_views)
    }

    pub async fn mount(&self, view: FeedView) -> ViewId {
        self.mount_with(view, |id, _| id).await.0
    }

    /// Register a view and run `render` on it before it becomes reachable,
    /// so the first response never depends on the TTL.
    pub async fn mount_with<R>(
        &self,
        view: FeedView,
        render: impl FnOnce(ViewId, &FeedView) -> R,
    ) -> (ViewId, R) {
        let mut views = self.views.write().await;

        if views.entries.len() >= self.max_views {
            if let Some((_, oldest)) = views.oldest() {
                views.remove(oldest);
                debug!("View store full, evicted view {}", oldest);
            }
        }

        let mut id = ViewId(rand::random());
        while views.entries.contains_key(&id) {
            id = ViewId(rand::random());
        }

        let rendered = render(id, &view);
        views.insert(id, view);
        (id, rendered)
    }

    /// Run `f` against a mounted view and mark it as recently used.
    pub async fn update<R>(
        &self,
        id: ViewId,
        f: impl FnOnce(&mut FeedView) -> R,
    ) -> Result<R, ViewError> {
        let mut views = self.views.write().await;

        let expired = match views.entries.get(&id) {
            Some(entry) => entry.last_seen.elapsed() >= self.ttl,
            None => return Err(ViewError::UnknownView(id)),
        };
        if expired {
            views.remove(id);
            debug!("View {} expired on access", id);
            return Err(ViewError::UnknownView(id));
        }

        let entry = views.touch(id).ok_or(ViewError::UnknownView(id))?;
        Ok(f(&mut entry.view))
    }

    /// Drop idle views. Returns how many were removed.
    pub async fn evict_expired(&self) -> usize {
        let mut views = self.views.write().await;
        let mut evicted = 0;
        while let Some((last_seen, id)) = views.oldest() {
            if last_seen.elapsed() < self.ttl {
                break;
            }
            views.remove(id);
            evicted += 1;
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.views.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.views.read().await.entries.is_empty()
    }
}

pub async fn start_view_sweeper(store: Arc<ViewStore>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        let evicted = store.evict_expired().await;
        if evicted > 0 {
            info!("Evicted {} idle views", evicted);
        }
    }
}
