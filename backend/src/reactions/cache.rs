use shared::VideoReaction;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

struct Inner {
    entries: HashMap<String, Vec<VideoReaction>>,
    /// Video ids in insertion order, oldest first
    order: VecDeque<String>,
    /// Bumped by every invalidation
    generation: u64,
}

/// Result of a cache read
#[derive(Debug, PartialEq)]
pub enum Lookup {
    Hit(Vec<VideoReaction>),
    /// Pass `generation` back to [`ReactionCache::put`] after loading the rows
    Miss { generation: u64 },
}

/// Bounded in-memory cache of stored reaction rows per video
#[derive(Clone)]
pub struct ReactionCache {
    inner: Arc<RwLock<Inner>>,
    capacity: usize,
}

impl ReactionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                generation: 0,
            })),
            capacity: capacity.max(1),
        }
    }

    pub async fn get(&self, video_id: &str) -> Lookup {
        let inner = self.inner.read().await;
        match inner.entries.get(video_id) {
            Some(rows) => Lookup::Hit(rows.clone()),
            None => Lookup::Miss {
                generation: inner.generation,
            },
        }
    }

    /// Store rows loaded after a miss, trimming the least recently inserted videos past capacity.
    /// Rows are dropped when an invalidation happened since the miss, since they may predate a flush.
    pub async fn put(&self, video_id: &str, rows: Vec<VideoReaction>, generation: u64) -> bool {
        let mut inner = self.inner.write().await;
        if inner.generation != generation {
            return false;
        }
        if inner.entries.insert(video_id.to_string(), rows).is_some() {
            inner.order.retain(|id| id != video_id);
        }
        inner.order.push_back(video_id.to_string());

        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
        true
    }

    pub async fn invalidate<'a, I>(&self, video_ids: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut inner = self.inner.write().await;
        inner.generation = inner.generation.wrapping_add(1);
        for id in video_ids {
            if inner.entries.remove(id).is_some() {
                inner.order.retain(|o| o != id);
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }
}
