use crate::config::ReactionsConfig;
use crate::metrics::{record_reaction_flush, record_reactions_pending, FlushStats};
use crate::reactions::cache::ReactionCache;
use crate::reactions::repository::ReactionRepository;
use log::{debug, error, info, warn};
use shared::{ReactionKind, ReactionSet, Result, SharedError};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Duration, Instant};

/// Pending sets keyed by (video_id, user_id)
type PendingMap = HashMap<(String, String), ReactionSet>;

enum Command {
    Touch {
        user_id: String,
        video_id: String,
        kind: ReactionKind,
        timestamp: Option<f64>,
        reply: oneshot::Sender<Result<ReactionSet>>,
    },
    PendingFor {
        video_id: String,
        reply: oneshot::Sender<Vec<(String, ReactionSet)>>,
    },
    FlushNow {
        reply: oneshot::Sender<FlushStats>,
    },
    Shutdown {
        reply: oneshot::Sender<FlushStats>,
    },
}

/// Handle to the background task that batches reaction writes
#[derive(Clone)]
pub struct ReactionBatcher {
    tx: mpsc::Sender<Command>,
}

struct Worker {
    repo: Arc<dyn ReactionRepository>,
    cache: ReactionCache,
    pending: PendingMap,
    idle_flush: Duration,
    max_pending: usize,
}

fn stopped() -> SharedError {
    SharedError::Internal("Reaction batcher is not running".to_string())
}

impl ReactionBatcher {
    /// Start the writer task; it flushes after `idle_flush` without new reactions
    pub fn spawn(
        repo: Arc<dyn ReactionRepository>,
        cache: ReactionCache,
        config: &ReactionsConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(1024);
        let worker = Worker {
            repo,
            cache,
            pending: HashMap::new(),
            idle_flush: config.idle_flush(),
            max_pending: config.max_pending,
        };
        info!(
            "Starting reaction batcher (idle flush {:?}, max pending {})",
            worker.idle_flush, worker.max_pending
        );
        tokio::spawn(worker.run(rx));
        Self { tx }
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).await.map_err(|_| stopped())
    }

    /// Set or clear one reaction; returns the user's resulting set for the video
    pub async fn enqueue(
        &self,
        user_id: &str,
        video_id: &str,
        kind: ReactionKind,
        timestamp: Option<f64>,
    ) -> Result<ReactionSet> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Touch {
            user_id: user_id.to_string(),
            video_id: video_id.to_string(),
            kind,
            timestamp,
            reply,
        })
        .await?;
        rx.await.map_err(|_| stopped())?
    }

    /// Un-flushed sets for a video as (user_id, set)
    pub async fn pending_for(&self, video_id: &str) -> Result<Vec<(String, ReactionSet)>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::PendingFor {
            video_id: video_id.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| stopped())
    }

    pub async fn flush_now(&self) -> Result<FlushStats> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::FlushNow { reply }).await?;
        rx.await.map_err(|_| stopped())
    }

    /// Flush everything pending and stop the task
    pub async fn shutdown(&self) -> Result<FlushStats> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        rx.await.map_err(|_| stopped())
    }
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Touch { user_id, video_id, kind, timestamp, reply }) => {
                        let result = self.touch(user_id, video_id, kind, timestamp).await;
                        if result.is_ok() {
                            deadline = Some(Instant::now() + self.idle_flush);
                        }
                        let _ = reply.send(result);
                        if self.pending.len() > self.max_pending {
                            self.flush("threshold").await;
                            deadline = self.rearm();
                        }
                    }
                    Some(Command::PendingFor { video_id, reply }) => {
                        let _ = reply.send(self.pending_for(&video_id));
                    }
                    Some(Command::FlushNow { reply }) => {
                        let stats = self.flush("manual").await;
                        deadline = self.rearm();
                        let _ = reply.send(stats);
                    }
                    Some(Command::Shutdown { reply }) => {
                        let stats = self.flush("shutdown").await;
                        if !self.pending.is_empty() {
                            error!("{} reaction sets lost at shutdown", self.pending.len());
                        }
                        let _ = reply.send(stats);
                        break;
                    }
                    None => {
                        self.flush("shutdown").await;
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.flush("idle").await;
                    deadline = self.rearm();
                }
            }
        }
        info!("Reaction batcher stopped");
    }

    /// Failed entries stay pending and get retried after another idle period
    fn rearm(&self) -> Option<Instant> {
        if self.pending.is_empty() {
            None
        } else {
            Some(Instant::now() + self.idle_flush)
        }
    }

    async fn touch(
        &mut self,
        user_id: String,
        video_id: String,
        kind: ReactionKind,
        timestamp: Option<f64>,
    ) -> Result<ReactionSet> {
        let key = (video_id, user_id);
        let mut set = match self.pending.get(&key) {
            Some(set) => set.clone(),
            None => self
                .repo
                .find(&key.1, &key.0)
                .await?
                .map(|row| row.reactions)
                .unwrap_or_default(),
        };
        set.set(kind, timestamp);
        debug!("{} {} {} at {:?}", key.1, kind, key.0, timestamp);
        self.pending.insert(key, set.clone());
        record_reactions_pending(self.pending.len());
        Ok(set)
    }

    fn pending_for(&self, video_id: &str) -> Vec<(String, ReactionSet)> {
        let mut sets: Vec<(String, ReactionSet)> = self
            .pending
            .iter()
            .filter(|((video, _), _)| video == video_id)
            .map(|((_, user), set)| (user.clone(), set.clone()))
            .collect();
        sets.sort_by(|a, b| a.0.cmp(&b.0));
        sets
    }

    /// Write every pending set that differs from its stored row
    async fn flush(&mut self, trigger: &str) -> FlushStats {
        let batch = std::mem::take(&mut self.pending);
        let mut stats = FlushStats::default();
        if batch.is_empty() {
            return stats;
        }

        let mut touched = BTreeSet::new();
        let mut failed: PendingMap = HashMap::new();

        for ((video_id, user_id), set) in batch {
            let stored = match self.repo.find(&user_id, &video_id).await {
                Ok(row) => row.map(|r| r.reactions).unwrap_or_default(),
                Err(e) => {
                    warn!("Could not read reactions of {} on {}: {}", user_id, video_id, e);
                    stats.failed += 1;
                    failed.insert((video_id, user_id), set);
                    continue;
                }
            };
            if stored == set {
                stats.skipped += 1;
                continue;
            }

            let written = if set.is_empty() {
                self.repo.remove(&user_id, &video_id).await
            } else {
                self.repo.upsert(&user_id, &video_id, &set).await
            };
            match written {
                Ok(()) if set.is_empty() => stats.removed += 1,
                Ok(()) => stats.written += 1,
                Err(e) => {
                    warn!("Could not write reactions of {} on {}: {}", user_id, video_id, e);
                    stats.failed += 1;
                    failed.insert((video_id.clone(), user_id), set);
                }
            }
            touched.insert(video_id);
        }

        for (key, set) in failed {
            self.pending.entry(key).or_insert(set);
        }
        self.cache.invalidate(&touched).await;

        info!(
            "Reaction flush ({}): {} written, {} removed, {} skipped, {} failed",
            trigger, stats.written, stats.removed, stats.skipped, stats.failed
        );
        record_reaction_flush(trigger, stats, self.pending.len());
        stats
    }
}
