//! Keyed work queue with delayed and rate-limited adds.

use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use super::RetryPolicy;

/// Scheduled entry for the delay heap.
///
/// Ordered by time only, reversed so BinaryHeap acts as a min-heap (earliest first).
#[derive(Debug, Clone)]
struct Scheduled<K> {
    at: Instant,
    key: K,
}

impl<K> PartialEq for Scheduled<K> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
    }
}

impl<K> Eq for Scheduled<K> {}

impl<K> PartialOrd for Scheduled<K> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Scheduled<K> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.at.cmp(&self.at)
    }
}

struct WorkQueueState<K> {
    /// Keys ready to hand out, in FIFO order.
    ready: VecDeque<K>,

    /// Keys that need a pass (queued, or re-added while processing).
    dirty: HashSet<K>,

    /// Keys currently handed to a worker.
    processing: HashSet<K>,

    /// Delayed adds.
    scheduled: BinaryHeap<Scheduled<K>>,

    /// Earliest pending delayed add per key; heap entries not matching are stale.
    waiting: HashMap<K, Instant>,

    /// Consecutive failures per key.
    failures: HashMap<K, u32>,

    shutting_down: bool,
}

impl<K: Clone + Eq + Hash> WorkQueueState<K> {
    fn new() -> Self {
        Self {
            ready: VecDeque::new(),
            dirty: HashSet::new(),
            processing: HashSet::new(),
            scheduled: BinaryHeap::new(),
            waiting: HashMap::new(),
            failures: HashMap::new(),
            shutting_down: false,
        }
    }

    /// Mark `key` dirty. Returns true when it became ready.
    fn insert(&mut self, key: K) -> bool {
        if self.shutting_down || self.dirty.contains(&key) {
            return false;
        }
        self.dirty.insert(key.clone());
        if self.processing.contains(&key) {
            // done() で ready に戻す
            return false;
        }
        self.ready.push_back(key);
        true
    }

    /// Move due delayed adds to ready.
    fn promote_scheduled(&mut self, now: Instant) {
        while let Some(entry) = self.scheduled.peek() {
            if entry.at > now {
                break; // Heap is sorted, so we can stop
            }
            let Some(entry) = self.scheduled.pop() else {
                break;
            };
            if self.waiting.get(&entry.key) == Some(&entry.at) {
                self.waiting.remove(&entry.key);
                self.insert(entry.key);
            }
        }
    }
}

/// WorkQueue hands keys to workers, one worker per key at a time.
///
/// - Adding a key that is already queued is a no-op.
/// - Adding a key that is being processed queues it again once `done` is called.
/// - Delayed adds keep only the earliest pending time per key.
pub struct WorkQueue<K> {
    state: Mutex<WorkQueueState<K>>,
    notify: Notify,
    retry_policy: RetryPolicy,
}

impl<K: Clone + Eq + Hash + Send> WorkQueue<K> {
    pub fn new(retry_policy: RetryPolicy) -> Self {
        Self {
            state: Mutex::new(WorkQueueState::new()),
            notify: Notify::new(),
            retry_policy,
        }
    }

    pub async fn add(&self, key: K) {
        let became_ready = self.state.lock().await.insert(key);
        if became_ready {
            self.notify.notify_one();
        }
    }

    /// Add `key` once `delay` has passed.
    pub async fn add_after(&self, key: K, delay: Duration) {
        if delay.is_zero() {
            return self.add(key).await;
        }
        let at = Instant::now() + delay;
        {
            let mut state = self.state.lock().await;
            if state.shutting_down {
                return;
            }
            if state.waiting.get(&key).is_some_and(|existing| *existing <= at) {
                return;
            }
            state.waiting.insert(key.clone(), at);
            state.scheduled.push(Scheduled { at, key });
        }
        // 待機中の worker に次の起床時刻を計算し直させる
        self.notify.notify_one();
    }

    /// Add `key` after the backoff for its failure count.
    pub async fn add_rate_limited(&self, key: K) {
        let delay = {
            let mut state = self.state.lock().await;
            let failures = state.failures.entry(key.clone()).or_insert(0);
            *failures = failures.saturating_add(1);
            self.retry_policy.next_delay(*failures)
        };
        self.add_after(key, delay).await;
    }

    /// Reset the failure count of `key`.
    pub async fn forget(&self, key: &K) {
        self.state.lock().await.failures.remove(key);
    }

    pub async fn num_requeues(&self, key: &K) -> u32 {
        self.state
            .lock()
            .await
            .failures
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Wait for the next key. Returns None once the queue is shut down.
    ///
    /// The caller must call `done` with the key when its pass ends.
    pub async fn get(&self) -> Option<K> {
        loop {
            let next_wake = {
                let mut state = self.state.lock().await;
                state.promote_scheduled(Instant::now());

                if let Some(key) = state.ready.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
                if state.shutting_down {
                    return None;
                }
                state.scheduled.peek().map(|entry| entry.at)
            };

            // 通知 or 次の遅延キーの時刻まで待つ
            match next_wake {
                Some(wake_at) => {
                    tokio::select! {
                        _ = self.notify.notified() => {},
                        _ = tokio::time::sleep_until(wake_at) => {},
                    }
                }
                None => self.notify.notified().await,
            }
        }
    }

    /// Finish processing `key`. Re-queues it if it was added meanwhile.
    pub async fn done(&self, key: &K) {
        let became_ready = {
            let mut state = self.state.lock().await;
            state.processing.remove(key);
            if state.dirty.contains(key) {
                state.ready.push_back(key.clone());
                true
            } else {
                false
            }
        };
        if became_ready {
            self.notify.notify_one();
        }
    }

    /// Stop handing out keys. Pending and delayed keys are dropped.
    pub async fn shut_down(&self) {
        {
            let mut state = self.state.lock().await;
            state.shutting_down = true;
            state.ready.clear();
            state.dirty.clear();
            state.scheduled.clear();
            state.waiting.clear();
        }
        self.notify.notify_waiters();
        // まだ待機していない worker 用に permit を 1 つ残す
        self.notify.notify_one();
    }

    /// Number of keys ready to hand out.
    pub async fn len(&self) -> usize {
        self.state.lock().await.ready.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn queue() -> WorkQueue<&'static str> {
        WorkQueue::new(RetryPolicy::default())
    }

    #[tokio::test]
    async fn add_is_deduplicated() {
        let q = queue();
        q.add("a").await;
        q.add("a").await;
        q.add("b").await;
        assert_eq!(q.len().await, 2);

        assert_eq!(q.get().await, Some("a"));
        assert_eq!(q.get().await, Some("b"));
    }

    #[tokio::test]
    async fn key_in_processing_is_not_handed_out_twice() {
        let q = queue();
        q.add("a").await;
        assert_eq!(q.get().await, Some("a"));

        q.add("a").await;
        assert!(q.is_empty().await);

        q.done(&"a").await;
        assert_eq!(q.len().await, 1);
        assert_eq!(q.get().await, Some("a"));
    }

    #[tokio::test]
    async fn done_without_readd_drops_key() {
        let q = queue();
        q.add("a").await;
        let key = q.get().await.unwrap();
        q.done(&key).await;
        assert!(q.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn add_after_waits_for_delay() {
        let q = Arc::new(queue());
        let start = Instant::now();
        q.add_after("a", Duration::from_secs(30)).await;
        assert!(q.is_empty().await);

        let key = q.get().await;
        assert_eq!(key, Some("a"));
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn add_after_keeps_earliest_time() {
        let q = queue();
        let start = Instant::now();
        q.add_after("a", Duration::from_secs(60)).await;
        q.add_after("a", Duration::from_secs(30)).await;
        q.add_after("a", Duration::from_secs(45)).await;

        assert_eq!(q.get().await, Some("a"));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(30));
        assert!(elapsed < Duration::from_secs(45));

        q.done(&"a").await;
        // 古い 60s のエントリは無視される
        let next = tokio::time::timeout(Duration::from_secs(120), q.get()).await;
        assert!(next.is_err());
    }

    #[tokio::test]
    async fn rate_limited_backoff_grows_until_forgotten() {
        let q = queue();
        q.add_rate_limited("a").await;
        q.add_rate_limited("a").await;
        assert_eq!(q.num_requeues(&"a").await, 2);

        q.forget(&"a").await;
        assert_eq!(q.num_requeues(&"a").await, 0);
    }

    #[tokio::test]
    async fn shut_down_releases_waiters() {
        let q = Arc::new(queue());
        let waiter = tokio::spawn({
            let q = Arc::clone(&q);
            async move { q.get().await }
        });
        tokio::task::yield_now().await;

        q.shut_down().await;
        assert_eq!(waiter.await.unwrap(), None);

        q.add("a").await;
        assert!(q.is_empty().await);
    }
}
