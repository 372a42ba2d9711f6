//! Live channel registry: the fan-out primitive of the sync layer.
//!
//! One registry multiplexes a single authoritative upstream feed per scope
//! (team, board, or channel id) to any number of independent, cancellable
//! subscriptions. Joining subscribers immediately receive the scope's
//! latest known full snapshot; every later publish replaces it and is
//! delivered to all subscribers of that scope in the same relative order.
//!
//! All bookkeeping (subscribe, unsubscribe, publish, upstream attachment)
//! runs under one mutex per registry instance, so scope-map mutations are
//! atomic and totally ordered. Delivery into each subscriber's unbounded
//! buffer happens inside that critical section but never blocks, so a slow
//! consumer cannot stall the publisher or its siblings; it only grows its
//! own buffer.
//!
//! Upstream lifetime is tied to subscriber demand: the scope's
//! [`UpstreamGuard`] is dropped (aborting the feed task) when the last
//! subscriber leaves, and a later subscriber re-attaches a fresh one via
//! [`ChannelRegistry::ensure_upstream`]. No idle upstream listeners
//! survive.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::errors::RepositoryError;

/// One delivery to a subscriber: a full snapshot of the scope's collection,
/// or the terminal error that ends the sequence.
pub type SnapshotEvent<T> = Result<Vec<T>, RepositoryError>;

/// Handle owning the upstream feed of one scope. Dropping it aborts the
/// feed task.
pub struct UpstreamGuard {
    abort: AbortHandle,
}

impl UpstreamGuard {
    pub fn new(abort: AbortHandle) -> Self {
        Self { abort }
    }
}

impl Drop for UpstreamGuard {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

struct ScopeChannel<T> {
    latest: Vec<T>,
    subscribers: HashMap<u64, mpsc::UnboundedSender<SnapshotEvent<T>>>,
    upstream: Option<UpstreamGuard>,
}

impl<T> Default for ScopeChannel<T> {
    fn default() -> Self {
        Self {
            latest: Vec::new(),
            subscribers: HashMap::new(),
            upstream: None,
        }
    }
}

impl<T: Clone> ScopeChannel<T> {
    /// Deliver the current snapshot to every subscriber, pruning any whose
    /// receiving side is already gone.
    fn fan_out(&mut self) {
        let latest = &self.latest;
        self.subscribers
            .retain(|_, tx| tx.send(Ok(latest.clone())).is_ok());
    }
}

struct RegistryState<T> {
    scopes: HashMap<String, ScopeChannel<T>>,
    next_subscriber: u64,
}

/// Scope-keyed snapshot multiplexer. Cheap to clone; clones share state.
pub struct ChannelRegistry<T> {
    inner: Arc<Mutex<RegistryState<T>>>,
}

impl<T> Clone for ChannelRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ChannelRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChannelRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryState {
                scopes: HashMap::new(),
                next_subscriber: 0,
            })),
        }
    }

    // The state is a plain map of plain values and none of the critical
    // sections can panic halfway through an invariant, so a poisoned lock
    // still holds consistent data and is safe to reclaim.
    fn lock(&self) -> MutexGuard<'_, RegistryState<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live subscribers for a scope.
    pub fn subscriber_count(&self, scope: &str) -> usize {
        self.lock()
            .scopes
            .get(scope)
            .map_or(0, |channel| channel.subscribers.len())
    }

    /// Whether an upstream guard is currently attached for a scope.
    pub fn has_upstream(&self, scope: &str) -> bool {
        self.lock()
            .scopes
            .get(scope)
            .is_some_and(|channel| channel.upstream.is_some())
    }

    /// Attach an upstream guard for `scope` unless one is already attached
    /// or the scope has no subscribers left. `connect` runs inside the
    /// registry's critical section and must only spawn work and return its
    /// guard, never block.
    pub fn ensure_upstream<F>(&self, scope: &str, connect: F)
    where
        F: FnOnce() -> UpstreamGuard,
    {
        let mut state = self.lock();
        let Some(channel) = state.scopes.get_mut(scope) else {
            return;
        };
        if channel.upstream.is_none() && !channel.subscribers.is_empty() {
            channel.upstream = Some(connect());
            debug!(scope = scope, "attached upstream listener");
        }
    }
}

impl<T: Clone> ChannelRegistry<T> {
    /// Register a new subscriber for `scope`.
    ///
    /// The scope's latest known snapshot (an empty list if nothing has
    /// ever been published) is enqueued before this call returns, so the
    /// subscriber always starts from current state rather than waiting for
    /// the next publish.
    pub fn subscribe(&self, scope: &str) -> Subscription<T> {
        let mut state = self.lock();
        let id = state.next_subscriber;
        state.next_subscriber += 1;

        let channel = state.scopes.entry(scope.to_string()).or_default();
        let (tx, rx) = mpsc::unbounded_channel();
        // Replay-on-join: enqueue before registering so the snapshot is the
        // first item the subscriber sees.
        let _ = tx.send(Ok(channel.latest.clone()));
        channel.subscribers.insert(id, tx);

        Subscription {
            id,
            scope: scope.to_string(),
            rx,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Replace the scope's snapshot and deliver it to every subscriber.
    pub fn publish(&self, scope: &str, snapshot: Vec<T>) {
        let mut state = self.lock();
        let channel = state.scopes.entry(scope.to_string()).or_default();
        channel.latest = snapshot;
        channel.fan_out();
    }

    /// Read-modify-write of the scope's snapshot in one critical section.
    ///
    /// The mutation closure returns whether it changed anything; the new
    /// snapshot is fanned out only in that case. The scope entry is
    /// materialized either way, so an untouched scope still replays an
    /// empty list to future subscribers.
    pub fn update<F>(&self, scope: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut Vec<T>) -> bool,
    {
        let mut state = self.lock();
        let channel = state.scopes.entry(scope.to_string()).or_default();
        let changed = mutate(&mut channel.latest);
        if changed {
            channel.fan_out();
        }
        changed
    }

    /// Visit every scope's snapshot in one critical section, fanning out to
    /// each scope the closure reports as changed. Returns how many scopes
    /// changed.
    pub fn update_scopes<F>(&self, mut mutate: F) -> usize
    where
        F: FnMut(&str, &mut Vec<T>) -> bool,
    {
        let mut state = self.lock();
        let mut changed = 0;
        for (scope, channel) in state.scopes.iter_mut() {
            if mutate(scope, &mut channel.latest) {
                channel.fan_out();
                changed += 1;
            }
        }
        changed
    }

    /// Current snapshot for a scope; empty for unknown scopes.
    pub fn latest(&self, scope: &str) -> Vec<T> {
        self.lock()
            .scopes
            .get(scope)
            .map(|channel| channel.latest.clone())
            .unwrap_or_default()
    }

    /// Fail every live subscriber of `scope` exactly once and release the
    /// scope's upstream resource. The subscribers are removed, so each of
    /// their sequences ends after the error. The latest snapshot is kept as
    /// the replay value for any future subscriber.
    pub fn fail(&self, scope: &str, error: RepositoryError) {
        let mut state = self.lock();
        let Some(channel) = state.scopes.get_mut(scope) else {
            return;
        };
        warn!(scope = scope, error = %error, "failing live subscribers");
        for (_, tx) in channel.subscribers.drain() {
            let _ = tx.send(Err(error.clone()));
        }
        channel.upstream = None;
    }
}

fn detach<T>(registry: &Mutex<RegistryState<T>>, scope: &str, id: u64) {
    let mut state = registry.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(channel) = state.scopes.get_mut(scope) else {
        return;
    };
    channel.subscribers.remove(&id);
    if channel.subscribers.is_empty() && channel.upstream.take().is_some() {
        debug!(scope = scope, "released upstream listener");
    }
}

/// One live subscription to a scope.
///
/// Yields [`SnapshotEvent`]s: the replayed snapshot first, then every
/// subsequent publish. The sequence ends only after a terminal error is
/// delivered via [`ChannelRegistry::fail`]. Dropping the subscription
/// detaches it; if it was the scope's last, the upstream resource is
/// released.
pub struct Subscription<T> {
    id: u64,
    scope: String,
    rx: mpsc::UnboundedReceiver<SnapshotEvent<T>>,
    registry: Arc<Mutex<RegistryState<T>>>,
}

impl<T> Subscription<T> {
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Next event, or `None` once the sequence has ended.
    pub async fn recv(&mut self) -> Option<SnapshotEvent<T>> {
        self.rx.recv().await
    }

    /// Explicitly end the subscription. Equivalent to dropping it.
    pub fn cancel(self) {}
}

impl<T> Stream for Subscription<T> {
    type Item = SnapshotEvent<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        detach(&self.registry, &self.scope, self.id);
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    fn registry() -> ChannelRegistry<String> {
        ChannelRegistry::new()
    }

    #[tokio::test]
    async fn replay_on_join_before_any_publish() {
        let reg = registry();
        let mut sub = reg.subscribe("team-1");
        assert_eq!(sub.recv().await.unwrap().unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn replay_on_join_after_publishes() {
        let reg = registry();
        reg.publish("team-1", vec!["a".to_string()]);
        reg.publish("team-1", vec!["a".to_string(), "b".to_string()]);

        // A late joiner receives only the latest full snapshot, not history.
        let mut sub = reg.subscribe("team-1");
        assert_eq!(
            sub.recv().await.unwrap().unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber_in_identical_order() {
        let reg = registry();
        let mut first = reg.subscribe("team-1");
        let mut second = reg.subscribe("team-1");

        for i in 0..20 {
            reg.publish("team-1", vec![format!("v{i}")]);
        }

        let mut seen_first = Vec::new();
        let mut seen_second = Vec::new();
        // Replay plus twenty publishes.
        for _ in 0..21 {
            seen_first.push(first.recv().await.unwrap().unwrap());
            seen_second.push(second.recv().await.unwrap().unwrap());
        }
        assert_eq!(seen_first, seen_second);
        assert_eq!(seen_first.last().unwrap(), &vec!["v19".to_string()]);
    }

    #[tokio::test]
    async fn publishes_are_scoped() {
        let reg = registry();
        let mut team1 = reg.subscribe("team-1");
        let mut team2 = reg.subscribe("team-2");
        assert!(team1.recv().await.unwrap().unwrap().is_empty());
        assert!(team2.recv().await.unwrap().unwrap().is_empty());

        reg.publish("team-1", vec!["only-one".to_string()]);
        assert_eq!(
            team1.recv().await.unwrap().unwrap(),
            vec!["only-one".to_string()]
        );
        // team-2 has nothing pending; its latest is still empty.
        assert_eq!(reg.latest("team-2"), Vec::<String>::new());
    }

    #[tokio::test]
    async fn slow_subscriber_does_not_block_publisher_or_siblings() {
        let reg = registry();
        let _slow = reg.subscribe("team-1"); // never drained
        let mut live = reg.subscribe("team-1");
        assert!(live.recv().await.unwrap().unwrap().is_empty());

        for i in 0..1000 {
            reg.publish("team-1", vec![format!("v{i}")]);
        }
        // The sibling still observes everything, in order.
        for i in 0..1000 {
            assert_eq!(live.recv().await.unwrap().unwrap(), vec![format!("v{i}")]);
        }
    }

    #[tokio::test]
    async fn drop_detaches_and_releases_upstream() {
        let reg = registry();
        let sub = reg.subscribe("team-1");
        let feed = tokio::spawn(std::future::pending::<()>());
        reg.ensure_upstream("team-1", || UpstreamGuard::new(feed.abort_handle()));
        assert!(reg.has_upstream("team-1"));

        drop(sub);
        assert_eq!(reg.subscriber_count("team-1"), 0);
        assert!(!reg.has_upstream("team-1"));
        assert!(feed.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn upstream_survives_while_other_subscribers_remain() {
        let reg = registry();
        let first = reg.subscribe("team-1");
        let second = reg.subscribe("team-1");
        let feed = tokio::spawn(std::future::pending::<()>());
        reg.ensure_upstream("team-1", || UpstreamGuard::new(feed.abort_handle()));

        drop(first);
        assert!(reg.has_upstream("team-1"));
        drop(second);
        assert!(!reg.has_upstream("team-1"));
    }

    #[tokio::test]
    async fn resubscribe_reattaches_upstream() {
        let reg = registry();
        let sub = reg.subscribe("team-1");
        let feed = tokio::spawn(std::future::pending::<()>());
        reg.ensure_upstream("team-1", || UpstreamGuard::new(feed.abort_handle()));
        drop(sub);
        assert!(!reg.has_upstream("team-1"));

        let _again = reg.subscribe("team-1");
        let feed2 = tokio::spawn(std::future::pending::<()>());
        reg.ensure_upstream("team-1", || UpstreamGuard::new(feed2.abort_handle()));
        assert!(reg.has_upstream("team-1"));
    }

    #[tokio::test]
    async fn ensure_upstream_without_subscribers_is_a_no_op() {
        let reg = registry();
        reg.publish("team-1", vec!["seed".to_string()]);
        reg.ensure_upstream("team-1", || panic!("must not connect without demand"));
        assert!(!reg.has_upstream("team-1"));
    }

    #[tokio::test]
    async fn fail_ends_every_subscriber_exactly_once() {
        let reg = registry();
        let mut first = reg.subscribe("team-1");
        let mut second = reg.subscribe("team-1");
        assert!(first.recv().await.unwrap().is_ok());
        assert!(second.recv().await.unwrap().is_ok());

        reg.fail(
            "team-1",
            RepositoryError::Transport("listener dropped".to_string()),
        );

        for sub in [&mut first, &mut second] {
            match sub.recv().await.unwrap() {
                Err(RepositoryError::Transport(msg)) => assert_eq!(msg, "listener dropped"),
                other => panic!("Expected transport error, got {:?}", other),
            }
            // Terminal: nothing after the error.
            assert!(sub.recv().await.is_none());
        }
        assert_eq!(reg.subscriber_count("team-1"), 0);
    }

    #[tokio::test]
    async fn update_fans_out_only_when_changed() {
        let reg = registry();
        let mut sub = reg.subscribe("team-1");
        assert!(sub.recv().await.unwrap().unwrap().is_empty());

        let changed = reg.update("team-1", |items| {
            items.push("a".to_string());
            true
        });
        assert!(changed);
        assert_eq!(sub.recv().await.unwrap().unwrap(), vec!["a".to_string()]);

        let changed = reg.update("team-1", |_| false);
        assert!(!changed);
        // No extra delivery: the next event is from this later publish.
        reg.publish("team-1", vec!["b".to_string()]);
        assert_eq!(sub.recv().await.unwrap().unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn update_scopes_touches_only_matching_scopes() {
        let reg = registry();
        reg.publish("board-1", vec!["t1".to_string()]);
        reg.publish("board-2", vec!["t1".to_string(), "t2".to_string()]);
        reg.publish("board-3", vec!["t3".to_string()]);

        let changed = reg.update_scopes(|_, items| {
            let before = items.len();
            items.retain(|t| t != "t1");
            items.len() != before
        });
        assert_eq!(changed, 2);
        assert_eq!(reg.latest("board-1"), Vec::<String>::new());
        assert_eq!(reg.latest("board-2"), vec!["t2".to_string()]);
        assert_eq!(reg.latest("board-3"), vec!["t3".to_string()]);
    }

    #[tokio::test]
    async fn concurrent_subscribe_publish_unsubscribe_is_safe() {
        let reg = registry();
        // Subscribe up front so every consumer is guaranteed to see the
        // replay plus all two hundred publishes, however tasks interleave.
        let mut consumers = Vec::new();
        for _ in 0..8 {
            let mut sub = reg.subscribe("team-1");
            consumers.push(tokio::spawn(async move {
                let mut last = None;
                for _ in 0..201 {
                    match sub.recv().await {
                        Some(Ok(snapshot)) => last = snapshot.last().cloned(),
                        other => panic!("Unexpected event: {:?}", other),
                    }
                }
                last
            }));
        }
        let publisher = {
            let reg = reg.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    reg.publish("team-1", vec![format!("v{i}")]);
                    tokio::task::yield_now().await;
                }
            })
        };
        publisher.await.unwrap();
        for consumer in consumers {
            assert_eq!(consumer.await.unwrap(), Some("v199".to_string()));
        }
        assert_eq!(reg.subscriber_count("team-1"), 0);
    }

    #[tokio::test]
    async fn subscription_works_as_a_stream() {
        let reg = registry();
        let mut sub = reg.subscribe("team-1");
        reg.publish("team-1", vec!["a".to_string()]);

        assert!(sub.next().await.unwrap().unwrap().is_empty());
        assert_eq!(sub.next().await.unwrap().unwrap(), vec!["a".to_string()]);
    }
}
