use super::solvers::traits::{IterationObserver, IterationSnapshot};
use crate::types::Method;
use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Owned copy of an [`IterationSnapshot`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub method: Method,
    pub point: Vec<f64>,
    pub gradient: Vec<f64>,
    pub next: Vec<f64>,
    pub displacement: f64,
}

impl From<&IterationSnapshot<'_>> for IterationRecord {
    fn from(s: &IterationSnapshot<'_>) -> Self {
        Self {
            iteration: s.iteration,
            method: s.method,
            point: s.point.to_vec(),
            gradient: s.gradient.to_vec(),
            next: s.next.to_vec(),
            displacement: s.displacement,
        }
    }
}

/// Observer that ignores every iteration.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl IterationObserver for NoopObserver {
    fn on_iteration(&mut self, _snapshot: &IterationSnapshot<'_>) {}
}

/// Keeps every iteration in memory.
#[derive(Clone, Debug, Default)]
pub struct HistoryObserver {
    history: Vec<IterationRecord>,
}

impl HistoryObserver {
    /// Get iteration history
    pub fn records(&self) -> &[IterationRecord] {
        &self.history
    }

    pub fn into_records(self) -> Vec<IterationRecord> {
        self.history
    }
}

impl IterationObserver for HistoryObserver {
    fn on_iteration(&mut self, snapshot: &IterationSnapshot<'_>) {
        self.history.push(snapshot.into());
    }
}

/// Streams records to another thread.
///
/// A disconnected receiver is treated as a stop request, so a consumer can
/// end the run by dropping its end of the channel.
pub struct ChannelObserver {
    sender: Sender<IterationRecord>,
    disconnected: bool,
}

impl ChannelObserver {
    pub fn new(sender: Sender<IterationRecord>) -> Self {
        Self {
            sender,
            disconnected: false,
        }
    }
}

impl IterationObserver for ChannelObserver {
    fn on_iteration(&mut self, snapshot: &IterationSnapshot<'_>) {
        if self.sender.send(snapshot.into()).is_err() {
            self.disconnected = true;
        }
    }

    fn should_stop(&self) -> bool {
        self.disconnected
    }
}

/// Shareable cancellation flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Wraps another observer with a cancel token and an optional deadline.
pub struct Cancellable<O> {
    inner: O,
    token: CancelToken,
    deadline: Option<Instant>,
}

impl<O: IterationObserver> Cancellable<O> {
    pub fn new(inner: O, token: CancelToken) -> Self {
        Self {
            inner,
            token,
            deadline: None,
        }
    }

    /// Stop once `timeout` has elapsed from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn into_inner(self) -> O {
        self.inner
    }
}

impl<O: IterationObserver> IterationObserver for Cancellable<O> {
    fn on_iteration(&mut self, snapshot: &IterationSnapshot<'_>) {
        self.inner.on_iteration(snapshot);
    }

    fn should_stop(&self) -> bool {
        self.token.is_cancelled()
            || self.deadline.is_some_and(|d| Instant::now() >= d)
            || self.inner.should_stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel;

    fn snapshot<'a>(point: &'a [f64], next: &'a [f64]) -> IterationSnapshot<'a> {
        IterationSnapshot {
            iteration: 3,
            method: Method::Gradient,
            point,
            gradient: point,
            next,
            displacement: 0.5,
        }
    }

    #[test]
    fn history_copies_snapshots() {
        let mut history = HistoryObserver::default();
        history.on_iteration(&snapshot(&[1.0], &[0.5]));
        let records = history.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].iteration, 3);
        assert_eq!(records[0].next, vec![0.5]);
    }

    #[test]
    fn channel_observer_stops_when_receiver_drops() {
        let (tx, rx) = channel::unbounded();
        let mut observer = ChannelObserver::new(tx);

        observer.on_iteration(&snapshot(&[1.0], &[0.5]));
        assert_eq!(rx.recv().unwrap().displacement, 0.5);
        assert!(!observer.should_stop());

        drop(rx);
        observer.on_iteration(&snapshot(&[0.5], &[0.25]));
        assert!(observer.should_stop());
    }

    #[test]
    fn token_and_deadline_stop_the_run() {
        let token = CancelToken::new();
        let observer = Cancellable::new(NoopObserver, token.clone());
        assert!(!observer.should_stop());
        token.cancel();
        assert!(observer.should_stop());

        let expired = Cancellable::new(NoopObserver, CancelToken::new()).with_timeout(Duration::ZERO);
        assert!(expired.should_stop());
    }
}
