//! One-shot visibility trigger.
//!
//! [`LazyTrigger::observe`] waits for the first intersection event with a
//! ratio above zero, disconnects from the observer and runs the callback
//! exactly once. It never re-arms, whatever the callback returns.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::lifecycle::Liveness;

/// Visible fraction of an observed element, in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEvent {
    pub ratio: f32,
}

/// Host viewport-intersection observer.
///
/// Dropping the returned receiver disconnects the observation.
pub trait VisibilityObserver: Send + Sync {
    fn observe(&self, target: &str) -> mpsc::UnboundedReceiver<IntersectionEvent>;
}

/// How an observation session ended.
#[derive(Debug, PartialEq)]
pub enum TriggerOutcome<T> {
    /// The element became visible and the callback ran.
    Fired(T),
    /// The observer went away before the element became visible.
    Disconnected,
    /// The owning view was destroyed first.
    Cancelled,
}

pub struct LazyTrigger {
    observer: Arc<dyn VisibilityObserver>,
}

impl LazyTrigger {
    pub fn new(observer: Arc<dyn VisibilityObserver>) -> Self {
        Self { observer }
    }

    /// Observe `target` and run `on_visible` once it first intersects the
    /// viewport.
    pub async fn observe<F, Fut, T>(
        &self,
        target: &str,
        liveness: &Liveness,
        on_visible: F,
    ) -> TriggerOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut events = self.observer.observe(target);
        tracing::debug!(target_element = %target, "Observing visibility");

        loop {
            tokio::select! {
                biased;
                _ = liveness.destroyed() => {
                    tracing::debug!(target_element = %target, "Visibility observation cancelled");
                    return TriggerOutcome::Cancelled;
                }
                event = events.recv() => match event {
                    Some(event) if event.ratio > 0.0 => break,
                    Some(_) => continue,
                    None => {
                        tracing::debug!(target_element = %target, "Visibility observer disconnected");
                        return TriggerOutcome::Disconnected;
                    }
                }
            }
        }

        // One-shot: stop observing before doing any work
        drop(events);
        tracing::debug!(target_element = %target, "Lazy trigger fired");

        TriggerOutcome::Fired(on_visible().await)
    }
}

/// Observer driven by the host pushing intersection ratios.
#[derive(Default)]
pub struct ChannelVisibility {
    observers: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<IntersectionEvent>>>>,
}

impl ChannelVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a ratio to every live observation of `target`.
    ///
    /// Returns the number of observations reached.
    pub fn push(&self, target: &str, ratio: f32) -> usize {
        let mut observers = self.observers.lock();
        let Some(senders) = observers.get_mut(target) else {
            return 0;
        };

        senders.retain(|tx| tx.send(IntersectionEvent { ratio }).is_ok());
        let delivered = senders.len();
        if delivered == 0 {
            observers.remove(target);
        }
        delivered
    }

    /// Number of observations of `target` still connected.
    pub fn observer_count(&self, target: &str) -> usize {
        let mut observers = self.observers.lock();
        prune_closed(&mut observers);
        observers.get(target).map(Vec::len).unwrap_or(0)
    }

    /// Number of targets with at least one connected observation.
    pub fn target_count(&self) -> usize {
        let mut observers = self.observers.lock();
        prune_closed(&mut observers);
        observers.len()
    }
}

// Observations end when their receiver is dropped: the trigger fired or was
// cancelled. Targets are unique per view and rarely pushed to again.
fn prune_closed(observers: &mut HashMap<String, Vec<mpsc::UnboundedSender<IntersectionEvent>>>) {
    observers.retain(|_, senders| {
        senders.retain(|tx| !tx.is_closed());
        !senders.is_empty()
    });
}

impl VisibilityObserver for ChannelVisibility {
    fn observe(&self, target: &str) -> mpsc::UnboundedReceiver<IntersectionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut observers = self.observers.lock();
        prune_closed(&mut observers);
        observers.entry(target.to_string()).or_default().push(tx);
        rx
    }
}

/// Observer for headless rendering: every element is fully visible at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysVisible;

impl VisibilityObserver for AlwaysVisible {
    fn observe(&self, _target: &str) -> mpsc::UnboundedReceiver<IntersectionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(IntersectionEvent { ratio: 1.0 });
        rx
    }
}
