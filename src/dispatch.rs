//! Publish-subscribe fan-out of pipeline events.
//!
//! Events go out on three topics. `Input` carries activations and is never
//! dropped. `Observation` carries cursor, dwell progress and tracking state
//! and is lossy under backpressure. `Diagnostics` carries the pass-through
//! cursor. Every event gets a sequence number from a single counter, and a
//! subscriber that listens on several topics receives them on one channel
//! in publish order, so a cursor update is always seen before the
//! activation it caused.

use crate::{
    constants::MAX_OBSERVATION_CAPACITY,
    dwell::TargetId,
    geometry::ScreenPoint,
    tracking::TrackingAvailability,
    Error, Result,
};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use log::{debug, trace};
use parking_lot::RwLock;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// Event channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Synthetic input for the UI event path
    Input,
    /// Low-priority visualization and warning stream
    Observation,
    /// Pass-through cursor for debugging
    Diagnostics,
}

/// Event produced by the pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GazeEvent {
    /// Production cursor position
    Cursor(ScreenPoint),
    /// Pass-through cursor position
    DiagnosticCursor(ScreenPoint),
    /// Dwell progress in [0, 1]
    DwellProgress {
        /// Target being dwelt on
        target: TargetId,
        /// Elapsed / threshold
        fraction: f64,
    },
    /// A dwell ended without activation
    DwellCancelled(TargetId),
    /// A completed dwell
    Activation(TargetId),
    /// Tracking availability transition
    Tracking(TrackingAvailability),
}

impl GazeEvent {
    /// Topic this event is published on
    #[must_use]
    pub const fn topic(&self) -> Topic {
        match self {
            Self::Activation(_) => Topic::Input,
            Self::DiagnosticCursor(_) => Topic::Diagnostics,
            Self::Cursor(_) | Self::DwellProgress { .. } | Self::DwellCancelled(_) | Self::Tracking(_) => {
                Topic::Observation
            }
        }
    }
}

/// Event with its publish sequence number
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    /// Position in the global publish order
    pub seq: u64,
    /// Payload
    pub event: GazeEvent,
}

/// Receiving end of a subscription
#[derive(Debug)]
pub struct Subscriber {
    topics: Vec<Topic>,
    receiver: Receiver<Envelope>,
}

impl Subscriber {
    /// Receive an event (blocking)
    pub fn recv(&self) -> Result<Envelope> {
        self.receiver
            .recv()
            .map_err(|_| Error::InvalidInput("dispatcher closed".to_string()))
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv(&self) -> Result<Option<Envelope>> {
        match self.receiver.try_recv() {
            Ok(envelope) => Ok(Some(envelope)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::InvalidInput("dispatcher closed".to_string())),
        }
    }

    /// Receive an event, waiting at most `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Envelope>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::InvalidInput("dispatcher closed".to_string())),
        }
    }

    /// All events currently queued
    #[must_use]
    pub fn drain(&self) -> Vec<Envelope> {
        self.receiver.try_iter().collect()
    }

    /// Topics this subscriber listens on
    #[must_use]
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }
}

#[derive(Debug)]
struct Subscription {
    id: u64,
    topics: Vec<Topic>,
    sender: Sender<Envelope>,
    lossy: bool,
}

/// Event fan-out to any number of subscribers
#[derive(Debug)]
pub struct Dispatcher {
    subscriptions: RwLock<Vec<Subscription>>,
    observation_capacity: usize,
    next_id: AtomicU64,
    next_seq: AtomicU64,
    dropped: AtomicU64,
}

impl Dispatcher {
    /// Create a dispatcher whose observation-only subscribers buffer at most
    /// `observation_capacity` events, clamped to `1..=MAX_OBSERVATION_CAPACITY`
    #[must_use]
    pub fn new(observation_capacity: usize) -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            observation_capacity: observation_capacity.clamp(1, MAX_OBSERVATION_CAPACITY),
            next_id: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Subscribe to one or more topics.
    ///
    /// A subscription that includes [`Topic::Input`] is unbounded so no
    /// activation is ever lost; any other subscription is bounded and drops
    /// new events while full.
    pub fn subscribe(&self, topics: &[Topic]) -> Subscriber {
        let lossy = !topics.contains(&Topic::Input);
        let (sender, receiver) = if lossy {
            channel::bounded(self.observation_capacity)
        } else {
            channel::unbounded()
        };
        debug!("New subscriber for {:?}", topics);

        self.subscriptions.write().push(Subscription {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            topics: topics.to_vec(),
            sender,
            lossy,
        });
        Subscriber {
            topics: topics.to_vec(),
            receiver,
        }
    }

    /// Publish an event to every subscriber of its topic; returns its
    /// sequence number
    pub fn publish(&self, event: GazeEvent) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let topic = event.topic();
        let envelope = Envelope { seq, event };
        trace!("publish #{} {:?}", seq, event);

        let mut disconnected = Vec::new();
        for subscription in self.subscriptions.read().iter() {
            if !subscription.topics.contains(&topic) {
                continue;
            }
            match subscription.sender.try_send(envelope) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug_assert!(subscription.lossy);
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => disconnected.push(subscription.id),
            }
        }

        if !disconnected.is_empty() {
            self.prune(&disconnected);
        }
        seq
    }

    // Skipped while the list is locked; retried on the next failed send
    fn prune(&self, closed: &[u64]) {
        if let Some(mut subscriptions) = self.subscriptions.try_write() {
            subscriptions.retain(|s| !closed.contains(&s.id));
            debug!("Removed {} closed subscribers", closed.len());
        }
    }

    /// Number of live subscriptions
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Events published so far
    #[must_use]
    pub fn published(&self) -> u64 {
        self.next_seq.load(Ordering::Relaxed)
    }

    /// Events dropped because an observation subscriber was full
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_OBSERVATION_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_routing() {
        let dispatcher = Dispatcher::default();
        let input = dispatcher.subscribe(&[Topic::Input]);
        let observation = dispatcher.subscribe(&[Topic::Observation]);
        let diagnostics = dispatcher.subscribe(&[Topic::Diagnostics]);

        dispatcher.publish(GazeEvent::Cursor(ScreenPoint::new(1.0, 2.0)));
        dispatcher.publish(GazeEvent::Activation(TargetId(3)));
        dispatcher.publish(GazeEvent::DiagnosticCursor(ScreenPoint::new(0.0, 0.0)));

        assert_eq!(input.drain().len(), 1);
        assert_eq!(observation.drain().len(), 1);
        assert_eq!(diagnostics.drain().len(), 1);
    }

    #[test]
    fn test_combined_subscription_preserves_order() {
        let dispatcher = Dispatcher::default();
        let ui = dispatcher.subscribe(&[Topic::Input, Topic::Observation]);

        dispatcher.publish(GazeEvent::Cursor(ScreenPoint::new(500.0, 400.0)));
        dispatcher.publish(GazeEvent::Activation(TargetId(1)));

        let events = ui.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].event, GazeEvent::Cursor(_)));
        assert!(matches!(events[1].event, GazeEvent::Activation(TargetId(1))));
        assert!(events[0].seq < events[1].seq);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let dispatcher = Dispatcher::new(usize::MAX);
        let observation = dispatcher.subscribe(&[Topic::Observation]);

        for _ in 0..=MAX_OBSERVATION_CAPACITY {
            dispatcher.publish(GazeEvent::Cursor(ScreenPoint::new(0.0, 0.0)));
        }
        assert_eq!(observation.drain().len(), MAX_OBSERVATION_CAPACITY);
        assert_eq!(dispatcher.dropped(), 1);
    }

    #[test]
    fn test_observation_is_lossy_input_is_not() {
        let dispatcher = Dispatcher::new(2);
        let observation = dispatcher.subscribe(&[Topic::Observation]);
        let input = dispatcher.subscribe(&[Topic::Input]);

        for i in 0..10u32 {
            dispatcher.publish(GazeEvent::Cursor(ScreenPoint::new(f64::from(i), 0.0)));
            dispatcher.publish(GazeEvent::Activation(TargetId(u64::from(i))));
        }

        // Oldest events are kept
        let kept = observation.drain();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].event, GazeEvent::Cursor(ScreenPoint::new(0.0, 0.0)));
        assert_eq!(input.drain().len(), 10);
        assert_eq!(dispatcher.dropped(), 8);
        assert_eq!(dispatcher.published(), 20);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let dispatcher = Dispatcher::default();
        let keep = dispatcher.subscribe(&[Topic::Observation]);
        let gone = dispatcher.subscribe(&[Topic::Observation]);
        drop(gone);

        dispatcher.publish(GazeEvent::Tracking(TrackingAvailability::Acquired));
        assert_eq!(dispatcher.subscriber_count(), 1);
        assert_eq!(
            keep.try_recv().unwrap().map(|e| e.event),
            Some(GazeEvent::Tracking(TrackingAvailability::Acquired))
        );
        assert!(keep.try_recv().unwrap().is_none());
    }
}
