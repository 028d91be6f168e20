//! In-process publish/subscribe registry for chat events.
//!
//! Decouples producers of chat-state changes (the session state machine,
//! message ingress) from consumers (admin dashboards, visitor widgets)
//! without store polling. Channels are created lazily on first subscribe and
//! removed when their last listener leaves.
//!
//! The broadcaster is in-memory and single-process: it gives no delivery
//! guarantee across restarts or between server instances. That is acceptable
//! for a live-presence feed; durable state lives in the store. A horizontal
//! deployment must substitute a durable pub/sub behind this same interface.

mod event;

pub use event::{ALL_CHANNEL, ChatEvent, ChatEventKind};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tracing::trace;

// ============================================================================
// EventBroadcaster
// ============================================================================

struct Listener {
    id: u64,
    tx: mpsc::UnboundedSender<ChatEvent>,
}

#[derive(Default)]
struct Inner {
    // std Mutex: held only for map bookkeeping and non-blocking sends,
    // never across .await points.
    channels: Mutex<HashMap<String, Vec<Listener>>>,
    next_id: AtomicU64,
}

/// Channel-keyed fan-out registry. Cheap to clone; constructed once at
/// server startup and passed to whoever publishes or subscribes.
#[derive(Clone, Default)]
pub struct EventBroadcaster {
    inner: Arc<Inner>,
}

impl EventBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener on a named channel.
    ///
    /// The returned [`Subscription`] receives every event broadcast to that
    /// channel, in broadcast order, and unsubscribes when dropped. Each
    /// listener gets an unbounded queue so one slow consumer can never stall
    /// message ingress or its sibling listeners.
    pub fn subscribe(&self, channel: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner
            .channels
            .lock()
            .expect("mutex poisoned")
            .entry(channel.to_string())
            .or_default()
            .push(Listener { id, tx });

        trace!(channel, listener = id, "Subscribed");
        Subscription {
            channel: channel.to_string(),
            id,
            rx,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Deliver an event to the union of: the channel named by the event's
    /// session ID, each of `additional_channels`, and the reserved `"all"`
    /// channel. Duplicate channel names are delivered once.
    ///
    /// Delivery is per-listener isolated: a listener whose receiver is gone
    /// is pruned without affecting the rest.
    pub fn broadcast(&self, event: ChatEvent, additional_channels: &[&str]) {
        let mut targets: Vec<&str> = Vec::with_capacity(2 + additional_channels.len());
        targets.push(event.session_id.as_str());
        for channel in additional_channels {
            if !targets.contains(channel) {
                targets.push(channel);
            }
        }
        if !targets.contains(&ALL_CHANNEL) {
            targets.push(ALL_CHANNEL);
        }

        let mut channels = self.inner.channels.lock().expect("mutex poisoned");
        for channel in targets {
            let emptied = match channels.get_mut(channel) {
                Some(listeners) => {
                    listeners.retain(|l| l.tx.send(event.clone()).is_ok());
                    listeners.is_empty()
                }
                None => false,
            };
            if emptied {
                channels.remove(channel);
            }
        }
    }

    /// Number of listeners currently registered on a channel.
    ///
    /// Zero means the channel does not exist in the registry.
    pub fn listener_count(&self, channel: &str) -> usize {
        self.inner
            .channels
            .lock()
            .expect("mutex poisoned")
            .get(channel)
            .map_or(0, Vec::len)
    }

    /// Number of live channels.
    pub fn channel_count(&self) -> usize {
        self.inner.channels.lock().expect("mutex poisoned").len()
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// A registered listener. Dropping it removes exactly this listener from its
/// channel; if it was the last one, the channel is removed from the registry.
pub struct Subscription {
    channel: String,
    id: u64,
    rx: mpsc::UnboundedReceiver<ChatEvent>,
    inner: Arc<Inner>,
}

impl Subscription {
    /// Channel this subscription listens on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Receive the next event. Returns `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<ChatEvent> {
        self.rx.recv().await
    }

    /// Poll for the next event; used by stream adapters.
    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<ChatEvent>> {
        self.rx.poll_recv(cx)
    }

    /// Receive without waiting; `None` when no event is queued.
    pub fn try_recv(&mut self) -> Option<ChatEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut channels = self.inner.channels.lock().expect("mutex poisoned");
        let emptied = match channels.get_mut(&self.channel) {
            Some(listeners) => {
                listeners.retain(|l| l.id != self.id);
                listeners.is_empty()
            }
            None => false,
        };
        if emptied {
            channels.remove(&self.channel);
        }
        trace!(channel = %self.channel, listener = self.id, "Unsubscribed");
    }
}

// ============================================================================
// Tests
// ============================================================================
