//! SSE push streams for chat events.
//!
//! One [`EventStream`] per open connection. The stream owns its broadcaster
//! subscription and its ping timer; dropping the response body (client
//! disconnect) releases both, so a dropped connection never leaks a
//! listener.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::Sse;
use axum::response::sse::Event;
use chrono::Utc;
use futures::Stream;
use tracing::{debug, warn};

use crate::api::AdminStreamQuery;
use crate::broadcast::{ALL_CHANNEL, Subscription};
use crate::server::AppState;

// ============================================================================
// EventStream
// ============================================================================

/// Long-lived SSE body: a `connected` event, then broadcast events
/// interleaved with periodic `ping` events.
///
/// Every event is a data-only frame carrying one JSON object, matching the
/// `EventSource`-style clients on the other end.
pub(crate) struct EventStream {
    subscription: Subscription,
    ping: tokio::time::Interval,
    /// Forward only visitor-visible event kinds.
    visitor_only: bool,
    connected_sent: bool,
}

impl EventStream {
    pub(crate) fn new(
        subscription: Subscription,
        ping_interval: Duration,
        visitor_only: bool,
    ) -> Self {
        // First ping one full interval in; the connected event covers "now".
        let ping = tokio::time::interval_at(tokio::time::Instant::now() + ping_interval, ping_interval);
        Self {
            subscription,
            ping,
            visitor_only,
            connected_sent: false,
        }
    }

    fn status_event(kind: &str) -> Event {
        let payload = serde_json::json!({ "type": kind, "timestamp": Utc::now() });
        Event::default().data(payload.to_string())
    }
}

impl Stream for EventStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if !this.connected_sent {
            this.connected_sent = true;
            return Poll::Ready(Some(Ok(Self::status_event("connected"))));
        }

        // Drain broadcast events before considering a ping.
        loop {
            match this.subscription.poll_recv(cx) {
                Poll::Ready(Some(event)) => {
                    if this.visitor_only && !event.visitor_visible() {
                        continue;
                    }
                    match serde_json::to_string(&event) {
                        Ok(json) => return Poll::Ready(Some(Ok(Event::default().data(json)))),
                        Err(e) => {
                            warn!(error = %e, "Failed to serialize chat event");
                            continue;
                        }
                    }
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => break,
            }
        }

        match this.ping.poll_tick(cx) {
            Poll::Ready(_) => Poll::Ready(Some(Ok(Self::status_event("ping")))),
            Poll::Pending => Poll::Pending,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/chat/stream
///
/// Admin event feed. Subscribes to a specific session's channel when
/// `session_id` is given, otherwise to the reserved `"all"` channel.
/// Forwards every event type unfiltered.
pub async fn admin_stream(
    State(state): State<AppState>,
    Query(query): Query<AdminStreamQuery>,
) -> impl axum::response::IntoResponse {
    let channel = query.session_id.as_deref().unwrap_or(ALL_CHANNEL);
    let subscription = state.chat.broadcaster().subscribe(channel);
    debug!(channel, "Admin stream opened");

    Sse::new(EventStream::new(
        subscription,
        Duration::from_secs(state.keep_alive_interval_seconds),
        false,
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{ChatEvent, ChatEventKind, EventBroadcaster};
    use futures::StreamExt;

    #[tokio::test]
    async fn emits_connected_first() {
        let bus = EventBroadcaster::new();
        let mut stream = EventStream::new(bus.subscribe("chs_1"), Duration::from_secs(30), false);

        let first = stream.next().await.expect("event").unwrap();
        let rendered = format!("{:?}", first);
        assert!(rendered.contains("connected"));
    }

    #[tokio::test]
    async fn forwards_broadcast_events() {
        let bus = EventBroadcaster::new();
        let mut stream = EventStream::new(bus.subscribe("chs_1"), Duration::from_secs(30), false);
        let _connected = stream.next().await;

        bus.broadcast(
            ChatEvent::new("chs_1", ChatEventKind::AdminLeft),
            &[],
        );

        let event = stream.next().await.expect("event").unwrap();
        assert!(format!("{:?}", event).contains("admin_left"));
    }

    #[tokio::test]
    async fn visitor_mode_filters_admin_only_events() {
        let bus = EventBroadcaster::new();
        let mut stream = EventStream::new(bus.subscribe("tok-1"), Duration::from_secs(30), true);
        let _connected = stream.next().await;

        bus.broadcast(
            ChatEvent::new("chs_1", ChatEventKind::SessionEnded),
            &["tok-1"],
        );
        bus.broadcast(
            ChatEvent::new(
                "chs_1",
                ChatEventKind::AdminJoined {
                    admin_id: "admin-1".to_string(),
                },
            ),
            &["tok-1"],
        );

        // session_ended is skipped; the next item is admin_joined.
        let event = stream.next().await.expect("event").unwrap();
        let rendered = format!("{:?}", event);
        assert!(rendered.contains("admin_joined"));
        assert!(!rendered.contains("session_ended"));
    }

    #[tokio::test(start_paused = true)]
    async fn pings_on_interval_when_idle() {
        let bus = EventBroadcaster::new();
        let mut stream = EventStream::new(bus.subscribe("chs_1"), Duration::from_secs(30), false);
        let _connected = stream.next().await;

        let ping = tokio::time::timeout(Duration::from_secs(31), stream.next())
            .await
            .expect("ping before timeout")
            .expect("event")
            .unwrap();
        assert!(format!("{:?}", ping).contains("ping"));
    }

    #[tokio::test]
    async fn dropping_stream_unsubscribes() {
        let bus = EventBroadcaster::new();
        let stream = EventStream::new(bus.subscribe("chs_1"), Duration::from_secs(30), false);
        assert_eq!(bus.listener_count("chs_1"), 1);

        drop(stream);
        assert_eq!(bus.listener_count("chs_1"), 0);
    }
}
