//! Periodic abandonment sweep.
//!
//! Marks `Active` sessions abandoned once their `last_activity_at` falls
//! behind the configured threshold. Sessions under admin control are never
//! touched; a human is present.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::background::BackgroundTasks;

use super::service::ChatService;

/// Spawn the sweep loop on the background task registry.
///
/// The first tick fires one full interval after startup, not immediately;
/// there is nothing to sweep before the server has been up for a while. The
/// loop exits when `shutdown` is cancelled.
pub fn spawn_sweeper(tasks: &BackgroundTasks, chat: ChatService, shutdown: CancellationToken) {
    let period = Duration::from_secs(chat.config().sweep_interval_seconds);

    tasks.spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        debug!(period_seconds = period.as_secs(), "Abandonment sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Abandonment sweeper stopped");
                    return;
                }
                _ = interval.tick() => {
                    if let Err(e) = chat.sweep_abandoned().await {
                        warn!(error = %e, "Abandonment sweep failed");
                    }
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::broadcast::EventBroadcaster;
    use crate::chat::model::SessionStatus;
    use crate::config::ChatConfig;
    use crate::store::MemoryStore;

    #[tokio::test(start_paused = true)]
    async fn sweeper_marks_stale_sessions() {
        let chat = ChatService::new(
            Arc::new(MemoryStore::new()),
            EventBroadcaster::new(),
            ChatConfig {
                abandon_after_minutes: 0,
                sweep_interval_seconds: 1,
                ..Default::default()
            },
        );
        let (session, _) = chat
            .record_visitor_message("tok-1", "hi", None, None, None)
            .await
            .unwrap();

        let tasks = BackgroundTasks::new();
        let shutdown = CancellationToken::new();
        spawn_sweeper(&tasks, chat.clone(), shutdown.clone());

        // Let the first interval elapse under the paused clock.
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(
            chat.get_session(&session.id).await.unwrap().status,
            SessionStatus::Abandoned
        );

        shutdown.cancel();
        tasks.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_stops_on_cancellation() {
        let chat = ChatService::new(
            Arc::new(MemoryStore::new()),
            EventBroadcaster::new(),
            ChatConfig::default(),
        );
        let tasks = BackgroundTasks::new();
        let shutdown = CancellationToken::new();
        spawn_sweeper(&tasks, chat, shutdown.clone());

        shutdown.cancel();
        tasks.shutdown().await;
        assert_eq!(tasks.pending_count(), 0);
    }
}
