//! Notice broadcaster for user-visible signals
//!
//! The controller escalates exactly one condition to the user: polling
//! paused after sustained failure. Notices fan out over a broadcast channel
//! to however many SSE clients happen to be connected; zero subscribers is
//! not an error.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

/// A single user-visible, non-blocking notice
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    /// Event name, e.g. "refresh_paused"
    pub event: String,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl Notice {
    pub fn refresh_paused(failed_cycles: u32) -> Self {
        Self {
            event: "refresh_paused".to_string(),
            message: format!(
                "Automatic refresh paused after {} consecutive failed cycles; \
                 check the backend connection and reload the dashboard.",
                failed_cycles
            ),
            raised_at: Utc::now(),
        }
    }
}

/// Notice broadcaster manages subscriber connections and notice distribution
#[derive(Clone)]
pub struct NoticeBroadcaster {
    tx: broadcast::Sender<Notice>,
}

impl NoticeBroadcaster {
    /// Create a new broadcaster buffering up to `capacity` notices
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Broadcast a notice, ignoring if no subscribers are connected
    pub fn broadcast_lossy(&self, notice: Notice) {
        debug!(event = %notice.event, "broadcasting notice");
        let _ = self.tx.send(notice);
    }

    /// Subscribe directly to the raw notice channel
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Current number of connected subscribers
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Create an SSE stream for a new client connection
    pub fn subscribe_stream(&self) -> impl Stream<Item = Result<Event, Infallible>> {
        let rx = self.tx.subscribe();
        let stream = BroadcastStream::new(rx);

        stream.filter_map(|result| async move {
            match result {
                Ok(notice) => {
                    let event = Event::default()
                        .event(notice.event.clone())
                        .json_data(&notice)
                        .ok();
                    event.map(Ok)
                }
                Err(e) => {
                    // BroadcastStream wraps RecvError, just log and continue
                    warn!("notice subscriber lagged: {:?}", e);
                    None
                }
            }
        })
    }

    /// Axum handler body for `GET /events`
    pub fn handle_sse_connection(&self) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
        info!(
            "new notice subscriber connected, total subscribers: {}",
            self.client_count()
        );

        Sse::new(self.subscribe_stream()).keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("heartbeat"),
        )
    }
}
