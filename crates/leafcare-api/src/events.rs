use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use leafcare_types::events::ContentEvent;

use crate::state::AppState;

/// Fans out content-change events to every `/events` subscriber.
#[derive(Clone)]
pub struct Revalidator {
    tx: broadcast::Sender<ContentEvent>,
}

impl Default for Revalidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Revalidator {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContentEvent> {
        self.tx.subscribe()
    }

    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: ContentEvent) {
        debug!("Revalidate {}", event.path());
        let _ = self.tx.send(event);
    }
}

/// GET /events: server-sent stream of `ContentEvent`s.
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl futures_util::stream::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.revalidator.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => match Event::default().event(event.kind()).json_data(&event) {
                    Ok(sse) => yield Ok(sse),
                    Err(e) => warn!("Failed to encode event: {}", e),
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event subscriber lagged, skipped {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
