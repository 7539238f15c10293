//! SSE progress endpoint.
//!
//! GET /course/:course_id/generation
//!
//! Subscribes to the course's progress channel and forwards each event as
//! an SSE event named after its `event` tag. A client that falls behind
//! gets a `lagged` event with the number of missed events.

use std::convert::Infallible;

use axum::{
    extract::{Extension, Path},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, StreamExt};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use crate::server::app::AppState;

pub async fn generation_stream_handler(
    Extension(state): Extension<AppState>,
    Path(course_id): Path<i64>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    // Drop channels whose subscribers all went away
    state.deps.progress.cleanup().await;
    let rx = state.deps.progress.subscribe(course_id).await;

    let connected =
        stream::once(async { Ok::<_, Infallible>(Event::default().event("connected").data("ok")) });

    let events = BroadcastStream::new(rx).filter_map(|result| async {
        match result {
            Ok(value) => {
                let event_name = value
                    .get("event")
                    .and_then(|t| t.as_str())
                    .unwrap_or("message");
                Event::default()
                    .event(event_name)
                    .json_data(&value)
                    .ok()
                    .map(Ok)
            }
            Err(BroadcastStreamRecvError::Lagged(n)) => Event::default()
                .event("lagged")
                .json_data(serde_json::json!({ "missed": n }))
                .ok()
                .map(Ok),
        }
    });

    Sse::new(connected.chain(events)).keep_alive(KeepAlive::default())
}
