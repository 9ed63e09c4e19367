//! Server-Sent Events support

use crate::conversation::OutboundEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tracing::Span;

/// Convert a run's outbound events to an SSE response
pub fn sse_stream<S>(events: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = OutboundEvent> + Send + 'static,
{
    let stream = events.map(|event| Ok(outbound_to_axum(&event)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

/// Enter `span` around every poll so logs emitted by the run carry its fields
pub fn in_span<S>(stream: S, span: Span) -> impl Stream<Item = S::Item> + Send
where
    S: Stream + Send + 'static,
{
    let mut stream = Box::pin(stream);
    futures::stream::poll_fn(move |cx| {
        let _entered = span.enter();
        stream.as_mut().poll_next(cx)
    })
}

fn outbound_to_axum(event: &OutboundEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|e| {
        json!({
            "type": "error",
            "message": format!("Failed to encode event: {e}")
        })
        .to_string()
    });

    Event::default().event(event.kind()).data(data)
}
