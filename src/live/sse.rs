//! Mapping rendered fragments onto Datastar server-sent events.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

/// Event name Datastar clients treat as "patch the page with these elements".
pub const PATCH_ELEMENTS_EVENT: &str = "datastar-patch-elements";

/// Build one patch event. Every line of `html` becomes an `elements` data line.
pub fn patch_elements(html: &str) -> Event {
    Event::default()
        .event(PATCH_ELEMENTS_EVENT)
        .data(elements_data(html))
}

fn elements_data(html: &str) -> String {
    let mut lines: Vec<String> = html.lines().map(|line| format!("elements {line}")).collect();
    if lines.is_empty() {
        lines.push("elements ".to_string());
    }
    lines.join("\n")
}

/// Turn the engine's output channel into an SSE response body.
///
/// Dropping the response (client disconnect) closes the channel, which the
/// engine observes as the end of the stream.
pub fn into_sse(rx: mpsc::Receiver<String>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = ReceiverStream::new(rx).map(|html| Ok(patch_elements(&html)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}
