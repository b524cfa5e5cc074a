//! SSE subscription for beacon node head events.
//!
//! A [`HeadEventStream`] represents exactly one connection. The client's built-in reconnect is
//! disabled so that a dropped connection ends the stream; reconnecting is left to
//! [`HeadEventService`](crate::service::head_event::HeadEventService).

use std::pin::Pin;
use std::task::{Context, Poll};

use eventsource_client::{Client, ReconnectOptions, SSE};
use futures::Stream;
use url::Url;

use crate::error::{Error, Result};
use crate::types::HeadEvent;

const HEAD_TOPIC: &str = "head";

/// Item produced by a [`HeadEventStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The connection was established.
    Connected,
    /// A decoded head event.
    Head(HeadEvent),
}

/// Stream of head events over a single SSE connection.
///
/// Yields [`Error::Decode`] for a `head` event whose data does not decode and
/// [`Error::MalformedEvent`] for a line that is not valid SSE. The stream stays usable after
/// either. Any other error means the connection is gone.
pub struct HeadEventStream {
    client: Pin<Box<dyn Stream<Item = eventsource_client::Result<SSE>> + Send>>,
}

impl Stream for HeadEventStream {
    type Item = Result<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match self.client.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(SSE::Event(event)))) => {
                    if event.event_type != HEAD_TOPIC {
                        continue;
                    }
                    let result = serde_json::from_str::<HeadEvent>(&event.data)
                        .map(StreamEvent::Head)
                        .map_err(Error::Decode);
                    return Poll::Ready(Some(result));
                }
                Poll::Ready(Some(Ok(SSE::Connected(_)))) => {
                    return Poll::Ready(Some(Ok(StreamEvent::Connected)));
                }
                Poll::Ready(Some(Ok(SSE::Comment(_)))) => continue,
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(classify(e)))),
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Parse failures affect a single event and leave the connection open. Everything else means
/// the connection is gone.
fn classify(e: eventsource_client::Error) -> Error {
    match e {
        eventsource_client::Error::InvalidLine(line) => Error::MalformedEvent(line),
        eventsource_client::Error::InvalidEvent => {
            Error::MalformedEvent("empty event".to_string())
        }
        e => Error::Sse(format!("{e:?}")),
    }
}

/// Subscribe to head events via SSE.
///
/// The connection is opened lazily on the first poll.
pub fn subscribe_head_events(base_url: &Url) -> Result<HeadEventStream> {
    let url = build_events_url(base_url)?;

    let client = eventsource_client::ClientBuilder::for_url(url.as_str())
        .map_err(|e| Error::Config(format!("Invalid SSE URL: {e}")))?
        .reconnect(ReconnectOptions::reconnect(false).build())
        .build();

    Ok(HeadEventStream {
        client: Box::pin(client.stream()),
    })
}

/// Build the head events URL below `base_url`, keeping any path prefix.
pub fn build_events_url(base_url: &Url) -> Result<Url> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let mut url = base.join("eth/v1/events")?;
    url.query_pairs_mut().append_pair("topics", HEAD_TOPIC);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::{build_events_url, classify};
    use crate::error::Error;

    #[test]
    fn build_events_url_adds_path_without_trailing_slash() {
        let url = build_events_url(&Url::parse("http://localhost:5052").unwrap()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5052/eth/v1/events?topics=head"
        );
    }

    #[test]
    fn build_events_url_adds_path_with_trailing_slash() {
        let url = build_events_url(&Url::parse("http://localhost:5052/").unwrap()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5052/eth/v1/events?topics=head"
        );
    }

    #[test]
    fn build_events_url_keeps_path_prefix() {
        let url = build_events_url(&Url::parse("http://localhost:5052/node-1").unwrap()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5052/node-1/eth/v1/events?topics=head"
        );
    }

    #[test]
    fn parse_failures_keep_the_connection() {
        let err = classify(eventsource_client::Error::InvalidLine(
            "malformed value: Utf8Error".to_string(),
        ));
        assert!(matches!(err, Error::MalformedEvent(_)));
        assert!(matches!(
            classify(eventsource_client::Error::InvalidEvent),
            Error::MalformedEvent(_)
        ));
    }

    #[test]
    fn connection_failures_end_the_stream() {
        assert!(matches!(classify(eventsource_client::Error::Eof), Error::Sse(_)));
        assert!(matches!(
            classify(eventsource_client::Error::UnexpectedEof),
            Error::Sse(_)
        ));
        assert!(matches!(classify(eventsource_client::Error::TimedOut), Error::Sse(_)));
        assert!(matches!(
            classify(eventsource_client::Error::StreamClosed),
            Error::Sse(_)
        ));
    }
}
