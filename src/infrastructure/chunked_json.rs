// Chunked NDJSON streaming utilities
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Create a chunked response with one JSON document per line
pub fn chunked_json_stream<S, T>(stream: S) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize,
{
    let byte_stream = stream.map(|item| serialize_line(&item));

    let body = Body::from_stream(byte_stream);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

fn serialize_line<T: Serialize>(item: &T) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_vec(item)?;

    let mut line = BytesMut::with_capacity(json.len() + 1);
    line.put_slice(&json);
    line.put_u8(b'\n');

    Ok(line.freeze())
}

/// Current value first, then every change, until `is_final` matches or the
/// sender goes away
pub fn watch_updates<T, F>(rx: watch::Receiver<T>, is_final: F) -> impl Stream<Item = T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&T) -> bool + Send + 'static,
{
    async_stream::stream! {
        let mut updates = WatchStream::new(rx);
        while let Some(value) = updates.next().await {
            let last = is_final(&value);
            yield value;
            if last {
                break;
            }
        }
    }
}

/// Helper to create a streaming response from a watch receiver
pub fn stream_from_watch<T, F>(rx: watch::Receiver<T>, is_final: F) -> impl IntoResponse
where
    T: Clone + Serialize + Send + Sync + 'static,
    F: Fn(&T) -> bool + Send + 'static,
{
    match chunked_json_stream(watch_updates(rx, is_final)) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
