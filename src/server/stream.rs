//! MJPEG response body
//!
//! A `MjpegStream` turns a frame cursor into an endless response body. Every
//! new frame becomes one multipart part. hyper polls the body for as long as
//! the client accepts data; once a write fails the connection and the body
//! are dropped, which is the only way a stream ends.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::frame::FrameCursor;
use crate::http::multipart::{encode_part, STREAM_CONTENT_TYPE};
use crate::server::connection::ClientInfo;
use crate::stats::{ServerStats, StreamStats};

/// One client's MJPEG stream
///
/// Counted as an active stream from creation until drop.
pub struct MjpegStream {
    cursor: FrameCursor,
    client: ClientInfo,
    server_stats: Arc<ServerStats>,
    stats: StreamStats,
}

impl MjpegStream {
    pub fn new(cursor: FrameCursor, client: ClientInfo, server_stats: Arc<ServerStats>) -> Self {
        server_stats.stream_started();
        client.mark_streaming();

        tracing::info!(
            session_id = client.session_id,
            peer = %client.peer_addr,
            active_streams = server_stats.active_streams(),
            "Streaming client added"
        );

        Self {
            cursor,
            client,
            server_stats,
            stats: StreamStats::new(),
        }
    }

    /// Wait for the next frame and encode it as a part
    pub async fn next_part(&mut self) -> Bytes {
        let frame = self.cursor.next().await;
        let part = encode_part(&frame);

        self.stats.on_frame(part.len());
        self.server_stats.frame_sent(part.len());
        part
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Writes the producer made while this client was still behind
    pub fn frames_skipped(&self) -> u64 {
        self.cursor.skipped()
    }

    /// Body yielding one part per frame, forever
    pub fn into_body(self) -> Body {
        let parts = futures::stream::unfold(self, |mut stream| async move {
            let part = stream.next_part().await;
            Some((Ok::<_, Infallible>(part), stream))
        });
        Body::from_stream(parts)
    }
}

impl IntoResponse for MjpegStream {
    fn into_response(self) -> Response {
        (
            [
                (header::AGE, "0"),
                (header::CACHE_CONTROL, "no-cache, private"),
                (header::PRAGMA, "no-cache"),
                (header::CONTENT_TYPE, STREAM_CONTENT_TYPE),
            ],
            self.into_body(),
        )
            .into_response()
    }
}

impl Drop for MjpegStream {
    fn drop(&mut self) {
        self.server_stats.stream_ended();

        tracing::debug!(
            session_id = self.client.session_id,
            peer = %self.client.peer_addr,
            frames_sent = self.stats.frames_sent,
            frames_skipped = self.frames_skipped(),
            framerate = self.stats.framerate(),
            "Stream closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use futures::StreamExt;
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;
    use crate::frame::FrameSlot;

    const PART_A: &[u8] = b"--FRAME\r\nContent-Type: image/jpeg\r\nContent-Length: 5\r\n\r\nAAAAA\r\n";
    const PART_B: &[u8] = b"--FRAME\r\nContent-Type: image/jpeg\r\nContent-Length: 3\r\n\r\nBBB\r\n";

    fn client(session_id: u64) -> ClientInfo {
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        ClientInfo::new(session_id, peer)
    }

    #[test]
    fn test_response_headers() {
        let slot = Arc::new(FrameSlot::new());
        let stream = MjpegStream::new(slot.subscribe(), client(1), Arc::new(ServerStats::new()));

        let response = stream.into_response();
        let headers = response.headers();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert_eq!(headers[header::AGE], "0");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache, private");
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(
            headers[header::CONTENT_TYPE],
            "multipart/x-mixed-replace; boundary=FRAME"
        );
        assert!(headers.get(header::CONTENT_LENGTH).is_none());
    }

    #[test]
    fn test_next_part_waits_for_new_frame() {
        let slot = Arc::new(FrameSlot::new());
        let stats = Arc::new(ServerStats::new());
        let mut stream = MjpegStream::new(slot.subscribe(), client(1), Arc::clone(&stats));

        {
            let mut part = task::spawn(stream.next_part());
            assert_pending!(part.poll());

            slot.write(&b"AAAAA"[..]);
            assert!(part.is_woken());
            assert_eq!(&assert_ready!(part.poll())[..], PART_A);
        }

        assert_eq!(stream.stats().frames_sent, 1);
        assert_eq!(stats.snapshot().frames_sent, 1);
        assert_eq!(stats.snapshot().bytes_sent, PART_A.len() as u64);
    }

    #[tokio::test]
    async fn test_body_current_then_next() {
        let slot = Arc::new(FrameSlot::new());
        slot.write(&b"AAAAA"[..]);

        let stream = MjpegStream::new(slot.subscribe(), client(1), Arc::new(ServerStats::new()));
        let mut body = stream.into_body().into_data_stream();

        assert_eq!(&body.next().await.unwrap().unwrap()[..], PART_A);

        slot.write(&b"BBB"[..]);
        assert_eq!(&body.next().await.unwrap().unwrap()[..], PART_B);
    }

    #[test]
    fn test_drop_ends_stream() {
        let slot = Arc::new(FrameSlot::new());
        let stats = Arc::new(ServerStats::new());
        let info = client(3);

        let a = MjpegStream::new(slot.subscribe(), info.clone(), Arc::clone(&stats));
        let b = MjpegStream::new(slot.subscribe(), client(4), Arc::clone(&stats));
        assert_eq!(stats.active_streams(), 2);
        assert!(info.is_streaming());

        drop(a);
        assert_eq!(stats.active_streams(), 1);

        // The other stream keeps receiving
        let mut b = b;
        slot.write(&b"BBB"[..]);
        let part = assert_ready!(task::spawn(b.next_part()).poll());
        assert_eq!(&part[..], PART_B);
    }

    #[test]
    fn test_skips_exclude_frames_before_connect() {
        let slot = Arc::new(FrameSlot::new());
        for i in 0u8..5 {
            slot.write(vec![i]);
        }

        let mut stream = MjpegStream::new(slot.subscribe(), client(1), Arc::new(ServerStats::new()));
        assert_ready!(task::spawn(stream.next_part()).poll());

        assert_eq!(stream.stats().frames_sent, 1);
        assert_eq!(stream.frames_skipped(), 0);
    }
}
