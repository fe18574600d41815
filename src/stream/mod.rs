//! Event-stream client for the generation endpoint
//!
//! The backend streams progress over a chunked response body using the
//! SSE text framing: each frame is one `data: <json>` line terminated
//! by a blank line. Chunk boundaries fall anywhere - mid-frame, mid-JSON,
//! even mid-UTF-8-sequence - so [`SseParser`] buffers bytes and only
//! emits complete, decoded frames.
//!
//! Ordering contract: zero or more `progress` events, then exactly one
//! `complete` or `error`, which terminates the stream. Anything arriving
//! after a terminal event is dropped. A body that ends without a
//! terminal event surfaces as [`StreamError::Incomplete`] rather than
//! silent success.

use futures::{pin_mut, Stream, StreamExt};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

const FRAME_SEPARATOR: &str = "\n\n";
const DATA_MARKER: &str = "data:";

/// One discrete unit of the generation stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Progress {
        step: u32,
        total: u32,
        message: String,
    },
    Complete {
        data: serde_json::Value,
        #[serde(default)]
        generation_time: Option<u64>,
    },
    Error {
        #[serde(default)]
        message: Option<String>,
    },
}

impl StreamEvent {
    /// `complete` and `error` end the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("stream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("stream ended without a terminal event")]
    Incomplete,

    #[error("stream cancelled")]
    Cancelled,
}

/// Incremental frame reassembler.
///
/// Feed it raw body chunks; it returns every frame completed by that
/// chunk, in wire order. The trailing partial frame (and any trailing
/// partial UTF-8 sequence) stays buffered for the next chunk.
#[derive(Debug, Default)]
pub struct SseParser {
    pending_bytes: Vec<u8>,
    buffer: String,
    terminated: bool,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a terminal event has been emitted.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Feed raw bytes. Invalid UTF-8 sequences are replaced with U+FFFD
    /// and decoding continues (the affected frame fails JSON parsing and
    /// is skipped like any other malformed payload); only an incomplete
    /// multi-byte tail is held back for the next chunk.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.pending_bytes.extend_from_slice(chunk);

        loop {
            match std::str::from_utf8(&self.pending_bytes) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending_bytes.clear();
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending_bytes[..valid_up_to]));
                    match e.error_len() {
                        // Invalid sequence: replace it and keep decoding.
                        Some(len) => {
                            tracing::warn!(len, "replacing invalid utf-8 in stream body");
                            self.buffer.push('\u{FFFD}');
                            self.pending_bytes.drain(..valid_up_to + len);
                        }
                        // Incomplete tail: wait for the next chunk.
                        None => {
                            self.pending_bytes.drain(..valid_up_to);
                            break;
                        }
                    }
                }
            }
        }

        self.drain_frames()
    }

    /// Feed already-decoded text (used by tests and non-chunked paths).
    pub fn push(&mut self, chunk: &str) -> Vec<StreamEvent> {
        self.buffer.push_str(chunk);
        self.drain_frames()
    }

    fn drain_frames(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        while let Some(idx) = self.buffer.find(FRAME_SEPARATOR) {
            let frame: String = self.buffer.drain(..idx + FRAME_SEPARATOR.len()).collect();
            let frame = frame.trim_end();

            if frame.trim().is_empty() {
                continue;
            }

            let Some(event) = parse_frame(frame) else {
                continue;
            };

            if self.terminated {
                tracing::warn!("dropping event received after terminal event");
                continue;
            }
            if event.is_terminal() {
                self.terminated = true;
            }
            events.push(event);
        }

        events
    }
}

/// Extract and parse the `data:` payload of one frame.
///
/// Frames without the marker (keep-alive comments some transports
/// inject) and payloads that fail to parse are skipped, not fatal.
fn parse_frame(frame: &str) -> Option<StreamEvent> {
    let payload = frame
        .lines()
        .find_map(|line| line.strip_prefix(DATA_MARKER))
        .map(str::trim_start);

    let Some(payload) = payload else {
        tracing::debug!(frame, "skipping frame without data marker");
        return None;
    };

    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, payload, "skipping unparseable stream payload");
            None
        }
    }
}

/// Turn a streamed response body into an ordered stream of events.
///
/// The stream yields each parsed event, then ends after the terminal
/// event. Cancelling the token aborts between chunk reads and yields
/// [`StreamError::Cancelled`] as the final item.
pub fn events(
    response: reqwest::Response,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<StreamEvent, StreamError>> {
    from_chunks(response.bytes_stream(), cancel)
}

/// Generator behind [`events`], over any chunked byte source.
fn from_chunks<B>(
    body: impl Stream<Item = Result<B, reqwest::Error>>,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<StreamEvent, StreamError>>
where
    B: AsRef<[u8]>,
{
    async_stream::stream! {
        let mut parser = SseParser::new();
        pin_mut!(body);

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("stream cancelled by caller");
                    yield Err(StreamError::Cancelled);
                    return;
                }
                chunk = body.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    for event in parser.push_bytes(bytes.as_ref()) {
                        yield Ok(event);
                    }
                    if parser.is_terminated() {
                        return;
                    }
                }
                Some(Err(e)) => {
                    yield Err(StreamError::Transport(e));
                    return;
                }
                None => {
                    if !parser.is_terminated() {
                        yield Err(StreamError::Incomplete);
                    }
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress_frame(step: u32, total: u32, message: &str) -> String {
        format!(
            "data: {{\"type\":\"progress\",\"step\":{},\"total\":{},\"message\":\"{}\"}}\n\n",
            step, total, message
        )
    }

    #[test]
    fn test_single_frame() {
        let mut parser = SseParser::new();
        let events = parser.push(&progress_frame(0, 8, "분석 중"));
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Progress { step, total, message } => {
                assert_eq!(*step, 0);
                assert_eq!(*total, 8);
                assert_eq!(message, "분석 중");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_reassembly_across_arbitrary_chunking() {
        let wire = format!(
            "{}{}data: {{\"type\":\"complete\",\"data\":{{\"copy\":{{\"text\":\"t\",\"tone\":\"casual\"}}}}}}\n\n",
            progress_frame(0, 3, "step one"),
            progress_frame(1, 3, "step two"),
        );
        let bytes = wire.as_bytes();

        // Every split position, including mid-JSON.
        for split in 1..bytes.len() {
            let mut parser = SseParser::new();
            let mut events = parser.push_bytes(&bytes[..split]);
            events.extend(parser.push_bytes(&bytes[split..]));

            assert_eq!(events.len(), 3, "split at {}", split);
            assert!(matches!(events[0], StreamEvent::Progress { step: 0, .. }));
            assert!(matches!(events[1], StreamEvent::Progress { step: 1, .. }));
            assert!(events[2].is_terminal());
        }
    }

    #[test]
    fn test_split_inside_multibyte_character() {
        let wire = progress_frame(2, 8, "카피를 작성하고 있습니다");
        let bytes = wire.as_bytes();
        // The Korean message guarantees many split positions land inside
        // a multi-byte sequence.
        for split in 1..bytes.len() {
            let mut parser = SseParser::new();
            let mut events = parser.push_bytes(&bytes[..split]);
            events.extend(parser.push_bytes(&bytes[split..]));
            assert_eq!(events.len(), 1, "split at {}", split);
        }
    }

    #[test]
    fn test_keepalive_and_garbage_frames_skipped() {
        let mut parser = SseParser::new();
        let mut events = parser.push(": keep-alive\n\n");
        events.extend(parser.push("event: ping\n\n"));
        events.extend(parser.push("data: {not json}\n\n"));
        assert!(events.is_empty());

        // Parser still works after skipping garbage.
        let events = parser.push(&progress_frame(1, 2, "ok"));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_nothing_delivered_after_terminal() {
        let mut parser = SseParser::new();
        let mut events = parser.push("data: {\"type\":\"error\",\"message\":\"boom\"}\n\n");
        events.extend(parser.push(&progress_frame(5, 8, "late")));

        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
        assert!(parser.is_terminated());
    }

    #[test]
    fn test_exactly_one_terminal() {
        let mut parser = SseParser::new();
        let wire =
            "data: {\"type\":\"complete\",\"data\":null}\n\ndata: {\"type\":\"error\",\"message\":\"x\"}\n\n";
        let events = parser.push(wire);
        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1);
    }

    #[test]
    fn test_invalid_byte_does_not_jam_the_parser() {
        let mut parser = SseParser::new();
        // A byte that can never start a valid sequence, then a good frame.
        let mut events = parser.push_bytes(&[0xFF]);
        events.extend(parser.push_bytes(progress_frame(0, 3, "ok").as_bytes()));
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::Progress { step: 0, .. }));
    }

    #[test]
    fn test_invalid_byte_inside_payload_skips_only_that_frame() {
        let mut parser = SseParser::new();
        let mut wire = b"data: {\"type\":\"progress\",\"step\":0,\"total\":3,\"mess".to_vec();
        wire.push(0xC0);
        wire.extend_from_slice(b"age\":\"x\"}\n\n");

        let mut events = parser.push_bytes(&wire);
        events.extend(parser.push_bytes(progress_frame(1, 3, "next").as_bytes()));
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::Progress { step: 1, .. }));
    }

    #[test]
    fn test_progress_only_body_is_not_terminated() {
        // The stream wrapper turns body-end-without-terminal into
        // StreamError::Incomplete off this flag.
        let mut parser = SseParser::new();
        parser.push(&progress_frame(0, 3, "a"));
        parser.push(&progress_frame(1, 3, "b"));
        assert!(!parser.is_terminated());
    }

    #[test]
    fn test_trailing_fragment_retained() {
        let mut parser = SseParser::new();
        let events = parser.push("data: {\"type\":\"progress\",\"step\":0,");
        assert!(events.is_empty());
        let events = parser.push("\"total\":3,\"message\":\"m\"}\n\n");
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_body_end_without_terminal_yields_incomplete() {
        let chunks: Vec<Result<Vec<u8>, reqwest::Error>> = vec![
            Ok(progress_frame(0, 3, "a").into_bytes()),
            Ok(progress_frame(1, 3, "b").into_bytes()),
        ];
        let events: Vec<_> = from_chunks(futures::stream::iter(chunks), CancellationToken::new())
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], Ok(StreamEvent::Progress { step: 0, .. })));
        assert!(matches!(events[1], Ok(StreamEvent::Progress { step: 1, .. })));
        assert!(matches!(events[2], Err(StreamError::Incomplete)));
    }

    #[tokio::test]
    async fn test_stream_ends_after_terminal_event() {
        let chunks: Vec<Result<Vec<u8>, reqwest::Error>> = vec![
            Ok(progress_frame(0, 2, "a").into_bytes()),
            Ok(b"data: {\"type\":\"complete\",\"data\":null}\n\n".to_vec()),
            Ok(progress_frame(1, 2, "late").into_bytes()),
        ];
        let events: Vec<_> = from_chunks(futures::stream::iter(chunks), CancellationToken::new())
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Ok(ref event) if event.is_terminal()));
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_stream() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        // The body never produces, so only cancellation can end this.
        let body = futures::stream::pending::<Result<Vec<u8>, reqwest::Error>>();
        let events: Vec<_> = from_chunks(body, cancel).collect().await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(StreamError::Cancelled)));
    }

    #[test]
    fn test_error_event_carries_message() {
        let mut parser = SseParser::new();
        let events = parser.push("data: {\"type\":\"error\",\"message\":\"생성 실패\"}\n\n");
        match &events[0] {
            StreamEvent::Error { message } => {
                assert_eq!(message.as_deref(), Some("생성 실패"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
