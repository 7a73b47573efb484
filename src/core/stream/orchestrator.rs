use futures_util::TryStreamExt;
use reqwest::StatusCode;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::StreamReader;
use tracing::{debug, trace, warn};

use crate::core::message::Message;

use super::aggregator::{DeltaAggregator, DeltaCallback};
use super::detector::{CompletionDetector, DetectorState};
use super::dialect::Dialect;
use super::error::{StreamError, StreamFailure};
use super::splitter::{Frame, FrameSplitter};

pub const DEFAULT_BUFFER_SIZE: usize = 1024;
const ERROR_BODY_LIMIT: u64 = 64 * 1024;

/// Exactly one of these is produced per stream.
pub type StreamOutcome = Result<Message, StreamFailure>;

/// Drives one response body to a finished message or a classified failure.
#[derive(Debug, Clone, Copy)]
pub struct StreamOrchestrator {
    dialect: Dialect,
    buffer_size: usize,
}

impl StreamOrchestrator {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Consumes a live reqwest response.
    pub async fn run_response(
        &self,
        response: reqwest::Response,
        callback: Option<DeltaCallback<'_>>,
    ) -> StreamOutcome {
        let status = response.status();
        let body = StreamReader::new(Box::pin(
            response.bytes_stream().map_err(std::io::Error::other),
        ));
        self.run(status, body, callback).await
    }

    /// Validates `status`, then decodes `body` frame by frame.
    ///
    /// The body is dropped as soon as the turn ends, without draining
    /// whatever the backend might still send.
    pub async fn run<R>(
        &self,
        status: StatusCode,
        mut body: R,
        callback: Option<DeltaCallback<'_>>,
    ) -> StreamOutcome
    where
        R: AsyncRead + Unpin,
    {
        if !status.is_success() {
            let body = read_error_body(&mut body).await;
            let failure = StreamFailure::new(StreamError::HttpStatus { status, body });
            warn!(kind = failure.kind(), %status, "stream rejected before body");
            return Err(failure);
        }

        let mut run = StreamRun::new(self.dialect, callback);
        match self.drive(&mut run, body).await {
            Ok(()) => Ok(run.complete()),
            Err(error) => Err(run.fail(error)),
        }
    }

    async fn drive<R>(&self, run: &mut StreamRun<'_>, mut body: R) -> Result<(), StreamError>
    where
        R: AsyncRead + Unpin,
    {
        let mut splitter = FrameSplitter::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let read = match body.read(&mut buffer).await {
                Ok(read) => read,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            if read == 0 {
                break;
            }

            for frame in splitter.push(&buffer[..read]) {
                if run.step(frame)? == DetectorState::Finished {
                    return Ok(());
                }
            }
        }

        if let Some(frame) = splitter.finish() {
            if run.step(frame)? == DetectorState::Finished {
                return Ok(());
            }
        }

        run.detector.end_of_input()
    }
}

/// Per-stream state; discarded once the outcome is produced.
struct StreamRun<'a> {
    dialect: Dialect,
    aggregator: DeltaAggregator<'a>,
    detector: CompletionDetector,
    last_frame: Option<Frame>,
}

impl<'a> StreamRun<'a> {
    fn new(dialect: Dialect, callback: Option<DeltaCallback<'a>>) -> Self {
        Self {
            dialect,
            aggregator: DeltaAggregator::new(callback),
            detector: CompletionDetector::new(dialect),
            last_frame: None,
        }
    }

    fn step(&mut self, frame: Frame) -> Result<DetectorState, StreamError> {
        trace!(dialect = self.dialect.as_str(), frame = %frame.display_text(), "stream frame");

        let decoded = self.dialect.decode(&frame);
        self.last_frame = Some(frame);
        let decoded = decoded?;

        if !decoded.tool_calls.is_empty() {
            self.aggregator.record_tool_calls(decoded.tool_calls);
        }
        if let Some(delta) = decoded.delta {
            self.aggregator
                .accept(delta)
                .map_err(|source| StreamError::Callback { source })?;
        }

        Ok(self.detector.observe(decoded.end))
    }

    fn complete(self) -> Message {
        debug!(
            dialect = self.dialect.as_str(),
            frames = self.detector.frames(),
            deltas = self.aggregator.accepted(),
            "stream complete"
        );
        self.aggregator.finalize()
    }

    fn fail(mut self, error: StreamError) -> StreamFailure {
        self.detector.fail();
        let last_frame = self.last_frame.as_ref().map(Frame::display_text);

        warn!(
            kind = error.kind(),
            dialect = self.dialect.as_str(),
            frames = self.detector.frames(),
            error = %error,
            "stream failed"
        );
        if let Some(frame) = last_frame.as_deref() {
            debug!(frame, "last frame before failure");
        }

        StreamFailure {
            error,
            partial_content: self.aggregator.into_partial(),
            last_frame,
        }
    }
}

async fn read_error_body<R>(body: &mut R) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    match body.take(ERROR_BODY_LIMIT).read_to_end(&mut bytes).await {
        Ok(_) if !bytes.is_empty() => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Ok(_) => None,
        Err(err) => {
            debug!(error = %err, "failed to read error body");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stream::DecodeError;
    use bytes::Bytes;
    use futures_util::stream;
    use proptest::prelude::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const NDJSON_HI_THERE: &str = concat!(
        "{\"message\":{\"content\":\"Hi\"},\"done\":false}\n",
        "{\"message\":{\"content\":\" there\"},\"done\":true}\n",
    );

    const SSE_HI_THERE: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" there\"},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );

    fn chunked(parts: Vec<io::Result<&'static str>>) -> impl AsyncRead + Unpin {
        StreamReader::new(stream::iter(
            parts
                .into_iter()
                .map(|part| part.map(|text| Bytes::from_static(text.as_bytes()))),
        ))
    }

    async fn run_text(dialect: Dialect, input: &str, buffer_size: usize) -> StreamOutcome {
        StreamOrchestrator::new(dialect)
            .with_buffer_size(buffer_size)
            .run(StatusCode::OK, input.as_bytes(), None)
            .await
    }

    #[tokio::test]
    async fn newline_delimited_scenario() {
        let message = run_text(Dialect::NewlineDelimited, NDJSON_HI_THERE, 1024)
            .await
            .unwrap();
        assert_eq!(message.content, "Hi there");
        assert!(message.role.is_assistant());
    }

    #[tokio::test]
    async fn event_stream_scenario() {
        let message = run_text(Dialect::EventStream, SSE_HI_THERE, 1024)
            .await
            .unwrap();
        assert_eq!(message.content, "Hi there");
    }

    #[tokio::test]
    async fn sentinel_alone_ends_event_stream() {
        let input = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"length\"}]}\n",
            "data: [DONE]\n",
        );
        let message = run_text(Dialect::EventStream, input, 1024).await.unwrap();
        assert_eq!(message.content, "partial");
    }

    #[tokio::test]
    async fn single_byte_reads_match_whole_reads() {
        for (dialect, input) in [
            (Dialect::NewlineDelimited, NDJSON_HI_THERE),
            (Dialect::EventStream, SSE_HI_THERE),
        ] {
            let message = run_text(dialect, input, 1).await.unwrap();
            assert_eq!(message.content, "Hi there");
        }
    }

    #[tokio::test]
    async fn unterminated_final_line_still_completes() {
        let input = "{\"message\":{\"content\":\"ok\"},\"done\":true}";
        let message = run_text(Dialect::NewlineDelimited, input, 8).await.unwrap();
        assert_eq!(message.content, "ok");
    }

    #[tokio::test]
    async fn eof_without_signal_is_truncated() {
        let input = "{\"message\":{\"content\":\"Hi\"},\"done\":false}\n";
        let failure = run_text(Dialect::NewlineDelimited, input, 1024)
            .await
            .unwrap_err();
        assert!(matches!(
            failure.error,
            StreamError::Truncated { frames: 1 }
        ));
        assert_eq!(failure.partial_content, "Hi");
    }

    #[tokio::test]
    async fn empty_body_is_truncated() {
        let failure = run_text(Dialect::EventStream, "", 1024).await.unwrap_err();
        assert!(matches!(
            failure.error,
            StreamError::Truncated { frames: 0 }
        ));
        assert!(failure.partial_content.is_empty());
    }

    #[tokio::test]
    async fn malformed_line_fails_fast() {
        let input = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n",
            "data: {not json}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"!\"},\"finish_reason\":\"stop\"}]}\n",
        );
        let failure = run_text(Dialect::EventStream, input, 1024)
            .await
            .unwrap_err();
        assert_eq!(failure.kind(), "decode");
        assert_eq!(failure.last_frame.as_deref(), Some("data: {not json}"));
        assert_eq!(failure.partial_content, "Hi");
    }

    #[tokio::test]
    async fn ndjson_error_frame_fails_with_backend_message() {
        let input = concat!(
            "{\"message\":{\"content\":\"Hi\"},\"done\":false}\n",
            "{\"error\":\"model runner crashed\"}\n",
            "{\"message\":{\"content\":\"!\"},\"done\":true}\n",
        );
        let failure = run_text(Dialect::NewlineDelimited, input, 1024)
            .await
            .unwrap_err();

        assert_eq!(failure.kind(), "decode");
        assert!(matches!(
            failure.error,
            StreamError::Decode {
                source: DecodeError::Backend(ref message)
            } if message == "model runner crashed"
        ));
        assert_eq!(failure.partial_content, "Hi");
        assert_eq!(
            failure.last_frame.as_deref(),
            Some("{\"error\":\"model runner crashed\"}")
        );
    }

    #[tokio::test]
    async fn ndjson_unrelated_object_is_a_decode_failure() {
        let input = "{\"unrelated\":1}\n{\"done\":true}\n";
        let failure = run_text(Dialect::NewlineDelimited, input, 1024)
            .await
            .unwrap_err();
        assert!(matches!(
            failure.error,
            StreamError::Decode {
                source: DecodeError::Unrecognized(_)
            }
        ));
    }

    #[tokio::test]
    async fn callback_error_on_third_delta_stops_the_stream() {
        let input = concat!(
            "{\"message\":{\"content\":\"a\"},\"done\":false}\n",
            "{\"message\":{\"content\":\"b\"},\"done\":false}\n",
            "{\"message\":{\"content\":\"c\"},\"done\":false}\n",
            "{\"message\":{\"content\":\"d\"},\"done\":true}\n",
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::new(AtomicUsize::new(0));
        let callback: DeltaCallback<'_> = {
            let calls = calls.clone();
            let delivered = delivered.clone();
            Box::new(move |_message| {
                if calls.fetch_add(1, Ordering::SeqCst) == 2 {
                    return Err("terminal went away".into());
                }
                delivered.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };

        let failure = StreamOrchestrator::new(Dialect::NewlineDelimited)
            .run(StatusCode::OK, input.as_bytes(), Some(callback))
            .await
            .unwrap_err();

        assert_eq!(failure.kind(), "callback");
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(failure.partial_content, "abc");
    }

    #[tokio::test]
    async fn callback_receives_fragments_in_order() {
        let mut seen = Vec::new();
        let callback: DeltaCallback<'_> = Box::new(|message| {
            seen.push(message.content);
            Ok(())
        });
        let message = StreamOrchestrator::new(Dialect::EventStream)
            .with_buffer_size(3)
            .run(StatusCode::OK, SSE_HI_THERE.as_bytes(), Some(callback))
            .await
            .unwrap();
        assert_eq!(message.content, "Hi there");
        assert_eq!(seen, vec!["Hi", " there"]);
    }

    #[tokio::test]
    async fn non_success_status_reports_body() {
        let mut called = false;
        let callback: DeltaCallback<'_> = Box::new(|_| {
            called = true;
            Ok(())
        });
        let failure = StreamOrchestrator::new(Dialect::NewlineDelimited)
            .run(
                StatusCode::NOT_FOUND,
                &b"{\"error\":\"model not found\"}"[..],
                Some(callback),
            )
            .await
            .unwrap_err();

        match failure.error {
            StreamError::HttpStatus { status, body } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body.as_deref(), Some("{\"error\":\"model not found\"}"));
            }
            other => panic!("expected http status error, got {other:?}"),
        }
        assert!(!called);
    }

    #[tokio::test]
    async fn read_error_mid_body_is_io_failure() {
        let body = chunked(vec![
            Ok("{\"message\":{\"content\":\"Hi\"},\"done\":false}\n"),
            Err(io::Error::new(io::ErrorKind::TimedOut, "deadline elapsed")),
        ]);
        let failure = StreamOrchestrator::new(Dialect::NewlineDelimited)
            .run(StatusCode::OK, body, None)
            .await
            .unwrap_err();
        assert_eq!(failure.kind(), "io");
        assert_eq!(failure.partial_content, "Hi");
    }

    #[tokio::test]
    async fn stops_reading_after_terminal_frame() {
        let body = chunked(vec![
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n"),
            Ok("data: [DONE]\n"),
            Err(io::Error::other("body polled after completion")),
        ]);
        let message = StreamOrchestrator::new(Dialect::EventStream)
            .run(StatusCode::OK, body, None)
            .await
            .unwrap();
        assert_eq!(message.content, "Hi");
    }

    #[tokio::test]
    async fn frames_after_done_flag_are_ignored() {
        let input = concat!(
            "{\"message\":{\"content\":\"done\"},\"done\":true}\n",
            "this is not json\n",
        );
        let message = run_text(Dialect::NewlineDelimited, input, 1024).await.unwrap();
        assert_eq!(message.content, "done");
    }

    #[tokio::test]
    async fn split_frames_across_chunks_decode_once() {
        let body = chunked(vec![
            Ok("{\"message\":{\"con"),
            Ok("tent\":\"Hi\"},\"done\":false}\n{\"message\":"),
            Ok("{\"content\":\" there\"},\"done\":true}\n"),
        ]);
        let message = StreamOrchestrator::new(Dialect::NewlineDelimited)
            .run(StatusCode::OK, body, None)
            .await
            .unwrap();
        assert_eq!(message.content, "Hi there");
    }

    fn ndjson_body(fragments: &[String]) -> String {
        let mut body = String::new();
        for (index, fragment) in fragments.iter().enumerate() {
            let line = serde_json::json!({
                "message": {"content": fragment},
                "done": index + 1 == fragments.len(),
            });
            body.push_str(&line.to_string());
            body.push('\n');
        }
        body
    }

    proptest! {
        #[test]
        fn ndjson_content_is_concatenation_for_any_buffer(
            fragments in proptest::collection::vec("[a-zA-Z0-9 é\\n\"]{0,10}", 1..6),
            buffer_size in 1usize..64,
        ) {
            let body = ndjson_body(&fragments);
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let message = runtime
                .block_on(run_text(Dialect::NewlineDelimited, &body, buffer_size))
                .unwrap();
            prop_assert_eq!(message.content, fragments.concat());
        }
    }
}
