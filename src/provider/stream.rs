//! Lazy fragment stream over a streaming chat completion

use super::response::{StreamChunk, Usage};
use super::sse::{SseDecoder, SseEvent};
use crate::error::{extract_error_message, ChatError, ProviderError};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Instant;

/// How much of a body without SSE events is kept for the error message
const UNRECOGNIZED_BODY_LIMIT: usize = 64 * 1024;

/// Text fragments of a streamed completion, in arrival order.
///
/// Finite and not restartable: it ends at `[DONE]`, at the end of the body,
/// or right after the first error it yields.
pub type FragmentStream = BoxStream<'static, Result<String, ChatError>>;

struct FragmentState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, ChatError>>,
    finished: bool,
    /// Any `data:` line, including `[DONE]`, was decoded
    saw_event: bool,
    /// Raw body bytes read before the first event
    unrecognized: Vec<u8>,
    fragments: usize,
    usage: Option<Usage>,
    model: String,
    started: Instant,
}

impl<S> FragmentState<S> {
    fn new(body: S, model: String, started: Instant) -> Self {
        Self {
            body: Box::pin(body),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
            saw_event: false,
            unrecognized: Vec::new(),
            fragments: 0,
            usage: None,
            model,
            started,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn handle(&mut self, events: Vec<SseEvent>) {
        for event in events {
            if self.finished {
                return;
            }
            self.saw_event = true;
            match event {
                SseEvent::Done => self.finished = true,
                SseEvent::Data(data) => self.handle_data(&data),
            }
        }
    }

    fn handle_data(&mut self, data: &str) {
        let chunk: StreamChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::error!(target: "llm", error = %e, data = data, "Malformed stream chunk");
                self.fail(ProviderError::Malformed(e).into());
                return;
            }
        };

        if let Some(message) = chunk.error_message() {
            tracing::error!(target: "llm", error = %message, "Provider reported an error mid-stream");
            self.fail(ProviderError::Api { message }.into());
            return;
        }

        if let Some(usage) = chunk.usage {
            self.usage = Some(usage);
        }

        for fragment in chunk.fragments() {
            self.fragments += 1;
            self.pending.push_back(Ok(fragment.to_string()));
        }
    }

    fn record_unrecognized(&mut self, bytes: &[u8]) {
        if self.saw_event {
            self.unrecognized = Vec::new();
            return;
        }
        let room = UNRECOGNIZED_BODY_LIMIT.saturating_sub(self.unrecognized.len());
        self.unrecognized.extend_from_slice(&bytes[..bytes.len().min(room)]);
    }

    /// The body ended without a single event: it was not an event stream
    fn fail_unrecognized(&mut self) {
        let body = String::from_utf8_lossy(&self.unrecognized).into_owned();
        let error = unrecognized_body_error(&body);
        tracing::error!(target: "llm", error = %error, "Streaming response carried no events");
        self.fail(error.into());
    }

    fn fail(&mut self, error: ChatError) {
        self.pending.push_back(Err(error));
        self.finished = true;
    }

    fn log_completion(&self) {
        tracing::info!(
            target: "llm",
            model = %self.model,
            elapsed_ms = self.elapsed_ms(),
            fragments = self.fragments,
            input_tokens = self.usage.map(|u| u.prompt_tokens),
            output_tokens = self.usage.map(|u| u.completion_tokens),
            "Streaming LLM call completed"
        );
    }
}

/// Decode an SSE body into text fragments.
///
/// Chunks with no choices (such as the trailing usage chunk) and deltas with
/// empty or absent content produce nothing.
///
/// `started` is when the request was sent, so the logged elapsed time
/// includes the wait for the first byte.
pub(crate) fn fragment_stream<S, B>(body: S, model: impl Into<String>, started: Instant) -> FragmentStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = FragmentState::new(body, model.into(), started);

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                state.log_completion();
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let events = state.decoder.feed(bytes.as_ref());
                    state.handle(events);
                    state.record_unrecognized(bytes.as_ref());
                }
                Some(Err(e)) => {
                    tracing::error!(target: "llm", error = %e, "Stream read error");
                    state.fail(ChatError::Transport(e));
                }
                None => {
                    let events = state.decoder.finish();
                    state.handle(events);
                    if !state.saw_event && !state.finished {
                        state.fail_unrecognized();
                    }
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}

/// Error for a successful response whose body had no SSE events, such as a
/// plain JSON error object or a provider that ignored `stream: true`
fn unrecognized_body_error(body: &str) -> ProviderError {
    let body = body.trim();
    if body.is_empty() {
        return ProviderError::Empty;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(_) => ProviderError::Api {
            message: format!("expected an event stream: {}", extract_error_message(body)),
        },
        Err(e) => ProviderError::Malformed(e),
    }
}

/// Drive a fragment stream to the end, handing each fragment to `on_fragment`.
/// Returns the concatenated text.
pub async fn forward_fragments<F>(mut stream: FragmentStream, mut on_fragment: F) -> Result<String, ChatError>
where
    F: FnMut(&str),
{
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        on_fragment(&fragment);
        text.push_str(&fragment);
    }
    Ok(text)
}

/// Collect a fragment stream into one string
pub async fn collect_text(stream: FragmentStream) -> Result<String, ChatError> {
    forward_fragments(stream, |_| {}).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunked(parts: &[&str]) -> FragmentStream {
        let items: Vec<Result<Vec<u8>, reqwest::Error>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        fragment_stream(stream::iter(items), "test-model", Instant::now())
    }

    fn delta(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"index": 0, "delta": {"content": content}}]})
        )
    }

    #[tokio::test]
    async fn test_fragments_in_arrival_order() {
        let body = [delta("你"), delta("好"), delta("！"), "data: [DONE]\n\n".to_string()];
        let parts: Vec<&str> = body.iter().map(|s| s.as_str()).collect();
        let fragments: Vec<String> = chunked(&parts)
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["你", "好", "！"]);
    }

    #[tokio::test]
    async fn test_empty_choices_and_content_are_skipped() {
        let body = [
            "data: {\"choices\": [{\"delta\": {\"role\": \"assistant\", \"content\": \"\"}}]}\n\n".to_string(),
            delta("Hello"),
            "data: {\"choices\": []}\n\n".to_string(),
            delta(" world"),
            "data: {\"choices\": [], \"usage\": {\"prompt_tokens\": 5, \"completion_tokens\": 2, \"total_tokens\": 7}}\n\n".to_string(),
            "data: [DONE]\n\n".to_string(),
        ];
        let parts: Vec<&str> = body.iter().map(|s| s.as_str()).collect();
        let fragments: Vec<String> = chunked(&parts).map(|f| f.unwrap()).collect().await;
        assert_eq!(fragments, vec!["Hello", " world"]);
    }

    #[tokio::test]
    async fn test_events_split_across_reads() {
        let body = format!("{}{}data: [DONE]\n\n", delta("Lang"), delta("Chain"));
        let bytes = body.as_bytes();
        let items: Vec<Result<Vec<u8>, reqwest::Error>> =
            bytes.chunks(5).map(|c| Ok(c.to_vec())).collect();
        let text = collect_text(fragment_stream(stream::iter(items), "m", Instant::now()))
            .await
            .unwrap();
        assert_eq!(text, "LangChain");
    }

    #[tokio::test]
    async fn test_nothing_after_done() {
        let body = [delta("a"), "data: [DONE]\n\n".to_string(), delta("b")];
        let parts: Vec<&str> = body.iter().map(|s| s.as_str()).collect();
        assert_eq!(collect_text(chunked(&parts)).await.unwrap(), "a");
    }

    #[tokio::test]
    async fn test_body_end_without_done_terminates() {
        let body = [delta("only")];
        let parts: Vec<&str> = body.iter().map(|s| s.as_str()).collect();
        assert_eq!(collect_text(chunked(&parts)).await.unwrap(), "only");
    }

    #[test]
    fn test_elapsed_counts_from_request_start() {
        let sent = Instant::now() - std::time::Duration::from_millis(1500);
        let state = FragmentState::new(stream::empty::<Result<Vec<u8>, reqwest::Error>>(), "m".to_string(), sent);
        assert!(state.elapsed_ms() >= 1500);
    }

    #[tokio::test]
    async fn test_json_body_without_events_is_provider_error() {
        let body = [r#"{"error":{"message":"quota exceeded","code":"QuotaExceeded"}}"#];
        let items: Vec<Result<String, ChatError>> = chunked(&body).collect().await;
        assert_eq!(items.len(), 1);
        match &items[0] {
            Err(ChatError::Provider(ProviderError::Api { message })) => {
                assert!(message.contains("quota exceeded (code: QuotaExceeded)"), "{message}")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_sse_body_is_malformed() {
        let err = collect_text(chunked(&["<html>bad gateway</html>"])).await.unwrap_err();
        assert!(matches!(err, ChatError::Provider(ProviderError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_empty_body_is_provider_error() {
        let err = collect_text(chunked(&[])).await.unwrap_err();
        assert!(matches!(err, ChatError::Provider(ProviderError::Empty)));
    }

    #[tokio::test]
    async fn test_done_alone_is_an_empty_reply() {
        assert_eq!(collect_text(chunked(&["data: [DONE]\n\n"])).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_malformed_chunk_yields_error_then_ends() {
        let body = [delta("ok"), "data: {not json\n\n".to_string(), delta("never")];
        let parts: Vec<&str> = body.iter().map(|s| s.as_str()).collect();
        let items: Vec<Result<String, ChatError>> = chunked(&parts).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "ok");
        assert!(matches!(
            items[1],
            Err(ChatError::Provider(ProviderError::Malformed(_)))
        ));
    }

    #[tokio::test]
    async fn test_in_band_error_event() {
        let body = ["data: {\"error\": {\"message\": \"rate limited\", \"code\": \"RateLimitExceeded\"}}\n\n"];
        let items: Vec<Result<String, ChatError>> = chunked(&body).collect().await;
        assert_eq!(items.len(), 1);
        match &items[0] {
            Err(ChatError::Provider(ProviderError::Api { message })) => {
                assert_eq!(message, "rate limited (code: RateLimitExceeded)")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forward_fragments_sees_each_piece() {
        let body = [delta("x"), delta("y")];
        let parts: Vec<&str> = body.iter().map(|s| s.as_str()).collect();
        let mut seen = Vec::new();
        let text = forward_fragments(chunked(&parts), |f| seen.push(f.to_string()))
            .await
            .unwrap();
        assert_eq!(text, "xy");
        assert_eq!(seen, vec!["x", "y"]);
    }
}
