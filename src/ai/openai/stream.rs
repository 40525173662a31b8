//! Incremental decoding of streamed chat-completion bodies.
//!
//! The upstream body is an unbounded byte stream framed as `data: <json>`
//! lines. Bytes are decoded to text across chunk boundaries, split into
//! complete lines, and each `data:` payload carrying a non-empty
//! `choices[0].delta.content` becomes one envelope. A line is only handled
//! once its terminating newline has arrived; whatever follows the last
//! newline when the body ends is dropped.

use super::types::{decode_lenient, ChatCompletionChunk};
use crate::ai::genai::GenerateContentResponse;
use crate::ai::ResponseStream;
use crate::{Error, Result};
use async_stream::try_stream;
use futures_util::{Stream, StreamExt};

pub const DATA_PREFIX: &str = "data:";
pub const DONE_SENTINEL: &str = "[DONE]";

/// What to do with a `data:` payload that is not valid JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedEventPolicy {
    /// Fail the stream at the bad event. Envelopes already yielded stay valid.
    #[default]
    Abort,
    /// Log the bad event and keep reading.
    Skip,
}

/// UTF-8 decoder that carries incomplete multi-byte sequences over to the
/// next chunk. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        while !rest.is_empty() {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Truncated sequence at the end of the chunk.
                            self.pending = after.to_vec();
                            rest = &[];
                        }
                    }
                }
            }
        }
        out
    }
}

/// Decode buffer holding the unterminated tail between network reads.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: String,
}

impl SseLineBuffer {
    /// Appends `text` and drains every newline-terminated line.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        let tail = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);
        complete.split_terminator('\n').map(str::to_string).collect()
    }

    /// The fragment after the last newline seen so far.
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

/// Returns the trimmed payload of a `data:` line, or `None` for other lines
/// and for the `[DONE]` sentinel.
pub fn parse_data_line(line: &str) -> Option<&str> {
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    (payload != DONE_SENTINEL).then_some(payload)
}

/// Extracts `choices[0].delta.content` from one event payload.
///
/// Only a JSON syntax error is an error; any other shape means "no text".
pub fn delta_text(payload: &str) -> Result<Option<String>> {
    let value: serde_json::Value = serde_json::from_str(payload)?;
    Ok(decode_lenient::<ChatCompletionChunk>(value).first_delta())
}

/// Turns a streamed response body into a lazy sequence of envelopes.
///
/// The returned stream owns `body`; dropping it at any point drops the reader.
pub fn decode_event_stream<S, B, E>(body: S, policy: MalformedEventPolicy) -> ResponseStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    Box::pin(envelopes(body, policy))
}

fn envelopes<S, B, E>(
    body: S,
    policy: MalformedEventPolicy,
) -> impl Stream<Item = Result<GenerateContentResponse>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    try_stream! {
        let mut body = Box::pin(body);
        let mut decoder = Utf8ChunkDecoder::default();
        let mut lines = SseLineBuffer::default();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(Into::<Error>::into)?;
            let text = decoder.decode(chunk.as_ref());

            for line in lines.push(&text) {
                let Some(payload) = parse_data_line(&line) else {
                    continue;
                };

                match delta_text(payload) {
                    Ok(Some(delta)) => {
                        tracing::trace!("Stream delta: {} bytes", delta.len());
                        yield GenerateContentResponse::from_text(delta);
                    }
                    Ok(None) => {}
                    Err(e) => match policy {
                        MalformedEventPolicy::Abort => {
                            tracing::error!("Malformed stream event: {}\nPayload: {}", e, payload);
                            Err::<(), Error>(e)?;
                        }
                        MalformedEventPolicy::Skip => {
                            tracing::warn!("Skipping malformed stream event: {}", e);
                        }
                    },
                }
            }
        }

        if !lines.pending().is_empty() {
            tracing::debug!(
                "Discarding unterminated trailing fragment ({} bytes)",
                lines.pending().len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use pretty_assertions::assert_eq;

    const HEL: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n";
    const LO: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n";
    const DONE: &str = "data: [DONE]\n";

    fn byte_chunks(chunks: Vec<Vec<u8>>) -> impl Stream<Item = std::io::Result<Vec<u8>>> {
        stream::iter(chunks.into_iter().map(Ok))
    }

    async fn collect_texts(
        chunks: Vec<Vec<u8>>,
        policy: MalformedEventPolicy,
    ) -> Result<Vec<String>> {
        let mut stream = decode_event_stream(byte_chunks(chunks), policy);
        let mut texts = Vec::new();
        while let Some(item) = stream.next().await {
            texts.push(item?.text().unwrap_or_default());
        }
        Ok(texts)
    }

    async fn texts_of(body: &str) -> Vec<String> {
        collect_texts(vec![body.as_bytes().to_vec()], MalformedEventPolicy::Abort)
            .await
            .unwrap()
    }

    #[test]
    fn test_line_buffer_keeps_partial_tail() {
        let mut buffer = SseLineBuffer::default();
        assert!(buffer.push("data: a").is_empty());
        assert_eq!(buffer.pending(), "data: a");

        assert_eq!(buffer.push("bc\ndata: d\n\nda"), vec!["data: abc", "data: d", ""]);
        assert_eq!(buffer.pending(), "da");
    }

    #[test]
    fn test_utf8_decoder_joins_split_sequences() {
        let bytes = "héllo 🙂".as_bytes();
        let mut decoder = Utf8ChunkDecoder::default();
        let decoded: String = bytes.iter().map(|b| decoder.decode(&[*b])).collect();
        assert_eq!(decoded, "héllo 🙂");
    }

    #[test]
    fn test_utf8_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_parse_data_line() {
        assert_eq!(parse_data_line("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(parse_data_line("data:{\"a\":1}\r"), Some("{\"a\":1}"));
        assert_eq!(parse_data_line("data: [DONE]"), None);
        assert_eq!(parse_data_line("event: message"), None);
        assert_eq!(parse_data_line(": keep-alive"), None);
        assert_eq!(parse_data_line(" data: indented"), None);
    }

    #[test]
    fn test_delta_text_rejects_invalid_json() {
        assert!(matches!(delta_text("{not json"), Err(Error::Serialization(_))));
        assert_eq!(delta_text("{}").unwrap(), None);
        assert_eq!(delta_text("42").unwrap(), None);
    }

    #[tokio::test]
    async fn test_two_deltas_then_done() {
        let body = format!("{HEL}{LO}{DONE}");
        assert_eq!(texts_of(&body).await, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_done_alone_yields_nothing() {
        assert!(texts_of(DONE).await.is_empty());
    }

    #[tokio::test]
    async fn test_unterminated_trailing_line_is_discarded() {
        let body = HEL.trim_end_matches('\n');
        assert!(texts_of(body).await.is_empty());

        let body = format!("{LO}{}", HEL.trim_end_matches('\n'));
        assert_eq!(texts_of(&body).await, vec!["lo"]);
    }

    #[tokio::test]
    async fn test_output_is_independent_of_chunking() {
        let body = format!("{HEL}{LO}{DONE}");
        let whole = collect_texts(vec![body.as_bytes().to_vec()], MalformedEventPolicy::Abort)
            .await
            .unwrap();

        let per_byte: Vec<Vec<u8>> = body.bytes().map(|b| vec![b]).collect();
        let fragmented = collect_texts(per_byte, MalformedEventPolicy::Abort)
            .await
            .unwrap();

        for size in [2, 3, 7, 16] {
            let sized: Vec<Vec<u8>> = body.as_bytes().chunks(size).map(<[u8]>::to_vec).collect();
            let texts = collect_texts(sized, MalformedEventPolicy::Abort)
                .await
                .unwrap();
            assert_eq!(texts, whole);
        }

        assert_eq!(fragmented, whole);
        assert_eq!(whole, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_multibyte_delta_split_across_chunks() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"日本🙂\"}}]}\n";
        let per_byte: Vec<Vec<u8>> = body.bytes().map(|b| vec![b]).collect();
        let texts = collect_texts(per_byte, MalformedEventPolicy::Abort)
            .await
            .unwrap();
        assert_eq!(texts, vec!["日本🙂"]);
    }

    #[tokio::test]
    async fn test_ignores_non_data_lines_and_empty_deltas() {
        let body = concat!(
            ": comment\n",
            "event: message\n",
            "\n",
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n",
            "data: {\"choices\":[]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"},\"finish_reason\":null}]}\r\n",
            "data: [DONE]\r\n",
        );
        assert_eq!(texts_of(body).await, vec!["ok"]);
    }

    #[tokio::test]
    async fn test_each_envelope_is_self_contained() {
        let body = format!("{HEL}{LO}");
        let mut stream = decode_event_stream(
            byte_chunks(vec![body.into_bytes()]),
            MalformedEventPolicy::Abort,
        );

        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(first, GenerateContentResponse::from_text("Hel"));
        assert_eq!(second, GenerateContentResponse::from_text("lo"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_event_aborts_after_earlier_envelopes() {
        let body = format!("{HEL}data: {{broken\n{LO}");
        let mut stream = decode_event_stream(
            byte_chunks(vec![body.into_bytes()]),
            MalformedEventPolicy::Abort,
        );

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.text().as_deref(), Some("Hel"));
        assert!(matches!(
            stream.next().await,
            Some(Err(Error::Serialization(_)))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_event_skipped_when_configured() {
        let body = format!("{HEL}data: {{broken\n{LO}{DONE}");
        let texts = collect_texts(vec![body.into_bytes()], MalformedEventPolicy::Skip)
            .await
            .unwrap();
        assert_eq!(texts, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_body_error_ends_stream_with_error() {
        let chunks: Vec<std::io::Result<Vec<u8>>> = vec![
            Ok(HEL.as_bytes().to_vec()),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            )),
            Ok(LO.as_bytes().to_vec()),
        ];
        let mut stream = decode_event_stream(stream::iter(chunks), MalformedEventPolicy::Abort);

        assert_eq!(
            stream.next().await.unwrap().unwrap().text().as_deref(),
            Some("Hel")
        );
        assert!(matches!(stream.next().await, Some(Err(Error::Io(_)))));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_body_yields_nothing() {
        let texts = collect_texts(Vec::new(), MalformedEventPolicy::Abort)
            .await
            .unwrap();
        assert!(texts.is_empty());
    }

    #[tokio::test]
    async fn test_delta_survives_unexpected_sibling_fields() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"hi\"},\"finish_reason\":1}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"hi\"},\"finish_reason\":{}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"role\":false,\"content\":\"hi\"}}]}\n",
        );
        assert_eq!(texts_of(body).await, vec!["hi", "hi", "hi"]);
    }
}
