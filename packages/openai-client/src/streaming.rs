//! SSE parser for streaming chat completions.
//!
//! Turns the raw `reqwest` byte stream into [`ChatCompletionChunk`]s.
//! Lines may be split across network frames, so bytes are buffered until a
//! full line is available. A multi-byte character split across frames is
//! held back until its remaining bytes arrive.

use bytes::Bytes;
use futures::stream::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::OpenAIError;

/// One parsed `data:` line of a streaming completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatCompletionChunk {
    /// Text appended to the assistant message by this chunk.
    pub delta: String,
    /// Set on the last content chunk (`stop`, `length`, `content_filter`).
    pub finish_reason: Option<String>,
    /// Refusal text, if the model declined to answer.
    pub refusal: Option<String>,
    /// `data: [DONE]` sentinel.
    pub done: bool,
}

#[derive(Debug, serde::Deserialize)]
struct StreamChunkRaw {
    #[serde(default)]
    choices: Vec<StreamChoiceRaw>,
}

#[derive(Debug, serde::Deserialize)]
struct StreamChoiceRaw {
    #[serde(default)]
    delta: Option<DeltaRaw>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct DeltaRaw {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Stream adapter from SSE bytes to completion chunks.
pub struct ChatCompletionStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    pending: Vec<u8>,
    finished: bool,
}

impl ChatCompletionStream {
    pub(crate) fn new(
        byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            pending: Vec::new(),
            finished: false,
        }
    }

    /// Next complete line from the buffer, without its terminator.
    fn take_line(&mut self) -> Option<Result<String, OpenAIError>> {
        let newline = self.pending.iter().position(|b| *b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=newline).collect();
        Some(
            String::from_utf8(raw)
                .map(|line| line.trim().to_string())
                .map_err(|e| OpenAIError::Parse(format!("Invalid UTF-8 in stream: {}", e))),
        )
    }
}

impl Stream for ChatCompletionStream {
    type Item = Result<ChatCompletionChunk, OpenAIError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            while let Some(line) = this.take_line() {
                match line {
                    Ok(line) => {
                        if let Some(parsed) = parse_line(&line) {
                            return Poll::Ready(Some(parsed));
                        }
                    }
                    Err(e) => return Poll::Ready(Some(Err(e))),
                }
            }

            if this.finished {
                // A final line without a trailing newline.
                if this.pending.is_empty() {
                    return Poll::Ready(None);
                }
                this.pending.push(b'\n');
                continue;
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.pending.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(OpenAIError::Network(e.to_string()))));
                }
                Poll::Ready(None) => this.finished = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Parse one SSE line. Returns `None` for lines that carry no chunk
/// (blank separators, comments, `event:`/`id:` fields).
fn parse_line(line: &str) -> Option<Result<ChatCompletionChunk, OpenAIError>> {
    let data = line.strip_prefix("data:")?.trim();

    if data == "[DONE]" {
        return Some(Ok(ChatCompletionChunk {
            done: true,
            ..Default::default()
        }));
    }

    let raw = match serde_json::from_str::<StreamChunkRaw>(data) {
        Ok(raw) => raw,
        Err(e) => {
            let preview: String = data.chars().take(200).collect();
            return Some(Err(OpenAIError::Parse(format!(
                "Failed to parse stream chunk: {} (data: {})",
                e, preview
            ))));
        }
    };

    let mut chunk = ChatCompletionChunk::default();
    if let Some(choice) = raw.choices.into_iter().next() {
        chunk.finish_reason = choice.finish_reason;
        if let Some(delta) = choice.delta {
            chunk.delta = delta.content.unwrap_or_default();
            chunk.refusal = delta.refusal;
        }
    }
    Some(Ok(chunk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn frames(parts: &[&[u8]]) -> ChatCompletionStream {
        let items: Vec<Result<Bytes, reqwest::Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p)))
            .collect();
        ChatCompletionStream::new(futures::stream::iter(items))
    }

    #[tokio::test]
    async fn parses_deltas_and_done() {
        let mut stream = frames(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"{\\\"a\\\"\"}}]}\n\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\":1}\"},\"finish_reason\":\"stop\"}]}\n\n",
            b"data: [DONE]\n\n",
        ]);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.delta, "{\"a\"");
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.delta, ":1}");
        assert_eq!(second.finish_reason.as_deref(), Some("stop"));
        assert!(stream.next().await.unwrap().unwrap().done);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn lines_split_across_frames_are_reassembled() {
        let mut stream = frames(&[
            b"data: {\"choices\":[{\"del",
            b"ta\":{\"content\":\"hi\"}}]}\n",
            b"\ndata: [DONE]",
        ]);

        assert_eq!(stream.next().await.unwrap().unwrap().delta, "hi");
        assert!(stream.next().await.unwrap().unwrap().done);
    }

    #[tokio::test]
    async fn multibyte_characters_split_across_frames() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"caf\u{e9}\"}}]}\n";
        let bytes = line.as_bytes();
        let split = line.find('\u{e9}').unwrap() + 1;
        let mut stream = frames(&[&bytes[..split], &bytes[split..]]);

        assert_eq!(stream.next().await.unwrap().unwrap().delta, "caf\u{e9}");
    }

    #[tokio::test]
    async fn refusals_are_surfaced() {
        let mut stream = frames(&[b"data: {\"choices\":[{\"delta\":{\"refusal\":\"no\"}}]}\n"]);
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.refusal.as_deref(), Some("no"));
        assert_eq!(chunk.delta, "");
    }
}
