//! Typed partial snapshots over a streaming structured completion.

use futures::stream::Stream;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

use crate::error::{OpenAIError, Result};
use crate::partial::PartialJson;
use crate::streaming::ChatCompletionStream;

/// One emission of a [`StructuredStream`].
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<P> {
    pub value: P,
    /// The stream ended and `value` is the complete, validated document.
    pub is_final: bool,
}

type Validator = fn(&str) -> Result<()>;

fn validate_as<S: DeserializeOwned>(text: &str) -> Result<()> {
    serde_json::from_str::<S>(text)
        .map(|_| ())
        .map_err(|e| OpenAIError::Schema(e.to_string()))
}

/// Stream of partial documents of type `P`.
///
/// Each item is a superset of the one before it. Snapshots that do not
/// deserialize into `P` are skipped. When the provider finishes, the full
/// text is validated against the strict output type and emitted once more
/// with `is_final` set.
pub struct StructuredStream<P> {
    chunks: ChatCompletionStream,
    parser: PartialJson,
    validate: Validator,
    finish_reason: Option<String>,
    refusal: String,
    done: bool,
    _marker: PhantomData<fn() -> P>,
}

impl<P: DeserializeOwned> StructuredStream<P> {
    pub(crate) fn new<S: DeserializeOwned>(chunks: ChatCompletionStream) -> Self {
        Self {
            chunks,
            parser: PartialJson::new(),
            validate: validate_as::<S>,
            finish_reason: None,
            refusal: String::new(),
            done: false,
            _marker: PhantomData,
        }
    }

    fn finish(&mut self) -> Result<Snapshot<P>> {
        if !self.refusal.is_empty() {
            return Err(OpenAIError::Incomplete(format!(
                "model refused: {}",
                self.refusal
            )));
        }
        match self.finish_reason.as_deref() {
            Some("length") => {
                return Err(OpenAIError::Incomplete(
                    "output truncated at max_completion_tokens".into(),
                ))
            }
            Some("content_filter") => {
                return Err(OpenAIError::Incomplete("output blocked by content filter".into()))
            }
            _ => {}
        }

        let text = self.parser.buffer();
        if text.trim().is_empty() {
            return Err(OpenAIError::Incomplete("stream ended without output".into()));
        }
        (self.validate)(text)?;
        let value = serde_json::from_str::<P>(text)
            .map_err(|e| OpenAIError::Parse(format!("Failed to deserialize response: {}", e)))?;

        debug!(bytes = text.len(), "Structured stream finished");
        Ok(Snapshot {
            value,
            is_final: true,
        })
    }
}

impl<P: DeserializeOwned> Stream for StructuredStream<P> {
    type Item = Result<Snapshot<P>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.done {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.chunks).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    if let Some(refusal) = chunk.refusal {
                        this.refusal.push_str(&refusal);
                    }
                    if chunk.finish_reason.is_some() {
                        this.finish_reason = chunk.finish_reason;
                    }
                    if chunk.delta.is_empty() {
                        continue;
                    }
                    if let Some(text) = this.parser.push(&chunk.delta) {
                        if let Ok(value) = serde_json::from_str::<P>(&text) {
                            return Poll::Ready(Some(Ok(Snapshot {
                                value,
                                is_final: false,
                            })));
                        }
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.done = true;
                    return Poll::Ready(Some(this.finish()));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
