//! OpenAI REST client for schema-constrained generation.
//!
//! A minimal client for schema-constrained generation with no domain logic.
//! Supports strict structured outputs (blocking and streamed as typed
//! partial snapshots) and file uploads used as reference material.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::{OpenAIClient, StructuredRequest};
//!
//! let client = OpenAIClient::new(api_key);
//! let file = client.upload_file("notes.pdf", bytes, "user_data").await?;
//!
//! let summary: Summary = client
//!     .extract(
//!         StructuredRequest::for_output::<Summary>("gpt-4.1")
//!             .system("Summarise the attached document")
//!             .file(file.id),
//!     )
//!     .await?;
//! ```
//!
//! # Streaming
//!
//! ```rust,ignore
//! // `Outline` is the strict schema, `PartialOutline` tolerates missing fields.
//! let mut stream = client
//!     .extract_stream::<Outline, PartialOutline>(StructuredRequest::for_output::<Outline>(model))
//!     .await?;
//! while let Some(snapshot) = stream.next().await {
//!     let snapshot = snapshot?;
//!     render(&snapshot.value);
//! }
//! ```

pub mod error;
pub mod partial;
pub mod schema;
pub mod streaming;
pub mod structured_stream;
pub mod types;

pub use error::{OpenAIError, Result};
pub use partial::PartialJson;
pub use schema::StructuredOutput;
pub use streaming::{ChatCompletionChunk, ChatCompletionStream};
pub use structured_stream::{Snapshot, StructuredStream};
pub use types::*;

use std::time::Instant;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI REST client. Cheap to clone.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a compatible endpoint (proxy, gateway, local mock).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http_client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
    }

    /// Send `request`, mapping transport failures and non-2xx statuses.
    async fn send(request: RequestBuilder, operation: &str) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, operation, "OpenAI request failed");
            OpenAIError::Network(e.to_string())
        })?;
        check_status(response).await
    }

    /// Structured output with JSON schema.
    ///
    /// Returns the raw JSON text of the first choice. Refusals and
    /// truncated completions are reported as [`OpenAIError::Incomplete`].
    pub async fn structured_output(&self, request: StructuredRequest) -> Result<String> {
        let started = Instant::now();
        let model = request.model.clone();

        let response =
            Self::send(self.post("/chat/completions").json(&request), "structured output").await?;
        let completion: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        let Some(choice) = completion.choices.into_iter().next() else {
            return Err(OpenAIError::Parse("completion has no choices".into()));
        };
        if let Some(refusal) = choice.message.refusal {
            return Err(OpenAIError::Incomplete(format!("model refused: {}", refusal)));
        }
        if choice.finish_reason.as_deref() == Some("length") {
            return Err(OpenAIError::Incomplete(
                "output truncated at max_completion_tokens".into(),
            ));
        }

        debug!(
            model = %model,
            elapsed_ms = started.elapsed().as_millis(),
            total_tokens = completion.usage.as_ref().map(|u| u.total_tokens),
            "Structured completion received"
        );

        choice
            .message
            .content
            .ok_or_else(|| OpenAIError::Parse("completion has no content".into()))
    }

    /// Structured output decoded into `T`.
    ///
    /// The request's schema should come from `T`
    /// (see [`StructuredRequest::for_output`]).
    pub async fn extract<T: StructuredOutput>(&self, request: StructuredRequest) -> Result<T> {
        debug!(output = T::type_name(), "Structured extraction");

        let text = self.structured_output(request).await?;
        serde_json::from_str(&text)
            .map_err(|e| OpenAIError::Schema(format!("output does not match {}: {}", T::type_name(), e)))
    }

    /// Streaming structured extraction.
    ///
    /// `S` is the strict type the final document is validated against and
    /// `P` a tolerant view used for intermediate snapshots.
    pub async fn extract_stream<S, P>(
        &self,
        mut request: StructuredRequest,
    ) -> Result<StructuredStream<P>>
    where
        S: DeserializeOwned,
        P: DeserializeOwned,
    {
        request.stream = true;

        let response =
            Self::send(self.post("/chat/completions").json(&request), "structured stream").await?;
        let chunks = ChatCompletionStream::new(response.bytes_stream());
        Ok(StructuredStream::new::<S>(chunks))
    }

    /// Upload a file through the Files API.
    pub async fn upload_file(
        &self,
        filename: impl Into<String>,
        contents: Vec<u8>,
        purpose: &str,
    ) -> Result<FileObject> {
        let filename = filename.into();
        let size = contents.len();
        let form = Form::new()
            .text("purpose", purpose.to_string())
            .part("file", Part::bytes(contents).file_name(filename.clone()));

        let response = Self::send(self.post("/files").multipart(form), "file upload").await?;
        let file: FileObject = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        debug!(file_id = %file.id, filename = %filename, bytes = size, "Uploaded file");
        Ok(file)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    warn!(status = %status, error = %message, "OpenAI API error");
    Err(OpenAIError::Api {
        status: status.as_u16(),
        message,
    })
}
