//! OpenAI API request and response types.

use serde::{Deserialize, Serialize};

use crate::schema::StructuredOutput;

// =============================================================================
// Messages
// =============================================================================

/// Chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role: "system", "user", "assistant"
    pub role: String,

    /// Plain text or a list of typed content parts
    pub content: MessageContent,
}

/// Message content: either a bare string or typed parts (text, files).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A single typed content part.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    File { file: FileReference },
}

/// Reference to a file previously uploaded through the Files API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileReference {
    pub file_id: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a user message that only attaches an uploaded file.
    ///
    /// Kept separate from the text prompt so the file prefix stays
    /// cacheable across requests that share the same document.
    pub fn user_file(file_id: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![ContentPart::File {
                file: FileReference {
                    file_id: file_id.into(),
                },
            }]),
        }
    }
}

// =============================================================================
// Structured Output
// =============================================================================

/// Chat completion request constrained to a JSON schema.
#[derive(Debug, Clone, Serialize)]
pub struct StructuredRequest {
    pub model: String,

    pub messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,

    pub response_format: ResponseFormat,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

impl StructuredRequest {
    /// Create a request for `model` whose output must match `schema`.
    pub fn new(
        model: impl Into<String>,
        schema_name: impl Into<String>,
        schema: serde_json::Value,
    ) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            max_completion_tokens: None,
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: schema_name.into(),
                    strict: true,
                    schema,
                },
            },
            stream: false,
        }
    }

    /// Create a request whose schema is derived from `T`.
    pub fn for_output<T: StructuredOutput>(model: impl Into<String>) -> Self {
        Self::new(model, T::type_name(), T::openai_schema())
    }

    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    pub fn file(mut self, file_id: impl Into<String>) -> Self {
        self.messages.push(Message::user_file(file_id));
        self
    }

    pub fn max_completion_tokens(mut self, tokens: u32) -> Self {
        self.max_completion_tokens = Some(tokens);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    pub json_schema: JsonSchemaFormat,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    pub strict: bool,
    pub schema: serde_json::Value,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseRaw {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatMessageResponse,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessageResponse {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub refusal: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A file stored through the Files API.
#[derive(Debug, Clone, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_message_serializes_as_typed_part() {
        let message = Message::user_file("file-abc");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "role": "user",
                "content": [{"type": "file", "file": {"file_id": "file-abc"}}]
            })
        );
    }

    #[test]
    fn structured_request_omits_stream_flag_unless_set() {
        let request = StructuredRequest::new("gpt-4.1", "outline", json!({"type": "object"}))
            .system("sys")
            .file("file-1")
            .user("hello")
            .max_completion_tokens(100);

        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("stream").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);
        assert_eq!(body["response_format"]["json_schema"]["name"], "outline");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(body["max_completion_tokens"], 100);
    }
}
