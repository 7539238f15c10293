//! OpenAI-backed [`BaseContentGenerator`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use openai_client::{OpenAIClient, StructuredRequest};
use tracing::{debug, info, warn};

use super::traits::{
    BaseContentGenerator, OutlineRequest, OutlineSnapshot, OutlineStream, TaskContentRequest,
};
use crate::domains::generation::models::{
    LearningMaterial, OutlineDraft, PartialOutline, Quiz, TaskContent, TaskType,
};
use crate::domains::generation::prompts;

/// Files API purpose for documents referenced from chat messages.
const REFERENCE_FILE_PURPOSE: &str = "user_data";

pub struct OpenAIContentGenerator {
    client: OpenAIClient,
    model: String,
    max_completion_tokens: u32,
}

impl OpenAIContentGenerator {
    pub fn new(client: OpenAIClient, model: impl Into<String>, max_completion_tokens: u32) -> Self {
        Self {
            client,
            model: model.into(),
            max_completion_tokens,
        }
    }

    fn task_request<T: openai_client::StructuredOutput>(
        &self,
        request: &TaskContentRequest,
    ) -> StructuredRequest {
        StructuredRequest::for_output::<T>(&self.model)
            .system(prompts::task_system_prompt(request.task.task_type))
            .file(&request.reference_material_id)
            .user(prompts::task_user_prompt(&request.concept, &request.task))
            .max_completion_tokens(self.max_completion_tokens)
    }
}

#[async_trait]
impl BaseContentGenerator for OpenAIContentGenerator {
    async fn upload_reference_material(&self, filename: &str, contents: Vec<u8>) -> Result<String> {
        let file = self
            .client
            .upload_file(filename, contents, REFERENCE_FILE_PURPOSE)
            .await
            .with_context(|| format!("Failed to upload reference material {}", filename))?;
        info!(file_id = %file.id, filename, "Uploaded reference material");
        Ok(file.id)
    }

    async fn stream_outline(&self, request: &OutlineRequest) -> Result<OutlineStream> {
        let structured = StructuredRequest::for_output::<OutlineDraft>(&self.model)
            .system(prompts::COURSE_STRUCTURE_PROMPT)
            .file(&request.reference_material_id)
            .user(prompts::course_structure_user_prompt(
                &request.course_description,
                &request.intended_audience,
                request.instructions.as_deref(),
            ))
            .max_completion_tokens(self.max_completion_tokens);

        let stream = self
            .client
            .extract_stream::<OutlineDraft, PartialOutline>(structured)
            .await
            .context("Failed to start course outline stream")?;

        debug!(model = %self.model, "Streaming course outline");

        Ok(stream
            .map(|item| {
                item.map(|snapshot| OutlineSnapshot {
                    outline: snapshot.value,
                    is_final: snapshot.is_final,
                })
                .map_err(anyhow::Error::from)
            })
            .boxed())
    }

    async fn generate_task_content(&self, request: &TaskContentRequest) -> Result<TaskContent> {
        let content = match request.task.task_type {
            TaskType::LearningMaterial => self
                .client
                .extract(self.task_request::<LearningMaterial>(request))
                .await
                .map(TaskContent::LearningMaterial),
            TaskType::Quiz => self
                .client
                .extract(self.task_request::<Quiz>(request))
                .await
                .map(TaskContent::Quiz),
        };
        // Not retried here; the job is marked failed by the worker
        let content = content.map_err(|e| {
            warn!(
                task_id = request.task.id,
                transient = e.is_transient(),
                error = %e,
                "Task content request failed"
            );
            anyhow::Error::from(e)
        })?;

        debug!(task_id = request.task.id, task_type = request.task.task_type.as_str(), "Generated task content");
        Ok(content)
    }
}
