//! Generated task content.
//!
//! These types double as the provider schema, so their doc comments are
//! the field descriptions the model sees.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::outline::TaskType;

// =============================================================================
// Blocks
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum BlockType {
    Heading,
    Paragraph,
    BulletListItem,
    NumberedListItem,
    CodeBlock,
    CheckListItem,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BlockProps {
    /// The level of a heading block (2 or 3)
    pub level: Option<u8>,
    /// Whether a checkListItem block is checked
    pub checked: Option<bool>,
    /// Full lowercase name of the language of a codeBlock (e.g. python, sql)
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextStyles {
    /// Whether the text is bold
    pub bold: Option<bool>,
    /// Whether the text is italic
    pub italic: Option<bool>,
    /// Whether the text is underlined
    pub underline: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BlockContent {
    /// The text of the block; for a code block, the code with its newlines and indentation
    pub text: String,
    /// The styles of the text
    pub styles: Option<TextStyles>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Block {
    /// The type of block
    #[serde(rename = "type")]
    pub block_type: BlockType,
    /// The properties of the block
    pub props: Option<BlockProps>,
    /// The content of the block
    pub content: Option<Vec<BlockContent>>,
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            block_type: BlockType::Paragraph,
            props: None,
            content: Some(vec![BlockContent {
                text: text.into(),
                styles: None,
            }]),
        }
    }
}

// =============================================================================
// Learning material
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(rename = "learning_material")]
pub struct LearningMaterial {
    /// The content of the learning material as blocks
    pub blocks: Vec<Block>,
}

// =============================================================================
// Quiz
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Has a fixed correct answer the response must match
    Objective,
    /// Has no fixed correct answer
    Subjective,
    /// An objective programming question answered with code
    Coding,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Objective => "objective",
            QuestionType::Subjective => "subjective",
            QuestionType::Coding => "coding",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    #[default]
    Text,
    Audio,
}

impl AnswerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerType::Text => "text",
            AnswerType::Audio => "audio",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CodingLanguage {
    #[serde(rename = "HTML")]
    Html,
    #[serde(rename = "CSS")]
    Css,
    #[serde(rename = "JS")]
    Js,
    Python,
    React,
    Node,
    #[serde(rename = "SQL")]
    Sql,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Criterion {
    /// Short name of the criterion (e.g. clarity, relevance)
    pub name: String,
    /// Rubric for assessing this criterion
    pub description: String,
    /// Lowest achievable score
    pub min_score: i64,
    /// Highest achievable score
    pub max_score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scorecard {
    /// What the scorecard assesses
    pub title: String,
    /// The criteria of the scorecard
    pub criteria: Vec<Criterion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Question {
    /// The type of question
    pub question_type: QuestionType,
    /// How the learner answers; ignored for coding questions
    pub answer_type: Option<AnswerType>,
    /// Languages the learner submits code in; only for coding questions
    pub coding_languages: Option<Vec<CodingLanguage>>,
    /// Everything shown to the learner, including any options
    pub blocks: Vec<Block>,
    /// The correct answer; ignored for subjective questions
    pub correct_answer: Option<Vec<Block>>,
    /// Scorecard for subjective questions
    pub scorecard: Option<Scorecard>,
    /// Hidden guidance used when giving feedback
    pub context: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(rename = "quiz")]
pub struct Quiz {
    /// The questions of the quiz
    pub questions: Vec<Question>,
}

// =============================================================================
// Tagged content
// =============================================================================

/// Content for one task; the variant must match the task's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskContent {
    LearningMaterial(LearningMaterial),
    Quiz(Quiz),
}

impl TaskContent {
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskContent::LearningMaterial(_) => TaskType::LearningMaterial,
            TaskContent::Quiz(_) => TaskType::Quiz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openai_client::StructuredOutput;
    use serde_json::json;

    #[test]
    fn block_types_use_editor_names() {
        let block: Block = serde_json::from_value(json!({
            "type": "codeBlock",
            "props": {"level": null, "checked": null, "language": "python"},
            "content": [{"text": "print(1)", "styles": null}]
        }))
        .unwrap();
        assert_eq!(block.block_type, BlockType::CodeBlock);
        assert_eq!(serde_json::to_value(&block).unwrap()["type"], "codeBlock");
    }

    #[test]
    fn quiz_schema_is_strict_and_self_contained() {
        let schema = Quiz::openai_schema();
        let text = schema.to_string();
        assert!(!text.contains("$ref"));
        let question = &schema["properties"]["questions"]["items"];
        assert_eq!(question["additionalProperties"], false);
        assert_eq!(question["required"].as_array().unwrap().len(), 7);
    }

    #[test]
    fn content_reports_its_task_type() {
        let content = TaskContent::LearningMaterial(LearningMaterial {
            blocks: vec![Block::paragraph("hello")],
        });
        assert_eq!(content.task_type(), TaskType::LearningMaterial);
        assert_eq!(serde_json::to_value(&content).unwrap()["type"], "learning_material");
    }
}
