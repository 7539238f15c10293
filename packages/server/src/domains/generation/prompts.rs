//! System prompts and user-message builders for course generation.

use super::models::{OutlineConcept, OutlineTask, TaskType};

pub const COURSE_STRUCTURE_PROMPT: &str = r#"You are an expert course designer. You are given a course description, its intended audience, optional instructions and a reference document.

Design the structure of the course as modules, each made of concepts, each made of tasks.

## Rules
- Order modules, concepts and tasks in the order a learner should take them
- Every task is either `learning_material` (reading content) or `quiz` (questions that check understanding)
- Follow a concept's learning material with a quiz that practices it
- Task names must not include the task type
- Describe every task in enough detail that its content can be written from the description alone
- Base the course on the reference document; do not invent facts it contradicts"#;

pub const LEARNING_MATERIAL_PROMPT: &str = r#"You are an expert instructional writer. You are given a concept from a course, the task to write, and the reference document of the course.

Write the learning material for the task as a list of blocks.

## Rules
- Use heading blocks (level 2 or 3) to structure the material; never repeat the task name as a heading
- Prefer short paragraphs and lists over long paragraphs
- Use codeBlock blocks for any code, with the language set
- Explain with concrete examples drawn from the reference document
- Stay within the scope of the task description"#;

pub const QUIZ_PROMPT: &str = r#"You are an expert assessment writer. You are given a concept from a course, the quiz task to write, and the reference document of the course.

Write the questions of the quiz.

## Rules
- Use `objective` questions when there is a single correct answer and give it in `correct_answer`
- Use `subjective` questions for open-ended answers and give them a `scorecard` with criteria
- Use `coding` questions only when the learner must write code, and set `coding_languages`
- Put everything the learner sees, including options, in `blocks`
- Use `context` for guidance that helps give feedback but is never shown to the learner
- Test understanding of the task description, not trivia"#;

/// System prompt for content of `task_type`.
pub fn task_system_prompt(task_type: TaskType) -> &'static str {
    match task_type {
        TaskType::LearningMaterial => LEARNING_MATERIAL_PROMPT,
        TaskType::Quiz => QUIZ_PROMPT,
    }
}

pub fn course_structure_user_prompt(
    course_description: &str,
    intended_audience: &str,
    instructions: Option<&str>,
) -> String {
    format!(
        "About the course: {}\n\nIntended audience: {}\n\nInstructions: {}",
        course_description,
        intended_audience,
        instructions.filter(|s| !s.trim().is_empty()).unwrap_or("(none)"),
    )
}

pub fn task_user_prompt(concept: &OutlineConcept, task: &OutlineTask) -> String {
    let siblings = concept
        .tasks
        .iter()
        .map(|t| format!("- {} ({})", t.name, t.task_type.as_str()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Concept: {}\n\nConcept description: {}\n\nTasks of the concept:\n{}\n\nTask to generate: {}\n\nTask description: {}",
        concept.name, concept.description, siblings, task.name, task.description,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_instructions_render_as_none() {
        let prompt = course_structure_user_prompt("SQL basics", "Analysts", Some("  "));
        assert!(prompt.ends_with("Instructions: (none)"));
        assert!(prompt.starts_with("About the course: SQL basics"));
    }

    #[test]
    fn task_prompt_names_the_task_and_its_siblings() {
        let task = OutlineTask {
            id: 3,
            name: "Joins".into(),
            description: "Inner and outer joins".into(),
            task_type: TaskType::LearningMaterial,
        };
        let concept = OutlineConcept {
            name: "Combining tables".into(),
            description: "How rows from tables combine".into(),
            tasks: vec![task.clone()],
        };

        let prompt = task_user_prompt(&concept, &task);
        assert!(prompt.contains("- Joins (learning_material)"));
        assert!(prompt.contains("Task to generate: Joins"));
    }
}
