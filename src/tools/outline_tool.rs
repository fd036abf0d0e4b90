//! The `get_course_outline` tool.

use super::Tool;
use crate::error::{PensumError, Result};
use crate::search::{CourseResolver, SourceTracker};
use crate::store::{Course, CourseStore};
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use async_trait::async_trait;
use std::sync::Arc;

/// Returns a course's full structure: title, link, instructor, and the
/// complete numbered lesson list.
pub struct OutlineTool {
    resolver: CourseResolver,
    store: Arc<dyn CourseStore>,
}

impl OutlineTool {
    pub fn new(resolver: CourseResolver, store: Arc<dyn CourseStore>) -> Self {
        Self { resolver, store }
    }

    fn format_outline(course: &Course) -> String {
        let mut out = format!("Course: {}", course.title);
        if let Some(link) = &course.course_link {
            out.push_str(&format!("\nCourse Link: {}", link));
        }
        if let Some(instructor) = &course.instructor {
            out.push_str(&format!("\nInstructor: {}", instructor));
        }

        if course.lessons.is_empty() {
            out.push_str("\n\nNo lessons found.");
        } else {
            out.push_str(&format!("\n\nLessons ({} total):", course.lessons.len()));
            for lesson in &course.lessons {
                out.push_str(&format!("\n  Lesson {}: {}", lesson.lesson_number, lesson.title));
            }
        }
        out
    }
}

#[async_trait]
impl Tool for OutlineTool {
    fn name(&self) -> &'static str {
        "get_course_outline"
    }

    fn definition(&self) -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: "get_course_outline".to_string(),
                description: Some(
                    "Get a course's complete structure: title, link, instructor, and all \
                    lesson numbers and titles. Use for outline, syllabus, or lesson-list \
                    questions."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "course_name": {
                            "type": "string",
                            "description": "Course title (partial names are matched semantically)"
                        }
                    },
                    "required": ["course_name"]
                })),
                strict: None,
            },
        }
    }

    async fn execute(
        &self,
        args: &serde_json::Value,
        _sources: &mut SourceTracker,
    ) -> Result<String> {
        let course_name = args["course_name"].as_str().ok_or_else(|| {
            PensumError::ToolArgument("missing required 'course_name'".to_string())
        })?;

        let title = match self.resolver.resolve(course_name).await? {
            Some(title) => title,
            None => return Ok(format!("No course found matching '{}'", course_name)),
        };

        match self.store.get_course(&title).await? {
            Some(course) => Ok(Self::format_outline(&course)),
            None => Ok(format!("No course found matching '{}'", course_name)),
        }
    }
}
