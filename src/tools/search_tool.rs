//! The `search_course_content` tool.

use super::Tool;
use crate::error::{PensumError, Result};
use crate::search::{Citation, ContentSearch, CourseResolver, SourceTracker};
use crate::store::{CourseStore, ScoredChunk, SearchFilter};
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Semantic search over course content with optional course/lesson filters.
///
/// Composes name resolution, filter construction, and filtered retrieval;
/// touched sources are recorded on the request's tracker.
pub struct SearchTool {
    resolver: CourseResolver,
    search: ContentSearch,
    store: Arc<dyn CourseStore>,
    max_results: usize,
}

impl SearchTool {
    pub fn new(
        resolver: CourseResolver,
        search: ContentSearch,
        store: Arc<dyn CourseStore>,
        max_results: usize,
    ) -> Self {
        Self {
            resolver,
            search,
            store,
            max_results,
        }
    }

    /// Format results as labeled excerpts for the model.
    fn format_results(results: &[ScoredChunk]) -> String {
        results
            .iter()
            .map(|r| {
                let header = match r.chunk.lesson_number {
                    Some(n) => format!("[{} - Lesson {}]", r.chunk.course_title, n),
                    None => format!("[{}]", r.chunk.course_title),
                };
                format!("{}\n{}", header, r.chunk.content)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build citations with lesson links pulled from the catalog.
    async fn build_citations(&self, results: &[ScoredChunk]) -> Result<Vec<Citation>> {
        let mut courses = HashMap::new();
        let mut citations = Vec::new();

        for r in results {
            if !courses.contains_key(&r.chunk.course_title) {
                let fetched = self.store.get_course(&r.chunk.course_title).await?;
                courses.insert(r.chunk.course_title.clone(), fetched);
            }
            let course = &courses[&r.chunk.course_title];

            let link = course.as_ref().and_then(|c| {
                r.chunk
                    .lesson_number
                    .and_then(|n| c.lesson_link(n))
                    .or(c.course_link.as_deref())
                    .map(str::to_string)
            });

            let citation = Citation::new(&r.chunk.course_title, r.chunk.lesson_number, link);
            if !citations.contains(&citation) {
                citations.push(citation);
            }
        }

        Ok(citations)
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &'static str {
        "search_course_content"
    }

    fn definition(&self) -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: "search_course_content".to_string(),
                description: Some(
                    "Search course materials for specific content. Use for questions about \
                    concepts, examples, or lesson details; filters narrow the search to one \
                    course and/or lesson."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "What to search for in course content"
                        },
                        "course_name": {
                            "type": "string",
                            "description": "Course title (partial names are matched semantically)"
                        },
                        "lesson_number": {
                            "type": "integer",
                            "description": "Specific lesson number to search within"
                        }
                    },
                    "required": ["query"]
                })),
                strict: None,
            },
        }
    }

    async fn execute(
        &self,
        args: &serde_json::Value,
        sources: &mut SourceTracker,
    ) -> Result<String> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| PensumError::ToolArgument("missing required 'query'".to_string()))?;

        let course_name = match &args["course_name"] {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.as_str()),
            _ => {
                return Err(PensumError::ToolArgument(
                    "'course_name' must be a string".to_string(),
                ))
            }
        };

        let lesson_number = match &args["lesson_number"] {
            serde_json::Value::Null => None,
            v => {
                let n = v.as_u64().ok_or_else(|| {
                    PensumError::ToolArgument(
                        "'lesson_number' must be a non-negative integer".to_string(),
                    )
                })?;
                let n = u32::try_from(n).map_err(|_| {
                    PensumError::ToolArgument(format!("'lesson_number' {} is out of range", n))
                })?;
                Some(n)
            }
        };

        // Resolve the course name first; an unresolvable name short-circuits
        // with an informative message rather than an unfiltered search.
        let course_title = match course_name {
            Some(name) => match self.resolver.resolve(name).await? {
                Some(title) => Some(title),
                None => return Ok(format!("No course found matching '{}'", name)),
            },
            None => None,
        };

        let filter = SearchFilter::from_parts(course_title, lesson_number);
        let results = self.search.search(query, &filter, self.max_results).await?;

        if results.is_empty() {
            let mut msg = "No relevant content found".to_string();
            if let Some(title) = &filter.course_title {
                msg.push_str(&format!(" in course '{}'", title));
            }
            if let Some(n) = filter.lesson_number {
                msg.push_str(&format!(" in lesson {}", n));
            }
            msg.push('.');
            return Ok(msg);
        }

        sources.record(self.build_citations(&results).await?);
        Ok(Self::format_results(&results))
    }
}
