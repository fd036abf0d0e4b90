//! Course document parsing.
//!
//! Documents are plain text with a metadata header followed by lesson
//! sections:
//!
//! ```text
//! Course Title: Building Toward Computer Use
//! Course Link: https://example.com/course
//! Course Instructor: Colt Steele
//!
//! Lesson 0: Introduction
//! Lesson Link: https://example.com/lesson0
//! Lesson text...
//! ```

use crate::store::{Course, Lesson};
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;
use url::Url;

fn lesson_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Lesson\s+(\d+):\s*(.+)$").unwrap())
}

/// One contiguous span of lesson text (or preamble text with no lesson).
#[derive(Debug)]
pub(crate) struct LessonText {
    pub lesson_number: Option<u32>,
    pub text: String,
}

/// Parse a course document into its catalog entry and per-lesson text.
///
/// Metadata lines are optional; a document missing its title falls back to
/// `fallback_title` (typically the file stem). Text before the first lesson
/// marker is kept as an unnumbered span.
pub(crate) fn parse_document(content: &str, fallback_title: &str) -> (Course, Vec<LessonText>) {
    let mut lines = content.lines().peekable();

    let mut title: Option<String> = None;
    let mut course_link: Option<String> = None;
    let mut instructor: Option<String> = None;

    // Header: prefixed metadata lines up to the first blank or body line.
    while let Some(&line) = lines.peek() {
        if let Some(value) = line.strip_prefix("Course Title:") {
            title = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Course Link:") {
            course_link = validate_link(value.trim(), fallback_title);
        } else if let Some(value) = line.strip_prefix("Course Instructor:") {
            instructor = Some(value.trim().to_string());
        } else if !line.trim().is_empty() {
            break;
        }
        lines.next();
    }

    let title = title.unwrap_or_else(|| fallback_title.to_string());

    let mut lessons: Vec<Lesson> = Vec::new();
    let mut blocks: Vec<LessonText> = Vec::new();
    let mut current_number: Option<u32> = None;
    let mut current_text = String::new();

    let flush = |blocks: &mut Vec<LessonText>, number: Option<u32>, text: &mut String| {
        if !text.trim().is_empty() {
            blocks.push(LessonText {
                lesson_number: number,
                text: std::mem::take(text),
            });
        } else {
            text.clear();
        }
    };

    while let Some(line) = lines.next() {
        if let Some(caps) = lesson_re().captures(line) {
            flush(&mut blocks, current_number, &mut current_text);

            // Regex guarantees digits; numbers too large for u32 are skipped.
            let number: u32 = match caps[1].parse() {
                Ok(n) => n,
                Err(_) => {
                    warn!("Skipping lesson with out-of-range number in '{}'", title);
                    continue;
                }
            };
            let lesson_title = caps[2].trim().to_string();

            let lesson_link = match lines.peek() {
                Some(next) => match next.strip_prefix("Lesson Link:") {
                    Some(value) => {
                        let link = validate_link(value.trim(), &title);
                        lines.next();
                        link
                    }
                    None => None,
                },
                None => None,
            };

            lessons.push(Lesson {
                lesson_number: number,
                title: lesson_title,
                lesson_link,
            });
            current_number = Some(number);
        } else {
            current_text.push_str(line);
            current_text.push('\n');
        }
    }
    flush(&mut blocks, current_number, &mut current_text);

    let course = Course {
        title,
        course_link,
        instructor,
        lessons,
    };
    (course, blocks)
}

/// Keep a link only when it parses as a URL.
fn validate_link(raw: &str, context: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    match Url::parse(raw) {
        Ok(_) => Some(raw.to_string()),
        Err(e) => {
            warn!("Dropping invalid link '{}' in '{}': {}", raw, context, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Course Title: Test Course Title\n\
Course Link: https://example.com/course\n\
Course Instructor: Dr. Test Instructor\n\
\n\
Lesson 0: First Lesson\n\
Lesson Link: https://example.com/l0\n\
Content for first lesson.\n\
\n\
Lesson 1: Second Lesson\n\
Lesson Link: https://example.com/l1\n\
Content for second lesson.\n";

    #[test]
    fn test_metadata_extraction() {
        let (course, _) = parse_document(SAMPLE, "fallback");

        assert_eq!(course.title, "Test Course Title");
        assert_eq!(
            course.course_link.as_deref(),
            Some("https://example.com/course")
        );
        assert_eq!(course.instructor.as_deref(), Some("Dr. Test Instructor"));
    }

    #[test]
    fn test_lessons_and_links() {
        let (course, blocks) = parse_document(SAMPLE, "fallback");

        assert_eq!(course.lessons.len(), 2);
        assert_eq!(course.lessons[0].lesson_number, 0);
        assert_eq!(course.lessons[0].title, "First Lesson");
        assert_eq!(
            course.lessons[0].lesson_link.as_deref(),
            Some("https://example.com/l0")
        );
        assert_eq!(course.lessons[1].lesson_number, 1);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lesson_number, Some(0));
        assert!(blocks[0].text.contains("Content for first lesson."));
        assert_eq!(blocks[1].lesson_number, Some(1));
    }

    #[test]
    fn test_missing_metadata_uses_fallback_title() {
        let content = "Some Random Text\nLesson 0: Test\nContent here.\n";
        let (course, blocks) = parse_document(content, "malformed");

        assert_eq!(course.title, "malformed");
        assert_eq!(blocks.last().unwrap().lesson_number, Some(0));
        // The stray opening line survives as an unnumbered span.
        assert_eq!(blocks[0].lesson_number, None);
    }

    #[test]
    fn test_document_without_lessons() {
        let content = "Course Title: No Lessons Course\n\
Course Link: https://example.com\n\
Course Instructor: Test\n\
\n\
Just some content without lesson markers.\nMore content here.\n";
        let (course, blocks) = parse_document(content, "fallback");

        assert_eq!(course.title, "No Lessons Course");
        assert!(course.lessons.is_empty());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lesson_number, None);
    }

    #[test]
    fn test_empty_lesson_produces_no_block() {
        let content = "Course Title: Empty Lesson Test\n\
\n\
Lesson 0: Empty Lesson\n\
Lesson Link: https://example.com/l0\n\
\n\
Lesson 1: Has Content\n\
Actual content here.\n";
        let (course, blocks) = parse_document(content, "fallback");

        assert_eq!(course.lessons.len(), 2);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lesson_number, Some(1));
    }

    #[test]
    fn test_invalid_link_dropped() {
        let content = "Course Title: Bad Link\nCourse Link: not a url\n\nBody text.\n";
        let (course, _) = parse_document(content, "fallback");

        assert!(course.course_link.is_none());
    }
}
