//! Sentence-aware text chunking.

use regex::Regex;
use std::sync::OnceLock;

/// Words a trailing period does not terminate a sentence after.
const ABBREVIATIONS: &[&str] = &[
    "Dr", "Prof", "Mr", "Mrs", "Ms", "St", "Jr", "Sr", "vs", "etc", "Inc", "Ltd", "Fig", "No",
    "e.g", "i.e",
];

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Split text into sentences on `.`, `!` and `?` followed by a space,
/// skipping boundaries that land on a known abbreviation.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    let normalized = whitespace_re().replace_all(text.trim(), " ").into_owned();
    if normalized.is_empty() {
        return Vec::new();
    }

    let bytes = normalized.as_bytes();
    let mut sentences = Vec::new();
    let mut start = 0;

    for i in 0..bytes.len() {
        let terminator = matches!(bytes[i], b'.' | b'!' | b'?');
        let at_boundary = i + 1 >= bytes.len() || bytes[i + 1] == b' ';
        if !terminator || !at_boundary {
            continue;
        }
        let candidate = &normalized[start..=i];
        if bytes[i] == b'.' && ends_with_abbreviation(candidate) {
            continue;
        }
        let trimmed = candidate.trim();
        if !trimmed.is_empty() {
            sentences.push(trimmed.to_string());
        }
        start = i + 1;
    }

    if start < normalized.len() {
        let tail = normalized[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
    }

    sentences
}

fn ends_with_abbreviation(candidate: &str) -> bool {
    let without_period = candidate.trim_end_matches('.');
    let last_word = without_period
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("");
    ABBREVIATIONS
        .iter()
        .any(|a| last_word.eq_ignore_ascii_case(a))
}

/// Pack sentences greedily into chunks of at most `chunk_size` characters,
/// seeding each new chunk with up to `chunk_overlap` characters of trailing
/// sentences from the previous one. The seed is dropped when it would not
/// leave room for the incoming sentence within `chunk_size`.
///
/// A single sentence longer than `chunk_size` becomes its own oversized
/// chunk rather than being split mid-sentence.
pub(crate) fn pack_sentences(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;

    for sentence in &sentences {
        let added = if current.is_empty() {
            sentence.len()
        } else {
            sentence.len() + 1
        };

        if !current.is_empty() && current_len + added > chunk_size {
            chunks.push(current.join(" "));

            let mut seed: Vec<&str> = Vec::new();
            let mut seed_len = 0;
            if chunk_overlap > 0 {
                for prev in current.iter().rev() {
                    let prev_added = if seed.is_empty() {
                        prev.len()
                    } else {
                        prev.len() + 1
                    };
                    if seed_len + prev_added > chunk_overlap {
                        break;
                    }
                    seed.insert(0, prev);
                    seed_len += prev_added;
                }
                // Drop the seed if it would push the new chunk past the
                // size cap once this sentence lands.
                if !seed.is_empty() && seed_len + 1 + sentence.len() > chunk_size {
                    seed.clear();
                    seed_len = 0;
                }
            }
            current = seed;
            current_len = seed_len;
        }

        current_len += if current.is_empty() {
            sentence.len()
        } else {
            sentence.len() + 1
        };
        current.push(sentence);
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_basic() {
        let sentences = split_sentences("First sentence. Second sentence. Third sentence.");
        assert_eq!(
            sentences,
            vec!["First sentence.", "Second sentence.", "Third sentence."]
        );
    }

    #[test]
    fn test_split_keeps_abbreviations_together() {
        let sentences =
            split_sentences("Dr. Smith is a professor. He teaches here. Prof. Johnson agrees.");
        assert_eq!(sentences.len(), 3);
        assert!(sentences[0].contains("Dr. Smith"));
        assert!(sentences[2].contains("Prof. Johnson"));
    }

    #[test]
    fn test_split_collapses_whitespace() {
        let sentences = split_sentences("One  sentence\nacross   lines. Another one.");
        assert_eq!(sentences[0], "One sentence across lines.");
    }

    #[test]
    fn test_pack_empty_input() {
        assert!(pack_sentences("", 100, 10).is_empty());
        assert!(pack_sentences("   \n  ", 100, 10).is_empty());
    }

    #[test]
    fn test_pack_respects_size() {
        let text = "Sentence one here. Sentence two here. Sentence three here. Sentence four here.";
        let chunks = pack_sentences(text, 50, 0);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 50, "chunk too long: {:?}", chunk);
        }
    }

    #[test]
    fn test_pack_overlap_repeats_trailing_sentence() {
        let text = "Sentence one. Sentence two. Sentence three. Sentence four. Sentence five.";
        let chunks = pack_sentences(text, 40, 20);

        assert!(chunks.len() > 1);
        // The last sentence of one chunk should open the next.
        let last_of_first = chunks[0].rsplit(". ").next().unwrap();
        assert!(chunks[1].contains(last_of_first.trim_end_matches('.')));
    }

    #[test]
    fn test_pack_overlap_never_exceeds_size() {
        // A generous overlap must not grow chunks past the size cap: with a
        // 20-char seed plus a 20-char sentence, keeping the seed would yield
        // a 41-char chunk.
        let text =
            "Sentence number one. Sentence number two. Sentence number six. Sentence number ten.";
        let chunks = pack_sentences(text, 40, 30);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 40, "chunk too long: {:?}", chunk);
        }
    }

    #[test]
    fn test_pack_oversized_sentence_kept_whole() {
        let text = "This is a very long sentence that definitely exceeds the chunk size limit.";
        let chunks = pack_sentences(text, 30, 0);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }
}
