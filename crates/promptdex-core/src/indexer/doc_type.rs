//! Document type detection from repo-relative paths.

use crate::config::DocumentType;

/// Directory names that classify everything below them.
const DIRECTORY_PATTERNS: &[(&str, DocumentType)] = &[
    ("rules", DocumentType::Rule),
    ("rule", DocumentType::Rule),
    ("commands", DocumentType::Command),
    ("command", DocumentType::Command),
    ("skills", DocumentType::Skill),
    ("skill", DocumentType::Skill),
    ("tasks", DocumentType::Task),
    ("task", DocumentType::Task),
];

const STORY_MAP_MARKERS: &[&str] = &["story-map", "story_map", "storymap"];

/// Classify a path into a [`DocumentType`].
///
/// Every segment that matches a pattern is a candidate; the candidate closest
/// to the file wins, and a match on the filename itself beats any directory.
/// Unmatched paths are [`DocumentType::Other`].
pub fn detect_document_type(path: &str) -> DocumentType {
    let normalized = path.replace('\\', "/");
    let segments: Vec<&str> = normalized
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    let Some((file_name, dirs)) = segments.split_last() else {
        return DocumentType::Other;
    };

    if let Some(doc_type) = classify_file_name(file_name) {
        return doc_type;
    }

    dirs.iter()
        .rev()
        .find_map(|dir| classify_directory(dir))
        .unwrap_or(DocumentType::Other)
}

fn classify_file_name(file_name: &str) -> Option<DocumentType> {
    if file_name == "SKILL.md" {
        return Some(DocumentType::Skill);
    }
    let lower = file_name.to_ascii_lowercase();
    if STORY_MAP_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(DocumentType::StoryMap);
    }
    None
}

fn classify_directory(dir: &str) -> Option<DocumentType> {
    let lower = dir.to_ascii_lowercase();
    if STORY_MAP_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(DocumentType::StoryMap);
    }
    DIRECTORY_PATTERNS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, doc_type)| *doc_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_patterns() {
        assert_eq!(detect_document_type(".claude/rules/auth.md"), DocumentType::Rule);
        assert_eq!(detect_document_type("commands/deploy.md"), DocumentType::Command);
        assert_eq!(detect_document_type("skills/pdf/notes.md"), DocumentType::Skill);
        assert_eq!(detect_document_type("docs/tasks/T-12.md"), DocumentType::Task);
    }

    #[test]
    fn test_skill_file_name() {
        assert_eq!(detect_document_type("tools/pdf/SKILL.md"), DocumentType::Skill);
        assert_eq!(detect_document_type("commands/skill.md"), DocumentType::Command);
    }

    #[test]
    fn test_story_map() {
        assert_eq!(detect_document_type("planning/story-map.md"), DocumentType::StoryMap);
        assert_eq!(detect_document_type("tasks/story_map_q3.md"), DocumentType::StoryMap);
        assert_eq!(
            detect_document_type("story-maps/checkout/epic.md"),
            DocumentType::StoryMap
        );
    }

    #[test]
    fn test_most_specific_wins() {
        // Deeper directory beats shallower one
        assert_eq!(detect_document_type("commands/rules/lint.md"), DocumentType::Rule);
        assert_eq!(detect_document_type("rules/commands/lint.md"), DocumentType::Command);
        // File name beats directory
        assert_eq!(detect_document_type("rules/story-map.md"), DocumentType::StoryMap);
    }

    #[test]
    fn test_default_and_separators() {
        assert_eq!(detect_document_type("README.md"), DocumentType::Other);
        assert_eq!(detect_document_type(""), DocumentType::Other);
        assert_eq!(detect_document_type("rulesets/a.md"), DocumentType::Other);
        assert_eq!(detect_document_type("Rules\\windows.md"), DocumentType::Rule);
    }
}
