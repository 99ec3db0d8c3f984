// src/utils/debug.rs
use std::fs;
use std::path::Path;

use crate::extractors::{SectionExtractor, SectionId};
use crate::utils::error::AppError;

/// Wraps every highlighted range of `text` in `[[label]]...[[/]]` markers.
/// Ranges that overlap an earlier one are skipped.
pub fn annotate(text: &str, highlights: &[(usize, usize, String)]) -> String {
    let mut sorted = highlights.to_vec();
    sorted.sort_by_key(|h| h.0); // Sort by position

    let mut annotated = String::with_capacity(text.len() + highlights.len() * 32);
    let mut last_pos = 0;
    for (start, end, label) in sorted {
        if start < last_pos || end > text.len() || start > end {
            continue;
        }
        annotated.push_str(&text[last_pos..start]);
        annotated.push_str(&format!("[[{}]]", label));
        annotated.push_str(&text[start..end]);
        annotated.push_str("[[/]]");
        last_pos = end;
    }
    annotated.push_str(&text[last_pos..]);
    annotated
}

/// Marks every heading candidate of `sections` with its slug and TOC classification.
pub fn annotate_headings(text: &str, extractor: &SectionExtractor, sections: &[SectionId]) -> String {
    let highlights: Vec<(usize, usize, String)> = sections
        .iter()
        .flat_map(|id| {
            extractor.heading_candidates(text, id).into_iter().map(move |c| {
                let kind = if c.is_toc() { "toc" } else { "heading" };
                (c.start, c.end, format!("{}:{}", id.slug(), kind))
            })
        })
        .collect();
    annotate(text, &highlights)
}

/// Writes the raw filing, its normalized text and the annotated text into `dir`.
pub fn save_debug_artifacts(
    dir: &Path,
    raw: &str,
    clean: &str,
    extractor: &SectionExtractor,
    sections: &[SectionId],
) -> Result<(), AppError> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join("raw_filing.html"), raw)?;
    fs::write(dir.join("normalized.txt"), clean)?;
    fs::write(
        dir.join("headings_annotated.txt"),
        annotate_headings(clean, extractor, sections),
    )?;
    tracing::info!("Saved debug artifacts to {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotate_skips_overlaps() {
        let text = "abcdef";
        let highlights = vec![
            (3, 5, "second".to_string()),
            (0, 2, "first".to_string()),
            (1, 4, "overlap".to_string()),
        ];
        assert_eq!(annotate(text, &highlights), "[[first]]ab[[/]]c[[second]]de[[/]]f");
    }

    #[test]
    fn test_annotate_headings_labels_toc_entries() {
        let text = "Item 1. Business ..... 3\nPART I\nItem 1. Business\nWidgets.";
        let annotated = annotate_headings(text, &SectionExtractor::new(), &[SectionId::Business]);
        assert!(annotated.contains("[[item_1_business:toc]]Item 1. Business[[/]] ..... 3"));
        assert!(annotated.contains("[[item_1_business:heading]]Item 1. Business[[/]]\nWidgets."));
    }

    #[test]
    fn test_save_debug_artifacts_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("debug");
        save_debug_artifacts(
            &target,
            "<p>Item 1. Business</p>",
            "Item 1. Business",
            &SectionExtractor::new(),
            &SectionId::NARRATIVE,
        )
        .unwrap();
        assert!(target.join("raw_filing.html").exists());
        assert_eq!(fs::read_to_string(target.join("normalized.txt")).unwrap(), "Item 1. Business");
        assert!(fs::read_to_string(target.join("headings_annotated.txt"))
            .unwrap()
            .contains("[[item_1_business:heading]]"));
    }
}
