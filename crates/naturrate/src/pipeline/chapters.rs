//! Chapter document fed to the narration generator.

use crate::services::Chapter;

/// Renders chapters, ordered by number, as blocks joined by a newline:
///
/// ```text
/// Chapter 1
/// Start: 0.0 seconds
/// End: 12.5 seconds
/// Title: ...
/// Summary: ...
/// ```
pub fn format_chapters(chapters: &[Chapter]) -> String {
    let mut ordered: Vec<&Chapter> = chapters.iter().collect();
    ordered.sort_by_key(|c| c.number);

    ordered
        .iter()
        .map(|c| {
            format!(
                "Chapter {}\nStart: {:.1} seconds\nEnd: {:.1} seconds\nTitle: {}\nSummary: {}",
                c.number, c.start, c.end, c.title, c.summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(number: u32, start: f64, end: f64, title: &str) -> Chapter {
        Chapter {
            number,
            start,
            end,
            title: title.to_string(),
            summary: format!("{} summary", title),
        }
    }

    #[test]
    fn test_single_chapter_block() {
        let text = format_chapters(&[chapter(1, 0.0, 12.46, "Dawn")]);
        assert_eq!(
            text,
            "Chapter 1\nStart: 0.0 seconds\nEnd: 12.5 seconds\nTitle: Dawn\nSummary: Dawn summary"
        );
    }

    #[test]
    fn test_blocks_sorted_and_joined() {
        let text = format_chapters(&[chapter(2, 5.0, 9.0, "Hunt"), chapter(1, 0.0, 5.0, "Dawn")]);
        let blocks: Vec<&str> = text.split("\nChapter ").collect();
        assert_eq!(blocks.len(), 2);
        assert!(text.starts_with("Chapter 1\n"));
        assert!(blocks[1].starts_with("2\nStart: 5.0 seconds"));
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn test_no_chapters_is_empty() {
        assert_eq!(format_chapters(&[]), "");
    }
}
