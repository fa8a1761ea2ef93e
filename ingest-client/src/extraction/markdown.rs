//! Plain text and Markdown extraction.

use serde_json::Value;

use crate::progress::BandReporter;

use super::ExtractionResult;

/// Extract a plain text file. Invalid UTF-8 sequences are replaced.
pub fn extract_text(data: &[u8], progress: &BandReporter) -> ExtractionResult {
    progress.report("reading text", 50.0);
    ExtractionResult::new(String::from_utf8_lossy(data).into_owned())
}

/// Extract a Markdown file: the source text plus its headings.
pub fn extract_markdown(data: &[u8], progress: &BandReporter) -> ExtractionResult {
    progress.report("reading text", 50.0);
    let text = String::from_utf8_lossy(data).into_owned();
    let headings: Vec<Value> = markdown_headings(&text)
        .into_iter()
        .map(Value::from)
        .collect();

    ExtractionResult::new(text).with_metadata("headings", headings)
}

/// Collect ATX header texts in source order, skipping fenced code blocks.
pub fn markdown_headings(content: &str) -> Vec<String> {
    let mut headings = Vec::new();
    let mut in_fence = false;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || !trimmed.starts_with('#') {
            continue;
        }

        let level = trimmed.chars().take_while(|c| *c == '#').count();
        let rest = &trimmed[level..];
        // `#hashtag` is not a header
        if level > 6 || !(rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t')) {
            continue;
        }

        let header_text = rest.trim().trim_end_matches('#').trim().to_string();
        if !header_text.is_empty() {
            headings.push(header_text);
        }
    }

    headings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressReporter;
    use serde_json::json;

    #[test]
    fn test_markdown_headings() {
        let markdown = r#"
# Chapter 1

This is the first chapter.

## Section 1.1 ##

```sh
# not a heading
```

#hashtag

# Chapter 2

Another chapter.
"#;

        let headings = markdown_headings(markdown);
        assert_eq!(headings, vec!["Chapter 1", "Section 1.1", "Chapter 2"]);
    }

    #[test]
    fn test_extract_markdown_keeps_source_text() {
        let reporter = ProgressReporter::new();
        let source = "# Title\n\nBody *text*\n";
        let result = extract_markdown(source.as_bytes(), &reporter.band(0.0, 20.0));

        assert_eq!(result.text, source);
        assert_eq!(result.metadata.get("headings"), Some(&json!(["Title"])));
        assert_eq!(reporter.snapshot().progress, 10.0);
    }

    #[test]
    fn test_extract_text_is_lossy() {
        let reporter = ProgressReporter::new();
        let result = extract_text(b"ok \xff", &reporter.band(0.0, 20.0));
        assert_eq!(result.text, "ok \u{fffd}");
    }
}
