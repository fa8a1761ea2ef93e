//! HTML extraction, shared with EPUB chapter decoding.

use crate::progress::BandReporter;

use super::ExtractionResult;

pub fn extract_html(data: &[u8], progress: &BandReporter) -> ExtractionResult {
    progress.report("reading HTML", 20.0);
    let html = String::from_utf8_lossy(data);

    progress.report("stripping markup", 60.0);
    let result = ExtractionResult::new(strip_html_tags(&html));
    match html_title(&html) {
        Some(title) => result.with_metadata("title", title),
        None => result,
    }
}

/// Strip tags, drop `<script>`/`<style>` bodies, collapse whitespace and
/// decode common entities.
pub fn strip_html_tags(html: &str) -> String {
    let mut result = String::new();
    let mut chars = html.chars();
    let mut last_was_space = true;
    let mut skip_until: Option<&'static str> = None;

    while let Some(c) = chars.next() {
        if c == '<' {
            let tag: String = chars.by_ref().take_while(|&c| c != '>').collect();
            let name = tag_name(&tag);

            match skip_until {
                Some(closing) if name == closing => skip_until = None,
                Some(_) => {}
                None if name == "script" => skip_until = Some("/script"),
                None if name == "style" => skip_until = Some("/style"),
                None => {}
            }

            // Tags separate words
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
            continue;
        }

        if skip_until.is_some() {
            continue;
        }

        if c.is_whitespace() {
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            result.push(c);
            last_was_space = false;
        }
    }

    decode_entities(result.trim())
}

/// Lower-cased tag name including a leading `/` for closing tags
fn tag_name(tag: &str) -> String {
    tag.trim_start()
        .split(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .trim_end_matches('/')
        .to_ascii_lowercase()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Text of the first `<title>` element, if any
fn html_title(html: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets valid for `html`
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let start = open + lower[open..].find('>')? + 1;
    let end = start + lower[start..].find("</title")?;
    let title = strip_html_tags(&html[start..end]);
    (!title.is_empty()).then_some(title)
}
