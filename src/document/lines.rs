// src/document/lines.rs
// =============================================================================
// Source line numbers for parsed elements.
//
// scraper does not keep track of where an element came from, so we scan the
// raw markup once for start tags and remember the line of each, grouped by
// tag name in the order they appear. The n-th <a> the parser produces is
// then the n-th <a> in the source.
//
// Comments and the bodies of raw-text elements (<script>, <noscript>, ...)
// are skipped, because the parser does not turn their contents into elements.
// =============================================================================

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

// Elements whose contents the parser keeps as text. scraper parses with
// scripting enabled, so <noscript> is one of them.
const RAW_TEXT_TAGS: [&str; 9] = [
    "script", "style", "textarea", "title", "noscript", "iframe", "noembed", "noframes", "xmp",
];

static START_TAGS: Lazy<Regex> = Lazy::new(|| {
    let raw_text: Vec<String> = RAW_TEXT_TAGS
        .iter()
        .map(|tag| format!(r"<({tag})\b[^>]*>.*?</{tag}\s*>"))
        .collect();
    Regex::new(&format!(
        r"(?is)<!--.*?-->|{}|<([a-z][a-z0-9-]*)",
        raw_text.join("|")
    ))
    .expect("start tag regex is valid")
});

/// Line numbers (1-based) of every start tag, grouped by lowercase tag name.
#[derive(Debug, Default)]
pub struct LineIndex {
    by_tag: HashMap<String, Vec<usize>>,
}

impl LineIndex {
    pub fn build(source: &str) -> Self {
        let mut by_tag: HashMap<String, Vec<usize>> = HashMap::new();
        let mut line = 1;
        let mut last = 0;

        for caps in START_TAGS.captures_iter(source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            line += count_newlines(&source[last..whole.start()]);
            last = whole.start();

            if let Some(name) = caps.iter().skip(1).flatten().next() {
                by_tag
                    .entry(name.as_str().to_ascii_lowercase())
                    .or_default()
                    .push(line);
            }
        }

        Self { by_tag }
    }

    /// Line of the `nth` (0-based) start tag named `tag`.
    pub fn line_of(&self, tag: &str, nth: usize) -> Option<usize> {
        self.by_tag.get(tag).and_then(|lines| lines.get(nth)).copied()
    }
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}
