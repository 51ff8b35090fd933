// src/document/mod.rs
// =============================================================================
// A parsed HTML document that can be queried.
//
// This wraps scraper's `Html` and adds the two things the checks need that
// scraper does not give us directly:
// - the source line of every element (see lines.rs)
// - a fragment lookup: "is there an element whose id or name is X?"
//
// Used both for documents we extract links from and for link targets we
// search for fragments (local files and downloaded pages).
// =============================================================================

mod lines;

use lines::LineIndex;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

/// Elements carrying this attribute (or inside one) are skipped by the checks.
pub const IGNORE_ATTRIBUTE: &str = "data-proofer-ignore";

static ALL_ELEMENTS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("*").expect("universal selector is valid"));
static ANCHORS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[id], [name]").expect("anchor selector is valid"));
static BASE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("base[href]").expect("base selector is valid"));

pub struct Document {
    html: Html,
    lines: LineIndex,
}

impl Document {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
            lines: LineIndex::build(source),
        }
    }

    /// Every element in document order, each tagged with its source line.
    pub fn elements(&self) -> Vec<Element<'_>> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        self.html
            .select(&ALL_ELEMENTS)
            .map(|node| {
                let name = node.value().name().to_ascii_lowercase();
                let nth = seen.entry(name.clone()).or_insert(0);
                let line = self.lines.line_of(&name, *nth);
                *nth += 1;
                Element { node, line }
            })
            .collect()
    }

    /// The first `<base href>`, which relative links are resolved against.
    pub fn base_url(&self) -> Option<&str> {
        self.html
            .select(&BASE)
            .next()
            .and_then(|base| base.value().attr("href"))
    }

    /// Whether some element has an `id` or `name` exactly equal to one of `ids`.
    pub fn has_anchor(&self, ids: &[String]) -> bool {
        self.html.select(&ANCHORS).any(|node| {
            let element = node.value();
            ids.iter().any(|id| {
                element.attr("id") == Some(id.as_str()) || element.attr("name") == Some(id.as_str())
            })
        })
    }
}

/// One element of a parsed document.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    node: ElementRef<'a>,
    line: Option<usize>,
}

impl<'a> Element<'a> {
    pub fn name(&self) -> &'a str {
        self.node.value().name()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.node.value().attr(name)
    }

    /// The element's outer HTML.
    pub fn content(&self) -> String {
        self.node.html()
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    /// True when this element or any ancestor opts out of checking.
    pub fn is_ignored(&self) -> bool {
        let mut current = Some(self.node);
        while let Some(element) = current {
            if element.value().attr(IGNORE_ATTRIBUTE).is_some() {
                return true;
            }
            current = element.parent().and_then(ElementRef::wrap);
        }
        false
    }
}
