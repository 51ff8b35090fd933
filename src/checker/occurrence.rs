// src/checker/occurrence.rs
// =============================================================================
// Where a URL was seen.
//
// Extraction produces two maps per document: internal URL -> occurrences
// and external URL -> occurrences. The runner merges them across all
// documents, so one URL string ends up with every place that used it.
//
// Internal maps are keyed by the attribute text as written, because the same
// text can resolve to different files depending on the referencing document
// (its <base href> and location). External maps are keyed by the fully
// normalized URL, so each distinct remote URL is requested once.
// =============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalOccurrence {
    /// The input (file or directory) the document was discovered under.
    pub source: PathBuf,
    /// The document holding the link.
    pub filename: PathBuf,
    pub line: Option<usize>,
    /// The document's `<base href>`, if any.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalOccurrence {
    pub filename: PathBuf,
    pub line: Option<usize>,
}

pub type InternalUrls = BTreeMap<String, Vec<InternalOccurrence>>;
pub type ExternalUrls = BTreeMap<String, Vec<ExternalOccurrence>>;

/// Appends every occurrence in `from` to the matching entry of `into`.
pub fn merge_into<T>(into: &mut BTreeMap<String, Vec<T>>, from: BTreeMap<String, Vec<T>>) {
    for (url, occurrences) in from {
        into.entry(url).or_default().extend(occurrences);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_accumulates_occurrences() {
        let occurrence = |line| ExternalOccurrence {
            filename: PathBuf::from("a.html"),
            line: Some(line),
        };
        let mut all = ExternalUrls::new();
        all.insert("https://a.test/".to_string(), vec![occurrence(1)]);

        let mut more = ExternalUrls::new();
        more.insert("https://a.test/".to_string(), vec![occurrence(7)]);
        more.insert("https://b.test/".to_string(), vec![occurrence(2)]);

        merge_into(&mut all, more);
        assert_eq!(all.len(), 2);
        assert_eq!(all["https://a.test/"].len(), 2);
        assert_eq!(all["https://a.test/"][1].line, Some(7));
    }
}
