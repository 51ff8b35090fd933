// src/extract/mod.rs
// =============================================================================
// Pulls the URLs out of one parsed document.
//
// Which attribute holds the URL depends on the element:
//   links:     <a href>, <area href>, <link href> (not preconnect/dns-prefetch)
//   images:    <img src>, every candidate of <img srcset>
//   scripts:   <script src>
//   opengraph: <meta property|name="og:url|og:image|twitter:image" content>
//
// Each URL is then sorted into one of:
// - skipped: javascript:, ignore_urls matches, inline data images,
//   mailto:/tel: and other schemes we don't check
// - the external map (http/https), keyed by the normalized URL
// - the internal map, keyed by the attribute text as written
//
// A few problems are reported right here instead of by a validator:
// a bare "#" when those are not allowed, and http: links when HTTPS is
// enforced.
// =============================================================================

use crate::checker::{
    ExternalOccurrence, ExternalUrls, Failure, FailureKind, InternalOccurrence, InternalUrls,
    UrlValue,
};
use crate::config::{CheckKind, Config};
use crate::document::{Document, Element};
use std::path::Path;
use tracing::trace;

const OPENGRAPH_PROPERTIES: [&str; 3] = ["og:url", "og:image", "twitter:image"];
const HINT_RELS: [&str; 2] = ["preconnect", "dns-prefetch"];

/// Everything found in one document.
#[derive(Debug, Default)]
pub struct Extracted {
    pub internal: InternalUrls,
    pub external: ExternalUrls,
    pub failures: Vec<Failure>,
}

/// Runs every enabled element rule over `document`.
///
/// `source` is the input the document was discovered under and
/// `filename` is the document itself.
pub fn extract_urls(config: &Config, source: &Path, filename: &Path, document: &Document) -> Extracted {
    let mut extracted = Extracted::default();
    let base_url = document.base_url();

    for element in document.elements() {
        if element.is_ignored() {
            continue;
        }
        for (kind, raw) in element_urls(&element) {
            if !config.is_check_enabled(kind) {
                continue;
            }
            let found = Found {
                kind,
                raw,
                element: &element,
            };
            classify(config, source, filename, base_url, found, &mut extracted);
        }
    }

    extracted
}

struct Found<'e, 'a> {
    kind: CheckKind,
    raw: &'a str,
    element: &'e Element<'a>,
}

fn classify(
    config: &Config,
    source: &Path,
    filename: &Path,
    base_url: Option<&str>,
    found: Found<'_, '_>,
    extracted: &mut Extracted,
) {
    let url = UrlValue::new(Some(found.raw), base_url, &config.swap_urls);

    if url.is_empty() || url.is_ignored(&config.ignore_urls) || url.is_data_image() {
        trace!("skipping {:?} in {}", url.raw().unwrap_or(""), filename.display());
        return;
    }

    let fail = |kind, description: String| {
        Failure::new(filename, found.kind.name(), kind, description, found.element.line())
            .with_content(found.element.content())
    };

    if url.as_str() == "#" {
        if !config.allow_hash_href {
            extracted.failures.push(fail(
                FailureKind::EmptyHash,
                "linking to internal hash #, which points to nowhere".to_string(),
            ));
        }
        return;
    }

    if url.is_remote() {
        if config.enforce_https && url.scheme().is_some_and(|s| s.eq_ignore_ascii_case("http")) {
            extracted
                .failures
                .push(fail(FailureKind::InsecureLink, format!("{url} is not an HTTPS link")));
        }
        extracted
            .external
            .entry(url.as_str().to_string())
            .or_default()
            .push(ExternalOccurrence {
                filename: filename.to_path_buf(),
                line: found.element.line(),
            });
    } else if url.is_internal() {
        extracted
            .internal
            .entry(found.raw.to_string())
            .or_default()
            .push(InternalOccurrence {
                source: source.to_path_buf(),
                filename: filename.to_path_buf(),
                line: found.element.line(),
                base_url: base_url.map(str::to_string),
            });
    } else {
        trace!("skipping unsupported scheme {url}");
    }
}

/// The URL-carrying attributes of one element, tagged with their check.
fn element_urls<'a>(element: &Element<'a>) -> Vec<(CheckKind, &'a str)> {
    let mut urls = Vec::new();
    match element.name() {
        "a" | "area" => urls.extend(element.attr("href").map(|href| (CheckKind::Links, href))),
        "link" => {
            let is_hint = element.attr("rel").is_some_and(|rel| {
                rel.split_ascii_whitespace()
                    .any(|token| HINT_RELS.iter().any(|hint| token.eq_ignore_ascii_case(hint)))
            });
            if !is_hint {
                urls.extend(element.attr("href").map(|href| (CheckKind::Links, href)));
            }
        }
        "img" => {
            urls.extend(element.attr("src").map(|src| (CheckKind::Images, src)));
            if let Some(srcset) = element.attr("srcset") {
                urls.extend(srcset_urls(srcset).map(|src| (CheckKind::Images, src)));
            }
        }
        "script" => urls.extend(element.attr("src").map(|src| (CheckKind::Scripts, src))),
        "meta" => {
            let property = element.attr("property").or_else(|| element.attr("name"));
            let is_social = property.is_some_and(|property| {
                OPENGRAPH_PROPERTIES
                    .iter()
                    .any(|known| property.eq_ignore_ascii_case(known))
            });
            if is_social {
                urls.extend(element.attr("content").map(|content| (CheckKind::OpenGraph, content)));
            }
        }
        _ => {}
    }
    urls
}

/// The URL part of each `srcset` candidate ("a.png 1x, b.png 2x").
fn srcset_urls(srcset: &str) -> impl Iterator<Item = &str> {
    srcset
        .split(',')
        .filter_map(|candidate| candidate.split_ascii_whitespace().next())
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why key the two maps differently?
//    - An external URL means the same thing on every page, so the
//      normalized form is the key and each URL is requested once
//    - An internal URL like "../guide.html" means a different file on
//      every page, so it's kept as written and resolved per occurrence
//
// 2. What does `.entry(key).or_default()` do?
//    - Looks up the key and inserts an empty Vec if it's missing
//    - Returns a mutable reference either way, so we can push onto it
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const PAGE: &str = r##"<html>
<head>
  <link rel="stylesheet" href="/css/site.css">
  <link rel="preconnect" href="https://fonts.example.test">
  <meta property="og:image" content="https://cdn.example.test/card.png">
  <script src="//cdn.example.test/app.js"></script>
</head>
<body>
  <a href="guide.html#install">Guide</a>
  <a href="https://example.test/about">About</a>
  <a href="mailto:team@example.test">Mail</a>
  <a href="javascript:void(0)">Nothing</a>
  <img src="data:image/png;base64,iVBORw0KGgo=" alt="">
  <img src="/img/a.png" srcset="/img/a-2x.png 2x, /img/a-3x.png 3x" alt="">
  <p data-proofer-ignore><a href="broken.html">ignored</a></p>
  <a href="#">top</a>
</body>
</html>"##;

    fn run(config: &Config, html: &str) -> Extracted {
        extract_urls(
            config,
            Path::new("site"),
            Path::new("site/index.html"),
            &Document::parse(html),
        )
    }

    #[test]
    fn test_default_checks_sort_urls() {
        let extracted = run(&Config::default(), PAGE);

        let internal: Vec<&str> = extracted.internal.keys().map(String::as_str).collect();
        assert_eq!(
            internal,
            vec![
                "/css/site.css",
                "/img/a-2x.png",
                "/img/a-3x.png",
                "/img/a.png",
                "guide.html#install",
            ]
        );

        let external: Vec<&str> = extracted.external.keys().map(String::as_str).collect();
        assert_eq!(
            external,
            vec!["https://cdn.example.test/app.js", "https://example.test/about"]
        );
        assert!(extracted.failures.is_empty());
    }

    #[test]
    fn test_occurrences_carry_location() {
        let extracted = run(&Config::default(), PAGE);

        let guide = &extracted.internal["guide.html#install"][0];
        assert_eq!(guide.source, PathBuf::from("site"));
        assert_eq!(guide.filename, PathBuf::from("site/index.html"));
        assert_eq!(guide.line, Some(9));
        assert_eq!(guide.base_url, None);

        let about = &extracted.external["https://example.test/about"][0];
        assert_eq!(about.line, Some(10));
    }

    #[test]
    fn test_opengraph_only_when_enabled() {
        let config = Config {
            checks: vec![CheckKind::OpenGraph],
            ..Config::default()
        };
        let extracted = run(&config, PAGE);
        assert!(extracted.internal.is_empty());
        assert_eq!(
            extracted.external.keys().collect::<Vec<_>>(),
            vec!["https://cdn.example.test/card.png"]
        );
    }

    #[test]
    fn test_bare_hash_can_be_rejected() {
        let config = Config {
            allow_hash_href: false,
            ..Config::default()
        };
        let extracted = run(&config, PAGE);

        assert_eq!(extracted.failures.len(), 1);
        let failure = &extracted.failures[0];
        assert_eq!(failure.kind, FailureKind::EmptyHash);
        assert_eq!(failure.check_name, "Links");
        assert_eq!(failure.line, Some(16));
        assert_eq!(failure.content.as_deref(), Some(r##"<a href="#">top</a>"##));
    }

    #[test]
    fn test_enforce_https() {
        let config = Config {
            enforce_https: true,
            ..Config::default()
        };
        let extracted = run(&config, r#"<a href="http://example.test/">insecure</a>"#);

        assert_eq!(extracted.failures.len(), 1);
        assert_eq!(extracted.failures[0].kind, FailureKind::InsecureLink);
        assert_eq!(
            extracted.failures[0].description,
            "http://example.test/ is not an HTTPS link"
        );
        // Still checked for reachability.
        assert_eq!(extracted.external.len(), 1);
    }

    #[test]
    fn test_ignore_urls_and_base_url() {
        let config = Config {
            ignore_urls: vec!["/^https://example\\.test/".parse().unwrap()],
            ..Config::default()
        };
        let html = r#"<base href="/docs/"><a href="page.html">x</a><a href="https://example.test/x">y</a>"#;
        let extracted = run(&config, html);

        assert!(extracted.external.is_empty());
        let page = &extracted.internal["page.html"][0];
        assert_eq!(page.base_url.as_deref(), Some("/docs/"));
    }

    #[test]
    fn test_absolute_base_makes_relative_links_external() {
        let html = r#"<base href="https://docs.example.test/v1/"><a href="guide.html">x</a>"#;
        let extracted = run(&Config::default(), html);
        assert!(extracted.internal.is_empty());
        assert!(extracted
            .external
            .contains_key("https://docs.example.test/v1/guide.html"));
    }

    #[test]
    fn test_srcset_candidates() {
        let urls: Vec<&str> = srcset_urls("a.png 1x,  b.png 2x , c.png").collect();
        assert_eq!(urls, vec!["a.png", "b.png", "c.png"]);
    }
}
