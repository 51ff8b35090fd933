// src/report.rs
// =============================================================================
// Turns a finished run into text or JSON for stdout.
//
// Failures are grouped by check name and sorted by (file, line) inside each
// group, whatever order the validators produced them in.
//
// Text output looks like:
//
//   For the Links > Internal check, the following failures were found:
//
//   * site/index.html:4: internally linking to x.html, which does not exist
//
//   📊 Summary:
//      📄 Documents: 3
//      ...
// =============================================================================

use crate::checker::Failure;
use crate::runner::RunOutcome;
use std::fmt::Write;

/// Sorts by check name, then path, then line. Equal keys keep their order.
pub fn sort_failures(failures: &mut [Failure]) {
    failures.sort_by(|a, b| {
        a.check_name
            .cmp(&b.check_name)
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| a.line.cmp(&b.line))
    });
}

pub fn render_json(outcome: &RunOutcome) -> serde_json::Result<String> {
    serde_json::to_string_pretty(outcome)
}

pub fn render_text(outcome: &RunOutcome) -> String {
    let mut out = String::new();

    let mut current_check: Option<&str> = None;
    for failure in &outcome.failures {
        if current_check != Some(failure.check_name.as_str()) {
            current_check = Some(failure.check_name.as_str());
            let _ = writeln!(
                out,
                "For the {} check, the following failures were found:\n",
                failure.check_name
            );
        }
        // Continuation lines of multi-line messages line up under the text.
        let text = failure.to_string().replace('\n', "\n  ");
        let _ = writeln!(out, "* {text}\n");
    }

    if outcome.failures.is_empty() {
        let _ = writeln!(out, "✅ No broken links found\n");
    }

    let _ = writeln!(out, "📊 Summary:");
    let _ = writeln!(out, "   📄 Documents: {}", outcome.documents);
    let _ = writeln!(
        out,
        "   🔗 Links: {} internal, {} external",
        outcome.internal_urls, outcome.external_urls
    );
    let _ = writeln!(out, "   ❌ Failures: {}", outcome.failures.len());
    out
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why write into a String instead of calling println! directly?
//    - Tests can look at the output without capturing stdout
//    - main.rs decides where the text goes
//
// 2. Why `let _ = writeln!(...)`?
//    - Writing to a String can't fail, but `fmt::Write` still returns a
//      Result, and ignoring it silently would trigger a warning
// -----------------------------------------------------------------------------
