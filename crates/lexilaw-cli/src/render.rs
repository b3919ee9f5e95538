//! Plain-text rendering of lookup and comparison results.

use std::fmt::Write;

use lexilaw_common::model::{ComparisonReport, DictionaryEntry};

const BAR_CELLS: usize = 20;
const INDENT: &str = "      ";

pub fn render_entry(entry: &DictionaryEntry) -> String {
    format!("== Result: {} ==\n\n{}\n", entry.query, entry.text.trim_end())
}

/// Fixed-width bar, one cell per five points.
pub fn score_bar(score: u8) -> String {
    let filled = (usize::from(score.min(100)) * BAR_CELLS) / 100;
    format!(
        "[{}{}]",
        "#".repeat(filled),
        ".".repeat(BAR_CELLS - filled)
    )
}

pub fn render_report(report: &ComparisonReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Reference: {}", report.reference);
    for item in &report.analysis {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:>4}  {} {}",
            item.score,
            score_bar(item.score),
            item.tier().label()
        );
        let _ = writeln!(out, "{INDENT}{}", item.term);
        for line in item.reason.lines() {
            let _ = writeln!(out, "{INDENT}{line}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use lexilaw_common::model::ComparisonResultItem;

    use super::*;

    #[test]
    fn bar_scales_to_twenty_cells() {
        assert_eq!(score_bar(0), format!("[{}]", ".".repeat(20)));
        assert_eq!(score_bar(100), format!("[{}]", "#".repeat(20)));
        assert_eq!(score_bar(62), "[############........]");
        assert_eq!(score_bar(4), format!("[{}]", ".".repeat(20)));
    }

    #[test]
    fn entry_has_header_and_trimmed_body() {
        let entry = DictionaryEntry {
            query: "tort".to_string(),
            text: "**tort** 侵权行为\n\n- A civil wrong.\n\n".to_string(),
        };
        assert_eq!(
            render_entry(&entry),
            "== Result: tort ==\n\n**tort** 侵权行为\n\n- A civil wrong.\n"
        );
    }

    #[test]
    fn report_lists_items_in_given_order_with_tiers() {
        let report = ComparisonReport {
            reference: "不可抗力".to_string(),
            analysis: vec![
                ComparisonResultItem {
                    term: "force majeure".to_string(),
                    score: 95,
                    reason: "Standard equivalent.".to_string(),
                },
                ComparisonResultItem {
                    term: "accident".to_string(),
                    score: 20,
                    reason: "Too general.\nNot a term of art.".to_string(),
                },
            ],
        };
        let rendered = render_report(&report);
        let expected = "\
Reference: 不可抗力

  95  [###################.] strong
      force majeure
      Standard equivalent.

  20  [####................] weak
      accident
      Too general.
      Not a term of art.
";
        assert_eq!(rendered, expected);
    }
}
