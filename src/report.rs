use unicode_width::UnicodeWidthStr;

use crate::diagnostic::{Diagnostic, Severity};

const HEADINGS: [&str; 4] = ["SEVERITY", "ELEMENT", "KIND", "DESCRIPTION"];
const GAP: &str = "  ";

pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(s));
    format!("{s}{}", " ".repeat(fill))
}

/// Renders diagnostics as an aligned table, errors first. Empty input gives an
/// empty string.
pub fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return String::new();
    }
    let mut sorted: Vec<&Diagnostic> = diagnostics.iter().collect();
    sorted.sort_by_key(|d| d.severity);

    let rows: Vec<[String; 4]> = sorted
        .iter()
        .map(|d| {
            [
                d.severity.to_string(),
                d.element_id.clone(),
                d.short_label().to_string(),
                d.description.clone(),
            ]
        })
        .collect();

    let mut widths = HEADINGS.map(display_width);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_row(&HEADINGS.map(String::from), &widths));
    lines.extend(rows.iter().map(|row| format_row(row, &widths)));
    lines.join("\n") + "\n"
}

fn format_row(cells: &[String; 4], widths: &[usize; 4]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| pad(cell, width))
        .collect::<Vec<_>>()
        .join(GAP);
    line.trim_end().to_string()
}

/// One-line tally such as `2 errors, 1 warning`.
pub fn summary(diagnostics: &[Diagnostic]) -> String {
    let count = |severity: Severity| diagnostics.iter().filter(|d| d.severity == severity).count();
    let plural = |n: usize, word: &str| {
        if n == 1 {
            format!("{n} {word}")
        } else {
            format!("{n} {word}s")
        }
    };
    let mut parts = vec![
        plural(count(Severity::Error), "error"),
        plural(count(Severity::Warning), "warning"),
    ];
    let infos = count(Severity::Info);
    if infos > 0 {
        parts.push(format!("{infos} info"));
    }
    parts.join(", ")
}
