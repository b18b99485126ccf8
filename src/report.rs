use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::export::ExportColumn;

const PRINT_STYLE: &str = "\
body { font-family: Arial, Helvetica, sans-serif; margin: 24px; color: #1f2933; }
h1 { font-size: 20px; margin-bottom: 4px; }
.meta { font-size: 12px; color: #52606d; margin-bottom: 16px; }
table { width: 100%; border-collapse: collapse; font-size: 12px; }
th, td { border: 1px solid #cbd2d9; padding: 6px 8px; text-align: left; }
th { background: #e4f7ec; }
tr:nth-child(even) td { background: #f5f7fa; }
@media print { body { margin: 0; } }";

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Standalone printable document: title, generation time, record count and
/// one table row per record. Absent values render as empty cells.
pub fn render_html<T>(
    title: &str,
    records: &[T],
    columns: &[ExportColumn<T>],
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();
    let title = escape_html(title);

    let _ = writeln!(output, "<!DOCTYPE html>");
    let _ = writeln!(output, "<html lang=\"en\">");
    let _ = writeln!(output, "<head>");
    let _ = writeln!(output, "<meta charset=\"utf-8\">");
    let _ = writeln!(output, "<title>{title}</title>");
    let _ = writeln!(output, "<style>\n{PRINT_STYLE}\n</style>");
    let _ = writeln!(output, "</head>");
    let _ = writeln!(output, "<body>");
    let _ = writeln!(output, "<h1>{title}</h1>");
    let _ = writeln!(
        output,
        "<p class=\"meta\">Generated {} &middot; {} records</p>",
        generated_at.format("%b %-d, %Y %H:%M UTC"),
        records.len()
    );

    let _ = writeln!(output, "<table>");
    let _ = write!(output, "<thead><tr>");
    for column in columns {
        let _ = write!(output, "<th>{}</th>", escape_html(&column.header));
    }
    let _ = writeln!(output, "</tr></thead>");

    let _ = writeln!(output, "<tbody>");
    for record in records {
        let _ = write!(output, "<tr>");
        for column in columns {
            let cell = column
                .value(record)
                .map(|value| escape_html(&value.to_string()))
                .unwrap_or_default();
            let _ = write!(output, "<td>{cell}</td>");
        }
        let _ = writeln!(output, "</tr>");
    }
    let _ = writeln!(output, "</tbody>");
    let _ = writeln!(output, "</table>");
    let _ = writeln!(output, "</body>");
    let _ = writeln!(output, "</html>");

    output
}
