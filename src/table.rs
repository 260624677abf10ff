use std::borrow::Cow;
use std::fmt::Write as _;

/// Renders rows as left-aligned columns separated by two spaces, with a dashed
/// rule under the header.
pub fn render_table<S: AsRef<str>>(headers: &[S], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers
        .iter()
        .map(|h| display_width(h.as_ref()))
        .collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row<S: AsRef<str>>(values: &[S], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let sanitized = sanitize_cell(value.as_ref());
            let padding = width.saturating_sub(display_width(&sanitized));
            let mut cell = sanitized.into_owned();
            cell.push_str(&" ".repeat(padding));
            cell
        })
        .collect::<Vec<_>>()
        .join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

/// Character count, treating CJK ideographs and fullwidth forms as two
/// columns so mixed-script tables stay aligned in a terminal.
fn display_width(value: &str) -> usize {
    value.chars().map(char_width).sum()
}

fn char_width(ch: char) -> usize {
    match ch as u32 {
        0x1100..=0x115F | 0x2E80..=0xA4CF | 0xAC00..=0xD7A3 | 0xF900..=0xFAFF | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60 | 0xFFE0..=0xFFE6 | 0x20000..=0x3FFFD => 2,
        _ => 1,
    }
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
