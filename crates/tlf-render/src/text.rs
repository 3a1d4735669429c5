//! Fixed-width plain-text layout.
//!
//! Title and subtitles are centred over the table width. Stub labels are
//! left aligned and indented, group cells are centred. Text wider than its
//! column wraps at spaces, and words longer than a column are split.

use tlf_core::{RowKind, SummaryTable};

use crate::spec::{INDENT_WIDTH, RenderSpec};

const SEPARATOR: &str = "  ";

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
}

pub(crate) fn render(table: &SummaryTable, spec: &RenderSpec, widths: &[usize]) -> String {
    let total = widths.iter().sum::<usize>() + SEPARATOR.len() * widths.len().saturating_sub(1);
    let rule = "-".repeat(total);
    let mut lines: Vec<String> = Vec::new();

    for heading in std::iter::once(&spec.title).chain(&spec.subtitles) {
        lines.extend(wrap(heading, total).iter().map(|l| pad(l, total, Align::Center)));
    }
    lines.push(String::new());
    lines.push(rule.clone());

    let mut header = vec![(table.stub_header.clone(), Align::Left)];
    header.extend(table.columns.iter().map(|c| (c.clone(), Align::Center)));
    lines.extend(row_lines(&header, widths));
    lines.push(rule.clone());

    for row in table.rows() {
        match row.kind {
            RowKind::Blank => lines.push(String::new()),
            RowKind::Header | RowKind::Data => {
                let indent = " ".repeat(usize::from(row.indent) * INDENT_WIDTH);
                let mut cells = vec![(format!("{indent}{}", row.label), Align::Left)];
                if row.kind == RowKind::Data {
                    cells.extend(row.cells.iter().map(|c| (c.display(), Align::Center)));
                }
                lines.extend(row_lines(&cells, widths));
            }
        }
    }
    lines.push(rule);

    for note in &spec.footnotes {
        lines.extend(wrap(note, total));
    }

    let mut out = lines
        .iter()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    out.push('\n');
    out
}

/// Physical lines of one logical row; every column wraps independently.
fn row_lines(cells: &[(String, Align)], widths: &[usize]) -> Vec<String> {
    let wrapped: Vec<Vec<String>> = cells
        .iter()
        .zip(widths)
        .map(|((text, _), &w)| wrap(text, w))
        .collect();
    let height = wrapped.iter().map(Vec::len).max().unwrap_or(1);

    (0..height)
        .map(|line| {
            cells
                .iter()
                .zip(&wrapped)
                .zip(widths)
                .map(|(((_, align), parts), &w)| {
                    pad(parts.get(line).map_or("", String::as_str), w, *align)
                })
                .collect::<Vec<_>>()
                .join(SEPARATOR)
        })
        .collect()
}

fn pad(text: &str, width: usize, align: Align) -> String {
    let len = text.chars().count();
    let room = width.saturating_sub(len);
    let left = match align {
        Align::Left => 0,
        Align::Center => room / 2,
    };
    format!("{}{text}{}", " ".repeat(left), " ".repeat(room - left))
}

/// Greedy word wrap to `width` characters. Leading indentation is kept on
/// the first line and repeated on continuation lines.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    if text.chars().count() <= width {
        return vec![text.to_string()];
    }

    let indent_len = text.len() - text.trim_start_matches(' ').len();
    let indent = " ".repeat(indent_len.min(width.saturating_sub(1)));
    let room = width - indent.len();

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > room {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..room).collect());
        }
        if word.is_empty() {
            continue;
        }
        let word: String = word.into_iter().collect();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > room {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.into_iter().map(|l| format!("{indent}{l}")).collect()
}
