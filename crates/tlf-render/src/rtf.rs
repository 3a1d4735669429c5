//! RTF table layout.
//!
//! One RTF table row per summary row, Courier New 9pt, letter landscape.
//! Column widths are character counts converted to twips. Every byte of
//! output is ASCII; other characters are written as `\uN?` escapes.

use std::fmt::Write;

use tlf_core::{RowKind, SummaryTable};

use crate::spec::RenderSpec;

/// Twips per character for Courier New at 9pt.
const TWIPS_PER_CHAR: usize = 108;
/// Twips of left indent per indent level.
const TWIPS_PER_INDENT: usize = 216;

const PROLOGUE: &str = "{\\rtf1\\ansi\\ansicpg1252\\deff0\n\
{\\fonttbl{\\f0\\fmodern\\fcharset0 Courier New;}}\n\
\\paperw15840\\paperh12240\\margl1440\\margr1440\\margt1440\\margb1440\\landscape\n\
\\f0\\fs18\n";

pub(crate) fn render(table: &SummaryTable, spec: &RenderSpec, widths: &[usize]) -> String {
    let mut out = String::from(PROLOGUE);

    let _ = writeln!(out, "{{\\pard\\qc\\b {}\\b0\\par}}", escape(&spec.title));
    for subtitle in &spec.subtitles {
        let _ = writeln!(out, "{{\\pard\\qc {}\\par}}", escape(subtitle));
    }
    out.push_str("{\\pard\\par}\n");

    let edges: Vec<usize> = widths
        .iter()
        .scan(0, |edge, w| {
            *edge += w * TWIPS_PER_CHAR;
            Some(*edge)
        })
        .collect();

    let mut header = vec![(table.stub_header.as_str(), 0)];
    header.extend(table.columns.iter().map(|c| (c.as_str(), 0)));
    table_row(&mut out, &edges, &header, Border::TopBottom, true);

    let rows = table.rows();
    for (i, row) in rows.iter().enumerate() {
        let border = if i + 1 == rows.len() {
            Border::Bottom
        } else {
            Border::None
        };
        let displays: Vec<String> = match row.kind {
            RowKind::Data => row.cells.iter().map(tlf_core::Statistic::display).collect(),
            RowKind::Header | RowKind::Blank => vec![String::new(); table.width()],
        };
        let mut cells = vec![(row.label.as_str(), usize::from(row.indent))];
        cells.extend(displays.iter().map(|d| (d.as_str(), 0)));
        table_row(&mut out, &edges, &cells, border, false);
    }

    for note in &spec.footnotes {
        let _ = writeln!(out, "{{\\pard\\ql {}\\par}}", escape(note));
    }
    out.push_str("}\n");
    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Border {
    None,
    Bottom,
    TopBottom,
}

fn table_row(
    out: &mut String,
    edges: &[usize],
    cells: &[(&str, usize)],
    border: Border,
    header: bool,
) {
    out.push_str("\\trowd\\trgaph54\\trleft0");
    if header {
        out.push_str("\\trhdr");
    }
    for edge in edges {
        if border == Border::TopBottom {
            out.push_str("\\clbrdrt\\brdrs\\brdrw10");
        }
        if border != Border::None {
            out.push_str("\\clbrdrb\\brdrs\\brdrw10");
        }
        let _ = write!(out, "\\cellx{edge}");
    }
    out.push('\n');

    for (i, (text, indent)) in cells.iter().enumerate() {
        let align = if i == 0 { "\\ql" } else { "\\qc" };
        let _ = write!(out, "\\pard\\intbl{align}");
        if *indent > 0 {
            let _ = write!(out, "\\li{}", indent * TWIPS_PER_INDENT);
        }
        let _ = writeln!(out, " {}\\cell", escape(text));
    }
    out.push_str("\\row\n");
}

/// Escape RTF control characters; non-ASCII becomes `\uN?`.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\n' => out.push_str("\\line "),
            c if c.is_ascii() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    // RTF \u takes a signed 16-bit value.
                    #[allow(clippy::cast_possible_wrap)]
                    let signed = *unit as i16;
                    let _ = write!(out, "\\u{signed}?");
                }
            }
        }
    }
    out
}
