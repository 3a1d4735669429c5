//! Summary tables produced by the statistics modules.
//!
//! A [`SummaryTable`] is the hand-off between computation and rendering. It
//! keeps statistics typed; formatting into display strings happens in the
//! renderer through [`Statistic::display`].

use serde::{Deserialize, Serialize};

/// One computed statistic in a table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statistic {
    Empty,
    Count { n: u64 },
    CountPct { n: u64, pct: f64 },
    MeanSd { mean: f64, sd: Option<f64> },
    MedianRange { median: f64, min: f64, max: f64 },
    Number { value: f64, decimals: u8 },
    Estimate { value: f64, se: f64 },
    Interval { lower: f64, upper: f64, level: f64 },
    PValue { p: f64 },
    Text { text: String },
}

impl Statistic {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Whether every number in the statistic is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Empty | Self::Count { .. } | Self::Text { .. } => true,
            Self::CountPct { pct, .. } => pct.is_finite(),
            Self::MeanSd { mean, sd } => mean.is_finite() && sd.is_none_or(f64::is_finite),
            Self::MedianRange { median, min, max } => {
                median.is_finite() && min.is_finite() && max.is_finite()
            }
            Self::Number { value, .. } => value.is_finite(),
            Self::Estimate { value, se } => value.is_finite() && se.is_finite(),
            Self::Interval { lower, upper, level } => {
                lower.is_finite() && upper.is_finite() && level.is_finite()
            }
            Self::PValue { p } => p.is_finite(),
        }
    }

    /// Display string in the conventional clinical-table layout.
    ///
    /// `n (pct%)`, `mean (sd)`, `median [min, max]`, `est (se)`,
    /// `(lower, upper)`, p-values below 0.001 as `<0.001`.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Count { n } => n.to_string(),
            Self::CountPct { n, pct } => format!("{n} ({pct:.1}%)"),
            Self::MeanSd { mean, sd } => match sd {
                Some(sd) => format!("{mean:.1} ({sd:.2})"),
                None => format!("{mean:.1} (-)"),
            },
            Self::MedianRange { median, min, max } => {
                format!("{median:.1} [{min:.1}, {max:.1}]")
            }
            Self::Number { value, decimals } => {
                format!("{value:.prec$}", prec = *decimals as usize)
            }
            Self::Estimate { value, se } => format!("{value:.2} ({se:.2})"),
            Self::Interval { lower, upper, .. } => format!("({lower:.2}, {upper:.2})"),
            Self::PValue { p } => {
                if *p < 0.001 {
                    String::from("<0.001")
                } else {
                    format!("{p:.3}")
                }
            }
            Self::Text { text } => text.clone(),
        }
    }
}

/// Row role within a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    /// Section label with no statistics (e.g. a variable or SOC name).
    Header,
    Data,
    Blank,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub label: String,
    pub indent: u8,
    pub kind: RowKind,
    pub cells: Vec<Statistic>,
}

impl SummaryRow {
    #[must_use]
    pub fn data(label: impl Into<String>, indent: u8, cells: Vec<Statistic>) -> Self {
        Self {
            label: label.into(),
            indent,
            kind: RowKind::Data,
            cells,
        }
    }

    #[must_use]
    pub fn header(label: impl Into<String>, width: usize) -> Self {
        Self {
            label: label.into(),
            indent: 0,
            kind: RowKind::Header,
            cells: vec![Statistic::Empty; width],
        }
    }

    #[must_use]
    pub fn blank(width: usize) -> Self {
        Self {
            label: String::new(),
            indent: 0,
            kind: RowKind::Blank,
            cells: vec![Statistic::Empty; width],
        }
    }
}

/// A computed summary table: stub column header, one column per group, rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    pub stub_header: String,
    pub columns: Vec<String>,
    rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// A table with a header and no rows.
    #[must_use]
    pub fn empty(stub_header: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            stub_header: stub_header.into(),
            columns,
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    #[must_use]
    pub fn data_row_count(&self) -> usize {
        self.rows.iter().filter(|r| r.kind == RowKind::Data).count()
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

/// Builder used by the statistics modules; `finish` freezes the table.
#[derive(Debug)]
pub struct TableBuilder {
    table: SummaryTable,
}

impl TableBuilder {
    #[must_use]
    pub fn new(stub_header: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: SummaryTable::empty(stub_header, columns),
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.table.width()
    }

    /// Append a row, padding or truncating cells to the table width.
    pub fn push(&mut self, mut row: SummaryRow) -> &mut Self {
        row.cells.resize(self.table.width(), Statistic::Empty);
        self.table.rows.push(row);
        self
    }

    pub fn header(&mut self, label: impl Into<String>) -> &mut Self {
        let width = self.width();
        self.push(SummaryRow::header(label, width))
    }

    pub fn blank(&mut self) -> &mut Self {
        let width = self.width();
        self.push(SummaryRow::blank(width))
    }

    #[must_use]
    pub fn finish(self) -> SummaryTable {
        self.table
    }
}
