//! Document layout options and their validation against a table.

use serde::{Deserialize, Serialize};
use tlf_config::RenderConfig;
use tlf_core::{DocumentFormat, RowKind, SummaryTable};

use crate::error::RenderError;

/// Narrowest column chosen when widths are derived from content.
const MIN_COLUMN_WIDTH: usize = 8;

/// Spaces per indent level of a row label.
pub const INDENT_WIDTH: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSpec {
    pub title: String,
    pub subtitles: Vec<String>,
    pub footnotes: Vec<String>,
    /// Character widths: stub column first, then one per group column.
    /// Derived from the table content when absent.
    pub column_widths: Option<Vec<u16>>,
    pub format: DocumentFormat,
}

impl From<&RenderConfig> for RenderSpec {
    fn from(config: &RenderConfig) -> Self {
        Self {
            title: config.title.clone(),
            subtitles: config.subtitles.clone(),
            footnotes: config.footnotes.clone(),
            column_widths: config.column_widths.clone(),
            format: config.format,
        }
    }
}

impl RenderSpec {
    #[must_use]
    pub fn new(title: impl Into<String>, format: DocumentFormat) -> Self {
        Self {
            title: title.into(),
            format,
            ..Self::default()
        }
    }

    /// Checks that need no table: a title and no zero widths.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidSpec`].
    pub fn check(&self) -> Result<(), RenderError> {
        if self.title.trim().is_empty() {
            return Err(invalid("title must not be empty"));
        }
        if let Some(widths) = &self.column_widths {
            if widths.is_empty() {
                return Err(invalid("column_widths must not be empty"));
            }
            if let Some(i) = widths.iter().position(|&w| w == 0) {
                return Err(invalid(format!("column_widths[{i}] is zero")));
            }
        }
        Ok(())
    }

    /// Column widths for `table`, stub first.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidSpec`] when the spec fails [`Self::check`] or
    /// the configured widths do not match the table's column count.
    pub fn widths_for(&self, table: &SummaryTable) -> Result<Vec<usize>, RenderError> {
        self.check()?;
        let expected = table.width() + 1;
        match &self.column_widths {
            Some(widths) if widths.len() != expected => Err(invalid(format!(
                "{} column widths for {expected} columns (stub + {})",
                widths.len(),
                table.width()
            ))),
            Some(widths) => Ok(widths.iter().map(|&w| usize::from(w)).collect()),
            None => Ok(content_widths(table)),
        }
    }
}

fn invalid(reason: impl Into<String>) -> RenderError {
    RenderError::InvalidSpec {
        reason: reason.into(),
    }
}

/// Widest label or cell per column.
fn content_widths(table: &SummaryTable) -> Vec<usize> {
    let stub = table
        .rows()
        .iter()
        .map(|r| usize::from(r.indent) * INDENT_WIDTH + r.label.chars().count())
        .chain(std::iter::once(table.stub_header.chars().count()))
        .max()
        .unwrap_or(0)
        .max(MIN_COLUMN_WIDTH);

    let mut widths = vec![stub];
    for (i, header) in table.columns.iter().enumerate() {
        let cells = table
            .rows()
            .iter()
            .filter(|r| r.kind == RowKind::Data)
            .filter_map(|r| r.cells.get(i))
            .map(|c| c.display().chars().count())
            .max()
            .unwrap_or(0);
        widths.push(cells.max(header.chars().count()).max(MIN_COLUMN_WIDTH));
    }
    widths
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tlf_core::{Statistic, SummaryRow, TableBuilder};

    use super::*;

    fn table() -> SummaryTable {
        let mut builder =
            TableBuilder::new("Disposition", vec!["Placebo".into(), "Xanomeline".into()]);
        builder.push(SummaryRow::data(
            "Participants in population",
            0,
            vec![Statistic::Count { n: 86 }, Statistic::Count { n: 84 }],
        ));
        builder.finish()
    }

    #[test]
    fn widths_follow_content() {
        let spec = RenderSpec::new("Table 1", DocumentFormat::Txt);
        assert_eq!(spec.widths_for(&table()).expect("widths"), vec![26, 8, 10]);
    }

    #[rstest]
    #[case::empty_title("", None)]
    #[case::blank_title("   ", None)]
    #[case::zero_width("T", Some(vec![30, 0, 10]))]
    #[case::wrong_count("T", Some(vec![30, 10]))]
    #[case::no_widths("T", Some(vec![]))]
    fn invalid_specs_are_rejected(#[case] title: &str, #[case] widths: Option<Vec<u16>>) {
        let spec = RenderSpec {
            column_widths: widths,
            ..RenderSpec::new(title, DocumentFormat::Txt)
        };
        assert!(matches!(
            spec.widths_for(&table()),
            Err(RenderError::InvalidSpec { .. })
        ));
    }

    #[test]
    fn config_converts_field_by_field() {
        let config = RenderConfig {
            title: "Baseline".into(),
            footnotes: vec!["SD = standard deviation".into()],
            column_widths: Some(vec![30, 12]),
            format: DocumentFormat::Rtf,
            ..RenderConfig::default()
        };
        let spec = RenderSpec::from(&config);
        assert_eq!(spec.title, "Baseline");
        assert_eq!(spec.format, DocumentFormat::Rtf);
        assert_eq!(spec.column_widths, Some(vec![30, 12]));
    }
}
