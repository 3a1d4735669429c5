//! # tlf-render
//!
//! Turns a [`SummaryTable`] into document bytes and persists them:
//! - [`RenderSpec`]: title, subtitles, footnotes, column widths, format
//! - [`render`]: fixed-width text or RTF, byte-identical for identical input
//! - [`write_artifact`]: atomic write of `<report_id>.<ext>`

pub mod error;
mod rtf;
pub mod spec;
mod text;
pub mod writer;

pub use error::RenderError;
pub use spec::RenderSpec;
pub use writer::{ReportArtifact, digest, write_artifact, write_atomic};

use tlf_core::{DocumentFormat, SummaryTable};

/// Render `table` in the format named by `spec`.
///
/// # Errors
///
/// [`RenderError::InvalidSpec`] when the spec cannot lay out the table and
/// [`RenderError::UnsupportedStatistic`] for non-finite numbers.
pub fn render(table: &SummaryTable, spec: &RenderSpec) -> Result<Vec<u8>, RenderError> {
    let widths = spec.widths_for(table)?;

    for row in table.rows() {
        if let Some((column, _)) = table
            .columns
            .iter()
            .zip(&row.cells)
            .find(|(_, cell)| !cell.is_finite())
        {
            return Err(RenderError::UnsupportedStatistic {
                row: row.label.clone(),
                column: column.clone(),
                reason: "non-finite number".into(),
            });
        }
    }

    let document = match spec.format {
        DocumentFormat::Txt => text::render(table, spec, &widths),
        DocumentFormat::Rtf => rtf::render(table, spec, &widths),
    };
    Ok(document.into_bytes())
}
