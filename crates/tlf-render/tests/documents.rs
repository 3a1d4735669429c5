use pretty_assertions::assert_eq;
use rstest::rstest;
use tlf_core::{DocumentFormat, Statistic, SummaryRow, SummaryTable, TableBuilder};
use tlf_render::{RenderError, RenderSpec, render, write_artifact};

fn disposition() -> SummaryTable {
    let mut table = TableBuilder::new("Disposition", vec!["Placebo".into(), "Total".into()]);
    table
        .push(SummaryRow::data(
            "Participants in population",
            0,
            vec![Statistic::Count { n: 86 }, Statistic::Count { n: 254 }],
        ))
        .push(SummaryRow::data(
            "Completed",
            0,
            vec![
                Statistic::CountPct { n: 58, pct: 67.4 },
                Statistic::CountPct { n: 110, pct: 43.3 },
            ],
        ))
        .blank()
        .header("Reason")
        .push(SummaryRow::data(
            "Adverse Event",
            1,
            vec![
                Statistic::CountPct { n: 8, pct: 9.3 },
                Statistic::CountPct { n: 92, pct: 36.2 },
            ],
        ));
    table.finish()
}

fn spec(format: DocumentFormat) -> RenderSpec {
    RenderSpec {
        subtitles: vec!["(All Participants Randomized)".into()],
        footnotes: vec!["Percentages are based on N in each group.".into()],
        ..RenderSpec::new("Disposition of Participants", format)
    }
}

#[test]
fn text_layout() {
    let bytes = render(&disposition(), &spec(DocumentFormat::Txt)).expect("render");
    let text = String::from_utf8(bytes).expect("utf8");
    let pad = |n: usize| " ".repeat(n);
    let rule = "-".repeat(51);
    let expected = [
        format!("{}Disposition of Participants", pad(12)),
        format!("{}(All Participants Randomized)", pad(11)),
        String::new(),
        rule.clone(),
        format!("Disposition{}Placebo{}Total", pad(18), pad(7)),
        rule.clone(),
        format!("Participants in population{}86{}254", pad(6), pad(10)),
        format!("Completed{}58 (67.4%)  110 (43.3%)", pad(19)),
        String::new(),
        "Reason".to_string(),
        format!("  Adverse Event{}8 (9.3%)   92 (36.2%)", pad(14)),
        rule,
        "Percentages are based on N in each group.".to_string(),
    ]
    .join("\n")
        + "\n";
    assert_eq!(text, expected);
}

#[rstest]
#[case::txt(DocumentFormat::Txt)]
#[case::rtf(DocumentFormat::Rtf)]
fn rendering_twice_is_byte_identical(#[case] format: DocumentFormat) {
    let table = disposition();
    let spec = spec(format);
    assert_eq!(
        render(&table, &spec).expect("first"),
        render(&table, &spec).expect("second")
    );
}

#[test]
fn rtf_is_ascii_and_balanced() {
    let bytes = render(&disposition(), &spec(DocumentFormat::Rtf)).expect("render");
    assert!(bytes.is_ascii());
    let text = String::from_utf8(bytes).expect("utf8");
    assert!(text.starts_with("{\\rtf1"));
    assert!(text.contains("\\trhdr"));
    assert_eq!(text.matches("\\row").count(), 1 + disposition().rows().len());
    let unescaped = text.replace("\\{", "").replace("\\}", "");
    assert_eq!(unescaped.matches('{').count(), unescaped.matches('}').count());
}

#[test]
fn configured_widths_must_match_columns() {
    let spec = RenderSpec {
        column_widths: Some(vec![30, 12]),
        ..spec(DocumentFormat::Txt)
    };
    assert!(matches!(
        render(&disposition(), &spec),
        Err(RenderError::InvalidSpec { .. })
    ));
}

#[test]
fn non_finite_statistics_are_unsupported() {
    let mut table = TableBuilder::new("Statistic", vec!["Drug".into()]);
    table.push(SummaryRow::data(
        "LS Mean (SE)",
        0,
        vec![Statistic::Estimate {
            value: f64::NAN,
            se: 1.0,
        }],
    ));
    let err = render(&table.finish(), &spec(DocumentFormat::Txt)).unwrap_err();
    assert!(
        matches!(err, RenderError::UnsupportedStatistic { ref row, ref column, .. }
            if row == "LS Mean (SE)" && column == "Drug")
    );
}

#[test]
fn empty_table_renders_header_only() {
    let table = SummaryTable::empty("Characteristic", vec!["Placebo".into()]);
    let text = String::from_utf8(render(&table, &spec(DocumentFormat::Txt)).expect("render"))
        .expect("utf8");
    assert!(text.contains("Characteristic"));
    assert!(text.contains("Placebo"));
}

#[test]
fn written_artifact_matches_rendered_bytes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bytes = render(&disposition(), &spec(DocumentFormat::Rtf)).expect("render");
    let artifact =
        write_artifact(dir.path(), "tbl_disp", DocumentFormat::Rtf, &bytes).expect("write");
    assert_eq!(artifact.path, dir.path().join("tbl_disp.rtf"));
    assert_eq!(std::fs::read(&artifact.path).expect("read"), bytes);
}
