use pretty_assertions::assert_eq;
use rstest::rstest;
use tlf_core::{
    Column, DataType, Dataset, DatasetId, InputRole, RowKind, SchemaError, Statistic, SummaryRow,
    SummaryTable, Value,
};
use tlf_stats::{
    AeSpecificParams, AeSummaryParams, AnalysisInputs, AnalysisParameters, BaselineParams,
    ComputationError, DispositionParams, EfficacyParams, GroupSpec, PopulationParams, SortColumn,
    Variable, compute,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn strings(name: &str, values: &[Option<&str>]) -> Column {
    Column::new(
        name,
        DataType::Str,
        values.iter().map(|v| Value::from(*v)).collect(),
    )
    .expect("column")
}

fn floats(name: &str, values: &[f64]) -> Column {
    Column::new(
        name,
        DataType::Float,
        values.iter().map(|v| Value::from(*v)).collect(),
    )
    .expect("column")
}

/// Six subjects: three on Placebo, three on Drug.
fn adsl() -> Dataset {
    Dataset::new(
        DatasetId::new("adsl", "a"),
        vec![
            strings(
                "USUBJID",
                &[Some("01"), Some("02"), Some("03"), Some("04"), Some("05"), Some("06")],
            ),
            strings(
                "TRT01P",
                &[
                    Some("Placebo"),
                    Some("Placebo"),
                    Some("Placebo"),
                    Some("Drug"),
                    Some("Drug"),
                    Some("Drug"),
                ],
            ),
            strings(
                "TRT01A",
                &[
                    Some("Placebo"),
                    Some("Placebo"),
                    Some("Placebo"),
                    Some("Drug"),
                    Some("Drug"),
                    Some("Drug"),
                ],
            ),
            strings(
                "EOSSTT",
                &[
                    Some("COMPLETED"),
                    Some("DISCONTINUED"),
                    Some("COMPLETED"),
                    Some("DISCONTINUED"),
                    Some("DISCONTINUED"),
                    Some("COMPLETED"),
                ],
            ),
            strings(
                "DCSREAS",
                &[
                    None,
                    Some("Withdrawal by Subject"),
                    None,
                    Some("Adverse Event"),
                    Some("Withdrawal by Subject"),
                    None,
                ],
            ),
            strings("SAFFL", &[Some("Y"); 6]),
            strings(
                "ITTFL",
                &[Some("Y"), Some("Y"), Some("N"), Some("Y"), Some("Y"), Some("Y")],
            ),
            strings(
                "SEX",
                &[Some("F"), Some("M"), Some("F"), Some("F"), Some("M"), Some("M")],
            ),
            floats("AGE", &[60.0, 70.0, 80.0, 65.0, 75.0, 85.0]),
            floats("CHG", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
        ],
    )
    .expect("adsl")
}

fn adae() -> Dataset {
    Dataset::new(
        DatasetId::new("adae", "b"),
        vec![
            strings(
                "USUBJID",
                &[Some("01"), Some("01"), Some("04"), Some("05"), Some("99")],
            ),
            strings(
                "AEBODSYS",
                &[
                    Some("NERVOUS SYSTEM DISORDERS"),
                    Some("GASTROINTESTINAL DISORDERS"),
                    Some("NERVOUS SYSTEM DISORDERS"),
                    Some("NERVOUS SYSTEM DISORDERS"),
                    Some("CARDIAC DISORDERS"),
                ],
            ),
            strings(
                "AEDECOD",
                &[
                    Some("HEADACHE"),
                    Some("NAUSEA"),
                    Some("DIZZINESS"),
                    Some("HEADACHE"),
                    Some("PALPITATIONS"),
                ],
            ),
            strings(
                "AEREL",
                &[Some("PROBABLE"), Some("NONE"), Some("NONE"), Some("RELATED"), None],
            ),
            strings("AESER", &[Some("N"), Some("N"), Some("Y"), Some("Y"), Some("Y")]),
            strings(
                "AEOUT",
                &[
                    Some("RECOVERED"),
                    Some("RECOVERED"),
                    Some("FATAL"),
                    Some("RECOVERED"),
                    Some("FATAL"),
                ],
            ),
            strings(
                "AEACN",
                &[
                    Some("DOSE NOT CHANGED"),
                    Some("DRUG WITHDRAWN"),
                    Some("DOSE NOT CHANGED"),
                    Some("DOSE NOT CHANGED"),
                    Some("DRUG WITHDRAWN"),
                ],
            ),
        ],
    )
    .expect("adae")
}

fn groups(var: &str) -> GroupSpec {
    GroupSpec {
        var: var.into(),
        order: Some(vec!["Placebo".into(), "Drug".into()]),
        include_total: true,
    }
}

fn inputs() -> AnalysisInputs {
    AnalysisInputs::new()
        .with(InputRole::Subjects, adsl())
        .with(InputRole::Observations, adsl())
        .with(InputRole::Events, adae())
}

fn disposition() -> AnalysisParameters {
    AnalysisParameters::Disposition(DispositionParams {
        groups: groups("TRT01P"),
        subject_var: "USUBJID".into(),
        status_var: "EOSSTT".into(),
        completed_value: "COMPLETED".into(),
        discontinued_value: "DISCONTINUED".into(),
        reason_var: "DCSREAS".into(),
    })
}

fn population() -> AnalysisParameters {
    AnalysisParameters::Population(PopulationParams {
        groups: groups("TRT01P"),
        subject_var: "USUBJID".into(),
        populations: vec![
            tlf_stats::PopulationDef {
                label: "Participants included in ITT population".into(),
                flag_var: "ITTFL".into(),
                flag_value: "Y".into(),
            },
            tlf_stats::PopulationDef {
                label: "Participants included in efficacy population".into(),
                flag_var: "EFFFL".into(),
                flag_value: "Y".into(),
            },
        ],
        explicit: false,
    })
}

fn baseline() -> AnalysisParameters {
    AnalysisParameters::Baseline(BaselineParams {
        groups: groups("TRT01P"),
        subject_var: "USUBJID".into(),
        continuous: vec![Variable {
            name: "AGE".into(),
            label: "Age (years)".into(),
        }],
        categorical: vec![Variable {
            name: "SEX".into(),
            label: "Sex".into(),
        }],
    })
}

fn efficacy() -> AnalysisParameters {
    AnalysisParameters::Efficacy(EfficacyParams {
        groups: groups("TRT01P"),
        subject_var: "USUBJID".into(),
        response_var: "CHG".into(),
        covariates: Vec::new(),
        reference: "Placebo".into(),
        confidence_level: 0.95,
    })
}

fn ae_summary() -> AnalysisParameters {
    AnalysisParameters::AeSummary(AeSummaryParams {
        groups: groups("TRT01A"),
        subject_var: "USUBJID".into(),
        related_var: "AEREL".into(),
        related_values: vec!["POSSIBLE".into(), "PROBABLE".into(), "RELATED".into()],
        serious_var: "AESER".into(),
        outcome_var: "AEOUT".into(),
        fatal_value: "FATAL".into(),
        action_var: "AEACN".into(),
        withdrawn_value: "DRUG WITHDRAWN".into(),
    })
}

fn ae_specific() -> AnalysisParameters {
    AnalysisParameters::AeSpecific(AeSpecificParams {
        groups: groups("TRT01A"),
        subject_var: "USUBJID".into(),
        soc_var: "AEBODSYS".into(),
        term_var: "AEDECOD".into(),
        sort_by: SortColumn::Total,
    })
}

fn row<'a>(table: &'a SummaryTable, label: &str) -> &'a SummaryRow {
    table
        .rows()
        .iter()
        .find(|r| r.label == label)
        .unwrap_or_else(|| panic!("no row '{label}'"))
}

fn pct(n: u64, pct: f64) -> Statistic {
    Statistic::CountPct { n, pct }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[test]
fn disposition_counts_status_and_reasons() {
    let table = compute(&inputs(), &disposition()).expect("compute");
    assert_eq!(table.columns, vec!["Placebo", "Drug", "Total"]);
    assert_eq!(
        row(&table, "Completed").cells,
        vec![pct(2, 66.7), pct(1, 33.3), pct(3, 50.0)]
    );
    let labels: Vec<&str> = table.rows().iter().map(|r| r.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "Participants in population",
            "Completed",
            "Discontinued",
            "Adverse Event",
            "Withdrawal by Subject",
        ]
    );
    assert_eq!(row(&table, "Adverse Event").indent, 1);
}

#[test]
fn population_skips_absent_default_flags() {
    let table = compute(&inputs(), &population()).expect("compute");
    assert_eq!(table.rows().len(), 2);
    assert_eq!(
        row(&table, "Participants included in ITT population").cells,
        vec![pct(2, 66.7), pct(3, 100.0), pct(5, 83.3)]
    );
}

#[test]
fn baseline_summarises_continuous_and_categorical() {
    let table = compute(&inputs(), &baseline()).expect("compute");
    let header = row(&table, "Age (years)");
    assert_eq!(header.kind, RowKind::Header);
    assert_eq!(
        row(&table, "Mean (SD)").cells,
        vec![
            Statistic::MeanSd {
                mean: 70.0,
                sd: Some(10.0)
            },
            Statistic::MeanSd {
                mean: 75.0,
                sd: Some(10.0)
            },
            Statistic::MeanSd {
                mean: 72.5,
                sd: Some(9.35)
            },
        ]
    );
    assert_eq!(
        row(&table, "Median [Min, Max]").cells[2],
        Statistic::MedianRange {
            median: 72.5,
            min: 60.0,
            max: 85.0
        }
    );
    // Categories keep first-appearance order.
    let sex: Vec<&str> = table
        .rows()
        .iter()
        .skip_while(|r| r.label != "Sex")
        .skip(1)
        .map(|r| r.label.as_str())
        .collect();
    assert_eq!(sex, vec!["F", "M"]);
    assert_eq!(row(&table, "F").cells, vec![pct(2, 66.7), pct(1, 33.3), pct(3, 50.0)]);
}

#[test]
fn efficacy_compares_against_reference() {
    let table = compute(&inputs(), &efficacy()).expect("compute");
    assert_eq!(
        row(&table, "n").cells,
        vec![
            Statistic::Count { n: 3 },
            Statistic::Count { n: 3 },
            Statistic::Count { n: 6 }
        ]
    );
    assert_eq!(row(&table, "Difference from Placebo").kind, RowKind::Header);
    let Statistic::Estimate { value, .. } = row(&table, "LS Mean Difference (SE)").cells[1] else {
        panic!("expected estimate");
    };
    assert!((value - 3.0).abs() < 1e-9);
    assert_eq!(row(&table, "95% CI").cells[2], Statistic::Empty);
}

#[test]
fn ae_summary_counts_unique_subjects() {
    let table = compute(&inputs(), &ae_summary()).expect("compute");
    assert_eq!(table.stub_header, "");
    assert_eq!(
        row(&table, "Participants in population").cells,
        vec![
            Statistic::Count { n: 3 },
            Statistic::Count { n: 3 },
            Statistic::Count { n: 6 }
        ]
    );
    // Subject 01 has two events; subject 99 is not in the subject dataset.
    assert_eq!(
        row(&table, "With any adverse event").cells,
        vec![pct(1, 33.3), pct(2, 66.7), pct(3, 50.0)]
    );
    assert_eq!(
        row(&table, "With serious drug-related adverse event").cells,
        vec![pct(0, 0.0), pct(1, 33.3), pct(1, 16.7)]
    );
    assert_eq!(
        row(&table, "Who died").cells,
        vec![pct(0, 0.0), pct(1, 33.3), pct(1, 16.7)]
    );
    assert_eq!(
        row(&table, "Discontinued due to adverse event").cells,
        vec![pct(1, 33.3), pct(0, 0.0), pct(1, 16.7)]
    );
}

#[test]
fn ae_by_soc_orders_by_incidence() {
    let table = compute(&inputs(), &ae_specific()).expect("compute");
    let labels: Vec<(&str, u8)> = table
        .rows()
        .iter()
        .map(|r| (r.label.as_str(), r.indent))
        .collect();
    assert_eq!(
        labels,
        vec![
            ("Participants in population", 0),
            ("", 0),
            ("Nervous System Disorders", 0),
            ("Headache", 1),
            ("Dizziness", 1),
            ("Gastrointestinal Disorders", 0),
            ("Nausea", 1),
        ]
    );
    assert_eq!(
        row(&table, "Nervous System Disorders").cells,
        vec![pct(1, 33.3), pct(2, 66.7), pct(3, 50.0)]
    );
}

fn ae_specific_sorted_by(group: &str, order: Option<Vec<String>>) -> AnalysisParameters {
    AnalysisParameters::AeSpecific(AeSpecificParams {
        groups: GroupSpec {
            var: "TRT01A".into(),
            order,
            include_total: true,
        },
        subject_var: "USUBJID".into(),
        soc_var: "AEBODSYS".into(),
        term_var: "AEDECOD".into(),
        sort_by: SortColumn::Group(group.into()),
    })
}

#[test]
fn ae_by_soc_sorts_by_named_group() {
    // Placebo has one subject in each SOC, so the tie falls back to the name.
    let params = ae_specific_sorted_by("Placebo", Some(vec!["Placebo".into(), "Drug".into()]));
    let table = compute(&inputs(), &params).expect("compute");
    let socs: Vec<&str> = table
        .rows()
        .iter()
        .filter(|r| r.indent == 0 && r.label.ends_with("Disorders"))
        .map(|r| r.label.as_str())
        .collect();
    assert_eq!(socs, vec!["Gastrointestinal Disorders", "Nervous System Disorders"]);
}

#[test]
fn ae_by_soc_rejects_sort_group_absent_from_data() {
    let err = compute(&inputs(), &ae_specific_sorted_by("Drg", None)).unwrap_err();
    assert!(
        matches!(err, ComputationError::InvalidParameter { param: "sort_by", .. }),
        "{err:?}"
    );
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn no_subjects() -> AnalysisInputs {
    let empty = adsl().take_rows(&[]);
    AnalysisInputs::new()
        .with(InputRole::Subjects, empty.clone())
        .with(InputRole::Observations, empty)
        .with(InputRole::Events, adae())
}

#[rstest]
#[case::disposition(disposition())]
#[case::population(population())]
#[case::baseline(baseline())]
#[case::efficacy(efficacy())]
#[case::ae_summary(ae_summary())]
#[case::ae_specific(ae_specific())]
fn zero_eligible_subjects_give_empty_table(#[case] params: AnalysisParameters) {
    let table = compute(&no_subjects(), &params).expect("compute");
    assert!(table.rows().is_empty());
    assert_eq!(table.columns, vec!["Placebo", "Drug", "Total"]);
}

#[rstest]
#[case::disposition(disposition())]
#[case::baseline(baseline())]
#[case::ae_specific(ae_specific())]
fn computation_is_deterministic(#[case] params: AnalysisParameters) {
    let inputs = inputs();
    assert_eq!(
        compute(&inputs, &params).expect("first"),
        compute(&inputs, &params).expect("second")
    );
}

#[test]
fn missing_required_column_is_a_schema_error() {
    let subjects = adsl();
    let columns: Vec<Column> = subjects
        .columns()
        .iter()
        .filter(|c| c.name() != "EOSSTT")
        .cloned()
        .collect();
    let inputs = AnalysisInputs::new().with(
        InputRole::Subjects,
        Dataset::new(subjects.id().clone(), columns).expect("dataset"),
    );
    assert_eq!(
        compute(&inputs, &disposition()).unwrap_err(),
        ComputationError::Schema(SchemaError::MissingColumn {
            dataset: "adsl".into(),
            column: "EOSSTT".into(),
        })
    );
}

#[test]
fn missing_events_input_is_reported() {
    let inputs = AnalysisInputs::new().with(InputRole::Subjects, adsl());
    assert_eq!(
        compute(&inputs, &ae_summary()).unwrap_err(),
        ComputationError::MissingInput {
            role: InputRole::Events
        }
    );
}
