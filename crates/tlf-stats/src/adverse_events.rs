//! Adverse event tables: the overall summary and incidence by SOC / PT.
//!
//! Both count unique subjects, not events. Events are mapped to a treatment
//! group through the subject-level dataset, whose group sizes are the
//! denominators. Events of subjects outside the displayed groups are ignored.

use std::collections::{BTreeMap, HashSet};

use tlf_core::{Column, Dataset, SummaryRow, SummaryTable, TableBuilder, Value};
use tlf_data::titlecase;

use crate::error::ComputationError;
use crate::groups::SubjectGroups;
use crate::params::{AeSpecificParams, AeSummaryParams, SortColumn};

pub const SUMMARY_STUB: &str = "";
pub const SPECIFIC_STUB: &str = "System Organ Class / Preferred Term";

/// Label used when the SOC or PT of an event is missing.
pub const UNCODED: &str = "Uncoded";

const SERIOUS_FLAG: &str = "Y";

// ---------------------------------------------------------------------------
// Subject counting
// ---------------------------------------------------------------------------

/// Unique subjects per group among event rows accepted by `pred`.
fn subject_counts(
    groups: &SubjectGroups,
    events: &Dataset,
    ids: &Column,
    mut pred: impl FnMut(usize) -> bool,
) -> Vec<u64> {
    let mut seen: HashSet<&Value> = HashSet::new();
    let mut counts = vec![0u64; groups.layout.len()];
    for row in 0..events.row_count() {
        let id = ids.get(row);
        let Some(group) = groups.group_of(id) else {
            continue;
        };
        if pred(row) && seen.insert(id) {
            counts[group] += 1;
        }
    }
    counts
}

/// Build the adverse event summary table.
///
/// # Errors
///
/// [`ComputationError::Schema`] when a configured event column is missing.
pub fn summary(
    subjects: &Dataset,
    events: &Dataset,
    p: &AeSummaryParams,
) -> Result<SummaryTable, ComputationError> {
    let groups = SubjectGroups::new(subjects, &p.groups, &p.subject_var);
    if groups.eligible() == 0 {
        return Ok(SummaryTable::empty(SUMMARY_STUB, groups.layout.columns()));
    }

    let ids = events.require(&p.subject_var)?;
    let related = events.require(&p.related_var)?;
    let serious = events.require(&p.serious_var)?;
    let outcome = events.require(&p.outcome_var)?;
    let action = events.require(&p.action_var)?;

    let is_related = |row: usize| {
        let value = related.get(row);
        !value.is_null() && p.related_values.contains(&value.to_string())
    };
    let is_serious = |row: usize| serious.get(row).to_string() == SERIOUS_FLAG;

    let categories: [(&str, Vec<u64>); 6] = [
        ("With any adverse event", subject_counts(&groups, events, ids, |_| true)),
        ("With drug-related adverse event", subject_counts(&groups, events, ids, is_related)),
        ("With serious adverse event", subject_counts(&groups, events, ids, is_serious)),
        (
            "With serious drug-related adverse event",
            subject_counts(&groups, events, ids, |row| is_serious(row) && is_related(row)),
        ),
        (
            "Who died",
            subject_counts(&groups, events, ids, |row| {
                outcome.get(row).to_string() == p.fatal_value
            }),
        ),
        (
            "Discontinued due to adverse event",
            subject_counts(&groups, events, ids, |row| {
                action.get(row).to_string() == p.withdrawn_value
            }),
        ),
    ];

    let mut table = TableBuilder::new(SUMMARY_STUB, groups.layout.columns());
    table.push(SummaryRow::data(
        "Participants in population",
        0,
        groups.population_cells(),
    ));
    for (label, counts) in categories {
        table.push(SummaryRow::data(
            label,
            0,
            groups.layout.pct_cells(&counts, &groups.n),
        ));
    }
    Ok(table.finish())
}

// ---------------------------------------------------------------------------
// SOC / PT incidence
// ---------------------------------------------------------------------------

/// Subjects per group for one SOC or PT.
#[derive(Debug)]
struct Incidence<'a> {
    subjects: Vec<HashSet<&'a Value>>,
}

impl<'a> Incidence<'a> {
    fn new(groups: usize) -> Self {
        Self {
            subjects: vec![HashSet::new(); groups],
        }
    }

    fn add(&mut self, group: usize, id: &'a Value) {
        self.subjects[group].insert(id);
    }

    fn counts(&self) -> Vec<u64> {
        self.subjects.iter().map(|s| s.len() as u64).collect()
    }
}

fn sort_key(counts: &[u64], sort: Option<usize>) -> u64 {
    match sort {
        Some(group) => counts.get(group).copied().unwrap_or(0),
        None => counts.iter().sum(),
    }
}

/// Labels ordered by descending count, ties alphabetical ascending.
fn order_by_incidence<'l>(entries: impl IntoIterator<Item = (&'l str, u64)>) -> Vec<&'l str> {
    let mut entries: Vec<(&str, u64)> = entries.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries.into_iter().map(|(label, _)| label).collect()
}

fn coded(value: &Value) -> String {
    if value.is_null() {
        UNCODED.to_string()
    } else {
        titlecase(&value.to_string())
    }
}

/// Build the adverse events by system organ class and preferred term table.
///
/// # Errors
///
/// [`ComputationError::Schema`] when the SOC or term column is missing, and
/// [`ComputationError::InvalidParameter`] when `sort_by` names a group that
/// is not in the layout.
pub fn by_soc_pt(
    subjects: &Dataset,
    events: &Dataset,
    p: &AeSpecificParams,
) -> Result<SummaryTable, ComputationError> {
    let groups = SubjectGroups::new(subjects, &p.groups, &p.subject_var);
    if groups.eligible() == 0 {
        return Ok(SummaryTable::empty(SPECIFIC_STUB, groups.layout.columns()));
    }

    let ids = events.require(&p.subject_var)?;
    let soc_col = events.require(&p.soc_var)?;
    let term_col = events.require(&p.term_var)?;
    let width = groups.layout.len();

    type Terms<'a> = BTreeMap<String, Incidence<'a>>;
    let mut socs: BTreeMap<String, (Incidence<'_>, Terms<'_>)> = BTreeMap::new();
    for row in 0..events.row_count() {
        let id = ids.get(row);
        let Some(group) = groups.group_of(id) else {
            continue;
        };
        let (soc, terms) = socs
            .entry(coded(soc_col.get(row)))
            .or_insert_with(|| (Incidence::new(width), BTreeMap::new()));
        soc.add(group, id);
        terms
            .entry(coded(term_col.get(row)))
            .or_insert_with(|| Incidence::new(width))
            .add(group, id);
    }

    let sort = match &p.sort_by {
        SortColumn::Total => None,
        SortColumn::Group(label) => Some(
            groups
                .layout
                .labels()
                .iter()
                .position(|l| l == label)
                .ok_or_else(|| ComputationError::InvalidParameter {
                    param: "sort_by",
                    reason: format!("'{label}' is not a treatment group in the data"),
                })?,
        ),
    };

    let mut table = TableBuilder::new(SPECIFIC_STUB, groups.layout.columns());
    table.push(SummaryRow::data(
        "Participants in population",
        0,
        groups.population_cells(),
    ));
    table.blank();

    let soc_counts: BTreeMap<&str, (Vec<u64>, &Terms<'_>)> = socs
        .iter()
        .map(|(label, (soc, terms))| (label.as_str(), (soc.counts(), terms)))
        .collect();
    let soc_order = order_by_incidence(
        soc_counts
            .iter()
            .map(|(label, (counts, _))| (*label, sort_key(counts, sort))),
    );

    for soc in soc_order {
        let Some((counts, terms)) = soc_counts.get(soc) else {
            continue;
        };
        table.push(SummaryRow::data(
            soc,
            0,
            groups.layout.pct_cells(counts, &groups.n),
        ));

        let term_counts: BTreeMap<&str, Vec<u64>> = terms
            .iter()
            .map(|(label, incidence)| (label.as_str(), incidence.counts()))
            .collect();
        let term_order = order_by_incidence(
            term_counts
                .iter()
                .map(|(label, counts)| (*label, sort_key(counts, sort))),
        );
        for term in term_order {
            if let Some(counts) = term_counts.get(term) {
                table.push(SummaryRow::data(
                    term,
                    1,
                    groups.layout.pct_cells(counts, &groups.n),
                ));
            }
        }
    }

    tracing::debug!(socs = socs.len(), "built SOC/PT incidence");
    Ok(table.finish())
}
