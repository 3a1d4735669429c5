//! Treatment group columns and the count / percentage cells built on them.

use std::collections::HashMap;

use tlf_core::{Column, Dataset, Statistic, Value};
use tlf_data::round_half_away;

use crate::params::GroupSpec;

pub const TOTAL_LABEL: &str = "Total";

/// Ordered treatment columns of a table, optionally followed by `Total`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLayout {
    labels: Vec<String>,
    include_total: bool,
}

impl GroupLayout {
    /// Configured order, or the sorted distinct values of `column`.
    #[must_use]
    pub fn resolve(spec: &GroupSpec, column: Option<&Column>) -> Self {
        let labels = spec.order.clone().unwrap_or_else(|| {
            let mut distinct = column.map(Column::distinct_in_order).unwrap_or_default();
            distinct.sort();
            distinct.iter().map(ToString::to_string).collect()
        });
        Self {
            labels,
            include_total: spec.include_total,
        }
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of treatment groups, excluding `Total`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub const fn has_total(&self) -> bool {
        self.include_total
    }

    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        let mut columns = self.labels.clone();
        if self.include_total {
            columns.push(TOTAL_LABEL.to_string());
        }
        columns
    }

    #[must_use]
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        if value.is_null() {
            return None;
        }
        let text = value.to_string();
        self.labels.iter().position(|l| *l == text)
    }

    /// Group index per row. Rows outside the displayed groups map to `None`.
    #[must_use]
    pub fn assign(&self, column: &Column) -> Vec<Option<usize>> {
        column.values().iter().map(|v| self.index_of(v)).collect()
    }

    /// `Count` cells for per-group `counts`, plus the total when shown.
    #[must_use]
    pub fn count_cells(&self, counts: &[u64]) -> Vec<Statistic> {
        let mut cells: Vec<Statistic> = counts.iter().map(|&n| Statistic::Count { n }).collect();
        if self.include_total {
            cells.push(Statistic::Count {
                n: counts.iter().sum(),
            });
        }
        cells
    }

    /// `CountPct` cells of `counts` over per-group `denominators`.
    #[must_use]
    pub fn pct_cells(&self, counts: &[u64], denominators: &[u64]) -> Vec<Statistic> {
        let mut cells: Vec<Statistic> = counts
            .iter()
            .zip(denominators)
            .map(|(&n, &d)| count_pct(n, d))
            .collect();
        if self.include_total {
            cells.push(count_pct(counts.iter().sum(), denominators.iter().sum()));
        }
        cells
    }
}

/// `100 * n / d` rounded to one decimal, halves away from zero. Zero when `d` is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percent(n: u64, d: u64) -> f64 {
    if d == 0 {
        return 0.0;
    }
    round_half_away(100.0 * n as f64 / d as f64, 1)
}

#[must_use]
pub fn count_pct(n: u64, d: u64) -> Statistic {
    Statistic::CountPct {
        n,
        pct: percent(n, d),
    }
}

/// Subject-level assignment: which group each subject belongs to.
#[derive(Debug, Clone)]
pub struct SubjectGroups {
    pub layout: GroupLayout,
    /// Group per subject row.
    pub rows: Vec<Option<usize>>,
    /// Subjects per group (the denominators).
    pub n: Vec<u64>,
    by_subject: HashMap<Value, usize>,
}

impl SubjectGroups {
    /// Assign every subject of `subjects` to its treatment group.
    #[must_use]
    pub fn new(subjects: &Dataset, spec: &GroupSpec, subject_var: &str) -> Self {
        let trt = subjects.column(&spec.var);
        let layout = GroupLayout::resolve(spec, trt);
        let rows = trt.map_or_else(|| vec![None; subjects.row_count()], |c| layout.assign(c));

        let mut n = vec![0u64; layout.len()];
        for g in rows.iter().flatten() {
            n[*g] += 1;
        }

        let mut by_subject = HashMap::new();
        if let Some(ids) = subjects.column(subject_var) {
            for (row, group) in rows.iter().enumerate() {
                if let Some(group) = group {
                    by_subject.insert(ids.get(row).clone(), *group);
                }
            }
        }

        Self {
            layout,
            rows,
            n,
            by_subject,
        }
    }

    /// Subjects in the displayed groups.
    #[must_use]
    pub fn eligible(&self) -> u64 {
        self.n.iter().sum()
    }

    /// Group of the subject identified by `id`.
    #[must_use]
    pub fn group_of(&self, id: &Value) -> Option<usize> {
        self.by_subject.get(id).copied()
    }

    #[must_use]
    pub fn population_cells(&self) -> Vec<Statistic> {
        self.layout.count_cells(&self.n)
    }

    /// Per-group count of subject rows matching `pred`, as `CountPct` cells.
    pub fn pct_where(&self, mut pred: impl FnMut(usize) -> bool) -> Vec<Statistic> {
        let mut counts = vec![0u64; self.layout.len()];
        for (row, group) in self.rows.iter().enumerate() {
            if let Some(g) = group
                && pred(row)
            {
                counts[*g] += 1;
            }
        }
        self.layout.pct_cells(&counts, &self.n)
    }
}
