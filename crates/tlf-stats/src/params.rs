//! Validated analysis parameters, one record per report family.
//!
//! [`AnalysisParameters::build`] turns the permissive [`ReportConfig`] into
//! a typed record, filling ADaM-conventional defaults and rejecting missing
//! or contradictory settings. The record is immutable afterwards.

use tlf_config::{ParamsConfig, ReportConfig};
use tlf_core::{InputRole, ReportFamily, SchemaRequirement, TypeClass};

use crate::error::ComputationError;

const DEFAULT_SUBJECT_VAR: &str = "USUBJID";
const DEFAULT_PLANNED_TRT: &str = "TRT01P";
const DEFAULT_ACTUAL_TRT: &str = "TRT01A";
const DEFAULT_CONFIDENCE: f64 = 0.95;
const DEFAULT_RELATED: [&str; 4] = ["POSSIBLE", "PROBABLE", "DEFINITE", "RELATED"];

// ---------------------------------------------------------------------------
// Shared records
// ---------------------------------------------------------------------------

/// Treatment grouping shared by every family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub var: String,
    /// Display order; `None` means sorted distinct values.
    pub order: Option<Vec<String>>,
    pub include_total: bool,
}

/// An analysis population counted by the population report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationDef {
    pub label: String,
    pub flag_var: String,
    pub flag_value: String,
}

/// A baseline variable and its display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub label: String,
}

/// Column the SOC/PT table is ordered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortColumn {
    Total,
    Group(String),
}

// ---------------------------------------------------------------------------
// Family records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispositionParams {
    pub groups: GroupSpec,
    pub subject_var: String,
    pub status_var: String,
    pub completed_value: String,
    pub discontinued_value: String,
    pub reason_var: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationParams {
    pub groups: GroupSpec,
    pub subject_var: String,
    pub populations: Vec<PopulationDef>,
    /// Configured explicitly. Default populations whose flag column is
    /// absent are skipped; configured ones are required.
    pub explicit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineParams {
    pub groups: GroupSpec,
    pub subject_var: String,
    pub continuous: Vec<Variable>,
    pub categorical: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EfficacyParams {
    pub groups: GroupSpec,
    pub subject_var: String,
    pub response_var: String,
    pub covariates: Vec<String>,
    pub reference: String,
    pub confidence_level: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AeSummaryParams {
    pub groups: GroupSpec,
    pub subject_var: String,
    pub related_var: String,
    pub related_values: Vec<String>,
    pub serious_var: String,
    pub outcome_var: String,
    pub fatal_value: String,
    pub action_var: String,
    pub withdrawn_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AeSpecificParams {
    pub groups: GroupSpec,
    pub subject_var: String,
    pub soc_var: String,
    pub term_var: String,
    pub sort_by: SortColumn,
}

/// Parameters of one report, tagged by family.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisParameters {
    Disposition(DispositionParams),
    Population(PopulationParams),
    Baseline(BaselineParams),
    Efficacy(EfficacyParams),
    AeSummary(AeSummaryParams),
    AeSpecific(AeSpecificParams),
}

impl AnalysisParameters {
    /// Build and validate the parameters of `report`.
    ///
    /// # Errors
    ///
    /// [`ComputationError::MissingParameter`],
    /// [`ComputationError::InvalidParameter`], or
    /// [`ComputationError::MissingInput`] when the report lacks a dataset
    /// for a role its family reads.
    pub fn build(report: &ReportConfig) -> Result<Self, ComputationError> {
        let p = &report.params;
        let family = report.family;

        let ae = matches!(family, ReportFamily::AeSummary | ReportFamily::AeSpecific);
        let groups = group_spec(p, if ae { DEFAULT_ACTUAL_TRT } else { DEFAULT_PLANNED_TRT })?;
        let subject_var = or_default(p.subject_var.as_ref(), DEFAULT_SUBJECT_VAR);

        let params = match family {
            ReportFamily::Disposition => Self::Disposition(DispositionParams {
                groups,
                subject_var,
                status_var: or_default(p.status_var.as_ref(), "EOSSTT"),
                completed_value: or_default(p.completed_value.as_ref(), "COMPLETED"),
                discontinued_value: or_default(p.discontinued_value.as_ref(), "DISCONTINUED"),
                reason_var: or_default(p.reason_var.as_ref(), "DCSREAS"),
            }),
            ReportFamily::Population => {
                let (populations, explicit) = match &p.populations {
                    Some(list) if list.is_empty() => {
                        return Err(ComputationError::InvalidParameter {
                            param: "populations",
                            reason: "list must not be empty".into(),
                        });
                    }
                    Some(list) => (
                        list.iter()
                            .map(|c| PopulationDef {
                                label: c.label.clone(),
                                flag_var: c.flag_var.clone(),
                                flag_value: c.flag_value.clone(),
                            })
                            .collect(),
                        true,
                    ),
                    None => (default_populations(), false),
                };
                Self::Population(PopulationParams {
                    groups,
                    subject_var,
                    populations,
                    explicit,
                })
            }
            ReportFamily::Baseline => {
                if p.continuous.is_empty() && p.categorical.is_empty() {
                    return Err(ComputationError::MissingParameter {
                        family,
                        param: "continuous or categorical",
                    });
                }
                let variable = |name: &String| Variable {
                    name: name.clone(),
                    label: p
                        .labels
                        .get(name)
                        .cloned()
                        .unwrap_or_else(|| default_label(name)),
                };
                Self::Baseline(BaselineParams {
                    groups,
                    subject_var,
                    continuous: p.continuous.iter().map(variable).collect(),
                    categorical: p.categorical.iter().map(variable).collect(),
                })
            }
            ReportFamily::Efficacy => {
                let response_var = p.response_var.clone().ok_or(ComputationError::MissingParameter {
                    family,
                    param: "response_var",
                })?;
                let reference = p.reference.clone().ok_or(ComputationError::MissingParameter {
                    family,
                    param: "reference",
                })?;
                if let Some(order) = &groups.order
                    && !order.contains(&reference)
                {
                    return Err(ComputationError::InvalidParameter {
                        param: "reference",
                        reason: format!("'{reference}' is not one of the configured treatments"),
                    });
                }
                let confidence_level = p.confidence_level.unwrap_or(DEFAULT_CONFIDENCE);
                if !(confidence_level > 0.0 && confidence_level < 1.0) {
                    return Err(ComputationError::InvalidParameter {
                        param: "confidence_level",
                        reason: format!("{confidence_level} is not between 0 and 1"),
                    });
                }
                if p.covariates.iter().any(|c| *c == response_var) {
                    return Err(ComputationError::InvalidParameter {
                        param: "covariates",
                        reason: format!("response '{response_var}' cannot be a covariate"),
                    });
                }
                Self::Efficacy(EfficacyParams {
                    groups,
                    subject_var,
                    response_var,
                    covariates: p.covariates.clone(),
                    reference,
                    confidence_level,
                })
            }
            ReportFamily::AeSummary => Self::AeSummary(AeSummaryParams {
                groups,
                subject_var,
                related_var: or_default(p.related_var.as_ref(), "AEREL"),
                related_values: p.related_values.clone().unwrap_or_else(|| {
                    DEFAULT_RELATED.iter().map(ToString::to_string).collect()
                }),
                serious_var: or_default(p.serious_var.as_ref(), "AESER"),
                outcome_var: or_default(p.outcome_var.as_ref(), "AEOUT"),
                fatal_value: or_default(p.fatal_value.as_ref(), "FATAL"),
                action_var: or_default(p.action_var.as_ref(), "AEACN"),
                withdrawn_value: or_default(p.withdrawn_value.as_ref(), "DRUG WITHDRAWN"),
            }),
            ReportFamily::AeSpecific => {
                let sort_by = match p.sort_by.as_deref() {
                    None => SortColumn::Total,
                    Some(s) if s.eq_ignore_ascii_case("total") => SortColumn::Total,
                    Some(group) => {
                        if let Some(order) = &groups.order
                            && !order.iter().any(|g| g == group)
                        {
                            return Err(ComputationError::InvalidParameter {
                                param: "sort_by",
                                reason: format!("'{group}' is neither 'total' nor a treatment"),
                            });
                        }
                        SortColumn::Group(group.to_string())
                    }
                };
                Self::AeSpecific(AeSpecificParams {
                    groups,
                    subject_var,
                    soc_var: or_default(p.soc_var.as_ref(), "AEBODSYS"),
                    term_var: or_default(p.term_var.as_ref(), "AEDECOD"),
                    sort_by,
                })
            }
        };

        for role in params.roles() {
            if report.input(role).is_none() {
                return Err(ComputationError::MissingInput { role });
            }
        }
        Ok(params)
    }

    #[must_use]
    pub const fn family(&self) -> ReportFamily {
        match self {
            Self::Disposition(_) => ReportFamily::Disposition,
            Self::Population(_) => ReportFamily::Population,
            Self::Baseline(_) => ReportFamily::Baseline,
            Self::Efficacy(_) => ReportFamily::Efficacy,
            Self::AeSummary(_) => ReportFamily::AeSummary,
            Self::AeSpecific(_) => ReportFamily::AeSpecific,
        }
    }

    #[must_use]
    pub const fn groups(&self) -> &GroupSpec {
        match self {
            Self::Disposition(p) => &p.groups,
            Self::Population(p) => &p.groups,
            Self::Baseline(p) => &p.groups,
            Self::Efficacy(p) => &p.groups,
            Self::AeSummary(p) => &p.groups,
            Self::AeSpecific(p) => &p.groups,
        }
    }

    #[must_use]
    pub fn subject_var(&self) -> &str {
        match self {
            Self::Disposition(p) => &p.subject_var,
            Self::Population(p) => &p.subject_var,
            Self::Baseline(p) => &p.subject_var,
            Self::Efficacy(p) => &p.subject_var,
            Self::AeSummary(p) => &p.subject_var,
            Self::AeSpecific(p) => &p.subject_var,
        }
    }

    /// Inputs this report reads, in role order.
    #[must_use]
    pub fn roles(&self) -> Vec<InputRole> {
        self.family().required_inputs().to_vec()
    }

    /// What a freshly loaded input must satisfy before derivation.
    ///
    /// Only the subject key is checked here (unique for subject-level data);
    /// analysis columns may still be created by derivation steps.
    #[must_use]
    pub fn load_requirement(&self, role: InputRole) -> SchemaRequirement {
        SchemaRequirement::new().key(self.subject_var(), role == InputRole::Subjects)
    }

    /// What the derived input must satisfy before computation.
    #[must_use]
    pub fn requirement(&self, role: InputRole) -> SchemaRequirement {
        let base = self.load_requirement(role);
        let trt = self.groups().var.as_str();
        match (self, role) {
            (Self::Disposition(p), InputRole::Subjects) => base
                .column(trt, TypeClass::Any)
                .column(&p.status_var, TypeClass::Str)
                .column(&p.reason_var, TypeClass::Str),
            (Self::Population(p), InputRole::Subjects) => {
                let mut req = base.column(trt, TypeClass::Any);
                if p.explicit {
                    for pop in &p.populations {
                        req = req.column(&pop.flag_var, TypeClass::Any);
                    }
                }
                req
            }
            (Self::Baseline(p), InputRole::Subjects) => {
                let mut req = base.column(trt, TypeClass::Any);
                for v in &p.continuous {
                    req = req.column(&v.name, TypeClass::Numeric);
                }
                for v in &p.categorical {
                    req = req.column(&v.name, TypeClass::Any);
                }
                req
            }
            (Self::Efficacy(p), InputRole::Observations) => {
                let mut req = base
                    .column(trt, TypeClass::Any)
                    .column(&p.response_var, TypeClass::Numeric);
                for c in &p.covariates {
                    req = req.column(c, TypeClass::Numeric);
                }
                req
            }
            (Self::AeSummary(_) | Self::AeSpecific(_), InputRole::Subjects) => {
                base.column(trt, TypeClass::Any)
            }
            (Self::AeSummary(p), InputRole::Events) => base
                .column(&p.related_var, TypeClass::Str)
                .column(&p.serious_var, TypeClass::Str)
                .column(&p.outcome_var, TypeClass::Str)
                .column(&p.action_var, TypeClass::Str),
            (Self::AeSpecific(p), InputRole::Events) => base
                .column(&p.soc_var, TypeClass::Str)
                .column(&p.term_var, TypeClass::Str),
            _ => base,
        }
    }
}

fn or_default(value: Option<&String>, default: &str) -> String {
    value.cloned().unwrap_or_else(|| default.to_string())
}

fn group_spec(p: &ParamsConfig, default_var: &str) -> Result<GroupSpec, ComputationError> {
    if let Some(order) = &p.treatments {
        if order.is_empty() {
            return Err(ComputationError::InvalidParameter {
                param: "treatments",
                reason: "list must not be empty".into(),
            });
        }
        if let Some(dup) = order
            .iter()
            .enumerate()
            .find_map(|(i, t)| order[..i].contains(t).then_some(t))
        {
            return Err(ComputationError::InvalidParameter {
                param: "treatments",
                reason: format!("'{dup}' listed twice"),
            });
        }
    }
    Ok(GroupSpec {
        var: or_default(p.treatment_var.as_ref(), default_var),
        order: p.treatments.clone(),
        include_total: p.include_total,
    })
}

fn default_populations() -> Vec<PopulationDef> {
    [
        ("Participants included in ITT population", "ITTFL"),
        ("Participants included in efficacy population", "EFFFL"),
        ("Participants included in safety population", "SAFFL"),
    ]
    .into_iter()
    .map(|(label, flag)| PopulationDef {
        label: label.to_string(),
        flag_var: flag.to_string(),
        flag_value: "Y".to_string(),
    })
    .collect()
}

/// Title-cased variable name; `AGE` reads "Age (years)".
fn default_label(name: &str) -> String {
    let label = tlf_data::titlecase(name);
    if name == "AGE" {
        format!("{label} (years)")
    } else {
        label
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;
    use tlf_config::{InputConfig, ParamsConfig, RenderConfig};

    use super::*;

    fn report(family: ReportFamily, params: ParamsConfig) -> ReportConfig {
        let input = |dataset: &str| InputConfig {
            dataset: dataset.into(),
            steps: Vec::new(),
        };
        ReportConfig {
            id: "t".into(),
            family,
            inputs: BTreeMap::from([
                (InputRole::Subjects, input("adsl")),
                (InputRole::Events, input("adae")),
            ]),
            params,
            render: RenderConfig::default(),
        }
    }

    #[test]
    fn missing_events_input_is_reported() {
        let mut cfg = report(ReportFamily::AeSpecific, ParamsConfig::default());
        cfg.inputs.remove(&InputRole::Events);
        assert_eq!(
            AnalysisParameters::build(&cfg).unwrap_err(),
            ComputationError::MissingInput {
                role: InputRole::Events
            }
        );
    }

    #[test]
    fn disposition_defaults() {
        let params =
            AnalysisParameters::build(&report(ReportFamily::Disposition, ParamsConfig::default()))
                .expect("build");
        let AnalysisParameters::Disposition(p) = params else {
            panic!("wrong family");
        };
        assert_eq!(p.groups.var, "TRT01P");
        assert_eq!(p.status_var, "EOSSTT");
        assert_eq!(p.reason_var, "DCSREAS");
        assert_eq!(p.subject_var, "USUBJID");
    }

    #[test]
    fn adverse_events_default_to_actual_treatment() {
        let params =
            AnalysisParameters::build(&report(ReportFamily::AeSummary, ParamsConfig::default()))
                .expect("build");
        assert_eq!(params.groups().var, "TRT01A");
        assert_eq!(params.roles(), vec![InputRole::Subjects, InputRole::Events]);
    }

    #[test]
    fn efficacy_requires_response_and_reference() {
        let err =
            AnalysisParameters::build(&report(ReportFamily::Efficacy, ParamsConfig::default()))
                .unwrap_err();
        assert_eq!(
            err,
            ComputationError::MissingParameter {
                family: ReportFamily::Efficacy,
                param: "response_var"
            }
        );

        let params = ParamsConfig {
            response_var: Some("CHG".into()),
            reference: Some("Placebo".into()),
            treatments: Some(vec!["Xanomeline".into()]),
            ..ParamsConfig::default()
        };
        assert!(matches!(
            AnalysisParameters::build(&report(ReportFamily::Efficacy, params)),
            Err(ComputationError::InvalidParameter { param: "reference", .. })
        ));
    }

    #[test]
    fn confidence_level_must_be_a_probability() {
        let params = ParamsConfig {
            response_var: Some("CHG".into()),
            reference: Some("Placebo".into()),
            confidence_level: Some(95.0),
            ..ParamsConfig::default()
        };
        assert!(matches!(
            AnalysisParameters::build(&report(ReportFamily::Efficacy, params)),
            Err(ComputationError::InvalidParameter { param: "confidence_level", .. })
        ));
    }

    #[test]
    fn baseline_needs_variables_and_labels_default() {
        assert!(matches!(
            AnalysisParameters::build(&report(ReportFamily::Baseline, ParamsConfig::default())),
            Err(ComputationError::MissingParameter { .. })
        ));

        let params = ParamsConfig {
            continuous: vec!["AGE".into()],
            categorical: vec!["SEX".into(), "RACE".into()],
            labels: BTreeMap::from([("RACE".to_string(), "Race (CDISC)".to_string())]),
            ..ParamsConfig::default()
        };
        let AnalysisParameters::Baseline(p) =
            AnalysisParameters::build(&report(ReportFamily::Baseline, params)).expect("build")
        else {
            panic!("wrong family");
        };
        let labels: Vec<_> = p
            .continuous
            .iter()
            .chain(&p.categorical)
            .map(|v| v.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Age (years)", "Sex", "Race (CDISC)"]);
    }

    #[test]
    fn duplicate_treatments_are_rejected() {
        let params = ParamsConfig {
            treatments: Some(vec!["A".into(), "B".into(), "A".into()]),
            ..ParamsConfig::default()
        };
        assert!(matches!(
            AnalysisParameters::build(&report(ReportFamily::Population, params)),
            Err(ComputationError::InvalidParameter { param: "treatments", .. })
        ));
    }

    #[test]
    fn sort_by_must_name_a_column() {
        let params = ParamsConfig {
            treatments: Some(vec!["Placebo".into()]),
            sort_by: Some("Xanomeline".into()),
            ..ParamsConfig::default()
        };
        assert!(AnalysisParameters::build(&report(ReportFamily::AeSpecific, params)).is_err());

        let params = ParamsConfig {
            sort_by: Some("TOTAL".into()),
            ..ParamsConfig::default()
        };
        let AnalysisParameters::AeSpecific(p) =
            AnalysisParameters::build(&report(ReportFamily::AeSpecific, params)).expect("build")
        else {
            panic!("wrong family");
        };
        assert_eq!(p.sort_by, SortColumn::Total);
    }

    #[test]
    fn requirements_check_subject_key() {
        let params =
            AnalysisParameters::build(&report(ReportFamily::Population, ParamsConfig::default()))
                .expect("build");
        let load = params.load_requirement(InputRole::Subjects);
        assert_eq!(load.key.as_deref(), Some("USUBJID"));
        assert!(load.unique_key);
        assert!(load.columns.is_empty());

        let full = params.requirement(InputRole::Subjects);
        assert_eq!(full.columns, vec![("TRT01P".to_string(), TypeClass::Any)]);
    }
}
