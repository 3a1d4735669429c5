//! Report orchestration for `tlf run`.
//!
//! Every report goes through Params, Load, Derive, Compute, Render and Write.
//! A failing stage ends that report only: the error is logged with the report
//! id and stage and recorded in the summary, and the other reports carry on.
//!
//! Reports are tasks on a [`JoinSet`] bounded by a semaphore of `workers`
//! permits. Stage work runs on the blocking pool, so a panic inside a stage
//! is reported as a failure of that stage. The dataset cache is shared by all
//! reports of the run and dropped with it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tlf_config::ReportConfig;
use tlf_core::{DatasetId, ReportFamily, Stage};
use tlf_data::{DataError, DatasetCache, DatasetLoader, derive};
use tlf_render::{RenderSpec, ReportArtifact};
use tlf_stats::{AnalysisInputs, AnalysisParameters};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::progress::Progress;

/// File name of the run summary written next to the artifacts.
pub const MANIFEST_FILE: &str = "manifest.json";

// ---------------------------------------------------------------------------
// Plan and results
// ---------------------------------------------------------------------------

/// Everything a run needs, resolved from configuration and flags.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub reports: Vec<ReportConfig>,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub workers: usize,
    /// Reports not started within this long after the run began are skipped.
    pub deadline: Option<Duration>,
    pub manifest: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReportOutcome {
    Succeeded {
        artifact: ReportArtifact,
        /// Identities of the datasets the table was computed from.
        inputs: Vec<DatasetId>,
    },
    Failed { stage: Stage, error: String },
    NotRun,
}

impl ReportOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
            Self::NotRun => "not_run",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportResult {
    pub id: String,
    pub family: ReportFamily,
    #[serde(flatten)]
    pub outcome: ReportOutcome,
    pub elapsed_ms: u64,
}

/// Overall status of a run; decides the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Partial { succeeded: usize, total: usize },
    Failure,
}

impl RunStatus {
    /// All succeeded (including no reports at all) is a success, none is a
    /// failure, anything in between is partial.
    #[must_use]
    pub fn from_results(results: &[ReportResult]) -> Self {
        let total = results.len();
        let succeeded = results.iter().filter(|r| r.outcome.is_success()).count();
        if succeeded == total {
            Self::Success
        } else if succeeded == 0 {
            Self::Failure
        } else {
            Self::Partial { succeeded, total }
        }
    }

    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Partial { .. } => 2,
            Self::Failure => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    #[serde(flatten)]
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per planned report, in plan order.
    pub reports: Vec<ReportResult>,
    /// Datasets loaded during the run, with their checksums.
    pub datasets: Vec<DatasetId>,
}

// ---------------------------------------------------------------------------
// Stage plumbing
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct StageFailure {
    stage: Stage,
    error: anyhow::Error,
}

/// Run `work` on the blocking pool and attribute any error or panic to `stage`.
async fn on_blocking<T, E, F>(stage: Stage, work: F) -> Result<T, StageFailure>
where
    T: Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(StageFailure {
            stage,
            error: error.into(),
        }),
        Err(join) => Err(StageFailure {
            stage,
            error: anyhow::anyhow!("stage task aborted: {join}"),
        }),
    }
}

fn stage_done(report: &str, stage: Stage) {
    tracing::info!(report, stage = %stage, "stage complete");
}

async fn process_report(
    report: ReportConfig,
    cache: Arc<DatasetCache>,
    output_dir: Arc<Path>,
) -> Result<(ReportArtifact, Vec<DatasetId>), StageFailure> {
    let report = Arc::new(report);
    let id = report.id.clone();

    let (params, spec) = {
        let report = Arc::clone(&report);
        on_blocking(Stage::Params, move || {
            let params = AnalysisParameters::build(&report)?;
            let spec = RenderSpec::from(&report.render);
            spec.check()?;
            Ok::<_, anyhow::Error>((params, spec))
        })
        .await?
    };
    stage_done(&id, Stage::Params);

    let mut loaded = Vec::new();
    for role in params.roles() {
        let input = report.input(role).cloned().ok_or_else(|| StageFailure {
            stage: Stage::Load,
            error: anyhow::anyhow!("no dataset configured for input '{role}'"),
        })?;
        let cache = Arc::clone(&cache);
        let requirement = params.load_requirement(role);
        let dataset_name = input.dataset.clone();
        let dataset = on_blocking(Stage::Load, move || {
            let dataset = cache.get(&dataset_name)?;
            dataset.validate(&requirement).map_err(DataError::from)?;
            Ok::<_, DataError>(dataset)
        })
        .await?;
        loaded.push((role, input, dataset));
    }
    let mut sources: Vec<DatasetId> = loaded.iter().map(|(_, _, d)| d.id().clone()).collect();
    sources.dedup();
    stage_done(&id, Stage::Load);

    let inputs = on_blocking(Stage::Derive, move || {
        let mut inputs = AnalysisInputs::new();
        for (role, input, dataset) in loaded {
            let derived = derive::apply(&dataset, &input.steps).map_err(|error| {
                anyhow::Error::from(error).context(format!("deriving dataset '{}'", input.dataset))
            })?;
            inputs.insert(role, derived);
        }
        Ok::<_, anyhow::Error>(inputs)
    })
    .await?;
    stage_done(&id, Stage::Derive);

    let table = on_blocking(Stage::Compute, move || tlf_stats::compute(&inputs, &params)).await?;
    stage_done(&id, Stage::Compute);

    let format = spec.format;
    let bytes = on_blocking(Stage::Render, move || tlf_render::render(&table, &spec)).await?;
    stage_done(&id, Stage::Render);

    let artifact = {
        let id = id.clone();
        on_blocking(Stage::Write, move || {
            tlf_render::write_artifact(&output_dir, &id, format, &bytes)
        })
        .await?
    };
    stage_done(&id, Stage::Write);

    Ok((artifact, sources))
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run every report of the plan and return the summary.
///
/// Never fails as a whole: per-report problems are recorded in the
/// summary, and a manifest that cannot be written is only logged.
pub async fn run(plan: RunPlan) -> RunSummary {
    let started_at = Utc::now();
    let started = Instant::now();
    let cutoff = plan.deadline.map(|d| started + d);
    let total = plan.reports.len();

    let cache = Arc::new(DatasetCache::new(DatasetLoader::new(&plan.data_dir)));
    let output_dir: Arc<Path> = Arc::from(plan.output_dir.as_path());
    let semaphore = Arc::new(Semaphore::new(plan.workers.max(1)));
    let progress = Progress::bar(total as u64, "running reports");

    tracing::info!(
        reports = total,
        workers = plan.workers.max(1),
        data_dir = %plan.data_dir.display(),
        output_dir = %plan.output_dir.display(),
        "starting run"
    );

    let mut set = JoinSet::new();
    for (idx, report) in plan.reports.iter().cloned().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let cache = Arc::clone(&cache);
        let output_dir = Arc::clone(&output_dir);
        set.spawn(async move {
            let id = report.id.clone();
            let family = report.family;
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (idx, not_run(id, family));
            };
            if cutoff.is_some_and(|cutoff| Instant::now() >= cutoff) {
                tracing::warn!(report = %id, "deadline passed before start; not run");
                return (idx, not_run(id, family));
            }

            let begun = Instant::now();
            let outcome = match process_report(report, cache, output_dir).await {
                Ok((artifact, inputs)) => {
                    tracing::info!(report = %id, path = %artifact.path.display(), "report written");
                    ReportOutcome::Succeeded { artifact, inputs }
                }
                Err(failure) => {
                    tracing::warn!(
                        report = %id,
                        stage = %failure.stage,
                        error = %format!("{:#}", failure.error),
                        "report failed"
                    );
                    ReportOutcome::Failed {
                        stage: failure.stage,
                        error: format!("{:#}", failure.error),
                    }
                }
            };
            let elapsed_ms = u64::try_from(begun.elapsed().as_millis()).unwrap_or(u64::MAX);
            (
                idx,
                ReportResult {
                    id,
                    family,
                    outcome,
                    elapsed_ms,
                },
            )
        });
    }

    let mut slots: Vec<Option<ReportResult>> = vec![None; total];
    while let Some(joined) = set.join_next().await {
        progress.inc(1);
        match joined {
            Ok((idx, result)) => {
                progress.set_message(&format!("{} {}", result.id, result.outcome.label()));
                slots[idx] = Some(result);
            }
            Err(error) => tracing::error!(%error, "report task aborted"),
        }
    }
    progress.finish_clear();

    // Stage work is isolated on the blocking pool; a slot is only empty when
    // the orchestration task itself died, which happens before any stage ran.
    let reports: Vec<ReportResult> = slots
        .into_iter()
        .zip(&plan.reports)
        .map(|(slot, report)| {
            slot.unwrap_or_else(|| ReportResult {
                id: report.id.clone(),
                family: report.family,
                outcome: ReportOutcome::Failed {
                    stage: Stage::Params,
                    error: "report task aborted".into(),
                },
                elapsed_ms: 0,
            })
        })
        .collect();

    let summary = RunSummary {
        status: RunStatus::from_results(&reports),
        started_at,
        finished_at: Utc::now(),
        reports,
        datasets: cache.loaded(),
    };

    tracing::info!(status = ?summary.status, "run finished");

    if plan.manifest
        && let Err(error) = write_manifest(&plan.output_dir, &summary)
    {
        tracing::warn!(error = %format!("{error:#}"), "failed to write run manifest");
    }
    summary
}

fn not_run(id: String, family: ReportFamily) -> ReportResult {
    ReportResult {
        id,
        family,
        outcome: ReportOutcome::NotRun,
        elapsed_ms: 0,
    }
}

fn write_manifest(output_dir: &Path, summary: &RunSummary) -> anyhow::Result<PathBuf> {
    let mut bytes = serde_json::to_vec_pretty(summary)?;
    bytes.push(b'\n');
    let path = output_dir.join(MANIFEST_FILE);
    tlf_render::write_atomic(&path, &bytes)?;
    Ok(path)
}
