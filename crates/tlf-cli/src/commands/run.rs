use tlf_config::{ReportConfig, TlfConfig};

use crate::bootstrap;
use crate::cli::root_commands::RunArgs;
use crate::cli::{GlobalFlags, OutputFormat};
use crate::output::{Tabular, output};
use crate::pipeline::{self, ReportOutcome, RunPlan, RunStatus, RunSummary};

/// Handle `tlf run`.
///
/// Configuration and selection errors abort before any report runs. After
/// that the exit code comes from the run status: 0, 2 for partial, 1.
pub async fn handle(args: &RunArgs, flags: &GlobalFlags) -> anyhow::Result<i32> {
    let config = bootstrap::load_config(flags)?;
    let reports: Vec<ReportConfig> = config
        .select(&args.reports)?
        .into_iter()
        .cloned()
        .collect();

    let base = TlfConfig::base_dir(&flags.config);
    let mut run = config.run.clone();
    if let Some(jobs) = args.jobs {
        run.jobs = jobs;
    }
    if let Some(secs) = args.deadline_secs {
        run.deadline_secs = Some(secs);
    }

    let plan = RunPlan {
        reports,
        data_dir: config.paths.data_dir_in(&base),
        output_dir: config.paths.output_dir_in(&base),
        workers: run.worker_count(),
        deadline: run.deadline(),
        manifest: run.manifest && !args.no_manifest,
    };

    let summary = pipeline::run(plan).await;
    output(&summary, flags.format)?;
    if flags.format == OutputFormat::Table && !flags.quiet {
        println!("{}", status_line(summary.status, summary.reports.len()));
    }
    Ok(summary.status.exit_code())
}

fn status_line(status: RunStatus, total: usize) -> String {
    match status {
        RunStatus::Success => format!("success: {total} of {total} reports written"),
        RunStatus::Partial { succeeded, total } => {
            format!("partial: {succeeded} of {total} reports written")
        }
        RunStatus::Failure => format!("failure: 0 of {total} reports written"),
    }
}

impl Tabular for RunSummary {
    fn headers(&self) -> Vec<&'static str> {
        vec!["report", "family", "status", "stage", "detail", "ms"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.reports
            .iter()
            .map(|r| {
                let (stage, detail) = match &r.outcome {
                    ReportOutcome::Succeeded { artifact, .. } => {
                        (String::new(), artifact.path.display().to_string())
                    }
                    ReportOutcome::Failed { stage, error } => (stage.to_string(), error.clone()),
                    ReportOutcome::NotRun => (String::new(), "deadline passed".to_string()),
                };
                vec![
                    r.id.clone(),
                    r.family.to_string(),
                    r.outcome.label().to_string(),
                    stage,
                    detail,
                    r.elapsed_ms.to_string(),
                ]
            })
            .collect()
    }
}
