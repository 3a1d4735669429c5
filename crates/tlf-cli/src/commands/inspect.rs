use std::sync::Arc;

use serde::Serialize;
use tlf_config::TlfConfig;
use tlf_core::{DataType, Dataset};
use tlf_data::DatasetLoader;

use crate::bootstrap;
use crate::cli::root_commands::InspectArgs;
use crate::cli::{GlobalFlags, OutputFormat};
use crate::output::{Tabular, output};

#[derive(Debug, Serialize)]
struct ColumnInfo {
    name: String,
    dtype: DataType,
    nulls: usize,
}

#[derive(Debug, Serialize)]
struct DatasetInfo {
    name: String,
    path: String,
    sha256: String,
    rows: usize,
    columns: Vec<ColumnInfo>,
}

impl DatasetInfo {
    fn new(dataset: &Dataset, path: String) -> Self {
        Self {
            name: dataset.name().to_string(),
            path,
            sha256: dataset.id().sha256.clone(),
            rows: dataset.row_count(),
            columns: dataset
                .columns()
                .iter()
                .map(|c| ColumnInfo {
                    name: c.name().to_string(),
                    dtype: c.dtype(),
                    nulls: c.values().iter().filter(|v| v.is_null()).count(),
                })
                .collect(),
        }
    }
}

impl Tabular for DatasetInfo {
    fn headers(&self) -> Vec<&'static str> {
        vec!["column", "type", "nulls"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.columns
            .iter()
            .map(|c| vec![c.name.clone(), c.dtype.to_string(), c.nulls.to_string()])
            .collect()
    }
}

/// Handle `tlf inspect <dataset>`.
pub async fn handle(args: &InspectArgs, flags: &GlobalFlags) -> anyhow::Result<i32> {
    let config = bootstrap::load_config(flags)?;
    let base = TlfConfig::base_dir(&flags.config);
    let loader = Arc::new(DatasetLoader::new(config.paths.data_dir_in(&base)));

    let name = args.dataset.clone();
    let info = tokio::task::spawn_blocking(move || {
        let (path, _) = loader.resolve(&name)?;
        let dataset = loader.load(&name)?;
        Ok::<_, anyhow::Error>(DatasetInfo::new(&dataset, path.display().to_string()))
    })
    .await??;

    if flags.format == OutputFormat::Table && !flags.quiet {
        println!(
            "{} ({}): {} rows, sha256 {}",
            info.name, info.path, info.rows, info.sha256
        );
    }
    output(&info, flags.format)?;
    Ok(0)
}
