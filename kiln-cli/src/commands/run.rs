//! `kiln [TASK]` — load the pipeline and run, plan or list tasks.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use kiln_core::config::{self, PipelineSource};
use kiln_core::{PipelineConfig, RegistryBuilder, TaskName, TaskRegistry};
use kiln_sync::{FileChange, Pipeline, RunReport};

use super::list;

/// Arguments for `kiln [TASK]`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Task to run.
    #[arg(default_value = "default")]
    pub task: String,

    /// Project root (defaults to the current directory).
    #[arg(long, value_name = "DIR")]
    pub base: Option<PathBuf>,

    /// Pipeline file (defaults to <base>/kiln.yaml, else the built-in pipeline).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// List the available tasks and exit.
    #[arg(long)]
    pub list: bool,

    /// Print the steps TASK would run without running them.
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let base = match &self.base {
            Some(base) => std::path::absolute(base)
                .with_context(|| format!("invalid base directory {}", base.display()))?,
            None => std::env::current_dir().context("could not determine current directory")?,
        };
        let (config, source) = config::discover(&base, self.config.as_deref())
            .context("failed to load pipeline configuration")?;
        tracing::debug!("pipeline: {}", describe_source(&source));

        if self.list {
            list::print_tasks(&registry(&config)?, &source);
            return Ok(());
        }

        let task = TaskName::from(self.task.as_str());
        if self.dry_run {
            return print_plan(&registry(&config)?, &task);
        }

        let pipeline = Pipeline::new(&base, &config)
            .with_context(|| format!("failed to prepare pipeline in {}", base.display()))?;
        let report = pipeline
            .run(&task)
            .with_context(|| format!("task \"{task}\" failed"))?;
        print_report(&report, &base);
        Ok(())
    }
}

fn registry(config: &PipelineConfig) -> Result<TaskRegistry> {
    RegistryBuilder::from_config(config)
        .build()
        .context("invalid pipeline configuration")
}

pub(crate) fn describe_source(source: &PipelineSource) -> String {
    match source {
        PipelineSource::File(path) => path.display().to_string(),
        PipelineSource::Builtin => "built-in".to_owned(),
    }
}

fn print_plan(registry: &TaskRegistry, task: &TaskName) -> Result<()> {
    let plan = registry
        .expand(task)
        .with_context(|| format!("cannot plan task \"{task}\""))?;
    println!("[dry-run] task \"{task}\" would run {} steps", plan.len());
    for (i, op) in plan.iter().enumerate() {
        println!("  {:>2}. {op}", i + 1);
    }
    Ok(())
}

fn print_report(report: &RunReport, base: &Path) {
    let elapsed = report.finished_at - report.started_at;
    println!(
        "{} task \"{}\" finished: {} steps, {} written, {} removed ({} ms)",
        "✓".green().bold(),
        report.task,
        report.steps.len(),
        report.files_written(),
        report.paths_removed(),
        elapsed.num_milliseconds(),
    );

    for change in report.steps.iter().flat_map(|s| s.changes.iter()) {
        let path = change.path();
        let shown = path.strip_prefix(base).unwrap_or(path).display();
        match change {
            FileChange::Written { .. } => tracing::debug!("  ✎  {shown}"),
            FileChange::Removed { .. } => tracing::debug!("  ✗  {shown}"),
        }
    }
}
