//! Task executor shared by every CLI entry point.
//!
//! A [`Pipeline`] owns the frozen configuration for one project root: the
//! composed metadata, the per-kind targets and the validated
//! [`TaskRegistry`]. [`Pipeline::run`] walks a task's steps in declared order,
//! expanding referenced tasks inline, and stops at the first failure.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use kiln_core::metadata::build_context;
use kiln_core::{
    ConfigError, Metadata, OperationKind, OperationRef, PipelineConfig, RegistryBuilder, Step,
    TargetName, Targets, TaskName, TaskRegistry,
};

use crate::context::StepContext;
use crate::error::SyncError;
use crate::writer::FileChange;
use crate::{clean, compress, concat, copy, manifest, tool};

/// Lifecycle of a task within one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Done,
}

/// One executed operation and what it did to the filesystem.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub op: OperationRef,
    pub changes: Vec<FileChange>,
}

/// Summary of a successful [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub task: TaskName,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepOutcome>,
    /// Tasks in the order they reached [`TaskState::Done`].
    pub tasks_completed: Vec<TaskName>,
    /// Final state of every task this run touched.
    pub task_states: BTreeMap<TaskName, TaskState>,
}

impl RunReport {
    pub fn files_written(&self) -> usize {
        self.count(|c| matches!(c, FileChange::Written { .. }))
    }

    pub fn paths_removed(&self) -> usize {
        self.count(|c| matches!(c, FileChange::Removed { .. }))
    }

    fn count(&self, pred: impl Fn(&FileChange) -> bool) -> usize {
        self.steps
            .iter()
            .flat_map(|s| s.changes.iter())
            .filter(|c| pred(c))
            .count()
    }
}

#[derive(Debug)]
pub struct Pipeline {
    root: PathBuf,
    metadata: Metadata,
    targets: Targets,
    registry: TaskRegistry,
}

impl Pipeline {
    /// Validate `config` and compose its metadata against `root`.
    pub fn new(root: impl Into<PathBuf>, config: &PipelineConfig) -> Result<Self, SyncError> {
        let root = root.into();
        let registry = RegistryBuilder::from_config(config).build()?;
        let metadata = build_context(&root, &config.metadata)?;
        Ok(Self {
            root,
            metadata,
            targets: config.targets.clone(),
            registry,
        })
    }

    /// The operations `task` would run, in order, without running them.
    pub fn plan(&self, task: &TaskName) -> Result<Vec<OperationRef>, SyncError> {
        Ok(self.registry.expand(task)?)
    }

    /// Run `task` to completion, or stop at the first failing step.
    ///
    /// Output produced by steps before the failure stays on disk.
    pub fn run(&self, task: &TaskName) -> Result<RunReport, SyncError> {
        self.registry.get(task)?;
        tracing::debug!("running task \"{task}\" in {}", self.root.display());

        let mut run = Run {
            states: BTreeMap::new(),
            steps: Vec::new(),
            completed: Vec::new(),
        };
        let started_at = Utc::now();
        self.run_task(task, &mut run)?;

        Ok(RunReport {
            task: task.clone(),
            started_at,
            finished_at: Utc::now(),
            steps: run.steps,
            tasks_completed: run.completed,
            task_states: run.states,
        })
    }

    fn run_task(&self, name: &TaskName, run: &mut Run) -> Result<(), SyncError> {
        let task = self.registry.get(name)?;
        if run.state(name) == TaskState::Running {
            return Err(ConfigError::Cycle {
                path: vec![name.clone(), name.clone()],
            }
            .into());
        }
        run.states.insert(name.clone(), TaskState::Running);

        for step in &task.steps {
            match step {
                Step::RunOperation(op) => {
                    tracing::info!("Running \"{op}\"");
                    let changes = self.run_operation(op).map_err(|e| SyncError::StepFailed {
                        step: op.to_string(),
                        source: Box::new(e),
                    })?;
                    run.steps.push(StepOutcome {
                        op: op.clone(),
                        changes,
                    });
                }
                Step::RunTask(dep) => self.run_task(dep, run)?,
            }
        }

        run.states.insert(name.clone(), TaskState::Done);
        run.completed.push(name.clone());
        Ok(())
    }

    /// Run a single `kind:target` operation.
    fn run_operation(&self, op: &OperationRef) -> Result<Vec<FileChange>, SyncError> {
        let ctx = StepContext::new(&self.root, &self.metadata);
        let t = &self.targets;
        match op.kind {
            OperationKind::Clean => clean::run(lookup(&t.clean, op)?, &ctx),
            OperationKind::Concat => concat::run(lookup(&t.concat, op)?, &ctx),
            OperationKind::Copy => copy::run(lookup(&t.copy, op)?, &ctx),
            OperationKind::Compress => compress::run(lookup(&t.compress, op)?, &ctx),
            OperationKind::Minify => tool::minify(lookup(&t.minify, op)?, &ctx),
            OperationKind::Exec => tool::exec(lookup(&t.exec, op)?, &ctx),
            OperationKind::Manifest => manifest::run(lookup(&t.manifest, op)?, &ctx),
        }
    }
}

struct Run {
    states: BTreeMap<TaskName, TaskState>,
    steps: Vec<StepOutcome>,
    completed: Vec<TaskName>,
}

impl Run {
    fn state(&self, name: &TaskName) -> TaskState {
        self.states.get(name).copied().unwrap_or(TaskState::Pending)
    }
}

fn lookup<'a, T>(
    map: &'a BTreeMap<TargetName, T>,
    op: &OperationRef,
) -> Result<&'a T, SyncError> {
    map.get(&op.target).ok_or_else(|| {
        ConfigError::UnknownTarget {
            kind: op.kind,
            target: op.target.clone(),
            referenced_by: None,
        }
        .into()
    })
}
