//! Task registry — validated, immutable graph of named tasks.
//!
//! # Build flow
//!
//! ```text
//! PipelineConfig ──RegistryBuilder::from_config──▶ RegistryBuilder
//!                                                    │ .task(..) (optional extra tasks)
//!                                                    ▼
//!                                                  build()
//!                                                    │ 1. parse every step
//!                                                    │ 2. check task + target references
//!                                                    │ 3. reject cycles
//!                                                    ▼
//!                                               TaskRegistry (read-only)
//! ```
//!
//! Because cycles and dangling references are rejected at build time,
//! [`TaskRegistry::expand`] only ever fails for an unknown root task.

use std::collections::{BTreeMap, HashMap};

use crate::error::ConfigError;
use crate::types::{OperationRef, PipelineConfig, Step, Targets, Task, TaskName};

// ---------------------------------------------------------------------------
// 1. Builder
// ---------------------------------------------------------------------------

/// Collects task definitions and target availability, then validates them
/// into a [`TaskRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tasks: Vec<(TaskName, Option<String>, Vec<String>)>,
    targets: Targets,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the builder with every task and target of a pipeline file.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut builder = Self::new().targets(config.targets.clone());
        for (name, def) in &config.tasks {
            builder = builder.task(
                name.clone(),
                def.description().map(str::to_owned),
                def.raw_steps().into_iter().map(str::to_owned).collect(),
            );
        }
        builder
    }

    /// Targets that `kind:target` steps are checked against.
    pub fn targets(mut self, targets: Targets) -> Self {
        self.targets = targets;
        self
    }

    /// Register a task from its textual steps.
    pub fn task(
        mut self,
        name: impl Into<TaskName>,
        description: Option<String>,
        steps: Vec<String>,
    ) -> Self {
        self.tasks.push((name.into(), description, steps));
        self
    }

    /// Validate and freeze.
    pub fn build(self) -> Result<TaskRegistry, ConfigError> {
        let mut tasks: BTreeMap<TaskName, Task> = BTreeMap::new();
        for (name, description, raw_steps) in self.tasks {
            if tasks.contains_key(&name) {
                return Err(ConfigError::DuplicateTask(name));
            }
            let steps = raw_steps
                .iter()
                .map(|raw| Step::parse(raw))
                .collect::<Result<Vec<_>, _>>()?;
            tasks.insert(name.clone(), Task { name, description, steps });
        }

        for task in tasks.values() {
            for step in &task.steps {
                match step {
                    Step::RunTask(dep) if !tasks.contains_key(dep) => {
                        return Err(ConfigError::UnknownTask {
                            name: dep.clone(),
                            referenced_by: Some(task.name.clone()),
                        });
                    }
                    Step::RunOperation(op) if !self.targets.contains(op.kind, &op.target) => {
                        return Err(ConfigError::UnknownTarget {
                            kind: op.kind,
                            target: op.target.clone(),
                            referenced_by: Some(task.name.clone()),
                        });
                    }
                    _ => {}
                }
            }
        }

        if let Some(path) = find_cycle(&tasks) {
            return Err(ConfigError::Cycle { path });
        }

        Ok(TaskRegistry { tasks })
    }
}

// ---------------------------------------------------------------------------
// 2. Registry
// ---------------------------------------------------------------------------

/// Read-only set of validated tasks.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, Task>,
}

impl TaskRegistry {
    /// Look up a task; unknown names are [`ConfigError::UnknownTask`].
    pub fn get(&self, name: &TaskName) -> Result<&Task, ConfigError> {
        self.tasks.get(name).ok_or_else(|| ConfigError::UnknownTask {
            name: name.clone(),
            referenced_by: None,
        })
    }

    pub fn contains(&self, name: &TaskName) -> bool {
        self.tasks.contains_key(name)
    }

    /// All tasks, sorted by name.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Flatten `name` into the ordered operations it would run.
    ///
    /// Referenced tasks are expanded depth-first at the point of reference.
    pub fn expand(&self, name: &TaskName) -> Result<Vec<OperationRef>, ConfigError> {
        let mut out = Vec::new();
        self.expand_into(name, &mut out)?;
        Ok(out)
    }

    fn expand_into(&self, name: &TaskName, out: &mut Vec<OperationRef>) -> Result<(), ConfigError> {
        for step in &self.get(name)?.steps {
            match step {
                Step::RunOperation(op) => out.push(op.clone()),
                Step::RunTask(dep) => self.expand_into(dep, out)?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 3. Cycle detection
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Depth-first search over task references. Returns the first cycle found as
/// a path that starts and ends with the same task.
fn find_cycle(tasks: &BTreeMap<TaskName, Task>) -> Option<Vec<TaskName>> {
    let mut marks: HashMap<&TaskName, Mark> = HashMap::new();
    let mut path: Vec<&TaskName> = Vec::new();
    for name in tasks.keys() {
        if let Some(cycle) = visit(name, tasks, &mut marks, &mut path) {
            return Some(cycle);
        }
    }
    None
}

fn visit<'a>(
    name: &'a TaskName,
    tasks: &'a BTreeMap<TaskName, Task>,
    marks: &mut HashMap<&'a TaskName, Mark>,
    path: &mut Vec<&'a TaskName>,
) -> Option<Vec<TaskName>> {
    match marks.get(name) {
        Some(Mark::Done) => return None,
        Some(Mark::InProgress) => {
            let start = path.iter().position(|n| *n == name).unwrap_or(0);
            let mut cycle: Vec<TaskName> = path[start..].iter().map(|n| (*n).clone()).collect();
            cycle.push(name.clone());
            return Some(cycle);
        }
        None => {}
    }

    marks.insert(name, Mark::InProgress);
    path.push(name);
    if let Some(task) = tasks.get(name) {
        for step in &task.steps {
            if let Step::RunTask(dep) = step {
                if let Some(cycle) = visit(dep, tasks, marks, path) {
                    return Some(cycle);
                }
            }
        }
    }
    path.pop();
    marks.insert(name, Mark::Done);
    None
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CleanTarget, OperationKind, TargetName};

    fn steps(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn targets() -> Targets {
        let mut t = Targets::default();
        for name in ["a1", "a2", "b", "c"] {
            t.clean.insert(TargetName::from(name), CleanTarget { paths: vec![name.to_string()] });
        }
        t
    }

    #[test]
    fn expansion_preserves_declared_order() {
        let registry = RegistryBuilder::new()
            .targets(targets())
            .task("A", None, steps(&["clean:a1", "clean:a2"]))
            .task("top", None, steps(&["A", "clean:b", "clean:c"]))
            .build()
            .unwrap();
        let order: Vec<String> = registry
            .expand(&TaskName::from("top"))
            .unwrap()
            .iter()
            .map(|op| op.target.0.clone())
            .collect();
        assert_eq!(order, vec!["a1", "a2", "b", "c"]);
    }

    #[test]
    fn task_referenced_twice_expands_twice() {
        let registry = RegistryBuilder::new()
            .targets(targets())
            .task("A", None, steps(&["clean:a1"]))
            .task("top", None, steps(&["A", "clean:b", "A"]))
            .build()
            .unwrap();
        let ops = registry.expand(&TaskName::from("top")).unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[2].kind, OperationKind::Clean);
        assert_eq!(ops[2].target, TargetName::from("a1"));
    }

    #[test]
    fn unknown_root_task_is_rejected_at_expansion() {
        let registry = RegistryBuilder::new().build().unwrap();
        let err = registry.expand(&TaskName::from("nope")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTask { referenced_by: None, .. }));
    }

    #[test]
    fn dangling_task_reference_is_rejected_at_build() {
        let err = RegistryBuilder::new()
            .task("top", None, steps(&["missing"]))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("referenced by 'top'"), "got: {err}");
    }

    #[test]
    fn unknown_target_is_rejected_at_build() {
        let err = RegistryBuilder::new()
            .targets(targets())
            .task("top", None, steps(&["copy:a1"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTarget { .. }));
    }

    #[test]
    fn duplicate_task_is_rejected() {
        let err = RegistryBuilder::new()
            .task("x", None, vec![])
            .task("x", None, vec![])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateTask(_)));
    }

    #[test]
    fn cycle_is_reported_with_its_path() {
        let err = RegistryBuilder::new()
            .task("a", None, steps(&["b"]))
            .task("b", None, steps(&["c"]))
            .task("c", None, steps(&["a"]))
            .build()
            .unwrap_err();
        match err {
            ConfigError::Cycle { path } => {
                let names: Vec<_> = path.iter().map(|t| t.0.as_str()).collect();
                assert_eq!(names, vec!["a", "b", "c", "a"]);
            }
            other => panic!("expected cycle, got {other}"),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let err = RegistryBuilder::new()
            .task("loop", None, steps(&["loop"]))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("loop -> loop"));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let registry = RegistryBuilder::new()
            .targets(targets())
            .task("leaf", None, steps(&["clean:a1"]))
            .task("left", None, steps(&["leaf"]))
            .task("right", None, steps(&["leaf"]))
            .task("top", None, steps(&["left", "right"]))
            .build()
            .unwrap();
        assert_eq!(registry.expand(&TaskName::from("top")).unwrap().len(), 2);
    }
}
