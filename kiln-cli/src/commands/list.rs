//! `kiln --list` — task table.

use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use kiln_core::config::PipelineSource;
use kiln_core::{Step, Task, TaskRegistry};

use super::run::describe_source;

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "task")]
    name: String,
    #[tabled(rename = "steps")]
    steps: String,
    #[tabled(rename = "description")]
    description: String,
}

pub fn print_tasks(registry: &TaskRegistry, source: &PipelineSource) {
    println!(
        "kiln v{} | pipeline: {}",
        env!("CARGO_PKG_VERSION"),
        describe_source(source).bold()
    );

    let rows: Vec<TaskRow> = registry.tasks().map(row).collect();
    if rows.is_empty() {
        println!("No tasks defined.");
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn row(task: &Task) -> TaskRow {
    let steps = task
        .steps
        .iter()
        .map(|step| match step {
            Step::RunOperation(op) => op.to_string(),
            Step::RunTask(name) => name.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    TaskRow {
        name: task.name.to_string(),
        steps,
        description: task.description.clone().unwrap_or_default(),
    }
}
