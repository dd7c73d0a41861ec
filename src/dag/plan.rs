// src/dag/plan.rs

//! Resolve + sort: turn a generation's registry snapshot into an ordered,
//! fully wired list of tasks for the engine.

use std::sync::Arc;

use crate::dag::registry::RunEntry;
use crate::dag::resolver::resolve_dependencies;
use crate::dag::toposort::topological_order;
use crate::engine::waiter::PlannedTask;
use crate::engine::TaskName;
use crate::errors::RunError;
use crate::handle::TaskSlot;

/// Resolved edges plus a valid execution order, both indexed like `tasks`.
pub(crate) struct ResolvedOrder {
    pub edges: Vec<Vec<usize>>,
    pub order: Vec<usize>,
}

pub(crate) fn resolve_and_sort(
    tasks: &[(&str, &[TaskName])],
    ignore_missing: bool,
) -> Result<ResolvedOrder, RunError> {
    let edges = resolve_dependencies(tasks, ignore_missing)?;
    let order = topological_order(&edges).map_err(|cycle| RunError::CycleDetected {
        tasks: cycle
            .nodes
            .iter()
            .map(|&i| tasks[i].0.to_string())
            .collect(),
    })?;
    Ok(ResolvedOrder { edges, order })
}

/// Consume the run entries and produce them in execution order, each with
/// direct references to its dependencies' slots.
pub(crate) fn plan_run(
    entries: Vec<RunEntry>,
    ignore_missing: bool,
) -> Result<Vec<PlannedTask>, RunError> {
    let declarations: Vec<(&str, &[TaskName])> = entries
        .iter()
        .map(|e| (e.slot.title(), e.declared.as_slice()))
        .collect();
    let ResolvedOrder { edges, order } = resolve_and_sort(&declarations, ignore_missing)?;

    let slots: Vec<Arc<TaskSlot>> = entries.iter().map(|e| Arc::clone(&e.slot)).collect();
    let mut entries: Vec<Option<RunEntry>> = entries.into_iter().map(Some).collect();

    let mut planned = Vec::with_capacity(order.len());
    for i in order {
        let Some(entry) = entries[i].take() else {
            continue;
        };
        planned.push(PlannedTask {
            slot: entry.slot,
            deps: edges[i].iter().map(|&d| Arc::clone(&slots[d])).collect(),
            job: entry.job,
        });
    }

    Ok(planned)
}
