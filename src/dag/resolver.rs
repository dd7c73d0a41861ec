// src/dag/resolver.rs

//! Dependency resolution: dependency titles -> task indices.

use std::collections::HashMap;

use tracing::warn;

use crate::engine::TaskName;
use crate::errors::RunError;

/// Resolve every task's declared dependency titles to indices into `tasks`.
///
/// The result has one entry per task, in the same order as `tasks`. Repeated
/// names in one task's list collapse to a single edge.
///
/// With `ignore_missing = false` the first unknown title aborts resolution
/// with [`RunError::MissingDependency`]; with `true` it is dropped and logged.
pub(crate) fn resolve_dependencies(
    tasks: &[(&str, &[TaskName])],
    ignore_missing: bool,
) -> Result<Vec<Vec<usize>>, RunError> {
    let index: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, (title, _))| (*title, i))
        .collect();

    let mut resolved = Vec::with_capacity(tasks.len());

    for (title, declared) in tasks {
        let mut deps: Vec<usize> = Vec::with_capacity(declared.len());

        for dep in declared.iter() {
            match index.get(dep.as_str()) {
                Some(&i) => {
                    if !deps.contains(&i) {
                        deps.push(i);
                    }
                }
                None if ignore_missing => {
                    warn!(
                        task = %title,
                        dependency = %dep,
                        "ignoring dependency on unknown task"
                    );
                }
                None => {
                    return Err(RunError::MissingDependency {
                        task: title.to_string(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        resolved.push(deps);
    }

    Ok(resolved)
}
