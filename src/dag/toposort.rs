// src/dag/toposort.rs

//! Cycle detection and topological ordering (Kahn's algorithm).

use std::collections::VecDeque;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

/// Nodes that could not be ordered because they lie on a dependency cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    /// Every node that sits on some cycle, ascending.
    pub nodes: Vec<usize>,
}

/// Order nodes `0..deps.len()` so that every node comes after all of its
/// dependencies. `deps[i]` lists the nodes `i` depends on.
///
/// Siblings keep no particular order beyond what the edges demand.
///
/// # Panics
///
/// Panics if a dependency index is `>= deps.len()`.
pub fn topological_order(deps: &[Vec<usize>]) -> Result<Vec<usize>, Cycle> {
    let n = deps.len();

    let mut in_degree: Vec<usize> = deps.iter().map(Vec::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (node, node_deps) in deps.iter().enumerate() {
        for &dep in node_deps {
            dependents[dep].push(node);
        }
    }

    let mut ready: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(node) = ready.pop_front() {
        order.push(node);
        for &dependent in &dependents[node] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push_back(dependent);
            }
        }
    }

    if order.len() == n {
        return Ok(order);
    }

    // Leftovers are the cycles plus everything downstream of them.
    let stuck: Vec<usize> = (0..n).filter(|&i| in_degree[i] > 0).collect();
    Err(Cycle {
        nodes: cycle_members(deps, &stuck),
    })
}

/// Narrow the stuck set down to nodes that are actually on a cycle.
fn cycle_members(deps: &[Vec<usize>], stuck: &[usize]) -> Vec<usize> {
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for &node in stuck {
        graph.add_node(node);
    }
    for &node in stuck {
        for &dep in &deps[node] {
            if graph.contains_node(dep) {
                graph.add_edge(dep, node, ());
            }
        }
    }

    let mut members: Vec<usize> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .flatten()
        .collect();

    if members.is_empty() {
        members = stuck.to_vec();
    }
    members.sort_unstable();
    members
}
