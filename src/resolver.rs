//! The execution-order resolver: a Kahn-style topological sort over the
//! coil → contact dependency graph, with a deterministic fallback for
//! residual cycles (latching/feedback circuits are expected, not an
//! error — see the design note on cycles).
//!
//! Computed once per program load (and once per `LoadProgram`), never
//! per scan.

use std::collections::{HashMap, HashSet};

use crate::element::Program;

/// A permutation of rung indices: the order the program evaluator
/// should walk `program.rungs` in for one scan.
pub type ExecutionOrder = Vec<usize>;

/// Resolve the execution order for `program`.
pub fn resolve(program: &Program) -> ExecutionOrder {
    let n = program.rungs.len();
    if n == 0 {
        return Vec::new();
    }

    let coils_by_rung: Vec<HashSet<&str>> =
        program.rungs.iter().map(|r| r.coil_targets().collect()).collect();
    let contacts_by_rung: Vec<HashSet<&str>> =
        program.rungs.iter().map(|r| r.contact_sources().collect()).collect();

    // dependents[j] = rungs i such that j -> i (i observes a coil driven by j).
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut indegree: Vec<usize> = vec![0; n];

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            if !coils_by_rung[j].is_disjoint(&contacts_by_rung[i]) {
                dependents[j].push(i);
                indegree[i] += 1;
            }
        }
    }

    let mut order = Vec::with_capacity(n);
    let mut emitted = vec![false; n];
    let mut remaining_indegree = indegree.clone();

    loop {
        // Lowest original index among all ready, not-yet-emitted rungs —
        // keeps the whole resolver a deterministic function of program
        // order plus dependencies (see the resolved open question).
        let ready = (0..n).find(|&i| !emitted[i] && remaining_indegree[i] == 0);

        match ready {
            Some(i) => {
                emitted[i] = true;
                order.push(i);
                for &d in &dependents[i] {
                    remaining_indegree[d] = remaining_indegree[d].saturating_sub(1);
                }
            }
            None => break,
        }
    }

    // Residual cycle: emit whatever's left in original program order.
    for i in 0..n {
        if !emitted[i] {
            order.push(i);
        }
    }

    debug_assert_eq!(order.len(), n, "every rung must appear exactly once");
    order
}

/// Rung-index dependency map, exposed for callers (tests, diagnostics)
/// that want to inspect the graph without recomputing it by hand.
pub fn dependency_edges(program: &Program) -> HashMap<usize, HashSet<usize>> {
    let coils_by_rung: Vec<HashSet<&str>> =
        program.rungs.iter().map(|r| r.coil_targets().collect()).collect();
    let contacts_by_rung: Vec<HashSet<&str>> =
        program.rungs.iter().map(|r| r.contact_sources().collect()).collect();

    let n = program.rungs.len();
    let mut edges = HashMap::new();
    for i in 0..n {
        let mut deps = HashSet::new();
        for j in 0..n {
            if i != j && !coils_by_rung[j].is_disjoint(&contacts_by_rung[i]) {
                deps.insert(j);
            }
        }
        edges.insert(i, deps);
    }
    edges
}
