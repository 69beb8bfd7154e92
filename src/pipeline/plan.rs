//! Static view of the work an update would touch.
//!
//! The executive walks the graph recursively and never needs a plan to run.
//! [`UpdatePlan`] exists for introspection: it lists the upstream closure of
//! a port in the order the execute pass visits it, which is what tooling and
//! tests want to look at.

use crate::pipeline::graph::Graph;
use crate::pipeline::id::{AlgorithmId, InputPortId, PortId};
use serde::Serialize;
use std::collections::VecDeque;

/// The upstream closure of one port.
#[derive(Debug, Clone, Serialize)]
pub struct UpdatePlan {
    pub target: AlgorithmId,
    /// Every algorithm the target depends on (and the target itself), each
    /// after all of its producers.
    pub order: Vec<AlgorithmId>,
    /// Members with no connected inputs.
    pub sources: Vec<AlgorithmId>,
    /// Connections between members, as `(producer port, consumer input)`.
    pub connections: Vec<(u32, u32)>,
    pub stats: PlanStats,
}

impl UpdatePlan {
    pub fn contains(&self, id: AlgorithmId) -> bool {
        self.order.contains(&id)
    }

    /// Position of `id` in execute order.
    pub fn position(&self, id: AlgorithmId) -> Option<usize> {
        self.order.iter().position(|&a| a == id)
    }

    pub fn planned_connections(&self) -> impl Iterator<Item = (PortId, InputPortId)> + '_ {
        self.connections
            .iter()
            .map(|&(from, to)| (PortId(from), InputPortId(to)))
    }
}

/// Statistics about a plan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanStats {
    /// Algorithms registered with the coordinator.
    pub total_algorithms: usize,

    /// Algorithms in the upstream closure.
    pub planned_algorithms: usize,

    /// Registered algorithms the update does not touch.
    pub excluded_algorithms: usize,

    /// Planned algorithms with no connected inputs.
    pub source_algorithms: usize,

    /// Compilation time in microseconds
    pub compile_time_us: u64,
}

/// Builds [`UpdatePlan`]s from the graph.
pub struct PlanCompiler;

impl PlanCompiler {
    pub(crate) fn compile(graph: &Graph, target: AlgorithmId) -> UpdatePlan {
        let start_time = std::time::Instant::now();
        let n = graph.len();
        let (_, bwd_adj) = graph.adjacency();

        let active = if target.index() < n {
            Self::backward_reachability(&[target.index()], &bwd_adj, n)
        } else {
            vec![false; n]
        };

        let order: Vec<AlgorithmId> = Self::topological_sort_active(graph, &active)
            .into_iter()
            .map(|i| AlgorithmId(i as u32))
            .collect();

        let sources: Vec<AlgorithmId> = order
            .iter()
            .copied()
            .filter(|id| bwd_adj[id.index()].is_empty())
            .collect();

        let connections = graph
            .connections()
            .filter(|c| {
                active[c.source().algorithm().index()] && active[c.sink().algorithm().index()]
            })
            .map(|c| (c.source().0, c.sink().0))
            .collect();

        let stats = PlanStats {
            total_algorithms: n,
            planned_algorithms: order.len(),
            excluded_algorithms: n.saturating_sub(order.len()),
            source_algorithms: sources.len(),
            compile_time_us: start_time.elapsed().as_micros() as u64,
        };

        UpdatePlan {
            target,
            order,
            sources,
            connections,
            stats,
        }
    }

    /// Mark everything reachable from `starts` along `fwd_adj` using DFS.
    pub(crate) fn forward_reachability(starts: &[usize], fwd_adj: &[Vec<usize>], n: usize) -> Vec<bool> {
        let mut reachable = vec![false; n];
        let mut stack = Vec::new();

        for &start in starts {
            if start < n {
                reachable[start] = true;
                stack.push(start);
            }
        }

        while let Some(node) = stack.pop() {
            for &neighbor in &fwd_adj[node] {
                if !reachable[neighbor] {
                    reachable[neighbor] = true;
                    stack.push(neighbor);
                }
            }
        }

        reachable
    }

    /// Mark everything `starts` depends on using DFS over `bwd_adj`.
    fn backward_reachability(starts: &[usize], bwd_adj: &[Vec<usize>], n: usize) -> Vec<bool> {
        // Same walk, opposite edges.
        Self::forward_reachability(starts, bwd_adj, n)
    }

    /// Topological sort of active algorithms using Kahn's algorithm. Ties
    /// resolve by algorithm index, so the order is reproducible.
    fn topological_sort_active(graph: &Graph, active: &[bool]) -> Vec<usize> {
        let n = active.len();
        let mut adj = vec![Vec::new(); n];
        let mut in_degree = vec![0usize; n];

        for conn in graph.connections() {
            let from = conn.source().algorithm().index();
            let to = conn.sink().algorithm().index();
            if from >= n || to >= n {
                continue;
            }
            if active[from] && active[to] {
                adj[from].push(to);
                in_degree[to] += 1;
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| active[i] && in_degree[i] == 0).collect();
        let mut result = Vec::new();

        while let Some(node) = queue.pop_front() {
            result.push(node);
            for &neighbor in &adj[node] {
                in_degree[neighbor] -= 1;
                if in_degree[neighbor] == 0 {
                    queue.push_back(neighbor);
                }
            }
        }

        result
    }
}
