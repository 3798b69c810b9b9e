// Shortest-path tree toward a sink.
//
// Distances are path costs *to* the sink, so the search runs from the sink
// over reversed edges. Dijkstra is used when every usable cost is
// nonnegative, Bellman-Ford otherwise. Under Dijkstra, equal-cost choices
// for an unsettled state go to its earliest arc. Bellman-Ford replaces a
// tree edge only on strict improvement.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::graph::ScalarGraph;
use crate::{StateId, WfstError};

/// Per-state distance to the sink and the out-edge achieving it.
#[derive(Debug, Clone)]
pub struct ShortestPathTree {
    sink: StateId,
    dist: Vec<f64>,
    tree_edge: Vec<Option<usize>>,
}

impl ShortestPathTree {
    pub fn sink(&self) -> StateId {
        self.sink
    }

    /// Cost of the best path from `state` to the sink; `+inf` if none.
    #[inline]
    pub fn distance(&self, state: StateId) -> f64 {
        self.dist[state]
    }

    #[inline]
    pub fn is_reachable(&self, state: StateId) -> bool {
        self.dist[state] < f64::INFINITY
    }

    /// The graph edge leaving `state` on its best path. `None` for the sink
    /// and for states that cannot reach it.
    #[inline]
    pub fn tree_edge(&self, state: StateId) -> Option<usize> {
        self.tree_edge[state]
    }

    /// Edge ids of the best path from `state` to the sink.
    pub fn best_path(&self, graph: &ScalarGraph, state: StateId) -> Vec<usize> {
        let mut edges = Vec::new();
        let mut cur = state;
        while let Some(id) = self.tree_edge[cur] {
            edges.push(id);
            cur = graph.edge(id).dest;
        }
        edges
    }

    /// For each state, the states whose tree edge points at it.
    pub(crate) fn children(&self, graph: &ScalarGraph) -> Vec<Vec<StateId>> {
        let mut children = vec![Vec::new(); self.dist.len()];
        for (state, edge) in self.tree_edge.iter().enumerate() {
            if let Some(id) = *edge {
                children[graph.edge(id).dest].push(state);
            }
        }
        children
    }
}

/// Min-heap entry for Dijkstra.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    dist: f64,
    state: StateId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    // Reversed for a min-heap on distance.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.state.cmp(&self.state))
    }
}

/// Build the shortest-path tree of `graph` toward `sink`.
pub fn shortest_path_tree(graph: &ScalarGraph, sink: StateId) -> Result<ShortestPathTree, WfstError> {
    let n = graph.num_states();
    if sink >= n {
        return Err(WfstError::UnknownState(sink));
    }
    let mut tree = ShortestPathTree {
        sink,
        dist: vec![f64::INFINITY; n],
        tree_edge: vec![None; n],
    };
    tree.dist[sink] = 0.0;

    let nonnegative = graph
        .edges()
        .iter()
        .filter(|e| e.is_usable())
        .all(|e| e.cost >= 0.0);
    if nonnegative {
        dijkstra(graph, &mut tree);
    } else {
        bellman_ford(graph, &mut tree)?;
    }
    Ok(tree)
}

fn dijkstra(graph: &ScalarGraph, tree: &mut ShortestPathTree) {
    // Edge ids are preserved by `reverse`, so the reversed adjacency of a
    // state lists the forward edges entering it.
    let incoming = graph.reverse();
    let mut done = vec![false; graph.num_states()];
    let mut heap = BinaryHeap::new();
    heap.push(Frontier {
        dist: 0.0,
        state: tree.sink,
    });
    while let Some(Frontier { dist, state }) = heap.pop() {
        if done[state] {
            continue;
        }
        done[state] = true;
        for &id in incoming.out_edge_ids(state) {
            let edge = graph.edge(id);
            if !edge.is_usable() || done[edge.source] {
                continue;
            }
            let candidate = dist + edge.cost;
            let current = tree.dist[edge.source];
            if candidate < current {
                tree.dist[edge.source] = candidate;
                tree.tree_edge[edge.source] = Some(id);
                heap.push(Frontier {
                    dist: candidate,
                    state: edge.source,
                });
            } else if candidate == current && tree.tree_edge[edge.source].is_some_and(|t| id < t) {
                // Edge ids follow arc order within a state.
                tree.tree_edge[edge.source] = Some(id);
            }
        }
    }
}

fn bellman_ford(graph: &ScalarGraph, tree: &mut ShortestPathTree) -> Result<(), WfstError> {
    let n = graph.num_states();
    for _ in 0..n {
        let mut changed = false;
        for (id, edge) in graph.edges().iter().enumerate() {
            let through = tree.dist[edge.dest];
            if !edge.is_usable() || through == f64::INFINITY {
                continue;
            }
            let candidate = through + edge.cost;
            if candidate < tree.dist[edge.source] {
                tree.dist[edge.source] = candidate;
                tree.tree_edge[edge.source] = Some(id);
                changed = true;
            }
        }
        if !changed {
            return Ok(());
        }
    }
    // Still improving after n rounds.
    Err(WfstError::NegativeCycle)
}
