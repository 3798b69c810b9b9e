// Scalar-cost digraph projection of an automaton.
//
// Path algorithms work on plain edges with `cost = -ln(weight)` and an
// `ArcRef` back to the arc each edge came from. The graph is an owned
// value, rebuilt whenever it is needed.

use crate::StateId;
use crate::wfst::Wfst;

/// Location of an arc inside its automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArcRef {
    pub state: StateId,
    pub index: usize,
}

/// One scalar edge. Zero-weight arcs get an infinite cost; path
/// algorithms treat such edges as absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphEdge {
    pub source: StateId,
    pub dest: StateId,
    pub cost: f64,
    pub arc: ArcRef,
}

impl GraphEdge {
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.cost < f64::INFINITY
    }
}

/// Edges stored flat, with per-state adjacency lists of edge ids.
#[derive(Debug, Clone)]
pub struct ScalarGraph {
    edges: Vec<GraphEdge>,
    adjacency: Vec<Vec<usize>>,
}

impl ScalarGraph {
    /// Project `wfst` into a scalar graph. With `epsilon_only`, only
    /// epsilon/epsilon arcs are kept.
    pub fn from_wfst(wfst: &Wfst, epsilon_only: bool) -> Self {
        let mut graph = ScalarGraph {
            edges: Vec::with_capacity(wfst.num_arcs()),
            adjacency: vec![Vec::new(); wfst.num_states()],
        };
        for (state, s) in wfst.states().iter().enumerate() {
            for (index, arc) in s.arcs().iter().enumerate() {
                if epsilon_only && !arc.is_epsilon() {
                    continue;
                }
                graph.push(GraphEdge {
                    source: state,
                    dest: arc.dest,
                    cost: arc.weight.cost(),
                    arc: ArcRef { state, index },
                });
            }
        }
        graph
    }

    fn push(&mut self, edge: GraphEdge) {
        self.adjacency[edge.source].push(self.edges.len());
        self.edges.push(edge);
    }

    /// The same edges with source and destination swapped.
    pub fn reverse(&self) -> Self {
        let mut reversed = ScalarGraph {
            edges: Vec::with_capacity(self.edges.len()),
            adjacency: vec![Vec::new(); self.adjacency.len()],
        };
        for edge in &self.edges {
            reversed.push(GraphEdge {
                source: edge.dest,
                dest: edge.source,
                ..*edge
            });
        }
        reversed
    }

    pub fn num_states(&self) -> usize {
        self.adjacency.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    #[inline]
    pub fn edge(&self, id: usize) -> &GraphEdge {
        &self.edges[id]
    }

    /// Ids of the edges leaving `state`, in arc order.
    #[inline]
    pub fn out_edge_ids(&self, state: StateId) -> &[usize] {
        &self.adjacency[state]
    }

    pub fn out_edges(&self, state: StateId) -> impl Iterator<Item = &GraphEdge> {
        self.adjacency[state].iter().map(move |&id| &self.edges[id])
    }

    /// States reachable from `start` (including itself), by iterative DFS.
    pub fn reachable_from(&self, start: StateId) -> Vec<bool> {
        let mut seen = vec![false; self.num_states()];
        if start >= seen.len() {
            return seen;
        }
        let mut stack = vec![start];
        seen[start] = true;
        while let Some(state) = stack.pop() {
            for edge in self.out_edges(state) {
                if !seen[edge.dest] {
                    seen[edge.dest] = true;
                    stack.push(edge.dest);
                }
            }
        }
        seen
    }

    /// Depth-first search from `start` that drops every edge closing a
    /// cycle (an edge into a state still on the search stack). Returns the
    /// visited states in a topological order of the kept edges, and a
    /// per-edge flag marking the dropped ones.
    pub fn acyclic_order(&self, start: StateId) -> (Vec<StateId>, Vec<bool>) {
        let n = self.num_states();
        let mut back = vec![false; self.num_edges()];
        let mut postorder = Vec::new();
        if start >= n {
            return (postorder, back);
        }
        let mut seen = vec![false; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<(StateId, usize)> = vec![(start, 0)];
        seen[start] = true;
        on_stack[start] = true;
        while let Some(top) = stack.last_mut() {
            let (state, next) = *top;
            match self.adjacency[state].get(next) {
                Some(&id) => {
                    top.1 += 1;
                    let dest = self.edges[id].dest;
                    if on_stack[dest] {
                        back[id] = true;
                    } else if !seen[dest] {
                        seen[dest] = true;
                        on_stack[dest] = true;
                        stack.push((dest, 0));
                    }
                }
                None => {
                    on_stack[state] = false;
                    postorder.push(state);
                    stack.pop();
                }
            }
        }
        postorder.reverse();
        (postorder, back)
    }

    /// A topological order of all states, or the first state found on a
    /// cycle. Used on epsilon-only projections.
    pub fn topological_order(&self) -> Result<Vec<StateId>, StateId> {
        let n = self.num_states();
        let mut indegree = vec![0usize; n];
        for edge in &self.edges {
            indegree[edge.dest] += 1;
        }
        // Reverse so that popping yields low state ids first.
        let mut ready: Vec<StateId> = (0..n).rev().filter(|&s| indegree[s] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(state) = ready.pop() {
            order.push(state);
            for edge in self.out_edges(state) {
                indegree[edge.dest] -= 1;
                if indegree[edge.dest] == 0 {
                    ready.push(edge.dest);
                }
            }
        }
        if order.len() == n {
            Ok(order)
        } else {
            Err((0..n).find(|&s| indegree[s] > 0).unwrap_or(0))
        }
    }
}
