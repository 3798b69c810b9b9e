// Persistent sidetrack heaps for k-shortest-path enumeration.
//
// A sidetrack is an edge that leaves the shortest-path tree. Its cost is
// the extra cost of taking it instead of the tree edge,
// `cost + dist[dest] - dist[source]`, which is nonnegative.
//
// Every state gets a heap of all sidetracks available on its tree path to
// the sink. The heap of a state is its tree parent's heap with one node
// added by path copying, so states share structure and the whole forest
// costs O(E + V log V) nodes. Each tree-heap node carries the cheapest
// sidetrack of one state; that state's remaining sidetracks hang off the
// node as a cost-sorted array, which is a valid binary heap.
//
// The forest is an arena owned by one enumeration call.

use crate::StateId;
use crate::graph::ScalarGraph;
use crate::shortest_path::ShortestPathTree;

/// Index of a node in a [`SidetrackForest`].
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sidetrack {
    /// Graph edge id.
    pub edge: usize,
    /// Extra cost over staying on the tree.
    pub delta: f64,
}

/// The sidetracks of one state: the cheapest, then the rest by cost.
#[derive(Debug, Clone)]
struct LocalHeap {
    top: Sidetrack,
    rest: Vec<Sidetrack>,
}

#[derive(Debug, Clone, Copy)]
struct HeapNode {
    local: usize,
    left: Option<NodeId>,
    right: Option<NodeId>,
    /// Nodes below this one.
    descendants: usize,
}

#[derive(Debug, Clone)]
pub struct SidetrackForest {
    locals: Vec<LocalHeap>,
    nodes: Vec<HeapNode>,
    roots: Vec<Option<NodeId>>,
}

impl SidetrackForest {
    /// Build the heaps of every state that can reach the sink, parents
    /// before children in the reversed tree.
    pub fn build(graph: &ScalarGraph, tree: &ShortestPathTree) -> Self {
        let mut forest = SidetrackForest {
            locals: Vec::new(),
            nodes: Vec::new(),
            roots: vec![None; graph.num_states()],
        };
        let children = tree.children(graph);
        let mut stack = vec![tree.sink()];
        while let Some(state) = stack.pop() {
            let inherited = tree
                .tree_edge(state)
                .and_then(|id| forest.roots[graph.edge(id).dest]);
            forest.roots[state] = match forest.local_heap(graph, tree, state) {
                Some(local) => Some(forest.insert(inherited, local)),
                None => inherited,
            };
            stack.extend(children[state].iter().rev().copied());
        }
        forest
    }

    /// Collect the sidetracks leaving `state`, returning the id of its
    /// local heap if there are any.
    fn local_heap(&mut self, graph: &ScalarGraph, tree: &ShortestPathTree, state: StateId) -> Option<usize> {
        let tree_edge = tree.tree_edge(state);
        let base = tree.distance(state);
        let mut sidetracks: Vec<Sidetrack> = graph
            .out_edge_ids(state)
            .iter()
            .copied()
            .filter(|&id| Some(id) != tree_edge)
            .filter_map(|id| {
                let edge = graph.edge(id);
                if !edge.is_usable() || !tree.is_reachable(edge.dest) {
                    return None;
                }
                let delta = (edge.cost + tree.distance(edge.dest) - base).max(0.0);
                Some(Sidetrack { edge: id, delta })
            })
            .collect();
        if sidetracks.is_empty() {
            return None;
        }
        // Stable, so equal deltas keep arc order.
        sidetracks.sort_by(|a, b| a.delta.total_cmp(&b.delta));
        let top = sidetracks.remove(0);
        self.locals.push(LocalHeap {
            top,
            rest: sidetracks,
        });
        Some(self.locals.len() - 1)
    }

    /// Persistent insert: returns a new root, leaving `root` intact.
    fn insert(&mut self, root: Option<NodeId>, local: usize) -> NodeId {
        let Some(root) = root else {
            return self.alloc(HeapNode {
                local,
                left: None,
                right: None,
                descendants: 0,
            });
        };
        let old = self.nodes[root];
        let (kept, pushed) = if self.locals[local].top.delta < self.locals[old.local].top.delta {
            (local, old.local)
        } else {
            (old.local, local)
        };
        let go_left = match (old.left, old.right) {
            (None, _) => true,
            (Some(l), Some(r)) => self.nodes[r].descendants > self.nodes[l].descendants,
            (Some(_), None) => false,
        };
        let (left, right) = if go_left {
            (Some(self.insert(old.left, pushed)), old.right)
        } else {
            (old.left, Some(self.insert(old.right, pushed)))
        };
        self.alloc(HeapNode {
            local: kept,
            left,
            right,
            descendants: old.descendants + 1,
        })
    }

    fn alloc(&mut self, node: HeapNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Root of the heap for paths continuing from `state`.
    #[inline]
    pub fn root(&self, state: StateId) -> Option<NodeId> {
        self.roots[state]
    }

    /// The cheapest sidetrack stored at `node`.
    #[inline]
    pub fn top(&self, node: NodeId) -> Sidetrack {
        self.locals[self.nodes[node].local].top
    }

    /// The other sidetracks of the same state, as an array heap.
    #[inline]
    pub fn cross(&self, node: NodeId) -> &[Sidetrack] {
        &self.locals[self.nodes[node].local].rest
    }

    #[inline]
    pub fn left(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].left
    }

    #[inline]
    pub fn right(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].right
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }
}
