// K-shortest paths (Eppstein).
//
// The best path comes straight from the shortest-path tree. Every other
// path is a sequence of sidetracks; candidates for the next path are
// drawn from a priority queue over positions in the sidetrack forest.
// From a popped candidate the queue receives its heap children, the
// first entry of the same state's cross heap, and the root of the heap at
// the sidetrack's destination (appending one more sidetrack). A path is
// reconstructed by following tree edges between consecutive sidetracks.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::debug;

use crate::config::BestPathsConfig;
use crate::graph::{GraphEdge, ScalarGraph};
use crate::path::Path;
use crate::shortest_path::{ShortestPathTree, shortest_path_tree};
use crate::sidetrack::{NodeId, Sidetrack, SidetrackForest};
use crate::wfst::Wfst;
use crate::{StateId, WfstError};

/// Receives the paths found by [`best_paths`], best first.
///
/// Edge costs in the callbacks are the plain scalar costs, not the
/// telescoped sidetrack deltas.
pub trait BestPathVisitor {
    /// Skip `visit_best_arc` calls and report only sidetracks.
    const SIDETRACKS_ONLY: bool = false;

    fn start_path(&mut self, _rank: usize, _cost: f64) {}
    fn end_path(&mut self) {}
    fn visit_best_arc(&mut self, _edge: &GraphEdge) {}
    fn visit_sidetrack_arc(&mut self, _edge: &GraphEdge) {}
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    /// The node's own cheapest sidetrack.
    Top,
    /// Position in the node's cross heap.
    Cross(usize),
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    cost: f64,
    node: NodeId,
    slot: Slot,
    /// Retired candidate whose sidetracks precede this one's.
    prefix: Option<usize>,
}

/// Queue entry: min-heap on cost, FIFO among equal costs.
struct Queued {
    candidate: Candidate,
    seq: u64,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .candidate
            .cost
            .total_cmp(&self.candidate.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Frontier {
    heap: BinaryHeap<Queued>,
    seq: u64,
}

impl Frontier {
    fn push(&mut self, candidate: Candidate) {
        self.heap.push(Queued {
            candidate,
            seq: self.seq,
        });
        self.seq += 1;
    }

    fn pop(&mut self) -> Option<Candidate> {
        self.heap.pop().map(|q| q.candidate)
    }
}

/// Walks one path at a time, reporting it and checking for repeated arcs.
struct Emitter<'g> {
    graph: &'g ScalarGraph,
    tree: &'g ShortestPathTree,
    detect_cycles: bool,
    taken: Vec<bool>,
    touched: Vec<usize>,
}

impl<'g> Emitter<'g> {
    fn take(&mut self, id: usize, rank: usize) -> Result<&'g GraphEdge, WfstError> {
        let edge = self.graph.edge(id);
        if self.detect_cycles {
            if self.taken[id] {
                return Err(WfstError::BestPathCycle {
                    rank,
                    state: edge.source,
                });
            }
            self.taken[id] = true;
            self.touched.push(id);
        }
        Ok(edge)
    }

    fn follow_tree<V: BestPathVisitor>(
        &mut self,
        visitor: &mut V,
        rank: usize,
        from: StateId,
        until: Option<StateId>,
    ) -> Result<StateId, WfstError> {
        let mut cur = from;
        while Some(cur) != until {
            let Some(id) = self.tree.tree_edge(cur) else {
                if until.is_some() {
                    return Err(WfstError::Internal("sidetrack is not on the tree path"));
                }
                break;
            };
            let edge = self.take(id, rank)?;
            let dest = edge.dest;
            if !V::SIDETRACKS_ONLY {
                visitor.visit_best_arc(edge);
            }
            cur = dest;
        }
        Ok(cur)
    }

    fn emit<V: BestPathVisitor>(
        &mut self,
        visitor: &mut V,
        rank: usize,
        cost: f64,
        source: StateId,
        sidetracks: &[usize],
    ) -> Result<(), WfstError> {
        for id in self.touched.drain(..) {
            self.taken[id] = false;
        }
        visitor.start_path(rank, cost);
        let mut cur = source;
        for &id in sidetracks {
            let from = self.graph.edge(id).source;
            self.follow_tree(visitor, rank, cur, Some(from))?;
            let edge = self.take(id, rank)?;
            cur = edge.dest;
            visitor.visit_sidetrack_arc(edge);
        }
        self.follow_tree(visitor, rank, cur, None)?;
        visitor.end_path();
        Ok(())
    }
}

/// Enumerate up to `k` cheapest paths from `source` to `sink`, best first.
///
/// Returns the number of paths reported, which is less than `k` when the
/// graph has fewer paths. With `detect_cycles`, a path that would take
/// the same edge twice fails with [`WfstError::BestPathCycle`] after its
/// `start_path` call.
pub fn best_paths<V: BestPathVisitor>(
    graph: &ScalarGraph,
    source: StateId,
    sink: StateId,
    k: usize,
    detect_cycles: bool,
    visitor: &mut V,
) -> Result<usize, WfstError> {
    if source >= graph.num_states() {
        return Err(WfstError::UnknownState(source));
    }
    if k == 0 {
        return Ok(0);
    }
    let tree = shortest_path_tree(graph, sink)?;
    if !tree.is_reachable(source) {
        return Ok(0);
    }
    let mut emitter = Emitter {
        graph,
        tree: &tree,
        detect_cycles,
        taken: vec![false; graph.num_edges()],
        touched: Vec::new(),
    };
    emitter.emit(visitor, 1, tree.distance(source), source, &[])?;
    if k == 1 {
        return Ok(1);
    }

    let forest = SidetrackForest::build(graph, &tree);
    let sidetrack = |c: &Candidate| -> Sidetrack {
        match c.slot {
            Slot::Top => forest.top(c.node),
            Slot::Cross(pos) => forest.cross(c.node)[pos],
        }
    };
    let mut frontier = Frontier {
        heap: BinaryHeap::new(),
        seq: 0,
    };
    if let Some(root) = forest.root(source) {
        frontier.push(Candidate {
            cost: tree.distance(source) + forest.top(root).delta,
            node: root,
            slot: Slot::Top,
            prefix: None,
        });
    }

    let mut retired: Vec<Candidate> = Vec::new();
    let mut chain = Vec::new();
    let mut emitted = 1;
    while emitted < k {
        let Some(candidate) = frontier.pop() else {
            break;
        };
        let index = retired.len();
        retired.push(candidate);

        chain.clear();
        let mut link = Some(index);
        while let Some(i) = link {
            chain.push(sidetrack(&retired[i]).edge);
            link = retired[i].prefix;
        }
        chain.reverse();
        emitted += 1;
        emitter.emit(visitor, emitted, candidate.cost, source, &chain)?;

        let own = sidetrack(&candidate);
        let base = candidate.cost - own.delta;
        match candidate.slot {
            Slot::Top => {
                for child in [forest.left(candidate.node), forest.right(candidate.node)]
                    .into_iter()
                    .flatten()
                {
                    frontier.push(Candidate {
                        cost: base + forest.top(child).delta,
                        node: child,
                        slot: Slot::Top,
                        prefix: candidate.prefix,
                    });
                }
                if let Some(first) = forest.cross(candidate.node).first() {
                    frontier.push(Candidate {
                        cost: base + first.delta,
                        slot: Slot::Cross(0),
                        ..candidate
                    });
                }
            }
            Slot::Cross(pos) => {
                let cross = forest.cross(candidate.node);
                for child in [2 * pos + 1, 2 * pos + 2] {
                    if let Some(st) = cross.get(child) {
                        frontier.push(Candidate {
                            cost: base + st.delta,
                            slot: Slot::Cross(child),
                            ..candidate
                        });
                    }
                }
            }
        }
        if let Some(next) = forest.root(graph.edge(own.edge).dest) {
            frontier.push(Candidate {
                cost: candidate.cost + forest.top(next).delta,
                node: next,
                slot: Slot::Top,
                prefix: Some(index),
            });
        }
    }
    debug!(
        paths = emitted,
        heap_nodes = forest.num_nodes(),
        candidates = retired.len() + frontier.heap.len(),
        "k-best enumeration finished"
    );
    Ok(emitted)
}

/// Builds [`Path`] values from visitor callbacks.
struct PathCollector<'a> {
    wfst: &'a Wfst,
    paths: Vec<Path>,
    current: Path,
}

impl PathCollector<'_> {
    fn push(&mut self, edge: &GraphEdge) {
        let arc = &self.wfst.arcs(edge.arc.state)[edge.arc.index];
        self.current.push(edge.arc.state, arc);
    }
}

impl BestPathVisitor for PathCollector<'_> {
    fn start_path(&mut self, _rank: usize, _cost: f64) {
        self.current = Path::new();
    }

    fn end_path(&mut self) {
        self.paths.push(std::mem::take(&mut self.current));
    }

    fn visit_best_arc(&mut self, edge: &GraphEdge) {
        self.push(edge);
    }

    fn visit_sidetrack_arc(&mut self, edge: &GraphEdge) {
        self.push(edge);
    }
}

impl Wfst {
    /// Report the `config.k` best start-to-final paths to `visitor`.
    pub fn best_paths<V: BestPathVisitor>(
        &self,
        config: &BestPathsConfig,
        visitor: &mut V,
    ) -> Result<usize, WfstError> {
        let sink = self.ensure_valid()?;
        let graph = ScalarGraph::from_wfst(self, false);
        best_paths(&graph, self.start(), sink, config.k, config.detect_cycles, visitor)
    }

    /// The `config.k` best start-to-final paths, best first.
    pub fn best_paths_list(&self, config: &BestPathsConfig) -> Result<Vec<Path>, WfstError> {
        let mut collector = PathCollector {
            wfst: self,
            paths: Vec::new(),
            current: Path::new(),
        };
        self.best_paths(config, &mut collector)?;
        Ok(collector.paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::WfstBuilder;
    use carmel_core::Weight;

    fn by_cost(arcs: &[(&str, &str, f64)], final_state: &str) -> Wfst {
        let mut b = WfstBuilder::new();
        for &(src, dest, cost) in arcs {
            b.arc_with(src, dest, "a", "a", Weight::from_cost(cost), crate::arc::Group::Free);
        }
        b.final_state(final_state);
        b.build().unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        costs: Vec<f64>,
        sidetracks: usize,
        best: usize,
        ended: usize,
    }

    impl BestPathVisitor for Recorder {
        fn start_path(&mut self, rank: usize, cost: f64) {
            assert_eq!(rank, self.costs.len() + 1);
            self.costs.push(cost);
        }
        fn end_path(&mut self) {
            self.ended += 1;
        }
        fn visit_best_arc(&mut self, _edge: &GraphEdge) {
            self.best += 1;
        }
        fn visit_sidetrack_arc(&mut self, _edge: &GraphEdge) {
            self.sidetracks += 1;
        }
    }

    struct OnlySidetracks(usize, usize);

    impl BestPathVisitor for OnlySidetracks {
        const SIDETRACKS_ONLY: bool = true;
        fn visit_best_arc(&mut self, _edge: &GraphEdge) {
            self.0 += 1;
        }
        fn visit_sidetrack_arc(&mut self, _edge: &GraphEdge) {
            self.1 += 1;
        }
    }

    fn assert_costs(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn small_example_in_order() {
        let fst = by_cost(&[("0", "1", 1.0), ("0", "2", 5.0), ("1", "2", 1.0), ("1", "2", 3.0)], "2");
        let mut rec = Recorder::default();
        let n = fst.best_paths(&BestPathsConfig::new(10), &mut rec).unwrap();
        assert_eq!(n, 3);
        assert_costs(&rec.costs, &[2.0, 4.0, 5.0]);
        assert_eq!(rec.ended, 3);
        assert_eq!(rec.sidetracks, 2);
        assert_eq!(rec.best, 3);
    }

    #[test]
    fn k_zero_and_one() {
        let fst = by_cost(&[("0", "1", 1.0), ("0", "1", 2.0)], "1");
        let mut rec = Recorder::default();
        assert_eq!(fst.best_paths(&BestPathsConfig::new(0), &mut rec).unwrap(), 0);
        assert_eq!(fst.best_paths(&BestPathsConfig::new(1), &mut rec).unwrap(), 1);
        assert_costs(&rec.costs, &[1.0]);
    }

    #[test]
    fn unreachable_final_gives_no_paths() {
        let fst = by_cost(&[("0", "1", 1.0), ("2", "3", 1.0)], "3");
        let mut rec = Recorder::default();
        assert_eq!(fst.best_paths(&BestPathsConfig::new(5), &mut rec).unwrap(), 0);
        assert!(rec.costs.is_empty());
    }

    #[test]
    fn sidetracks_only_skips_tree_arcs() {
        let fst = by_cost(&[("0", "1", 1.0), ("0", "2", 5.0), ("1", "2", 1.0), ("1", "2", 3.0)], "2");
        let mut v = OnlySidetracks(0, 0);
        fst.best_paths(&BestPathsConfig::new(3), &mut v).unwrap();
        assert_eq!(v.0, 0);
        assert_eq!(v.1, 2);
    }

    #[test]
    fn cycle_detected_or_allowed() {
        let fst = by_cost(&[("0", "1", 1.0), ("1", "1", 1.0), ("1", "2", 1.0)], "2");
        let mut rec = Recorder::default();
        let err = fst.best_paths(&BestPathsConfig::new(3), &mut rec).unwrap_err();
        assert!(matches!(err, WfstError::BestPathCycle { rank: 3, state: 1 }));
        assert_eq!(rec.costs.len(), 3);

        let mut rec = Recorder::default();
        let n = fst
            .best_paths(&BestPathsConfig::new(3).allow_cycles(), &mut rec)
            .unwrap();
        assert_eq!(n, 3);
        assert_costs(&rec.costs, &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn collected_paths_match_costs() {
        let fst = by_cost(&[("0", "1", 1.0), ("0", "2", 5.0), ("1", "2", 1.0), ("1", "2", 3.0)], "2");
        let paths = fst.best_paths_list(&BestPathsConfig::new(3)).unwrap();
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[0].states(), vec![0, 1, 2]);
        assert_eq!(paths[2].states(), vec![0, 2]);
        assert!((paths[1].cost() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_automaton_is_rejected() {
        let fst = Wfst::new();
        let mut rec = Recorder::default();
        assert!(matches!(
            fst.best_paths(&BestPathsConfig::new(1), &mut rec),
            Err(WfstError::Invalid)
        ));
    }

    #[test]
    fn many_paths_nondecreasing() {
        // A 4-layer lattice with two arcs per layer has 16 paths.
        let mut arcs = Vec::new();
        let names = ["0", "1", "2", "3", "4"];
        for layer in 0..4 {
            arcs.push((names[layer], names[layer + 1], 1.0 + layer as f64 * 0.1));
            arcs.push((names[layer], names[layer + 1], 1.5 + layer as f64 * 0.3));
        }
        let fst = by_cost(&arcs, "4");
        let mut rec = Recorder::default();
        let n = fst.best_paths(&BestPathsConfig::new(100), &mut rec).unwrap();
        assert_eq!(n, 16);
        assert!(rec.costs.windows(2).all(|w| w[0] <= w[1] + 1e-12));
    }
}
