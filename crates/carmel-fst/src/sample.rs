// Weighted random walks: random paths and bounded sequence generation.
//
// Callers pass their own generator, so a seeded `StdRng` makes every walk
// reproducible.

use carmel_core::{EPSILON, Weight};
use rand::Rng;

use crate::arc::FstArc;
use crate::config::{GenerateConfig, RandomPathConfig};
use crate::path::Path;
use crate::wfst::Wfst;
use crate::{StateId, WfstError};

/// Pick one of `arcs` with probability proportional to its weight.
///
/// Returns `Ok(None)` when every weight is zero. Falling off the end of a
/// positive cumulative scan means the weights are broken, which is an
/// error rather than a dead end.
fn choose_weighted<'a, R: Rng>(
    state: StateId,
    arcs: impl Iterator<Item = &'a FstArc> + Clone,
    rng: &mut R,
) -> Result<Option<&'a FstArc>, WfstError> {
    let total: Weight = arcs.clone().map(|arc| arc.weight).sum();
    if total.is_zero() {
        return Ok(None);
    }
    let target = total * Weight::from_real(rng.random::<f64>());
    let mut cumulative = Weight::zero();
    for arc in arcs {
        cumulative += arc.weight;
        if cumulative > target {
            return Ok(Some(arc));
        }
    }
    Err(WfstError::NoArcChosen(state))
}

impl Wfst {
    /// Walk from the start state, choosing arcs by weight, until the final
    /// state is reached. Returns `Ok(None)` if the walk takes
    /// `config.max_len` arcs without finishing or gets stuck.
    pub fn random_path<R: Rng>(
        &self,
        config: &RandomPathConfig,
        rng: &mut R,
    ) -> Result<Option<Path>, WfstError> {
        let final_state = self.ensure_valid()?;
        let mut path = Path::new();
        let mut cur = self.start();
        while cur != final_state {
            if path.len() >= config.max_len {
                return Ok(None);
            }
            let Some(arc) = choose_weighted(cur, self.arcs(cur).iter(), rng)? else {
                return Ok(None);
            };
            path.push(cur, arc);
            cur = arc.dest;
        }
        Ok(Some(path))
    }

    /// Up to `k` random paths. Walks that fail are skipped, not retried.
    pub fn random_paths<R: Rng>(
        &self,
        k: usize,
        config: &RandomPathConfig,
        rng: &mut R,
    ) -> Result<Vec<Path>, WfstError> {
        let mut paths = Vec::with_capacity(k);
        for _ in 0..k {
            if let Some(path) = self.random_path(config, rng)? {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Generate one input/output sequence pair by a random walk that picks
    /// an input symbol uniformly among those available at each state, then
    /// an arc reading it by weight.
    ///
    /// The walk may pass through the final state; it stops there once at
    /// least `config.min_arcs` arcs were taken or the final state has no
    /// way out. Returns `Ok(None)` when either side would exceed
    /// `config.buffer_len` symbols or a non-final state is a dead end.
    pub fn generate<R: Rng>(&self, config: &GenerateConfig, rng: &mut R) -> Result<Option<Path>, WfstError> {
        let final_state = self.ensure_valid()?;
        let mut path = Path::new();
        let (mut n_in, mut n_out) = (0usize, 0usize);
        let mut cur = self.start();
        loop {
            let state = &self.states[cur];
            if cur == final_state && (path.len() >= config.min_arcs || state.is_empty()) {
                return Ok(Some(path));
            }
            let symbols = state.input_index().symbols();
            if symbols.is_empty() {
                return Ok(None);
            }
            let symbol = symbols[rng.random_range(0..symbols.len())];
            let Some(arc) = choose_weighted(cur, state.arcs_with_input(symbol), rng)? else {
                return Ok(None);
            };
            if arc.input != EPSILON {
                n_in += 1;
            }
            if arc.output != EPSILON {
                n_out += 1;
            }
            if n_in > config.buffer_len || n_out > config.buffer_len {
                return Ok(None);
            }
            path.push(cur, arc);
            cur = arc.dest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::WfstBuilder;
    use crate::wfst::Side;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn branching() -> Wfst {
        let mut b = WfstBuilder::new();
        b.arc("0", "1", "a", "x", 0.5)
            .arc("0", "1", "b", "y", 0.5)
            .arc("1", "2", "c", "z", 1.0)
            .final_state("2");
        b.build().unwrap()
    }

    #[test]
    fn random_path_reaches_final() {
        let fst = branching();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let path = fst
                .random_path(&RandomPathConfig::default(), &mut rng)
                .unwrap()
                .unwrap();
            assert_eq!(path.len(), 2);
            assert_eq!(path.states().last(), Some(&2));
            assert!((path.weight.to_real() - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn both_branches_are_sampled() {
        let fst = branching();
        let mut rng = StdRng::seed_from_u64(2);
        let paths = fst
            .random_paths(200, &RandomPathConfig::default(), &mut rng)
            .unwrap();
        assert_eq!(paths.len(), 200);
        let a = paths.iter().filter(|p| fst.yield_of(p, Side::Input) == "a c").count();
        assert!(a > 50 && a < 150, "{a}");
    }

    #[test]
    fn zero_weight_arcs_never_chosen() {
        let mut b = WfstBuilder::new();
        b.arc("0", "1", "a", "a", 0.0)
            .arc("0", "1", "b", "b", 0.3)
            .final_state("1");
        let fst = b.build().unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let path = fst.random_path(&RandomPathConfig::default(), &mut rng).unwrap().unwrap();
            assert_eq!(fst.yield_of(&path, Side::Input), "b");
        }
    }

    #[test]
    fn max_len_bounds_walk() {
        let mut b = WfstBuilder::new();
        b.arc("0", "0", "a", "a", 0.99)
            .arc("0", "1", "b", "b", 0.01)
            .final_state("1");
        let fst = b.build().unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let config = RandomPathConfig { max_len: 3 };
        for _ in 0..50 {
            if let Some(path) = fst.random_path(&config, &mut rng).unwrap() {
                assert!(path.len() <= 3);
            }
        }
    }

    #[test]
    fn dead_end_is_not_an_error() {
        let mut b = WfstBuilder::new();
        b.arc("0", "1", "a", "a", 1.0).final_state("2");
        let fst = b.build().unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        assert!(fst.random_path(&RandomPathConfig::default(), &mut rng).unwrap().is_none());
        assert!(fst.generate(&GenerateConfig::default(), &mut rng).unwrap().is_none());
    }

    #[test]
    fn generate_start_is_final() {
        let mut b = WfstBuilder::new();
        b.arc("0", "0", "a", "x", 0.5).final_state("0");
        let fst = b.build().unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        let path = fst.generate(&GenerateConfig::default(), &mut rng).unwrap().unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn generate_min_arcs_walks_past_final() {
        let mut b = WfstBuilder::new();
        b.arc("0", "0", "a", "x", 0.5).final_state("0");
        let fst = b.build().unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        let config = GenerateConfig {
            min_arcs: 3,
            buffer_len: 10,
        };
        let path = fst.generate(&config, &mut rng).unwrap().unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.symbols(Side::Output).len(), 3);
    }

    #[test]
    fn generate_respects_buffer() {
        let fst = Wfst::from_sequence(&["a", "b", "c", "d"]);
        let mut rng = StdRng::seed_from_u64(9);
        let tight = GenerateConfig {
            min_arcs: 0,
            buffer_len: 3,
        };
        assert!(fst.generate(&tight, &mut rng).unwrap().is_none());
        let roomy = GenerateConfig {
            min_arcs: 0,
            buffer_len: 4,
        };
        let path = fst.generate(&roomy, &mut rng).unwrap().unwrap();
        assert_eq!(fst.yield_of(&path, Side::Input), "a b c d");
    }
}
