// Per-call limits and output options.
//
// Nothing here is global: each search, sampling call or writer receives
// its configuration explicitly.

use carmel_core::WeightFormat;

/// Limits for k-best path extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestPathsConfig {
    /// Maximum number of paths to report.
    pub k: usize,
    /// Fail with [`crate::WfstError::BestPathCycle`] when a reported path
    /// would take the same arc twice.
    pub detect_cycles: bool,
}

impl BestPathsConfig {
    pub fn new(k: usize) -> Self {
        BestPathsConfig {
            k,
            detect_cycles: true,
        }
    }

    pub fn allow_cycles(mut self) -> Self {
        self.detect_cycles = false;
        self
    }
}

impl Default for BestPathsConfig {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Limits for weighted random walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomPathConfig {
    /// A walk that has taken this many arcs without reaching the final
    /// state is abandoned.
    pub max_len: usize,
}

impl Default for RandomPathConfig {
    fn default() -> Self {
        RandomPathConfig { max_len: 1000 }
    }
}

/// Limits for sequence generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateConfig {
    /// Keep walking past the final state until at least this many arcs
    /// were taken (unless the final state has no way out).
    pub min_arcs: usize,
    /// Maximum number of non-epsilon symbols on each side.
    pub buffer_len: usize,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        GenerateConfig {
            min_arcs: 0,
            buffer_len: 1000,
        }
    }
}

/// Options for the legible text writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextFormat {
    pub weights: WeightFormat,
    /// One arc per line (repeating the source state), instead of one line
    /// per state.
    pub arc_per_line: bool,
}

impl Default for TextFormat {
    fn default() -> Self {
        TextFormat {
            weights: WeightFormat::default(),
            arc_per_line: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let best = BestPathsConfig::default();
        assert_eq!(best.k, 1);
        assert!(best.detect_cycles);
        assert!(!BestPathsConfig::new(5).allow_cycles().detect_cycles);
        assert_eq!(GenerateConfig::default().min_arcs, 0);
        assert!(TextFormat::default().arc_per_line);
    }
}
