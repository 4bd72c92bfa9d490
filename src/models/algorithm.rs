//! Tag identifying which assignment algorithm family produced a history.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Algorithm family. Histories built under one family are never mixed with another's.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmTag {
    #[default]
    RandomSampling,
    SimulatedAnnealing,
    ConflictGraph,
}

impl AlgorithmTag {
    pub const ALL: [AlgorithmTag; 3] = [
        AlgorithmTag::RandomSampling,
        AlgorithmTag::SimulatedAnnealing,
        AlgorithmTag::ConflictGraph,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AlgorithmTag::RandomSampling => "random-sampling",
            AlgorithmTag::SimulatedAnnealing => "simulated-annealing",
            AlgorithmTag::ConflictGraph => "conflict-graph",
        }
    }
}

impl fmt::Display for AlgorithmTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
