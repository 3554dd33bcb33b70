//! Consensus graphs from bootstrap graph samples.
//!
//! For every node pair that is an edge in at least one input graph, the B
//! observations (no edge, or an endpoint configuration) are tallied and reduced
//! by an [`EnsembleRule`]. The reduction is a pure function of the tallies, so
//! the order of the input graphs never matters.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StablError};
use crate::graph::{Endpoint, Graph};

/// How B per-edge observations become one consensus edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnsembleRule {
    /// Keep an edge only if every sample containing it agrees on its endpoints.
    Preserved,
    /// Keep the most frequent observation; "no edge" competes as well.
    #[default]
    Highest,
    /// Keep an edge only if more than half of the samples contain it.
    Majority,
}

impl EnsembleRule {
    /// Selector index: 0 = preserved, 1 = highest, 2 = majority.
    pub fn from_index(index: usize) -> Result<Self> {
        match index {
            0 => Ok(Self::Preserved),
            1 => Ok(Self::Highest),
            2 => Ok(Self::Majority),
            _ => Err(StablError::UnknownEnsemble { index }),
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Preserved => 0,
            Self::Highest => 1,
            Self::Majority => 2,
        }
    }
}

impl fmt::Display for EnsembleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preserved => "preserved",
            Self::Highest => "highest",
            Self::Majority => "majority",
        })
    }
}

impl FromStr for EnsembleRule {
    type Err = StablError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserved" | "0" => Ok(Self::Preserved),
            "highest" | "1" => Ok(Self::Highest),
            "majority" | "2" => Ok(Self::Majority),
            other => Err(StablError::config(format!(
                "unknown ensemble rule '{}'",
                other
            ))),
        }
    }
}

type Marks = (Endpoint, Endpoint);

/// Deterministic order over endpoint configurations; `Greater` wins.
/// Strongest endpoint first, then the weaker one, then the marker at the
/// lower-indexed node.
fn compare_marks(a: &Marks, b: &Marks) -> Ordering {
    let key = |m: &Marks| {
        let (p, q) = (m.0.precedence(), m.1.precedence());
        (p.max(q), p.min(q), p)
    };
    key(a).cmp(&key(b))
}

/// Most frequent configuration, ties broken by [`compare_marks`].
fn most_frequent(tally: &BTreeMap<Marks, usize>) -> Option<(Marks, usize)> {
    tally
        .iter()
        .map(|(marks, count)| (*marks, *count))
        .max_by(|(ma, ca), (mb, cb)| ca.cmp(cb).then_with(|| compare_marks(ma, mb)))
}

/// Merge B graphs over the same node list into a consensus graph.
pub fn aggregate(graphs: &[Graph], rule: EnsembleRule) -> Result<Graph> {
    let first = graphs.first().ok_or_else(|| StablError::GraphMismatch {
        message: "no graphs to aggregate".into(),
    })?;
    if let Some(bad) = graphs.iter().position(|g| !g.same_nodes(first)) {
        return Err(StablError::GraphMismatch {
            message: format!("graph {} has a different node list than graph 0", bad),
        });
    }

    let mut tallies: BTreeMap<(usize, usize), BTreeMap<Marks, usize>> = BTreeMap::new();
    for graph in graphs {
        for edge in graph.edges() {
            *tallies
                .entry((edge.first, edge.second))
                .or_default()
                .entry(edge.marks())
                .or_insert(0) += 1;
        }
    }

    let b = graphs.len();
    let mut consensus = Graph::new(first.nodes().to_vec());

    for ((i, j), tally) in &tallies {
        let present: usize = tally.values().sum();
        let chosen = match rule {
            EnsembleRule::Preserved => {
                if tally.len() == 1 {
                    most_frequent(tally).map(|(marks, _)| marks)
                } else {
                    None
                }
            }
            EnsembleRule::Highest => most_frequent(tally)
                .filter(|(_, count)| *count >= b - present)
                .map(|(marks, _)| marks),
            EnsembleRule::Majority => {
                if 2 * present > b {
                    most_frequent(tally).map(|(marks, _)| marks)
                } else {
                    None
                }
            }
        };

        if let Some((at_i, at_j)) = chosen {
            consensus.set_edge(*i, *j, at_i, at_j);
        }
    }

    Ok(consensus)
}

/// Fraction of graphs in which each adjacent pair appears, keyed by node names.
pub fn edge_frequencies(graphs: &[Graph]) -> BTreeMap<(String, String), f64> {
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for graph in graphs {
        let nodes = graph.nodes();
        for edge in graph.edges() {
            let key = (
                nodes[edge.first].name().to_string(),
                nodes[edge.second].name().to_string(),
            );
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    let b = graphs.len().max(1) as f64;
    counts
        .into_iter()
        .map(|(key, count)| (key, count as f64 / b))
        .collect()
}
