//! PC-style constraint search: stable adjacency search, collider orientation
//! from separating sets, then Meek rules R1-R3. The output is a pattern
//! (CPDAG) over the dataset's variables.

use std::collections::{BTreeSet, HashMap};

use tracing::trace;

use super::combinations;
use super::independence::{IndependenceTest, TestConfig};
use crate::data::Dataset;
use crate::error::Result;
use crate::graph::{Endpoint, Graph};
use crate::learner::BaseLearner;

type SepSets = HashMap<(usize, usize), Vec<usize>>;

fn key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

#[derive(Debug, Clone)]
pub struct PcSearch {
    test: TestConfig,
    /// Largest conditioning set; `None` is unbounded.
    depth: Option<usize>,
}

impl PcSearch {
    pub fn new(test: TestConfig) -> Self {
        Self { test, depth: None }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn test(&self) -> &TestConfig {
        &self.test
    }

    /// Order-independent adjacency search: at each depth the candidate
    /// conditioning sets come from a snapshot of the adjacencies.
    fn adjacency_search(&self, test: &dyn IndependenceTest, n: usize) -> Result<(Vec<BTreeSet<usize>>, SepSets)> {
        let mut adj: Vec<BTreeSet<usize>> = (0..n)
            .map(|i| (0..n).filter(|&j| j != i).collect())
            .collect();
        let mut sepsets = SepSets::new();

        let mut depth = 0;
        loop {
            if self.depth.map_or(false, |max| depth > max) {
                break;
            }
            let snapshot = adj.clone();
            if snapshot.iter().all(|a| a.len() <= depth) {
                break;
            }

            for x in 0..n {
                for y in (x + 1)..n {
                    if !adj[x].contains(&y) {
                        continue;
                    }
                    if let Some(sepset) = separating_set(test, &snapshot, x, y, depth)? {
                        trace!(x, y, ?sepset, "removing adjacency");
                        adj[x].remove(&y);
                        adj[y].remove(&x);
                        sepsets.insert(key(x, y), sepset);
                    }
                }
            }
            depth += 1;
        }

        Ok((adj, sepsets))
    }
}

/// First conditioning set of size `depth`, drawn from the neighbours of `x`
/// then of `y`, that separates them.
fn separating_set(
    test: &dyn IndependenceTest,
    snapshot: &[BTreeSet<usize>],
    x: usize,
    y: usize,
    depth: usize,
) -> Result<Option<Vec<usize>>> {
    for (from, other) in [(x, y), (y, x)] {
        let candidates: Vec<usize> = snapshot[from].iter().copied().filter(|&c| c != other).collect();
        if candidates.len() < depth {
            continue;
        }
        for z in combinations(&candidates, depth) {
            if test.is_independent(x, y, &z)? {
                return Ok(Some(z));
            }
        }
    }
    Ok(None)
}

/// Orient `x -> z <- y` for every unshielded triple whose separating set
/// leaves out `z`. Later colliders overwrite earlier marks.
fn orient_colliders(graph: &mut Graph, sepsets: &SepSets) {
    for z in 0..graph.num_nodes() {
        let neighbours = graph.adjacent(z);
        for pair in combinations(&neighbours, 2) {
            let (x, y) = (pair[0], pair[1]);
            if graph.is_adjacent(x, y) {
                continue;
            }
            let Some(sepset) = sepsets.get(&key(x, y)) else {
                continue;
            };
            if !sepset.contains(&z) {
                graph.set_edge(x, z, Endpoint::Tail, Endpoint::Arrow);
                graph.set_edge(y, z, Endpoint::Tail, Endpoint::Arrow);
            }
        }
    }
}

/// Apply Meek rules R1-R3 to a fixpoint.
pub(crate) fn apply_meek_rules(graph: &mut Graph) {
    let n = graph.num_nodes();
    let mut changed = true;
    while changed {
        changed = false;
        for b in 0..n {
            for c in graph.undirected_neighbors(b) {
                if should_orient(graph, b, c) {
                    graph.set_edge(b, c, Endpoint::Tail, Endpoint::Arrow);
                    changed = true;
                }
            }
        }
    }
}

/// Whether the undirected edge `b --- c` must become `b --> c`.
fn should_orient(graph: &Graph, b: usize, c: usize) -> bool {
    // R1: a --> b --- c, a and c not adjacent
    if graph
        .parents(b)
        .into_iter()
        .any(|a| a != c && !graph.is_adjacent(a, c))
    {
        return true;
    }
    // R2: b --> a --> c
    if graph
        .children(b)
        .into_iter()
        .any(|a| graph.is_directed_from_to(a, c))
    {
        return true;
    }
    // R3: b --- a --> c, b --- d --> c, a and d not adjacent
    let kites: Vec<usize> = graph
        .undirected_neighbors(b)
        .into_iter()
        .filter(|&a| a != c && graph.is_directed_from_to(a, c))
        .collect();
    combinations(&kites, 2)
        .iter()
        .any(|pair| !graph.is_adjacent(pair[0], pair[1]))
}

impl BaseLearner for PcSearch {
    fn search(&self, data: &Dataset) -> Result<Graph> {
        let test = self.test.bind(data)?;
        let n = data.num_columns();
        let (adj, sepsets) = self.adjacency_search(test.as_ref(), n)?;

        let mut graph = Graph::new(data.variables().to_vec());
        for (x, neighbours) in adj.iter().enumerate() {
            for &y in neighbours.iter().filter(|&&y| y > x) {
                graph.set_edge(x, y, Endpoint::Tail, Endpoint::Tail);
            }
        }
        orient_colliders(&mut graph, &sepsets);
        apply_meek_rules(&mut graph);
        Ok(graph)
    }

    fn validate(&self, data: &Dataset) -> Result<()> {
        self.test.validate_for(data)
    }

    fn name(&self) -> &str {
        "pc"
    }
}
