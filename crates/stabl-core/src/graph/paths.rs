use std::collections::VecDeque;

use super::Graph;
use crate::error::{Result, StablError};

impl Graph {
    /// Whether there is a directed path `ancestor --> ... --> descendant`
    /// (a node counts as its own ancestor).
    pub fn is_ancestor_of(&self, ancestor: usize, descendant: usize) -> bool {
        self.directed_distances_to(descendant)[ancestor].is_some()
    }

    /// Whether a trek connects `a` and `b` using at most `max_length` edges.
    ///
    /// A trek is a pair of directed paths `s --> ... --> a` and
    /// `s --> ... --> b` from a common source `s` (possibly `a` or `b` itself).
    pub fn exists_trek(&self, a: usize, b: usize, max_length: usize) -> bool {
        if a == b {
            return true;
        }
        let to_a = self.directed_distances_to(a);
        let to_b = self.directed_distances_to(b);
        to_a.iter()
            .zip(&to_b)
            .filter_map(|(da, db)| Some((*da)? + (*db)?))
            .any(|len| len <= max_length)
    }

    /// Shortest directed path length from every node to `target`, by BFS
    /// over reversed edges.
    fn directed_distances_to(&self, target: usize) -> Vec<Option<usize>> {
        let mut dist = vec![None; self.num_nodes()];
        if target >= dist.len() {
            return dist;
        }
        dist[target] = Some(0);
        let mut queue = VecDeque::from([target]);

        while let Some(node) = queue.pop_front() {
            let d = dist[node].unwrap_or(0);
            for parent in self.parents(node) {
                if dist[parent].is_none() {
                    dist[parent] = Some(d + 1);
                    queue.push_back(parent);
                }
            }
        }
        dist
    }

    /// Structural Hamming distance: node pairs adjacent in only one graph, plus
    /// pairs adjacent in both with different endpoint markers.
    pub fn structural_hamming_distance(&self, other: &Graph) -> Result<usize> {
        if !self.same_nodes(other) {
            return Err(StablError::GraphMismatch {
                message: "structural Hamming distance needs identical node lists".into(),
            });
        }

        let mut pairs: Vec<(usize, usize)> =
            self.edges.keys().chain(other.edges.keys()).copied().collect();
        pairs.sort_unstable();
        pairs.dedup();

        Ok(pairs
            .into_iter()
            .filter(|key| self.edges.get(key) != other.edges.get(key))
            .count())
    }
}
