//! Mixed graphs with endpoint markers.
//!
//! Each edge connects an unordered node pair and carries one [`Endpoint`] per
//! incident node, which is enough to express DAGs, CPDAGs (patterns) and PAGs:
//!
//! ```text
//! a --> b   Tail at a, Arrow at b
//! a --- b   Tail at a, Tail at b
//! a o-> b   Circle at a, Arrow at b
//! a <-> b   Arrow at a, Arrow at b
//! ```
//!
//! Edges are keyed by `(i, j)` with `i < j` in node-index order, so there is at
//! most one edge per pair by construction.

mod paths;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::data::Variable;
use crate::error::{Result, StablError};

/// Endpoint marker of an edge at one of its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Endpoint {
    Tail,
    Arrow,
    Circle,
}

impl Endpoint {
    /// Fixed precedence used to break ties in ensembles: arrowhead > tail > circle.
    pub fn precedence(self) -> u8 {
        match self {
            Endpoint::Arrow => 2,
            Endpoint::Tail => 1,
            Endpoint::Circle => 0,
        }
    }
}

/// An edge between nodes `first < second` (node indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub first: usize,
    pub second: usize,
    pub at_first: Endpoint,
    pub at_second: Endpoint,
}

impl Edge {
    /// Endpoint pair `(at_first, at_second)`.
    pub fn marks(&self) -> (Endpoint, Endpoint) {
        (self.at_first, self.at_second)
    }

    pub fn is_directed(&self) -> bool {
        matches!(
            self.marks(),
            (Endpoint::Tail, Endpoint::Arrow) | (Endpoint::Arrow, Endpoint::Tail)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    nodes: Vec<Variable>,
    index: HashMap<String, usize>,
    edges: BTreeMap<(usize, usize), (Endpoint, Endpoint)>,
}

impl Graph {
    pub fn new(nodes: Vec<Variable>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, v)| (v.name().to_string(), i))
            .collect();
        Self {
            nodes,
            index,
            edges: BTreeMap::new(),
        }
    }

    pub fn nodes(&self) -> &[Variable] {
        &self.nodes
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.node_index(name).ok_or_else(|| StablError::UnknownNode {
            name: name.to_string(),
        })
    }

    /// Add a node if absent; returns its index.
    pub fn add_node(&mut self, var: Variable) -> usize {
        if let Some(i) = self.node_index(var.name()) {
            return i;
        }
        let i = self.nodes.len();
        self.index.insert(var.name().to_string(), i);
        self.nodes.push(var);
        i
    }

    /// Whether `other` has the same nodes in the same order.
    pub fn same_nodes(&self, other: &Graph) -> bool {
        self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(&other.nodes)
                .all(|(a, b)| a.name() == b.name())
    }

    /// Set (or replace) the edge between node indices `a` and `b`.
    /// `at_a` is the marker at `a`, `at_b` the marker at `b`. Self-loops are ignored.
    pub fn set_edge(&mut self, a: usize, b: usize, at_a: Endpoint, at_b: Endpoint) {
        if a == b || a >= self.nodes.len() || b >= self.nodes.len() {
            return;
        }
        if a < b {
            self.edges.insert((a, b), (at_a, at_b));
        } else {
            self.edges.insert((b, a), (at_b, at_a));
        }
    }

    pub fn remove_edge(&mut self, a: usize, b: usize) -> bool {
        self.edges.remove(&(a.min(b), a.max(b))).is_some()
    }

    /// Endpoints of the edge between `a` and `b`, as `(at_a, at_b)`.
    pub fn endpoints(&self, a: usize, b: usize) -> Option<(Endpoint, Endpoint)> {
        if a < b {
            self.edges.get(&(a, b)).copied()
        } else {
            self.edges.get(&(b, a)).map(|&(x, y)| (y, x))
        }
    }

    pub fn is_adjacent(&self, a: usize, b: usize) -> bool {
        self.endpoints(a, b).is_some()
    }

    /// Add `from --> to` by node name.
    pub fn add_directed(&mut self, from: &str, to: &str) -> Result<()> {
        let (a, b) = (self.require(from)?, self.require(to)?);
        self.set_edge(a, b, Endpoint::Tail, Endpoint::Arrow);
        Ok(())
    }

    /// Add `a --- b` by node name.
    pub fn add_undirected(&mut self, a: &str, b: &str) -> Result<()> {
        let (i, j) = (self.require(a)?, self.require(b)?);
        self.set_edge(i, j, Endpoint::Tail, Endpoint::Tail);
        Ok(())
    }

    /// Add an edge by node name with explicit markers.
    pub fn add_edge(&mut self, a: &str, b: &str, at_a: Endpoint, at_b: Endpoint) -> Result<()> {
        let (i, j) = (self.require(a)?, self.require(b)?);
        self.set_edge(i, j, at_a, at_b);
        Ok(())
    }

    /// Whether the edge between `from` and `to` is `from --> to`.
    pub fn is_directed_from_to(&self, from: usize, to: usize) -> bool {
        self.endpoints(from, to) == Some((Endpoint::Tail, Endpoint::Arrow))
    }

    pub fn is_undirected(&self, a: usize, b: usize) -> bool {
        self.endpoints(a, b) == Some((Endpoint::Tail, Endpoint::Tail))
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.iter().map(|(&(first, second), &(at_first, at_second))| Edge {
            first,
            second,
            at_first,
            at_second,
        })
    }

    /// Adjacent node indices in ascending order.
    pub fn adjacent(&self, node: usize) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&other| other != node && self.is_adjacent(node, other))
            .collect()
    }

    /// Nodes `p` with `p --> node`.
    pub fn parents(&self, node: usize) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&p| self.is_directed_from_to(p, node))
            .collect()
    }

    /// Nodes `c` with `node --> c`.
    pub fn children(&self, node: usize) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&c| self.is_directed_from_to(node, c))
            .collect()
    }

    /// Nodes `s` with `node --- s`.
    pub fn undirected_neighbors(&self, node: usize) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&s| s != node && self.is_undirected(node, s))
            .collect()
    }
}

impl std::fmt::Display for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Graph Nodes:")?;
        let names: Vec<&str> = self.nodes.iter().map(|v| v.name()).collect();
        writeln!(f, "{}", names.join(";"))?;
        writeln!(f)?;
        writeln!(f, "Graph Edges:")?;
        for (k, edge) in self.edges().enumerate() {
            let left = match edge.at_first {
                Endpoint::Tail => "-",
                Endpoint::Arrow => "<",
                Endpoint::Circle => "o",
            };
            let right = match edge.at_second {
                Endpoint::Tail => "-",
                Endpoint::Arrow => ">",
                Endpoint::Circle => "o",
            };
            writeln!(
                f,
                "{}. {} {}-{} {}",
                k + 1,
                self.nodes[edge.first],
                left,
                right,
                self.nodes[edge.second]
            )?;
        }
        Ok(())
    }
}
