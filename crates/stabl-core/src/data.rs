//! Variables and tabular datasets.
//!
//! A [`Dataset`] is an `n_rows × n_vars` matrix plus the ordered list of
//! [`Variable`]s naming its columns. Discrete variables are stored as category
//! indices (`0.0, 1.0, ...`) in the same matrix.

use std::collections::HashMap;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StablError};

/// Measurement type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableKind {
    Continuous,
    /// Values are category indices in `0..categories`.
    Discrete { categories: usize },
}

/// A named column. Identity within a dataset is by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    kind: VariableKind,
}

impl Variable {
    pub fn continuous<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Continuous,
        }
    }

    pub fn discrete<S: Into<String>>(name: S, categories: usize) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Discrete { categories },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self.kind, VariableKind::Discrete { .. })
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Observational data over a fixed, ordered set of variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    variables: Vec<Variable>,
    index: HashMap<String, usize>,
    /// Shape: n_rows × n_vars
    data: DMatrix<f64>,
}

impl Dataset {
    /// Build a dataset, checking the shape and that names are unique.
    pub fn new(variables: Vec<Variable>, data: DMatrix<f64>) -> Result<Self> {
        if data.ncols() != variables.len() {
            return Err(StablError::dataset(format!(
                "{} columns but {} variables",
                data.ncols(),
                variables.len()
            )));
        }

        let mut index = HashMap::with_capacity(variables.len());
        for (i, var) in variables.iter().enumerate() {
            if index.insert(var.name.clone(), i).is_some() {
                return Err(StablError::dataset(format!(
                    "duplicate variable name '{}'",
                    var.name
                )));
            }
        }

        for (j, var) in variables.iter().enumerate() {
            if let VariableKind::Discrete { categories } = var.kind {
                let bad = data
                    .column(j)
                    .iter()
                    .copied()
                    .find(|v| v.fract() != 0.0 || *v < 0.0 || *v >= categories as f64);
                if let Some(v) = bad {
                    return Err(StablError::dataset(format!(
                        "value {} of discrete variable '{}' is not a category index below {}",
                        v, var.name, categories
                    )));
                }
            }
        }

        Ok(Self {
            variables,
            index,
            data,
        })
    }

    /// Build a dataset from row vectors.
    pub fn from_rows(variables: Vec<Variable>, rows: &[Vec<f64>]) -> Result<Self> {
        let ncols = variables.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
            return Err(StablError::dataset(format!(
                "row {} has {} values, expected {}",
                i,
                row.len(),
                ncols
            )));
        }
        let data = DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]);
        Self::new(variables, data)
    }

    pub fn num_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn num_columns(&self) -> usize {
        self.data.ncols()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.index.get(name).map(|&i| &self.variables[i])
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Column index of `name`, or an `UnknownVariable` error.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| StablError::unknown_variable(name))
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// New dataset restricted to the named variables, kept in dataset order.
    pub fn subset_columns(&self, keep: &[Variable]) -> Result<Dataset> {
        let mut cols = keep
            .iter()
            .map(|v| self.require(v.name()))
            .collect::<Result<Vec<_>>>()?;
        cols.sort_unstable();
        cols.dedup();

        let variables = cols.iter().map(|&j| self.variables[j].clone()).collect();
        let data = self.data.select_columns(cols.iter());
        Self::new(variables, data)
    }

    /// New dataset made of the given rows of this one (rows may repeat).
    pub fn select_rows(&self, rows: &[usize]) -> Dataset {
        Self {
            variables: self.variables.clone(),
            index: self.index.clone(),
            data: self.data.select_rows(rows.iter()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_rows(
            vec![
                Variable::continuous("a"),
                Variable::continuous("b"),
                Variable::discrete("c", 2),
            ],
            &[
                vec![1.0, 2.0, 0.0],
                vec![3.0, 4.0, 1.0],
                vec![5.0, 6.0, 1.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_by_name() {
        let data = sample();
        assert_eq!(data.num_rows(), 3);
        assert_eq!(data.column_index("b"), Some(1));
        assert!(data.variable("c").unwrap().is_discrete());
        assert!(matches!(
            data.require("z"),
            Err(StablError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_names_and_bad_categories() {
        let dup = Dataset::from_rows(
            vec![Variable::continuous("a"), Variable::continuous("a")],
            &[vec![1.0, 2.0]],
        );
        assert!(dup.is_err());

        for value in [2.0, -1.0, 0.5] {
            let bad = Dataset::from_rows(vec![Variable::discrete("c", 2)], &[vec![0.0], vec![value]]);
            assert!(bad.is_err(), "value {}", value);
        }
        let ok = Dataset::from_rows(vec![Variable::discrete("c", 2)], &[vec![0.0], vec![1.0]]);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_subset_keeps_dataset_order() {
        let data = sample();
        let sub = data
            .subset_columns(&[Variable::discrete("c", 2), Variable::continuous("a")])
            .unwrap();
        let names: Vec<_> = sub.variables().iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(sub.matrix()[(1, 0)], 3.0);
        assert_eq!(sub.matrix()[(1, 1)], 1.0);
    }

    #[test]
    fn test_select_rows_repeats() {
        let data = sample();
        let picked = data.select_rows(&[2, 2, 0]);
        assert_eq!(picked.num_rows(), 3);
        assert_eq!(picked.matrix()[(0, 0)], 5.0);
        assert_eq!(picked.matrix()[(1, 0)], 5.0);
        assert_eq!(picked.matrix()[(2, 0)], 1.0);
    }
}
