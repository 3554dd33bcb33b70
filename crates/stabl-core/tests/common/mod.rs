#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use stabl_core::{Dataset, Graph, Variable};
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(d) = "stabl_core=info".parse() {
        filter = filter.add_directive(d);
    }
    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}

/// x2 -> x1 <- x3, x1 -> y (slope 2), plus `noise` unrelated columns.
pub fn causal_data(n: usize, seed: u64, noise: usize) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|_| {
            let x2 = normal.sample(&mut rng);
            let x3 = normal.sample(&mut rng);
            let x1 = 0.5 * x2 + 0.5 * x3 + normal.sample(&mut rng);
            let y = 2.0 * x1 + normal.sample(&mut rng);
            let mut row = vec![x1, x2, x3, y];
            row.extend((0..noise).map(|_| normal.sample(&mut rng)));
            row
        })
        .collect();

    let mut vars: Vec<Variable> = ["X1", "X2", "X3", "Y"]
        .iter()
        .map(|n| Variable::continuous(*n))
        .collect();
    vars.extend((0..noise).map(|i| Variable::continuous(format!("N{}", i))));
    Dataset::from_rows(vars, &rows).unwrap()
}

pub fn true_graph(data: &Dataset) -> Graph {
    let mut g = Graph::new(data.variables().to_vec());
    g.add_directed("X2", "X1").unwrap();
    g.add_directed("X3", "X1").unwrap();
    g.add_directed("X1", "Y").unwrap();
    g
}

pub fn vars(names: &[&str]) -> Vec<Variable> {
    names.iter().map(|n| Variable::continuous(*n)).collect()
}
