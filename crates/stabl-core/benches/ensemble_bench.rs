use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use stabl_core::{
    aggregate, BaseLearner, Dataset, EnsembleRule, Endpoint, Graph, PcSearch, TestConfig,
    Variable,
};

fn random_graphs(nodes: usize, count: usize, density: f64, seed: u64) -> Vec<Graph> {
    let mut rng = StdRng::seed_from_u64(seed);
    let vars: Vec<Variable> = (0..nodes).map(|i| Variable::continuous(format!("V{}", i))).collect();
    let marks = [Endpoint::Tail, Endpoint::Arrow, Endpoint::Circle];
    (0..count)
        .map(|_| {
            let mut g = Graph::new(vars.clone());
            for i in 0..nodes {
                for j in (i + 1)..nodes {
                    if rng.gen_bool(density) {
                        g.set_edge(i, j, marks[rng.gen_range(0..3)], marks[rng.gen_range(0..3)]);
                    }
                }
            }
            g
        })
        .collect()
}

fn benchmark_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("ensemble_aggregate");
    for nodes in [20, 50] {
        let graphs = random_graphs(nodes, 50, 0.1, 42);
        for rule in [EnsembleRule::Preserved, EnsembleRule::Highest, EnsembleRule::Majority] {
            group.bench_with_input(
                BenchmarkId::new(rule.to_string(), nodes),
                &graphs,
                |b, graphs| b.iter(|| aggregate(black_box(graphs), rule)),
            );
        }
    }
    group.finish();
}

fn benchmark_pc_search(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let rows: Vec<Vec<f64>> = (0..1000)
        .map(|_| {
            let mut row = Vec::with_capacity(10);
            for k in 0..10 {
                let parent = if k > 0 { 0.6 * row[k - 1] } else { 0.0 };
                row.push(parent + normal.sample(&mut rng));
            }
            row
        })
        .collect();
    let vars = (0..10).map(|i| Variable::continuous(format!("V{}", i))).collect();
    let data = Dataset::from_rows(vars, &rows).unwrap();
    let pc = PcSearch::new(TestConfig::fisher_z(0.01));

    c.bench_function("pc_search_chain_10", |b| {
        b.iter(|| pc.search(black_box(&data)))
    });
}

criterion_group!(benches, benchmark_aggregate, benchmark_pc_search);
criterion_main!(benches);
