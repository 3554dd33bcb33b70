//! Stability selection bookkeeping.
//!
//! Pairs are enumerated targets-outer, predictors-inner; with `t` targets and a
//! pool of `m` predictors there are `p = t·m` pairs. For a cutoff `q` the
//! selection frequency π of a pair is the share of completed subsamples that
//! rank its predictor within the top `q` for its target.

use serde::{Deserialize, Serialize};

/// Ranks and effects of the pool predictors from one completed subsample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsampleRanks {
    /// `position[t][k]`: zero-based rank of pool predictor `k` for target `t`.
    pub position: Vec<Vec<usize>>,
    /// `effect[t][k]`: effect lower bound reported with that rank.
    pub effect: Vec<Vec<f64>>,
}

/// Index of a (target, pool predictor) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub target: usize,
    pub predictor: usize,
}

/// The accepted cutoff and its top-`q` pairs with their frequencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub q: usize,
    /// Sum of the top-`q` frequencies.
    pub sum: f64,
    pub pairs: Vec<(PairKey, f64)>,
}

fn pairs(num_targets: usize, pool_size: usize) -> impl Iterator<Item = PairKey> {
    (0..num_targets).flat_map(move |target| {
        (0..pool_size).map(move |predictor| PairKey { target, predictor })
    })
}

/// Number of subsamples placing each pair within the top `q`, in pair order.
pub fn tallies(samples: &[SubsampleRanks], num_targets: usize, pool_size: usize, q: usize) -> Vec<usize> {
    pairs(num_targets, pool_size)
        .map(|pair| {
            samples
                .iter()
                .filter(|s| s.position[pair.target][pair.predictor] < q)
                .count()
        })
        .collect()
}

/// Selection frequencies π for cutoff `q`, in pair order.
pub fn frequencies(samples: &[SubsampleRanks], num_targets: usize, pool_size: usize, q: usize) -> Vec<f64> {
    let completed = samples.len().max(1) as f64;
    tallies(samples, num_targets, pool_size, q)
        .into_iter()
        .map(|count| count as f64 / completed)
        .collect()
}

/// Grow `q` from 1 while the top-`q` frequency mass clears `lift·q²/p`; the
/// last accepted `q` is the selection. `None` when even `q = 1` fails.
pub fn select(samples: &[SubsampleRanks], num_targets: usize, pool_size: usize, lift: f64) -> Option<Selection> {
    let p = num_targets * pool_size;
    if samples.is_empty() || p == 0 {
        return None;
    }

    let keys: Vec<PairKey> = pairs(num_targets, pool_size).collect();
    let mut accepted = None;

    for q in 1..=p / 2 {
        let pis = frequencies(samples, num_targets, pool_size, q);
        let mut order: Vec<usize> = (0..p).collect();
        // stable: equal π keep enumeration order
        order.sort_by(|&a, &b| pis[b].total_cmp(&pis[a]));

        let top = &order[..q];
        let sum: f64 = top.iter().map(|&i| pis[i]).sum();
        let threshold = lift * (q * q) as f64 / p as f64;
        if sum < threshold {
            break;
        }
        accepted = Some(Selection {
            q,
            sum,
            pairs: top.iter().map(|&i| (keys[i], pis[i])).collect(),
        });
    }
    accepted
}

/// Mean effect of a pair over all completed subsamples; subsamples that did
/// not rank the predictor within the top `q` contribute zero.
pub fn average_effect(samples: &[SubsampleRanks], pair: PairKey, q: usize) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let total: f64 = samples
        .iter()
        .filter(|s| s.position[pair.target][pair.predictor] < q)
        .map(|s| s.effect[pair.target][pair.predictor])
        .sum();
    total / samples.len() as f64
}

/// Per-comparison error rate bound `q² / (p²(2π − 1))`, in `[0, 1]`.
pub fn pcer(pi: f64, q: usize, p: usize) -> f64 {
    let denom = 2.0 * pi - 1.0;
    if denom <= 0.0 || p == 0 {
        return 1.0;
    }
    let (q, p) = (q as f64, p as f64);
    (q * q / (p * p * denom)).clamp(0.0, 1.0)
}

/// Expected number of erroneous selections `q − S`, in `[0, q]`.
pub fn expected_errors(q: usize, sum: f64) -> f64 {
    let q = q as f64;
    (q - sum).clamp(0.0, q)
}

/// Meinshausen–Bühlmann bound on expected false positives
/// `q² / (p(2π − 1))`, in `[0, q]`.
pub fn expected_false_positives(pi: f64, q: usize, p: usize) -> f64 {
    let qf = q as f64;
    let denom = 2.0 * pi - 1.0;
    if denom <= 0.0 || p == 0 {
        return qf;
    }
    (qf * qf / (p as f64 * denom)).clamp(0.0, qf)
}
