//! Reference collaborators: independence tests, a PC-style structure search
//! and an IDA-style effect estimator.

mod ida;
mod independence;
mod pc;
pub mod stats;

pub use ida::IdaEstimator;
pub use independence::{ChiSquare, FisherZ, IndependenceTest, SemBicTest, TestConfig, TestKind};
pub use pc::PcSearch;

/// All `k`-element subsets of `items`, in lexicographic index order.
pub(crate) fn combinations(items: &[usize], k: usize) -> Vec<Vec<usize>> {
    let n = items.len();
    if k > n {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.iter().map(|&i| items[i]).collect());
        // advance the rightmost index that still has room
        let mut i = k;
        loop {
            if i == 0 {
                return out;
            }
            i -= 1;
            if idx[i] != i + n - k {
                break;
            }
            if i == 0 {
                return out;
            }
        }
        idx[i] += 1;
        for j in i + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// Every subset of `items`, smallest first.
pub(crate) fn power_set(items: &[usize]) -> Vec<Vec<usize>> {
    (0..=items.len())
        .flat_map(|k| combinations(items, k))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combinations() {
        assert_eq!(
            combinations(&[1, 2, 3], 2),
            vec![vec![1, 2], vec![1, 3], vec![2, 3]]
        );
        assert_eq!(combinations(&[4, 5], 0), vec![Vec::<usize>::new()]);
        assert!(combinations(&[4], 2).is_empty());
        assert_eq!(combinations(&[7, 8, 9], 3), vec![vec![7, 8, 9]]);
    }

    #[test]
    fn test_power_set_size() {
        assert_eq!(power_set(&[]).len(), 1);
        assert_eq!(power_set(&[0, 1, 2, 3]).len(), 16);
    }
}
