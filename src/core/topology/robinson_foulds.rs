// robinson_foulds.rs - Rooted and unrooted Robinson-Foulds distance

use super::newick::PhyloTree;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Structural reasons two trees cannot be compared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareError {
    /// Rooted comparison of a multifurcating root, or of roots with different degree
    UnrootedTree { left_degree: usize, right_degree: usize },
    LeafSetMismatch,
    DuplicateLeaf(String),
}

impl fmt::Display for CompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareError::UnrootedTree { left_degree, right_degree } => write!(
                f,
                "unrooted tree found (root degrees {} and {})",
                left_degree, right_degree
            ),
            CompareError::LeafSetMismatch => write!(f, "trees do not share the same leaf set"),
            CompareError::DuplicateLeaf(name) => write!(f, "duplicated leaf name '{}'", name),
        }
    }
}

type Bipartition = Vec<u64>;

/// Shared leaf numbering of two trees
fn leaf_index(a: &PhyloTree, b: &PhyloTree) -> Result<BTreeMap<String, usize>, CompareError> {
    fn names(tree: &PhyloTree) -> Result<Vec<&str>, CompareError> {
        let mut seen = HashSet::new();
        let labels = tree.leaf_labels();
        for name in &labels {
            if !seen.insert(*name) {
                return Err(CompareError::DuplicateLeaf(name.to_string()));
            }
        }
        Ok(labels)
    }

    let mut left = names(a)?;
    let mut right = names(b)?;
    left.sort_unstable();
    right.sort_unstable();
    if left != right {
        return Err(CompareError::LeafSetMismatch);
    }

    Ok(left
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name.to_string(), i))
        .collect())
}

fn set_bit(bits: &mut [u64], i: usize) {
    bits[i / 64] |= 1u64 << (i % 64);
}

fn count_bits(bits: &[u64]) -> usize {
    bits.iter().map(|w| w.count_ones() as usize).sum()
}

/// Leaf set below every node, indexed by node
fn descendant_sets(tree: &PhyloTree, leaves: &BTreeMap<String, usize>) -> Vec<Bipartition> {
    let words = leaves.len().div_ceil(64).max(1);
    let mut sets = vec![vec![0u64; words]; tree.len()];

    for idx in tree.postorder() {
        let node = tree.node(idx);
        if node.is_leaf() {
            if let Some(&bit) = node.label.as_deref().and_then(|l| leaves.get(l)) {
                set_bit(&mut sets[idx], bit);
            }
        } else {
            let mut acc = vec![0u64; words];
            for &child in &node.children {
                for (w, c) in acc.iter_mut().zip(&sets[child]) {
                    *w |= c;
                }
            }
            sets[idx] = acc;
        }
    }
    sets
}

/// Non-trivial clades (internal, non-root nodes)
fn clades(tree: &PhyloTree, leaves: &BTreeMap<String, usize>) -> HashSet<Bipartition> {
    let sets = descendant_sets(tree, leaves);
    let n = leaves.len();
    (0..tree.len())
        .filter(|&idx| idx != tree.root() && !tree.node(idx).is_leaf())
        .map(|idx| sets[idx].clone())
        .filter(|s| {
            let size = count_bits(s);
            size >= 2 && size < n
        })
        .collect()
}

/// Non-trivial splits, normalised to the side without leaf 0
fn splits(tree: &PhyloTree, leaves: &BTreeMap<String, usize>) -> HashSet<Bipartition> {
    let sets = descendant_sets(tree, leaves);
    let n = leaves.len();
    let words = n.div_ceil(64).max(1);
    let mut full = vec![0u64; words];
    for i in 0..n {
        set_bit(&mut full, i);
    }

    (0..tree.len())
        .filter(|&idx| idx != tree.root())
        .filter_map(|idx| {
            let side = &sets[idx];
            let normalised: Bipartition = if side[0] & 1 == 1 {
                side.iter().zip(&full).map(|(s, f)| !s & f).collect()
            } else {
                side.clone()
            };
            let size = count_bits(&normalised);
            if size >= 2 && size + 2 <= n {
                Some(normalised)
            } else {
                None
            }
        })
        .collect()
}

fn symmetric_difference(a: &HashSet<Bipartition>, b: &HashSet<Bipartition>) -> usize {
    a.symmetric_difference(b).count()
}

/// Rooted RF distance; fails on multifurcating or mismatched root degrees
pub fn rooted_rf(a: &PhyloTree, b: &PhyloTree) -> Result<usize, CompareError> {
    let (left_degree, right_degree) = (a.root_degree(), b.root_degree());
    if left_degree != right_degree || left_degree > 2 {
        return Err(CompareError::UnrootedTree { left_degree, right_degree });
    }
    let leaves = leaf_index(a, b)?;
    Ok(symmetric_difference(&clades(a, &leaves), &clades(b, &leaves)))
}

/// Unrooted RF distance over bipartitions
pub fn unrooted_rf(a: &PhyloTree, b: &PhyloTree) -> Result<usize, CompareError> {
    let leaves = leaf_index(a, b)?;
    Ok(symmetric_difference(&splits(a, &leaves), &splits(b, &leaves)))
}

/// Rooted comparison, retried unrooted when the rooted one fails
pub fn topology_distance(a: &PhyloTree, b: &PhyloTree) -> Result<usize, CompareError> {
    rooted_rf(a, b).or_else(|_| unrooted_rf(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::topology::newick::parse_newick;

    fn rf(a: &str, b: &str) -> Result<usize, CompareError> {
        topology_distance(&parse_newick(a).unwrap(), &parse_newick(b).unwrap())
    }

    #[test]
    fn test_identical_topology_ignores_lengths_and_order() {
        assert_eq!(rf("(A:1,(B:2,C:3));", "((C,B),A);"), Ok(0));
        assert_eq!(rf("((A,B),(C,D));", "((D,C),(B,A));"), Ok(0));
    }

    #[test]
    fn test_rooted_difference() {
        let a = parse_newick("(A,(B,C));").unwrap();
        let b = parse_newick("(B,(A,C));").unwrap();
        assert_eq!(rooted_rf(&a, &b), Ok(2));
        // all unrooted three-taxon trees are equal
        assert_eq!(unrooted_rf(&a, &b), Ok(0));
    }

    #[test]
    fn test_rooting_matters_in_rooted_mode() {
        assert_eq!(rf("((A,B),(C,D));", "(A,(B,(C,D)));"), Ok(2));
    }

    #[test]
    fn test_unrooted_fallback() {
        let a = parse_newick("(A,B,(C,D));").unwrap();
        let b = parse_newick("((A,B),C,D);").unwrap();
        assert!(matches!(rooted_rf(&a, &b), Err(CompareError::UnrootedTree { .. })));
        assert_eq!(rf("(A,B,(C,D));", "((A,B),C,D);"), Ok(0));
        assert_eq!(rf("(A,C,(B,D));", "((A,B),C,D);"), Ok(2));
    }

    #[test]
    fn test_differing_root_degree_falls_back() {
        assert_eq!(rf("((A,B),(C,D));", "(A,B,(C,D));"), Ok(0));
    }

    #[test]
    fn test_incomparable_trees() {
        assert_eq!(rf("(A,(B,C));", "(A,(B,D));"), Err(CompareError::LeafSetMismatch));
        assert_eq!(
            rf("(A,(A,C));", "(A,(B,C));"),
            Err(CompareError::DuplicateLeaf("A".to_string()))
        );
    }

    #[test]
    fn test_many_leaves_span_words() {
        let names: Vec<String> = (0..70).map(|i| format!("t{}", i)).collect();
        let ladder = names
            .iter()
            .skip(1)
            .fold(names[0].clone(), |acc, n| format!("({},{})", acc, n));
        let tree = format!("{};", ladder);
        assert_eq!(rf(&tree, &tree), Ok(0));
    }
}
