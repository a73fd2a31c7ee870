// binner.rs - First-match topology clustering and frequency-ranked labels

use super::newick::{parse_newick, strip_annotations, PhyloTree};
use super::robinson_foulds::{topology_distance, CompareError};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

/// Label given to windows without a usable tree
pub const NO_DATA_LABEL: &str = "NoData";

/// Group of windows whose trees have RF distance 0 to the representative
#[derive(Debug, Clone)]
pub struct TopologyCluster {
    pub id: usize,
    /// Annotation-free Newick of the first member
    pub representative: String,
    /// Input indices, in input order
    pub members: Vec<usize>,
    tree: PhyloTree,
}

impl TopologyCluster {
    pub fn count(&self) -> usize {
        self.members.len()
    }
}

/// A comparison that failed in both rooted and unrooted mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonFailure {
    pub index: usize,
    pub cluster_id: usize,
    pub error: CompareError,
}

/// Ranked cluster as reported to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedTopology {
    pub label: String,
    pub representative: String,
    pub members: Vec<usize>,
}

impl RankedTopology {
    pub fn count(&self) -> usize {
        self.members.len()
    }
}

/// Outcome of one binning pass
#[derive(Debug, Clone, Default)]
pub struct BinningResult {
    /// One label per input position
    pub labels: Vec<String>,
    /// Clusters by descending count, discovery order on ties
    pub topologies: Vec<RankedTopology>,
    /// Trees that could not be parsed: (index, message)
    pub unparsed: Vec<(usize, String)>,
    pub comparison_failures: Vec<ComparisonFailure>,
}

/// Arena of clusters filled by a single ordered pass
#[derive(Debug, Default)]
pub struct TopologyBinner {
    clusters: Vec<TopologyCluster>,
    failures: Vec<ComparisonFailure>,
}

impl TopologyBinner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clusters(&self) -> &[TopologyCluster] {
        &self.clusters
    }

    /// Place a tree in the first cluster at distance 0, scanning in creation
    /// order; otherwise open a new cluster it represents. A failed comparison
    /// counts as "not equal" and scanning goes on, so a tree that cannot be
    /// compared with anything ends up as a singleton. Returns the cluster id.
    pub fn insert(&mut self, index: usize, newick: String, tree: PhyloTree) -> usize {
        for cluster in self.clusters.iter_mut() {
            match topology_distance(&cluster.tree, &tree) {
                Ok(0) => {
                    cluster.members.push(index);
                    return cluster.id;
                }
                Ok(_) => {}
                Err(error) => self.failures.push(ComparisonFailure {
                    index,
                    cluster_id: cluster.id,
                    error,
                }),
            }
        }

        let id = self.clusters.len();
        self.clusters.push(TopologyCluster {
            id,
            representative: newick,
            members: vec![index],
            tree,
        });
        id
    }

    /// Rank by descending count (stable, so discovery order breaks ties)
    /// and label every member `topology1`, `topology2`, ...
    pub fn finish(self, total: usize) -> (Vec<String>, Vec<RankedTopology>, Vec<ComparisonFailure>) {
        let mut ranked: Vec<TopologyCluster> = self.clusters;
        ranked.sort_by(|a, b| b.count().cmp(&a.count()));

        let mut labels = vec![NO_DATA_LABEL.to_string(); total];
        let topologies = ranked
            .into_iter()
            .enumerate()
            .map(|(rank, cluster)| {
                let label = format!("topology{}", rank + 1);
                for &member in &cluster.members {
                    labels[member] = label.clone();
                }
                RankedTopology {
                    label,
                    representative: cluster.representative,
                    members: cluster.members,
                }
            })
            .collect();

        (labels, topologies, self.failures)
    }
}

/// Label every tree by topology. `None` entries are the "no tree" sentinel
/// and receive [`NO_DATA_LABEL`], as do trees that fail to parse.
pub fn bin_topologies(trees: &[Option<&str>]) -> BinningResult {
    // Parsing is independent per tree; clustering below stays sequential
    let parsed: Vec<Option<Result<(String, PhyloTree), String>>> = trees
        .par_iter()
        .map(|entry| {
            (*entry).map(|raw| {
                let clean = strip_annotations(raw)?;
                let tree = parse_newick(&clean)?;
                Ok((clean, tree))
            })
        })
        .collect();

    let pb = ProgressBar::new(trees.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} trees binned")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut binner = TopologyBinner::new();
    let mut unparsed = Vec::new();
    for (index, entry) in parsed.into_iter().enumerate() {
        match entry {
            Some(Ok((clean, tree))) => {
                binner.insert(index, clean, tree);
            }
            Some(Err(e)) => unparsed.push((index, e)),
            None => {}
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let (labels, topologies, comparison_failures) = binner.finish(trees.len());
    BinningResult {
        labels,
        topologies,
        unparsed,
        comparison_failures,
    }
}
