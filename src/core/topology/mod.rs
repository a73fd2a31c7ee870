// Topology equivalence clustering of per-window trees

pub mod binner;
pub mod newick;
pub mod robinson_foulds;

pub use binner::{
    bin_topologies, BinningResult, ComparisonFailure, RankedTopology, TopologyBinner,
    TopologyCluster, NO_DATA_LABEL,
};
pub use newick::{parse_annotated, parse_newick, strip_annotations, PhyloTree};
pub use robinson_foulds::{rooted_rf, topology_distance, unrooted_rf, CompareError};
