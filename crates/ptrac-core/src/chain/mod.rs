//! Fission-chain reconstruction: one tree of neutron lifetimes per NPS,
//! rooted at the spontaneous-fission source, and the flat statistics
//! extracted from it.

mod builder;
mod extract;
mod tree;

pub use builder::{ChainBuilder, build_fission_chain};
pub use extract::{FissionChainData, ReactionData};
pub use tree::{FissionChainTree, NodeId, Preorder};

use crate::domain::{NpsHistory, PtracResult};
use crate::format::FormatConfig;

/// Builds one tree per history. Results keep the input order.
#[cfg(feature = "parallel")]
pub fn build_fission_chains(
    histories: &[NpsHistory],
    config: &FormatConfig,
) -> Vec<PtracResult<FissionChainTree>> {
    use rayon::prelude::*;

    histories
        .par_iter()
        .map(|history| build_fission_chain(history, config))
        .collect()
}

/// Builds one tree per history. Results keep the input order.
#[cfg(not(feature = "parallel"))]
pub fn build_fission_chains(
    histories: &[NpsHistory],
    config: &FormatConfig,
) -> Vec<PtracResult<FissionChainTree>> {
    histories
        .iter()
        .map(|history| build_fission_chain(history, config))
        .collect()
}
