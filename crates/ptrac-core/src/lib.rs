pub mod chain;
pub mod decoder;
pub mod domain;
pub mod format;
pub mod pulse;
pub mod record;
pub mod serialization;

pub use chain::{FissionChainData, FissionChainTree, build_fission_chain, build_fission_chains};
pub use decoder::{PtracHeader, PtracReader, ReaderState};
pub use domain::{
    Event, NeutronHistory, NpsHistory, ParticleHistory, PtracError, PtracErrorKind, PtracResult,
    Reaction,
};
pub use format::{FormatConfig, load_format_config};
pub use pulse::Pulse;
