//! Production implementations of the relay's trait seams.
//!
//! These talk to real chains, the Iris API, a graph-node indexer and the
//! system clock. Tests use the fakes in [`crate::testing`] instead.

mod alloy;
mod graphql;
mod iris;
mod tokio_clock;

pub use self::alloy::AlloyRouterChain;
pub use self::graphql::GraphQlIndexer;
pub use self::iris::{IrisAttestationProvider, REQUEST_TIMEOUT};
pub use self::tokio_clock::TokioClock;
