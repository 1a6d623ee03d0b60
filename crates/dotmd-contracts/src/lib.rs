//! Shared contract definitions to ensure consistency between the `dotmd`
//! CLI and the `dotmd-indexer` service, whether the CLI drives the engine
//! in-process or talks to a running service over HTTP/JSON-RPC.

pub mod api;
pub mod types;

pub use api::*;
pub use types::*;
