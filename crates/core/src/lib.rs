//! Shared domain types for the single-channel file-transfer service.
//!
//! Neither side owns a socket here — this crate is the leaf shared by
//! `daemon` and `client`: the per-connection [`Session`] record, the
//! process-wide [`ServerContext`], aggregated [`ServerStats`], and the
//! crate-wide [`error::CoreError`].

pub mod error;
pub mod framed_stream;
pub mod path_safety;
pub mod server_context;
pub mod session;
pub mod stats;

pub use error::{CoreError, ResourceError};
pub use framed_stream::FramedStream;
pub use path_safety::sanitize_filename;
pub use server_context::ServerContext;
pub use session::{Session, SessionId};
pub use stats::{ClientStats, ClientStatsSnapshot, ServerStats, StatsSnapshot};
