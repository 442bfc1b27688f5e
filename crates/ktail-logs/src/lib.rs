//! Log streaming for ktail
//!
//! This crate multiplexes follow-mode log streams from many pods into one
//! console stream. It decides which pods to stream, guarantees no pod is
//! streamed twice, waits for pods that are not yet ready, and reacts to pods
//! being created and deleted while it runs.

mod aggregator;
mod config;
mod context;
mod error;
mod readiness;
mod registry;
mod shutdown;
mod streamer;
mod watcher;
mod worker;

pub use aggregator::print_lines;
pub use config::StreamConfig;
pub use error::StreamError;
pub use readiness::ReadinessOutcome;
pub use registry::StreamRegistry;
pub use shutdown::{cancel_on_signal, wait_for_shutdown_signal};
pub use streamer::LogStreamer;

// Re-export types used in our public API
pub use ktail_k8s::ClusterApi;
pub use ktail_types::{LogLine, MembershipEvent, PodInfo, PodKey, PodRef};
pub use tokio_util::sync::CancellationToken;
