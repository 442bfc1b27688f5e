use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

use ktail_types::{MembershipEvent, PodInfo, PodRef};

/// Lines read from a follow-mode log request
pub type LineStream = BoxStream<'static, Result<String>>;

/// Membership changes for one namespace, in delivery order
pub type EventStream = BoxStream<'static, Result<MembershipEvent>>;

/// Operations the streaming engine needs from the cluster
///
/// Implementations must be cheap to share; the engine holds one behind an
/// `Arc` and calls it from many tasks at once.
#[async_trait]
pub trait ClusterApi: Send + Sync + 'static {
    /// List every pod in a namespace
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>>;

    /// Fetch the current status of one pod
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<PodInfo>;

    /// Subscribe to pod lifecycle events in a namespace
    ///
    /// The stream ends when the server closes the watch; callers do not
    /// re-subscribe.
    async fn watch_pods(&self, namespace: &str) -> Result<EventStream>;

    /// Open a follow-mode log read starting `tail_lines` lines back
    async fn open_log(&self, pod: &PodRef, tail_lines: i64) -> Result<LineStream>;
}
