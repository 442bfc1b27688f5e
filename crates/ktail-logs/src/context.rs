use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use ktail_k8s::ClusterApi;
use ktail_types::{LogLine, PodRef};

use crate::config::StreamConfig;
use crate::registry::StreamRegistry;
use crate::{readiness, watcher, worker};

/// Handles shared by every task of one streaming run
pub(crate) struct StreamContext<C> {
    pub cluster: Arc<C>,
    pub config: Arc<StreamConfig>,
    pub registry: StreamRegistry,
    pub lines: mpsc::Sender<LogLine>,
    pub cancel: CancellationToken,
    pub tracker: TaskTracker,
}

impl<C> Clone for StreamContext<C> {
    fn clone(&self) -> Self {
        Self {
            cluster: Arc::clone(&self.cluster),
            config: Arc::clone(&self.config),
            registry: self.registry.clone(),
            lines: self.lines.clone(),
            cancel: self.cancel.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

impl<C: ClusterApi> StreamContext<C> {
    /// Start streaming a pod whose claim is already held
    pub fn spawn_worker(&self, pod: PodRef) {
        let ctx = self.clone();
        self.tracker
            .spawn(async move { worker::stream_pod_logs(&ctx, Arc::new(pod)).await });
    }

    /// Start polling a newly discovered pod until it can be streamed
    pub fn spawn_readiness_waiter(&self, pod: PodRef) {
        let ctx = self.clone();
        self.tracker.spawn(async move {
            let key = pod.key();
            let outcome = readiness::wait_until_ready(&ctx, pod).await;
            tracing::debug!(pod = %key, ?outcome, "readiness wait finished");
        });
    }

    /// Start reacting to pod membership changes in a namespace
    pub fn spawn_watcher(&self, namespace: String) {
        let ctx = self.clone();
        self.tracker
            .spawn(async move { watcher::watch_namespace(&ctx, namespace).await });
    }
}

impl<C> StreamContext<C> {
    /// Push a line to the aggregator
    ///
    /// Returns false once cancelled or when the aggregator has gone away;
    /// the caller should stop producing.
    pub async fn emit(&self, line: LogLine) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.lines.send(line) => sent.is_ok(),
        }
    }

    /// Sleep unless cancelled first; returns false on cancellation
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
