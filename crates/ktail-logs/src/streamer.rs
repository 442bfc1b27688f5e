use std::io::Write;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use ktail_k8s::ClusterApi;
use ktail_types::PodRef;

use crate::aggregator::print_lines;
use crate::config::StreamConfig;
use crate::context::StreamContext;
use crate::error::StreamError;
use crate::registry::StreamRegistry;

/// Multiplexes log streams from many pods into one output
///
/// Every task the streamer starts (workers, readiness waiters, namespace
/// watchers) is tracked, and [`run`](Self::run) does not return until they
/// have unwound or the shutdown grace period has passed.
pub struct LogStreamer<C> {
    cluster: Arc<C>,
    config: Arc<StreamConfig>,
    registry: StreamRegistry,
    cancel: CancellationToken,
}

impl<C: ClusterApi> LogStreamer<C> {
    pub fn new(cluster: Arc<C>, config: StreamConfig) -> Self {
        Self {
            cluster,
            config: Arc::new(config),
            registry: StreamRegistry::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the run when cancelled
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Stream `initial` pods and follow membership in `namespaces`
    ///
    /// Lines are written to `out` until the token is cancelled. With no
    /// `namespaces` to watch, the run also ends once every initial stream
    /// has ended. Only a failure to write output is returned as an error.
    pub async fn run<W: Write + Send>(
        &self,
        initial: Vec<PodRef>,
        namespaces: &[String],
        out: W,
    ) -> Result<(), StreamError> {
        let (line_tx, line_rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let tracker = TaskTracker::new();

        let ctx = StreamContext {
            cluster: Arc::clone(&self.cluster),
            config: Arc::clone(&self.config),
            registry: self.registry.clone(),
            lines: line_tx,
            cancel: self.cancel.clone(),
            tracker: tracker.clone(),
        };

        for pod in initial {
            if ctx.registry.try_claim(pod.key()) {
                ctx.spawn_worker(pod);
            } else {
                tracing::debug!(pod = %pod, "skipping duplicate pod");
            }
        }

        for namespace in namespaces {
            ctx.spawn_watcher(namespace.clone());
        }

        // While watching, pods can appear at any time, so the queue stays
        // open until cancellation even if every task has ended. Without
        // watchers the tasks hold the only senders and the run ends with
        // the last stream.
        let keep_open = (!namespaces.is_empty()).then(|| ctx.lines.clone());
        drop(ctx);

        let printed = print_lines(line_rx, self.cancel.clone(), out).await;
        drop(keep_open);

        self.cancel.cancel();
        tracker.close();

        if tokio::time::timeout(self.config.shutdown_grace, tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = tracker.len(),
                grace = ?self.config.shutdown_grace,
                "tasks still running after shutdown grace period"
            );
        }

        let printed = printed?;
        tracing::debug!(printed, "log streaming stopped");
        Ok(())
    }
}
