use ktail_k8s::ClusterApi;
use ktail_types::{PodPhase, PodRef};

use crate::context::StreamContext;

/// How a readiness wait ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadinessOutcome {
    /// The pod became ready and this waiter started its worker
    Started,
    /// Another path already claimed the pod
    AlreadyClaimed,
    /// The pod reached a phase it cannot leave
    Terminal(PodPhase),
    /// The pod's status could not be read
    LookupFailed,
    /// The attempt budget ran out
    TimedOut,
    /// The run was cancelled
    Cancelled,
}

/// Poll a pod until its container is ready, then claim it and start a worker
///
/// Each attempt first checks the registry so a waiter never competes with a
/// watcher that already started the pod.
pub(crate) async fn wait_until_ready<C: ClusterApi>(
    ctx: &StreamContext<C>,
    pod: PodRef,
) -> ReadinessOutcome {
    let key = pod.key();
    let max_attempts = ctx.config.ready_max_attempts;

    for attempt in 1..=max_attempts {
        if ctx.cancel.is_cancelled() {
            return ReadinessOutcome::Cancelled;
        }
        if ctx.registry.is_claimed(&key) {
            return ReadinessOutcome::AlreadyClaimed;
        }

        let status = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return ReadinessOutcome::Cancelled,
            status = ctx.cluster.get_pod(&pod.namespace, &pod.name) => status,
        };

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(pod = %key, error = %format!("{e:#}"), "failed to get pod status");
                return ReadinessOutcome::LookupFailed;
            }
        };

        if status.is_ready_for(&pod.container) {
            if !ctx.registry.try_claim(key) {
                return ReadinessOutcome::AlreadyClaimed;
            }
            tracing::info!(pod = %pod, container = %pod.container, "pod is ready, starting log stream");
            ctx.spawn_worker(pod);
            return ReadinessOutcome::Started;
        }

        if status.phase.is_terminal() {
            tracing::info!(pod = %key, phase = %status.phase, "pod is in a terminal phase, skipping log stream");
            return ReadinessOutcome::Terminal(status.phase);
        }

        tracing::debug!(pod = %key, phase = %status.phase, attempt, max_attempts, "pod not ready yet");

        if !ctx.sleep(ctx.config.ready_poll_interval).await {
            return ReadinessOutcome::Cancelled;
        }
    }

    tracing::warn!(
        pod = %key,
        timeout = ?ctx.config.ready_timeout(),
        "pod did not become ready within timeout, skipping log stream"
    );
    ReadinessOutcome::TimedOut
}
