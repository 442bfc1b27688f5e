use futures::StreamExt;

use ktail_k8s::ClusterApi;
use ktail_types::MembershipEvent;

use crate::context::StreamContext;

/// Follow pod membership in one namespace until the watch ends or the run
/// is cancelled
///
/// A watch that cannot be opened, or that closes, only ends discovery for
/// this namespace; pods already streaming are unaffected.
pub(crate) async fn watch_namespace<C: ClusterApi>(ctx: &StreamContext<C>, namespace: String) {
    let opened = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return,
        opened = ctx.cluster.watch_pods(&namespace) => opened,
    };

    let mut events = match opened {
        Ok(events) => events,
        Err(e) => {
            tracing::error!(
                namespace = %namespace,
                error = %format!("{e:#}"),
                "failed to create pod watcher, new pods will not be followed"
            );
            return;
        }
    };

    tracing::debug!(namespace = %namespace, "watching pods");

    loop {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return,

            next = events.next() => {
                match next {
                    Some(Ok(event)) => handle_event(ctx, event),
                    Some(Err(e)) => {
                        tracing::warn!(namespace = %namespace, error = %format!("{e:#}"), "pod watch error");
                    }
                    None => {
                        tracing::warn!(namespace = %namespace, "pod watcher closed, new pods will not be followed");
                        return;
                    }
                }
            }
        }
    }
}

fn handle_event<C: ClusterApi>(ctx: &StreamContext<C>, event: MembershipEvent) {
    match event {
        MembershipEvent::Added(pod) => {
            // The first events of a watch replay pods that already exist
            if ctx.registry.is_claimed(&pod.key()) {
                tracing::debug!(pod = %pod, "pod already streaming");
                return;
            }
            tracing::info!(pod = %pod, "new pod detected, waiting for container to be ready");
            ctx.spawn_readiness_waiter(pod);
        }
        MembershipEvent::Modified(pod, status) => {
            if status.is_ready_for(&pod.container) && ctx.registry.try_claim(pod.key()) {
                tracing::info!(pod = %pod, container = %pod.container, "pod is now ready, starting log stream");
                ctx.spawn_worker(pod);
            }
        }
        MembershipEvent::Removed(key) => {
            // Releasing does not stop a worker that is still reading
            if ctx.registry.release(&key) {
                tracing::info!(pod = %key, "pod deleted, released log stream");
            } else {
                tracing::debug!(pod = %key, "untracked pod deleted");
            }
        }
    }
}
