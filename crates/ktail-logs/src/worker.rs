use std::sync::Arc;

use futures::StreamExt;

use ktail_k8s::ClusterApi;
use ktail_types::{LogLine, PodRef};

use crate::context::StreamContext;

/// Stream one pod's log into the shared queue
///
/// Emits the header line, opens a follow-mode read for the last
/// `tail_lines` lines and forwards each line until the stream ends, fails,
/// or the run is cancelled. Open and read failures are logged and not
/// retried. The pod's registry claim is left in place on every exit path.
pub(crate) async fn stream_pod_logs<C: ClusterApi>(ctx: &StreamContext<C>, pod: Arc<PodRef>) {
    if !ctx.emit(LogLine::header(Arc::clone(&pod))).await {
        return;
    }

    let opened = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return,
        opened = ctx.cluster.open_log(&pod, ctx.config.tail_lines) => opened,
    };

    let mut lines = match opened {
        Ok(lines) => lines,
        Err(e) => {
            tracing::error!(pod = %pod, error = %format!("{e:#}"), "failed to create log stream");
            return;
        }
    };

    loop {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return,

            next = lines.next() => {
                match next {
                    Some(Ok(text)) => {
                        if !ctx.emit(LogLine::new(Arc::clone(&pod), text)).await {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::error!(pod = %pod, error = %format!("{e:#}"), "error reading log stream");
                        return;
                    }
                    None => {
                        tracing::debug!(pod = %pod, "log stream ended");
                        return;
                    }
                }
            }
        }
    }
}
