//! Initial pod selection

use anyhow::{Result, bail};

use ktail_logs::{ClusterApi, PodRef};

/// Resolve the pods to stream at startup
///
/// With explicit `pods` each one is looked up and must exist; otherwise
/// every pod in the namespace is selected. `container` overrides the
/// default of each pod's first container. An empty namespace is not an
/// error: discovery may still find pods later.
pub async fn resolve_targets<C: ClusterApi>(
    cluster: &C,
    namespace: &str,
    pods: &[String],
    container: Option<&str>,
) -> Result<Vec<PodRef>> {
    let infos = if pods.is_empty() {
        cluster.list_pods(namespace).await?
    } else {
        let mut infos = Vec::with_capacity(pods.len());
        for name in pods {
            infos.push(cluster.get_pod(namespace, name).await?);
        }
        infos
    };

    let mut targets = Vec::with_capacity(infos.len());
    for info in infos {
        match info.to_pod_ref(container) {
            Some(pod) => targets.push(pod),
            None => bail!("Pod {} has no containers", info.key()),
        }
    }

    if targets.is_empty() {
        tracing::info!(namespace, "no pods found, waiting for new pods");
    }

    Ok(targets)
}
