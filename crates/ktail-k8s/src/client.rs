//! Kubernetes client for ktail

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::{AsyncBufRead, AsyncBufReadExt, Stream, StreamExt, future, stream};
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::{ListParams, LogParams, WatchEvent, WatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use tokio::sync::{mpsc, oneshot};

use ktail_types::{ContainerInfo, MembershipEvent, PodInfo, PodKey, PodPhase, PodRef};

use crate::api::{ClusterApi, EventStream, LineStream};

/// Lines buffered between the HTTP body reader and the consumer
const LOG_BUFFER: usize = 64;

/// Watch events buffered between the watch request and the consumer
const WATCH_BUFFER: usize = 16;

/// Kubernetes client wrapper
#[derive(Clone)]
pub struct KubeClient {
    client: kube::Client,
    default_namespace: String,
}

impl KubeClient {
    /// Connect to the cluster
    ///
    /// With a context name the kubeconfig is read and that context is used.
    /// Without one the configuration is inferred: in-cluster service account
    /// first, then the current kubeconfig context.
    pub async fn new(context: Option<&str>) -> Result<Self> {
        let config = match context {
            Some(context_name) => {
                let kubeconfig = Kubeconfig::read()
                    .context("Failed to read kubeconfig. Is kubectl configured?")?;
                kube::Config::from_custom_kubeconfig(
                    kubeconfig,
                    &KubeConfigOptions {
                        context: Some(context_name.to_string()),
                        ..Default::default()
                    },
                )
                .await
                .context(format!(
                    "Failed to create config for context: {}",
                    context_name
                ))?
            }
            None => kube::Config::infer()
                .await
                .context("Failed to load Kubernetes config. Is kubectl configured?")?,
        };

        let default_namespace = config.default_namespace.clone();
        let client =
            kube::Client::try_from(config).context("Failed to create Kubernetes client")?;

        Ok(Self {
            client,
            default_namespace,
        })
    }

    /// Namespace of the active context (or the service account's namespace)
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Convert a k8s Pod to PodInfo
    ///
    /// Containers are taken from the pod spec so their order matches the
    /// manifest; readiness is filled in from the container statuses.
    fn pod_to_info(pod: Pod, namespace: &str) -> PodInfo {
        let name = pod.metadata.name.unwrap_or_default();
        let mut info = PodInfo::new(namespace, name);

        if let Some(spec) = pod.spec {
            info.node_name = spec.node_name;
            info.containers = spec
                .containers
                .into_iter()
                .map(|c| ContainerInfo::new(c.name))
                .collect();
        }

        if let Some(status) = pod.status {
            info.phase = status
                .phase
                .as_deref()
                .map(PodPhase::from)
                .unwrap_or(PodPhase::Unknown);

            for cs in status.container_statuses.unwrap_or_default() {
                if let Some(container) = info.containers.iter_mut().find(|c| c.name == cs.name) {
                    container.ready = cs.ready;
                    container.restart_count = cs.restart_count;
                }
            }
        }

        info
    }

    /// Convert a raw watch event, dropping events that carry no pod change
    fn watch_event_to_membership(
        event: WatchEvent<Pod>,
        namespace: &str,
    ) -> Option<Result<MembershipEvent>> {
        match event {
            WatchEvent::Added(pod) => {
                let info = Self::pod_to_info(pod, namespace);
                match info.to_pod_ref(None) {
                    Some(pod) => Some(Ok(MembershipEvent::Added(pod))),
                    None => {
                        tracing::debug!(pod = %info.key(), "ignoring pod without containers");
                        None
                    }
                }
            }
            WatchEvent::Modified(pod) => {
                let info = Self::pod_to_info(pod, namespace);
                let pod = info.to_pod_ref(None)?;
                Some(Ok(MembershipEvent::Modified(pod, info)))
            }
            WatchEvent::Deleted(pod) => {
                let name = pod.metadata.name.unwrap_or_default();
                Some(Ok(MembershipEvent::Removed(PodKey::new(namespace, name))))
            }
            WatchEvent::Bookmark(_) => None,
            WatchEvent::Error(e) => Some(Err(anyhow!(
                "watch error in namespace {}: {} ({})",
                namespace,
                e.message,
                e.code
            ))),
        }
    }
}

/// Adapt a channel receiver into a boxed stream
fn channel_stream<T: Send + 'static>(rx: mpsc::Receiver<T>) -> stream::BoxStream<'static, T> {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}

/// Forward `items` into `tx` until the source ends or the receiver is dropped
///
/// Reader tasks run this loop, so they finish as soon as the consumer drops
/// the stream returned by [`channel_stream`].
async fn forward<S, T>(items: S, tx: mpsc::Sender<T>)
where
    S: Stream<Item = T>,
{
    let mut items = std::pin::pin!(items);

    loop {
        tokio::select! {
            _ = tx.closed() => break,

            next = items.next() => {
                let Some(item) = next else { break };
                if tx.send(item).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Split a log body into lines without requiring UTF-8
///
/// The trailing `\n` or `\r\n` is stripped and invalid bytes are replaced
/// with U+FFFD. The stream ends after the first read error.
fn lossy_lines<R>(reader: R) -> impl Stream<Item = std::io::Result<String>>
where
    R: AsyncBufRead + Unpin,
{
    stream::unfold(Some((reader, Vec::new())), |state| async move {
        let Some((mut reader, mut buf)) = state else {
            return None;
        };
        buf.clear();

        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => None,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                Some((Ok(line), Some((reader, buf))))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}

#[async_trait]
impl ClusterApi for KubeClient {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>> {
        let list = self
            .pods(namespace)
            .list(&ListParams::default())
            .await
            .context(format!("Failed to list pods in {}", namespace))?;

        Ok(list
            .items
            .into_iter()
            .map(|pod| Self::pod_to_info(pod, namespace))
            .collect())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<PodInfo> {
        let pod = self.pods(namespace).get(name).await.context(format!(
            "Failed to get pod '{}' in namespace '{}'",
            name, namespace
        ))?;

        Ok(Self::pod_to_info(pod, namespace))
    }

    async fn watch_pods(&self, namespace: &str) -> Result<EventStream> {
        let api = self.pods(namespace);
        let ns = namespace.to_string();
        let (opened_tx, opened_rx) = oneshot::channel();
        let (event_tx, event_rx) = mpsc::channel(WATCH_BUFFER);

        // The watch body is read on its own task so the returned stream owns
        // nothing borrowed from the request; dropping the stream stops it.
        tokio::spawn(async move {
            let events = match api.watch(&WatchParams::default(), "0").await {
                Ok(events) => {
                    let _ = opened_tx.send(Ok(()));
                    events
                }
                Err(e) => {
                    let _ = opened_tx.send(Err(e));
                    return;
                }
            };

            let converted = events.filter_map(move |event| {
                future::ready(match event {
                    Ok(event) => Self::watch_event_to_membership(event, &ns),
                    Err(e) => Some(Err(anyhow::Error::from(e))),
                })
            });
            forward(converted, event_tx).await;
        });

        opened_rx
            .await
            .context("Pod watch task exited before the watch was established")?
            .context(format!("Failed to watch pods in {}", namespace))?;

        Ok(channel_stream(event_rx))
    }

    async fn open_log(&self, pod: &PodRef, tail_lines: i64) -> Result<LineStream> {
        let api = self.pods(&pod.namespace);
        let name = pod.name.clone();
        let params = LogParams {
            follow: true,
            container: Some(pod.container.clone()),
            tail_lines: Some(tail_lines),
            ..Default::default()
        };
        let (opened_tx, opened_rx) = oneshot::channel();
        let (line_tx, line_rx) = mpsc::channel(LOG_BUFFER);

        // Same ownership split as the watch: the body reader lives on its own
        // task and stops once the returned stream is dropped.
        tokio::spawn(async move {
            let reader = match api.log_stream(&name, &params).await {
                Ok(reader) => {
                    let _ = opened_tx.send(Ok(()));
                    reader
                }
                Err(e) => {
                    let _ = opened_tx.send(Err(e));
                    return;
                }
            };

            let lines =
                lossy_lines(Box::pin(reader)).map(|line| line.map_err(anyhow::Error::from));
            forward(lines, line_tx).await;
        });

        opened_rx
            .await
            .context("Log stream task exited before the stream was opened")?
            .context(format!(
                "Failed to open log stream for {} (container: {})",
                pod, pod.container
            ))?;

        Ok(channel_stream(line_rx))
    }
}
