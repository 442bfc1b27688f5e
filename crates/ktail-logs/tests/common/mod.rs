//! Scripted cluster and output capture for streaming tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use ktail_k8s::{ClusterApi, EventStream, LineStream};
use ktail_logs::{LogStreamer, StreamConfig, StreamError};
use ktail_types::{ContainerInfo, MembershipEvent, PodInfo, PodKey, PodPhase, PodRef};

/// What a scripted log stream does after its canned lines
#[derive(Clone, Debug)]
pub enum LogEnd {
    /// Stay open like a follow-mode read with no new output
    Follow,
    /// End cleanly
    Eof,
    /// End with a read error
    Fail(String),
}

#[derive(Clone, Debug)]
struct LogScript {
    lines: Vec<String>,
    end: LogEnd,
}

/// In-memory [`ClusterApi`] driven by the test
#[derive(Default)]
pub struct FakeCluster {
    /// Status answers per pod; the last entry repeats
    statuses: Mutex<HashMap<PodKey, VecDeque<PodInfo>>>,
    logs: Mutex<HashMap<PodKey, LogScript>>,
    open_failures: Mutex<HashMap<PodKey, String>>,
    watches: Mutex<HashMap<String, mpsc::UnboundedReceiver<Result<MembershipEvent>>>>,
    opens: Mutex<HashMap<PodKey, usize>>,
    tails: Mutex<HashMap<PodKey, i64>>,
    status_calls: Mutex<HashMap<PodKey, usize>>,
}

impl FakeCluster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer every status lookup for this pod with `info`
    pub fn set_status(&self, info: PodInfo) {
        self.statuses
            .lock()
            .insert(info.key(), VecDeque::from([info]));
    }

    /// Answer successive status lookups in order, repeating the last one
    pub fn script_statuses(&self, infos: Vec<PodInfo>) {
        let key = infos.first().expect("at least one status").key();
        self.statuses.lock().insert(key, infos.into());
    }

    pub fn set_logs(&self, pod: &PodRef, lines: &[&str], end: LogEnd) {
        self.logs.lock().insert(
            pod.key(),
            LogScript {
                lines: lines.iter().map(|l| l.to_string()).collect(),
                end,
            },
        );
    }

    pub fn fail_open(&self, pod: &PodRef, message: &str) {
        self.open_failures
            .lock()
            .insert(pod.key(), message.to_string());
    }

    /// Register a watch for `namespace` and return its event feed
    ///
    /// Dropping the sender closes the watch.
    pub fn watch(&self, namespace: &str) -> mpsc::UnboundedSender<Result<MembershipEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.watches.lock().insert(namespace.to_string(), rx);
        tx
    }

    pub fn opens(&self, pod: &PodRef) -> usize {
        self.opens.lock().get(&pod.key()).copied().unwrap_or(0)
    }

    pub fn total_opens(&self) -> usize {
        self.opens.lock().values().sum()
    }

    pub fn requested_tail(&self, pod: &PodRef) -> Option<i64> {
        self.tails.lock().get(&pod.key()).copied()
    }

    pub fn status_calls(&self, pod: &PodRef) -> usize {
        self.status_calls.lock().get(&pod.key()).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>> {
        Ok(self
            .statuses
            .lock()
            .values()
            .filter_map(|script| script.front().cloned())
            .filter(|info| info.namespace == namespace)
            .collect())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<PodInfo> {
        let key = PodKey::new(namespace, name);
        *self.status_calls.lock().entry(key.clone()).or_default() += 1;

        let mut statuses = self.statuses.lock();
        let script = statuses
            .get_mut(&key)
            .ok_or_else(|| anyhow!("pods \"{}\" not found", name))?;
        if script.len() > 1 {
            Ok(script.pop_front().expect("non-empty script"))
        } else {
            script
                .front()
                .cloned()
                .ok_or_else(|| anyhow!("pods \"{}\" not found", name))
        }
    }

    async fn watch_pods(&self, namespace: &str) -> Result<EventStream> {
        let rx = self
            .watches
            .lock()
            .remove(namespace)
            .ok_or_else(|| anyhow!("pods is forbidden: cannot watch namespace {}", namespace))?;

        Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|e| (e, rx)) }).boxed())
    }

    async fn open_log(&self, pod: &PodRef, tail_lines: i64) -> Result<LineStream> {
        let key = pod.key();
        *self.opens.lock().entry(key.clone()).or_default() += 1;
        self.tails.lock().insert(key.clone(), tail_lines);

        if let Some(message) = self.open_failures.lock().get(&key) {
            return Err(anyhow!("{}", message));
        }

        let script = self.logs.lock().get(&key).cloned().unwrap_or(LogScript {
            lines: Vec::new(),
            end: LogEnd::Follow,
        });

        let lines = stream::iter(script.lines.into_iter().map(Ok::<String, anyhow::Error>));
        let stream: LineStream = match script.end {
            LogEnd::Follow => lines.chain(stream::pending()).boxed(),
            LogEnd::Eof => lines.boxed(),
            LogEnd::Fail(message) => lines
                .chain(stream::once(async move { Err(anyhow!("{}", message)) }))
                .boxed(),
        };
        Ok(stream)
    }
}

/// Console stand-in shared between the streamer and the test
#[derive(Clone, Default)]
pub struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock())
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A streamer running on a background task
pub struct Running {
    pub streamer: Arc<LogStreamer<FakeCluster>>,
    pub output: SharedOutput,
    handle: JoinHandle<Result<(), StreamError>>,
}

impl Running {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn is_claimed(&self, pod: &PodRef) -> bool {
        self.streamer.registry().is_claimed(&pod.key())
    }

    /// Cancel the run and wait for it to return
    pub async fn stop(self) -> Vec<String> {
        self.streamer.cancellation().cancel();
        self.join().await
    }

    /// Wait for the run to return on its own
    pub async fn join(self) -> Vec<String> {
        self.handle
            .await
            .expect("streamer task panicked")
            .expect("streamer failed");
        self.output.lines()
    }
}

pub fn start(
    cluster: Arc<FakeCluster>,
    config: StreamConfig,
    initial: Vec<PodRef>,
    namespaces: &[&str],
) -> Running {
    let streamer = Arc::new(LogStreamer::new(cluster, config));
    let output = SharedOutput::default();
    let namespaces: Vec<String> = namespaces.iter().map(|ns| ns.to_string()).collect();

    let handle = {
        let streamer = Arc::clone(&streamer);
        let output = output.clone();
        tokio::spawn(async move { streamer.run(initial, &namespaces, output).await })
    };

    Running {
        streamer,
        output,
        handle,
    }
}

/// Test defaults: 10s polls, 30 attempts, 5s shutdown grace
pub fn config() -> StreamConfig {
    StreamConfig::default()
}

pub fn pod(namespace: &str, name: &str) -> PodRef {
    PodRef::new(namespace, name, "app")
}

pub fn pending(pod: &PodRef) -> PodInfo {
    PodInfo::new(pod.namespace.clone(), pod.name.clone())
        .with_phase(PodPhase::Pending)
        .with_container(ContainerInfo::new(pod.container.clone()))
}

pub fn ready(pod: &PodRef) -> PodInfo {
    PodInfo::new(pod.namespace.clone(), pod.name.clone())
        .with_phase(PodPhase::Running)
        .with_container(ContainerInfo::new(pod.container.clone()).ready())
}

pub fn with_phase(pod: &PodRef, phase: PodPhase) -> PodInfo {
    PodInfo::new(pod.namespace.clone(), pod.name.clone())
        .with_phase(phase)
        .with_container(ContainerInfo::new(pod.container.clone()))
}

/// Poll `check` until it holds, failing after ten virtual minutes
pub async fn eventually(what: &str, check: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(600);
    while !check() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for: {}", what);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
