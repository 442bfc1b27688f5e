//! Shared types for ktail
//!
//! This crate contains the value types passed between the Kubernetes client,
//! the streaming engine, and the command line front end.

use std::fmt;
use std::sync::Arc;

// ============================================================================
// Pod Identity
// ============================================================================

/// Identity of a pod: `(namespace, name)`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PodKey {
    pub namespace: String,
    pub name: String,
}

impl PodKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A pod selected for streaming, with its container already resolved
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
    pub container: String,
}

impl PodRef {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            container: container.into(),
        }
    }

    /// Registry key for this pod (the container is not part of the identity)
    pub fn key(&self) -> PodKey {
        PodKey::new(self.namespace.clone(), self.name.clone())
    }

    /// Synthetic first line emitted before a pod's log output
    pub fn header(&self) -> String {
        format!(
            "=== Starting logs for {}/{} (container: {}) ===",
            self.namespace, self.name, self.container
        )
    }
}

impl fmt::Display for PodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// ============================================================================
// Pod Status
// ============================================================================

/// Runtime phase of a pod
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl PodPhase {
    /// Terminal phases never become ready again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }
}

impl From<&str> for PodPhase {
    fn from(s: &str) -> Self {
        match s {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerInfo {
    pub name: String,
    pub ready: bool,
    pub restart_count: i32,
}

impl ContainerInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ready: false,
            restart_count: 0,
        }
    }

    pub fn ready(mut self) -> Self {
        self.ready = true;
        self
    }
}

/// Point-in-time view of a pod's status
///
/// `containers` follows the declaration order of the pod spec, so the first
/// entry is the pod's default container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub phase: PodPhase,
    pub containers: Vec<ContainerInfo>,
    pub node_name: Option<String>,
}

impl PodInfo {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            phase: PodPhase::Unknown,
            containers: Vec::new(),
            node_name: None,
        }
    }

    pub fn with_phase(mut self, phase: PodPhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_container(mut self, container: ContainerInfo) -> Self {
        self.containers.push(container);
        self
    }

    pub fn key(&self) -> PodKey {
        PodKey::new(self.namespace.clone(), self.name.clone())
    }

    /// Name of the first declared container
    pub fn first_container(&self) -> Option<&str> {
        self.containers.first().map(|c| c.name.as_str())
    }

    /// Whether the pod is running and `container` reports ready
    pub fn is_ready_for(&self, container: &str) -> bool {
        self.phase == PodPhase::Running
            && self
                .containers
                .iter()
                .any(|c| c.name == container && c.ready)
    }

    /// Resolve a streamable reference, defaulting to the first container
    pub fn to_pod_ref(&self, container: Option<&str>) -> Option<PodRef> {
        let container = container.or_else(|| self.first_container())?;
        Some(PodRef::new(
            self.namespace.clone(),
            self.name.clone(),
            container,
        ))
    }
}

// ============================================================================
// Streaming Types
// ============================================================================

/// One line of output from a pod, on its way to the aggregator
#[derive(Clone, Debug)]
pub struct LogLine {
    pub pod: Arc<PodRef>,
    pub text: String,
}

impl LogLine {
    pub fn new(pod: Arc<PodRef>, text: impl Into<String>) -> Self {
        Self {
            pod,
            text: text.into(),
        }
    }

    /// The header line that opens a pod's stream
    pub fn header(pod: Arc<PodRef>) -> Self {
        let text = pod.header();
        Self { pod, text }
    }

    /// Console form: `[namespace/name] text`
    pub fn render(&self) -> String {
        format!("[{}/{}] {}", self.pod.namespace, self.pod.name, self.text)
    }
}

/// Pod lifecycle change observed by a namespace watch
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipEvent {
    /// A pod appeared; readiness is not yet known
    Added(PodRef),
    /// A pod's status changed
    Modified(PodRef, PodInfo),
    /// A pod was deleted
    Removed(PodKey),
}

impl MembershipEvent {
    pub fn key(&self) -> PodKey {
        match self {
            Self::Added(pod) | Self::Modified(pod, _) => pod.key(),
            Self::Removed(key) => key.clone(),
        }
    }
}
