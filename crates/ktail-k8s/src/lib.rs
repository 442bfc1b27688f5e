//! Kubernetes client for ktail
//!
//! This crate provides the cluster boundary used by the streaming engine:
//! listing and fetching pods, watching pod membership, and opening
//! follow-mode log reads.

mod api;
mod client;

pub use api::{ClusterApi, EventStream, LineStream};
pub use client::KubeClient;

// Re-export types that are used in our public API
pub use ktail_types::{ContainerInfo, MembershipEvent, PodInfo, PodKey, PodPhase, PodRef};
