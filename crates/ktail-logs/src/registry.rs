use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use ktail_types::PodKey;

/// Set of pods that currently have a log stream
///
/// A key is present while exactly one worker is responsible for that pod.
/// Claims are only removed by [`release`](Self::release), which the watcher
/// calls when the pod is deleted; a worker whose stream ends keeps its claim.
#[derive(Clone, Debug, Default)]
pub struct StreamRegistry {
    claimed: Arc<Mutex<HashSet<PodKey>>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim a pod; returns false if it was already claimed
    pub fn try_claim(&self, key: PodKey) -> bool {
        self.claimed.lock().insert(key)
    }

    /// Drop a claim; returns whether the key was present
    pub fn release(&self, key: &PodKey) -> bool {
        self.claimed.lock().remove(key)
    }

    pub fn is_claimed(&self, key: &PodKey) -> bool {
        self.claimed.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.claimed.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.lock().is_empty()
    }

    /// Claimed keys in sorted order
    pub fn snapshot(&self) -> Vec<PodKey> {
        let mut keys: Vec<_> = self.claimed.lock().iter().cloned().collect();
        keys.sort();
        keys
    }
}
