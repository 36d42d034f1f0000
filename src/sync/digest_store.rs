// Per-node digests: node_id -> section key -> fingerprint. A cache, not a source of truth;
// any key-value backend that gives per-key last-write-wins can implement DigestStore.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use super::Fingerprint;

pub type SectionDigest = HashMap<String, Fingerprint>;

pub trait DigestStore: Send + Sync {
    /// Stored fingerprints for `node_id`; empty when the node was never served.
    fn load(&self, node_id: &str) -> SectionDigest;

    /// Overwrites the given sections' fingerprints. Sections not in `fresh` are untouched.
    fn merge(&self, node_id: &str, fresh: SectionDigest);
}

impl<S: DigestStore + ?Sized> DigestStore for Arc<S> {
    fn load(&self, node_id: &str) -> SectionDigest {
        (**self).load(node_id)
    }

    fn merge(&self, node_id: &str, fresh: SectionDigest) {
        (**self).merge(node_id, fresh)
    }
}

/// In-process store. Each node's entry is locked independently, so pollers of different
/// nodes never contend.
#[derive(Debug, Default)]
pub struct MemoryDigestStore {
    nodes: DashMap<String, SectionDigest>,
}

impl MemoryDigestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl DigestStore for MemoryDigestStore {
    fn load(&self, node_id: &str) -> SectionDigest {
        self.nodes
            .get(node_id)
            .map(|d| d.value().clone())
            .unwrap_or_default()
    }

    fn merge(&self, node_id: &str, fresh: SectionDigest) {
        if fresh.is_empty() {
            return;
        }
        self.nodes
            .entry(node_id.to_owned())
            .or_default()
            .extend(fresh);
    }
}
