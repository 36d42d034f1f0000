// Change detection for poll responses.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use super::{DigestStore, SectionDigest, fingerprint};

/// False when the caller's `since` is newer than the data's last update, i.e. nothing
/// could have changed since the caller last looked.
pub fn has_news(since_ms: Option<i64>, last_update_ms: i64) -> bool {
    match since_ms {
        Some(since) => last_update_ms >= since,
        None => true,
    }
}

pub struct ChangeDetector<S> {
    store: S,
}

impl<S: DigestStore> ChangeDetector<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the sections whose fingerprint differs from the stored one (or has none),
    /// then records every fingerprinted section as served. A section that fails to
    /// serialize is logged and left out of both the result and the digest.
    pub fn diff<V: Serialize>(
        &self,
        node_id: &str,
        response: BTreeMap<String, V>,
    ) -> BTreeMap<String, V> {
        let stored = self.store.load(node_id);
        let mut fresh = SectionDigest::with_capacity(response.len());
        let mut changed = BTreeMap::new();

        for (key, value) in response {
            let fp = match fingerprint(&value) {
                Ok(fp) => fp,
                Err(e) => {
                    warn!(node_id, section = %key, error = %e, "fingerprint failed; section skipped");
                    continue;
                }
            };
            if stored.get(&key) != Some(&fp) {
                changed.insert(key.clone(), value);
            }
            fresh.insert(key, fp);
        }

        self.store.merge(node_id, fresh);
        changed
    }

    /// Returns every section that fingerprints and records all of them as served. Used for
    /// a client's first poll, which always gets the full response.
    pub fn record_all<V: Serialize>(
        &self,
        node_id: &str,
        response: BTreeMap<String, V>,
    ) -> BTreeMap<String, V> {
        let mut fresh = SectionDigest::with_capacity(response.len());
        let mut served = BTreeMap::new();
        for (key, value) in response {
            match fingerprint(&value) {
                Ok(fp) => {
                    fresh.insert(key.clone(), fp);
                    served.insert(key, value);
                }
                Err(e) => {
                    warn!(node_id, section = %key, error = %e, "fingerprint failed; section skipped");
                }
            }
        }
        self.store.merge(node_id, fresh);
        served
    }

    /// `diff` guarded by `has_news`: a stale `since` returns nothing and leaves the digest alone.
    pub fn diff_since<V: Serialize>(
        &self,
        node_id: &str,
        since_ms: Option<i64>,
        last_update_ms: i64,
        response: BTreeMap<String, V>,
    ) -> BTreeMap<String, V> {
        if !has_news(since_ms, last_update_ms) {
            return BTreeMap::new();
        }
        self.diff(node_id, response)
    }
}
