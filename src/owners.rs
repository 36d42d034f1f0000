// Node -> owner lookup. Each cycle reads an immutable snapshot; a separate task reloads
// the table and publishes a fresh snapshot over a watch channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::stats_repo::StatsRepo;

/// Read-only node_id -> user_id mapping.
#[derive(Debug, Clone, Default)]
pub struct NodeOwners {
    by_node: HashMap<String, String>,
}

impl NodeOwners {
    pub fn new(by_node: HashMap<String, String>) -> Self {
        Self { by_node }
    }

    pub fn user_of(&self, node_id: &str) -> Option<&str> {
        self.by_node.get(node_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}

impl FromIterator<(String, String)> for NodeOwners {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            by_node: iter.into_iter().collect(),
        }
    }
}

/// Receiving side handed to the rollup worker.
pub type OwnerLookup = watch::Receiver<Arc<NodeOwners>>;

pub fn channel(initial: NodeOwners) -> (watch::Sender<Arc<NodeOwners>>, OwnerLookup) {
    watch::channel(Arc::new(initial))
}

/// Reloads the owner table once and publishes it. Returns the number of mappings.
pub async fn refresh_once(
    repo: &StatsRepo,
    tx: &watch::Sender<Arc<NodeOwners>>,
) -> anyhow::Result<usize> {
    let owners = repo.load_owners().await?;
    let n = owners.len();
    tx.send_replace(Arc::new(owners));
    Ok(n)
}

/// Spawns the out-of-band refresher. Exits when every receiver is dropped.
pub fn spawn_refresher(
    repo: Arc<StatsRepo>,
    interval_secs: u64,
    tx: watch::Sender<Arc<NodeOwners>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            if tx.is_closed() {
                debug!("owner refresher shutting down");
                break;
            }
            match refresh_once(&repo, &tx).await {
                Ok(n) => debug!(owners = n, "owner table refreshed"),
                Err(e) => warn!(error = %e, operation = "load_owners", "owner refresh failed"),
            }
        }
    })
}
