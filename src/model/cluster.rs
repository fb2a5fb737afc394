use crate::model::cluster_infos::ClusterInfos;
use crate::model::node::Node;
use std::collections::HashMap;

/// The canonical deduplicated view (spec §3): `node-id -> Node`, owning
/// copies of its nodes exclusively.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub name: String,
    pub namespace: String,
    pub nodes: HashMap<String, Node>,
}

impl Cluster {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Cluster {
            name: name.into(),
            namespace: namespace.into(),
            nodes: HashMap::new(),
        }
    }

    /// Builds the canonical view from an aggregated [`ClusterInfos`], taking
    /// each unique node-id and keeping the copy with the most recent
    /// `configEpoch` on collision (spec §3 "Cluster").
    pub fn from_infos(name: impl Into<String>, namespace: impl Into<String>, infos: &ClusterInfos) -> Self {
        let mut cluster = Cluster::new(name, namespace);
        for node in infos.get_nodes() {
            cluster
                .nodes
                .entry(node.id.clone())
                .and_modify(|existing| {
                    if node.config_epoch > existing.config_epoch {
                        *existing = node.clone();
                    }
                })
                .or_insert(node);
        }
        cluster
    }

    pub fn master_count(&self) -> usize {
        self.nodes.values().filter(|n| n.is_master()).count()
    }

    /// Replication factor (number of replicas) per master id.
    pub fn replication_factors(&self) -> HashMap<String, usize> {
        let mut counts: HashMap<String, usize> = self
            .nodes
            .values()
            .filter(|n| n.is_master())
            .map(|n| (n.id.clone(), 0usize))
            .collect();
        for node in self.nodes.values() {
            if let Some(master_id) = &node.master_ref {
                *counts.entry(master_id.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}
