use crate::model::node::Node;
use std::collections::{HashMap, HashSet};

/// Per-node view as seen by one node (spec §3).
#[derive(Debug, Clone)]
pub struct NodeInfos {
    pub self_node: Node,
    pub friends: Vec<Node>,
}

impl NodeInfos {
    /// All nodes this view knows about, `self` first.
    pub fn all(&self) -> impl Iterator<Item = &Node> {
        std::iter::once(&self.self_node).chain(self.friends.iter())
    }
}

/// `Consistent`/`Inconsistent`/`Partial`/`Unset` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterStatus {
    Unset,
    Consistent,
    Inconsistent,
    Partial,
}

/// Aggregation of per-node views, keyed by `ipPort` (spec §3).
#[derive(Debug, Clone, Default)]
pub struct ClusterInfos {
    pub infos: HashMap<String, NodeInfos>,
    /// Errors recorded while probing individual addresses; a non-empty map
    /// forces `status = Partial` (spec §4.3 `ComputeStatus` step 1).
    pub errors: HashMap<String, String>,
    pub status: Option<ClusterStatus>,
}

impl ClusterInfos {
    pub fn new() -> Self {
        ClusterInfos {
            infos: HashMap::new(),
            errors: HashMap::new(),
            status: None,
        }
    }

    /// `ComputeStatus(ClusterInfos) -> bool` (spec §4.3).
    pub fn compute_status(&mut self) -> bool {
        if !self.errors.is_empty() {
            self.status = Some(ClusterStatus::Partial);
            return false;
        }

        let mut views: Vec<HashSet<(String, u64)>> = Vec::with_capacity(self.infos.len());
        for info in self.infos.values() {
            let view: HashSet<(String, u64)> = info
                .all()
                .map(|n| (n.id.clone(), n.config_epoch))
                .collect();
            views.push(view);
        }

        let consistent = match views.split_first() {
            None => true,
            Some((first, rest)) => rest.iter().all(|v| v == first),
        };

        self.status = Some(if consistent {
            ClusterStatus::Consistent
        } else {
            ClusterStatus::Inconsistent
        });
        consistent
    }

    /// `GetNodes(ClusterInfos) -> list<Node>` (spec §4.3): union of all
    /// `self` records plus any `friends` not seen as anyone's `self`,
    /// deduplicated by id (highest `configEpoch` wins, ties broken by the
    /// copy whose origin equals the node's own address).
    pub fn get_nodes(&self) -> Vec<Node> {
        let self_addrs: HashSet<&str> = self.infos.keys().map(String::as_str).collect();

        // (node, is_self_record, origin_addr)
        let mut by_id: HashMap<String, (Node, bool, String)> = HashMap::new();

        for (origin, info) in &self.infos {
            for node in info.all() {
                let is_self_record = node.id == info.self_node.id;
                // a friend entry whose id matches another view's self is
                // skipped here; it will be picked up from that view's self.
                if !is_self_record && self_addrs.contains(node.ip_port().as_str()) {
                    continue;
                }
                by_id
                    .entry(node.id.clone())
                    .and_modify(|(existing, existing_is_self, existing_origin)| {
                        let better = node.config_epoch > existing.config_epoch
                            || (node.config_epoch == existing.config_epoch
                                && !*existing_is_self
                                && origin == &node.ip_port());
                        if better {
                            *existing = node.clone();
                            *existing_is_self = is_self_record;
                            *existing_origin = origin.clone();
                        }
                    })
                    .or_insert_with(|| (node.clone(), is_self_record, origin.clone()));
            }
        }

        by_id.into_values().map(|(node, _, _)| node).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, epoch: u64) -> Node {
        let mut n = Node::new(id, "10.0.0.1", 7000);
        n.config_epoch = epoch;
        n
    }

    /// Three nodes in a full gossip mesh, each reporting the same global
    /// `(id, epoch)` set via `self ∪ friends` — a consistent cluster.
    fn consistent_mesh() -> Vec<(String, NodeInfos)> {
        let n1 = node("id1", 1);
        let n2 = node("id2", 2);
        let n3 = node("id3", 3);
        vec![
            (
                "a:1".to_owned(),
                NodeInfos {
                    self_node: n1.clone(),
                    friends: vec![n2.clone(), n3.clone()],
                },
            ),
            (
                "b:2".to_owned(),
                NodeInfos {
                    self_node: n2.clone(),
                    friends: vec![n1.clone(), n3.clone()],
                },
            ),
            (
                "c:3".to_owned(),
                NodeInfos {
                    self_node: n3,
                    friends: vec![n1, n2],
                },
            ),
        ]
    }

    fn infos_from(entries: impl IntoIterator<Item = (String, NodeInfos)>) -> ClusterInfos {
        let mut infos = ClusterInfos::new();
        for (addr, info) in entries {
            infos.infos.insert(addr, info);
        }
        infos
    }

    // Property 4 (spec §8): ComputeStatus is commutative in the order of
    // per-node views processed.
    #[test]
    fn compute_status_is_order_independent_when_consistent() {
        let entries = consistent_mesh();
        let mut forward = infos_from(entries.clone());
        let mut reversed = infos_from(entries.into_iter().rev());

        assert!(forward.compute_status());
        assert!(reversed.compute_status());
        assert_eq!(forward.status, reversed.status);
        assert_eq!(forward.status, Some(ClusterStatus::Consistent));
    }

    #[test]
    fn compute_status_is_order_independent_when_inconsistent() {
        let mut entries = consistent_mesh();
        // Desync one view's epoch for id1 so the multisets no longer match.
        entries[1].1.self_node.config_epoch = 99;

        let mut forward = infos_from(entries.clone());
        let mut reversed = infos_from(entries.into_iter().rev());

        assert!(!forward.compute_status());
        assert!(!reversed.compute_status());
        assert_eq!(forward.status, reversed.status);
        assert_eq!(forward.status, Some(ClusterStatus::Inconsistent));
    }

    #[test]
    fn any_recorded_error_forces_partial_status() {
        let mut infos = infos_from(consistent_mesh());
        infos.errors.insert("d:4".to_owned(), "connection refused".to_owned());

        assert!(!infos.compute_status());
        assert_eq!(infos.status, Some(ClusterStatus::Partial));
    }

    #[test]
    fn get_nodes_dedupes_by_highest_config_epoch() {
        let stale = node("id1", 1);
        let fresh = node("id1", 5);

        let infos = infos_from([
            (
                "a:1".to_owned(),
                NodeInfos {
                    self_node: stale,
                    friends: vec![],
                },
            ),
            (
                "b:2".to_owned(),
                NodeInfos {
                    self_node: node("id2", 1),
                    friends: vec![fresh],
                },
            ),
        ]);

        let nodes = infos.get_nodes();
        let id1 = nodes.iter().find(|n| n.id == "id1").unwrap();
        assert_eq!(id1.config_epoch, 5);
    }
}
