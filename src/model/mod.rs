//! Cluster View Model (spec §3, §4.3): Node, Slot, Cluster, ClusterInfos.

mod cluster;
mod cluster_infos;
mod node;

pub use cluster::Cluster;
pub use cluster_infos::{ClusterInfos, ClusterStatus, NodeInfos};
pub use node::{Node, Role, Slot, SlotRange, MAX_SLOT, SLOT_COUNT};
