//! Reconciliation Predicate (spec §4.6): a pure function deciding whether
//! the live cluster diverges from the desired shape. No I/O.

/// The desired-state document's sharding parameters (spec §1: "master
/// count" and "replicas per master").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesiredState {
    pub master_count: usize,
    pub replicas_per_master: usize,
}

/// The live cluster's observed shape, derived from a [`crate::model::Cluster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveStatus {
    pub number_of_masters: usize,
    pub min_replication_factor: usize,
    pub max_replication_factor: usize,
}

impl LiveStatus {
    pub fn from_cluster(cluster: &crate::model::Cluster) -> Self {
        let number_of_masters = cluster.master_count();
        let factors = cluster.replication_factors();
        let min = factors.values().copied().min().unwrap_or(0);
        let max = factors.values().copied().max().unwrap_or(0);
        LiveStatus {
            number_of_masters,
            min_replication_factor: min,
            max_replication_factor: max,
        }
    }
}

/// `NeedsOperation(liveStatus, desired) -> bool` (spec §4.6).
pub fn needs_operation(live: &LiveStatus, desired: &DesiredState) -> bool {
    live.number_of_masters != desired.master_count
        || live.min_replication_factor != desired.replicas_per_master
        || live.max_replication_factor != desired.replicas_per_master
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_desired_shape_needs_nothing() {
        let live = LiveStatus {
            number_of_masters: 3,
            min_replication_factor: 1,
            max_replication_factor: 1,
        };
        let desired = DesiredState {
            master_count: 3,
            replicas_per_master: 1,
        };
        assert!(!needs_operation(&live, &desired));
    }

    #[test]
    fn master_count_mismatch_needs_operation() {
        let live = LiveStatus {
            number_of_masters: 2,
            min_replication_factor: 1,
            max_replication_factor: 1,
        };
        let desired = DesiredState {
            master_count: 3,
            replicas_per_master: 1,
        };
        assert!(needs_operation(&live, &desired));
    }

    #[test]
    fn uneven_replication_factor_needs_operation() {
        let live = LiveStatus {
            number_of_masters: 3,
            min_replication_factor: 0,
            max_replication_factor: 1,
        };
        let desired = DesiredState {
            master_count: 3,
            replicas_per_master: 1,
        };
        assert!(needs_operation(&live, &desired));
    }
}
