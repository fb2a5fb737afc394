use crate::model::{Node, NodeInfos, Role, Slot};
use log::warn;

/// Parses the `TOPOLOGY` text dump returned by a node into a structured
/// per-node view (spec §4.2).
///
/// Total: never fails on well-formed input; malformed individual lines are
/// skipped with a warning.
pub fn decode(raw: &str, origin_addr: &str) -> NodeInfos {
    let mut self_node: Option<Node> = None;
    let mut friends = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Some((node, is_self)) => {
                if is_self {
                    self_node = Some(node);
                } else {
                    friends.push(node);
                }
            }
            None => warn!("{origin_addr}: skipping malformed topology line: {line}"),
        }
    }

    let self_node = self_node.unwrap_or_else(|| {
        warn!("{origin_addr}: topology dump had no `myself` line, synthesizing an empty one");
        Node::new(String::new(), String::new(), 0)
    });

    NodeInfos { self_node, friends }
}

fn parse_line(line: &str) -> Option<(Node, bool)> {
    let mut fields = line.split(' ').filter(|f| !f.is_empty());

    let id = fields.next()?;
    let addr_field = fields.next()?;
    let flags_field = fields.next()?;
    let master_id = fields.next()?;
    let _ping_sent = fields.next()?;
    let _pong_recv = fields.next()?;
    let epoch: u64 = fields.next()?.parse().ok()?;
    let _link_status = fields.next()?;

    let (ip, port) = parse_addr(addr_field)?;

    let flags: Vec<&str> = flags_field.split(',').collect();
    let is_self = flags.iter().any(|f| *f == "myself");
    let role = if flags.iter().any(|f| *f == "master") {
        Role::Master
    } else if flags.iter().any(|f| *f == "slave") {
        Role::Replica
    } else {
        Role::Unknown
    };

    let mut node = Node::new(id, ip, port);
    node.role = role;
    node.config_epoch = epoch;
    if master_id != "-" {
        node.master_ref = Some(master_id.to_owned());
    }

    for spec in fields {
        if let Some(range) = parse_slot_spec(spec) {
            node.slots.extend(range);
        }
        // migration markers ([N-><-id] / [N-<-id]) are parsed but
        // intentionally contribute nothing to the owned-slots set.
    }

    Some((node, is_self))
}

/// `ip:port[@cport]` -> `(ip, port)`. Returns `None` if the address cannot
/// be parsed, in which case the caller skips the line.
fn parse_addr(field: &str) -> Option<(String, u16)> {
    let addr = field.split('@').next()?;
    let (ip, port) = addr.rsplit_once(':')?;
    if ip.is_empty() {
        return None;
    }
    let port: u16 = port.parse().ok()?;
    Some((ip.to_owned(), port))
}

/// A `slot-spec` is a single integer, an inclusive range, or a migration
/// marker (spec §4.2/§6). Migration markers parse to `None` (no owned
/// slots); a bare integer or range expands to the owned-slots set.
fn parse_slot_spec(spec: &str) -> Option<Vec<Slot>> {
    if spec.starts_with('[') {
        return None;
    }
    if let Some((start, end)) = spec.split_once('-') {
        let start: u16 = start.parse().ok()?;
        let end: u16 = end.parse().ok()?;
        Some((start..=end).map(Slot).collect())
    } else {
        let slot: u16 = spec.parse().ok()?;
        Some(vec![Slot(slot)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "\
07c37dfeb235213a872192d90877d0cd55635b91 127.0.0.1:30004@31004 slave e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca 0 1426238317239 4 connected
67ed2db8d677e59ec4a4cefb06858cf2a1a89fa1 127.0.0.1:30002@31002 master - 0 1426238316232 2 connected 5461-10922
292f8b365bb7edb5e285caf0b7e6ddc7265d2f4f 127.0.0.1:30003@31003 myself,master - 0 0 1 connected 0-5460
e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca 127.0.0.1:30001@31001 master - 0 1426238316232 1 connected 10923-16383
";

    #[test]
    fn splits_myself_from_friends() {
        let infos = decode(DUMP, "127.0.0.1:30000");
        assert_eq!(infos.self_node.id, "292f8b365bb7edb5e285caf0b7e6ddc7265d2f4f");
        assert!(infos.self_node.is_master());
        assert_eq!(infos.friends.len(), 3);
    }

    #[test]
    fn expands_slot_ranges() {
        let infos = decode(DUMP, "127.0.0.1:30000");
        let master_two = infos
            .friends
            .iter()
            .find(|n| n.id == "67ed2db8d677e59ec4a4cefb06858cf2a1a89fa1")
            .unwrap();
        assert_eq!(master_two.slots.len(), 5462);
        assert!(master_two.slots.contains(&Slot(5461)));
        assert!(master_two.slots.contains(&Slot(10922)));
    }

    #[test]
    fn parses_migration_markers_without_owning_slots() {
        let dump = "id1 127.0.0.1:7000@17000 myself,master - 0 0 1 connected 0-100 [200-><-id2] [300-<-id2]";
        let infos = decode(dump, "127.0.0.1:7000");
        assert_eq!(infos.self_node.slots.len(), 101);
    }

    #[test]
    fn skips_malformed_lines() {
        let dump = "badline\nid1 127.0.0.1:7000@17000 myself,master - 0 0 1 connected 0-10\n";
        let infos = decode(dump, "127.0.0.1:7000");
        assert_eq!(infos.self_node.id, "id1");
    }

    #[test]
    fn replica_master_ref() {
        let infos = decode(DUMP, "127.0.0.1:30000");
        let replica = &infos.friends[0];
        assert_eq!(
            replica.master_ref.as_deref(),
            Some("e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca")
        );
        assert!(replica.is_replica());
    }

    /// A reference encoder, inverse of `decode`, used only by the round-trip
    /// property test below (spec §8 property 3). Not part of the crate's
    /// public surface: spec §4.2 only contracts `Decode`.
    fn encode_line(node: &Node, is_self: bool) -> String {
        let mut flags = Vec::new();
        if is_self {
            flags.push("myself".to_owned());
        }
        match node.role {
            Role::Master => flags.push("master".to_owned()),
            Role::Replica => flags.push("slave".to_owned()),
            Role::Unknown => flags.push("handshake".to_owned()),
        }

        let mut fields = vec![
            node.id.clone(),
            format!("{}@{}", node.ip_port(), node.port as u32 + 10000),
            flags.join(","),
            node.master_ref.clone().unwrap_or_else(|| "-".to_owned()),
            "0".to_owned(),
            "0".to_owned(),
            node.config_epoch.to_string(),
            "connected".to_owned(),
        ];
        fields.extend(node.slots.iter().map(|s| s.0.to_string()));
        fields.join(" ")
    }

    fn encode(info: &NodeInfos) -> String {
        let mut lines = vec![encode_line(&info.self_node, true)];
        lines.extend(info.friends.iter().map(|n| encode_line(n, false)));
        lines.join("\n")
    }

    proptest::proptest! {
        // Round-trip: Decode(Encode(x)) == x up to friends ordering (spec §8
        // property 3).
        #[test]
        fn round_trip_preserves_self_and_friends(
            self_is_master in proptest::bool::ANY,
            self_epoch in 0u64..10_000,
            self_slots in proptest::collection::btree_set(0u16..=200, 0..15),
            friends in proptest::collection::vec((proptest::bool::ANY, 0u64..10_000), 0..4),
        ) {
            let mut self_node = Node::new("self-id", "10.0.0.1", 7000);
            self_node.config_epoch = self_epoch;
            if self_is_master {
                self_node.role = Role::Master;
                self_node.slots = self_slots.into_iter().map(Slot).collect();
            } else {
                self_node.role = Role::Replica;
                self_node.master_ref = Some("some-master-id".to_owned());
            }

            let friend_nodes: Vec<Node> = friends
                .iter()
                .enumerate()
                .map(|(i, (is_master, epoch))| {
                    let mut n = Node::new(format!("friend-{i}"), "10.0.0.2", 7001 + i as u16);
                    n.config_epoch = *epoch;
                    if *is_master {
                        n.role = Role::Master;
                        n.slots = std::iter::once(Slot(1000 + i as u16)).collect();
                    } else {
                        n.role = Role::Replica;
                        n.master_ref = Some("self-id".to_owned());
                    }
                    n
                })
                .collect();

            let original = NodeInfos {
                self_node: self_node.clone(),
                friends: friend_nodes.clone(),
            };
            let dump = encode(&original);
            let decoded = decode(&dump, "origin");

            prop_assert_eq!(decoded.self_node, self_node);

            let mut expected = friend_nodes;
            expected.sort_by(|a, b| a.id.cmp(&b.id));
            let mut actual = decoded.friends;
            actual.sort_by(|a, b| a.id.cmp(&b.id));
            prop_assert_eq!(actual, expected);
        }
    }
}
