use crate::client::{cmd, validate, validate_pipe_resp, Options, Pool, RawClient};
use crate::model::{ClusterInfos, Node, Role, Slot};
use crate::topology;
use crate::{Error, Result};
use futures_util::future::join_all;
use std::collections::HashMap;

/// Subcommand for `SetSlot`/`SetSlots` (spec §4.4), grounded on the
/// teacher's `ClusterSetSlotSubCommand` (`src/commands/cluster_commands.rs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetSlotAction {
    Importing,
    Migrating,
    Stable,
    Node,
}

impl SetSlotAction {
    fn as_wire(&self) -> &'static str {
        match self {
            SetSlotAction::Importing => "IMPORTING",
            SetSlotAction::Migrating => "MIGRATING",
            SetSlotAction::Stable => "STABLE",
            SetSlotAction::Node => "NODE",
        }
    }
}

/// Mode for `FlushAndReset` (spec §4.4), grounded on the teacher's
/// `ClusterResetType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    Hard,
    Soft,
}

impl ResetMode {
    fn as_wire(&self) -> &'static str {
        match self {
            ResetMode::Hard => "HARD",
            ResetMode::Soft => "SOFT",
        }
    }
}

/// All mutating control-plane primitives (spec §4.4), operating over an
/// explicit target address and the shared connection [`Pool`].
pub struct Admin {
    pool: Pool,
}

impl Admin {
    pub fn new(options: Options) -> Self {
        Admin {
            pool: Pool::new(options),
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Ensures the pool holds a connection to `addr`.
    pub async fn add(&self, addr: &str) -> Result<()> {
        self.pool.add(addr).await
    }

    /// Delegates to `Pool::Reset` (spec §4.4 `Close`).
    pub async fn close(&self) {
        self.pool.reset().await;
    }

    /// Concurrently probes every pool entry's topology and consolidates the
    /// result (spec §4.4 `GetClusterInfos`).
    pub async fn get_cluster_infos(&self) -> (ClusterInfos, Result<()>) {
        let entries = self.pool.get_all().await;
        let mut infos = ClusterInfos::new();

        let probes = entries.iter().map(|(addr, client)| {
            let addr = addr.clone();
            let client = client.clone();
            async move {
                let result = client.cmd(cmd("TOPOLOGY")).await.and_then(|resp| {
                    validate(&resp, &addr, "TOPOLOGY")?;
                    resp.str()
                });
                (addr, result)
            }
        });

        for (addr, result) in join_all(probes).await {
            match result {
                Ok(raw) => {
                    let node_infos = topology::decode(&raw, &addr);
                    if node_infos.self_node.ip_port() == addr {
                        infos.infos.insert(addr, node_infos);
                    } else {
                        log::warn!("bad node info retrieved from {addr}");
                    }
                }
                Err(e) => {
                    infos.errors.insert(addr, e.to_string());
                }
            }
        }

        let consistent = infos.compute_status();
        if !infos.errors.is_empty() {
            let err = Error::Aggregate {
                partial: true,
                per_address: infos.errors.clone(),
            };
            return (infos, Err(err));
        }
        if !consistent {
            return (infos, Err(Error::Inconsistent));
        }
        (infos, Ok(()))
    }

    /// Every pool entry reports exactly one known node (itself) and zero
    /// keys (spec §4.4 `NodeIsEmpty`).
    pub async fn node_is_empty(&self) -> Result<bool> {
        let entries = self.pool.get_all().await;
        for (addr, client) in entries.iter() {
            let resp = client.cmd(cmd("CLUSTER-INFO")).await?;
            let body = resp.str()?;
            let known = extract_int_after(&body, "cluster_known_nodes:").ok_or_else(|| {
                Error::Protocol {
                    addr: addr.clone(),
                    cause: "missing cluster_known_nodes in CLUSTER-INFO reply".to_owned(),
                }
            })?;
            let keys = extract_int_after(&body, "keys=").unwrap_or(0);
            if known != 1 || keys != 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Assigns epoch 1, 2, 3, ... to successive pool entries, in address
    /// order (spec §4.4 `SetConfigEpoch`: atomicity across nodes is not
    /// guaranteed, retry is the caller's responsibility on partial failure).
    pub async fn set_config_epoch(&self) -> Result<()> {
        let entries = self.pool.get_all().await;
        let mut addrs: Vec<&String> = entries.keys().collect();
        addrs.sort();
        for (i, addr) in addrs.into_iter().enumerate() {
            let client = &entries[addr];
            let epoch = (i + 1) as u64;
            let resp = client.cmd(cmd("SETCONFIGEPOCH").arg(epoch)).await?;
            validate(&resp, addr, "SETCONFIGEPOCH")?;
        }
        Ok(())
    }

    /// Issues a config-set only for keys whose live value differs from
    /// `desired` (spec §4.4 `SetConfigIfNeed`).
    pub async fn set_config_if_need(&self, desired: &HashMap<String, String>) -> Result<()> {
        let entries = self.pool.get_all().await;
        for (addr, client) in entries.iter() {
            let resp = client.cmd(cmd("CONFIG-GET").arg("*")).await?;
            let live = resp.map()?;
            for (key, value) in desired {
                if live.get(key) != Some(value) {
                    let resp = client
                        .cmd(cmd("CONFIG-SET").arg(key.as_str()).arg(value.as_str()))
                        .await?;
                    validate(&resp, addr, "CONFIG-SET")?;
                }
            }
        }
        Ok(())
    }

    /// Broadcasts a meet to every other pool entry, then adds `addr` to the
    /// pool (spec §4.4 `AttachNodeToCluster`: broadcast, not a single peer,
    /// to accelerate gossip propagation).
    pub async fn attach_node_to_cluster(&self, addr: &str) -> Result<()> {
        let (ip, port) = split_addr(addr)?;
        let entries = self.pool.get_all().await;
        let peers: Vec<_> = entries.iter().filter(|(peer, _)| *peer != addr).collect();
        if peers.is_empty() {
            return Err(Error::Invariant(
                "pool must contain at least one other node to attach to".to_owned(),
            ));
        }
        for (peer_addr, client) in peers {
            let resp = client.cmd(cmd("MEET").arg(ip.as_str()).arg(port)).await?;
            validate(&resp, peer_addr, "MEET")?;
        }
        self.pool.add(addr).await
    }

    /// Issues `REPLICATE master_id` to `replica` and updates it in place
    /// (spec §4.4 `AttachReplicaToMaster`).
    pub async fn attach_replica_to_master(&self, replica: &mut Node, master_id: &str) -> Result<()> {
        let addr = replica.ip_port();
        let client = self.pool.get(&addr).await?;
        let resp = client.cmd(cmd("REPLICATE").arg(master_id)).await?;
        validate(&resp, &addr, "REPLICATE")?;
        replica.master_ref = Some(master_id.to_owned());
        replica.role = Role::Replica;
        Ok(())
    }

    /// Soft-resets `replica` then re-attaches it to the cluster (spec §4.4
    /// `DetachReplica`): a soft reset forgets peers and master linkage while
    /// preserving data, and the re-meet restores gossip membership.
    pub async fn detach_replica(&self, replica: &mut Node) -> Result<()> {
        let addr = replica.ip_port();
        let client = self.pool.get(&addr).await?;
        let resp = client.cmd(cmd("RESET").arg("SOFT")).await?;
        validate(&resp, &addr, "RESET SOFT")?;
        self.attach_node_to_cluster(&addr).await?;
        replica.master_ref = None;
        replica.role = Role::Master;
        Ok(())
    }

    /// Detaches any replica of `id` first, then broadcasts a forget for
    /// `id` to every other node. Best-effort: per-peer failures are logged,
    /// never returned, since the gossip layer eventually converges (spec
    /// §4.4 `ForgetNode`).
    pub async fn forget_node(&self, id: &str) -> Result<()> {
        let (infos, _) = self.get_cluster_infos().await;

        for (addr, info) in infos.infos.iter() {
            if info.self_node.id == id {
                continue;
            }
            if info.self_node.master_ref.as_deref() == Some(id) {
                let mut replica = info.self_node.clone();
                if let Err(e) = self.detach_replica(&mut replica).await {
                    log::warn!("{addr}: failed to detach replica of {id} before forgetting: {e}");
                }
            }
        }

        let entries = self.pool.get_all().await;
        for (addr, client) in entries.iter() {
            if infos
                .infos
                .get(addr)
                .is_some_and(|info| info.self_node.id == id)
            {
                continue;
            }
            if let Err(e) = client.cmd(cmd("FORGET").arg(id)).await {
                log::warn!("{addr}: forget {id} failed: {e}");
            }
        }
        Ok(())
    }

    /// No-op if `slots` is empty; otherwise a single `ADDSLOTS` with the
    /// full slot list (spec §4.4 `AddSlots`).
    pub async fn add_slots(&self, addr: &str, slots: &[Slot]) -> Result<()> {
        if slots.is_empty() {
            return Ok(());
        }
        let client = self.pool.get(addr).await?;
        let args = slots
            .iter()
            .fold(cmd("ADDSLOTS"), |args, slot| args.arg(slot.0));
        let resp = client.cmd(args).await?;
        validate(&resp, addr, "ADDSLOTS")
    }

    /// Pipelines one `SETSLOT` per slot, validates the whole pipeline, and
    /// clears the pipe before returning (spec §4.4 `SetSlots`).
    pub async fn set_slots(
        &self,
        addr: &str,
        action: SetSlotAction,
        slots: &[Slot],
        node_id: Option<&str>,
    ) -> Result<()> {
        if slots.is_empty() {
            return Ok(());
        }
        if action != SetSlotAction::Stable && node_id.is_none() {
            return Err(Error::Invariant(format!(
                "SETSLOT {action:?} requires a node id"
            )));
        }
        let client = self.pool.get(addr).await?;
        for slot in slots {
            let mut args = cmd("SETSLOT").arg(slot.0).arg(action.as_wire());
            if action != SetSlotAction::Stable {
                args = args.arg(node_id.expect("checked above"));
            }
            client.pipe_append(args).await?;
        }
        let ok = validate_pipe_resp(client.as_ref(), addr, "SETSLOT").await;
        client.pipe_clear().await?;
        if !ok {
            return Err(Error::Aggregate {
                partial: false,
                per_address: HashMap::from([(
                    addr.to_owned(),
                    "one or more SETSLOT sub-responses failed".to_owned(),
                )]),
            });
        }
        Ok(())
    }

    /// Single-slot variant of `SetSlots` (spec §4.4 `SetSlot`).
    pub async fn set_slot(
        &self,
        addr: &str,
        action: SetSlotAction,
        slot: Slot,
        node_id: Option<&str>,
    ) -> Result<()> {
        if action != SetSlotAction::Stable && node_id.is_none() {
            return Err(Error::Invariant(format!(
                "SETSLOT {action:?} requires a node id"
            )));
        }
        let client = self.pool.get(addr).await?;
        let mut args = cmd("SETSLOT").arg(slot.0).arg(action.as_wire());
        if action != SetSlotAction::Stable {
            args = args.arg(node_id.expect("checked above"));
        }
        let resp = client.cmd(args).await?;
        validate(&resp, addr, "SETSLOT")
    }

    /// Migrates every non-empty batch of keys out of each slot in `slots`
    /// (spec §4.4 `MigrateKeys`).
    pub async fn migrate_keys(
        &self,
        source_addr: &str,
        dest: &Node,
        slots: &[Slot],
        batch: usize,
        timeout_ms: u64,
        replace: bool,
    ) -> (usize, Result<()>) {
        let mut key_count = 0usize;
        for slot in slots {
            let (n, result) = self
                .migrate_keys_in_slot(source_addr, dest, *slot, batch, timeout_ms, replace)
                .await;
            key_count += n;
            if let Err(e) = result {
                return (key_count, Err(e));
            }
        }
        (key_count, Ok(()))
    }

    /// Single-slot variant of `MigrateKeys` (spec §4.4 `MigrateKeysInSlot`).
    pub async fn migrate_keys_in_slot(
        &self,
        source_addr: &str,
        dest: &Node,
        slot: Slot,
        batch: usize,
        timeout_ms: u64,
        replace: bool,
    ) -> (usize, Result<()>) {
        let client = match self.pool.get(source_addr).await {
            Ok(c) => c,
            Err(e) => return (0, Err(e)),
        };

        let mut key_count = 0usize;
        loop {
            let keys = match client
                .cmd(cmd("GETKEYSINSLOT").arg(slot.0).arg(batch))
                .await
                .and_then(|r| r.list())
            {
                Ok(keys) => keys,
                Err(e) => return (key_count, Err(e)),
            };
            if keys.is_empty() {
                break;
            }

            let mut args = cmd("MIGRATE")
                .arg(dest.ip.as_str())
                .arg(dest.port)
                .arg("")
                .arg(0u32)
                .arg(timeout_ms);
            if replace {
                args = args.arg("REPLACE");
            }
            args = args.arg("KEYS").args(keys.iter().cloned());

            match client.cmd(args).await {
                Ok(resp) => {
                    if let Err(e) = validate(&resp, source_addr, "MIGRATE") {
                        return (key_count, Err(e));
                    }
                }
                Err(e) => return (key_count, Err(e)),
            }
            key_count += keys.len();
        }
        (key_count, Ok(()))
    }

    /// Pipelines `FLUSHALL` then `RESET mode` back-to-back on the same
    /// connection so no new keys can interleave (spec §4.4
    /// `FlushAndReset`).
    pub async fn flush_and_reset(&self, addr: &str, mode: ResetMode) -> Result<()> {
        let client = self.pool.get(addr).await?;
        client.pipe_append(cmd("FLUSHALL")).await?;
        client.pipe_append(cmd("RESET").arg(mode.as_wire())).await?;
        let ok = validate_pipe_resp(client.as_ref(), addr, "FLUSHALL+RESET").await;
        client.pipe_clear().await?;
        if !ok {
            return Err(Error::Command {
                addr: addr.to_owned(),
                context: "FLUSHALL+RESET".to_owned(),
                cause: "flush or reset failed".to_owned(),
            });
        }
        Ok(())
    }
}

fn split_addr(addr: &str) -> Result<(String, u16)> {
    let (ip, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| Error::Invariant(format!("invalid address: {addr}")))?;
    let port: u16 = port
        .parse()
        .map_err(|_| Error::Invariant(format!("invalid port in address: {addr}")))?;
    Ok((ip.to_owned(), port))
}

fn extract_int_after(body: &str, marker: &str) -> Option<u64> {
    let idx = body.find(marker)?;
    let rest = &body[idx + marker.len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}
