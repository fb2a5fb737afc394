//! Engine Façade (spec §4.7): wires C1-C6 behind `new_admin`, the single
//! entry point an external reconciler uses. Carries no logic of its own
//! beyond constructing an [`Admin`] from an externally-provided node list.

use crate::admin::Admin;
use crate::client::Options;
use crate::Result;
use futures_util::future::join_all;

/// One cluster node's reachable address, as handed to the engine by the
/// orchestrator's pod-listing glue (spec §6 "Endpoint source").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub ip: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Endpoint { ip: ip.into(), port }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// Supplies the node list the engine should connect to (spec §6). Opaque
/// to the engine: how the list is discovered (pod listing, static config,
/// ...) is entirely the embedder's concern.
pub trait EndpointSource: Send + Sync {
    fn endpoints(&self) -> Result<Vec<Endpoint>>;
}

/// Supplies the password used to authenticate new connections (spec §6).
/// Called once before `new_admin` opens any connection.
pub trait CredentialSource: Send + Sync {
    fn password(&self) -> Result<Option<String>>;
}

/// `NewAdmin(addrs, options) -> Admin` (spec §4.7): opens a connection to
/// every address and returns the ready-to-use [`Admin`].
pub async fn new_admin(addrs: &[Endpoint], options: Options) -> Result<Admin> {
    let admin = Admin::new(options);
    let opens = addrs.iter().map(|e| admin.add(&e.addr()));
    for result in join_all(opens).await {
        result?;
    }
    Ok(admin)
}

/// Convenience wiring for the common case: pull the node list and password
/// from their respective sources, then delegate to [`new_admin`].
pub async fn new_admin_from_sources(
    endpoints: &dyn EndpointSource,
    credentials: &dyn CredentialSource,
    mut options: Options,
) -> Result<Admin> {
    options.password = credentials.password()?;
    let addrs = endpoints.endpoints()?;
    new_admin(&addrs, options).await
}
