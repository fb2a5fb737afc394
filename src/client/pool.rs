use crate::client::connection::{RawClient, TcpClient};
use crate::client::options::Options;
use crate::client::response::{validate_resp, Response};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One logical connection per node address (spec §4.1). Guarded by a single
/// mutex, per spec §5 ("an implementation may use a simple mutex; lock-free
/// designs are unnecessary").
///
/// Grounded on `src/network/connection.rs`'s multi-impl dispatch, collapsed
/// to a single `Arc<dyn RawClient>` entry per address since this engine only
/// ever needs the "one TCP connection per node" case.
pub struct Pool {
    options: Options,
    entries: Mutex<HashMap<String, Arc<dyn RawClient>>>,
}

impl Pool {
    pub fn new(options: Options) -> Self {
        Pool {
            options,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a connection to `addr`, opening it lazily.
    pub async fn get(&self, addr: &str) -> Result<Arc<dyn RawClient>> {
        {
            let entries = self.entries.lock().await;
            if let Some(client) = entries.get(addr) {
                return Ok(client.clone());
            }
        }
        let client: Arc<dyn RawClient> = Arc::new(TcpClient::connect(addr, &self.options).await?);
        let mut entries = self.entries.lock().await;
        Ok(entries.entry(addr.to_owned()).or_insert(client).clone())
    }

    /// A snapshot of all currently open connections.
    pub async fn get_all(&self) -> HashMap<String, Arc<dyn RawClient>> {
        self.entries.lock().await.clone()
    }

    /// Ensures a connection to `addr` exists in the pool.
    pub async fn add(&self, addr: &str) -> Result<()> {
        self.get(addr).await?;
        Ok(())
    }

    /// Registers an already-constructed client under `addr`, overwriting
    /// any existing entry. Used to seed a pool with a `MockClient` in tests
    /// (spec §9 "Interface polymorphism": live vs mock selected at
    /// construction).
    pub async fn insert(&self, addr: &str, client: std::sync::Arc<dyn RawClient>) {
        self.entries.lock().await.insert(addr.to_owned(), client);
    }

    /// Closes and drops one entry.
    pub async fn remove(&self, addr: &str) {
        self.entries.lock().await.remove(addr);
    }

    /// Closes and drops all entries.
    pub async fn reset(&self) {
        self.entries.lock().await.clear();
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

/// Inspects a single response and returns a structured error if the node
/// reported failure (spec §4.1 `ValidateResp`).
pub fn validate(resp: &Response, addr: &str, context: &str) -> Result<()> {
    validate_resp(resp, addr, context)
}

/// Drains all pipelined responses on `client`, returning `false` if any
/// failed (spec §4.1 `ValidatePipeResp`).
pub async fn validate_pipe_resp(client: &dyn RawClient, addr: &str, context: &str) -> bool {
    let mut all_ok = true;
    while client.pending().await > 0 {
        match client.pipe_resp().await {
            Ok(resp) => {
                if validate(&resp, addr, context).is_err() {
                    all_ok = false;
                }
            }
            Err(_) => {
                all_ok = false;
                break;
            }
        }
    }
    all_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use std::sync::Arc;

    // Property 5 (spec §8): GetAll returns a snapshot that is stable under
    // concurrent Add/Remove (no iteration crash).
    #[tokio::test]
    async fn get_all_snapshot_survives_concurrent_add_remove() {
        let pool = Arc::new(Pool::new(Options::default()));

        let writer = {
            let pool = pool.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    let addr = format!("10.0.0.{}:7000", i % 20);
                    pool.insert(&addr, Arc::new(MockClient::new(addr.clone()))).await;
                    if i % 3 == 0 {
                        pool.remove(&addr).await;
                    }
                }
            })
        };

        for _ in 0..200 {
            let snapshot = pool.get_all().await;
            // A snapshot entry's client must match the address it's keyed
            // under; this would only fail if the map were mutated mid-clone.
            for (addr, client) in snapshot.iter() {
                assert_eq!(client.addr(), addr);
            }
        }

        writer.await.unwrap();
    }

    #[tokio::test]
    async fn remove_drops_one_entry_without_disturbing_others() {
        let pool = Pool::new(Options::default());
        pool.insert("a:1", Arc::new(MockClient::new("a:1"))).await;
        pool.insert("b:2", Arc::new(MockClient::new("b:2"))).await;

        pool.remove("a:1").await;

        let snapshot = pool.get_all().await;
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key("b:2"));
    }

    #[tokio::test]
    async fn reset_clears_every_entry() {
        let pool = Pool::new(Options::default());
        pool.insert("a:1", Arc::new(MockClient::new("a:1"))).await;
        pool.insert("b:2", Arc::new(MockClient::new("b:2"))).await;

        pool.reset().await;

        assert!(pool.get_all().await.is_empty());
    }
}
