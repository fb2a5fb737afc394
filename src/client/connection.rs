use crate::client::args::Args;
use crate::client::options::Options;
use crate::client::rename::RenameTable;
use crate::client::response::Response;
use crate::protocol::{Codec, Command};
use crate::{Error, Result};
use futures_util::{SinkExt, StreamExt};
use smallvec::SmallVec;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;

/// The swappable "one connection to one node" seam (spec §4.1, §9
/// "Interface polymorphism"). `TcpClient` is the production implementation;
/// `client::mock::MockClient` (test-only) stands in for it in unit tests.
#[async_trait::async_trait]
pub trait RawClient: Send + Sync {
    fn addr(&self) -> &str;

    /// Single round-trip.
    async fn cmd(&self, args: Args) -> Result<Response>;

    /// Queue a command without flushing.
    async fn pipe_append(&self, args: Args) -> Result<()>;

    /// Consume one queued response, in FIFO order.
    async fn pipe_resp(&self) -> Result<Response>;

    /// Discard any queued but unread responses.
    async fn pipe_clear(&self) -> Result<()>;

    /// Number of commands appended or sent whose response has not yet been
    /// consumed. Used by `ValidatePipeResp` to know how many replies to
    /// drain.
    async fn pending(&self) -> usize;
}

struct ClientState {
    framed: Framed<TcpStream, Codec>,
    write_queue: SmallVec<[Command; 4]>,
    outstanding: usize,
}

/// A real connection to one node, driven over `TcpStream` through the
/// minimal RESP2 codec in `crate::protocol`.
///
/// Grounded on `src/network/standalone_connection.rs`'s `Framed`
/// composition, collapsed from separate `FramedRead`/`FramedWrite` halves
/// into one `Framed` since a single administrative connection is never
/// split across reader/writer tasks.
pub struct TcpClient {
    addr: String,
    timeout: Duration,
    rename: RenameTable,
    state: Mutex<ClientState>,
}

impl TcpClient {
    pub async fn connect(addr: &str, options: &Options) -> Result<Self> {
        let stream = tokio::time::timeout(options.connection_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::Connection {
                addr: addr.to_owned(),
                cause: "connection timed out".to_owned(),
            })?
            .map_err(|e| Error::Connection {
                addr: addr.to_owned(),
                cause: e.to_string(),
            })?;
        let framed = Framed::new(stream, Codec);
        let rename = match &options.rename_commands_file {
            Some(path) => RenameTable::load(path)?,
            None => RenameTable::empty(),
        };

        let client = TcpClient {
            addr: addr.to_owned(),
            timeout: options.connection_timeout,
            rename,
            state: Mutex::new(ClientState {
                framed,
                write_queue: SmallVec::new(),
                outstanding: 0,
            }),
        };

        if let Some(password) = &options.password {
            client.cmd(crate::client::args::cmd("AUTH").arg(password)).await?;
        }
        if !options.client_name.is_empty() {
            client
                .cmd(
                    crate::client::args::cmd("CLIENT")
                        .arg("SETNAME")
                        .arg(&options.client_name),
                )
                .await?;
        }

        Ok(client)
    }

    fn encode(&self, args: Args) -> Result<Command> {
        let name = std::str::from_utf8(args.name()).map_err(|e| Error::Invariant(e.to_string()))?;
        let wire_name = self.rename.wire_name(name)?;
        let mut raw: Vec<Vec<u8>> = Vec::with_capacity(args.0.len());
        raw.push(wire_name.into_bytes());
        raw.extend(args.0.into_iter().skip(1).map(|a| a.0));
        Ok(Command { args: raw })
    }

    async fn flush_locked(&self, state: &mut ClientState) -> Result<()> {
        if state.write_queue.is_empty() {
            return Ok(());
        }
        for command in state.write_queue.drain(..) {
            state
                .framed
                .feed(&command)
                .await
                .map_err(|e| self.conn_err(e))?;
            state.outstanding += 1;
        }
        state.framed.flush().await.map_err(|e| self.conn_err(e))?;
        Ok(())
    }

    async fn read_one_locked(&self, state: &mut ClientState) -> Result<Response> {
        if state.outstanding == 0 {
            return Err(Error::Invariant(format!(
                "{}: no queued response to consume",
                self.addr
            )));
        }
        let value = tokio::time::timeout(self.timeout, state.framed.next())
            .await
            .map_err(|_| Error::Connection {
                addr: self.addr.clone(),
                cause: "timed out waiting for reply".to_owned(),
            })?
            .ok_or_else(|| Error::Connection {
                addr: self.addr.clone(),
                cause: "connection closed by peer".to_owned(),
            })?
            .map_err(|e| self.conn_err(e))?;
        state.outstanding -= 1;
        Ok(Response::new(value))
    }

    fn conn_err(&self, e: Error) -> Error {
        match e {
            Error::Protocol { cause, .. } => Error::Protocol {
                addr: self.addr.clone(),
                cause,
            },
            other => Error::Connection {
                addr: self.addr.clone(),
                cause: other.to_string(),
            },
        }
    }
}

#[async_trait::async_trait]
impl RawClient for TcpClient {
    fn addr(&self) -> &str {
        &self.addr
    }

    async fn cmd(&self, args: Args) -> Result<Response> {
        let command = self.encode(args)?;
        let mut state = self.state.lock().await;
        self.flush_locked(&mut state).await?;
        state
            .framed
            .feed(&command)
            .await
            .map_err(|e| self.conn_err(e))?;
        state.outstanding += 1;
        state.framed.flush().await.map_err(|e| self.conn_err(e))?;
        self.read_one_locked(&mut state).await
    }

    async fn pipe_append(&self, args: Args) -> Result<()> {
        let command = self.encode(args)?;
        let mut state = self.state.lock().await;
        state.write_queue.push(command);
        Ok(())
    }

    async fn pipe_resp(&self) -> Result<Response> {
        let mut state = self.state.lock().await;
        self.flush_locked(&mut state).await?;
        self.read_one_locked(&mut state).await
    }

    async fn pipe_clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.write_queue.clear();
        while state.outstanding > 0 {
            self.read_one_locked(&mut state).await?;
        }
        Ok(())
    }

    async fn pending(&self) -> usize {
        let state = self.state.lock().await;
        state.write_queue.len() + state.outstanding
    }
}
