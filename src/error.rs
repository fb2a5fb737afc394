use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

/// All error kinds produced by this crate.
///
/// See spec §7: Connection / Command / Protocol / Aggregate / Inconsistent /
/// Invariant.
#[derive(Debug)]
pub enum Error {
    /// TCP/auth failure opening a pool entry.
    Connection { addr: String, cause: String },
    /// The node returned an error reply (e.g. "ERR ...").
    Command {
        addr: String,
        context: String,
        cause: String,
    },
    /// A response could not be decoded to the expected shape.
    Protocol { addr: String, cause: String },
    /// A multi-node operation failed on some but not all nodes.
    Aggregate {
        partial: bool,
        per_address: HashMap<String, String>,
    },
    /// All nodes were reachable but their views disagree.
    Inconsistent,
    /// Caller-supplied input violated a precondition.
    Invariant(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection { addr, cause } => {
                write!(f, "connection error to {addr}: {cause}")
            }
            Error::Command {
                addr,
                context,
                cause,
            } => write!(f, "{addr} [{context}]: {cause}"),
            Error::Protocol { addr, cause } => write!(f, "protocol error from {addr}: {cause}"),
            Error::Aggregate {
                partial,
                per_address,
            } => {
                write!(
                    f,
                    "aggregate error (partial={partial}) across {} node(s): ",
                    per_address.len()
                )?;
                for (i, (addr, cause)) in per_address.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{addr}: {cause}")?;
                }
                Ok(())
            }
            Error::Inconsistent => write!(f, "cluster view is inconsistent across nodes"),
            Error::Invariant(msg) => write!(f, "invariant violated: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Connection {
            addr: String::new(),
            cause: e.to_string(),
        }
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(e: tokio::time::error::Elapsed) -> Self {
        Error::Connection {
            addr: String::new(),
            cause: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
