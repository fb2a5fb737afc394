use crate::protocol::Value;
use crate::{Error, Result};
use std::collections::HashMap;

/// A node reply, exposed through the spec's `Str/List/Map/Err` accessors
/// (spec §4.1).
#[derive(Debug, Clone)]
pub struct Response(pub(crate) Value);

impl Response {
    pub fn new(value: Value) -> Self {
        Response(value)
    }

    pub fn str(&self) -> Result<String> {
        self.0.str()
    }

    pub fn list(&self) -> Result<Vec<String>> {
        self.0.list()
    }

    pub fn map(&self) -> Result<HashMap<String, String>> {
        self.0.map()
    }

    pub fn err(&self) -> Option<&str> {
        self.0.err()
    }
}

/// Inspects a single response and returns a structured error if the node
/// reported failure (spec §4.1 `ValidateResp`).
pub fn validate_resp(resp: &Response, addr: &str, context: &str) -> Result<()> {
    if let Some(cause) = resp.err() {
        return Err(Error::Command {
            addr: addr.to_owned(),
            context: context.to_owned(),
            cause: cause.to_owned(),
        });
    }
    Ok(())
}
