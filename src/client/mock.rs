//! A recording, scriptable [`RawClient`] used by this crate's own test
//! suite and available to integration tests that exercise `Admin` without a
//! real node (spec §9 "Interface polymorphism": live vs mock selected at
//! construction; spec §8 S5 "Verifiable by counting commands on a mock
//! client").
use crate::client::args::Args;
use crate::client::connection::RawClient;
use crate::client::response::Response;
use crate::protocol::Value;
use crate::{Error, Result};
use std::sync::Mutex;

/// A reply-scripting function, given the rendered command, so a test can
/// answer different commands differently.
pub type Scripted = Box<dyn Fn(&[String]) -> Value + Send + Sync>;

pub struct MockClient {
    addr: String,
    recorded: Mutex<Vec<Vec<String>>>,
    unread: Mutex<std::collections::VecDeque<Vec<String>>>,
    script: Option<Scripted>,
    default_reply: Value,
}

impl MockClient {
    pub fn new(addr: impl Into<String>) -> Self {
        MockClient {
            addr: addr.into(),
            recorded: Mutex::new(Vec::new()),
            unread: Mutex::new(Default::default()),
            script: None,
            default_reply: Value::SimpleString("OK".to_owned()),
        }
    }

    pub fn with_script(addr: impl Into<String>, script: Scripted) -> Self {
        MockClient {
            script: Some(script),
            ..MockClient::new(addr)
        }
    }

    pub fn recorded(&self) -> Vec<Vec<String>> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.recorded()
            .iter()
            .filter(|cmd| cmd.first().map(|n| n.eq_ignore_ascii_case(name)) == Some(true))
            .count()
    }

    fn render(args: &Args) -> Vec<String> {
        args.0
            .iter()
            .map(|a| String::from_utf8_lossy(&a.0).into_owned())
            .collect()
    }

    fn reply_for(&self, rendered: &[String]) -> Value {
        match &self.script {
            Some(script) => script(rendered),
            None => self.default_reply.clone(),
        }
    }
}

#[async_trait::async_trait]
impl RawClient for MockClient {
    fn addr(&self) -> &str {
        &self.addr
    }

    async fn cmd(&self, args: Args) -> Result<Response> {
        let rendered = Self::render(&args);
        self.recorded.lock().unwrap().push(rendered.clone());
        Ok(Response::new(self.reply_for(&rendered)))
    }

    async fn pipe_append(&self, args: Args) -> Result<()> {
        let rendered = Self::render(&args);
        self.recorded.lock().unwrap().push(rendered.clone());
        self.unread.lock().unwrap().push_back(rendered);
        Ok(())
    }

    async fn pipe_resp(&self) -> Result<Response> {
        let rendered = self
            .unread
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Invariant(format!("{}: no queued response", self.addr)))?;
        Ok(Response::new(self.reply_for(&rendered)))
    }

    async fn pipe_clear(&self) -> Result<()> {
        self.unread.lock().unwrap().clear();
        Ok(())
    }

    async fn pending(&self) -> usize {
        self.unread.lock().unwrap().len()
    }
}
