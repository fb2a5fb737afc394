use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Command-rename table (spec §6): one `<original> <replacement>` per line,
/// `#`-comments, an empty replacement disables the command entirely.
#[derive(Debug, Clone, Default)]
pub struct RenameTable {
    renames: HashMap<String, Option<String>>,
}

impl RenameTable {
    pub fn empty() -> Self {
        RenameTable::default()
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let mut renames = HashMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(2, char::is_whitespace);
            let original = parts.next().unwrap_or_default().trim();
            if original.is_empty() {
                continue;
            }
            let replacement = parts.next().unwrap_or_default().trim();
            let replacement = if replacement.is_empty() {
                None
            } else {
                Some(replacement.to_owned())
            };
            renames.insert(original.to_owned(), replacement);
        }
        Ok(RenameTable { renames })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Invariant(format!(
            "could not read rename-commands file {}: {e}",
            path.display()
        )))?;
        Self::parse(&contents)
    }

    /// The name actually sent on the wire for `name`. Rewrites the first
    /// token of every outgoing command; returns `Err` if the command has
    /// been disabled via an empty replacement.
    pub fn wire_name(&self, name: &str) -> Result<String> {
        match self.renames.get(name) {
            None => Ok(name.to_owned()),
            Some(None) => Err(Error::Invariant(format!(
                "command {name} has been disabled by the rename table"
            ))),
            Some(Some(replacement)) => Ok(replacement.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_renames_and_comments() {
        let table = RenameTable::parse(
            "# comment\nFLUSHALL FLUSHALL2\nCONFIG \nCLUSTER cluster_renamed\n",
        )
        .unwrap();
        assert_eq!(table.wire_name("FLUSHALL").unwrap(), "FLUSHALL2");
        assert_eq!(table.wire_name("CLUSTER").unwrap(), "cluster_renamed");
        assert_eq!(table.wire_name("GET").unwrap(), "GET");
        assert!(table.wire_name("CONFIG").is_err());
    }
}
