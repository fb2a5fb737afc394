//! Topology Parser (spec §4.2): turns the node's `TOPOLOGY` text dump into a
//! structured per-node view.

mod parser;

pub use parser::decode;
